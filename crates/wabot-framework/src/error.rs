//! Error types for the wabot framework.

use std::any::Any;

use thiserror::Error;

use wabot_core::ApiError;

/// Returned by a handler action that failed.
///
/// The dispatcher logs it and still counts the handler as executed.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// A plain failure message.
    #[error("{0}")]
    Message(String),

    /// An outbound API call made by the handler failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Any other error the handler bubbled up.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync>),

    /// The action panicked.
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Creates a message error.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Message(msg.into())
    }

    /// Wraps an arbitrary error.
    pub fn other<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Other(Box::new(err))
    }

    /// Converts a caught panic payload.
    pub(crate) fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        Self::Panicked(panic_message(payload.as_ref()))
    }
}

impl From<String> for HandlerError {
    fn from(msg: String) -> Self {
        Self::Message(msg)
    }
}

impl From<&str> for HandlerError {
    fn from(msg: &str) -> Self {
        Self::Message(msg.to_string())
    }
}

impl From<RegistrationError> for HandlerError {
    fn from(err: RegistrationError) -> Self {
        Self::other(err)
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Result type returned by handler actions.
pub type HandlerResult = Result<(), HandlerError>;

/// Errors raised synchronously while building or installing handlers.
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    /// The kind name does not name a handler kind.
    #[error("unknown handler kind '{0}'")]
    UnknownKind(String),

    /// A filter pattern does not compile.
    #[error("invalid pattern '{pattern}': {source}")]
    InvalidPattern {
        /// The pattern as given.
        pattern: String,
        /// Compiler error.
        #[source]
        source: regex::Error,
    },
}

/// Result type for registration operations.
pub type RegistrationResult<T> = Result<T, RegistrationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&String::from("bang")), "bang");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }

    #[test]
    fn test_api_error_converts() {
        let err: HandlerError = ApiError::Timeout.into();
        assert_eq!(err.to_string(), "API call timed out");
    }
}
