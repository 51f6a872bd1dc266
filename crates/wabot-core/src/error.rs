//! Error types shared across the wabot crates.
//!
//! None of the update-level errors here ever reach the code that submitted
//! the update. The dispatcher logs them and moves on; they exist as values
//! so that the drop reason can be logged at the right level and observed in
//! tests.

use thiserror::Error;

// =============================================================================
// Update Errors
// =============================================================================

/// Reasons an inbound update is dropped before any handler is considered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UpdateError {
    /// The payload lacks the `entry → changes → value` path or one of the
    /// identity fields inside it.
    #[error("malformed update: {reason}")]
    Malformed {
        /// What was missing or mistyped.
        reason: String,
    },

    /// The update is addressed to another phone number sharing the webhook.
    #[error("update addressed to '{got}', this bot is '{expected}'")]
    ForeignRecipient {
        /// The configured phone number id.
        expected: String,
        /// The phone number id found in the update.
        got: String,
    },

    /// The change carries no message (status callbacks and similar events).
    #[error("update carries no message")]
    NoMessage,
}

impl UpdateError {
    /// Creates a malformed-update error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Extraction Errors
// =============================================================================

/// Errors raised while a handler kind pulls its fields out of a message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// A field the kind depends on is absent.
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    /// A field is present but has an unexpected shape.
    #[error("invalid field '{field}': {reason}")]
    InvalidField {
        /// Dotted path of the offending field.
        field: &'static str,
        /// Deserializer message.
        reason: String,
    },
}

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

// =============================================================================
// Outbound API Errors
// =============================================================================

/// Errors returned by a [`Messenger`](crate::messenger::Messenger).
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// No outbound client is attached.
    #[error("messenger is not connected")]
    NotConnected,

    /// The request timed out.
    #[error("API call timed out")]
    Timeout,

    /// The provider answered with an error object.
    #[error("provider error ({code}): {message}")]
    Provider {
        /// Provider error code.
        code: i64,
        /// Provider error message.
        message: String,
    },

    /// Request or response (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// The HTTP layer failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// Anything else.
    #[error("{0}")]
    Other(String),
}

/// Result type for outbound API calls.
pub type ApiResult<T> = Result<T, ApiError>;
