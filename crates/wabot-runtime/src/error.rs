//! Runtime error types.

use thiserror::Error;

use crate::config::ConfigError;
use wabot_framework::RegistrationError;

/// Errors that can occur while setting up a bot.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Loading or validating configuration failed.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The dispatcher rejected its settings or a handler.
    #[error(transparent)]
    Registration(#[from] RegistrationError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
