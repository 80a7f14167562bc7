//! Error types for the post-call survey Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the survey Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Bad or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Table read or write failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Lookup miss
    #[error("Not found: {0}")]
    NotFound(String),

    /// Contact-center API failure
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Authentication error
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Auth(_) => 401,
            Error::NotFound(_) => 404,
            Error::Upstream(_) => 502,
            _ => 500,
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
