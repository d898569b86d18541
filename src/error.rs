//! Error types for Gator.

use thiserror::Error;

/// Common error type for Gator.
#[derive(Error, Debug)]
pub enum GatorError {
    /// Network or HTTP failure while fetching a feed.
    ///
    /// Non-2xx responses land here as well; status codes are not inspected
    /// separately. The next scheduler tick is the retry.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed feed document.
    #[error("parse error: {0}")]
    Parse(String),

    /// A uniqueness constraint rejected the write.
    ///
    /// During ingestion this is the "already have this post" signal.
    #[error("already exists: {0}")]
    UniqueViolation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// The command requires a logged-in user and the session is anonymous.
    #[error("no user logged in; please log in first")]
    NotLoggedIn,

    /// The session names a user the store could not resolve.
    #[error("failed to fetch logged-in user: {0}")]
    UserLookup(String),

    /// Generic persistence failure.
    #[error("database error: {0}")]
    Database(String),

    /// No handler is registered under the given command name.
    #[error("unknown command: {0}")]
    CommandNotFound(String),

    /// Bad command-line arguments.
    #[error("usage: {0}")]
    Usage(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session file (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GatorError {
    /// Returns true for the expected duplicate-insert signal.
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, GatorError::UniqueViolation(_))
    }
}

// Conversion from sqlx errors
impl From<sqlx::Error> for GatorError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => GatorError::NotFound("row".to_string()),
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                GatorError::UniqueViolation(db_err.message().to_string())
            }
            _ => GatorError::Database(e.to_string()),
        }
    }
}

/// Result type alias for Gator operations.
pub type Result<T> = std::result::Result<T, GatorError>;
