//! Storage errors.

use thiserror::Error;

/// Errors from storage primitives.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend could not be reached. Distinct from an empty result.
    #[error("connection error: {message}")]
    Connection {
        /// Connection error message
        message: String,
    },

    /// An update payload or specification was not a document.
    #[error("expected {expected} to be a document")]
    MalformedUpdate {
        /// Which argument was malformed (`operation` or `data`)
        expected: &'static str,
    },

    /// Update operator the store does not implement.
    #[error("unsupported update operator: {0}")]
    UnsupportedOperator(String),

    /// A string identifier that is not a valid object id.
    #[error("invalid object id: {0}")]
    InvalidIdentifier(String),

    /// The backend rejected or failed a command.
    #[error("command error: {message}")]
    Command {
        /// Command error message
        message: String,
    },

    /// In-memory storage lock was poisoned by a panicking writer.
    #[error("storage lock poisoned")]
    LockPoisoned,
}

impl StoreError {
    /// Create a connection error.
    #[must_use]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Create a command error.
    #[must_use]
    pub fn command(message: impl Into<String>) -> Self {
        Self::Command {
            message: message.into(),
        }
    }

    /// True when the backend was unreachable, as opposed to a failed command.
    #[must_use]
    pub fn is_connection(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}

#[cfg(feature = "mongodb")]
impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        use mongodb::error::ErrorKind;

        match *err.kind {
            ErrorKind::ServerSelection { .. } | ErrorKind::Io(_) | ErrorKind::DnsResolve { .. } => {
                Self::connection(err.to_string())
            }
            _ => Self::command(err.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StoreResult<T> = Result<T, StoreError>;
