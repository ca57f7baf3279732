use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::storage::StoreError;

/// The four record verbs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Create,
    Read,
    Update,
    Delete,
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Verb::Create => "create",
            Verb::Read => "read",
            Verb::Update => "update",
            Verb::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Errors returned by [`RecordDriver`](crate::RecordDriver) verbs.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The record failed its own validation. Carries its diagnostic.
    #[error("{0}")]
    Validation(String),

    /// Read, update or delete without a public identifier.
    #[error("object id is required")]
    IdentifierRequired,

    /// Strict mode: the call succeeded but matched nothing.
    #[error("no item to {0}")]
    NothingAffected(Verb),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl DriverError {
    /// True for errors raised before any storage call was made.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            DriverError::Validation(_) | DriverError::IdentifierRequired
        )
    }
}

pub type DriverResult<T> = Result<T, DriverError>;
