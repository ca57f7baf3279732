//! Records - the capability the driver persists.
//!
//! The driver never owns or constructs records. It only needs a collection
//! name, read access to the payload, a validation check and a way to replace
//! the payload wholesale. Any type providing those can be stored.
//!
//! [`Model`] is a ready-made implementation: a document payload checked
//! against a [`Schema`].

mod model;
mod schema;

use bson::{Bson, Document};
use thiserror::Error;

use crate::identifier::ID_FIELD;

pub use model::Model;
pub use schema::{FieldKind, FieldRule, Schema};

/// Diagnostic produced by a failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error}")]
pub struct Invalid {
    pub error: String,
}

impl Invalid {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// Trait for values the driver can persist.
pub trait Record: Send + Sync {
    /// Collection this record is stored in (its declared type).
    fn collection(&self) -> &str;

    /// Current payload.
    fn data(&self) -> &Document;

    /// Check the payload, describing the first problem found.
    fn validate(&self) -> Result<(), Invalid>;

    /// Replace the payload.
    fn body(&mut self, replacement: Document);

    fn valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Public identifier, if present and non-empty.
    fn id(&self) -> Option<String> {
        match self.data().get(ID_FIELD)? {
            Bson::String(id) if id.is_empty() => None,
            Bson::String(id) => Some(id.clone()),
            Bson::ObjectId(oid) => Some(oid.to_hex()),
            Bson::Null => None,
            other => Some(other.to_string()),
        }
    }
}
