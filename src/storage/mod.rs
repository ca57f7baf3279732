//! Storage - document store primitives.
//!
//! A [`DocumentStore`] executes exactly one command against a named
//! database/collection pair per call, opening and closing its own
//! connection. Results are narrow projections of the backend response.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               DocumentStore trait             │
//! └──────────────────────────────────────────────┘
//!          ↑                           ↑
//! ┌────────┴────────┐         ┌────────┴────────┐
//! │  InMemoryStore  │         │   MongoStore    │
//! │ (tests, dev)    │         │ (feature gated) │
//! └─────────────────┘         └─────────────────┘
//! ```

mod error;
mod in_memory;
mod store;

#[cfg(feature = "mongodb")]
mod mongo;

use bson::{Bson, Document};

pub use error::{StoreError, StoreResult};
pub use in_memory::InMemoryStore;
pub use store::DocumentStore;

#[cfg(feature = "mongodb")]
pub use mongo::MongoStore;

/// What to insert: one document or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    One(Document),
    Many(Vec<Document>),
}

impl From<Document> for Payload {
    fn from(document: Document) -> Self {
        Payload::One(document)
    }
}

impl From<Vec<Document>> for Payload {
    fn from(documents: Vec<Document>) -> Self {
        Payload::Many(documents)
    }
}

/// Result of `create`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InsertOutcome {
    pub inserted_count: u64,
    /// Generated identifier of a single insert. `None` for batches.
    pub inserted_id: Option<Bson>,
    /// Identifiers of every inserted document, in payload order.
    pub inserted_ids: Vec<Bson>,
}

/// Result of `update_one` and `update_many`.
///
/// `matched_count` can exceed `modified_count` when matched documents
/// already held the new values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateOutcome {
    pub matched_count: u64,
    pub modified_count: u64,
    pub upserted_count: u64,
    pub upserted_id: Option<Bson>,
}

/// Result of `delete_one`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeleteOutcome {
    pub deleted_count: u64,
}

/// Result of `find_one_and_update`.
///
/// `ok` is true when a document was matched or upserted. `value` is the
/// document as it is *after* the update.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindAndUpdateOutcome {
    pub ok: bool,
    pub value: Option<Document>,
}

/// Options for `find_one_and_update`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindAndUpdateOptions {
    pub upsert: bool,
}

impl FindAndUpdateOptions {
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Require an update argument to be a document.
pub(crate) fn expect_document(value: Bson, expected: &'static str) -> StoreResult<Document> {
    match value {
        Bson::Document(document) => Ok(document),
        _ => Err(StoreError::MalformedUpdate { expected }),
    }
}

/// Wrap field replacements in a `$set` operator.
pub(crate) fn set_operation(data: Document) -> Document {
    let mut operation = Document::new();
    operation.insert("$set", data);
    operation
}
