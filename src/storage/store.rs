//! DocumentStore - the storage client contract.

use async_trait::async_trait;
use bson::{Bson, Document};

use super::{
    DeleteOutcome, FindAndUpdateOptions, FindAndUpdateOutcome, InsertOutcome, Payload,
    StoreResult, UpdateOutcome,
};

/// Storage client for a document backend.
///
/// Every method runs a single command with its own connection; nothing is
/// shared between calls. Filters may carry a string `_id`, which is converted
/// to the native identifier before the command is sent.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// All documents matching `filter`, in storage order.
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Vec<Document>>;

    /// Insert one document or a batch.
    async fn create(
        &self,
        database: &str,
        collection: &str,
        payload: Payload,
    ) -> StoreResult<InsertOutcome>;

    /// Delete at most one matching document.
    async fn delete_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<DeleteOutcome>;

    /// Atomically locate one document and apply `operation` to it.
    ///
    /// `operation` must be an update specification document
    /// (`{ "$set": { .. } }`), anything else fails before dispatch.
    async fn find_one_and_update(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        operation: Bson,
        options: FindAndUpdateOptions,
    ) -> StoreResult<FindAndUpdateOutcome>;

    /// `$set` the fields of `data` on the first matching document.
    async fn update_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        data: Bson,
    ) -> StoreResult<UpdateOutcome>;

    /// `$set` the fields of `data` on every matching document.
    async fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        data: Bson,
    ) -> StoreResult<UpdateOutcome>;
}
