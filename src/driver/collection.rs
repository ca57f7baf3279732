//! CollectionHandle - raw primitives scoped to the driver's database.

use bson::{Bson, Document};

use super::RecordDriver;
use crate::storage::{
    DeleteOutcome, DocumentStore, FindAndUpdateOptions, FindAndUpdateOutcome, InsertOutcome,
    Payload, StoreResult, UpdateOutcome,
};

/// Store primitives bound to one collection of the configured database.
///
/// For queries the record verbs do not cover (bulk inserts, filters on
/// other fields, `update_many`). No validation runs here.
pub struct CollectionHandle<'a, S> {
    store: &'a S,
    database: &'a str,
    collection: String,
}

impl<'a, S: DocumentStore> CollectionHandle<'a, S> {
    pub fn new(store: &'a S, database: &'a str, collection: impl Into<String>) -> Self {
        Self {
            store,
            database,
            collection: collection.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.collection
    }

    pub async fn find(&self, filter: Document) -> StoreResult<Vec<Document>> {
        self.store.find(self.database, &self.collection, filter).await
    }

    pub async fn insert(&self, payload: impl Into<Payload>) -> StoreResult<InsertOutcome> {
        self.store
            .create(self.database, &self.collection, payload.into())
            .await
    }

    pub async fn delete_one(&self, filter: Document) -> StoreResult<DeleteOutcome> {
        self.store
            .delete_one(self.database, &self.collection, filter)
            .await
    }

    pub async fn find_one_and_update(
        &self,
        filter: Document,
        operation: impl Into<Bson>,
        options: FindAndUpdateOptions,
    ) -> StoreResult<FindAndUpdateOutcome> {
        self.store
            .find_one_and_update(
                self.database,
                &self.collection,
                filter,
                operation.into(),
                options,
            )
            .await
    }

    pub async fn update_one(
        &self,
        filter: Document,
        data: impl Into<Bson>,
    ) -> StoreResult<UpdateOutcome> {
        self.store
            .update_one(self.database, &self.collection, filter, data.into())
            .await
    }

    pub async fn update_many(
        &self,
        filter: Document,
        data: impl Into<Bson>,
    ) -> StoreResult<UpdateOutcome> {
        self.store
            .update_many(self.database, &self.collection, filter, data.into())
            .await
    }
}

/// Extension trait for collection access on a driver.
pub trait CollectionsExt {
    type Store: DocumentStore;

    /// Get a handle on `name` in the configured database.
    fn collection(&self, name: &str) -> CollectionHandle<'_, Self::Store>;
}

impl<S: DocumentStore> CollectionsExt for RecordDriver<S> {
    type Store = S;

    fn collection(&self, name: &str) -> CollectionHandle<'_, S> {
        CollectionHandle::new(&self.store, &self.config.database, name)
    }
}
