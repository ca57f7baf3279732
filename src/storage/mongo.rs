//! MongoStore - MongoDB document store, one client per call.
//!
//! Every primitive connects, pings the server so an unreachable host is
//! reported as [`StoreError::Connection`], runs one command and shuts the
//! client down again. No client is kept between calls.

use std::future::Future;

use async_trait::async_trait;
use bson::{doc, Bson, Document};
use futures::TryStreamExt;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use mongodb::{Client, Collection};

use super::{
    expect_document, set_operation, DeleteOutcome, DocumentStore, FindAndUpdateOptions,
    FindAndUpdateOutcome, InsertOutcome, Payload, StoreError, StoreResult, UpdateOutcome,
};
use crate::identifier::native_filter;

/// MongoDB storage client for a single host URI.
#[derive(Debug, Clone)]
pub struct MongoStore {
    host: String,
}

impl MongoStore {
    /// Create a store for `host` (a `mongodb://` or `mongodb+srv://` URI).
    ///
    /// Nothing is contacted until the first call.
    pub fn new(host: impl Into<String>) -> Self {
        Self { host: host.into() }
    }

    /// The configured host URI.
    pub fn host(&self) -> &str {
        &self.host
    }

    async fn connect(&self) -> StoreResult<Client> {
        let client = Client::with_uri_str(&self.host).await.map_err(|e| {
            tracing::error!(error = %e, "mongodb connection failed");
            StoreError::connection(e.to_string())
        })?;

        if let Err(e) = client
            .database("admin")
            .run_command(doc! { "ping": 1 }, None)
            .await
        {
            tracing::error!(error = %e, "mongodb server unreachable");
            client.shutdown().await;
            return Err(StoreError::connection(e.to_string()));
        }

        Ok(client)
    }

    /// Open a connection, run `operation` against one collection, close it.
    ///
    /// Connection failures are logged and returned as
    /// [`StoreError::Connection`]; command failures as [`StoreError::Command`].
    pub async fn execute<T, F, Fut>(
        &self,
        database: &str,
        collection: &str,
        operation: F,
    ) -> StoreResult<T>
    where
        F: FnOnce(Collection<Document>) -> Fut + Send,
        Fut: Future<Output = mongodb::error::Result<T>> + Send,
        T: Send,
    {
        let client = self.connect().await?;
        tracing::trace!(database, collection, "connection opened");

        let handle = client.database(database).collection::<Document>(collection);
        let result = operation(handle).await;

        client.shutdown().await;
        tracing::trace!(database, collection, "connection closed");

        result.map_err(StoreError::from)
    }
}

#[async_trait]
impl DocumentStore for MongoStore {
    #[tracing::instrument(skip(self, filter))]
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Vec<Document>> {
        let filter = native_filter(filter)?;
        self.execute(database, collection, |col| async move {
            let cursor = col.find(filter, None).await?;
            cursor.try_collect::<Vec<Document>>().await
        })
        .await
    }

    #[tracing::instrument(skip(self, payload))]
    async fn create(
        &self,
        database: &str,
        collection: &str,
        payload: Payload,
    ) -> StoreResult<InsertOutcome> {
        match payload {
            Payload::One(document) => {
                let document = native_filter(document)?;
                let result = self
                    .execute(database, collection, |col| async move {
                        col.insert_one(document, None).await
                    })
                    .await?;
                Ok(InsertOutcome {
                    inserted_count: 1,
                    inserted_id: Some(result.inserted_id.clone()),
                    inserted_ids: vec![result.inserted_id],
                })
            }
            Payload::Many(batch) => {
                let batch = batch
                    .into_iter()
                    .map(native_filter)
                    .collect::<StoreResult<Vec<_>>>()?;
                let result = self
                    .execute(database, collection, |col| async move {
                        col.insert_many(batch, None).await
                    })
                    .await?;

                let mut ids: Vec<(usize, Bson)> = result.inserted_ids.into_iter().collect();
                ids.sort_by_key(|(index, _)| *index);
                let inserted_ids: Vec<Bson> = ids.into_iter().map(|(_, id)| id).collect();
                Ok(InsertOutcome {
                    inserted_count: inserted_ids.len() as u64,
                    inserted_id: None,
                    inserted_ids,
                })
            }
        }
    }

    #[tracing::instrument(skip(self, filter))]
    async fn delete_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<DeleteOutcome> {
        let filter = native_filter(filter)?;
        let result = self
            .execute(database, collection, |col| async move {
                col.delete_one(filter, None).await
            })
            .await?;
        Ok(DeleteOutcome {
            deleted_count: result.deleted_count,
        })
    }

    #[tracing::instrument(skip(self, filter, operation))]
    async fn find_one_and_update(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        operation: Bson,
        options: FindAndUpdateOptions,
    ) -> StoreResult<FindAndUpdateOutcome> {
        let operation = expect_document(operation, "operation")?;
        let filter = native_filter(filter)?;

        let mut mongo_options = FindOneAndUpdateOptions::default();
        mongo_options.upsert = Some(options.upsert);
        mongo_options.return_document = Some(ReturnDocument::After);

        let value = self
            .execute(database, collection, |col| async move {
                col.find_one_and_update(filter, operation, mongo_options)
                    .await
            })
            .await?;
        Ok(FindAndUpdateOutcome {
            ok: value.is_some(),
            value,
        })
    }

    #[tracing::instrument(skip(self, filter, data))]
    async fn update_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        data: Bson,
    ) -> StoreResult<UpdateOutcome> {
        let operation = set_operation(expect_document(data, "data")?);
        let filter = native_filter(filter)?;

        let result = self
            .execute(database, collection, |col| async move {
                col.update_one(filter, operation, None).await
            })
            .await?;
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id,
        })
    }

    #[tracing::instrument(skip(self, filter, data))]
    async fn update_many(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
        data: Bson,
    ) -> StoreResult<UpdateOutcome> {
        let operation = set_operation(expect_document(data, "data")?);
        let filter = native_filter(filter)?;

        let result = self
            .execute(database, collection, |col| async move {
                col.update_many(filter, operation, None).await
            })
            .await?;
        Ok(UpdateOutcome {
            matched_count: result.matched_count,
            modified_count: result.modified_count,
            upserted_count: u64::from(result.upserted_id.is_some()),
            upserted_id: result.upserted_id,
        })
    }
}
