//! InMemoryStore - HashMap-backed document store for testing and development.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::{Bson, Document};

use super::{
    expect_document, set_operation, DeleteOutcome, DocumentStore, FindAndUpdateOptions,
    FindAndUpdateOutcome, InsertOutcome, Payload, StoreError, StoreResult, UpdateOutcome,
};
use crate::identifier::{native_filter, NATIVE_ID_FIELD};

/// In-memory document store.
///
/// Documents are grouped under `"database:collection"` keys and kept in
/// insertion order. Filters are top-level equality matches. Updates support
/// `$set` and `$unset`. Clone-friendly via Arc; clones share storage.
///
/// Each primitive goes through [`InMemoryStore::execute`], which counts a
/// connection and fails with [`StoreError::Connection`] while the store is
/// offline.
#[derive(Clone)]
pub struct InMemoryStore {
    storage: Arc<RwLock<HashMap<String, Vec<Document>>>>,
    online: Arc<AtomicBool>,
    connections: Arc<AtomicU64>,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryStore {
    /// Create a new empty, reachable store.
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
            online: Arc::new(AtomicBool::new(true)),
            connections: Arc::new(AtomicU64::new(0)),
        }
    }

    fn make_key(database: &str, collection: &str) -> String {
        format!("{}:{}", database, collection)
    }

    /// Make the store reachable or unreachable.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Number of connections opened so far.
    pub fn connections(&self) -> u64 {
        self.connections.load(Ordering::SeqCst)
    }

    /// Number of documents in a collection. Does not count as a connection.
    pub fn count(&self, database: &str, collection: &str) -> StoreResult<usize> {
        let storage = self.storage.read().map_err(|_| StoreError::LockPoisoned)?;
        Ok(storage
            .get(&Self::make_key(database, collection))
            .map_or(0, Vec::len))
    }

    /// Run `operation` against one collection under the write lock.
    ///
    /// The "connection" is opened before and closed after the operation.
    pub fn execute<T>(
        &self,
        database: &str,
        collection: &str,
        operation: impl FnOnce(&mut Vec<Document>) -> StoreResult<T>,
    ) -> StoreResult<T> {
        if !self.online.load(Ordering::SeqCst) {
            tracing::error!(database, collection, "in-memory store is offline");
            return Err(StoreError::connection("in-memory store is offline"));
        }
        self.connections.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(database, collection, "connection opened");

        let result = {
            let mut storage = self.storage.write().map_err(|_| StoreError::LockPoisoned)?;
            let documents = storage
                .entry(Self::make_key(database, collection))
                .or_default();
            operation(documents)
        };

        tracing::trace!(database, collection, "connection closed");
        result
    }
}

fn matches(document: &Document, filter: &Document) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}

/// Check an update specification up front so a bad one never half-applies.
fn check_operation(operation: &Document) -> StoreResult<()> {
    if operation.is_empty() {
        return Err(StoreError::MalformedUpdate {
            expected: "operation",
        });
    }
    for (operator, argument) in operation {
        if !operator.starts_with('$') {
            return Err(StoreError::MalformedUpdate {
                expected: "operation",
            });
        }
        if operator != "$set" && operator != "$unset" {
            return Err(StoreError::UnsupportedOperator(operator.clone()));
        }
        if !matches!(argument, Bson::Document(_)) {
            return Err(StoreError::MalformedUpdate {
                expected: "operation",
            });
        }
        if let Bson::Document(fields) = argument {
            if fields.contains_key(NATIVE_ID_FIELD) && operator == "$unset" {
                return Err(StoreError::command("cannot unset immutable field '_id'"));
            }
        }
    }
    Ok(())
}

/// Apply a checked update to a copy of `document`. Returns the copy and
/// whether anything changed.
fn apply_operation(document: &Document, operation: &Document) -> StoreResult<(Document, bool)> {
    let mut updated = document.clone();
    let mut modified = false;

    for (operator, argument) in operation {
        let Bson::Document(fields) = argument else {
            continue;
        };
        match operator.as_str() {
            "$set" => {
                for (field, value) in fields {
                    if field == NATIVE_ID_FIELD {
                        if document.get(NATIVE_ID_FIELD) != Some(value) {
                            return Err(StoreError::command("cannot modify immutable field '_id'"));
                        }
                        continue;
                    }
                    if updated.get(field) != Some(value) {
                        updated.insert(field.clone(), value.clone());
                        modified = true;
                    }
                }
            }
            "$unset" => {
                for field in fields.keys() {
                    modified |= updated.remove(field).is_some();
                }
            }
            _ => {}
        }
    }

    Ok((updated, modified))
}

/// Give a document a native `_id` in first position, generating one if absent.
fn with_native_id(document: Document) -> StoreResult<Document> {
    let mut document = native_filter(document)?;
    let id = document
        .remove(NATIVE_ID_FIELD)
        .unwrap_or_else(|| Bson::ObjectId(ObjectId::new()));

    let mut stored = Document::new();
    stored.insert(NATIVE_ID_FIELD, id);
    for (field, value) in document {
        stored.insert(field, value);
    }
    Ok(stored)
}

/// Seed an upserted document from the equality fields of the filter.
fn upsert_seed(filter: &Document) -> Document {
    filter
        .iter()
        .filter(|(field, _)| !field.starts_with('$'))
        .map(|(field, value)| (field.clone(), value.clone()))
        .collect()
}

fn insert_all(documents: &mut Vec<Document>, batch: Vec<Document>) -> StoreResult<Vec<Bson>> {
    let mut ids = Vec::with_capacity(batch.len());
    for document in &batch {
        let id = document.get(NATIVE_ID_FIELD).cloned().unwrap_or(Bson::Null);
        let taken = documents
            .iter()
            .any(|existing| existing.get(NATIVE_ID_FIELD) == Some(&id))
            || ids.contains(&id);
        if taken {
            return Err(StoreError::command(format!("duplicate key: _id {}", id)));
        }
        ids.push(id);
    }
    documents.extend(batch);
    Ok(ids)
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    #[tracing::instrument(skip(self, filter))]
    async fn find(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<Vec<Document>> {
        let filter = native_filter(filter)?;
        self.execute(database, collection, |documents| {
            Ok(documents
                .iter()
                .filter(|document| matches(document, &filter))
                .cloned()
                .collect())
        })
    }

    #[tracing::instrument(skip(self, payload))]
    async fn create(
        &self,
        database: &str,
        collection: &str,
        payload: Payload,
    ) -> StoreResult<InsertOutcome> {
        let (batch, single) = match payload {
            Payload::One(document) => (vec![with_native_id(document)?], true),
            Payload::Many(batch) => (
                batch
                    .into_iter()
                    .map(with_native_id)
                    .collect::<StoreResult<Vec<_>>>()?,
                false,
            ),
        };

        self.execute(database, collection, |documents| {
            let ids = insert_all(documents, batch)?;
            Ok(InsertOutcome {
                inserted_count: ids.len() as u64,
                inserted_id: if single { ids.first().cloned() } else { None },
                inserted_ids: ids,
            })
        })
    }

    #[tracing::instrument(skip(self, filter))]
    async fn delete_one(
        &self,
        database: &str,
        collection: &str,
        filter: Document,
    ) -> StoreResult<DeleteOutcome> {
        let filter = native_filter(filter)?;
        self.execute(database, collection, |documents| {
            let position = documents
                .iter()
                .position(|document| matches(document, &filter));
            let deleted_count = match position {
                Some(index) => {
                    documents.remove(index);
                    1
                }
                None => 0,
            };
            Ok(DeleteOutcome { deleted_count })
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
        check_operation(&operation)?;
        let filter = native_filter(filter)?;

        self.execute(database, collection, |documents| {
            if let Some(document) = documents
                .iter_mut()
                .find(|document| matches(document, &filter))
            {
                let (updated, _) = apply_operation(document, &operation)?;
                *document = updated.clone();
                return Ok(FindAndUpdateOutcome {
                    ok: true,
                    value: Some(updated),
                });
            }

            if !options.upsert {
                return Ok(FindAndUpdateOutcome::default());
            }

            let (seeded, _) = apply_operation(&upsert_seed(&filter), &operation)?;
            let inserted = with_native_id(seeded)?;
            insert_all(documents, vec![inserted.clone()])?;
            Ok(FindAndUpdateOutcome {
                ok: true,
                value: Some(inserted),
            })
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

        self.execute(database, collection, |documents| {
            let Some(document) = documents
                .iter_mut()
                .find(|document| matches(document, &filter))
            else {
                return Ok(UpdateOutcome::default());
            };
            let (updated, modified) = apply_operation(document, &operation)?;
            *document = updated;
            Ok(UpdateOutcome {
                matched_count: 1,
                modified_count: u64::from(modified),
                ..UpdateOutcome::default()
            })
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

        self.execute(database, collection, |documents| {
            let mut updates = Vec::new();
            for (index, document) in documents.iter().enumerate() {
                if matches(document, &filter) {
                    updates.push((index, apply_operation(document, &operation)?));
                }
            }

            let matched_count = updates.len() as u64;
            let mut modified_count = 0;
            for (index, (updated, modified)) in updates {
                documents[index] = updated;
                modified_count += u64::from(modified);
            }
            Ok(UpdateOutcome {
                matched_count,
                modified_count,
                ..UpdateOutcome::default()
            })
        })
    }
}
