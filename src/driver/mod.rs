//! Driver - validated CRUD verbs over a [`DocumentStore`].
//!
//! Every verb follows the same shape:
//!
//! 1. preconditions: an identifier for read/update/delete, then `valid()`;
//!    failures return before the store is touched
//! 2. one store primitive against `config.database` and the record's
//!    collection
//! 3. the result is written back into the record with `_id` turned into the
//!    public `id`
//!
//! ## Example
//!
//! ```ignore
//! let driver = RecordDriver::new(config, InMemoryStore::new());
//!
//! let mut user = Model::new("users", schema, doc! { "firstname": "toto" });
//! driver.create(&mut user).await?;
//! driver.read(&mut user).await?;
//! ```

mod collection;

use bson::Bson;

use crate::config::DriverConfig;
use crate::error::{DriverError, DriverResult, Verb};
use crate::identifier::{self, ID_FIELD};
use crate::record::Record;
use crate::storage::{set_operation, DocumentStore, FindAndUpdateOptions, Payload};

pub use collection::{CollectionHandle, CollectionsExt};

#[cfg(feature = "mongodb")]
use crate::storage::MongoStore;

/// Persists [`Record`]s through a [`DocumentStore`].
///
/// Holds only immutable configuration; share it behind an `Arc` for
/// concurrent use.
pub struct RecordDriver<S> {
    config: DriverConfig,
    store: S,
}

#[cfg(feature = "mongodb")]
impl RecordDriver<MongoStore> {
    /// Driver over MongoDB at `config.host`.
    pub fn connect(config: DriverConfig) -> Self {
        let store = MongoStore::new(config.host.clone());
        Self::new(config, store)
    }

    /// Driver from the `mongo` section of an application configuration.
    pub fn from_app_config(config: &serde_json::Value) -> DriverResult<Self> {
        let config = DriverConfig::from_value(config).map_err(|e| {
            tracing::error!(error = %e, "cannot initialize record driver");
            e
        })?;
        Ok(Self::connect(config))
    }
}

impl<S: DocumentStore> RecordDriver<S> {
    pub fn new(config: DriverConfig, store: S) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn require_id<R: Record>(record: &R) -> DriverResult<String> {
        record.id().ok_or(DriverError::IdentifierRequired)
    }

    fn require_valid<R: Record>(record: &R) -> DriverResult<()> {
        record
            .validate()
            .map_err(|invalid| DriverError::Validation(invalid.error))
    }

    /// Insert the record. Stamps the generated id onto it.
    ///
    /// Returns `None` when nothing was inserted.
    #[tracing::instrument(skip_all, fields(verb = %Verb::Create, collection = record.collection()))]
    pub async fn create<'r, R: Record>(&self, record: &'r mut R) -> DriverResult<Option<&'r mut R>> {
        Self::require_valid(record)?;

        let payload = identifier::to_native_payload(record.data().clone())?;
        let outcome = self
            .store
            .create(&self.config.database, record.collection(), Payload::One(payload))
            .await?;

        let Some(id) = outcome.inserted_id.filter(|_| outcome.inserted_count > 0) else {
            tracing::debug!("nothing inserted");
            return Ok(None);
        };

        let mut body = record.data().clone();
        body.insert(ID_FIELD, identifier::to_public(&id));
        record.body(body);
        tracing::debug!(id = %identifier::to_public(&id), "record created");
        Ok(Some(record))
    }

    /// Load the stored document into the record.
    ///
    /// Returns `None` when no document has the record's id.
    #[tracing::instrument(skip_all, fields(verb = %Verb::Read, collection = record.collection()))]
    pub async fn read<'r, R: Record>(&self, record: &'r mut R) -> DriverResult<Option<&'r mut R>> {
        let id = Self::require_id(record)?;
        Self::require_valid(record)?;

        let filter = identifier::id_filter(&id)?;
        let found = self
            .store
            .find(&self.config.database, record.collection(), filter)
            .await?;

        let Some(document) = found.into_iter().next() else {
            tracing::debug!(%id, "record not found");
            return Ok(None);
        };

        record.body(identifier::to_public_body(document));
        Ok(Some(record))
    }

    /// Merge the record's fields into the stored document, then load the
    /// result back into the record.
    ///
    /// When nothing matches, strict mode fails with
    /// [`DriverError::NothingAffected`]; otherwise `None` is returned and the
    /// record is left as it was.
    ///
    /// A record carrying nothing but its id has no fields to set. No write is
    /// sent for it (servers before 5.0 reject an empty `$set`); the stored
    /// document is read back instead.
    #[tracing::instrument(skip_all, fields(verb = %Verb::Update, collection = record.collection()))]
    pub async fn update<'r, R: Record>(&self, record: &'r mut R) -> DriverResult<Option<&'r mut R>> {
        let id = Self::require_id(record)?;
        Self::require_valid(record)?;

        let filter = identifier::id_filter(&id)?;
        let fields = identifier::without_identifiers(record.data().clone());
        let updated = if fields.is_empty() {
            tracing::debug!(%id, "no fields to set, reading stored document");
            self.store
                .find(&self.config.database, record.collection(), filter)
                .await?
                .into_iter()
                .next()
        } else {
            let outcome = self
                .store
                .find_one_and_update(
                    &self.config.database,
                    record.collection(),
                    filter,
                    Bson::Document(set_operation(fields)),
                    FindAndUpdateOptions::default(),
                )
                .await?;
            outcome.value.filter(|_| outcome.ok)
        };

        match updated {
            Some(updated) => {
                record.body(identifier::to_public_body(updated));
                Ok(Some(record))
            }
            _ if self.config.strict => {
                tracing::warn!(%id, "no item to update");
                Err(DriverError::NothingAffected(Verb::Update))
            }
            _ => {
                tracing::debug!(%id, "nothing to update");
                Ok(None)
            }
        }
    }

    /// Delete the stored document. Returns whether one was deleted.
    ///
    /// Strict mode turns "nothing deleted" into
    /// [`DriverError::NothingAffected`].
    #[tracing::instrument(skip_all, fields(verb = %Verb::Delete, collection = record.collection()))]
    pub async fn delete<R: Record>(&self, record: &R) -> DriverResult<bool> {
        let id = Self::require_id(record)?;
        Self::require_valid(record)?;

        let filter = identifier::id_filter(&id)?;
        let outcome = self
            .store
            .delete_one(&self.config.database, record.collection(), filter)
            .await?;

        if outcome.deleted_count == 0 && self.config.strict {
            tracing::warn!(%id, "no item to delete");
            return Err(DriverError::NothingAffected(Verb::Delete));
        }
        Ok(outcome.deleted_count > 0)
    }
}
