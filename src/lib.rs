//! Record driver for MongoDB.
//!
//! Binds any [`Record`] (a validated document with a declared collection) to
//! a [`DocumentStore`] and exposes `create`, `read`, `update` and `delete`
//! through [`RecordDriver`]. Public string ids on records and native
//! `ObjectId`s in storage are converted at both boundaries.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use record_driver::{doc, DriverConfig, FieldKind, FieldRule, Model, RecordDriver, Schema};
//!
//! let config = DriverConfig::new("app", "mongodb://localhost:27017").with_strict(true);
//! let driver = RecordDriver::connect(config);
//!
//! let users = Arc::new(Schema::new()
//!     .field("id", FieldRule::optional(FieldKind::Any))
//!     .field("firstname", FieldRule::optional(FieldKind::String)));
//!
//! let mut user = Model::new("users", users, doc! { "firstname": "toto" });
//! driver.create(&mut user).await?;
//! ```

mod config;
mod driver;
mod error;
pub mod identifier;
mod record;
pub mod storage;

pub use config::{ConfigError, DriverConfig, CONFIG_SECTION};
pub use driver::{CollectionHandle, CollectionsExt, RecordDriver};
pub use error::{DriverError, DriverResult, Verb};
pub use record::{FieldKind, FieldRule, Invalid, Model, Record, Schema};
pub use storage::{
    DeleteOutcome, DocumentStore, FindAndUpdateOptions, FindAndUpdateOutcome, InMemoryStore,
    InsertOutcome, Payload, StoreError, StoreResult, UpdateOutcome,
};

#[cfg(feature = "mongodb")]
pub use storage::MongoStore;

// Re-export bson so callers build documents with the same version
pub use bson::{self, doc, oid::ObjectId, Bson, Document};
