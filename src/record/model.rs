//! Model - schema-checked document record.

use std::sync::Arc;

use bson::Document;

use super::{Invalid, Record, Schema};

/// A record whose payload is validated against a shared [`Schema`].
///
/// ```
/// use std::sync::Arc;
/// use record_driver::{doc, FieldKind, FieldRule, Model, Record, Schema};
///
/// let schema = Arc::new(Schema::new().field("firstname", FieldRule::optional(FieldKind::String)));
/// let user = Model::new("users", schema, doc! { "firstname": "toto" });
/// assert!(user.valid());
/// ```
#[derive(Debug, Clone)]
pub struct Model {
    collection: String,
    schema: Arc<Schema>,
    data: Document,
}

impl Model {
    pub fn new(collection: impl Into<String>, schema: Arc<Schema>, data: Document) -> Self {
        Self {
            collection: collection.into(),
            schema,
            data,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn into_data(self) -> Document {
        self.data
    }
}

impl Record for Model {
    fn collection(&self) -> &str {
        &self.collection
    }

    fn data(&self) -> &Document {
        &self.data
    }

    fn validate(&self) -> Result<(), Invalid> {
        self.schema.validate(&self.data)
    }

    fn body(&mut self, replacement: Document) {
        self.data = replacement;
    }
}
