//! Identifier normalization between records and storage.
//!
//! Records expose a public string identifier under [`ID_FIELD`]. Storage keys
//! documents by a native [`ObjectId`] under [`NATIVE_ID_FIELD`]. Every request
//! crossing into storage goes through [`to_native`] / [`native_filter`], every
//! document coming back goes through [`to_public_body`].

use bson::oid::ObjectId;
use bson::{Bson, Document};

use crate::storage::{StoreError, StoreResult};

/// Public identifier field on a record.
pub const ID_FIELD: &str = "id";

/// Backend-native identifier field on a stored document.
pub const NATIVE_ID_FIELD: &str = "_id";

/// Convert a string identifier into an `ObjectId`. Other values pass through.
pub fn to_native(value: Bson) -> StoreResult<Bson> {
    match value {
        Bson::String(hex) => ObjectId::parse_str(&hex)
            .map(Bson::ObjectId)
            .map_err(|_| StoreError::InvalidIdentifier(hex)),
        other => Ok(other),
    }
}

/// Render a stored identifier as the record's public string form.
pub fn to_public(value: &Bson) -> String {
    match value {
        Bson::ObjectId(oid) => oid.to_hex(),
        Bson::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Rewrite a string `_id` in a filter to its native form.
pub fn native_filter(mut filter: Document) -> StoreResult<Document> {
    if let Some(id) = filter.remove(NATIVE_ID_FIELD) {
        filter.insert(NATIVE_ID_FIELD, to_native(id)?);
    }
    Ok(filter)
}

/// Build the `{ _id: <native> }` filter for a public identifier.
pub fn id_filter(id: &str) -> StoreResult<Document> {
    let mut filter = Document::new();
    filter.insert(NATIVE_ID_FIELD, to_native(Bson::String(id.to_string()))?);
    Ok(filter)
}

/// Turn a record payload into an insertable document: `id` becomes a native `_id`.
pub fn to_native_payload(mut data: Document) -> StoreResult<Document> {
    if let Some(id) = data.remove(ID_FIELD) {
        data.insert(NATIVE_ID_FIELD, to_native(id)?);
    }
    native_filter(data)
}

/// Strip both identifier fields, leaving only the fields an update may set.
pub fn without_identifiers(mut data: Document) -> Document {
    data.remove(ID_FIELD);
    data.remove(NATIVE_ID_FIELD);
    data
}

/// Turn a stored document into a record body: `_id` becomes a string `id`.
pub fn to_public_body(mut document: Document) -> Document {
    let Some(native) = document.remove(NATIVE_ID_FIELD) else {
        return document;
    };

    let mut body = Document::new();
    body.insert(ID_FIELD, to_public(&native));
    for (field, value) in document {
        if field != ID_FIELD {
            body.insert(field, value);
        }
    }
    body
}
