//! Conversion between records and BSON documents.
//!
//! Encoding is delegated to serde and `bson`. Which fields a record emits is decided
//! by its serde attributes, not by the mapper: a field marked
//! `#[serde(skip_serializing_if = "...")]` is left out when its predicate holds, and
//! a left-out field does not take part in example filters or diffs. This is the
//! contract for what counts as a "set" field.

use bson::{Bson, Document, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};
use std::any::type_name;

use crate::{
    error::{DocumentStoreError, DocumentStoreResult},
    record::Record,
    update::Update,
};

/// Encodes a value into a BSON document.
///
/// # Errors
///
/// Returns [`DocumentStoreError::Precondition`] if the value does not encode to a
/// document (for example a newtype over an integer), and
/// [`DocumentStoreError::Serialization`] if encoding fails.
pub fn to_document<T: Serialize>(value: &T) -> DocumentStoreResult<Document> {
    match serialize_to_bson(value)? {
        Bson::Document(document) => Ok(document),
        other => Err(DocumentStoreError::Precondition(format!(
            "{} encodes to {:?}, not a document",
            type_name::<T>(),
            other.element_type()
        ))),
    }
}

/// Decodes a BSON document into a value.
pub fn from_document<T: DeserializeOwned>(document: Document) -> DocumentStoreResult<T> {
    Ok(deserialize_from_bson(Bson::Document(document))?)
}

/// Lists the fields a value emits, in emission order.
pub fn emitted_fields<T: Serialize>(value: &T) -> DocumentStoreResult<Vec<String>> {
    Ok(to_document(value)?
        .keys()
        .cloned()
        .collect())
}

/// Computes the update that turns `before` into `after`.
///
/// Fields that are new or changed in `after` are set; fields missing from `after`
/// are unset. Nested documents are compared as whole values.
pub fn diff(before: &Document, after: &Document) -> Update {
    let mut update = Update::new();

    for (key, value) in after {
        if before.get(key) != Some(value) {
            update = update.set(key.clone(), value.clone());
        }
    }

    for key in before.keys() {
        if !after.contains_key(key) {
            update = update.unset(key.clone());
        }
    }

    update
}

/// Extension trait providing conversion helpers for records.
///
/// Automatically implemented for all types that implement [`Record`].
pub trait RecordExt: Record + Sized {
    /// Converts this record to a BSON document.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Creates a record from a BSON document.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Converts this record to a JSON value.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Creates a record from a JSON value.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<R: Record> RecordExt for R {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        to_document(self)
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        from_document(document)
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        Ok(to_value(self)?)
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        Ok(from_value(value)?)
    }
}
