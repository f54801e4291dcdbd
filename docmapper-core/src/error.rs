//! Error types and result types for mapper and document store operations.
//!
//! Every stage of a mapped operation is fail-fast: the first error aborts the
//! remaining stages and is returned to the caller unchanged. Errors raised by
//! lifecycle hooks keep the original hook error as their [`source`](std::error::Error::source).
//! Use [`DocumentStoreResult<T>`] as the return type for fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use std::error::Error as StdError;
use thiserror::Error;

use crate::hooks::HookStage;

/// The error type lifecycle hooks return. It is opaque to the mapper.
pub type HookError = Box<dyn StdError + Send + Sync + 'static>;

/// Represents all possible errors that can occur when interacting with a document store.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between record and document formats.
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// The connection could not be established.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// The connection configuration is malformed or incomplete.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    /// A value was handed to a mutating operation that cannot act as a document record.
    ///
    /// Always raised before any hook runs or any backend call is made.
    #[error("Precondition failed: {0}")]
    Precondition(String),
    /// The record type does not expose a (non-empty) collection name.
    #[error("Could not resolve a collection name for {0}")]
    MissingCollectionName(String),
    /// The record has no identity where one is required (update path or delete).
    #[error("Could not resolve an identity for {0}")]
    MissingIdentity(String),
    /// A lifecycle hook returned an error. The operation stopped at this stage.
    #[error("{stage} hook failed: {source}")]
    Hook {
        /// The stage whose hook failed.
        stage: HookStage,
        /// The error returned by the hook, untouched.
        #[source]
        source: HookError,
    },
    /// A document with the given identity already exists in the collection.
    /// The first argument is the identity, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// No document matched the identity selector.
    /// The first argument is the identity, the second is the collection name.
    #[error("Document not found {0} in collection {1}")]
    DocumentNotFound(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document has an invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The update document cannot be applied.
    #[error("Invalid update: {0}")]
    InvalidUpdate(String),
    /// An error occurred in the underlying storage backend or driver.
    #[error("Backend error: {0}")]
    Backend(String),
}

impl DocumentStoreError {
    /// Wraps an error returned by the hook registered for `stage`.
    pub fn hook(stage: HookStage, source: HookError) -> Self {
        DocumentStoreError::Hook { stage, source }
    }

    /// Returns the stage of a failed hook, if this is a hook error.
    pub fn hook_stage(&self) -> Option<HookStage> {
        match self {
            DocumentStoreError::Hook { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Returns the error the hook returned, so callers can downcast it to their own type.
    ///
    /// ```ignore
    /// if let Some(err) = error.hook_source().and_then(|e| e.downcast_ref::<ValidationError>()) {
    ///     // ...
    /// }
    /// ```
    pub fn hook_source(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            DocumentStoreError::Hook { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }

    /// Whether the failed operation is known to have had no effect on the store.
    ///
    /// Only precondition, resolution and pre-hook failures guarantee that. Anything
    /// else may have left a partial effect behind, since post hooks run after the
    /// mutation and nothing is rolled back.
    pub fn is_side_effect_free(&self) -> bool {
        match self {
            DocumentStoreError::Precondition(_)
            | DocumentStoreError::MissingCollectionName(_)
            | DocumentStoreError::MissingIdentity(_)
            | DocumentStoreError::InvalidConfiguration(_) => true,
            DocumentStoreError::Hook { stage, .. } => stage.is_pre(),
            _ => false,
        }
    }
}

/// A specialized `Result` type for document store operations.
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}
