//! Collection handles over a storage backend.
//!
//! Collections are cheap views: a name plus a borrowed backend. They perform reads
//! and the bulk mutations, none of which run lifecycle hooks. Per-record saves
//! and deletes go through a [`Mapper`](crate::mapper::Mapper) instead.
//!
//! # Collection Types
//!
//! - [`Collection`] - Untyped collection over raw BSON documents
//! - [`TypedCollection`] - Collection decoding documents into a record type
//!
//! # Example
//!
//! ```ignore
//! let users = connection.typed_collection::<User>("users");
//!
//! let adults = users
//!     .find_all(Query::builder().filter(Filter::gte("age", 18)).sort_key("-age").build())
//!     .await?;
//! let removed = users.delete_all(Filter::lt("age", 18)).await?.removed;
//! ```

use bson::{Bson, Document};
use std::marker::PhantomData;

use crate::{
    backend::StoreBackend,
    encoding::{from_document, to_document},
    error::DocumentStoreResult,
    query::{Expr, Filter, IntoFilter, Query},
    record::{DEFAULT_IDENTITY_FIELD, Record},
    update::{ChangeInfo, Update},
};

/// An untyped collection with a reference to a storage backend.
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts documents, returning their `_id`s.
    pub async fn insert_all(&self, documents: Vec<Document>) -> DocumentStoreResult<Vec<Bson>> {
        log::debug!("inserting {} documents into {}", documents.len(), self.name);

        self.backend
            .insert_documents(documents, &self.name)
            .await
    }

    /// Returns the documents matching the query.
    pub async fn find(&self, query: Query) -> DocumentStoreResult<Vec<Document>> {
        self.backend
            .query_documents(query, &self.name)
            .await
    }

    /// Returns the first document matching the filter.
    pub async fn find_one(&self, filter: impl IntoFilter) -> DocumentStoreResult<Option<Document>> {
        let query = Query::builder()
            .filter(filter.into_filter()?)
            .limit(1)
            .build();

        Ok(self
            .find(query)
            .await?
            .into_iter()
            .next())
    }

    /// Counts the documents matching the filter.
    pub async fn count(&self, filter: impl IntoFilter) -> DocumentStoreResult<u64> {
        let filter = filter.into_filter()?;

        self.backend
            .count_documents((!filter.matches_all()).then_some(filter), &self.name)
            .await
    }

    /// Applies `update` to every document matching `selector`.
    pub async fn update_all(
        &self,
        selector: impl IntoFilter,
        update: Update,
    ) -> DocumentStoreResult<ChangeInfo> {
        let selector = selector.into_filter()?;

        log::debug!("updating all matching documents in {}", self.name);

        self.backend
            .update_documents(selector, update, true, &self.name)
            .await
    }

    /// Removes every document matching `selector`.
    pub async fn delete_all(&self, selector: impl IntoFilter) -> DocumentStoreResult<ChangeInfo> {
        let selector = selector.into_filter()?;

        log::debug!("deleting all matching documents in {}", self.name);

        self.backend
            .delete_documents(selector, true, &self.name)
            .await
    }
}

/// A collection whose documents decode into `R`.
///
/// Bulk operations on this type (`insert_all`, `update_all`, `delete_all`) never
/// run the records' lifecycle hooks.
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, R: Record> {
    name: String,
    identity_field: String,
    backend: &'a B,
    _marker: PhantomData<R>,
}

impl<'a, B: StoreBackend, R: Record> TypedCollection<'a, B, R> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self {
            name,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            backend,
            _marker: PhantomData,
        }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the field [`find_by_identity`](Self::find_by_identity) selects on.
    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    /// Selects by `field` instead of `_id` in [`find_by_identity`](Self::find_by_identity).
    pub fn with_identity_field(mut self, field: impl Into<String>) -> Self {
        self.identity_field = field.into();
        self
    }

    /// Views the same collection as a different record type.
    pub fn with_type<T: Record>(&self) -> TypedCollection<'a, B, T> {
        TypedCollection {
            name: self.name.clone(),
            identity_field: self.identity_field.clone(),
            backend: self.backend,
            _marker: PhantomData,
        }
    }

    /// Views the same collection without decoding.
    pub fn untyped(&self) -> Collection<'a, B> {
        Collection::new(self.name.clone(), self.backend)
    }

    /// Returns the first record matching an example record or raw filter.
    pub async fn find_one(&self, example: impl IntoFilter) -> DocumentStoreResult<Option<R>> {
        self.untyped()
            .find_one(example)
            .await?
            .map(from_document)
            .transpose()
    }

    /// Returns the records matching the query, after its skip, limit and sort.
    pub async fn find_all(&self, query: Query) -> DocumentStoreResult<Vec<R>> {
        self.untyped()
            .find(query)
            .await?
            .into_iter()
            .map(from_document)
            .collect()
    }

    /// Returns the record whose identity field equals `id`.
    pub async fn find_by_identity(&self, id: impl Into<Bson>) -> DocumentStoreResult<Option<R>> {
        self.find_one(Filter::identity(self.identity_field.as_str(), id))
            .await
    }

    /// Counts the records matching an example record or raw filter.
    pub async fn count(&self, example: impl IntoFilter) -> DocumentStoreResult<u64> {
        self.untyped().count(example).await
    }

    /// Inserts records as they are. Hooks are not run.
    pub async fn insert_all(&self, records: &[R]) -> DocumentStoreResult<Vec<Bson>> {
        let documents = records
            .iter()
            .map(to_document)
            .collect::<DocumentStoreResult<Vec<Document>>>()?;

        self.untyped()
            .insert_all(documents)
            .await
    }

    /// Applies `update` to every matching document. Hooks are not run.
    pub async fn update_all(
        &self,
        selector: impl IntoFilter,
        update: Update,
    ) -> DocumentStoreResult<ChangeInfo> {
        self.untyped()
            .update_all(selector, update)
            .await
    }

    /// Removes every matching document. Hooks are not run.
    pub async fn delete_all(&self, selector: impl IntoFilter) -> DocumentStoreResult<ChangeInfo> {
        self.untyped().delete_all(selector).await
    }

    /// Removes every document of the collection. Hooks are not run.
    pub async fn clear(&self) -> DocumentStoreResult<ChangeInfo> {
        self.delete_all(Expr::And(Vec::new())).await
    }
}
