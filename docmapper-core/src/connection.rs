//! The connection handle every collection and mapper is created from.
//!
//! A [`Connection`] owns one backend. There is no global connection: the handle is
//! created explicitly (usually from a [`StoreBackendBuilder`](crate::backend::StoreBackendBuilder))
//! and passed to whoever needs it, so tests can run several independent ones.
//!
//! # Example
//!
//! ```ignore
//! use docmapper::prelude::*;
//!
//! let connection = Connection::new(InMemoryStore::new());
//!
//! let mut user = User { name: "ann".into(), ..Default::default() };
//! connection.mapper(&mut user).save().await?;
//!
//! let found = connection.find_one(&User { name: "ann".into(), ..Default::default() }).await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, TypedCollection},
    error::DocumentStoreResult,
    mapper::Mapper,
    query::{Filter, Query},
    record::{Record, Resolver},
};

/// An explicit handle to one document database.
#[derive(Debug)]
pub struct Connection<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> Connection<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the underlying backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets an untyped collection with the given name.
    pub fn collection(&self, name: &str) -> Collection<'_, B> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Gets a collection with the given name whose documents decode into `R`.
    pub fn typed_collection<R: Record>(&self, name: &str) -> TypedCollection<'_, B, R> {
        TypedCollection::new(name.to_string(), &self.backend)
    }

    /// Gets the collection `record` belongs to, selecting by its identity field.
    ///
    /// # Errors
    ///
    /// Returns [`MissingCollectionName`](crate::error::DocumentStoreError::MissingCollectionName)
    /// if the record does not name its collection.
    pub fn collection_of<R: Record>(
        &self,
        record: &R,
    ) -> DocumentStoreResult<TypedCollection<'_, B, R>> {
        let resolution = Resolver::resolve(record)?;

        Ok(self
            .typed_collection(&resolution.collection)
            .with_identity_field(resolution.identity_field))
    }

    /// Creates a mapper for a record that may or may not be stored yet.
    pub fn mapper<'r, R: Record>(&self, record: &'r mut R) -> Mapper<'_, 'r, B, R> {
        Mapper::new(&self.backend, record)
    }

    /// Creates a mapper for a record just loaded from the store.
    ///
    /// The mapper starts as not new and remembers the record's current encoding,
    /// so a later save only sends the fields that changed.
    pub fn mapper_loaded<'r, R: Record>(
        &self,
        record: &'r mut R,
    ) -> DocumentStoreResult<Mapper<'_, 'r, B, R>> {
        Mapper::loaded(&self.backend, record)
    }

    /// Saves `record` with a one-off mapper: inserts it when its identity is empty
    /// and updates it otherwise.
    pub async fn save<R: Record>(&self, record: &mut R) -> DocumentStoreResult<()> {
        self.mapper(record).save().await
    }

    /// Deletes `record` with a one-off mapper.
    pub async fn delete<R: Record>(&self, record: &mut R) -> DocumentStoreResult<()> {
        self.mapper(record).delete().await
    }

    /// Returns the first stored record equal to `example` on every field it emits.
    pub async fn find_one<R: Record>(&self, example: &R) -> DocumentStoreResult<Option<R>> {
        self.collection_of(example)?
            .find_one(example)
            .await
    }

    /// Returns every stored record matching `example`, narrowed by the query's own
    /// filter and shaped by its skip, limit and sort.
    pub async fn find_all<R: Record>(&self, example: &R, query: Query) -> DocumentStoreResult<Vec<R>> {
        let collection = self.collection_of(example)?;
        let query = query.and_filter(Filter::example(example)?);

        collection.find_all(query).await
    }

    /// Counts the stored records matching `example`.
    pub async fn count<R: Record>(&self, example: &R) -> DocumentStoreResult<u64> {
        self.collection_of(example)?
            .count(example)
            .await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(&self.backend).await
    }

    /// Drops a collection and all its documents.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(&self.backend, name).await
    }

    /// Shuts down the connection and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(self.backend).await
    }
}

impl<B: StoreBackend + 'static> Connection<B> {
    /// Erases the backend type.
    pub fn into_dyn(self) -> Connection<Box<dyn DynStoreBackend>> {
        Connection::new(Box::new(self.backend))
    }
}

impl Connection<Box<dyn DynStoreBackend>> {
    /// Returns the backend as `T` if that is its concrete type.
    pub fn downcast_backend<T: 'static>(&self) -> Option<&T> {
        DynStoreBackend::as_any(&*self.backend).downcast_ref::<T>()
    }
}
