//! Storage backend abstraction.
//!
//! This module defines the traits that abstract over database drivers, so the
//! mapper works the same against MongoDB, the in-memory store, or a test double.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: Object-safe twin of [`StoreBackend`] for dynamic dispatch
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use docmapper::backend::StoreBackend;
//! use docmapper::query::Filter;
//! use bson::doc;
//!
//! let backend = MyBackendImpl::new();
//!
//! backend.insert_documents(vec![doc! { "name": "Alice", "age": 30 }], "users").await?;
//! let info = backend.delete_documents(Filter::eq("name", "Alice"), false, "users").await?;
//! assert_eq!(info.removed, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{any::Any, fmt::Debug};

use crate::{
    error::DocumentStoreResult,
    query::{Expr, Query},
    update::{ChangeInfo, Update},
};

/// Abstract interface for document storage backends.
///
/// Every mutation takes a selector expression; the mapper always selects by identity,
/// bulk operations select by whatever the caller passes.
///
/// # Thread Safety
///
/// Implementations must be thread-safe. A backend is shared by every collection,
/// mapper and query created from the same [`Connection`](crate::connection::Connection).
///
/// # Error Handling
///
/// Driver failures are reported as [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend)
/// with the driver's message. A selector matching nothing is not an error at this
/// level; callers decide from the returned [`ChangeInfo`].
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts documents into a collection, creating it if needed.
    ///
    /// Documents without an `_id` are given a generated one. Returns the `_id` of
    /// every inserted document, in input order.
    ///
    /// Returns [`DocumentAlreadyExists`](crate::error::DocumentStoreError::DocumentAlreadyExists)
    /// if an `_id` is already taken.
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;

    /// Replaces the first document matching `selector` with `document`.
    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;

    /// Applies `update` to the first matching document, or to all of them when
    /// `multi` is set.
    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;

    /// Removes the first matching document, or all of them when `multi` is set.
    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;

    /// Returns the documents matching the query, sorted, skipped and limited.
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;

    /// Counts the documents matching `filter`, or all documents when `None`.
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;

    /// Drops a collection and all its documents.
    ///
    /// Returns [`CollectionNotFound`](crate::error::DocumentStoreError::CollectionNotFound)
    /// if the collection does not exist.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Releases the backend's resources.
    ///
    /// The default implementation is a no-op, but backends with external
    /// connections should override this.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        (*self)
            .insert_documents(documents, collection)
            .await
    }

    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        (*self)
            .replace_document(selector, document, collection)
            .await
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        (*self)
            .update_documents(selector, update, multi, collection)
            .await
    }

    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        (*self)
            .delete_documents(selector, multi, collection)
            .await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        (*self)
            .query_documents(query, collection)
            .await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        (*self)
            .count_documents(filter, collection)
            .await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections().await
    }
}

#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>>;
    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;
    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;
    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo>;
    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>>;
    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        StoreBackend::replace_document(self, selector, document, collection).await
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        StoreBackend::update_documents(self, selector, update, multi, collection).await
    }

    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        StoreBackend::delete_documents(self, selector, multi, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        StoreBackend::query_documents(self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        StoreBackend::count_documents(self, filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Boxed backends are backends too, so a [`Connection`](crate::connection::Connection)
/// can be erased to `Connection<Box<dyn DynStoreBackend>>`.
#[async_trait]
impl StoreBackend for Box<dyn DynStoreBackend> {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        DynStoreBackend::insert_documents(&**self, documents, collection).await
    }

    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        DynStoreBackend::replace_document(&**self, selector, document, collection).await
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        DynStoreBackend::update_documents(&**self, selector, update, multi, collection).await
    }

    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        DynStoreBackend::delete_documents(&**self, selector, multi, collection).await
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        DynStoreBackend::query_documents(&**self, query, collection).await
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        DynStoreBackend::count_documents(&**self, filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        DynStoreBackend::drop_collection(&**self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        DynStoreBackend::list_collections(&**self).await
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        DynStoreBackend::shutdown_boxed(self).await
    }
}

#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
