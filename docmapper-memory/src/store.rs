//! In-memory storage implementation.
//!
//! Collections are vectors of BSON documents in insertion order behind an
//! async-aware read-write lock. Every operation scans the whole collection.

use async_trait::async_trait;
use bson::{Bson, Document, oid::ObjectId};
use mea::rwlock::RwLock;
use std::{collections::HashMap, sync::Arc};

use docmapper_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    update::{ChangeInfo, Update},
};

use crate::evaluator::{DocumentEvaluator, compare_documents};

const ID_FIELD: &str = "_id";

type StoreMap = HashMap<String, Vec<Document>>;

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses an `Arc`-wrapped internal state. Clones
/// share the same data, so a test can keep a clone to inspect what a
/// [`Connection`](docmapper_core::connection::Connection) wrote.
///
/// Documents inserted without an `_id` get a fresh [`ObjectId`]. A selector
/// that names a missing collection matches nothing.
///
/// # Example
///
/// ```ignore
/// use docmapper_memory::InMemoryStore;
/// use docmapper::{backend::StoreBackend, query::Filter};
/// use bson::doc;
///
/// let store = InMemoryStore::new();
///
/// store.insert_documents(vec![doc! { "name": "Alice", "age": 30 }], "users").await?;
/// assert_eq!(store.count_documents(Some(Filter::gt("age", 18)), "users").await?, 1);
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection name -> documents in insertion order
    store: Arc<RwLock<StoreMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self { store: Arc::new(RwLock::new(StoreMap::new())) }
    }

    /// Creates a builder, for code written against [`StoreBackendBuilder`].
    pub fn builder() -> InMemoryStoreBuilder {
        InMemoryStoreBuilder
    }

    /// Returns a copy of every document in `collection`, in insertion order.
    pub async fn snapshot(&self, collection: &str) -> Vec<Document> {
        self.store
            .read()
            .await
            .get(collection)
            .cloned()
            .unwrap_or_default()
    }
}

fn matching_positions(
    documents: &[Document],
    selector: &Expr,
    multi: bool,
) -> DocumentStoreResult<Vec<usize>> {
    let mut positions = Vec::new();

    for (position, document) in documents.iter().enumerate() {
        if DocumentEvaluator::new(document).evaluate(selector)? {
            positions.push(position);

            if !multi {
                break;
            }
        }
    }

    Ok(positions)
}

fn id_taken(documents: &[Document], id: &Bson) -> bool {
    documents
        .iter()
        .any(|document| document.get(ID_FIELD) == Some(id))
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn insert_documents(
        &self,
        documents: Vec<Document>,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Bson>> {
        let mut store = self.store.write().await;
        let stored = store
            .entry(collection.to_string())
            .or_default();

        let mut ids = Vec::with_capacity(documents.len());

        for mut document in documents {
            let id = match document.get(ID_FIELD) {
                Some(id) => id.clone(),
                None => {
                    let id = Bson::ObjectId(ObjectId::new());
                    document.insert(ID_FIELD, id.clone());
                    id
                }
            };

            if id_taken(stored, &id) {
                return Err(DocumentStoreError::DocumentAlreadyExists(
                    id.to_string(),
                    collection.to_string(),
                ));
            }

            stored.push(document);
            ids.push(id);
        }

        log::trace!("inserted {} documents into {}", ids.len(), collection);

        Ok(ids)
    }

    async fn replace_document(
        &self,
        selector: Expr,
        mut document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(ChangeInfo::default());
        };

        let Some(&position) = matching_positions(stored, &selector, false)?.first() else {
            return Ok(ChangeInfo::default());
        };

        let current = &mut stored[position];

        if let Some(old) = current.get(ID_FIELD).cloned() {
            match document.get(ID_FIELD) {
                Some(new) if *new != old => {
                    return Err(DocumentStoreError::InvalidUpdate(format!(
                        "replacement would change {} from {} to {}",
                        ID_FIELD, old, new
                    )));
                }
                Some(_) => {}
                None => {
                    document.insert(ID_FIELD, old);
                }
            }
        }

        let modified = u64::from(*current != document);
        *current = document;

        Ok(ChangeInfo::updated(1, modified))
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        if update.set.contains_key(ID_FIELD) || update.unset.iter().any(|field| field == ID_FIELD) {
            return Err(DocumentStoreError::InvalidUpdate(format!(
                "{} cannot be updated",
                ID_FIELD
            )));
        }

        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(ChangeInfo::default());
        };

        let positions = matching_positions(stored, &selector, multi)?;
        let mut modified = 0;

        for &position in &positions {
            if update.apply(&mut stored[position]) {
                modified += 1;
            }
        }

        Ok(ChangeInfo::updated(positions.len() as u64, modified))
    }

    async fn delete_documents(
        &self,
        selector: Expr,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        let mut store = self.store.write().await;
        let Some(stored) = store.get_mut(collection) else {
            return Ok(ChangeInfo::default());
        };

        let positions = matching_positions(stored, &selector, multi)?;

        for &position in positions.iter().rev() {
            stored.remove(position);
        }

        log::trace!("removed {} documents from {}", positions.len(), collection);

        Ok(ChangeInfo::removed(positions.len() as u64))
    }

    async fn query_documents(
        &self,
        query: Query,
        collection: &str,
    ) -> DocumentStoreResult<Vec<Document>> {
        let store = self.store.read().await;
        let Some(stored) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut documents = Vec::new();

        for document in stored {
            if DocumentEvaluator::matches(document, query.filter.as_ref())? {
                documents.push(document.clone());
            }
        }

        // stable, so ties keep insertion order
        if !query.sort.is_empty() {
            documents.sort_by(|a, b| compare_documents(a, b, &query.sort));
        }

        Ok(documents
            .into_iter()
            .skip(query.skip.unwrap_or(0))
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    async fn count_documents(
        &self,
        filter: Option<Expr>,
        collection: &str,
    ) -> DocumentStoreResult<u64> {
        let store = self.store.read().await;
        let Some(stored) = store.get(collection) else {
            return Ok(0);
        };

        let mut count = 0;

        for document in stored {
            if DocumentEvaluator::matches(document, filter.as_ref())? {
                count += 1;
            }
        }

        Ok(count)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        let mut store = self.store.write().await;

        if store.remove(name).is_none() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names: Vec<String> = self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect();

        names.sort();

        Ok(names)
    }
}

/// Builder for constructing [`InMemoryStore`] instances.
#[derive(Default)]
pub struct InMemoryStoreBuilder;

#[async_trait]
impl StoreBackendBuilder for InMemoryStoreBuilder {
    type Backend = InMemoryStore;

    /// Builds a fresh, empty store. Always succeeds.
    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        Ok(InMemoryStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use docmapper_core::query::Filter;

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::new();

        store
            .insert_documents(
                vec![
                    doc! { "_id": 1, "name": "ann", "age": 31 },
                    doc! { "_id": 2, "name": "bob", "age": 17 },
                    doc! { "_id": 3, "name": "cid", "age": 45 },
                ],
                "people",
            )
            .await
            .unwrap();

        store
    }

    #[tokio::test]
    async fn insert_generates_missing_ids_and_rejects_duplicates() {
        let store = InMemoryStore::new();

        let ids = store
            .insert_documents(vec![doc! { "name": "ann" }], "people")
            .await
            .unwrap();
        assert!(matches!(ids[0], Bson::ObjectId(_)));

        let duplicate = store
            .insert_documents(vec![doc! { "_id": ids[0].clone() }], "people")
            .await;
        assert!(matches!(duplicate, Err(DocumentStoreError::DocumentAlreadyExists(_, _))));
    }

    #[tokio::test]
    async fn replace_keeps_id_and_reports_matches() {
        let store = seeded().await;

        let info = store
            .replace_document(Filter::eq("_id", 2), doc! { "name": "bobby" }, "people")
            .await
            .unwrap();
        assert_eq!(info, ChangeInfo::updated(1, 1));
        assert_eq!(store.snapshot("people").await[1], doc! { "name": "bobby", "_id": 2 });

        let info = store
            .replace_document(Filter::eq("_id", 9), doc! { "name": "x" }, "people")
            .await
            .unwrap();
        assert_eq!(info.matched, 0);
    }

    #[tokio::test]
    async fn update_single_and_multi() {
        let store = seeded().await;

        let info = store
            .update_documents(Filter::gt("age", 18), Update::new().set("adult", true), false, "people")
            .await
            .unwrap();
        assert_eq!(info, ChangeInfo::updated(1, 1));

        let info = store
            .update_documents(Filter::gt("age", 18), Update::new().set("adult", true), true, "people")
            .await
            .unwrap();
        assert_eq!(info, ChangeInfo::updated(2, 1));

        let rejected = store
            .update_documents(Filter::all(), Update::new().set("_id", 5), true, "people")
            .await;
        assert!(matches!(rejected, Err(DocumentStoreError::InvalidUpdate(_))));
    }

    #[tokio::test]
    async fn delete_single_and_multi() {
        let store = seeded().await;

        let info = store
            .delete_documents(Filter::gt("age", 18), false, "people")
            .await
            .unwrap();
        assert_eq!(info.removed, 1);

        let info = store
            .delete_documents(Filter::all(), true, "people")
            .await
            .unwrap();
        assert_eq!(info.removed, 2);

        let info = store
            .delete_documents(Filter::all(), true, "nowhere")
            .await
            .unwrap();
        assert_eq!(info.removed, 0);
    }

    #[tokio::test]
    async fn query_sorts_skips_and_limits() {
        let store = seeded().await;

        let query = Query::builder()
            .sort_key("-age")
            .skip(1)
            .limit(1)
            .build();
        let documents = store.query_documents(query, "people").await.unwrap();

        assert_eq!(documents, vec![doc! { "_id": 1, "name": "ann", "age": 31 }]);
        assert_eq!(
            store.count_documents(Some(Filter::lt("age", 40)), "people").await.unwrap(),
            2
        );
        assert_eq!(store.count_documents(None, "people").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn collections_are_listed_and_dropped() {
        let store = seeded().await;

        assert_eq!(store.list_collections().await.unwrap(), vec!["people"]);

        store.drop_collection("people").await.unwrap();

        assert!(store.list_collections().await.unwrap().is_empty());
        assert!(matches!(
            store.drop_collection("people").await,
            Err(DocumentStoreError::CollectionNotFound(_))
        ));
    }
}
