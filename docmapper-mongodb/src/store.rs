use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{
    Client, Collection as MongoCollection,
    error::Error as MongoError,
    options::{ClientOptions, FindOptions, ReadPreference, SelectionCriteria},
};
use std::time::Duration;

use docmapper_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    config::{ConnectionConfig, DEFAULT_CONNECT_TIMEOUT},
    error::{DocumentStoreError, DocumentStoreResult},
    query::{Expr, Query},
    update::{ChangeInfo, Update},
};

use crate::query::MongoQueryTranslator;

fn backend_error(err: MongoError) -> DocumentStoreError {
    DocumentStoreError::Backend(err.to_string())
}

/// MongoDB storage backend.
///
/// All operations go through one driver [`Client`], which pools connections and
/// hands each operation its own session.
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    /// Creates a builder connecting to `url` and using `database`.
    pub fn builder(url: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(url, database)
    }

    /// Creates a builder from a validated [`ConnectionConfig`].
    pub fn from_config(config: &ConnectionConfig) -> DocumentStoreResult<MongoDbStoreBuilder> {
        config.validate()?;

        Ok(MongoDbStoreBuilder::new(&config.connection_url(), &config.database)
            .connect_timeout(config.connect_timeout))
    }

    /// Name of the database this store works in.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        let count = documents.len();
        let mut inserted = self
            .get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(backend_error)?
            .inserted_ids;

        (0..count)
            .map(|index| {
                inserted.remove(&index).ok_or_else(|| {
                    DocumentStoreError::Backend(format!("driver reported no id for document {}", index))
                })
            })
            .collect()
    }

    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        let result = self
            .get_collection(collection)
            .replace_one(MongoQueryTranslator::translate(Some(&selector))?, document)
            .await
            .map_err(backend_error)?;

        Ok(ChangeInfo::updated(result.matched_count, result.modified_count))
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        let filter = MongoQueryTranslator::translate(Some(&selector))?;
        let collection = self.get_collection(collection);

        // the server rejects empty update documents
        if update.is_empty() {
            let mut count = collection.count_documents(filter);
            if !multi {
                count = count.limit(1);
            }
            let matched = count.await.map_err(backend_error)?;

            return Ok(ChangeInfo::updated(matched, 0));
        }

        let result = if multi {
            collection
                .update_many(filter, update.to_document())
                .await
        } else {
            collection
                .update_one(filter, update.to_document())
                .await
        }
        .map_err(backend_error)?;

        Ok(ChangeInfo::updated(result.matched_count, result.modified_count))
    }

    async fn delete_documents(&self, selector: Expr, multi: bool, collection: &str) -> DocumentStoreResult<ChangeInfo> {
        let filter = MongoQueryTranslator::translate(Some(&selector))?;
        let collection = self.get_collection(collection);

        let result = if multi {
            collection.delete_many(filter).await
        } else {
            collection.delete_one(filter).await
        }
        .map_err(backend_error)?;

        Ok(ChangeInfo::removed(result.deleted_count))
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        let mut options = FindOptions::default();

        if let Some(limit) = query.limit {
            options.limit = Some(limit as i64);
        }
        if let Some(skip) = query.skip {
            options.skip = Some(skip as u64);
        }
        options.sort = MongoQueryTranslator::sort(&query.sort);

        self.get_collection(collection)
            .find(MongoQueryTranslator::translate(query.filter.as_ref())?)
            .with_options(options)
            .await
            .map_err(backend_error)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(backend_error)
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        self.get_collection(collection)
            .count_documents(MongoQueryTranslator::translate(filter.as_ref())?)
            .await
            .map_err(backend_error)
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        // the server drops missing collections silently
        let existing = self
            .client
            .database(&self.database)
            .list_collection_names()
            .filter(doc! { "name": name })
            .await
            .map_err(backend_error)?;

        if existing.is_empty() {
            return Err(DocumentStoreError::CollectionNotFound(name.to_string()));
        }

        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        let mut names = self
            .client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(backend_error)?;

        names.sort();

        Ok(names)
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        log::info!("closing connection to database {}", self.database);

        self.client.shutdown().await;

        Ok(())
    }
}

/// Establishes a session and verifies it with a `ping`.
///
/// Reads go to the primary, so a client always observes its own writes in order.
pub struct MongoDbStoreBuilder {
    url: String,
    database: String,
    connect_timeout: Duration,
}

impl MongoDbStoreBuilder {
    pub fn new(url: &str, database: &str) -> Self {
        Self {
            url: url.to_string(),
            database: database.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Bounds both connecting and server selection.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let initialization = |e: MongoError| DocumentStoreError::Initialization(e.to_string());

        let mut options = ClientOptions::parse(&self.url)
            .await
            .map_err(initialization)?;

        options.connect_timeout = Some(self.connect_timeout);
        options.server_selection_timeout = Some(self.connect_timeout);
        options.selection_criteria = Some(SelectionCriteria::ReadPreference(ReadPreference::Primary));

        let client = Client::with_options(options).map_err(initialization)?;

        client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(initialization)?;

        log::info!("connected to database {}", self.database);

        Ok(MongoDbStore::new(client, self.database))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn malformed_urls_fail_to_initialize() {
        let result = MongoDbStore::builder("not-a-mongodb-url", "shop")
            .connect_timeout(Duration::from_millis(100))
            .build()
            .await;

        assert!(matches!(result, Err(DocumentStoreError::Initialization(_))));
    }

    #[test]
    fn invalid_configs_are_rejected_before_connecting() {
        let config = ConnectionConfig::new("shop").port(0);

        assert!(matches!(
            MongoDbStore::from_config(&config),
            Err(DocumentStoreError::InvalidConfiguration(_))
        ));
    }
}
