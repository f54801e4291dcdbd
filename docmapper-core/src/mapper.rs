//! Identity-driven save and delete with lifecycle hooks.
//!
//! A [`Mapper`] borrows one record and persists it. The first operation resolves
//! the record's collection and decides whether the record is new; the answer is
//! kept for the mapper's lifetime.
//!
//! ```text
//! Unresolved ──resolve, empty identity──▶ Resolved(new) ──insert──▶ Resolved(stored)
//!      └──────resolve, identity set────────────────────────────────▶ Resolved(stored)
//! ```
//!
//! When the store generates the identity of a record that emitted none, the mapper
//! keeps it and selects by it on later saves and deletes. The record itself is not
//! changed.
//!
//! Records loaded from the store start in `Resolved(stored)` (see
//! [`Connection::mapper_loaded`](crate::connection::Connection::mapper_loaded)).
//! Nothing moves a mapper back to new except [`Mapper::attach`]ing another record.
//!
//! | Path | Stages |
//! |---|---|
//! | insert | `PreInsert`, insert, `PostInsert` |
//! | update | `PreUpdate`, update by identity, `PostUpdate` |
//! | delete | `PreDelete`, remove by identity, `PostDelete` |
//!
//! Every stage is fail-fast and nothing is rolled back: if a post hook fails, the
//! mutation before it stays applied and the hook's error is returned.

use bson::{Bson, Document};
use std::any::type_name;

use crate::{
    backend::StoreBackend,
    encoding::{diff, to_document},
    error::{DocumentStoreError, DocumentStoreResult},
    hooks::{HookDispatcher, HookStage},
    query::{Expr, Filter},
    record::{DEFAULT_IDENTITY_FIELD, Record, Resolver},
    update::ChangeInfo,
};

/// Where a mapper is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapperState {
    /// No operation has run yet.
    Unresolved,
    /// The collection is known; `is_new` tells whether the next save inserts.
    Resolved { is_new: bool },
}

/// Persists one borrowed record.
///
/// On the update path the mapper sends only the fields that changed since it last
/// saw the stored document. When it has not seen one yet (the record was built by
/// hand with an identity), the stored document is replaced as a whole.
#[derive(Debug)]
pub struct Mapper<'c, 'r, B: StoreBackend, R: Record> {
    backend: &'c B,
    record: &'r mut R,
    collection: Option<String>,
    identity_field: String,
    state: MapperState,
    snapshot: Option<Document>,
    /// identity the store generated on insert
    generated: Option<Bson>,
}

impl<'c, 'r, B: StoreBackend, R: Record> Mapper<'c, 'r, B, R> {
    pub fn new(backend: &'c B, record: &'r mut R) -> Self {
        Self {
            backend,
            record,
            collection: None,
            identity_field: DEFAULT_IDENTITY_FIELD.to_string(),
            state: MapperState::Unresolved,
            snapshot: None,
            generated: None,
        }
    }

    /// Creates a mapper for a record that is already stored.
    pub fn loaded(backend: &'c B, record: &'r mut R) -> DocumentStoreResult<Self> {
        let snapshot = to_document(&*record)?;
        let mut mapper = Self::new(backend, record);

        mapper.state = MapperState::Resolved { is_new: false };
        mapper.snapshot = Some(snapshot);

        Ok(mapper)
    }

    /// Switches to another record and forgets everything resolved so far.
    pub fn attach(&mut self, record: &'r mut R) {
        self.record = record;
        self.collection = None;
        self.identity_field = DEFAULT_IDENTITY_FIELD.to_string();
        self.state = MapperState::Unresolved;
        self.snapshot = None;
        self.generated = None;
    }

    pub fn record(&self) -> &R {
        &*self.record
    }

    /// Mutable access to the record, e.g. to change fields before the next save.
    pub fn record_mut(&mut self) -> &mut R {
        &mut *self.record
    }

    pub fn state(&self) -> MapperState {
        self.state
    }

    /// Whether the next save inserts. `false` until the mapper is resolved.
    pub fn is_new(&self) -> bool {
        matches!(self.state, MapperState::Resolved { is_new: true })
    }

    /// The record's identity, or the one the store generated for it on insert.
    /// Empty when there is neither.
    pub fn identity(&self) -> String {
        let identity = Resolver::identity(&*self.record);

        match &self.generated {
            Some(generated) if identity.is_empty() => match generated {
                Bson::ObjectId(id) => id.to_hex(),
                Bson::String(id) => id.clone(),
                other => other.to_string(),
            },
            _ => identity,
        }
    }

    /// The resolved collection name.
    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    /// The stored document as the mapper last saw it.
    pub fn snapshot(&self) -> Option<&Document> {
        self.snapshot.as_ref()
    }

    /// Inserts the record when it is new, updates it otherwise.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::Precondition`] if the record does not encode to a document
    /// - [`DocumentStoreError::MissingCollectionName`] if it has no collection name
    /// - [`DocumentStoreError::MissingIdentity`] on the update path without an identity
    /// - [`DocumentStoreError::Hook`] with the hook's own error if a hook fails
    /// - [`DocumentStoreError::DocumentNotFound`] if no stored document has the identity
    /// - any backend error, unchanged
    pub async fn save(&mut self) -> DocumentStoreResult<()> {
        let collection = self.resolve()?;

        if self.is_new() {
            self.insert(&collection).await
        } else {
            self.update(&collection).await
        }
    }

    /// Removes the stored document with the record's identity.
    pub async fn delete(&mut self) -> DocumentStoreResult<()> {
        let collection = self.resolve()?;
        let identity = self.require_identity()?;
        let selector = self.selector(&self.encode()?)?;

        self.run_hook(HookStage::PreDelete, &collection)?;

        log::debug!("deleting {} from {}", identity, collection);

        let info = self
            .backend
            .delete_documents(selector, false, &collection)
            .await?;

        if info.removed == 0 {
            return Err(DocumentStoreError::DocumentNotFound(identity, collection));
        }

        self.snapshot = None;

        self.run_post_hook(HookStage::PostDelete, &collection)
    }

    async fn insert(&mut self, collection: &str) -> DocumentStoreResult<()> {
        self.run_hook(HookStage::PreInsert, collection)?;

        let mut document = to_document(&*self.record)?;

        log::debug!("inserting {} into {}", type_name::<R>(), collection);

        let ids = self
            .backend
            .insert_documents(vec![document.clone()], collection)
            .await?;

        // backends generate `_id` only
        if self.identity_field == DEFAULT_IDENTITY_FIELD && !document.contains_key(DEFAULT_IDENTITY_FIELD) {
            if let Some(id) = ids.into_iter().next() {
                log::debug!("{} generated identity {} in {}", type_name::<R>(), id, collection);

                document.insert(DEFAULT_IDENTITY_FIELD, id.clone());
                self.generated = Some(id);
            }
        }

        self.state = MapperState::Resolved { is_new: false };
        self.snapshot = Some(document);

        self.run_post_hook(HookStage::PostInsert, collection)
    }

    async fn update(&mut self, collection: &str) -> DocumentStoreResult<()> {
        let identity = self.require_identity()?;

        self.run_hook(HookStage::PreUpdate, collection)?;

        let document = self.encode()?;
        let selector = self.selector(&document)?;

        let info = match &self.snapshot {
            Some(snapshot) => {
                let update = diff(snapshot, &document);

                if update.is_empty() {
                    log::debug!("{} in {} is unchanged", identity, collection);
                    ChangeInfo::updated(1, 0)
                } else {
                    log::debug!("updating {} in {}", identity, collection);
                    self.backend
                        .update_documents(selector, update, false, collection)
                        .await?
                }
            }
            None => {
                log::debug!("replacing {} in {}", identity, collection);
                self.backend
                    .replace_document(selector, document.clone(), collection)
                    .await?
            }
        };

        if info.matched == 0 {
            return Err(DocumentStoreError::DocumentNotFound(
                identity,
                collection.to_string(),
            ));
        }

        self.snapshot = Some(document);

        self.run_post_hook(HookStage::PostUpdate, collection)
    }

    /// Checks the record can be stored and resolves its collection once.
    fn resolve(&mut self) -> DocumentStoreResult<String> {
        to_document(&*self.record)?;

        if let Some(collection) = &self.collection {
            return Ok(collection.clone());
        }

        let resolution = Resolver::resolve(&*self.record)?;

        log::debug!(
            "resolved {} to collection {} (identity {:?})",
            type_name::<R>(),
            resolution.collection,
            resolution.identity
        );

        if self.state == MapperState::Unresolved {
            self.state = MapperState::Resolved { is_new: resolution.is_new() };
        }

        self.identity_field = resolution.identity_field;
        self.collection = Some(resolution.collection.clone());

        Ok(resolution.collection)
    }

    /// Encodes the record, adding the generated identity when the record leaves it out.
    fn encode(&self) -> DocumentStoreResult<Document> {
        let mut document = to_document(&*self.record)?;

        if let Some(generated) = &self.generated {
            if !document.contains_key(&self.identity_field) {
                document.insert(self.identity_field.clone(), generated.clone());
            }
        }

        Ok(document)
    }

    fn require_identity(&self) -> DocumentStoreResult<String> {
        match self.identity() {
            identity if identity.is_empty() => Err(DocumentStoreError::MissingIdentity(
                type_name::<R>().to_string(),
            )),
            identity => Ok(identity),
        }
    }

    /// Selects the stored document by the identity field's encoded value.
    fn selector(&self, document: &Document) -> DocumentStoreResult<Expr> {
        document
            .get(&self.identity_field)
            .map(|id| Filter::identity(self.identity_field.as_str(), id.clone()))
            .ok_or_else(|| {
                DocumentStoreError::MissingIdentity(format!(
                    "{} (field {} not encoded)",
                    type_name::<R>(),
                    self.identity_field
                ))
            })
    }

    fn run_hook(&mut self, stage: HookStage, collection: &str) -> DocumentStoreResult<()> {
        HookDispatcher::invoke(stage, &mut *self.record, collection)
    }

    /// Runs a hook whose mutation is already applied.
    fn run_post_hook(&mut self, stage: HookStage, collection: &str) -> DocumentStoreResult<()> {
        self.run_hook(stage, collection)
            .inspect_err(|err| {
                log::warn!("{} hook failed after {} was modified: {}", stage, collection, err);
            })
    }
}
