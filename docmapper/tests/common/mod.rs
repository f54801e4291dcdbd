#![allow(dead_code)]

use async_trait::async_trait;
use docmapper::{
    bson::{Bson, Document, oid::ObjectId},
    memory::InMemoryStore,
    prelude::*,
};
use serde::{Deserialize, Serialize};
use std::{
    fmt,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

/// Counts the calls that reach an in-memory store.
#[derive(Debug, Default)]
pub struct RecordingBackend {
    pub store: InMemoryStore,
    pub inserts: AtomicUsize,
    pub replaces: AtomicUsize,
    pub updates: AtomicUsize,
    pub deletes: AtomicUsize,
    pub reads: AtomicUsize,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.mutations() + self.reads.load(Ordering::SeqCst)
    }

    pub fn mutations(&self) -> usize {
        self.inserts.load(Ordering::SeqCst)
            + self.replaces.load(Ordering::SeqCst)
            + self.updates.load(Ordering::SeqCst)
            + self.deletes.load(Ordering::SeqCst)
    }
}

fn bump(counter: &AtomicUsize) {
    counter.fetch_add(1, Ordering::SeqCst);
}

#[async_trait]
impl StoreBackend for RecordingBackend {
    async fn insert_documents(&self, documents: Vec<Document>, collection: &str) -> DocumentStoreResult<Vec<Bson>> {
        bump(&self.inserts);
        StoreBackend::insert_documents(&self.store, documents, collection).await
    }

    async fn replace_document(
        &self,
        selector: Expr,
        document: Document,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        bump(&self.replaces);
        StoreBackend::replace_document(&self.store, selector, document, collection).await
    }

    async fn update_documents(
        &self,
        selector: Expr,
        update: Update,
        multi: bool,
        collection: &str,
    ) -> DocumentStoreResult<ChangeInfo> {
        bump(&self.updates);
        StoreBackend::update_documents(&self.store, selector, update, multi, collection).await
    }

    async fn delete_documents(&self, selector: Expr, multi: bool, collection: &str) -> DocumentStoreResult<ChangeInfo> {
        bump(&self.deletes);
        StoreBackend::delete_documents(&self.store, selector, multi, collection).await
    }

    async fn query_documents(&self, query: Query, collection: &str) -> DocumentStoreResult<Vec<Document>> {
        bump(&self.reads);
        StoreBackend::query_documents(&self.store, query, collection).await
    }

    async fn count_documents(&self, filter: Option<Expr>, collection: &str) -> DocumentStoreResult<u64> {
        bump(&self.reads);
        StoreBackend::count_documents(&self.store, filter, collection).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(&self.store, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(&self.store).await
    }
}

pub fn connection() -> Connection<RecordingBackend> {
    Connection::new(RecordingBackend::new())
}

/// The error [`Tracked`] hooks fail with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refused(pub HookStage);

impl fmt::Display for Refused {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "refused at {}", self.0)
    }
}

impl std::error::Error for Refused {}

/// A record logging every hook stage it sees, optionally failing one of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Record)]
#[record(collection = "tracked", identity = "id", hooks)]
pub struct Tracked {
    #[serde(rename = "_id", default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(skip)]
    pub log: Arc<Mutex<Vec<HookStage>>>,
    #[serde(skip)]
    pub fail_on: Option<HookStage>,
}

impl Tracked {
    pub fn new(label: &str) -> Self {
        Self { label: label.to_string(), ..Default::default() }
    }

    pub fn with_id(id: &str, label: &str) -> Self {
        Self { id: id.to_string(), ..Self::new(label) }
    }

    pub fn failing_on(mut self, stage: HookStage) -> Self {
        self.fail_on = Some(stage);
        self
    }

    pub fn stages(&self) -> Vec<HookStage> {
        self.log.lock().unwrap().clone()
    }

    fn see(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.log.lock().unwrap().push(ctx.stage());

        match self.fail_on {
            Some(stage) if stage == ctx.stage() => Err(Refused(stage).into()),
            _ => Ok(()),
        }
    }
}

impl Hooks for Tracked {
    fn pre_insert(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)?;
        if self.id.is_empty() {
            self.id = ObjectId::new().to_hex();
        }
        Ok(())
    }

    fn post_insert(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)
    }

    fn pre_update(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)
    }

    fn post_update(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)
    }

    fn pre_delete(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)
    }

    fn post_delete(&mut self, ctx: &HookContext<'_>) -> HookResult {
        self.see(ctx)
    }
}

fn is_zero_i32(value: &i32) -> bool {
    *value == 0
}

fn is_zero_i64(value: &i64) -> bool {
    *value == 0
}

/// A user account whose password is hashed on insert.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Record)]
#[record(collection = "users", identity = "id", hooks)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub email: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hashed_password: String,
    #[serde(default, skip_serializing_if = "is_zero_i32")]
    pub age: i32,
    #[serde(default, skip_serializing_if = "is_zero_i64")]
    pub created: i64,
}

impl User {
    pub fn new(email: &str, age: i32) -> Self {
        Self { email: email.to_string(), age, ..Default::default() }
    }
}

impl Hooks for User {
    fn pre_insert(&mut self, _ctx: &HookContext<'_>) -> HookResult {
        self.id = Some(ObjectId::new());
        self.created = chrono::Utc::now().timestamp();

        if !self.password.is_empty() {
            self.hashed_password = bcrypt::hash(&self.password, 4)?;
            self.password.clear();
        }

        Ok(())
    }
}
