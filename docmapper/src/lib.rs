//! Object-document mapping with lifecycle hooks.
//!
//! `docmapper` binds plain serde types to collections of a document database. A
//! record opts into capabilities (a collection name, an identity, lifecycle hooks)
//! and the mapper drives saves and deletes from them. Whether `save` inserts or
//! updates is decided by the record's identity: empty means new.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{prelude::*, memory::InMemoryStore};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize, Record)]
//! #[record(collection = "users", identity = "id")]
//! pub struct User {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub name: String,
//!     pub age: i32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::new(InMemoryStore::new());
//!
//!     // inserts, since the record has no identity yet
//!     let mut user = User { name: "Alice".into(), age: 30, ..Default::default() };
//!     connection.save(&mut user).await?;
//!
//!     // queries by example: every field the record emits must match
//!     let adults = connection
//!         .find_all(&User { name: "Alice".into(), age: 30, ..Default::default() }, Query::new())
//!         .await?;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Hooks
//!
//! Records listing `hooks` in `#[record(...)]` implement [`Hooks`](hooks::Hooks).
//! Pre-hooks run before the database is touched and abort the operation on error.
//! Post-hooks run after it succeeded. A post-hook error is returned to the caller
//! while the mutation stays applied; nothing is rolled back. Bulk operations on
//! collections never run hooks.
//!
//! # Dynamic Dispatch
//!
//! [`Connection::into_dyn`](connection::Connection::into_dyn) erases the backend
//! type, for choosing a backend at runtime:
//!
//! ```ignore
//! let connection = Connection::new(InMemoryStore::new()).into_dyn();
//! let store = connection.downcast_backend::<InMemoryStore>();
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - [`mongodb`] - MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docmapper;

pub mod prelude;

pub use docmapper_core::{
    backend, collection, config, connection, encoding, error, hooks, mapper, query, record, update,
};
pub use docmapper_macros::Record;

pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use docmapper_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docmapper_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
