//! In-memory document storage backend for docmapper.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It evaluates filters, sort keys, skip and limit itself, so mapped code behaves the
//! same as against a real database. Intended for tests and development.
//!
//! # Quick Start
//!
//! ```ignore
//! use docmapper::{connection::Connection, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let connection = Connection::new(InMemoryStore::new());
//!
//!     let mut user = User { name: "Alice".to_string(), ..Default::default() };
//!     connection.mapper(&mut user).save().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_memory;

pub mod evaluator;
pub mod store;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
