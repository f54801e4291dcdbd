//! Core of the docmapper object-document mapper.
//!
//! This crate binds application record types to collections of a document database:
//!
//! - **Records** ([`record`]) - The record trait and its optional capabilities
//! - **Lifecycle hooks** ([`hooks`]) - Hook stages and the dispatcher that runs them
//! - **Mapper** ([`mapper`]) - Identity-driven save and delete around the hooks
//! - **Queries** ([`query`]) - Filters built from example records, sort, skip and limit
//! - **Encoding** ([`encoding`]) - Record/document conversion and structural diffs
//! - **Updates** ([`update`]) - Partial update documents and change counts
//! - **Collections** ([`collection`]) - Reads and hook-free bulk operations
//! - **Connection** ([`connection`]) - The explicit handle everything starts from
//! - **Backends** ([`backend`]) - Traits implemented by storage backends
//! - **Configuration** ([`config`]) - Connection settings
//! - **Errors** ([`error`]) - Error and result types
//!
//! # Example
//!
//! ```ignore
//! use docmapper_core::{connection::Connection, record::*};
//! use bson::oid::ObjectId;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Serialize, Deserialize)]
//! pub struct Note {
//!     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
//!     pub id: Option<ObjectId>,
//!     pub text: String,
//! }
//!
//! impl CollectionNamed for Note {
//!     fn collection_name(&self) -> &str { "notes" }
//! }
//!
//! impl Record for Note {
//!     fn as_collection_named(&self) -> Option<&dyn CollectionNamed> { Some(self) }
//! }
//!
//! let mut note = Note { id: Some(ObjectId::new()), text: "hello".into() };
//! connection.mapper(&mut note).save().await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_core;

pub mod backend;
pub mod collection;
pub mod config;
pub mod connection;
pub mod encoding;
pub mod error;
pub mod hooks;
pub mod mapper;
pub mod query;
pub mod record;
pub mod update;
