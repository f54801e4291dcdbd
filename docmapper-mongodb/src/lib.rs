//! MongoDB backend for docmapper.
//!
//! Provides [`MongoDbStore`], a `StoreBackend` that hands filters, sort keys,
//! skip and limit to the server. Enable it through the `mongodb` feature:
//!
//! ```toml
//! [dependencies]
//! docmapper = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use docmapper::{backend::StoreBackendBuilder, config::ConnectionConfig, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ConnectionConfig::from_url("mongodb://localhost:27017/shop")?;
//!     let store = MongoDbStore::from_config(&config)?.build().await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docmapper_mongodb;

pub mod query;
pub mod store;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
