//! MongoDB backend implementation for docreg.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait and the
//! `StoreConnector` that creates it from the registry's connection configuration.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docreg = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! The connector builds a client from `mongodb.uri` (or `mongodb.host` / `mongodb.port`),
//! applies `mongodb.poolSize`, and pings the server while starting unless
//! `mongodb.verifyOnStart` is disabled. Driver errors from document operations reach the caller
//! as `RegistryError::Backend` wrapping the original `mongodb::error::Error`.
//!
//! # Example
//!
//! ```ignore
//! use docreg::{prelude::*, mongodb::MongoDbConnector};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = CollectionRegistry::new(Arc::new(MongoDbConnector));
//!     let config = ConfigMap::from([
//!         ("mongodb.uri".to_string(), "mongodb://localhost:27017".to_string()),
//!         ("mongodb.database".to_string(), "my_database".to_string()),
//!     ]);
//!
//!     registry.on_start(&config).await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docreg_mongodb;

pub mod store;

pub use store::{MongoDbConnector, MongoDbStore};
