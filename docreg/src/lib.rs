//! Main docreg crate: cached, typed collection handles over a document database.
//!
//! A host application constructs one [`CollectionRegistry`](registry::CollectionRegistry), starts
//! it with its configuration, and asks it for collections. Each mapped type's primary key is
//! inferred once, either from its [`KeyTyped`](document::KeyTyped) declaration or from the single
//! field marked `#[key]`, and every `(collection name, type)` pair maps to exactly one shared
//! handle until the registry is stopped.
//!
//! # Quick Start
//!
//! ```ignore
//! use docreg::{prelude::*, memory::InMemoryConnector};
//! use serde::{Serialize, Deserialize};
//! use std::sync::Arc;
//!
//! #[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
//! pub struct User {
//!     #[key]
//!     pub email: String,
//!     pub name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = CollectionRegistry::new(Arc::new(InMemoryConnector));
//!     registry.on_start(&ConfigMap::new()).await?;
//!
//!     let users = registry.get_collection::<User>("users").await?;
//!     users
//!         .save(&User { email: "ada@example.com".into(), name: "Ada".into() })
//!         .await?;
//!
//!     let found = users.find_one_by_id("ada@example.com").await?;
//!     println!("found: {found:?}");
//!
//!     registry.on_stop().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Declared keys
//!
//! Types that know their key type can declare it instead of relying on the marker. The
//! declaration wins over any `#[key]` field:
//!
//! ```ignore
//! #[derive(Debug, Clone, Serialize, Deserialize, Mapped)]
//! #[mapped(key_typed)]
//! pub struct Session {
//!     pub token: String,
//!     pub user: String,
//! }
//!
//! impl KeyTyped for Session {
//!     type Key = String;
//!     const KEY_FIELD: &'static str = "token";
//! }
//!
//! let sessions = registry.get_collection::<Session>("sessions").await?;
//! let saved = sessions.save(&session).await?;
//! let token: String = saved.saved_key()?;
//! ```
//!
//! # Backends
//!
//! - [`memory`] - In-process storage for development and testing
//! - [`mongodb`] - MongoDB storage (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as docreg;

pub mod prelude;

pub use docreg_core::{
    backend, collection, config, connection, document, error, key, lifecycle, registry,
};
pub use docreg_macros::Mapped;

pub use async_trait::async_trait;
pub use bson;

/// In-memory storage backend.
pub mod memory {
    pub use docreg_memory::{InMemoryConnector, InMemoryError, InMemoryStore};
}

/// MongoDB storage backend.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use docreg_mongodb::{MongoDbConnector, MongoDbStore};
}
