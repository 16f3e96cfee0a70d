//! In-memory document storage backend for docreg.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait and a
//! matching `StoreConnector`. It is meant for development and tests: hand
//! [`InMemoryConnector`] to a registry and every application run gets its own empty store.
//!
//! # Quick Start
//!
//! ```ignore
//! use docreg::{prelude::*, memory::InMemoryConnector};
//! use std::sync::Arc;
//!
//! let registry = CollectionRegistry::new(Arc::new(InMemoryConnector::default()));
//! registry.on_start(&ConfigMap::new()).await?;
//! let users = registry.get_collection::<User>("users").await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docreg_memory;

pub mod store;

pub use store::{InMemoryConnector, InMemoryError, InMemoryStore};
