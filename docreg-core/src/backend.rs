//! Storage backend abstraction.
//!
//! A [`StoreBackend`] is the opaque driver boundary: it stores BSON documents keyed by their
//! `_id` and is shared by every collection handle created during an application run. A
//! [`StoreConnector`] creates a backend from a [`ConnectionConfig`] when the application starts.
//!
//! Implementations are provided by the `docreg-memory` and `docreg-mongodb` crates.
//!
//! # Examples
//!
//! ```ignore
//! use docreg::backend::StoreBackend;
//! use bson::{Bson, doc};
//!
//! let id = Bson::String("alice".into());
//! backend.save_document("users", id.clone(), doc! { "_id": "alice", "age": 30 }).await?;
//! let stored = backend.find_document("users", &id).await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Document};
use std::{fmt::Debug, sync::Arc};

use crate::{config::ConnectionConfig, error::RegistryResult};

/// Field under which every stored document carries its key.
pub const ID_FIELD: &str = "_id";

/// Document operations offered by the underlying database driver.
///
/// Every document handed to a backend already carries its key under [`ID_FIELD`]. Semantics such
/// as filter syntax or duplicate handling are those of the driver; callers should not rely on more.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts or replaces the document with the given key.
    async fn save_document(&self, collection: &str, id: Bson, document: Document) -> RegistryResult<()>;

    /// Inserts new documents, failing if any key already exists.
    async fn insert_documents(&self, collection: &str, documents: Vec<Document>) -> RegistryResult<()>;

    /// Replaces an existing document, failing if the key is unknown.
    async fn update_document(&self, collection: &str, id: Bson, document: Document) -> RegistryResult<()>;

    /// Removes a document by key, returning whether one was removed.
    async fn remove_document(&self, collection: &str, id: &Bson) -> RegistryResult<bool>;

    /// Fetches a document by key.
    async fn find_document(&self, collection: &str, id: &Bson) -> RegistryResult<Option<Document>>;

    /// Fetches all documents matching the driver-level filter.
    async fn find_documents(&self, collection: &str, filter: Document) -> RegistryResult<Vec<Document>>;

    /// Counts documents matching the driver-level filter.
    async fn count_documents(&self, collection: &str, filter: Document) -> RegistryResult<u64>;

    /// Drops a collection and all of its documents.
    async fn drop_collection(&self, collection: &str) -> RegistryResult<()>;

    /// Lists collection names in the database.
    async fn list_collections(&self) -> RegistryResult<Vec<String>>;

    /// Releases the connection. Operations issued afterwards fail with a backend error.
    async fn close(&self) -> RegistryResult<()> {
        Ok(())
    }
}

/// Creates a backend connection from configuration.
///
/// The connection manager calls [`connect`](StoreConnector::connect) once per application run.
/// Failures should be reported as [`RegistryError::Connection`](crate::error::RegistryError::Connection).
#[async_trait]
pub trait StoreConnector: Send + Sync + Debug {
    async fn connect(&self, config: &ConnectionConfig) -> RegistryResult<Arc<dyn StoreBackend>>;
}
