//! In-memory storage implementation.
//!
//! Documents are kept as BSON in hash maps behind an async-aware read-write lock. Filters support
//! top-level equality only; anything richer is rejected rather than approximated.

use async_trait::async_trait;
use bson::{Bson, Document};
use mea::rwlock::RwLock;
use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};
use thiserror::Error;
use tracing::debug;

use docreg_core::{
    backend::{ID_FIELD, StoreBackend, StoreConnector},
    config::ConnectionConfig,
    error::{RegistryError, RegistryResult},
};

type CollectionMap = HashMap<String, Document>;
type StoreMap = HashMap<String, CollectionMap>;

/// Errors raised by the in-memory backend itself, surfaced through
/// [`RegistryError::Backend`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InMemoryError {
    /// The store was closed; every later operation fails.
    #[error("in-memory store is closed")]
    Closed,
    /// The filter uses an operator the in-memory store does not evaluate.
    #[error("unsupported filter operator {0:?}, only top-level equality is supported")]
    UnsupportedFilter(String),
}

/// Thread-safe in-memory document storage backend.
///
/// `InMemoryStore` is cloneable and uses `Arc`-wrapped internal state; clones share the same data
/// and the same open/closed state.
///
/// # Example
///
/// ```ignore
/// use docreg_memory::InMemoryStore;
/// use docreg::backend::StoreBackend;
/// use bson::{Bson, doc};
///
/// let store = InMemoryStore::new();
/// let id = Bson::from("alice");
/// store.save_document("users", id.clone(), doc! { "_id": "alice", "age": 30 }).await?;
/// assert!(store.find_document("users", &id).await?.is_some());
/// ```
#[derive(Default, Clone, Debug)]
pub struct InMemoryStore {
    /// collection_name -> (document key -> document)
    store: Arc<RwLock<StoreMap>>,
    closed: Arc<AtomicBool>,
}

impl InMemoryStore {
    /// Creates a new empty, open store.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> RegistryResult<()> {
        if self.is_closed() {
            return Err(RegistryError::backend(InMemoryError::Closed));
        }

        Ok(())
    }

    fn matches(document: &Document, filter: &Document) -> RegistryResult<bool> {
        for (field, expected) in filter {
            if field.starts_with('$') {
                return Err(RegistryError::backend(InMemoryError::UnsupportedFilter(field.clone())));
            }
            if let Bson::Document(inner) = expected {
                if let Some(op) = inner.keys().find(|k| k.starts_with('$')) {
                    return Err(RegistryError::backend(InMemoryError::UnsupportedFilter(op.clone())));
                }
            }
            if document.get(field) != Some(expected) {
                return Ok(false);
            }
        }

        Ok(true)
    }
}

fn key_of(id: &Bson) -> String {
    id.to_string()
}

fn id_of(document: &Document) -> RegistryResult<&Bson> {
    document
        .get(ID_FIELD)
        .ok_or_else(|| RegistryError::InvalidDocument(format!("document has no {ID_FIELD} field")))
}

#[async_trait]
impl StoreBackend for InMemoryStore {
    async fn save_document(&self, collection: &str, id: Bson, document: Document) -> RegistryResult<()> {
        self.ensure_open()?;

        self.store
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(key_of(&id), document);

        Ok(())
    }

    async fn insert_documents(&self, collection: &str, documents: Vec<Document>) -> RegistryResult<()> {
        self.ensure_open()?;

        let mut store = self.store.write().await;
        let collection_map = store
            .entry(collection.to_string())
            .or_default();

        // Validate the whole batch first so a duplicate leaves the collection untouched.
        let mut keys = Vec::with_capacity(documents.len());
        for document in &documents {
            let key = key_of(id_of(document)?);

            if collection_map.contains_key(&key) || keys.contains(&key) {
                return Err(RegistryError::DocumentAlreadyExists(key, collection.to_string()));
            }

            keys.push(key);
        }

        collection_map.extend(keys.into_iter().zip(documents));

        Ok(())
    }

    async fn update_document(&self, collection: &str, id: Bson, document: Document) -> RegistryResult<()> {
        self.ensure_open()?;

        let mut store = self.store.write().await;
        let key = key_of(&id);

        match store
            .get_mut(collection)
            .and_then(|col| col.get_mut(&key))
        {
            Some(existing) => {
                *existing = document;
                Ok(())
            }
            None => Err(RegistryError::DocumentNotFound(key, collection.to_string())),
        }
    }

    async fn remove_document(&self, collection: &str, id: &Bson) -> RegistryResult<bool> {
        self.ensure_open()?;

        Ok(self
            .store
            .write()
            .await
            .get_mut(collection)
            .and_then(|col| col.remove(&key_of(id)))
            .is_some())
    }

    async fn find_document(&self, collection: &str, id: &Bson) -> RegistryResult<Option<Document>> {
        self.ensure_open()?;

        Ok(self
            .store
            .read()
            .await
            .get(collection)
            .and_then(|col| col.get(&key_of(id)))
            .cloned())
    }

    async fn find_documents(&self, collection: &str, filter: Document) -> RegistryResult<Vec<Document>> {
        self.ensure_open()?;

        let store = self.store.read().await;
        let Some(collection_map) = store.get(collection) else {
            return Ok(vec![]);
        };

        let mut found = Vec::new();
        for document in collection_map.values() {
            if Self::matches(document, &filter)? {
                found.push(document.clone());
            }
        }

        Ok(found)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RegistryResult<u64> {
        Ok(self.find_documents(collection, filter).await?.len() as u64)
    }

    async fn drop_collection(&self, collection: &str) -> RegistryResult<()> {
        self.ensure_open()?;

        // Dropping a missing collection is not an error, as with MongoDB.
        self.store.write().await.remove(collection);

        Ok(())
    }

    async fn list_collections(&self) -> RegistryResult<Vec<String>> {
        self.ensure_open()?;

        Ok(self
            .store
            .read()
            .await
            .keys()
            .cloned()
            .collect())
    }

    async fn close(&self) -> RegistryResult<()> {
        self.closed.store(true, Ordering::Release);
        debug!("in-memory store closed");

        Ok(())
    }
}

/// Connector producing a fresh [`InMemoryStore`] for every application run.
///
/// Connection settings other than the database name are ignored.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConnector;

#[async_trait]
impl StoreConnector for InMemoryConnector {
    async fn connect(&self, config: &ConnectionConfig) -> RegistryResult<Arc<dyn StoreBackend>> {
        debug!(database = %config.database, "opening in-memory store");

        Ok(Arc::new(InMemoryStore::new()))
    }
}
