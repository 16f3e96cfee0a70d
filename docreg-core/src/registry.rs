//! Process-wide cache of typed collection handles.
//!
//! The host application constructs one [`CollectionRegistry`], drives it through the
//! [`Lifecycle`](crate::lifecycle::Lifecycle) hooks, and passes it to whatever needs collections.
//!
//! # Example
//!
//! ```ignore
//! use docreg::{prelude::*, memory::InMemoryConnector};
//! use std::sync::Arc;
//!
//! let registry = CollectionRegistry::new(Arc::new(InMemoryConnector::default()));
//! registry.on_start(&ConfigMap::new()).await?;
//!
//! let users = registry.get_collection::<User>("users").await?;
//! let again = registry.get_collection::<User>("users").await?;
//! assert!(Arc::ptr_eq(&users, &again));
//!
//! registry.on_stop().await?;
//! ```

use mea::rwlock::RwLock;
use std::{
    any::{Any, TypeId},
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};
use tracing::{debug, trace};

use crate::{
    backend::StoreConnector,
    collection::CollectionHandle,
    connection::ConnectionManager,
    document::{Mapped, MappedType},
    error::{RegistryError, RegistryResult},
    key::KeyInferencer,
};

/// Cache key: collection name plus the identity of the mapped type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct RegistryKey {
    name: String,
    type_id: TypeId,
}

type HandleMap = HashMap<RegistryKey, Arc<dyn Any + Send + Sync>>;

/// Hands out one shared [`CollectionHandle`] per collection name and mapped type.
///
/// Lookups of cached handles take a read lock only. A miss takes the single write lock, checks
/// again, and constructs the handle while holding it, so concurrent first requests for the same
/// key all receive the same instance.
#[derive(Debug)]
pub struct CollectionRegistry {
    connection: ConnectionManager,
    inferencer: KeyInferencer,
    handles: RwLock<HandleMap>,
    constructed: AtomicUsize,
}

impl CollectionRegistry {
    /// Creates a registry whose connection is produced by `connector` on start.
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self::with_inferencer(connector, KeyInferencer::new())
    }

    /// Creates a registry with a custom key inferencer.
    pub fn with_inferencer(connector: Arc<dyn StoreConnector>, inferencer: KeyInferencer) -> Self {
        Self {
            connection: ConnectionManager::new(connector),
            inferencer,
            handles: RwLock::new(HandleMap::new()),
            constructed: AtomicUsize::new(0),
        }
    }

    /// Returns the handle for collection `name` holding documents of type `D`.
    ///
    /// Repeated calls with the same name and type return the same `Arc` until the registry is
    /// reset.
    ///
    /// # Errors
    ///
    /// - [`RegistryError::InvalidCollectionName`] if `name` is empty
    /// - [`RegistryError::KeyResolution`] if `D` has no resolvable key
    /// - [`RegistryError::NotStarted`] if the registry has not been started
    pub async fn get_collection<D: Mapped>(&self, name: &str) -> RegistryResult<Arc<CollectionHandle<D>>> {
        if name.is_empty() {
            return Err(RegistryError::InvalidCollectionName(name.to_string()));
        }

        let key = RegistryKey {
            name: name.to_string(),
            type_id: TypeId::of::<D>(),
        };

        if let Some(entry) = self.handles.read().await.get(&key) {
            trace!(collection = name, "collection handle cache hit");
            return downcast::<D>(entry.clone());
        }

        let mut handles = self.handles.write().await;

        if let Some(entry) = handles.get(&key) {
            return downcast::<D>(entry.clone());
        }

        let mapped = MappedType::of::<D>();
        let descriptor = self.inferencer.resolve(&mapped).await?;
        let backend = self.connection.connection().await?;

        debug!(
            collection = name,
            mapped_type = mapped.type_name(),
            key_field = descriptor.field(),
            "constructing collection handle"
        );

        let handle = Arc::new(CollectionHandle::<D>::new(
            name.to_string(),
            mapped,
            descriptor,
            backend,
        ));

        handles.insert(key, handle.clone());
        self.constructed.fetch_add(1, Ordering::Relaxed);

        Ok(handle)
    }

    /// Forgets every cached handle. Later requests construct new ones.
    pub async fn reset(&self) {
        let mut handles = self.handles.write().await;
        debug!(entries = handles.len(), "resetting collection registry");
        handles.clear();
    }

    /// Number of cached handles.
    pub async fn len(&self) -> usize {
        self.handles.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handles.read().await.is_empty()
    }

    /// Total number of handles constructed over the registry's lifetime.
    pub fn constructions(&self) -> usize {
        self.constructed.load(Ordering::Relaxed)
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn inferencer(&self) -> &KeyInferencer {
        &self.inferencer
    }

    /// Stops the connection and clears the cache while holding the cache's write lock, so an
    /// in-flight miss cannot leave a handle behind for the next run.
    pub(crate) async fn shutdown(&self) {
        let mut handles = self.handles.write().await;
        self.connection.stop().await;
        debug!(entries = handles.len(), "clearing collection registry");
        handles.clear();
    }
}

fn downcast<D: Mapped>(entry: Arc<dyn Any + Send + Sync>) -> RegistryResult<Arc<CollectionHandle<D>>> {
    entry
        .downcast::<CollectionHandle<D>>()
        .map_err(|_| {
            RegistryError::Unknown(format!(
                "cached handle is not a collection of {}",
                std::any::type_name::<D>()
            ))
        })
}
