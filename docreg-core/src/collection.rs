//! Typed collection handles.
//!
//! A [`CollectionHandle`] binds one named collection to one mapped type and its resolved key. It
//! translates between the mapped type and stored BSON documents, and otherwise forwards every
//! operation to the backend unchanged.
//!
//! Handles are created by the [`CollectionRegistry`](crate::registry::CollectionRegistry) and
//! shared as `Arc<CollectionHandle<D>>`.
//!
//! # Example
//!
//! ```ignore
//! let users = registry.get_collection::<User>("users").await?;
//! let saved = users.save(&user).await?;
//! let found = users.find_one_by_id(saved.saved_id().clone()).await?;
//! ```

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId, ser::serialize_to_bson};
use serde::de::DeserializeOwned;
use std::{fmt, marker::PhantomData, sync::Arc};

use crate::{
    backend::{ID_FIELD, StoreBackend},
    document::{DocumentExt, KeyTyped, Mapped, MappedType},
    error::{RegistryError, RegistryResult},
    key::{KeyDescriptor, KeyKind},
};

/// Outcome of a [`CollectionHandle::save`].
pub struct WriteResult<D> {
    saved_id: Bson,
    _marker: PhantomData<fn() -> D>,
}

impl<D> WriteResult<D> {
    fn new(saved_id: Bson) -> Self {
        Self { saved_id, _marker: PhantomData }
    }

    /// The key the document was stored under, including generated keys.
    pub fn saved_id(&self) -> &Bson {
        &self.saved_id
    }

    /// Converts the saved key into `K`.
    pub fn saved_id_as<K: DeserializeOwned>(&self) -> RegistryResult<K> {
        Ok(deserialize_from_bson(self.saved_id.clone())?)
    }
}

impl<D: KeyTyped> WriteResult<D> {
    /// The saved key as the type declared through [`KeyTyped`].
    pub fn saved_key(&self) -> RegistryResult<D::Key> {
        self.saved_id_as()
    }
}

impl<D> fmt::Debug for WriteResult<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WriteResult")
            .field("saved_id", &self.saved_id)
            .finish()
    }
}

/// A typed handle on one named collection.
pub struct CollectionHandle<D: Mapped> {
    name: String,
    mapped: MappedType,
    key: KeyDescriptor,
    backend: Arc<dyn StoreBackend>,
    _marker: PhantomData<fn() -> D>,
}

impl<D: Mapped> fmt::Debug for CollectionHandle<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionHandle")
            .field("name", &self.name)
            .field("mapped", &self.mapped.type_name())
            .field("key", &self.key)
            .finish()
    }
}

impl<D: Mapped> CollectionHandle<D> {
    pub(crate) fn new(
        name: String,
        mapped: MappedType,
        key: KeyDescriptor,
        backend: Arc<dyn StoreBackend>,
    ) -> Self {
        Self { name, mapped, key, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn key(&self) -> &KeyDescriptor {
        &self.key
    }

    pub fn mapped_type(&self) -> &MappedType {
        &self.mapped
    }

    /// Inserts or replaces a document, keyed by its key field.
    ///
    /// Missing `ObjectId` and `Uuid` keys are generated; the stored key is reported by the
    /// returned [`WriteResult`].
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidDocument`] if a non-generated key is missing, or the
    /// backend's error.
    pub async fn save(&self, document: &D) -> RegistryResult<WriteResult<D>> {
        let (id, stored) = self.to_stored(document)?;

        self.backend
            .save_document(&self.name, id.clone(), stored)
            .await?;

        Ok(WriteResult::new(id))
    }

    /// Inserts new documents, returning their keys in order.
    ///
    /// # Errors
    ///
    /// Fails as the backend does when a key already exists.
    pub async fn insert(&self, documents: Vec<D>) -> RegistryResult<Vec<Bson>> {
        let (ids, stored): (Vec<Bson>, Vec<Document>) = documents
            .iter()
            .map(|d| self.to_stored(d))
            .collect::<RegistryResult<Vec<_>>>()?
            .into_iter()
            .unzip();

        self.backend
            .insert_documents(&self.name, stored)
            .await?;

        Ok(ids)
    }

    /// Replaces the document stored under `id`.
    ///
    /// The document's own key field is ignored in favour of `id`.
    pub async fn update_by_id(&self, id: impl Into<Bson>, document: &D) -> RegistryResult<()> {
        let id = id.into();
        let mut stored = document.to_document()?;
        stored.remove(self.key.field());
        stored.insert(ID_FIELD, id.clone());

        self.backend
            .update_document(&self.name, id, stored)
            .await
    }

    /// Removes the document stored under `id`, returning whether it existed.
    pub async fn remove_by_id(&self, id: impl Into<Bson>) -> RegistryResult<bool> {
        self.backend
            .remove_document(&self.name, &id.into())
            .await
    }

    /// Fetches the document stored under `id`.
    pub async fn find_one_by_id(&self, id: impl Into<Bson>) -> RegistryResult<Option<D>> {
        self.backend
            .find_document(&self.name, &id.into())
            .await?
            .map(|stored| self.from_stored(stored))
            .transpose()
    }

    /// Fetches all documents matching a driver-level filter.
    ///
    /// Filters on the key must use `_id`, the field keys are stored under.
    pub async fn find(&self, filter: Document) -> RegistryResult<Vec<D>> {
        self.backend
            .find_documents(&self.name, filter)
            .await?
            .into_iter()
            .map(|stored| self.from_stored(stored))
            .collect()
    }

    pub async fn find_all(&self) -> RegistryResult<Vec<D>> {
        self.find(Document::new()).await
    }

    /// Counts documents matching a driver-level filter.
    pub async fn count(&self, filter: Document) -> RegistryResult<u64> {
        self.backend
            .count_documents(&self.name, filter)
            .await
    }

    /// Drops the collection.
    pub async fn drop_collection(&self) -> RegistryResult<()> {
        self.backend.drop_collection(&self.name).await
    }

    fn to_stored(&self, document: &D) -> RegistryResult<(Bson, Document)> {
        let mut stored = document.to_document()?;

        let id = match stored.remove(self.key.field()) {
            Some(Bson::Null) | None => self.generate_key()?,
            Some(id) => id,
        };

        stored.insert(ID_FIELD, id.clone());

        Ok((id, stored))
    }

    fn from_stored(&self, mut stored: Document) -> RegistryResult<D> {
        if self.key.field() != ID_FIELD {
            if let Some(id) = stored.remove(ID_FIELD) {
                stored.insert(self.key.field(), id);
            }
        }

        D::from_document(stored)
    }

    fn generate_key(&self) -> RegistryResult<Bson> {
        match self.key.kind() {
            KeyKind::ObjectId => Ok(Bson::ObjectId(ObjectId::new())),
            KeyKind::Uuid => Ok(bson::Uuid::new().into()),
            kind => Err(RegistryError::InvalidDocument(format!(
                "{} has no value for {} key field {:?}",
                self.mapped.type_name(),
                kind,
                self.key.field()
            ))),
        }
    }
}

impl<D: Mapped + KeyTyped> CollectionHandle<D> {
    /// Fetches a document by its declared key type.
    pub async fn find_by_key(&self, key: &D::Key) -> RegistryResult<Option<D>> {
        self.find_one_by_id(serialize_to_bson(key)?).await
    }
}
