use async_trait::async_trait;
use bson::{Bson, Document, doc};
use futures::TryStreamExt;
use mongodb::{Client, Collection as MongoCollection, options::ClientOptions};
use std::sync::Arc;
use tracing::{debug, info};

use docreg_core::{
    backend::{ID_FIELD, StoreBackend, StoreConnector},
    config::ConnectionConfig,
    error::{RegistryError, RegistryResult},
};

#[derive(Debug, Clone)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(collection_name)
    }

    /// Round-trips a `ping` to the server.
    pub async fn ping(&self) -> RegistryResult<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(RegistryError::backend)?;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn save_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RegistryResult<()> {
        self.get_collection(collection)
            .replace_one(doc! { ID_FIELD: id }, document)
            .upsert(true)
            .await
            .map_err(RegistryError::backend)?;

        Ok(())
    }

    async fn insert_documents(
        &self,
        collection: &str,
        documents: Vec<Document>,
    ) -> RegistryResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection)
            .insert_many(documents)
            .await
            .map_err(RegistryError::backend)?;

        Ok(())
    }

    async fn update_document(
        &self,
        collection: &str,
        id: Bson,
        document: Document,
    ) -> RegistryResult<()> {
        let result = self
            .get_collection(collection)
            .replace_one(doc! { ID_FIELD: id.clone() }, document)
            .await
            .map_err(RegistryError::backend)?;

        if result.matched_count == 0 {
            return Err(RegistryError::DocumentNotFound(id.to_string(), collection.to_string()));
        }

        Ok(())
    }

    async fn remove_document(&self, collection: &str, id: &Bson) -> RegistryResult<bool> {
        let result = self
            .get_collection(collection)
            .delete_one(doc! { ID_FIELD: id.clone() })
            .await
            .map_err(RegistryError::backend)?;

        Ok(result.deleted_count > 0)
    }

    async fn find_document(&self, collection: &str, id: &Bson) -> RegistryResult<Option<Document>> {
        self.get_collection(collection)
            .find_one(doc! { ID_FIELD: id.clone() })
            .await
            .map_err(RegistryError::backend)
    }

    async fn find_documents(
        &self,
        collection: &str,
        filter: Document,
    ) -> RegistryResult<Vec<Document>> {
        self.get_collection(collection)
            .find(filter)
            .await
            .map_err(RegistryError::backend)?
            .try_collect::<Vec<Document>>()
            .await
            .map_err(RegistryError::backend)
    }

    async fn count_documents(&self, collection: &str, filter: Document) -> RegistryResult<u64> {
        self.get_collection(collection)
            .count_documents(filter)
            .await
            .map_err(RegistryError::backend)
    }

    async fn drop_collection(&self, collection: &str) -> RegistryResult<()> {
        self.get_collection(collection)
            .drop()
            .await
            .map_err(RegistryError::backend)?;

        Ok(())
    }

    async fn list_collections(&self) -> RegistryResult<Vec<String>> {
        self.client
            .database(&self.database)
            .list_collection_names()
            .await
            .map_err(RegistryError::backend)
    }

    async fn close(&self) -> RegistryResult<()> {
        self.client.clone().shutdown().await;
        debug!(database = %self.database, "mongodb client shut down");

        Ok(())
    }
}

/// Connects to MongoDB using the registry's [`ConnectionConfig`].
#[derive(Debug, Default, Clone)]
pub struct MongoDbConnector;

impl MongoDbConnector {
    async fn client_options(config: &ConnectionConfig) -> RegistryResult<ClientOptions> {
        let uri = config.connection_string();
        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| RegistryError::Connection(e.to_string()))?;

        if let Some(pool_size) = config.pool_size {
            options.max_pool_size = Some(pool_size);
        }

        Ok(options)
    }
}

#[async_trait]
impl StoreConnector for MongoDbConnector {
    async fn connect(&self, config: &ConnectionConfig) -> RegistryResult<Arc<dyn StoreBackend>> {
        let store = MongoDbStore::new(
            Client::with_options(Self::client_options(config).await?)
                .map_err(|e| RegistryError::Connection(e.to_string()))?,
            config.database.clone(),
        );

        if config.verify_on_start {
            store
                .ping()
                .await
                .map_err(|e| RegistryError::Connection(e.to_string()))?;
        }

        info!(
            database = %config.database,
            verified = config.verify_on_start,
            "mongodb client ready"
        );

        Ok(Arc::new(store))
    }
}
