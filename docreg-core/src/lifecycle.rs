//! Start and stop hooks driven by the host application.

use async_trait::async_trait;
use tracing::info;

use crate::{
    config::{ConfigMap, ConnectionConfig},
    error::RegistryResult,
    registry::CollectionRegistry,
};

/// The two calls a host application makes around its own run.
///
/// `on_start` is called once when the application boots, `on_stop` once when it shuts down.
#[async_trait]
pub trait Lifecycle: Send + Sync {
    async fn on_start(&self, config: &ConfigMap) -> RegistryResult<()>;

    async fn on_stop(&self) -> RegistryResult<()>;
}

#[async_trait]
impl Lifecycle for CollectionRegistry {
    /// Parses `config` and starts the connection.
    ///
    /// # Errors
    ///
    /// [`RegistryError::Configuration`](crate::error::RegistryError::Configuration) for malformed
    /// settings, [`RegistryError::Connection`](crate::error::RegistryError::Connection) if the
    /// database cannot be reached.
    async fn on_start(&self, config: &ConfigMap) -> RegistryResult<()> {
        let config = ConnectionConfig::from_map(config)?;
        info!(
            database = %config.database,
            close_on_stop = config.close_on_stop,
            "starting collection registry"
        );

        self.connection().start(config).await
    }

    /// Releases the connection (if configured to) and clears every cached handle.
    async fn on_stop(&self) -> RegistryResult<()> {
        info!("stopping collection registry");
        self.shutdown().await;

        Ok(())
    }
}
