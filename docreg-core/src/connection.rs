//! Ownership of the application's single database connection.

use mea::rwlock::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::{
    backend::{StoreBackend, StoreConnector},
    config::ConnectionConfig,
    error::{RegistryError, RegistryResult},
};

#[derive(Debug, Default)]
struct ConnectionState {
    /// Configuration of the current run; `None` while stopped.
    config: Option<ConnectionConfig>,
    /// Live backend, possibly retained across a stop.
    backend: Option<Arc<dyn StoreBackend>>,
    /// Configuration the live backend was connected with.
    backend_config: Option<ConnectionConfig>,
}

impl ConnectionState {
    async fn close_backend(&mut self) {
        let Some(backend) = self.backend.take() else {
            return;
        };
        let database = self
            .backend_config
            .take()
            .map(|config| config.database)
            .unwrap_or_default();

        match backend.close().await {
            Ok(()) => info!(%database, "connection closed"),
            Err(err) => warn!(%database, error = %err, "failed to close connection"),
        }
    }
}

/// Creates the backend connection on start and releases it on stop.
///
/// The manager never retries: a failed [`start`](ConnectionManager::start) leaves it stopped and
/// the error goes back to the caller.
#[derive(Debug)]
pub struct ConnectionManager {
    connector: Arc<dyn StoreConnector>,
    state: RwLock<ConnectionState>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn StoreConnector>) -> Self {
        Self {
            connector,
            state: RwLock::new(ConnectionState::default()),
        }
    }

    /// Establishes the connection described by `config`.
    ///
    /// A connection retained by an earlier [`stop`](ConnectionManager::stop) with
    /// `close_on_stop` disabled is reused when it targets the same server, database and pool
    /// settings; otherwise it is closed and a new one is made. Starting an already started
    /// manager does nothing.
    ///
    /// # Errors
    ///
    /// Returns the connector's error, normally [`RegistryError::Connection`].
    pub async fn start(&self, config: ConnectionConfig) -> RegistryResult<()> {
        let mut state = self.state.write().await;

        if state.config.is_some() {
            warn!(database = %config.database, "connection manager already started");
            return Ok(());
        }

        let reusable = state
            .backend_config
            .as_ref()
            .is_some_and(|retained| retained.same_target(&config));

        if state.backend.is_some() && reusable {
            info!(database = %config.database, "reusing retained connection");
        } else {
            if state.backend.is_some() {
                info!(
                    database = %config.database,
                    "connection settings changed, replacing retained connection"
                );
                state.close_backend().await;
            }

            let backend = self
                .connector
                .connect(&config)
                .await
                .inspect_err(|err| warn!(error = %err, "failed to connect"))?;

            info!(database = %config.database, "connection established");
            state.backend = Some(backend);
            state.backend_config = Some(config.clone());
        }

        state.config = Some(config);

        Ok(())
    }

    /// Stops the manager, closing the connection unless `close_on_stop` is disabled.
    ///
    /// Does nothing if the manager was never started. A failure while closing is logged and the
    /// connection is released regardless.
    pub async fn stop(&self) {
        let mut state = self.state.write().await;

        let Some(config) = state.config.take() else {
            debug!("connection manager not started, nothing to stop");
            return;
        };

        if !config.close_on_stop {
            info!(database = %config.database, "retaining connection after stop");
            return;
        }

        state.close_backend().await;
    }

    /// Closes a connection retained after stop.
    ///
    /// Does nothing while started or when no connection is retained.
    pub async fn release(&self) {
        let mut state = self.state.write().await;

        if state.config.is_none() {
            state.close_backend().await;
        }
    }

    /// Returns the live connection.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::NotStarted`] unless the manager is started.
    pub async fn connection(&self) -> RegistryResult<Arc<dyn StoreBackend>> {
        let state = self.state.read().await;

        match (&state.config, &state.backend) {
            (Some(_), Some(backend)) => Ok(backend.clone()),
            _ => Err(RegistryError::NotStarted),
        }
    }

    /// Returns the configuration of the current run.
    pub async fn config(&self) -> Option<ConnectionConfig> {
        self.state.read().await.config.clone()
    }

    pub async fn is_started(&self) -> bool {
        self.state.read().await.config.is_some()
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        if let Some(backend) = &self.state.get_mut().backend {
            // No runtime to await `close` on; the backend releases its resources when dropped.
            debug!(backend = ?backend, "connection manager dropped with a live connection");
        }
    }
}
