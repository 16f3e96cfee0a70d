//! Connection configuration.
//!
//! The host application hands its configuration to
//! [`Lifecycle::on_start`](crate::lifecycle::Lifecycle::on_start) as a flat string map. Recognized
//! keys:
//!
//! | key | meaning | default |
//! |---|---|---|
//! | `mongodb.uri` | full connection string, overrides host and port | - |
//! | `mongodb.host` | server host | `localhost` |
//! | `mongodb.port` | server port | `27017` |
//! | `mongodb.database` | database name | `docreg` |
//! | `mongodb.poolSize` | maximum connection pool size | driver default |
//! | `mongodb.closeOnStop` | release the connection when the application stops | `true` |
//! | `mongodb.verifyOnStart` | ping the server while starting | `true` |
//! | `mongodbJacksonMapperCloseOnStop` | legacy spelling of `mongodb.closeOnStop` | - |
//!
//! When both close-on-stop keys are present, `mongodb.closeOnStop` wins. Boolean values accept `true`/`false`, `enabled`/`disabled`, `yes`/`no` and `on`/`off`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::error::{RegistryError, RegistryResult};

/// Flat configuration map as supplied by the host application.
pub type ConfigMap = HashMap<String, String>;

const PREFIX: &str = "mongodb.";
const URI: &str = "mongodb.uri";
const HOST: &str = "mongodb.host";
const PORT: &str = "mongodb.port";
const DATABASE: &str = "mongodb.database";
const POOL_SIZE: &str = "mongodb.poolSize";
const CLOSE_ON_STOP: &str = "mongodb.closeOnStop";
const VERIFY_ON_START: &str = "mongodb.verifyOnStart";
const LEGACY_CLOSE_ON_STOP: &str = "mongodbJacksonMapperCloseOnStop";

/// Keys owned by co-located plugins; accepted and ignored.
const PASSTHROUGH: [&str; 1] = ["ehcacheplugin"];

/// Settings for the single database connection of an application run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConnectionConfig {
    pub uri: Option<String>,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub pool_size: Option<u32>,
    pub close_on_stop: bool,
    pub verify_on_start: bool,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            uri: None,
            host: "localhost".to_string(),
            port: 27017,
            database: "docreg".to_string(),
            pool_size: None,
            close_on_stop: true,
            verify_on_start: true,
        }
    }
}

impl ConnectionConfig {
    /// Parses the host's configuration map.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::Configuration`] if a recognized key holds a malformed value.
    pub fn from_map(map: &ConfigMap) -> RegistryResult<Self> {
        let mut config = Self::default();

        for (key, value) in map {
            let value = value.trim();

            match key.as_str() {
                URI => config.uri = Some(value.to_string()),
                HOST => config.host = value.to_string(),
                PORT => config.port = parse_number(key, value)?,
                DATABASE => config.database = value.to_string(),
                POOL_SIZE => config.pool_size = Some(parse_number(key, value)?),
                CLOSE_ON_STOP => config.close_on_stop = parse_flag(key, value)?,
                VERIFY_ON_START => config.verify_on_start = parse_flag(key, value)?,
                LEGACY_CLOSE_ON_STOP => {
                    let close_on_stop = parse_flag(key, value)?;
                    if !map.contains_key(CLOSE_ON_STOP) {
                        config.close_on_stop = close_on_stop;
                    }
                }
                other if PASSTHROUGH.contains(&other) => {
                    debug!(key = other, "ignoring passthrough configuration key");
                }
                other if other.starts_with(PREFIX) => {
                    warn!(key = other, "ignoring unknown configuration key");
                }
                _ => {}
            }
        }

        if config.database.is_empty() {
            return Err(RegistryError::Configuration(format!("{DATABASE} must not be empty")));
        }

        Ok(config)
    }

    pub fn with_uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = database.into();
        self
    }

    pub fn with_pool_size(mut self, pool_size: u32) -> Self {
        self.pool_size = Some(pool_size);
        self
    }

    pub fn with_close_on_stop(mut self, close_on_stop: bool) -> Self {
        self.close_on_stop = close_on_stop;
        self
    }

    pub fn with_verify_on_start(mut self, verify_on_start: bool) -> Self {
        self.verify_on_start = verify_on_start;
        self
    }

    /// Whether `other` connects to the same server and database with the same pool settings.
    ///
    /// Lifecycle flags are not compared.
    pub fn same_target(&self, other: &Self) -> bool {
        self.connection_string() == other.connection_string()
            && self.database == other.database
            && self.pool_size == other.pool_size
    }

    /// Returns the connection string: the explicit URI, or one built from host and port.
    pub fn connection_string(&self) -> String {
        match &self.uri {
            Some(uri) => uri.clone(),
            None => format!("mongodb://{}:{}", self.host, self.port),
        }
    }
}

fn parse_flag(key: &str, value: &str) -> RegistryResult<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "enabled" | "yes" | "on" => Ok(true),
        "false" | "disabled" | "no" | "off" => Ok(false),
        _ => Err(RegistryError::Configuration(format!(
            "{key} expects a boolean, got {value:?}"
        ))),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> RegistryResult<T> {
    value
        .parse()
        .map_err(|_| RegistryError::Configuration(format!("{key} expects a number, got {value:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(entries: &[(&str, &str)]) -> ConfigMap {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn empty_map_yields_defaults() {
        let config = ConnectionConfig::from_map(&ConfigMap::new()).unwrap();
        assert_eq!(config, ConnectionConfig::default());
        assert!(config.close_on_stop);
        assert_eq!(config.connection_string(), "mongodb://localhost:27017");
    }

    #[test]
    fn recognized_keys_are_applied() {
        let config = ConnectionConfig::from_map(&map(&[
            ("mongodb.host", "db.internal"),
            ("mongodb.port", "27018"),
            ("mongodb.database", "app"),
            ("mongodb.poolSize", "16"),
            ("mongodb.closeOnStop", "disabled"),
            ("mongodb.verifyOnStart", "off"),
            ("ehcacheplugin", "disabled"),
            ("application.secret", "x"),
        ]))
        .unwrap();

        assert_eq!(config.connection_string(), "mongodb://db.internal:27018");
        assert_eq!(config.database, "app");
        assert_eq!(config.pool_size, Some(16));
        assert!(!config.close_on_stop);
        assert!(!config.verify_on_start);
    }

    #[test]
    fn uri_overrides_host_and_port() {
        let config = ConnectionConfig::from_map(&map(&[
            ("mongodb.uri", "mongodb://replica-a,replica-b/?replicaSet=rs0"),
            ("mongodb.host", "ignored"),
        ]))
        .unwrap();

        assert_eq!(config.connection_string(), "mongodb://replica-a,replica-b/?replicaSet=rs0");
    }

    #[test]
    fn malformed_values_are_rejected() {
        for entry in [
            ("mongodb.closeOnStop", "sometimes"),
            ("mongodb.port", "eighty"),
            ("mongodb.poolSize", "-1"),
            ("mongodb.database", ""),
        ] {
            let err = ConnectionConfig::from_map(&map(&[entry])).unwrap_err();
            assert!(matches!(err, RegistryError::Configuration(_)), "{entry:?}");
        }
    }

    #[test]
    fn legacy_close_on_stop_key_is_honoured() {
        let config = ConnectionConfig::from_map(&map(&[
            ("ehcacheplugin", "disabled"),
            ("mongodbJacksonMapperCloseOnStop", "disabled"),
        ]))
        .unwrap();
        assert!(!config.close_on_stop);

        let config = ConnectionConfig::from_map(&map(&[
            ("mongodbJacksonMapperCloseOnStop", "disabled"),
            ("mongodb.closeOnStop", "enabled"),
        ]))
        .unwrap();
        assert!(config.close_on_stop);

        let err = ConnectionConfig::from_map(&map(&[("mongodbJacksonMapperCloseOnStop", "maybe")]))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Configuration(_)));
    }

    #[test]
    fn same_target_ignores_lifecycle_flags() {
        let base = ConnectionConfig::default().with_database("tenant_a");

        let flags_only = base
            .clone()
            .with_close_on_stop(false)
            .with_verify_on_start(false);

        assert!(base.same_target(&flags_only));
        assert!(!base.same_target(&base.clone().with_database("tenant_b")));
        assert!(!base.same_target(&base.clone().with_pool_size(4)));
        assert!(!base.same_target(&base.clone().with_uri("mongodb://elsewhere:27017")));
    }

    #[test]
    fn deserializes_from_camel_case() {
        let config: ConnectionConfig = serde_json::from_value(serde_json::json!({
            "database": "reports",
            "closeOnStop": false,
        }))
        .unwrap();

        assert_eq!(config.database, "reports");
        assert!(!config.close_on_stop);
        assert_eq!(config.port, 27017);
    }
}
