//! Relay configuration
//!
//! Priority: command line flags > environment variables > defaults.

use crate::{Error, Result};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default listen address
pub const DEFAULT_BIND: &str = "127.0.0.1:8006";

/// Environment variable overriding the listen address
pub const ENV_BIND: &str = "HLC_RELAY_BIND";

/// Environment variable overriding the database path
pub const ENV_DATABASE: &str = "HLC_RELAY_DB";

/// Where and how the relay runs
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
    /// Socket address for the HTTP listener
    pub bind: SocketAddr,
    /// SQLite database file
    pub database: PathBuf,
}

impl Default for RelayConfig {
    fn default() -> Self {
        RelayConfig {
            bind: SocketAddr::from(([127, 0, 0, 1], 8006)),
            database: default_database_path(),
        }
    }
}

impl RelayConfig {
    /// Defaults overlaid with `HLC_RELAY_BIND` / `HLC_RELAY_DB`
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|key| std::env::var(key).ok())
    }

    /// Defaults overlaid with values from an arbitrary lookup
    pub fn from_vars(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = RelayConfig::default();

        if let Some(bind) = lookup(ENV_BIND) {
            config.bind = bind
                .parse()
                .map_err(|e| Error::Config(format!("{}={:?}: {}", ENV_BIND, bind, e)))?;
        }
        if let Some(database) = lookup(ENV_DATABASE) {
            if database.trim().is_empty() {
                return Err(Error::Config(format!("{} is empty", ENV_DATABASE)));
            }
            config.database = PathBuf::from(database);
        }

        Ok(config)
    }

    pub fn with_bind(mut self, bind: SocketAddr) -> Self {
        self.bind = bind;
        self
    }

    pub fn with_database(mut self, database: impl Into<PathBuf>) -> Self {
        self.database = database.into();
        self
    }
}

/// `<data dir>/hlc-relay/relay.db`, or `relay.db` when there is no data dir
fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join("hlc-relay").join("relay.db"))
        .unwrap_or_else(|| PathBuf::from("relay.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = RelayConfig::from_vars(lookup(&[])).unwrap();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert!(config.database.ends_with("relay.db"));
    }

    #[test]
    fn test_env_overrides() {
        let config = RelayConfig::from_vars(lookup(&[
            (ENV_BIND, "0.0.0.0:9000"),
            (ENV_DATABASE, "/tmp/relay-test.db"),
        ]))
        .unwrap();
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.database, PathBuf::from("/tmp/relay-test.db"));
    }

    #[test]
    fn test_bad_values_rejected() {
        let err = RelayConfig::from_vars(lookup(&[(ENV_BIND, "not an address")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
        let err = RelayConfig::from_vars(lookup(&[(ENV_DATABASE, "  ")])).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_builders() {
        let config = RelayConfig::default()
            .with_bind(SocketAddr::from(([0, 0, 0, 0], 1)))
            .with_database("x.db");
        assert_eq!(config.bind.port(), 1);
        assert_eq!(config.database, PathBuf::from("x.db"));
    }
}
