//! Server configuration from environment variables:
//!
//! - `LEAF_DB_PATH`: SQLite database file path (default: "leaf.db"); the
//!   value `:memory:` selects a non-persistent in-memory store
//! - `LEAF_PORT`: listen port (default: 5001)

use thiserror::Error;

pub const DB_PATH_ENV: &str = "LEAF_DB_PATH";
pub const PORT_ENV: &str = "LEAF_PORT";

/// Database path selecting the in-memory store.
pub const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("LEAF_PORT must be a port number, got {value:?}")]
    InvalidPort { value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub db_path: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            db_path: "leaf.db".to_string(),
            port: 5001,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = ServerConfig::default();
        if let Some(path) = lookup(DB_PATH_ENV).filter(|p| !p.is_empty()) {
            config.db_path = path;
        }
        if let Some(value) = lookup(PORT_ENV) {
            config.port = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort { value })?;
        }
        Ok(config)
    }

    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    pub fn is_in_memory(&self) -> bool {
        self.db_path == IN_MEMORY
    }
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
    fn defaults_apply_without_variables() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.listen_addr(), "0.0.0.0:5001");
    }

    #[test]
    fn variables_override_defaults() {
        let config =
            ServerConfig::from_lookup(lookup(&[(DB_PATH_ENV, IN_MEMORY), (PORT_ENV, "6000")]))
                .unwrap();
        assert!(config.is_in_memory());
        assert_eq!(config.port, 6000);
    }

    #[test]
    fn bad_port_is_rejected() {
        let err = ServerConfig::from_lookup(lookup(&[(PORT_ENV, "http")])).unwrap_err();
        assert!(err.to_string().contains("\"http\""));
    }
}
