//! Client configuration: who the user is and which nodes exist.
//!
//! Read from a JSON file:
//!
//! ```json
//! {
//!   "user": "alice@leaf",
//!   "request_timeout_secs": 30,
//!   "nodes": [
//!     { "id": 0, "name": "Home", "address": "http://localhost:5001", "is_home_node": true },
//!     { "id": 1, "name": "Partner", "address": "http://partner:5001" }
//!   ]
//! }
//! ```
//!
//! The `LEAF_USER` environment variable overrides `user`.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use leaf_core::{CoreError, NetworkIdentity, NodeRegistry};

use crate::error::TransportError;
use crate::federation::{Federation, FederationContext};
use crate::http::HttpTransport;

pub const USER_ENV: &str = "LEAF_USER";

const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    /// Neither the file nor the environment names a user.
    #[error("no user configured; set \"user\" or LEAF_USER")]
    MissingUser,

    #[error(transparent)]
    Registry(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FederationConfig {
    #[serde(default)]
    pub user: String,
    pub nodes: Vec<NetworkIdentity>,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

impl FederationConfig {
    /// Reads the file at `path` and applies the environment override.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)?.with_user_override(std::env::var(USER_ENV).ok())
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Replaces the user with a non-empty `value`, then checks that a user
    /// is set at all.
    pub fn with_user_override(mut self, value: Option<String>) -> Result<Self, ConfigError> {
        if let Some(user) = value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty()) {
            self.user = user;
        }
        if self.user.trim().is_empty() {
            return Err(ConfigError::MissingUser);
        }
        Ok(self)
    }

    pub fn registry(&self) -> Result<NodeRegistry, ConfigError> {
        Ok(NodeRegistry::new(self.nodes.iter().cloned())?)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// A federation talking HTTP to the configured nodes as the configured user.
    pub fn connect(&self) -> Result<Federation, ConfigError> {
        let transport = HttpTransport::new(&self.user, self.request_timeout())?;
        let ctx = FederationContext::new(self.registry()?, Arc::new(transport));
        Ok(Federation::new(ctx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const CONFIG: &str = r#"{
        "user": "alice",
        "nodes": [
            { "id": 0, "name": "Home", "address": "http://localhost:5001", "is_home_node": true },
            { "id": 1, "name": "Partner", "address": "http://partner:5001" },
            { "id": 2, "name": "Offline", "address": "http://offline:5001", "enabled": false }
        ]
    }"#;

    #[test]
    fn parses_nodes_with_defaults() {
        let config = FederationConfig::parse(CONFIG).unwrap();
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        let registry = config.registry().unwrap();
        assert_eq!(registry.home().name, "Home");
        assert_eq!(registry.network_nodes().count(), 1);
    }

    #[test]
    fn environment_user_wins_over_file() {
        let config = FederationConfig::parse(CONFIG)
            .unwrap()
            .with_user_override(Some("carol".into()))
            .unwrap();
        assert_eq!(config.user, "carol");

        let kept = FederationConfig::parse(CONFIG)
            .unwrap()
            .with_user_override(Some("  ".into()))
            .unwrap();
        assert_eq!(kept.user, "alice");
    }

    #[test]
    fn missing_user_is_an_error() {
        let config = FederationConfig::parse(r#"{"nodes": []}"#).unwrap();
        assert!(matches!(
            config.with_user_override(None),
            Err(ConfigError::MissingUser)
        ));
    }

    #[test]
    fn registry_without_home_is_rejected() {
        let config = FederationConfig::parse(
            r#"{"user": "a", "nodes": [{ "id": 1, "name": "n", "address": "http://n" }]}"#,
        )
        .unwrap();
        assert!(matches!(
            config.registry(),
            Err(ConfigError::Registry(CoreError::NoHomeNode))
        ));
    }

    #[test]
    fn load_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(CONFIG.as_bytes()).unwrap();
        let config = FederationConfig::load(file.path()).unwrap();
        assert_eq!(config.nodes.len(), 3);
    }
}
