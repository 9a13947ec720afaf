//! Application state with a shared [`NodeService`].
//!
//! [`AppState`] wraps the service in `Arc<tokio::sync::Mutex<>>` so handlers
//! await the lock without blocking the tokio runtime. The store is behind a
//! `Mutex` rather than an `RwLock` because `rusqlite::Connection` is `!Sync`.

use std::sync::Arc;

use crate::error::ApiError;
use crate::service::NodeService;

/// Shared application state for the HTTP server.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<tokio::sync::Mutex<NodeService>>,
}

impl AppState {
    /// Creates a new `AppState` backed by the store at `db_path`.
    pub fn new(db_path: &str) -> Result<Self, ApiError> {
        Ok(Self::from_service(NodeService::new(db_path)?))
    }

    /// Creates a new `AppState` with an in-memory store (for testing).
    pub fn in_memory() -> Self {
        Self::from_service(NodeService::in_memory())
    }

    pub fn from_service(service: NodeService) -> Self {
        AppState {
            service: Arc::new(tokio::sync::Mutex::new(service)),
        }
    }
}
