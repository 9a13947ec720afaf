//! Storage error types for leaf-storage.
//!
//! [`StorageError`] covers serialization, SQLite and migration failures,
//! missing queries, foreign-owned edits, and saves rejected by dependency
//! validation.

use leaf_core::{CoreError, UniversalId};
use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The underlying SQLite call failed.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// No saved query with the given universal id exists on this node.
    #[error("query not found: {0}")]
    QueryNotFound(UniversalId),

    /// The caller tried to overwrite a query owned by someone else.
    #[error("query {universal_id} is owned by {owner}")]
    NotOwner {
        universal_id: UniversalId,
        owner: String,
    },

    /// The save was rejected by dependency validation.
    #[error(transparent)]
    Validation(#[from] CoreError),

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
