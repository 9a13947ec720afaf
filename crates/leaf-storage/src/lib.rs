//! Storage abstraction for saved queries on a respondent node.
//!
//! Provides the [`QueryStore`] trait defining the storage contract that all
//! backends implement, plus the [`InMemoryStore`] and [`SqliteStore`] as
//! first-class backends.
//!
//! # Architecture
//!
//! The storage layer has a two-layer API:
//! - **Low-level CRUD** methods (insert/get/update/remove/list) are what a
//!   backend implements.
//! - **High-level** provided methods (`save_query`, `delete_query`,
//!   `dependents_of`) carry the node-side rules: universal id minting,
//!   version bumps, cycle rejection and dependents conflicts.
//!
//! # Modules
//!
//! - [`error`]: StorageError enum with all failure modes
//! - [`types`]: DeleteResult
//! - [`traits`]: QueryStore trait definition
//! - [`memory`]: InMemoryStore implementation
//! - [`schema`]: migration setup for the SQLite backend
//! - [`sqlite`]: SqliteStore implementation

pub mod error;
pub mod memory;
pub mod schema;
pub mod sqlite;
pub mod traits;
pub mod types;

// Re-export key types for ergonomic use.
pub use error::StorageError;
pub use memory::InMemoryStore;
pub use sqlite::SqliteStore;
pub use traits::{mint_universal_id, QueryStore};
pub use types::DeleteResult;
