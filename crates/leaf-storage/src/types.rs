//! Storage-layer result types.

use serde::{Deserialize, Serialize};

use leaf_core::{QueryDependent, UniversalId};

/// Outcome of [`crate::QueryStore::delete_query`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeleteResult {
    /// The target and, for a forced delete, every transitive dependent were
    /// removed. The target comes first.
    Deleted(Vec<UniversalId>),
    /// Not forced and other saved queries depend on the target. Nothing was
    /// removed.
    Conflict(Vec<QueryDependent>),
}
