//! Core error types for leaf-core.
//!
//! Uses `thiserror` for structured, matchable error variants covering
//! dependency validation and node registry configuration.

use crate::id::{NodeId, UniversalId};
use thiserror::Error;

/// Core errors produced by the leaf-core crate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// Saving the candidate would close a dependency cycle.
    ///
    /// `path` starts and ends with the candidate's universal id. A
    /// self-embedding query yields a path of two entries.
    #[error(
        "\"{offending}\" is a saved query that depends on the current query \"{query}\"; \
         remove \"{offending}\" and try again"
    )]
    RecursiveDependency {
        /// Display name of the query being saved.
        query: String,
        /// Display name of the embedded query that closes the cycle.
        offending: String,
        /// Universal id of the embedded query that closes the cycle.
        offending_id: UniversalId,
        /// The cycle, from the candidate back to itself.
        path: Vec<UniversalId>,
    },

    /// The node registry has no home node.
    #[error("node registry has no home node")]
    NoHomeNode,

    /// The node registry has more than one home node.
    #[error("node registry has {} home nodes, expected exactly one", .ids.len())]
    MultipleHomeNodes { ids: Vec<NodeId> },

    /// Two registry entries share the same node id.
    #[error("duplicate node id in registry: {id}")]
    DuplicateNode { id: NodeId },
}

impl CoreError {
    /// Number of edges in the cycle for a recursive dependency, `None` for
    /// every other variant.
    pub fn cycle_len(&self) -> Option<usize> {
        match self {
            CoreError::RecursiveDependency { path, .. } => Some(path.len().saturating_sub(1)),
            _ => None,
        }
    }
}
