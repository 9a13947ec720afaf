//! Core data model for federated saved-query management.
//!
//! Holds the saved-query definition model, the wire payloads exchanged
//! between nodes, the dependency graph that guards against recursive
//! queries, and the respondent node registry.

pub mod error;
pub mod graph;
pub mod id;
pub mod query;
pub mod registry;
pub mod wire;

// Re-export commonly used types
pub use error::CoreError;
pub use graph::{Candidate, DependencyGraph, DependencyNode};
pub use id::{CorrelationId, NodeId, QueryId, UniversalId, QUERY_URN_PREFIX};
pub use query::{ItemRef, Panel, PanelFilter, PanelItem, QueryDefinition, QueryDependent, SubPanel};
pub use registry::{NetworkIdentity, NodeRegistry};
pub use wire::{
    DeleteQueryResponse, DependentsConflict, NodeSaveRequest, QuerySaveRequest, QuerySaveResponse,
    USER_HEADER,
};
