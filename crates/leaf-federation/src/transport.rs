//! The node collaborator contract.
//!
//! Orchestrators never speak HTTP directly; they go through a
//! [`QueryTransport`]. Only universal ids and [`QuerySaveRequest`] payloads
//! cross this boundary, so node-local ids cannot leak to another node.

use async_trait::async_trait;

use leaf_core::{
    CorrelationId, NetworkIdentity, QueryDefinition, QueryDependent, QuerySaveRequest,
    QuerySaveResponse, UniversalId,
};

use crate::error::TransportError;

/// Typed answer of the home node to a delete request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HomeDeleteResponse {
    /// The node removed these queries (target first).
    Deleted { deleted: Vec<UniversalId> },
    /// Other saved queries depend on the target; nothing was removed.
    Conflict { dependents: Vec<QueryDependent> },
}

/// Calls against respondent nodes.
#[async_trait]
pub trait QueryTransport: Send + Sync {
    /// Authoritative save on the home node.
    async fn save_on_home(
        &self,
        home: &NetworkIdentity,
        request: &QuerySaveRequest,
    ) -> Result<QuerySaveResponse, TransportError>;

    /// Best-effort mirror write on a network node.
    async fn save_on_node(
        &self,
        node: &NetworkIdentity,
        request: &QuerySaveRequest,
        correlation_id: &CorrelationId,
        universal_id: &UniversalId,
    ) -> Result<(), TransportError>;

    /// Canonical re-fetch of a saved query.
    async fn load_by_universal_id(
        &self,
        home: &NetworkIdentity,
        universal_id: &UniversalId,
    ) -> Result<QueryDefinition, TransportError>;

    /// Every saved query the home node holds for the calling user.
    async fn list_on_home(
        &self,
        home: &NetworkIdentity,
    ) -> Result<Vec<QueryDefinition>, TransportError>;

    async fn delete_on_home(
        &self,
        home: &NetworkIdentity,
        universal_id: &UniversalId,
        force: bool,
    ) -> Result<HomeDeleteResponse, TransportError>;

    async fn delete_on_node(
        &self,
        node: &NetworkIdentity,
        universal_id: &UniversalId,
        force: bool,
    ) -> Result<(), TransportError>;
}
