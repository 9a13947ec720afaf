//! The [`QueryStore`] trait defining the storage contract for saved queries.
//!
//! Two-layer API design:
//! - **Low-level CRUD** methods form the trait foundation and are all a
//!   backend has to provide.
//! - **High-level** provided methods (`save_query`, `load_query`,
//!   `delete_query`) implement the node-side rules on top of the CRUD
//!   primitives, so every backend behaves identically.
//!
//! The trait is synchronous; the HTTP layer serializes access behind an
//! async mutex.

use leaf_core::{
    Candidate, DependencyGraph, QueryDefinition, QueryDependent, QueryId, QuerySaveRequest,
    UniversalId, QUERY_URN_PREFIX,
};
use tracing::debug;

use crate::error::StorageError;
use crate::types::DeleteResult;

/// Mints a fresh universal id for a query saved for the first time.
pub fn mint_universal_id() -> UniversalId {
    UniversalId::new(format!("{}{}", QUERY_URN_PREFIX, uuid::Uuid::new_v4()))
}

/// The storage contract for saved queries on one node.
pub trait QueryStore {
    // -------------------------------------------------------------------
    // Low-level CRUD
    // -------------------------------------------------------------------

    /// Inserts a new query, returning its node-local id.
    ///
    /// `query.universal_id` must be set.
    fn insert_query(&mut self, query: &QueryDefinition) -> Result<QueryId, StorageError>;

    /// Overwrites an existing query identified by its universal id.
    fn update_query(&mut self, query: &QueryDefinition) -> Result<(), StorageError>;

    /// Retrieves a query by universal id.
    fn get_query(&self, universal_id: &UniversalId)
        -> Result<Option<QueryDefinition>, StorageError>;

    /// Removes a query. Returns `false` if it did not exist.
    fn remove_query(&mut self, universal_id: &UniversalId) -> Result<bool, StorageError>;

    /// Lists every stored query, ordered by local id.
    fn list_queries(&self) -> Result<Vec<QueryDefinition>, StorageError>;

    /// Removes several queries. Backends with transactions should override
    /// this to make the removal atomic.
    fn remove_queries(&mut self, universal_ids: &[UniversalId]) -> Result<(), StorageError> {
        for uid in universal_ids {
            self.remove_query(uid)?;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // High-level operations
    // -------------------------------------------------------------------

    /// Loads a query, failing with [`StorageError::QueryNotFound`].
    fn load_query(&self, universal_id: &UniversalId) -> Result<QueryDefinition, StorageError> {
        self.get_query(universal_id)?
            .ok_or_else(|| StorageError::QueryNotFound(universal_id.clone()))
    }

    /// Builds the dependency graph over every stored query.
    fn dependency_graph(&self) -> Result<DependencyGraph, StorageError> {
        Ok(DependencyGraph::from_queries(&self.list_queries()?))
    }

    /// Every stored query that transitively embeds `universal_id`.
    fn dependents_of(
        &self,
        universal_id: &UniversalId,
    ) -> Result<Vec<QueryDependent>, StorageError> {
        Ok(self.dependency_graph()?.dependents_of(universal_id))
    }

    /// Validates and stores a save request on behalf of `owner`.
    ///
    /// A request without a universal id is a first save and gets a freshly
    /// minted one. A request with a universal id updates the stored query,
    /// or creates it when this node has never seen it (mirror writes). The
    /// version is bumped on every save, inactive filters are dropped, and
    /// only the owner of an existing query may overwrite it. Returns the definition
    /// exactly as stored.
    fn save_query(
        &mut self,
        request: &QuerySaveRequest,
        owner: &str,
    ) -> Result<QueryDefinition, StorageError> {
        let existing = match &request.universal_id {
            Some(uid) => self.get_query(uid)?,
            None => None,
        };
        if let (Some(uid), Some(current_owner)) = (
            &request.universal_id,
            existing.as_ref().and_then(|q| q.owner.as_deref()),
        ) {
            if current_owner != owner {
                return Err(StorageError::NotOwner {
                    universal_id: uid.clone(),
                    owner: current_owner.to_string(),
                });
            }
        }
        let universal_id = request
            .universal_id
            .clone()
            .unwrap_or_else(mint_universal_id);

        let mut stored = QueryDefinition {
            id: existing.as_ref().and_then(|q| q.id),
            universal_id: Some(universal_id.clone()),
            ver: Some(existing.as_ref().and_then(|q| q.ver).unwrap_or(0) + 1),
            name: request.name.trim().to_string(),
            category: request.category.trim().to_string(),
            owner: existing
                .as_ref()
                .and_then(|q| q.owner.clone())
                .or_else(|| Some(owner.to_string())),
            panels: request.panels.clone(),
            panel_filters: request
                .panel_filters
                .iter()
                .filter(|pf| pf.is_active)
                .cloned()
                .collect(),
        };

        self.dependency_graph()?.validate(&Candidate::from(&stored))?;

        if existing.is_some() {
            self.update_query(&stored)?;
        } else {
            stored.id = Some(self.insert_query(&stored)?);
        }
        debug!(universal_id = %universal_id, ver = ?stored.ver, "query stored");
        Ok(stored)
    }

    /// Deletes a query, refusing when others depend on it unless `force`.
    ///
    /// A forced delete removes the target and every transitive dependent.
    fn delete_query(
        &mut self,
        universal_id: &UniversalId,
        force: bool,
    ) -> Result<DeleteResult, StorageError> {
        if self.get_query(universal_id)?.is_none() {
            return Err(StorageError::QueryNotFound(universal_id.clone()));
        }

        let dependents = self.dependents_of(universal_id)?;
        if !dependents.is_empty() && !force {
            return Ok(DeleteResult::Conflict(dependents));
        }

        let mut deleted = Vec::with_capacity(dependents.len() + 1);
        deleted.push(universal_id.clone());
        deleted.extend(dependents.into_iter().map(|d| d.universal_id));
        self.remove_queries(&deleted)?;
        debug!(universal_id = %universal_id, count = deleted.len(), force, "queries deleted");
        Ok(DeleteResult::Deleted(deleted))
    }
}
