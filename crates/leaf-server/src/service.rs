//! NodeService: the single coordinator between HTTP handlers and the
//! saved-query store of one node.
//!
//! All node-side rules flow through [`NodeService`]; handlers are thin
//! wrappers that parse the request, take the service lock and delegate.

use tracing::{debug, info};

use leaf_core::{NodeSaveRequest, QueryDefinition, QuerySaveResponse, UniversalId};
use leaf_storage::{DeleteResult, InMemoryStore, QueryStore, SqliteStore, StorageError};

use crate::config::IN_MEMORY;
use crate::error::ApiError;

/// One respondent node's saved-query operations.
pub struct NodeService {
    store: Box<dyn QueryStore + Send>,
}

impl NodeService {
    /// Opens the store at `db_path`; `:memory:` selects [`InMemoryStore`].
    pub fn new(db_path: &str) -> Result<Self, ApiError> {
        if db_path == IN_MEMORY {
            return Ok(Self::in_memory());
        }
        Ok(NodeService {
            store: Box::new(SqliteStore::new(db_path)?),
        })
    }

    pub fn in_memory() -> Self {
        NodeService {
            store: Box::new(InMemoryStore::new()),
        }
    }

    pub fn with_store(store: Box<dyn QueryStore + Send>) -> Self {
        NodeService { store }
    }

    /// Authoritative save on behalf of `user`. Universal ids are assigned
    /// here: a request naming one must edit a query this node already holds.
    pub fn save(
        &mut self,
        request: &leaf_core::QuerySaveRequest,
        user: &str,
    ) -> Result<QuerySaveResponse, ApiError> {
        if let Some(universal_id) = &request.universal_id {
            self.store.load_query(universal_id)?;
        }
        let stored = self.store.save_query(request, user)?;
        let response = saved_response(&stored)?;
        info!(universal_id = %response.universal_id, ver = response.ver, owner = user, "query saved");
        Ok(response)
    }

    /// Mirror save of a query the home node already assigned `universal_id` to.
    pub fn mirror(
        &mut self,
        universal_id: &UniversalId,
        request: NodeSaveRequest,
        user: &str,
    ) -> Result<QuerySaveResponse, ApiError> {
        if let Some(body_id) = &request.query.universal_id {
            if body_id != universal_id {
                return Err(ApiError::BadRequest(format!(
                    "path id {universal_id} does not match body id {body_id}"
                )));
            }
        }
        let mut query = request.query;
        query.universal_id = Some(universal_id.clone());

        let stored = self.store.save_query(&query, user)?;
        debug!(
            universal_id = %universal_id,
            correlation_id = %request.correlation_id,
            "mirror saved"
        );
        saved_response(&stored)
    }

    /// Saved queries, optionally restricted to those `user` owns.
    pub fn list(&self, user: Option<&str>) -> Result<Vec<QueryDefinition>, ApiError> {
        let queries = self.store.list_queries()?;
        Ok(match user {
            Some(user) => queries
                .into_iter()
                .filter(|q| q.owner.as_deref().is_some_and(|o| o.starts_with(user)))
                .collect(),
            None => queries,
        })
    }

    pub fn get(&self, universal_id: &UniversalId) -> Result<QueryDefinition, ApiError> {
        Ok(self.store.load_query(universal_id)?)
    }

    /// Deletes a query owned by `user`. Without `force`, dependents make
    /// this fail with [`ApiError::DependentsExist`]. With `force`, it still
    /// fails that way while any dependent belongs to someone else.
    pub fn delete(
        &mut self,
        universal_id: &UniversalId,
        force: bool,
        user: &str,
    ) -> Result<Vec<UniversalId>, ApiError> {
        let target = self.store.load_query(universal_id)?;
        if let Some(owner) = target.owner.as_deref() {
            if !owner.starts_with(user) {
                return Err(StorageError::NotOwner {
                    universal_id: universal_id.clone(),
                    owner: owner.to_string(),
                }
                .into());
            }
        }

        if force {
            let dependents = self.store.dependents_of(universal_id)?;
            if dependents.iter().any(|d| !d.is_owned_by(user)) {
                return Err(ApiError::DependentsExist {
                    query: universal_id.clone(),
                    dependents,
                });
            }
        }

        match self.store.delete_query(universal_id, force)? {
            DeleteResult::Deleted(deleted) => {
                info!(universal_id = %universal_id, count = deleted.len(), force, "queries deleted");
                Ok(deleted)
            }
            DeleteResult::Conflict(dependents) => Err(ApiError::DependentsExist {
                query: universal_id.clone(),
                dependents,
            }),
        }
    }
}

fn saved_response(stored: &QueryDefinition) -> Result<QuerySaveResponse, ApiError> {
    match (&stored.universal_id, stored.ver) {
        (Some(universal_id), Some(ver)) => Ok(QuerySaveResponse {
            universal_id: universal_id.clone(),
            ver,
        }),
        _ => Err(ApiError::InternalError(
            "stored query is missing its universal id or version".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_core::{CorrelationId, Panel, PanelItem, QuerySaveRequest};

    fn request(name: &str, panels: Vec<Panel>) -> QuerySaveRequest {
        QuerySaveRequest::from_parts(None, None, name, "", &panels, &[])
    }

    #[test]
    fn list_filters_by_owner_prefix() {
        let mut service = NodeService::in_memory();
        service.save(&request("A", vec![]), "alice@leaf").unwrap();
        service.save(&request("C", vec![]), "bob@leaf").unwrap();

        assert_eq!(service.list(None).unwrap().len(), 2);
        let mine = service.list(Some("alice")).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].name, "A");
    }

    #[test]
    fn mirror_rejects_mismatched_ids() {
        let mut service = NodeService::in_memory();
        let mut query = request("A", vec![]);
        query.universal_id = Some("urn:leaf:query:other".into());
        let err = service
            .mirror(
                &"urn:leaf:query:a".into(),
                NodeSaveRequest {
                    correlation_id: CorrelationId("c".into()),
                    query,
                },
                "alice",
            )
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn delete_conflict_lists_dependents() {
        let mut service = NodeService::in_memory();
        let a = service.save(&request("A", vec![]), "alice").unwrap().universal_id;
        let embed = vec![Panel::with_items(0, vec![PanelItem::query(0, a.clone(), "A")])];
        service.save(&request("B", embed), "alice").unwrap();

        match service.delete(&a, false, "alice").unwrap_err() {
            ApiError::DependentsExist { dependents, .. } => assert_eq!(dependents[0].name, "B"),
            other => panic!("expected dependents conflict, got {other:?}"),
        }
        assert_eq!(service.delete(&a, true, "alice").unwrap().len(), 2);
    }

    #[test]
    fn forced_delete_refuses_while_someone_else_depends_on_the_query() {
        let mut service = NodeService::in_memory();
        let a = service.save(&request("A", vec![]), "alice").unwrap().universal_id;
        let embed = vec![Panel::with_items(0, vec![PanelItem::query(0, a.clone(), "A")])];
        let c = service.save(&request("C", embed.clone()), "bob").unwrap().universal_id;
        service.save(&request("B", embed), "alice").unwrap();

        match service.delete(&a, true, "alice").unwrap_err() {
            ApiError::DependentsExist { dependents, .. } => {
                assert_eq!(dependents.len(), 2);
                assert!(dependents.iter().any(|d| d.owner == "bob"));
            }
            other => panic!("expected dependents conflict, got {other:?}"),
        }
        assert_eq!(service.get(&c).unwrap().name, "C");
        assert_eq!(service.list(None).unwrap().len(), 3);
    }

    #[test]
    fn home_save_refuses_unknown_universal_id() {
        let mut service = NodeService::in_memory();
        let mut picked = request("A", vec![]);
        picked.universal_id = Some("client-picked".into());

        let err = service.save(&picked, "alice").unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
        assert!(service.list(None).unwrap().is_empty());
    }

    #[test]
    fn mirror_creates_unknown_universal_id() {
        let mut service = NodeService::in_memory();
        let saved = service
            .mirror(
                &"urn:leaf:query:from-home".into(),
                NodeSaveRequest {
                    correlation_id: CorrelationId("c".into()),
                    query: request("A", vec![]),
                },
                "alice",
            )
            .unwrap();
        assert_eq!(saved.universal_id, UniversalId::from("urn:leaf:query:from-home"));
        assert_eq!(saved.ver, 1);
    }

    #[test]
    fn only_the_owner_may_delete() {
        let mut service = NodeService::in_memory();
        let a = service.save(&request("A", vec![]), "alice").unwrap().universal_id;
        let err = service.delete(&a, false, "bob").unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }
}
