//! Payloads exchanged between a client and respondent nodes.
//!
//! Only universal ids travel in these types. [`QuerySaveRequest`] has no
//! field for the node-local [`crate::QueryId`], and building one from a
//! definition drops inactive panel filters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::id::{CorrelationId, UniversalId};
use crate::query::{Panel, PanelFilter, QueryDefinition, QueryDependent};

/// Header carrying the caller's identity on every node request.
pub const USER_HEADER: &str = "x-leaf-user";

/// Body of a save request, sent to the home node and mirrored to network nodes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySaveRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub universal_id: Option<UniversalId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ver: Option<u32>,
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub panels: Vec<Panel>,
    #[serde(default)]
    pub panel_filters: Vec<PanelFilter>,
}

impl QuerySaveRequest {
    /// Builds a request from its parts, keeping only active filters.
    pub fn from_parts(
        universal_id: Option<UniversalId>,
        ver: Option<u32>,
        name: &str,
        category: &str,
        panels: &[Panel],
        panel_filters: &[PanelFilter],
    ) -> Self {
        QuerySaveRequest {
            universal_id,
            ver,
            name: name.to_string(),
            category: category.to_string(),
            panels: panels.to_vec(),
            panel_filters: panel_filters
                .iter()
                .filter(|pf| pf.is_active)
                .cloned()
                .collect(),
        }
    }

    /// Builds a request carrying a stored definition's content.
    pub fn from_definition(def: &QueryDefinition) -> Self {
        Self::from_parts(
            def.universal_id.clone(),
            def.ver,
            &def.name,
            &def.category,
            &def.panels,
            &def.panel_filters,
        )
    }

    pub fn embedded_queries(&self) -> BTreeSet<UniversalId> {
        self.panels
            .iter()
            .flat_map(Panel::embedded_queries)
            .cloned()
            .collect()
    }
}

/// Home node answer to a successful save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySaveResponse {
    pub universal_id: UniversalId,
    pub ver: u32,
}

/// Body of a mirror save sent to a network node.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeSaveRequest {
    pub correlation_id: CorrelationId,
    pub query: QuerySaveRequest,
}

/// Successful delete: every universal id the node removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteQueryResponse {
    pub deleted: Vec<UniversalId>,
}

/// A non-forced delete refused because other saved queries depend on the target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependentsConflict {
    pub dependents: Vec<QueryDependent>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn save_request_drops_inactive_filters() {
        let filters = vec![
            PanelFilter {
                id: 1,
                concept_id: "a".into(),
                include: true,
                is_active: false,
            },
            PanelFilter {
                id: 2,
                concept_id: "b".into(),
                include: false,
                is_active: true,
            },
        ];
        let req = QuerySaveRequest::from_parts(None, None, "A", "", &[], &filters);
        assert_eq!(req.panel_filters.len(), 1);
        assert_eq!(req.panel_filters[0].id, 2);
    }

    #[test]
    fn save_request_never_serializes_local_id() {
        let mut def = QueryDefinition::new("A", "cat");
        def.id = Some(crate::QueryId(42));
        def.universal_id = Some("urn:leaf:query:a".into());
        let json = serde_json::to_value(QuerySaveRequest::from_definition(&def)).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["universal_id"], "urn:leaf:query:a");
    }
}
