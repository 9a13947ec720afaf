//! Explicit client workflow state.
//!
//! A [`Session`] holds what the user is working on (current query, panels,
//! filters), the collection of saved queries known to the client, the
//! concept index, and the per-node cohort correlation ids. Orchestrators take
//! a session by value and hand back the new snapshot in a [`Transition`]
//! together with the operation outcome, so there is no shared mutable state
//! between workflows.

use std::collections::{BTreeSet, HashMap};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use leaf_core::{
    CorrelationId, DependencyGraph, NodeId, Panel, PanelFilter, QueryDefinition, QueryId,
    QuerySaveRequest, UniversalId,
};

use crate::concepts::ConceptIndex;

/// The screen the user is looking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum View {
    #[default]
    FindPatients,
    PatientList,
    Visualize,
    Timelines,
}

/// Something to do once a save has completed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AfterSave {
    /// Start a fresh, empty query.
    StartNew,
    /// Open another saved query from the saved collection.
    OpenSaved(UniversalId),
    Navigate(View),
}

/// Identity and descriptive fields of the query being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentQuery {
    pub id: Option<QueryId>,
    pub universal_id: Option<UniversalId>,
    pub ver: Option<u32>,
    pub name: String,
    pub category: String,
    pub owner: Option<String>,
}

impl CurrentQuery {
    pub fn from_definition(def: &QueryDefinition) -> Self {
        CurrentQuery {
            id: def.id,
            universal_id: def.universal_id.clone(),
            ver: def.ver,
            name: def.name.clone(),
            category: def.category.clone(),
            owner: def.owner.clone(),
        }
    }
}

/// A new session snapshot plus the outcome of the operation that produced it.
#[derive(Debug)]
pub struct Transition<O> {
    pub session: Session,
    pub outcome: O,
}

impl<O> Transition<O> {
    pub fn new(session: Session, outcome: O) -> Self {
        Transition { session, outcome }
    }
}

/// Client workflow state for one user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Session {
    /// Caller identity compared against dependent owners.
    pub user: String,
    pub current: CurrentQuery,
    pub panels: Vec<Panel>,
    pub panel_filters: Vec<PanelFilter>,
    /// Saved queries known to this client, in insertion order.
    pub saved: IndexMap<UniversalId, QueryDefinition>,
    pub concepts: ConceptIndex,
    pub view: View,
    /// Cohort query id each network node returned for the current panels.
    pub network_cohorts: HashMap<NodeId, CorrelationId>,
    /// Pending post-save action, taken out by a successful save.
    pub after_save: Option<AfterSave>,
}

impl Session {
    pub fn new(user: impl Into<String>) -> Self {
        Session {
            user: user.into(),
            ..Session::default()
        }
    }

    /// Adds saved queries, replacing entries with the same universal id.
    pub fn with_saved(mut self, queries: impl IntoIterator<Item = QueryDefinition>) -> Self {
        for query in queries {
            self.upsert_saved(query);
        }
        self
    }

    /// Makes `def` the query being edited, loading its panels and filters.
    pub fn set_current(&mut self, def: &QueryDefinition) {
        self.current = CurrentQuery::from_definition(def);
        self.panels = def.panels.clone();
        self.panel_filters = def.panel_filters.clone();
    }

    /// Clears the query being edited and its panels. Panel filters are
    /// global toggles and stay as they are.
    pub fn reset_current(&mut self) {
        self.current = CurrentQuery::default();
        self.panels.clear();
        self.network_cohorts.clear();
    }

    /// Stores a saved query. Returns `false` for definitions without a
    /// universal id, which cannot be tracked.
    pub fn upsert_saved(&mut self, def: QueryDefinition) -> bool {
        match def.universal_id.clone() {
            Some(uid) => {
                self.saved.insert(uid, def);
                true
            }
            None => false,
        }
    }

    /// Removes saved queries, returning the ones that were present.
    pub fn remove_saved(&mut self, ids: &BTreeSet<UniversalId>) -> Vec<QueryDefinition> {
        ids.iter()
            .filter_map(|uid| self.saved.shift_remove(uid))
            .collect()
    }

    pub fn saved_queries(&self) -> Vec<QueryDefinition> {
        self.saved.values().cloned().collect()
    }

    /// The query being edited as a full definition.
    pub fn candidate(&self) -> QueryDefinition {
        QueryDefinition {
            id: self.current.id,
            universal_id: self.current.universal_id.clone(),
            ver: self.current.ver,
            name: self.current.name.clone(),
            category: self.current.category.clone(),
            owner: self.current.owner.clone(),
            panels: self.panels.clone(),
            panel_filters: self.panel_filters.clone(),
        }
    }

    /// Wire payload for saving the query being edited. Inactive filters
    /// and the local id are left out.
    pub fn save_request(&self) -> QuerySaveRequest {
        QuerySaveRequest::from_parts(
            self.current.universal_id.clone(),
            self.current.ver,
            &self.current.name,
            &self.current.category,
            &self.panels,
            &self.panel_filters,
        )
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_queries(self.saved.values())
    }

    pub fn is_current(&self, universal_id: &UniversalId) -> bool {
        self.current.universal_id.as_ref() == Some(universal_id)
    }

    /// Applies a post-save action. Consuming the action makes running it
    /// twice impossible. Returns `false` when the action could not be
    /// carried out (unknown saved query).
    pub fn apply(&mut self, action: AfterSave) -> bool {
        match action {
            AfterSave::StartNew => {
                self.reset_current();
                self.view = View::FindPatients;
                true
            }
            AfterSave::OpenSaved(uid) => match self.saved.get(&uid).cloned() {
                Some(def) => {
                    self.set_current(&def);
                    self.view = View::FindPatients;
                    true
                }
                None => false,
            },
            AfterSave::Navigate(view) => {
                self.view = view;
                true
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leaf_core::PanelItem;

    fn saved(uid: &str, name: &str) -> QueryDefinition {
        let mut def = QueryDefinition::new(name, "");
        def.id = Some(QueryId(7));
        def.universal_id = Some(uid.into());
        def.panels = vec![Panel::with_items(0, vec![PanelItem::concept(0, "dx")])];
        def
    }

    #[test]
    fn save_request_uses_current_identity_only() {
        let mut session = Session::new("alice");
        session.set_current(&saved("u1", "A"));
        let req = session.save_request();
        assert_eq!(req.universal_id, Some("u1".into()));
        assert_eq!(req.name, "A");
        assert_eq!(req.panels.len(), 1);
    }

    #[test]
    fn reset_clears_query_and_panels_but_keeps_filters() {
        let mut session = Session::new("alice");
        let mut def = saved("u1", "A");
        def.panel_filters.push(PanelFilter {
            id: 1,
            concept_id: "f".into(),
            include: true,
            is_active: true,
        });
        session.set_current(&def);
        session.reset_current();
        assert_eq!(session.current, CurrentQuery::default());
        assert!(session.panels.is_empty());
        assert_eq!(session.panel_filters.len(), 1);
    }

    #[test]
    fn remove_saved_reports_only_present_entries() {
        let mut session = Session::new("alice").with_saved([saved("u1", "A"), saved("u2", "B")]);
        let ids: BTreeSet<UniversalId> = ["u1".into(), "missing".into()].into_iter().collect();
        let removed = session.remove_saved(&ids);
        assert_eq!(removed.len(), 1);
        assert_eq!(session.saved.len(), 1);
    }

    #[test]
    fn open_saved_action_switches_current_query() {
        let mut session = Session::new("alice").with_saved([saved("u1", "A")]);
        session.view = View::Visualize;
        assert!(session.apply(AfterSave::OpenSaved("u1".into())));
        assert!(session.is_current(&"u1".into()));
        assert_eq!(session.view, View::FindPatients);
        assert!(!session.apply(AfterSave::OpenSaved("nope".into())));
    }
}
