//! DependencyGraph: the embed relation between saved queries.
//!
//! An edge `dependent -> dependee` exists when a panel of `dependent` embeds
//! `dependee` as a sub-query. The graph over all saved queries must stay
//! acyclic; [`DependencyGraph::validate`] is the gate that checks a candidate
//! save before anything is written.
//!
//! Nodes are keyed by [`UniversalId`]. A query that is referenced but not
//! (yet) known gets a placeholder node without a name so edges can still be
//! recorded.

use std::collections::{BTreeSet, HashMap, VecDeque};

use petgraph::graph::NodeIndex;
use petgraph::stable_graph::StableGraph;
use petgraph::visit::EdgeRef;
use petgraph::{Directed, Direction};

use crate::error::CoreError;
use crate::id::UniversalId;
use crate::query::{QueryDefinition, QueryDependent};
use crate::wire::QuerySaveRequest;

/// Graph vertex for one saved query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyNode {
    pub universal_id: UniversalId,
    /// `None` for placeholders of queries referenced but not loaded.
    pub name: Option<String>,
    pub owner: Option<String>,
}

impl DependencyNode {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.universal_id.as_str())
    }
}

/// The proposed state of a query about to be saved.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// `None` for a query that has never been saved.
    pub universal_id: Option<UniversalId>,
    pub name: String,
    pub dependees: BTreeSet<UniversalId>,
}

impl From<&QueryDefinition> for Candidate {
    fn from(def: &QueryDefinition) -> Self {
        Candidate {
            universal_id: def.universal_id.clone(),
            name: def.name.clone(),
            dependees: def.embedded_queries(),
        }
    }
}

impl From<&QuerySaveRequest> for Candidate {
    fn from(req: &QuerySaveRequest) -> Self {
        Candidate {
            universal_id: req.universal_id.clone(),
            name: req.name.clone(),
            dependees: req.embedded_queries(),
        }
    }
}

/// Directed embed graph over saved queries.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: StableGraph<DependencyNode, (), Directed, u32>,
    index: HashMap<UniversalId, NodeIndex<u32>>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the graph for a collection of saved queries. Unsaved
    /// definitions are skipped.
    pub fn from_queries<'a>(queries: impl IntoIterator<Item = &'a QueryDefinition>) -> Self {
        let mut graph = DependencyGraph::new();
        for query in queries {
            graph.upsert(query);
        }
        graph
    }

    pub fn node(&self, universal_id: &UniversalId) -> Option<&DependencyNode> {
        self.index
            .get(universal_id)
            .and_then(|&idx| self.graph.node_weight(idx))
    }

    /// Inserts or replaces a saved query and its outgoing edges.
    ///
    /// Returns `false` (and does nothing) for a definition without a
    /// universal id.
    pub fn upsert(&mut self, query: &QueryDefinition) -> bool {
        let Some(uid) = &query.universal_id else {
            return false;
        };
        let idx = self.ensure_node(uid);
        if let Some(node) = self.graph.node_weight_mut(idx) {
            node.name = Some(query.name.clone());
            node.owner = query.owner.clone();
        }

        let stale: Vec<_> = self
            .graph
            .edges_directed(idx, Direction::Outgoing)
            .map(|e| e.id())
            .collect();
        for edge in stale {
            self.graph.remove_edge(edge);
        }

        for dependee in query.embedded_queries() {
            let target = self.ensure_node(&dependee);
            self.graph.add_edge(idx, target, ());
        }
        true
    }

    /// Every query that transitively embeds `universal_id`, sorted by
    /// universal id. Placeholder nodes never appear because they have no
    /// outgoing edges.
    pub fn dependents(&self, universal_id: &UniversalId) -> Vec<&DependencyNode> {
        let Some(&start) = self.index.get(universal_id) else {
            return Vec::new();
        };

        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([start]);
        while let Some(idx) = queue.pop_front() {
            for src in self.graph.neighbors_directed(idx, Direction::Incoming) {
                if src != start && seen.insert(src) {
                    queue.push_back(src);
                }
            }
        }

        let mut nodes: Vec<&DependencyNode> = seen
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx))
            .collect();
        nodes.sort_by(|a, b| a.universal_id.cmp(&b.universal_id));
        nodes
    }

    /// [`DependencyGraph::dependents`] as reporting projections.
    pub fn dependents_of(&self, universal_id: &UniversalId) -> Vec<QueryDependent> {
        self.dependents(universal_id)
            .into_iter()
            .map(|node| QueryDependent {
                universal_id: node.universal_id.clone(),
                name: node.display_name().to_string(),
                owner: node.owner.clone().unwrap_or_default(),
            })
            .collect()
    }

    /// Checks that saving `candidate` keeps the graph acyclic.
    ///
    /// The candidate's proposed edges replace its current outgoing edges. For
    /// each proposed dependee (in sorted order) the graph is searched for a
    /// path from that dependee back to the candidate; the first hit is
    /// reported. A candidate without a universal id cannot be embedded by
    /// anything yet and always validates. Performs no writes.
    pub fn validate(&self, candidate: &Candidate) -> Result<(), CoreError> {
        let Some(target_uid) = &candidate.universal_id else {
            return Ok(());
        };

        for dependee in &candidate.dependees {
            if dependee == target_uid {
                return Err(CoreError::RecursiveDependency {
                    query: candidate.name.clone(),
                    offending: candidate.name.clone(),
                    offending_id: dependee.clone(),
                    path: vec![target_uid.clone(), target_uid.clone()],
                });
            }

            let (Some(&from), Some(&to)) = (self.index.get(dependee), self.index.get(target_uid))
            else {
                continue;
            };

            // Any path ending at the candidate stops there, so the
            // candidate's stale outgoing edges never influence the search.
            let found = petgraph::algo::astar(&self.graph, from, |n| n == to, |_| 0u32, |_| 0u32);
            if let Some((_, hops)) = found {
                let mut path = Vec::with_capacity(hops.len() + 1);
                path.push(target_uid.clone());
                path.extend(
                    hops.into_iter()
                        .filter_map(|idx| self.graph.node_weight(idx))
                        .map(|node| node.universal_id.clone()),
                );
                let offending = self
                    .node(dependee)
                    .map(|n| n.display_name().to_string())
                    .unwrap_or_else(|| dependee.to_string());
                return Err(CoreError::RecursiveDependency {
                    query: candidate.name.clone(),
                    offending,
                    offending_id: dependee.clone(),
                    path,
                });
            }
        }

        Ok(())
    }

    fn ensure_node(&mut self, uid: &UniversalId) -> NodeIndex<u32> {
        if let Some(&idx) = self.index.get(uid) {
            return idx;
        }
        let idx = self.graph.add_node(DependencyNode {
            universal_id: uid.clone(),
            name: None,
            owner: None,
        });
        self.index.insert(uid.clone(), idx);
        idx
    }
}
