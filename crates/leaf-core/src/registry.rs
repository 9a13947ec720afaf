//! Respondent node registry.
//!
//! [`NodeRegistry`] partitions the known nodes into exactly one home node
//! and any number of network nodes. A registry with zero or several home
//! nodes cannot be constructed.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::id::NodeId;

/// A respondent node as known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    pub id: NodeId,
    pub name: String,
    /// Base URL of the node's API.
    pub address: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default)]
    pub is_home_node: bool,
}

fn enabled_by_default() -> bool {
    true
}

/// The validated set of respondent nodes.
#[derive(Debug, Clone)]
pub struct NodeRegistry {
    home: NetworkIdentity,
    others: Vec<NetworkIdentity>,
}

impl NodeRegistry {
    /// Validates and partitions `nodes`.
    ///
    /// Fails on duplicate node ids and on anything other than exactly one
    /// home node.
    pub fn new(nodes: impl IntoIterator<Item = NetworkIdentity>) -> Result<Self, CoreError> {
        let mut seen = HashSet::new();
        let mut homes = Vec::new();
        let mut others = Vec::new();

        for node in nodes {
            if !seen.insert(node.id) {
                return Err(CoreError::DuplicateNode { id: node.id });
            }
            if node.is_home_node {
                homes.push(node);
            } else {
                others.push(node);
            }
        }

        if homes.len() > 1 {
            return Err(CoreError::MultipleHomeNodes {
                ids: homes.iter().map(|n| n.id).collect(),
            });
        }
        let home = homes.pop().ok_or(CoreError::NoHomeNode)?;

        Ok(NodeRegistry { home, others })
    }

    /// The single authoritative node.
    pub fn home(&self) -> &NetworkIdentity {
        &self.home
    }

    /// Enabled nodes other than the home node.
    pub fn network_nodes(&self) -> impl Iterator<Item = &NetworkIdentity> {
        self.others.iter().filter(|n| n.enabled)
    }

    pub fn get(&self, id: NodeId) -> Option<&NetworkIdentity> {
        std::iter::once(&self.home)
            .chain(self.others.iter())
            .find(|n| n.id == id)
    }

    /// Total number of registered nodes, home included.
    pub fn len(&self) -> usize {
        self.others.len() + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u32, enabled: bool, home: bool) -> NetworkIdentity {
        NetworkIdentity {
            id: NodeId(id),
            name: format!("node-{id}"),
            address: format!("http://node-{id}.example"),
            enabled,
            is_home_node: home,
        }
    }

    #[test]
    fn network_nodes_exclude_home_and_disabled() {
        let registry = NodeRegistry::new(vec![
            node(0, true, true),
            node(1, true, false),
            node(2, false, false),
            node(3, true, false),
        ])
        .unwrap();

        assert_eq!(registry.home().id, NodeId(0));
        let ids: Vec<NodeId> = registry.network_nodes().map(|n| n.id).collect();
        assert_eq!(ids, vec![NodeId(1), NodeId(3)]);
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn missing_home_is_a_configuration_error() {
        let err = NodeRegistry::new(vec![node(1, true, false)]).unwrap_err();
        assert_eq!(err, CoreError::NoHomeNode);
    }

    #[test]
    fn two_homes_are_a_configuration_error() {
        let err = NodeRegistry::new(vec![node(0, true, true), node(1, true, true)]).unwrap_err();
        assert!(matches!(err, CoreError::MultipleHomeNodes { ids } if ids.len() == 2));
    }

    #[test]
    fn duplicate_ids_are_rejected() {
        let err = NodeRegistry::new(vec![node(0, true, true), node(0, true, false)]).unwrap_err();
        assert_eq!(err, CoreError::DuplicateNode { id: NodeId(0) });
    }

    #[test]
    fn disabled_home_is_still_the_home() {
        let registry = NodeRegistry::new(vec![node(0, false, true)]).unwrap();
        assert_eq!(registry.home().id, NodeId(0));
        assert_eq!(registry.network_nodes().count(), 0);
    }
}
