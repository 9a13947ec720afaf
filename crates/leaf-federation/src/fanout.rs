//! Best-effort parallel propagation to network nodes.
//!
//! [`fan_out`] runs one call per node concurrently, waits for every call to
//! settle, and records a [`NodeOutcome`] for each. A failing node never
//! cancels or fails the others.

use std::future::Future;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use leaf_core::{NetworkIdentity, NodeId};

/// Result of propagating one operation to one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "snake_case")]
pub enum NodeStatus {
    Propagated,
    Failed(String),
    /// The call was not attempted.
    Skipped(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeOutcome {
    pub node: NodeId,
    pub name: String,
    pub status: NodeStatus,
}

/// Per-node outcomes of one fan-out, in registry order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PropagationReport {
    pub outcomes: Vec<NodeOutcome>,
}

impl PropagationReport {
    pub fn propagated(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status == NodeStatus::Propagated)
    }

    pub fn failed(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Failed(_)))
    }

    pub fn skipped(&self) -> impl Iterator<Item = &NodeOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.status, NodeStatus::Skipped(_)))
    }

    pub fn status_of(&self, node: NodeId) -> Option<&NodeStatus> {
        self.outcomes
            .iter()
            .find(|o| o.node == node)
            .map(|o| &o.status)
    }

    /// `true` when every node received the operation.
    pub fn is_complete(&self) -> bool {
        self.outcomes
            .iter()
            .all(|o| o.status == NodeStatus::Propagated)
    }
}

/// Runs `call` against every node concurrently and collects the outcomes.
pub(crate) async fn fan_out<'a, I, F, Fut>(operation: &str, nodes: I, call: F) -> PropagationReport
where
    I: IntoIterator<Item = &'a NetworkIdentity>,
    F: Fn(&'a NetworkIdentity) -> Fut,
    Fut: Future<Output = NodeStatus>,
{
    let pending = nodes.into_iter().map(|node| {
        let fut = call(node);
        async move {
            let status = fut.await;
            match &status {
                NodeStatus::Propagated => {
                    debug!(node = %node.id, name = %node.name, operation, "propagated")
                }
                NodeStatus::Failed(reason) => {
                    warn!(node = %node.id, name = %node.name, operation, %reason, "network node failed")
                }
                NodeStatus::Skipped(reason) => {
                    warn!(node = %node.id, name = %node.name, operation, %reason, "network node skipped")
                }
            }
            NodeOutcome {
                node: node.id,
                name: node.name.clone(),
                status,
            }
        }
    });

    PropagationReport {
        outcomes: join_all(pending).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn node(id: u32) -> NetworkIdentity {
        NetworkIdentity {
            id: NodeId(id),
            name: format!("n{id}"),
            address: String::new(),
            enabled: true,
            is_home_node: false,
        }
    }

    #[tokio::test]
    async fn every_node_settles_even_when_one_fails() {
        let nodes = vec![node(1), node(2), node(3)];
        let calls = AtomicUsize::new(0);
        let report = fan_out("save", &nodes, |n| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                if n.id == NodeId(2) {
                    NodeStatus::Failed("boom".into())
                } else {
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    NodeStatus::Propagated
                }
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(report.outcomes.len(), 3);
        assert_eq!(report.propagated().count(), 2);
        assert_eq!(report.failed().count(), 1);
        assert!(!report.is_complete());
        assert_eq!(
            report.status_of(NodeId(2)),
            Some(&NodeStatus::Failed("boom".into()))
        );
    }

    #[tokio::test]
    async fn no_nodes_is_a_complete_report() {
        let report = fan_out("delete", &Vec::<NetworkIdentity>::new(), |_| async {
            NodeStatus::Propagated
        })
        .await;
        assert!(report.outcomes.is_empty());
        assert!(report.is_complete());
    }
}
