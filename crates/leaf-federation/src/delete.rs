//! Delete orchestration with the two-step cascading confirmation.
//!
//! The home node is asked first. A clean delete is committed to the session
//! and mirrored to network nodes. A dependents conflict is either rejected
//! outright (someone else owns a dependent) or turned into a
//! [`PendingCascade`] the caller confirms or declines; confirming re-runs the
//! delete with `force` set and the listed dependents.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use leaf_core::{QueryDefinition, QueryDependent, UniversalId};

use crate::error::FederationError;
use crate::fanout::{fan_out, NodeStatus, PropagationReport};
use crate::federation::FederationContext;
use crate::session::{Session, Transition, View};
use crate::transport::HomeDeleteResponse;

/// The query a delete targets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryRef {
    pub universal_id: UniversalId,
    pub name: String,
}

impl QueryRef {
    pub fn new(universal_id: impl Into<UniversalId>, name: impl Into<String>) -> Self {
        QueryRef {
            universal_id: universal_id.into(),
            name: name.into(),
        }
    }

    /// `None` for definitions that were never saved.
    pub fn from_definition(def: &QueryDefinition) -> Option<Self> {
        Some(QueryRef {
            universal_id: def.universal_id.clone()?,
            name: def.display_name(),
        })
    }
}

/// A cascading delete waiting for the user's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCascade {
    pub target: QueryRef,
    /// Exactly the dependents the home node reported, all owned by the caller.
    pub dependents: Vec<QueryDependent>,
}

impl PendingCascade {
    pub fn header(&self) -> &'static str {
        "Delete Dependent Queries"
    }

    /// Confirmation text naming the dependent count and an example.
    pub fn prompt(&self) -> String {
        match self.dependents.as_slice() {
            [] => format!("Do you want to delete \"{}\"?", self.target.name),
            [only] => format!(
                "Another saved query, \"{}\", depends on this query. Do you want to proceed? \
                 This will delete both \"{}\" and \"{}\".",
                only.name, self.target.name, only.name
            ),
            [first, ..] => format!(
                "There are {cnt} other saved queries that depend on this query, including \"{}\". \
                 Do you want to proceed? This will delete \"{}\" and the {cnt} other dependent queries.",
                first.name,
                self.target.name,
                cnt = self.dependents.len()
            ),
        }
    }
}

/// The user's answer to a [`PendingCascade`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Yes,
    No,
}

/// A delete committed on the home node.
#[derive(Debug)]
pub struct DeletedReport {
    /// Target first, then the removed dependents.
    pub deleted: Vec<UniversalId>,
    pub propagation: PropagationReport,
    /// Whether the query being edited was among the deleted ones.
    pub reset_current: bool,
}

#[derive(Debug)]
pub enum DeleteOutcome {
    Deleted(DeletedReport),
    Rejected(FederationError),
    NeedsConfirmation(PendingCascade),
    /// The user declined the cascading delete.
    Cancelled,
}

impl DeleteOutcome {
    pub fn is_deleted(&self) -> bool {
        matches!(self, DeleteOutcome::Deleted(_))
    }

    pub fn rejection(&self) -> Option<&FederationError> {
        match self {
            DeleteOutcome::Rejected(err) => Some(err),
            _ => None,
        }
    }
}

pub struct DeleteOrchestrator<'a> {
    ctx: &'a FederationContext,
}

impl<'a> DeleteOrchestrator<'a> {
    pub fn new(ctx: &'a FederationContext) -> Self {
        DeleteOrchestrator { ctx }
    }

    /// Deletes `target`, and with `force` also `known_dependents`.
    ///
    /// Every outcome other than `Deleted` returns the input session unchanged.
    pub async fn delete(
        &self,
        session: Session,
        target: &QueryRef,
        force: bool,
        known_dependents: &[QueryDependent],
    ) -> Transition<DeleteOutcome> {
        let home = self.ctx.registry.home();
        let response = match self
            .ctx
            .transport
            .delete_on_home(home, &target.universal_id, force)
            .await
        {
            Ok(response) => response,
            Err(source) => {
                return Transition::new(
                    session,
                    DeleteOutcome::Rejected(FederationError::HomeOperation {
                        operation: "delete",
                        source,
                    }),
                )
            }
        };

        match response {
            HomeDeleteResponse::Deleted { deleted } => {
                self.commit(session, target, force, known_dependents, deleted)
                    .await
            }
            HomeDeleteResponse::Conflict { dependents } if force => {
                warn!(
                    universal_id = %target.universal_id,
                    count = dependents.len(),
                    "forced delete answered with a dependents conflict"
                );
                Transition::new(
                    session,
                    DeleteOutcome::Rejected(FederationError::ForcedDeleteConflict {
                        query: target.name.clone(),
                        dependents,
                    }),
                )
            }
            HomeDeleteResponse::Conflict { dependents } => {
                let foreign: Vec<QueryDependent> = dependents
                    .iter()
                    .filter(|d| !d.is_owned_by(&session.user))
                    .cloned()
                    .collect();
                let outcome = if foreign.is_empty() {
                    DeleteOutcome::NeedsConfirmation(PendingCascade {
                        target: target.clone(),
                        dependents,
                    })
                } else {
                    info!(
                        universal_id = %target.universal_id,
                        blocking = foreign.len(),
                        "delete blocked by dependents owned by other users"
                    );
                    DeleteOutcome::Rejected(FederationError::ForeignDependents {
                        query: target.name.clone(),
                        blocking: foreign,
                    })
                };
                Transition::new(session, outcome)
            }
        }
    }

    /// Resolves a pending cascade. `Yes` re-runs the delete forced with the
    /// pending dependents; `No` leaves the session as it is.
    pub async fn confirm(
        &self,
        session: Session,
        pending: PendingCascade,
        decision: Decision,
    ) -> Transition<DeleteOutcome> {
        match decision {
            Decision::Yes => {
                self.delete(session, &pending.target, true, &pending.dependents)
                    .await
            }
            Decision::No => Transition::new(session, DeleteOutcome::Cancelled),
        }
    }

    async fn commit(
        &self,
        mut session: Session,
        target: &QueryRef,
        force: bool,
        known_dependents: &[QueryDependent],
        home_deleted: Vec<UniversalId>,
    ) -> Transition<DeleteOutcome> {
        let mut dependents: Vec<UniversalId> = Vec::new();
        for uid in known_dependents
            .iter()
            .map(|d| &d.universal_id)
            .chain(home_deleted.iter())
        {
            if uid != &target.universal_id && !dependents.contains(uid) {
                dependents.push(uid.clone());
            }
        }

        let removed: BTreeSet<UniversalId> = std::iter::once(target.universal_id.clone())
            .chain(dependents.iter().cloned())
            .collect();
        let reset_current = removed
            .iter()
            .any(|uid| session.is_current(uid));
        session.remove_saved(&removed);
        if reset_current {
            session.reset_current();
            session.view = View::default();
        }
        self.ctx.refresh_concepts(&mut session).await;
        info!(
            universal_id = %target.universal_id,
            dependents = dependents.len(),
            "deleted on home node"
        );

        let propagation = self.propagate(target, force, &dependents).await;

        let mut deleted = Vec::with_capacity(dependents.len() + 1);
        deleted.push(target.universal_id.clone());
        deleted.extend(dependents);
        Transition::new(
            session,
            DeleteOutcome::Deleted(DeletedReport {
                deleted,
                propagation,
                reset_current,
            }),
        )
    }

    /// Per node, dependents go first so the target delete cannot conflict.
    async fn propagate(
        &self,
        target: &QueryRef,
        force: bool,
        dependents: &[UniversalId],
    ) -> PropagationReport {
        let transport = &self.ctx.transport;
        let force = force || !dependents.is_empty();

        fan_out("delete", self.ctx.registry.network_nodes(), |node| async move {
            let mut failures = Vec::new();
            for uid in dependents.iter().chain(std::iter::once(&target.universal_id)) {
                if let Err(err) = transport.delete_on_node(node, uid, force).await {
                    failures.push(format!("{uid}: {err}"));
                }
            }
            if failures.is_empty() {
                NodeStatus::Propagated
            } else {
                NodeStatus::Failed(failures.join("; "))
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dependent(name: &str) -> QueryDependent {
        QueryDependent {
            universal_id: format!("urn:leaf:query:{name}").into(),
            name: name.to_string(),
            owner: "alice@leaf".to_string(),
        }
    }

    #[test]
    fn single_dependent_prompt_names_both_queries() {
        let pending = PendingCascade {
            target: QueryRef::new("urn:leaf:query:A", "A"),
            dependents: vec![dependent("B")],
        };
        let prompt = pending.prompt();
        assert!(prompt.contains("\"B\""));
        assert!(prompt.contains("both \"A\" and \"B\""));
    }

    #[test]
    fn several_dependents_prompt_reports_count() {
        let pending = PendingCascade {
            target: QueryRef::new("urn:leaf:query:A", "A"),
            dependents: vec![dependent("B"), dependent("C")],
        };
        let prompt = pending.prompt();
        assert!(prompt.starts_with("There are 2 other saved queries"));
        assert!(prompt.contains("including \"B\""));
    }

    #[test]
    fn unsaved_definition_has_no_ref() {
        assert!(QueryRef::from_definition(&QueryDefinition::new("draft", "")).is_none());
    }
}
