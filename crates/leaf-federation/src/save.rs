//! Save orchestration.
//!
//! Validate locally, persist on the home node, re-fetch the canonical
//! definition, update the session, then mirror to every enabled network
//! node. Nothing leaves the client before local validation passes, and no
//! network node is called before the home node has answered.

use std::sync::Arc;

use tracing::info;

use leaf_core::{Candidate, QueryDefinition, QuerySaveRequest, UniversalId};

use crate::error::FederationError;
use crate::fanout::{fan_out, NodeStatus, PropagationReport};
use crate::federation::FederationContext;
use crate::session::{AfterSave, Session, Transition};

/// A save committed on the home node.
#[derive(Debug)]
pub struct SavedReport {
    pub universal_id: UniversalId,
    /// The home node's canonical copy of what was stored.
    pub query: QueryDefinition,
    pub propagation: PropagationReport,
    /// Post-save action taken out of the session; the caller applies it.
    pub after_save: Option<AfterSave>,
}

#[derive(Debug)]
pub enum SaveOutcome {
    Saved(SavedReport),
    Rejected(FederationError),
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved(_))
    }

    pub fn rejection(&self) -> Option<&FederationError> {
        match self {
            SaveOutcome::Rejected(err) => Some(err),
            SaveOutcome::Saved(_) => None,
        }
    }
}

pub struct SaveOrchestrator<'a> {
    ctx: &'a FederationContext,
}

impl<'a> SaveOrchestrator<'a> {
    pub fn new(ctx: &'a FederationContext) -> Self {
        SaveOrchestrator { ctx }
    }

    /// Saves the session's current query.
    ///
    /// On rejection the returned session is the input session, untouched.
    pub async fn save(&self, mut session: Session) -> Transition<SaveOutcome> {
        if session.current.universal_id.is_some() {
            let candidate = Candidate::from(&session.candidate());
            if let Err(err) = session.dependency_graph().validate(&candidate) {
                info!(query = %candidate.name, "save rejected: {err}");
                return Transition::new(session, SaveOutcome::Rejected(err.into()));
            }
        }

        let home = self.ctx.registry.home();
        let request = session.save_request();
        let saved = match self.ctx.transport.save_on_home(home, &request).await {
            Ok(saved) => saved,
            Err(source) => {
                let err = FederationError::home_save(source);
                info!(query = %request.name, "save rejected by home node: {err}");
                return Transition::new(session, SaveOutcome::Rejected(err));
            }
        };
        info!(universal_id = %saved.universal_id, ver = saved.ver, "saved on home node");

        let canonical = match self
            .ctx
            .transport
            .load_by_universal_id(home, &saved.universal_id)
            .await
        {
            Ok(def) => def,
            Err(source) => {
                return Transition::new(
                    session,
                    SaveOutcome::Rejected(FederationError::HomeOperation {
                        operation: "load",
                        source,
                    }),
                )
            }
        };

        session.set_current(&canonical);
        session.upsert_saved(canonical.clone());
        self.ctx.refresh_concepts(&mut session).await;

        let propagation = self.propagate(&session, &canonical, &saved.universal_id).await;
        let after_save = session.after_save.take();

        Transition::new(
            session,
            SaveOutcome::Saved(SavedReport {
                universal_id: saved.universal_id,
                query: canonical,
                propagation,
                after_save,
            }),
        )
    }

    async fn propagate(
        &self,
        session: &Session,
        canonical: &QueryDefinition,
        universal_id: &UniversalId,
    ) -> PropagationReport {
        let payload = Arc::new(QuerySaveRequest::from_definition(canonical));
        let transport = &self.ctx.transport;

        fan_out("save", self.ctx.registry.network_nodes(), |node| {
            let cohort = session.network_cohorts.get(&node.id).cloned();
            let payload = Arc::clone(&payload);
            async move {
                let Some(correlation_id) = cohort else {
                    return NodeStatus::Skipped("no cohort query for this node".into());
                };
                match transport
                    .save_on_node(node, &payload, &correlation_id, universal_id)
                    .await
                {
                    Ok(()) => NodeStatus::Propagated,
                    Err(err) => NodeStatus::Failed(err.to_string()),
                }
            }
        })
        .await
    }
}
