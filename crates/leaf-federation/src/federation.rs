//! Wiring of registry, transport and concept indexer, plus a facade that
//! serializes operations per universal id.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, warn};

use leaf_core::{NodeRegistry, UniversalId};

use crate::concepts::{ConceptIndexer, LocalConceptIndexer};
use crate::delete::{Decision, DeleteOrchestrator, DeleteOutcome, PendingCascade, QueryRef};
use crate::error::FederationError;
use crate::locks::IdentifierLocks;
use crate::open::{open_saved, OpenOutcome};
use crate::save::{SaveOrchestrator, SaveOutcome};
use crate::session::{Session, Transition};
use crate::transport::QueryTransport;

/// Everything an orchestrator needs besides the session.
#[derive(Clone)]
pub struct FederationContext {
    pub registry: NodeRegistry,
    pub transport: Arc<dyn QueryTransport>,
    pub indexer: Arc<dyn ConceptIndexer>,
}

impl FederationContext {
    /// Context with the in-process concept indexer.
    pub fn new(registry: NodeRegistry, transport: Arc<dyn QueryTransport>) -> Self {
        FederationContext {
            registry,
            transport,
            indexer: Arc::new(LocalConceptIndexer),
        }
    }

    pub fn with_indexer(mut self, indexer: Arc<dyn ConceptIndexer>) -> Self {
        self.indexer = indexer;
        self
    }

    /// Rebuilds the session's concept index from its saved queries. A
    /// failure keeps the previous index; the operation that triggered the
    /// rebuild has already committed on the home node.
    pub(crate) async fn refresh_concepts(&self, session: &mut Session) {
        match self.indexer.rebuild(&session.saved_queries()).await {
            Ok(index) => session.concepts = index,
            Err(err) => warn!("concept index rebuild failed: {err}"),
        }
    }
}

/// Entry point for clients: session bootstrap plus save, delete and open,
/// each serialized per universal id.
#[derive(Clone)]
pub struct Federation {
    ctx: FederationContext,
    locks: IdentifierLocks,
}

impl Federation {
    pub fn new(ctx: FederationContext) -> Self {
        Federation {
            ctx,
            locks: IdentifierLocks::new(),
        }
    }

    pub fn context(&self) -> &FederationContext {
        &self.ctx
    }

    pub fn locks(&self) -> &IdentifierLocks {
        &self.locks
    }

    /// Starts a session for `user` holding every query the home node has
    /// saved for them.
    pub async fn bootstrap(&self, user: impl Into<String>) -> Result<Session, FederationError> {
        let saved = self
            .ctx
            .transport
            .list_on_home(self.ctx.registry.home())
            .await
            .map_err(|source| FederationError::HomeOperation {
                operation: "load",
                source,
            })?;
        let mut session = Session::new(user).with_saved(saved);
        self.ctx.refresh_concepts(&mut session).await;
        info!(user = %session.user, saved = session.saved.len(), "session started");
        Ok(session)
    }

    /// Runs `operation` holding the lock for `universal_id`, then drops
    /// lock entries nobody else holds or waits on.
    async fn serialized<F: Future>(&self, universal_id: &UniversalId, operation: F) -> F::Output {
        let guard = self.locks.acquire(universal_id).await;
        let output = operation.await;
        drop(guard);
        self.locks.prune();
        output
    }

    pub async fn save(&self, session: Session) -> Transition<SaveOutcome> {
        let orchestrator = SaveOrchestrator::new(&self.ctx);
        match session.current.universal_id.clone() {
            Some(uid) => self.serialized(&uid, orchestrator.save(session)).await,
            None => orchestrator.save(session).await,
        }
    }

    pub async fn delete(&self, session: Session, target: &QueryRef) -> Transition<DeleteOutcome> {
        let orchestrator = DeleteOrchestrator::new(&self.ctx);
        self.serialized(
            &target.universal_id,
            orchestrator.delete(session, target, false, &[]),
        )
        .await
    }

    pub async fn confirm(
        &self,
        session: Session,
        pending: PendingCascade,
        decision: Decision,
    ) -> Transition<DeleteOutcome> {
        let universal_id = pending.target.universal_id.clone();
        let orchestrator = DeleteOrchestrator::new(&self.ctx);
        self.serialized(&universal_id, orchestrator.confirm(session, pending, decision))
            .await
    }

    pub async fn open(&self, session: Session, universal_id: &UniversalId) -> Transition<OpenOutcome> {
        open_saved(&self.ctx, session, universal_id).await
    }
}
