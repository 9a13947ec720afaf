//! Loading a saved query into the session for editing.

use tracing::debug;

use leaf_core::{QueryDefinition, UniversalId};

use crate::error::FederationError;
use crate::federation::FederationContext;
use crate::session::{Session, Transition, View};

#[derive(Debug)]
pub enum OpenOutcome {
    /// The query was already the one being edited.
    AlreadyOpen,
    Opened(QueryDefinition),
    Rejected(FederationError),
}

/// Makes the saved query `universal_id` the current one, loading the home
/// node's copy and recording it in the saved collection.
pub async fn open_saved(
    ctx: &FederationContext,
    mut session: Session,
    universal_id: &UniversalId,
) -> Transition<OpenOutcome> {
    if session.is_current(universal_id) {
        return Transition::new(session, OpenOutcome::AlreadyOpen);
    }

    let def = match ctx
        .transport
        .load_by_universal_id(ctx.registry.home(), universal_id)
        .await
    {
        Ok(def) => def,
        Err(source) => {
            return Transition::new(
                session,
                OpenOutcome::Rejected(FederationError::HomeOperation {
                    operation: "load",
                    source,
                }),
            )
        }
    };

    debug!(universal_id = %universal_id, ver = ?def.ver, "opened saved query");
    session.set_current(&def);
    session.network_cohorts.clear();
    session.view = View::FindPatients;
    session.upsert_saved(def.clone());
    Transition::new(session, OpenOutcome::Opened(def))
}
