//! Per-identifier serialization of operations.
//!
//! Two workflows touching the same universal id (an edit-save racing a
//! delete) are not ordered by the orchestrators. Callers that need ordering
//! hold the guard from [`IdentifierLocks::acquire`] for the whole workflow.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use leaf_core::UniversalId;

#[derive(Debug, Default, Clone)]
pub struct IdentifierLocks {
    locks: Arc<DashMap<UniversalId, Arc<Mutex<()>>>>,
}

impl IdentifierLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other holder exists for `universal_id`.
    pub async fn acquire(&self, universal_id: &UniversalId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is not held across the await.
        let lock = self
            .locks
            .entry(universal_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Drops entries nobody holds or waits on.
    pub fn prune(&self) {
        self.locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
