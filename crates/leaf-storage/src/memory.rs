//! In-memory implementation of [`QueryStore`].
//!
//! [`InMemoryStore`] is a first-class backend for tests and ephemeral nodes.
//! It keeps queries in a `BTreeMap` keyed by local id with a side index from
//! universal id, giving the same ordering semantics as the SQLite backend.

use std::collections::{BTreeMap, HashMap};

use leaf_core::{QueryDefinition, QueryId, UniversalId};

use crate::error::StorageError;
use crate::traits::QueryStore;

/// In-memory implementation of [`QueryStore`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    queries: BTreeMap<QueryId, QueryDefinition>,
    by_universal_id: HashMap<UniversalId, QueryId>,
    next_id: i64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        InMemoryStore {
            queries: BTreeMap::new(),
            by_universal_id: HashMap::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.queries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }

    fn require_universal_id(query: &QueryDefinition) -> Result<&UniversalId, StorageError> {
        query
            .universal_id
            .as_ref()
            .ok_or_else(|| StorageError::IntegrityError {
                reason: format!("query '{}' has no universal id", query.name),
            })
    }
}

impl QueryStore for InMemoryStore {
    fn insert_query(&mut self, query: &QueryDefinition) -> Result<QueryId, StorageError> {
        let uid = Self::require_universal_id(query)?;
        if self.by_universal_id.contains_key(uid) {
            return Err(StorageError::IntegrityError {
                reason: format!("duplicate universal id {uid}"),
            });
        }
        // `Default` leaves the counter at zero; ids start at one either way.
        self.next_id = self.next_id.max(1);
        let id = QueryId(self.next_id);
        self.next_id += 1;

        let mut stored = query.clone();
        stored.id = Some(id);
        self.by_universal_id.insert(uid.clone(), id);
        self.queries.insert(id, stored);
        Ok(id)
    }

    fn update_query(&mut self, query: &QueryDefinition) -> Result<(), StorageError> {
        let uid = Self::require_universal_id(query)?;
        let id = *self
            .by_universal_id
            .get(uid)
            .ok_or_else(|| StorageError::QueryNotFound(uid.clone()))?;
        let mut stored = query.clone();
        stored.id = Some(id);
        self.queries.insert(id, stored);
        Ok(())
    }

    fn get_query(
        &self,
        universal_id: &UniversalId,
    ) -> Result<Option<QueryDefinition>, StorageError> {
        Ok(self
            .by_universal_id
            .get(universal_id)
            .and_then(|id| self.queries.get(id))
            .cloned())
    }

    fn remove_query(&mut self, universal_id: &UniversalId) -> Result<bool, StorageError> {
        match self.by_universal_id.remove(universal_id) {
            Some(id) => Ok(self.queries.remove(&id).is_some()),
            None => Ok(false),
        }
    }

    fn list_queries(&self) -> Result<Vec<QueryDefinition>, StorageError> {
        Ok(self.queries.values().cloned().collect())
    }
}
