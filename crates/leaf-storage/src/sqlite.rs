//! SQLite implementation of [`QueryStore`].
//!
//! [`SqliteStore`] persists saved queries in a SQLite database with WAL mode,
//! a transaction around every multi-statement write, and automatic schema
//! migrations. Panels and filters are stored as JSON TEXT columns via
//! serde_json; dependency edges are denormalized into `query_dependencies`
//! so dependents can be found with a recursive query.

use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use leaf_core::{Panel, PanelFilter, QueryDefinition, QueryDependent, QueryId, UniversalId};

use crate::error::StorageError;
use crate::traits::QueryStore;

const SELECT_QUERY: &str = "SELECT id, universal_id, ver, name, category, owner, panels_json, filters_json FROM queries";

/// SQLite-backed implementation of [`QueryStore`].
pub struct SqliteStore {
    conn: Connection,
}

/// A `queries` row before its JSON columns are decoded.
struct QueryRow {
    id: i64,
    universal_id: String,
    ver: u32,
    name: String,
    category: String,
    owner: Option<String>,
    panels_json: String,
    filters_json: String,
}

impl QueryRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(QueryRow {
            id: row.get(0)?,
            universal_id: row.get(1)?,
            ver: row.get(2)?,
            name: row.get(3)?,
            category: row.get(4)?,
            owner: row.get(5)?,
            panels_json: row.get(6)?,
            filters_json: row.get(7)?,
        })
    }

    fn decode(self) -> Result<QueryDefinition, StorageError> {
        let panels: Vec<Panel> = serde_json::from_str(&self.panels_json)?;
        let panel_filters: Vec<PanelFilter> = serde_json::from_str(&self.filters_json)?;
        Ok(QueryDefinition {
            id: Some(QueryId(self.id)),
            universal_id: Some(UniversalId::new(self.universal_id)),
            ver: Some(self.ver),
            name: self.name,
            category: self.category,
            owner: self.owner,
            panels,
            panel_filters,
        })
    }
}

impl SqliteStore {
    /// Opens (or creates) a SQLite database at `path`.
    pub fn new(path: &str) -> Result<Self, StorageError> {
        let conn = crate::schema::open_database(path)?;
        Ok(SqliteStore { conn })
    }

    /// Opens an in-memory SQLite database (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = crate::schema::open_in_memory()?;
        Ok(SqliteStore { conn })
    }

    fn universal_id_of(query: &QueryDefinition) -> Result<&UniversalId, StorageError> {
        query
            .universal_id
            .as_ref()
            .ok_or_else(|| StorageError::IntegrityError {
                reason: format!("query '{}' has no universal id", query.name),
            })
    }

    /// Replaces the dependency rows of `dependent` inside `tx`.
    fn write_dependencies(
        tx: &Transaction<'_>,
        dependent: &UniversalId,
        query: &QueryDefinition,
    ) -> Result<(), StorageError> {
        tx.execute(
            "DELETE FROM query_dependencies WHERE dependent_universal_id = ?1",
            params![dependent.as_str()],
        )?;
        let mut stmt = tx.prepare_cached(
            "INSERT INTO query_dependencies (dependent_universal_id, dependee_universal_id) VALUES (?1, ?2)",
        )?;
        for dependee in query.embedded_queries() {
            stmt.execute(params![dependent.as_str(), dependee.as_str()])?;
        }
        Ok(())
    }
}

impl QueryStore for SqliteStore {
    fn insert_query(&mut self, query: &QueryDefinition) -> Result<QueryId, StorageError> {
        let uid = Self::universal_id_of(query)?;
        let panels_json = serde_json::to_string(&query.panels)?;
        let filters_json = serde_json::to_string(&query.panel_filters)?;

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO queries (universal_id, ver, name, category, owner, panels_json, filters_json) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                uid.as_str(),
                query.ver.unwrap_or(1),
                query.name,
                query.category,
                query.owner,
                panels_json,
                filters_json,
            ],
        )?;
        let id = tx.last_insert_rowid();
        Self::write_dependencies(&tx, uid, query)?;
        tx.commit()?;
        Ok(QueryId(id))
    }

    fn update_query(&mut self, query: &QueryDefinition) -> Result<(), StorageError> {
        let uid = Self::universal_id_of(query)?;
        let panels_json = serde_json::to_string(&query.panels)?;
        let filters_json = serde_json::to_string(&query.panel_filters)?;

        let tx = self.conn.transaction()?;
        let changed = tx.execute(
            "UPDATE queries SET ver = ?2, name = ?3, category = ?4, owner = ?5, panels_json = ?6, filters_json = ?7, updated_at = datetime('now') WHERE universal_id = ?1",
            params![
                uid.as_str(),
                query.ver.unwrap_or(1),
                query.name,
                query.category,
                query.owner,
                panels_json,
                filters_json,
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::QueryNotFound(uid.clone()));
        }
        Self::write_dependencies(&tx, uid, query)?;
        tx.commit()?;
        Ok(())
    }

    fn get_query(
        &self,
        universal_id: &UniversalId,
    ) -> Result<Option<QueryDefinition>, StorageError> {
        let row = self
            .conn
            .query_row(
                &format!("{SELECT_QUERY} WHERE universal_id = ?1"),
                params![universal_id.as_str()],
                QueryRow::from_row,
            )
            .optional()?;
        row.map(QueryRow::decode).transpose()
    }

    fn remove_query(&mut self, universal_id: &UniversalId) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "DELETE FROM queries WHERE universal_id = ?1",
            params![universal_id.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn list_queries(&self) -> Result<Vec<QueryDefinition>, StorageError> {
        let mut stmt = self
            .conn
            .prepare_cached(&format!("{SELECT_QUERY} ORDER BY id"))?;
        let rows = stmt.query_map([], QueryRow::from_row)?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?.decode()?);
        }
        Ok(result)
    }

    fn remove_queries(&mut self, universal_ids: &[UniversalId]) -> Result<(), StorageError> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached("DELETE FROM queries WHERE universal_id = ?1")?;
            for uid in universal_ids {
                stmt.execute(params![uid.as_str()])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn dependents_of(
        &self,
        universal_id: &UniversalId,
    ) -> Result<Vec<QueryDependent>, StorageError> {
        let mut stmt = self.conn.prepare_cached(
            "WITH RECURSIVE dependents(uid) AS (
                 SELECT dependent_universal_id FROM query_dependencies
                  WHERE dependee_universal_id = ?1
                 UNION
                 SELECT d.dependent_universal_id FROM query_dependencies d
                   JOIN dependents ON d.dependee_universal_id = dependents.uid
             )
             SELECT q.universal_id, q.name, COALESCE(q.owner, '')
               FROM queries q JOIN dependents ON q.universal_id = dependents.uid
              WHERE q.universal_id <> ?1
              ORDER BY q.universal_id",
        )?;
        let rows = stmt.query_map(params![universal_id.as_str()], |row| {
            let uid: String = row.get(0)?;
            Ok(QueryDependent {
                universal_id: UniversalId::new(uid),
                name: row.get(1)?,
                owner: row.get(2)?,
            })
        })?;
        let mut result = Vec::new();
        for row in rows {
            result.push(row?);
        }
        Ok(result)
    }
}
