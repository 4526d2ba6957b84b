//! SQLite-backed record store.
//!
//! Each goal is one row: `id`, a `version` counter, and the goal serialized
//! as a JSON `document`. Conditional updates run inside a transaction and
//! re-check the version in the `UPDATE` itself.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;

use super::{apply_ops, validate_table_name, FieldOp, RecordStore, StoredGoal};
use crate::error::StoreError;
use crate::goal::{Goal, GoalStreak};

/// SQLite database holding one goal table.
pub struct SqliteStore {
    conn: Connection,
    table: String,
}

impl SqliteStore {
    /// Open (or create) the database file and ensure the table exists.
    ///
    /// # Errors
    /// Returns an error if the table name is invalid or the database cannot
    /// be opened or migrated.
    pub fn open(path: &Path, table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        let conn = Connection::open(path).map_err(|source| StoreError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        Self::with_connection(conn, table)
    }

    /// Open an in-memory database.
    pub fn open_memory(table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        Self::with_connection(Connection::open_in_memory()?, table)
    }

    fn with_connection(conn: Connection, table: &str) -> Result<Self, StoreError> {
        let store = Self {
            conn,
            table: table.to_string(),
        };
        store.migrate()?;
        Ok(store)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(&format!(
            "CREATE TABLE IF NOT EXISTS \"{table}\" (
                id       TEXT PRIMARY KEY,
                version  INTEGER NOT NULL,
                document TEXT NOT NULL
            );",
            table = self.table
        ))
    }

    fn read_row(conn: &Connection, table: &str, id: &str) -> Result<Option<(u64, String)>, rusqlite::Error> {
        conn.query_row(
            &format!("SELECT version, document FROM \"{table}\" WHERE id = ?1"),
            params![id],
            |row| Ok((row.get::<_, u64>(0)?, row.get::<_, String>(1)?)),
        )
        .optional()
    }

    /// Conflict error for `id` carrying the version currently stored, or
    /// `NotFound` if the row has gone.
    fn conflict(conn: &Connection, table: &str, id: &str, expected: u64) -> StoreError {
        match Self::read_row(conn, table, id) {
            Ok(Some((actual, _))) => StoreError::VersionConflict {
                id: id.to_string(),
                expected,
                actual,
            },
            Ok(None) => StoreError::NotFound(id.to_string()),
            Err(e) => e.into(),
        }
    }
}

impl RecordStore for SqliteStore {
    fn table(&self) -> &str {
        &self.table
    }

    fn insert(&self, id: &str, goal: &Goal) -> Result<(), StoreError> {
        let document = serde_json::to_string(goal)?;
        let inserted = self.conn.execute(
            &format!(
                "INSERT OR IGNORE INTO \"{}\" (id, version, document) VALUES (?1, 1, ?2)",
                self.table
            ),
            params![id, document],
        )?;
        if inserted == 0 {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredGoal>, StoreError> {
        match Self::read_row(&self.conn, &self.table, id)? {
            Some((version, document)) => Ok(Some(StoredGoal {
                id: id.to_string(),
                version,
                goal: serde_json::from_str(&document)?,
            })),
            None => Ok(None),
        }
    }

    fn get_streak(&self, id: &str, start: &str) -> Result<Option<GoalStreak>, StoreError> {
        // Project just the one map entry instead of decoding the document.
        let path = format!("$.streaks.\"{}\"", start.replace('"', ""));
        let entry: Option<Option<String>> = self
            .conn
            .query_row(
                &format!(
                    "SELECT json_extract(document, ?2) FROM \"{}\" WHERE id = ?1",
                    self.table
                ),
                params![id, path],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?;

        match entry {
            None => Err(StoreError::NotFound(id.to_string())),
            Some(None) => Ok(None),
            Some(Some(json)) => Ok(Some(serde_json::from_str(&json)?)),
        }
    }

    fn scan(&self) -> Result<Vec<StoredGoal>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT id, version, document FROM \"{}\" ORDER BY id",
            self.table
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut goals = Vec::new();
        for row in rows {
            let (id, version, document) = row?;
            goals.push(StoredGoal {
                id,
                version,
                goal: serde_json::from_str(&document)?,
            });
        }
        Ok(goals)
    }

    fn update(&self, id: &str, expected_version: u64, ops: &[FieldOp]) -> Result<u64, StoreError> {
        let tx = self.conn.unchecked_transaction()?;

        let (version, document) = Self::read_row(&tx, &self.table, id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if version != expected_version {
            return Err(Self::conflict(&tx, &self.table, id, expected_version));
        }

        let mut goal: Goal = serde_json::from_str(&document)?;
        apply_ops(&mut goal, ops)?;

        let next_version = version + 1;
        let updated = tx.execute(
            &format!(
                "UPDATE \"{}\" SET version = ?1, document = ?2 WHERE id = ?3 AND version = ?4",
                self.table
            ),
            params![next_version, serde_json::to_string(&goal)?, id, version],
        )?;
        if updated == 0 {
            return Err(Self::conflict(&tx, &self.table, id, expected_version));
        }

        tx.commit()?;
        Ok(next_version)
    }
}
