//! Record store holding one JSON goal document per goal id.
//!
//! Stores only support whole-record reads and targeted field updates. An
//! update carries the version the caller read; the store applies every
//! operation or none, and rejects the update if the version moved on.

mod memory;
mod ops;
mod sqlite;

pub use memory::MemoryStore;
pub use ops::{apply_ops, FieldOp};
pub use sqlite::SqliteStore;

use crate::error::StoreError;
use crate::goal::{Goal, GoalStreak};

/// A goal document with the store version it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredGoal {
    pub id: String,
    pub version: u64,
    pub goal: Goal,
}

/// Key-value store of goal documents.
pub trait RecordStore {
    /// Name of the table this store writes to.
    fn table(&self) -> &str;

    /// Create a record at version 1.
    ///
    /// # Errors
    /// [`StoreError::AlreadyExists`] if the key is taken.
    fn insert(&self, id: &str, goal: &Goal) -> Result<(), StoreError>;

    /// Fetch the full record.
    fn get(&self, id: &str) -> Result<Option<StoredGoal>, StoreError>;

    /// Fetch a single streak map entry.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if the goal itself does not exist.
    fn get_streak(&self, id: &str, start: &str) -> Result<Option<GoalStreak>, StoreError>;

    /// All records, ordered by id.
    fn scan(&self) -> Result<Vec<StoredGoal>, StoreError>;

    /// Apply `ops` atomically if the record is still at `expected_version`.
    /// Returns the new version.
    ///
    /// # Errors
    /// - [`StoreError::NotFound`] if the record does not exist
    /// - [`StoreError::VersionConflict`] if the record changed
    /// - [`StoreError::InvalidOperation`] if an operation does not fit the
    ///   record; nothing is written
    fn update(&self, id: &str, expected_version: u64, ops: &[FieldOp]) -> Result<u64, StoreError>;
}

/// Table names are interpolated into SQL, so only plain identifiers pass.
pub(crate) fn validate_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let valid = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_names_must_be_identifiers() {
        assert!(validate_table_name("xeffect_goals").is_ok());
        assert!(validate_table_name("_goals2").is_ok());
        for bad in ["", "2goals", "goals; DROP TABLE x", "goals-dev", "\"goals\""] {
            assert!(validate_table_name(bad).is_err(), "{bad:?} accepted");
        }
    }
}
