//! In-process record store, used by tests and dry runs.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use super::{apply_ops, validate_table_name, FieldOp, RecordStore, StoredGoal};
use crate::error::StoreError;
use crate::goal::{Goal, GoalStreak};

/// Mutex-guarded map of goal documents.
#[derive(Debug)]
pub struct MemoryStore {
    table: String,
    records: Mutex<BTreeMap<String, (u64, Goal)>>,
}

impl MemoryStore {
    /// Create an empty store.
    ///
    /// # Errors
    /// Returns [`StoreError::InvalidTable`] for a table name that is not a
    /// plain identifier, matching [`super::SqliteStore`].
    pub fn new(table: &str) -> Result<Self, StoreError> {
        validate_table_name(table)?;
        Ok(Self {
            table: table.to_string(),
            records: Mutex::new(BTreeMap::new()),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, (u64, Goal)>>, StoreError> {
        self.records
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }
}

impl RecordStore for MemoryStore {
    fn table(&self) -> &str {
        &self.table
    }

    fn insert(&self, id: &str, goal: &Goal) -> Result<(), StoreError> {
        let mut records = self.lock()?;
        if records.contains_key(id) {
            return Err(StoreError::AlreadyExists(id.to_string()));
        }
        records.insert(id.to_string(), (1, goal.clone()));
        Ok(())
    }

    fn get(&self, id: &str) -> Result<Option<StoredGoal>, StoreError> {
        Ok(self.lock()?.get(id).map(|(version, goal)| StoredGoal {
            id: id.to_string(),
            version: *version,
            goal: goal.clone(),
        }))
    }

    fn get_streak(&self, id: &str, start: &str) -> Result<Option<GoalStreak>, StoreError> {
        let records = self.lock()?;
        let (_, goal) = records
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(goal.streaks.get(start).cloned())
    }

    fn scan(&self) -> Result<Vec<StoredGoal>, StoreError> {
        Ok(self
            .lock()?
            .iter()
            .map(|(id, (version, goal))| StoredGoal {
                id: id.clone(),
                version: *version,
                goal: goal.clone(),
            })
            .collect())
    }

    fn update(&self, id: &str, expected_version: u64, ops: &[FieldOp]) -> Result<u64, StoreError> {
        let mut records = self.lock()?;
        let (version, goal) = records
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if *version != expected_version {
            return Err(StoreError::VersionConflict {
                id: id.to_string(),
                expected: expected_version,
                actual: *version,
            });
        }
        apply_ops(goal, ops)?;
        *version += 1;
        Ok(*version)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_get_and_versioned_update() {
        let store = MemoryStore::new("goals").unwrap();
        store.insert("g1", &Goal::default()).unwrap();
        assert!(matches!(
            store.insert("g1", &Goal::default()),
            Err(StoreError::AlreadyExists(_))
        ));

        let ops = [FieldOp::SetBestStreak { value: 2 }];
        assert_eq!(store.update("g1", 1, &ops).unwrap(), 2);

        let stale = store.update("g1", 1, &ops).unwrap_err();
        assert!(stale.is_conflict());

        let stored = store.get("g1").unwrap().unwrap();
        assert_eq!(stored.version, 2);
        assert_eq!(stored.goal.best_streak, 2);
    }

    #[test]
    fn missing_goal_is_reported() {
        let store = MemoryStore::new("goals").unwrap();
        assert!(store.get("nope").unwrap().is_none());
        assert!(matches!(
            store.get_streak("nope", "2024-01-01"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.update("nope", 1, &[]),
            Err(StoreError::NotFound(_))
        ));
    }
}
