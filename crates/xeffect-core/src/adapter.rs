//! Persistence adapter between the streak engine and the record store.
//!
//! The adapter makes no decisions. It fetches a snapshot, and turns a
//! [`Mutation`] decided against that snapshot into field operations sent as a
//! single version-checked update.

use tracing::{debug, info};

use crate::error::{CoreError, Result, StoreError};
use crate::goal::{GoalStreak, Goal};
use crate::store::{FieldOp, RecordStore, StoredGoal};
use crate::streak::{format_date, Mutation, StreakIndex};

/// A fetched goal together with its validated interval index.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub stored: StoredGoal,
    pub index: StreakIndex,
}

impl Snapshot {
    pub fn goal(&self) -> &Goal {
        &self.stored.goal
    }

    pub fn version(&self) -> u64 {
        self.stored.version
    }
}

/// Applies streak mutations to goals held in a [`RecordStore`].
pub struct StreakAdapter<S> {
    store: S,
}

impl<S: RecordStore> StreakAdapter<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fetch the full goal record and build its interval index.
    ///
    /// # Errors
    /// [`StoreError::NotFound`] if there is no such goal; a streak error if the
    /// stored streak state is inconsistent.
    pub fn fetch(&self, goal_id: &str) -> Result<Snapshot> {
        let stored = self
            .store
            .get(goal_id)?
            .ok_or_else(|| StoreError::NotFound(goal_id.to_string()))?;
        let index = stored.goal.streak_index()?;
        Ok(Snapshot { stored, index })
    }

    /// Fetch one streak entry without loading the whole record.
    pub fn fetch_streak(&self, goal_id: &str, start: &str) -> Result<Option<GoalStreak>> {
        Ok(self.store.get_streak(goal_id, start)?)
    }

    /// Apply `mutation` as one conditional update against `snapshot`'s version.
    ///
    /// Returns the new record version, or the snapshot's version for a no-op.
    ///
    /// # Errors
    /// [`StoreError::VersionConflict`] if the goal changed after `snapshot`
    /// was fetched; other store errors as reported.
    pub fn apply(&self, snapshot: &Snapshot, mutation: &Mutation) -> Result<u64> {
        let ops = field_ops(snapshot, mutation)?;
        if ops.is_empty() {
            debug!(goal = %snapshot.stored.id, "no streak change required");
            return Ok(snapshot.version());
        }

        let version = self
            .store
            .update(&snapshot.stored.id, snapshot.version(), &ops)?;
        info!(
            goal = %snapshot.stored.id,
            table = self.store.table(),
            mutation = mutation.kind(),
            ops = ops.len(),
            version,
            "applied streak mutation"
        );
        Ok(version)
    }
}

/// Translate a mutation into the field operations that realise it on the
/// stored record. List positions come from the snapshot's index, which
/// mirrors the stored `streak_dates` order.
pub fn field_ops(snapshot: &Snapshot, mutation: &Mutation) -> Result<Vec<FieldOp>> {
    let goal = snapshot.goal();
    let index = &snapshot.index;
    let position = |date| {
        index.position(date).ok_or_else(|| {
            CoreError::from(StoreError::InvalidOperation(format!(
                "{} is not a stored streak",
                format_date(date)
            )))
        })
    };
    let partial_of = |date| {
        goal.streaks
            .get(&format_date(date))
            .map(|streak| streak.partial.clone())
            .unwrap_or_default()
    };

    let mut ops = match *mutation {
        Mutation::NoOp => return Ok(Vec::new()),
        Mutation::ShrinkTail { start } => vec![FieldOp::AddStreakLength {
            start: format_date(start),
            delta: -1,
        }],
        Mutation::DropHead {
            old_start,
            new_start,
            new_length,
        }
        | Mutation::ExtendHead {
            old_start,
            new_start,
            new_length,
        } => vec![
            FieldOp::SetStreak {
                start: format_date(new_start),
                streak: GoalStreak {
                    length: new_length,
                    partial: partial_of(old_start),
                },
            },
            FieldOp::RemoveStreak {
                start: format_date(old_start),
            },
            FieldOp::SetIndexEntry {
                position: position(old_start)?,
                date: format_date(new_start),
            },
        ],
        Mutation::Remove { start } => vec![
            FieldOp::RemoveStreak {
                start: format_date(start),
            },
            FieldOp::RemoveIndexEntry {
                position: position(start)?,
            },
        ],
        Mutation::Split {
            start,
            head_length,
            tail_start,
            tail_length,
        } => vec![
            FieldOp::AddStreakLength {
                start: format_date(start),
                delta: i64::from(head_length) - i64::from(index.length_of(start).unwrap_or(0)),
            },
            FieldOp::SetStreak {
                start: format_date(tail_start),
                streak: GoalStreak::with_length(tail_length),
            },
            // The tail is more recent than the head, so it takes the head's slot.
            FieldOp::InsertIndexEntry {
                position: position(start)?,
                date: format_date(tail_start),
            },
        ],
        Mutation::ExtendTail { start, merge } => {
            let mut ops = vec![FieldOp::AddStreakLength {
                start: format_date(start),
                delta: 1,
            }];
            if let Some(merge) = merge {
                ops.push(FieldOp::AddStreakLength {
                    start: format_date(start),
                    delta: i64::from(merge.absorbed_length),
                });
                ops.push(FieldOp::RemoveStreak {
                    start: format_date(merge.absorbed_start),
                });
                ops.push(FieldOp::RemoveIndexEntry {
                    position: position(merge.absorbed_start)?,
                });
            }
            ops
        }
        Mutation::CreateNew { date } => {
            let at = index.insertion_position(date);
            let index_op = if at == index.len() {
                FieldOp::AppendIndexEntry {
                    date: format_date(date),
                }
            } else {
                let mut dates = index.start_dates();
                dates.insert(at, format_date(date));
                FieldOp::ReplaceIndex { dates }
            };
            vec![
                FieldOp::SetStreak {
                    start: format_date(date),
                    streak: GoalStreak::with_length(1),
                },
                index_op,
            ]
        }
    };

    let mut after = index.clone();
    after.apply(mutation);
    let best = after.best_streak();
    if best != goal.best_streak {
        ops.push(FieldOp::SetBestStreak { value: best });
    }

    Ok(ops)
}
