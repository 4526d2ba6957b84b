//! Targeted field operations on a goal document.

use crate::error::StoreError;
use crate::goal::{Goal, GoalStreak};

/// One partial update of a stored goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldOp {
    /// `streaks[start].streak_length += delta`
    AddStreakLength { start: String, delta: i64 },
    /// `streaks[start] = streak`
    SetStreak { start: String, streak: GoalStreak },
    /// `remove streaks[start]`
    RemoveStreak { start: String },
    /// `streak_dates[position] = date`
    SetIndexEntry { position: usize, date: String },
    /// `remove streak_dates[position]`
    RemoveIndexEntry { position: usize },
    /// Insert before `position`; later entries shift back.
    InsertIndexEntry { position: usize, date: String },
    /// Push onto the end of `streak_dates`.
    AppendIndexEntry { date: String },
    /// `streak_dates = dates`
    ReplaceIndex { dates: Vec<String> },
    /// `best_streak = value`
    SetBestStreak { value: u32 },
}

/// Apply `ops` in order to a copy of `goal`, replacing `goal` only if every
/// operation succeeds.
///
/// # Errors
/// Returns [`StoreError::InvalidOperation`] when an operation addresses a
/// missing streak or list position, or would leave a length below 1.
pub fn apply_ops(goal: &mut Goal, ops: &[FieldOp]) -> Result<(), StoreError> {
    let mut next = goal.clone();
    for op in ops {
        apply_op(&mut next, op)?;
    }
    *goal = next;
    Ok(())
}

fn apply_op(goal: &mut Goal, op: &FieldOp) -> Result<(), StoreError> {
    match op {
        FieldOp::AddStreakLength { start, delta } => {
            let streak = goal.streaks.get_mut(start).ok_or_else(|| {
                StoreError::InvalidOperation(format!("no streak at {start}"))
            })?;
            let length = i64::from(streak.length) + delta;
            if length < 1 {
                return Err(StoreError::InvalidOperation(format!(
                    "streak {start} length would become {length}"
                )));
            }
            streak.length = u32::try_from(length).map_err(|_| {
                StoreError::InvalidOperation(format!("streak {start} length overflow"))
            })?;
        }
        FieldOp::SetStreak { start, streak } => {
            goal.streaks.insert(start.clone(), streak.clone());
        }
        FieldOp::RemoveStreak { start } => {
            goal.streaks.remove(start).ok_or_else(|| {
                StoreError::InvalidOperation(format!("no streak at {start}"))
            })?;
        }
        FieldOp::SetIndexEntry { position, date } => {
            let len = goal.streak_dates.len();
            let entry = goal.streak_dates.get_mut(*position).ok_or_else(|| {
                out_of_range(*position, len)
            })?;
            *entry = date.clone();
        }
        FieldOp::RemoveIndexEntry { position } => {
            if *position >= goal.streak_dates.len() {
                return Err(out_of_range(*position, goal.streak_dates.len()));
            }
            goal.streak_dates.remove(*position);
        }
        FieldOp::InsertIndexEntry { position, date } => {
            if *position > goal.streak_dates.len() {
                return Err(out_of_range(*position, goal.streak_dates.len()));
            }
            goal.streak_dates.insert(*position, date.clone());
        }
        FieldOp::AppendIndexEntry { date } => goal.streak_dates.push(date.clone()),
        FieldOp::ReplaceIndex { dates } => goal.streak_dates = dates.clone(),
        FieldOp::SetBestStreak { value } => goal.best_streak = *value,
    }
    Ok(())
}

fn out_of_range(position: usize, len: usize) -> StoreError {
    StoreError::InvalidOperation(format!(
        "streak_dates position {position} out of range (length {len})"
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn goal_with(entries: &[(&str, u32)]) -> Goal {
        let mut goal = Goal::default();
        for (start, length) in entries {
            goal.streaks
                .insert(start.to_string(), GoalStreak::with_length(*length));
            goal.streak_dates.push(start.to_string());
        }
        goal
    }

    #[test]
    fn merge_sequence_applies_in_order() {
        let mut goal = goal_with(&[("2024-01-05", 2), ("2024-01-01", 3)]);
        apply_ops(
            &mut goal,
            &[
                FieldOp::AddStreakLength {
                    start: "2024-01-01".into(),
                    delta: 1,
                },
                FieldOp::AddStreakLength {
                    start: "2024-01-01".into(),
                    delta: 2,
                },
                FieldOp::RemoveStreak {
                    start: "2024-01-05".into(),
                },
                FieldOp::RemoveIndexEntry { position: 0 },
                FieldOp::SetBestStreak { value: 6 },
            ],
        )
        .unwrap();

        assert_eq!(goal.streak_dates, ["2024-01-01"]);
        assert_eq!(goal.streaks["2024-01-01"].length, 6);
        assert_eq!(goal.best_streak, 6);
    }

    #[test]
    fn failing_op_leaves_goal_untouched() {
        let mut goal = goal_with(&[("2024-01-01", 3)]);
        let before = goal.clone();
        let err = apply_ops(
            &mut goal,
            &[
                FieldOp::AddStreakLength {
                    start: "2024-01-01".into(),
                    delta: 1,
                },
                FieldOp::RemoveIndexEntry { position: 4 },
            ],
        )
        .unwrap_err();

        assert!(err.to_string().contains("out of range"));
        assert_eq!(goal, before);
    }

    #[test]
    fn length_cannot_drop_below_one() {
        let mut goal = goal_with(&[("2024-01-01", 1)]);
        let result = apply_ops(
            &mut goal,
            &[FieldOp::AddStreakLength {
                start: "2024-01-01".into(),
                delta: -1,
            }],
        );
        assert!(result.is_err());
    }

    #[test]
    fn insert_and_append_index_entries() {
        let mut goal = goal_with(&[("2024-01-09", 1), ("2024-01-01", 1)]);
        apply_ops(
            &mut goal,
            &[
                FieldOp::InsertIndexEntry {
                    position: 1,
                    date: "2024-01-05".into(),
                },
                FieldOp::AppendIndexEntry {
                    date: "2023-12-01".into(),
                },
            ],
        )
        .unwrap();
        assert_eq!(
            goal.streak_dates,
            ["2024-01-09", "2024-01-05", "2024-01-01", "2023-12-01"]
        );
    }
}
