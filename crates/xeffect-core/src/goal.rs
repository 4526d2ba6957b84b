//! Goal records as they are persisted in the record store.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{RequestError, StreakError};
use crate::streak::StreakIndex;

/// One stored streak interval, keyed by its start date in [`Goal::streaks`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalStreak {
    /// Number of consecutive completed days, start date included.
    #[serde(rename = "streak_length")]
    pub length: u32,
    /// Reserved for partial-day data. Carried through mutations untouched.
    #[serde(default)]
    pub partial: BTreeMap<String, String>,
}

impl GoalStreak {
    pub fn with_length(length: u32) -> Self {
        Self {
            length,
            partial: BTreeMap::new(),
        }
    }
}

/// A goal and its compressed completion history.
///
/// `streaks` and `streak_dates` describe the same set of intervals: the map
/// holds lengths, the list holds the start dates most-recent first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Goal {
    pub title: String,
    pub motivation: String,
    #[serde(default)]
    pub best_streak: u32,
    #[serde(default)]
    pub streaks: BTreeMap<String, GoalStreak>,
    #[serde(default)]
    pub streak_dates: Vec<String>,
}

impl Goal {
    /// A fresh goal with no completions.
    pub fn new(new_goal: NewGoal) -> Self {
        Self {
            title: new_goal.title,
            motivation: new_goal.motivation,
            ..Self::default()
        }
    }

    /// Build the ordered interval index, validating the stored shape.
    ///
    /// # Errors
    /// Returns [`StreakError`] if a date does not parse or the map and list
    /// are inconsistent.
    pub fn streak_index(&self) -> Result<StreakIndex, StreakError> {
        StreakIndex::from_record(&self.streak_dates, &self.streaks)
    }
}

/// Body of a goal-creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewGoal {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub motivation: String,
}

impl NewGoal {
    /// Both fields are required and must not be blank.
    pub fn validate(&self) -> Result<(), RequestError> {
        for (field, value) in [("title", &self.title), ("motivation", &self.motivation)] {
            if value.trim().is_empty() {
                return Err(RequestError::Validation {
                    field: field.to_string(),
                    message: "required".to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Listing entry: identity plus the descriptive fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GoalSummary {
    pub uuid: String,
    pub title: String,
    pub motivation: String,
}
