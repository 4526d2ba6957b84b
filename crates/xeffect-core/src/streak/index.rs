//! Ordered interval index over a goal's streaks.
//!
//! The persisted record keeps a start-date list (most recent first) next to a
//! start-date keyed map. [`StreakIndex`] replaces positional list handling with
//! a `BTreeMap` keyed by start date; list positions are derived from it only
//! where the store needs them.

use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};

use super::date::{add_days, format_date, is_storable, parse_date};
use super::engine::Mutation;
use crate::error::StreakError;
use crate::goal::GoalStreak;

/// Disjoint, non-touching streak intervals keyed by start date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreakIndex {
    intervals: BTreeMap<NaiveDate, u32>,
}

impl StreakIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate the index from a stored record.
    ///
    /// # Errors
    /// - [`StreakError::DateParse`] for an unparseable start date
    /// - [`StreakError::CorruptRecord`] if the list is not strictly
    ///   descending, the list and map keys differ, a length is zero, or two
    ///   intervals overlap or touch
    pub fn from_record(
        streak_dates: &[String],
        streaks: &BTreeMap<String, GoalStreak>,
    ) -> Result<Self, StreakError> {
        if streak_dates.len() != streaks.len() {
            return Err(StreakError::CorruptRecord(format!(
                "index has {} entries but streak map has {}",
                streak_dates.len(),
                streaks.len()
            )));
        }

        let mut previous: Option<NaiveDate> = None;
        let mut intervals = Vec::with_capacity(streak_dates.len());
        for key in streak_dates {
            let start = parse_date(key)?;
            if previous.is_some_and(|prev| prev <= start) {
                return Err(StreakError::CorruptRecord(format!(
                    "index is not strictly descending at {key}"
                )));
            }
            previous = Some(start);

            let streak = streaks.get(key).ok_or_else(|| {
                StreakError::CorruptRecord(format!("index entry {key} has no streak"))
            })?;
            intervals.push((start, streak.length));
        }

        Self::from_intervals(intervals)
    }

    /// Build and validate the index from `(start, length)` pairs in any order.
    ///
    /// # Errors
    /// Returns [`StreakError::CorruptRecord`] on zero lengths, duplicate
    /// starts, intervals reaching past year 9999, or overlapping/touching
    /// intervals.
    pub fn from_intervals(
        intervals: impl IntoIterator<Item = (NaiveDate, u32)>,
    ) -> Result<Self, StreakError> {
        let mut index = Self::new();
        for (start, length) in intervals {
            if length == 0 {
                return Err(StreakError::CorruptRecord(format!(
                    "streak {} has zero length",
                    format_date(start)
                )));
            }
            if !is_storable(start) || !is_storable(add_days(start, i64::from(length) - 1)) {
                return Err(StreakError::CorruptRecord(format!(
                    "streak {} of length {length} runs past year 9999",
                    format_date(start)
                )));
            }
            if index.intervals.insert(start, length).is_some() {
                return Err(StreakError::CorruptRecord(format!(
                    "duplicate streak {}",
                    format_date(start)
                )));
            }
        }

        let mut ends_before: Option<(NaiveDate, NaiveDate)> = None;
        for (&start, &length) in &index.intervals {
            if let Some((prev_start, next_free)) = ends_before {
                if start <= next_free {
                    return Err(StreakError::CorruptRecord(format!(
                        "streaks {} and {} overlap or touch",
                        format_date(prev_start),
                        format_date(start)
                    )));
                }
            }
            ends_before = Some((start, add_days(start, i64::from(length))));
        }

        Ok(index)
    }

    pub fn len(&self) -> usize {
        self.intervals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intervals.is_empty()
    }

    pub fn length_of(&self, start: NaiveDate) -> Option<u32> {
        self.intervals.get(&start).copied()
    }

    /// Intervals, most recent first.
    pub fn iter_recent_first(&self) -> impl Iterator<Item = (NaiveDate, u32)> + '_ {
        self.intervals.iter().rev().map(|(start, length)| (*start, *length))
    }

    /// Start-date list in storage order (descending).
    pub fn start_dates(&self) -> Vec<String> {
        self.iter_recent_first()
            .map(|(start, _)| format_date(start))
            .collect()
    }

    /// The interval with the latest start on or before `date`, if any.
    pub fn latest_start_on_or_before(&self, date: NaiveDate) -> Option<(NaiveDate, u32)> {
        self.intervals
            .range(..=date)
            .next_back()
            .map(|(start, length)| (*start, *length))
    }

    /// The interval with the earliest start strictly after `date`, if any.
    pub fn earliest_start_after(&self, date: NaiveDate) -> Option<(NaiveDate, u32)> {
        self.intervals
            .range(add_days(date, 1)..)
            .next()
            .map(|(start, length)| (*start, *length))
    }

    /// The interval covering `date`, if any.
    pub fn containing(&self, date: NaiveDate) -> Option<(NaiveDate, u32)> {
        self.latest_start_on_or_before(date)
            .filter(|(start, length)| date < add_days(*start, i64::from(*length)))
    }

    /// Whether `date` was marked complete.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.containing(date).is_some()
    }

    /// Position of `start` in the descending start-date list.
    pub fn position(&self, start: NaiveDate) -> Option<usize> {
        self.intervals
            .contains_key(&start)
            .then(|| self.insertion_position(start))
    }

    /// Number of intervals starting strictly after `date`; the list position
    /// a new interval starting at `date` would occupy.
    pub fn insertion_position(&self, date: NaiveDate) -> usize {
        self.intervals.range(add_days(date, 1)..).count()
    }

    /// Longest interval length, 0 when empty.
    pub fn best_streak(&self) -> u32 {
        self.intervals.values().copied().max().unwrap_or(0)
    }

    /// Every completed day, ascending.
    pub fn completed_days(&self) -> BTreeSet<NaiveDate> {
        self.intervals
            .iter()
            .flat_map(|(start, length)| (0..i64::from(*length)).map(|d| add_days(*start, d)))
            .collect()
    }

    /// Apply a mutation in memory.
    pub fn apply(&mut self, mutation: &Mutation) {
        match *mutation {
            Mutation::NoOp => {}
            Mutation::ShrinkTail { start } => {
                if let Some(length) = self.intervals.get_mut(&start) {
                    *length -= 1;
                    if *length == 0 {
                        self.intervals.remove(&start);
                    }
                }
            }
            Mutation::DropHead {
                old_start,
                new_start,
                new_length,
            }
            | Mutation::ExtendHead {
                old_start,
                new_start,
                new_length,
            } => {
                self.intervals.remove(&old_start);
                self.intervals.insert(new_start, new_length);
            }
            Mutation::Remove { start } => {
                self.intervals.remove(&start);
            }
            Mutation::Split {
                start,
                head_length,
                tail_start,
                tail_length,
            } => {
                self.intervals.insert(start, head_length);
                self.intervals.insert(tail_start, tail_length);
            }
            Mutation::ExtendTail { start, merge } => {
                let absorbed = merge.map_or(0, |merge| {
                    self.intervals.remove(&merge.absorbed_start);
                    merge.absorbed_length
                });
                if let Some(length) = self.intervals.get_mut(&start) {
                    *length += 1 + absorbed;
                }
            }
            Mutation::CreateNew { date } => {
                self.intervals.insert(date, 1);
            }
        }
    }
}
