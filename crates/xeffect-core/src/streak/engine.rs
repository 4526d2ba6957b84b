//! Streak interval engine.
//!
//! Given the current interval index and a single-day completion toggle,
//! [`decide`] returns the one mutation that keeps the index correct. The
//! engine has no side effects; applying the mutation is the adapter's job.

use chrono::NaiveDate;
use std::collections::BTreeMap;

use super::date::{add_days, days_between, parse_date};
use super::index::StreakIndex;
use crate::error::StreakError;
use crate::goal::GoalStreak;

/// The more-recent neighbour folded into an extended interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Merge {
    pub absorbed_start: NaiveDate,
    pub absorbed_length: u32,
}

/// Mutation intent produced by [`decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Already in the requested state.
    NoOp,
    /// Clear the last day of `start`'s interval.
    ShrinkTail { start: NaiveDate },
    /// Clear the first day: the interval now starts a day later.
    DropHead {
        old_start: NaiveDate,
        new_start: NaiveDate,
        new_length: u32,
    },
    /// Clear the only day of a single-day interval.
    Remove { start: NaiveDate },
    /// Clear an interior day, leaving a head and a tail interval.
    Split {
        start: NaiveDate,
        head_length: u32,
        tail_start: NaiveDate,
        tail_length: u32,
    },
    /// Complete the day after `start`'s interval ends, then optionally absorb
    /// the interval that begins the day after that.
    ExtendTail {
        start: NaiveDate,
        merge: Option<Merge>,
    },
    /// Complete the day before an interval: it now starts a day earlier.
    ExtendHead {
        old_start: NaiveDate,
        new_start: NaiveDate,
        new_length: u32,
    },
    /// Complete an isolated day.
    CreateNew { date: NaiveDate },
}

impl Mutation {
    pub fn is_noop(&self) -> bool {
        matches!(self, Mutation::NoOp)
    }

    /// Short name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Mutation::NoOp => "noop",
            Mutation::ShrinkTail { .. } => "shrink_tail",
            Mutation::DropHead { .. } => "drop_head",
            Mutation::Remove { .. } => "remove",
            Mutation::Split { .. } => "split",
            Mutation::ExtendTail { merge: None, .. } => "extend_tail",
            Mutation::ExtendTail { merge: Some(_), .. } => "extend_tail_merge",
            Mutation::ExtendHead { .. } => "extend_head",
            Mutation::CreateNew { .. } => "create_new",
        }
    }
}

/// Decide how to record `target` as complete (`mark_complete == true`) or
/// incomplete.
///
/// Option matrix, relative to the interval starting latest on or before
/// `target`:
/// 0. not covered, marking incomplete: nothing to do
/// 1. covered, marking complete: nothing to do
/// 2. covered, marking incomplete: remove, shrink, drop head or split
/// 3. day after the interval, marking complete: extend (and maybe merge)
/// 4. day before the next interval, marking complete: extend its head
/// 5. otherwise: start a new interval
pub fn decide(index: &StreakIndex, target: NaiveDate, mark_complete: bool) -> Mutation {
    let next_day = add_days(target, 1);
    let starts_next_day = index
        .earliest_start_after(target)
        .filter(|(start, _)| *start == next_day);

    let Some((start, length)) = index.latest_start_on_or_before(target) else {
        return if mark_complete {
            extend_head_or_create(starts_next_day, target)
        } else {
            Mutation::NoOp
        };
    };

    let offset = days_between(start, target);
    let in_interval = offset < i64::from(length);

    match (in_interval, mark_complete) {
        (true, true) | (false, false) => Mutation::NoOp,
        (true, false) => clear_day(start, length, offset as u32, target),
        (false, true) if offset == i64::from(length) => Mutation::ExtendTail {
            start,
            merge: starts_next_day.map(|(absorbed_start, absorbed_length)| Merge {
                absorbed_start,
                absorbed_length,
            }),
        },
        (false, true) => extend_head_or_create(starts_next_day, target),
    }
}

/// [`decide`] over the persisted representation.
///
/// # Errors
/// Returns [`StreakError`] if `target` or a stored date does not parse, or the
/// stored record is inconsistent.
pub fn decide_from_record(
    streak_dates: &[String],
    streaks: &BTreeMap<String, GoalStreak>,
    target: &str,
    mark_complete: bool,
) -> Result<Mutation, StreakError> {
    let index = StreakIndex::from_record(streak_dates, streaks)?;
    Ok(decide(&index, parse_date(target)?, mark_complete))
}

fn clear_day(start: NaiveDate, length: u32, offset: u32, target: NaiveDate) -> Mutation {
    if length == 1 {
        Mutation::Remove { start }
    } else if offset == length - 1 {
        Mutation::ShrinkTail { start }
    } else if offset == 0 {
        Mutation::DropHead {
            old_start: start,
            new_start: add_days(start, 1),
            new_length: length - 1,
        }
    } else {
        Mutation::Split {
            start,
            head_length: offset,
            tail_start: add_days(target, 1),
            tail_length: length - offset - 1,
        }
    }
}

fn extend_head_or_create(starts_next_day: Option<(NaiveDate, u32)>, target: NaiveDate) -> Mutation {
    match starts_next_day {
        Some((old_start, length)) => Mutation::ExtendHead {
            old_start,
            new_start: target,
            new_length: length + 1,
        },
        None => Mutation::CreateNew { date: target },
    }
}
