//! Completion streaks: date keys, the ordered interval index, and the engine
//! that turns a single-day toggle into a mutation intent.

pub mod date;
pub mod engine;
pub mod index;


pub use date::{format_date, parse_date};
pub use engine::{decide, decide_from_record, Merge, Mutation};
pub use index::StreakIndex;
