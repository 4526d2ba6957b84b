//! # XEffect Core Library
//!
//! Goal tracking with compressed completion history. A goal's completed days
//! are stored as maximal runs of consecutive days ("streaks"), and marking a
//! single day complete or incomplete rewrites at most a couple of those runs.
//!
//! ## Architecture
//!
//! - **Streak engine**: pure decision logic that turns a one-day toggle into a
//!   [`Mutation`] against an ordered interval index
//! - **Persistence adapter**: maps a mutation onto field operations and
//!   applies them as one version-checked update
//! - **Record store**: SQLite (and in-memory) storage of goal documents
//! - **Request layer**: content-type checks, base64 bodies, JSON validation
//!
//! ## Key Components
//!
//! - [`GoalService`]: create, read, list and toggle goals
//! - [`StreakIndex`] and [`decide`]: the interval engine
//! - [`StreakAdapter`]: applies mutations to stored goals
//! - [`SqliteStore`]: the default record store
//! - [`Config`]: application configuration management

pub mod adapter;
pub mod error;
pub mod goal;
pub mod request;
pub mod service;
pub mod storage;
pub mod store;
pub mod streak;

pub use adapter::{Snapshot, StreakAdapter};
pub use error::{ConfigError, CoreError, RequestError, StoreError, StreakError};
pub use goal::{Goal, GoalStreak, GoalSummary, NewGoal};
pub use request::{GoalAction, InboundEvent, MarkCompleted, Response};
pub use service::GoalService;
pub use storage::Config;
pub use store::{MemoryStore, RecordStore, SqliteStore, StoredGoal};
pub use streak::{decide, Mutation, StreakIndex};
