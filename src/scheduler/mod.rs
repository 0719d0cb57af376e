//! Memorization scheduler
//!
//! Tracks per-entry mastery, decides when an entry is complete, and
//! awards or revokes stars. Everything in here is synchronous and pure
//! apart from the injected clock; persistence lives behind the traits in
//! `crate::storage`.

use thiserror::Error;

pub mod clock;
pub mod ledger;
pub mod machine;
pub mod progress;

pub use clock::{Clock, SystemClock};
#[cfg(test)]
pub use clock::FixedClock;
pub use ledger::LockIn;
pub use machine::{advance, reopen, BarColor, BarView};
pub use progress::{MasteryState, ProgressRecord, MAX_STARS};

/// Scheduler errors
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// A progress record breaks one of its invariants. Never repaired in place.
    #[error("invalid progress record: {0}")]
    InvalidRecordState(String),

    /// The entry is not part of the active pool.
    #[error("entry {0} is not in the active pool")]
    UnknownEntry(i64),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
