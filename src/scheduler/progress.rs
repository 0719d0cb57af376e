//! Per-(user, entry) progress record
//!
//! Plain data. Only the state machine and the star ledger mutate it;
//! everything else goes through the read accessors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Result, SchedulerError};

/// Highest number of stars an entry can hold
pub const MAX_STARS: u8 = 5;

/// Streak a fresh record must reach
pub const INITIAL_REQUIRED_STREAK: u32 = 2;

/// Mastery state derived from a record's counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MasteryState {
    /// Building a streak
    Learning,
    /// Working off mistake debt
    Recovering,
    /// Streak requirement met
    Complete,
}

impl MasteryState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MasteryState::Learning => "learning",
            MasteryState::Recovering => "recovering",
            MasteryState::Complete => "complete",
        }
    }
}

/// Mastery state of one entry for one user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub(in crate::scheduler) required_streak: u32,
    pub(in crate::scheduler) current_streak: u32,
    pub(in crate::scheduler) mistake_debt: u32,
    pub(in crate::scheduler) star_count: u8,
    pub(in crate::scheduler) probation_since: Option<DateTime<Utc>>,
    pub(in crate::scheduler) next_award_eligible_at: Option<DateTime<Utc>>,
}

impl Default for ProgressRecord {
    fn default() -> Self {
        Self {
            required_streak: INITIAL_REQUIRED_STREAK,
            current_streak: 0,
            mistake_debt: 0,
            star_count: 0,
            probation_since: None,
            next_award_eligible_at: None,
        }
    }
}

/// Record fields as a store keeps them, before validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawProgress {
    pub required_streak: i64,
    pub current_streak: i64,
    pub mistake_debt: i64,
    pub star_count: i64,
    pub probation_since: Option<DateTime<Utc>>,
    pub next_award_eligible_at: Option<DateTime<Utc>>,
}

impl ProgressRecord {
    /// Build a record from stored values, rejecting anything that breaks an invariant
    pub fn from_raw(raw: RawProgress) -> Result<Self> {
        let field = |name: &str, value: i64| -> Result<u32> {
            u32::try_from(value).map_err(|_| {
                SchedulerError::InvalidRecordState(format!("{} out of range: {}", name, value))
            })
        };

        let star_count = u8::try_from(raw.star_count).map_err(|_| {
            SchedulerError::InvalidRecordState(format!("star_count out of range: {}", raw.star_count))
        })?;

        let record = Self {
            required_streak: field("required_streak", raw.required_streak)?,
            current_streak: field("current_streak", raw.current_streak)?,
            mistake_debt: field("mistake_debt", raw.mistake_debt)?,
            star_count,
            probation_since: raw.probation_since,
            next_award_eligible_at: raw.next_award_eligible_at,
        };
        record.validate()?;
        Ok(record)
    }

    /// Values in the shape a store writes them
    pub fn to_raw(&self) -> RawProgress {
        RawProgress {
            required_streak: i64::from(self.required_streak),
            current_streak: i64::from(self.current_streak),
            mistake_debt: i64::from(self.mistake_debt),
            star_count: i64::from(self.star_count),
            probation_since: self.probation_since,
            next_award_eligible_at: self.next_award_eligible_at,
        }
    }

    /// Check every invariant. Violations are reported, never corrected.
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: String| Err(SchedulerError::InvalidRecordState(msg));

        if self.required_streak < INITIAL_REQUIRED_STREAK {
            return fail(format!("required_streak {} below {}", self.required_streak, INITIAL_REQUIRED_STREAK));
        }
        if self.current_streak > self.required_streak {
            return fail(format!(
                "current_streak {} exceeds required_streak {}",
                self.current_streak, self.required_streak
            ));
        }
        if self.mistake_debt > 0 && self.current_streak > 0 {
            return fail(format!(
                "current_streak {} while mistake_debt {} is outstanding",
                self.current_streak, self.mistake_debt
            ));
        }
        if self.mistake_debt >= self.required_streak {
            return fail(format!(
                "mistake_debt {} not below required_streak {}",
                self.mistake_debt, self.required_streak
            ));
        }
        if self.star_count > MAX_STARS {
            return fail(format!("star_count {} exceeds {}", self.star_count, MAX_STARS));
        }
        if self.star_count == 0 && self.probation_since.is_some() {
            return fail("probation_since set without a star".to_string());
        }
        Ok(())
    }

    pub fn state(&self) -> MasteryState {
        if self.mistake_debt > 0 {
            MasteryState::Recovering
        } else if self.current_streak == self.required_streak {
            MasteryState::Complete
        } else {
            MasteryState::Learning
        }
    }

    pub fn is_complete(&self) -> bool {
        self.state() == MasteryState::Complete
    }

    pub fn required_streak(&self) -> u32 {
        self.required_streak
    }

    pub fn current_streak(&self) -> u32 {
        self.current_streak
    }

    pub fn mistake_debt(&self) -> u32 {
        self.mistake_debt
    }

    pub fn star_count(&self) -> u8 {
        self.star_count
    }

    pub fn probation_since(&self) -> Option<DateTime<Utc>> {
        self.probation_since
    }

    pub fn next_award_eligible_at(&self) -> Option<DateTime<Utc>> {
        self.next_award_eligible_at
    }

    /// Debt the last mistake created. Each mistake resets the debt to the
    /// streak requirement it replaced, which is one below the current one.
    pub fn original_mistake_debt(&self) -> u32 {
        self.required_streak - 1
    }
}
