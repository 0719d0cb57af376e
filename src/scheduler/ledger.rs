//! Star ledger
//!
//! Stars live on the progress record as `star_count`, `probation_since`
//! and `next_award_eligible_at`. The newest star is on probation and can
//! be lost to a mistake. Stars two to four lock in once their waiting
//! period has passed; star one stays on probation until star two replaces
//! it, and star five never locks in.

use chrono::{DateTime, Duration, Utc};

use super::progress::{ProgressRecord, MAX_STARS};

/// Time a star must survive on probation before it locks in.
/// The next star cannot be awarded before then either.
pub fn waiting_period(star_count: u8) -> Option<Duration> {
    match star_count {
        2 => Some(Duration::days(1)),
        3 => Some(Duration::days(7)),
        4 => Some(Duration::days(30)),
        5 => Some(Duration::days(90)),
        _ => None,
    }
}

/// Stars that lock in after their waiting period
fn locks_in(star_count: u8) -> bool {
    (2..=4).contains(&star_count)
}

/// Result of a lock-in check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockIn {
    /// No star is on probation
    NoProbation,
    /// The star on probation is tier 1 or 5, which never lock in
    NeverLocks,
    /// Waiting period still running
    Pending { remaining: Duration },
    /// The probationary star just became permanent
    Locked,
    /// `now` is before the probation start; treated as not yet eligible
    ClockRegression,
}

/// Grant a star for reaching COMPLETE. Returns whether a star was granted.
///
/// Refuses silently while the next star is not yet available, leaving the
/// entry complete without a new star.
pub fn award(record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
    if !next_star_available(record, now) {
        return false;
    }

    record.star_count += 1;
    record.probation_since = Some(now);
    true
}

/// Take away the probationary star after a mistake. Returns whether a star was lost.
pub fn revoke(record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
    if record.star_count == MAX_STARS {
        // Star five is always revocable, and star four goes back on probation
        record.star_count -= 1;
        record.probation_since = Some(now);
        record.next_award_eligible_at = None;
        return true;
    }

    if record.probation_since.is_none() {
        return false;
    }

    record.star_count = record.star_count.saturating_sub(1);
    record.probation_since = None;
    record.next_award_eligible_at = None;
    true
}

/// Lock in the probationary star if its waiting period has passed.
///
/// Evaluated lazily whenever a record is loaded or advanced. Calling it
/// twice with the same `now` has the same effect as calling it once.
pub fn check_lock_in(record: &mut ProgressRecord, now: DateTime<Utc>) -> LockIn {
    let since = match record.probation_since {
        Some(since) => since,
        None => return LockIn::NoProbation,
    };

    if !locks_in(record.star_count) {
        return LockIn::NeverLocks;
    }

    let elapsed = now - since;
    if elapsed < Duration::zero() {
        return LockIn::ClockRegression;
    }

    let period = match waiting_period(record.star_count) {
        Some(period) => period,
        None => return LockIn::NeverLocks,
    };

    if elapsed < period {
        return LockIn::Pending { remaining: period - elapsed };
    }

    record.probation_since = None;
    record.next_award_eligible_at = Some(since + period);
    LockIn::Locked
}

/// Whether the record could receive another star at `now`
pub fn next_star_available(record: &ProgressRecord, now: DateTime<Utc>) -> bool {
    if record.star_count >= MAX_STARS {
        return false;
    }

    // A tier 2-4 star still on probation has to lock in first
    if record.probation_since.is_some() && locks_in(record.star_count) {
        return false;
    }

    match record.next_award_eligible_at {
        Some(eligible_at) => now >= eligible_at,
        None => true,
    }
}
