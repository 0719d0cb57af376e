//! Mastery state machine
//!
//! A record moves between LEARNING, RECOVERING and COMPLETE depending on
//! answer correctness:
//! - correct answers first pay off mistake debt, then build the streak
//! - reaching the required streak completes the entry and awards a star
//! - a mistake raises the requirement by one, clears the streak, sets the
//!   debt to the old requirement and revokes a probationary star

use chrono::{DateTime, Utc};

use super::ledger::{self, LockIn};
use super::progress::{MasteryState, ProgressRecord, MAX_STARS};
use super::Result;

/// What a single `advance` call did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Advance {
    pub correct: bool,
    pub previous: MasteryState,
    pub state: MasteryState,
    /// +1 for an awarded star, -1 for a revoked one
    pub star_delta: i8,
    /// Lock-in result evaluated before the answer was applied
    pub lock_in: LockIn,
}

impl Advance {
    /// The incorrect-answer transition, which the UI flashes red
    pub fn is_red_flash(&self) -> bool {
        !self.correct
    }

    pub fn completed(&self) -> bool {
        self.previous != MasteryState::Complete && self.state == MasteryState::Complete
    }
}

/// Apply one answer to a record.
///
/// The record is validated first and left untouched if it is invalid.
pub fn advance(record: &mut ProgressRecord, is_correct: bool, now: DateTime<Utc>) -> Result<Advance> {
    record.validate()?;

    let lock_in = ledger::check_lock_in(record, now);
    let previous = record.state();
    let mut star_delta = 0;

    if is_correct {
        match previous {
            MasteryState::Recovering => {
                record.mistake_debt -= 1;
            }
            MasteryState::Learning => {
                record.current_streak += 1;
                if record.current_streak == record.required_streak && ledger::award(record, now) {
                    star_delta = 1;
                }
            }
            MasteryState::Complete => {}
        }
    } else {
        let had_star = record.star_count > 0;
        record.mistake_debt = record.required_streak;
        record.required_streak += 1;
        record.current_streak = 0;

        if had_star && ledger::revoke(record, now) {
            star_delta = -1;
        }
    }

    record.validate()?;

    Ok(Advance {
        correct: is_correct,
        previous,
        state: record.state(),
        star_delta,
        lock_in,
    })
}

/// Reset a complete record so it is asked again.
///
/// A record is reopened when its next star can be earned, or when it
/// holds a star that a mistake could still take away (star five, or any
/// star on probation). In the second case `award` holds it at COMPLETE
/// without a new star until the probationary star locks in. Returns
/// whether the record was reopened.
pub fn reopen(record: &mut ProgressRecord, now: DateTime<Utc>) -> bool {
    if !record.is_complete() {
        return false;
    }

    let revocable = record.star_count == MAX_STARS || record.probation_since.is_some();
    if !revocable && !ledger::next_star_available(record, now) {
        return false;
    }

    record.current_streak = 0;
    true
}

/// Bar color zone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BarColor {
    Green,
    Orange,
}

/// Progress bar derived from a record; never stored
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BarView {
    pub color: BarColor,
    /// 0.0 to 1.0
    pub fill: f64,
    /// Number of segments the bar is divided into
    pub segments: u32,
}

impl BarView {
    pub fn of(record: &ProgressRecord) -> Self {
        match record.state() {
            MasteryState::Complete => Self {
                color: BarColor::Green,
                fill: 1.0,
                segments: record.required_streak,
            },
            MasteryState::Recovering => {
                let original = record.original_mistake_debt();
                let paid = original - record.mistake_debt;
                Self {
                    color: BarColor::Orange,
                    fill: f64::from(paid) / f64::from(original),
                    segments: original,
                }
            }
            MasteryState::Learning => Self {
                color: BarColor::Green,
                fill: f64::from(record.current_streak) / f64::from(record.required_streak),
                segments: record.required_streak,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::progress::RawProgress;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 2, 18, 30, 0).unwrap()
    }

    fn record(required: i64, current: i64, debt: i64, stars: i64, since: Option<DateTime<Utc>>) -> ProgressRecord {
        ProgressRecord::from_raw(RawProgress {
            required_streak: required,
            current_streak: current,
            mistake_debt: debt,
            star_count: stars,
            probation_since: since,
            next_award_eligible_at: None,
        })
        .unwrap()
    }

    #[test]
    fn test_two_correct_then_mistake() {
        let now = t0();
        let mut rec = ProgressRecord::default();

        let first = advance(&mut rec, true, now).unwrap();
        assert_eq!(first.state, MasteryState::Learning);
        assert_eq!(first.star_delta, 0);

        let second = advance(&mut rec, true, now).unwrap();
        assert!(second.completed());
        assert_eq!(second.star_delta, 1);
        assert_eq!(rec.star_count(), 1);
        assert_eq!(rec.probation_since(), Some(now));

        let third = advance(&mut rec, false, now).unwrap();
        assert!(third.is_red_flash());
        assert_eq!(third.star_delta, -1);
        assert_eq!(rec.star_count(), 0);
        assert_eq!(rec.probation_since(), None);
        assert_eq!(rec.required_streak(), 3);
        assert_eq!(rec.current_streak(), 0);
        assert_eq!(rec.mistake_debt(), 2);
        assert_eq!(rec.state(), MasteryState::Recovering);
    }

    #[test]
    fn test_completes_exactly_at_required_streak() {
        for required in 2..8 {
            let mut rec = record(required, 0, 0, 0, None);
            for n in 1..=required {
                let step = advance(&mut rec, true, t0()).unwrap();
                assert_eq!(step.state == MasteryState::Complete, n == required, "required {} step {}", required, n);
            }
        }
    }

    #[test]
    fn test_complete_persists_on_correct_answers() {
        let mut rec = ProgressRecord::default();
        advance(&mut rec, true, t0()).unwrap();
        advance(&mut rec, true, t0()).unwrap();

        let again = advance(&mut rec, true, t0()).unwrap();
        assert_eq!(again.previous, MasteryState::Complete);
        assert_eq!(again.state, MasteryState::Complete);
        assert_eq!(again.star_delta, 0);
        assert_eq!(rec.current_streak(), 2);
        assert_eq!(rec.star_count(), 1);
    }

    #[test]
    fn test_recovery_pays_debt_before_streak() {
        let mut rec = record(4, 0, 3, 0, None);

        for expected_debt in [2, 1, 0] {
            advance(&mut rec, true, t0()).unwrap();
            assert_eq!(rec.mistake_debt(), expected_debt);
            assert_eq!(rec.current_streak(), 0);
        }
        assert_eq!(rec.state(), MasteryState::Learning);

        advance(&mut rec, true, t0()).unwrap();
        assert_eq!(rec.current_streak(), 1);
    }

    #[test]
    fn test_mistake_while_recovering_resets_debt() {
        let mut rec = record(4, 0, 1, 0, None);
        advance(&mut rec, false, t0()).unwrap();
        assert_eq!(rec.required_streak(), 5);
        assert_eq!(rec.mistake_debt(), 4);
    }

    #[test]
    fn test_mistake_law_holds_from_any_state() {
        let cases = [
            record(2, 0, 0, 0, None),
            record(3, 2, 0, 0, None),
            record(5, 0, 2, 0, None),
            record(6, 6, 0, 3, None),
        ];
        for mut rec in cases {
            let before = rec.required_streak();
            advance(&mut rec, false, t0()).unwrap();
            assert_eq!(rec.current_streak(), 0);
            assert_eq!(rec.required_streak(), before + 1);
            assert_eq!(rec.mistake_debt(), before);
        }
    }

    #[test]
    fn test_invariants_over_answer_sequence() {
        let answers = [true, false, true, true, false, false, true, true, true, true, true, false, true];
        let mut rec = ProgressRecord::default();
        let mut last_required = rec.required_streak();
        let mut now = t0();

        for correct in answers {
            let step = advance(&mut rec, correct, now).unwrap();
            assert!(rec.current_streak() <= rec.required_streak());
            assert!(rec.required_streak() >= last_required);
            assert!(rec.star_count() <= 5);
            assert!((-1..=1).contains(&step.star_delta));
            last_required = rec.required_streak();
            now += Duration::minutes(1);
        }
    }

    #[test]
    fn test_locked_star_survives_mistake() {
        let mut rec = record(3, 3, 0, 2, Some(t0()));
        let step = advance(&mut rec, false, t0() + Duration::hours(25)).unwrap();
        assert_eq!(step.lock_in, LockIn::Locked);
        assert_eq!(step.star_delta, 0);
        assert_eq!(rec.star_count(), 2);
    }

    #[test]
    fn test_fifth_star_mistake() {
        let now = t0() + Duration::days(365);
        let mut rec = record(7, 7, 0, 5, Some(t0()));
        let step = advance(&mut rec, false, now).unwrap();
        assert_eq!(step.star_delta, -1);
        assert_eq!(rec.star_count(), 4);
        assert_eq!(rec.probation_since(), Some(now));
    }

    #[test]
    fn test_invalid_record_is_not_touched() {
        let mut rec = ProgressRecord::default();
        rec.current_streak = 5;
        let snapshot = rec.clone();

        let err = advance(&mut rec, true, t0()).unwrap_err();
        assert!(matches!(err, crate::scheduler::SchedulerError::InvalidRecordState(_)));
        assert_eq!(rec, snapshot);
    }

    #[test]
    fn test_reopen() {
        let mut learning = ProgressRecord::default();
        assert!(!reopen(&mut learning, t0()));

        // Star one: reopen straight away
        let mut rec = record(2, 2, 0, 1, Some(t0()));
        assert!(reopen(&mut rec, t0()));
        assert_eq!(rec.current_streak(), 0);
        assert_eq!(rec.required_streak(), 2);
        assert_eq!(rec.star_count(), 1);

        // Star two on probation can still be lost, so it is asked again
        let mut rec = record(3, 3, 0, 2, Some(t0()));
        assert!(reopen(&mut rec, t0() + Duration::hours(2)));
        assert_eq!(rec.current_streak(), 0);

        // Star five never locks in
        let mut rec = record(7, 7, 0, 5, Some(t0()));
        assert!(reopen(&mut rec, t0() + Duration::days(3650)));

        // Locked star whose next award lies ahead stays complete
        let mut rec = ProgressRecord::from_raw(RawProgress {
            required_streak: 3,
            current_streak: 3,
            mistake_debt: 0,
            star_count: 2,
            probation_since: None,
            next_award_eligible_at: Some(t0() + Duration::days(1)),
        })
        .unwrap();
        assert!(!reopen(&mut rec, t0()));
        assert!(rec.is_complete());
    }

    #[test]
    fn test_reopened_probationary_star_is_held_then_lost() {
        let now = t0() + Duration::hours(2);
        let mut rec = record(3, 3, 0, 2, Some(t0()));
        assert!(reopen(&mut rec, now));

        for _ in 0..3 {
            advance(&mut rec, true, now).unwrap();
        }
        assert!(rec.is_complete());
        assert_eq!(rec.star_count(), 2);

        let step = advance(&mut rec, false, now).unwrap();
        assert_eq!(step.star_delta, -1);
        assert_eq!(rec.star_count(), 1);
    }

    #[test]
    fn test_bar_view() {
        let bar = BarView::of(&ProgressRecord::default());
        assert_eq!(bar.color, BarColor::Green);
        assert_eq!(bar.fill, 0.0);
        assert_eq!(bar.segments, 2);

        let bar = BarView::of(&record(4, 1, 0, 0, None));
        assert_eq!(bar.color, BarColor::Green);
        assert!((bar.fill - 0.25).abs() < 1e-9);

        let bar = BarView::of(&record(5, 0, 3, 0, None));
        assert_eq!(bar.color, BarColor::Orange);
        assert!((bar.fill - 0.25).abs() < 1e-9);
        assert_eq!(bar.segments, 4);

        let bar = BarView::of(&record(3, 3, 0, 1, Some(t0())));
        assert_eq!(bar.color, BarColor::Green);
        assert_eq!(bar.fill, 1.0);
    }
}
