//! Progress record storage
//!
//! One row per (user, entry). Rows are created on first save; a missing
//! row loads as a fresh record.

use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use tracing::debug;

use super::{connect, RecordStore};
use crate::scheduler::{self, progress::RawProgress, ProgressRecord};

/// Aggregate progress for one user
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProgressSummary {
    pub practised: i64,
    pub complete: i64,
    pub recovering: i64,
    pub stars: i64,
    pub on_probation: i64,
}

/// Progress store backed by SQLite
pub struct ProgressStore {
    conn: Connection,
}

impl ProgressStore {
    /// Open or create a progress store at the given database path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = connect(db_path)?;
        Ok(Self { conn })
    }

    pub fn summary(&self, user: &str) -> Result<ProgressSummary> {
        self.conn
            .query_row(
                r#"
                SELECT COUNT(*),
                    COALESCE(SUM(mistake_debt = 0 AND current_streak = required_streak), 0),
                    COALESCE(SUM(mistake_debt > 0), 0),
                    COALESCE(SUM(star_count), 0),
                    COALESCE(SUM(probation_since IS NOT NULL), 0)
                FROM progress WHERE user = ?1
                "#,
                params![user],
                |row| {
                    Ok(ProgressSummary {
                        practised: row.get(0)?,
                        complete: row.get(1)?,
                        recovering: row.get(2)?,
                        stars: row.get(3)?,
                        on_probation: row.get(4)?,
                    })
                },
            )
            .map_err(Into::into)
    }

    /// (star count, number of entries) pairs, fewest stars first
    pub fn star_histogram(&self, user: &str) -> Result<Vec<(i64, i64)>> {
        let mut stmt = self.conn.prepare(
            "SELECT star_count, COUNT(*) FROM progress WHERE user = ?1 GROUP BY star_count ORDER BY star_count",
        )?;
        let rows = stmt.query_map(params![user], |row| Ok((row.get(0)?, row.get(1)?)))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// How many of the given entries are currently complete
    pub fn count_complete(&self, user: &str, entry_ids: &[i64]) -> Result<i64> {
        let mut complete = 0;
        for &entry_id in entry_ids {
            if self.load_progress(user, entry_id)?.is_complete() {
                complete += 1;
            }
        }
        Ok(complete)
    }

    /// Stars held across the given entries
    pub fn count_stars(&self, user: &str, entry_ids: &[i64]) -> Result<i64> {
        let mut stars = 0;
        for &entry_id in entry_ids {
            stars += i64::from(self.load_progress(user, entry_id)?.star_count());
        }
        Ok(stars)
    }
}

impl RecordStore for ProgressStore {
    fn load_progress(&self, user: &str, entry_id: i64) -> scheduler::Result<ProgressRecord> {
        let raw = self
            .conn
            .prepare_cached(
                r#"
                SELECT required_streak, current_streak, mistake_debt, star_count,
                    probation_since, next_award_eligible_at
                FROM progress WHERE user = ?1 AND entry = ?2
                "#,
            )?
            .query_row(params![user, entry_id], |row| {
                Ok(RawProgress {
                    required_streak: row.get(0)?,
                    current_streak: row.get(1)?,
                    mistake_debt: row.get(2)?,
                    star_count: row.get(3)?,
                    probation_since: row.get(4)?,
                    next_award_eligible_at: row.get(5)?,
                })
            })
            .optional()?;

        match raw {
            Some(raw) => ProgressRecord::from_raw(raw),
            None => Ok(ProgressRecord::default()),
        }
    }

    fn save_progress(&mut self, user: &str, entry_id: i64, record: &ProgressRecord) -> scheduler::Result<()> {
        record.validate()?;
        let raw = record.to_raw();

        self.conn.execute(
            r#"
            INSERT INTO progress
            (user, entry, required_streak, current_streak, mistake_debt, star_count,
             probation_since, next_award_eligible_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user, entry) DO UPDATE SET
                required_streak = excluded.required_streak,
                current_streak = excluded.current_streak,
                mistake_debt = excluded.mistake_debt,
                star_count = excluded.star_count,
                probation_since = excluded.probation_since,
                next_award_eligible_at = excluded.next_award_eligible_at,
                updated_at = CURRENT_TIMESTAMP
            "#,
            params![
                user,
                entry_id,
                raw.required_streak,
                raw.current_streak,
                raw.mistake_debt,
                raw.star_count,
                raw.probation_since,
                raw.next_award_eligible_at
            ],
        )?;

        debug!("Saved progress for {} entry {}: {:?}", user, entry_id, record.state());
        Ok(())
    }
}
