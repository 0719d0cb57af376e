//! Test session coordinator
//!
//! A session quizzes one user on the flattened entries of a sheet. It
//! picks the next entry at random among the entries that are not complete,
//! checks answers, runs them through the state machine and saves every
//! record before returning.

use rand::Rng;
use std::collections::VecDeque;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::scheduler::{
    self, advance, ledger, reopen, BarView, Clock, LockIn, MasteryState, ProgressRecord, SchedulerError,
};
use crate::storage::{Catalog, Entry, RecordStore};

pub mod matching;

use matching::Match;

/// Outcome of a submitted answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Correct,
    Incorrect,
    /// Near miss; nothing was recorded and the user may try again
    CheckSpelling,
}

/// The entry currently being asked
#[derive(Debug, Clone, PartialEq)]
pub struct Question {
    pub entry_id: i64,
    pub question: String,
    pub bar: BarView,
    pub stars: u8,
}

/// What the caller should render after an answer
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub entry_id: i64,
    pub verdict: Verdict,
    pub state: MasteryState,
    pub bar: BarView,
    /// +1 for an awarded star, -1 for a revoked one
    pub star_delta: i8,
    pub stars: u8,
    /// Shown when the answer was wrong
    pub top_answer: Option<String>,
}

impl Feedback {
    /// Incorrect answers flash the bar red
    pub fn red_flash(&self) -> bool {
        self.verdict == Verdict::Incorrect
    }
}

/// Running totals for a session
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub entries: usize,
    pub answers: u32,
    pub correct: u32,
    pub stars_earned: u32,
    pub stars_lost: u32,
    pub completed: u32,
}

struct PoolEntry {
    entry: Entry,
    record: ProgressRecord,
}

pub struct Session<'a, S: RecordStore, K: Clock, R: Rng> {
    user: String,
    store: &'a mut S,
    clock: K,
    rng: R,
    settings: SessionConfig,
    pool: Vec<PoolEntry>,
    current: Option<i64>,
    recent: VecDeque<i64>,
    spelling_retry: Option<i64>,
    summary: SessionSummary,
}

impl<'a, S: RecordStore, K: Clock, R: Rng> Session<'a, S, K, R> {
    /// Load the sheet's entries and their progress.
    ///
    /// Stars whose waiting period has passed are locked in. Complete
    /// entries are reopened when their next star is available or when
    /// they hold a star that can still be lost.
    pub fn open<C: Catalog>(
        catalog: &C,
        sheet_id: i64,
        user: &str,
        store: &'a mut S,
        clock: K,
        rng: R,
        settings: SessionConfig,
    ) -> scheduler::Result<Self> {
        let entries = catalog.get_entries(sheet_id)?;
        let now = clock.now();
        let mut pool = Vec::with_capacity(entries.len());

        for entry in entries {
            let loaded = store.load_progress(user, entry.id)?;
            let mut record = loaded.clone();

            match ledger::check_lock_in(&mut record, now) {
                LockIn::Locked => debug!("Star {} locked in for entry {}", record.star_count(), entry.id),
                LockIn::ClockRegression => warn!(
                    "Clock is behind the probation start of entry {}; lock-in postponed",
                    entry.id
                ),
                _ => {}
            }
            if reopen(&mut record, now) {
                debug!("Reopened entry {} holding {} stars", entry.id, record.star_count());
            }
            if record != loaded {
                store.save_progress(user, entry.id, &record)?;
            }

            pool.push(PoolEntry { entry, record });
        }

        let open = pool.iter().filter(|p| !p.record.is_complete()).count();
        info!("Session opened on sheet {}: {} entries, {} to practise", sheet_id, pool.len(), open);

        Ok(Self {
            user: user.to_string(),
            store,
            clock,
            rng,
            settings,
            summary: SessionSummary {
                entries: pool.len(),
                ..SessionSummary::default()
            },
            pool,
            current: None,
            recent: VecDeque::new(),
            spelling_retry: None,
        })
    }

    /// Pick the next entry, or `None` once every entry is complete
    pub fn next_question(&mut self) -> Option<Question> {
        let candidates: Vec<usize> = self
            .pool
            .iter()
            .enumerate()
            .filter(|(_, p)| !p.record.is_complete())
            .map(|(idx, _)| idx)
            .collect();

        if candidates.is_empty() {
            self.current = None;
            return None;
        }

        let fresh: Vec<usize> = candidates
            .iter()
            .copied()
            .filter(|&idx| !self.recent.contains(&self.pool[idx].entry.id))
            .collect();
        let choices = if fresh.is_empty() { &candidates } else { &fresh };

        let picked = &self.pool[choices[self.rng.gen_range(0..choices.len())]];
        let entry_id = picked.entry.id;

        self.recent.push_back(entry_id);
        while self.recent.len() > self.settings.recent_window.max(1) {
            self.recent.pop_front();
        }
        self.current = Some(entry_id);

        Some(Question {
            entry_id,
            question: picked.entry.question.clone(),
            bar: BarView::of(&picked.record),
            stars: picked.record.star_count(),
        })
    }

    /// Check an answer, advance the entry and persist it
    pub fn submit_answer(&mut self, entry_id: i64, user_text: &str) -> scheduler::Result<Feedback> {
        let idx = self
            .pool
            .iter()
            .position(|p| p.entry.id == entry_id)
            .ok_or(SchedulerError::UnknownEntry(entry_id))?;

        let judged = matching::judge(user_text, &self.pool[idx].entry.answers[..], self.settings.spelling_threshold);

        if let Match::Close { similarity } = judged {
            if self.settings.spelling_check && self.spelling_retry != Some(entry_id) {
                debug!("Near miss on entry {} (similarity {:.2})", entry_id, similarity);
                self.spelling_retry = Some(entry_id);
                let record = &self.pool[idx].record;
                return Ok(Feedback {
                    entry_id,
                    verdict: Verdict::CheckSpelling,
                    state: record.state(),
                    bar: BarView::of(record),
                    star_delta: 0,
                    stars: record.star_count(),
                    top_answer: None,
                });
            }
        }
        self.spelling_retry = None;

        let correct = judged == Match::Exact;
        let now = self.clock.now();

        // Work on a copy so a failed save leaves the session unchanged
        let mut record = self.pool[idx].record.clone();
        let step = advance(&mut record, correct, now)?;
        if step.lock_in == LockIn::ClockRegression {
            warn!("Clock is behind the probation start of entry {}; lock-in postponed", entry_id);
        }
        self.store.save_progress(&self.user, entry_id, &record)?;

        let pooled = &mut self.pool[idx];
        pooled.record = record;

        self.summary.answers += 1;
        if correct {
            self.summary.correct += 1;
        }
        if step.star_delta > 0 {
            self.summary.stars_earned += 1;
        } else if step.star_delta < 0 {
            self.summary.stars_lost += 1;
        }
        if step.completed() {
            self.summary.completed += 1;
        }

        Ok(Feedback {
            entry_id,
            verdict: if step.is_red_flash() { Verdict::Incorrect } else { Verdict::Correct },
            state: step.state,
            bar: BarView::of(&pooled.record),
            star_delta: step.star_delta,
            stars: pooled.record.star_count(),
            top_answer: if correct {
                None
            } else {
                pooled.entry.top_answer().map(str::to_string)
            },
        })
    }

    /// Answer the entry returned by the last `next_question`
    pub fn answer_current(&mut self, user_text: &str) -> scheduler::Result<Feedback> {
        let entry_id = self.current.ok_or_else(|| anyhow::anyhow!("No question has been asked"))?;
        self.submit_answer(entry_id, user_text)
    }

    /// True when the pool is empty or every entry is complete
    pub fn is_finished(&self) -> bool {
        self.pool.iter().all(|p| p.record.is_complete())
    }

    pub fn remaining(&self) -> usize {
        self.pool.iter().filter(|p| !p.record.is_complete()).count()
    }

    pub fn summary(&self) -> &SessionSummary {
        &self.summary
    }
}
