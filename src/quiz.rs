//! Interactive terminal quiz
//!
//! Reads one answer per line. An empty line or end of input ends the quiz
//! early; progress is saved after every answer either way.

use anyhow::{anyhow, Result};
use rand::Rng;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::info;

use crate::config::Config;
use crate::scheduler::{BarColor, BarView, Clock, SystemClock, MAX_STARS};
use crate::session::{Session, SessionSummary, Verdict};
use crate::storage::{self, CatalogStore, ProgressStore, RecordStore};

/// Run a quiz on a sheet for the configured user
pub fn run(data_dir: &Path, sheet: &str, from: &str, to: &str) -> Result<SessionSummary> {
    let config = Config::load(data_dir)?;
    let db_path = storage::db_path(data_dir);
    if !db_path.exists() {
        return Err(anyhow!("No database found. Run 'prosakart init' first."));
    }

    let catalog = CatalogStore::open(&db_path)?;
    let sheet_id = catalog
        .find_sheet(from, to, sheet)?
        .ok_or_else(|| anyhow!("Unknown sheet '{}' for {} -> {}", sheet, from, to))?;
    let mut store = ProgressStore::open(&db_path)?;

    let mut session = Session::open(
        &catalog,
        sheet_id,
        &config.profile.user,
        &mut store,
        SystemClock,
        rand::thread_rng(),
        config.session.clone(),
    )?;

    info!("Testing '{}' as {}", sheet, config.profile.user);
    let stdin = std::io::stdin();
    let stdout = std::io::stdout();
    drive(&mut session, stdin.lock(), stdout.lock())
}

/// Ask questions until the sheet is done or the input ends
pub fn drive<S, K, R, I, O>(session: &mut Session<'_, S, K, R>, mut input: I, mut out: O) -> Result<SessionSummary>
where
    S: RecordStore,
    K: Clock,
    R: Rng,
    I: BufRead,
    O: Write,
{
    if session.is_finished() {
        writeln!(out, "Nothing to practise in this sheet right now.")?;
        out.flush()?;
        return Ok(session.summary().clone());
    }

    'questions: while let Some(question) = session.next_question() {
        writeln!(out)?;
        writeln!(
            out,
            "{} {}  ({} to go)",
            render_bar(&question.bar),
            render_stars(question.stars),
            session.remaining()
        )?;
        writeln!(out, "{}", question.question)?;

        loop {
            write!(out, "> ")?;
            out.flush()?;

            let mut line = String::new();
            if input.read_line(&mut line)? == 0 || line.trim().is_empty() {
                writeln!(out)?;
                writeln!(out, "Stopping early.")?;
                break 'questions;
            }

            let feedback = session.answer_current(&line)?;
            match feedback.verdict {
                Verdict::CheckSpelling => {
                    writeln!(out, "Almost. Check your spelling and try again.")?;
                    continue;
                }
                Verdict::Correct => writeln!(out, "✅ Correct")?,
                Verdict::Incorrect => {
                    let answer = feedback.top_answer.as_deref().unwrap_or("?");
                    writeln!(out, "❌ Wrong. Answer: {}", answer)?;
                }
            }

            match feedback.star_delta {
                1 => writeln!(out, "⭐ Star earned ({}/{})", feedback.stars, MAX_STARS)?,
                -1 => writeln!(out, "💔 Star lost ({}/{})", feedback.stars, MAX_STARS)?,
                _ => {}
            }
            if feedback.red_flash() {
                writeln!(out, "\x1b[31m{}\x1b[0m", render_bar(&feedback.bar))?;
            } else {
                writeln!(out, "{}", render_bar(&feedback.bar))?;
            }
            break;
        }
    }

    let summary = session.summary().clone();
    writeln!(out)?;
    writeln!(out, "Session summary")?;
    writeln!(out, "---------------")?;
    writeln!(out, "  Answers: {} ({} correct)", summary.answers, summary.correct)?;
    writeln!(out, "  Entries completed: {}/{}", summary.completed, summary.entries)?;
    writeln!(out, "  Stars earned: {}", summary.stars_earned)?;
    if summary.stars_lost > 0 {
        writeln!(out, "  Stars lost: {}", summary.stars_lost)?;
    }
    out.flush()?;

    Ok(summary)
}

/// Text bar: `#` fills the green zone, `=` the orange one
pub fn render_bar(bar: &BarView) -> String {
    let segments = bar.segments.max(1) as usize;
    let filled = ((bar.fill * segments as f64).round() as usize).min(segments);
    let mark = match bar.color {
        BarColor::Green => '#',
        BarColor::Orange => '=',
    };

    let mut text = String::with_capacity(segments + 2);
    text.push('[');
    text.extend(std::iter::repeat(mark).take(filled));
    text.extend(std::iter::repeat('-').take(segments - filled));
    text.push(']');
    text
}

fn render_stars(stars: u8) -> String {
    let held = usize::from(stars.min(MAX_STARS));
    let mut text = "★".repeat(held);
    text.push_str(&"☆".repeat(usize::from(MAX_STARS) - held));
    text
}
