//! Storage module for prosakart
//!
//! Keeps languages, entries, sheets and per-user progress in SQLite and
//! provides status/statistics reporting. The scheduler only sees the
//! `RecordStore` and `Catalog` traits.

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::config::{Config, CONFIG_FILE, DEFAULT_CONFIG};
use crate::scheduler::{self, ProgressRecord};

pub mod catalog;
#[cfg(test)]
pub mod memory;
pub mod progress;

pub use catalog::{CatalogStore, Entry, EntryEdit};
#[cfg(test)]
pub use memory::MemoryStore;
pub use progress::ProgressStore;

pub const DB_FILE: &str = "prosakart.sqlite";

/// Per-(user, entry) progress persistence. Each call is atomic.
pub trait RecordStore {
    /// Load a record, or a fresh default if the entry was never presented
    fn load_progress(&self, user: &str, entry_id: i64) -> scheduler::Result<ProgressRecord>;

    fn save_progress(&mut self, user: &str, entry_id: i64, record: &ProgressRecord) -> scheduler::Result<()>;
}

/// Read-only view of entries and sheets
pub trait Catalog {
    /// Flattened entries of a sheet and its nested sheets, in the sheet's direction
    fn get_entries(&self, sheet_id: i64) -> scheduler::Result<Vec<Entry>>;

    /// Acceptable answers, top answer first
    fn get_answers(&self, entry_id: i64) -> scheduler::Result<Vec<String>>;
}

/// Path of the database inside a data directory
pub fn db_path(data_dir: &Path) -> PathBuf {
    data_dir.join(DB_FILE)
}

/// Open a connection with foreign keys on and the schema in place
pub fn connect(db_path: &Path) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    create_schema(&conn)?;
    Ok(conn)
}

/// Create all tables if they don't exist
pub fn create_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS languages (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            name TEXT UNIQUE NOT NULL
        );

        -- One row per (from, to) direction
        CREATE TABLE IF NOT EXISTS translators (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            from_language INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
            to_language INTEGER NOT NULL REFERENCES languages(id) ON DELETE CASCADE,
            UNIQUE(from_language, to_language)
        );

        CREATE TABLE IF NOT EXISTS sheets (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            translator INTEGER NOT NULL REFERENCES translators(id) ON DELETE CASCADE,
            name TEXT NOT NULL,
            UNIQUE(translator, name)
        );

        -- Nested sheets, flattened when entries are read
        CREATE TABLE IF NOT EXISTS sheet_children (
            parent INTEGER NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
            child INTEGER NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
            PRIMARY KEY(parent, child)
        );

        CREATE TABLE IF NOT EXISTS entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            translator INTEGER NOT NULL REFERENCES translators(id) ON DELETE CASCADE,
            question TEXT NOT NULL,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            UNIQUE(translator, question)
        );

        -- position 0 is the top answer
        CREATE TABLE IF NOT EXISTS solutions (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            entry INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
            position INTEGER NOT NULL,
            text TEXT NOT NULL,
            UNIQUE(entry, text)
        );

        CREATE TABLE IF NOT EXISTS mentions (
            sheet INTEGER NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
            entry INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
            PRIMARY KEY(sheet, entry)
        );

        CREATE TABLE IF NOT EXISTS progress (
            user TEXT NOT NULL,
            entry INTEGER NOT NULL REFERENCES entries(id) ON DELETE CASCADE,
            required_streak INTEGER NOT NULL DEFAULT 2,
            current_streak INTEGER NOT NULL DEFAULT 0,
            mistake_debt INTEGER NOT NULL DEFAULT 0,
            star_count INTEGER NOT NULL DEFAULT 0,
            probation_since TEXT,
            next_award_eligible_at TEXT,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            PRIMARY KEY(user, entry)
        );

        CREATE INDEX IF NOT EXISTS idx_entries_translator ON entries(translator);
        CREATE INDEX IF NOT EXISTS idx_solutions_entry ON solutions(entry);
        CREATE INDEX IF NOT EXISTS idx_mentions_entry ON mentions(entry);
        "#,
    )
}

/// Initialize the data directory, database and configuration
pub fn init(data_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(data_dir)?;

    let db_path = db_path(data_dir);
    connect(&db_path)?;
    info!("prosakart initialized at {:?}", data_dir);

    let config_path = data_dir.join(CONFIG_FILE);
    if !config_path.exists() {
        std::fs::write(&config_path, DEFAULT_CONFIG)?;
        info!("Created default configuration at {:?}", config_path);
    }

    Ok(())
}

/// Show current status
pub fn show_status(data_dir: &Path) -> Result<()> {
    println!("prosakart Status");
    println!("================");
    println!();

    if !data_dir.exists() {
        println!("Status: NOT INITIALIZED");
        println!("Run 'prosakart init' to initialize");
        return Ok(());
    }

    println!("Status: INITIALIZED");
    println!("Data directory: {:?}", data_dir);

    let db_path = db_path(data_dir);
    if !db_path.exists() {
        println!("Database: NOT FOUND");
        return Ok(());
    }

    let config = Config::load(data_dir)?;
    let conn = Connection::open(&db_path)?;
    let count = |sql: &str| -> i64 { conn.query_row(sql, [], |row| row.get(0)).unwrap_or(0) };

    println!("User: {}", config.profile.user);
    println!("Languages: {}", count("SELECT COUNT(*) FROM languages"));
    println!("Entries: {}", count("SELECT COUNT(*) FROM entries"));
    println!("Sheets: {}", count("SELECT COUNT(*) FROM sheets"));

    let stars: i64 = conn
        .query_row(
            "SELECT COALESCE(SUM(star_count), 0) FROM progress WHERE user = ?1",
            [&config.profile.user],
            |row| row.get(0),
        )
        .unwrap_or(0);
    println!("Stars: {}", stars);

    Ok(())
}

/// Show detailed statistics for the configured user
pub fn show_stats(data_dir: &Path) -> Result<()> {
    println!("prosakart Statistics");
    println!("====================");
    println!();

    let db_path = db_path(data_dir);
    if !db_path.exists() {
        println!("No database found. Run 'prosakart init' first.");
        return Ok(());
    }

    let config = Config::load(data_dir)?;
    let user = config.profile.user.as_str();
    let store = ProgressStore::open(&db_path)?;
    let catalog = CatalogStore::open(&db_path)?;

    println!("Progress ({}):", user);
    println!("-------------------");

    let summary = store.summary(user)?;
    println!("  Entries practised: {}", summary.practised);
    println!("  Complete: {}", summary.complete);
    println!("  Recovering: {}", summary.recovering);
    println!("  Stars held: {}", summary.stars);
    println!("  Stars on probation: {}", summary.on_probation);

    println!("  By star count:");
    for (stars, entries) in store.star_histogram(user)? {
        println!("    {} star(s): {} entries", stars, entries);
    }

    println!();
    println!("Sheets:");
    println!("-------");

    let sheets = catalog.list_sheets()?;
    if sheets.is_empty() {
        println!("  No sheets created yet. Run 'prosakart sheet create' to add one.");
    }

    for sheet in sheets {
        let entries = catalog.get_entries(sheet.id)?;
        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        let complete = store.count_complete(user, &ids)?;
        let stars = store.count_stars(user, &ids)?;
        println!(
            "  {} ({} -> {}): {}/{} complete, {} stars",
            sheet.name,
            sheet.from_language,
            sheet.to_language,
            complete,
            ids.len(),
            stars
        );
    }

    Ok(())
}
