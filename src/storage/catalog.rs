//! Languages, entries and sheets
//!
//! Entries and sheets belong to a translator, i.e. a (from, to) language
//! pair. Sheets can include other sheets; `get_entries` flattens them.

use anyhow::{anyhow, bail, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::path::Path;
use tracing::debug;

use super::{connect, Catalog};
use crate::scheduler;

/// A vocabulary item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub id: i64,
    pub question: String,
    /// Acceptable answers; the first is shown when the answer is wrong
    pub answers: Vec<String>,
    pub from_language: String,
    pub to_language: String,
}

impl Entry {
    pub fn top_answer(&self) -> Option<&str> {
        self.answers.first().map(String::as_str)
    }
}

/// A sheet with its direct members
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    pub id: i64,
    pub name: String,
    pub from_language: String,
    pub to_language: String,
    pub entry_ids: Vec<i64>,
    pub children: Vec<i64>,
}

/// Listing row for sheets
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetSummary {
    pub id: i64,
    pub name: String,
    pub from_language: String,
    pub to_language: String,
    pub entry_count: i64,
}

/// Changes applied by `CatalogStore::edit_entry`; `None` leaves a field alone
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryEdit {
    pub question: Option<String>,
    /// Replacement answers, top answer first
    pub answers: Option<Vec<String>>,
    /// An answer to move to the top
    pub top_answer: Option<String>,
    /// Sheets of the entry's direction it should belong to, replacing the current ones
    pub sheets: Option<Vec<String>>,
}

/// Trim, drop empties and duplicates, keep order
fn clean_answers(answers: &[String]) -> Result<Vec<&str>> {
    let mut cleaned: Vec<&str> = Vec::new();
    for answer in answers.iter().map(|a| a.trim()) {
        if !answer.is_empty() && !cleaned.contains(&answer) {
            cleaned.push(answer);
        }
    }
    if cleaned.is_empty() {
        bail!("An entry needs at least one answer");
    }
    Ok(cleaned)
}

/// Catalog backed by SQLite
pub struct CatalogStore {
    conn: Connection,
}

impl CatalogStore {
    /// Open or create a catalog at the given database path
    pub fn open(db_path: &Path) -> Result<Self> {
        let conn = connect(db_path)?;
        Ok(Self { conn })
    }

    // Languages

    pub fn add_language(&self, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Language name cannot be empty");
        }
        if self.language_id(name)?.is_some() {
            bail!("Language '{}' already exists", name);
        }

        self.conn.execute("INSERT INTO languages (name) VALUES (?1)", params![name])?;
        debug!("Added language {}", name);
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_languages(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT name FROM languages ORDER BY name COLLATE NOCASE")?;
        let names = stmt.query_map([], |row| row.get(0))?;
        names.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    pub fn rename_language(&self, old_name: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            bail!("Language name cannot be empty");
        }
        if self.language_id(new_name)?.is_some() {
            bail!("Language '{}' already exists", new_name);
        }

        let changed = self.conn.execute(
            "UPDATE languages SET name = ?1 WHERE name = ?2",
            params![new_name, old_name],
        )?;
        if changed == 0 {
            bail!("Unknown language '{}'", old_name);
        }
        Ok(())
    }

    /// Delete a language along with every entry and sheet that uses it
    pub fn delete_language(&self, name: &str) -> Result<()> {
        let changed = self.conn.execute("DELETE FROM languages WHERE name = ?1", params![name])?;
        if changed == 0 {
            bail!("Unknown language '{}'", name);
        }
        Ok(())
    }

    fn language_id(&self, name: &str) -> Result<Option<i64>> {
        self.conn
            .query_row("SELECT id FROM languages WHERE name = ?1", params![name], |row| row.get(0))
            .optional()
            .map_err(Into::into)
    }

    /// Translator for a direction, if both languages and the pair exist
    pub fn translator_id(&self, from: &str, to: &str) -> Result<Option<i64>> {
        self.conn
            .query_row(
                r#"
                SELECT t.id FROM translators t
                JOIN languages l1 ON l1.id = t.from_language
                JOIN languages l2 ON l2.id = t.to_language
                WHERE l1.name = ?1 AND l2.name = ?2
                "#,
                params![from, to],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Translator for a direction, created on demand. Both languages must exist.
    pub fn ensure_translator(&self, from: &str, to: &str) -> Result<i64> {
        if from == to {
            bail!("Cannot translate '{}' into itself", from);
        }
        if let Some(id) = self.translator_id(from, to)? {
            return Ok(id);
        }

        let from_id = self.language_id(from)?.ok_or_else(|| anyhow!("Unknown language '{}'", from))?;
        let to_id = self.language_id(to)?.ok_or_else(|| anyhow!("Unknown language '{}'", to))?;
        self.conn.execute(
            "INSERT INTO translators (from_language, to_language) VALUES (?1, ?2)",
            params![from_id, to_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Every (from, to) direction that has a translator
    pub fn directions(&self) -> Result<Vec<(String, String)>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT l1.name, l2.name FROM translators t
            JOIN languages l1 ON l1.id = t.from_language
            JOIN languages l2 ON l2.id = t.to_language
            ORDER BY l1.name, l2.name
            "#,
        )?;
        let pairs = stmt.query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?;
        pairs.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    // Entries

    /// Add an entry with its answers, top answer first
    pub fn add_entry(&mut self, from: &str, to: &str, question: &str, answers: &[String]) -> Result<i64> {
        let question = question.trim();
        if question.is_empty() {
            bail!("Question cannot be empty");
        }

        let cleaned = clean_answers(answers)?;

        let translator = self.ensure_translator(from, to)?;
        if self.find_entry(from, to, question)?.is_some() {
            bail!("Entry '{}' already exists for {} -> {}", question, from, to);
        }

        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO entries (translator, question) VALUES (?1, ?2)",
            params![translator, question],
        )?;
        let entry_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare_cached("INSERT INTO solutions (entry, position, text) VALUES (?1, ?2, ?3)")?;
            for (position, answer) in cleaned.iter().enumerate() {
                stmt.execute(params![entry_id, position as i64, answer])?;
            }
        }
        tx.commit()?;

        debug!("Added entry {} '{}' with {} answers", entry_id, question, cleaned.len());
        Ok(entry_id)
    }

    /// Change an entry in place. Its id, and with it every progress
    /// record, stays the same.
    pub fn edit_entry(&mut self, entry_id: i64, edit: &EntryEdit) -> Result<()> {
        let translator: i64 = self
            .conn
            .query_row("SELECT translator FROM entries WHERE id = ?1", params![entry_id], |row| row.get(0))
            .optional()?
            .ok_or_else(|| anyhow!("Unknown entry {}", entry_id))?;

        let question = match &edit.question {
            Some(question) => {
                let question = question.trim();
                if question.is_empty() {
                    bail!("Question cannot be empty");
                }
                let clash: Option<i64> = self
                    .conn
                    .query_row(
                        "SELECT id FROM entries WHERE translator = ?1 AND question = ?2 AND id != ?3",
                        params![translator, question, entry_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if clash.is_some() {
                    bail!("Entry '{}' already exists", question);
                }
                Some(question.to_string())
            }
            None => None,
        };

        let answers = match (&edit.answers, &edit.top_answer) {
            (None, None) => None,
            (answers, top) => {
                let mut list = match answers {
                    Some(answers) => clean_answers(answers)?.into_iter().map(str::to_string).collect(),
                    None => self.answers(entry_id)?,
                };
                if let Some(top) = top {
                    let position = list
                        .iter()
                        .position(|a| a == top.trim())
                        .ok_or_else(|| anyhow!("'{}' is not an answer of this entry", top.trim()))?;
                    let answer = list.remove(position);
                    list.insert(0, answer);
                }
                Some(list)
            }
        };

        let sheets = match &edit.sheets {
            Some(names) => {
                let mut ids = Vec::with_capacity(names.len());
                for name in names {
                    let id: i64 = self
                        .conn
                        .query_row(
                            "SELECT id FROM sheets WHERE translator = ?1 AND name = ?2",
                            params![translator, name.trim()],
                            |row| row.get(0),
                        )
                        .optional()?
                        .ok_or_else(|| anyhow!("Unknown sheet '{}'", name.trim()))?;
                    ids.push(id);
                }
                Some(ids)
            }
            None => None,
        };

        let tx = self.conn.transaction()?;
        if let Some(question) = &question {
            tx.execute("UPDATE entries SET question = ?1 WHERE id = ?2", params![question, entry_id])?;
        }
        if let Some(answers) = &answers {
            tx.execute("DELETE FROM solutions WHERE entry = ?1", params![entry_id])?;
            let mut stmt = tx.prepare_cached("INSERT INTO solutions (entry, position, text) VALUES (?1, ?2, ?3)")?;
            for (position, answer) in answers.iter().enumerate() {
                stmt.execute(params![entry_id, position as i64, answer])?;
            }
        }
        if let Some(sheets) = &sheets {
            // Membership is replaced only among sheets of the entry's own direction
            tx.execute(
                "DELETE FROM mentions WHERE entry = ?1 AND sheet IN (SELECT id FROM sheets WHERE translator = ?2)",
                params![entry_id, translator],
            )?;
            let mut stmt = tx.prepare_cached("INSERT OR IGNORE INTO mentions (sheet, entry) VALUES (?1, ?2)")?;
            for sheet_id in sheets {
                stmt.execute(params![sheet_id, entry_id])?;
            }
        }
        tx.commit()?;

        debug!("Edited entry {}", entry_id);
        Ok(())
    }

    pub fn find_entry(&self, from: &str, to: &str, question: &str) -> Result<Option<i64>> {
        let translator = match self.translator_id(from, to)? {
            Some(id) => id,
            None => return Ok(None),
        };
        self.conn
            .query_row(
                "SELECT id FROM entries WHERE translator = ?1 AND question = ?2",
                params![translator, question.trim()],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete an entry; its progress records go with it
    pub fn delete_entry(&self, from: &str, to: &str, question: &str) -> Result<()> {
        let id = self
            .find_entry(from, to, question)?
            .ok_or_else(|| anyhow!("Unknown entry '{}'", question))?;
        self.conn.execute("DELETE FROM entries WHERE id = ?1", params![id])?;
        Ok(())
    }

    pub fn entry(&self, entry_id: i64) -> Result<Option<Entry>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                r#"
                SELECT e.question, l1.name, l2.name FROM entries e
                JOIN translators t ON t.id = e.translator
                JOIN languages l1 ON l1.id = t.from_language
                JOIN languages l2 ON l2.id = t.to_language
                WHERE e.id = ?1
                "#,
                params![entry_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match row {
            Some((question, from_language, to_language)) => Ok(Some(Entry {
                id: entry_id,
                question,
                answers: self.answers(entry_id)?,
                from_language,
                to_language,
            })),
            None => Ok(None),
        }
    }

    /// Entries of a direction, optionally filtered by a search term in question or answers
    pub fn list_entries(&self, from: &str, to: &str, search: Option<&str>) -> Result<Vec<Entry>> {
        let translator = match self.translator_id(from, to)? {
            Some(id) => id,
            None => return Ok(Vec::new()),
        };
        let pattern = format!("%{}%", search.unwrap_or("").trim());

        let mut stmt = self.conn.prepare(
            r#"
            SELECT DISTINCT e.id FROM entries e
            LEFT JOIN solutions s ON s.entry = e.id
            WHERE e.translator = ?1 AND (e.question LIKE ?2 OR s.text LIKE ?2)
            ORDER BY e.question COLLATE NOCASE
            "#,
        )?;
        let ids = stmt
            .query_map(params![translator, pattern], |row| row.get::<_, i64>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        let mut entries = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(entry) = self.entry(id)? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    fn answers(&self, entry_id: i64) -> rusqlite::Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT text FROM solutions WHERE entry = ?1 ORDER BY position")?;
        let answers = stmt.query_map(params![entry_id], |row| row.get(0))?;
        answers.collect()
    }

    // Sheets

    pub fn create_sheet(&self, from: &str, to: &str, name: &str) -> Result<i64> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Sheet name cannot be empty");
        }
        let translator = self.ensure_translator(from, to)?;
        if self.find_sheet(from, to, name)?.is_some() {
            bail!("Sheet '{}' already exists for {} -> {}", name, from, to);
        }

        self.conn.execute(
            "INSERT INTO sheets (translator, name) VALUES (?1, ?2)",
            params![translator, name],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn find_sheet(&self, from: &str, to: &str, name: &str) -> Result<Option<i64>> {
        let translator = match self.translator_id(from, to)? {
            Some(id) => id,
            None => return Ok(None),
        };
        self.conn
            .query_row(
                "SELECT id FROM sheets WHERE translator = ?1 AND name = ?2",
                params![translator, name.trim()],
                |row| row.get(0),
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn delete_sheet(&self, from: &str, to: &str, name: &str) -> Result<()> {
        let id = self
            .find_sheet(from, to, name)?
            .ok_or_else(|| anyhow!("Unknown sheet '{}'", name))?;
        self.conn.execute("DELETE FROM sheets WHERE id = ?1", params![id])?;
        Ok(())
    }

    /// Add an entry to a sheet. Returns false if it was already there.
    pub fn add_to_sheet(&self, sheet_id: i64, entry_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO mentions (sheet, entry) VALUES (?1, ?2)",
            params![sheet_id, entry_id],
        )?;
        Ok(changed > 0)
    }

    pub fn rename_sheet(&self, from: &str, to: &str, old_name: &str, new_name: &str) -> Result<()> {
        let new_name = new_name.trim();
        if new_name.is_empty() {
            bail!("Sheet name cannot be empty");
        }
        let id = self
            .find_sheet(from, to, old_name)?
            .ok_or_else(|| anyhow!("Unknown sheet '{}'", old_name))?;
        if self.find_sheet(from, to, new_name)?.is_some() {
            bail!("Sheet '{}' already exists for {} -> {}", new_name, from, to);
        }

        self.conn
            .execute("UPDATE sheets SET name = ?1 WHERE id = ?2", params![new_name, id])?;
        Ok(())
    }

    /// Take an entry out of a sheet. Returns false if it was not there.
    pub fn remove_from_sheet(&self, sheet_id: i64, entry_id: i64) -> Result<bool> {
        let changed = self.conn.execute(
            "DELETE FROM mentions WHERE sheet = ?1 AND entry = ?2",
            params![sheet_id, entry_id],
        )?;
        Ok(changed > 0)
    }

    /// Nest `child` inside `parent`. Cycles are rejected.
    pub fn include_sheet(&self, parent: i64, child: i64) -> Result<bool> {
        if parent == child || self.descendants(child)?.contains(&parent) {
            bail!("Including this sheet would create a cycle");
        }
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO sheet_children (parent, child) VALUES (?1, ?2)",
            params![parent, child],
        )?;
        Ok(changed > 0)
    }

    pub fn sheet(&self, sheet_id: i64) -> Result<Option<Sheet>> {
        let row: Option<(String, String, String)> = self
            .conn
            .query_row(
                r#"
                SELECT s.name, l1.name, l2.name FROM sheets s
                JOIN translators t ON t.id = s.translator
                JOIN languages l1 ON l1.id = t.from_language
                JOIN languages l2 ON l2.id = t.to_language
                WHERE s.id = ?1
                "#,
                params![sheet_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let (name, from_language, to_language) = match row {
            Some(row) => row,
            None => return Ok(None),
        };

        let mut stmt = self.conn.prepare_cached("SELECT entry FROM mentions WHERE sheet = ?1 ORDER BY entry")?;
        let entry_ids = stmt
            .query_map(params![sheet_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;

        Ok(Some(Sheet {
            id: sheet_id,
            name,
            from_language,
            to_language,
            entry_ids,
            children: self.children(sheet_id)?,
        }))
    }

    pub fn list_sheets(&self) -> Result<Vec<SheetSummary>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.name, l1.name, l2.name,
                (SELECT COUNT(*) FROM mentions m WHERE m.sheet = s.id)
            FROM sheets s
            JOIN translators t ON t.id = s.translator
            JOIN languages l1 ON l1.id = t.from_language
            JOIN languages l2 ON l2.id = t.to_language
            ORDER BY l1.name, l2.name, s.name COLLATE NOCASE
            "#,
        )?;
        let sheets = stmt.query_map([], |row| {
            Ok(SheetSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                from_language: row.get(2)?,
                to_language: row.get(3)?,
                entry_count: row.get(4)?,
            })
        })?;
        sheets.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn children(&self, sheet_id: i64) -> rusqlite::Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT child FROM sheet_children WHERE parent = ?1 ORDER BY child")?;
        let children = stmt.query_map(params![sheet_id], |row| row.get(0))?;
        children.collect()
    }

    /// The sheet itself and every sheet nested below it, breadth first
    fn descendants(&self, sheet_id: i64) -> rusqlite::Result<Vec<i64>> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([sheet_id]);

        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            order.push(id);
            queue.extend(self.children(id)?);
        }
        Ok(order)
    }

    fn sheet_translator(&self, sheet_id: i64) -> rusqlite::Result<Option<i64>> {
        self.conn
            .query_row("SELECT translator FROM sheets WHERE id = ?1", params![sheet_id], |row| row.get(0))
            .optional()
    }
}

impl Catalog for CatalogStore {
    fn get_entries(&self, sheet_id: i64) -> scheduler::Result<Vec<Entry>> {
        let translator = self
            .sheet_translator(sheet_id)?
            .ok_or_else(|| anyhow!("Unknown sheet {}", sheet_id))?;

        let mut seen = HashSet::new();
        let mut entries = Vec::new();
        let mut stmt = self.conn.prepare_cached(
            r#"
            SELECT e.id FROM mentions m
            JOIN entries e ON e.id = m.entry
            WHERE m.sheet = ?1 AND e.translator = ?2
            ORDER BY e.id
            "#,
        )?;

        for id in self.descendants(sheet_id)? {
            let ids = stmt
                .query_map(params![id, translator], |row| row.get::<_, i64>(0))?
                .collect::<Result<Vec<_>, _>>()?;
            for entry_id in ids {
                if !seen.insert(entry_id) {
                    continue;
                }
                if let Some(entry) = self.entry(entry_id)? {
                    entries.push(entry);
                }
            }
        }

        debug!("Sheet {} flattened to {} entries", sheet_id, entries.len());
        Ok(entries)
    }

    fn get_answers(&self, entry_id: i64) -> scheduler::Result<Vec<String>> {
        let exists: Option<i64> = self
            .conn
            .query_row("SELECT id FROM entries WHERE id = ?1", params![entry_id], |row| row.get(0))
            .optional()?;
        if exists.is_none() {
            return Err(scheduler::SchedulerError::UnknownEntry(entry_id));
        }
        Ok(self.answers(entry_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, CatalogStore) {
        let dir = TempDir::new().unwrap();
        let store = CatalogStore::open(&dir.path().join("test.sqlite")).unwrap();
        store.add_language("English").unwrap();
        store.add_language("Georgian").unwrap();
        (dir, store)
    }

    fn answers(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_languages() {
        let (_dir, store) = setup();
        assert!(store.add_language("English").is_err());
        assert!(store.add_language("  ").is_err());

        store.rename_language("Georgian", "Kartuli").unwrap();
        assert_eq!(store.list_languages().unwrap(), vec!["English", "Kartuli"]);
        assert!(store.rename_language("Georgian", "Other").is_err());
    }

    #[test]
    fn test_add_entry_keeps_answer_order() {
        let (_dir, mut store) = setup();
        let id = store
            .add_entry("English", "Georgian", " hello ", &answers(&["gamarjoba", " salami ", "gamarjoba"]))
            .unwrap();

        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.question, "hello");
        assert_eq!(entry.answers, vec!["gamarjoba", "salami"]);
        assert_eq!(entry.top_answer(), Some("gamarjoba"));
        assert_eq!(store.get_answers(id).unwrap(), vec!["gamarjoba", "salami"]);
    }

    #[test]
    fn test_add_entry_validation() {
        let (_dir, mut store) = setup();
        assert!(store.add_entry("English", "Georgian", "", &answers(&["x"])).is_err());
        assert!(store.add_entry("English", "Georgian", "yes", &answers(&[" "])).is_err());
        assert!(store.add_entry("English", "English", "yes", &answers(&["ki"])).is_err());
        assert!(store.add_entry("English", "Klingon", "yes", &answers(&["ki"])).is_err());

        store.add_entry("English", "Georgian", "yes", &answers(&["ki"])).unwrap();
        assert!(store.add_entry("English", "Georgian", "yes", &answers(&["diakh"])).is_err());
        // Same question in the other direction is a different entry
        store.add_entry("Georgian", "English", "yes", &answers(&["ki"])).unwrap();
    }

    #[test]
    fn test_search_entries() {
        let (_dir, mut store) = setup();
        store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        store.add_entry("English", "Georgian", "bread", &answers(&["puri"])).unwrap();

        let all = store.list_entries("English", "Georgian", None).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].question, "bread");

        let found = store.list_entries("English", "Georgian", Some("tsk")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].question, "water");

        assert!(store.list_entries("Georgian", "English", None).unwrap().is_empty());
    }

    #[test]
    fn test_get_entries_flattens_nested_sheets() {
        let (_dir, mut store) = setup();
        let water = store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        let bread = store.add_entry("English", "Georgian", "bread", &answers(&["puri"])).unwrap();
        let wine = store.add_entry("English", "Georgian", "wine", &answers(&["ghvino"])).unwrap();

        let food = store.create_sheet("English", "Georgian", "food").unwrap();
        let drinks = store.create_sheet("English", "Georgian", "drinks").unwrap();
        let all = store.create_sheet("English", "Georgian", "all").unwrap();

        store.add_to_sheet(food, bread).unwrap();
        store.add_to_sheet(drinks, water).unwrap();
        store.add_to_sheet(drinks, wine).unwrap();
        store.add_to_sheet(all, bread).unwrap();
        assert!(!store.add_to_sheet(all, bread).unwrap());

        store.include_sheet(all, food).unwrap();
        store.include_sheet(all, drinks).unwrap();

        let mut ids: Vec<i64> = store.get_entries(all).unwrap().iter().map(|e| e.id).collect();
        ids.sort();
        assert_eq!(ids, vec![water, bread, wine]);

        let sheet = store.sheet(all).unwrap().unwrap();
        assert_eq!(sheet.entry_ids, vec![bread]);
        assert_eq!(sheet.children, vec![food, drinks]);
    }

    #[test]
    fn test_get_entries_filters_direction() {
        let (_dir, mut store) = setup();
        let forward = store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        let backward = store.add_entry("Georgian", "English", "tskali", &answers(&["water"])).unwrap();

        let sheet = store.create_sheet("English", "Georgian", "mixed").unwrap();
        let other = store.create_sheet("Georgian", "English", "reverse").unwrap();
        store.add_to_sheet(sheet, forward).unwrap();
        store.add_to_sheet(other, backward).unwrap();
        store.include_sheet(sheet, other).unwrap();

        let entries = store.get_entries(sheet).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, forward);
    }

    #[test]
    fn test_include_sheet_rejects_cycles() {
        let (_dir, store) = setup();
        let a = store.create_sheet("English", "Georgian", "a").unwrap();
        let b = store.create_sheet("English", "Georgian", "b").unwrap();

        store.include_sheet(a, b).unwrap();
        assert!(store.include_sheet(b, a).is_err());
        assert!(store.include_sheet(a, a).is_err());
    }

    #[test]
    fn test_unknown_sheet_and_entry() {
        let (_dir, store) = setup();
        assert!(store.get_entries(99).is_err());
        assert!(matches!(
            store.get_answers(99),
            Err(scheduler::SchedulerError::UnknownEntry(99))
        ));
    }

    #[test]
    fn test_edit_entry_question_and_answers() {
        let (_dir, mut store) = setup();
        let id = store
            .add_entry("English", "Georgian", "helo", &answers(&["gamarjoba", "salami"]))
            .unwrap();
        store.add_entry("English", "Georgian", "bye", &answers(&["nakhvamdis"])).unwrap();

        let edit = EntryEdit {
            question: Some(" hello ".to_string()),
            answers: Some(answers(&["gamarjoba", "gagimarjos", " "])),
            top_answer: Some("gagimarjos".to_string()),
            ..EntryEdit::default()
        };
        store.edit_entry(id, &edit).unwrap();

        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.question, "hello");
        assert_eq!(entry.answers, vec!["gagimarjos", "gamarjoba"]);
        assert_eq!(store.find_entry("English", "Georgian", "hello").unwrap(), Some(id));
        assert!(store.find_entry("English", "Georgian", "helo").unwrap().is_none());

        // Top answer alone reorders the existing answers
        let edit = EntryEdit {
            top_answer: Some("gamarjoba".to_string()),
            ..EntryEdit::default()
        };
        store.edit_entry(id, &edit).unwrap();
        assert_eq!(store.get_answers(id).unwrap(), vec!["gamarjoba", "gagimarjos"]);
    }

    #[test]
    fn test_edit_entry_rejections_leave_entry_unchanged() {
        let (_dir, mut store) = setup();
        let id = store.add_entry("English", "Georgian", "hello", &answers(&["gamarjoba"])).unwrap();
        store.add_entry("English", "Georgian", "bye", &answers(&["nakhvamdis"])).unwrap();

        let clash = EntryEdit {
            question: Some("bye".to_string()),
            answers: Some(answers(&["salami"])),
            ..EntryEdit::default()
        };
        assert!(store.edit_entry(id, &clash).is_err());

        let empty = EntryEdit {
            answers: Some(answers(&["  "])),
            ..EntryEdit::default()
        };
        assert!(store.edit_entry(id, &empty).is_err());

        let stranger = EntryEdit {
            top_answer: Some("salami".to_string()),
            ..EntryEdit::default()
        };
        assert!(store.edit_entry(id, &stranger).is_err());
        assert!(store.edit_entry(99, &EntryEdit::default()).is_err());

        let entry = store.entry(id).unwrap().unwrap();
        assert_eq!(entry.question, "hello");
        assert_eq!(entry.answers, vec!["gamarjoba"]);
    }

    #[test]
    fn test_edit_entry_replaces_sheet_membership() {
        let (_dir, mut store) = setup();
        let id = store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        let drinks = store.create_sheet("English", "Georgian", "drinks").unwrap();
        let nature = store.create_sheet("English", "Georgian", "nature").unwrap();
        let reverse = store.create_sheet("Georgian", "English", "drinks").unwrap();
        store.add_to_sheet(drinks, id).unwrap();
        // Membership outside the entry's direction is left alone
        store
            .conn
            .execute("INSERT INTO mentions (sheet, entry) VALUES (?1, ?2)", params![reverse, id])
            .unwrap();

        let edit = EntryEdit {
            sheets: Some(vec!["nature".to_string()]),
            ..EntryEdit::default()
        };
        store.edit_entry(id, &edit).unwrap();
        assert!(store.sheet(drinks).unwrap().unwrap().entry_ids.is_empty());
        assert_eq!(store.sheet(nature).unwrap().unwrap().entry_ids, vec![id]);
        assert_eq!(store.sheet(reverse).unwrap().unwrap().entry_ids, vec![id]);

        let unknown = EntryEdit {
            sheets: Some(vec!["missing".to_string()]),
            ..EntryEdit::default()
        };
        assert!(store.edit_entry(id, &unknown).is_err());
        assert_eq!(store.sheet(nature).unwrap().unwrap().entry_ids, vec![id]);
    }

    #[test]
    fn test_rename_sheet() {
        let (_dir, store) = setup();
        let id = store.create_sheet("English", "Georgian", "food").unwrap();
        store.create_sheet("English", "Georgian", "drinks").unwrap();

        assert!(store.rename_sheet("English", "Georgian", "food", "drinks").is_err());
        assert!(store.rename_sheet("English", "Georgian", "food", " ").is_err());
        assert!(store.rename_sheet("English", "Georgian", "missing", "other").is_err());

        store.rename_sheet("English", "Georgian", "food", " meals ").unwrap();
        assert_eq!(store.find_sheet("English", "Georgian", "meals").unwrap(), Some(id));
        assert!(store.find_sheet("English", "Georgian", "food").unwrap().is_none());
    }

    #[test]
    fn test_remove_from_sheet() {
        let (_dir, mut store) = setup();
        let water = store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        let bread = store.add_entry("English", "Georgian", "bread", &answers(&["puri"])).unwrap();
        let sheet = store.create_sheet("English", "Georgian", "basics").unwrap();
        store.add_to_sheet(sheet, water).unwrap();
        store.add_to_sheet(sheet, bread).unwrap();

        assert!(store.remove_from_sheet(sheet, water).unwrap());
        assert!(!store.remove_from_sheet(sheet, water).unwrap());

        let entries = store.get_entries(sheet).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, bread);
        // The entry itself stays in the catalog
        assert!(store.entry(water).unwrap().is_some());
    }

    #[test]
    fn test_delete_language_cascades() {
        let (_dir, mut store) = setup();
        store.add_entry("English", "Georgian", "water", &answers(&["tskali"])).unwrap();
        store.create_sheet("English", "Georgian", "drinks").unwrap();

        store.delete_language("Georgian").unwrap();
        assert!(store.list_sheets().unwrap().is_empty());
        assert!(store.translator_id("English", "Georgian").unwrap().is_none());
    }
}
