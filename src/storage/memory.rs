//! In-memory record store and catalog for tests

use anyhow::anyhow;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::{Catalog, Entry, RecordStore};
use crate::scheduler::{self, ProgressRecord, SchedulerError};

#[derive(Debug, Default)]
struct MemorySheet {
    entries: Vec<i64>,
    children: Vec<i64>,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<i64, Entry>,
    sheets: HashMap<i64, MemorySheet>,
    progress: HashMap<(String, i64), ProgressRecord>,
    next_id: i64,
    pub saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_entry(&mut self, question: &str, answers: &[&str]) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.entries.insert(
            id,
            Entry {
                id,
                question: question.to_string(),
                answers: answers.iter().map(|a| a.to_string()).collect(),
                from_language: "English".to_string(),
                to_language: "Georgian".to_string(),
            },
        );
        id
    }

    pub fn add_sheet(&mut self, entries: &[i64], children: &[i64]) -> i64 {
        self.next_id += 1;
        let id = self.next_id;
        self.sheets.insert(
            id,
            MemorySheet {
                entries: entries.to_vec(),
                children: children.to_vec(),
            },
        );
        id
    }

    pub fn record(&self, user: &str, entry_id: i64) -> Option<&ProgressRecord> {
        self.progress.get(&(user.to_string(), entry_id))
    }

    pub fn put(&mut self, user: &str, entry_id: i64, record: ProgressRecord) {
        self.progress.insert((user.to_string(), entry_id), record);
    }
}

impl RecordStore for MemoryStore {
    fn load_progress(&self, user: &str, entry_id: i64) -> scheduler::Result<ProgressRecord> {
        let record = self.record(user, entry_id).cloned().unwrap_or_default();
        record.validate()?;
        Ok(record)
    }

    fn save_progress(&mut self, user: &str, entry_id: i64, record: &ProgressRecord) -> scheduler::Result<()> {
        record.validate()?;
        self.put(user, entry_id, record.clone());
        self.saves += 1;
        Ok(())
    }
}

impl Catalog for MemoryStore {
    fn get_entries(&self, sheet_id: i64) -> scheduler::Result<Vec<Entry>> {
        if !self.sheets.contains_key(&sheet_id) {
            return Err(anyhow!("Unknown sheet {}", sheet_id).into());
        }

        let mut seen_sheets = HashSet::new();
        let mut seen_entries = HashSet::new();
        let mut stack = vec![sheet_id];
        let mut entries = Vec::new();

        while let Some(id) = stack.pop() {
            if !seen_sheets.insert(id) {
                continue;
            }
            if let Some(sheet) = self.sheets.get(&id) {
                for entry_id in &sheet.entries {
                    if seen_entries.insert(*entry_id) {
                        if let Some(entry) = self.entries.get(entry_id) {
                            entries.push(entry.clone());
                        }
                    }
                }
                stack.extend(sheet.children.iter().copied());
            }
        }
        Ok(entries)
    }

    fn get_answers(&self, entry_id: i64) -> scheduler::Result<Vec<String>> {
        self.entries
            .get(&entry_id)
            .map(|e| e.answers.clone())
            .ok_or(SchedulerError::UnknownEntry(entry_id))
    }
}
