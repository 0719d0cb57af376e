//! Vocabulary transfer between data directories
//!
//! Languages, entries and sheets are written to a single JSON bundle that
//! another installation can import. Progress stays local.

use serde::{Deserialize, Serialize};

pub mod export;

pub use export::{export_vocabulary, import_vocabulary};

/// Bundle format version written by this build
pub const BUNDLE_VERSION: &str = "1.0";

/// Export metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleMetadata {
    /// Export format version
    pub version: String,
    /// RFC 3339 export timestamp
    pub exported_at: String,
    pub language_count: usize,
    pub entry_count: usize,
    pub sheet_count: usize,
}

/// An entry as written to the bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportableEntry {
    pub from_language: String,
    pub to_language: String,
    pub question: String,
    /// Top answer first
    pub answers: Vec<String>,
}

/// Reference to a sheet by its direction and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetRef {
    pub from_language: String,
    pub to_language: String,
    pub name: String,
}

/// A sheet with its members referenced by question and name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportableSheet {
    pub from_language: String,
    pub to_language: String,
    pub name: String,
    /// Questions of the sheet's own entries
    pub entries: Vec<String>,
    #[serde(default)]
    pub children: Vec<SheetRef>,
}

/// Complete export bundle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyBundle {
    pub metadata: BundleMetadata,
    pub languages: Vec<String>,
    pub entries: Vec<ExportableEntry>,
    pub sheets: Vec<ExportableSheet>,
}

/// Counts reported by an import
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportResult {
    pub languages: usize,
    pub entries: usize,
    pub sheets: usize,
    /// Items that already existed and were left alone
    pub skipped: usize,
}
