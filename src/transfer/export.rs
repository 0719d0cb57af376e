//! Vocabulary export and import
//!
//! Import is additive: languages, entries and sheets that already exist
//! are skipped, everything else is created.

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use std::path::Path;
use tracing::{info, warn};

use crate::storage::CatalogStore;
use crate::transfer::{
    BundleMetadata, ExportableEntry, ExportableSheet, ImportResult, SheetRef, VocabularyBundle, BUNDLE_VERSION,
};

/// Export the whole catalog to a JSON file. Returns the number of entries written.
pub fn export_vocabulary(db_path: &Path, output_path: &Path) -> Result<usize> {
    let catalog = CatalogStore::open(db_path)?;
    let bundle = collect_bundle(&catalog)?;

    if bundle.languages.is_empty() {
        return Err(anyhow!("Nothing to export"));
    }

    let json = serde_json::to_string_pretty(&bundle)?;
    std::fs::write(output_path, json).with_context(|| format!("Failed to write {:?}", output_path))?;

    info!(
        "Exported {} languages, {} entries and {} sheets to {:?}",
        bundle.metadata.language_count, bundle.metadata.entry_count, bundle.metadata.sheet_count, output_path
    );
    Ok(bundle.metadata.entry_count)
}

fn collect_bundle(catalog: &CatalogStore) -> Result<VocabularyBundle> {
    let languages = catalog.list_languages()?;

    let mut entries = Vec::new();
    for (from, to) in catalog.directions()? {
        for entry in catalog.list_entries(&from, &to, None)? {
            entries.push(ExportableEntry {
                from_language: entry.from_language,
                to_language: entry.to_language,
                question: entry.question,
                answers: entry.answers,
            });
        }
    }

    let mut sheets = Vec::new();
    for summary in catalog.list_sheets()? {
        let sheet = match catalog.sheet(summary.id)? {
            Some(sheet) => sheet,
            None => continue,
        };

        let mut questions = Vec::with_capacity(sheet.entry_ids.len());
        for entry_id in &sheet.entry_ids {
            if let Some(entry) = catalog.entry(*entry_id)? {
                questions.push(entry.question);
            }
        }

        let mut children = Vec::with_capacity(sheet.children.len());
        for child_id in &sheet.children {
            if let Some(child) = catalog.sheet(*child_id)? {
                children.push(SheetRef {
                    from_language: child.from_language,
                    to_language: child.to_language,
                    name: child.name,
                });
            }
        }

        sheets.push(ExportableSheet {
            from_language: sheet.from_language,
            to_language: sheet.to_language,
            name: sheet.name,
            entries: questions,
            children,
        });
    }

    Ok(VocabularyBundle {
        metadata: BundleMetadata {
            version: BUNDLE_VERSION.to_string(),
            exported_at: Utc::now().to_rfc3339(),
            language_count: languages.len(),
            entry_count: entries.len(),
            sheet_count: sheets.len(),
        },
        languages,
        entries,
        sheets,
    })
}

/// Import a bundle written by `export_vocabulary`
pub fn import_vocabulary(db_path: &Path, input_path: &Path) -> Result<ImportResult> {
    let content =
        std::fs::read_to_string(input_path).with_context(|| format!("Failed to read {:?}", input_path))?;
    let bundle: VocabularyBundle = serde_json::from_str(&content).context("Not a prosakart export file")?;

    if bundle.metadata.version != BUNDLE_VERSION {
        warn!(
            "Bundle version {} differs from {}; importing anyway",
            bundle.metadata.version, BUNDLE_VERSION
        );
    }
    info!(
        "Importing {} entries and {} sheets (exported at {})",
        bundle.entries.len(),
        bundle.sheets.len(),
        bundle.metadata.exported_at
    );

    let mut catalog = CatalogStore::open(db_path)?;
    let mut result = ImportResult::default();

    let existing = catalog.list_languages()?;
    for language in &bundle.languages {
        if existing.contains(language) {
            result.skipped += 1;
        } else {
            catalog.add_language(language)?;
            result.languages += 1;
        }
    }

    for entry in &bundle.entries {
        if catalog
            .find_entry(&entry.from_language, &entry.to_language, &entry.question)?
            .is_some()
        {
            result.skipped += 1;
            continue;
        }
        catalog.add_entry(&entry.from_language, &entry.to_language, &entry.question, &entry.answers)?;
        result.entries += 1;
    }

    // Sheets first, nesting second, so children may appear in any order
    for sheet in &bundle.sheets {
        let sheet_id = match catalog.find_sheet(&sheet.from_language, &sheet.to_language, &sheet.name)? {
            Some(id) => {
                result.skipped += 1;
                id
            }
            None => {
                result.sheets += 1;
                catalog.create_sheet(&sheet.from_language, &sheet.to_language, &sheet.name)?
            }
        };

        for question in &sheet.entries {
            match catalog.find_entry(&sheet.from_language, &sheet.to_language, question)? {
                Some(entry_id) => {
                    catalog.add_to_sheet(sheet_id, entry_id)?;
                }
                None => warn!("Sheet '{}' mentions unknown entry '{}'", sheet.name, question),
            }
        }
    }

    for sheet in &bundle.sheets {
        let parent = match catalog.find_sheet(&sheet.from_language, &sheet.to_language, &sheet.name)? {
            Some(id) => id,
            None => continue,
        };
        for child in &sheet.children {
            let child_id = match catalog.find_sheet(&child.from_language, &child.to_language, &child.name)? {
                Some(id) => id,
                None => {
                    warn!("Sheet '{}' includes unknown sheet '{}'", sheet.name, child.name);
                    continue;
                }
            };
            if let Err(e) = catalog.include_sheet(parent, child_id) {
                warn!("Skipping '{}' in '{}': {}", child.name, sheet.name, e);
            }
        }
    }

    info!(
        "Imported {} languages, {} entries, {} sheets ({} skipped)",
        result.languages, result.entries, result.sheets, result.skipped
    );
    Ok(result)
}
