use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod config;
mod quiz;
mod scheduler;
mod session;
mod storage;
mod transfer;

use config::Config;
use scheduler::MAX_STARS;
use storage::{CatalogStore, EntryEdit, ProgressStore, RecordStore};

/// prosakart - vocabulary trainer with a star-based memorization scheduler
#[derive(Parser)]
#[command(name = "prosakart")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Learn vocabulary by streaks, stars and probation", long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Data directory (defaults to ./.prosakart if present, else ~/.prosakart)
    #[arg(long, global = true, env = "PROSAKART_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the data directory and configuration
    Init,

    /// Show current status
    Status,

    /// Show detailed progress statistics
    Stats,

    /// Show or set the user whose progress is tracked
    User {
        /// New user name
        name: Option<String>,
    },

    /// Manage languages
    Language {
        #[command(subcommand)]
        action: LanguageAction,
    },

    /// Manage vocabulary entries
    Entry {
        #[command(subcommand)]
        action: EntryAction,
    },

    /// Manage sheets
    Sheet {
        #[command(subcommand)]
        action: SheetAction,
    },

    /// Quiz yourself on a sheet
    Test {
        /// Sheet name
        sheet: String,
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
    },

    /// Export languages, entries and sheets to a JSON file
    Export {
        /// Output file path
        #[arg(long, default_value = "prosakart-vocabulary.json")]
        output: String,
    },

    /// Import languages, entries and sheets from a JSON file
    Import {
        /// Input file path
        input: String,
    },
}

#[derive(Subcommand)]
enum LanguageAction {
    Add { name: String },
    List,
    Rename { old: String, new: String },
    /// Delete a language with all its entries and sheets
    Delete { name: String },
}

#[derive(Subcommand)]
enum EntryAction {
    /// Add an entry; the first answer is the one shown on mistakes
    Add {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        question: String,
        #[arg(required = true)]
        answers: Vec<String>,
    },
    List {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        /// Only entries whose question or answers contain this text
        #[arg(long)]
        search: Option<String>,
    },
    /// Change an entry; progress on it is kept
    Edit {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        question: String,
        /// New question text
        #[arg(long = "question", value_name = "QUESTION")]
        new_question: Option<String>,
        /// Replacement answers, top answer first
        #[arg(long, num_args = 1..)]
        answers: Option<Vec<String>>,
        /// Existing answer to show on mistakes
        #[arg(long)]
        top: Option<String>,
        /// Sheets the entry should belong to; no value removes it from all
        #[arg(long, num_args = 0..)]
        sheets: Option<Vec<String>>,
    },
    Delete {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        question: String,
    },
}

#[derive(Subcommand)]
enum SheetAction {
    Create {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        name: String,
    },
    /// Add existing entries to a sheet by question
    Add {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        sheet: String,
        #[arg(required = true)]
        questions: Vec<String>,
    },
    /// Take entries out of a sheet by question
    Remove {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        sheet: String,
        #[arg(required = true)]
        questions: Vec<String>,
    },
    Rename {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        old: String,
        new: String,
    },
    /// Nest one sheet inside another of the same direction
    Include {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        parent: String,
        child: String,
    },
    List,
    Show {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        name: String,
    },
    Delete {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        name: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The quiz owns the terminal; keep logs quiet unless asked
    let is_test = matches!(cli.command, Commands::Test { .. });
    let filter = if cli.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else if is_test {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let data_dir = config::data_dir(cli.data_dir)?;

    match cli.command {
        Commands::Init => {
            info!("Initializing prosakart");
            storage::init(&data_dir)?;
            println!("✅ Initialized {}", data_dir.display());
        }
        Commands::Status => {
            storage::show_status(&data_dir)?;
        }
        Commands::Stats => {
            storage::show_stats(&data_dir)?;
        }
        Commands::User { name } => {
            let mut config = Config::load(&data_dir)?;
            match name {
                Some(name) => {
                    let name = name.trim();
                    if name.is_empty() {
                        return Err(anyhow!("User name cannot be empty"));
                    }
                    std::fs::create_dir_all(&data_dir)?;
                    config.profile.user = name.to_string();
                    config.save(&data_dir)?;
                    println!("✅ Now practising as {}", name);
                }
                None => println!("{}", config.profile.user),
            }
        }
        Commands::Language { action } => {
            let catalog = open_catalog(&data_dir)?;
            match action {
                LanguageAction::Add { name } => {
                    catalog.add_language(&name)?;
                    println!("✅ Added language {}", name.trim());
                }
                LanguageAction::List => {
                    for name in catalog.list_languages()? {
                        println!("{}", name);
                    }
                }
                LanguageAction::Rename { old, new } => {
                    catalog.rename_language(&old, &new)?;
                    println!("✅ Renamed {} to {}", old, new.trim());
                }
                LanguageAction::Delete { name } => {
                    catalog.delete_language(&name)?;
                    println!("🗑️  Deleted language {}", name);
                }
            }
        }
        Commands::Entry { action } => {
            let mut catalog = open_catalog(&data_dir)?;
            match action {
                EntryAction::Add { from, to, question, answers } => {
                    catalog.add_entry(&from, &to, &question, &answers)?;
                    println!("✅ Added '{}' ({} -> {})", question.trim(), from, to);
                }
                EntryAction::List { from, to, search } => {
                    let entries = catalog.list_entries(&from, &to, search.as_deref())?;
                    if entries.is_empty() {
                        println!("No entries found.");
                    }
                    for entry in entries {
                        println!("{} = {}", entry.question, entry.answers.join(" | "));
                    }
                }
                EntryAction::Edit {
                    from,
                    to,
                    question,
                    new_question,
                    answers,
                    top,
                    sheets,
                } => {
                    let entry_id = catalog
                        .find_entry(&from, &to, &question)?
                        .ok_or_else(|| anyhow!("Unknown entry '{}'", question))?;
                    let edit = EntryEdit {
                        question: new_question,
                        answers,
                        top_answer: top,
                        sheets,
                    };
                    catalog.edit_entry(entry_id, &edit)?;
                    println!("✅ Updated '{}'", edit.question.as_deref().unwrap_or(&question).trim());
                }
                EntryAction::Delete { from, to, question } => {
                    catalog.delete_entry(&from, &to, &question)?;
                    println!("🗑️  Deleted '{}'", question);
                }
            }
        }
        Commands::Sheet { action } => {
            let catalog = open_catalog(&data_dir)?;
            run_sheet_action(&data_dir, &catalog, action)?;
        }
        Commands::Test { sheet, from, to } => {
            quiz::run(&data_dir, &sheet, &from, &to)?;
        }
        Commands::Export { output } => {
            let count = transfer::export_vocabulary(&storage::db_path(&data_dir), std::path::Path::new(&output))?;
            println!("✅ Exported {} entries to {}", count, output);
        }
        Commands::Import { input } => {
            std::fs::create_dir_all(&data_dir)?;
            let result = transfer::import_vocabulary(&storage::db_path(&data_dir), std::path::Path::new(&input))?;

            println!("✅ Import complete from {}", input);
            println!("   New languages: {}", result.languages);
            println!("   New entries: {}", result.entries);
            println!("   New sheets: {}", result.sheets);
            if result.skipped > 0 {
                println!("   Skipped (already present): {}", result.skipped);
            }
        }
    }

    Ok(())
}

/// Open the catalog, refusing to create a database outside an initialized directory
fn open_catalog(data_dir: &std::path::Path) -> Result<CatalogStore> {
    if !data_dir.exists() {
        return Err(anyhow!(
            "{} does not exist. Run 'prosakart init' first.",
            data_dir.display()
        ));
    }
    CatalogStore::open(&storage::db_path(data_dir))
}

fn run_sheet_action(data_dir: &std::path::Path, catalog: &CatalogStore, action: SheetAction) -> Result<()> {
    let find = |from: &str, to: &str, name: &str| -> Result<i64> {
        catalog
            .find_sheet(from, to, name)?
            .ok_or_else(|| anyhow!("Unknown sheet '{}' for {} -> {}", name, from, to))
    };

    match action {
        SheetAction::Create { from, to, name } => {
            catalog.create_sheet(&from, &to, &name)?;
            println!("✅ Created sheet {} ({} -> {})", name.trim(), from, to);
        }
        SheetAction::Add { from, to, sheet, questions } => {
            let sheet_id = find(&from, &to, &sheet)?;
            let mut added = 0;
            for question in &questions {
                let entry_id = catalog
                    .find_entry(&from, &to, question)?
                    .ok_or_else(|| anyhow!("Unknown entry '{}'", question))?;
                if catalog.add_to_sheet(sheet_id, entry_id)? {
                    added += 1;
                }
            }
            println!("✅ Added {} entries to {}", added, sheet);
        }
        SheetAction::Remove { from, to, sheet, questions } => {
            let sheet_id = find(&from, &to, &sheet)?;
            let mut removed = 0;
            for question in &questions {
                let entry_id = catalog
                    .find_entry(&from, &to, question)?
                    .ok_or_else(|| anyhow!("Unknown entry '{}'", question))?;
                if catalog.remove_from_sheet(sheet_id, entry_id)? {
                    removed += 1;
                }
            }
            println!("🗑️  Removed {} entries from {}", removed, sheet);
        }
        SheetAction::Rename { from, to, old, new } => {
            catalog.rename_sheet(&from, &to, &old, &new)?;
            println!("✅ Renamed sheet {} to {}", old, new.trim());
        }
        SheetAction::Include { from, to, parent, child } => {
            let parent_id = find(&from, &to, &parent)?;
            let child_id = find(&from, &to, &child)?;
            catalog.include_sheet(parent_id, child_id)?;
            println!("✅ {} now includes {}", parent, child);
        }
        SheetAction::List => {
            let sheets = catalog.list_sheets()?;
            if sheets.is_empty() {
                println!("No sheets created yet.");
            }
            for sheet in sheets {
                println!(
                    "{} ({} -> {}): {} entries",
                    sheet.name, sheet.from_language, sheet.to_language, sheet.entry_count
                );
            }
        }
        SheetAction::Show { from, to, name } => {
            let sheet_id = find(&from, &to, &name)?;
            let sheet = catalog
                .sheet(sheet_id)?
                .ok_or_else(|| anyhow!("Unknown sheet '{}'", name))?;

            let user = Config::load(data_dir)?.profile.user;
            let progress = ProgressStore::open(&storage::db_path(data_dir))?;

            println!("{} ({} -> {})", sheet.name, sheet.from_language, sheet.to_language);
            for entry_id in &sheet.entry_ids {
                if let Some(entry) = catalog.entry(*entry_id)? {
                    let record = progress.load_progress(&user, entry.id)?;
                    println!(
                        "  {} = {}  [{}, {}/{} stars]",
                        entry.question,
                        entry.answers.join(" | "),
                        record.state().as_str(),
                        record.star_count(),
                        MAX_STARS
                    );
                }
            }
            for child_id in &sheet.children {
                if let Some(child) = catalog.sheet(*child_id)? {
                    println!("  + {}", child.name);
                }
            }
        }
        SheetAction::Delete { from, to, name } => {
            catalog.delete_sheet(&from, &to, &name)?;
            println!("🗑️  Deleted sheet {}", name);
        }
    }

    Ok(())
}
