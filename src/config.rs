//! Configuration and data directory resolution
//!
//! `config.toml` lives in the data directory. A missing file means
//! defaults; `prosakart init` writes a commented copy of them.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "config.toml";

pub const DEFAULT_CONFIG: &str = r#"# prosakart configuration

[profile]
# Progress is tracked per user name
user = "default"

[session]
# How many of the most recently asked entries to skip when picking the next one
recent_window = 1
# Give one more try when an answer is a near miss
spelling_check = true
# Similarity (0-1) above which a wrong answer counts as a near miss
spelling_threshold = 0.9
"#;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub profile: ProfileConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileConfig {
    pub user: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            user: "default".to_string(),
        }
    }
}

/// Quiz session settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub recent_window: usize,
    pub spelling_check: bool,
    pub spelling_threshold: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            recent_window: 1,
            spelling_check: true,
            spelling_threshold: 0.9,
        }
    }
}

impl SessionConfig {
    pub fn validate(&self) -> Result<()> {
        // NaN fails both comparisons
        if !(self.spelling_threshold > 0.0 && self.spelling_threshold <= 1.0) {
            bail!(
                "session.spelling_threshold must be in (0, 1], got {}",
                self.spelling_threshold
            );
        }
        Ok(())
    }
}

impl Config {
    /// Load configuration from the data directory, falling back to defaults
    pub fn load(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Config = toml::from_str(&content)?;
        config
            .session
            .validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(config)
    }

    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(data_dir.join(CONFIG_FILE), content)?;
        Ok(())
    }
}

/// Resolve the data directory
///
/// Order: explicit flag or `PROSAKART_DIR`, then `.prosakart` in the
/// current directory if present, then `~/.prosakart`.
pub fn data_dir(explicit: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = explicit {
        return Ok(dir);
    }

    let cwd = std::env::current_dir()?;
    let project_dir = cwd.join(".prosakart");
    if project_dir.exists() {
        return Ok(project_dir);
    }

    let home = dirs::home_dir()
        .ok_or_else(|| anyhow::anyhow!("Could not find home directory"))?;
    Ok(home.join(".prosakart"))
}
