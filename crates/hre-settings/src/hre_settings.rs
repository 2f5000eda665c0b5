//! HRE Settings
//!
//! Persisted defaults for the table sync tools:
//! - the project database that was opened last
//! - CSV format defaults
//! - import atomicity
//! - log filter and file logging

use anyhow::{Context, Result};
use hre_tablesync::{BulkAtomicity, CsvOptions, FieldDelimiter, SyncOptions, TextQualifier};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod settings_file;

pub use settings_file::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct HreSettings {
    pub database: DatabaseSettings,
    pub csv: CsvSettings,
    pub import: ImportSettings,
    pub logging: LoggingSettings,
}

impl HreSettings {
    /// Load from the user config directory, falling back to defaults when
    /// no settings file exists yet
    pub fn load() -> Result<Self> {
        Self::load_from(&settings_file()?)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&settings_file()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no settings file, using defaults");
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {:?}", path))?;
        serde_json::from_str(&content).with_context(|| "Failed to parse settings JSON")
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write settings to {:?}", path))?;
        tracing::debug!(path = %path.display(), "settings saved");
        Ok(())
    }

    /// Service options built from the stored defaults
    pub fn sync_options(&self) -> SyncOptions {
        SyncOptions {
            csv: self.csv.to_options(),
            atomicity: self.import.atomicity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DatabaseSettings {
    /// Last opened project database
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CsvSettings {
    pub field_delimiter: char,
    pub text_qualifier: TextQualifier,
    pub include_header: bool,
}

impl Default for CsvSettings {
    fn default() -> Self {
        Self {
            field_delimiter: FieldDelimiter::default().as_char(),
            text_qualifier: TextQualifier::default(),
            include_header: false,
        }
    }
}

impl CsvSettings {
    pub fn to_options(&self) -> CsvOptions {
        CsvOptions {
            text_qualifier: self.text_qualifier,
            ..CsvOptions::default()
        }
        .with_delimiter(self.field_delimiter)
        .with_header(self.include_header)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ImportSettings {
    pub atomicity: BulkAtomicity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    /// Also write JSON logs to a daily file under the data directory
    pub json_file: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            json_file: false,
        }
    }
}
