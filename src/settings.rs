//! User settings shared by every run.
//!
//! They live in `settings.toml` in the user configuration directory (see
//! [`get_settings_file_path`]). The file is optional, as is every setting in it.
use crate::get_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Context, Result, anyhow};
use documented::DocumentedFields;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Where the settings file is looked for
pub fn get_settings_file_path() -> PathBuf {
    get_config_dir().join(SETTINGS_FILE_NAME)
}

/// Settings read from `settings.toml`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, DocumentedFields)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Log level for the terminal and the log files (`STAR_MARKET_LOG_LEVEL` takes precedence)
    pub log_level: String,
    /// Replace a non-empty output directory instead of refusing to run
    pub overwrite: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: DEFAULT_LOG_LEVEL.to_string(),
            overwrite: false,
        }
    }
}

impl Settings {
    /// Load the user's settings, or the defaults if there is no settings file
    pub fn load() -> Result<Self> {
        Self::load_from(&get_settings_file_path())
    }

    fn load_from(file_path: &Path) -> Result<Self> {
        if file_path.is_file() {
            read_toml(file_path)
        } else {
            Ok(Self::default())
        }
    }

    /// A settings file holding the defaults, each commented out below a description of what it
    /// does
    pub fn default_file_contents() -> Result<String> {
        let defaults =
            toml::to_string(&Self::default()).context("Could not convert settings to TOML")?;

        let mut sections = vec![String::from(
            "# Settings for star-market\n# Uncomment a setting to override its default",
        )];
        for line in defaults.lines().filter(|line| !line.trim().is_empty()) {
            let (field, _) = line
                .split_once('=')
                .ok_or_else(|| anyhow!("Unexpected line in default settings: {line}"))?;
            let field = field.trim();
            let docs = Self::get_field_docs(field)
                .map_err(|_| anyhow!("Setting {field} is not documented"))?;
            let description = docs.lines().map(|doc| format!("# {}", doc.trim())).join("\n");
            sections.push(format!("{description}\n# {line}"));
        }

        Ok(sections.join("\n\n") + "\n")
    }
}
