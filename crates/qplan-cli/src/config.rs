//! Configuration file for the `qplan` binary
//!
//! ```toml
//! [analyzer]
//! max_nesting_depth = 64
//!
//! [analyzer.json]
//! root_name = "query_block"
//!
//! [logging]
//! filter = "debug"
//! json_log_dir = "/var/log/qplan"
//! ```

use anyhow::{Context, Result};
use qplan_analyzer::AnalyzerConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const DEFAULT_FILTER: &str = "warn,qplan_analyzer=info,qplan_cli=info";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub analyzer: AnalyzerConfig,
    pub logging: LoggingSection,
}

/// `[logging]` table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Filter used when `RUST_LOG` is not set
    pub filter: String,
    /// Directory for daily JSON log files, disabled when unset
    pub json_log_dir: Option<PathBuf>,
    /// Whether console output includes file and line
    pub include_location: bool,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            filter: DEFAULT_FILTER.to_string(),
            json_log_dir: None,
            include_location: cfg!(debug_assertions),
        }
    }
}

impl CliConfig {
    /// Loads `path`, or the default config file when no path is given.
    ///
    /// A missing default file is not an error; a missing explicit file is.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => match config_file() {
                Ok(path) if path.exists() => Self::from_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        Self::from_toml(&text).with_context(|| format!("Invalid config file: {:?}", path))
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("Failed to parse configuration")
    }
}

pub fn config_dir() -> Result<PathBuf> {
    dirs::config_dir()
        .context("Could not determine config directory")
        .map(|p| p.join("qplan"))
}

pub fn config_file() -> Result<PathBuf> {
    config_dir().map(|p| p.join("config.toml"))
}
