//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::output::OutputFormat;

/// CLI configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Default output format (`table` or `json`)
    pub default_format: Option<String>,
}

impl Config {
    /// Load configuration from `~/.config/alpha/config.json`
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).context("Failed to read config file")?;
        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("alpha").join("config.json"))
    }

    fn format(&self) -> Option<OutputFormat> {
        let raw = self.default_format.as_deref()?;
        match raw.parse() {
            Ok(format) => Some(format),
            Err(e) => {
                warn!(value = %raw, error = %e, "Ignoring default_format from config file");
                None
            }
        }
    }
}

/// Pick the output format: flag or `ALPHA_FORMAT`, then config file, then table
pub fn resolve_format(flag: Option<OutputFormat>) -> OutputFormat {
    if let Some(format) = flag {
        return format;
    }
    match Config::load() {
        Ok(config) => config.format().unwrap_or_default(),
        Err(e) => {
            warn!(error = %format!("{:#}", e), "Ignoring unreadable config file");
            OutputFormat::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert!(config.default_format.is_none());
        assert_eq!(config.format(), None);
    }

    #[test]
    fn test_format_from_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"default_format": "json"}"#).unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.format(), Some(OutputFormat::Json));
    }

    #[test]
    fn test_unknown_format_ignored() {
        let config = Config {
            default_format: Some("xml".to_string()),
        };
        assert_eq!(config.format(), None);
    }

    #[test]
    fn test_flag_wins() {
        assert_eq!(resolve_format(Some(OutputFormat::Json)), OutputFormat::Json);
    }
}
