//! Persisted tool configuration.
//!
//! A small JSON file remembers the last-used directory, the backup
//! directory, and an optional default owner password. Note that the owner
//! password is stored in the clear; treat the file accordingly.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub last_directory: Option<PathBuf>,
    pub backup_directory: Option<PathBuf>,
    pub owner_password: Option<String>,
}

impl Config {
    /// Load the configuration, falling back to defaults when the file does
    /// not exist or cannot be parsed.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|err| {
                info!("ignoring malformed config {}: {err}", path.display());
                Self::default()
            }),
            Err(_) => {
                info!("no config at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config to {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(&dir.path().join("nope.json"));
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal-pdf.json");

        let config = Config {
            last_directory: Some(PathBuf::from("/tmp/docs")),
            backup_directory: None,
            owner_password: Some("hunter2".to_string()),
        };
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path), config);
    }

    #[test]
    fn test_malformed_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal-pdf.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(Config::load(&path), Config::default());
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("seal-pdf.json");
        std::fs::write(&path, r#"{"last_directory": "/x", "legacy_field": 1}"#).unwrap();

        let config = Config::load(&path);
        assert_eq!(config.last_directory, Some(PathBuf::from("/x")));
    }
}
