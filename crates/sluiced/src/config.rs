//! TOML configuration for the Sluice daemon.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use sluice_types::{
    SpoolerDefinition, DEFAULT_AVG_CHUNK_SIZE, DEFAULT_MAX_CHUNK_SIZE, DEFAULT_MIN_CHUNK_SIZE,
};

/// Top-level configuration, parsed from TOML.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Backend and scratch-space settings.
    pub spooler: SpoolerSection,
    /// Chunking parameters.
    pub chunking: ChunkingSection,
    /// Logging configuration.
    pub log: LogSection,
}

/// `[spooler]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SpoolerSection {
    /// Backend definition string, `<driver>:<description>`.
    ///
    /// `local:<dir>` stores objects under a directory; `mem:` keeps them
    /// in memory (useful for dry runs).
    pub definition: String,
    /// Scratch directory for intermediate compressed artifacts.
    pub scratch_dir: PathBuf,
}

impl Default for SpoolerSection {
    fn default() -> Self {
        Self {
            definition: "local:./sluice-store".to_string(),
            scratch_dir: PathBuf::from("./sluice-scratch"),
        }
    }
}

/// `[chunking]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ChunkingSection {
    /// Whether large files are cut into content-defined chunks.
    pub enabled: bool,
    /// Minimum chunk size in bytes.
    pub min_size: u64,
    /// Target-average chunk size in bytes.
    pub avg_size: u64,
    /// Maximum chunk size in bytes.
    pub max_size: u64,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            min_size: DEFAULT_MIN_CHUNK_SIZE,
            avg_size: DEFAULT_AVG_CHUNK_SIZE,
            max_size: DEFAULT_MAX_CHUNK_SIZE,
        }
    }
}

/// `[log]` section.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct LogSection {
    /// Log level filter (e.g. `"info"`, `"debug"`).
    pub level: String,
}

impl Default for LogSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CliConfig {
    /// Load config from a file, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(p) => {
                let content = std::fs::read_to_string(p)?;
                let config: CliConfig = toml::from_str(&content)?;
                Ok(config)
            }
            None => Ok(Self::default()),
        }
    }

    /// Parse config from a TOML string (used in tests).
    #[cfg(test)]
    pub fn from_toml(s: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Build the spooler definition this config describes.
    pub fn spooler_definition(&self) -> SpoolerDefinition {
        SpoolerDefinition::with_chunking(
            &self.spooler.definition,
            &self.spooler.scratch_dir,
            self.chunking.enabled,
            self.chunking.min_size,
            self.chunking.avg_size,
            self.chunking.max_size,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = CliConfig::default();
        assert!(config.spooler_definition().is_valid());
        assert_eq!(config.log.level, "info");
    }

    #[test]
    fn test_parse_full_config() {
        let config = CliConfig::from_toml(
            r#"
            [spooler]
            definition = "local:/srv/objects"
            scratch_dir = "/var/tmp/sluice"

            [chunking]
            enabled = true
            min_size = 4096
            avg_size = 16384
            max_size = 65536

            [log]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.spooler.definition, "local:/srv/objects");
        assert_eq!(config.chunking.min_size, 4096);
        assert_eq!(config.log.level, "debug");

        let definition = config.spooler_definition();
        assert!(definition.is_valid());
        assert!(definition.use_chunking);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config = CliConfig::from_toml(
            r#"
            [spooler]
            definition = "mem:"
            "#,
        )
        .unwrap();

        assert_eq!(config.spooler.definition, "mem:");
        assert!(config.chunking.enabled);
        assert_eq!(config.chunking.min_size, DEFAULT_MIN_CHUNK_SIZE);
    }

    #[test]
    fn test_bad_bounds_produce_invalid_definition() {
        let config = CliConfig::from_toml(
            r#"
            [chunking]
            enabled = true
            min_size = 100
            avg_size = 50
            max_size = 200
            "#,
        )
        .unwrap();
        assert!(!config.spooler_definition().is_valid());
    }
}
