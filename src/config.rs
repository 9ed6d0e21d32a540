//! Build configuration
//!
//! Loaded from a JSON file. Every field has a default, so `{}` is a valid
//! configuration.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Configuration for table builds and readers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Directory holding one sub-directory per database
    #[serde(default = "default_db_root")]
    pub db_root: String,

    /// Smallest stream buffer in bytes (power of two)
    #[serde(default = "default_block_size")]
    pub block_size: usize,

    /// Largest stream buffer in bytes
    #[serde(default = "default_max_buffer_size")]
    pub max_buffer_size: usize,

    /// fsync the node table once patches are replayed
    #[serde(default = "default_sync_on_finish")]
    pub sync_on_finish: bool,
}

fn default_db_root() -> String {
    "./data".to_string()
}
fn default_block_size() -> usize {
    4096
}
fn default_max_buffer_size() -> usize {
    1 << 22
} // 4MB
fn default_sync_on_finish() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            db_root: default_db_root(),
            block_size: default_block_size(),
            max_buffer_size: default_max_buffer_size(),
            sync_on_finish: default_sync_on_finish(),
        }
    }
}

impl BuildConfig {
    /// Configuration rooted at `db_root`, defaults elsewhere.
    pub fn with_root(db_root: impl AsRef<Path>) -> Self {
        Self {
            db_root: db_root.as_ref().to_string_lossy().into_owned(),
            ..Self::default()
        }
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)
            .map_err(|e| ConfigError::new(format!("Failed to read config: {}", e)))?;

        let config: BuildConfig = serde_json::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_root.is_empty() {
            return Err(ConfigError::new("db_root must not be empty"));
        }
        if self.block_size == 0 || !self.block_size.is_power_of_two() {
            return Err(ConfigError::new(format!(
                "block_size must be a power of two, got {}",
                self.block_size
            )));
        }
        if self.max_buffer_size < self.block_size {
            return Err(ConfigError::new("max_buffer_size must be >= block_size"));
        }
        Ok(())
    }

    pub fn db_root(&self) -> PathBuf {
        PathBuf::from(&self.db_root)
    }

    /// Stream buffer size for an input of `input_size` bytes: the block size
    /// doubled until it covers the input or reaches the cap.
    pub fn buffer_size(&self, input_size: u64) -> usize {
        let mut size = self.block_size.max(1);
        while (size as u64) < input_size && size < self.max_buffer_size {
            size = size.saturating_mul(2);
        }
        size.min(self.max_buffer_size)
    }
}

/// Invalid or unreadable configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    message: String,
}

impl ConfigError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[ERROR] XS_CONFIG_INVALID: {}", self.message)
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xmlstore.json");
        fs::write(&path, "{}").unwrap();

        let config = BuildConfig::load(&path).unwrap();
        assert_eq!(config, BuildConfig::default());
        assert_eq!(config.block_size, 4096);
        assert!(config.sync_on_finish);
    }

    #[test]
    fn test_config_rejects_odd_block_size() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xmlstore.json");
        fs::write(&path, r#"{"block_size": 3000}"#).unwrap();

        let err = BuildConfig::load(&path).unwrap_err();
        assert!(err.message().contains("power of two"));
    }

    #[test]
    fn test_config_rejects_small_cap() {
        let config = BuildConfig {
            max_buffer_size: 1024,
            ..BuildConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_buffer_size_grows_with_input() {
        let config = BuildConfig::default();
        assert_eq!(config.buffer_size(0), 4096);
        assert_eq!(config.buffer_size(4096), 4096);
        assert_eq!(config.buffer_size(4097), 8192);
        assert_eq!(config.buffer_size(u64::MAX), 1 << 22);
    }

    #[test]
    fn test_invalid_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("xmlstore.json");
        fs::write(&path, "not json").unwrap();
        assert!(BuildConfig::load(&path).is_err());
    }

    #[test]
    fn test_buffer_size_never_spins_or_overflows() {
        let zero_block = BuildConfig {
            block_size: 0,
            ..BuildConfig::default()
        };
        assert_eq!(zero_block.buffer_size(10), 16);

        let huge_cap = BuildConfig {
            max_buffer_size: usize::MAX,
            ..BuildConfig::default()
        };
        assert_eq!(huge_cap.buffer_size(u64::MAX), usize::MAX);
    }
}

