//! Configuration file handling
//!
//! The configuration file is a JSON object; every key is optional.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::hub::BATCH_SIZE;

use super::errors::{CliError, CliResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Rows per hub import batch (optional, default 100)
    #[serde(default = "default_import_batch_size")]
    pub import_batch_size: usize,

    /// Log filter directive when ANNOTA_LOG is unset (optional, default "info")
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_import_batch_size() -> usize {
    BATCH_SIZE
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            import_batch_size: default_import_batch_size(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load configuration from file
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Load configuration from file, or defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> CliResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    fn validate(&self) -> CliResult<()> {
        if self.import_batch_size == 0 {
            return Err(CliError::config_error("import_batch_size must be > 0"));
        }
        if self.log_filter.trim().is_empty() {
            return Err(CliError::config_error("log_filter must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::load_or_default(None).unwrap();
        assert_eq!(config.import_batch_size, 100);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let file = config_file(r#"{"import_batch_size": 25}"#);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.import_batch_size, 25);
        assert_eq!(config.log_filter, "info");
    }

    #[test]
    fn test_zero_batch_size_rejected() {
        let file = config_file(r#"{"import_batch_size": 0}"#);
        let err = Config::load(file.path()).unwrap_err();
        assert!(err.message().contains("import_batch_size"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let file = config_file(r#"{"batch": 10}"#);
        assert!(Config::load(file.path()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = Config::load(Path::new("/nonexistent/annota.json")).unwrap_err();
        assert!(err.message().contains("Failed to read config"));
    }
}
