//! Monitor configuration

use std::path::{Path, PathBuf};

use hydraulic_core::SensorFiles;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Monitor configuration, loaded from an optional JSON file.
///
/// Every field has a default, so a file only lists what it overrides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Directory holding the sensor matrices
    pub data_dir: PathBuf,
    /// Low-rate (FS1) file name inside `data_dir`
    pub low_rate_file: String,
    /// High-rate (PS2) file name inside `data_dir`
    pub high_rate_file: String,
    /// Persisted predictor artifact
    pub model_path: PathBuf,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let files = SensorFiles::default();
        Self {
            data_dir: PathBuf::from("data_subset"),
            low_rate_file: files.low_rate,
            high_rate_file: files.high_rate,
            model_path: PathBuf::from("model.bin"),
        }
    }
}

impl MonitorConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn sensor_files(&self) -> SensorFiles {
        SensorFiles {
            low_rate: self.low_rate_file.clone(),
            high_rate: self.high_rate_file.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_without_file() {
        let config = MonitorConfig::load(None).unwrap();
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.sensor_files(), SensorFiles::default());
        assert_eq!(config.data_dir, PathBuf::from("data_subset"));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(&path, r#"{"model_path": "models/valve.bin"}"#).unwrap();

        let config = MonitorConfig::load(Some(&path)).unwrap();
        assert_eq!(config.model_path, PathBuf::from("models/valve.bin"));
        assert_eq!(config.low_rate_file, "FS1.txt");
    }

    #[test]
    fn test_invalid_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("monitor.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            MonitorConfig::load(Some(&path)),
            Err(ConfigError::Parse { .. })
        ));
        assert!(matches!(
            MonitorConfig::load(Some(&dir.path().join("absent.json"))),
            Err(ConfigError::Read { .. })
        ));
    }
}
