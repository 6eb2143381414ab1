use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;
use tracing::debug;

use crate::{error::ConfigError, price::alpha_vantage::DEFAULT_BASE_URL};

pub const API_KEY_ENV: &str = "OFFBALANCE_API_KEY";

/// Per-user configuration directory, e.g. `~/.config/offbalance` on Linux.
pub fn config_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "offbalance", "offbalance").map(|dirs| dirs.config_dir().to_owned())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Config {
    #[serde(default)]
    pub alpha_vantage: AlphaVantageConfig,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct AlphaVantageConfig {
    pub api_key: Option<String>,
    pub base_url: String,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
    /// Extra attempts after the provider reports throttling
    pub max_retries: u32,
}

impl Default for AlphaVantageConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: DEFAULT_BASE_URL.to_string(),
            requests_per_minute: 5,
            timeout_secs: 30,
            max_retries: 2,
        }
    }
}

impl AlphaVantageConfig {
    /// The API key from the environment, falling back to the config file.
    pub fn api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.api_key.clone())
    }
}

impl Config {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let file = std::fs::File::open(path).map_err(|source| ConfigError::Open {
            path: path.to_owned(),
            source,
        })?;
        serde_yaml::from_reader(file).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })
    }

    /// Loads `path` if given. Otherwise loads `config.yml` from the config
    /// directory, or returns defaults when that file does not exist.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match config_dir().map(|dir| dir.join("config.yml")) {
            Some(path) if path.exists() => Self::load_from_file(&path),
            default_path => {
                debug!(?default_path, "no config file, using defaults");
                Ok(Self::default())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AlphaVantage:\n  ApiKey: demo\n  MaxRetries: 0").unwrap();
        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.alpha_vantage.api_key.as_deref(), Some("demo"));
        assert_eq!(config.alpha_vantage.max_retries, 0);
        assert_eq!(config.alpha_vantage.requests_per_minute, 5);
        assert_eq!(config.alpha_vantage.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(Some(&dir.path().join("nope.yml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Open { .. }));
    }

    #[test]
    fn bad_yaml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "AlphaVantage: [1, 2").unwrap();
        assert!(matches!(
            Config::load(Some(file.path())),
            Err(ConfigError::Parse { .. })
        ));
    }
}
