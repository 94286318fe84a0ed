use anyhow::{Context, Result, anyhow};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::model::DEFAULT_ENDPOINT;

/// Environment variable consulted before the config file.
pub const API_KEY_ENV: &str = "OPENWEATHER_API_KEY";

/// Credentials and endpoint for the OpenWeather API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenWeatherConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Overrides the public current-weather endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
}

/// Top-level configuration stored on disk.
///
/// Example TOML:
/// [openweather]
/// api_key = "..."
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub openweather: OpenWeatherConfig,
}

impl Config {
    /// Load config from disk, or return an empty default if it doesn't exist yet.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_file_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Save config to disk, creating parent directories as needed.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path()?;
        self.save_to(&path)?;
        Ok(path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let toml =
            toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")?;

        fs::write(path, toml)
            .with_context(|| format!("Failed to write config file: {}", path.display()))
    }

    /// Path to the config file.
    pub fn config_file_path() -> Result<PathBuf> {
        let dirs = ProjectDirs::from("dev", "weather-etl", "weather-etl")
            .ok_or_else(|| anyhow!("Could not determine platform config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    pub fn set_api_key(&mut self, api_key: String) {
        self.openweather.api_key = Some(api_key);
    }

    /// Pick the API key: explicit value, then `env_value`, then the file.
    pub fn resolve_api_key(
        &self,
        explicit: Option<String>,
        env_value: Option<String>,
    ) -> Option<String> {
        [explicit, env_value, self.openweather.api_key.clone()]
            .into_iter()
            .flatten()
            .find(|key| !key.trim().is_empty())
    }

    pub fn resolve_endpoint(&self, explicit: Option<String>) -> String {
        explicit
            .or_else(|| self.openweather.endpoint.clone())
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_key_precedence() {
        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_api_key(None, None), None);

        cfg.set_api_key("FILE".into());
        assert_eq!(cfg.resolve_api_key(None, None).as_deref(), Some("FILE"));
        assert_eq!(cfg.resolve_api_key(None, Some("ENV".into())).as_deref(), Some("ENV"));
        assert_eq!(
            cfg.resolve_api_key(Some("FLAG".into()), Some("ENV".into())).as_deref(),
            Some("FLAG")
        );
    }

    #[test]
    fn blank_keys_are_skipped() {
        let mut cfg = Config::default();
        cfg.set_api_key("FILE".into());

        assert_eq!(
            cfg.resolve_api_key(Some("  ".into()), Some(String::new())).as_deref(),
            Some("FILE")
        );
    }

    #[test]
    fn endpoint_defaults_to_openweather() {
        let mut cfg = Config::default();
        assert_eq!(cfg.resolve_endpoint(None), DEFAULT_ENDPOINT);

        cfg.openweather.endpoint = Some("http://localhost:9000/w".into());
        assert_eq!(cfg.resolve_endpoint(None), "http://localhost:9000/w");
        assert_eq!(cfg.resolve_endpoint(Some("http://x/y".into())), "http://x/y");
    }

    #[test]
    fn save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut cfg = Config::default();
        cfg.set_api_key("KEY".into());
        cfg.save_to(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        assert!(text.contains("[openweather]"));
        assert!(!text.contains("endpoint"));
        assert_eq!(Config::load_from(&path).unwrap(), cfg);
    }

    #[test]
    fn missing_file_loads_default() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn malformed_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "openweather = 3").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
