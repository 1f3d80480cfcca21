use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::ai::GeminiModel;
use crate::error::{Error, Result};
use crate::models::UserLocation;

pub const DEFAULT_API_URL: &str = "http://localhost:8001";
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_PASSWORD: &str = "riot2025";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Start-up settings, read from `config.json` and then the environment.
///
/// Every field is optional in the file; accessors supply the defaults.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub api_url: Option<String>,
    pub gemini_api_key: Option<String>,
    pub default_model: Option<String>,
    pub temperature: Option<f32>,
    pub poll_interval_ms: Option<u64>,
    pub ai_timeout_secs: Option<u64>,
    pub password: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the user's config directory, then apply environment overrides
    pub fn load() -> Result<Self> {
        let mut config = Self::load_from(&Self::get_config_path()?)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let config_content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&config_content)?;
        tracing::info!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Environment values win over the file. Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("RIOT_API_URL") {
            self.api_url = Some(url);
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.gemini_api_key = Some(key);
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.default_model = Some(model);
        }
        if let Some(ms) = lookup("RIOT_POLL_INTERVAL_MS").and_then(|v| v.parse().ok()) {
            self.poll_interval_ms = Some(ms);
        }
        if let Some(secs) = lookup("RIOT_AI_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.ai_timeout_secs = Some(secs);
        }
        if let Some(password) = lookup("RIOT_PASSWORD") {
            self.password = Some(password);
        }
        if let Some(lat) = lookup("RIOT_LATITUDE").and_then(|v| v.parse().ok()) {
            self.latitude = Some(lat);
        }
        if let Some(lng) = lookup("RIOT_LONGITUDE").and_then(|v| v.parse().ok()) {
            self.longitude = Some(lng);
        }
    }

    pub fn api_url(&self) -> &str {
        self.api_url
            .as_deref()
            .map(|url| url.trim_end_matches('/'))
            .unwrap_or(DEFAULT_API_URL)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS).max(100))
    }

    pub fn ai_timeout(&self) -> Duration {
        Duration::from_secs(self.ai_timeout_secs.unwrap_or(DEFAULT_AI_TIMEOUT_SECS))
    }

    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or(DEFAULT_PASSWORD)
    }

    /// Both coordinates are needed for a location
    pub fn user_location(&self) -> Option<UserLocation> {
        match (self.latitude, self.longitude) {
            (Some(latitude), Some(longitude)) => Some(UserLocation { latitude, longitude }),
            _ => None,
        }
    }

    /// Initial AI settings. After this they live in memory only.
    pub fn gemini(&self) -> GeminiConfig {
        GeminiConfig {
            api_key: self.gemini_api_key.clone().unwrap_or_default().trim().to_string(),
            model: self
                .default_model
                .as_deref()
                .and_then(GeminiModel::from_str)
                .unwrap_or_default(),
            temperature: clamp_temperature(self.temperature.unwrap_or(DEFAULT_TEMPERATURE)),
        }
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?;

        Ok(config_dir.join("riot").join("config.json"))
    }
}

/// Runtime AI settings
#[derive(Debug, Clone, PartialEq)]
pub struct GeminiConfig {
    pub api_key: String,
    pub model: GeminiModel,
    /// 0.0 to 2.0
    pub temperature: f32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: GeminiModel::default(),
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Partial change to [`GeminiConfig`]; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct GeminiConfigUpdate {
    pub api_key: Option<String>,
    pub model: Option<GeminiModel>,
    pub temperature: Option<f32>,
}

impl GeminiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// Returns a new config with the given fields replaced
    pub fn update(&self, update: GeminiConfigUpdate) -> GeminiConfig {
        GeminiConfig {
            api_key: update
                .api_key
                .map(|k| k.trim().to_string())
                .unwrap_or_else(|| self.api_key.clone()),
            model: update.model.unwrap_or(self.model),
            temperature: update
                .temperature
                .map(clamp_temperature)
                .unwrap_or(self.temperature),
        }
    }

    /// First characters of the key followed by an ellipsis, for display and logs
    pub fn redacted_key(&self) -> String {
        if !self.has_api_key() {
            return String::new();
        }
        let prefix: String = self.api_key.chars().take(6).collect();
        format!("{}...", prefix)
    }
}

fn clamp_temperature(t: f32) -> f32 {
    if t.is_nan() {
        DEFAULT_TEMPERATURE
    } else {
        t.clamp(0.0, 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config, Config::new());
        assert_eq!(config.api_url(), DEFAULT_API_URL);
        assert_eq!(config.poll_interval(), Duration::from_millis(2000));
        assert_eq!(config.password(), "riot2025");
        assert!(config.user_location().is_none());
    }

    #[test]
    fn test_env_overrides_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"api_url": "http://file:9000/", "poll_interval_ms": 5000}"#).unwrap();

        let env: HashMap<&str, &str> = [
            ("RIOT_API_URL", "http://env:8001"),
            ("RIOT_POLL_INTERVAL_MS", "not-a-number"),
            ("RIOT_LATITUDE", "-22.5"),
            ("RIOT_LONGITUDE", "-47.1"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::load_from(&path).unwrap();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.api_url(), "http://env:8001");
        assert_eq!(config.poll_interval(), Duration::from_millis(5000));
        assert_eq!(
            config.user_location(),
            Some(UserLocation { latitude: -22.5, longitude: -47.1 })
        );
    }

    #[test]
    fn test_gemini_from_config() {
        let config = Config {
            gemini_api_key: Some("  abc123  ".to_string()),
            default_model: Some("gemini-2.5-pro-exp-03-25".to_string()),
            temperature: Some(5.0),
            ..Config::default()
        };
        let gemini = config.gemini();
        assert_eq!(gemini.api_key, "abc123");
        assert_eq!(gemini.model, GeminiModel::ProExp);
        assert_eq!(gemini.temperature, 2.0);
    }

    #[test]
    fn test_update_replaces_only_given_fields() {
        let original = GeminiConfig::default();
        let updated = original.update(GeminiConfigUpdate {
            api_key: Some(" key-xyz ".to_string()),
            ..Default::default()
        });
        assert_eq!(updated.api_key, "key-xyz");
        assert_eq!(updated.model, original.model);
        assert_eq!(updated.temperature, original.temperature);
        assert!(!original.has_api_key());

        let colder = updated.update(GeminiConfigUpdate {
            temperature: Some(-1.0),
            ..Default::default()
        });
        assert_eq!(colder.temperature, 0.0);
        assert_eq!(colder.api_key, "key-xyz");
    }

    #[test]
    fn test_redacted_key() {
        let config = GeminiConfig::default().update(GeminiConfigUpdate {
            api_key: Some("AIzaSyD-secret".to_string()),
            ..Default::default()
        });
        assert_eq!(config.redacted_key(), "AIzaSy...");
        assert_eq!(GeminiConfig::default().redacted_key(), "");
    }
}
