//! Client configuration.
//!
//! Values come from built-in defaults, an optional TOML file, then
//! `CRYPTEX_*` environment variables, in that order.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", .path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid config {}: {source}", .path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("invalid value for {key}: {value}")]
    InvalidEnv { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    #[serde(default)]
    pub market: MarketConfig,

    /// Pause between a successful auth form and the next screen.
    #[serde(default = "default_navigation_delay_ms")]
    pub navigation_delay_ms: u64,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    #[serde(default = "default_session_file")]
    pub session_file: PathBuf,

    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketConfig {
    #[serde(default = "default_market_url")]
    pub url: String,

    #[serde(default = "default_vs_currency")]
    pub vs_currency: String,

    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_backend_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_market_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

fn default_vs_currency() -> String {
    "usd".to_string()
}

fn default_per_page() -> u32 {
    10
}

fn default_navigation_delay_ms() -> u64 {
    1000
}

fn default_session_file() -> PathBuf {
    dirs::config_dir()
        .map(|p| p.join("cryptex").join("session.json"))
        .unwrap_or_else(|| PathBuf::from(".cryptex_session.json"))
}

fn default_log_filter() -> String {
    "cryptex=info".to_string()
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            url: default_market_url(),
            vs_currency: default_vs_currency(),
            per_page: default_per_page(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            market: MarketConfig::default(),
            navigation_delay_ms: default_navigation_delay_ms(),
            request_timeout_secs: None,
            session_file: default_session_file(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Load from `path` if given, else from the default location when it exists.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_file(p)?,
            None => match default_config_file() {
                Some(p) if p.exists() => Self::from_file(&p)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|source| ConfigError::Read { path: path.to_path_buf(), source })?;
        Self::from_toml(&raw).map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }

    /// Apply `CRYPTEX_*` overrides looked up through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("CRYPTEX_BACKEND_URL") {
            self.backend_url = url;
        }
        if let Some(url) = lookup("CRYPTEX_MARKET_URL") {
            self.market.url = url;
        }
        if let Some(currency) = lookup("CRYPTEX_VS_CURRENCY") {
            self.market.vs_currency = currency;
        }
        if let Some(value) = lookup("CRYPTEX_NAVIGATION_DELAY_MS") {
            self.navigation_delay_ms = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "CRYPTEX_NAVIGATION_DELAY_MS", value })?;
        }
        if let Some(value) = lookup("CRYPTEX_REQUEST_TIMEOUT_SECS") {
            let secs = value
                .parse()
                .map_err(|_| ConfigError::InvalidEnv { key: "CRYPTEX_REQUEST_TIMEOUT_SECS", value })?;
            self.request_timeout_secs = Some(secs);
        }
        if let Some(path) = lookup("CRYPTEX_SESSION_FILE") {
            self.session_file = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn navigation_delay(&self) -> Duration {
        Duration::from_millis(self.navigation_delay_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn backend_base(&self) -> String {
        self.backend_url.trim_end_matches('/').to_string()
    }
}

fn default_config_file() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("cryptex").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.backend_url, "http://localhost:8080");
        assert_eq!(config.market.per_page, 10);
        assert_eq!(config.market.vs_currency, "usd");
        assert_eq!(config.navigation_delay(), Duration::from_secs(1));
        assert_eq!(config.request_timeout(), None);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = Config::from_toml(
            r#"
            backend_url = "https://portfolio.example.com/"
            navigation_delay_ms = 250

            [market]
            per_page = 25
            "#,
        )
        .unwrap();
        assert_eq!(config.backend_base(), "https://portfolio.example.com");
        assert_eq!(config.navigation_delay(), Duration::from_millis(250));
        assert_eq!(config.market.per_page, 25);
        assert_eq!(config.market.url, "https://api.coingecko.com/api/v3");
    }

    #[test]
    fn env_overrides_file_values() {
        let env: HashMap<&str, &str> = [
            ("CRYPTEX_BACKEND_URL", "http://backend:9000"),
            ("CRYPTEX_NAVIGATION_DELAY_MS", "0"),
            ("CRYPTEX_REQUEST_TIMEOUT_SECS", "5"),
        ]
        .into_iter()
        .collect();
        let mut config = Config::default();
        config.apply_env(|k| env.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(config.backend_url, "http://backend:9000");
        assert_eq!(config.navigation_delay(), Duration::ZERO);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn bad_env_value_is_rejected() {
        let mut config = Config::default();
        let err = config
            .apply_env(|k| (k == "CRYPTEX_NAVIGATION_DELAY_MS").then(|| "soon".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains("CRYPTEX_NAVIGATION_DELAY_MS"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(&dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
