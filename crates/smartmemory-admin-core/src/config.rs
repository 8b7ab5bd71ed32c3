//! Application configuration management.
//!
//! This module handles loading and saving the console configuration: the API
//! base URL, error-tracking settings, the credential backend, and the last
//! email used to sign in.
//!
//! Configuration is stored at `~/.config/smartmemory-admin/config.json`.
//! Environment variables override the file after it is loaded.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Application name used for config/data directory paths
pub const APP_NAME: &str = "smartmemory-admin";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Backend used when no API URL is configured
pub const DEFAULT_API_URL: &str = "http://localhost:9001";

/// HTTP request timeout in seconds.
/// The core enforces no deadline of its own; this is the transport default.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

pub const ENV_API_URL: &str = "SMARTMEMORY_API_URL";
pub const ENV_ERROR_TRACKING_ENDPOINT: &str = "SMARTMEMORY_ERROR_TRACKING_ENDPOINT";
pub const ENV_CREDENTIAL_BACKEND: &str = "SMARTMEMORY_CREDENTIAL_BACKEND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    Keyring,
    #[default]
    File,
}

impl std::str::FromStr for CredentialBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "keyring" | "keychain" => Ok(CredentialBackend::Keyring),
            "file" => Ok(CredentialBackend::File),
            other => Err(anyhow::anyhow!("Unknown credential backend: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub error_tracking_endpoint: Option<String>,
    pub error_tracking_enabled: bool,
    pub credential_backend: CredentialBackend,
    pub request_timeout_secs: u64,
    pub last_email: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            error_tracking_endpoint: None,
            error_tracking_enabled: false,
            credential_backend: CredentialBackend::default(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            last_email: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        Self::load_from(&path)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            serde_json::from_str(&contents).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(url) = var(ENV_API_URL).filter(|v| !v.is_empty()) {
            self.api_base_url = url;
        }
        if let Some(endpoint) = var(ENV_ERROR_TRACKING_ENDPOINT).filter(|v| !v.is_empty()) {
            self.error_tracking_endpoint = Some(endpoint);
            self.error_tracking_enabled = true;
        }
        if let Some(backend) = var(ENV_CREDENTIAL_BACKEND) {
            match backend.parse() {
                Ok(backend) => self.credential_backend = backend,
                Err(e) => warn!(error = %e, "Ignoring {}", ENV_CREDENTIAL_BACKEND),
            }
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Tracking endpoint, only when tracking is enabled.
    pub fn tracking_endpoint(&self) -> Option<&str> {
        self.error_tracking_endpoint
            .as_deref()
            .filter(|_| self.error_tracking_enabled)
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api_base_url, "http://localhost:9001");
        assert_eq!(config.credential_backend, CredentialBackend::File);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.tracking_endpoint().is_none());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(CONFIG_FILE);
        let config = Config {
            api_base_url: "https://api.smartmemory.test".into(),
            last_email: Some("admin@x.com".into()),
            credential_backend: CredentialBackend::Keyring,
            ..Default::default()
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(CONFIG_FILE);
        std::fs::write(&path, r#"{"last_email": "ops@x.com"}"#).unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.last_email.as_deref(), Some("ops@x.com"));
        assert_eq!(config.api_base_url, DEFAULT_API_URL);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://api.example.test"),
            (ENV_ERROR_TRACKING_ENDPOINT, "https://errors.example.test/ingest"),
            (ENV_CREDENTIAL_BACKEND, "keyring"),
        ]);
        let mut config = Config::default();
        config.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.api_base_url, "https://api.example.test");
        assert_eq!(
            config.tracking_endpoint(),
            Some("https://errors.example.test/ingest")
        );
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
    }

    #[test]
    fn test_bad_backend_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides(|key| (key == ENV_CREDENTIAL_BACKEND).then(|| "vault".to_string()));
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }
}
