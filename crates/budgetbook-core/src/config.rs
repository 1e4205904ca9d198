//! Application configuration management.
//!
//! This module handles loading and saving the client configuration: the API
//! base URL, the request timeout, and where session tokens are kept.
//!
//! Configuration is stored at `~/.config/budgetbook/config.json`; values can
//! be overridden from the environment (or a `.env` file).

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::api::{HttpExecutor, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::auth::{CredentialStore, FileStore, HttpTokenRefresher, KeyringStore, SessionManager};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "budgetbook";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

const ENV_API_URL: &str = "BUDGETBOOK_API_URL";
const ENV_TIMEOUT: &str = "BUDGETBOOK_TIMEOUT_SECS";
const ENV_CREDENTIALS: &str = "BUDGETBOOK_CREDENTIALS";

/// Where session tokens are persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialBackend {
    #[default]
    Keyring,
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

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub credential_backend: CredentialBackend,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            credential_backend: CredentialBackend::default(),
        }
    }
}

impl Config {
    /// Load the config file (if any), then apply environment overrides.
    pub fn load() -> Result<Self> {
        // Load .env file if present (silently ignore if not found)
        let _ = dotenvy::dotenv();

        let mut config = Self::load_from(&Self::config_path()?)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            debug!(path = %path.display(), "No config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(url) = var(ENV_API_URL) {
            self.api_base_url = url;
        }
        if let Some(timeout) = var(ENV_TIMEOUT) {
            self.request_timeout_secs = timeout
                .trim()
                .parse()
                .with_context(|| format!("Invalid {}: {}", ENV_TIMEOUT, timeout))?;
        }
        if let Some(backend) = var(ENV_CREDENTIALS) {
            self.credential_backend = backend.parse()?;
        }
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
        let store: Arc<dyn CredentialStore> = match self.credential_backend {
            CredentialBackend::Keyring => Arc::new(KeyringStore::new()),
            CredentialBackend::File => {
                warn!("Storing session tokens in a plain file");
                Arc::new(FileStore::new(&self.cache_dir()?))
            }
        };
        Ok(store)
    }

    /// Wire up a session manager for this configuration.
    ///
    /// The executor and refresher share one connection pool.
    pub fn build_session(&self) -> Result<SessionManager> {
        self.build_session_with(self.credential_store()?)
    }

    pub fn build_session_with(&self, store: Arc<dyn CredentialStore>) -> Result<SessionManager> {
        let client = Client::builder()
            .timeout(self.request_timeout())
            .build()
            .context("Failed to create HTTP client")?;

        let executor = HttpExecutor::with_client(client.clone(), &self.api_base_url);
        let refresher = HttpTokenRefresher::new(client, &self.api_base_url);

        SessionManager::new(store, Arc::new(refresher), Arc::new(executor))
            .context("Failed to load stored session")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    use crate::auth::{MemoryStore, Session};

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("config.json")).unwrap();
        assert_eq!(config.api_base_url, DEFAULT_API_BASE_URL);
        assert_eq!(config.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
        assert_eq!(config.credential_backend, CredentialBackend::Keyring);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            api_base_url: "https://api.example.com".into(),
            request_timeout_secs: 5,
            credential_backend: CredentialBackend::File,
        };
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://api.example.com");
        assert_eq!(loaded.request_timeout(), Duration::from_secs(5));
        assert_eq!(loaded.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"api_base_url": "https://x.test"}"#).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded.api_base_url, "https://x.test");
        assert_eq!(loaded.request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_API_URL, "https://env.test"),
            (ENV_TIMEOUT, " 12 "),
            (ENV_CREDENTIALS, "FILE"),
        ]);
        let mut config = Config::default();
        config
            .apply_env(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.api_base_url, "https://env.test");
        assert_eq!(config.request_timeout_secs, 12);
        assert_eq!(config.credential_backend, CredentialBackend::File);
    }

    #[test]
    fn test_bad_env_values_are_errors() {
        let mut config = Config::default();
        assert!(config
            .apply_env(|key| (key == ENV_TIMEOUT).then(|| "soon".to_string()))
            .is_err());
        assert!(config
            .apply_env(|key| (key == ENV_CREDENTIALS).then(|| "vault".to_string()))
            .is_err());
    }

    #[tokio::test]
    async fn test_build_session_picks_up_stored_tokens() {
        let store = Arc::new(MemoryStore::new());
        Session::new("a", "r").save(store.as_ref()).unwrap();

        let session = Config::default().build_session_with(store).unwrap();
        assert!(session.is_authenticated().await);
    }
}
