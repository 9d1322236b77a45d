//! Client configuration.
//!
//! Loaded from `config.toml` in the platform config directory
//! (`~/.config/propfinder/config.toml` on Linux) when present, otherwise
//! defaults. `PROPFINDER_BASE_URL` overrides the base URL.

use directories::ProjectDirs;
use propfinder_core::{StorageBackend, TokenStore, create_store};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

use crate::router::LOGIN_PATH;
use crate::types::{ClientError, Result};

/// Environment variable overriding [`ClientConfig::base_url`].
pub const BASE_URL_ENV: &str = "PROPFINDER_BASE_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL all request paths are resolved against.
    pub base_url: String,

    /// Per-request timeout in seconds.
    pub timeout_secs: u64,

    /// Route to navigate to when a session expires.
    pub login_path: String,

    /// Storage key of the persisted token.
    pub token_key: String,

    /// Token storage backend.
    pub storage: StorageBackend,

    /// Storage file for the `file` backend; platform default when unset.
    pub storage_path: Option<PathBuf>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            timeout_secs: 30,
            login_path: LOGIN_PATH.to_string(),
            token_key: propfinder_core::DEFAULT_TOKEN_KEY.to_string(),
            storage: StorageBackend::default(),
            storage_path: None,
        }
    }
}

impl ClientConfig {
    /// Path of the config file in the platform config directory.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "propfinder", "propfinder")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Load from the default location, then apply environment overrides.
    pub fn load() -> Result<Self> {
        let path = Self::default_path().filter(|path| path.exists());
        Self::from_sources(path.as_deref(), |name| std::env::var(name).ok())
    }

    /// Load from an explicit file, then apply environment overrides.
    pub fn load_from_path(path: &Path) -> Result<Self> {
        Self::from_sources(Some(path), |name| std::env::var(name).ok())
    }

    /// File contents (or defaults) with `lookup` overrides applied on top, once.
    fn from_sources(path: Option<&Path>, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(lookup);
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            ClientError::Config(format!("failed to read config from {:?}: {}", path, e))
        })?;
        let config = Self::from_toml_str(&contents).map_err(|e| match e {
            ClientError::Config(message) => {
                ClientError::Config(format!("{:?}: {}", path, message))
            }
            e => e,
        })?;
        debug!("loaded configuration from {:?}", path);
        Ok(config)
    }

    /// Parse a TOML document; missing fields take their defaults.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| ClientError::Config(format!("failed to parse config: {}", e)))
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(base_url) = lookup(BASE_URL_ENV).filter(|v| !v.is_empty()) {
            debug!("base url overridden by {}", BASE_URL_ENV);
            self.base_url = base_url;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Open the configured token store.
    pub fn token_store(&self) -> Result<TokenStore> {
        let backend = create_store(self.storage, self.storage_path.as_deref())?;
        Ok(TokenStore::with_key(backend, self.token_key.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propfinder_core::Token;
    use std::cell::Cell;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000/");
        assert_eq!(config.login_path, "/");
        assert_eq!(config.token_key, "token");
        assert_eq!(config.storage, StorageBackend::File);
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = ClientConfig::from_toml_str(
            r#"
            base_url = "https://api.example.com/"
            storage = "memory"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://api.example.com/");
        assert_eq!(config.storage, StorageBackend::Memory);
        assert_eq!(config.token_key, "token");
    }

    #[test]
    fn test_invalid_toml() {
        let result = ClientConfig::from_toml_str("storage = \"floppy\"");
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_override_base_url() {
        let mut config = ClientConfig::default();
        config.apply_overrides(|name| {
            (name == BASE_URL_ENV).then(|| "http://staging:8000/".to_string())
        });
        assert_eq!(config.base_url, "http://staging:8000/");

        config.apply_overrides(|_| Some(String::new()));
        assert_eq!(config.base_url, "http://staging:8000/");
    }

    #[test]
    fn test_overrides_consulted_once_per_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://file:8000/\"\n").unwrap();

        for source in [Some(path.as_path()), None] {
            let lookups = Cell::new(0);
            let config = ClientConfig::from_sources(source, |name| {
                lookups.set(lookups.get() + 1);
                (name == BASE_URL_ENV).then(|| "http://env:8000/".to_string())
            })
            .unwrap();

            assert_eq!(config.base_url, "http://env:8000/");
            assert_eq!(lookups.get(), 1);
        }
    }

    #[test]
    fn test_file_values_without_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "base_url = \"http://file:8000/\"\n").unwrap();

        let config = ClientConfig::from_sources(Some(&path), |_| None).unwrap();
        assert_eq!(config.base_url, "http://file:8000/");
    }

    #[test]
    fn test_load_from_missing_path() {
        let dir = TempDir::new().unwrap();
        let result = ClientConfig::load_from_path(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ClientError::Config(_))));
    }

    #[test]
    fn test_file_token_store_from_config() {
        let dir = TempDir::new().unwrap();
        let config = ClientConfig {
            storage: StorageBackend::File,
            storage_path: Some(dir.path().join("storage.json")),
            token_key: "session".to_string(),
            ..ClientConfig::default()
        };

        config.token_store().unwrap().set(&Token::new("abc")).unwrap();

        let reopened = config.token_store().unwrap();
        assert_eq!(reopened.key(), "session");
        assert_eq!(reopened.get().unwrap(), Some(Token::new("abc")));
    }
}
