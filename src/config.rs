// Memordo configuration
// Server and client settings are JSON files with per-field defaults; a few
// environment variables override them so the binaries can run unconfigured.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::server::auth_service::TokenPolicy;
use crate::types::errors::ConfigError;
use crate::types::settings::OfflinePolicy;

pub const DATA_DIR_ENV: &str = "MEMORDO_DATA_DIR";
pub const BIND_ENV: &str = "MEMORDO_BIND";
pub const DATABASE_ENV: &str = "MEMORDO_DB";
pub const BACKEND_URL_ENV: &str = "MEMORDO_BACKEND_URL";
pub const OFFLINE_POLICY_ENV: &str = "MEMORDO_OFFLINE_POLICY";
pub const STORE_PATH_ENV: &str = "MEMORDO_STORE";
/// Optional JSON config file read by the bridge.
pub const CLIENT_CONFIG_ENV: &str = "MEMORDO_CLIENT_CONFIG";

/// Longest accepted token lifetime: ten years.
pub const MAX_TOKEN_TTL_SECS: i64 = 10 * 365 * 24 * 60 * 60;

/// Resolves the data directory.
///
/// `MEMORDO_DATA_DIR` wins; otherwise `$XDG_DATA_HOME/memordo`, then
/// `~/.local/share/memordo`, then the working directory.
pub fn data_dir_from(lookup: &dyn Fn(&str) -> Option<String>) -> PathBuf {
    if let Some(dir) = lookup(DATA_DIR_ENV) {
        return PathBuf::from(dir);
    }
    if let Some(xdg) = lookup("XDG_DATA_HOME") {
        return PathBuf::from(xdg).join("memordo");
    }
    match lookup("HOME") {
        Some(home) => PathBuf::from(home).join(".local").join("share").join("memordo"),
        None => PathBuf::from("."),
    }
}

fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn read_json<T: for<'de> Deserialize<'de> + Default>(path: Option<&Path>) -> Result<T, ConfigError> {
    let Some(path) = path else {
        return Ok(T::default());
    };
    if !path.exists() {
        return Ok(T::default());
    }
    let content = fs::read_to_string(path)
        .map_err(|e| ConfigError::IoError(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&content).map_err(|e| {
        ConfigError::SerializationError(format!("Failed to parse {}: {}", path.display(), e))
    })
}

/// Backend server settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on, e.g. `0.0.0.0:3000`.
    pub bind: String,
    /// SQLite file; defaults to `<data dir>/memordo.db`.
    pub database_path: Option<PathBuf>,
    pub access_token_ttl_secs: i64,
    pub refresh_token_ttl_secs: i64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        let tokens = TokenPolicy::default();
        Self {
            bind: "0.0.0.0:3000".to_string(),
            database_path: None,
            access_token_ttl_secs: tokens.access_ttl_secs,
            refresh_token_ttl_secs: tokens.refresh_ttl_secs,
        }
    }
}

impl ServerConfig {
    /// Loads the config file (if any) and applies process environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = read_json(path)?;
        config.apply_overrides(&process_env)?;
        Ok(config)
    }

    /// Applies `MEMORDO_BIND` and `MEMORDO_DB`, and resolves the database path.
    pub fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(bind) = lookup(BIND_ENV) {
            self.bind = bind;
        }
        if let Some(db) = lookup(DATABASE_ENV) {
            self.database_path = Some(PathBuf::from(db));
        }
        if self.database_path.is_none() {
            self.database_path = Some(data_dir_from(lookup).join("memordo.db"));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind.trim().is_empty() {
            return Err(ConfigError::InvalidValue("bind address cannot be empty".to_string()));
        }
        for ttl in [self.access_token_ttl_secs, self.refresh_token_ttl_secs] {
            if !(1..=MAX_TOKEN_TTL_SECS).contains(&ttl) {
                return Err(ConfigError::InvalidValue(format!(
                    "token lifetimes must be between 1 and {} seconds",
                    MAX_TOKEN_TTL_SECS
                )));
            }
        }
        Ok(())
    }

    pub fn token_policy(&self) -> TokenPolicy {
        TokenPolicy {
            access_ttl_secs: self.access_token_ttl_secs,
            refresh_ttl_secs: self.refresh_token_ttl_secs,
        }
    }
}

/// Extension-side settings used by the bridge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the backend, without the `/memo/api` suffix.
    pub backend_url: String,
    /// Local store file; defaults to `<data dir>/extension_storage.json`.
    pub store_path: Option<PathBuf>,
    pub offline_policy: OfflinePolicy,
    pub request_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: "http://localhost:3000".to_string(),
            store_path: None,
            offline_policy: OfflinePolicy::Drop,
            request_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config: Self = read_json(path)?;
        config.apply_overrides(&process_env)?;
        Ok(config)
    }

    /// Applies `MEMORDO_BACKEND_URL`, `MEMORDO_OFFLINE_POLICY` and `MEMORDO_STORE`.
    pub fn apply_overrides(&mut self, lookup: &dyn Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(url) = lookup(BACKEND_URL_ENV) {
            self.backend_url = url;
        }
        if let Some(policy) = lookup(OFFLINE_POLICY_ENV) {
            self.offline_policy = policy.parse().map_err(ConfigError::InvalidValue)?;
        }
        if let Some(path) = lookup(STORE_PATH_ENV) {
            self.store_path = Some(PathBuf::from(path));
        }
        if self.store_path.is_none() {
            self.store_path = Some(data_dir_from(lookup).join("extension_storage.json"));
        }
        self.validate()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let parsed = url::Url::parse(&self.backend_url)
            .map_err(|e| ConfigError::InvalidValue(format!("backend_url: {}", e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue(format!(
                "backend_url must be http(s): {}",
                self.backend_url
            )));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("request_timeout_secs must be positive".to_string()));
        }
        Ok(())
    }
}
