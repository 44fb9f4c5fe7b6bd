//! Configuration management
//!
//! Settings live in `settings.json` in the data directory:
//! ```json
//! {
//!   "api": { "baseUrl": "http://localhost:8080/api", "timeoutSecs": 30, "token": null },
//!   "cart": { "maxQuantity": 10 },
//!   "storage": { "backend": "duckdb" },
//!   "migration": { "onPartialFailure": "retain" }
//! }
//! ```
//! Fields this crate does not manage are preserved on save.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::adapters::rest::DEFAULT_TIMEOUT_SECS;
use crate::domain::result::Error;
use crate::services::{CartOptions, PartialFailurePolicy, DEFAULT_MAX_QUANTITY};

pub const DEFAULT_API_URL: &str = "http://localhost:8080/api";

pub const ENV_API_URL: &str = "STOREFRONT_API_URL";
pub const ENV_STORAGE_BACKEND: &str = "STOREFRONT_STORAGE_BACKEND";

/// Where guest data is kept on the device
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// storefront.duckdb in the data directory
    #[default]
    DuckDb,
    /// Process memory only
    Memory,
}

impl fmt::Display for StorageBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageBackend::DuckDb => write!(f, "duckdb"),
            StorageBackend::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for StorageBackend {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "duckdb" => Ok(StorageBackend::DuckDb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(Error::Config(format!(
                "Unknown storage backend '{}' (expected duckdb or memory)",
                other
            ))),
        }
    }
}

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    cart: CartSettings,
    #[serde(default)]
    storage: StorageSettings,
    #[serde(default)]
    migration: MigrationSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    timeout_secs: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token: Option<String>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CartSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    max_quantity: Option<u32>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StorageSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    backend: Option<StorageBackend>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MigrationSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    on_partial_failure: Option<PartialFailurePolicy>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

/// Storefront configuration (resolved view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub api_timeout_secs: u64,
    pub api_token: Option<String>,
    pub max_quantity: u32,
    pub storage_backend: StorageBackend,
    pub on_partial_failure: PartialFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            api_timeout_secs: DEFAULT_TIMEOUT_SECS,
            api_token: None,
            max_quantity: DEFAULT_MAX_QUANTITY,
            storage_backend: StorageBackend::default(),
            on_partial_failure: PartialFailurePolicy::default(),
        }
    }
}

impl Config {
    /// Load config from the data directory
    ///
    /// `STOREFRONT_API_URL` and `STOREFRONT_STORAGE_BACKEND` override the
    /// file. An unparseable settings file is ignored.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let raw = read_settings(data_dir)?;
        let mut config = Self::from_settings(&raw);

        config.apply_overrides(
            std::env::var(ENV_API_URL).ok(),
            std::env::var(ENV_STORAGE_BACKEND).ok(),
        )?;

        Ok(config)
    }

    fn from_settings(raw: &SettingsFile) -> Self {
        let defaults = Self::default();
        Self {
            api_base_url: raw
                .api
                .base_url
                .clone()
                .filter(|u| !u.trim().is_empty())
                .unwrap_or(defaults.api_base_url),
            api_timeout_secs: raw
                .api
                .timeout_secs
                .filter(|t| *t > 0)
                .unwrap_or(defaults.api_timeout_secs),
            api_token: raw.api.token.clone().filter(|t| !t.is_empty()),
            max_quantity: raw
                .cart
                .max_quantity
                .filter(|q| *q > 0)
                .unwrap_or(defaults.max_quantity),
            storage_backend: raw.storage.backend.unwrap_or(defaults.storage_backend),
            on_partial_failure: raw
                .migration
                .on_partial_failure
                .unwrap_or(defaults.on_partial_failure),
        }
    }

    fn apply_overrides(
        &mut self,
        api_url: Option<String>,
        storage_backend: Option<String>,
    ) -> Result<()> {
        if let Some(url) = api_url.filter(|u| !u.trim().is_empty()) {
            self.api_base_url = url;
        }
        if let Some(backend) = storage_backend.filter(|b| !b.trim().is_empty()) {
            self.storage_backend = backend.parse()?;
        }
        Ok(())
    }

    /// Save config to the data directory
    /// Preserves other settings this crate doesn't manage
    pub fn save(&self, data_dir: &Path) -> Result<()> {
        let settings_path = data_dir.join("settings.json");
        let mut settings = read_settings(data_dir)?;

        // Update only the fields we manage
        settings.api.base_url = Some(self.api_base_url.clone());
        settings.api.timeout_secs = Some(self.api_timeout_secs);
        settings.api.token = self.api_token.clone();
        settings.cart.max_quantity = Some(self.max_quantity);
        settings.storage.backend = Some(self.storage_backend);
        settings.migration.on_partial_failure = Some(self.on_partial_failure);

        std::fs::create_dir_all(data_dir)?;
        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    /// Engine options derived from this config
    pub fn cart_options(&self) -> CartOptions {
        CartOptions {
            max_quantity: self.max_quantity,
            on_partial_failure: self.on_partial_failure,
        }
    }
}

fn read_settings(data_dir: &Path) -> Result<SettingsFile> {
    let settings_path = data_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }

    let content = std::fs::read_to_string(&settings_path)?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        log::warn!("Ignoring unreadable settings.json: {}", e);
        SettingsFile::default()
    }))
}
