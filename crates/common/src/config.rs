//! Configuration
//!
//! Two layers: a read-only key/value [`ConfigSource`] that carries the
//! per-run identity values handed over by the invoking wrapper, and
//! [`Settings`], the TOML file describing how to reach the tailscale
//! client and the secret store.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::dispatch::Action;
use crate::error::ConfigError;

/// Workflow-specific hostname override
pub const HOSTNAME_KEY: &str = "TS_HOSTNAME";

/// Operation name, used as hostname when no override is set
pub const OP_NAME_KEY: &str = "OPS_OP_NAME";

/// Name of the secret holding the auth key, bypassing the derived name
pub const SECRET_NAME_KEY: &str = "AUTHKEY_SECRET_NAME";

/// Read-only key/value lookup.
///
/// Empty values are reported as absent.
pub trait ConfigSource: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;

    fn get(&self, key: &str) -> Option<String> {
        self.lookup(key).filter(|v| !v.is_empty())
    }
}

/// Process environment
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfig;

impl ConfigSource for EnvConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

/// In-memory values
#[derive(Debug, Default, Clone)]
pub struct MapConfig {
    values: HashMap<String, String>,
}

impl MapConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for MapConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

impl ConfigSource for MapConfig {
    fn lookup(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }
}

/// Overrides consulted before a fallback source
pub struct LayeredConfig<F> {
    overrides: MapConfig,
    fallback: F,
}

impl<F: ConfigSource> LayeredConfig<F> {
    pub fn new(overrides: MapConfig, fallback: F) -> Self {
        Self { overrides, fallback }
    }
}

impl<F: ConfigSource> ConfigSource for LayeredConfig<F> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.overrides
            .get(key)
            .or_else(|| self.fallback.lookup(key))
    }
}

/// Tailgate settings file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Tailscale client configuration
    pub tailscale: TailscaleSettings,

    /// Secret store configuration
    pub secrets: SecretSettings,

    /// Operator prompt configuration
    pub prompt: PromptSettings,
}

/// Tailscale client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailscaleSettings {
    /// Path to the tailscale binary
    pub binary: String,

    /// Upper bound on `tailscale up`, in seconds
    pub join_timeout_secs: u64,

    /// Accept subnet routes advertised by other nodes
    pub accept_routes: bool,
}

impl Default for TailscaleSettings {
    fn default() -> Self {
        Self {
            binary: "tailscale".to_string(),
            join_timeout_secs: 60,
            accept_routes: true,
        }
    }
}

impl TailscaleSettings {
    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }
}

/// Where auth keys are fetched from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretBackend {
    /// HTTP secret store
    #[default]
    Http,
    /// Process environment
    Env,
}

/// Secret store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretSettings {
    pub backend: SecretBackend,

    /// Base URL of the HTTP secret store
    pub url: String,

    /// Environment variable holding the bearer token for the store
    pub token_env: String,
}

impl Default for SecretSettings {
    fn default() -> Self {
        Self {
            backend: SecretBackend::Http,
            url: "http://127.0.0.1:8080".to_string(),
            token_env: "SECRETS_TOKEN".to_string(),
        }
    }
}

/// Operator prompt configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSettings {
    /// Action suggested when the operator just presses enter
    pub default_action: Action,
}

impl Default for PromptSettings {
    fn default() -> Self {
        Self {
            default_action: Action::Logout,
        }
    }
}

impl Settings {
    /// Load settings from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            toml::from_str(&content).map_err(|e| ConfigError::InvalidSettings(e.to_string()))
        } else {
            Ok(Self::default())
        }
    }

    /// Save settings to file
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::InvalidSettings(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Default settings path
pub fn default_settings_path() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tailgate")
        .join("config.toml")
}
