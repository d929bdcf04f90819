//! Typed configuration for the integrator.
//!
//! The core never reads files or environment variables. A caller loads a
//! plain JSON-like structure however it likes, checks it with
//! [`validate_config`](crate::validation::validate_config), and receives
//! [`Settings`] back.

use crate::error::{IntegratorError, Result};
use crate::provenance::hash_value;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

pub const DEFAULT_CACHE_ENABLED: bool = false;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 3600;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

/// Configuration of a single provider.
///
/// Network providers need `api_key`; local providers need `model_path`
/// instead. Fields not listed here are kept verbatim in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Path to model weights for local/offline providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<String>,
    /// Compute device for local providers (`"cpu"`, `"cuda"`, `"mps"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default)]
    pub parameters: serde_json::Map<String, Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ProviderConfig {
    /// `true` when the config describes a local provider (has a model path).
    pub fn is_local(&self) -> bool {
        self.model_path.as_deref().is_some_and(|p| !p.is_empty())
    }

    /// Canonical hash of this configuration with the credential blanked out,
    /// suitable for a provenance envelope's `provider_config_hash`.
    pub fn config_hash(&self) -> Result<String> {
        let redacted = Self {
            api_key: String::new(),
            ..self.clone()
        };
        hash_value(&redacted)
    }
}

/// Top-level settings.
///
/// `cache_enabled`, `cache_ttl`, `timeout`, and `max_retries` are accepted
/// but not enforced by any provider yet; the validator warns when they are
/// set to non-default values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,
    #[serde(default = "default_cache_enabled")]
    pub cache_enabled: bool,
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_cache_enabled() -> bool {
    DEFAULT_CACHE_ENABLED
}

fn default_cache_ttl() -> u64 {
    DEFAULT_CACHE_TTL_SECS
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_max_retries() -> u32 {
    DEFAULT_MAX_RETRIES
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            providers: BTreeMap::new(),
            default_provider: None,
            cache_enabled: DEFAULT_CACHE_ENABLED,
            cache_ttl: DEFAULT_CACHE_TTL_SECS,
            timeout: DEFAULT_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }
}

impl Settings {
    /// Build settings from a JSON value without field-level validation.
    /// Prefer [`validate_config`](crate::validation::validate_config) for
    /// operator-facing diagnostics.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value)
            .map_err(|e| IntegratorError::ConfigInvalid(format!("Failed to build Settings: {}", e)))
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        serde_json::from_str(s)
            .map_err(|e| IntegratorError::ConfigInvalid(format!("Invalid settings JSON: {}", e)))
    }

    /// Names of the configured providers, sorted.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.keys().map(String::as_str).collect()
    }
}
