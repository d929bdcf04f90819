//! Operator-facing configuration validation.
//!
//! Every problem is reported as a message naming the provider and the field
//! involved, so a broken configuration can be diagnosed without a stack
//! trace. Shape inference for unknown provider types is a heuristic.

use crate::config::{
    DEFAULT_CACHE_ENABLED, DEFAULT_CACHE_TTL_SECS, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_SECS,
    Settings,
};
use crate::error::{IntegratorError, Result};
use serde_json::{Value, json};

/// Required fields for well-known provider types.
const PROVIDER_REQUIREMENTS: &[(&str, &[&str])] = &[
    ("openai", &["api_key"]),
    ("anthropic", &["api_key"]),
    ("google", &["api_key"]),
    ("local", &["model_path"]),
    ("ollama", &["model_path"]),
    ("llama_cpp", &["model_path"]),
];

/// Marker fields that make an unknown provider look local.
const LOCAL_MARKERS: &[&str] = &["model_path", "weights_path"];

/// Accepted but not enforced by any provider.
const UNENFORCED_FIELDS: &[&str] = &["cache_enabled", "cache_ttl", "timeout", "max_retries"];

/// Required fields for a provider type, or `None` when the type is unknown.
pub fn required_fields(provider_type: &str) -> Option<&'static [&'static str]> {
    PROVIDER_REQUIREMENTS
        .iter()
        .find(|(name, _)| *name == provider_type)
        .map(|(_, fields)| *fields)
}

/// Whether warnings fail validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidationMode {
    /// Warnings are reported but the config is accepted.
    #[default]
    Lenient,
    /// Any warning is treated as an error.
    Strict,
}

/// Outcome of [`validate_config`].
///
/// `settings` is present iff `valid` is true.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub settings: Option<Settings>,
}

impl ValidationReport {
    fn rejected(errors: Vec<String>, warnings: Vec<String>) -> Self {
        Self {
            valid: false,
            errors,
            warnings,
            settings: None,
        }
    }

    /// Turn the report into settings, failing on errors and, in
    /// [`ValidationMode::Strict`], on warnings too.
    pub fn into_settings(self, mode: ValidationMode) -> Result<Settings> {
        if !self.valid {
            return Err(IntegratorError::ConfigInvalid(self.errors.join("; ")));
        }
        if mode == ValidationMode::Strict && !self.warnings.is_empty() {
            return Err(IntegratorError::ConfigInvalid(self.warnings.join("; ")));
        }
        self.settings.ok_or_else(|| {
            IntegratorError::ConfigInvalid("validation produced no settings".to_string())
        })
    }
}

/// Validate one provider configuration.
///
/// The provider type is `provider_type` when given, otherwise the
/// lower-cased `name`. Returns one message per problem; empty means valid.
pub fn validate_provider_config(
    name: &str,
    config: &Value,
    provider_type: Option<&str>,
) -> Vec<String> {
    let Some(config) = config.as_object() else {
        return vec![format!(
            "provider '{}': expected object, got {}",
            name,
            json_type_name(config)
        )];
    };

    let ptype = provider_type
        .map(str::to_string)
        .unwrap_or_else(|| name.to_lowercase());

    let required: &[&str] = match required_fields(&ptype) {
        Some(fields) => fields,
        None if LOCAL_MARKERS.iter().any(|m| config.contains_key(*m)) => {
            if config.contains_key("model_path") {
                &[]
            } else {
                &["model_path"]
            }
        }
        None => &["api_key"],
    };

    let mut errors = Vec::new();
    for field in required {
        match config.get(*field) {
            None => errors.push(format!(
                "provider '{}' missing required field: '{}'",
                name, field
            )),
            Some(value) if is_empty_value(value) => errors.push(format!(
                "provider '{}' has empty value for required field: '{}'",
                name, field
            )),
            Some(_) => {}
        }
    }
    errors
}

/// Validate a raw configuration document.
///
/// Field problems become errors; unenforced fields set to non-default values
/// become warnings. When there are no errors the typed [`Settings`] are built
/// and attached to the report.
pub fn validate_config(config: &Value) -> ValidationReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let Some(root) = config.as_object() else {
        errors.push(format!(
            "configuration must be an object, got {}",
            json_type_name(config)
        ));
        return ValidationReport::rejected(errors, warnings);
    };

    let empty = serde_json::Map::new();
    let providers = match root.get("providers") {
        None => &empty,
        Some(Value::Object(map)) => map,
        Some(other) => {
            errors.push(format!(
                "'providers' must be an object, got {}",
                json_type_name(other)
            ));
            return ValidationReport::rejected(errors, warnings);
        }
    };

    for (name, provider_config) in providers {
        errors.extend(validate_provider_config(name, provider_config, None));
    }

    if let Some(default) = root.get("default_provider").and_then(Value::as_str) {
        if !default.is_empty() && !providers.contains_key(default) {
            let available: Vec<&str> = providers.keys().map(String::as_str).collect();
            errors.push(format!(
                "default_provider '{}' not found in providers. Available: {:?}",
                default, available
            ));
        }
    }

    for field in UNENFORCED_FIELDS {
        if let Some(value) = root.get(*field) {
            if !matches_default(field, value) {
                warnings.push(format!(
                    "'{}' is configured but not yet enforced by providers. Value will be ignored.",
                    field
                ));
            }
        }
    }

    if !errors.is_empty() {
        tracing::debug!(errors = errors.len(), "Configuration rejected");
        return ValidationReport::rejected(errors, warnings);
    }

    match Settings::from_value(config.clone()) {
        Ok(settings) => {
            tracing::debug!(
                providers = settings.providers.len(),
                warnings = warnings.len(),
                "Configuration accepted"
            );
            ValidationReport {
                valid: true,
                errors,
                warnings,
                settings: Some(settings),
            }
        }
        Err(e) => {
            errors.push(match e {
                IntegratorError::ConfigInvalid(msg) => msg,
                other => other.to_string(),
            });
            ValidationReport::rejected(errors, warnings)
        }
    }
}

/// Validate and return settings, or fail with every error `"; "`-joined.
pub fn validate_config_strict(config: &Value) -> Result<Settings> {
    validate_config(config).into_settings(ValidationMode::Lenient)
}

fn default_for(field: &str) -> Value {
    match field {
        "cache_enabled" => json!(DEFAULT_CACHE_ENABLED),
        "cache_ttl" => json!(DEFAULT_CACHE_TTL_SECS),
        "timeout" => json!(DEFAULT_TIMEOUT_SECS),
        "max_retries" => json!(DEFAULT_MAX_RETRIES),
        _ => Value::Null,
    }
}

/// Compares numbers by value so `30.0` matches a default of `30`.
fn matches_default(field: &str, value: &Value) -> bool {
    let default = default_for(field);
    match (value.as_f64(), default.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => *value == default,
    }
}

/// Null, `false`, zero, and empty strings, arrays, or objects count as empty.
fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
