//! End-to-end configuration validation.

use serde_json::json;
use uni_integrator::config::Settings;
use uni_integrator::error::IntegratorError;
use uni_integrator::validation::{ValidationMode, validate_config, validate_config_strict};

#[test]
fn test_mixed_network_and_local_config_is_valid() {
    let config = json!({
        "providers": {
            "openai": {"api_key": "sk-test", "default_model": "gpt-4"},
            "anthropic": {"api_key": "sk-ant", "base_url": "https://api.anthropic.com"},
            "ollama": {"model_path": "/models/llama3", "device": "cuda"},
            "custom": {"api_key": "abc", "parameters": {"region": "eu"}}
        },
        "default_provider": "ollama"
    });

    let settings = validate_config_strict(&config).unwrap();
    assert_eq!(settings.providers.len(), 4);
    assert_eq!(settings.providers["ollama"].device.as_deref(), Some("cuda"));
    assert_eq!(settings.providers["custom"].parameters["region"], "eu");
    assert!(settings.providers["ollama"].is_local());
}

#[test]
fn test_every_problem_is_reported() {
    let report = validate_config(&json!({
        "providers": {
            "openai": {"default_model": "gpt-4"},
            "local": {"model_path": null},
            "weird": 42
        },
        "default_provider": "google",
        "max_retries": 5
    }));

    assert!(!report.valid);
    assert!(report.settings.is_none());
    assert_eq!(
        report.errors,
        vec![
            "provider 'local' has empty value for required field: 'model_path'".to_string(),
            "provider 'openai' missing required field: 'api_key'".to_string(),
            "provider 'weird': expected object, got number".to_string(),
            r#"default_provider 'google' not found in providers. Available: ["local", "openai", "weird"]"#
                .to_string(),
        ]
    );
    assert_eq!(report.warnings.len(), 1);
}

#[test]
fn test_empty_config_is_valid_with_defaults() {
    let report = validate_config(&json!({}));
    assert!(report.valid);
    assert_eq!(report.settings.unwrap(), Settings::default());
}

#[test]
fn test_strict_mode_and_error_variant() {
    let config = json!({
        "providers": {"openai": {"api_key": "sk"}},
        "timeout": 120
    });
    let report = validate_config(&config);
    assert!(report.valid);
    assert!(matches!(
        report.into_settings(ValidationMode::Strict),
        Err(IntegratorError::ConfigInvalid(_))
    ));

    let err = validate_config_strict(&json!({"providers": "openai"})).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Configuration invalid: 'providers' must be an object, got string"
    );
}
