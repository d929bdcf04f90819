//! Concurrent fan-out: isolation, completeness, and concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uni_integrator::api::{ImageOptions, TextOptions};
use uni_integrator::error::IntegratorError;
use uni_integrator::mock::MockImageProvider;
use uni_integrator::orchestrator::Orchestrator;
mod common;
use common::{ConcurrencyProbe, mixed_orchestrator};

fn text_entries(entries: &[(&str, Option<&str>)]) -> HashMap<String, TextOptions> {
    entries
        .iter()
        .map(|(name, model)| {
            let options = TextOptions {
                model: model.map(str::to_string),
                ..TextOptions::default()
            };
            (name.to_string(), options)
        })
        .collect()
}

#[tokio::test]
async fn test_text_fan_out_isolates_failures() {
    let orchestrator = mixed_orchestrator().await;

    let results = orchestrator
        .generate_text_fan_out(
            "Explain AI",
            text_entries(&[("ok", Some("mock-small")), ("bad", Some("mock-small"))]),
        )
        .await;

    assert_eq!(results.len(), 2);
    let ok = results["ok"].as_ref().unwrap();
    assert_eq!(ok.text, "Mock response to: 'Explain AI...'");
    assert!(ok.provenance().is_some());
    assert!(matches!(
        results["bad"],
        Err(IntegratorError::GenerationFailed(_))
    ));
}

#[tokio::test]
async fn test_text_fan_out_captures_pre_dispatch_errors() {
    let orchestrator = mixed_orchestrator().await;

    let results = orchestrator
        .generate_text_fan_out(
            "Explain AI",
            text_entries(&[
                ("ok", Some("mock-medium")),
                ("ghost", Some("mock-small")),
                ("bad", None),
            ]),
        )
        .await;

    let keys: Vec<&str> = {
        let mut keys: Vec<&str> = results.keys().map(String::as_str).collect();
        keys.sort();
        keys
    };
    assert_eq!(keys, vec!["bad", "ghost", "ok"]);
    assert!(results["ok"].is_ok());

    let ghost = results["ghost"].as_ref().unwrap_err();
    assert!(matches!(ghost, IntegratorError::NotFound(_)));
    assert_eq!(ghost.to_string(), "text provider 'ghost' not found");

    let bad = results["bad"].as_ref().unwrap_err();
    assert!(bad.is_pre_dispatch());
    assert!(bad.to_string().contains("model not specified for provider 'bad'"));
}

#[tokio::test]
async fn test_text_fan_out_unknown_model_is_per_entry() {
    let orchestrator = mixed_orchestrator().await;

    let results = orchestrator
        .generate_text_fan_out(
            "Explain AI",
            text_entries(&[("ok", Some("gpt-4")), ("bad", Some("mock-small"))]),
        )
        .await;

    assert!(matches!(
        &results["ok"],
        Err(IntegratorError::ModelNotFound { model, provider }) if model == "gpt-4" && provider == "ok"
    ));
    assert!(results["bad"].is_err());
}

#[tokio::test]
async fn test_empty_fan_out_returns_empty_map() {
    let orchestrator = Orchestrator::new();
    let results = orchestrator
        .generate_text_fan_out("Explain AI", HashMap::new())
        .await;
    assert!(results.is_empty());
}

#[tokio::test]
async fn test_fan_out_entries_run_concurrently() {
    let (probes, peak) = ConcurrencyProbe::shared(4, 100);
    let orchestrator = Orchestrator::new();
    let mut entries = HashMap::new();
    for (i, probe) in probes.into_iter().enumerate() {
        let name = format!("probe-{i}");
        orchestrator.add_provider(name.clone(), Arc::new(probe)).await;
        entries.insert(name, TextOptions::with_model("probe-1"));
    }

    let start = Instant::now();
    let results = orchestrator.generate_text_fan_out("ping", entries).await;
    let elapsed = start.elapsed();

    assert_eq!(results.len(), 4);
    assert!(results.values().all(|r| r.is_ok()));
    assert_eq!(peak.load(std::sync::atomic::Ordering::SeqCst), 4);
    // Sequential execution would take at least 400ms.
    assert!(elapsed < Duration::from_millis(350), "fan-out took {elapsed:?}");
}

#[tokio::test]
async fn test_image_fan_out_batch_limits_per_provider() {
    let orchestrator = Orchestrator::new();
    orchestrator
        .add_image_provider("mock", Arc::new(MockImageProvider::new()))
        .await;
    orchestrator
        .add_image_provider("big", Arc::new(MockImageProvider::new().with_max_images(8)))
        .await;

    let mut entries = HashMap::new();
    entries.insert(
        "mock".to_string(),
        ImageOptions {
            num_images: 5,
            ..ImageOptions::default()
        },
    );
    entries.insert(
        "big".to_string(),
        ImageOptions {
            num_images: 5,
            ..ImageOptions::default()
        },
    );

    let results = orchestrator
        .generate_image_fan_out("A lighthouse at dusk", entries)
        .await;

    match &results["mock"] {
        Err(IntegratorError::ValidationFailed { violations, .. }) => {
            assert_eq!(violations, &vec!["num_images (5) exceeds maximum (4)".to_string()]);
        }
        other => panic!("Expected ValidationFailed, got: {:?}", other.as_ref().map(|r| r.image_count())),
    }
    assert_eq!(results["big"].as_ref().unwrap().image_count(), 5);
}

#[tokio::test]
async fn test_image_fan_out_isolates_backend_failures() {
    let orchestrator = mixed_orchestrator().await;

    let mut entries = HashMap::new();
    entries.insert("ok".to_string(), ImageOptions::default());
    entries.insert("bad".to_string(), ImageOptions::default());
    entries.insert("missing".to_string(), ImageOptions::default());

    let results = orchestrator.generate_image_fan_out("A cat", entries).await;
    assert_eq!(results.len(), 3);
    assert_eq!(results["ok"].as_ref().unwrap().image_count(), 1);
    assert!(matches!(results["bad"], Err(IntegratorError::GenerationFailed(_))));
    assert!(matches!(results["missing"], Err(IntegratorError::NotFound(_))));
}
