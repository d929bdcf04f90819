//! Registry operations exposed through the orchestrator.

use std::sync::Arc;
use uni_integrator::api::{ImageOptions, TextOptions};
use uni_integrator::error::IntegratorError;
use uni_integrator::mock::{MockImageProvider, MockTextProvider};
use uni_integrator::orchestrator::Orchestrator;
use uni_integrator::traits::TextProvider;

#[tokio::test]
async fn test_default_reassigned_on_removal() {
    let orchestrator = Orchestrator::new();
    orchestrator
        .add_provider("p1", Arc::new(MockTextProvider::named("One")))
        .await;
    orchestrator
        .add_provider("p2", Arc::new(MockTextProvider::named("Two")))
        .await;
    assert_eq!(orchestrator.default_provider().await.as_deref(), Some("p1"));

    orchestrator.remove_provider("p1").await;
    assert_eq!(orchestrator.default_provider().await.as_deref(), Some("p2"));

    let response = orchestrator
        .generate_text("Hello", None, None, TextOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider, "Two");

    orchestrator.remove_provider("p2").await;
    assert_eq!(orchestrator.default_provider().await, None);
    assert!(matches!(
        orchestrator.get_provider(None).await,
        Err(IntegratorError::NoProvidersConfigured(_))
    ));
}

#[tokio::test]
async fn test_text_and_image_registries_are_independent() {
    let orchestrator = Orchestrator::new();
    orchestrator
        .add_provider("shared", Arc::new(MockTextProvider::new()))
        .await;
    orchestrator
        .add_image_provider("shared", Arc::new(MockImageProvider::new()))
        .await;

    orchestrator.remove_provider("shared").await;
    assert!(orchestrator.get_provider(Some("shared")).await.is_err());
    assert!(orchestrator.get_image_provider(Some("shared")).await.is_ok());
    assert_eq!(
        orchestrator.default_image_provider().await.as_deref(),
        Some("shared")
    );
}

#[tokio::test]
async fn test_set_default_and_explicit_routing() {
    let orchestrator = Orchestrator::new();
    orchestrator
        .add_image_provider("a", Arc::new(MockImageProvider::named("Alpha")))
        .await;
    orchestrator
        .add_image_provider("b", Arc::new(MockImageProvider::named("Beta")))
        .await;

    orchestrator.set_default_image_provider("b").await.unwrap();
    let response = orchestrator
        .generate_image("A cat", None, ImageOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider, "Beta");

    let response = orchestrator
        .generate_image("A cat", Some("a"), ImageOptions::default())
        .await
        .unwrap();
    assert_eq!(response.provider, "Alpha");

    let err = orchestrator
        .set_default_image_provider("zeta")
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "image provider 'zeta' not found");
    assert_eq!(orchestrator.default_image_provider().await.as_deref(), Some("b"));
}

#[tokio::test]
async fn test_list_all_providers_shape() {
    let orchestrator = Orchestrator::builder()
        .text_provider("mock", Arc::new(MockTextProvider::new()))
        .image_provider("mock-image", Arc::new(MockImageProvider::new()))
        .build()
        .unwrap();

    let listing = serde_json::to_value(orchestrator.list_all_providers().await).unwrap();
    assert_eq!(listing["text"]["mock"]["provider_name"], "Mock Provider");
    assert_eq!(
        listing["text"]["mock"]["models"],
        serde_json::json!(["mock-small", "mock-medium", "mock-large"])
    );
    assert_eq!(listing["image"]["mock-image"]["provider_name"], "MockImage");
    assert_eq!(listing["image"]["mock-image"]["max_images_per_request"], 4);
    assert!(
        listing["image"]["mock-image"]["supported_sizes"]
            .as_array()
            .unwrap()
            .contains(&serde_json::json!("1024x1024"))
    );
}

#[tokio::test]
async fn test_overwrite_returns_previous_provider() {
    let orchestrator = Orchestrator::new();
    assert!(
        orchestrator
            .add_provider("p", Arc::new(MockTextProvider::named("Old")))
            .await
            .is_none()
    );
    let previous = orchestrator
        .add_provider("p", Arc::new(MockTextProvider::named("New")))
        .await
        .unwrap();
    assert_eq!(previous.name(), "Old");
    assert_eq!(orchestrator.get_provider(Some("p")).await.unwrap().name(), "New");
}
