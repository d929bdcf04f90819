//! The orchestrator that routes generation requests to registered providers.

use crate::api::{
    ImageOptions, ImageRequest, ImageResponse, TextOptions, TextRequest, TextResponse,
};
use crate::error::{IntegratorError, Result};
use crate::provenance::{EnvelopeFields, ProvenanceContext, ProvenanceEnvelope, create_envelope};
use crate::registry::{ProviderListing, ProviderRegistry};
use crate::traits::{ImageProvider, ImageProviderSummary, TextProvider, TextProviderSummary};
use futures::future::join_all;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Routes text and image generation requests to named providers.
///
/// Holds two independent registries, one per modality, each behind its own
/// async lock. Provider handles are cloned out of a registry before any
/// backend call is awaited, so registry mutations never wait on in-flight
/// generation and in-flight generation never observes a half-applied
/// mutation.
///
/// Every successful response carries a provenance envelope under
/// `metadata["provenance"]`.
pub struct Orchestrator {
    text: RwLock<ProviderRegistry<dyn TextProvider>>,
    image: RwLock<ProviderRegistry<dyn ImageProvider>>,
}

impl Default for Orchestrator {
    fn default() -> Self {
        Self::new()
    }
}

impl Orchestrator {
    /// Create an orchestrator with empty registries.
    pub fn new() -> Self {
        Self {
            text: RwLock::new(ProviderRegistry::new("text")),
            image: RwLock::new(ProviderRegistry::new("image")),
        }
    }

    /// Create an [`OrchestratorBuilder`] for registering providers up front.
    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    // ------------------------------------------------------------------
    // Text registry
    // ------------------------------------------------------------------

    /// Register a text provider under `name`, replacing any previous entry.
    /// The first provider registered becomes the default.
    pub async fn add_provider(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn TextProvider>,
    ) -> Option<Arc<dyn TextProvider>> {
        let name = name.into();
        tracing::info!(provider = %name, backend = %provider.name(), "Registering text provider");
        self.text.write().await.add(name, provider)
    }

    /// Remove a text provider. Removing an unknown name is a no-op.
    pub async fn remove_provider(&self, name: &str) -> Option<Arc<dyn TextProvider>> {
        let removed = self.text.write().await.remove(name);
        if removed.is_some() {
            tracing::info!(provider = %name, "Removed text provider");
        }
        removed
    }

    pub async fn set_default_provider(&self, name: &str) -> Result<()> {
        self.text.write().await.set_default(name)
    }

    /// Look up a text provider by name, or the default when `name` is `None`.
    pub async fn get_provider(&self, name: Option<&str>) -> Result<Arc<dyn TextProvider>> {
        self.text.read().await.get(name)
    }

    pub async fn default_provider(&self) -> Option<String> {
        self.text.read().await.default_name().map(str::to_string)
    }

    pub async fn list_providers(&self) -> BTreeMap<String, TextProviderSummary> {
        self.text.read().await.list()
    }

    // ------------------------------------------------------------------
    // Image registry
    // ------------------------------------------------------------------

    /// Register an image provider under `name`, replacing any previous entry.
    /// The first provider registered becomes the default.
    pub async fn add_image_provider(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn ImageProvider>,
    ) -> Option<Arc<dyn ImageProvider>> {
        let name = name.into();
        tracing::info!(provider = %name, backend = %provider.name(), "Registering image provider");
        self.image.write().await.add(name, provider)
    }

    pub async fn remove_image_provider(&self, name: &str) -> Option<Arc<dyn ImageProvider>> {
        let removed = self.image.write().await.remove(name);
        if removed.is_some() {
            tracing::info!(provider = %name, "Removed image provider");
        }
        removed
    }

    pub async fn set_default_image_provider(&self, name: &str) -> Result<()> {
        self.image.write().await.set_default(name)
    }

    pub async fn get_image_provider(&self, name: Option<&str>) -> Result<Arc<dyn ImageProvider>> {
        self.image.read().await.get(name)
    }

    pub async fn default_image_provider(&self) -> Option<String> {
        self.image.read().await.default_name().map(str::to_string)
    }

    pub async fn list_image_providers(&self) -> BTreeMap<String, ImageProviderSummary> {
        self.image.read().await.list()
    }

    /// Both registries in one view.
    pub async fn list_all_providers(&self) -> ProviderListing {
        ProviderListing {
            text: self.list_providers().await,
            image: self.list_image_providers().await,
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Generate text with one provider.
    ///
    /// `provider` defaults to the default text provider. The model is
    /// resolved from `model`, then `options.model`, then the provider's
    /// [`default_model`](TextProvider::default_model). Fails with
    /// [`IntegratorError::ModelNotFound`] before any backend call when the
    /// provider does not serve the model.
    #[tracing::instrument(skip_all, fields(provider, model))]
    pub async fn generate_text(
        &self,
        prompt: &str,
        model: Option<&str>,
        provider: Option<&str>,
        options: TextOptions,
    ) -> Result<TextResponse> {
        let (name, handle) = self.text.read().await.resolve(provider)?;
        let model = match model.map(str::to_string).or_else(|| options.model.clone()) {
            Some(model) => model,
            None => handle.default_model().ok_or_else(|| missing_model(&name))?,
        };
        tracing::Span::current().record("provider", name.as_str());
        tracing::Span::current().record("model", model.as_str());

        dispatch_text(&name, handle, prompt, model, &options).await
    }

    /// Generate images with one provider.
    ///
    /// The request is checked against the provider's capabilities first; on
    /// any violation the call fails with [`IntegratorError::ValidationFailed`]
    /// carrying every violation, and the backend is never invoked.
    #[tracing::instrument(skip_all, fields(provider))]
    pub async fn generate_image(
        &self,
        prompt: &str,
        provider: Option<&str>,
        options: ImageOptions,
    ) -> Result<ImageResponse> {
        let (name, handle) = self.image.read().await.resolve(provider)?;
        tracing::Span::current().record("provider", name.as_str());

        dispatch_image(&name, handle, prompt, &options).await
    }

    /// Send the same prompt to several text providers concurrently.
    ///
    /// Keys name registered providers; each entry's options must name a
    /// model. The returned map has exactly the input keys. A failing entry
    /// (unknown provider, missing or unknown model, backend error) yields an
    /// `Err` for that key only and never affects its siblings.
    pub async fn generate_text_fan_out(
        &self,
        prompt: &str,
        entries: HashMap<String, TextOptions>,
    ) -> HashMap<String, Result<TextResponse>> {
        metrics::counter!("provider_fan_out.total", "kind" => "text").increment(1);
        tracing::info!(entries = entries.len(), "Text fan-out started");

        let resolved: Vec<_> = {
            let registry = self.text.read().await;
            entries
                .into_iter()
                .map(|(name, options)| {
                    let handle = registry.get(Some(&name));
                    (name, handle, options)
                })
                .collect()
        };

        let calls = resolved.into_iter().map(|(name, handle, options)| async move {
            let result = match (handle, options.model.clone()) {
                (Err(e), _) => Err(e),
                (Ok(_), None) => Err(missing_model(&name)),
                (Ok(handle), Some(model)) => {
                    dispatch_text(&name, handle, prompt, model, &options).await
                }
            };
            if let Err(e) = &result {
                tracing::warn!(provider = %name, error = %e, "Fan-out entry failed");
            }
            (name, result)
        });

        join_all(calls).await.into_iter().collect()
    }

    /// Send the same prompt to several image providers concurrently.
    ///
    /// Each entry is validated against its own provider's capabilities.
    /// Failures are captured per key exactly as in
    /// [`generate_text_fan_out`](Self::generate_text_fan_out).
    pub async fn generate_image_fan_out(
        &self,
        prompt: &str,
        entries: HashMap<String, ImageOptions>,
    ) -> HashMap<String, Result<ImageResponse>> {
        metrics::counter!("provider_fan_out.total", "kind" => "image").increment(1);
        tracing::info!(entries = entries.len(), "Image fan-out started");

        let resolved: Vec<_> = {
            let registry = self.image.read().await;
            entries
                .into_iter()
                .map(|(name, options)| {
                    let handle = registry.get(Some(&name));
                    (name, handle, options)
                })
                .collect()
        };

        let calls = resolved.into_iter().map(|(name, handle, options)| async move {
            let result = match handle {
                Ok(handle) => dispatch_image(&name, handle, prompt, &options).await,
                Err(e) => Err(e),
            };
            if let Err(e) = &result {
                tracing::warn!(provider = %name, error = %e, "Fan-out entry failed");
            }
            (name, result)
        });

        join_all(calls).await.into_iter().collect()
    }
}

fn missing_model(provider: &str) -> IntegratorError {
    IntegratorError::validation(
        format!("text provider '{}'", provider),
        format!("model not specified for provider '{}'", provider),
    )
}

async fn dispatch_text(
    name: &str,
    provider: Arc<dyn TextProvider>,
    prompt: &str,
    model: String,
    options: &TextOptions,
) -> Result<TextResponse> {
    let request = TextRequest::from_options(prompt, model, options)?;
    if !provider.validate_model(&request.model) {
        record_rejection("text", name);
        return Err(IntegratorError::ModelNotFound {
            model: request.model,
            provider: name.to_string(),
        });
    }

    let envelope = envelope_for(
        &request.model,
        provider.name(),
        request.prompt(),
        text_input_packet(name, &request),
        &options.provenance,
        provider.weights_hash(),
        provider.config_hash(),
    );

    tracing::debug!(provider = %name, model = %request.model, "Dispatching text request");
    let start = Instant::now();
    let result = provider.generate(&request).await;
    let elapsed = start.elapsed();
    record_dispatch("text", name, result.is_ok(), elapsed);

    let mut response = result.inspect_err(|e| {
        tracing::error!(provider = %name, error = %e, "Text generation failed");
    })?;
    response.attach_provenance(&envelope.with_latency_ms(millis(elapsed)));
    Ok(response)
}

async fn dispatch_image(
    name: &str,
    provider: Arc<dyn ImageProvider>,
    prompt: &str,
    options: &ImageOptions,
) -> Result<ImageResponse> {
    let request = ImageRequest::from_options(prompt, options)?;

    let violations = provider.validate_request(&request);
    if !violations.is_empty() {
        record_rejection("image", name);
        tracing::warn!(provider = %name, violations = violations.len(), "Image request rejected");
        return Err(IntegratorError::ValidationFailed {
            subject: format!("image provider '{}'", name),
            violations,
        });
    }

    let model = request
        .model
        .clone()
        .or_else(|| provider.available_models().into_iter().next())
        .unwrap_or_default();
    let mut envelope = envelope_for(
        &model,
        provider.name(),
        request.prompt(),
        image_input_packet(name, &request),
        &options.provenance,
        provider.weights_hash(),
        provider.config_hash(),
    );

    tracing::debug!(provider = %name, num_images = request.num_images(), "Dispatching image request");
    let start = Instant::now();
    let result = provider.generate_image(&request).await;
    let elapsed = start.elapsed();
    record_dispatch("image", name, result.is_ok(), elapsed);

    let mut response = result.inspect_err(|e| {
        tracing::error!(provider = %name, error = %e, "Image generation failed");
    })?;
    // Providers without a declared model list report the model only in the response.
    if envelope.model_id.is_empty() {
        envelope.model_id = response.model.clone();
    }
    response.attach_provenance(&envelope.with_latency_ms(millis(elapsed)));
    Ok(response)
}

fn envelope_for(
    model: &str,
    provider_name: &str,
    prompt: &str,
    packet: Value,
    context: &ProvenanceContext,
    weights_hash: Option<String>,
    provider_config_hash: Option<String>,
) -> ProvenanceEnvelope {
    create_envelope(
        model,
        provider_name,
        EnvelopeFields {
            input_content: Some(prompt.to_string()),
            input_packet: Some(packet),
            weights_hash,
            provider_config_hash,
            ..EnvelopeFields::from_context(context)
        },
    )
}

/// Everything that determines a text generation's output.
fn text_input_packet(provider: &str, request: &TextRequest) -> Value {
    json!({
        "prompt": request.prompt(),
        "model": request.model,
        "provider": provider,
        "params": {
            "temperature": request.temperature,
            "max_tokens": request.max_tokens,
            "system_prompt": request.system_prompt,
            "messages": request.messages,
        },
        "parameters": request.parameters,
    })
}

/// Everything that determines an image generation's output.
fn image_input_packet(provider: &str, request: &ImageRequest) -> Value {
    json!({
        "prompt": request.prompt(),
        "model": request.model,
        "provider": provider,
        "params": {
            "negative_prompt": request.negative_prompt,
            "size": request.size.as_str(),
            "style": request.style.as_str(),
            "format": request.format.as_str(),
            "num_images": request.num_images(),
            "seed": request.seed,
            "quality": request.quality,
        },
        "parameters": request.parameters,
    })
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

fn record_dispatch(kind: &'static str, provider: &str, ok: bool, elapsed: Duration) {
    let status = if ok { "success" } else { "failure" };

    metrics::histogram!(
        "provider_dispatch.duration_seconds",
        "kind" => kind,
        "provider" => provider.to_string()
    )
    .record(elapsed.as_secs_f64());

    metrics::counter!(
        "provider_dispatch.total",
        "kind" => kind,
        "provider" => provider.to_string(),
        "status" => status
    )
    .increment(1);
}

fn record_rejection(kind: &'static str, provider: &str) {
    metrics::counter!(
        "provider_dispatch.total",
        "kind" => kind,
        "provider" => provider.to_string(),
        "status" => "rejected"
    )
    .increment(1);
}

/// Builder for an [`Orchestrator`] with providers registered up front.
///
/// ```rust
/// # use std::sync::Arc;
/// # use uni_integrator::mock::{MockImageProvider, MockTextProvider};
/// # use uni_integrator::orchestrator::Orchestrator;
/// let orchestrator = Orchestrator::builder()
///     .text_provider("mock", Arc::new(MockTextProvider::new()))
///     .image_provider("mock-image", Arc::new(MockImageProvider::new()))
///     .build()
///     .unwrap();
/// ```
#[derive(Default)]
pub struct OrchestratorBuilder {
    text: Vec<(String, Arc<dyn TextProvider>)>,
    image: Vec<(String, Arc<dyn ImageProvider>)>,
    default_text: Option<String>,
    default_image: Option<String>,
}

impl OrchestratorBuilder {
    /// Register a text provider. Registration order decides the initial
    /// default and the fallback order when a default is removed.
    pub fn text_provider(mut self, name: impl Into<String>, provider: Arc<dyn TextProvider>) -> Self {
        self.text.push((name.into(), provider));
        self
    }

    pub fn image_provider(
        mut self,
        name: impl Into<String>,
        provider: Arc<dyn ImageProvider>,
    ) -> Self {
        self.image.push((name.into(), provider));
        self
    }

    pub fn default_text_provider(mut self, name: impl Into<String>) -> Self {
        self.default_text = Some(name.into());
        self
    }

    pub fn default_image_provider(mut self, name: impl Into<String>) -> Self {
        self.default_image = Some(name.into());
        self
    }

    /// Build the orchestrator. Fails with [`IntegratorError::NotFound`] when
    /// a requested default names no registered provider.
    pub fn build(self) -> Result<Orchestrator> {
        let mut text = ProviderRegistry::new("text");
        for (name, provider) in self.text {
            text.add(name, provider);
        }
        if let Some(name) = &self.default_text {
            text.set_default(name)?;
        }

        let mut image = ProviderRegistry::new("image");
        for (name, provider) in self.image {
            image.add(name, provider);
        }
        if let Some(name) = &self.default_image {
            image.set_default(name)?;
        }

        Ok(Orchestrator {
            text: RwLock::new(text),
            image: RwLock::new(image),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ImageSize;
    use crate::mock::{MockImageProvider, MockTextProvider};
    use crate::provenance::{hash_input_packet, validate_envelope};

    #[tokio::test]
    async fn generate_text_uses_default_provider_and_model() {
        let mock = Arc::new(MockTextProvider::new());
        let orchestrator = Orchestrator::new();
        orchestrator.add_provider("mock", mock.clone()).await;

        let response = orchestrator
            .generate_text("Hello", None, None, TextOptions::default())
            .await
            .unwrap();
        assert_eq!(response.model, "mock-small");
        assert_eq!(mock.call_count(), 1);

        let provenance = response.provenance().unwrap();
        assert!(validate_envelope(provenance).is_empty());
        assert_eq!(provenance["model_id"], "mock-small");
        assert_eq!(provenance["provider_name"], "Mock Provider");
        assert!(provenance.get("latency_ms").is_some());
    }

    #[tokio::test]
    async fn unknown_model_fails_before_backend() {
        let mock = Arc::new(MockTextProvider::new());
        let orchestrator = Orchestrator::new();
        orchestrator.add_provider("mock", mock.clone()).await;

        let err = orchestrator
            .generate_text("Hello", Some("gpt-9"), Some("mock"), TextOptions::default())
            .await
            .unwrap_err();
        match err {
            IntegratorError::ModelNotFound { model, provider } => {
                assert_eq!(model, "gpt-9");
                assert_eq!(provider, "mock");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn empty_registries_report_no_providers() {
        let orchestrator = Orchestrator::new();
        let err = orchestrator
            .generate_text("Hello", None, None, TextOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No text providers configured");

        let err = orchestrator
            .generate_image("A cat", None, ImageOptions::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No image providers configured");
    }

    #[tokio::test]
    async fn image_validation_blocks_backend_call() {
        let mock = Arc::new(MockImageProvider::new().with_sizes([ImageSize::Large]));
        let orchestrator = Orchestrator::new();
        orchestrator.add_image_provider("mock", mock.clone()).await;

        let options = ImageOptions {
            size: ImageSize::Wide,
            num_images: 6,
            ..ImageOptions::default()
        };
        let err = orchestrator
            .generate_image("A cat", Some("mock"), options)
            .await
            .unwrap_err();
        match err {
            IntegratorError::ValidationFailed { violations, .. } => assert_eq!(violations.len(), 2),
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn image_response_carries_envelope_request_id_from_backend() {
        let orchestrator = Orchestrator::builder()
            .image_provider("mock", Arc::new(MockImageProvider::new()))
            .build()
            .unwrap();
        let response = orchestrator
            .generate_image("A cat", None, ImageOptions::default())
            .await
            .unwrap();
        assert_eq!(response.request_id.as_deref(), Some("mock-1"));
        assert_eq!(response.provenance().unwrap()["model_id"], "mock-image-v1");
    }

    #[tokio::test]
    async fn text_fan_out_requires_model_per_entry() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_provider("mock", Arc::new(MockTextProvider::new()))
            .await;

        let mut entries = HashMap::new();
        entries.insert("mock".to_string(), TextOptions::default());
        let results = orchestrator.generate_text_fan_out("Hello", entries).await;

        let err = results["mock"].as_ref().unwrap_err();
        assert!(err.to_string().contains("model not specified for provider 'mock'"));
    }

    #[tokio::test]
    async fn builder_rejects_unknown_default() {
        let result = Orchestrator::builder()
            .text_provider("a", Arc::new(MockTextProvider::new()))
            .default_text_provider("b")
            .build();
        assert!(matches!(result, Err(IntegratorError::NotFound(_))));
    }

    #[tokio::test]
    async fn provenance_context_flows_into_envelope() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_provider("mock", Arc::new(MockTextProvider::new().with_weights_hash("abc123")))
            .await;

        let options = TextOptions {
            provenance: ProvenanceContext {
                template_id: Some("summary".into()),
                template_version: Some("2".into()),
                policies: vec!["pii-redaction".into()],
            },
            ..TextOptions::with_model("mock-large")
        };
        let response = orchestrator
            .generate_text("Summarize this", None, None, options)
            .await
            .unwrap();
        let envelope = ProvenanceEnvelope::from_value(response.provenance().unwrap().clone()).unwrap();
        assert_eq!(envelope.template_id.as_deref(), Some("summary"));
        assert_eq!(envelope.policies_applied, vec!["pii-redaction"]);
        assert_eq!(envelope.weights_hash.as_deref(), Some("abc123"));
        assert_eq!(envelope.model_id, "mock-large");
        assert!(envelope.input_sha256.is_some());
    }

    #[tokio::test]
    async fn input_sha256_matches_hash_of_caller_packet() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_provider("mock", Arc::new(MockTextProvider::new()))
            .await;

        let response = orchestrator
            .generate_text("Explain AI", Some("mock-small"), None, TextOptions::default())
            .await
            .unwrap();

        let packet = json!({
            "prompt": "Explain AI",
            "model": "mock-small",
            "provider": "mock",
            "params": {
                "temperature": 0.7,
                "max_tokens": null,
                "system_prompt": null,
                "messages": []
            },
            "parameters": {}
        });
        assert_eq!(
            response.provenance().unwrap()["input_sha256"],
            json!(hash_input_packet(&packet))
        );
    }

    struct UnlistedModelProvider;

    #[async_trait::async_trait]
    impl ImageProvider for UnlistedModelProvider {
        fn name(&self) -> &str {
            "Local SD"
        }

        fn available_models(&self) -> Vec<String> {
            Vec::new()
        }

        async fn generate_image(&self, _request: &ImageRequest) -> Result<ImageResponse> {
            Ok(ImageResponse {
                model: "sd-local".to_string(),
                provider: "Local SD".to_string(),
                ..ImageResponse::default()
            })
        }
    }

    #[tokio::test]
    async fn envelope_model_falls_back_to_reported_model() {
        let orchestrator = Orchestrator::new();
        orchestrator
            .add_image_provider("sd", Arc::new(UnlistedModelProvider))
            .await;

        let response = orchestrator
            .generate_image("A cat", None, ImageOptions::default())
            .await
            .unwrap();
        let provenance = response.provenance().unwrap();
        assert_eq!(provenance["model_id"], "sd-local");
        assert!(validate_envelope(provenance).is_empty());
    }
}
