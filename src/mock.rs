//! Mock text and image providers.
//!
//! They make no network calls and return deterministic placeholder output,
//! which makes them suitable for unit tests, demos, and benchmarks. Both can
//! be configured to fail or to delay, to exercise the orchestrator's
//! isolation and concurrency behavior.

use crate::api::{
    GeneratedImage, ImageRequest, ImageResponse, ImageSize, Metadata, TextRequest, TextResponse,
};
use crate::error::{IntegratorError, Result};
use crate::traits::{DEFAULT_MAX_IMAGES_PER_REQUEST, ImageProvider, TextProvider};
use async_trait::async_trait;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

fn prompt_excerpt(prompt: &str) -> String {
    prompt.chars().take(50).collect()
}

/// Mock text provider serving `mock-small`, `mock-medium`, and `mock-large`.
pub struct MockTextProvider {
    name: String,
    models: Vec<String>,
    fail_on_generate: bool,
    delay_ms: u64,
    weights_hash: Option<String>,
    call_count: AtomicU32,
    last_request: Mutex<Option<TextRequest>>,
}

impl Default for MockTextProvider {
    fn default() -> Self {
        Self {
            name: "Mock Provider".to_string(),
            models: vec![
                "mock-small".to_string(),
                "mock-medium".to_string(),
                "mock-large".to_string(),
            ],
            fail_on_generate: false,
            delay_ms: 0,
            weights_hash: None,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl MockTextProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_failure(mut self, fail: bool) -> Self {
        self.fail_on_generate = fail;
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// Pretend to be a local provider with the given weights hash.
    pub fn with_weights_hash(mut self, hash: impl Into<String>) -> Self {
        self.weights_hash = Some(hash.into());
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<TextRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl TextProvider for MockTextProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn generate(&self, request: &TextRequest) -> Result<TextResponse> {
        let call_count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        if self.fail_on_generate {
            return Err(IntegratorError::GenerationFailed(
                "Mock generation failure".to_string(),
            ));
        }

        let mut text = format!("Mock response to: '{}...'", prompt_excerpt(request.prompt()));
        if let Some(system) = &request.system_prompt {
            text = format!("[System: {}] {}", system, text);
        }

        let prompt_tokens = request.prompt().split_whitespace().count();
        let completion_tokens = text.split_whitespace().count();

        let mut usage = Metadata::new();
        usage.insert("prompt_tokens".into(), json!(prompt_tokens));
        usage.insert("completion_tokens".into(), json!(completion_tokens));
        usage.insert("total_tokens".into(), json!(prompt_tokens + completion_tokens));

        let mut metadata = Metadata::new();
        metadata.insert("call_count".into(), json!(call_count));
        metadata.insert("temperature".into(), json!(request.temperature));
        metadata.insert("max_tokens".into(), json!(request.max_tokens));

        Ok(TextResponse {
            text,
            model: request.model.clone(),
            provider: self.name.clone(),
            usage,
            metadata,
        })
    }

    fn weights_hash(&self) -> Option<String> {
        self.weights_hash.clone()
    }
}

/// Mock image provider serving `mock-image-v1` and `mock-image-v2`.
///
/// Returns one placeholder URL per requested image
/// (`https://mock.example.com/image_{index}.png`).
pub struct MockImageProvider {
    name: String,
    models: Vec<String>,
    sizes: Option<BTreeSet<ImageSize>>,
    max_images: u32,
    fail_on_generate: bool,
    delay_ms: u64,
    call_count: AtomicU32,
    last_request: Mutex<Option<ImageRequest>>,
}

impl Default for MockImageProvider {
    fn default() -> Self {
        Self {
            name: "MockImage".to_string(),
            models: vec!["mock-image-v1".to_string(), "mock-image-v2".to_string()],
            sizes: None,
            max_images: DEFAULT_MAX_IMAGES_PER_REQUEST,
            fail_on_generate: false,
            delay_ms: 0,
            call_count: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }
}

impl MockImageProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_max_images(mut self, max_images: u32) -> Self {
        self.max_images = max_images;
        self
    }

    /// Restrict the supported sizes (all sizes are supported by default).
    pub fn with_sizes(mut self, sizes: impl IntoIterator<Item = ImageSize>) -> Self {
        self.sizes = Some(sizes.into_iter().collect());
        self
    }

    pub fn with_failure(mut self, fail: bool) -> Self {
        self.fail_on_generate = fail;
        self
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    pub fn call_count(&self) -> u32 {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<ImageRequest> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl ImageProvider for MockImageProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn available_models(&self) -> Vec<String> {
        self.models.clone()
    }

    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse> {
        let call_count = self.call_count.fetch_add(1, Ordering::SeqCst) + 1;
        if let Ok(mut last) = self.last_request.lock() {
            *last = Some(request.clone());
        }

        if self.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.delay_ms)).await;
        }

        if self.fail_on_generate {
            return Err(IntegratorError::GenerationFailed(
                "Mock image generation failure".to_string(),
            ));
        }

        let excerpt = prompt_excerpt(request.prompt());
        let images = (0..request.num_images() as usize)
            .map(|index| GeneratedImage {
                data: None,
                url: Some(format!("https://mock.example.com/image_{}.png", index)),
                revised_prompt: Some(format!("Mock revised: {}...", excerpt)),
                index,
            })
            .collect();

        let mut usage = Metadata::new();
        usage.insert("images_generated".into(), json!(request.num_images()));

        let mut metadata = Metadata::new();
        metadata.insert("mock".into(), json!(true));
        metadata.insert("call_count".into(), json!(call_count));

        Ok(ImageResponse {
            images,
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.models.first().cloned().unwrap_or_default()),
            provider: self.name.clone(),
            usage,
            metadata,
            request_id: Some(format!("mock-{}", call_count)),
        })
    }

    fn supported_sizes(&self) -> BTreeSet<ImageSize> {
        match &self.sizes {
            Some(sizes) => sizes.clone(),
            None => ImageSize::ALL.into_iter().collect(),
        }
    }

    fn max_images_per_request(&self) -> u32 {
        self.max_images
    }
}
