#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use uni_integrator::api::{Metadata, TextRequest, TextResponse};
use uni_integrator::error::{IntegratorError, Result};
use uni_integrator::mock::{MockImageProvider, MockTextProvider};
use uni_integrator::orchestrator::Orchestrator;
use uni_integrator::traits::TextProvider;

/// Text provider that records how many calls are in flight at once.
pub struct ConcurrencyProbe {
    delay: Duration,
    in_flight: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ConcurrencyProbe {
    /// Probes sharing the same counters, so the peak is measured across all of them.
    pub fn shared(count: usize, delay_ms: u64) -> (Vec<ConcurrencyProbe>, Arc<AtomicUsize>) {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let probes = (0..count)
            .map(|_| ConcurrencyProbe {
                delay: Duration::from_millis(delay_ms),
                in_flight: in_flight.clone(),
                peak: peak.clone(),
            })
            .collect();
        (probes, peak)
    }
}

#[async_trait]
impl TextProvider for ConcurrencyProbe {
    fn name(&self) -> &str {
        "Probe"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["probe-1".to_string()]
    }

    async fn generate(&self, request: &TextRequest) -> Result<TextResponse> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(TextResponse {
            text: format!("probe: {}", request.prompt()),
            model: request.model.clone(),
            provider: "Probe".to_string(),
            usage: Metadata::new(),
            metadata: Metadata::new(),
        })
    }
}

/// Text provider that always fails with the given backend error.
pub struct FailingTextProvider {
    pub error: fn() -> IntegratorError,
}

#[async_trait]
impl TextProvider for FailingTextProvider {
    fn name(&self) -> &str {
        "Failing"
    }

    fn available_models(&self) -> Vec<String> {
        vec!["fail-1".to_string()]
    }

    async fn generate(&self, _request: &TextRequest) -> Result<TextResponse> {
        Err((self.error)())
    }
}

/// Orchestrator with one healthy and one failing provider of each modality.
pub async fn mixed_orchestrator() -> Orchestrator {
    let orchestrator = Orchestrator::new();
    orchestrator
        .add_provider("ok", Arc::new(MockTextProvider::new()))
        .await;
    orchestrator
        .add_provider("bad", Arc::new(MockTextProvider::new().with_failure(true)))
        .await;
    orchestrator
        .add_image_provider("ok", Arc::new(MockImageProvider::new()))
        .await;
    orchestrator
        .add_image_provider("bad", Arc::new(MockImageProvider::new().with_failure(true)))
        .await;
    orchestrator
}
