//! Capability contracts that every text or image backend must satisfy.

use crate::api::{
    ImageFormat, ImageRequest, ImageResponse, ImageSize, ImageStyle, TextRequest, TextResponse,
};
use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeSet;

/// Default batch limit for image providers that do not declare one.
pub const DEFAULT_MAX_IMAGES_PER_REQUEST: u32 = 4;

/// A backend that generates text.
///
/// Implementations own their transport, credentials, and retries, and map
/// native failures onto [`IntegratorError`](crate::error::IntegratorError).
/// Any mutable state (call counters, lazily built clients) is private to the
/// provider and must use interior mutability.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Display identity of the backend (e.g. `"OpenAI"`).
    fn name(&self) -> &str;

    /// Model identifiers this provider serves, in preference order.
    fn available_models(&self) -> Vec<String>;

    /// Perform one generation call.
    async fn generate(&self, request: &TextRequest) -> Result<TextResponse>;

    /// `true` iff `model` is one of [`available_models`](Self::available_models).
    fn validate_model(&self, model: &str) -> bool {
        self.available_models().iter().any(|m| m == model)
    }

    /// Model used when a single dispatch does not name one. Defaults to the
    /// first available model.
    fn default_model(&self) -> Option<String> {
        self.available_models().into_iter().next()
    }

    /// Hash of the loaded model weights, for local providers.
    fn weights_hash(&self) -> Option<String> {
        None
    }

    /// Hash of the provider's effective configuration, secrets excluded.
    fn config_hash(&self) -> Option<String> {
        None
    }
}

/// A backend that generates images.
///
/// Capability sets default to every known value and the batch limit to
/// [`DEFAULT_MAX_IMAGES_PER_REQUEST`]; override them to restrict.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Display identity of the backend (e.g. `"DALL-E"`).
    fn name(&self) -> &str;

    /// Model identifiers this provider serves, in preference order.
    fn available_models(&self) -> Vec<String>;

    /// Perform one generation call producing `request.num_images()` images.
    async fn generate_image(&self, request: &ImageRequest) -> Result<ImageResponse>;

    fn validate_model(&self, model: &str) -> bool {
        self.available_models().iter().any(|m| m == model)
    }

    fn supported_sizes(&self) -> BTreeSet<ImageSize> {
        ImageSize::ALL.into_iter().collect()
    }

    fn supported_styles(&self) -> BTreeSet<ImageStyle> {
        ImageStyle::ALL.into_iter().collect()
    }

    fn supported_formats(&self) -> BTreeSet<ImageFormat> {
        ImageFormat::ALL.into_iter().collect()
    }

    fn max_images_per_request(&self) -> u32 {
        DEFAULT_MAX_IMAGES_PER_REQUEST
    }

    fn supports_size(&self, size: ImageSize) -> bool {
        self.supported_sizes().contains(&size)
    }

    fn supports_style(&self, style: ImageStyle) -> bool {
        self.supported_styles().contains(&style)
    }

    fn supports_format(&self, format: ImageFormat) -> bool {
        self.supported_formats().contains(&format)
    }

    /// Check `request` against the declared capabilities.
    ///
    /// Every check runs independently and all violations are returned, so a
    /// caller sees every problem in one pass. An empty list means valid.
    fn validate_request(&self, request: &ImageRequest) -> Vec<String> {
        let mut errors = Vec::new();

        if !self.supports_size(request.size) {
            errors.push(format!(
                "Size {} not supported. Supported: {}",
                request.size,
                join_display(self.supported_sizes())
            ));
        }

        if !self.supports_style(request.style) {
            errors.push(format!(
                "Style {} not supported. Supported: {}",
                request.style,
                join_display(self.supported_styles())
            ));
        }

        if !self.supports_format(request.format) {
            errors.push(format!(
                "Format {} not supported. Supported: {}",
                request.format,
                join_display(self.supported_formats())
            ));
        }

        let max = self.max_images_per_request();
        if request.num_images() > max {
            errors.push(format!(
                "num_images ({}) exceeds maximum ({})",
                request.num_images(),
                max
            ));
        }

        if let Some(model) = &request.model {
            if !self.validate_model(model) {
                errors.push(format!(
                    "Model '{}' not available. Available: {}",
                    model,
                    self.available_models().join(", ")
                ));
            }
        }

        errors
    }

    fn weights_hash(&self) -> Option<String> {
        None
    }

    fn config_hash(&self) -> Option<String> {
        None
    }
}

fn join_display<T: std::fmt::Display>(items: impl IntoIterator<Item = T>) -> String {
    items
        .into_iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Introspection view of a registered text provider.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextProviderSummary {
    pub provider_name: String,
    pub models: Vec<String>,
}

impl TextProviderSummary {
    pub fn of(provider: &dyn TextProvider) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            models: provider.available_models(),
        }
    }
}

/// Introspection view of a registered image provider, including its
/// capability sets.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageProviderSummary {
    pub provider_name: String,
    pub models: Vec<String>,
    pub supported_sizes: Vec<ImageSize>,
    pub supported_styles: Vec<ImageStyle>,
    pub supported_formats: Vec<ImageFormat>,
    pub max_images_per_request: u32,
}

impl ImageProviderSummary {
    pub fn of(provider: &dyn ImageProvider) -> Self {
        Self {
            provider_name: provider.name().to_string(),
            models: provider.available_models(),
            supported_sizes: provider.supported_sizes().into_iter().collect(),
            supported_styles: provider.supported_styles().into_iter().collect(),
            supported_formats: provider.supported_formats().into_iter().collect(),
            max_images_per_request: provider.max_images_per_request(),
        }
    }
}
