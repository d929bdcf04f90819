//! Request and response contracts shared by every provider, plus the
//! per-dispatch option structs accepted by the [`Orchestrator`](crate::orchestrator::Orchestrator).

use crate::error::{IntegratorError, Result};
use crate::provenance::{ProvenanceContext, ProvenanceEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Reserved metadata key under which the provenance envelope is attached.
pub const PROVENANCE_KEY: &str = "provenance";

/// Inclusive bounds on [`ImageRequest::num_images`].
pub const MIN_IMAGES_PER_REQUEST: u32 = 1;
pub const MAX_IMAGES_PER_REQUEST: u32 = 10;

/// Open key-value bag used for usage, metadata, and provider-specific parameters.
pub type Metadata = serde_json::Map<String, Value>;

/// Standard image dimensions.
///
/// Providers declare the subset they accept via
/// [`ImageProvider::supported_sizes`](crate::traits::ImageProvider::supported_sizes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub enum ImageSize {
    #[serde(rename = "256x256")]
    Small,
    #[serde(rename = "512x512")]
    Medium,
    #[default]
    #[serde(rename = "1024x1024")]
    Large,
    /// Landscape.
    #[serde(rename = "1792x1024")]
    Wide,
    /// Portrait.
    #[serde(rename = "1024x1792")]
    Tall,
}

impl ImageSize {
    pub const ALL: [ImageSize; 5] = [
        Self::Small,
        Self::Medium,
        Self::Large,
        Self::Wide,
        Self::Tall,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Small => "256x256",
            Self::Medium => "512x512",
            Self::Large => "1024x1024",
            Self::Wide => "1792x1024",
            Self::Tall => "1024x1792",
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        match self {
            Self::Small => 256,
            Self::Medium => 512,
            Self::Large | Self::Tall => 1024,
            Self::Wide => 1792,
        }
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        match self {
            Self::Small => 256,
            Self::Medium => 512,
            Self::Large | Self::Wide => 1024,
            Self::Tall => 1792,
        }
    }

    pub fn is_square(&self) -> bool {
        self.width() == self.height()
    }
}

/// Visual style presets, mapped by each provider onto its own parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageStyle {
    #[default]
    Photorealistic,
    Artistic,
    /// Technical drawings, blueprints.
    Technical,
    /// Hand-drawn appearance.
    Sketch,
    Natural,
    Vivid,
}

impl ImageStyle {
    pub const ALL: [ImageStyle; 6] = [
        Self::Photorealistic,
        Self::Artistic,
        Self::Technical,
        Self::Sketch,
        Self::Natural,
        Self::Vivid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photorealistic => "photorealistic",
            Self::Artistic => "artistic",
            Self::Technical => "technical",
            Self::Sketch => "sketch",
            Self::Natural => "natural",
            Self::Vivid => "vivid",
        }
    }
}

/// Output encoding of generated images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ImageFormat {
    #[default]
    Png,
    Jpeg,
    Webp,
    /// Base64-encoded payload embedded in the response.
    B64Json,
}

impl ImageFormat {
    pub const ALL: [ImageFormat; 4] = [Self::Png, Self::Jpeg, Self::Webp, Self::B64Json];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
            Self::Webp => "webp",
            Self::B64Json => "b64_json",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl std::fmt::Display for $ty {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(ImageSize, ImageStyle, ImageFormat);

/// A single turn of prior conversation passed to chat-capable text providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Per-dispatch options for text generation.
///
/// `model` may be omitted for single dispatch (the provider's default model is
/// used) but is required for every entry of a text fan-out.
#[derive(Debug, Clone, PartialEq)]
pub struct TextOptions {
    pub model: Option<String>,
    pub temperature: f64,
    pub max_tokens: Option<u32>,
    pub system_prompt: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Provider-specific parameters passed through untouched.
    pub parameters: Metadata,
    pub provenance: ProvenanceContext,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            model: None,
            temperature: 0.7,
            max_tokens: None,
            system_prompt: None,
            messages: Vec::new(),
            parameters: Metadata::new(),
            provenance: ProvenanceContext::default(),
        }
    }
}

impl TextOptions {
    /// Options naming an explicit model, everything else default.
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: Some(model.into()),
            ..Self::default()
        }
    }
}

/// Per-dispatch options for image generation. Every field has a provider-agnostic
/// default, so `ImageOptions::default()` is always a complete request.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageOptions {
    pub model: Option<String>,
    pub negative_prompt: Option<String>,
    pub size: ImageSize,
    pub style: ImageStyle,
    pub format: ImageFormat,
    pub num_images: u32,
    pub seed: Option<u64>,
    pub quality: String,
    pub parameters: Metadata,
    pub provenance: ProvenanceContext,
}

impl Default for ImageOptions {
    fn default() -> Self {
        Self {
            model: None,
            negative_prompt: None,
            size: ImageSize::default(),
            style: ImageStyle::default(),
            format: ImageFormat::default(),
            num_images: 1,
            seed: None,
            quality: "standard".to_string(),
            parameters: Metadata::new(),
            provenance: ProvenanceContext::default(),
        }
    }
}

fn normalize_prompt(prompt: String) -> Result<String> {
    let trimmed = prompt.trim();
    if trimmed.is_empty() {
        return Err(IntegratorError::validation("request", "prompt cannot be empty"));
    }
    Ok(trimmed.to_string())
}

/// Normalized text generation request handed to a [`TextProvider`](crate::traits::TextProvider).
///
/// The prompt is trimmed and guaranteed non-empty; it can only be set through
/// [`TextRequest::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRequest {
    prompt: String,
    pub model: String,
    pub temperature: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub messages: Vec<ChatMessage>,
    pub parameters: Metadata,
}

impl TextRequest {
    pub fn new(prompt: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            prompt: normalize_prompt(prompt.into())?,
            model: model.into(),
            temperature: 0.7,
            max_tokens: None,
            system_prompt: None,
            messages: Vec::new(),
            parameters: Metadata::new(),
        })
    }

    /// Build a request from dispatch options with an already-resolved model.
    pub fn from_options(
        prompt: impl Into<String>,
        model: impl Into<String>,
        options: &TextOptions,
    ) -> Result<Self> {
        let mut request = Self::new(prompt, model)?;
        request.temperature = options.temperature;
        request.max_tokens = options.max_tokens;
        request.system_prompt = options.system_prompt.clone();
        request.messages = options.messages.clone();
        request.parameters = options.parameters.clone();
        Ok(request)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }
}

/// Normalized image generation request handed to an
/// [`ImageProvider`](crate::traits::ImageProvider).
///
/// The prompt is trimmed and non-empty and `num_images` lies in
/// [`MIN_IMAGES_PER_REQUEST`]..=[`MAX_IMAGES_PER_REQUEST`]; both are checked at
/// construction, never deferred to the backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageRequest {
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    pub size: ImageSize,
    pub style: ImageStyle,
    pub format: ImageFormat,
    num_images: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub quality: String,
    pub parameters: Metadata,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Result<Self> {
        Self::from_options(prompt, &ImageOptions::default())
    }

    pub fn from_options(prompt: impl Into<String>, options: &ImageOptions) -> Result<Self> {
        let prompt = normalize_prompt(prompt.into())?;
        check_num_images(options.num_images)?;
        Ok(Self {
            prompt,
            negative_prompt: options.negative_prompt.clone(),
            size: options.size,
            style: options.style,
            format: options.format,
            num_images: options.num_images,
            seed: options.seed,
            model: options.model.clone(),
            quality: options.quality.clone(),
            parameters: options.parameters.clone(),
        })
    }

    /// Replace the batch size, re-checking the allowed range.
    pub fn with_num_images(mut self, num_images: u32) -> Result<Self> {
        check_num_images(num_images)?;
        self.num_images = num_images;
        Ok(self)
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn num_images(&self) -> u32 {
        self.num_images
    }
}

fn check_num_images(num_images: u32) -> Result<()> {
    if num_images < MIN_IMAGES_PER_REQUEST {
        return Err(IntegratorError::validation(
            "request",
            format!("num_images must be at least {}", MIN_IMAGES_PER_REQUEST),
        ));
    }
    if num_images > MAX_IMAGES_PER_REQUEST {
        return Err(IntegratorError::validation(
            "request",
            format!("num_images cannot exceed {}", MAX_IMAGES_PER_REQUEST),
        ));
    }
    Ok(())
}

fn provenance_in(metadata: &Metadata) -> Option<&Value> {
    metadata.get(PROVENANCE_KEY)
}

/// Result of a single text generation call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextResponse {
    pub text: String,
    /// Model identifier actually used by the backend.
    pub model: String,
    /// Display name of the provider that produced the response.
    pub provider: String,
    #[serde(default)]
    pub usage: Metadata,
    #[serde(default)]
    pub metadata: Metadata,
}

impl TextResponse {
    /// The attached provenance envelope, if any.
    pub fn provenance(&self) -> Option<&Value> {
        provenance_in(&self.metadata)
    }

    pub(crate) fn attach_provenance(&mut self, envelope: &ProvenanceEnvelope) {
        self.metadata
            .insert(PROVENANCE_KEY.to_string(), envelope.to_value());
    }
}

impl std::fmt::Display for TextResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// One image of a generated batch.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedImage {
    /// Raw image bytes, when the backend returns them inline. Serialized as a
    /// `has_data` flag only; the bytes are never written out.
    #[serde(
        rename = "has_data",
        serialize_with = "serialize_presence",
        skip_deserializing
    )]
    pub data: Option<Vec<u8>>,
    /// URL of the hosted image, when the backend returns one.
    pub url: Option<String>,
    /// Prompt as rewritten by the backend, if it rewrites prompts.
    pub revised_prompt: Option<String>,
    /// Zero-based position in the batch.
    pub index: usize,
}

fn serialize_presence<S: serde::Serializer>(
    data: &Option<Vec<u8>>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_bool(data.as_ref().is_some_and(|d| !d.is_empty()))
}

impl GeneratedImage {
    pub fn has_data(&self) -> bool {
        self.data.as_ref().is_some_and(|d| !d.is_empty())
    }

    pub fn has_url(&self) -> bool {
        self.url.as_ref().is_some_and(|u| !u.is_empty())
    }
}

/// Result of a single image generation call.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageResponse {
    pub images: Vec<GeneratedImage>,
    pub model: String,
    pub provider: String,
    #[serde(default)]
    pub usage: Metadata,
    #[serde(default)]
    pub metadata: Metadata,
    pub request_id: Option<String>,
}

impl ImageResponse {
    pub fn image_count(&self) -> usize {
        self.images.len()
    }

    pub fn first_image(&self) -> Option<&GeneratedImage> {
        self.images.first()
    }

    /// URLs of every image that has one, in batch order.
    pub fn image_urls(&self) -> Vec<&str> {
        self.images
            .iter()
            .filter(|img| img.has_url())
            .filter_map(|img| img.url.as_deref())
            .collect()
    }

    /// The attached provenance envelope, if any.
    pub fn provenance(&self) -> Option<&Value> {
        provenance_in(&self.metadata)
    }

    pub(crate) fn attach_provenance(&mut self, envelope: &ProvenanceEnvelope) {
        self.metadata
            .insert(PROVENANCE_KEY.to_string(), envelope.to_value());
        if self.request_id.is_none() {
            self.request_id = Some(envelope.request_id.clone());
        }
    }
}
