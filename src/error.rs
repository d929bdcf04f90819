//! Error types for the integrator.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, IntegratorError>;

/// Unified error type covering registry lookups, request validation,
/// configuration checks, and backend failures reported by provider adapters.
///
/// Backend adapters translate their native failures into one of the
/// backend-reported variants ([`AuthenticationFailed`](Self::AuthenticationFailed)
/// through [`BackendUnreachable`](Self::BackendUnreachable)) so that callers can
/// match on the failure *category* regardless of which backend produced it.
#[derive(Debug, Error)]
pub enum IntegratorError {
    /// The requested registry entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A default provider was requested but the registry is empty.
    #[error("No {0} providers configured")]
    NoProvidersConfigured(String),

    /// The model is not in the resolved provider's declared model list.
    #[error("Model '{model}' not available from provider '{provider}'")]
    ModelNotFound { model: String, provider: String },

    /// One or more capability or shape violations. Always carries the full list.
    #[error("Validation failed for {subject}: {}", .violations.join("; "))]
    ValidationFailed {
        subject: String,
        violations: Vec<String>,
    },

    /// The backend rejected the credentials.
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// The backend throttled the request.
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// The prompt or output violated the backend's content policy.
    #[error("Content policy violation: {0}")]
    ContentPolicyViolation(String),

    /// The account's generation quota is exhausted.
    #[error("Quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The backend accepted the request but generation failed.
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The backend could not be reached (transport failure, 5xx, local engine down).
    #[error("Backend unreachable: {0}")]
    BackendUnreachable(String),

    /// Aggregate configuration failure with the joined per-field messages.
    #[error("Configuration invalid: {0}")]
    ConfigInvalid(String),
}

impl IntegratorError {
    /// Shorthand for a [`ValidationFailed`](Self::ValidationFailed) with a single violation.
    pub fn validation(subject: impl Into<String>, violation: impl Into<String>) -> Self {
        Self::ValidationFailed {
            subject: subject.into(),
            violations: vec![violation.into()],
        }
    }

    /// Returns `true` for transient backend errors that an adapter may choose
    /// to retry: [`RateLimited`](Self::RateLimited) and
    /// [`BackendUnreachable`](Self::BackendUnreachable).
    ///
    /// The orchestrator itself never retries.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RateLimited(_) | Self::BackendUnreachable(_))
    }

    /// Returns `true` for errors raised before any backend call was attempted.
    pub fn is_pre_dispatch(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::NoProvidersConfigured(_)
                | Self::ModelNotFound { .. }
                | Self::ValidationFailed { .. }
                | Self::ConfigInvalid(_)
        )
    }

    /// Map a non-success HTTP status returned by a remote backend onto the
    /// error taxonomy. Returns `None` for 2xx statuses.
    ///
    /// Intended for adapter implementations; `detail` is usually the response
    /// body or the backend's error message.
    pub fn from_http_status(provider: &str, status: u16, detail: &str) -> Option<Self> {
        let message = if detail.is_empty() {
            format!("{} returned HTTP {}", provider, status)
        } else {
            format!("{} returned HTTP {}: {}", provider, status, detail)
        };
        match status {
            200..=299 => None,
            401 | 403 => Some(Self::AuthenticationFailed(message)),
            402 => Some(Self::QuotaExceeded(message)),
            429 => Some(Self::RateLimited(message)),
            451 => Some(Self::ContentPolicyViolation(message)),
            500..=599 => Some(Self::BackendUnreachable(message)),
            _ => Some(Self::GenerationFailed(message)),
        }
    }
}
