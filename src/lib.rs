//! Provider-agnostic orchestration of text and image generation backends.
//!
//! Uni-Integrator routes generation requests to named providers, fans a single
//! prompt out to several providers concurrently with per-entry failure
//! isolation, and stamps every response with a provenance envelope built on
//! deterministic canonical-JSON hashing. A config validator reports broken
//! provider configuration with operator-readable messages.
//!
//! # Key concepts
//!
//! - **[`Orchestrator`](orchestrator::Orchestrator)**: owns two registries
//!   (text and image) and dispatches requests to them.
//! - **Providers**: pluggable backends implementing
//!   [`TextProvider`](traits::TextProvider) or
//!   [`ImageProvider`](traits::ImageProvider). Image providers declare the
//!   sizes, styles, formats, and batch size they support; requests are
//!   validated against them before any backend call.
//! - **Provenance**: [`ProvenanceEnvelope`](provenance::ProvenanceEnvelope)
//!   records who produced what from which input, attached under
//!   `metadata["provenance"]`.
//! - **Configuration**: [`validate_config`](validation::validate_config)
//!   turns a raw JSON document into typed [`Settings`](config::Settings).
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use uni_integrator::api::TextOptions;
//! use uni_integrator::mock::MockTextProvider;
//! use uni_integrator::orchestrator::Orchestrator;
//!
//! # async fn example() -> uni_integrator::error::Result<()> {
//! let orchestrator = Orchestrator::new();
//! orchestrator.add_provider("fast", Arc::new(MockTextProvider::new())).await;
//! orchestrator.add_provider("slow", Arc::new(MockTextProvider::new().with_delay(50))).await;
//!
//! let response = orchestrator
//!     .generate_text("Explain AI", None, None, TextOptions::default())
//!     .await?;
//! println!("{}", response);
//!
//! let mut entries = HashMap::new();
//! entries.insert("fast".to_string(), TextOptions::with_model("mock-small"));
//! entries.insert("slow".to_string(), TextOptions::with_model("mock-large"));
//! for (name, result) in orchestrator.generate_text_fan_out("Explain AI", entries).await {
//!     match result {
//!         Ok(response) => println!("{name}: {response}"),
//!         Err(e) => eprintln!("{name} failed: {e}"),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod mock;
pub mod orchestrator;
pub mod provenance;
pub mod registry;
pub mod traits;
pub mod validation;
