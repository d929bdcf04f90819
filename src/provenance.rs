//! Provenance envelopes, canonical JSON, and content hashing.
//!
//! Every dispatch produces a [`ProvenanceEnvelope`] describing which provider
//! and model handled the request and what input it saw. Envelopes are
//! *advisory*: `governance_safe` means "not yet rejected", not "verified safe".
//! Persisting or enforcing policy on them is left to a downstream governed
//! system.
//!
//! Input hashes are computed over [`canonicalize`]d JSON so that two logically
//! identical packets hash identically regardless of object key order.

use crate::error::{IntegratorError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Number of hex characters kept from the SHA-256 digest.
///
/// Collisions at this length are acceptable for audit trails, not for
/// security-sensitive deduplication.
pub const HASH_HEX_LEN: usize = 16;

/// Envelope fields that must be present and non-empty.
pub const REQUIRED_FIELDS: [&str; 4] = ["request_id", "timestamp", "model_id", "provider_name"];

/// Caller-supplied provenance inputs carried on dispatch options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvenanceContext {
    pub template_id: Option<String>,
    pub template_version: Option<String>,
    /// Names of governance policies applied upstream, in application order.
    #[serde(default)]
    pub policies: Vec<String>,
}

/// Structured provenance record for one dispatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProvenanceEnvelope {
    pub request_id: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_version: Option<String>,
    /// Hash of the raw input content (usually the prompt).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_hash: Option<String>,
    /// Hash of the canonical input packet, for replay comparison.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_sha256: Option<String>,
    #[serde(default)]
    pub model_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_version: Option<String>,
    /// Model weights hash reported by local providers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weights_hash: Option<String>,
    #[serde(default)]
    pub provider_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_config_hash: Option<String>,
    #[serde(default)]
    pub policies_applied: Vec<String>,
    #[serde(default = "default_governance_safe")]
    pub governance_safe: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

fn default_governance_safe() -> bool {
    true
}

impl ProvenanceEnvelope {
    /// Serialize to a JSON object, omitting absent optional fields.
    pub fn to_value(&self) -> Value {
        // Plain strings, bools and integers only; serialization cannot fail.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Parse an envelope relayed from elsewhere. Unknown keys are ignored.
    ///
    /// Parsing does not check that required fields are non-empty; run
    /// [`validate_envelope`] first when the source is untrusted.
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            IntegratorError::validation("provenance envelope", format!("invalid envelope: {}", e))
        })
    }

    /// Copy of this envelope with the measured backend latency filled in.
    pub fn with_latency_ms(self, latency_ms: u64) -> Self {
        Self {
            latency_ms: Some(latency_ms),
            ..self
        }
    }
}

/// Optional inputs to [`create_envelope`].
#[derive(Debug, Clone, Default)]
pub struct EnvelopeFields {
    /// Explicit request id; a UUIDv4 is generated when `None`.
    pub request_id: Option<String>,
    /// Explicit timestamp; the current UTC time is used when `None`.
    pub timestamp: Option<String>,
    pub template_id: Option<String>,
    pub template_version: Option<String>,
    /// Raw input hashed into `input_hash`. Empty content is treated as absent.
    pub input_content: Option<String>,
    /// Structured input packet hashed into `input_sha256`.
    pub input_packet: Option<Value>,
    pub model_version: Option<String>,
    pub weights_hash: Option<String>,
    pub provider_config_hash: Option<String>,
    pub policies: Vec<String>,
}

impl EnvelopeFields {
    /// Seed the template and policy fields from a dispatch-level context.
    pub fn from_context(context: &ProvenanceContext) -> Self {
        Self {
            template_id: context.template_id.clone(),
            template_version: context.template_version.clone(),
            policies: context.policies.clone(),
            ..Self::default()
        }
    }
}

/// Generate a globally unique request id.
pub fn generate_request_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Current time as an RFC 3339 UTC timestamp.
pub fn utc_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Build a provenance envelope. Aside from the generated request id and
/// timestamp, the result is a pure function of the inputs.
pub fn create_envelope(
    model_id: impl Into<String>,
    provider_name: impl Into<String>,
    fields: EnvelopeFields,
) -> ProvenanceEnvelope {
    ProvenanceEnvelope {
        request_id: fields.request_id.unwrap_or_else(generate_request_id),
        timestamp: fields.timestamp.unwrap_or_else(utc_timestamp),
        template_id: fields.template_id,
        template_version: fields.template_version,
        input_hash: fields
            .input_content
            .filter(|content| !content.is_empty())
            .map(|content| hash_content(&content)),
        input_sha256: fields.input_packet.as_ref().map(hash_input_packet),
        model_id: model_id.into(),
        model_version: fields.model_version,
        weights_hash: fields.weights_hash,
        provider_name: provider_name.into(),
        provider_config_hash: fields.provider_config_hash,
        policies_applied: fields.policies,
        governance_safe: true,
        latency_ms: None,
    }
}

/// Check that the required envelope fields are present and non-empty.
///
/// Returns one message per offending field; an empty list means the envelope
/// is structurally usable. Non-object input reports every required field.
pub fn validate_envelope(envelope: &Value) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|field| envelope.get(**field).is_none_or(is_blank))
        .map(|field| format!("provenance missing required field: '{}'", field))
        .collect()
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// Serialize `value` as canonical JSON: object keys sorted lexicographically
/// at every depth, no whitespace, arrays kept in order.
pub fn canonicalize(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => write_json_string(s, out),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            out.push('{');
            for (i, (key, item)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_json_string(key, out);
                out.push(':');
                write_canonical(item, out);
            }
            out.push('}');
        }
    }
}

/// JSON string with every character outside printable ASCII escaped as
/// lowercase `\uXXXX` (UTF-16 surrogate pairs above U+FFFF), matching
/// ASCII-only canonical JSON produced by other systems.
fn write_json_string(s: &str, out: &mut String) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            ' '..='~' => out.push(c),
            _ => {
                let mut units = [0u16; 2];
                for unit in c.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}

/// SHA-256 of the UTF-8 bytes of `content`, as a [`HASH_HEX_LEN`]-character hex prefix.
pub fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..HASH_HEX_LEN].to_string()
}

/// Canonicalize then hash. Semantically identical packets produce identical
/// digests regardless of field order.
pub fn hash_input_packet(packet: &Value) -> String {
    hash_content(&canonicalize(packet))
}

/// Canonically hash any serializable value.
pub fn hash_value<T: Serialize>(value: &T) -> Result<String> {
    let value = serde_json::to_value(value).map_err(|e| {
        IntegratorError::validation("hash input", format!("value is not representable as JSON: {}", e))
    })?;
    Ok(hash_input_packet(&value))
}
