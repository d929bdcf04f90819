//! Name-keyed provider registries with "current default" tracking.

use crate::error::{IntegratorError, Result};
use crate::traits::{ImageProvider, ImageProviderSummary, TextProvider, TextProviderSummary};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

struct Entry<P: ?Sized> {
    seq: u64,
    provider: Arc<P>,
}

/// Maps caller-chosen names to providers and tracks a default entry.
///
/// The first registered entry becomes the default. When the default is
/// removed, the earliest-registered remaining entry takes over; an empty
/// registry has no default. The default, when set, always names a present
/// entry.
///
/// A registry is a plain value with no internal locking. The
/// [`Orchestrator`](crate::orchestrator::Orchestrator) guards each of its two
/// registries with its own lock.
pub struct ProviderRegistry<P: ?Sized> {
    kind: &'static str,
    entries: HashMap<String, Entry<P>>,
    /// Insertion sequence -> name, used to pick a successor default deterministically.
    order: BTreeMap<u64, String>,
    next_seq: u64,
    default: Option<String>,
}

impl<P: ?Sized> ProviderRegistry<P> {
    /// Create an empty registry. `kind` (e.g. `"text"`) is used in error messages.
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            default: None,
        }
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    /// Insert or replace `name`. Replacing keeps the entry's original position.
    /// Returns the provider previously registered under `name`, if any.
    pub fn add(&mut self, name: impl Into<String>, provider: Arc<P>) -> Option<Arc<P>> {
        let name = name.into();
        let previous = match self.entries.get_mut(&name) {
            Some(entry) => Some(std::mem::replace(&mut entry.provider, provider)),
            None => {
                let seq = self.next_seq;
                self.next_seq += 1;
                self.order.insert(seq, name.clone());
                self.entries.insert(name.clone(), Entry { seq, provider });
                None
            }
        };

        if self.default.is_none() {
            tracing::debug!(kind = self.kind, provider = %name, "Default provider set");
            self.default = Some(name);
        }
        previous
    }

    /// Remove `name` if present, reassigning the default when needed.
    pub fn remove(&mut self, name: &str) -> Option<Arc<P>> {
        let entry = self.entries.remove(name)?;
        self.order.remove(&entry.seq);

        if self.default.as_deref() == Some(name) {
            self.default = self.order.values().next().cloned();
            tracing::debug!(
                kind = self.kind,
                removed = %name,
                default = ?self.default,
                "Default provider reassigned"
            );
        }
        Some(entry.provider)
    }

    /// Make `name` the default. Fails with [`IntegratorError::NotFound`] if absent.
    pub fn set_default(&mut self, name: &str) -> Result<()> {
        if !self.entries.contains_key(name) {
            return Err(self.not_found(name));
        }
        self.default = Some(name.to_string());
        Ok(())
    }

    /// Look up `name`, or the default provider when `name` is `None`.
    pub fn get(&self, name: Option<&str>) -> Result<Arc<P>> {
        self.resolve(name).map(|(_, provider)| provider)
    }

    /// Like [`get`](Self::get) but also returns the registry name the lookup
    /// resolved to.
    pub fn resolve(&self, name: Option<&str>) -> Result<(String, Arc<P>)> {
        let name = match name {
            Some(name) => name,
            None => self
                .default
                .as_deref()
                .ok_or_else(|| IntegratorError::NoProvidersConfigured(self.kind.to_string()))?,
        };
        self.entries
            .get(name)
            .map(|entry| (name.to_string(), entry.provider.clone()))
            .ok_or_else(|| self.not_found(name))
    }

    pub fn default_name(&self) -> Option<&str> {
        self.default.as_deref()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Registered names in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.order.values().cloned().collect()
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Arc<P>)> {
        self.order.values().filter_map(|name| {
            self.entries
                .get(name)
                .map(|entry| (name.as_str(), &entry.provider))
        })
    }

    fn not_found(&self, name: &str) -> IntegratorError {
        IntegratorError::NotFound(format!("{} provider '{}' not found", self.kind, name))
    }
}

impl ProviderRegistry<dyn TextProvider> {
    /// Name -> identity and model list for every registered text provider.
    pub fn list(&self) -> BTreeMap<String, TextProviderSummary> {
        self.iter()
            .map(|(name, provider)| (name.to_string(), TextProviderSummary::of(provider.as_ref())))
            .collect()
    }
}

impl ProviderRegistry<dyn ImageProvider> {
    /// Name -> identity, model list, and capability sets for every registered
    /// image provider.
    pub fn list(&self) -> BTreeMap<String, ImageProviderSummary> {
        self.iter()
            .map(|(name, provider)| (name.to_string(), ImageProviderSummary::of(provider.as_ref())))
            .collect()
    }
}

/// Combined introspection view; serializes as `{"text": {...}, "image": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderListing {
    pub text: BTreeMap<String, TextProviderSummary>,
    pub image: BTreeMap<String, ImageProviderSummary>,
}
