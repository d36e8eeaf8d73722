//! Extension registry
//!
//! An explicit, renderer-owned collection of extension descriptors. There
//! is no process-wide registry: whoever constructs the renderer constructs
//! the registry, registers bundles into it, and composes it against the
//! host scope at startup. Registration order is composition order, which
//! is what makes capability overrides deterministic.

use indexmap::IndexMap;

use crate::compose::Composition;
use crate::descriptor::{ExtensionDescriptor, HostScope};

/// Ordered collection of extension descriptors, keyed by `meta.key`.
///
/// Re-registering a key replaces the descriptor in place: the extension
/// keeps its original position in the override chain, so hot
/// re-registration cannot silently reorder capability resolution.
#[derive(Default)]
pub struct ExtensionRegistry {
    descriptors: IndexMap<String, ExtensionDescriptor>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a descriptor under its meta key. Returns the descriptor it
    /// replaced, if the key was already registered.
    pub fn register(&mut self, descriptor: ExtensionDescriptor) -> Option<ExtensionDescriptor> {
        let key = descriptor.key().to_string();
        let replaced = self.descriptors.insert(key.clone(), descriptor);
        if replaced.is_some() {
            tracing::debug!("Replaced extension '{}' in place", key);
        } else {
            tracing::debug!("Registered extension '{}'", key);
        }
        replaced
    }

    /// Remove a descriptor, preserving the order of the rest
    pub fn remove(&mut self, key: &str) -> Option<ExtensionDescriptor> {
        self.descriptors.shift_remove(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.descriptors.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&ExtensionDescriptor> {
        self.descriptors.get(key)
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Registered keys, in registration order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.descriptors.keys().map(String::as_str)
    }

    /// Descriptors in registration order
    pub fn iter(&self) -> impl Iterator<Item = &ExtensionDescriptor> {
        self.descriptors.values()
    }

    /// Build a composition for the given host scope. Descriptors whose
    /// scope excludes the host are skipped entirely, never partially
    /// applied; the rest take part in registration order.
    pub fn compose(&self, host: &HostScope) -> Composition<'_> {
        let mut entries = Vec::new();
        for descriptor in self.descriptors.values() {
            if descriptor.scope().accepts(host) {
                entries.push(descriptor);
            } else {
                tracing::debug!(
                    "Extension '{}' out of scope for {:?}; skipping",
                    descriptor.key(),
                    host
                );
            }
        }
        tracing::debug!(
            "Composed {} of {} extensions for {:?}",
            entries.len(),
            self.descriptors.len(),
            host
        );
        Composition::new(host.clone(), entries)
    }
}
