//! Extension composition and activation
//!
//! A [`Composition`] is the scope-filtered, ordered view of a registry that
//! a renderer activates at startup. Activation runs each descriptor's setup
//! in composition order, merges the capabilities of every descriptor whose
//! setup succeeded (or that has none), and hands back an
//! [`ActiveExtensions`]: the resolved capability set, the trigger resolver
//! built over it, and the collected teardowns. The renderer owns that value
//! for its lifetime; shutting it down (or dropping it) runs teardowns in
//! reverse setup order.

use std::panic::{self, AssertUnwindSafe};

use crate::descriptor::{Capabilities, ExtensionDescriptor, HostScope, Teardown};
use crate::event::TriggerEvent;
use crate::trigger::{Directive, DispatchOutcome, TriggerResolver};

/// Scope-filtered, ordered view of a registry. Borrow-only: the registry
/// stays usable (and re-composable) while a composition exists.
pub struct Composition<'r> {
    host: HostScope,
    entries: Vec<&'r ExtensionDescriptor>,
}

impl<'r> Composition<'r> {
    pub(crate) fn new(host: HostScope, entries: Vec<&'r ExtensionDescriptor>) -> Self {
        Self { host, entries }
    }

    pub fn host(&self) -> &HostScope {
        &self.host
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Keys taking part in this composition, in composition order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|d| d.key())
    }

    /// Merge every participating descriptor's capabilities, in order, before
    /// any lifecycle runs. This is the pre-activation view; activation
    /// re-merges with failed setups excluded.
    pub fn capabilities(&self) -> Capabilities {
        let mut merged = Capabilities::new();
        for descriptor in &self.entries {
            merged.merge_from(descriptor.capabilities());
        }
        merged
    }

    /// Run every descriptor's setup in composition order and build the
    /// resolved capability set from the ones that succeeded.
    ///
    /// A setup that errors or panics is caught and logged; the failing
    /// extension's capabilities stay out of the resolved set, but
    /// activation continues, and teardowns already collected from earlier
    /// extensions remain scheduled for shutdown.
    pub fn activate(&self) -> ActiveExtensions {
        let mut capabilities = Capabilities::new();
        let mut installed = Vec::new();
        let mut teardowns = Vec::new();

        for descriptor in &self.entries {
            let key = descriptor.key();
            match self.run_setup(descriptor) {
                Ok(teardown) => {
                    capabilities.merge_from(descriptor.capabilities());
                    installed.push(key.to_string());
                    if let Some(teardown) = teardown {
                        teardowns.push((key.to_string(), teardown));
                    }
                }
                Err(message) => {
                    tracing::warn!("Extension '{}' failed to set up: {}", key, message);
                }
            }
        }

        tracing::debug!(
            "Activated {} of {} extensions for {:?}",
            installed.len(),
            self.entries.len(),
            self.host
        );
        ActiveExtensions {
            resolver: TriggerResolver::new(capabilities),
            installed,
            teardowns,
        }
    }

    fn run_setup(&self, descriptor: &ExtensionDescriptor) -> Result<Option<Teardown>, String> {
        let Some(setup) = descriptor.setup_fn() else {
            return Ok(None);
        };
        match panic::catch_unwind(AssertUnwindSafe(|| setup())) {
            Ok(Ok(teardown)) => Ok(teardown),
            Ok(Err(e)) => Err(e.to_string()),
            Err(_) => Err("setup panicked".to_string()),
        }
    }
}

/// The activated composition a renderer owns: resolved capabilities behind
/// a trigger resolver, plus the teardowns to run at shutdown.
pub struct ActiveExtensions {
    resolver: TriggerResolver,
    installed: Vec<String>,
    teardowns: Vec<(String, Teardown)>,
}

impl ActiveExtensions {
    /// Keys of the extensions whose capabilities made it into the resolved
    /// set, in composition order
    pub fn installed(&self) -> &[String] {
        &self.installed
    }

    pub fn is_installed(&self, key: &str) -> bool {
        self.installed.iter().any(|k| k == key)
    }

    pub fn resolver(&self) -> &TriggerResolver {
        &self.resolver
    }

    /// The resolved capability set, merged from every installed extension
    pub fn capabilities(&self) -> &Capabilities {
        self.resolver.capabilities()
    }

    /// Dispatch a trigger event for a directive declared on `tag`
    pub fn dispatch(&self, tag: &str, directive: &Directive, event: &TriggerEvent) -> DispatchOutcome {
        self.resolver.dispatch(tag, directive, event)
    }

    /// Run all collected teardowns in reverse setup order (LIFO).
    /// Idempotent; also runs on drop. A panicking teardown is caught and
    /// logged so the rest still run.
    pub fn shutdown(&mut self) {
        while let Some((key, teardown)) = self.teardowns.pop() {
            if panic::catch_unwind(AssertUnwindSafe(teardown)).is_err() {
                tracing::error!("Teardown for extension '{}' panicked", key);
            }
        }
    }
}

impl Drop for ActiveExtensions {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{teardown, ExtensionMeta};
    use crate::error::ExtensionError;
    use crate::registry::ExtensionRegistry;
    use std::sync::{Arc, Mutex};

    fn descriptor(key: &str) -> ExtensionDescriptor {
        ExtensionDescriptor::new(ExtensionMeta::new(key, key, "0.1.0"))
    }

    fn lifecycle_descriptor(key: &str, log: &Arc<Mutex<Vec<String>>>) -> ExtensionDescriptor {
        let setup_log = log.clone();
        let teardown_log = log.clone();
        let key_owned = key.to_string();
        descriptor(key).on_setup(move || {
            setup_log.lock().unwrap().push(format!("setup {key_owned}"));
            let teardown_log = teardown_log.clone();
            let key_owned = key_owned.clone();
            Ok(Some(teardown(move || {
                teardown_log
                    .lock()
                    .unwrap()
                    .push(format!("teardown {key_owned}"));
            })))
        })
    }

    #[test]
    fn test_setups_in_order_teardowns_reversed() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        registry.register(lifecycle_descriptor("first", &log));
        registry.register(lifecycle_descriptor("second", &log));
        registry.register(lifecycle_descriptor("third", &log));

        let composition = registry.compose(&HostScope::headless());
        let mut active = composition.activate();
        assert_eq!(active.installed(), &["first", "second", "third"]);

        active.shutdown();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "setup first",
                "setup second",
                "setup third",
                "teardown third",
                "teardown second",
                "teardown first",
            ]
        );
    }

    #[test]
    fn test_shutdown_is_idempotent_and_runs_on_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        registry.register(lifecycle_descriptor("only", &log));

        let composition = registry.compose(&HostScope::headless());
        let mut active = composition.activate();
        active.shutdown();
        active.shutdown();
        drop(active);

        let entries = log.lock().unwrap();
        assert_eq!(
            entries.iter().filter(|e| e.starts_with("teardown")).count(),
            1
        );
    }

    #[test]
    fn test_failed_setup_excludes_capabilities_but_not_siblings() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        registry.register(
            lifecycle_descriptor("first", &log).namespace("pointer", ["down"]),
        );
        registry.register(
            descriptor("broken")
                .namespace("broken", ["explode"])
                .on_setup(|| Err(ExtensionError::setup("no display"))),
        );
        registry.register(
            lifecycle_descriptor("third", &log).namespace("key", ["down"]),
        );

        let composition = registry.compose(&HostScope::headless());
        // Pre-activation view still carries everything in scope
        assert!(composition.capabilities().has_namespace("broken"));

        let mut active = composition.activate();
        assert_eq!(active.installed(), &["first", "third"]);
        assert!(!active.is_installed("broken"));

        let caps = active.capabilities();
        assert!(caps.has_namespace("pointer"));
        assert!(caps.has_namespace("key"));
        assert!(!caps.has_namespace("broken"));

        // Earlier teardowns still run despite the failure in the middle
        active.shutdown();
        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "setup first",
                "setup third",
                "teardown third",
                "teardown first",
            ]
        );
    }

    #[test]
    fn test_panicking_setup_is_contained() {
        let mut registry = ExtensionRegistry::new();
        registry.register(
            descriptor("bomb")
                .namespace("bomb", ["tick"])
                .on_setup(|| panic!("setup bomb")),
        );
        registry.register(descriptor("steady").namespace("pointer", ["down"]));

        let active = registry.compose(&HostScope::headless()).activate();
        assert_eq!(active.installed(), &["steady"]);
        assert!(!active.capabilities().has_namespace("bomb"));
        assert!(active.capabilities().has_namespace("pointer"));
    }

    #[test]
    fn test_panicking_teardown_does_not_stop_the_rest() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ExtensionRegistry::new();
        registry.register(lifecycle_descriptor("first", &log));
        registry.register(
            descriptor("second")
                .on_setup(|| Ok(Some(teardown(|| panic!("teardown bomb"))))),
        );

        let mut active = registry.compose(&HostScope::headless()).activate();
        active.shutdown();

        // "second" tears down first (LIFO) and panics; "first" still runs
        assert!(log
            .lock()
            .unwrap()
            .contains(&"teardown first".to_string()));
    }

    #[test]
    fn test_last_wins_across_descriptors() {
        let hits = Arc::new(Mutex::new(Vec::new()));
        let first_hits = hits.clone();
        let second_hits = hits.clone();

        let mut registry = ExtensionRegistry::new();
        registry.register(
            descriptor("first")
                .namespace("pointer", ["down"])
                .handler("pointer:down", move |_| {
                    first_hits.lock().unwrap().push("first")
                }),
        );
        registry.register(
            descriptor("second")
                .namespace("pointer", ["up"])
                .handler("pointer:down", move |_| {
                    second_hits.lock().unwrap().push("second")
                }),
        );

        let active = registry.compose(&HostScope::headless()).activate();

        // Set-valued capability unioned across both
        assert!(active.capabilities().namespace_contains("pointer", "down"));
        assert!(active.capabilities().namespace_contains("pointer", "up"));

        // Handler key collision: the later registration wins
        active.dispatch(
            "button",
            &Directive::namespaced("pointer", "down"),
            &TriggerEvent::bare(1),
        );
        assert_eq!(*hits.lock().unwrap(), vec!["second"]);
    }

    #[test]
    fn test_empty_composition_dispatches_nothing() {
        let registry = ExtensionRegistry::new();
        let active = registry.compose(&HostScope::headless()).activate();
        assert!(active.installed().is_empty());
        let outcome = active.dispatch(
            "button",
            &Directive::event("press"),
            &TriggerEvent::bare(1),
        );
        assert_eq!(outcome, DispatchOutcome::NoHandler);
    }
}
