//! Vela Headless Host
//!
//! A renderer-less host bundle for integration tests, server-side drivers,
//! and CI. It contributes the pointer and key trigger namespaces, tag
//! ownership for the stock host widgets, and handlers that append one line
//! per handled event to a shared [`EventLog`] — the headless stand-in for
//! painting pixels.
//!
//! A host run follows the same shape a windowed renderer would:
//!
//! ```rust
//! use vela_extension::{Directive, ExtensionRegistry, TriggerEvent};
//! use vela_host_headless::{headless_extension, EventLog, HostConfig};
//!
//! let config = HostConfig::default();
//! let log = EventLog::new(config.log_capacity);
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register(headless_extension(&log));
//!
//! let composition = registry.compose(&config.host_scope().unwrap());
//! let mut active = composition.activate();
//!
//! let press = Directive::parse("on:press").unwrap();
//! active.dispatch("host-button", &press, &TriggerEvent::pointer(1, 3.0, 4.0, 0));
//! active.shutdown();
//!
//! assert!(log.entries().iter().any(|e| e.contains("pointer:press")));
//! ```

pub mod config;
pub mod event_log;

use vela_extension::{
    teardown, ClientKind, ClientScope, ExtensionDescriptor, ExtensionMeta, TriggerData,
    TriggerEvent,
};

pub use config::HostConfig;
pub use event_log::EventLog;

/// Registry key of the headless host bundle
pub const HOST_EXTENSION_KEY: &str = "vela.host.headless";

/// Build the headless host's capability bundle over a shared event log.
///
/// Scope is headless-only: composing the same registry for a windowed host
/// skips this bundle entirely. The bundle maps the stock host widget tags
/// onto the namespaces it owns ("press" on a `host-button` lands in
/// `pointer:press`, text entry in a `host-field` lands in `key:input`).
pub fn headless_extension(log: &EventLog) -> ExtensionDescriptor {
    let setup_log = log.clone();
    let pointer_down = log.clone();
    let pointer_up = log.clone();
    let pointer_move = log.clone();
    let pointer_press = log.clone();
    let key_down = log.clone();
    let key_up = log.clone();
    let text_input = log.clone();

    ExtensionDescriptor::new(ExtensionMeta::new(
        HOST_EXTENSION_KEY,
        "Headless Host",
        env!("CARGO_PKG_VERSION"),
    ))
    .clients(ClientScope::only([ClientKind::Headless]))
    .namespace("pointer", ["down", "up", "move", "press"])
    .namespace("key", ["down", "up", "input"])
    .tag_alias("host-button", "button")
    .tag_alias("host-field", "input")
    .tag_namespace("button", "pointer")
    .tag_namespace("input", "key")
    .handler("pointer:down", move |e| {
        pointer_down.record(describe("pointer:down", e));
    })
    .handler("pointer:up", move |e| {
        pointer_up.record(describe("pointer:up", e));
    })
    .handler("pointer:move", move |e| {
        pointer_move.record(describe("pointer:move", e));
    })
    .handler("pointer:press", move |e| {
        pointer_press.record(describe("pointer:press", e));
    })
    .handler("key:down", move |e| {
        key_down.record(describe("key:down", e));
    })
    .handler("key:up", move |e| {
        key_up.record(describe("key:up", e));
    })
    .handler("key:input", move |e| {
        text_input.record(describe("key:input", e));
    })
    .on_setup(move || {
        tracing::debug!("Headless host coming up");
        setup_log.record("host up");
        let teardown_log = setup_log.clone();
        Ok(Some(teardown(move || {
            tracing::debug!("Headless host shutting down");
            teardown_log.record("host down");
        })))
    })
}

/// One log line per handled event, stable enough for tests to assert on
fn describe(qualified: &str, event: &TriggerEvent) -> String {
    match &event.data {
        TriggerData::Pointer { x, y, button } => {
            format!("{qualified} @{} ({x}, {y}) button {button}", event.target)
        }
        TriggerData::Key { code, repeat } => {
            let repeat = if *repeat { " repeat" } else { "" };
            format!("{qualified} @{} code {code}{repeat}", event.target)
        }
        TriggerData::Text { text } => format!("{qualified} @{} {text:?}", event.target),
        TriggerData::None => format!("{qualified} @{}", event.target),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vela_extension::{Directive, DispatchOutcome, ExtensionRegistry, HostScope};

    #[test]
    fn test_bundle_identity_and_scope() {
        let log = EventLog::new(16);
        let descriptor = headless_extension(&log);
        assert_eq!(descriptor.key(), HOST_EXTENSION_KEY);
        assert!(descriptor.scope().accepts(&HostScope::headless()));
        assert!(!descriptor
            .scope()
            .accepts(&HostScope::new(ClientKind::Desktop)));
    }

    #[test]
    fn test_press_on_host_button_lands_in_pointer_namespace() {
        let log = EventLog::new(16);
        let mut registry = ExtensionRegistry::new();
        registry.register(headless_extension(&log));
        let active = registry.compose(&HostScope::headless()).activate();

        let outcome = active.dispatch(
            "host-button",
            &Directive::parse("on:down").unwrap(),
            &TriggerEvent::pointer(3, 1.0, 2.0, 0),
        );
        assert_eq!(
            outcome,
            DispatchOutcome::Handled {
                qualified: "pointer:down".to_string()
            }
        );
        assert_eq!(
            log.entries(),
            vec!["host up", "pointer:down @3 (1, 2) button 0"]
        );
    }

    #[test]
    fn test_describe_each_payload() {
        assert_eq!(
            describe("pointer:down", &TriggerEvent::pointer(1, 0.5, 1.5, 2)),
            "pointer:down @1 (0.5, 1.5) button 2"
        );
        assert_eq!(
            describe("key:down", &TriggerEvent::key(2, 13, true)),
            "key:down @2 code 13 repeat"
        );
        assert_eq!(
            describe("key:input", &TriggerEvent::text(3, "hi")),
            "key:input @3 \"hi\""
        );
        assert_eq!(describe("focus", &TriggerEvent::bare(4)), "focus @4");
    }
}
