//! Extension descriptors
//!
//! An extension is a self-contained capability bundle: identity, the host
//! scopes it applies to, the trigger capabilities it contributes, and an
//! optional lifecycle hook. Descriptors are plain values; registering one
//! with an [`ExtensionRegistry`](crate::ExtensionRegistry) is what puts it
//! in play.

use std::fmt;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::error::ExtensionError;
use crate::event::{TriggerEvent, TriggerHandler};

/// Extension identity. `key` is the unique registry identity; re-registering
/// a key replaces the prior descriptor.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExtensionMeta {
    pub key: String,
    pub name: String,
    pub version: String,
}

impl ExtensionMeta {
    pub fn new(
        key: impl Into<String>,
        name: impl Into<String>,
        version: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            version: version.into(),
        }
    }
}

/// Host client kinds an extension can target
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ClientKind {
    Desktop,
    Mobile,
    Web,
    Headless,
}

/// Which client kinds a descriptor applies to
#[derive(Clone, Debug, Default)]
pub enum ClientScope {
    /// Applies to every client kind
    #[default]
    Any,
    /// Applies only to the listed kinds
    Only(SmallVec<[ClientKind; 4]>),
}

impl ClientScope {
    pub fn only(kinds: impl IntoIterator<Item = ClientKind>) -> Self {
        Self::Only(kinds.into_iter().collect())
    }

    pub fn accepts(&self, kind: ClientKind) -> bool {
        match self {
            Self::Any => true,
            Self::Only(kinds) => kinds.contains(&kind),
        }
    }
}

/// The host context a renderer runs in. Compositions are built against one
/// of these; descriptors whose scope excludes it are skipped entirely.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostScope {
    client: ClientKind,
    editor: Option<String>,
}

impl HostScope {
    pub fn new(client: ClientKind) -> Self {
        Self {
            client,
            editor: None,
        }
    }

    /// A host that also exposes a named editor surface
    pub fn with_editor(client: ClientKind, editor: impl Into<String>) -> Self {
        Self {
            client,
            editor: Some(editor.into()),
        }
    }

    pub fn headless() -> Self {
        Self::new(ClientKind::Headless)
    }

    pub fn client(&self) -> ClientKind {
        self.client
    }

    pub fn editor(&self) -> Option<&str> {
        self.editor.as_deref()
    }
}

/// Where a descriptor applies: a client-kind filter plus an optional set of
/// editor surfaces. An empty editor set means the descriptor applies no
/// matter which (if any) editor surface the host exposes; a non-empty set
/// restricts it to hosts exposing one of the named surfaces.
#[derive(Clone, Debug, Default)]
pub struct ExtensionScope {
    clients: ClientScope,
    editors: FxHashSet<String>,
}

impl ExtensionScope {
    pub fn new(clients: ClientScope) -> Self {
        Self {
            clients,
            editors: FxHashSet::default(),
        }
    }

    pub fn editor(mut self, surface: impl Into<String>) -> Self {
        self.editors.insert(surface.into());
        self
    }

    /// Whether this scope admits the given host context
    pub fn accepts(&self, host: &HostScope) -> bool {
        if !self.clients.accepts(host.client) {
            return false;
        }
        if self.editors.is_empty() {
            return true;
        }
        match host.editor() {
            Some(surface) => self.editors.contains(surface),
            None => false,
        }
    }
}

/// Teardown returned by a successful setup; runs once at host shutdown
pub type Teardown = Box<dyn FnOnce() + Send>;

/// Extension lifecycle hook. Shared so one descriptor can serve several
/// compositions; captured state that setup mutates goes behind its own lock.
pub type SetupFn = Arc<dyn Fn() -> Result<Option<Teardown>, ExtensionError> + Send + Sync>;

/// Box a teardown closure
pub fn teardown(f: impl FnOnce() + Send + 'static) -> Teardown {
    Box::new(f)
}

/// The capabilities one descriptor contributes, and equally the composed
/// set after merging (`merge_from` applies the per-kind strategies).
///
/// Kinds are a closed set, each with a defined merge rule:
/// - `namespaces`: event names owned by a trigger namespace — union per key
/// - `tag_aliases`: tag -> tag indirection — last registration wins per key
/// - `tag_namespaces`: tag -> owning namespace — last wins per key
/// - `handlers`: qualified trigger name -> handler — last wins per key
#[derive(Clone, Default)]
pub struct Capabilities {
    namespaces: FxHashMap<String, FxHashSet<String>>,
    tag_aliases: FxHashMap<String, String>,
    tag_namespaces: FxHashMap<String, String>,
    handlers: FxHashMap<String, TriggerHandler>,
}

impl Capabilities {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add event names to a trigger namespace, creating it if needed
    pub fn add_namespace_events(
        &mut self,
        namespace: impl Into<String>,
        events: impl IntoIterator<Item = impl Into<String>>,
    ) {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .extend(events.into_iter().map(Into::into));
    }

    /// Point a tag at another tag. The resolver follows these when a node's
    /// own tag has no namespace.
    pub fn set_tag_alias(&mut self, tag: impl Into<String>, target: impl Into<String>) {
        self.tag_aliases.insert(tag.into(), target.into());
    }

    /// Declare which namespace owns a tag's events
    pub fn set_tag_namespace(&mut self, tag: impl Into<String>, namespace: impl Into<String>) {
        self.tag_namespaces.insert(tag.into(), namespace.into());
    }

    /// Register a handler under a qualified (`"pointer:down"`) or generic
    /// (`"press"`) trigger name
    pub fn set_handler(&mut self, name: impl Into<String>, handler: TriggerHandler) {
        self.handlers.insert(name.into(), handler);
    }

    /// Merge `other` into `self`, applying each kind's strategy: namespace
    /// memberships union, everything else is overridden by `other` on key
    /// collision. Composition calls this in descriptor order, which is what
    /// makes later extensions win.
    pub fn merge_from(&mut self, other: &Capabilities) {
        for (namespace, events) in &other.namespaces {
            self.namespaces
                .entry(namespace.clone())
                .or_default()
                .extend(events.iter().cloned());
        }
        for (tag, target) in &other.tag_aliases {
            self.tag_aliases.insert(tag.clone(), target.clone());
        }
        for (tag, namespace) in &other.tag_namespaces {
            self.tag_namespaces.insert(tag.clone(), namespace.clone());
        }
        for (name, handler) in &other.handlers {
            self.handlers.insert(name.clone(), handler.clone());
        }
    }

    pub fn has_namespace(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Whether `event` is a member of `namespace`
    pub fn namespace_contains(&self, namespace: &str, event: &str) -> bool {
        self.namespaces
            .get(namespace)
            .is_some_and(|events| events.contains(event))
    }

    pub fn alias_target(&self, tag: &str) -> Option<&str> {
        self.tag_aliases.get(tag).map(String::as_str)
    }

    pub fn tag_namespace(&self, tag: &str) -> Option<&str> {
        self.tag_namespaces.get(tag).map(String::as_str)
    }

    pub fn handler(&self, name: &str) -> Option<&TriggerHandler> {
        self.handlers.get(name)
    }

    pub fn has_handler(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.namespaces.is_empty()
            && self.tag_aliases.is_empty()
            && self.tag_namespaces.is_empty()
            && self.handlers.is_empty()
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Capabilities")
            .field("namespaces", &self.namespaces)
            .field("tag_aliases", &self.tag_aliases)
            .field("tag_namespaces", &self.tag_namespaces)
            .field("handlers", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// A capability bundle: identity, scope, contributed capabilities, and an
/// optional lifecycle hook. Built with chained setters:
///
/// ```rust
/// use vela_extension::{ClientKind, ClientScope, ExtensionDescriptor, ExtensionMeta};
///
/// let pointer = ExtensionDescriptor::new(ExtensionMeta::new(
///     "vela.pointer",
///     "Pointer Input",
///     "0.1.0",
/// ))
/// .clients(ClientScope::only([ClientKind::Desktop, ClientKind::Headless]))
/// .namespace("pointer", ["down", "up", "move"])
/// .tag_namespace("button", "pointer")
/// .handler("pointer:down", |event| {
///     let _ = event;
/// });
/// ```
pub struct ExtensionDescriptor {
    meta: ExtensionMeta,
    scope: ExtensionScope,
    capabilities: Capabilities,
    setup: Option<SetupFn>,
}

impl ExtensionDescriptor {
    pub fn new(meta: ExtensionMeta) -> Self {
        Self {
            meta,
            scope: ExtensionScope::default(),
            capabilities: Capabilities::new(),
            setup: None,
        }
    }

    /// Restrict which client kinds this extension applies to
    pub fn clients(mut self, clients: ClientScope) -> Self {
        self.scope.clients = clients;
        self
    }

    /// Restrict this extension to hosts exposing the named editor surface.
    /// May be called repeatedly; any listed surface admits the host.
    pub fn editor_scope(mut self, surface: impl Into<String>) -> Self {
        self.scope.editors.insert(surface.into());
        self
    }

    /// Contribute event names to a trigger namespace
    pub fn namespace(
        mut self,
        namespace: impl Into<String>,
        events: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.capabilities.add_namespace_events(namespace, events);
        self
    }

    /// Contribute a tag -> tag alias
    pub fn tag_alias(mut self, tag: impl Into<String>, target: impl Into<String>) -> Self {
        self.capabilities.set_tag_alias(tag, target);
        self
    }

    /// Contribute a tag -> namespace ownership entry
    pub fn tag_namespace(mut self, tag: impl Into<String>, namespace: impl Into<String>) -> Self {
        self.capabilities.set_tag_namespace(tag, namespace);
        self
    }

    /// Contribute a trigger handler under a qualified or generic name
    pub fn handler<F>(mut self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&TriggerEvent) + Send + Sync + 'static,
    {
        self.capabilities.set_handler(name, Arc::new(handler));
        self
    }

    /// Install a lifecycle hook, run at composition activation. Returning a
    /// teardown schedules it for LIFO execution at host shutdown; an error
    /// keeps this extension's capabilities out of the composed set.
    pub fn on_setup<F>(mut self, setup: F) -> Self
    where
        F: Fn() -> Result<Option<Teardown>, ExtensionError> + Send + Sync + 'static,
    {
        self.setup = Some(Arc::new(setup));
        self
    }

    pub fn meta(&self) -> &ExtensionMeta {
        &self.meta
    }

    pub fn key(&self) -> &str {
        &self.meta.key
    }

    pub fn scope(&self) -> &ExtensionScope {
        &self.scope
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    pub(crate) fn setup_fn(&self) -> Option<&SetupFn> {
        self.setup.as_ref()
    }
}

impl fmt::Debug for ExtensionDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionDescriptor")
            .field("meta", &self.meta)
            .field("scope", &self.scope)
            .field("capabilities", &self.capabilities)
            .field("has_setup", &self.setup.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_scope_matching() {
        assert!(ClientScope::Any.accepts(ClientKind::Desktop));
        assert!(ClientScope::Any.accepts(ClientKind::Headless));

        let desktop_only = ClientScope::only([ClientKind::Desktop]);
        assert!(desktop_only.accepts(ClientKind::Desktop));
        assert!(!desktop_only.accepts(ClientKind::Mobile));
    }

    #[test]
    fn test_scope_without_editors_applies_everywhere() {
        let scope = ExtensionScope::default();
        assert!(scope.accepts(&HostScope::new(ClientKind::Desktop)));
        assert!(scope.accepts(&HostScope::with_editor(ClientKind::Desktop, "canvas")));
        assert!(scope.accepts(&HostScope::headless()));
    }

    #[test]
    fn test_editor_scope_requires_matching_surface() {
        let scope = ExtensionScope::new(ClientScope::Any).editor("canvas");
        assert!(scope.accepts(&HostScope::with_editor(ClientKind::Desktop, "canvas")));
        assert!(!scope.accepts(&HostScope::with_editor(ClientKind::Desktop, "timeline")));
        // A host with no editor surface is excluded by an editor-scoped
        // descriptor
        assert!(!scope.accepts(&HostScope::new(ClientKind::Desktop)));
    }

    #[test]
    fn test_client_and_editor_filters_combine() {
        let scope = ExtensionScope::new(ClientScope::only([ClientKind::Headless])).editor("canvas");
        assert!(scope.accepts(&HostScope::with_editor(ClientKind::Headless, "canvas")));
        assert!(!scope.accepts(&HostScope::with_editor(ClientKind::Desktop, "canvas")));
        assert!(!scope.accepts(&HostScope::headless()));
    }

    #[test]
    fn test_namespace_union_on_merge() {
        let mut base = Capabilities::new();
        base.add_namespace_events("pointer", ["down", "up"]);

        let mut extra = Capabilities::new();
        extra.add_namespace_events("pointer", ["move"]);
        extra.add_namespace_events("key", ["down"]);

        base.merge_from(&extra);
        assert!(base.namespace_contains("pointer", "down"));
        assert!(base.namespace_contains("pointer", "up"));
        assert!(base.namespace_contains("pointer", "move"));
        assert!(base.namespace_contains("key", "down"));
        assert!(!base.namespace_contains("key", "up"));
    }

    #[test]
    fn test_alias_and_handler_last_wins_on_merge() {
        let mut base = Capabilities::new();
        base.set_tag_alias("fancy-button", "button");
        base.set_tag_namespace("button", "pointer");
        base.set_handler("pointer:down", Arc::new(|_| {}));

        let mut replacement = Capabilities::new();
        replacement.set_tag_alias("fancy-button", "chip");
        replacement.set_tag_namespace("button", "gesture");
        replacement.set_handler("pointer:down", Arc::new(|_| {}));

        base.merge_from(&replacement);
        assert_eq!(base.alias_target("fancy-button"), Some("chip"));
        assert_eq!(base.tag_namespace("button"), Some("gesture"));
        assert!(base.has_handler("pointer:down"));
    }

    #[test]
    fn test_descriptor_builder_collects_capabilities() {
        let descriptor = ExtensionDescriptor::new(ExtensionMeta::new(
            "vela.pointer",
            "Pointer Input",
            "0.1.0",
        ))
        .namespace("pointer", ["down", "up"])
        .tag_alias("fancy-button", "button")
        .tag_namespace("button", "pointer")
        .handler("pointer:down", |_| {});

        assert_eq!(descriptor.key(), "vela.pointer");
        assert_eq!(descriptor.meta().version, "0.1.0");
        let caps = descriptor.capabilities();
        assert!(caps.namespace_contains("pointer", "down"));
        assert_eq!(caps.alias_target("fancy-button"), Some("button"));
        assert_eq!(caps.tag_namespace("button"), Some("pointer"));
        assert!(caps.has_handler("pointer:down"));
        assert!(!caps.is_empty());
    }
}
