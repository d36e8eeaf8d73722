//! Trigger directive resolution
//!
//! Maps declarative `on:<event>` props on rendered nodes to handlers from
//! the composed capability set. Resolution tries, in order:
//!
//! 1. exact namespace — the directive names one (`on:pointer:down`) and the
//!    composed set has that namespace with that event as a member
//! 2. tag-alias indirection — the node's tag, followed through the alias
//!    table, lands on a tag whose owning namespace has the event
//! 3. generic — a handler registered under the bare event name
//!
//! Each step only wins if a handler is actually registered for the name it
//! produces; otherwise the next step gets its turn. A directive nothing
//! claims is a no-op, not an error, so forward-declared triggers degrade
//! gracefully. Dispatch is synchronous with the originating platform event.

use smallvec::SmallVec;

use crate::descriptor::Capabilities;
use crate::event::TriggerEvent;

/// Alias chains longer than this are abandoned (and almost certainly cyclic)
const MAX_ALIAS_HOPS: usize = 8;

/// A parsed `on:` event-binding prop. Either unnamespaced (`on:press`) or
/// explicitly namespaced (`on:pointer:down`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Directive {
    namespace: Option<String>,
    event: String,
}

impl Directive {
    /// Parse a prop name. Props not starting with `on:` are not directives;
    /// empty namespace or event segments are rejected.
    pub fn parse(prop: &str) -> Option<Self> {
        let rest = prop.strip_prefix("on:")?;
        let (namespace, event) = match rest.split_once(':') {
            Some((namespace, event)) => (Some(namespace), event),
            None => (None, rest),
        };
        if event.is_empty() || namespace.is_some_and(str::is_empty) {
            return None;
        }
        Some(Self {
            namespace: namespace.map(str::to_string),
            event: event.to_string(),
        })
    }

    /// An unnamespaced directive for `event`
    pub fn event(event: impl Into<String>) -> Self {
        Self {
            namespace: None,
            event: event.into(),
        }
    }

    /// A directive naming its namespace explicitly
    pub fn namespaced(namespace: impl Into<String>, event: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            event: event.into(),
        }
    }

    pub fn namespace_name(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn event_name(&self) -> &str {
        &self.event
    }
}

/// What a dispatch did, for host-side observability
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A handler ran; carries the handler-table name that matched
    Handled { qualified: String },
    /// Nothing claimed the directive; it degraded to a no-op
    NoHandler,
}

impl DispatchOutcome {
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }
}

/// Resolves directives against a composed capability set and dispatches
/// trigger events to the matching handlers. Owned by the active composition
/// whose capabilities it serves.
pub struct TriggerResolver {
    capabilities: Capabilities,
}

impl TriggerResolver {
    pub fn new(capabilities: Capabilities) -> Self {
        Self { capabilities }
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.capabilities
    }

    /// Resolve a directive on a node with the given tag to a handler-table
    /// name, or `None` when nothing claims it
    pub fn resolve(&self, tag: &str, directive: &Directive) -> Option<String> {
        let caps = &self.capabilities;
        let event = directive.event_name();

        // 1. Exact namespace named by the directive itself
        if let Some(namespace) = directive.namespace_name() {
            if caps.namespace_contains(namespace, event) {
                let qualified = format!("{namespace}:{event}");
                if caps.has_handler(&qualified) {
                    return Some(qualified);
                }
            }
        }

        // 2. The tag's owning namespace, following aliases
        if let Some(namespace) = self.namespace_for_tag(tag) {
            if caps.namespace_contains(namespace, event) {
                let qualified = format!("{namespace}:{event}");
                if caps.has_handler(&qualified) {
                    return Some(qualified);
                }
            }
        }

        // 3. Generic handler under the bare event name
        if caps.has_handler(event) {
            return Some(event.to_string());
        }
        None
    }

    /// Dispatch a trigger event for a directive declared on `tag`.
    /// Synchronous; returns what happened. An unresolved directive is a
    /// logged no-op.
    pub fn dispatch(&self, tag: &str, directive: &Directive, event: &TriggerEvent) -> DispatchOutcome {
        match self.resolve(tag, directive) {
            Some(qualified) => {
                // resolve() only returns registered names
                if let Some(handler) = self.capabilities.handler(&qualified) {
                    handler(event);
                }
                DispatchOutcome::Handled { qualified }
            }
            None => {
                tracing::trace!(
                    "No handler for directive '{:?}' on tag '{}'; ignoring",
                    directive,
                    tag
                );
                DispatchOutcome::NoHandler
            }
        }
    }

    /// Walk the alias table from `tag` until a tag with an owning namespace
    /// turns up. Bounded, so alias cycles fizzle instead of spinning.
    fn namespace_for_tag(&self, tag: &str) -> Option<&str> {
        let caps = &self.capabilities;
        let mut current = tag;
        let mut visited: SmallVec<[&str; MAX_ALIAS_HOPS]> = SmallVec::new();
        for _ in 0..=MAX_ALIAS_HOPS {
            if let Some(namespace) = caps.tag_namespace(current) {
                return Some(namespace);
            }
            match caps.alias_target(current) {
                Some(target) => {
                    if visited.contains(&current) {
                        tracing::trace!("Tag alias cycle at '{}'; giving up", current);
                        return None;
                    }
                    visited.push(current);
                    current = target;
                }
                None => return None,
            }
        }
        tracing::trace!(
            "Tag alias chain from '{}' exceeded {} hops; giving up",
            tag,
            MAX_ALIAS_HOPS
        );
        None
    }
}
