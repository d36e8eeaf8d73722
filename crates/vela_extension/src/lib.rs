//! Vela Extension Layer
//!
//! Independently-authored capability bundles, merged at renderer setup:
//!
//! - **Descriptors**: identity + scope + capabilities + lifecycle, as values
//! - **Registry**: explicit, renderer-owned, registration-ordered
//! - **Composition**: scope-filtered merge with per-kind strategies
//! - **Trigger resolution**: `on:<event>` directives to platform handlers
//!
//! # Example
//!
//! ```rust
//! use vela_extension::{
//!     Directive, ExtensionDescriptor, ExtensionMeta, ExtensionRegistry, HostScope,
//!     TriggerEvent,
//! };
//!
//! let mut registry = ExtensionRegistry::new();
//! registry.register(
//!     ExtensionDescriptor::new(ExtensionMeta::new("demo.pointer", "Pointer", "0.1.0"))
//!         .namespace("pointer", ["down"])
//!         .handler("pointer:down", |event| {
//!             println!("pointer down on node {}", event.target);
//!         }),
//! );
//!
//! let composition = registry.compose(&HostScope::headless());
//! let mut active = composition.activate();
//!
//! let directive = Directive::parse("on:pointer:down").unwrap();
//! active.dispatch("button", &directive, &TriggerEvent::pointer(1, 4.0, 2.0, 0));
//! active.shutdown();
//! ```

pub mod compose;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod registry;
pub mod trigger;

pub use compose::{ActiveExtensions, Composition};
pub use descriptor::{
    teardown, Capabilities, ClientKind, ClientScope, ExtensionDescriptor, ExtensionMeta,
    ExtensionScope, HostScope, SetupFn, Teardown,
};
pub use error::{ExtensionError, Result};
pub use event::{NodeId, TriggerData, TriggerEvent, TriggerHandler};
pub use registry::ExtensionRegistry;
pub use trigger::{Directive, DispatchOutcome, TriggerResolver};
