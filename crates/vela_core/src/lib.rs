//! Vela Core Runtime
//!
//! This crate provides the foundational primitives for the Vela UI framework:
//!
//! - **Reactive Signals**: Fine-grained reactivity without VDOM overhead
//! - **Watchers**: Dependency-tracked callbacks with glitch-free scheduling
//! - **Derived Values**: Memoized computations over other signals
//!
//! # Example
//!
//! ```rust
//! use vela_core::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//!
//! // Create a signal
//! let count = graph.create_signal(0i32);
//!
//! // Create a derived value
//! let doubled = graph.create_derived(move |g| {
//!     g.get(count).unwrap_or(0) * 2
//! });
//!
//! // Create a watcher
//! let _watcher = graph.watch(move |g| {
//!     println!("Count is now: {:?}", g.get(count));
//! });
//!
//! // Update the signal
//! graph.set(count, 5);
//! assert_eq!(graph.get_derived(doubled), Some(10));
//! ```

pub mod reactive;

pub use reactive::{Derived, ReactiveGraph, Signal, SignalId, WatcherFn, WatcherId};
