//! Reactive Signal Graph
//!
//! Fine-grained reactivity for the Vela runtime. The graph owns every signal
//! cell and watcher; user code holds cheap copyable handles. Supports:
//! - Signals with equality-gated writes and per-cell version counters
//! - Watchers with automatic dependency tracking (re-collected every run)
//! - Derived values that memoize a computation over other signals
//! - Batched writes that coalesce notification into a single pass
//!
//! Writes are applied eagerly; notification is queued and drained only at the
//! top level (never inside a running watcher), so a watcher always observes
//! the final values of a pass and never a partially propagated mix.
//!
//! # Example
//!
//! ```rust
//! use vela_core::ReactiveGraph;
//!
//! let mut graph = ReactiveGraph::new();
//! let count = graph.create_signal(0i32);
//! let doubled = graph.create_derived(move |g| g.get(count).unwrap_or(0) * 2);
//!
//! graph.set(count, 5);
//! assert_eq!(graph.get_derived(doubled), Some(10));
//! ```

use std::any::Any;
use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::panic::{self, AssertUnwindSafe};

use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

new_key_type! {
    /// Raw identifier for a signal cell
    pub struct SignalId;

    /// Unique identifier for a watcher
    pub struct WatcherId;
}

/// A watcher callback. Receives the graph so it can read (and write) signals.
pub type WatcherFn = Box<dyn FnMut(&mut ReactiveGraph) + Send>;

/// Type-erased equality predicate stored alongside each cell
type EqualsFn = Box<dyn Fn(&dyn Any, &dyn Any) -> bool + Send>;

// ─────────────────────────────────────────────────────────────────────────────
// Handles
// ─────────────────────────────────────────────────────────────────────────────

/// Typed handle to a signal cell. Copyable: capture it in closures by value.
pub struct Signal<T> {
    id: SignalId,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Signal<T> {
    /// Reconstruct a typed handle from a raw id.
    ///
    /// The caller is responsible for pairing the id with its original type;
    /// a mismatched type makes reads return `None`.
    pub fn from_id(id: SignalId) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    /// The raw id backing this handle
    pub fn id(&self) -> SignalId {
        self.id
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Signal<T> {}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Signal<T> {}

impl<T> Hash for Signal<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> fmt::Debug for Signal<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.id).finish()
    }
}

/// Typed handle to a derived value: an output signal plus the watcher that
/// keeps it up to date.
pub struct Derived<T> {
    signal: Signal<T>,
    watcher: WatcherId,
}

impl<T> Derived<T> {
    /// The output signal holding the memoized value. Other watchers and
    /// derived computations can read it like any signal.
    pub fn signal(&self) -> Signal<T> {
        self.signal
    }

    /// The watcher that recomputes this derived value
    pub fn watcher(&self) -> WatcherId {
        self.watcher
    }
}

impl<T> Clone for Derived<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Derived<T> {}

impl<T> fmt::Debug for Derived<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Derived")
            .field("signal", &self.signal.id)
            .field("watcher", &self.watcher)
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cells and slots
// ─────────────────────────────────────────────────────────────────────────────

struct SignalCell {
    value: Box<dyn Any + Send>,
    /// Incremented once per committed write. Starts at 0.
    version: u64,
    /// Watchers to notify on commit, in subscription order
    subscribers: SmallVec<[WatcherId; 4]>,
    equals: EqualsFn,
}

struct WatcherSlot {
    /// Taken out while the callback runs, so a watcher can mutate the graph
    /// (including disposing itself) from inside its own run.
    callback: Option<WatcherFn>,
    /// Signals read during the most recent run
    dependencies: SmallVec<[SignalId; 4]>,
    /// Set while this watcher sits in the pending queue
    queued: bool,
}

fn erased_equals<T: 'static>(equals: impl Fn(&T, &T) -> bool + Send + 'static) -> EqualsFn {
    Box::new(move |current, next| {
        match (current.downcast_ref::<T>(), next.downcast_ref::<T>()) {
            (Some(current), Some(next)) => equals(current, next),
            _ => false,
        }
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Graph
// ─────────────────────────────────────────────────────────────────────────────

/// Arena-style reactive graph. Owns all cells and watchers; handles stay
/// valid until explicitly removed and are safe (no-ops) afterwards.
pub struct ReactiveGraph {
    signals: SlotMap<SignalId, SignalCell>,
    watchers: SlotMap<WatcherId, WatcherSlot>,
    /// Watcher currently evaluating; reads register against it
    active: Option<WatcherId>,
    /// Watchers awaiting notification, in enqueue order, deduplicated
    pending: VecDeque<WatcherId>,
    batch_depth: u32,
    /// Number of watcher callbacks currently on the call stack
    run_depth: u32,
}

impl ReactiveGraph {
    pub fn new() -> Self {
        Self {
            signals: SlotMap::with_key(),
            watchers: SlotMap::with_key(),
            active: None,
            pending: VecDeque::new(),
            batch_depth: 0,
            run_depth: 0,
        }
    }

    // ── Signals ──────────────────────────────────────────────────────────

    /// Create a signal. Writes of a value equal to the current one (via
    /// `PartialEq`) are no-ops: no version bump, no notification.
    pub fn create_signal<T: PartialEq + Send + 'static>(&mut self, initial: T) -> Signal<T> {
        self.create_signal_with_equals(initial, T::eq)
    }

    /// Create a signal with a custom equality predicate deciding whether a
    /// write is a no-op.
    pub fn create_signal_with_equals<T: Send + 'static>(
        &mut self,
        initial: T,
        equals: impl Fn(&T, &T) -> bool + Send + 'static,
    ) -> Signal<T> {
        let id = self.signals.insert(SignalCell {
            value: Box::new(initial),
            version: 0,
            subscribers: SmallVec::new(),
            equals: erased_equals(equals),
        });
        Signal::from_id(id)
    }

    /// Read a signal's current value. Inside a watcher run this registers a
    /// dependency; at most one subscription per signal per run.
    pub fn get<T: Clone + 'static>(&mut self, signal: Signal<T>) -> Option<T> {
        if let Some(active) = self.active {
            self.subscribe(active, signal.id);
        }
        self.read(signal)
    }

    /// Read a signal's current value without registering a dependency
    pub fn peek<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.read(signal)
    }

    /// Write a signal. The value is stored immediately; subscribed watchers
    /// are queued and, outside batches and watcher runs, notified before
    /// this call returns. Equal values (per the cell's equality) do nothing.
    pub fn set<T: Send + 'static>(&mut self, signal: Signal<T>, value: T) {
        let Some(cell) = self.signals.get_mut(signal.id) else {
            tracing::trace!("Set on removed signal {:?} ignored", signal.id);
            return;
        };
        if (cell.equals)(cell.value.as_ref(), &value) {
            return;
        }
        cell.value = Box::new(value);
        cell.version += 1;
        let subscribers = cell.subscribers.clone();
        for watcher in subscribers {
            self.enqueue(watcher);
        }
        self.flush();
    }

    /// Read-modify-write without registering a dependency
    pub fn update<T, F>(&mut self, signal: Signal<T>, f: F)
    where
        T: Clone + Send + 'static,
        F: FnOnce(T) -> T,
    {
        if let Some(current) = self.peek(signal) {
            self.set(signal, f(current));
        }
    }

    /// Number of committed writes to this signal, or `None` if removed
    pub fn version<T>(&self, signal: Signal<T>) -> Option<u64> {
        self.signals.get(signal.id).map(|cell| cell.version)
    }

    /// Whether the signal still exists in the graph
    pub fn contains_signal<T>(&self, signal: Signal<T>) -> bool {
        self.signals.contains_key(signal.id)
    }

    /// Remove a signal. Later reads return `None` and writes are ignored.
    pub fn remove_signal<T>(&mut self, signal: Signal<T>) {
        if let Some(cell) = self.signals.remove(signal.id) {
            for watcher in cell.subscribers {
                if let Some(slot) = self.watchers.get_mut(watcher) {
                    slot.dependencies.retain(|s| *s != signal.id);
                }
            }
        }
    }

    // ── Watchers ─────────────────────────────────────────────────────────

    /// Register a watcher. The callback runs once immediately (collecting
    /// its dependencies) and again after any of them commits a write. The
    /// dependency set is re-collected from scratch on every run.
    pub fn watch<F>(&mut self, callback: F) -> WatcherId
    where
        F: FnMut(&mut ReactiveGraph) + Send + 'static,
    {
        let id = self.watchers.insert(WatcherSlot {
            callback: Some(Box::new(callback)),
            dependencies: SmallVec::new(),
            queued: false,
        });
        self.run_watcher(id);
        self.flush();
        id
    }

    /// Subscribe a handler to a single signal. The handler receives the
    /// current value immediately and the new value after every commit.
    pub fn connect<T, F>(&mut self, signal: Signal<T>, mut handler: F) -> WatcherId
    where
        T: Clone + 'static,
        F: FnMut(T) + Send + 'static,
    {
        self.watch(move |graph| {
            if let Some(value) = graph.get(signal) {
                handler(value);
            }
        })
    }

    /// Dispose a watcher: unsubscribe it everywhere and drop its callback.
    /// Idempotent. Safe to call from inside the watcher's own run.
    pub fn dispose_watcher(&mut self, id: WatcherId) {
        if !self.watchers.contains_key(id) {
            return;
        }
        self.clear_dependencies(id);
        self.watchers.remove(id);
    }

    /// Run a closure with dependency tracking suspended. Reads inside do
    /// not subscribe the enclosing watcher.
    pub fn untracked<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let prev = self.active.take();
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.active = prev;
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    // ── Derived values ───────────────────────────────────────────────────

    /// Create a derived value: `compute` runs now and after any dependency
    /// changes, writing its result into an output signal. The write is
    /// equality-gated, so downstream watchers are not notified when a
    /// recomputation lands on the same value.
    pub fn create_derived<T, F>(&mut self, mut compute: F) -> Derived<T>
    where
        T: PartialEq + Send + 'static,
        F: FnMut(&mut ReactiveGraph) -> T + Send + 'static,
    {
        let watcher = self.watchers.insert(WatcherSlot {
            callback: None,
            dependencies: SmallVec::new(),
            queued: false,
        });
        // First evaluation runs tracked under the new watcher so the
        // dependency set exists before the output signal does.
        let prev = self.active.replace(watcher);
        self.run_depth += 1;
        let initial = panic::catch_unwind(AssertUnwindSafe(|| compute(self)));
        self.run_depth -= 1;
        self.active = prev;
        let initial = match initial {
            Ok(value) => value,
            Err(payload) => {
                self.clear_dependencies(watcher);
                self.watchers.remove(watcher);
                panic::resume_unwind(payload);
            }
        };
        let signal = self.create_signal(initial);
        if let Some(slot) = self.watchers.get_mut(watcher) {
            slot.callback = Some(Box::new(move |graph| {
                let next = compute(graph);
                graph.set(signal, next);
            }));
        }
        self.flush();
        Derived { signal, watcher }
    }

    /// Read a derived value, registering a dependency when called from a
    /// watcher run
    pub fn get_derived<T: Clone + 'static>(&mut self, derived: Derived<T>) -> Option<T> {
        self.get(derived.signal)
    }

    /// Read a derived value without registering a dependency
    pub fn peek_derived<T: Clone + 'static>(&self, derived: Derived<T>) -> Option<T> {
        self.peek(derived.signal)
    }

    /// Dispose a derived value: stops recomputation and removes the output
    /// signal. Idempotent.
    pub fn dispose_derived<T>(&mut self, derived: Derived<T>) {
        self.dispose_watcher(derived.watcher);
        self.remove_signal(derived.signal);
    }

    // ── Batching ─────────────────────────────────────────────────────────

    /// Run `f` with notification deferred. Writes inside the batch are
    /// visible to reads immediately, but each affected watcher runs at most
    /// once, after the outermost batch exits.
    pub fn batch<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        self.batch_depth += 1;
        let result = panic::catch_unwind(AssertUnwindSafe(|| f(self)));
        self.batch_depth -= 1;
        self.flush();
        match result {
            Ok(value) => value,
            Err(payload) => panic::resume_unwind(payload),
        }
    }

    // ── Introspection ────────────────────────────────────────────────────

    /// Number of live signal cells (derived values count their output cell)
    pub fn signal_count(&self) -> usize {
        self.signals.len()
    }

    /// Number of live watchers (derived values count their recompute watcher)
    pub fn watcher_count(&self) -> usize {
        self.watchers.len()
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn read<T: Clone + 'static>(&self, signal: Signal<T>) -> Option<T> {
        self.signals.get(signal.id)?.value.downcast_ref::<T>().cloned()
    }

    /// Record `watcher reads signal` on both sides, once per run
    fn subscribe(&mut self, watcher: WatcherId, signal: SignalId) {
        let Some(cell) = self.signals.get_mut(signal) else {
            return;
        };
        let Some(slot) = self.watchers.get_mut(watcher) else {
            return;
        };
        if slot.dependencies.contains(&signal) {
            return;
        }
        slot.dependencies.push(signal);
        cell.subscribers.push(watcher);
    }

    /// Drop the watcher's dependency edges from both sides
    fn clear_dependencies(&mut self, id: WatcherId) {
        let dependencies = match self.watchers.get_mut(id) {
            Some(slot) => std::mem::take(&mut slot.dependencies),
            None => return,
        };
        for signal in dependencies {
            if let Some(cell) = self.signals.get_mut(signal) {
                cell.subscribers.retain(|w| *w != id);
            }
        }
    }

    fn enqueue(&mut self, id: WatcherId) {
        if let Some(slot) = self.watchers.get_mut(id) {
            if !slot.queued {
                slot.queued = true;
                self.pending.push_back(id);
            }
        }
    }

    /// Drain the pending queue unless a batch or a watcher run is on the
    /// stack; those drain when they unwind back to the top level.
    fn flush(&mut self) {
        if self.batch_depth == 0 && self.run_depth == 0 {
            self.drain();
        }
    }

    fn drain(&mut self) {
        while let Some(id) = self.pending.pop_front() {
            match self.watchers.get_mut(id) {
                Some(slot) => slot.queued = false,
                None => continue, // disposed while queued
            }
            self.run_watcher(id);
        }
    }

    /// Evaluate one watcher: clear its old dependencies, run the callback
    /// with this watcher active, and collect the new dependency set. A panic
    /// in the callback is caught and logged so one bad watcher cannot stall
    /// the rest of a pass.
    fn run_watcher(&mut self, id: WatcherId) {
        let Some(slot) = self.watchers.get_mut(id) else {
            return;
        };
        let Some(mut callback) = slot.callback.take() else {
            return; // already on the stack
        };
        self.clear_dependencies(id);
        let prev = self.active.replace(id);
        self.run_depth += 1;
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(self)));
        self.run_depth -= 1;
        self.active = prev;
        if outcome.is_err() {
            tracing::error!(
                "Watcher {:?} panicked; its dependency set may be incomplete",
                id
            );
        }
        // Skip the put-back if the watcher disposed itself during the run
        if let Some(slot) = self.watchers.get_mut(id) {
            slot.callback = Some(callback);
        }
    }
}

impl Default for ReactiveGraph {
    fn default() -> Self {
        Self::new()
    }
}
