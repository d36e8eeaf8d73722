//! Action-dispatch stores over reactive signals
//!
//! A store groups named fields, each backed by one signal, with a table of
//! actions: pure reducers bound to exactly one field. Fields expose no
//! setter; dispatching an action is the only write path, and one dispatch
//! performs exactly one signal write. Fields can opt into persistence, in
//! which case committed writes are mirrored to a storage backend and read
//! back when the store is rebuilt.

use std::any::Any;
use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use serde::Serialize;
use vela_core::{ReactiveGraph, Signal, SignalId, WatcherId};

use crate::error::{ActionError, StoreError};
use crate::storage::StorageBackend;

/// Typed handle to a store field. Copyable; only meaningful together with
/// the store that created it.
pub struct Field<T> {
    index: usize,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for Field<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Field<T> {}

impl<T> fmt::Debug for Field<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Field").field(&self.index).finish()
    }
}

/// Typed handle to a registered action: `T` is the bound field's type, `A`
/// the argument the reducer takes.
pub struct ActionHandle<T, A> {
    index: usize,
    _marker: PhantomData<fn(A) -> T>,
}

impl<T, A> Clone for ActionHandle<T, A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T, A> Copy for ActionHandle<T, A> {}

impl<T, A> fmt::Debug for ActionHandle<T, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ActionHandle").field(&self.index).finish()
    }
}

type CreateFn = Box<dyn FnOnce(&mut ReactiveGraph, Option<String>) -> SignalId + Send>;
type EncodeFn = Box<dyn Fn(&ReactiveGraph, SignalId) -> Option<String> + Send + Sync>;
type ApplyFn =
    Box<dyn Fn(&mut ReactiveGraph, SignalId, Box<dyn Any>) -> Result<(), StoreError> + Send + Sync>;

struct FieldDef {
    key: String,
    persisted: bool,
    create: CreateFn,
    encode: Option<EncodeFn>,
}

struct ActionDef {
    name: String,
    field: usize,
    apply: ApplyFn,
}

struct FieldSlot {
    key: String,
    persisted: bool,
    signal: SignalId,
    encode: Option<EncodeFn>,
}

struct StoreStorage {
    prefix: String,
    backend: Box<dyn StorageBackend>,
}

impl StoreStorage {
    fn key_for(&self, field: &str) -> String {
        format!("{}.{}", self.prefix, field)
    }
}

/// Declares fields and actions, then materializes them into a graph
pub struct StoreBuilder {
    name: String,
    fields: Vec<FieldDef>,
    actions: Vec<ActionDef>,
}

impl StoreBuilder {
    /// Declare a field holding `initial`
    pub fn field<T>(&mut self, key: impl Into<String>, initial: T) -> Field<T>
    where
        T: PartialEq + Clone + Send + 'static,
    {
        let index = self.fields.len();
        self.fields.push(FieldDef {
            key: key.into(),
            persisted: false,
            create: Box::new(move |graph, _| graph.create_signal(initial).id()),
            encode: None,
        });
        Field {
            index,
            _marker: PhantomData,
        }
    }

    /// Declare a field that mirrors committed writes to the store's storage
    /// under `"<prefix>.<key>"` and loads a persisted value, when present
    /// and decodable, in place of `initial` at build time.
    pub fn persisted_field<T>(&mut self, key: impl Into<String>, initial: T) -> Field<T>
    where
        T: PartialEq + Clone + Send + Serialize + DeserializeOwned + 'static,
    {
        let key = key.into();
        let index = self.fields.len();
        let decode_key = key.clone();
        let encode_key = key.clone();
        self.fields.push(FieldDef {
            key,
            persisted: true,
            create: Box::new(move |graph, loaded| {
                let initial = match loaded {
                    Some(raw) => match serde_json::from_str::<T>(&raw) {
                        Ok(value) => value,
                        Err(e) => {
                            tracing::warn!(
                                "Ignoring undecodable persisted value for field '{}': {}",
                                decode_key,
                                e
                            );
                            initial
                        }
                    },
                    None => initial,
                };
                graph.create_signal(initial).id()
            }),
            encode: Some(Box::new(move |graph, signal| {
                let value = graph.peek(Signal::<T>::from_id(signal))?;
                match serde_json::to_string(&value) {
                    Ok(json) => Some(json),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to encode field '{}' for persistence: {}",
                            encode_key,
                            e
                        );
                        None
                    }
                }
            })),
        });
        Field {
            index,
            _marker: PhantomData,
        }
    }

    /// Register a pure reducer bound to `field`. Dispatching the returned
    /// handle replaces the field value with `reducer(&current, arg)`.
    pub fn action<T, A, F>(
        &mut self,
        name: impl Into<String>,
        field: Field<T>,
        reducer: F,
    ) -> ActionHandle<T, A>
    where
        T: Clone + Send + 'static,
        A: 'static,
        F: Fn(&T, A) -> T + Send + Sync + 'static,
    {
        self.register_action(name.into(), field, move |current, arg| {
            Ok(reducer(current, arg))
        })
    }

    /// Register a fallible reducer. An `Err` aborts the dispatch: the field
    /// keeps its previous value and nothing is persisted.
    pub fn try_action<T, A, F>(
        &mut self,
        name: impl Into<String>,
        field: Field<T>,
        reducer: F,
    ) -> ActionHandle<T, A>
    where
        T: Clone + Send + 'static,
        A: 'static,
        F: Fn(&T, A) -> Result<T, ActionError> + Send + Sync + 'static,
    {
        self.register_action(name.into(), field, reducer)
    }

    fn register_action<T, A, F>(&mut self, name: String, field: Field<T>, reducer: F) -> ActionHandle<T, A>
    where
        T: Clone + Send + 'static,
        A: 'static,
        F: Fn(&T, A) -> Result<T, ActionError> + Send + Sync + 'static,
    {
        assert!(
            field.index < self.fields.len(),
            "action '{}' references a field from another store",
            name
        );
        let field_key = self.fields[field.index].key.clone();
        let action_name = name.clone();
        let index = self.actions.len();
        self.actions.push(ActionDef {
            name,
            field: field.index,
            apply: Box::new(move |graph, signal, arg| {
                let arg = arg
                    .downcast::<A>()
                    .map_err(|_| StoreError::ArgumentType(action_name.clone()))?;
                let signal = Signal::<T>::from_id(signal);
                let current = graph
                    .peek(signal)
                    .ok_or_else(|| StoreError::FieldRemoved(field_key.clone()))?;
                let next = reducer(&current, *arg)?;
                graph.set(signal, next);
                Ok(())
            }),
        });
        ActionHandle {
            index,
            _marker: PhantomData,
        }
    }

    /// Create the declared signals in `graph` and finish the store
    pub fn build(self, graph: &mut ReactiveGraph) -> Store {
        self.build_inner(graph, None)
    }

    /// Like [`StoreBuilder::build`], with persistence: persisted fields load
    /// from `backend` now and mirror committed writes to it from then on.
    pub fn build_with_storage(
        self,
        graph: &mut ReactiveGraph,
        prefix: impl Into<String>,
        backend: Box<dyn StorageBackend>,
    ) -> Store {
        self.build_inner(
            graph,
            Some(StoreStorage {
                prefix: prefix.into(),
                backend,
            }),
        )
    }

    fn build_inner(self, graph: &mut ReactiveGraph, storage: Option<StoreStorage>) -> Store {
        let mut fields = Vec::with_capacity(self.fields.len());
        for def in self.fields {
            let loaded = match &storage {
                Some(storage) if def.persisted => storage.backend.get(&storage.key_for(&def.key)),
                _ => None,
            };
            let signal = (def.create)(graph, loaded);
            fields.push(FieldSlot {
                key: def.key,
                persisted: def.persisted,
                signal,
                encode: def.encode,
            });
        }
        Store {
            name: self.name,
            fields,
            actions: self.actions,
            storage,
        }
    }
}

/// Named group of signal-backed fields whose only write path is the action
/// table built alongside them.
pub struct Store {
    name: String,
    fields: Vec<FieldSlot>,
    actions: Vec<ActionDef>,
    storage: Option<StoreStorage>,
}

impl Store {
    /// Start defining a store
    pub fn builder(name: impl Into<String>) -> StoreBuilder {
        StoreBuilder {
            name: name.into(),
            fields: Vec::new(),
            actions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Read a field. Inside a watcher run this registers a dependency,
    /// exactly like a signal read.
    pub fn get<T: Clone + 'static>(&self, graph: &mut ReactiveGraph, field: Field<T>) -> Option<T> {
        let slot = self.fields.get(field.index)?;
        graph.get(Signal::from_id(slot.signal))
    }

    /// Read a field without registering a dependency
    pub fn peek<T: Clone + 'static>(&self, graph: &ReactiveGraph, field: Field<T>) -> Option<T> {
        let slot = self.fields.get(field.index)?;
        graph.peek(Signal::from_id(slot.signal))
    }

    /// Committed write count of the field's backing signal
    pub fn version<T>(&self, graph: &ReactiveGraph, field: Field<T>) -> Option<u64> {
        let slot = self.fields.get(field.index)?;
        graph.version(Signal::<T>::from_id(slot.signal))
    }

    /// Subscribe a handler to one field; it receives the current value
    /// immediately and every committed value afterwards
    pub fn connect<T, F>(
        &self,
        graph: &mut ReactiveGraph,
        field: Field<T>,
        handler: F,
    ) -> Option<WatcherId>
    where
        T: Clone + 'static,
        F: FnMut(T) + Send + 'static,
    {
        let slot = self.fields.get(field.index)?;
        Some(graph.connect(Signal::from_id(slot.signal), handler))
    }

    /// Dispatch an action: read the bound field, run the reducer, write the
    /// result back. Exactly one signal write per call; the write is
    /// equality-gated like any signal write. Returns the post-dispatch
    /// value. With persistence configured, a committed write on a persisted
    /// field is mirrored to storage before returning.
    pub fn dispatch<T, A>(
        &self,
        graph: &mut ReactiveGraph,
        handle: &ActionHandle<T, A>,
        arg: A,
    ) -> Result<T, StoreError>
    where
        T: Clone + 'static,
        A: 'static,
    {
        let slot = self
            .actions
            .get(handle.index)
            .ok_or(StoreError::UnknownAction(handle.index))?;
        let field = self
            .fields
            .get(slot.field)
            .ok_or(StoreError::UnknownAction(handle.index))?;
        let signal = Signal::<T>::from_id(field.signal);

        let before = graph.version(signal);
        (slot.apply)(graph, field.signal, Box::new(arg))?;
        if graph.version(signal) != before {
            self.write_through(graph, field);
        }
        graph
            .peek(signal)
            .ok_or_else(|| StoreError::FieldRemoved(field.key.clone()))
    }

    /// Field keys in declaration order
    pub fn field_names(&self) -> Vec<&str> {
        self.fields.iter().map(|f| f.key.as_str()).collect()
    }

    /// Action names in registration order
    pub fn action_names(&self) -> Vec<&str> {
        self.actions.iter().map(|a| a.name.as_str()).collect()
    }

    pub fn contains_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }

    fn write_through(&self, graph: &ReactiveGraph, field: &FieldSlot) {
        let Some(storage) = &self.storage else {
            return;
        };
        if !field.persisted {
            return;
        }
        let Some(encode) = &field.encode else {
            return;
        };
        if let Some(json) = encode(graph, field.signal) {
            storage.backend.set(&storage.key_for(&field.key), &json);
        }
    }
}

impl fmt::Debug for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Store")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .field("actions", &self.action_names())
            .finish()
    }
}
