//! Vela Application State
//!
//! Stores group reactive signals into named fields and route every mutation
//! through a table of pure reducers ("actions"):
//!
//! - **One signal per field**: reads track like any other signal read
//! - **No setters**: dispatching an action is the only write path
//! - **One write per dispatch**: each action is bound to exactly one field
//! - **Best-effort persistence**: persisted fields mirror committed writes
//!   to a storage backend and load from it when the store is rebuilt
//!
//! # Example
//!
//! ```rust
//! use vela_core::ReactiveGraph;
//! use vela_store::Store;
//!
//! let mut graph = ReactiveGraph::new();
//!
//! let mut builder = Store::builder("counter");
//! let count = builder.field("count", 0i32);
//! let add = builder.action("add", count, |current, amount: i32| current + amount);
//! let store = builder.build(&mut graph);
//!
//! store.dispatch(&mut graph, &add, 5).unwrap();
//! assert_eq!(store.get(&mut graph, count), Some(5));
//! ```

pub mod error;
pub mod storage;
pub mod store;

pub use error::{ActionError, Result, StoreError};
pub use storage::{FileBackend, MemoryBackend, StorageBackend};
pub use store::{ActionHandle, Field, Store, StoreBuilder};
