//! # Geograph - Embedded Property Graph Store
//!
//! Geograph is a lightweight, embedded property-graph store layer written in
//! Rust. It provides the host capabilities required by the `geograph-spatial`
//! index crate: vertices, directed typed edges, typed properties and
//! transactions with rollback.
//!
//! ## Key Features
//!
//! - **Embedded**: No separate server process required
//! - **Property Graph**: Vertices and directed, typed edges carrying typed properties
//! - **Transactions**: Commit/rollback semantics with nested-transaction support
//! - **Pluggable Backends**: Storage is abstracted behind the `GraphStoreProvider`
//!   trait; an in-memory reference store is included
//! - **Clean API**: PIMPL pattern provides stable, encapsulated interfaces
//!
//! ## Quick Start
//!
//! ```rust
//! use geograph::store::{GraphStore, InMemoryGraphStore};
//! use geograph::store::PropertyValue;
//!
//! # fn main() -> geograph::errors::GraphResult<()> {
//! let store = GraphStore::new(InMemoryGraphStore::new());
//!
//! let tx = store.begin_tx()?;
//! let v = store.create_vertex()?;
//! store.set_property(v, "name", PropertyValue::from("first vertex"))?;
//! tx.success();
//! tx.finish()?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! - [`common`] - Common types, traits, and utilities
//! - [`errors`] - Error types and result definitions
//! - [`store`] - Graph store capability traits and the in-memory backend
//! - [`transaction`] - Transaction handles and providers

pub mod common;
pub mod errors;
pub mod store;
pub mod transaction;

pub use common::{atomic, Atomic, Listener, NullListener};
pub use errors::{ErrorKind, GraphError, GraphResult};
pub use store::{
    Direction, Edge, EdgeId, GraphStore, GraphStoreProvider, InMemoryGraphStore, PropertyValue,
    VertexId,
};
pub use transaction::{Transaction, TransactionProvider};
