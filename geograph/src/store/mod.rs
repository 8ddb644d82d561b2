//! Graph storage capability layer and backends.
//!
//! This module provides the storage abstraction for geograph. The storage
//! system is pluggable: backends implement [`GraphStoreProvider`] and are
//! wrapped in the cheap, cloneable [`GraphStore`] handle.
//!
//! # Capability Set
//!
//! A graph store provides:
//! - Vertex operations: create, delete, property get/set/has/remove
//! - Edge operations: connect, iterate by type and direction, single-edge
//!   lookup, delete
//! - Transactions: begin, with commit-or-rollback on finish
//!
//! # Backends
//!
//! - **In-Memory Store**: [`InMemoryGraphStore`] for testing and temporary
//!   data. All data is lost when the store is dropped.

mod graph_store;
pub mod memory;
mod property;

pub use graph_store::*;
pub use memory::InMemoryGraphStore;
pub use property::*;
