use crate::errors::GraphResult;
use crate::store::PropertyValue;
use crate::transaction::Transaction;
use std::fmt::{Debug, Display, Formatter};
use std::ops::Deref;
use std::sync::Arc;

/// Opaque handle to a vertex in the graph.
///
/// Vertex identifiers are assigned by the backend and must be treated as
/// opaque: they are stable for the lifetime of the vertex but carry no
/// ordering or locality guarantees.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct VertexId(pub u64);

impl Display for VertexId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

impl Debug for VertexId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Opaque handle to an edge in the graph.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
pub struct EdgeId(pub u64);

impl Display for EdgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

impl Debug for EdgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self)
    }
}

/// Direction of an edge relative to a vertex.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Direction {
    /// The edge points towards the vertex.
    Incoming,
    /// The edge points away from the vertex.
    Outgoing,
}

impl Direction {
    /// Parses a direction from its canonical string form (`IN`/`OUT`, also
    /// accepting `INCOMING`/`OUTGOING`).
    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "IN" | "INCOMING" => Some(Direction::Incoming),
            "OUT" | "OUTGOING" => Some(Direction::Outgoing),
            _ => None,
        }
    }
}

/// A materialized edge record returned by edge iteration.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Edge {
    pub id: EdgeId,
    pub start: VertexId,
    pub end: VertexId,
    pub edge_type: String,
}

impl Edge {
    /// Returns the endpoint that is not `vertex`.
    ///
    /// For self-loops both endpoints equal `vertex` and `vertex` is returned.
    pub fn other(&self, vertex: VertexId) -> VertexId {
        if self.start == vertex {
            self.end
        } else {
            self.start
        }
    }
}

/// Low-level interface for graph store implementations.
///
/// # Purpose
/// Defines the contract that all graph store backends must implement.
/// Implementers provide concrete storage for vertices, typed directed edges
/// and typed vertex properties, together with transactional mutation.
///
/// # Key Methods
/// - **Vertex Operations**: `create_vertex()`, `delete_vertex()`, `vertex_exists()`
/// - **Property Operations**: `get_property()`, `set_property()`, `has_property()`,
///   `remove_property()`
/// - **Edge Operations**: `connect()`, `edges_out()`, `edges_in()`, `single_out()`,
///   `single_in()`, `all_edges()`, `delete_edge()`
/// - **Transactions**: `begin_tx()`
///
/// # Thread Safety
/// Implementers must be `Send + Sync`. The store itself only guarantees a
/// single-writer/multi-reader discipline: concurrent writers produce
/// undefined structural state and must be serialised by the caller.
pub trait GraphStoreProvider: Send + Sync {
    /// Creates a new vertex with no properties and no edges.
    fn create_vertex(&self) -> GraphResult<VertexId>;

    /// Deletes a vertex.
    ///
    /// # Errors
    /// * `ErrorKind::VertexNotFound` if the vertex does not exist
    /// * `ErrorKind::InvalidOperation` if the vertex still has edges attached
    fn delete_vertex(&self, vertex: VertexId) -> GraphResult<()>;

    /// Checks whether a vertex exists.
    fn vertex_exists(&self, vertex: VertexId) -> GraphResult<bool>;

    /// Retrieves a property value, or `None` if absent.
    fn get_property(&self, vertex: VertexId, key: &str) -> GraphResult<Option<PropertyValue>>;

    /// Sets a property value, replacing any previous value.
    fn set_property(&self, vertex: VertexId, key: &str, value: PropertyValue) -> GraphResult<()>;

    /// Checks whether a property is present.
    fn has_property(&self, vertex: VertexId, key: &str) -> GraphResult<bool>;

    /// Removes a property, returning the previous value if there was one.
    fn remove_property(&self, vertex: VertexId, key: &str) -> GraphResult<Option<PropertyValue>>;

    /// Creates a directed, typed edge from `start` to `end`.
    fn connect(&self, start: VertexId, end: VertexId, edge_type: &str) -> GraphResult<EdgeId>;

    /// Deletes an edge.
    fn delete_edge(&self, edge: EdgeId) -> GraphResult<()>;

    /// Returns the outgoing edges of `vertex` with the given type.
    ///
    /// Enumeration order is backend-defined and not stable across restarts.
    fn edges_out(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Vec<Edge>>;

    /// Returns the incoming edges of `vertex` with the given type.
    fn edges_in(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Vec<Edge>>;

    /// Returns the single outgoing edge of the given type, or `None`.
    ///
    /// # Errors
    /// * `ErrorKind::AmbiguousEdge` if more than one such edge exists
    fn single_out(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Option<Edge>>;

    /// Returns the single incoming edge of the given type, or `None`.
    ///
    /// # Errors
    /// * `ErrorKind::AmbiguousEdge` if more than one such edge exists
    fn single_in(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Option<Edge>>;

    /// Returns every edge attached to `vertex`, of any type, in either
    /// direction.
    fn all_edges(&self, vertex: VertexId) -> GraphResult<Vec<Edge>>;

    /// Begins a transaction.
    ///
    /// Transactions nest: an inner `begin_tx` joins the outermost
    /// transaction, and a failure at any depth rolls back the whole.
    fn begin_tx(&self) -> GraphResult<Transaction>;
}

/// Cheap, cloneable handle over a [`GraphStoreProvider`].
///
/// # Notes
/// - The provider is wrapped in an `Arc` for efficient, thread-safe sharing
/// - Cloning `GraphStore` only increments the reference count
/// - Dereferences to `Arc<dyn GraphStoreProvider>`, so all provider methods
///   are callable directly on the handle
#[derive(Clone)]
pub struct GraphStore {
    inner: Arc<dyn GraphStoreProvider>,
}

impl GraphStore {
    /// Creates a new `GraphStore` wrapping a provider implementation.
    pub fn new<T: GraphStoreProvider + 'static>(inner: T) -> Self {
        GraphStore {
            inner: Arc::new(inner),
        }
    }
}

impl Deref for GraphStore {
    type Target = Arc<dyn GraphStoreProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
