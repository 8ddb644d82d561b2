use crate::errors::{ErrorKind, GraphError, GraphResult};
use crate::store::{Edge, EdgeId, GraphStoreProvider, PropertyValue, VertexId};
use crate::transaction::{Transaction, TransactionProvider};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory implementation of a graph store.
///
/// # Purpose
/// `InMemoryGraphStore` provides a complete in-memory graph store suitable
/// for testing, temporary data, and scenarios where persistence is not
/// required. Vertices and edges live in concurrent hash tables.
///
/// # Characteristics
/// - **Thread-Safe Reads**: Concurrent data structures allow safe shared reads
/// - **Single Writer**: Mutation is not internally serialised; concurrent
///   writers must be coordinated by the caller
/// - **Transactional**: Mutations inside a transaction are journaled and
///   undone in reverse order on rollback
/// - **No Persistence**: All data is lost when the store is dropped
///
/// # Transactions
/// Transactions nest by joining the outermost transaction: an inner
/// transaction only contributes its outcome flag, and the journal is
/// committed or rolled back when the outermost transaction finishes.
/// Mutations performed with no open transaction are applied immediately and
/// are not journaled.
#[derive(Clone)]
pub struct InMemoryGraphStore {
    inner: Arc<InMemoryGraphStoreInner>,
}

impl Default for InMemoryGraphStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryGraphStore {
    /// Creates a new, empty in-memory graph store.
    pub fn new() -> InMemoryGraphStore {
        InMemoryGraphStore {
            inner: Arc::new(InMemoryGraphStoreInner::new()),
        }
    }

    /// Closes the store. Further operations fail with `StoreAlreadyClosed`.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::SeqCst);
    }

    /// Returns the number of vertices currently stored.
    pub fn vertex_count(&self) -> usize {
        self.inner.vertices.len()
    }

    /// Returns the number of edges currently stored.
    pub fn edge_count(&self) -> usize {
        self.inner.edges.len()
    }
}

#[derive(Clone, Default)]
struct VertexData {
    properties: HashMap<String, PropertyValue>,
    outgoing: Vec<u64>,
    incoming: Vec<u64>,
}

#[derive(Clone)]
struct EdgeData {
    start: u64,
    end: u64,
    edge_type: String,
}

/// One reversible mutation, journaled while a transaction is open.
enum UndoOp {
    CreateVertex(u64),
    DeleteVertex(u64, VertexData),
    SetProperty(u64, String, Option<PropertyValue>),
    RemoveProperty(u64, String, PropertyValue),
    CreateEdge(u64),
    DeleteEdge(u64, EdgeData),
}

#[derive(Default)]
struct TxnState {
    depth: u32,
    failed: bool,
    journal: Vec<UndoOp>,
}

struct InMemoryGraphStoreInner {
    vertices: DashMap<u64, VertexData>,
    edges: DashMap<u64, EdgeData>,
    next_vertex_id: AtomicU64,
    next_edge_id: AtomicU64,
    closed: AtomicBool,
    txn: Mutex<TxnState>,
}

impl InMemoryGraphStoreInner {
    fn new() -> InMemoryGraphStoreInner {
        InMemoryGraphStoreInner {
            vertices: DashMap::new(),
            edges: DashMap::new(),
            next_vertex_id: AtomicU64::new(1),
            next_edge_id: AtomicU64::new(1),
            closed: AtomicBool::new(false),
            txn: Mutex::new(TxnState::default()),
        }
    }

    fn check_open(&self) -> GraphResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            Err(GraphError::new(
                "Graph store already closed",
                ErrorKind::StoreAlreadyClosed,
            ))
        } else {
            Ok(())
        }
    }

    /// Journals an undo entry when a transaction is open.
    fn record(&self, op: UndoOp) {
        let mut txn = self.txn.lock();
        if txn.depth > 0 {
            txn.journal.push(op);
        }
    }

    fn with_vertex<R>(
        &self,
        vertex: VertexId,
        f: impl FnOnce(&VertexData) -> R,
    ) -> GraphResult<R> {
        match self.vertices.get(&vertex.0) {
            Some(data) => Ok(f(&data)),
            None => Err(GraphError::new(
                &format!("Vertex {} not found", vertex),
                ErrorKind::VertexNotFound,
            )),
        }
    }

    fn with_vertex_mut<R>(
        &self,
        vertex: VertexId,
        f: impl FnOnce(&mut VertexData) -> R,
    ) -> GraphResult<R> {
        match self.vertices.get_mut(&vertex.0) {
            Some(mut data) => Ok(f(&mut data)),
            None => Err(GraphError::new(
                &format!("Vertex {} not found", vertex),
                ErrorKind::VertexNotFound,
            )),
        }
    }

    fn edge_record(&self, id: u64, data: &EdgeData) -> Edge {
        Edge {
            id: EdgeId(id),
            start: VertexId(data.start),
            end: VertexId(data.end),
            edge_type: data.edge_type.clone(),
        }
    }

    /// Replays the undo journal in reverse. The transaction mutex is held by
    /// the caller, and the replay writes straight into the tables so nothing
    /// is re-journaled.
    fn rollback(&self, journal: Vec<UndoOp>) {
        for op in journal.into_iter().rev() {
            match op {
                UndoOp::CreateVertex(id) => {
                    self.vertices.remove(&id);
                }
                UndoOp::DeleteVertex(id, data) => {
                    self.vertices.insert(id, data);
                }
                UndoOp::SetProperty(id, key, previous) => {
                    if let Some(mut data) = self.vertices.get_mut(&id) {
                        match previous {
                            Some(value) => {
                                data.properties.insert(key, value);
                            }
                            None => {
                                data.properties.remove(&key);
                            }
                        }
                    }
                }
                UndoOp::RemoveProperty(id, key, value) => {
                    if let Some(mut data) = self.vertices.get_mut(&id) {
                        data.properties.insert(key, value);
                    }
                }
                UndoOp::CreateEdge(id) => {
                    if let Some((_, data)) = self.edges.remove(&id) {
                        self.unlink_adjacency(id, &data);
                    }
                }
                UndoOp::DeleteEdge(id, data) => {
                    self.link_adjacency(id, &data);
                    self.edges.insert(id, data);
                }
            }
        }
    }

    fn link_adjacency(&self, edge_id: u64, data: &EdgeData) {
        if let Some(mut start) = self.vertices.get_mut(&data.start) {
            start.outgoing.push(edge_id);
        }
        if let Some(mut end) = self.vertices.get_mut(&data.end) {
            end.incoming.push(edge_id);
        }
    }

    fn unlink_adjacency(&self, edge_id: u64, data: &EdgeData) {
        if let Some(mut start) = self.vertices.get_mut(&data.start) {
            start.outgoing.retain(|&e| e != edge_id);
        }
        if let Some(mut end) = self.vertices.get_mut(&data.end) {
            end.incoming.retain(|&e| e != edge_id);
        }
    }

    fn typed_edges(&self, edge_ids: &[u64], edge_type: &str) -> Vec<Edge> {
        let mut result = Vec::new();
        for &id in edge_ids {
            if let Some(data) = self.edges.get(&id) {
                if data.edge_type == edge_type {
                    result.push(self.edge_record(id, &data));
                }
            }
        }
        result
    }

    fn single_of(&self, edges: Vec<Edge>, vertex: VertexId, edge_type: &str) -> GraphResult<Option<Edge>> {
        if edges.len() > 1 {
            return Err(GraphError::new(
                &format!(
                    "Vertex {} has {} edges of type {}, expected at most one",
                    vertex,
                    edges.len(),
                    edge_type
                ),
                ErrorKind::AmbiguousEdge,
            ));
        }
        Ok(edges.into_iter().next())
    }
}

impl GraphStoreProvider for InMemoryGraphStore {
    fn create_vertex(&self) -> GraphResult<VertexId> {
        self.inner.check_open()?;
        let id = self.inner.next_vertex_id.fetch_add(1, Ordering::SeqCst);
        self.inner.vertices.insert(id, VertexData::default());
        self.inner.record(UndoOp::CreateVertex(id));
        Ok(VertexId(id))
    }

    fn delete_vertex(&self, vertex: VertexId) -> GraphResult<()> {
        self.inner.check_open()?;
        let detached = self
            .inner
            .with_vertex(vertex, |data| data.outgoing.is_empty() && data.incoming.is_empty())?;
        if !detached {
            return Err(GraphError::new(
                &format!("Cannot delete vertex {} while it has edges", vertex),
                ErrorKind::InvalidOperation,
            ));
        }
        if let Some((id, data)) = self.inner.vertices.remove(&vertex.0) {
            self.inner.record(UndoOp::DeleteVertex(id, data));
        }
        Ok(())
    }

    fn vertex_exists(&self, vertex: VertexId) -> GraphResult<bool> {
        self.inner.check_open()?;
        Ok(self.inner.vertices.contains_key(&vertex.0))
    }

    fn get_property(&self, vertex: VertexId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.inner.check_open()?;
        self.inner
            .with_vertex(vertex, |data| data.properties.get(key).cloned())
    }

    fn set_property(&self, vertex: VertexId, key: &str, value: PropertyValue) -> GraphResult<()> {
        self.inner.check_open()?;
        let previous = self
            .inner
            .with_vertex_mut(vertex, |data| data.properties.insert(key.to_string(), value))?;
        self.inner
            .record(UndoOp::SetProperty(vertex.0, key.to_string(), previous));
        Ok(())
    }

    fn has_property(&self, vertex: VertexId, key: &str) -> GraphResult<bool> {
        self.inner.check_open()?;
        self.inner
            .with_vertex(vertex, |data| data.properties.contains_key(key))
    }

    fn remove_property(&self, vertex: VertexId, key: &str) -> GraphResult<Option<PropertyValue>> {
        self.inner.check_open()?;
        let previous = self
            .inner
            .with_vertex_mut(vertex, |data| data.properties.remove(key))?;
        if let Some(value) = &previous {
            self.inner.record(UndoOp::RemoveProperty(
                vertex.0,
                key.to_string(),
                value.clone(),
            ));
        }
        Ok(previous)
    }

    fn connect(&self, start: VertexId, end: VertexId, edge_type: &str) -> GraphResult<EdgeId> {
        self.inner.check_open()?;
        if !self.inner.vertices.contains_key(&start.0) {
            return Err(GraphError::new(
                &format!("Vertex {} not found", start),
                ErrorKind::VertexNotFound,
            ));
        }
        if !self.inner.vertices.contains_key(&end.0) {
            return Err(GraphError::new(
                &format!("Vertex {} not found", end),
                ErrorKind::VertexNotFound,
            ));
        }

        let id = self.inner.next_edge_id.fetch_add(1, Ordering::SeqCst);
        let data = EdgeData {
            start: start.0,
            end: end.0,
            edge_type: edge_type.to_string(),
        };
        self.inner.link_adjacency(id, &data);
        self.inner.edges.insert(id, data);
        self.inner.record(UndoOp::CreateEdge(id));
        Ok(EdgeId(id))
    }

    fn delete_edge(&self, edge: EdgeId) -> GraphResult<()> {
        self.inner.check_open()?;
        let (id, data) = self.inner.edges.remove(&edge.0).ok_or_else(|| {
            GraphError::new(&format!("Edge {} not found", edge), ErrorKind::EdgeNotFound)
        })?;
        self.inner.unlink_adjacency(id, &data);
        self.inner.record(UndoOp::DeleteEdge(id, data));
        Ok(())
    }

    fn edges_out(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Vec<Edge>> {
        self.inner.check_open()?;
        let outgoing = self.inner.with_vertex(vertex, |data| data.outgoing.clone())?;
        Ok(self.inner.typed_edges(&outgoing, edge_type))
    }

    fn edges_in(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Vec<Edge>> {
        self.inner.check_open()?;
        let incoming = self.inner.with_vertex(vertex, |data| data.incoming.clone())?;
        Ok(self.inner.typed_edges(&incoming, edge_type))
    }

    fn single_out(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Option<Edge>> {
        let edges = self.edges_out(vertex, edge_type)?;
        self.inner.single_of(edges, vertex, edge_type)
    }

    fn single_in(&self, vertex: VertexId, edge_type: &str) -> GraphResult<Option<Edge>> {
        let edges = self.edges_in(vertex, edge_type)?;
        self.inner.single_of(edges, vertex, edge_type)
    }

    fn all_edges(&self, vertex: VertexId) -> GraphResult<Vec<Edge>> {
        self.inner.check_open()?;
        let (outgoing, incoming) = self
            .inner
            .with_vertex(vertex, |data| (data.outgoing.clone(), data.incoming.clone()))?;

        let mut result = Vec::with_capacity(outgoing.len() + incoming.len());
        for &id in outgoing.iter() {
            if let Some(data) = self.inner.edges.get(&id) {
                result.push(self.inner.edge_record(id, &data));
            }
        }
        for &id in incoming.iter() {
            // A self-loop appears in both adjacency lists
            if outgoing.contains(&id) {
                continue;
            }
            if let Some(data) = self.inner.edges.get(&id) {
                result.push(self.inner.edge_record(id, &data));
            }
        }
        Ok(result)
    }

    fn begin_tx(&self) -> GraphResult<Transaction> {
        self.inner.check_open()?;
        {
            let mut txn = self.inner.txn.lock();
            txn.depth += 1;
        }
        Ok(Transaction::new(InMemoryTransaction {
            id: Uuid::new_v4().to_string(),
            store: Arc::clone(&self.inner),
            success: AtomicBool::new(false),
            completed: AtomicBool::new(false),
        }))
    }
}

/// Transaction over the in-memory store.
///
/// An inner transaction only contributes its outcome flag; the journal is
/// committed or rolled back when the outermost transaction completes.
struct InMemoryTransaction {
    id: String,
    store: Arc<InMemoryGraphStoreInner>,
    success: AtomicBool,
    completed: AtomicBool,
}

impl TransactionProvider for InMemoryTransaction {
    fn id(&self) -> &str {
        &self.id
    }

    fn mark_success(&self) {
        self.success.store(true, Ordering::SeqCst);
    }

    fn mark_failure(&self) {
        self.success.store(false, Ordering::SeqCst);
    }

    fn complete(&self) -> GraphResult<()> {
        if self.completed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let mut txn = self.store.txn.lock();
        if txn.depth == 0 {
            return Err(GraphError::new(
                "Unbalanced transaction completion",
                ErrorKind::TransactionError,
            ));
        }

        if !self.success.load(Ordering::SeqCst) {
            txn.failed = true;
        }
        txn.depth -= 1;

        if txn.depth == 0 {
            let journal = std::mem::take(&mut txn.journal);
            let failed = txn.failed;
            txn.failed = false;
            if failed {
                self.store.rollback(journal);
            }
        }
        Ok(())
    }
}
