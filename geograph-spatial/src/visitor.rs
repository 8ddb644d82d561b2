//! The visitor protocol driving tree traversal.
//!
//! A visitor is a capability pair: a pruning predicate over index-node
//! envelopes and a callback for leaf references. Search kinds, counters and
//! maintenance sweeps are all expressed as visitors; dynamic layers compose
//! by wrapping one visitor in another.

use crate::envelope::Envelope;
use crate::error::SpatialResult;
use geograph::store::VertexId;

/// Capability pair driving a depth-first traversal of the index.
///
/// Traversal visits an index vertex only if `needs_to_visit` approves its
/// envelope, then recurses into `CHILD` edges or, at a leaf, feeds every
/// `REFERENCE` target to `on_index_reference`.
///
/// Visitors are invoked in depth-first order following edge enumeration.
/// Enumeration order is backend-defined and not stable across restarts, so
/// result order is not part of the contract.
pub trait SpatialIndexVisitor {
    /// Decides whether the subtree under an index vertex with the given
    /// envelope can contain anything of interest.
    fn needs_to_visit(&self, envelope: &Envelope) -> bool;

    /// Called for every geometry vertex referenced from a visited leaf.
    ///
    /// An error terminates the traversal and propagates to the caller.
    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()>;
}

/// Counts reachable references without collecting them.
///
/// Used to reconcile the cached geometry count with the tree.
#[derive(Debug, Default)]
pub struct RecordCounter {
    count: u64,
}

impl RecordCounter {
    pub fn new() -> RecordCounter {
        RecordCounter { count: 0 }
    }

    /// The number of references seen so far.
    pub fn count(&self) -> u64 {
        self.count
    }
}

impl SpatialIndexVisitor for RecordCounter {
    fn needs_to_visit(&self, _envelope: &Envelope) -> bool {
        true
    }

    fn on_index_reference(&mut self, _geom_node: VertexId) -> SpatialResult<()> {
        self.count += 1;
        Ok(())
    }
}

/// Touches every index vertex without collecting anything, pulling the whole
/// tree through the host store's caches.
#[derive(Debug, Default)]
pub struct WarmUpVisitor;

impl SpatialIndexVisitor for WarmUpVisitor {
    fn needs_to_visit(&self, _envelope: &Envelope) -> bool {
        true
    }

    fn on_index_reference(&mut self, _geom_node: VertexId) -> SpatialResult<()> {
        Ok(())
    }
}
