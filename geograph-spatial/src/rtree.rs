//! The graph-backed R-tree index.
//!
//! Tree nodes, parent/child links and leaf-to-geometry links are all
//! expressed as vertices and typed edges in the host graph; every structural
//! mutation runs inside a host transaction. The tree is height-balanced with
//! fanout bounds `[minNodeReferences, maxNodeReferences]`, uses Guttman's
//! quadratic split on overflow and evicts-and-reinserts on underflow.
//!
//! Layout in the graph:
//!
//! ```text
//! (layer) -ROOT-> (index vertex) -CHILD-> (index vertex) -REFERENCE-> (geometry)
//!    \---METADATA-> (metadata vertex)
//! ```
//!
//! An index vertex is a leaf iff it has no outgoing `CHILD` edge; no index
//! vertex ever has both `CHILD` and `REFERENCE` edges. Every index vertex
//! carries its bounding box in the `bbox` property as
//! `[xmin, xmax, ymin, ymax]`.

use crate::constants::{
    DEFAULT_MAX_NODE_REFERENCES, DEFAULT_MIN_NODE_REFERENCES, PROP_BBOX,
    PROP_MAX_NODE_REFERENCES, PROP_MIN_NODE_REFERENCES, PROP_TOTAL_GEOMETRY_COUNT, RTREE_CHILD,
    RTREE_METADATA, RTREE_REFERENCE, RTREE_ROOT,
};
use crate::encoder::envelope_from_property;
use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::layer::{Layer, SpatialRecord};
use crate::visitor::{RecordCounter, SpatialIndexVisitor, WarmUpVisitor};
use geograph::common::Listener;
use geograph::store::{GraphStore, PropertyValue, VertexId};
use geograph::NullListener;
use parking_lot::Mutex;

#[derive(Debug, Default)]
struct CountCache {
    total: u64,
    saved: bool,
}

/// A persistent, height-balanced R-tree over the host graph.
///
/// One `RTreeIndex` indexes the geometries of one [`Layer`]. Reads may run
/// concurrently; writes must be serialised by the caller (single-writer,
/// multi-reader at the layer level).
pub struct RTreeIndex {
    store: GraphStore,
    layer: Layer,
    max_node_references: usize,
    min_node_references: usize,
    count_cache: Mutex<CountCache>,
}

impl RTreeIndex {
    /// Opens (or lazily initialises) the index of `layer` with the default
    /// fanout bounds.
    pub fn new(store: GraphStore, layer: Layer) -> SpatialResult<RTreeIndex> {
        Self::with_fanout(
            store,
            layer,
            DEFAULT_MAX_NODE_REFERENCES,
            DEFAULT_MIN_NODE_REFERENCES,
        )
    }

    /// Opens (or lazily initialises) the index with explicit fanout bounds.
    ///
    /// When the layer already has a metadata vertex, the persisted bounds win
    /// over the arguments: fanout is fixed at index creation time.
    pub fn with_fanout(
        store: GraphStore,
        layer: Layer,
        max_node_references: usize,
        min_node_references: usize,
    ) -> SpatialResult<RTreeIndex> {
        let mut index = RTreeIndex {
            store,
            layer,
            max_node_references,
            min_node_references,
            count_cache: Mutex::new(CountCache::default()),
        };

        let tx = index.store.begin_tx()?;
        let init = (|| -> SpatialResult<(usize, usize)> {
            index.ensure_index_root()?;
            index.ensure_index_metadata()
        })();
        match &init {
            Ok(_) => tx.success(),
            Err(_) => tx.failure(),
        }
        tx.finish()?;

        let (max, min) = init?;
        index.max_node_references = max;
        index.min_node_references = min;

        index.save_count()?;
        Ok(index)
    }

    /// Gets the layer this index belongs to.
    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    /// Gets the maximum entries per index vertex.
    pub fn max_node_references(&self) -> usize {
        self.max_node_references
    }

    /// Gets the minimum entries per non-root index vertex.
    pub fn min_node_references(&self) -> usize {
        self.min_node_references
    }

    // ------------------------------------------------------------------
    // Write path
    // ------------------------------------------------------------------

    /// Indexes a geometry vertex.
    ///
    /// Descends to the best leaf, links the geometry with a `REFERENCE`
    /// edge, adjusts bounding boxes along the path and splits on overflow,
    /// promoting a new root when a split reaches the top.
    pub fn add(&self, geom_node: VertexId) -> SpatialResult<()> {
        self.in_write_tx(|| {
            self.insert_geometry(geom_node)?;
            let mut cache = self.count_cache.lock();
            cache.total += 1;
            cache.saved = false;
            Ok(())
        })
    }

    /// Removes a geometry vertex from the index.
    ///
    /// With `delete_geom_node` the geometry vertex itself (and all its
    /// edges) is deleted as well; otherwise only the index linkage goes.
    ///
    /// # Errors
    /// * [`SpatialError::NotIndexed`] if `geom_node` is not reachable from
    ///   this layer's root
    pub fn remove(&self, geom_node: VertexId, delete_geom_node: bool) -> SpatialResult<()> {
        self.in_write_tx(|| {
            let leaf = self.find_leaf_containing(geom_node)?;

            let reference = self
                .store
                .single_in(geom_node, RTREE_REFERENCE)?
                .ok_or(SpatialError::NotIndexed(geom_node))?;
            self.store.delete_edge(reference.id)?;
            if delete_geom_node {
                self.delete_node(geom_node)?;
            }

            let leaf_parent = self.index_node_parent(leaf)?;
            if leaf_parent.is_some()
                && self.count_children(leaf, RTREE_REFERENCE)? < self.min_node_references
            {
                self.handle_underflow(leaf)?;
            } else {
                // leaf is the root or still satisfies the minimum
                self.recompute_node_bounding_box(leaf, RTREE_REFERENCE)?;
                self.tighten_path_bounding_box(leaf)?;
            }

            let mut cache = self.count_cache.lock();
            cache.total = cache.total.saturating_sub(1);
            cache.saved = false;
            Ok(())
        })
    }

    /// Empties the index, optionally deleting the geometry vertices.
    ///
    /// The traversal runs in a series of short transactions, one commit per
    /// leaf's batch of references, so a very large layer never exceeds the
    /// host's working-set limits. A mid-operation abort leaves a partially
    /// emptied but well-formed tree; re-running completes the job. The final
    /// transaction tears down the empty tree skeleton and the metadata
    /// vertex.
    pub fn remove_all(
        &self,
        delete_geom_nodes: bool,
        listener: &mut dyn Listener,
    ) -> SpatialResult<()> {
        let root = self.index_root()?;
        listener.begin(self.count()?);

        let visit_result = {
            let mut sweeper = ReferenceSweeper {
                index: self,
                delete_geom_nodes,
                listener: &mut *listener,
            };
            self.visit_in_tx_at(&mut sweeper, root)
        };
        listener.done();
        visit_result?;

        self.in_write_tx(|| {
            let root_edge = self
                .store
                .single_in(root, RTREE_ROOT)?
                .ok_or_else(|| self.internal_invariant("index root has no ROOT edge"))?;
            self.store.delete_edge(root_edge.id)?;
            self.delete_recursively_empty_subtree(root)?;

            if let Some(metadata_edge) = self
                .store
                .single_out(self.layer.layer_node(), RTREE_METADATA)?
            {
                let metadata_node = metadata_edge.end;
                self.store.delete_edge(metadata_edge.id)?;
                self.store.delete_vertex(metadata_node)?;
            }
            Ok(())
        })?;

        let mut cache = self.count_cache.lock();
        cache.total = 0;
        cache.saved = false;
        Ok(())
    }

    /// Empties the index and re-initialises an empty root and metadata
    /// vertex. Geometry vertices survive.
    pub fn clear(&self, _listener: &mut dyn Listener) -> SpatialResult<()> {
        self.remove_all(false, &mut NullListener)?;
        self.in_write_tx(|| {
            self.ensure_index_root()?;
            self.ensure_index_metadata()?;
            Ok(())
        })?;
        let mut cache = self.count_cache.lock();
        cache.total = 0;
        cache.saved = false;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read path
    // ------------------------------------------------------------------

    /// Returns the number of geometries in the index.
    ///
    /// The count is cached in memory and reconciled to the metadata vertex
    /// before it is returned. A cached zero triggers a full recount first,
    /// which recovers the counter after a lost write.
    pub fn count(&self) -> SpatialResult<u64> {
        self.save_count()?;
        Ok(self.count_cache.lock().total)
    }

    /// True if the index holds no geometry: the root exists but carries no
    /// bounding box.
    pub fn is_empty(&self) -> SpatialResult<bool> {
        let root = self.index_root()?;
        Ok(!self.store.has_property(root, PROP_BBOX)?)
    }

    /// Looks up a single indexed geometry, verifying that it belongs to this
    /// layer.
    ///
    /// # Errors
    /// * [`SpatialError::NotIndexed`] if it does not
    pub fn get(&self, geom_node: VertexId) -> SpatialResult<SpatialRecord> {
        self.find_leaf_containing(geom_node)?;
        Ok(SpatialRecord::new(self.layer.name().to_string(), geom_node))
    }

    /// Looks up several indexed geometries. Fails on the first one that is
    /// not indexed in this layer.
    pub fn get_many(&self, geom_nodes: &[VertexId]) -> SpatialResult<Vec<SpatialRecord>> {
        let mut results = Vec::with_capacity(geom_nodes.len());
        for &geom_node in geom_nodes {
            results.push(self.get(geom_node)?);
        }
        Ok(results)
    }

    /// The envelope of the whole layer: the root bounding box, or `None`
    /// when the layer is empty.
    pub fn layer_bbox(&self) -> SpatialResult<Option<Envelope>> {
        let root = self.index_root()?;
        self.index_node_envelope(root)
    }

    /// Runs a search visitor over the tree.
    ///
    /// Reconciles the counter cache first, so a search observes a count
    /// consistent with what it is about to read.
    pub fn execute_search(&self, visitor: &mut dyn SpatialIndexVisitor) -> SpatialResult<()> {
        if self.is_empty()? {
            return Ok(());
        }
        self.save_count()?;
        let root = self.index_root()?;
        self.visit(visitor, root)
    }

    /// Pulls the whole tree through the host store's caches.
    pub fn warm_up(&self) -> SpatialResult<()> {
        let root = self.index_root()?;
        self.visit(&mut WarmUpVisitor, root)
    }

    /// Depth-first traversal from `index_node`, driven by the visitor's
    /// pruning predicate. The caller owns the transaction scope.
    pub fn visit(
        &self,
        visitor: &mut dyn SpatialIndexVisitor,
        index_node: VertexId,
    ) -> SpatialResult<()> {
        let Some(envelope) = self.index_node_envelope(index_node)? else {
            // a node without a bounding box holds nothing
            return Ok(());
        };
        if !visitor.needs_to_visit(&envelope) {
            return Ok(());
        }

        let children = self.store.edges_out(index_node, RTREE_CHILD)?;
        if !children.is_empty() {
            for child in children {
                self.visit(visitor, child.end)?;
            }
        } else {
            for reference in self.store.edges_out(index_node, RTREE_REFERENCE)? {
                visitor.on_index_reference(reference.end)?;
            }
        }
        Ok(())
    }

    /// Gets the index root vertex.
    pub fn index_root(&self) -> SpatialResult<VertexId> {
        self.find_index_root()?
            .ok_or_else(|| self.internal_invariant("layer has no index root"))
    }

    /// Reads the bounding box of an index vertex, or `None` when the vertex
    /// has none (an empty root).
    ///
    /// # Errors
    /// * [`SpatialError::EncoderMismatch`] if the property is present but is
    ///   not a 4-double vector
    pub fn index_node_envelope(&self, index_node: VertexId) -> SpatialResult<Option<Envelope>> {
        match self.store.get_property(index_node, PROP_BBOX)? {
            None => Ok(None),
            Some(value) => envelope_from_property(&value).map(Some),
        }
    }

    /// Collects every index vertex of the tree, root first.
    pub fn all_index_nodes(&self) -> SpatialResult<Vec<VertexId>> {
        let root = self.index_root()?;
        let mut nodes = Vec::new();
        self.collect_index_nodes(root, &mut nodes)?;
        Ok(nodes)
    }

    /// Collects every geometry vertex referenced by the tree.
    pub fn all_geometry_nodes(&self) -> SpatialResult<Vec<VertexId>> {
        let mut geometries = Vec::new();
        for index_node in self.all_index_nodes()? {
            for reference in self.store.edges_out(index_node, RTREE_REFERENCE)? {
                geometries.push(reference.end);
            }
        }
        Ok(geometries)
    }

    /// Dumps the tree structure through the `log` facade, one line per
    /// vertex, for debugging.
    pub fn log_index_tree(&self) -> SpatialResult<()> {
        let root = self.index_root()?;
        self.log_subtree(root, 0)
    }

    // ------------------------------------------------------------------
    // Insert internals
    // ------------------------------------------------------------------

    /// Inserts a geometry without touching the count cache. Shared by `add`
    /// and by orphan re-insertion after underflow, which must not inflate
    /// the counter.
    fn insert_geometry(&self, geom_node: VertexId) -> SpatialResult<()> {
        let mut parent = self.index_root()?;
        while !self.node_is_leaf(parent)? {
            parent = self.choose_subtree(parent, geom_node)?;
        }

        let enlarged = self.insert_in_leaf(parent, geom_node)?;
        if self.count_children(parent, RTREE_REFERENCE)? > self.max_node_references {
            self.split_and_adjust_path_bounding_box(parent)?;
        } else if enlarged {
            self.adjust_path_bounding_box(parent)?;
        }
        Ok(())
    }

    /// Picks the child of `parent` to descend into for `geom_node`.
    ///
    /// Children whose box covers the geometry's centre point win outright
    /// (smallest area on a tie); otherwise the child needing the least
    /// enlargement wins (smallest area on a tie).
    fn choose_subtree(&self, parent: VertexId, geom_node: VertexId) -> SpatialResult<VertexId> {
        let geom_envelope = self.layer.decode_envelope(geom_node)?;
        let (gx, gy) = geom_envelope.centre();

        let mut children = Vec::new();
        for edge in self.store.edges_out(parent, RTREE_CHILD)? {
            let envelope = self.index_node_envelope(edge.end)?.ok_or_else(|| {
                self.internal_invariant(&format!(
                    "index node {} has no bounding box",
                    edge.end
                ))
            })?;
            children.push((edge.end, envelope));
        }

        let covering: Vec<&(VertexId, Envelope)> = children
            .iter()
            .filter(|(_, envelope)| envelope.covers_point(gx, gy))
            .collect();
        match covering.len() {
            1 => return Ok(covering[0].0),
            n if n > 1 => return Ok(smallest_area(&covering)),
            _ => {}
        }

        let mut candidates: Vec<&(VertexId, Envelope)> = Vec::new();
        let mut minimum_enlargement = f64::INFINITY;
        for entry in &children {
            let enlargement = entry.1.enlargement(&geom_envelope);
            if enlargement < minimum_enlargement {
                minimum_enlargement = enlargement;
                candidates.clear();
                candidates.push(entry);
            } else if enlargement == minimum_enlargement {
                candidates.push(entry);
            }
        }

        match candidates.len() {
            0 => Err(self.internal_invariant("no candidate subtree for new geometry")),
            1 => Ok(candidates[0].0),
            _ => Ok(smallest_area(&candidates)),
        }
    }

    /// Links a reference into a leaf.
    ///
    /// Returns true if the leaf's bounding box had to grow.
    fn insert_in_leaf(&self, leaf: VertexId, geom_node: VertexId) -> SpatialResult<bool> {
        self.add_child(leaf, RTREE_REFERENCE, geom_node)
    }

    /// Connects `child` under `parent` and widens the parent's bounding box
    /// to cover it. Returns true if the box changed.
    fn add_child(&self, parent: VertexId, edge_type: &str, child: VertexId) -> SpatialResult<bool> {
        let child_envelope = self.child_envelope(child, edge_type)?;
        self.store.connect(parent, child, edge_type)?;
        self.adjust_parent_bounding_box(parent, &child_envelope)
    }

    /// The envelope contributed by a child: the encoder's envelope for a
    /// geometry reference, the stored bounding box for an index child.
    fn child_envelope(&self, child: VertexId, edge_type: &str) -> SpatialResult<Envelope> {
        if edge_type == RTREE_REFERENCE {
            self.layer.decode_envelope(child)
        } else {
            self.index_node_envelope(child)?.ok_or_else(|| {
                self.internal_invariant(&format!("index node {} has no bounding box", child))
            })
        }
    }

    /// Widens a node's stored bounding box to cover `child_envelope`.
    /// Returns true if the stored value changed (or was first set).
    fn adjust_parent_bounding_box(
        &self,
        parent: VertexId,
        child_envelope: &Envelope,
    ) -> SpatialResult<bool> {
        match self.index_node_envelope(parent)? {
            None => {
                self.write_node_envelope(parent, child_envelope)?;
                Ok(true)
            }
            Some(mut envelope) => {
                let before = envelope;
                envelope.expand_to_include(child_envelope);
                if envelope != before {
                    self.write_node_envelope(parent, &envelope)?;
                    Ok(true)
                } else {
                    Ok(false)
                }
            }
        }
    }

    /// Re-tightens bounding boxes upward after entries were removed below,
    /// recomputing each ancestor exactly and stopping at the first one whose
    /// box did not change. The widening-only propagation of the insert path
    /// cannot shrink a box, so removals need this exact pass to keep every
    /// box equal to the union of its children.
    fn tighten_path_bounding_box(&self, index_node: VertexId) -> SpatialResult<()> {
        let mut current = index_node;
        while let Some(parent) = self.index_node_parent(current)? {
            let before = self.index_node_envelope(parent)?;
            self.recompute_node_bounding_box(parent, RTREE_CHILD)?;
            if self.index_node_envelope(parent)? == before {
                break;
            }
            current = parent;
        }
        Ok(())
    }

    /// Propagates a bounding-box change upward, stopping at the first
    /// ancestor whose box did not change.
    fn adjust_path_bounding_box(&self, index_node: VertexId) -> SpatialResult<()> {
        let mut current = index_node;
        while let Some(parent) = self.index_node_parent(current)? {
            let Some(envelope) = self.index_node_envelope(current)? else {
                break;
            };
            if !self.adjust_parent_bounding_box(parent, &envelope)? {
                break;
            }
            current = parent;
        }
        Ok(())
    }

    /// Splits an overflowing node and walks the overflow up the tree,
    /// promoting a new root when the split reaches the top.
    fn split_and_adjust_path_bounding_box(&self, index_node: VertexId) -> SpatialResult<()> {
        let sibling = self.quadratic_split(index_node)?;
        match self.index_node_parent(index_node)? {
            None => self.create_new_root(index_node, sibling),
            Some(parent) => {
                let envelope = self.index_node_envelope(index_node)?.ok_or_else(|| {
                    self.internal_invariant("split node lost its bounding box")
                })?;
                self.adjust_parent_bounding_box(parent, &envelope)?;
                self.add_child(parent, RTREE_CHILD, sibling)?;

                if self.count_children(parent, RTREE_CHILD)? > self.max_node_references {
                    self.split_and_adjust_path_bounding_box(parent)
                } else {
                    self.adjust_path_bounding_box(parent)
                }
            }
        }
    }

    /// Guttman's quadratic split. Distributes the entries of `index_node`
    /// into two groups, keeps the first under `index_node` and returns a
    /// fresh sibling holding the second.
    fn quadratic_split(&self, index_node: VertexId) -> SpatialResult<VertexId> {
        let edge_type = if self.node_is_leaf(index_node)? {
            RTREE_REFERENCE
        } else {
            RTREE_CHILD
        };

        // detach all entries
        let mut entries: Vec<(VertexId, Envelope)> = Vec::new();
        for edge in self.store.edges_out(index_node, edge_type)? {
            let envelope = self.child_envelope(edge.end, edge_type)?;
            self.store.delete_edge(edge.id)?;
            entries.push((edge.end, envelope));
        }
        if entries.len() < 2 {
            return Err(self.internal_invariant("cannot split a node with fewer than 2 entries"));
        }

        // pick the two seed entries wasting the most dead space together
        let mut seed1 = 0;
        let mut seed2 = 1;
        let mut worst = f64::NEG_INFINITY;
        for i in 0..entries.len() {
            for j in (i + 1)..entries.len() {
                let mut combined = entries[i].1;
                combined.expand_to_include(&entries[j].1);
                let dead_space = combined.area() - entries[i].1.area() - entries[j].1.area();
                if dead_space > worst {
                    worst = dead_space;
                    seed1 = i;
                    seed2 = j;
                }
            }
        }

        // seed2 > seed1, so remove it first
        let second_seed = entries.remove(seed2);
        let first_seed = entries.remove(seed1);

        let mut group1 = vec![first_seed.0];
        let mut envelope1 = first_seed.1;
        let mut group2 = vec![second_seed.0];
        let mut envelope2 = second_seed.1;

        while !entries.is_empty() {
            // cheapest remaining entry goes to its cheaper group
            let mut best_index = 0;
            let mut best_cost = f64::INFINITY;
            let mut best_group_is_first = true;
            for (i, (_, envelope)) in entries.iter().enumerate() {
                let enlargement1 = envelope1.enlargement(envelope);
                let enlargement2 = envelope2.enlargement(envelope);
                let cost = enlargement1.min(enlargement2);
                if cost < best_cost {
                    best_cost = cost;
                    best_index = i;
                    best_group_is_first = if enlargement1 < enlargement2 {
                        true
                    } else if enlargement2 < enlargement1 {
                        false
                    } else {
                        envelope1.area() <= envelope2.area()
                    };
                }
            }

            let (entry, envelope) = entries.remove(best_index);
            if best_group_is_first {
                group1.push(entry);
                envelope1.expand_to_include(&envelope);
            } else {
                group2.push(entry);
                envelope2.expand_to_include(&envelope);
            }

            // each group must end with at least minNodeReferences entries:
            // once a group can only just reach the minimum, it takes
            // everything that is left
            if group1.len() + entries.len() == self.min_node_references {
                for (entry, envelope) in entries.drain(..) {
                    group1.push(entry);
                    envelope1.expand_to_include(&envelope);
                }
            }
            if group2.len() + entries.len() == self.min_node_references {
                for (entry, envelope) in entries.drain(..) {
                    group2.push(entry);
                    envelope2.expand_to_include(&envelope);
                }
            }
        }

        // group 1 stays under the split node, group 2 moves to the sibling
        self.store.remove_property(index_node, PROP_BBOX)?;
        for entry in group1 {
            self.add_child(index_node, edge_type, entry)?;
        }

        let sibling = self.store.create_vertex()?;
        for entry in group2 {
            self.add_child(sibling, edge_type, entry)?;
        }
        Ok(sibling)
    }

    /// Replaces the root with a new vertex whose two children are the old
    /// root and its split sibling.
    fn create_new_root(&self, old_root: VertexId, sibling: VertexId) -> SpatialResult<()> {
        let new_root = self.store.create_vertex()?;
        self.add_child(new_root, RTREE_CHILD, old_root)?;
        self.add_child(new_root, RTREE_CHILD, sibling)?;

        let layer_node = self.layer.layer_node();
        let root_edge = self
            .store
            .single_out(layer_node, RTREE_ROOT)?
            .ok_or_else(|| self.internal_invariant("layer has no index root"))?;
        self.store.delete_edge(root_edge.id)?;
        self.store.connect(layer_node, new_root, RTREE_ROOT)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Delete internals
    // ------------------------------------------------------------------

    /// Reorganises the tree after `leaf` dropped below the minimum: evicts
    /// the highest ancestor that would underflow, re-tightens boxes, and
    /// re-inserts the orphaned geometries through the normal insert path.
    fn handle_underflow(&self, leaf: VertexId) -> SpatialResult<()> {
        let to_evict = self.find_index_node_to_delete_nearest_to_root(leaf)?;

        let mut collector = GeometryCollector::default();
        self.visit(&mut collector, to_evict)?;
        let orphans = collector.geometries;

        for &orphan in &orphans {
            let reference = self
                .store
                .single_in(orphan, RTREE_REFERENCE)?
                .ok_or_else(|| self.internal_invariant("orphan lost its REFERENCE edge"))?;
            self.store.delete_edge(reference.id)?;
        }

        let evicted_parent = self.index_node_parent(to_evict)?;
        self.delete_recursively_empty_subtree(to_evict)?;

        if let Some(parent) = evicted_parent {
            self.recompute_node_bounding_box(parent, RTREE_CHILD)?;
            self.tighten_path_bounding_box(parent)?;
        }

        // the tree may have lost height; each orphan finds its own new leaf
        for orphan in orphans {
            self.insert_geometry(orphan)?;
        }
        Ok(())
    }

    /// Walks upward from an underflowing node to the highest ancestor whose
    /// removal keeps every remaining ancestor at or above the minimum.
    fn find_index_node_to_delete_nearest_to_root(
        &self,
        index_node: VertexId,
    ) -> SpatialResult<VertexId> {
        let mut current = index_node;
        loop {
            let parent = self
                .index_node_parent(current)?
                .ok_or_else(|| self.internal_invariant("underflow walk reached the root"))?;
            let parent_is_root = self.index_node_parent(parent)?.is_none();
            if parent_is_root
                || self.count_children(parent, RTREE_CHILD)? != self.min_node_references
            {
                return Ok(current);
            }
            current = parent;
        }
    }

    /// Deletes an index vertex and everything below it. All `REFERENCE`
    /// edges must already be gone; geometry vertices are never touched.
    fn delete_recursively_empty_subtree(&self, index_node: VertexId) -> SpatialResult<()> {
        for child in self.store.edges_out(index_node, RTREE_CHILD)? {
            self.delete_recursively_empty_subtree(child.end)?;
        }
        if let Some(parent_edge) = self.store.single_in(index_node, RTREE_CHILD)? {
            self.store.delete_edge(parent_edge.id)?;
        }
        self.store.delete_vertex(index_node)?;
        Ok(())
    }

    /// Recomputes a node's bounding box as the union over its remaining
    /// children. Removes the property entirely when no children remain, so
    /// an emptied root reads as empty.
    fn recompute_node_bounding_box(
        &self,
        index_node: VertexId,
        edge_type: &str,
    ) -> SpatialResult<()> {
        let mut envelope = Envelope::null();
        for edge in self.store.edges_out(index_node, edge_type)? {
            envelope.expand_to_include(&self.child_envelope(edge.end, edge_type)?);
        }
        if envelope.is_null() {
            self.store.remove_property(index_node, PROP_BBOX)?;
        } else {
            self.write_node_envelope(index_node, &envelope)?;
        }
        Ok(())
    }

    /// Locates the leaf referencing `geom_node`, verifying that the leaf is
    /// reachable from this layer's root.
    fn find_leaf_containing(&self, geom_node: VertexId) -> SpatialResult<VertexId> {
        let reference = self
            .store
            .single_in(geom_node, RTREE_REFERENCE)?
            .ok_or(SpatialError::NotIndexed(geom_node))?;
        let leaf = reference.start;

        let mut child = leaf;
        let root = loop {
            match self.index_node_parent(child)? {
                Some(parent) => child = parent,
                None => break child,
            }
        };

        if root != self.index_root()? {
            return Err(SpatialError::NotIndexed(geom_node));
        }
        Ok(leaf)
    }

    /// Deletes a vertex together with every edge attached to it.
    fn delete_node(&self, node: VertexId) -> SpatialResult<()> {
        for edge in self.store.all_edges(node)? {
            self.store.delete_edge(edge.id)?;
        }
        self.store.delete_vertex(node)?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Tree store internals
    // ------------------------------------------------------------------

    fn ensure_index_root(&self) -> SpatialResult<()> {
        let layer_node = self.layer.layer_node();
        if self.store.single_out(layer_node, RTREE_ROOT)?.is_none() {
            let root = self.store.create_vertex()?;
            self.store.connect(layer_node, root, RTREE_ROOT)?;
        }
        Ok(())
    }

    /// Creates the metadata vertex on first touch, or loads the persisted
    /// fanout bounds from an existing one.
    fn ensure_index_metadata(&self) -> SpatialResult<(usize, usize)> {
        let layer_node = self.layer.layer_node();
        match self.store.single_out(layer_node, RTREE_METADATA)? {
            Some(edge) => {
                let metadata_node = edge.end;
                let max = self
                    .store
                    .get_property(metadata_node, PROP_MAX_NODE_REFERENCES)?
                    .and_then(|v| v.as_integer())
                    .ok_or_else(|| {
                        self.internal_invariant("metadata vertex has no maxNodeReferences")
                    })?;
                let min = self
                    .store
                    .get_property(metadata_node, PROP_MIN_NODE_REFERENCES)?
                    .and_then(|v| v.as_integer())
                    .ok_or_else(|| {
                        self.internal_invariant("metadata vertex has no minNodeReferences")
                    })?;
                Ok((max as usize, min as usize))
            }
            None => {
                let metadata_node = self.store.create_vertex()?;
                self.store
                    .connect(layer_node, metadata_node, RTREE_METADATA)?;
                self.store.set_property(
                    metadata_node,
                    PROP_MAX_NODE_REFERENCES,
                    PropertyValue::I64(self.max_node_references as i64),
                )?;
                self.store.set_property(
                    metadata_node,
                    PROP_MIN_NODE_REFERENCES,
                    PropertyValue::I64(self.min_node_references as i64),
                )?;
                Ok((self.max_node_references, self.min_node_references))
            }
        }
    }

    fn find_index_root(&self) -> SpatialResult<Option<VertexId>> {
        Ok(self
            .store
            .single_out(self.layer.layer_node(), RTREE_ROOT)?
            .map(|edge| edge.end))
    }

    fn find_metadata_node(&self) -> SpatialResult<Option<VertexId>> {
        Ok(self
            .store
            .single_out(self.layer.layer_node(), RTREE_METADATA)?
            .map(|edge| edge.end))
    }

    /// Reconciles the count cache: recounts when the cached value is zero
    /// (guarding against a lost counter write) and persists to the metadata
    /// vertex when dirty.
    fn save_count(&self) -> SpatialResult<()> {
        let needs_recount = self.count_cache.lock().total == 0;
        if needs_recount {
            let total = match self.find_index_root()? {
                Some(root) => {
                    let mut counter = RecordCounter::new();
                    self.visit(&mut counter, root)?;
                    counter.count()
                }
                None => 0,
            };
            let mut cache = self.count_cache.lock();
            cache.total = total;
            cache.saved = false;
        }

        let (needs_save, total) = {
            let cache = self.count_cache.lock();
            (!cache.saved, cache.total)
        };
        if needs_save {
            if let Some(metadata_node) = self.find_metadata_node()? {
                let tx = self.store.begin_tx()?;
                let result = self.store.set_property(
                    metadata_node,
                    PROP_TOTAL_GEOMETRY_COUNT,
                    PropertyValue::I64(total as i64),
                );
                match &result {
                    Ok(_) => tx.success(),
                    Err(_) => tx.failure(),
                }
                tx.finish()?;
                result?;
            }
            self.count_cache.lock().saved = true;
        }
        Ok(())
    }

    fn node_is_leaf(&self, index_node: VertexId) -> SpatialResult<bool> {
        Ok(self.store.edges_out(index_node, RTREE_CHILD)?.is_empty())
    }

    fn index_node_parent(&self, index_node: VertexId) -> SpatialResult<Option<VertexId>> {
        Ok(self
            .store
            .single_in(index_node, RTREE_CHILD)?
            .map(|edge| edge.start))
    }

    fn count_children(&self, index_node: VertexId, edge_type: &str) -> SpatialResult<usize> {
        Ok(self.store.edges_out(index_node, edge_type)?.len())
    }

    fn write_node_envelope(&self, index_node: VertexId, envelope: &Envelope) -> SpatialResult<()> {
        self.store.set_property(
            index_node,
            PROP_BBOX,
            envelope.to_array().to_vec().into(),
        )?;
        Ok(())
    }

    /// Runs `f` inside a host transaction, committing on success and rolling
    /// back (and invalidating the count cache) on error.
    fn in_write_tx<T>(&self, f: impl FnOnce() -> SpatialResult<T>) -> SpatialResult<T> {
        let tx = self.store.begin_tx()?;
        let result = f();
        match &result {
            Ok(_) => tx.success(),
            Err(_) => {
                tx.failure();
                self.count_cache.lock().saved = false;
            }
        }
        tx.finish()?;
        result
    }

    /// Transactional batching traversal: internal vertices are walked
    /// without a transaction, leaf batches commit one at a time.
    fn visit_in_tx_at(
        &self,
        visitor: &mut dyn SpatialIndexVisitor,
        index_node: VertexId,
    ) -> SpatialResult<()> {
        let Some(envelope) = self.index_node_envelope(index_node)? else {
            return Ok(());
        };
        if !visitor.needs_to_visit(&envelope) {
            return Ok(());
        }

        let children = self.store.edges_out(index_node, RTREE_CHILD)?;
        if !children.is_empty() {
            for child in children {
                self.visit_in_tx_at(visitor, child.end)?;
            }
        } else {
            let references = self.store.edges_out(index_node, RTREE_REFERENCE)?;
            self.in_write_tx(|| {
                for reference in references {
                    visitor.on_index_reference(reference.end)?;
                }
                Ok(())
            })?;
        }
        Ok(())
    }

    fn collect_index_nodes(
        &self,
        index_node: VertexId,
        nodes: &mut Vec<VertexId>,
    ) -> SpatialResult<()> {
        nodes.push(index_node);
        for child in self.store.edges_out(index_node, RTREE_CHILD)? {
            self.collect_index_nodes(child.end, nodes)?;
        }
        Ok(())
    }

    fn log_subtree(&self, index_node: VertexId, depth: usize) -> SpatialResult<()> {
        let indent = "  ".repeat(depth);
        match self.index_node_envelope(index_node)? {
            Some(envelope) => log::debug!("{}INDEX {} {}", indent, index_node, envelope),
            None => log::debug!("{}INDEX {} (no bbox)", indent, index_node),
        }
        let references = self.store.edges_out(index_node, RTREE_REFERENCE)?;
        if !references.is_empty() {
            let data: Vec<String> = references.iter().map(|r| r.end.to_string()).collect();
            log::debug!("{}  DATA {}", indent, data.join(", "));
        }
        for child in self.store.edges_out(index_node, RTREE_CHILD)? {
            self.log_subtree(child.end, depth + 1)?;
        }
        Ok(())
    }

    fn internal_invariant(&self, message: &str) -> SpatialError {
        log::error!("Layer '{}': {}", self.layer.name(), message);
        SpatialError::InternalInvariant(message.to_string())
    }
}

/// Picks the entry with the smallest envelope area.
fn smallest_area(entries: &[&(VertexId, Envelope)]) -> VertexId {
    let mut best = entries[0];
    for entry in &entries[1..] {
        if entry.1.area() < best.1.area() {
            best = entry;
        }
    }
    best.0
}

/// Collects geometry vertices from a subtree.
#[derive(Default)]
struct GeometryCollector {
    geometries: Vec<VertexId>,
}

impl SpatialIndexVisitor for GeometryCollector {
    fn needs_to_visit(&self, _envelope: &Envelope) -> bool {
        true
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        self.geometries.push(geom_node);
        Ok(())
    }
}

/// Deletes leaf references (and optionally geometry vertices), reporting
/// progress. Used by `remove_all` through the batching traversal.
struct ReferenceSweeper<'a> {
    index: &'a RTreeIndex,
    delete_geom_nodes: bool,
    listener: &'a mut dyn Listener,
}

impl SpatialIndexVisitor for ReferenceSweeper<'_> {
    fn needs_to_visit(&self, _envelope: &Envelope) -> bool {
        true
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        let reference = self
            .index
            .store
            .single_in(geom_node, RTREE_REFERENCE)?
            .ok_or_else(|| self.index.internal_invariant("reference edge vanished mid-sweep"))?;
        self.index.store.delete_edge(reference.id)?;
        if self.delete_geom_nodes {
            self.index.delete_node(geom_node)?;
        }
        self.listener.worked(1);
        Ok(())
    }
}
