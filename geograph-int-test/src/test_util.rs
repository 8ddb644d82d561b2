//! Shared fixtures and the structural invariant checker.

use geograph::store::{GraphStore, InMemoryGraphStore, VertexId};
use geograph_spatial::constants::{PROP_BBOX, RTREE_CHILD, RTREE_REFERENCE};
use geograph_spatial::{
    Envelope, Geometry, GeometryEncoder, Layer, PropertyGeometryEncoder, RTreeIndex,
    SpatialResult, GTYPE_POINT,
};
use std::collections::HashSet;
use std::sync::Arc;

/// One in-memory store with a layer and its index, ready for scenarios.
pub struct TestContext {
    store: GraphStore,
    layer: Layer,
    index: RTreeIndex,
}

impl TestContext {
    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn layer(&self) -> &Layer {
        &self.layer
    }

    pub fn index(&self) -> &RTreeIndex {
        &self.index
    }
}

/// Builds a fresh in-memory context with the given fanout bounds.
pub fn create_test_context(
    max_node_references: usize,
    min_node_references: usize,
) -> SpatialResult<TestContext> {
    let store = GraphStore::new(InMemoryGraphStore::new());
    let layer = Layer::create(
        store.clone(),
        "test-layer",
        GTYPE_POINT,
        Arc::new(PropertyGeometryEncoder::new()),
    )?;
    let index = RTreeIndex::with_fanout(
        store.clone(),
        layer.clone(),
        max_node_references,
        min_node_references,
    )?;
    Ok(TestContext {
        store,
        layer,
        index,
    })
}

/// Creates and indexes a geometry vertex.
pub fn add_geometry(ctx: &TestContext, geometry: &Geometry) -> SpatialResult<VertexId> {
    let geom_node = ctx.store.create_vertex()?;
    PropertyGeometryEncoder::new().encode_geometry(&ctx.store, geometry, geom_node)?;
    ctx.index.add(geom_node)?;
    Ok(geom_node)
}

/// Creates and indexes a geometry vertex carrying only a raw bounding box,
/// in the persisted `[xmin, xmax, ymin, ymax]` order.
pub fn add_bbox_geometry(ctx: &TestContext, bbox: [f64; 4]) -> SpatialResult<VertexId> {
    let geom_node = ctx.store.create_vertex()?;
    ctx.store
        .set_property(geom_node, PROP_BBOX, bbox.to_vec().into())?;
    ctx.index.add(geom_node)?;
    Ok(geom_node)
}

/// Collects the geometry vertices a `SearchAll` reports, as a set.
pub fn search_all_set(ctx: &TestContext) -> HashSet<VertexId> {
    let mut search = geograph_spatial::SearchAll::new(ctx.layer.clone());
    ctx.index.execute_search(&mut search).unwrap();
    search
        .into_results()
        .into_iter()
        .map(|record| record.geom_node())
        .collect()
}

/// Checks the structural invariants of the tree. Panics with a description
/// on the first violation.
///
/// 1. Height balance: all leaves at equal depth from the root
/// 2. Fanout: non-root vertices within `[min, max]`; an internal root has
///    at least 2 children
/// 3. Containment: every bounding box is the union of its children's
/// 4. Counter: `count()` equals the reachable `REFERENCE` edges
/// 5. Uniqueness: every indexed geometry has exactly one incoming
///    `REFERENCE`
pub fn check_invariants(ctx: &TestContext) {
    let store = &ctx.store;
    let index = &ctx.index;
    let root = index.index_root().unwrap();

    let mut leaf_depths = HashSet::new();
    let mut reference_total = 0u64;
    let mut seen_geometries = HashSet::new();
    check_subtree(
        ctx,
        root,
        root,
        0,
        &mut leaf_depths,
        &mut reference_total,
        &mut seen_geometries,
    );

    assert!(
        leaf_depths.len() <= 1,
        "height balance violated: leaf depths {:?}",
        leaf_depths
    );

    // an internal root normally has at least 2 children; after an underflow
    // eviction it may transiently hold a single subtree, which is only
    // legitimate while the tree is small
    let root_children = store.edges_out(root, RTREE_CHILD).unwrap();
    if root_children.len() == 1 {
        assert!(
            reference_total <= (index.max_node_references() * index.max_node_references()) as u64,
            "single-child root over a tree of {} references",
            reference_total
        );
    }
    assert!(
        root_children.len() <= index.max_node_references(),
        "root has {} children, above the maximum {}",
        root_children.len(),
        index.max_node_references()
    );

    assert_eq!(
        index.count().unwrap(),
        reference_total,
        "count() disagrees with reachable REFERENCE edges"
    );
}

fn check_subtree(
    ctx: &TestContext,
    node: VertexId,
    root: VertexId,
    depth: usize,
    leaf_depths: &mut HashSet<usize>,
    reference_total: &mut u64,
    seen_geometries: &mut HashSet<VertexId>,
) {
    let store = &ctx.store;
    let index = &ctx.index;

    let children = store.edges_out(node, RTREE_CHILD).unwrap();
    let references = store.edges_out(node, RTREE_REFERENCE).unwrap();

    // edge-kind exclusivity
    assert!(
        children.is_empty() || references.is_empty(),
        "index vertex {} has both CHILD and REFERENCE edges",
        node
    );

    // fanout bounds for non-root vertices
    let entry_count = children.len() + references.len();
    if node != root {
        assert!(
            entry_count >= index.min_node_references() && entry_count <= index.max_node_references(),
            "index vertex {} has {} entries, outside [{}, {}]",
            node,
            entry_count,
            index.min_node_references(),
            index.max_node_references()
        );
    }

    // containment: the stored box is the union over child envelopes
    let mut union = Envelope::null();
    for child in &children {
        if let Some(envelope) = index.index_node_envelope(child.end).unwrap() {
            union.expand_to_include(&envelope);
        }
    }
    for reference in &references {
        union.expand_to_include(&ctx.layer.decode_envelope(reference.end).unwrap());
    }
    if !union.is_null() {
        let stored = index
            .index_node_envelope(node)
            .unwrap()
            .unwrap_or_else(|| panic!("index vertex {} has entries but no bbox", node));
        assert_eq!(
            stored.to_array(),
            union.to_array(),
            "containment violated at index vertex {}",
            node
        );
    }

    if children.is_empty() {
        leaf_depths.insert(depth);
    }

    for reference in &references {
        *reference_total += 1;
        assert!(
            seen_geometries.insert(reference.end),
            "geometry vertex {} is referenced more than once",
            reference.end
        );
        let incoming = store.edges_in(reference.end, RTREE_REFERENCE).unwrap();
        assert_eq!(
            incoming.len(),
            1,
            "geometry vertex {} has {} incoming REFERENCE edges",
            reference.end,
            incoming.len()
        );
    }

    for child in children {
        check_subtree(
            ctx,
            child.end,
            root,
            depth + 1,
            leaf_depths,
            reference_total,
            seen_geometries,
        );
    }
}
