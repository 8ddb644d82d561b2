use geograph::common::{Listener, NullListener};
use geograph_spatial::constants::{RTREE_CHILD, RTREE_METADATA, RTREE_REFERENCE, RTREE_ROOT};
use geograph_spatial::{Envelope, Geometry, SearchIntersectWindow};
use geograph_int_test::test_util::{
    add_bbox_geometry, add_geometry, check_invariants, create_test_context, search_all_set,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

#[test]
fn test_single_geometry_layer() {
    let ctx = create_test_context(51, 1).unwrap();
    add_bbox_geometry(&ctx, [1.2, 1.0, 2.0, 3.0]).unwrap();

    assert_eq!(ctx.index().count().unwrap(), 1);

    let root = ctx.index().index_root().unwrap();
    let references = ctx.store().edges_out(root, RTREE_REFERENCE).unwrap();
    assert_eq!(references.len(), 1);
    assert_eq!(
        ctx.index()
            .index_node_envelope(root)
            .unwrap()
            .unwrap()
            .to_array(),
        [1.2, 1.0, 2.0, 3.0]
    );
}

#[test]
fn test_add_remove_leaves_empty_layer() {
    let ctx = create_test_context(51, 1).unwrap();
    let geom_node = add_bbox_geometry(&ctx, [1.2, 1.0, 2.0, 3.0]).unwrap();

    ctx.index().remove(geom_node, false).unwrap();

    assert_eq!(ctx.index().count().unwrap(), 0);
    let root = ctx.index().index_root().unwrap();
    assert!(ctx
        .store()
        .edges_out(root, RTREE_REFERENCE)
        .unwrap()
        .is_empty());
    // metadata survives the removal
    assert!(ctx
        .store()
        .single_out(ctx.layer().layer_node(), RTREE_METADATA)
        .unwrap()
        .is_some());
}

#[test]
fn test_remove_all_deletes_geometry_nodes() {
    let ctx = create_test_context(51, 1).unwrap();
    let nodes = [
        add_bbox_geometry(&ctx, [1.2, 1.0, 2.0, 3.0]).unwrap(),
        add_bbox_geometry(&ctx, [1.2, 4.0, 7.0, 2.0]).unwrap(),
        add_bbox_geometry(&ctx, [2.2, 3.0, 6.0, 8.0]).unwrap(),
        add_bbox_geometry(&ctx, [1.9, 4.5, 5.0, 9.0]).unwrap(),
    ];

    ctx.index().remove_all(true, &mut NullListener).unwrap();

    assert_eq!(ctx.index().count().unwrap(), 0);
    for geom_node in nodes {
        assert!(!ctx.store().vertex_exists(geom_node).unwrap());
    }
}

#[test]
fn test_quadrant_tiling_split() {
    let ctx = create_test_context(4, 2).unwrap();

    // four quadrants of the unit square plus one box over the centre
    for bbox in [
        [0.0, 0.5, 0.0, 0.5],
        [0.5, 1.0, 0.0, 0.5],
        [0.0, 0.5, 0.5, 1.0],
        [0.5, 1.0, 0.5, 1.0],
        [0.25, 0.75, 0.25, 0.75],
    ] {
        add_bbox_geometry(&ctx, bbox).unwrap();
    }

    let root = ctx.index().index_root().unwrap();
    let children = ctx.store().edges_out(root, RTREE_CHILD).unwrap();
    assert_eq!(children.len(), 2, "exactly one split must have happened");
    for child in &children {
        let references = ctx.store().edges_out(child.end, RTREE_REFERENCE).unwrap();
        assert!(references.len() >= ctx.index().min_node_references());
    }

    // the union of the two children's boxes is the unit square
    let mut union = Envelope::null();
    for child in &children {
        union.expand_to_include(&ctx.index().index_node_envelope(child.end).unwrap().unwrap());
    }
    assert_eq!(union.to_array(), [0.0, 1.0, 0.0, 1.0]);

    check_invariants(&ctx);
}

#[test]
fn test_window_search_matches_brute_force() {
    let ctx = create_test_context(8, 4).unwrap();
    let mut rng = StdRng::seed_from_u64(4242);

    let window = Envelope::new(0.4, 0.6, 0.4, 0.6);
    let window_geometry = Geometry::from(window);
    let mut expected = HashSet::new();

    for _ in 0..100 {
        let x: f64 = rng.gen_range(0.0..1.0);
        let y: f64 = rng.gen_range(0.0..1.0);
        let w: f64 = rng.gen_range(0.0..0.1);
        let h: f64 = rng.gen_range(0.0..0.1);
        let geometry = Geometry::from(Envelope::new(x, x + w, y, y + h));

        let geom_node = add_geometry(&ctx, &geometry).unwrap();
        if geometry.intersects(&window_geometry) {
            expected.insert(geom_node);
        }
    }
    check_invariants(&ctx);

    let mut search = SearchIntersectWindow::new(ctx.layer().clone(), window);
    ctx.index().execute_search(&mut search).unwrap();
    let found: HashSet<_> = search
        .into_results()
        .into_iter()
        .map(|record| record.geom_node())
        .collect();

    assert_eq!(found, expected, "index search must equal the brute-force filter");
}

#[test]
fn test_add_remove_round_trip_restores_count() {
    let ctx = create_test_context(4, 2).unwrap();
    let mut survivors = HashSet::new();
    for i in 0..10 {
        survivors.insert(add_geometry(&ctx, &Geometry::point(i as f64, 0.5)).unwrap());
    }
    let before = ctx.index().count().unwrap();

    let extra = add_geometry(&ctx, &Geometry::point(100.0, 100.0)).unwrap();
    ctx.index().remove(extra, false).unwrap();

    assert_eq!(ctx.index().count().unwrap(), before);
    assert_eq!(search_all_set(&ctx), survivors);
    check_invariants(&ctx);
}

#[test]
fn test_remove_all_then_re_add() {
    let ctx = create_test_context(4, 2).unwrap();
    for i in 0..9 {
        add_geometry(&ctx, &Geometry::point(i as f64, 1.0)).unwrap();
    }

    // clear empties the index but keeps the geometry vertices alive
    ctx.index().clear(&mut NullListener).unwrap();

    let mut expected = HashSet::new();
    for i in 0..5 {
        expected.insert(add_geometry(&ctx, &Geometry::point(i as f64, 2.0)).unwrap());
    }

    assert_eq!(ctx.index().count().unwrap(), 5);
    assert_eq!(search_all_set(&ctx), expected);
    check_invariants(&ctx);
}

#[test]
fn test_overflow_boundary_triggers_single_split() {
    let ctx = create_test_context(4, 2).unwrap();

    // exactly maxChildren geometries: still a single root leaf
    for i in 0..4 {
        add_geometry(&ctx, &Geometry::point(i as f64, 0.0)).unwrap();
    }
    let root = ctx.index().index_root().unwrap();
    assert!(ctx.store().edges_out(root, RTREE_CHILD).unwrap().is_empty());

    // one more forces the split and the root promotion
    add_geometry(&ctx, &Geometry::point(4.0, 0.0)).unwrap();
    let root = ctx.index().index_root().unwrap();
    let children = ctx.store().edges_out(root, RTREE_CHILD).unwrap();
    assert_eq!(children.len(), 2);
    for child in children {
        assert!(
            ctx.store().edges_out(child.end, RTREE_REFERENCE).unwrap().len()
                >= ctx.index().min_node_references()
        );
    }
    check_invariants(&ctx);
}

#[test]
fn test_underflow_boundary_keeps_orphans_reachable() {
    let ctx = create_test_context(4, 2).unwrap();
    let mut nodes = Vec::new();
    for i in 0..10 {
        nodes.push(add_geometry(&ctx, &Geometry::point((i % 5) as f64, (i / 5) as f64)).unwrap());
    }
    check_invariants(&ctx);

    // removals drive some leaf below minChildren and force eviction plus
    // re-insertion of the orphaned geometries
    let removed: Vec<_> = nodes.drain(..7).collect();
    for geom_node in removed {
        ctx.index().remove(geom_node, false).unwrap();
        check_invariants(&ctx);
    }

    let expected: HashSet<_> = nodes.into_iter().collect();
    assert_eq!(search_all_set(&ctx), expected);
}

#[test]
fn test_empty_layer_count_allocates_nothing() {
    let ctx = create_test_context(51, 1).unwrap();
    assert_eq!(ctx.index().count().unwrap(), 0);

    // exactly three vertices: the layer, the index root and the metadata
    assert!(ctx
        .store()
        .single_out(ctx.layer().layer_node(), RTREE_ROOT)
        .unwrap()
        .is_some());
    assert!(ctx
        .store()
        .single_out(ctx.layer().layer_node(), RTREE_METADATA)
        .unwrap()
        .is_some());
}

#[test]
fn test_sequential_churn_preserves_invariants() {
    let ctx = create_test_context(6, 3).unwrap();
    let mut rng = StdRng::seed_from_u64(99);
    let mut live = Vec::new();

    for round in 0..120 {
        if live.len() < 4 || rng.gen_bool(0.65) {
            let x: f64 = rng.gen_range(-50.0..50.0);
            let y: f64 = rng.gen_range(-50.0..50.0);
            live.push(add_geometry(&ctx, &Geometry::point(x, y)).unwrap());
        } else {
            let victim = live.swap_remove(rng.gen_range(0..live.len()));
            ctx.index().remove(victim, false).unwrap();
        }
        if round % 10 == 0 {
            check_invariants(&ctx);
        }
    }
    check_invariants(&ctx);
    assert_eq!(ctx.index().count().unwrap(), live.len() as u64);
}

#[test]
fn test_remove_all_progress_covers_every_geometry() {
    struct Recording {
        total: u64,
        worked: u64,
        done: bool,
    }
    impl Listener for Recording {
        fn begin(&mut self, total: u64) {
            self.total = total;
        }
        fn worked(&mut self, units: u64) {
            self.worked += units;
        }
        fn done(&mut self) {
            self.done = true;
        }
    }

    let ctx = create_test_context(4, 2).unwrap();
    for i in 0..13 {
        add_geometry(&ctx, &Geometry::point(i as f64, (i * 7 % 5) as f64)).unwrap();
    }

    let mut listener = Recording {
        total: 0,
        worked: 0,
        done: false,
    };
    ctx.index().remove_all(false, &mut listener).unwrap();

    assert_eq!(listener.total, 13);
    assert_eq!(listener.worked, 13);
    assert!(listener.done);
    assert_eq!(ctx.index().count().unwrap(), 0);
}
