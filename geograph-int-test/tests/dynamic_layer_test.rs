use geograph_int_test::test_util::{add_geometry, create_test_context};
use geograph_spatial::{
    DynamicLayer, Geometry, RTreeIndex, SearchAll, SpatialError, SpatialIndexReader, GTYPE_POINT,
};
use std::collections::HashSet;
use std::sync::Arc;

const RESIDENTIAL_QUERY: &str = r#"{"properties":{"highway":"residential"}}"#;

fn osm_like_context() -> (
    geograph_int_test::test_util::TestContext,
    Vec<geograph::store::VertexId>,
) {
    let ctx = create_test_context(4, 2).unwrap();
    let mut residential = Vec::new();

    for i in 0..30 {
        let geom_node =
            add_geometry(&ctx, &Geometry::point((i % 6) as f64, (i / 6) as f64)).unwrap();
        let highway = match i % 3 {
            0 => "residential",
            1 => "primary",
            _ => "footway",
        };
        ctx.store()
            .set_property(geom_node, "highway", highway.into())
            .unwrap();
        if highway == "residential" {
            residential.push(geom_node);
        }
    }
    (ctx, residential)
}

#[test]
fn test_dynamic_sub_layer_count_matches_predicate() {
    let (ctx, residential) = osm_like_context();
    let index = Arc::new(
        RTreeIndex::with_fanout(ctx.store().clone(), ctx.layer().clone(), 4, 2).unwrap(),
    );

    let dynamic = DynamicLayer::new(Arc::clone(&index));
    let sub_layer = dynamic
        .add_layer_config("residential", GTYPE_POINT, RESIDENTIAL_QUERY)
        .unwrap();

    assert_eq!(sub_layer.count().unwrap(), residential.len() as u64);
    // the base layer's count is unchanged by the view
    assert_eq!(index.count().unwrap(), 30);
}

#[test]
fn test_dynamic_sub_layer_search_returns_matching_set() {
    let (ctx, residential) = osm_like_context();
    let index = Arc::new(
        RTreeIndex::with_fanout(ctx.store().clone(), ctx.layer().clone(), 4, 2).unwrap(),
    );

    let dynamic = DynamicLayer::new(Arc::clone(&index));
    let sub_layer = dynamic
        .add_layer_config("residential", GTYPE_POINT, RESIDENTIAL_QUERY)
        .unwrap();

    let mut search = SearchAll::new(ctx.layer().clone());
    sub_layer.execute_search(&mut search).unwrap();
    let found: HashSet<_> = search
        .into_results()
        .into_iter()
        .map(|record| record.geom_node())
        .collect();
    let expected: HashSet<_> = residential.into_iter().collect();
    assert_eq!(found, expected);
}

#[test]
fn test_dynamic_sub_layer_is_read_only() {
    let (ctx, residential) = osm_like_context();
    let index = Arc::new(
        RTreeIndex::with_fanout(ctx.store().clone(), ctx.layer().clone(), 4, 2).unwrap(),
    );

    let dynamic = DynamicLayer::new(Arc::clone(&index));
    let sub_layer = dynamic
        .add_layer_config("residential", GTYPE_POINT, RESIDENTIAL_QUERY)
        .unwrap();

    let geom_node = residential[0];
    assert!(matches!(
        sub_layer.add(geom_node).unwrap_err(),
        SpatialError::ReadOnlyView(_)
    ));
    assert!(matches!(
        sub_layer.remove(geom_node, false).unwrap_err(),
        SpatialError::ReadOnlyView(_)
    ));

    // mutating the base still works, and the view observes it
    let before = sub_layer.count().unwrap();
    index.remove(geom_node, false).unwrap();
    assert_eq!(sub_layer.count().unwrap(), before - 1);
}

#[test]
fn test_sub_layers_share_one_physical_index() {
    let (ctx, _) = osm_like_context();
    let index = Arc::new(
        RTreeIndex::with_fanout(ctx.store().clone(), ctx.layer().clone(), 4, 2).unwrap(),
    );

    let index_nodes_before = index.all_index_nodes().unwrap().len();

    let dynamic = DynamicLayer::new(Arc::clone(&index));
    let residential = dynamic
        .add_layer_config("residential", GTYPE_POINT, RESIDENTIAL_QUERY)
        .unwrap();
    let primary = dynamic
        .add_layer_config(
            "primary",
            GTYPE_POINT,
            r#"{"properties":{"highway":"primary"}}"#,
        )
        .unwrap();
    let everything = dynamic.add_layer_config("all", GTYPE_POINT, "").unwrap();

    assert_eq!(everything.count().unwrap(), 30);
    assert_eq!(
        residential.count().unwrap() + primary.count().unwrap(),
        20,
        "10 residential + 10 primary"
    );
    assert_eq!(dynamic.layer_configs().unwrap().len(), 3);

    // the views share the base tree: no index vertices were added
    assert_eq!(index.all_index_nodes().unwrap().len(), index_nodes_before);
}
