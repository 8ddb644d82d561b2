//! R-tree benchmarks

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use geograph::store::{GraphStore, InMemoryGraphStore};
use geograph_spatial::{
    Envelope, Geometry, GeometryEncoder, Layer, PropertyGeometryEncoder, RTreeIndex,
    SearchIntersectWindow, GTYPE_POINT,
};
use std::hint::black_box;
use std::sync::Arc;

fn build_index(points: usize) -> (GraphStore, Layer, RTreeIndex) {
    let store = GraphStore::new(InMemoryGraphStore::new());
    let layer = Layer::create(
        store.clone(),
        "bench",
        GTYPE_POINT,
        Arc::new(PropertyGeometryEncoder::new()),
    )
    .unwrap();
    let index = RTreeIndex::with_fanout(store.clone(), layer.clone(), 16, 8).unwrap();

    let encoder = PropertyGeometryEncoder::new();
    for i in 0..points {
        let x = (i % 100) as f64;
        let y = (i / 100) as f64;
        let geom_node = store.create_vertex().unwrap();
        encoder
            .encode_geometry(&store, &Geometry::point(x, y), geom_node)
            .unwrap();
        index.add(geom_node).unwrap();
    }
    (store, layer, index)
}

fn bench_rtree_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTreeIndex Insert");

    for size in [100, 1000, 5000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            b.iter(|| {
                let (_, _, index) = build_index(size);
                black_box(index.count().unwrap())
            });
        });
    }

    group.finish();
}

fn bench_rtree_window_search(c: &mut Criterion) {
    let mut group = c.benchmark_group("RTreeIndex Window Search");

    let (_, layer, index) = build_index(10_000);

    group.bench_function("search_10k", |b| {
        b.iter(|| {
            let mut search = SearchIntersectWindow::new(
                layer.clone(),
                Envelope::new(25.0, 75.0, 25.0, 75.0),
            );
            index.execute_search(&mut search).unwrap();
            black_box(search.results().len())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_rtree_insert, bench_rtree_window_search);
criterion_main!(benches);
