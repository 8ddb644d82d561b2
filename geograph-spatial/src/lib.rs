//! # Geograph Spatial - Graph-Backed Spatial Indexing
//!
//! This crate provides spatial indexing for geograph property graphs: a
//! persistent, height-balanced R-tree whose nodes, parent/child links and
//! leaf-to-geometry links are all expressed as vertices and typed edges in
//! the host graph. Every structural mutation runs inside a host
//! transaction.
//!
//! ## Features
//!
//! - **Graph-Native Storage**: the tree lives in the host graph; no
//!   separate files or formats
//! - **Quadratic Split**: Guttman's seed-picking and greedy distribution on
//!   overflow, eviction and re-insertion on underflow
//! - **Two-Phase Search**: fast envelope pruning followed by precise
//!   geometry refinement
//! - **Visitor Protocol**: searches, counters and maintenance sweeps are
//!   all pluggable visitors
//! - **Dynamic Layers**: predicate-filtered views over one shared index,
//!   with a structural JSON dialect and a decoded-feature hook
//! - **Pluggable Encoders**: geometry vertices are interpreted through the
//!   `GeometryEncoder` capability
//!
//! ## Quick Start
//!
//! ```rust
//! use geograph::store::{GraphStore, InMemoryGraphStore};
//! use geograph_spatial::{
//!     Envelope, Geometry, GeometryEncoder, Layer, PropertyGeometryEncoder, RTreeIndex,
//!     SearchIntersectWindow, GTYPE_POINT,
//! };
//! use std::sync::Arc;
//!
//! # fn main() -> geograph_spatial::SpatialResult<()> {
//! let store = GraphStore::new(InMemoryGraphStore::new());
//! let encoder = PropertyGeometryEncoder::new();
//! let layer = Layer::create(store.clone(), "places", GTYPE_POINT, Arc::new(encoder))?;
//! let index = RTreeIndex::new(store.clone(), layer.clone())?;
//!
//! // index a point
//! let geom_node = store.create_vertex()?;
//! encoder.encode_geometry(&store, &Geometry::point(0.5, 0.5), geom_node)?;
//! index.add(geom_node)?;
//!
//! // window query
//! let mut search = SearchIntersectWindow::new(layer, Envelope::new(0.0, 1.0, 0.0, 1.0));
//! index.execute_search(&mut search)?;
//! assert_eq!(search.results().len(), 1);
//! # Ok(())
//! # }
//! ```

pub mod constants;
pub mod dynamic;
pub mod encoder;
pub mod envelope;
pub mod error;
pub mod geometry;
pub mod layer;
pub mod rtree;
pub mod search;
pub mod visitor;

pub use constants::{
    DEFAULT_MAX_NODE_REFERENCES, DEFAULT_MIN_NODE_REFERENCES, GTYPE_LINESTRING, GTYPE_POINT,
    GTYPE_POLYGON,
};
pub use dynamic::{
    DynamicLayer, DynamicSubLayer, FeaturePredicate, IndexReaderWrapper, LayerPredicate,
    SpatialIndexReader,
};
pub use encoder::{GeometryEncoder, PropertyGeometryEncoder};
pub use envelope::Envelope;
pub use error::{SpatialError, SpatialResult};
pub use geometry::{Coordinate, Geometry};
pub use layer::{Layer, SpatialRecord};
pub use rtree::RTreeIndex;
pub use search::{
    EnvelopeIntersection, IntersectionSearch, SearchAll, SearchIntersect, SearchIntersectWindow,
};
pub use visitor::{RecordCounter, SpatialIndexVisitor, WarmUpVisitor};
