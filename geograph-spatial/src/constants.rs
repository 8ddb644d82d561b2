//! Fixed edge-type names, property keys and defaults persisted in the graph.
//!
//! These strings are part of the on-graph format: changing them orphans
//! existing indexes.

/// Edge from the layer vertex to the index root.
pub const RTREE_ROOT: &str = "ROOT";
/// Edge from an index vertex to a child index vertex.
pub const RTREE_CHILD: &str = "CHILD";
/// Edge from a leaf index vertex to an indexed geometry vertex.
pub const RTREE_REFERENCE: &str = "REFERENCE";
/// Edge from the layer vertex to the index metadata vertex.
pub const RTREE_METADATA: &str = "METADATA";
/// Edge from the layer vertex to a dynamic sub-layer config vertex.
pub const LAYER_CONFIG: &str = "LAYER_CONFIG";

/// Bounding box property: four doubles `[xmin, xmax, ymin, ymax]`.
///
/// The component order is fixed; every reader and writer in this crate uses
/// it, and [`crate::envelope::Envelope`] converts to and from it.
pub const PROP_BBOX: &str = "bbox";
/// Layer (and sub-layer config) name property.
pub const PROP_LAYER: &str = "layer";
/// Geometry type code property.
pub const PROP_TYPE: &str = "gtype";
/// Dynamic sub-layer predicate text property.
pub const PROP_QUERY: &str = "query";
/// Flat coordinate list property written by the reference encoder.
pub const PROP_COORDS: &str = "coords";

/// Maximum fanout property on the metadata vertex.
pub const PROP_MAX_NODE_REFERENCES: &str = "maxNodeReferences";
/// Minimum fanout property on the metadata vertex.
pub const PROP_MIN_NODE_REFERENCES: &str = "minNodeReferences";
/// Cached geometry count property on the metadata vertex.
pub const PROP_TOTAL_GEOMETRY_COUNT: &str = "totalGeometryCount";

/// Default maximum number of entries per index vertex.
pub const DEFAULT_MAX_NODE_REFERENCES: usize = 100;
/// Default minimum number of entries per non-root index vertex.
pub const DEFAULT_MIN_NODE_REFERENCES: usize = 51;

/// Geometry type code for points.
pub const GTYPE_POINT: i32 = 1;
/// Geometry type code for line strings.
pub const GTYPE_LINESTRING: i32 = 2;
/// Geometry type code for polygons.
pub const GTYPE_POLYGON: i32 = 3;
