//! Layers and search result records.

use crate::constants::{PROP_LAYER, PROP_TYPE};
use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::encoder::GeometryEncoder;
use crate::geometry::Geometry;
use geograph::store::{GraphStore, PropertyValue, VertexId};
use std::sync::Arc;

/// A logical spatial layer: one named collection of indexed geometries.
///
/// The layer is rooted at a *layer vertex* in the host graph, which carries
/// the layer name and geometry-type code and owns the index root and
/// metadata vertices through `ROOT` and `METADATA` edges. The layer binds
/// the vertex to the [`GeometryEncoder`] used to interpret its geometry
/// vertices.
///
/// `Layer` is a cheap, cloneable handle.
#[derive(Clone)]
pub struct Layer {
    inner: Arc<LayerInner>,
}

struct LayerInner {
    store: GraphStore,
    layer_node: VertexId,
    name: String,
    encoder: Arc<dyn GeometryEncoder>,
}

impl Layer {
    /// Creates a new layer vertex in the graph.
    ///
    /// # Arguments
    /// * `store` - The host graph store
    /// * `name` - Human-readable layer name
    /// * `geometry_type` - Geometry type code for the layer
    /// * `encoder` - Encoder for the layer's geometry vertices
    pub fn create(
        store: GraphStore,
        name: &str,
        geometry_type: i32,
        encoder: Arc<dyn GeometryEncoder>,
    ) -> SpatialResult<Layer> {
        let tx = store.begin_tx()?;
        let layer_node = store.create_vertex()?;
        store.set_property(layer_node, PROP_LAYER, name.into())?;
        store.set_property(layer_node, PROP_TYPE, PropertyValue::I32(geometry_type))?;
        tx.success();
        tx.finish()?;

        Ok(Layer {
            inner: Arc::new(LayerInner {
                store,
                layer_node,
                name: name.to_string(),
                encoder,
            }),
        })
    }

    /// Attaches to an existing layer vertex.
    ///
    /// # Errors
    /// Fails with `EncoderMismatch` if the vertex has no `layer` name
    /// property.
    pub fn attach(
        store: GraphStore,
        layer_node: VertexId,
        encoder: Arc<dyn GeometryEncoder>,
    ) -> SpatialResult<Layer> {
        let name = store
            .get_property(layer_node, PROP_LAYER)?
            .and_then(|v| v.as_string().map(str::to_string))
            .ok_or_else(|| SpatialError::EncoderMismatch {
                property: PROP_LAYER.to_string(),
                expected: "string layer name".to_string(),
                found: "absent".to_string(),
            })?;

        Ok(Layer {
            inner: Arc::new(LayerInner {
                store,
                layer_node,
                name,
                encoder,
            }),
        })
    }

    /// Gets the layer name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Gets the layer vertex.
    pub fn layer_node(&self) -> VertexId {
        self.inner.layer_node
    }

    /// Gets the host graph store.
    pub fn store(&self) -> &GraphStore {
        &self.inner.store
    }

    /// Gets the layer's geometry encoder.
    pub fn encoder(&self) -> &Arc<dyn GeometryEncoder> {
        &self.inner.encoder
    }

    /// Gets the layer's geometry type code, if set.
    pub fn geometry_type(&self) -> SpatialResult<Option<i32>> {
        Ok(self
            .inner
            .store
            .get_property(self.inner.layer_node, PROP_TYPE)?
            .and_then(|v| v.as_integer())
            .map(|v| v as i32))
    }

    /// Decodes the envelope of a geometry vertex through the layer encoder.
    pub fn decode_envelope(&self, geom_node: VertexId) -> SpatialResult<Envelope> {
        self.inner
            .encoder
            .decode_envelope(&self.inner.store, geom_node)
    }

    /// Decodes the geometry of a geometry vertex through the layer encoder.
    pub fn decode_geometry(&self, geom_node: VertexId) -> SpatialResult<Geometry> {
        self.inner
            .encoder
            .decode_geometry(&self.inner.store, geom_node)
    }
}

/// One search hit: the layer it came from, the geometry vertex, and the
/// decoded geometry when the search already had to decode it.
///
/// Records are appended in visit order. The traversal makes no ordering
/// promise beyond that, since edge enumeration order is backend-defined.
#[derive(Debug, Clone, PartialEq)]
pub struct SpatialRecord {
    layer_name: String,
    geom_node: VertexId,
    geometry: Option<Geometry>,
}

impl SpatialRecord {
    /// Creates a record without a decoded geometry.
    pub fn new(layer_name: String, geom_node: VertexId) -> SpatialRecord {
        SpatialRecord {
            layer_name,
            geom_node,
            geometry: None,
        }
    }

    /// Creates a record carrying the geometry a search already decoded.
    pub fn with_geometry(
        layer_name: String,
        geom_node: VertexId,
        geometry: Geometry,
    ) -> SpatialRecord {
        SpatialRecord {
            layer_name,
            geom_node,
            geometry: Some(geometry),
        }
    }

    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    pub fn geom_node(&self) -> VertexId {
        self.geom_node
    }

    /// The decoded geometry, when the producing search decoded it.
    pub fn geometry(&self) -> Option<&Geometry> {
        self.geometry.as_ref()
    }
}
