//! Dynamic layers: predicate-filtered views over a shared index.
//!
//! A dynamic layer expresses one physical index as several logical layers.
//! Each sub-layer is defined by a predicate stored on a config vertex
//! (`LAYER_CONFIG` edge from the layer vertex) and shares the base layer's
//! tree: nothing is copied or rebuilt. Sub-layers are read-only views;
//! mutations must target the base layer.
//!
//! Two predicate dialects are recognised:
//!
//! - **Structural JSON** operates on the graph itself: property matches on
//!   the geometry vertex, optionally stepping across typed edges to match
//!   properties further away. Fast, but tied to the data model. Example,
//!   for an OSM-style dataset:
//!
//!   ```json
//!   { "properties": {"type": "geometry"},
//!     "step": { "type": "GEOM", "direction": "IN",
//!       "step": { "type": "TAGS", "direction": "OUT",
//!         "properties": {"highway": "residential"}
//!       }
//!     }
//!   }
//!   ```
//!
//! - **Feature predicates** ([`FeaturePredicate`]) operate on the decoded
//!   geometry, which makes them slower but semantically richer. This is the
//!   hook point for CQL-style expression languages; the expressions
//!   themselves are parsed by the host application.

use crate::constants::{LAYER_CONFIG, PROP_LAYER, PROP_QUERY, PROP_TYPE};
use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::geometry::Geometry;
use crate::layer::{Layer, SpatialRecord};
use crate::rtree::RTreeIndex;
use crate::visitor::{RecordCounter, SpatialIndexVisitor};
use geograph::store::{Direction, GraphStore, PropertyValue, VertexId};
use std::sync::Arc;

/// Read capabilities of a spatial index, shared by the physical index and
/// the filtered views stacked on top of it.
pub trait SpatialIndexReader {
    /// Number of geometries visible through this reader.
    fn count(&self) -> SpatialResult<u64>;

    /// True if the underlying index holds no geometry.
    fn is_empty(&self) -> SpatialResult<bool>;

    /// The envelope of the underlying layer.
    fn layer_bbox(&self) -> SpatialResult<Option<Envelope>>;

    /// Membership-checked record lookup.
    fn get(&self, geom_node: VertexId) -> SpatialResult<SpatialRecord>;

    /// Runs a search visitor over the geometries visible through this
    /// reader.
    fn execute_search(&self, visitor: &mut dyn SpatialIndexVisitor) -> SpatialResult<()>;
}

impl SpatialIndexReader for RTreeIndex {
    fn count(&self) -> SpatialResult<u64> {
        RTreeIndex::count(self)
    }

    fn is_empty(&self) -> SpatialResult<bool> {
        RTreeIndex::is_empty(self)
    }

    fn layer_bbox(&self) -> SpatialResult<Option<Envelope>> {
        RTreeIndex::layer_bbox(self)
    }

    fn get(&self, geom_node: VertexId) -> SpatialResult<SpatialRecord> {
        RTreeIndex::get(self, geom_node)
    }

    fn execute_search(&self, visitor: &mut dyn SpatialIndexVisitor) -> SpatialResult<()> {
        RTreeIndex::execute_search(self, visitor)
    }
}

/// Passes every call through to the wrapped reader unmodified.
///
/// On its own this adds nothing; it is the composition seam filtered views
/// build on, and a convenient base for readers that only want to intercept
/// one or two calls.
pub struct IndexReaderWrapper<R: SpatialIndexReader> {
    index: R,
}

impl<R: SpatialIndexReader> IndexReaderWrapper<R> {
    pub fn new(index: R) -> IndexReaderWrapper<R> {
        IndexReaderWrapper { index }
    }

    pub fn index(&self) -> &R {
        &self.index
    }
}

impl<R: SpatialIndexReader> SpatialIndexReader for IndexReaderWrapper<R> {
    fn count(&self) -> SpatialResult<u64> {
        self.index.count()
    }

    fn is_empty(&self) -> SpatialResult<bool> {
        self.index.is_empty()
    }

    fn layer_bbox(&self) -> SpatialResult<Option<Envelope>> {
        self.index.layer_bbox()
    }

    fn get(&self, geom_node: VertexId) -> SpatialResult<SpatialRecord> {
        self.index.get(geom_node)
    }

    fn execute_search(&self, visitor: &mut dyn SpatialIndexVisitor) -> SpatialResult<()> {
        self.index.execute_search(visitor)
    }
}

/// Predicate evaluated against the decoded feature of a geometry vertex.
///
/// This is the expensive dialect: evaluation decodes the geometry through
/// the layer encoder. It is the hook through which CQL-style expression
/// languages plug in.
pub trait FeaturePredicate: Send + Sync {
    fn evaluate(
        &self,
        layer: &Layer,
        geom_node: VertexId,
        geometry: &Geometry,
    ) -> SpatialResult<bool>;
}

/// The filter a sub-layer applies at the leaves of the shared tree.
#[derive(Clone)]
pub enum LayerPredicate {
    /// Accept everything.
    All,
    /// Structural JSON match over the graph.
    Json(serde_json::Value),
    /// Decoded-feature predicate.
    Feature(Arc<dyn FeaturePredicate>),
}

impl LayerPredicate {
    /// Parses predicate text into a structural JSON predicate. Blank text
    /// means no filtering.
    pub fn parse_json(query: &str) -> SpatialResult<LayerPredicate> {
        if query.trim().is_empty() {
            return Ok(LayerPredicate::All);
        }
        let value: serde_json::Value = serde_json::from_str(query)
            .map_err(|e| SpatialError::InvalidQuery(e.to_string()))?;
        Ok(LayerPredicate::Json(value))
    }

    /// Evaluates the predicate against one geometry vertex.
    pub fn matches(&self, layer: &Layer, geom_node: VertexId) -> SpatialResult<bool> {
        match self {
            LayerPredicate::All => Ok(true),
            LayerPredicate::Json(query) => json_query_matches(layer.store(), geom_node, query),
            LayerPredicate::Feature(predicate) => {
                let geometry = layer.decode_geometry(geom_node)?;
                predicate.evaluate(layer, geom_node, &geometry)
            }
        }
    }
}

/// A base layer together with its registry of predicate-defined sub-layers.
pub struct DynamicLayer {
    index: Arc<RTreeIndex>,
}

impl DynamicLayer {
    pub fn new(index: Arc<RTreeIndex>) -> DynamicLayer {
        DynamicLayer { index }
    }

    /// The base layer all sub-layers share.
    pub fn base_layer(&self) -> &Layer {
        self.index.layer()
    }

    /// The shared physical index.
    pub fn base_index(&self) -> &Arc<RTreeIndex> {
        &self.index
    }

    /// Creates and persists a sub-layer defined by a structural JSON query.
    ///
    /// The query is validated before anything is written; blank text means
    /// an unfiltered view.
    pub fn add_layer_config(
        &self,
        name: &str,
        geometry_type: i32,
        query: &str,
    ) -> SpatialResult<DynamicSubLayer> {
        let predicate = LayerPredicate::parse_json(query)?;

        let layer = self.base_layer();
        let store = layer.store();
        let tx = store.begin_tx()?;
        let result = (|| -> SpatialResult<VertexId> {
            let config_node = store.create_vertex()?;
            store.set_property(config_node, PROP_LAYER, name.into())?;
            store.set_property(config_node, PROP_TYPE, PropertyValue::I32(geometry_type))?;
            store.set_property(config_node, PROP_QUERY, query.into())?;
            store.connect(layer.layer_node(), config_node, LAYER_CONFIG)?;
            Ok(config_node)
        })();
        match &result {
            Ok(_) => tx.success(),
            Err(_) => tx.failure(),
        }
        tx.finish()?;

        Ok(DynamicSubLayer {
            base: layer.clone(),
            index: Arc::clone(&self.index),
            name: name.to_string(),
            geometry_type: Some(geometry_type),
            predicate,
            config_node: Some(result?),
        })
    }

    /// Loads every persisted sub-layer config.
    pub fn layer_configs(&self) -> SpatialResult<Vec<DynamicSubLayer>> {
        let layer = self.base_layer();
        let store = layer.store();
        let mut sub_layers = Vec::new();
        for edge in store.edges_out(layer.layer_node(), LAYER_CONFIG)? {
            sub_layers.push(self.load_config(store, edge.end)?);
        }
        Ok(sub_layers)
    }

    /// Loads one persisted sub-layer by name.
    pub fn sub_layer(&self, name: &str) -> SpatialResult<Option<DynamicSubLayer>> {
        Ok(self
            .layer_configs()?
            .into_iter()
            .find(|sub_layer| sub_layer.name() == name))
    }

    /// Deletes a persisted sub-layer config. Returns false if no config of
    /// that name exists. The indexed data is untouched.
    pub fn remove_layer_config(&self, name: &str) -> SpatialResult<bool> {
        let layer = self.base_layer();
        let store = layer.store();

        for edge in store.edges_out(layer.layer_node(), LAYER_CONFIG)? {
            let config_name = store
                .get_property(edge.end, PROP_LAYER)?
                .and_then(|v| v.as_string().map(str::to_string));
            if config_name.as_deref() == Some(name) {
                let tx = store.begin_tx()?;
                let result = (|| -> SpatialResult<()> {
                    store.delete_edge(edge.id)?;
                    store.delete_vertex(edge.end)?;
                    Ok(())
                })();
                match &result {
                    Ok(_) => tx.success(),
                    Err(_) => tx.failure(),
                }
                tx.finish()?;
                result?;
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Builds a non-persisted sub-layer from a decoded-feature predicate.
    ///
    /// Feature predicates are host-application code, so they cannot be
    /// reconstructed from the graph; the host re-registers them at startup.
    pub fn sub_layer_with_predicate(
        &self,
        name: &str,
        geometry_type: Option<i32>,
        predicate: Arc<dyn FeaturePredicate>,
    ) -> DynamicSubLayer {
        DynamicSubLayer {
            base: self.base_layer().clone(),
            index: Arc::clone(&self.index),
            name: name.to_string(),
            geometry_type,
            predicate: LayerPredicate::Feature(predicate),
            config_node: None,
        }
    }

    fn load_config(&self, store: &GraphStore, config_node: VertexId) -> SpatialResult<DynamicSubLayer> {
        let name = store
            .get_property(config_node, PROP_LAYER)?
            .and_then(|v| v.as_string().map(str::to_string))
            .ok_or_else(|| SpatialError::InvalidQuery(
                format!("layer config {} has no name", config_node),
            ))?;
        let geometry_type = store
            .get_property(config_node, PROP_TYPE)?
            .and_then(|v| v.as_integer())
            .map(|v| v as i32);
        let query = store
            .get_property(config_node, PROP_QUERY)?
            .and_then(|v| v.as_string().map(str::to_string))
            .unwrap_or_default();

        Ok(DynamicSubLayer {
            base: self.base_layer().clone(),
            index: Arc::clone(&self.index),
            name,
            geometry_type,
            predicate: LayerPredicate::parse_json(&query)?,
            config_node: Some(config_node),
        })
    }
}

/// A filtered, read-only view over the base layer's index.
pub struct DynamicSubLayer {
    base: Layer,
    index: Arc<RTreeIndex>,
    name: String,
    geometry_type: Option<i32>,
    predicate: LayerPredicate,
    config_node: Option<VertexId>,
}

impl std::fmt::Debug for DynamicSubLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynamicSubLayer")
            .field("name", &self.name)
            .field("geometry_type", &self.geometry_type)
            .field("config_node", &self.config_node)
            .finish()
    }
}

impl DynamicSubLayer {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn geometry_type(&self) -> Option<i32> {
        self.geometry_type
    }

    pub fn predicate(&self) -> &LayerPredicate {
        &self.predicate
    }

    /// The persisted config vertex, when this view was loaded from one.
    pub fn config_node(&self) -> Option<VertexId> {
        self.config_node
    }

    /// Sub-layers are views; adding is rejected.
    pub fn add(&self, _geom_node: VertexId) -> SpatialResult<()> {
        Err(SpatialError::ReadOnlyView(self.name.clone()))
    }

    /// Sub-layers are views; removal is rejected.
    pub fn remove(&self, _geom_node: VertexId, _delete_geom_node: bool) -> SpatialResult<()> {
        Err(SpatialError::ReadOnlyView(self.name.clone()))
    }
}

impl SpatialIndexReader for DynamicSubLayer {
    /// Counts the geometries matching this sub-layer's predicate. The base
    /// layer's count is untouched.
    fn count(&self) -> SpatialResult<u64> {
        let mut counter = RecordCounter::new();
        {
            let mut filtered = FilteredVisitor {
                base: &self.base,
                predicate: &self.predicate,
                delegate: &mut counter,
            };
            let root = self.index.index_root()?;
            self.index.visit(&mut filtered, root)?;
        }
        Ok(counter.count())
    }

    fn is_empty(&self) -> SpatialResult<bool> {
        self.index.is_empty()
    }

    fn layer_bbox(&self) -> SpatialResult<Option<Envelope>> {
        self.index.layer_bbox()
    }

    fn get(&self, geom_node: VertexId) -> SpatialResult<SpatialRecord> {
        self.index.get(geom_node)
    }

    fn execute_search(&self, visitor: &mut dyn SpatialIndexVisitor) -> SpatialResult<()> {
        let mut filtered = FilteredVisitor {
            base: &self.base,
            predicate: &self.predicate,
            delegate: visitor,
        };
        self.index.execute_search(&mut filtered)
    }
}

/// Injects a sub-layer predicate into the visitor pipeline: structural
/// pruning passes through to the wrapped visitor, leaf references are
/// post-filtered before delegation.
struct FilteredVisitor<'a> {
    base: &'a Layer,
    predicate: &'a LayerPredicate,
    delegate: &'a mut dyn SpatialIndexVisitor,
}

impl SpatialIndexVisitor for FilteredVisitor<'_> {
    fn needs_to_visit(&self, envelope: &Envelope) -> bool {
        self.delegate.needs_to_visit(envelope)
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        if self.predicate.matches(self.base, geom_node)? {
            self.delegate.on_index_reference(geom_node)?;
        }
        Ok(())
    }
}

/// Evaluates a structural JSON query rooted at a geometry vertex: property
/// matches on the vertex, then optional single-edge steps, recursively.
fn json_query_matches(
    store: &GraphStore,
    geom_node: VertexId,
    query: &serde_json::Value,
) -> SpatialResult<bool> {
    let Some(object) = query.as_object() else {
        return Ok(true);
    };

    if let Some(properties) = object.get("properties") {
        if !node_properties_match(store, geom_node, properties)? {
            return Ok(false);
        }
    }
    match object.get("step") {
        Some(step) => step_and_query(store, geom_node, step),
        None => Ok(true),
    }
}

fn step_and_query(
    store: &GraphStore,
    source: VertexId,
    step: &serde_json::Value,
) -> SpatialResult<bool> {
    let Some(object) = step.as_object() else {
        return Ok(true);
    };
    let Some(edge_type) = object.get("type").and_then(|v| v.as_str()) else {
        return Ok(false);
    };
    let Some(direction) = object
        .get("direction")
        .and_then(|v| v.as_str())
        .and_then(Direction::parse)
    else {
        return Ok(false);
    };

    let edge = match direction {
        Direction::Outgoing => store.single_out(source, edge_type)?,
        Direction::Incoming => store.single_in(source, edge_type)?,
    };
    let Some(edge) = edge else {
        // a missing edge fails the match
        return Ok(false);
    };

    let next = edge.other(source);
    if let Some(properties) = object.get("properties") {
        if !node_properties_match(store, next, properties)? {
            return Ok(false);
        }
    }
    match object.get("step") {
        Some(inner) => step_and_query(store, next, inner),
        None => Ok(true),
    }
}

fn node_properties_match(
    store: &GraphStore,
    node: VertexId,
    properties: &serde_json::Value,
) -> SpatialResult<bool> {
    let Some(map) = properties.as_object() else {
        return Ok(true);
    };
    for (key, expected) in map {
        let Some(actual) = store.get_property(node, key)? else {
            return Ok(false);
        };
        if !property_value_matches(&actual, expected) {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Property comparison: typed equality, falling back to string-form
/// equality to smooth over integer-width mismatches between the query and
/// the stored value.
fn property_value_matches(actual: &PropertyValue, expected: &serde_json::Value) -> bool {
    let typed = match expected {
        serde_json::Value::Bool(b) => actual.as_bool() == Some(*b),
        serde_json::Value::String(s) => actual.as_string() == Some(s.as_str()),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                actual.as_integer() == Some(i) || actual.as_f64() == Some(i as f64)
            } else {
                n.as_f64().is_some_and(|f| actual.as_f64() == Some(f))
            }
        }
        _ => false,
    };
    if typed {
        return true;
    }

    let expected_string = match expected {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    actual.to_string() == expected_string
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GTYPE_POINT;
    use crate::encoder::{GeometryEncoder, PropertyGeometryEncoder};
    use crate::search::SearchAll;
    use geograph::store::InMemoryGraphStore;

    fn setup() -> (GraphStore, Layer, Arc<RTreeIndex>) {
        let store = GraphStore::new(InMemoryGraphStore::new());
        let layer = Layer::create(
            store.clone(),
            "osm",
            GTYPE_POINT,
            Arc::new(PropertyGeometryEncoder::new()),
        )
        .unwrap();
        let index =
            Arc::new(RTreeIndex::with_fanout(store.clone(), layer.clone(), 4, 2).unwrap());
        (store, layer, index)
    }

    fn add_tagged_point(
        store: &GraphStore,
        index: &RTreeIndex,
        x: f64,
        y: f64,
        highway: &str,
    ) -> VertexId {
        let geom_node = store.create_vertex().unwrap();
        PropertyGeometryEncoder::new()
            .encode_geometry(store, &Geometry::point(x, y), geom_node)
            .unwrap();
        store.set_property(geom_node, "highway", highway.into()).unwrap();
        index.add(geom_node).unwrap();
        geom_node
    }

    #[test]
    fn test_json_sub_layer_counts_matching_geometries() {
        let (store, _, index) = setup();
        for i in 0..6 {
            let highway = if i % 2 == 0 { "residential" } else { "primary" };
            add_tagged_point(&store, &index, i as f64, 0.0, highway);
        }

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let residential = dynamic
            .add_layer_config(
                "residential",
                GTYPE_POINT,
                r#"{"properties":{"highway":"residential"}}"#,
            )
            .unwrap();

        assert_eq!(residential.count().unwrap(), 3);
        // the base layer's count is unchanged
        assert_eq!(index.count().unwrap(), 6);
    }

    #[test]
    fn test_sub_layer_filters_search_results() {
        let (store, layer, index) = setup();
        let keep = add_tagged_point(&store, &index, 0.0, 0.0, "residential");
        let _skip = add_tagged_point(&store, &index, 1.0, 1.0, "primary");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let residential = dynamic
            .add_layer_config(
                "residential",
                GTYPE_POINT,
                r#"{"properties":{"highway":"residential"}}"#,
            )
            .unwrap();

        let mut search = SearchAll::new(layer);
        residential.execute_search(&mut search).unwrap();
        let results = search.into_results();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].geom_node(), keep);
    }

    #[test]
    fn test_json_step_traversal() {
        let (store, _, index) = setup();

        // geometry <-GEOM- way -TAGS-> tags{highway: residential}
        let geom_node = add_tagged_point(&store, &index, 0.0, 0.0, "ignored");
        let way = store.create_vertex().unwrap();
        let tags = store.create_vertex().unwrap();
        store.connect(way, geom_node, "GEOM").unwrap();
        store.connect(way, tags, "TAGS").unwrap();
        store
            .set_property(tags, "highway", "residential".into())
            .unwrap();

        // a second geometry with no way at all
        let _bare = add_tagged_point(&store, &index, 1.0, 1.0, "ignored");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let query = r#"{
            "step": {"type": "GEOM", "direction": "IN",
                "step": {"type": "TAGS", "direction": "OUT",
                    "properties": {"highway": "residential"}
                }
            }
        }"#;
        let sub_layer = dynamic
            .add_layer_config("residential-ways", GTYPE_POINT, query)
            .unwrap();

        assert_eq!(sub_layer.count().unwrap(), 1);
    }

    #[test]
    fn test_property_width_mismatch_matches_by_string_form() {
        let (store, _, index) = setup();
        let geom_node = add_tagged_point(&store, &index, 0.0, 0.0, "residential");
        store
            .set_property(geom_node, "lanes", PropertyValue::I32(2))
            .unwrap();

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let sub_layer = dynamic
            .add_layer_config("two-lane", GTYPE_POINT, r#"{"properties":{"lanes":2}}"#)
            .unwrap();
        assert_eq!(sub_layer.count().unwrap(), 1);
    }

    #[test]
    fn test_blank_query_means_no_filtering() {
        let (store, _, index) = setup();
        add_tagged_point(&store, &index, 0.0, 0.0, "a");
        add_tagged_point(&store, &index, 1.0, 1.0, "b");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let all = dynamic.add_layer_config("all", GTYPE_POINT, "").unwrap();
        assert_eq!(all.count().unwrap(), 2);
    }

    #[test]
    fn test_invalid_query_is_rejected_before_persisting() {
        let (store, layer, index) = setup();
        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let err = dynamic
            .add_layer_config("broken", GTYPE_POINT, "{not json")
            .unwrap_err();
        assert!(matches!(err, SpatialError::InvalidQuery(_)));
        // nothing was persisted
        assert!(store
            .edges_out(layer.layer_node(), LAYER_CONFIG)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_configs_persist_and_reload() {
        let (_, _, index) = setup();
        let dynamic = DynamicLayer::new(Arc::clone(&index));
        dynamic
            .add_layer_config("one", GTYPE_POINT, r#"{"properties":{"a":1}}"#)
            .unwrap();
        dynamic.add_layer_config("two", GTYPE_POINT, "").unwrap();

        let configs = dynamic.layer_configs().unwrap();
        assert_eq!(configs.len(), 2);

        let loaded = dynamic.sub_layer("one").unwrap().unwrap();
        assert_eq!(loaded.name(), "one");
        assert_eq!(loaded.geometry_type(), Some(GTYPE_POINT));
        assert!(matches!(loaded.predicate(), LayerPredicate::Json(_)));

        assert!(dynamic.remove_layer_config("one").unwrap());
        assert!(!dynamic.remove_layer_config("one").unwrap());
        assert_eq!(dynamic.layer_configs().unwrap().len(), 1);
    }

    #[test]
    fn test_sub_layer_rejects_writes() {
        let (store, _, index) = setup();
        let geom_node = add_tagged_point(&store, &index, 0.0, 0.0, "residential");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let sub_layer = dynamic.add_layer_config("view", GTYPE_POINT, "").unwrap();

        assert!(matches!(
            sub_layer.add(geom_node).unwrap_err(),
            SpatialError::ReadOnlyView(name) if name == "view"
        ));
        assert!(matches!(
            sub_layer.remove(geom_node, false).unwrap_err(),
            SpatialError::ReadOnlyView(_)
        ));
        // the base index still mutates normally
        index.remove(geom_node, false).unwrap();
    }

    #[test]
    fn test_feature_predicate_sub_layer() {
        struct LeftOfAxis;
        impl FeaturePredicate for LeftOfAxis {
            fn evaluate(
                &self,
                _layer: &Layer,
                _geom_node: VertexId,
                geometry: &Geometry,
            ) -> SpatialResult<bool> {
                Ok(geometry.envelope().x_max < 0.0)
            }
        }

        let (store, _, index) = setup();
        add_tagged_point(&store, &index, -2.0, 0.0, "a");
        add_tagged_point(&store, &index, 3.0, 0.0, "b");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let left = dynamic.sub_layer_with_predicate("left", None, Arc::new(LeftOfAxis));
        assert_eq!(left.count().unwrap(), 1);
        assert!(left.config_node().is_none());
    }

    #[test]
    fn test_wrapper_passes_through() {
        let (store, _, index) = setup();
        add_tagged_point(&store, &index, 0.0, 0.0, "a");

        let dynamic = DynamicLayer::new(Arc::clone(&index));
        let wrapper = IndexReaderWrapper::new(dynamic.add_layer_config("v", GTYPE_POINT, "").unwrap());
        assert_eq!(wrapper.count().unwrap(), 1);
        assert!(!wrapper.is_empty().unwrap());
        assert!(wrapper.layer_bbox().unwrap().is_some());
    }
}
