//! Predefined search visitors.
//!
//! ## Two-Phase Query Execution
//!
//! Searches over the index use a two-phase approach for accurate results:
//!
//! 1. **Phase 1 (R-tree scan)**: traversal prunes on index-node bounding
//!    boxes, which is fast but may surface false positives because a
//!    bounding box only approximates its geometry.
//! 2. **Phase 2 (Geometry refinement)**: candidate hits are refined against
//!    the decoded geometry, eliminating the false positives.
//!
//! Each search accumulates [`SpatialRecord`]s in visit order; when a search
//! already decoded the geometry for refinement, the record carries it so
//! callers need not decode twice.

use crate::envelope::Envelope;
use crate::error::SpatialResult;
use crate::geometry::Geometry;
use crate::layer::{Layer, SpatialRecord};
use crate::visitor::SpatialIndexVisitor;
use geograph::store::VertexId;

/// Collects every geometry in the layer.
pub struct SearchAll {
    layer: Layer,
    results: Vec<SpatialRecord>,
}

impl SearchAll {
    pub fn new(layer: Layer) -> SearchAll {
        SearchAll {
            layer,
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[SpatialRecord] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SpatialRecord> {
        self.results
    }
}

impl SpatialIndexVisitor for SearchAll {
    fn needs_to_visit(&self, _envelope: &Envelope) -> bool {
        true
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        self.results
            .push(SpatialRecord::new(self.layer.name().to_string(), geom_node));
        Ok(())
    }
}

/// Collects every geometry intersecting a query window.
///
/// Geometries whose envelope is entirely covered by the window are accepted
/// without decoding; geometries whose envelope merely intersects it go
/// through the refinement phase against the window rectangle.
pub struct SearchIntersectWindow {
    layer: Layer,
    window: Envelope,
    window_geometry: Geometry,
    results: Vec<SpatialRecord>,
}

impl SearchIntersectWindow {
    pub fn new(layer: Layer, window: Envelope) -> SearchIntersectWindow {
        SearchIntersectWindow {
            layer,
            window,
            window_geometry: Geometry::from(window),
            results: Vec::new(),
        }
    }

    pub fn results(&self) -> &[SpatialRecord] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SpatialRecord> {
        self.results
    }
}

impl SpatialIndexVisitor for SearchIntersectWindow {
    fn needs_to_visit(&self, envelope: &Envelope) -> bool {
        envelope.intersects(&self.window)
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        let geom_envelope = self.layer.decode_envelope(geom_node)?;

        if self.window.covers(&geom_envelope) {
            self.results
                .push(SpatialRecord::new(self.layer.name().to_string(), geom_node));
        } else if self.window.intersects(&geom_envelope) {
            // the box is an approximation: refine against the geometry
            let geometry = self.layer.decode_geometry(geom_node)?;
            if geometry.intersects(&self.window_geometry) {
                self.results.push(SpatialRecord::with_geometry(
                    self.layer.name().to_string(),
                    geom_node,
                    geometry,
                ));
            }
        }
        Ok(())
    }
}

/// Base capability for searches that prune on intersection with a search
/// envelope.
///
/// Implementors provide only the refinement step in
/// `on_envelope_intersection`; the traversal contract (`needs_to_visit` on
/// envelope intersection, the phase-1 envelope test per reference) is
/// supplied by [`IntersectionSearch`], which adapts any handler to the
/// visitor protocol.
pub trait EnvelopeIntersection {
    /// The layer being searched.
    fn layer(&self) -> &Layer;

    /// The envelope candidate hits must intersect.
    fn search_envelope(&self) -> &Envelope;

    /// Refinement hook: called for every geometry whose envelope intersects
    /// the search envelope.
    fn on_envelope_intersection(
        &mut self,
        geom_node: VertexId,
        envelope: Envelope,
    ) -> SpatialResult<()>;
}

/// Adapts an [`EnvelopeIntersection`] handler to the visitor protocol.
pub struct IntersectionSearch<H: EnvelopeIntersection> {
    handler: H,
}

impl<H: EnvelopeIntersection> IntersectionSearch<H> {
    pub fn new(handler: H) -> IntersectionSearch<H> {
        IntersectionSearch { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn into_handler(self) -> H {
        self.handler
    }
}

impl<H: EnvelopeIntersection> SpatialIndexVisitor for IntersectionSearch<H> {
    fn needs_to_visit(&self, envelope: &Envelope) -> bool {
        envelope.intersects(self.handler.search_envelope())
    }

    fn on_index_reference(&mut self, geom_node: VertexId) -> SpatialResult<()> {
        let geom_envelope = self.handler.layer().decode_envelope(geom_node)?;
        if geom_envelope.intersects(self.handler.search_envelope()) {
            self.handler.on_envelope_intersection(geom_node, geom_envelope)
        } else {
            Ok(())
        }
    }
}

/// Collects every geometry whose decoded geometry intersects a query
/// geometry. Run it through [`IntersectionSearch`].
pub struct SearchIntersect {
    layer: Layer,
    geometry: Geometry,
    envelope: Envelope,
    results: Vec<SpatialRecord>,
}

impl SearchIntersect {
    /// Creates the search, already adapted to the visitor protocol.
    pub fn new(layer: Layer, geometry: Geometry) -> IntersectionSearch<SearchIntersect> {
        let envelope = geometry.envelope();
        IntersectionSearch::new(SearchIntersect {
            layer,
            geometry,
            envelope,
            results: Vec::new(),
        })
    }

    pub fn results(&self) -> &[SpatialRecord] {
        &self.results
    }

    pub fn into_results(self) -> Vec<SpatialRecord> {
        self.results
    }
}

impl EnvelopeIntersection for SearchIntersect {
    fn layer(&self) -> &Layer {
        &self.layer
    }

    fn search_envelope(&self) -> &Envelope {
        &self.envelope
    }

    fn on_envelope_intersection(
        &mut self,
        geom_node: VertexId,
        _envelope: Envelope,
    ) -> SpatialResult<()> {
        let geometry = self.layer.decode_geometry(geom_node)?;
        if geometry.intersects(&self.geometry) {
            self.results.push(SpatialRecord::with_geometry(
                self.layer.name().to_string(),
                geom_node,
                geometry,
            ));
        }
        Ok(())
    }
}
