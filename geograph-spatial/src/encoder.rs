//! Geometry encoder capability.
//!
//! The index never interprets geometry vertices itself: everything it needs
//! from the domain graph goes through a [`GeometryEncoder`]. Encoders are
//! stateless and may be shared freely between layers and threads.

use crate::constants::{
    GTYPE_LINESTRING, GTYPE_POINT, GTYPE_POLYGON, PROP_BBOX, PROP_COORDS, PROP_TYPE,
};
use crate::envelope::Envelope;
use crate::error::{SpatialError, SpatialResult};
use crate::geometry::{Coordinate, Geometry};
use geograph::store::{GraphStore, PropertyValue, VertexId};

/// Maps geometry-bearing vertices to envelopes and geometries and back.
///
/// # Contract
/// - `decode_envelope` must be cheap: it runs on every candidate hit during
///   traversal, while `decode_geometry` only runs on the refinement phase
/// - Implementations must be stateless with respect to the store; the same
///   encoder instance may serve any number of layers concurrently
pub trait GeometryEncoder: Send + Sync {
    /// Decodes the envelope of the geometry stored on `geom_node`.
    fn decode_envelope(&self, store: &GraphStore, geom_node: VertexId) -> SpatialResult<Envelope>;

    /// Decodes the full geometry stored on `geom_node`.
    fn decode_geometry(&self, store: &GraphStore, geom_node: VertexId) -> SpatialResult<Geometry>;

    /// Encodes `geometry` onto `target`, replacing whatever was there.
    fn encode_geometry(
        &self,
        store: &GraphStore,
        geometry: &Geometry,
        target: VertexId,
    ) -> SpatialResult<()>;
}

/// The reference encoder: geometry as plain vertex properties.
///
/// Persists three properties on the geometry vertex:
/// - `gtype` - geometry type code
/// - `coords` - flat `[x0, y0, x1, y1, ...]` coordinate list
/// - `bbox` - `[xmin, xmax, ymin, ymax]`, so envelope decoding never touches
///   the coordinate list
#[derive(Debug, Default, Clone, Copy)]
pub struct PropertyGeometryEncoder;

impl PropertyGeometryEncoder {
    pub fn new() -> Self {
        PropertyGeometryEncoder
    }
}

impl GeometryEncoder for PropertyGeometryEncoder {
    fn decode_envelope(&self, store: &GraphStore, geom_node: VertexId) -> SpatialResult<Envelope> {
        let value = store.get_property(geom_node, PROP_BBOX)?.ok_or_else(|| {
            SpatialError::EncoderMismatch {
                property: PROP_BBOX.to_string(),
                expected: "4-double vector".to_string(),
                found: "absent".to_string(),
            }
        })?;
        envelope_from_property(&value)
    }

    fn decode_geometry(&self, store: &GraphStore, geom_node: VertexId) -> SpatialResult<Geometry> {
        let gtype = store
            .get_property(geom_node, PROP_TYPE)?
            .and_then(|v| v.as_integer())
            .ok_or_else(|| SpatialError::EncoderMismatch {
                property: PROP_TYPE.to_string(),
                expected: "integer geometry type code".to_string(),
                found: "absent".to_string(),
            })?;

        let coords_value = store.get_property(geom_node, PROP_COORDS)?.ok_or_else(|| {
            SpatialError::EncoderMismatch {
                property: PROP_COORDS.to_string(),
                expected: "flat double vector".to_string(),
                found: "absent".to_string(),
            }
        })?;
        let flat = coords_value.as_double_array().ok_or_else(|| {
            SpatialError::EncoderMismatch {
                property: PROP_COORDS.to_string(),
                expected: "flat double vector".to_string(),
                found: coords_value.type_name().to_string(),
            }
        })?;
        if flat.len() % 2 != 0 {
            return Err(SpatialError::EncoderMismatch {
                property: PROP_COORDS.to_string(),
                expected: "even number of doubles".to_string(),
                found: format!("{} doubles", flat.len()),
            });
        }
        let coords: Vec<Coordinate> = flat
            .chunks_exact(2)
            .map(|pair| Coordinate::new(pair[0], pair[1]))
            .collect();

        match gtype as i32 {
            GTYPE_POINT => match coords.first() {
                Some(c) => Ok(Geometry::Point(*c)),
                None => Err(SpatialError::EncoderMismatch {
                    property: PROP_COORDS.to_string(),
                    expected: "at least one coordinate".to_string(),
                    found: "0 doubles".to_string(),
                }),
            },
            GTYPE_LINESTRING => Ok(Geometry::LineString(coords)),
            GTYPE_POLYGON => Ok(Geometry::Polygon(coords)),
            other => Err(SpatialError::EncoderMismatch {
                property: PROP_TYPE.to_string(),
                expected: "known geometry type code".to_string(),
                found: other.to_string(),
            }),
        }
    }

    fn encode_geometry(
        &self,
        store: &GraphStore,
        geometry: &Geometry,
        target: VertexId,
    ) -> SpatialResult<()> {
        let coords: Vec<f64> = match geometry {
            Geometry::Point(c) => vec![c.x, c.y],
            Geometry::LineString(cs) | Geometry::Polygon(cs) => {
                cs.iter().flat_map(|c| [c.x, c.y]).collect()
            }
            Geometry::Rectangle(env) => vec![
                env.x_min, env.y_min, env.x_max, env.y_min, env.x_max, env.y_max, env.x_min,
                env.y_max,
            ],
        };

        store.set_property(target, PROP_TYPE, PropertyValue::I32(geometry.gtype()))?;
        store.set_property(target, PROP_COORDS, coords.into())?;
        store.set_property(
            target,
            PROP_BBOX,
            geometry.envelope().to_array().to_vec().into(),
        )?;
        Ok(())
    }
}

/// Reads an envelope out of a `bbox` property value, raising
/// `EncoderMismatch` when the value is not a 4-double vector.
pub fn envelope_from_property(value: &PropertyValue) -> SpatialResult<Envelope> {
    let array = value
        .as_double_array()
        .ok_or_else(|| SpatialError::EncoderMismatch {
            property: PROP_BBOX.to_string(),
            expected: "4-double vector".to_string(),
            found: value.type_name().to_string(),
        })?;
    Envelope::from_slice(array).ok_or_else(|| SpatialError::EncoderMismatch {
        property: PROP_BBOX.to_string(),
        expected: "4-double vector".to_string(),
        found: format!("{} doubles", array.len()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geograph::store::InMemoryGraphStore;

    fn store() -> GraphStore {
        GraphStore::new(InMemoryGraphStore::new())
    }

    #[test]
    fn test_encode_decode_point() {
        let store = store();
        let v = store.create_vertex().unwrap();
        let encoder = PropertyGeometryEncoder::new();

        let point = Geometry::point(3.0, 4.0);
        encoder.encode_geometry(&store, &point, v).unwrap();

        assert_eq!(encoder.decode_geometry(&store, v).unwrap(), point);
        assert_eq!(
            encoder.decode_envelope(&store, v).unwrap(),
            Envelope::point(3.0, 4.0)
        );
    }

    #[test]
    fn test_encode_decode_polygon() {
        let store = store();
        let v = store.create_vertex().unwrap();
        let encoder = PropertyGeometryEncoder::new();

        let polygon = Geometry::polygon(vec![
            Coordinate::new(0.0, 0.0),
            Coordinate::new(2.0, 0.0),
            Coordinate::new(2.0, 2.0),
        ]);
        encoder.encode_geometry(&store, &polygon, v).unwrap();

        assert_eq!(encoder.decode_geometry(&store, v).unwrap(), polygon);
        assert_eq!(
            encoder.decode_envelope(&store, v).unwrap(),
            Envelope::new(0.0, 2.0, 0.0, 2.0)
        );
    }

    #[test]
    fn test_decode_envelope_missing_bbox_fails() {
        let store = store();
        let v = store.create_vertex().unwrap();
        let encoder = PropertyGeometryEncoder::new();

        let err = encoder.decode_envelope(&store, v).unwrap_err();
        assert!(matches!(err, SpatialError::EncoderMismatch { .. }));
    }

    #[test]
    fn test_decode_envelope_wrong_width_fails() {
        let store = store();
        let v = store.create_vertex().unwrap();
        store
            .set_property(v, PROP_BBOX, vec![1.0, 2.0].into())
            .unwrap();

        let err = PropertyGeometryEncoder::new()
            .decode_envelope(&store, v)
            .unwrap_err();
        match err {
            SpatialError::EncoderMismatch { found, .. } => assert_eq!(found, "2 doubles"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_decode_envelope_wrong_type_fails() {
        let store = store();
        let v = store.create_vertex().unwrap();
        store
            .set_property(v, PROP_BBOX, "not a bbox".into())
            .unwrap();

        let err = PropertyGeometryEncoder::new()
            .decode_envelope(&store, v)
            .unwrap_err();
        match err {
            SpatialError::EncoderMismatch { found, .. } => assert_eq!(found, "string"),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_decode_geometry_unknown_type_code() {
        let store = store();
        let v = store.create_vertex().unwrap();
        store.set_property(v, PROP_TYPE, 99i32.into()).unwrap();
        store
            .set_property(v, PROP_COORDS, vec![0.0, 0.0].into())
            .unwrap();

        let err = PropertyGeometryEncoder::new()
            .decode_geometry(&store, v)
            .unwrap_err();
        assert!(matches!(err, SpatialError::EncoderMismatch { .. }));
    }
}
