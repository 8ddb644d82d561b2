//! Geometry types for the refinement phase of spatial queries.
//!
//! Bounding boxes are an approximation: window and intersection searches
//! first prune on envelopes, then refine candidate hits against the decoded
//! geometry. This module provides the lightweight geometry types that
//! refinement operates on. It deliberately covers the common cases (points,
//! line strings, simple polygons, rectangles) rather than a full
//! computational-geometry suite.

use crate::envelope::Envelope;
use std::fmt::{self, Display};

/// A 2D coordinate (x, y).
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Coordinate {
    pub x: f64,
    pub y: f64,
}

impl Coordinate {
    /// Creates a new coordinate.
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Calculates the Euclidean distance to another coordinate.
    pub fn distance(&self, other: &Coordinate) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

impl Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A 2D geometry.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub enum Geometry {
    /// A single point.
    Point(Coordinate),
    /// An open chain of line segments.
    LineString(Vec<Coordinate>),
    /// A simple polygon defined by its exterior ring. The ring is treated as
    /// implicitly closed; a duplicated closing coordinate is tolerated.
    Polygon(Vec<Coordinate>),
    /// An axis-aligned rectangle.
    Rectangle(Envelope),
}

impl Geometry {
    /// Creates a point geometry.
    pub fn point(x: f64, y: f64) -> Self {
        Geometry::Point(Coordinate::new(x, y))
    }

    /// Creates a line string from coordinates.
    pub fn line_string(coords: Vec<Coordinate>) -> Self {
        Geometry::LineString(coords)
    }

    /// Creates a polygon from its exterior ring coordinates.
    pub fn polygon(coords: Vec<Coordinate>) -> Self {
        Geometry::Polygon(coords)
    }

    /// Gets the envelope of this geometry.
    pub fn envelope(&self) -> Envelope {
        match self {
            Geometry::Point(c) => Envelope::point(c.x, c.y),
            Geometry::LineString(coords) | Geometry::Polygon(coords) => {
                let mut env = Envelope::null();
                for c in coords {
                    env.expand_to_include(&Envelope::point(c.x, c.y));
                }
                env
            }
            Geometry::Rectangle(env) => *env,
        }
    }

    /// Gets the geometry type code used by the reference encoder.
    pub fn gtype(&self) -> i32 {
        match self {
            Geometry::Point(_) => crate::constants::GTYPE_POINT,
            Geometry::LineString(_) => crate::constants::GTYPE_LINESTRING,
            Geometry::Polygon(_) | Geometry::Rectangle(_) => crate::constants::GTYPE_POLYGON,
        }
    }

    /// Checks if this geometry intersects another geometry.
    ///
    /// Touching boundaries count as intersection.
    pub fn intersects(&self, other: &Geometry) -> bool {
        // envelope check first: cheap rejection
        if !self.envelope().intersects(&other.envelope()) {
            return false;
        }

        match (self, other) {
            (Geometry::Point(a), Geometry::Point(b)) => a == b,
            (Geometry::Point(p), g) | (g, Geometry::Point(p)) => g.covers_coordinate(p),
            (Geometry::Rectangle(_), Geometry::Rectangle(_)) => {
                // the envelope check above is exact for two rectangles
                true
            }
            (a, b) => {
                let ring_a = a.boundary();
                let ring_b = b.boundary();
                if chains_intersect(&ring_a, a.is_ring(), &ring_b, b.is_ring()) {
                    return true;
                }
                // no boundary crossing: one may contain the other entirely
                a.interior_covers_first_of(&ring_b) || b.interior_covers_first_of(&ring_a)
            }
        }
    }

    /// Checks if this geometry contains another geometry.
    ///
    /// Points, rectangles and polygons are handled exactly; for other
    /// combinations the test falls back to envelope containment.
    pub fn contains(&self, other: &Geometry) -> bool {
        match (self, other) {
            (g, Geometry::Point(p)) => g.covers_coordinate(p),
            (Geometry::Rectangle(env), g) => env.covers(&g.envelope()),
            (Geometry::Polygon(_), g) => {
                let boundary = g.boundary();
                boundary.iter().all(|c| self.covers_coordinate(c))
                    && !chains_intersect(&self.boundary(), true, &boundary, g.is_ring())
            }
            _ => self.envelope().covers(&other.envelope()),
        }
    }

    /// True if the coordinate lies inside or on this geometry.
    fn covers_coordinate(&self, p: &Coordinate) -> bool {
        match self {
            Geometry::Point(c) => c == p,
            Geometry::LineString(coords) => coords
                .windows(2)
                .any(|seg| point_on_segment(p, &seg[0], &seg[1])),
            Geometry::Polygon(ring) => point_in_ring(p, ring),
            Geometry::Rectangle(env) => env.covers_point(p.x, p.y),
        }
    }

    /// The geometry's boundary as a coordinate chain.
    fn boundary(&self) -> Vec<Coordinate> {
        match self {
            Geometry::Point(c) => vec![*c],
            Geometry::LineString(coords) | Geometry::Polygon(coords) => coords.clone(),
            Geometry::Rectangle(env) => vec![
                Coordinate::new(env.x_min, env.y_min),
                Coordinate::new(env.x_max, env.y_min),
                Coordinate::new(env.x_max, env.y_max),
                Coordinate::new(env.x_min, env.y_max),
            ],
        }
    }

    /// True if the boundary chain closes back on itself.
    fn is_ring(&self) -> bool {
        matches!(self, Geometry::Polygon(_) | Geometry::Rectangle(_))
    }

    /// True if this geometry is areal and its interior covers the first
    /// coordinate of the chain.
    fn interior_covers_first_of(&self, chain: &[Coordinate]) -> bool {
        if !self.is_ring() {
            return false;
        }
        match chain.first() {
            Some(c) => self.covers_coordinate(c),
            None => false,
        }
    }
}

impl From<Envelope> for Geometry {
    fn from(env: Envelope) -> Self {
        Geometry::Rectangle(env)
    }
}

impl Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Geometry::Point(c) => write!(f, "POINT({} {})", c.x, c.y),
            Geometry::LineString(coords) => {
                write!(f, "LINESTRING(")?;
                write_coordinates(f, coords)?;
                write!(f, ")")
            }
            Geometry::Polygon(coords) => {
                write!(f, "POLYGON((")?;
                write_coordinates(f, coords)?;
                write!(f, "))")
            }
            Geometry::Rectangle(env) => write!(
                f,
                "RECTANGLE({}, {}, {}, {})",
                env.x_min, env.x_max, env.y_min, env.y_max
            ),
        }
    }
}

fn write_coordinates(f: &mut fmt::Formatter<'_>, coords: &[Coordinate]) -> fmt::Result {
    for (i, c) in coords.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{} {}", c.x, c.y)?;
    }
    Ok(())
}

/// Signed area of the triangle (a, b, c); sign gives the turn direction.
fn cross(a: &Coordinate, b: &Coordinate, c: &Coordinate) -> f64 {
    (b.x - a.x) * (c.y - a.y) - (b.y - a.y) * (c.x - a.x)
}

/// True if `p` lies on the segment from `a` to `b`.
fn point_on_segment(p: &Coordinate, a: &Coordinate, b: &Coordinate) -> bool {
    if cross(a, b, p) != 0.0 {
        return false;
    }
    p.x >= a.x.min(b.x) && p.x <= a.x.max(b.x) && p.y >= a.y.min(b.y) && p.y <= a.y.max(b.y)
}

/// True if segments (p1, p2) and (p3, p4) intersect, including touching and
/// collinear overlap.
fn segments_intersect(p1: &Coordinate, p2: &Coordinate, p3: &Coordinate, p4: &Coordinate) -> bool {
    let d1 = cross(p3, p4, p1);
    let d2 = cross(p3, p4, p2);
    let d3 = cross(p1, p2, p3);
    let d4 = cross(p1, p2, p4);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }

    (d1 == 0.0 && point_on_segment(p1, p3, p4))
        || (d2 == 0.0 && point_on_segment(p2, p3, p4))
        || (d3 == 0.0 && point_on_segment(p3, p1, p2))
        || (d4 == 0.0 && point_on_segment(p4, p1, p2))
}

/// Ray-cast point-in-polygon test over a ring (implicitly closed). Boundary
/// points count as inside.
fn point_in_ring(p: &Coordinate, ring: &[Coordinate]) -> bool {
    if ring.len() < 3 {
        return ring.windows(2).any(|seg| point_on_segment(p, &seg[0], &seg[1]))
            || ring.first().is_some_and(|c| c == p);
    }

    let mut inside = false;
    let n = ring.len();
    for i in 0..n {
        let a = &ring[i];
        let b = &ring[(i + 1) % n];
        if point_on_segment(p, a, b) {
            return true;
        }
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// True if any segment of one chain intersects any segment of the other.
/// Ring chains contribute their closing segment.
fn chains_intersect(a: &[Coordinate], a_ring: bool, b: &[Coordinate], b_ring: bool) -> bool {
    let a_segments = chain_segments(a, a_ring);
    let b_segments = chain_segments(b, b_ring);
    for (a1, a2) in &a_segments {
        for (b1, b2) in &b_segments {
            if segments_intersect(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    false
}

fn chain_segments(chain: &[Coordinate], ring: bool) -> Vec<(Coordinate, Coordinate)> {
    let mut segments: Vec<(Coordinate, Coordinate)> =
        chain.windows(2).map(|seg| (seg[0], seg[1])).collect();
    if ring && chain.len() > 2 {
        let first = chain[0];
        let last = chain[chain.len() - 1];
        if first != last {
            segments.push((last, first));
        }
    }
    segments
}
