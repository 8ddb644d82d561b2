use std::fmt::{self, Display};

/// A 2D bounding box represented by minimum and maximum coordinates.
///
/// `Envelope` defines a rectangular area in 2D space. It is used throughout
/// the index for node bounding boxes and query windows.
///
/// # Null envelopes
///
/// An envelope with `x_max < x_min` is *null*: it is the envelope of the
/// empty geometry and contains nothing. A freshly zeroed envelope is **not**
/// null under this convention; code that needs an empty starting point must
/// use [`Envelope::null`].
///
/// # Persisted form
///
/// The on-graph form is a four-double array in the order
/// `[xmin, xmax, ymin, ymax]`, produced by [`Envelope::to_array`] and read by
/// [`Envelope::from_slice`]. This order is applied everywhere; no component
/// swapping occurs anywhere in the crate.
///
/// # Examples
///
/// ```rust
/// use geograph_spatial::Envelope;
///
/// let mut env = Envelope::new(0.0, 10.0, 0.0, 10.0);
/// assert!(env.covers_point(5.0, 5.0));
///
/// env.expand_to_include(&Envelope::new(8.0, 12.0, -2.0, 2.0));
/// assert_eq!(env.to_array(), [0.0, 12.0, -2.0, 10.0]);
/// ```
#[derive(Clone, Copy, PartialEq, Debug, serde::Serialize, serde::Deserialize)]
pub struct Envelope {
    /// Minimum X coordinate
    pub x_min: f64,
    /// Maximum X coordinate
    pub x_max: f64,
    /// Minimum Y coordinate
    pub y_min: f64,
    /// Maximum Y coordinate
    pub y_max: f64,
}

impl Envelope {
    /// Creates a new envelope with the specified bounds.
    pub fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Envelope {
        Envelope {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Creates the null envelope.
    pub fn null() -> Envelope {
        Envelope {
            x_min: 0.0,
            x_max: -1.0,
            y_min: 0.0,
            y_max: -1.0,
        }
    }

    /// Creates a degenerate envelope covering a single point.
    pub fn point(x: f64, y: f64) -> Envelope {
        Envelope::new(x, x, y, y)
    }

    /// Creates an envelope from a `[xmin, xmax, ymin, ymax]` slice, or `None`
    /// if the slice is not exactly four elements long.
    pub fn from_slice(bounds: &[f64]) -> Option<Envelope> {
        match bounds {
            [x_min, x_max, y_min, y_max] => Some(Envelope::new(*x_min, *x_max, *y_min, *y_max)),
            _ => None,
        }
    }

    /// Returns the `[xmin, xmax, ymin, ymax]` array form.
    pub fn to_array(&self) -> [f64; 4] {
        [self.x_min, self.x_max, self.y_min, self.y_max]
    }

    /// Returns true if this envelope is null (uninitialised or the envelope
    /// of the empty geometry).
    pub fn is_null(&self) -> bool {
        self.x_max < self.x_min
    }

    /// Returns the area of the envelope.
    pub fn area(&self) -> f64 {
        (self.x_max - self.x_min).abs() * (self.y_max - self.y_min).abs()
    }

    /// Returns the centre point of the envelope.
    pub fn centre(&self) -> (f64, f64) {
        (
            (self.x_min + self.x_max) / 2.0,
            (self.y_min + self.y_max) / 2.0,
        )
    }

    /// Tests if the given point lies in or on the envelope.
    ///
    /// A null envelope covers nothing.
    pub fn covers_point(&self, x: f64, y: f64) -> bool {
        if self.is_null() {
            return false;
        }
        x >= self.x_min && x <= self.x_max && y >= self.y_min && y <= self.y_max
    }

    /// Tests if this envelope entirely covers `other`.
    ///
    /// Returns false if either envelope is null.
    pub fn covers(&self, other: &Envelope) -> bool {
        if self.is_null() || other.is_null() {
            return false;
        }
        other.x_min >= self.x_min
            && other.x_max <= self.x_max
            && other.y_min >= self.y_min
            && other.y_max <= self.y_max
    }

    /// Tests if this envelope intersects `other`.
    pub fn intersects(&self, other: &Envelope) -> bool {
        !(self.x_max < other.x_min
            || other.x_max < self.x_min
            || self.y_max < other.y_min
            || other.y_max < self.y_min)
    }

    /// Enlarges this envelope so that it contains `other`.
    ///
    /// Has no effect if `other` is null; if this envelope is null it becomes
    /// a copy of `other`.
    pub fn expand_to_include(&mut self, other: &Envelope) {
        if other.is_null() {
            return;
        }
        if self.is_null() {
            *self = *other;
            return;
        }
        if other.x_min < self.x_min {
            self.x_min = other.x_min;
        }
        if other.x_max > self.x_max {
            self.x_max = other.x_max;
        }
        if other.y_min < self.y_min {
            self.y_min = other.y_min;
        }
        if other.y_max > self.y_max {
            self.y_max = other.y_max;
        }
    }

    /// Returns the area cost of absorbing `other` into this envelope: the
    /// area of the combined envelope minus the current area.
    pub fn enlargement(&self, other: &Envelope) -> f64 {
        let mut combined = *self;
        combined.expand_to_include(other);
        combined.area() - self.area()
    }
}

impl Display for Envelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Envelope[{}, {}, {}, {}]",
            self.x_min, self.x_max, self.y_min, self.y_max
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_array_round_trip() {
        let env = Envelope::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(env.to_array(), [1.0, 2.0, 3.0, 4.0]);
        assert_eq!(Envelope::from_slice(&env.to_array()), Some(env));
    }

    #[test]
    fn test_from_slice_rejects_wrong_width() {
        assert_eq!(Envelope::from_slice(&[1.0, 2.0]), None);
        assert_eq!(Envelope::from_slice(&[1.0, 2.0, 3.0, 4.0, 5.0]), None);
        assert_eq!(Envelope::from_slice(&[]), None);
    }

    #[test]
    fn test_null_envelope() {
        assert!(Envelope::null().is_null());
        // A zeroed envelope is NOT null under the xmax < xmin convention
        assert!(!Envelope::new(0.0, 0.0, 0.0, 0.0).is_null());
        assert!(Envelope::new(1.2, 1.0, 2.0, 3.0).is_null());
    }

    #[test]
    fn test_area() {
        assert_eq!(Envelope::new(0.0, 10.0, 0.0, 5.0).area(), 50.0);
        assert_eq!(Envelope::point(3.0, 3.0).area(), 0.0);
    }

    #[test]
    fn test_centre() {
        assert_eq!(Envelope::new(0.0, 10.0, 0.0, 4.0).centre(), (5.0, 2.0));
    }

    #[test]
    fn test_covers_point() {
        let env = Envelope::new(0.0, 10.0, 0.0, 10.0);
        assert!(env.covers_point(5.0, 5.0));
        assert!(env.covers_point(0.0, 0.0)); // corner
        assert!(env.covers_point(10.0, 10.0)); // corner
        assert!(!env.covers_point(-0.1, 5.0));
        assert!(!env.covers_point(5.0, 10.1));
        assert!(!Envelope::null().covers_point(0.0, 0.0));
    }

    #[test]
    fn test_covers() {
        let outer = Envelope::new(0.0, 10.0, 0.0, 10.0);
        let inner = Envelope::new(2.0, 8.0, 2.0, 8.0);
        let partial = Envelope::new(5.0, 15.0, 5.0, 15.0);

        assert!(outer.covers(&inner));
        assert!(!outer.covers(&partial));
        assert!(!inner.covers(&outer));
        assert!(!outer.covers(&Envelope::null()));
    }

    #[test]
    fn test_intersects() {
        let a = Envelope::new(0.0, 10.0, 0.0, 10.0);
        let b = Envelope::new(5.0, 15.0, 5.0, 15.0);
        let c = Envelope::new(20.0, 30.0, 20.0, 30.0);
        let touching = Envelope::new(10.0, 20.0, 10.0, 20.0);

        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        // touching counts as intersection
        assert!(a.intersects(&touching));
    }

    #[test]
    fn test_expand_to_include() {
        let mut env = Envelope::new(0.0, 5.0, 0.0, 5.0);
        env.expand_to_include(&Envelope::new(3.0, 10.0, -2.0, 4.0));
        assert_eq!(env, Envelope::new(0.0, 10.0, -2.0, 5.0));

        // contained envelope changes nothing
        let before = env;
        env.expand_to_include(&Envelope::new(1.0, 2.0, 1.0, 2.0));
        assert_eq!(env, before);
    }

    #[test]
    fn test_expand_with_null_operands() {
        let valid = Envelope::new(0.0, 1.0, 0.0, 1.0);

        let mut env = valid;
        env.expand_to_include(&Envelope::null());
        assert_eq!(env, valid);

        let mut env = Envelope::null();
        env.expand_to_include(&valid);
        assert_eq!(env, valid);
    }

    #[test]
    fn test_enlargement() {
        let env = Envelope::new(0.0, 2.0, 0.0, 2.0);
        // absorbing a contained envelope costs nothing
        assert_eq!(env.enlargement(&Envelope::new(0.5, 1.0, 0.5, 1.0)), 0.0);
        // doubling the width costs the current area
        assert_eq!(env.enlargement(&Envelope::new(2.0, 4.0, 0.0, 2.0)), 4.0);
        // enlargement does not mutate
        assert_eq!(env, Envelope::new(0.0, 2.0, 0.0, 2.0));
    }

    #[test]
    fn test_display() {
        let env = Envelope::new(1.0, 2.0, 3.0, 4.0);
        assert_eq!(format!("{}", env), "Envelope[1, 2, 3, 4]");
    }
}
