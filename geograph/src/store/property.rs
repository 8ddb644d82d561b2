use std::fmt::{Debug, Display, Formatter};

/// Represents a typed property value stored on a vertex.
///
/// # Purpose
/// Provides a unified representation for all value types that can be stored
/// as vertex properties: scalars (booleans, integers, floats, strings) and
/// flat double arrays (used for bounding boxes and coordinate lists).
///
/// # Usage
/// Create values using the `From` implementations:
/// ```rust
/// use geograph::store::PropertyValue;
///
/// let name: PropertyValue = "roads".into();
/// let count: PropertyValue = 42i64.into();
/// let bbox: PropertyValue = vec![0.0, 1.0, 0.0, 1.0].into();
/// ```
///
/// Access values using the `as_*` methods, which return `None` when the
/// variant does not match:
/// ```rust
/// # use geograph::store::PropertyValue;
/// let value = PropertyValue::from(42i64);
/// assert_eq!(value.as_i64(), Some(42));
/// assert_eq!(value.as_string(), None);
/// ```
#[derive(Clone, PartialEq, serde::Deserialize, serde::Serialize)]
pub enum PropertyValue {
    /// Represents a boolean value.
    Bool(bool),
    /// Represents a signed 32-bit integer value.
    I32(i32),
    /// Represents a signed 64-bit integer value.
    I64(i64),
    /// Represents a 64-bit floating point value.
    F64(f64),
    /// Represents a text value.
    String(String),
    /// Represents a flat array of 64-bit floats.
    DoubleArray(Vec<f64>),
}

impl PropertyValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i32(&self) -> Option<i32> {
        match self {
            PropertyValue::I32(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::I64(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the value as a signed 64-bit integer, widening `I32` values.
    ///
    /// Property width is backend-dependent; callers that only care about the
    /// integral value should use this instead of the exact-variant accessors.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PropertyValue::I32(i) => Some(*i as i64),
            PropertyValue::I64(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            PropertyValue::F64(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_double_array(&self) -> Option<&[f64]> {
        match self {
            PropertyValue::DoubleArray(a) => Some(a),
            _ => None,
        }
    }

    /// Returns a short name for the variant, used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Bool(_) => "bool",
            PropertyValue::I32(_) => "i32",
            PropertyValue::I64(_) => "i64",
            PropertyValue::F64(_) => "f64",
            PropertyValue::String(_) => "string",
            PropertyValue::DoubleArray(_) => "double[]",
        }
    }
}

impl Display for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyValue::Bool(b) => write!(f, "{}", b),
            PropertyValue::I32(i) => write!(f, "{}", i),
            PropertyValue::I64(i) => write!(f, "{}", i),
            PropertyValue::F64(v) => write!(f, "{}", v),
            PropertyValue::String(s) => write!(f, "{}", s),
            PropertyValue::DoubleArray(a) => {
                write!(f, "[")?;
                for (i, v) in a.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Debug for PropertyValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.type_name(), self)
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Bool(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::I32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::I64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::F64(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Vec<f64>> for PropertyValue {
    fn from(value: Vec<f64>) -> Self {
        PropertyValue::DoubleArray(value)
    }
}

impl From<&[f64]> for PropertyValue {
    fn from(value: &[f64]) -> Self {
        PropertyValue::DoubleArray(value.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_match_variant() {
        assert_eq!(PropertyValue::from(true).as_bool(), Some(true));
        assert_eq!(PropertyValue::from(7i32).as_i32(), Some(7));
        assert_eq!(PropertyValue::from(7i64).as_i64(), Some(7));
        assert_eq!(PropertyValue::from(1.5).as_f64(), Some(1.5));
        assert_eq!(PropertyValue::from("x").as_string(), Some("x"));
        assert_eq!(
            PropertyValue::from(vec![1.0, 2.0]).as_double_array(),
            Some(&[1.0, 2.0][..])
        );
    }

    #[test]
    fn test_accessors_reject_other_variants() {
        let value = PropertyValue::from("text");
        assert_eq!(value.as_bool(), None);
        assert_eq!(value.as_i64(), None);
        assert_eq!(value.as_f64(), None);
        assert_eq!(value.as_double_array(), None);
    }

    #[test]
    fn test_as_integer_widens() {
        assert_eq!(PropertyValue::from(5i32).as_integer(), Some(5));
        assert_eq!(PropertyValue::from(5i64).as_integer(), Some(5));
        assert_eq!(PropertyValue::from(5.0).as_integer(), None);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", PropertyValue::from(3i64)), "3");
        assert_eq!(format!("{}", PropertyValue::from("abc")), "abc");
        assert_eq!(
            format!("{}", PropertyValue::from(vec![1.0, 2.5])),
            "[1,2.5]"
        );
    }

    #[test]
    fn test_equality() {
        assert_eq!(PropertyValue::from(1i64), PropertyValue::from(1i64));
        // Different widths are different values; width-tolerant comparison
        // is the caller's concern.
        assert_ne!(PropertyValue::from(1i32), PropertyValue::from(1i64));
    }
}
