//! Tagged values for reflection calls and string-coerced property writes.

use crate::object::Handle;
use std::fmt;

/// A small type-erased value.
///
/// `Variant` carries method arguments and return values across the
/// reflection boundary. Numeric downcasts widen: signed and unsigned
/// integers interconvert, and both promote to `f64`. Everything else must
/// match the stored tag exactly.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    /// No value (also the return of void methods).
    Empty,
    /// Signed 64-bit integer.
    Int(i64),
    /// Unsigned 64-bit integer.
    UInt(u64),
    /// 64-bit float.
    Float(f64),
    /// Boolean.
    Bool(bool),
    /// Owned string.
    Str(String),
    /// Reference to a managed object.
    Ref(Handle),
}

impl Variant {
    /// Short name of the stored tag, for error messages.
    pub fn tag_name(&self) -> &'static str {
        match self {
            Variant::Empty => "empty",
            Variant::Int(_) => "int",
            Variant::UInt(_) => "uint",
            Variant::Float(_) => "float",
            Variant::Bool(_) => "bool",
            Variant::Str(_) => "string",
            Variant::Ref(_) => "ref",
        }
    }

    /// Whether this variant holds no value.
    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, Variant::Empty)
    }

    /// Downcast to `i64`, accepting `Int` and `UInt`.
    pub fn as_i64(&self) -> Result<i64, VariantCastError> {
        match self {
            Variant::Int(v) => Ok(*v),
            Variant::UInt(v) => Ok(*v as i64),
            other => Err(VariantCastError::new("int", other.tag_name())),
        }
    }

    /// Downcast to `u64`, accepting `UInt` and `Int`.
    pub fn as_u64(&self) -> Result<u64, VariantCastError> {
        match self {
            Variant::UInt(v) => Ok(*v),
            Variant::Int(v) => Ok(*v as u64),
            other => Err(VariantCastError::new("uint", other.tag_name())),
        }
    }

    /// Downcast to `f64`, accepting `Float`, `Int` and `UInt`.
    pub fn as_f64(&self) -> Result<f64, VariantCastError> {
        match self {
            Variant::Float(v) => Ok(*v),
            Variant::Int(v) => Ok(*v as f64),
            Variant::UInt(v) => Ok(*v as f64),
            other => Err(VariantCastError::new("float", other.tag_name())),
        }
    }

    /// Downcast to `bool`, accepting `Bool` and integer tags (non-zero).
    pub fn as_bool(&self) -> Result<bool, VariantCastError> {
        match self {
            Variant::Bool(v) => Ok(*v),
            Variant::Int(v) => Ok(*v != 0),
            Variant::UInt(v) => Ok(*v != 0),
            other => Err(VariantCastError::new("bool", other.tag_name())),
        }
    }

    /// Downcast to `&str`. Only `Str` matches.
    pub fn as_str(&self) -> Result<&str, VariantCastError> {
        match self {
            Variant::Str(v) => Ok(v),
            other => Err(VariantCastError::new("string", other.tag_name())),
        }
    }

    /// Downcast to a managed handle. Only `Ref` matches.
    pub fn as_handle(&self) -> Result<Handle, VariantCastError> {
        match self {
            Variant::Ref(h) => Ok(*h),
            other => Err(VariantCastError::new("ref", other.tag_name())),
        }
    }
}

impl Default for Variant {
    fn default() -> Self {
        Variant::Empty
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "(empty)"),
            Variant::Int(v) => write!(f, "{}", v),
            Variant::UInt(v) => write!(f, "{}", v),
            Variant::Float(v) => write!(f, "{}", v),
            Variant::Bool(v) => write!(f, "{}", v),
            Variant::Str(v) => write!(f, "{}", v),
            Variant::Ref(h) => write!(f, "@{}", h.raw()),
        }
    }
}

impl From<i64> for Variant {
    fn from(v: i64) -> Self {
        Variant::Int(v)
    }
}

impl From<u64> for Variant {
    fn from(v: u64) -> Self {
        Variant::UInt(v)
    }
}

impl From<f64> for Variant {
    fn from(v: f64) -> Self {
        Variant::Float(v)
    }
}

impl From<bool> for Variant {
    fn from(v: bool) -> Self {
        Variant::Bool(v)
    }
}

impl From<String> for Variant {
    fn from(v: String) -> Self {
        Variant::Str(v)
    }
}

impl From<&str> for Variant {
    fn from(v: &str) -> Self {
        Variant::Str(v.to_owned())
    }
}

impl From<Handle> for Variant {
    fn from(h: Handle) -> Self {
        Variant::Ref(h)
    }
}

/// A downcast was attempted against the wrong variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VariantCastError {
    /// Tag the caller asked for.
    pub expected: &'static str,
    /// Tag actually stored.
    pub found: &'static str,
}

impl VariantCastError {
    pub(crate) fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}

impl fmt::Display for VariantCastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bad variant cast: expected {}, found {}",
            self.expected, self.found
        )
    }
}

impl std::error::Error for VariantCastError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_widening_casts() {
        assert_eq!(Variant::Int(-3).as_i64(), Ok(-3));
        assert_eq!(Variant::UInt(7).as_i64(), Ok(7));
        assert_eq!(Variant::Int(4).as_f64(), Ok(4.0));
        assert_eq!(Variant::UInt(4).as_f64(), Ok(4.0));
        assert_eq!(Variant::Int(1).as_bool(), Ok(true));
        assert_eq!(Variant::UInt(0).as_bool(), Ok(false));
    }

    #[test]
    fn test_tag_mismatch() {
        let err = Variant::Str("x".into()).as_i64().unwrap_err();
        assert_eq!(err.expected, "int");
        assert_eq!(err.found, "string");

        assert!(Variant::Float(1.0).as_str().is_err());
        assert!(Variant::Empty.as_handle().is_err());
    }

    #[test]
    fn test_handle_roundtrip() {
        let h = Handle::from_raw(42);
        let v = Variant::from(h);
        assert_eq!(v.as_handle(), Ok(h));
        assert_eq!(v.to_string(), "@42");
    }
}
