//! Errors surfaced by the reflection and registration surface.
//!
//! The collection cycle itself has no recoverable error path: everything it
//! does is a read or an in-place write on data it owns. These errors cover
//! the harness/console-facing operations only, and never abort a collection
//! in flight.

use quartz_meta::{CallError, VariantCastError};
use std::fmt;

/// Failure of a reflection, registration, or mutation operation.
#[derive(Debug, Clone, PartialEq)]
pub enum GcError {
    /// Construction or lookup by type name failed.
    UnknownType(String),
    /// An object, field, or method lookup missed.
    NotFound {
        /// What kind of thing was looked up ("object", "property", "method").
        what: &'static str,
        /// The name that missed.
        name: String,
    },
    /// The operation requires the handle to be in the object table.
    NotGcManaged,
    /// A string value could not be coerced to the field's declared type.
    CoercionFailed {
        /// The field that rejected the value.
        property: String,
        /// Its declared type string.
        type_name: &'static str,
        /// The offending input.
        value: String,
    },
    /// Method invocation failed (unknown method, arity, argument types).
    Call(CallError),
    /// A variant downcast failed.
    Variant(VariantCastError),
}

impl GcError {
    pub(crate) fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        GcError::NotFound {
            what,
            name: name.into(),
        }
    }
}

impl fmt::Display for GcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GcError::UnknownType(name) => write!(f, "type not registered: {}", name),
            GcError::NotFound { what, name } => write!(f, "{} not found: {}", what, name),
            GcError::NotGcManaged => write!(f, "handle is not in the object table"),
            GcError::CoercionFailed {
                property,
                type_name,
                value,
            } => write!(
                f,
                "cannot coerce {:?} to {} for property {}",
                value, type_name, property
            ),
            GcError::Call(e) => write!(f, "call failed: {}", e),
            GcError::Variant(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for GcError {}

impl From<CallError> for GcError {
    fn from(e: CallError) -> Self {
        GcError::Call(e)
    }
}

impl From<VariantCastError> for GcError {
    fn from(e: VariantCastError) -> Self {
        GcError::Variant(e)
    }
}
