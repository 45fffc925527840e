//! Registration-time errors.

use std::fmt;

/// Failure while building or linking the type registry.
///
/// All of these are fatal to registration: the registry must not be used
/// after one is returned from [`link_bases`](crate::TypeRegistry::link_bases).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// A type name was re-registered with a conflicting layout.
    DuplicateType {
        /// The conflicting type name.
        name: &'static str,
    },
    /// A declared base name is not registered.
    UnknownBase {
        /// Type whose base failed to resolve.
        type_name: &'static str,
        /// The unresolved base name.
        base_name: &'static str,
    },
    /// The base chain does not terminate.
    CyclicBase {
        /// A type on the cycle.
        type_name: &'static str,
    },
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistryError::DuplicateType { name } => {
                write!(f, "type {} re-registered with a conflicting layout", name)
            }
            RegistryError::UnknownBase {
                type_name,
                base_name,
            } => write!(f, "type {} declares unknown base {}", type_name, base_name),
            RegistryError::CyclicBase { type_name } => {
                write!(f, "base chain of type {} does not terminate", type_name)
            }
        }
    }
}

impl std::error::Error for RegistryError {}
