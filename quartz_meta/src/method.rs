//! Reflected methods: signatures and invoker trampolines.
//!
//! Methods are opaque to the collector; only the harness and the console
//! call through them.

use crate::object::GcObject;
use crate::variant::{Variant, VariantCastError};
use std::fmt;

/// One declared parameter of a reflected method.
#[derive(Debug, Clone, Copy)]
pub struct Param {
    /// Parameter name (for diagnostics).
    pub name: &'static str,
    /// Declared type string.
    pub type_name: &'static str,
}

/// Invoker trampoline. Receives the object projected to the declaring type
/// and the argument list, already arity-checked against [`Method::params`].
pub type InvokeFn = fn(&mut dyn GcObject, &[Variant]) -> Result<Variant, CallError>;

/// One reflected method of a managed type.
#[derive(Clone)]
pub struct Method {
    /// Method name, unique within the declaring type.
    pub name: &'static str,
    /// Declared return type string (`"()"` for void).
    pub return_type: &'static str,
    /// Declared parameters, in order.
    pub params: &'static [Param],
    /// Invocation trampoline.
    pub invoker: InvokeFn,
}

impl Method {
    /// Build a method descriptor.
    pub fn new(
        name: &'static str,
        return_type: &'static str,
        params: &'static [Param],
        invoker: InvokeFn,
    ) -> Self {
        Self {
            name,
            return_type,
            params,
            invoker,
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Method")
            .field("name", &self.name)
            .field("return_type", &self.return_type)
            .field("arity", &self.params.len())
            .finish()
    }
}

/// Reflected invocation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallError {
    /// No method with the requested name anywhere on the chain.
    NotFound {
        /// Type searched.
        type_name: String,
        /// Method requested.
        method: String,
    },
    /// Wrong number of arguments.
    ArityMismatch {
        /// Declared parameter count.
        expected: usize,
        /// Arguments supplied.
        got: usize,
    },
    /// An argument did not downcast to the declared parameter type.
    BadArgument {
        /// Zero-based argument position.
        index: usize,
        /// Underlying variant mismatch.
        cause: VariantCastError,
    },
}

impl fmt::Display for CallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallError::NotFound { type_name, method } => {
                write!(f, "{}.{} not found", type_name, method)
            }
            CallError::ArityMismatch { expected, got } => {
                write!(f, "expected {} arguments, got {}", expected, got)
            }
            CallError::BadArgument { index, cause } => {
                write!(f, "argument {}: {}", index, cause)
            }
        }
    }
}

impl std::error::Error for CallError {}
