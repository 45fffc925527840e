//! Reflection model for the quartz object system.
//!
//! This crate describes managed types to the collector and to any tool that
//! wants to walk objects without compile-time knowledge of them:
//!
//! - [`Variant`]: a small tagged value used for method arguments, return
//!   values, and string-coerced property writes.
//! - [`Property`] / [`Method`]: per-field and per-function descriptors with
//!   typed accessor trampolines instead of raw byte offsets.
//! - [`TypeDesc`] / [`TypeRegistry`]: per-type metadata (name, size, single
//!   base link, ordered field list) and the process-wide name → descriptor
//!   index with base-chain resolution.
//! - [`GcObject`] / [`Handle`]: the object-safe trait every managed type
//!   implements, and the opaque identity the collector tracks.
//!
//! The registry is built mutably at startup, finalized with
//! [`TypeRegistry::link_bases`], and then shared immutably (typically behind
//! an `Arc`). Nothing in this crate knows about marking or sweeping; the
//! collector consumes these descriptors read-only.

pub mod error;
pub mod method;
pub mod object;
pub mod property;
pub mod registry;
pub mod type_info;
pub mod variant;

pub use error::RegistryError;
pub use method::{CallError, InvokeFn, Method, Param};
pub use object::{downcast_mut, downcast_ref, project, project_mut, GcObject, Handle};
pub use property::{Property, PropertyAccess, PropertyKind};
pub use registry::TypeRegistry;
pub use type_info::{TypeDesc, TypeId};
pub use variant::{Variant, VariantCastError};
