//! Field descriptors: kind flags, declared types, and accessor trampolines.

use crate::object::{GcObject, Handle};
use crate::variant::Variant;
use bitflags::bitflags;

bitflags! {
    /// Classification of a reflected field.
    ///
    /// The collector cares only about `HANDLE` and `HANDLE_SEQ`; scalar and
    /// string fields exist in the schema but are opaque to tracing. The
    /// pointer flags are disjoint by construction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyKind: u8 {
        /// Plain scalar (integer, float, bool).
        const SCALAR = 1 << 0;
        /// Owned string.
        const STRING = 1 << 1;
        /// Single owning-but-collectible reference to a managed object.
        const HANDLE = 1 << 2;
        /// Ordered dynamic sequence of managed references.
        const HANDLE_SEQ = 1 << 3;
    }
}

impl PropertyKind {
    /// Whether the field participates in tracing.
    #[inline]
    pub fn is_traced(self) -> bool {
        self.intersects(PropertyKind::HANDLE | PropertyKind::HANDLE_SEQ)
    }

    /// Textual fallback classification from a declared type string.
    ///
    /// Producers are expected to set explicit flags; this heuristic exists
    /// only for descriptors that omit them and must agree with explicit
    /// flags on well-formed input. It mirrors the shapes used by the
    /// builtin node types: `Option<Handle>` fields, `Vec<Handle>` fields,
    /// `String`, and everything else scalar.
    pub fn infer(type_name: &str) -> PropertyKind {
        if type_name.starts_with("Vec<") && type_name.contains("Handle") {
            PropertyKind::HANDLE_SEQ
        } else if type_name.contains("Handle") {
            PropertyKind::HANDLE
        } else if type_name == "String" || type_name == "str" {
            PropertyKind::STRING
        } else {
            PropertyKind::SCALAR
        }
    }
}

/// Reads a direct slot. `None` when the accessor is applied to the wrong
/// concrete type.
pub type HandleGetFn = fn(&dyn GcObject) -> Option<Handle>;

/// Writes a direct slot.
pub type HandleSetFn = fn(&mut dyn GcObject, Option<Handle>);

/// Borrows a sequence slot.
pub type SeqGetFn = for<'a> fn(&'a dyn GcObject) -> Option<&'a [Handle]>;

/// Mutably borrows a sequence slot.
pub type SeqGetMutFn = for<'a> fn(&'a mut dyn GcObject) -> Option<&'a mut Vec<Handle>>;

/// Reads a scalar/string field as a [`Variant`].
pub type ScalarLoadFn = fn(&dyn GcObject) -> Variant;

/// Stores a [`Variant`] into a scalar/string field. Returns `false` when the
/// variant tag does not match the field.
pub type ScalarStoreFn = fn(&mut dyn GcObject, &Variant) -> bool;

/// Typed access to one field, replacing raw byte-offset arithmetic.
///
/// Each accessor receives the object *already projected* to the chain level
/// the property was declared on (see [`project`](crate::project)); the
/// trampolines therefore downcast to exactly the declaring type.
#[derive(Clone, Copy)]
pub enum PropertyAccess {
    /// Direct managed reference.
    Handle {
        /// Slot reader.
        get: HandleGetFn,
        /// Slot writer.
        set: HandleSetFn,
    },
    /// Sequence of managed references.
    HandleSeq {
        /// Sequence reader.
        get: SeqGetFn,
        /// Mutable sequence access.
        get_mut: SeqGetMutFn,
    },
    /// Scalar or string field.
    Scalar {
        /// Field reader.
        load: ScalarLoadFn,
        /// Field writer; rejects mismatched variant tags.
        store: ScalarStoreFn,
    },
}

impl std::fmt::Debug for PropertyAccess {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyAccess::Handle { .. } => f.write_str("Handle"),
            PropertyAccess::HandleSeq { .. } => f.write_str("HandleSeq"),
            PropertyAccess::Scalar { .. } => f.write_str("Scalar"),
        }
    }
}

/// One reflected field of a managed type.
#[derive(Debug, Clone)]
pub struct Property {
    /// Field name, unique within the declaring type.
    pub name: &'static str,
    /// Declared type string. For pointer kinds this is the declared element
    /// type name, which bounds assignability (the stored object must be of
    /// that type or a derived one).
    pub type_name: &'static str,
    /// Byte offset of the field within the declaring type. Kept for layout
    /// invariants and diagnostics; access goes through the trampolines.
    pub offset: usize,
    /// Kind flags; the authoritative classification.
    pub kind: PropertyKind,
    /// Typed accessor trampolines.
    pub access: PropertyAccess,
}

impl Property {
    /// A direct managed-reference field.
    pub fn handle(
        name: &'static str,
        elem_type: &'static str,
        offset: usize,
        get: HandleGetFn,
        set: HandleSetFn,
    ) -> Self {
        Self {
            name,
            type_name: elem_type,
            offset,
            kind: PropertyKind::HANDLE,
            access: PropertyAccess::Handle { get, set },
        }
    }

    /// A sequence-of-managed-reference field.
    pub fn handle_seq(
        name: &'static str,
        elem_type: &'static str,
        offset: usize,
        get: SeqGetFn,
        get_mut: SeqGetMutFn,
    ) -> Self {
        Self {
            name,
            type_name: elem_type,
            offset,
            kind: PropertyKind::HANDLE_SEQ,
            access: PropertyAccess::HandleSeq { get, get_mut },
        }
    }

    /// A scalar field (integer, float, bool).
    pub fn scalar(
        name: &'static str,
        type_name: &'static str,
        offset: usize,
        load: ScalarLoadFn,
        store: ScalarStoreFn,
    ) -> Self {
        Self {
            name,
            type_name,
            offset,
            kind: PropertyKind::SCALAR,
            access: PropertyAccess::Scalar { load, store },
        }
    }

    /// A string field.
    pub fn string(
        name: &'static str,
        offset: usize,
        load: ScalarLoadFn,
        store: ScalarStoreFn,
    ) -> Self {
        Self {
            name,
            type_name: "String",
            offset,
            kind: PropertyKind::STRING,
            access: PropertyAccess::Scalar { load, store },
        }
    }

    /// Whether the field participates in tracing.
    #[inline]
    pub fn is_traced(&self) -> bool {
        self.kind.is_traced()
    }
}
