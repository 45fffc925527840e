//! Per-type descriptors.

use crate::method::Method;
use crate::property::Property;

/// Index of a registered type within the [`TypeRegistry`](crate::TypeRegistry).
///
/// Stable for the lifetime of the registry; cheap to copy and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(pub(crate) u32);

impl TypeId {
    /// The raw index.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Descriptor of one managed type.
///
/// Built once at startup with the builder methods, registered, and never
/// mutated afterwards. The field set of a type is stable for the lifetime
/// of the process.
#[derive(Debug, Clone)]
pub struct TypeDesc {
    /// Unique textual key.
    pub name: &'static str,
    /// Instance byte size.
    pub size: usize,
    /// Unresolved base type name; resolved by
    /// [`TypeRegistry::link_bases`](crate::TypeRegistry::link_bases).
    pub base_name: Option<&'static str>,
    /// Ordered field list.
    pub properties: Vec<Property>,
    /// Reflected methods (harness/console only; the collector never reads
    /// these).
    pub methods: Vec<Method>,
}

impl TypeDesc {
    /// Start a descriptor for `name` with instance size `size`.
    pub fn new(name: &'static str, size: usize) -> Self {
        Self {
            name,
            size,
            base_name: None,
            properties: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Declare the single base type.
    pub fn with_base(mut self, base_name: &'static str) -> Self {
        self.base_name = Some(base_name);
        self
    }

    /// Append a field descriptor.
    ///
    /// Debug builds assert the offset invariant `offset < size`; full
    /// `offset + field-size <= size` is enforced by construction since
    /// offsets come from `core::mem::offset_of!`.
    pub fn with_property(mut self, property: Property) -> Self {
        debug_assert!(
            property.offset < self.size.max(1),
            "{}.{} offset {} outside instance size {}",
            self.name,
            property.name,
            property.offset,
            self.size
        );
        self.properties.push(property);
        self
    }

    /// Append a method descriptor.
    pub fn with_method(mut self, method: Method) -> Self {
        self.methods.push(method);
        self
    }

    /// Find a property declared directly on this type (no chain walk).
    pub fn own_property(&self, name: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.name == name)
    }

    /// Find a method declared directly on this type (no chain walk).
    pub fn own_method(&self, name: &str) -> Option<&Method> {
        self.methods.iter().find(|m| m.name == name)
    }

    /// Structural equality of layouts, used to decide whether a repeated
    /// registration is idempotent or a conflict.
    pub(crate) fn same_layout(&self, other: &TypeDesc) -> bool {
        self.name == other.name
            && self.size == other.size
            && self.base_name == other.base_name
            && self.properties.len() == other.properties.len()
            && self.methods.len() == other.methods.len()
            && self
                .properties
                .iter()
                .zip(&other.properties)
                .all(|(a, b)| {
                    a.name == b.name
                        && a.type_name == b.type_name
                        && a.offset == b.offset
                        && a.kind == b.kind
                })
            && self
                .methods
                .iter()
                .zip(&other.methods)
                .all(|(a, b)| {
                    a.name == b.name
                        && a.return_type == b.return_type
                        && a.params.len() == b.params.len()
                })
    }
}
