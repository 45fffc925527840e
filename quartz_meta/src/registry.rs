//! The process-wide type registry.
//!
//! Registration happens at startup on an owned registry; [`link_bases`]
//! resolves base names and finalizes it. Afterwards the registry is shared
//! immutably (typically behind an `Arc`). Every read path takes `&self`,
//! so concurrent mark workers can consult it without locks.
//!
//! [`link_bases`]: TypeRegistry::link_bases

use crate::error::RegistryError;
use crate::method::Method;
use crate::property::Property;
use crate::type_info::{TypeDesc, TypeId};
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

/// Inheritance chains are shallow; four levels covers every chain the
/// harness builds.
pub type Ancestry = SmallVec<[TypeId; 4]>;

struct Entry {
    desc: TypeDesc,
    /// Resolved by `link_bases`.
    base: Option<TypeId>,
}

/// Registry of all managed-type descriptors.
pub struct TypeRegistry {
    types: Vec<Entry>,
    by_name: FxHashMap<&'static str, TypeId>,
    linked: bool,
}

impl TypeRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            types: Vec::new(),
            by_name: FxHashMap::default(),
            linked: false,
        }
    }

    /// Register a type descriptor.
    ///
    /// Registering an identical layout twice is an idempotent no-op that
    /// returns the existing id; a conflicting layout under the same name
    /// fails with [`RegistryError::DuplicateType`].
    pub fn register(&mut self, desc: TypeDesc) -> Result<TypeId, RegistryError> {
        if let Some(&existing) = self.by_name.get(desc.name) {
            let entry = &self.types[existing.0 as usize];
            return if entry.desc.same_layout(&desc) {
                Ok(existing)
            } else {
                Err(RegistryError::DuplicateType { name: desc.name })
            };
        }

        let id = TypeId(self.types.len() as u32);
        self.by_name.insert(desc.name, id);
        self.types.push(Entry { desc, base: None });
        self.linked = false;
        Ok(id)
    }

    /// Resolve every declared base name to a registry link.
    ///
    /// Must run after all registrations and before the registry is shared.
    /// Fails with [`RegistryError::UnknownBase`] on an unresolvable name and
    /// [`RegistryError::CyclicBase`] if a chain does not terminate.
    pub fn link_bases(&mut self) -> Result<(), RegistryError> {
        for idx in 0..self.types.len() {
            let base = match self.types[idx].desc.base_name {
                None => None,
                Some(base_name) => match self.by_name.get(base_name) {
                    Some(&base_id) => Some(base_id),
                    None => {
                        return Err(RegistryError::UnknownBase {
                            type_name: self.types[idx].desc.name,
                            base_name,
                        })
                    }
                },
            };
            self.types[idx].base = base;
        }

        // Chains must terminate within the registered type count.
        for idx in 0..self.types.len() {
            let mut steps = 0;
            let mut cur = self.types[idx].base;
            while let Some(next) = cur {
                steps += 1;
                if steps > self.types.len() {
                    return Err(RegistryError::CyclicBase {
                        type_name: self.types[idx].desc.name,
                    });
                }
                cur = self.types[next.0 as usize].base;
            }
        }

        self.linked = true;
        Ok(())
    }

    /// Whether `link_bases` has run since the last registration.
    #[inline]
    pub fn is_linked(&self) -> bool {
        self.linked
    }

    /// Look up a type by name. Unknown names are "not found", not an error.
    #[inline]
    pub fn lookup(&self, name: &str) -> Option<TypeId> {
        self.by_name.get(name).copied()
    }

    /// The descriptor for `id`.
    #[inline]
    pub fn get(&self, id: TypeId) -> &TypeDesc {
        &self.types[id.0 as usize].desc
    }

    /// The resolved base of `id`, if any.
    #[inline]
    pub fn base_of(&self, id: TypeId) -> Option<TypeId> {
        self.types[id.0 as usize].base
    }

    /// Number of registered types.
    #[inline]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether the registry is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Iterate all registered ids in registration order.
    pub fn ids(&self) -> impl Iterator<Item = TypeId> + '_ {
        (0..self.types.len() as u32).map(TypeId)
    }

    /// The inheritance chain of `id`, most-base-first, ending with `id`
    /// itself.
    ///
    /// This is the single definition of "effective field set with parents"
    /// shared by the collector and the harness.
    pub fn ancestry(&self, id: TypeId) -> Ancestry {
        let mut chain = Ancestry::new();
        let mut cur = Some(id);
        while let Some(t) = cur {
            chain.push(t);
            cur = self.types[t.0 as usize].base;
        }
        chain.reverse();
        chain
    }

    /// Enumerate properties of `id`.
    ///
    /// With `with_parents`, the chain is walked most-base-first (base fields
    /// before derived fields); otherwise only the type's own fields are
    /// visited. The callback receives the projection depth of the declaring
    /// type (0 = `id` itself) alongside each property.
    pub fn for_each_property<F>(&self, id: TypeId, with_parents: bool, mut f: F)
    where
        F: FnMut(usize, &Property),
    {
        if with_parents {
            let chain = self.ancestry(id);
            let last = chain.len() - 1;
            for (i, &t) in chain.iter().enumerate() {
                let depth = last - i;
                for p in &self.types[t.0 as usize].desc.properties {
                    f(depth, p);
                }
            }
        } else {
            for p in &self.types[id.0 as usize].desc.properties {
                f(0, p);
            }
        }
    }

    /// Find a property by name, walking the chain with base declarations
    /// taking precedence. Returns the projection depth of the declaring
    /// type alongside the descriptor.
    pub fn find_property(&self, id: TypeId, name: &str) -> Option<(usize, &Property)> {
        let chain = self.ancestry(id);
        let last = chain.len() - 1;
        for (i, &t) in chain.iter().enumerate() {
            if let Some(p) = self.types[t.0 as usize].desc.own_property(name) {
                return Some((last - i, p));
            }
        }
        None
    }

    /// Find a method by name, walking the chain most-base-first.
    pub fn find_method(&self, id: TypeId, name: &str) -> Option<(usize, &Method)> {
        let chain = self.ancestry(id);
        let last = chain.len() - 1;
        for (i, &t) in chain.iter().enumerate() {
            if let Some(m) = self.types[t.0 as usize].desc.own_method(name) {
                return Some((last - i, m));
            }
        }
        None
    }

    /// Whether `base` is `derived` itself or one of its ancestors.
    pub fn is_ancestor_or_equal(&self, base: TypeId, derived: TypeId) -> bool {
        let mut cur = Some(derived);
        while let Some(t) = cur {
            if t == base {
                return true;
            }
            cur = self.types[t.0 as usize].base;
        }
        false
    }

    /// Assignability check used when linking objects through reflection:
    /// may an object of type `child` be stored in a slot whose declared
    /// element type is `elem_type_name`?
    pub fn assignable(&self, elem_type_name: &str, child: TypeId) -> bool {
        match self.lookup(elem_type_name) {
            Some(elem) => self.is_ancestor_or_equal(elem, child),
            None => false,
        }
    }
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new()
    }
}
