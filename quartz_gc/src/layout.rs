//! Per-type pointer layouts and the process-wide layout cache.
//!
//! Re-classifying every field on every trace step would dominate mark time,
//! so the traced edges of each type are precomputed once: two flat lists of
//! accessor trampolines (direct slots, sequence slots) accumulated over the
//! inheritance chain. During trace the collector touches nothing but these
//! lists.

use parking_lot::RwLock;
use quartz_meta::property::{HandleGetFn, HandleSetFn, SeqGetFn, SeqGetMutFn};
use quartz_meta::{GcObject, Handle, PropertyAccess, TypeId, TypeRegistry};
use rustc_hash::FxHashMap;
use std::sync::Arc;

/// One direct managed-reference slot of a type, ready to trace.
#[derive(Clone, Copy)]
pub struct DirectSlot {
    /// Declaring property name (diagnostics only).
    pub name: &'static str,
    /// Base-chain projection depth of the declaring type.
    pub depth: u32,
    /// Slot reader.
    pub get: HandleGetFn,
    /// Slot writer (fixup only).
    pub set: HandleSetFn,
}

impl DirectSlot {
    /// Read the slot out of `obj`, projecting to the declaring chain level.
    #[inline]
    pub fn read(&self, obj: &dyn GcObject) -> Option<Handle> {
        let target = quartz_meta::project(obj, self.depth as usize)?;
        (self.get)(target)
    }

    /// Overwrite the slot, projecting to the declaring chain level.
    #[inline]
    pub fn write(&self, obj: &mut dyn GcObject, value: Option<Handle>) {
        if let Some(target) = quartz_meta::project_mut(obj, self.depth as usize) {
            (self.set)(target, value);
        }
    }
}

/// One sequence-of-managed-reference slot of a type.
#[derive(Clone, Copy)]
pub struct SeqSlot {
    /// Declaring property name (diagnostics only).
    pub name: &'static str,
    /// Base-chain projection depth of the declaring type.
    pub depth: u32,
    /// Sequence reader.
    pub get: SeqGetFn,
    /// Mutable sequence access (fixup only).
    pub get_mut: SeqGetMutFn,
}

impl SeqSlot {
    /// Borrow the sequence contents.
    #[inline]
    pub fn read<'a>(&self, obj: &'a dyn GcObject) -> Option<&'a [Handle]> {
        let target = quartz_meta::project(obj, self.depth as usize)?;
        (self.get)(target)
    }

    /// Mutably borrow the sequence contents.
    #[inline]
    pub fn read_mut<'a>(&self, obj: &'a mut dyn GcObject) -> Option<&'a mut Vec<Handle>> {
        let target = quartz_meta::project_mut(obj, self.depth as usize)?;
        (self.get_mut)(target)
    }
}

/// The traced-edge layout of one type: direct and sequence slots, union over
/// the type and all its ancestors, ordered most-base-first.
///
/// Own (most-derived) slots form the tail of each list, so the "own fields
/// only" view used when parent traversal is disabled is a subslice of the
/// same allocation, and the layout never needs rebuilding when the traversal
/// mode flips.
pub struct PointerLayout {
    direct: Vec<DirectSlot>,
    seqs: Vec<SeqSlot>,
    own_direct_start: usize,
    own_seq_start: usize,
}

impl PointerLayout {
    /// Build the layout for `id` from its registered descriptors.
    fn build(registry: &TypeRegistry, id: TypeId) -> Self {
        let mut direct = Vec::new();
        let mut seqs = Vec::new();

        registry.for_each_property(id, true, |depth, p| match p.access {
            PropertyAccess::Handle { get, set } => direct.push(DirectSlot {
                name: p.name,
                depth: depth as u32,
                get,
                set,
            }),
            PropertyAccess::HandleSeq { get, get_mut } => seqs.push(SeqSlot {
                name: p.name,
                depth: depth as u32,
                get,
                get_mut,
            }),
            PropertyAccess::Scalar { .. } => {}
        });

        let own_direct_start = direct
            .iter()
            .position(|s| s.depth == 0)
            .unwrap_or(direct.len());
        let own_seq_start = seqs.iter().position(|s| s.depth == 0).unwrap_or(seqs.len());

        Self {
            direct,
            seqs,
            own_direct_start,
            own_seq_start,
        }
    }

    /// Direct slots; the full chain or own fields only.
    #[inline]
    pub fn direct(&self, with_parents: bool) -> &[DirectSlot] {
        if with_parents {
            &self.direct
        } else {
            &self.direct[self.own_direct_start..]
        }
    }

    /// Sequence slots; the full chain or own fields only.
    #[inline]
    pub fn seqs(&self, with_parents: bool) -> &[SeqSlot] {
        if with_parents {
            &self.seqs
        } else {
            &self.seqs[self.own_seq_start..]
        }
    }

    /// Total traced slot count (full chain).
    pub fn traced_slots(&self) -> usize {
        self.direct.len() + self.seqs.len()
    }
}

/// Cache of built layouts, one per type.
///
/// First use of a type builds its layout under the write lock; later
/// lookups take the read lock and clone the `Arc`. Handed-out layouts are
/// never invalidated: the `Arc` keeps the allocation alive and in place no
/// matter how the cache's own table grows. Insertion is serialized; mark
/// workers hitting a cached entry concurrently only contend on the read
/// lock.
pub struct LayoutCache {
    map: RwLock<FxHashMap<TypeId, Arc<PointerLayout>>>,
}

impl LayoutCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self {
            map: RwLock::new(FxHashMap::default()),
        }
    }

    /// The layout for `id`, building and caching it on first use.
    pub fn layout_of(&self, registry: &TypeRegistry, id: TypeId) -> Arc<PointerLayout> {
        if let Some(layout) = self.map.read().get(&id) {
            return Arc::clone(layout);
        }

        let built = Arc::new(PointerLayout::build(registry, id));
        let mut map = self.map.write();
        // Another thread may have built the same layout while we were
        // outside the lock; keep the first insertion so every node of the
        // type shares one allocation.
        Arc::clone(map.entry(id).or_insert(built))
    }

    /// Number of cached layouts.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }
}

impl Default for LayoutCache {
    fn default() -> Self {
        Self::new()
    }
}
