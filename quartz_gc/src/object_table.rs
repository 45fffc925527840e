//! The object table: owner of every managed object.

use crate::layout::PointerLayout;
use quartz_meta::{GcObject, Handle, TypeId};
use rustc_hash::FxHashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Table record for one live managed object.
///
/// The table owns the object; destruction happens only in sweep. The mark
/// epoch is atomic so parallel mark workers can claim first visits with a
/// compare-and-swap; the sequential path uses plain stores through the same
/// field.
pub struct Node {
    type_id: TypeId,
    layout: Arc<PointerLayout>,
    mark_epoch: AtomicU32,
    id: u64,
    debug_name: String,
    object: Box<dyn GcObject>,
}

impl Node {
    /// Reflected type of the object.
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// The cached pointer layout. The `Arc` held here is stable for the
    /// node's lifetime regardless of later cache growth.
    #[inline]
    pub fn layout(&self) -> &Arc<PointerLayout> {
        &self.layout
    }

    /// Opaque monotonic id (also the raw handle value).
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Display name for debugging and console addressing. The collector
    /// never consults this.
    #[inline]
    pub fn debug_name(&self) -> &str {
        &self.debug_name
    }

    /// The managed object.
    #[inline]
    pub fn object(&self) -> &dyn GcObject {
        self.object.as_ref()
    }

    /// Mutable access to the managed object.
    #[inline]
    pub fn object_mut(&mut self) -> &mut dyn GcObject {
        self.object.as_mut()
    }

    /// Current mark epoch.
    #[inline]
    pub fn mark_epoch(&self) -> u32 {
        self.mark_epoch.load(Ordering::Relaxed)
    }

    /// Plain first-visit mark for the sequential path. Returns whether this
    /// call set the mark.
    #[inline]
    pub(crate) fn mark_sequential(&self, epoch: u32) -> bool {
        if self.mark_epoch.load(Ordering::Relaxed) == epoch {
            return false;
        }
        self.mark_epoch.store(epoch, Ordering::Relaxed);
        true
    }

    /// CAS first-visit mark for the parallel path. Succeeds for exactly one
    /// caller per object per cycle, which bounds enqueues to one.
    #[inline]
    pub(crate) fn mark_atomic(&self, epoch: u32) -> bool {
        let mut cur = self.mark_epoch.load(Ordering::Relaxed);
        loop {
            if cur == epoch {
                return false;
            }
            match self.mark_epoch.compare_exchange_weak(
                cur,
                epoch,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return true,
                Err(observed) => cur = observed,
            }
        }
    }

    /// Epoch-wrap reset.
    #[inline]
    pub(crate) fn reset_mark(&self) {
        self.mark_epoch.store(0, Ordering::Relaxed);
    }
}

/// Maps handles to nodes and owns every registered object.
///
/// The secondary name index is lossy (last writer wins on duplicate display
/// names) and exists for the harness and console only; the collector never
/// reads it.
pub struct ObjectTable {
    objects: FxHashMap<Handle, Node>,
    by_name: FxHashMap<String, Handle>,
    next_id: u64,
}

impl ObjectTable {
    /// Create an empty table. Ids start at 1.
    pub fn new() -> Self {
        Self {
            objects: FxHashMap::default(),
            by_name: FxHashMap::default(),
            next_id: 1,
        }
    }

    /// Insert an object, assuming ownership and responsibility for its
    /// destruction. Returns the new handle; the node starts unmarked.
    pub fn insert(
        &mut self,
        object: Box<dyn GcObject>,
        type_id: TypeId,
        layout: Arc<PointerLayout>,
        debug_name: String,
    ) -> Handle {
        let id = self.next_id;
        self.next_id += 1;
        let handle = Handle::from_raw(id);

        self.by_name.insert(debug_name.clone(), handle);
        self.objects.insert(
            handle,
            Node {
                type_id,
                layout,
                mark_epoch: AtomicU32::new(0),
                id,
                debug_name,
                object,
            },
        );
        handle
    }

    /// The id the next insertion will use.
    #[inline]
    pub fn peek_next_id(&self) -> u64 {
        self.next_id
    }

    /// Look up a node.
    #[inline]
    pub fn get(&self, handle: Handle) -> Option<&Node> {
        self.objects.get(&handle)
    }

    /// Mutable node lookup.
    #[inline]
    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Node> {
        self.objects.get_mut(&handle)
    }

    /// Whether `handle` is registered.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.objects.contains_key(&handle)
    }

    /// Resolve a display name. Lossy: duplicates resolve to the most recent
    /// registration.
    pub fn find_by_name(&self, name: &str) -> Option<Handle> {
        self.by_name.get(name).copied()
    }

    /// Remove and return a node, destroying nothing yet (the caller drops
    /// the node, which drops the object). The name index entry is erased
    /// only if it still resolves to this handle.
    pub fn remove(&mut self, handle: Handle) -> Option<Node> {
        let node = self.objects.remove(&handle)?;
        if self.by_name.get(node.debug_name.as_str()) == Some(&handle) {
            self.by_name.remove(node.debug_name.as_str());
        }
        Some(node)
    }

    /// Number of live objects.
    #[inline]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// Whether the table is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Iterate handle/node pairs in unspecified order.
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &Node)> {
        self.objects.iter().map(|(h, n)| (*h, n))
    }

    /// Iterate nodes mutably in unspecified order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut Node)> {
        self.objects.iter_mut().map(|(h, n)| (*h, n))
    }

    /// Snapshot of all live handles.
    pub fn handles(&self) -> Vec<Handle> {
        self.objects.keys().copied().collect()
    }
}

impl Default for ObjectTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::LayoutCache;
    use quartz_meta::{TypeDesc, TypeRegistry};
    use std::any::Any;

    struct Dummy;

    impl GcObject for Dummy {
        fn type_name(&self) -> &'static str {
            "Dummy"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn fixture() -> (ObjectTable, TypeId, Arc<PointerLayout>) {
        let mut reg = TypeRegistry::new();
        let id = reg.register(TypeDesc::new("Dummy", 8)).unwrap();
        reg.link_bases().unwrap();
        let layout = LayoutCache::new().layout_of(&reg, id);
        (ObjectTable::new(), id, layout)
    }

    #[test]
    fn test_insert_assigns_monotonic_ids() {
        let (mut table, ty, layout) = fixture();
        let a = table.insert(Box::new(Dummy), ty, Arc::clone(&layout), "a".into());
        let b = table.insert(Box::new(Dummy), ty, layout, "b".into());
        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(table.len(), 2);
        assert_eq!(table.get(a).map(|n| n.mark_epoch()), Some(0));
    }

    #[test]
    fn test_name_index_last_writer_wins() {
        let (mut table, ty, layout) = fixture();
        let a = table.insert(Box::new(Dummy), ty, Arc::clone(&layout), "dup".into());
        let b = table.insert(Box::new(Dummy), ty, layout, "dup".into());
        assert_eq!(table.find_by_name("dup"), Some(b));

        // Removing the loser must not clobber the winner's index entry.
        table.remove(a);
        assert_eq!(table.find_by_name("dup"), Some(b));
        table.remove(b);
        assert_eq!(table.find_by_name("dup"), None);
    }

    #[test]
    fn test_ids_never_reused() {
        let (mut table, ty, layout) = fixture();
        let a = table.insert(Box::new(Dummy), ty, Arc::clone(&layout), "a".into());
        table.remove(a);
        let b = table.insert(Box::new(Dummy), ty, layout, "b".into());
        assert_eq!(b.raw(), 2);
    }

    #[test]
    fn test_mark_helpers() {
        let (mut table, ty, layout) = fixture();
        let h = table.insert(Box::new(Dummy), ty, layout, "m".into());
        let node = table.get(h).unwrap();

        assert!(node.mark_sequential(1));
        assert!(!node.mark_sequential(1));
        assert_eq!(node.mark_epoch(), 1);

        assert!(node.mark_atomic(2));
        assert!(!node.mark_atomic(2));
        assert_eq!(node.mark_epoch(), 2);

        node.reset_mark();
        assert_eq!(node.mark_epoch(), 0);
    }
}
