//! The root set: handles that are live unconditionally.

use quartz_meta::Handle;
use smallvec::SmallVec;

/// Insertion-ordered collection of root handles.
///
/// Root sets are small; membership checks are linear scans. Insertion is
/// idempotent (re-adding a present handle is a no-op), and removal drops
/// every occurrence. Removing a root does not destroy the object, it only
/// withdraws the unconditional-liveness guarantee; reachability through
/// another live object still protects it.
#[derive(Debug, Default)]
pub struct RootSet {
    list: SmallVec<[Handle; 8]>,
}

impl RootSet {
    /// Create an empty root set.
    pub fn new() -> Self {
        Self {
            list: SmallVec::new(),
        }
    }

    /// Add a root at the end, unless already present.
    ///
    /// Returns whether the handle was inserted.
    pub fn add(&mut self, handle: Handle) -> bool {
        if self.list.contains(&handle) {
            return false;
        }
        self.list.push(handle);
        true
    }

    /// Remove every occurrence of `handle`.
    ///
    /// Returns whether anything was removed.
    pub fn remove(&mut self, handle: Handle) -> bool {
        let before = self.list.len();
        self.list.retain(|h| *h != handle);
        self.list.len() != before
    }

    /// Remove and return the first `count` roots (used by root-detachment
    /// mutations).
    pub fn detach_front(&mut self, count: usize) -> usize {
        let n = count.min(self.list.len());
        self.list.drain(..n);
        n
    }

    /// Whether `handle` is a root.
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.list.contains(&handle)
    }

    /// Iterate roots in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = Handle> + '_ {
        self.list.iter().copied()
    }

    /// Number of roots.
    #[inline]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Whether the root set is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// Drop all roots.
    pub fn clear(&mut self) {
        self.list.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(raw: u64) -> Handle {
        Handle::from_raw(raw)
    }

    #[test]
    fn test_add_is_idempotent() {
        let mut roots = RootSet::new();
        assert!(roots.add(h(1)));
        assert!(!roots.add(h(1)));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn test_insertion_order_preserved() {
        let mut roots = RootSet::new();
        roots.add(h(3));
        roots.add(h(1));
        roots.add(h(2));
        let order: Vec<_> = roots.iter().map(Handle::raw).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_remove() {
        let mut roots = RootSet::new();
        roots.add(h(1));
        roots.add(h(2));
        assert!(roots.remove(h(1)));
        assert!(!roots.remove(h(1)));
        assert!(!roots.contains(h(1)));
        assert_eq!(roots.len(), 1);
    }

    #[test]
    fn test_detach_front() {
        let mut roots = RootSet::new();
        for i in 1..=4 {
            roots.add(h(i));
        }
        assert_eq!(roots.detach_front(2), 2);
        let order: Vec<_> = roots.iter().map(Handle::raw).collect();
        assert_eq!(order, vec![3, 4]);

        assert_eq!(roots.detach_front(10), 2);
        assert!(roots.is_empty());
    }
}
