//! Node creation through the collector's factory registry.
//!
//! The factory keeps a pool of type names and hands out new objects either
//! round-robin or uniformly at random. It never constructs anything itself;
//! creation always goes through [`Gc::new_object_by_name`] so every node is
//! registered and named consistently.

use quartz_gc::Gc;
use quartz_meta::Handle;
use rand::Rng;
use rand_chacha::ChaCha8Rng;

/// Round-robin/random node factory over the collector's registered
/// constructors.
#[derive(Debug, Default)]
pub struct NodeFactory {
    pool: Vec<String>,
    cursor: usize,
}

impl NodeFactory {
    /// Create an empty factory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the creation pool, keeping only names the collector actually
    /// has constructors for. Returns the resulting pool size.
    pub fn set_pool(&mut self, gc: &Gc, type_names: &[&str]) -> usize {
        self.pool = type_names
            .iter()
            .filter(|name| gc.has_factory(name))
            .map(|name| (*name).to_owned())
            .collect();
        self.cursor = 0;
        self.pool.len()
    }

    /// Add one type to the pool if the collector can construct it and it is
    /// not already present.
    pub fn add_pool_type(&mut self, gc: &Gc, type_name: &str) -> bool {
        if !gc.has_factory(type_name) || self.pool.iter().any(|n| n == type_name) {
            return false;
        }
        self.pool.push(type_name.to_owned());
        true
    }

    /// The current pool.
    pub fn pool(&self) -> &[String] {
        &self.pool
    }

    /// Pool size.
    pub fn pool_len(&self) -> usize {
        self.pool.len()
    }

    /// Drop the pool and reset the rotation.
    pub fn clear(&mut self) {
        self.pool.clear();
        self.cursor = 0;
    }

    /// Create the next node in rotation.
    pub fn create_round_robin(&mut self, gc: &mut Gc) -> Option<Handle> {
        if self.pool.is_empty() {
            return None;
        }
        let pick = self.cursor % self.pool.len();
        self.cursor += 1;
        let name = self.pool[pick].clone();
        gc.new_object_by_name(&name).ok()
    }

    /// Create a node of a uniformly chosen pool type.
    pub fn create_random(&self, gc: &mut Gc, rng: &mut ChaCha8Rng) -> Option<Handle> {
        if self.pool.is_empty() {
            return None;
        }
        let pick = rng.gen_range(0..self.pool.len());
        let name = self.pool[pick].clone();
        gc.new_object_by_name(&name).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes;
    use quartz_gc::GcConfig;
    use quartz_meta::TypeRegistry;
    use std::sync::Arc;

    fn new_gc() -> Gc {
        let mut reg = TypeRegistry::new();
        nodes::register_builtin_types(&mut reg).unwrap();
        reg.link_bases().unwrap();
        let mut gc = Gc::new(Arc::new(reg), GcConfig::single_threaded());
        nodes::register_factories(&mut gc).unwrap();
        gc
    }

    #[test]
    fn test_pool_filters_unconstructible_types() {
        let gc = new_gc();
        let mut factory = NodeFactory::new();
        // NodeBase has no factory; Ghost is not even a type.
        assert_eq!(factory.set_pool(&gc, &["TestNode", "NodeBase", "Ghost"]), 1);
        assert_eq!(factory.pool(), &["TestNode".to_owned()]);
    }

    #[test]
    fn test_round_robin_creates_registered_nodes() {
        let mut gc = new_gc();
        let mut factory = NodeFactory::new();
        factory.set_pool(&gc, &["TestNode"]);

        let a = factory.create_round_robin(&mut gc).unwrap();
        let b = factory.create_round_robin(&mut gc).unwrap();
        assert!(gc.is_managed(a));
        assert!(gc.is_managed(b));
        assert_eq!(gc.live_objects(), 2);
    }

    #[test]
    fn test_empty_pool_creates_nothing() {
        let mut gc = new_gc();
        let mut factory = NodeFactory::new();
        assert!(factory.create_round_robin(&mut gc).is_none());
    }
}
