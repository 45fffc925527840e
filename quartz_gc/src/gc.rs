//! The collector context.
//!
//! One [`Gc`] owns everything the collection cycle touches: the object
//! table, root set, layout cache, factories, configuration, statistics, and
//! the epoch counter. There is deliberately no process-wide singleton; the
//! host constructs a `Gc` and threads it through call sites.

use crate::collector::{self, CollectParams};
use crate::config::GcConfig;
use crate::error::GcError;
use crate::layout::LayoutCache;
use crate::object_table::ObjectTable;
use crate::roots::RootSet;
use crate::stats::GcStats;
use quartz_meta::{GcObject, Handle, TypeId, TypeRegistry};
use rustc_hash::FxHashMap;
use std::sync::Arc;
use std::time::Duration;

/// Zero-argument constructor registered per type for by-name creation.
pub type FactoryFn = fn() -> Box<dyn GcObject>;

/// A reflection-driven mark-sweep collector over one object graph.
pub struct Gc {
    registry: Arc<TypeRegistry>,
    table: ObjectTable,
    roots: RootSet,
    layouts: LayoutCache,
    factories: FxHashMap<&'static str, (TypeId, FactoryFn)>,
    config: GcConfig,
    stats: GcStats,
    epoch: u32,
    accumulated: f64,
}

impl Gc {
    /// Create a collector over a linked type registry.
    ///
    /// The registry must have had [`TypeRegistry::link_bases`] run; base
    /// chains are resolved once and descriptors never change afterwards.
    pub fn new(registry: Arc<TypeRegistry>, config: GcConfig) -> Self {
        debug_assert!(
            registry.is_linked(),
            "registry must be linked before constructing a Gc"
        );
        Self {
            registry,
            table: ObjectTable::new(),
            roots: RootSet::new(),
            layouts: LayoutCache::new(),
            factories: FxHashMap::default(),
            config,
            stats: GcStats::new(),
            epoch: 1,
            accumulated: 0.0,
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// The type registry.
    #[inline]
    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// The object table (read-only).
    #[inline]
    pub fn table(&self) -> &ObjectTable {
        &self.table
    }

    /// The root set (read-only).
    #[inline]
    pub fn roots(&self) -> &RootSet {
        &self.roots
    }

    /// Collector statistics.
    #[inline]
    pub fn stats(&self) -> &GcStats {
        &self.stats
    }

    /// Current collection epoch.
    #[inline]
    pub fn epoch(&self) -> u32 {
        self.epoch
    }

    /// Current configuration.
    #[inline]
    pub fn config(&self) -> &GcConfig {
        &self.config
    }

    /// Number of live managed objects.
    #[inline]
    pub fn live_objects(&self) -> usize {
        self.table.len()
    }

    // =========================================================================
    // Configuration knobs
    // =========================================================================

    /// Set the mark-phase thread budget (0 = auto, 1 = sequential).
    pub fn set_max_threads(&mut self, threads: usize) {
        self.config.max_threads = threads;
    }

    /// Control whether tracing and reflection enumerate inherited fields.
    pub fn set_traverse_parents(&mut self, enabled: bool) {
        self.config.traverse_parents = enabled;
    }

    /// Whether inherited fields are enumerated.
    #[inline]
    pub fn traverse_parents(&self) -> bool {
        self.config.traverse_parents
    }

    /// Set the auto-collect interval in seconds (≤ 0 disables).
    pub fn set_auto_interval(&mut self, seconds: f64) {
        self.config.auto_interval_secs = seconds;
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Associate a type name with a zero-argument constructor.
    pub fn register_factory(&mut self, type_name: &str, factory: FactoryFn) -> Result<(), GcError> {
        let type_id = self
            .registry
            .lookup(type_name)
            .ok_or_else(|| GcError::UnknownType(type_name.to_owned()))?;
        // Key by the descriptor's own static name so the map never borrows
        // from the caller.
        let name = self.registry.get(type_id).name;
        self.factories.insert(name, (type_id, factory));
        Ok(())
    }

    /// Whether a factory is registered for `type_name`.
    pub fn has_factory(&self, type_name: &str) -> bool {
        self.factories.contains_key(type_name)
    }

    /// Allocate and register an object by type name.
    ///
    /// The new object gets a fresh monotonic id and the display name
    /// `"{TypeName}_{id}"`.
    pub fn new_object_by_name(&mut self, type_name: &str) -> Result<Handle, GcError> {
        let &(type_id, factory) = self
            .factories
            .get(type_name)
            .ok_or_else(|| GcError::UnknownType(type_name.to_owned()))?;
        let object = factory();
        Ok(self.insert(object, type_id, None))
    }

    /// Register an externally constructed object, assuming ownership.
    ///
    /// The concrete type is identified through
    /// [`GcObject::type_name`] and must be registered.
    pub fn register_object(&mut self, object: Box<dyn GcObject>) -> Result<Handle, GcError> {
        let type_id = self
            .registry
            .lookup(object.type_name())
            .ok_or_else(|| GcError::UnknownType(object.type_name().to_owned()))?;
        Ok(self.insert(object, type_id, None))
    }

    /// Register an externally constructed object under an explicit display
    /// name.
    pub fn register_object_named(
        &mut self,
        object: Box<dyn GcObject>,
        display_name: impl Into<String>,
    ) -> Result<Handle, GcError> {
        let type_id = self
            .registry
            .lookup(object.type_name())
            .ok_or_else(|| GcError::UnknownType(object.type_name().to_owned()))?;
        Ok(self.insert(object, type_id, Some(display_name.into())))
    }

    fn insert(
        &mut self,
        object: Box<dyn GcObject>,
        type_id: TypeId,
        display_name: Option<String>,
    ) -> Handle {
        let layout = self.layouts.layout_of(&self.registry, type_id);
        let name = display_name.unwrap_or_else(|| {
            format!(
                "{}_{}",
                self.registry.get(type_id).name,
                self.table.peek_next_id()
            )
        });
        self.table.insert(object, type_id, layout, name)
    }

    // =========================================================================
    // Roots
    // =========================================================================

    /// Add a root, if the handle is managed and not already present.
    pub fn add_root(&mut self, handle: Handle) -> bool {
        if !self.table.contains(handle) {
            return false;
        }
        self.roots.add(handle)
    }

    /// Remove every root occurrence of `handle`.
    pub fn remove_root(&mut self, handle: Handle) -> bool {
        self.roots.remove(handle)
    }

    /// Remove the first `count` roots; used by the harness's root-detachment
    /// mutation.
    pub fn detach_roots_front(&mut self, count: usize) -> usize {
        self.roots.detach_front(count)
    }

    /// Drop every root. Objects stay alive until the next collection.
    pub fn clear_roots(&mut self) {
        self.roots.clear();
    }

    // =========================================================================
    // Collection
    // =========================================================================

    /// Run one stop-the-world collection and return its wall-clock duration.
    ///
    /// With `silent`, the configured trace report is suppressed (statistics
    /// are still recorded).
    pub fn collect(&mut self, silent: bool) -> Duration {
        let params = CollectParams {
            threads: self.config.resolved_threads(),
            parallel_threshold: self.config.parallel_threshold,
            traverse_parents: self.config.traverse_parents,
        };
        let outcome =
            collector::run_collection(&mut self.table, &mut self.roots, &mut self.epoch, &params);

        self.stats
            .record_collection(&outcome.timings, outcome.swept, outcome.live);

        if self.config.trace && !silent {
            let t = &outcome.timings;
            eprintln!(
                "[gc] collected {} objects, alive={}, {:?} total ({} mark)",
                outcome.swept,
                outcome.live,
                t.total,
                if outcome.parallel {
                    "parallel"
                } else {
                    "sequential"
                },
            );
            eprintln!(
                "[gc] phases: clear={:?} mark={:?} build={:?} fixup={:?} sweep={:?}",
                t.clear, t.mark, t.build_dead, t.fixup, t.sweep
            );
        }

        outcome.timings.total
    }

    /// Advance the auto-collect accumulator; runs [`collect`](Gc::collect)
    /// when the configured interval has elapsed. Disabled when the interval
    /// is ≤ 0.
    pub fn tick(&mut self, dt: f64) {
        self.accumulated += dt;
        if self.config.auto_interval_secs > 0.0 && self.accumulated >= self.config.auto_interval_secs
        {
            self.collect(false);
            self.accumulated = 0.0;
        }
    }

    /// Mutable object-table access for the mutator side (harness and
    /// application code writing fields between collections). Taking `&mut
    /// self` means no mutation can overlap a running collection.
    pub fn table_mut(&mut self) -> &mut ObjectTable {
        &mut self.table
    }

    pub(crate) fn registry_handle(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quartz_meta::{downcast_mut, downcast_ref, Property, TypeDesc};
    use std::any::Any;

    #[derive(Default)]
    struct Cell {
        next: Option<Handle>,
    }

    impl GcObject for Cell {
        fn type_name(&self) -> &'static str {
            "Cell"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn new_gc() -> Gc {
        let mut reg = TypeRegistry::new();
        reg.register(
            TypeDesc::new("Cell", std::mem::size_of::<Cell>()).with_property(Property::handle(
                "next",
                "Cell",
                std::mem::offset_of!(Cell, next),
                |o| downcast_ref::<Cell>(o)?.next,
                |o, v| {
                    if let Some(c) = downcast_mut::<Cell>(o) {
                        c.next = v;
                    }
                },
            )),
        )
        .unwrap();
        reg.link_bases().unwrap();

        let mut gc = Gc::new(Arc::new(reg), GcConfig::single_threaded());
        gc.register_factory("Cell", || Box::new(Cell::default()))
            .unwrap();
        gc
    }

    fn link(gc: &mut Gc, from: Handle, to: Handle) {
        let node = gc.table_mut().get_mut(from).unwrap();
        downcast_mut::<Cell>(node.object_mut()).unwrap().next = Some(to);
    }

    #[test]
    fn test_new_object_identity_conventions() {
        let mut gc = new_gc();
        let a = gc.new_object_by_name("Cell").unwrap();
        let b = gc.new_object_by_name("Cell").unwrap();

        assert_eq!(a.raw(), 1);
        assert_eq!(b.raw(), 2);
        assert_eq!(gc.table().get(a).unwrap().debug_name(), "Cell_1");
        assert_eq!(gc.table().get(b).unwrap().debug_name(), "Cell_2");
        assert_eq!(gc.find_by_name("Cell_2"), Some(b));
    }

    #[test]
    fn test_unknown_type_errors() {
        let mut gc = new_gc();
        assert!(matches!(
            gc.new_object_by_name("Ghost"),
            Err(GcError::UnknownType(_))
        ));
        assert!(matches!(
            gc.register_factory("Ghost", || Box::new(Cell::default())),
            Err(GcError::UnknownType(_))
        ));
    }

    #[test]
    fn test_collect_reclaims_unrooted() {
        let mut gc = new_gc();
        let a = gc.new_object_by_name("Cell").unwrap();
        let b = gc.new_object_by_name("Cell").unwrap();
        let c = gc.new_object_by_name("Cell").unwrap();
        link(&mut gc, a, b);
        gc.add_root(a);

        gc.collect(true);
        assert!(gc.table().contains(a));
        assert!(gc.table().contains(b));
        assert!(!gc.table().contains(c));
        assert_eq!(gc.live_objects(), 2);
    }

    #[test]
    fn test_epoch_monotonic_across_collections() {
        let mut gc = new_gc();
        let before = gc.epoch();
        gc.collect(true);
        gc.collect(true);
        assert_eq!(gc.epoch(), before + 2);
    }

    #[test]
    fn test_add_root_rejects_unmanaged() {
        let mut gc = new_gc();
        assert!(!gc.add_root(Handle::from_raw(404)));
        let a = gc.new_object_by_name("Cell").unwrap();
        assert!(gc.add_root(a));
        assert!(!gc.add_root(a));
    }

    #[test]
    fn test_tick_drives_auto_collect() {
        let mut gc = new_gc();
        gc.set_auto_interval(1.0);
        let _ = gc.new_object_by_name("Cell").unwrap();

        gc.tick(0.5);
        assert_eq!(gc.live_objects(), 1);

        // Crossing the interval collects; the unrooted cell disappears.
        gc.tick(0.6);
        assert_eq!(gc.live_objects(), 0);

        // Disabled interval never collects.
        gc.set_auto_interval(0.0);
        let _ = gc.new_object_by_name("Cell").unwrap();
        gc.tick(100.0);
        assert_eq!(gc.live_objects(), 1);
    }
}
