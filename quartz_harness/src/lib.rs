//! Graph-mutation harness for the quartz collector.
//!
//! The harness drives the collector through reflection only: it knows no
//! concrete node type beyond registering the builtin ones at startup. A
//! small factory maps type names to constructors; graph builders create
//! nodes through it and wire pointer fields via descriptor lookups, so every
//! code path the collector depends on is exercised the same way application
//! code would.
//!
//! Everything is deterministic: each operation takes a seed, and identical
//! seeds and parameters produce structurally identical graphs.

pub mod churn;
pub mod factory;
pub mod mutate;
pub mod nodes;
pub mod tester;

pub use churn::GcMeasurement;
pub use factory::NodeFactory;
pub use nodes::{register_builtin_types, NodeBase, TestNode};
pub use tester::{AssignMode, DepthStats, EdgeRef, GraphTester};

use quartz_gc::{Gc, GcConfig};
use quartz_meta::TypeRegistry;
use std::sync::Arc;

/// Build a ready-to-use tester: builtin node types registered and linked,
/// factories installed, pool set to `TestNode`.
pub fn standard_tester(config: GcConfig) -> GraphTester {
    let mut registry = TypeRegistry::new();
    register_builtin_types(&mut registry).expect("builtin type registration");
    registry.link_bases().expect("builtin base linking");

    let mut gc = Gc::new(Arc::new(registry), config);
    nodes::register_factories(&mut gc).expect("builtin factory registration");

    GraphTester::new(gc)
}
