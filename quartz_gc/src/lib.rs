//! Reflection-driven tracing garbage collector.
//!
//! The collector manages a small in-process object graph. Application types
//! describe their pointer fields through the `quartz_meta` reflection
//! registry; the collector traces reachability from an explicit root set,
//! repairs the references of survivors, and destroys everything else.
//!
//! # Architecture
//!
//! - **Object table** ([`ObjectTable`]): owns every managed object, keyed by
//!   [`Handle`], with a per-node mark epoch and a cached pointer layout.
//! - **Pointer-layout cache** ([`LayoutCache`]): per-type offset-free edge
//!   lists (direct slots and sequence slots) accumulated over the
//!   inheritance chain; built once, handed out as stable `Arc`s.
//! - **Root set** ([`RootSet`]): insertion-ordered handles that are live
//!   unconditionally.
//! - **Collector** ([`Gc::collect`]): epoch bump → mark (sequential DFS or
//!   parallel BFS waves) → dead-set build → survivor fixup → sweep.
//!
//! # Contract with the mutator
//!
//! `collect` is stop-the-world: the mutator must be quiescent for its
//! duration. No external holder may retain handles across a `collect` call
//! except through the root set or through live objects' reflected fields.
//!
//! # Usage
//!
//! ```ignore
//! let mut registry = TypeRegistry::new();
//! register_my_types(&mut registry)?;
//! registry.link_bases()?;
//!
//! let mut gc = Gc::new(Arc::new(registry), GcConfig::default());
//! gc.register_factory("MyNode", || Box::new(MyNode::default()))?;
//!
//! let root = gc.new_object_by_name("MyNode")?;
//! gc.add_root(root);
//! gc.collect(false);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod gc;
pub mod layout;
pub mod object_table;
pub mod roots;
pub mod stats;

mod api;
mod collector;

pub use config::{ConfigError, GcConfig};
pub use error::GcError;
pub use gc::{FactoryFn, Gc};
pub use layout::{LayoutCache, PointerLayout};
pub use object_table::{Node, ObjectTable};
pub use roots::RootSet;
pub use stats::{GcStats, GcTimings};

// The handle/object vocabulary is `quartz_meta`'s; re-export the pieces
// callers need so they rarely have to depend on both crates.
pub use quartz_meta::{GcObject, Handle, Variant};
