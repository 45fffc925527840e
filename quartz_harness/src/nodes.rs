//! Builtin reflected node types.
//!
//! Two types cover every field shape the collector traces: a base type with
//! an inherited direct slot and an inherited sequence (so parent traversal
//! and parents-only assignment have something to find), and a derived test
//! node with scalars, five direct slots, and a child sequence.

use quartz_gc::{FactoryFn, Gc, GcError};
use quartz_meta::{
    downcast_mut, downcast_ref, GcObject, Handle, Method, Param, Property, RegistryError,
    TypeDesc, TypeRegistry, Variant,
};
use std::any::Any;
use std::mem::{offset_of, size_of};

// =============================================================================
// NodeBase
// =============================================================================

/// Base of every harness node. Its pointer fields only become reachable
/// through parent traversal, which is exactly what they exist to exercise.
#[derive(Default)]
pub struct NodeBase {
    /// Scalar, opaque to the collector.
    pub tag: i64,
    /// Inherited direct slot.
    pub origin: Option<Handle>,
    /// Inherited sequence slot.
    pub annex: Vec<Handle>,
}

impl GcObject for NodeBase {
    fn type_name(&self) -> &'static str {
        "NodeBase"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn annex_get(o: &dyn GcObject) -> Option<&[Handle]> {
    Some(downcast_ref::<NodeBase>(o)?.annex.as_slice())
}

fn annex_get_mut(o: &mut dyn GcObject) -> Option<&mut Vec<Handle>> {
    Some(&mut downcast_mut::<NodeBase>(o)?.annex)
}

const SET_TAG_PARAMS: &[Param] = &[Param {
    name: "tag",
    type_name: "i64",
}];

fn node_base_desc() -> TypeDesc {
    TypeDesc::new("NodeBase", size_of::<NodeBase>())
        .with_property(Property::scalar(
            "tag",
            "i64",
            offset_of!(NodeBase, tag),
            |o| match downcast_ref::<NodeBase>(o) {
                Some(n) => Variant::Int(n.tag),
                None => Variant::Empty,
            },
            |o, v| match (downcast_mut::<NodeBase>(o), v.as_i64()) {
                (Some(n), Ok(value)) => {
                    n.tag = value;
                    true
                }
                _ => false,
            },
        ))
        .with_property(Property::handle(
            "origin",
            "NodeBase",
            offset_of!(NodeBase, origin),
            |o| downcast_ref::<NodeBase>(o)?.origin,
            |o, v| {
                if let Some(n) = downcast_mut::<NodeBase>(o) {
                    n.origin = v;
                }
            },
        ))
        .with_property(Property::handle_seq(
            "annex",
            "NodeBase",
            offset_of!(NodeBase, annex),
            annex_get,
            annex_get_mut,
        ))
        .with_method(Method::new("set_tag", "()", SET_TAG_PARAMS, |o, args| {
            if let Some(n) = downcast_mut::<NodeBase>(o) {
                n.tag = args[0].as_i64().map_err(|cause| {
                    quartz_meta::CallError::BadArgument { index: 0, cause }
                })?;
            }
            Ok(Variant::Empty)
        }))
}

// =============================================================================
// TestNode
// =============================================================================

/// The workhorse node: five direct slots plus a child sequence, enough
/// fan-out for every graph pattern without touching inherited fields.
#[derive(Default)]
pub struct TestNode {
    /// Embedded base part.
    pub base: NodeBase,
    /// Scalar, opaque to the collector.
    pub value: i64,
    /// String, opaque to the collector.
    pub label: String,
    /// Direct slot 1.
    pub friend1: Option<Handle>,
    /// Direct slot 2.
    pub friend2: Option<Handle>,
    /// Direct slot 3.
    pub friend3: Option<Handle>,
    /// Direct slot 4.
    pub friend4: Option<Handle>,
    /// Direct slot 5.
    pub friend5: Option<Handle>,
    /// Child sequence.
    pub children: Vec<Handle>,
}

impl GcObject for TestNode {
    fn type_name(&self) -> &'static str {
        "TestNode"
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
    fn base(&self) -> Option<&dyn GcObject> {
        Some(&self.base)
    }
    fn base_mut(&mut self) -> Option<&mut dyn GcObject> {
        Some(&mut self.base)
    }
}

fn children_get(o: &dyn GcObject) -> Option<&[Handle]> {
    Some(downcast_ref::<TestNode>(o)?.children.as_slice())
}

fn children_get_mut(o: &mut dyn GcObject) -> Option<&mut Vec<Handle>> {
    Some(&mut downcast_mut::<TestNode>(o)?.children)
}

macro_rules! friend_property {
    ($name:literal, $field:ident) => {
        Property::handle(
            $name,
            "TestNode",
            offset_of!(TestNode, $field),
            |o| downcast_ref::<TestNode>(o)?.$field,
            |o, v| {
                if let Some(n) = downcast_mut::<TestNode>(o) {
                    n.$field = v;
                }
            },
        )
    };
}

const SET_VALUE_PARAMS: &[Param] = &[Param {
    name: "value",
    type_name: "i64",
}];

fn test_node_desc() -> TypeDesc {
    TypeDesc::new("TestNode", size_of::<TestNode>())
        .with_base("NodeBase")
        .with_property(Property::scalar(
            "value",
            "i64",
            offset_of!(TestNode, value),
            |o| match downcast_ref::<TestNode>(o) {
                Some(n) => Variant::Int(n.value),
                None => Variant::Empty,
            },
            |o, v| match (downcast_mut::<TestNode>(o), v.as_i64()) {
                (Some(n), Ok(value)) => {
                    n.value = value;
                    true
                }
                _ => false,
            },
        ))
        .with_property(Property::string(
            "label",
            offset_of!(TestNode, label),
            |o| match downcast_ref::<TestNode>(o) {
                Some(n) => Variant::Str(n.label.clone()),
                None => Variant::Empty,
            },
            |o, v| match (downcast_mut::<TestNode>(o), v.as_str()) {
                (Some(n), Ok(value)) => {
                    n.label = value.to_owned();
                    true
                }
                _ => false,
            },
        ))
        .with_property(friend_property!("friend1", friend1))
        .with_property(friend_property!("friend2", friend2))
        .with_property(friend_property!("friend3", friend3))
        .with_property(friend_property!("friend4", friend4))
        .with_property(friend_property!("friend5", friend5))
        .with_property(Property::handle_seq(
            "children",
            "TestNode",
            offset_of!(TestNode, children),
            children_get,
            children_get_mut,
        ))
        .with_method(Method::new(
            "set_value",
            "()",
            SET_VALUE_PARAMS,
            |o, args| {
                if let Some(n) = downcast_mut::<TestNode>(o) {
                    n.value = args[0].as_i64().map_err(|cause| {
                        quartz_meta::CallError::BadArgument { index: 0, cause }
                    })?;
                }
                Ok(Variant::Empty)
            },
        ))
        .with_method(Method::new("clear_children", "()", &[], |o, _| {
            if let Some(n) = downcast_mut::<TestNode>(o) {
                n.children.clear();
            }
            Ok(Variant::Empty)
        }))
        .with_method(Method::new("child_count", "u64", &[], |o, _| {
            match downcast_ref_obj(o) {
                Some(n) => Ok(Variant::UInt(n.children.len() as u64)),
                None => Ok(Variant::UInt(0)),
            }
        }))
}

// Invoker trampolines get `&mut dyn GcObject`; reads still go through the
// shared reference path.
fn downcast_ref_obj(o: &mut dyn GcObject) -> Option<&TestNode> {
    o.as_any().downcast_ref::<TestNode>()
}

// =============================================================================
// Registration
// =============================================================================

/// Register the builtin node descriptors. Call [`TypeRegistry::link_bases`]
/// afterwards.
pub fn register_builtin_types(registry: &mut TypeRegistry) -> Result<(), RegistryError> {
    registry.register(node_base_desc())?;
    registry.register(test_node_desc())?;
    Ok(())
}

/// Install constructors for the instantiable builtin types.
pub fn register_factories(gc: &mut Gc) -> Result<(), GcError> {
    let make_test_node: FactoryFn = || Box::new(TestNode::default());
    gc.register_factory("TestNode", make_test_node)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linked_registry() -> TypeRegistry {
        let mut reg = TypeRegistry::new();
        register_builtin_types(&mut reg).unwrap();
        reg.link_bases().unwrap();
        reg
    }

    #[test]
    fn test_effective_field_set_spans_chain() {
        let reg = linked_registry();
        let test_node = reg.lookup("TestNode").unwrap();

        let mut traced = Vec::new();
        reg.for_each_property(test_node, true, |depth, p| {
            if p.is_traced() {
                traced.push((depth, p.name));
            }
        });
        assert_eq!(
            traced,
            vec![
                (1, "origin"),
                (1, "annex"),
                (0, "friend1"),
                (0, "friend2"),
                (0, "friend3"),
                (0, "friend4"),
                (0, "friend5"),
                (0, "children"),
            ]
        );
    }

    #[test]
    fn test_inherited_accessors_project() {
        let reg = linked_registry();
        let test_node = reg.lookup("TestNode").unwrap();

        let mut node = TestNode::default();
        node.base.origin = Some(Handle::from_raw(5));

        let (depth, prop) = reg.find_property(test_node, "origin").unwrap();
        assert_eq!(depth, 1);

        let projected = quartz_meta::project(&node, depth).unwrap();
        match prop.access {
            quartz_meta::PropertyAccess::Handle { get, .. } => {
                assert_eq!(get(projected), Some(Handle::from_raw(5)));
            }
            _ => panic!("origin must be a direct slot"),
        }
    }

    #[test]
    fn test_assignability_through_base() {
        let reg = linked_registry();
        let test_node = reg.lookup("TestNode").unwrap();

        // A TestNode may sit in a NodeBase-typed slot, not the reverse.
        assert!(reg.assignable("NodeBase", test_node));
        assert!(reg.assignable("TestNode", test_node));
        let base = reg.lookup("NodeBase").unwrap();
        assert!(!reg.assignable("TestNode", base));
    }
}
