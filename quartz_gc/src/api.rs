//! Reflection query and string-based mutation surface.
//!
//! These operations serve the harness and the (external) console. They
//! return structured errors and never leak partial state; none of them can
//! abort a collection, because the mutator is quiescent whenever one runs.

use crate::error::GcError;
use crate::gc::Gc;
use quartz_meta::{
    project, project_mut, CallError, Handle, Property, PropertyAccess, PropertyKind, TypeDesc,
    TypeId, Variant,
};
use std::fmt::Write as _;

impl Gc {
    // =========================================================================
    // Queries
    // =========================================================================

    /// Resolve a display name to a handle. Lossy on duplicate names.
    pub fn find_by_name(&self, display_name: &str) -> Option<Handle> {
        self.table().find_by_name(display_name)
    }

    /// The type descriptor of a managed object.
    pub fn type_of(&self, handle: Handle) -> Option<&TypeDesc> {
        let type_id = self.type_id_of(handle)?;
        Some(self.registry().get(type_id))
    }

    /// The registry id of a managed object's type.
    pub fn type_id_of(&self, handle: Handle) -> Option<TypeId> {
        Some(self.table().get(handle)?.type_id())
    }

    /// Whether a handle is currently in the object table.
    #[inline]
    pub fn is_managed(&self, handle: Handle) -> bool {
        self.table().contains(handle)
    }

    /// The in-table children of an object, honoring the configured parent
    /// traversal mode. Entries that do not resolve in the table are skipped,
    /// exactly as the mark phase skips them.
    pub fn children_of(&self, handle: Handle) -> Vec<Handle> {
        let mut out = Vec::new();
        let Some(node) = self.table().get(handle) else {
            return out;
        };
        let obj = node.object();
        let layout = node.layout();
        let with_parents = self.traverse_parents();

        for slot in layout.direct(with_parents) {
            if let Some(child) = slot.read(obj) {
                if self.table().contains(child) {
                    out.push(child);
                }
            }
        }
        for seq in layout.seqs(with_parents) {
            if let Some(entries) = seq.read(obj) {
                for &child in entries {
                    if self.table().contains(child) {
                        out.push(child);
                    }
                }
            }
        }
        out
    }

    /// Read a property as a [`Variant`], walking the inheritance chain.
    ///
    /// Direct slots read as [`Variant::Ref`] (or [`Variant::Empty`] when
    /// null); sequence slots read as their length.
    pub fn get_property(&self, handle: Handle, name: &str) -> Result<Variant, GcError> {
        let node = self.table().get(handle).ok_or(GcError::NotGcManaged)?;
        let (depth, property) = self
            .registry()
            .find_property(node.type_id(), name)
            .ok_or_else(|| GcError::not_found("property", name))?;

        let target = project(node.object(), depth).ok_or(GcError::NotGcManaged)?;
        match property.access {
            PropertyAccess::Scalar { load, .. } => Ok(load(target)),
            PropertyAccess::Handle { get, .. } => Ok(match get(target) {
                Some(h) => Variant::Ref(h),
                None => Variant::Empty,
            }),
            PropertyAccess::HandleSeq { get, .. } => {
                let len = get(target).map(|s| s.len()).unwrap_or(0);
                Ok(Variant::UInt(len as u64))
            }
        }
    }

    /// Snapshot the contents of a sequence property.
    pub fn sequence_of(&self, handle: Handle, name: &str) -> Result<Vec<Handle>, GcError> {
        let node = self.table().get(handle).ok_or(GcError::NotGcManaged)?;
        let (depth, property) = self
            .registry()
            .find_property(node.type_id(), name)
            .ok_or_else(|| GcError::not_found("property", name))?;

        match property.access {
            PropertyAccess::HandleSeq { get, .. } => {
                let target = project(node.object(), depth).ok_or(GcError::NotGcManaged)?;
                Ok(get(target).map(|s| s.to_vec()).unwrap_or_default())
            }
            _ => Err(GcError::not_found("sequence property", name)),
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Coerce a string to a property's declared type and store it.
    ///
    /// Only scalar and string primitives coerce; pointer properties fail
    /// with `CoercionFailed`.
    pub fn set_property_by_string(
        &mut self,
        handle: Handle,
        name: &str,
        value: &str,
    ) -> Result<(), GcError> {
        let registry = std::sync::Arc::clone(self.registry_handle());
        let node = self.table_mut().get_mut(handle).ok_or(GcError::NotGcManaged)?;
        let (depth, property) = registry
            .find_property(node.type_id(), name)
            .ok_or_else(|| GcError::not_found("property", name))?;

        let coerced = coerce_scalar(property, value).ok_or_else(|| GcError::CoercionFailed {
            property: name.to_owned(),
            type_name: property.type_name,
            value: value.to_owned(),
        })?;

        match property.access {
            PropertyAccess::Scalar { store, .. } => {
                let target =
                    project_mut(node.object_mut(), depth).ok_or(GcError::NotGcManaged)?;
                if store(target, &coerced) {
                    Ok(())
                } else {
                    Err(GcError::CoercionFailed {
                        property: name.to_owned(),
                        type_name: property.type_name,
                        value: value.to_owned(),
                    })
                }
            }
            _ => Err(GcError::CoercionFailed {
                property: name.to_owned(),
                type_name: property.type_name,
                value: value.to_owned(),
            }),
        }
    }

    /// Clear a pointer property: direct slots become null, sequences are
    /// emptied.
    pub fn unlink(&mut self, handle: Handle, name: &str) -> Result<(), GcError> {
        let registry = std::sync::Arc::clone(self.registry_handle());
        let node = self.table_mut().get_mut(handle).ok_or(GcError::NotGcManaged)?;
        let (depth, property) = registry
            .find_property(node.type_id(), name)
            .ok_or_else(|| GcError::not_found("property", name))?;

        match property.access {
            PropertyAccess::Handle { set, .. } => {
                let target =
                    project_mut(node.object_mut(), depth).ok_or(GcError::NotGcManaged)?;
                set(target, None);
                Ok(())
            }
            PropertyAccess::HandleSeq { get_mut, .. } => {
                let target =
                    project_mut(node.object_mut(), depth).ok_or(GcError::NotGcManaged)?;
                if let Some(entries) = get_mut(target) {
                    entries.clear();
                }
                Ok(())
            }
            PropertyAccess::Scalar { .. } => Err(GcError::not_found("pointer property", name)),
        }
    }

    /// Clear every pointer property of an object (inherited fields
    /// included). Returns the number of slots cleared.
    pub fn unlink_all(&mut self, handle: Handle) -> Result<usize, GcError> {
        let node = self.table_mut().get_mut(handle).ok_or(GcError::NotGcManaged)?;
        let layout = std::sync::Arc::clone(node.layout());
        let obj = node.object_mut();

        let mut cleared = 0;
        for slot in layout.direct(true) {
            if slot.read(obj).is_some() {
                slot.write(obj, None);
                cleared += 1;
            }
        }
        for seq in layout.seqs(true) {
            if let Some(entries) = seq.read_mut(obj) {
                if !entries.is_empty() {
                    entries.clear();
                    cleared += 1;
                }
            }
        }
        Ok(cleared)
    }

    /// Invoke a reflected method by name, walking the chain most-base-first.
    pub fn call(
        &mut self,
        handle: Handle,
        method_name: &str,
        args: &[Variant],
    ) -> Result<Variant, GcError> {
        let registry = std::sync::Arc::clone(self.registry_handle());
        let node = self.table_mut().get_mut(handle).ok_or(GcError::NotGcManaged)?;
        let type_name = registry.get(node.type_id()).name;

        let (depth, method) = registry
            .find_method(node.type_id(), method_name)
            .ok_or_else(|| {
                GcError::Call(CallError::NotFound {
                    type_name: type_name.to_owned(),
                    method: method_name.to_owned(),
                })
            })?;

        if args.len() != method.params.len() {
            return Err(GcError::Call(CallError::ArityMismatch {
                expected: method.params.len(),
                got: args.len(),
            }));
        }

        let target = project_mut(node.object_mut(), depth).ok_or(GcError::NotGcManaged)?;
        Ok((method.invoker)(target, args)?)
    }

    // =========================================================================
    // Debug formatting (printed by the external console)
    // =========================================================================

    /// Live objects grouped by type: descending count, then type name, with
    /// up to three display-name samples per type in id order.
    pub fn describe_objects(&self) -> String {
        const MAX_SAMPLES: usize = 3;

        let mut groups: rustc_hash::FxHashMap<&str, Vec<(u64, &str)>> =
            rustc_hash::FxHashMap::default();
        for (_, node) in self.table().iter() {
            let type_name = self.registry().get(node.type_id()).name;
            groups
                .entry(type_name)
                .or_default()
                .push((node.id(), node.debug_name()));
        }

        let mut ordered: Vec<(&str, Vec<(u64, &str)>)> = groups.into_iter().collect();
        ordered.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then(a.0.cmp(b.0)));

        let mut out = String::new();
        let _ = writeln!(
            out,
            "[objects] total={}, types={}",
            self.table().len(),
            ordered.len()
        );
        for (type_name, mut members) in ordered {
            members.sort_by_key(|(id, _)| *id);
            let mut samples = String::from("[");
            for (i, (_, name)) in members.iter().take(MAX_SAMPLES).enumerate() {
                if i > 0 {
                    samples.push_str(", ");
                }
                samples.push_str(if name.is_empty() { "(unnamed)" } else { name });
            }
            if members.len() > MAX_SAMPLES {
                samples.push_str(", ...");
            }
            samples.push(']');
            let _ = writeln!(
                out,
                " - {} (count={}) {}",
                type_name,
                members.len(),
                samples
            );
        }
        out
    }

    /// Property listing of one object, inherited fields first.
    pub fn describe_properties(&self, handle: Handle) -> Result<String, GcError> {
        let node = self.table().get(handle).ok_or(GcError::NotGcManaged)?;
        let desc = self.registry().get(node.type_id());

        let mut out = String::new();
        let _ = writeln!(out, "[properties] {} : {}", node.debug_name(), desc.name);
        self.registry()
            .for_each_property(node.type_id(), true, |_, p| {
                let _ = writeln!(out, " - {} {} (offset {})", p.type_name, p.name, p.offset);
            });
        Ok(out)
    }

    /// Method listing of one object, inherited methods first.
    pub fn describe_methods(&self, handle: Handle) -> Result<String, GcError> {
        let node = self.table().get(handle).ok_or(GcError::NotGcManaged)?;
        let desc = self.registry().get(node.type_id());

        let mut out = String::new();
        let _ = writeln!(out, "[methods] {} : {}", node.debug_name(), desc.name);
        let chain = self.registry().ancestry(node.type_id());
        for ty in chain {
            for m in &self.registry().get(ty).methods {
                let params: Vec<String> = m
                    .params
                    .iter()
                    .map(|p| format!("{} {}", p.type_name, p.name))
                    .collect();
                let _ = writeln!(
                    out,
                    " - {} {}({})",
                    m.return_type,
                    m.name,
                    params.join(", ")
                );
            }
        }
        Ok(out)
    }
}

/// Parse a string per the declared type of a scalar/string property.
fn coerce_scalar(property: &Property, value: &str) -> Option<Variant> {
    if property.kind.contains(PropertyKind::STRING) {
        return Some(Variant::Str(value.to_owned()));
    }
    if !property.kind.contains(PropertyKind::SCALAR) {
        return None;
    }
    let trimmed = value.trim();
    match property.type_name {
        "i8" | "i16" | "i32" | "i64" | "isize" | "int" => {
            trimmed.parse::<i64>().ok().map(Variant::Int)
        }
        "u8" | "u16" | "u32" | "u64" | "usize" | "uint" => {
            trimmed.parse::<u64>().ok().map(Variant::UInt)
        }
        "f32" | "f64" | "float" | "double" => trimmed.parse::<f64>().ok().map(Variant::Float),
        "bool" => match trimmed {
            "true" | "1" => Some(Variant::Bool(true)),
            "false" | "0" => Some(Variant::Bool(false)),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GcConfig;
    use quartz_meta::{downcast_mut, downcast_ref, GcObject, Method, TypeDesc, TypeRegistry};
    use std::any::Any;
    use std::sync::Arc;

    #[derive(Default)]
    struct Widget {
        count: i64,
        title: String,
        peer: Option<Handle>,
        parts: Vec<Handle>,
    }

    impl GcObject for Widget {
        fn type_name(&self) -> &'static str {
            "Widget"
        }
        fn as_any(&self) -> &dyn Any {
            self
        }
        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn parts_get(o: &dyn GcObject) -> Option<&[Handle]> {
        Some(downcast_ref::<Widget>(o)?.parts.as_slice())
    }

    fn parts_get_mut(o: &mut dyn GcObject) -> Option<&mut Vec<Handle>> {
        Some(&mut downcast_mut::<Widget>(o)?.parts)
    }

    fn widget_desc() -> TypeDesc {
        use quartz_meta::Property;
        TypeDesc::new("Widget", std::mem::size_of::<Widget>())
            .with_property(Property::scalar(
                "count",
                "i64",
                std::mem::offset_of!(Widget, count),
                |o| match downcast_ref::<Widget>(o) {
                    Some(w) => Variant::Int(w.count),
                    None => Variant::Empty,
                },
                |o, v| match (downcast_mut::<Widget>(o), v.as_i64()) {
                    (Some(w), Ok(value)) => {
                        w.count = value;
                        true
                    }
                    _ => false,
                },
            ))
            .with_property(Property::string(
                "title",
                std::mem::offset_of!(Widget, title),
                |o| match downcast_ref::<Widget>(o) {
                    Some(w) => Variant::Str(w.title.clone()),
                    None => Variant::Empty,
                },
                |o, v| match (downcast_mut::<Widget>(o), v.as_str()) {
                    (Some(w), Ok(value)) => {
                        w.title = value.to_owned();
                        true
                    }
                    _ => false,
                },
            ))
            .with_property(Property::handle(
                "peer",
                "Widget",
                std::mem::offset_of!(Widget, peer),
                |o| downcast_ref::<Widget>(o)?.peer,
                |o, v| {
                    if let Some(w) = downcast_mut::<Widget>(o) {
                        w.peer = v;
                    }
                },
            ))
            .with_property(Property::handle_seq(
                "parts",
                "Widget",
                std::mem::offset_of!(Widget, parts),
                parts_get,
                parts_get_mut,
            ))
            .with_method(Method::new("bump", "i64", &[], |o, _args| {
                match downcast_mut::<Widget>(o) {
                    Some(w) => {
                        w.count += 1;
                        Ok(Variant::Int(w.count))
                    }
                    None => Ok(Variant::Empty),
                }
            }))
    }

    fn new_gc() -> Gc {
        let mut reg = TypeRegistry::new();
        reg.register(widget_desc()).unwrap();
        reg.link_bases().unwrap();
        let mut gc = Gc::new(Arc::new(reg), GcConfig::single_threaded());
        gc.register_factory("Widget", || Box::new(Widget::default()))
            .unwrap();
        gc
    }

    #[test]
    fn test_set_property_by_string_coercions() {
        let mut gc = new_gc();
        let w = gc.new_object_by_name("Widget").unwrap();

        gc.set_property_by_string(w, "count", "41").unwrap();
        assert_eq!(gc.get_property(w, "count").unwrap(), Variant::Int(41));

        gc.set_property_by_string(w, "title", "hello").unwrap();
        assert_eq!(
            gc.get_property(w, "title").unwrap(),
            Variant::Str("hello".into())
        );

        let err = gc.set_property_by_string(w, "count", "nope").unwrap_err();
        assert!(matches!(err, GcError::CoercionFailed { .. }));

        let err = gc.set_property_by_string(w, "peer", "Widget_1").unwrap_err();
        assert!(matches!(err, GcError::CoercionFailed { .. }));

        let err = gc.set_property_by_string(w, "ghost", "1").unwrap_err();
        assert!(matches!(err, GcError::NotFound { .. }));
    }

    #[test]
    fn test_unlink_clears_slots() {
        let mut gc = new_gc();
        let a = gc.new_object_by_name("Widget").unwrap();
        let b = gc.new_object_by_name("Widget").unwrap();

        {
            let node = gc.table_mut().get_mut(a).unwrap();
            let w = downcast_mut::<Widget>(node.object_mut()).unwrap();
            w.peer = Some(b);
            w.parts.push(b);
        }

        gc.unlink(a, "peer").unwrap();
        assert_eq!(gc.get_property(a, "peer").unwrap(), Variant::Empty);

        gc.unlink(a, "parts").unwrap();
        assert!(gc.sequence_of(a, "parts").unwrap().is_empty());

        assert!(gc.unlink(a, "count").is_err());
    }

    #[test]
    fn test_unlink_all_counts_cleared_slots() {
        let mut gc = new_gc();
        let a = gc.new_object_by_name("Widget").unwrap();
        let b = gc.new_object_by_name("Widget").unwrap();

        {
            let node = gc.table_mut().get_mut(a).unwrap();
            let w = downcast_mut::<Widget>(node.object_mut()).unwrap();
            w.peer = Some(b);
            w.parts.push(b);
            w.parts.push(b);
        }

        assert_eq!(gc.unlink_all(a).unwrap(), 2);
        assert_eq!(gc.children_of(a).len(), 0);
    }

    #[test]
    fn test_call_by_name() {
        let mut gc = new_gc();
        let w = gc.new_object_by_name("Widget").unwrap();

        assert_eq!(gc.call(w, "bump", &[]).unwrap(), Variant::Int(1));
        assert_eq!(gc.call(w, "bump", &[]).unwrap(), Variant::Int(2));

        let err = gc.call(w, "bump", &[Variant::Int(1)]).unwrap_err();
        assert!(matches!(
            err,
            GcError::Call(CallError::ArityMismatch { expected: 0, got: 1 })
        ));

        let err = gc.call(w, "missing", &[]).unwrap_err();
        assert!(matches!(err, GcError::Call(CallError::NotFound { .. })));
    }

    #[test]
    fn test_describe_objects_groups_and_samples() {
        let mut gc = new_gc();
        for _ in 0..5 {
            gc.new_object_by_name("Widget").unwrap();
        }
        let listing = gc.describe_objects();
        assert!(listing.contains("total=5, types=1"));
        assert!(listing.contains("Widget (count=5)"));
        assert!(listing.contains("Widget_1, Widget_2, Widget_3, ..."));
    }
}
