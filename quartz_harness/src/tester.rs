//! The graph tester: deterministic builders over reflection-only access.

use crate::factory::NodeFactory;
use quartz_gc::Gc;
use quartz_meta::{project, project_mut, Handle, Property, PropertyAccess, TypeId};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;

/// Which side of the inheritance chain the harness assigns into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignMode {
    /// Only the most-derived type's own fields.
    OwnOnly,
    /// Only inherited fields.
    ParentsOnly,
    /// If both sides have assignable slots, pick uniformly; otherwise
    /// whichever has any.
    Random,
}

/// One reachable edge, addressable for removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EdgeRef {
    /// Owning object.
    pub parent: Handle,
    /// Target object.
    pub child: Handle,
    /// Declaring property.
    pub property: &'static str,
    /// Position within a sequence slot; `None` for direct slots.
    pub index: Option<usize>,
}

/// Summary of one BFS depth layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStats {
    /// Nodes at this depth.
    pub nodes: usize,
    /// Minimum child count.
    pub min_children: usize,
    /// Maximum child count.
    pub max_children: usize,
    /// Mean child count.
    pub avg_children: f64,
}

/// Drives the collector through reflection only: no concrete node type
/// appears anywhere in the graph logic.
pub struct GraphTester {
    gc: Gc,
    factory: NodeFactory,
    assign_mode: AssignMode,
    prefer_sequence: bool,
    all_nodes: Vec<Handle>,
    depth_layers: Vec<Vec<Handle>>,
}

impl GraphTester {
    /// Wrap a collector. The factory pool starts with every type the
    /// collector can construct a `TestNode` for; callers can reconfigure it
    /// through [`factory_mut`](GraphTester::factory_mut).
    pub fn new(gc: Gc) -> Self {
        let mut factory = NodeFactory::new();
        factory.set_pool(&gc, &["TestNode"]);
        Self {
            gc,
            factory,
            assign_mode: AssignMode::OwnOnly,
            prefer_sequence: true,
            all_nodes: Vec::new(),
            depth_layers: Vec::new(),
        }
    }

    // =========================================================================
    // Accessors and configuration
    // =========================================================================

    /// The wrapped collector.
    pub fn gc(&self) -> &Gc {
        &self.gc
    }

    /// Mutable access to the wrapped collector.
    pub fn gc_mut(&mut self) -> &mut Gc {
        &mut self.gc
    }

    /// The node factory.
    pub fn factory_mut(&mut self) -> &mut NodeFactory {
        &mut self.factory
    }

    /// Handles of every node created through the factory, in creation
    /// order. May contain stale handles after a collection.
    pub fn all_nodes(&self) -> &[Handle] {
        &self.all_nodes
    }

    /// BFS layers from the root set, as of the last
    /// [`build_layers`](GraphTester::build_layers).
    pub fn depth_layers(&self) -> &[Vec<Handle>] {
        &self.depth_layers
    }

    /// Select the assignment side policy.
    pub fn set_assign_mode(&mut self, mode: AssignMode) {
        self.assign_mode = mode;
    }

    /// Whether sequence slots are attempted before direct slots.
    pub fn set_prefer_sequence(&mut self, prefer: bool) {
        self.prefer_sequence = prefer;
    }

    // =========================================================================
    // Node creation and linking
    // =========================================================================

    /// Create one node through the factory rotation.
    pub fn make_node(&mut self) -> Option<Handle> {
        let handle = self.factory.create_round_robin(&mut self.gc)?;
        self.all_nodes.push(handle);
        Some(handle)
    }

    /// Link `parent -> child` into the first assignable slot under the
    /// current policy. Returns whether a slot was found.
    ///
    /// Assignability: the slot's declared element type must be the child's
    /// type or an ancestor of it; direct slots only accept when empty;
    /// sequences only when the child is not already present.
    pub fn link_child(&mut self, parent: Handle, child: Handle, rng: &mut ChaCha8Rng) -> bool {
        let (Some(parent_ty), Some(child_ty)) =
            (self.gc.type_id_of(parent), self.gc.type_id_of(child))
        else {
            return false;
        };

        let mut own: Vec<(usize, Property)> = Vec::new();
        let mut inherited: Vec<(usize, Property)> = Vec::new();
        self.gc
            .registry()
            .for_each_property(parent_ty, true, |depth, p| {
                if !p.is_traced() {
                    return;
                }
                if depth == 0 {
                    own.push((depth, p.clone()));
                } else {
                    inherited.push((depth, p.clone()));
                }
            });

        let sides: Vec<&[(usize, Property)]> = match self.assign_mode {
            AssignMode::OwnOnly => vec![&own],
            AssignMode::ParentsOnly => vec![&inherited],
            AssignMode::Random => {
                let own_ok = self.side_has_assignable(parent, child, child_ty, &own);
                let parents_ok = self.side_has_assignable(parent, child, child_ty, &inherited);
                match (own_ok, parents_ok) {
                    (true, true) => {
                        if rng.gen_range(0..2) == 0 {
                            vec![&own, &inherited]
                        } else {
                            vec![&inherited, &own]
                        }
                    }
                    (_, true) => vec![&inherited],
                    _ => vec![&own],
                }
            }
        };

        let kind_order = if self.prefer_sequence {
            [true, false]
        } else {
            [false, true]
        };

        for side in sides {
            for want_seq in kind_order {
                for (depth, property) in side {
                    if self.slot_accepts(parent, child, child_ty, *depth, property, want_seq) {
                        self.assign(parent, child, *depth, property);
                        return true;
                    }
                }
            }
        }
        false
    }

    fn side_has_assignable(
        &self,
        parent: Handle,
        child: Handle,
        child_ty: TypeId,
        side: &[(usize, Property)],
    ) -> bool {
        side.iter().any(|(depth, p)| {
            self.slot_accepts(parent, child, child_ty, *depth, p, true)
                || self.slot_accepts(parent, child, child_ty, *depth, p, false)
        })
    }

    fn slot_accepts(
        &self,
        parent: Handle,
        child: Handle,
        child_ty: TypeId,
        depth: usize,
        property: &Property,
        want_seq: bool,
    ) -> bool {
        if !self.gc.registry().assignable(property.type_name, child_ty) {
            return false;
        }
        let Some(node) = self.gc.table().get(parent) else {
            return false;
        };
        let Some(target) = project(node.object(), depth) else {
            return false;
        };
        match property.access {
            PropertyAccess::Handle { get, .. } if !want_seq => get(target).is_none(),
            PropertyAccess::HandleSeq { get, .. } if want_seq => get(target)
                .map(|entries| !entries.contains(&child))
                .unwrap_or(false),
            _ => false,
        }
    }

    fn assign(&mut self, parent: Handle, child: Handle, depth: usize, property: &Property) {
        let Some(node) = self.gc.table_mut().get_mut(parent) else {
            return;
        };
        let Some(target) = project_mut(node.object_mut(), depth) else {
            return;
        };
        match property.access {
            PropertyAccess::Handle { set, .. } => set(target, Some(child)),
            PropertyAccess::HandleSeq { get_mut, .. } => {
                if let Some(entries) = get_mut(target) {
                    entries.push(child);
                }
            }
            PropertyAccess::Scalar { .. } => {}
        }
    }

    // =========================================================================
    // Traversal helpers
    // =========================================================================

    /// Recompute BFS depth layers from the current root set.
    pub fn build_layers(&mut self) {
        self.depth_layers.clear();
        let mut visited: std::collections::HashSet<Handle> = std::collections::HashSet::new();
        let mut queue: VecDeque<(Handle, usize)> = VecDeque::new();

        let roots: Vec<Handle> = self.gc.roots().iter().collect();
        for root in roots {
            if self.gc.is_managed(root) && visited.insert(root) {
                queue.push_back((root, 0));
            }
        }

        while let Some((handle, depth)) = queue.pop_front() {
            if depth >= self.depth_layers.len() {
                self.depth_layers.resize(depth + 1, Vec::new());
            }
            self.depth_layers[depth].push(handle);

            for child in self.gc.children_of(handle) {
                if visited.insert(child) {
                    queue.push_back((child, depth + 1));
                }
            }
        }
    }

    /// Every node reachable from the root set, in BFS order.
    pub fn reachable(&self) -> Vec<Handle> {
        let mut visited: std::collections::HashSet<Handle> = std::collections::HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<Handle> = VecDeque::new();

        for root in self.gc.roots().iter() {
            if self.gc.is_managed(root) && visited.insert(root) {
                queue.push_back(root);
            }
        }
        while let Some(handle) = queue.pop_front() {
            order.push(handle);
            for child in self.gc.children_of(handle) {
                if visited.insert(child) {
                    queue.push_back(child);
                }
            }
        }
        order
    }

    /// Enumerate every edge reachable from the root set.
    pub fn collect_edges(&self) -> Vec<EdgeRef> {
        let mut edges = Vec::new();
        let with_parents = self.gc.traverse_parents();

        for parent in self.reachable() {
            let Some(node) = self.gc.table().get(parent) else {
                continue;
            };
            let obj = node.object();
            let layout = node.layout();

            for slot in layout.direct(with_parents) {
                if let Some(child) = slot.read(obj) {
                    if self.gc.is_managed(child) {
                        edges.push(EdgeRef {
                            parent,
                            child,
                            property: slot.name,
                            index: None,
                        });
                    }
                }
            }
            for seq in layout.seqs(with_parents) {
                if let Some(entries) = seq.read(obj) {
                    for (i, &child) in entries.iter().enumerate() {
                        if self.gc.is_managed(child) {
                            edges.push(EdgeRef {
                                parent,
                                child,
                                property: seq.name,
                                index: Some(i),
                            });
                        }
                    }
                }
            }
        }
        edges
    }

    /// Remove the first `parent -> child` edge found. Sequence removal is
    /// ordered (later entries keep their relative positions).
    pub fn remove_edge(&mut self, parent: Handle, child: Handle) -> bool {
        let with_parents = self.gc.traverse_parents();
        let Some(node) = self.gc.table_mut().get_mut(parent) else {
            return false;
        };
        let layout = std::sync::Arc::clone(node.layout());
        let obj = node.object_mut();

        for slot in layout.direct(with_parents) {
            if slot.read(obj) == Some(child) {
                slot.write(obj, None);
                return true;
            }
        }
        for seq in layout.seqs(with_parents) {
            if let Some(entries) = seq.read_mut(obj) {
                if let Some(pos) = entries.iter().position(|&h| h == child) {
                    entries.remove(pos);
                    return true;
                }
            }
        }
        false
    }

    /// Child counts at one depth layer.
    pub fn depth_stats(&self, depth: usize) -> Option<DepthStats> {
        let layer = self.depth_layers.get(depth)?;
        let mut min = usize::MAX;
        let mut max = 0;
        let mut sum = 0usize;
        for &handle in layer {
            let count = self.gc.children_of(handle).len();
            min = min.min(count);
            max = max.max(count);
            sum += count;
        }
        let nodes = layer.len();
        Some(DepthStats {
            nodes,
            min_children: if nodes == 0 { 0 } else { min },
            max_children: max,
            avg_children: if nodes == 0 {
                0.0
            } else {
                sum as f64 / nodes as f64
            },
        })
    }

    /// Drop the working sets and the root set, then collect everything.
    pub fn clear_all(&mut self) {
        self.all_nodes.clear();
        self.depth_layers.clear();
        self.gc.clear_roots();
        self.gc.collect(true);
    }

    // =========================================================================
    // Graph patterns
    // =========================================================================

    /// Linear chain; the first node is the root. Returns nodes created.
    pub fn chain(&mut self, length: usize, seed: u64) -> usize {
        if length == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let Some(head) = self.make_node() else {
            return 0;
        };
        self.gc.add_root(head);

        let mut created = 1;
        let mut cur = head;
        for _ in 1..length {
            let Some(next) = self.make_node() else {
                break;
            };
            self.link_child(cur, next, &mut rng);
            cur = next;
            created += 1;
        }

        self.build_layers();
        created
    }

    /// `width x height` grid; the top-left cell is the root, each cell links
    /// its right and down neighbors. Returns nodes created.
    pub fn grid(&mut self, width: usize, height: usize, seed: u64) -> usize {
        if width == 0 || height == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut cells: Vec<Vec<Handle>> = Vec::with_capacity(height);
        for _ in 0..height {
            let mut row = Vec::with_capacity(width);
            for _ in 0..width {
                match self.make_node() {
                    Some(h) => row.push(h),
                    None => return 0,
                }
            }
            cells.push(row);
        }

        self.gc.add_root(cells[0][0]);

        for y in 0..height {
            for x in 0..width {
                if x + 1 < width {
                    self.link_child(cells[y][x], cells[y][x + 1], &mut rng);
                }
                if y + 1 < height {
                    self.link_child(cells[y][x], cells[y + 1][x], &mut rng);
                }
            }
        }

        self.build_layers();
        width * height
    }

    /// Random graph: all nodes first, node 0 is the root, then
    /// `branch_count` uniform link attempts per node with self-loops
    /// skipped. Returns nodes created.
    pub fn random(&mut self, node_count: usize, branch_count: usize, seed: u64) -> usize {
        if node_count == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut nodes = Vec::with_capacity(node_count);
        for _ in 0..node_count {
            match self.make_node() {
                Some(h) => nodes.push(h),
                None => return 0,
            }
        }

        self.gc.add_root(nodes[0]);

        for i in 0..node_count {
            for _ in 0..branch_count {
                let pick = rng.gen_range(0..node_count);
                if pick == i {
                    continue;
                }
                self.link_child(nodes[i], nodes[pick], &mut rng);
            }
        }

        self.build_layers();
        node_count
    }

    /// Rings: each ring is a cycle of `ring_size`; the first element of ring
    /// `i` links to the first element of ring `i + 1`. The root is ring 0's
    /// first element. Returns nodes created.
    pub fn rings(&mut self, ring_count: usize, ring_size: usize, seed: u64) -> usize {
        if ring_count == 0 || ring_size == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut prev_first: Option<Handle> = None;
        let mut created = 0;
        for r in 0..ring_count {
            let Some(first) = self.make_node() else {
                break;
            };
            created += 1;
            let mut cur = first;
            for _ in 1..ring_size {
                let Some(next) = self.make_node() else {
                    break;
                };
                created += 1;
                self.link_child(cur, next, &mut rng);
                cur = next;
            }
            self.link_child(cur, first, &mut rng);

            if r == 0 {
                self.gc.add_root(first);
            }
            if let Some(prev) = prev_first {
                self.link_child(prev, first, &mut rng);
            }
            prev_first = Some(first);
        }

        self.build_layers();
        created
    }

    /// Diamond: expand from a single root for `layers / 2` levels at
    /// `breadth` children per node, then merge blocks of `breadth` nodes
    /// into one shared child per block until a single sink remains. Returns
    /// nodes created.
    pub fn diamond(&mut self, layers: usize, breadth: usize, seed: u64) -> usize {
        if breadth == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let Some(root) = self.make_node() else {
            return 0;
        };
        self.gc.add_root(root);
        let mut created = 1;

        let mut current = vec![root];
        for _ in 0..layers / 2 {
            let mut next = Vec::with_capacity(current.len() * breadth);
            for &parent in &current {
                for _ in 0..breadth {
                    let Some(child) = self.make_node() else {
                        return created;
                    };
                    created += 1;
                    self.link_child(parent, child, &mut rng);
                    next.push(child);
                }
            }
            current = next;
        }

        while current.len() > 1 {
            let mut next = Vec::new();
            for block in current.chunks(breadth) {
                let Some(shared) = self.make_node() else {
                    return created;
                };
                created += 1;
                for &parent in block {
                    self.link_child(parent, shared, &mut rng);
                }
                next.push(shared);
            }
            current = next;
        }

        self.build_layers();
        created
    }
}
