//! Concrete seeded scenarios with computable expected outcomes.

use quartz_gc::{Gc, GcConfig};
use quartz_harness::standard_tester;
use quartz_meta::Handle;
use std::collections::HashMap;
use std::collections::HashSet;

fn reachable_from_roots(gc: &Gc) -> HashSet<Handle> {
    let mut seen = HashSet::new();
    let mut stack: Vec<Handle> = gc.roots().iter().collect();
    while let Some(h) = stack.pop() {
        if !gc.is_managed(h) || !seen.insert(h) {
            continue;
        }
        stack.extend(gc.children_of(h));
    }
    seen
}

// =============================================================================
// 1. Chain of length 5, no mutation
// =============================================================================

#[test]
fn chain_of_five_survives_collection_intact() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    assert_eq!(tester.chain(5, 1), 5);

    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 5);
    for &h in tester.all_nodes() {
        assert!(tester.gc().is_managed(h));
    }
}

// =============================================================================
// 2. Chain + unlink head
// =============================================================================

#[test]
fn unlinking_chain_head_reclaims_the_tail() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    tester.chain(5, 1);

    let a = tester.all_nodes()[0];
    let b = tester.all_nodes()[1];
    assert!(tester.remove_edge(a, b));

    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 1);
    assert!(tester.gc().is_managed(a));
    assert!(!tester.gc().is_managed(b));
}

// =============================================================================
// 3. Ring of size 4
// =============================================================================

#[test]
fn ring_survives_then_collapses_when_cut() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    assert_eq!(tester.rings(1, 4, 7), 4);

    // The cycle keeps itself alive through the root.
    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 4);

    // Cutting 0 -> 1 orphans the rest of the cycle; cycles do not keep
    // themselves alive.
    let e0 = tester.all_nodes()[0];
    let e1 = tester.all_nodes()[1];
    assert!(tester.remove_edge(e0, e1));

    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 1);
    assert!(tester.gc().is_managed(e0));
}

// =============================================================================
// 4. Diamond, layers = 4, breadth = 2
// =============================================================================

#[test]
fn diamond_shape_and_total_collapse_on_root_detach() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    let created = tester.diamond(4, 2, 3);
    // 1 root, expand 2 + 4, merge 2 + 1.
    assert_eq!(created, 10);

    // Expand-half nodes have one incoming edge, merge-half nodes have
    // `breadth` incoming edges.
    let mut incoming: HashMap<Handle, usize> = HashMap::new();
    for edge in tester.collect_edges() {
        *incoming.entry(edge.child).or_insert(0) += 1;
    }
    let nodes = tester.all_nodes().to_vec();
    assert!(!incoming.contains_key(&nodes[0]), "root has no incoming edge");
    for &h in &nodes[1..7] {
        assert_eq!(incoming.get(&h), Some(&1), "expand half");
    }
    for &h in &nodes[7..10] {
        assert_eq!(incoming.get(&h), Some(&2), "merge half");
    }

    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 10);

    assert_eq!(tester.detach_roots(1, 0.0), 1);
    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 0);
}

// =============================================================================
// 5. Random graph, 100 nodes, branch 3, seed 1337
// =============================================================================

#[test]
fn random_graph_collapses_to_root_when_fully_broken() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    assert_eq!(tester.random(100, 3, 1337), 100);

    // First collection reclaims exactly what construction left unreachable
    // (nodes that happened to receive no incoming edge).
    let reachable = reachable_from_roots(tester.gc());
    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), reachable.len());

    // Severing every outgoing edge leaves only the root alive.
    tester.break_percent(100.0, -1, 1);
    tester.gc_mut().collect(true);
    assert_eq!(tester.gc().live_objects(), 1);
    assert!(tester.gc().is_managed(tester.all_nodes()[0]));
}

// =============================================================================
// 6. Churn
// =============================================================================

#[test]
fn churn_leaves_a_consistent_marked_table() {
    let mut tester = standard_tester(GcConfig::single_threaded());
    tester.churn(50, 20, 10.0, 5, 2025);

    tester.gc_mut().collect(true);
    let epoch = tester.gc().epoch();
    let live: HashSet<Handle> = tester.gc().table().iter().map(|(h, _)| h).collect();

    for (handle, node) in tester.gc().table().iter() {
        // Every survivor was stamped by the final cycle.
        assert_eq!(
            node.mark_epoch(),
            epoch,
            "survivor {} missed the final mark",
            handle.raw()
        );

        // And no survivor points at anything destroyed.
        let obj = node.object();
        let layout = node.layout();
        for slot in layout.direct(true) {
            if let Some(target) = slot.read(obj) {
                assert!(live.contains(&target));
            }
        }
        for seq in layout.seqs(true) {
            for &target in seq.read(obj).unwrap_or(&[]) {
                assert!(live.contains(&target));
            }
        }
    }
}
