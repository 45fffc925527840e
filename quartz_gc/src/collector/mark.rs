//! Mark phase: sequential DFS and parallel BFS-by-wave.
//!
//! Both paths share one definition of "outgoing edges": the non-null direct
//! slots and sequence entries of the node's cached layout whose targets are
//! currently in the object table. A stored handle that does not resolve in
//! the table is silently skipped; that is the only defense against fields
//! aliasing unmanaged identities.

use crate::object_table::{Node, ObjectTable};
use crate::roots::RootSet;
use quartz_meta::Handle;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

/// Items claimed per cursor bump in the parallel wave loop.
const CHUNK: usize = 64;

/// Enumerate the in-table children of `node`.
fn for_each_child<F>(table: &ObjectTable, node: &Node, with_parents: bool, mut visit: F)
where
    F: FnMut(Handle, &Node),
{
    let obj = node.object();
    let layout = node.layout();

    for slot in layout.direct(with_parents) {
        if let Some(child) = slot.read(obj) {
            if let Some(child_node) = table.get(child) {
                visit(child, child_node);
            }
        }
    }
    for seq in layout.seqs(with_parents) {
        if let Some(entries) = seq.read(obj) {
            for &child in entries {
                if let Some(child_node) = table.get(child) {
                    visit(child, child_node);
                }
            }
        }
    }
}

/// Sequential mark: iterative DFS over a worklist seeded with the roots.
///
/// Every object reachable from the root set ends with `mark_epoch == epoch`;
/// everything else keeps its previous (necessarily different) value.
pub(crate) fn sequential(table: &ObjectTable, roots: &RootSet, epoch: u32, with_parents: bool) {
    let mut stack: Vec<Handle> = Vec::with_capacity(roots.len());
    for root in roots.iter() {
        if let Some(node) = table.get(root) {
            if node.mark_sequential(epoch) {
                stack.push(root);
            }
        }
    }

    while let Some(handle) = stack.pop() {
        if let Some(node) = table.get(handle) {
            for_each_child(table, node, with_parents, |child, child_node| {
                if child_node.mark_sequential(epoch) {
                    stack.push(child);
                }
            });
        }
    }
}

/// Parallel mark: breadth-first by wave.
///
/// Each wave distributes the current frontier to `workers` threads through
/// an atomic chunk cursor. Children are claimed with a CAS first-visit mark,
/// so each object is appended to exactly one worker's next-frontier buffer
/// per cycle; the buffers are concatenated into the next wave after all
/// workers join. Sibling visit order is unspecified.
pub(crate) fn parallel(
    table: &ObjectTable,
    roots: &RootSet,
    epoch: u32,
    workers: usize,
    with_parents: bool,
) {
    let mut frontier: Vec<Handle> = Vec::with_capacity(roots.len());
    for root in roots.iter() {
        if let Some(node) = table.get(root) {
            if node.mark_atomic(epoch) {
                frontier.push(root);
            }
        }
    }

    while !frontier.is_empty() {
        let cursor = AtomicUsize::new(0);
        let wave = &frontier;

        let buffers: Vec<Vec<Handle>> = thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut local: Vec<Handle> = Vec::new();
                        loop {
                            let start = cursor.fetch_add(CHUNK, Ordering::Relaxed);
                            if start >= wave.len() {
                                break;
                            }
                            let end = (start + CHUNK).min(wave.len());
                            for &handle in &wave[start..end] {
                                if let Some(node) = table.get(handle) {
                                    for_each_child(
                                        table,
                                        node,
                                        with_parents,
                                        |child, child_node| {
                                            if child_node.mark_atomic(epoch) {
                                                local.push(child);
                                            }
                                        },
                                    );
                                }
                            }
                        }
                        local
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| h.join().expect("mark worker panicked"))
                .collect()
        });

        let total: usize = buffers.iter().map(Vec::len).sum();
        let mut next = Vec::with_capacity(total);
        for mut buffer in buffers {
            next.append(&mut buffer);
        }
        frontier = next;
    }
}
