//! The collection cycle: epoch discipline, mark, fixup, sweep.

mod mark;

use crate::object_table::ObjectTable;
use crate::roots::RootSet;
use crate::stats::GcTimings;
use quartz_meta::Handle;
use rustc_hash::FxHashSet;
use std::sync::Arc;
use std::time::Instant;

/// Result of one collection cycle.
pub(crate) struct CollectOutcome {
    /// Per-phase wall-clock timings.
    pub timings: GcTimings,
    /// Objects destroyed.
    pub swept: usize,
    /// Objects remaining in the table.
    pub live: usize,
    /// Whether the parallel mark path ran.
    pub parallel: bool,
}

/// Parameters the cycle needs from the collector configuration.
pub(crate) struct CollectParams {
    pub threads: usize,
    pub parallel_threshold: usize,
    pub traverse_parents: bool,
}

/// Run one full stop-the-world collection.
///
/// The caller guarantees mutator quiescence for the duration. `epoch` is the
/// process-wide cycle counter; it is bumped here, with a full mark reset on
/// wrap so stale epochs can never collide with a new cycle.
pub(crate) fn run_collection(
    table: &mut ObjectTable,
    roots: &mut RootSet,
    epoch: &mut u32,
    params: &CollectParams,
) -> CollectOutcome {
    let t_total = Instant::now();

    // Phase 1: advance the epoch; on wrap, walk every node back to zero.
    let t_clear = Instant::now();
    *epoch = epoch.wrapping_add(1);
    if *epoch == 0 {
        for (_, node) in table.iter() {
            node.reset_mark();
        }
        *epoch = 1;
    }
    let clear = t_clear.elapsed();

    // Phase 2: mark. The table is read-only for the whole phase.
    let t_mark = Instant::now();
    let use_parallel = params.threads > 1 && table.len() > params.parallel_threshold;
    if use_parallel {
        mark::parallel(table, roots, *epoch, params.threads, params.traverse_parents);
    } else {
        mark::sequential(table, roots, *epoch, params.traverse_parents);
    }
    let mark_time = t_mark.elapsed();

    // Phase 3: everything not stamped with the current epoch is dead.
    let t_build = Instant::now();
    let mut dead: FxHashSet<Handle> = FxHashSet::default();
    for (handle, node) in table.iter() {
        if node.mark_epoch() != *epoch {
            dead.insert(handle);
        }
    }
    let build_dead = t_build.elapsed();

    // Phase 4: fixup. Survivors' references into the dead set are cleared so
    // no pointer survives to a destroyed object. The full inherited layout
    // is repaired regardless of the traversal mode; a dangling reference in
    // an untraced parent field is still a dangling reference. Handles that
    // never resolved in the table are left untouched.
    let t_fixup = Instant::now();
    let current = *epoch;
    for (_, node) in table.iter_mut() {
        if node.mark_epoch() != current {
            continue;
        }
        let layout = Arc::clone(node.layout());
        let obj = node.object_mut();

        for slot in layout.direct(true) {
            if let Some(target) = slot.read(obj) {
                if dead.contains(&target) {
                    slot.write(obj, None);
                }
            }
        }
        for seq in layout.seqs(true) {
            if let Some(entries) = seq.read_mut(obj) {
                let mut i = 0;
                while i < entries.len() {
                    if dead.contains(&entries[i]) {
                        entries.swap_remove(i);
                    } else {
                        i += 1;
                    }
                }
            }
        }
    }
    let fixup = t_fixup.elapsed();

    // Phase 5: sweep. Dead objects' own fields were never repaired, so their
    // destruction order cannot be observed by other dead objects.
    let t_sweep = Instant::now();
    let swept = dead.len();
    for &handle in &dead {
        table.remove(handle);
        roots.remove(handle);
    }
    let sweep = t_sweep.elapsed();

    CollectOutcome {
        timings: GcTimings {
            clear,
            mark: mark_time,
            build_dead,
            fixup,
            sweep,
            total: t_total.elapsed(),
        },
        swept,
        live: table.len(),
        parallel: use_parallel,
    }
}
