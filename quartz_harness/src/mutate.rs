//! Edge-breaking mutations.
//!
//! All removal here is mutation-driven and therefore order-preserving on
//! sequences (the collector's own fixup is the only place entries may be
//! swap-removed). Every operation reseeds its own generator, so a given
//! (graph, seed) pair always removes the same edges.

use crate::tester::GraphTester;
use quartz_meta::Handle;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

impl GraphTester {
    /// Break edges owned by parents at `depth - 1`.
    ///
    /// Picks up to `count` parents at that layer (shuffled), then walks each
    /// parent's slots with a per-slot coin flip until `count` edges have
    /// been cleared at that parent. Returns the number of edges removed.
    pub fn break_at_depth(&mut self, depth: usize, count: usize, seed: u64) -> usize {
        if depth == 0 || count == 0 {
            return 0;
        }
        let Some(layer) = self.depth_layers().get(depth - 1) else {
            return 0;
        };
        let mut parents: Vec<Handle> = layer.clone();

        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        parents.shuffle(&mut rng);
        parents.truncate(count);

        let mut removed = 0;
        for parent in parents {
            removed += self.break_parent_edges(parent, count, &mut rng);
        }

        self.build_layers();
        removed
    }

    /// Coin-flip removal over one parent's slots, bounded by `budget`.
    fn break_parent_edges(&mut self, parent: Handle, budget: usize, rng: &mut ChaCha8Rng) -> usize {
        let with_parents = self.gc().traverse_parents();
        let Some(node) = self.gc_mut().table_mut().get_mut(parent) else {
            return 0;
        };
        let layout = Arc::clone(node.layout());
        let obj = node.object_mut();

        let mut left = budget;
        let mut removed = 0;

        for slot in layout.direct(with_parents) {
            if left == 0 {
                break;
            }
            if slot.read(obj).is_some() && rng.gen_bool(0.5) {
                slot.write(obj, None);
                left -= 1;
                removed += 1;
            }
        }
        for seq in layout.seqs(with_parents) {
            if left == 0 {
                break;
            }
            if let Some(entries) = seq.read_mut(obj) {
                let mut i = 0;
                while i < entries.len() && left > 0 {
                    if rng.gen_bool(0.5) {
                        entries.remove(i);
                        left -= 1;
                        removed += 1;
                    } else {
                        i += 1;
                    }
                }
            }
        }
        removed
    }

    /// Remove each outgoing edge with independent probability
    /// `percent / 100`. Targets are all reachable nodes when `depth < 0`,
    /// otherwise the nodes at that BFS depth. Returns edges removed.
    pub fn break_percent(&mut self, percent: f64, depth: i64, seed: u64) -> usize {
        let percent = percent.clamp(0.0, 100.0);
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let targets: Vec<Handle> = if depth < 0 {
            self.reachable()
        } else {
            if self.depth_layers().is_empty() {
                self.build_layers();
            }
            match self.depth_layers().get(depth as usize) {
                Some(layer) => layer.clone(),
                None => return 0,
            }
        };

        let with_parents = self.gc().traverse_parents();
        let mut cut = 0;
        for target in targets {
            let Some(node) = self.gc_mut().table_mut().get_mut(target) else {
                continue;
            };
            let layout = Arc::clone(node.layout());
            let obj = node.object_mut();

            for slot in layout.direct(with_parents) {
                if slot.read(obj).is_some() && rng.gen_range(0.0..100.0) < percent {
                    slot.write(obj, None);
                    cut += 1;
                }
            }
            for seq in layout.seqs(with_parents) {
                if let Some(entries) = seq.read_mut(obj) {
                    let mut i = 0;
                    while i < entries.len() {
                        if rng.gen_range(0.0..100.0) < percent {
                            entries.remove(i);
                            cut += 1;
                        } else {
                            i += 1;
                        }
                    }
                }
            }
        }

        self.build_layers();
        cut
    }

    /// Shuffle the reachable edge set and remove the first
    /// `min(count, |edges|)` edges. Returns edges removed.
    pub fn break_random_edges(&mut self, count: usize, seed: u64) -> usize {
        if count == 0 {
            return 0;
        }
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let mut edges = self.collect_edges();
        edges.shuffle(&mut rng);

        let mut cut = 0;
        for edge in edges {
            if cut >= count {
                break;
            }
            if self.remove_edge(edge.parent, edge.child) {
                cut += 1;
            }
        }

        self.build_layers();
        cut
    }

    /// Detach roots from the front of the root set: the first `count` when
    /// `count > 0`, otherwise `round(ratio × |roots|)` with `ratio` in
    /// `0..=1`. Detached nodes become collectible unless another live object
    /// still reaches them. Returns roots removed.
    pub fn detach_roots(&mut self, count: usize, ratio: f64) -> usize {
        let removed = if count > 0 {
            self.gc_mut().detach_roots_front(count)
        } else {
            let total = self.gc().roots().len();
            let picked = (ratio.clamp(0.0, 1.0) * total as f64).round() as usize;
            self.gc_mut().detach_roots_front(picked)
        };

        self.build_layers();
        removed
    }
}

#[cfg(test)]
mod tests {
    use crate::standard_tester;
    use quartz_gc::GcConfig;

    #[test]
    fn test_break_random_edges_is_bounded() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.chain(10, 1);

        let edges = tester.collect_edges().len();
        assert_eq!(edges, 9);

        let cut = tester.break_random_edges(3, 99);
        assert_eq!(cut, 3);
        assert_eq!(tester.collect_edges().len() + cut, edges);
    }

    #[test]
    fn test_break_percent_full_strips_every_edge() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.random(50, 3, 7);

        let cut = tester.break_percent(100.0, -1, 1);
        assert!(cut > 0);
        assert!(tester.collect_edges().is_empty());
    }

    #[test]
    fn test_break_percent_zero_is_a_noop() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.grid(4, 4, 3);

        let before = tester.collect_edges().len();
        assert_eq!(tester.break_percent(0.0, -1, 5), 0);
        assert_eq!(tester.collect_edges().len(), before);
    }

    #[test]
    fn test_detach_roots_by_count_and_ratio() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.chain(2, 1);
        tester.chain(2, 2);
        tester.chain(2, 3);
        tester.chain(2, 4);
        assert_eq!(tester.gc().roots().len(), 4);

        assert_eq!(tester.detach_roots(1, 0.0), 1);
        assert_eq!(tester.gc().roots().len(), 3);

        // ratio path: round(2/3 * 3) = 2
        assert_eq!(tester.detach_roots(0, 2.0 / 3.0), 2);
        assert_eq!(tester.gc().roots().len(), 1);
    }

    #[test]
    fn test_break_at_depth_targets_parent_layer() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.chain(6, 1);

        // Depth 3's parent layer is the single chain node at depth 2; one
        // cleared edge disconnects the tail.
        let removed = tester.break_at_depth(3, 1, 42);
        assert!(removed <= 1);
    }

    #[test]
    fn test_mutations_are_deterministic() {
        let run = || {
            let mut tester = standard_tester(GcConfig::single_threaded());
            tester.random(80, 2, 11);
            tester.break_percent(30.0, -1, 77);
            let mut survivors: Vec<u64> =
                tester.reachable().iter().map(|h| h.raw()).collect();
            survivors.sort_unstable();
            survivors
        };
        assert_eq!(run(), run());
    }
}
