//! Allocation/GC interleaving stress and measurement.

use crate::tester::GraphTester;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

/// Wall-clock summary of repeated collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GcMeasurement {
    /// Number of collections timed.
    pub runs: usize,
    /// Fastest run.
    pub min: Duration,
    /// Slowest run.
    pub max: Duration,
    /// Arithmetic mean.
    pub mean: Duration,
}

impl GraphTester {
    /// Stress allocation interleaved with edge breaking and collection.
    ///
    /// Each step: snapshot the reachable set, allocate `alloc_per_step` new
    /// nodes each linked under a uniformly chosen snapshot parent (or rooted
    /// directly when nothing is reachable yet), then optionally break
    /// `break_percent` of all reachable edges, then collect every
    /// `gc_every_n` steps (`0` disables collection).
    pub fn churn(
        &mut self,
        steps: usize,
        alloc_per_step: usize,
        break_percent: f64,
        gc_every_n: usize,
        seed: u64,
    ) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        for step in 1..=steps {
            let snapshot = self.reachable();

            for _ in 0..alloc_per_step {
                let Some(child) = self.make_node() else {
                    continue;
                };
                if snapshot.is_empty() {
                    self.gc_mut().add_root(child);
                } else {
                    let parent = snapshot[rng.gen_range(0..snapshot.len())];
                    self.link_child(parent, child, &mut rng);
                }
            }

            if break_percent > 0.0 {
                let break_seed = rng.gen::<u64>();
                self.break_percent(break_percent, -1, break_seed);
            }

            if gc_every_n > 0 && step % gc_every_n == 0 {
                self.gc_mut().collect(true);
            }
        }

        self.build_layers();
    }

    /// Build a random graph, collect, and tear down, `steps` times over.
    pub fn repeat_random_and_collect(&mut self, steps: usize, nodes: usize, branches: usize) {
        for i in 0..steps {
            self.random(nodes, branches, i as u64);
            self.gc_mut().collect(true);
            self.clear_all();
        }
    }

    /// Time `repeats` back-to-back collections over the current graph; no
    /// state is rebuilt between runs, so from the second run on the dead set
    /// is empty and the measurement isolates trace cost.
    pub fn measure_gc(&mut self, repeats: usize) -> GcMeasurement {
        let mut min = Duration::MAX;
        let mut max = Duration::ZERO;
        let mut total = Duration::ZERO;

        for _ in 0..repeats {
            let elapsed = self.gc_mut().collect(true);
            min = min.min(elapsed);
            max = max.max(elapsed);
            total += elapsed;
        }

        if repeats == 0 {
            return GcMeasurement {
                runs: 0,
                min: Duration::ZERO,
                max: Duration::ZERO,
                mean: Duration::ZERO,
            };
        }
        GcMeasurement {
            runs: repeats,
            min,
            max,
            mean: total / repeats as u32,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::standard_tester;
    use quartz_gc::GcConfig;

    #[test]
    fn test_churn_from_empty_state() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.churn(10, 5, 0.0, 2, 9);

        // Nothing was broken, so everything allocated is still reachable.
        assert_eq!(tester.reachable().len(), 50);
        assert_eq!(tester.gc().live_objects(), 50);
    }

    #[test]
    fn test_churn_with_breaking_keeps_table_consistent() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.chain(5, 1);
        tester.churn(20, 10, 15.0, 4, 1234);
        tester.gc_mut().collect(true);

        // Whatever survived is exactly the reachable set.
        let reachable = tester.reachable().len();
        assert_eq!(tester.gc().live_objects(), reachable);
    }

    #[test]
    fn test_measure_gc_reports_ordered_stats() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.grid(10, 10, 3);

        let m = tester.measure_gc(5);
        assert_eq!(m.runs, 5);
        assert!(m.min <= m.mean);
        assert!(m.mean <= m.max);

        let empty = tester.measure_gc(0);
        assert_eq!(empty.runs, 0);
        assert_eq!(empty.max, Duration::ZERO);
    }

    #[test]
    fn test_repeat_random_and_collect_tears_down() {
        let mut tester = standard_tester(GcConfig::single_threaded());
        tester.repeat_random_and_collect(3, 100, 2);
        assert_eq!(tester.gc().live_objects(), 0);
        assert!(tester.gc().roots().is_empty());
    }
}
