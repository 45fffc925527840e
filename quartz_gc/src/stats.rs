//! Collection statistics.
//!
//! Counters are atomic so the stats block can be read while a parallel mark
//! is in flight (workers never write them; only the collection driver does,
//! between phases).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Wall-clock timings of one collection cycle, per phase.
#[derive(Debug, Clone, Copy, Default)]
pub struct GcTimings {
    /// Epoch bump (and wrap reset, when it happens).
    pub clear: Duration,
    /// Mark phase.
    pub mark: Duration,
    /// Dead-set construction.
    pub build_dead: Duration,
    /// Survivor reference fixup.
    pub fixup: Duration,
    /// Sweep.
    pub sweep: Duration,
    /// Whole cycle.
    pub total: Duration,
}

/// Statistics about collector activity.
#[derive(Debug)]
pub struct GcStats {
    /// Number of completed collections.
    pub collections: AtomicU64,
    /// Total objects destroyed by sweep.
    pub objects_swept: AtomicU64,
    /// Live objects after the last collection.
    pub live_objects: AtomicU64,
    /// Total time spent marking (nanoseconds).
    pub mark_time_ns: AtomicU64,
    /// Total time spent in fixup (nanoseconds).
    pub fixup_time_ns: AtomicU64,
    /// Total time spent sweeping (nanoseconds).
    pub sweep_time_ns: AtomicU64,
    /// Total collection time (nanoseconds).
    pub total_time_ns: AtomicU64,
}

impl GcStats {
    /// Create new empty statistics.
    pub const fn new() -> Self {
        Self {
            collections: AtomicU64::new(0),
            objects_swept: AtomicU64::new(0),
            live_objects: AtomicU64::new(0),
            mark_time_ns: AtomicU64::new(0),
            fixup_time_ns: AtomicU64::new(0),
            sweep_time_ns: AtomicU64::new(0),
            total_time_ns: AtomicU64::new(0),
        }
    }

    /// Record one completed collection.
    pub fn record_collection(&self, timings: &GcTimings, swept: usize, live: usize) {
        self.collections.fetch_add(1, Ordering::Relaxed);
        self.objects_swept.fetch_add(swept as u64, Ordering::Relaxed);
        self.live_objects.store(live as u64, Ordering::Relaxed);
        self.mark_time_ns
            .fetch_add(timings.mark.as_nanos() as u64, Ordering::Relaxed);
        self.fixup_time_ns
            .fetch_add(timings.fixup.as_nanos() as u64, Ordering::Relaxed);
        self.sweep_time_ns
            .fetch_add(timings.sweep.as_nanos() as u64, Ordering::Relaxed);
        self.total_time_ns
            .fetch_add(timings.total.as_nanos() as u64, Ordering::Relaxed);
    }

    /// Average pause across all recorded collections.
    pub fn avg_pause(&self) -> Duration {
        let count = self.collections.load(Ordering::Relaxed);
        if count == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(self.total_time_ns.load(Ordering::Relaxed) / count)
    }

    /// Total time spent collecting.
    pub fn total_time(&self) -> Duration {
        Duration::from_nanos(self.total_time_ns.load(Ordering::Relaxed))
    }

    /// Reset all statistics.
    pub fn reset(&self) {
        self.collections.store(0, Ordering::Relaxed);
        self.objects_swept.store(0, Ordering::Relaxed);
        self.live_objects.store(0, Ordering::Relaxed);
        self.mark_time_ns.store(0, Ordering::Relaxed);
        self.fixup_time_ns.store(0, Ordering::Relaxed);
        self.sweep_time_ns.store(0, Ordering::Relaxed);
        self.total_time_ns.store(0, Ordering::Relaxed);
    }

    /// Print a summary of collector statistics to stderr.
    pub fn print_summary(&self) {
        eprintln!("=== GC Statistics ===");
        eprintln!(
            "Collections: {} ({} objects swept, {} live)",
            self.collections.load(Ordering::Relaxed),
            self.objects_swept.load(Ordering::Relaxed),
            self.live_objects.load(Ordering::Relaxed)
        );
        eprintln!(
            "Time: {:?} total, {:?} avg pause (mark {:?}, fixup {:?}, sweep {:?})",
            self.total_time(),
            self.avg_pause(),
            Duration::from_nanos(self.mark_time_ns.load(Ordering::Relaxed)),
            Duration::from_nanos(self.fixup_time_ns.load(Ordering::Relaxed)),
            Duration::from_nanos(self.sweep_time_ns.load(Ordering::Relaxed)),
        );
    }
}

impl Default for GcStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_collection() {
        let stats = GcStats::new();
        let timings = GcTimings {
            total: Duration::from_micros(300),
            mark: Duration::from_micros(200),
            ..Default::default()
        };

        stats.record_collection(&timings, 5, 12);
        stats.record_collection(&timings, 0, 12);

        assert_eq!(stats.collections.load(Ordering::Relaxed), 2);
        assert_eq!(stats.objects_swept.load(Ordering::Relaxed), 5);
        assert_eq!(stats.live_objects.load(Ordering::Relaxed), 12);
        assert_eq!(stats.avg_pause(), Duration::from_micros(300));
    }

    #[test]
    fn test_reset() {
        let stats = GcStats::new();
        stats.record_collection(&GcTimings::default(), 1, 1);
        stats.reset();
        assert_eq!(stats.collections.load(Ordering::Relaxed), 0);
        assert_eq!(stats.avg_pause(), Duration::ZERO);
    }
}
