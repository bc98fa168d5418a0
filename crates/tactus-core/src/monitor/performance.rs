//! Render pass timing statistics.

use std::sync::atomic::{AtomicU64, Ordering, fence};
use std::time::{Duration, Instant};

const NO_CYCLE: u64 = u64::MAX;

/// Reader attempts before settling for a possibly mixed snapshot.
const READ_RETRIES: usize = 64;

/// Statistics snapshot returned by [`PerformanceMonitor::current_metrics`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PerformanceMetrics {
    /// Render passes recorded since creation or the last reset.
    pub sample_count: u64,
    /// Running mean of the pass duration.
    pub average: Duration,
    /// Longest pass.
    pub max: Duration,
    /// Shortest pass (zero when nothing was recorded).
    pub min: Duration,
    /// Most recent pass.
    pub last: Duration,
    /// Mean pass duration as a percentage of the callback budget (0 to 100).
    pub cpu_load: f64,
    /// Time available per callback, `buffer_size / sample_rate`.
    pub budget: Duration,
}

/// Running statistics of render pass durations.
///
/// One thread (the render thread) records; any thread may read. Everything is
/// stored in atomics, so recording neither locks nor allocates.
///
/// Each update is bracketed by a sequence counter, and readers retry while an
/// update is in flight. Readers never block the recorder, so after a bounded
/// number of retries [`current_metrics`](Self::current_metrics) returns what it
/// saw; under that contention the fields may come from adjacent updates.
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use tactus_core::PerformanceMonitor;
///
/// let monitor = PerformanceMonitor::new(48000.0, 480);
/// monitor.record_processing_time(Duration::from_micros(500));
/// monitor.record_processing_time(Duration::from_micros(1500));
///
/// let metrics = monitor.current_metrics();
/// assert_eq!(metrics.average, Duration::from_micros(1000));
/// // 1 ms of a 10 ms budget.
/// assert!((metrics.cpu_load - 10.0).abs() < 1e-9);
/// ```
#[derive(Debug)]
pub struct PerformanceMonitor {
    epoch: Instant,
    /// Odd while an update is in progress.
    seq: AtomicU64,
    cycle_start_ns: AtomicU64,
    count: AtomicU64,
    /// f64 bit pattern of the mean in nanoseconds.
    mean_ns: AtomicU64,
    max_ns: AtomicU64,
    min_ns: AtomicU64,
    last_ns: AtomicU64,
    budget_ns: AtomicU64,
}

impl PerformanceMonitor {
    /// Creates a monitor whose budget is one callback of `buffer_size` frames.
    pub fn new(sample_rate: f64, buffer_size: usize) -> Self {
        let monitor = Self {
            epoch: Instant::now(),
            seq: AtomicU64::new(0),
            cycle_start_ns: AtomicU64::new(NO_CYCLE),
            count: AtomicU64::new(0),
            mean_ns: AtomicU64::new(0f64.to_bits()),
            max_ns: AtomicU64::new(0),
            min_ns: AtomicU64::new(u64::MAX),
            last_ns: AtomicU64::new(0),
            budget_ns: AtomicU64::new(0),
        };
        monitor.set_budget(sample_rate, buffer_size);
        monitor
    }

    /// Recomputes the callback budget after a device reconfiguration.
    ///
    /// Invalid values leave the budget unchanged.
    pub fn set_budget(&self, sample_rate: f64, buffer_size: usize) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) || buffer_size == 0 {
            return;
        }
        let budget = buffer_size as f64 / sample_rate * 1e9;
        self.budget_ns.store(budget.round() as u64, Ordering::Relaxed);
    }

    /// Marks the start of a render pass.
    #[inline]
    pub fn start_processing_cycle(&self) {
        self.cycle_start_ns
            .store(self.elapsed_ns(), Ordering::Relaxed);
    }

    /// Marks the end of a render pass and records its duration.
    ///
    /// Does nothing without a matching [`start_processing_cycle`](Self::start_processing_cycle).
    #[inline]
    pub fn end_processing_cycle(&self) {
        let start = self.cycle_start_ns.swap(NO_CYCLE, Ordering::Relaxed);
        if start == NO_CYCLE {
            return;
        }
        let elapsed = self.elapsed_ns().saturating_sub(start);
        self.record_nanos(elapsed);
    }

    /// Records the duration of one render pass.
    pub fn record_processing_time(&self, duration: Duration) {
        self.record_nanos(u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX));
    }

    fn record_nanos(&self, nanos: u64) {
        self.write(|| {
            let n = self.count.fetch_add(1, Ordering::Relaxed) + 1;
            let mean = f64::from_bits(self.mean_ns.load(Ordering::Relaxed));
            let mean = mean + (nanos as f64 - mean) / n as f64;
            self.mean_ns.store(mean.to_bits(), Ordering::Relaxed);
            self.max_ns.fetch_max(nanos, Ordering::Relaxed);
            self.min_ns.fetch_min(nanos, Ordering::Relaxed);
            self.last_ns.store(nanos, Ordering::Relaxed);
        });
    }

    /// Runs `update` between the two halves of a sequence bump.
    #[inline]
    fn write(&self, update: impl FnOnce()) {
        self.seq.fetch_add(1, Ordering::Relaxed);
        fence(Ordering::Release);
        update();
        self.seq.fetch_add(1, Ordering::Release);
    }

    /// Returns a statistics snapshot.
    ///
    /// All fields come from the same set of recorded passes unless the
    /// recorder kept updating through every retry.
    pub fn current_metrics(&self) -> PerformanceMetrics {
        let mut raw = self.read_raw();
        for _ in 0..READ_RETRIES {
            let before = self.seq.load(Ordering::Acquire);
            if before % 2 == 1 {
                std::hint::spin_loop();
                continue;
            }
            raw = self.read_raw();
            fence(Ordering::Acquire);
            if self.seq.load(Ordering::Relaxed) == before {
                break;
            }
        }
        let RawMetrics {
            sample_count,
            mean,
            max,
            min,
            last,
        } = raw;
        let budget = self.budget_ns.load(Ordering::Relaxed);

        let cpu_load = if budget == 0 {
            0.0
        } else {
            (mean / budget as f64 * 100.0).clamp(0.0, 100.0)
        };

        PerformanceMetrics {
            sample_count,
            average: Duration::from_nanos(mean.round() as u64),
            max: Duration::from_nanos(max),
            min: Duration::from_nanos(if min == u64::MAX { 0 } else { min }),
            last: Duration::from_nanos(last),
            cpu_load,
            budget: Duration::from_nanos(budget),
        }
    }

    /// Clears all statistics. The budget is kept.
    pub fn reset(&self) {
        self.cycle_start_ns.store(NO_CYCLE, Ordering::Relaxed);
        self.write(|| {
            self.count.store(0, Ordering::Relaxed);
            self.mean_ns.store(0f64.to_bits(), Ordering::Relaxed);
            self.max_ns.store(0, Ordering::Relaxed);
            self.min_ns.store(u64::MAX, Ordering::Relaxed);
            self.last_ns.store(0, Ordering::Relaxed);
        });
    }

    fn read_raw(&self) -> RawMetrics {
        RawMetrics {
            sample_count: self.count.load(Ordering::Relaxed),
            mean: f64::from_bits(self.mean_ns.load(Ordering::Relaxed)),
            max: self.max_ns.load(Ordering::Relaxed),
            min: self.min_ns.load(Ordering::Relaxed),
            last: self.last_ns.load(Ordering::Relaxed),
        }
    }

    fn elapsed_ns(&self) -> u64 {
        u64::try_from(self.epoch.elapsed().as_nanos()).unwrap_or(u64::MAX - 1)
    }
}

struct RawMetrics {
    sample_count: u64,
    mean: f64,
    max: u64,
    min: u64,
    last: u64,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new(48000.0, 512)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_max_min() {
        let monitor = PerformanceMonitor::default();
        for us in [10, 20, 30] {
            monitor.record_processing_time(Duration::from_micros(us));
        }
        let metrics = monitor.current_metrics();
        assert_eq!(metrics.sample_count, 3);
        assert_eq!(metrics.average, Duration::from_micros(20));
        assert_eq!(metrics.max, Duration::from_micros(30));
        assert_eq!(metrics.min, Duration::from_micros(10));
        assert_eq!(metrics.last, Duration::from_micros(30));
    }

    #[test]
    fn test_empty_metrics() {
        let metrics = PerformanceMonitor::default().current_metrics();
        assert_eq!(metrics.sample_count, 0);
        assert_eq!(metrics.min, Duration::ZERO);
        assert_eq!(metrics.cpu_load, 0.0);
    }

    #[test]
    fn test_cpu_load_clamps_to_100() {
        let monitor = PerformanceMonitor::new(48000.0, 48);
        monitor.record_processing_time(Duration::from_millis(5));
        assert_eq!(monitor.current_metrics().cpu_load, 100.0);
    }

    #[test]
    fn test_budget() {
        let monitor = PerformanceMonitor::new(48000.0, 480);
        assert_eq!(monitor.current_metrics().budget, Duration::from_millis(10));
        monitor.set_budget(0.0, 480);
        assert_eq!(monitor.current_metrics().budget, Duration::from_millis(10));
        monitor.set_budget(96000.0, 96);
        assert_eq!(monitor.current_metrics().budget, Duration::from_millis(1));
    }

    #[test]
    fn test_cycle_bracketing() {
        let monitor = PerformanceMonitor::default();
        monitor.end_processing_cycle();
        assert_eq!(monitor.current_metrics().sample_count, 0);

        monitor.start_processing_cycle();
        std::thread::sleep(Duration::from_millis(1));
        monitor.end_processing_cycle();
        let metrics = monitor.current_metrics();
        assert_eq!(metrics.sample_count, 1);
        assert!(metrics.last >= Duration::from_millis(1));
    }

    #[test]
    fn test_reset() {
        let monitor = PerformanceMonitor::default();
        monitor.record_processing_time(Duration::from_micros(100));
        monitor.reset();
        let metrics = monitor.current_metrics();
        assert_eq!(metrics.sample_count, 0);
        assert_eq!(metrics.max, Duration::ZERO);
        assert_eq!(metrics.average, Duration::ZERO);
    }

    #[test]
    fn test_concurrent_reads_see_consistent_snapshots() {
        use std::sync::Arc;

        const PASSES: u64 = 20_000;
        let monitor = Arc::new(PerformanceMonitor::default());
        let writer = {
            let monitor = Arc::clone(&monitor);
            std::thread::spawn(move || {
                for i in 0..PASSES {
                    let us = if i % 2 == 0 { 10 } else { 30 };
                    monitor.record_processing_time(Duration::from_micros(us));
                    std::thread::yield_now();
                }
            })
        };

        // Alternating 10 and 30 us: the mean is exactly 20 us after an even
        // number of passes and 20 - 10/n us after an odd one.
        while !writer.is_finished() {
            let metrics = monitor.current_metrics();
            let n = metrics.sample_count;
            if n == 0 {
                continue;
            }
            let expected = if n % 2 == 0 {
                20_000.0
            } else {
                20_000.0 - 10_000.0 / n as f64
            };
            assert_eq!(metrics.average, Duration::from_nanos(expected.round() as u64));
            assert_eq!(metrics.min, Duration::from_micros(10));
            let max = if n == 1 { 10 } else { 30 };
            assert_eq!(metrics.max, Duration::from_micros(max));
            let last = if n % 2 == 1 { 10 } else { 30 };
            assert_eq!(metrics.last, Duration::from_micros(last));
        }
        writer.join().unwrap();

        let metrics = monitor.current_metrics();
        assert_eq!(metrics.sample_count, PASSES);
        assert_eq!(metrics.average, Duration::from_micros(20));
    }
}
