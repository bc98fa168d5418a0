//! Deadline miss accounting for the render thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender, bounded};

/// Default percentage of met deadlines required to count as real-time safe.
pub const DEFAULT_SAFETY_THRESHOLD: f64 = 95.0;

/// Default number of miss records buffered between drains.
pub const DEFAULT_MISS_CAPACITY: usize = 256;

/// One missed deadline, queued for the monitoring thread.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeadlineMiss {
    /// How far past the deadline the check ran.
    pub lateness: Duration,
    /// 1-based index of the check that missed.
    pub check: u64,
}

/// Snapshot returned by [`RealTimeSafetyMonitor::current_status`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SafetyStatus {
    /// Deadlines missed.
    pub deadline_misses: u64,
    /// Deadlines checked.
    pub total_checks: u64,
    /// Percentage of deadlines met (100 when nothing was checked).
    pub safety_percentage: f64,
    /// Whether `safety_percentage` reaches the configured threshold.
    pub is_real_time_safe: bool,
    /// Miss records dropped because the queue was full. Counts are unaffected.
    pub dropped_records: u64,
}

/// Counts render passes that overrun their deadline.
///
/// The render thread calls [`check_deadline`](Self::check_deadline) at the end
/// of each pass. Counters are atomics and miss records go through a bounded
/// channel with `try_send`, so the render thread never blocks or allocates; a
/// full queue drops the record, never the count.
///
/// # Example
///
/// ```rust
/// use std::time::{Duration, Instant};
/// use tactus_core::RealTimeSafetyMonitor;
///
/// let monitor = RealTimeSafetyMonitor::default();
/// let deadline = Instant::now() + Duration::from_secs(60);
/// assert!(monitor.check_deadline(deadline));
///
/// let status = monitor.current_status();
/// assert_eq!(status.safety_percentage, 100.0);
/// assert!(status.is_real_time_safe);
/// ```
#[derive(Debug)]
pub struct RealTimeSafetyMonitor {
    total: AtomicU64,
    misses: AtomicU64,
    dropped: AtomicU64,
    threshold: f64,
    miss_tx: Sender<DeadlineMiss>,
    miss_rx: Receiver<DeadlineMiss>,
}

impl RealTimeSafetyMonitor {
    /// Creates a monitor with the given safety threshold (percent, clamped to 0..=100).
    pub fn new(threshold: f64) -> Self {
        Self::with_capacity(threshold, DEFAULT_MISS_CAPACITY)
    }

    /// Creates a monitor that buffers up to `capacity` miss records.
    pub fn with_capacity(threshold: f64, capacity: usize) -> Self {
        let threshold = if threshold.is_finite() {
            threshold.clamp(0.0, 100.0)
        } else {
            DEFAULT_SAFETY_THRESHOLD
        };
        let (miss_tx, miss_rx) = bounded(capacity.max(1));
        Self {
            total: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            threshold,
            miss_tx,
            miss_rx,
        }
    }

    /// Configured safety threshold in percent.
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Checks the current time against `deadline`. Returns `true` if it was met.
    #[inline]
    pub fn check_deadline(&self, deadline: Instant) -> bool {
        self.check_deadline_at(deadline, Instant::now())
    }

    /// Checks `now` against `deadline`. Returns `true` if it was met.
    ///
    /// Running exactly at the deadline counts as met.
    pub fn check_deadline_at(&self, deadline: Instant, now: Instant) -> bool {
        let check = self.total.fetch_add(1, Ordering::Relaxed) + 1;
        if now <= deadline {
            return true;
        }
        self.misses.fetch_add(1, Ordering::Relaxed);

        let miss = DeadlineMiss {
            lateness: now - deadline,
            check,
        };
        if self.miss_tx.try_send(miss).is_err() {
            self.dropped.fetch_add(1, Ordering::Relaxed);
        }
        false
    }

    /// Returns the current counters.
    pub fn current_status(&self) -> SafetyStatus {
        let total_checks = self.total.load(Ordering::Relaxed);
        let deadline_misses = self.misses.load(Ordering::Relaxed).min(total_checks);
        let safety_percentage = if total_checks == 0 {
            100.0
        } else {
            (total_checks - deadline_misses) as f64 * 100.0 / total_checks as f64
        };
        SafetyStatus {
            deadline_misses,
            total_checks,
            safety_percentage,
            is_real_time_safe: safety_percentage >= self.threshold,
            dropped_records: self.dropped.load(Ordering::Relaxed),
        }
    }

    /// Takes every queued miss record. Call from the monitoring thread.
    pub fn drain_misses(&self) -> Vec<DeadlineMiss> {
        let misses: Vec<DeadlineMiss> = self.miss_rx.try_iter().collect();
        #[cfg(feature = "tracing")]
        for miss in &misses {
            tracing::warn!(
                "deadline_miss: check {} late by {:?}",
                miss.check,
                miss.lateness
            );
        }
        misses
    }

    /// Clears counters and queued records.
    pub fn reset(&self) {
        while self.miss_rx.try_recv().is_ok() {}
        self.total.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.dropped.store(0, Ordering::Relaxed);
    }
}

impl Default for RealTimeSafetyMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_SAFETY_THRESHOLD)
    }
}
