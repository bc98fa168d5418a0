//! Fixed-capacity measurement history used for jitter and drift statistics.

/// Smallest history the clock will keep.
pub const MIN_HISTORY: usize = 100;

/// Largest history the clock will keep.
pub const MAX_HISTORY: usize = 1000;

/// Ring buffer of `f64` measurements with O(1) running sums.
///
/// Storage is allocated once at construction; [`push`](Self::push) never
/// allocates, so it is safe to call from the audio thread.
#[derive(Debug, Clone)]
pub(crate) struct History {
    values: Vec<f64>,
    head: usize,
    len: usize,
    sum: f64,
    sum_sq: f64,
}

impl History {
    /// Creates an empty history with room for `capacity` entries.
    pub fn new(capacity: usize) -> Self {
        Self {
            values: vec![0.0; capacity.max(1)],
            head: 0,
            len: 0,
            sum: 0.0,
            sum_sq: 0.0,
        }
    }

    /// Appends a measurement, evicting the oldest once full.
    pub fn push(&mut self, value: f64) {
        let capacity = self.values.len();
        if self.len == capacity {
            let evicted = self.values[self.head];
            self.sum -= evicted;
            self.sum_sq -= evicted * evicted;
        } else {
            self.len += 1;
        }
        self.values[self.head] = value;
        self.sum += value;
        self.sum_sq += value * value;
        self.head = (self.head + 1) % capacity;
    }

    /// Drops every entry. Capacity is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.len = 0;
        self.sum = 0.0;
        self.sum_sq = 0.0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Arithmetic mean, or 0 when empty.
    pub fn mean(&self) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            self.sum / self.len as f64
        }
    }

    /// Population standard deviation, or 0 when empty.
    pub fn std_dev(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        let mean = self.mean();
        (self.sum_sq / self.len as f64 - mean * mean).max(0.0).sqrt()
    }

    /// Iterates the stored values, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = f64> + '_ {
        let capacity = self.values.len();
        let start = (self.head + capacity - self.len) % capacity;
        (0..self.len).map(move |i| self.values[(start + i) % capacity])
    }

    /// Largest absolute value, or 0 when empty.
    pub fn max_abs(&self) -> f64 {
        self.iter().fold(0.0, |acc, v| acc.max(v.abs()))
    }

    /// Mean absolute value, or 0 when empty.
    pub fn mean_abs(&self) -> f64 {
        if self.len == 0 {
            return 0.0;
        }
        self.iter().map(f64::abs).sum::<f64>() / self.len as f64
    }

    /// Number of entries with `|value| <= limit`.
    pub fn count_within(&self, limit: f64) -> usize {
        self.iter().filter(|v| v.abs() <= limit).count()
    }

    /// Most recently pushed value.
    pub fn last(&self) -> Option<f64> {
        if self.len == 0 {
            return None;
        }
        let capacity = self.values.len();
        Some(self.values[(self.head + capacity - 1) % capacity])
    }
}
