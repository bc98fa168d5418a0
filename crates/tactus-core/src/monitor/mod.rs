//! Render-thread observability: pass durations and deadline misses.
//!
//! Both monitors are written by the render thread and read by anyone. They
//! keep their state in atomics, so recording never locks or allocates.

mod performance;
mod safety;

pub use performance::{PerformanceMetrics, PerformanceMonitor};
pub use safety::{
    DEFAULT_MISS_CAPACITY, DEFAULT_SAFETY_THRESHOLD, DeadlineMiss, RealTimeSafetyMonitor,
    SafetyStatus,
};
