//! Range checks for [`EngineConfig`](crate::EngineConfig).
//!
//! The core clamps bad values silently; validation exists so a hand-edited
//! file is reported before it is clamped. Every issue is collected, not just
//! the first.
//!
//! # Example
//!
//! ```rust
//! use tactus_config::{EngineConfig, ValidationError};
//!
//! let mut config = EngineConfig::default();
//! assert!(config.validate().is_ok());
//!
//! config.audio.buffer_size = 4;
//! config.clock.bpm = 400.0;
//! match config.validate() {
//!     Err(ValidationError::Multiple(issues)) => assert_eq!(issues.len(), 2),
//!     other => panic!("expected two issues, got {other:?}"),
//! }
//! ```

use thiserror::Error;

use crate::EngineConfig;

/// Accepted sample rates in Hz.
pub const SAMPLE_RATE_RANGE: (f64, f64) = (8_000.0, 384_000.0);
/// Accepted buffer sizes in frames.
pub const BUFFER_SIZE_RANGE: (usize, usize) = (16, 8192);
/// Accepted jitter history lengths.
pub const HISTORY_RANGE: (usize, usize) = (100, 1000);
/// Accepted tempi in BPM.
pub const TEMPO_RANGE: (f64, f64) = (60.0, 200.0);

/// A configuration value outside its accepted range.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Value outside `[min, max]`.
    #[error("'{field}' value {value} out of range [{min}, {max}]")]
    OutOfRange {
        /// Dotted path of the field, e.g. `audio.sample_rate`.
        field: String,
        /// The rejected value.
        value: f64,
        /// Minimum allowed value.
        min: f64,
        /// Maximum allowed value.
        max: f64,
    },

    /// Value must be zero or more.
    #[error("'{field}' must not be negative (got {value})")]
    Negative {
        /// Dotted path of the field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// Value must be strictly positive.
    #[error("'{field}' must be positive (got {value})")]
    NotPositive {
        /// Dotted path of the field.
        field: String,
        /// The rejected value.
        value: f64,
    },

    /// Multiple validation errors.
    #[error("{}", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<ValidationError>),
}

impl ValidationError {
    /// Number of individual issues carried.
    pub fn len(&self) -> usize {
        match self {
            ValidationError::Multiple(issues) => issues.len(),
            _ => 1,
        }
    }

    /// Always `false`; a validation error carries at least one issue.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Individual issues, flattened.
    pub fn issues(&self) -> Vec<&ValidationError> {
        match self {
            ValidationError::Multiple(issues) => issues.iter().collect(),
            single => vec![single],
        }
    }
}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Collects issues while walking the configuration.
#[derive(Default)]
struct Issues(Vec<ValidationError>);

impl Issues {
    fn range(&mut self, field: &str, value: f64, (min, max): (f64, f64)) {
        if !(value.is_finite() && (min..=max).contains(&value)) {
            self.0.push(ValidationError::OutOfRange {
                field: field.to_string(),
                value,
                min,
                max,
            });
        }
    }

    fn range_usize(&mut self, field: &str, value: usize, (min, max): (usize, usize)) {
        self.range(field, value as f64, (min as f64, max as f64));
    }

    fn non_negative(&mut self, field: &str, value: f64) {
        if !(value.is_finite() && value >= 0.0) {
            self.0.push(ValidationError::Negative {
                field: field.to_string(),
                value,
            });
        }
    }

    fn positive(&mut self, field: &str, value: f64) {
        if !(value.is_finite() && value > 0.0) {
            self.0.push(ValidationError::NotPositive {
                field: field.to_string(),
                value,
            });
        }
    }

    fn finish(mut self) -> ValidationResult<()> {
        match self.0.len() {
            0 => Ok(()),
            1 => Err(self.0.remove(0)),
            _ => Err(ValidationError::Multiple(self.0)),
        }
    }
}

/// Checks every field of `config`.
///
/// Returns the single issue directly, or [`ValidationError::Multiple`] when
/// more than one field is wrong.
pub fn validate_engine_config(config: &EngineConfig) -> ValidationResult<()> {
    let mut issues = Issues::default();

    let audio = &config.audio;
    issues.range("audio.sample_rate", audio.sample_rate, SAMPLE_RATE_RANGE);
    issues.range_usize("audio.buffer_size", audio.buffer_size, BUFFER_SIZE_RANGE);

    let clock = &config.clock;
    issues.range("clock.bpm", clock.bpm, TEMPO_RANGE);
    issues.positive("clock.beats_per_bar", f64::from(clock.beats_per_bar));
    issues.positive("clock.beat_unit", f64::from(clock.beat_unit));
    issues.positive(
        "clock.ticks_per_quarter_note",
        f64::from(clock.ticks_per_quarter_note),
    );
    issues.non_negative("clock.max_jitter_tolerance", clock.max_jitter_tolerance);
    issues.range_usize(
        "clock.jitter_history_size",
        clock.jitter_history_size,
        HISTORY_RANGE,
    );
    issues.non_negative("clock.drift_threshold", clock.drift_threshold);
    issues.positive("clock.max_drift_correction", clock.max_drift_correction);
    issues.non_negative("clock.external_sync_tolerance", clock.external_sync_tolerance);

    let graph = &config.graph;
    issues.positive("graph.max_nodes", graph.max_nodes as f64);
    issues.positive("graph.max_connections", graph.max_connections as f64);

    let monitor = &config.monitor;
    issues.range("monitor.safety_threshold", monitor.safety_threshold, (0.0, 100.0));
    issues.positive("monitor.miss_capacity", monitor.miss_capacity as f64);

    issues.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(validate_engine_config(&EngineConfig::default()), Ok(()));
    }

    #[test]
    fn test_single_issue_is_not_wrapped() {
        let mut config = EngineConfig::default();
        config.audio.sample_rate = 4000.0;
        let err = validate_engine_config(&config).unwrap_err();
        assert_eq!(
            err,
            ValidationError::OutOfRange {
                field: "audio.sample_rate".to_string(),
                value: 4000.0,
                min: 8000.0,
                max: 384000.0,
            }
        );
        assert_eq!(err.len(), 1);
    }

    #[test]
    fn test_all_issues_are_listed() {
        let mut config = EngineConfig::default();
        config.audio.buffer_size = 16384;
        config.clock.jitter_history_size = 50;
        config.clock.max_jitter_tolerance = -1.0;
        config.clock.max_drift_correction = 0.0;
        config.graph.max_nodes = 0;
        config.monitor.safety_threshold = 120.0;

        let err = validate_engine_config(&config).unwrap_err();
        assert_eq!(err.len(), 6);
        let fields: Vec<String> = err
            .issues()
            .iter()
            .map(|issue| match issue {
                ValidationError::OutOfRange { field, .. }
                | ValidationError::Negative { field, .. }
                | ValidationError::NotPositive { field, .. } => field.clone(),
                ValidationError::Multiple(_) => unreachable!(),
            })
            .collect();
        assert_eq!(
            fields,
            [
                "audio.buffer_size",
                "clock.max_jitter_tolerance",
                "clock.jitter_history_size",
                "clock.max_drift_correction",
                "graph.max_nodes",
                "monitor.safety_threshold",
            ]
        );
    }

    #[test]
    fn test_range_bounds_are_inclusive() {
        let mut config = EngineConfig::default();
        config.audio.sample_rate = 8000.0;
        config.audio.buffer_size = 8192;
        config.clock.bpm = 200.0;
        config.clock.jitter_history_size = 100;
        config.clock.max_jitter_tolerance = 0.0;
        config.monitor.safety_threshold = 0.0;
        assert!(validate_engine_config(&config).is_ok());
    }

    #[test]
    fn test_nan_is_rejected() {
        let mut config = EngineConfig::default();
        config.clock.bpm = f64::NAN;
        config.clock.drift_threshold = f64::NAN;
        assert_eq!(validate_engine_config(&config).unwrap_err().len(), 2);
    }

    #[test]
    fn test_multiple_display_joins_issues() {
        let mut config = EngineConfig::default();
        config.clock.beats_per_bar = 0;
        config.monitor.miss_capacity = 0;
        let msg = validate_engine_config(&config).unwrap_err().to_string();
        assert!(msg.contains("clock.beats_per_bar"), "got: {msg}");
        assert!(msg.contains("; "), "got: {msg}");
        assert!(msg.contains("monitor.miss_capacity"), "got: {msg}");
    }
}
