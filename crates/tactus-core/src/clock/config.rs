//! Clock configuration.

use super::history::{MAX_HISTORY, MIN_HISTORY};
use super::musical::{DEFAULT_TICKS_PER_QUARTER_NOTE, MAX_BPM, MIN_BPM, TimeSignature};

/// Construction-time settings for a [`PrecisionClock`](super::PrecisionClock).
///
/// Out-of-range values are clamped by [`PrecisionClock::new`](super::PrecisionClock::new)
/// rather than rejected.
#[derive(Clone, Debug, PartialEq)]
pub struct ClockConfig {
    /// Audio sample rate in Hz.
    pub sample_rate: f64,
    /// Nominal frames per hardware callback.
    pub buffer_size: usize,
    /// Tick grid resolution.
    pub ticks_per_quarter_note: u32,
    /// Initial tempo in BPM (clamped to 60..=200).
    pub bpm: f64,
    /// Initial time signature.
    pub time_signature: TimeSignature,
    /// Measure callback jitter and nudge the sub-sample offset when it is large.
    pub jitter_compensation: bool,
    /// Track the host clock's rate against the sample clock and correct for it.
    pub drift_compensation: bool,
    /// Jitter (in samples) tolerated before a correction is applied.
    pub max_jitter_tolerance: f64,
    /// Number of jitter and drift measurements retained (clamped to 100..=1000).
    pub jitter_history_size: usize,
    /// Mean per-callback period error (in samples) above which drift is corrected.
    pub drift_threshold: f64,
    /// Largest drift correction applied in one callback, in samples.
    pub max_drift_correction: f64,
    /// Largest external sync offset (in seconds) that still counts as locked.
    pub external_sync_tolerance: f64,
}

impl ClockConfig {
    /// Small history and tight tolerance for low buffer sizes.
    pub fn low_latency() -> Self {
        Self {
            buffer_size: 64,
            max_jitter_tolerance: 0.5,
            jitter_history_size: MIN_HISTORY,
            drift_threshold: 0.005,
            max_drift_correction: 0.01,
            ..Self::default()
        }
    }

    /// Full history and loose per-callback correction for long sessions.
    pub fn high_precision() -> Self {
        Self {
            buffer_size: 1024,
            max_jitter_tolerance: 2.0,
            jitter_history_size: MAX_HISTORY,
            drift_threshold: 0.01,
            max_drift_correction: 0.02,
            external_sync_tolerance: 0.0005,
            ..Self::default()
        }
    }

    /// Sets the sample rate and buffer size.
    pub fn with_audio(mut self, sample_rate: f64, buffer_size: usize) -> Self {
        self.sample_rate = sample_rate;
        self.buffer_size = buffer_size;
        self
    }

    /// Returns a copy with every field forced into its accepted range.
    pub(crate) fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let positive = |value: f64, fallback: f64| {
            if value.is_finite() && value > 0.0 {
                value
            } else {
                fallback
            }
        };
        let non_negative = |value: f64, fallback: f64| {
            if value.is_finite() && value >= 0.0 {
                value
            } else {
                fallback
            }
        };
        Self {
            sample_rate: positive(self.sample_rate, defaults.sample_rate),
            buffer_size: self.buffer_size.max(1),
            ticks_per_quarter_note: self.ticks_per_quarter_note.max(1),
            bpm: if self.bpm.is_finite() {
                self.bpm.clamp(MIN_BPM, MAX_BPM)
            } else {
                defaults.bpm
            },
            time_signature: TimeSignature::new(
                self.time_signature.numerator,
                self.time_signature.denominator,
            ),
            jitter_compensation: self.jitter_compensation,
            drift_compensation: self.drift_compensation,
            max_jitter_tolerance: non_negative(
                self.max_jitter_tolerance,
                defaults.max_jitter_tolerance,
            ),
            jitter_history_size: self.jitter_history_size.clamp(MIN_HISTORY, MAX_HISTORY),
            drift_threshold: non_negative(self.drift_threshold, defaults.drift_threshold),
            max_drift_correction: non_negative(
                self.max_drift_correction,
                defaults.max_drift_correction,
            ),
            external_sync_tolerance: non_negative(
                self.external_sync_tolerance,
                defaults.external_sync_tolerance,
            ),
        }
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            buffer_size: 512,
            ticks_per_quarter_note: DEFAULT_TICKS_PER_QUARTER_NOTE,
            bpm: 120.0,
            time_signature: TimeSignature::default(),
            jitter_compensation: true,
            drift_compensation: true,
            max_jitter_tolerance: 1.0,
            jitter_history_size: 500,
            drift_threshold: 0.02,
            max_drift_correction: 0.05,
            external_sync_tolerance: 0.001,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets_span_history_range() {
        assert_eq!(ClockConfig::low_latency().jitter_history_size, MIN_HISTORY);
        assert_eq!(ClockConfig::high_precision().jitter_history_size, MAX_HISTORY);
    }

    #[test]
    fn test_sanitize_clamps_out_of_range_values() {
        let config = ClockConfig {
            sample_rate: -1.0,
            buffer_size: 0,
            ticks_per_quarter_note: 0,
            bpm: 500.0,
            time_signature: TimeSignature {
                numerator: 0,
                denominator: 0,
            },
            max_jitter_tolerance: f64::NAN,
            jitter_history_size: 5,
            ..ClockConfig::default()
        }
        .sanitized();

        assert_eq!(config.sample_rate, 48000.0);
        assert_eq!(config.buffer_size, 1);
        assert_eq!(config.ticks_per_quarter_note, 1);
        assert_eq!(config.bpm, MAX_BPM);
        assert_eq!(config.time_signature, TimeSignature::new(1, 1));
        assert_eq!(config.max_jitter_tolerance, 1.0);
        assert_eq!(config.jitter_history_size, MIN_HISTORY);
    }

    #[test]
    fn test_with_audio_overrides_rate_and_buffer() {
        let config = ClockConfig::default().with_audio(44100.0, 441);
        assert_eq!(config.sample_rate, 44100.0);
        assert_eq!(config.buffer_size, 441);
    }
}
