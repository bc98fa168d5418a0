//! Per-callback timing snapshots and the statistics they carry.

use super::musical::{MusicalPosition, NoteDivision, TimeSignature};
use super::precision::ClockState;

/// Where the clock takes its notion of "now" from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SyncSource {
    /// The audio device's own sample clock.
    #[default]
    Internal,
    /// MIDI beat clock (24 PPQN).
    MidiClock,
    /// Ableton Link session.
    AbletonLink,
    /// Hardware word clock.
    WordClock,
    /// SMPTE / MTC timecode.
    Timecode,
}

impl SyncSource {
    /// Short lowercase name, as used in config files and reports.
    pub fn name(&self) -> &'static str {
        match self {
            SyncSource::Internal => "internal",
            SyncSource::MidiClock => "midi_clock",
            SyncSource::AbletonLink => "ableton_link",
            SyncSource::WordClock => "word_clock",
            SyncSource::Timecode => "timecode",
        }
    }
}

impl core::fmt::Display for SyncSource {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// Lock state of the authoritative sync source.
///
/// The internal source is always locked. Switching to an external source
/// starts unlocked until a correction within tolerance arrives.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ClockSyncStatus {
    /// Active sync source.
    pub source: SyncSource,
    /// Whether the last external correction was within tolerance.
    pub locked: bool,
    /// Adopted offset to the external source, in seconds.
    pub offset_seconds: f64,
}

impl Default for ClockSyncStatus {
    fn default() -> Self {
        Self {
            source: SyncSource::Internal,
            locked: true,
            offset_seconds: 0.0,
        }
    }
}

/// Rolling jitter and drift statistics.
///
/// All jitter figures are in samples. Statistics cover the retained history
/// only, so they describe recent behaviour rather than the whole session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AccuracyMetrics {
    /// Mean absolute jitter.
    pub average_jitter: f64,
    /// Largest absolute jitter in the history.
    pub max_jitter: f64,
    /// Standard deviation of the signed jitter.
    pub jitter_std_dev: f64,
    /// Most recent jitter measurement.
    pub last_jitter: f64,
    /// Mean per-callback period error, in samples per buffer.
    pub drift_per_buffer: f64,
    /// Host clock rate error relative to the sample clock, in parts per million.
    pub drift_ppm: f64,
    /// Percentage of history entries within the jitter tolerance.
    pub timing_accuracy: f64,
    /// Corrections applied since the last start (jitter, drift, and external sync).
    pub correction_count: u64,
    /// Number of jitter measurements retained.
    pub history_len: usize,
}

impl Default for AccuracyMetrics {
    fn default() -> Self {
        Self {
            average_jitter: 0.0,
            max_jitter: 0.0,
            jitter_std_dev: 0.0,
            last_jitter: 0.0,
            drift_per_buffer: 0.0,
            drift_ppm: 0.0,
            timing_accuracy: 100.0,
            correction_count: 0,
            history_len: 0,
        }
    }
}

/// Immutable timing snapshot produced once per audio callback.
///
/// `sample_position` is the position at the *start* of the buffer the
/// snapshot was produced for; the clock has already advanced past it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PrecisionTimingInfo {
    /// Authoritative sample position at the start of the buffer.
    pub sample_position: u64,
    /// Sub-sample correction state, always within ±1 sample.
    pub fractional_offset: f64,
    /// Host timestamp passed to the callback, in seconds.
    pub host_time: f64,
    /// Elapsed audio time, `sample_position / sample_rate`.
    pub audio_time: f64,
    /// Frames in this buffer.
    pub buffer_size: usize,
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Tempo in BPM.
    pub bpm: f64,
    /// Active time signature.
    pub time_signature: TimeSignature,
    /// Musical position of `sample_position`.
    pub musical_position: MusicalPosition,
    /// Jitter and drift statistics.
    pub accuracy: AccuracyMetrics,
    /// External sync state.
    pub sync: ClockSyncStatus,
    /// Transport state when the snapshot was taken.
    pub state: ClockState,
}

impl PrecisionTimingInfo {
    /// Length of `division` in samples at this snapshot's tempo.
    pub fn samples_per_division(&self, division: NoteDivision) -> f64 {
        division.to_samples(self.bpm, self.sample_rate)
    }

    /// Samples from `sample_position` to the next `division` boundary.
    ///
    /// Returns 0 when the position lies on a boundary.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tactus_core::{ClockConfig, NoteDivision, PrecisionClock};
    ///
    /// let clock = PrecisionClock::new(ClockConfig::default());
    /// clock.start();
    /// let timing = clock.process_buffer(0.0, 6000);
    /// assert_eq!(timing.samples_until_next(NoteDivision::Quarter), 0.0);
    ///
    /// // 120 BPM at 48 kHz: a quarter note is 24000 samples.
    /// let timing = clock.process_buffer(0.125, 512);
    /// assert!((timing.samples_until_next(NoteDivision::Quarter) - 18000.0).abs() < 1e-9);
    /// ```
    pub fn samples_until_next(&self, division: NoteDivision) -> f64 {
        let length = self.samples_per_division(division);
        if !(length.is_finite() && length > 0.0) {
            return 0.0;
        }
        let into = (self.sample_position as f64).rem_euclid(length);
        if into < 1e-9 || length - into < 1e-9 {
            0.0
        } else {
            length - into
        }
    }

    /// Whether the clock was running when the snapshot was taken.
    pub fn is_running(&self) -> bool {
        self.state == ClockState::Running
    }
}
