//! Sample-accurate transport clock with jitter and drift compensation.

use parking_lot::Mutex;

use super::config::ClockConfig;
use super::history::History;
use super::musical::{MAX_BPM, MIN_BPM, MusicalPosition, TimeSignature};
use super::timing::{AccuracyMetrics, ClockSyncStatus, PrecisionTimingInfo, SyncSource};

/// Fraction of a measured jitter folded into the sub-sample offset per callback.
const JITTER_CORRECTION_GAIN: f64 = 0.1;

/// Drift measurements needed before the drift mean is trusted.
const MIN_DRIFT_SAMPLES: usize = 8;

/// Bound on the accumulated sub-sample offset, in samples.
const MAX_FRACTIONAL_OFFSET: f64 = 1.0;

/// Transport state of a [`PrecisionClock`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ClockState {
    /// Not advancing. The sample position is kept until the next start.
    #[default]
    Stopped,
    /// Advancing by one buffer per callback.
    Running,
    /// Frozen. Resuming continues from the same sample position.
    Paused,
}

struct ClockInner {
    config: ClockConfig,
    state: ClockState,
    bpm: f64,
    time_signature: TimeSignature,
    sample_position: u64,
    fractional_offset: f64,
    /// Host time that maps to sample 0. `None` re-anchors on the next callback.
    host_base: Option<f64>,
    /// Host time and buffer size of the previous running callback.
    previous: Option<(f64, usize)>,
    last_host_time: f64,
    last_buffer_size: usize,
    jitter: History,
    drift: History,
    correction_count: u64,
    sync: ClockSyncStatus,
}

impl ClockInner {
    fn new(config: ClockConfig) -> Self {
        let config = config.sanitized();
        Self {
            state: ClockState::Stopped,
            bpm: config.bpm,
            time_signature: config.time_signature,
            sample_position: 0,
            fractional_offset: 0.0,
            host_base: None,
            previous: None,
            last_host_time: 0.0,
            last_buffer_size: config.buffer_size,
            jitter: History::new(config.jitter_history_size),
            drift: History::new(config.jitter_history_size),
            correction_count: 0,
            sync: ClockSyncStatus::default(),
            config,
        }
    }

    fn full_reset(&mut self) {
        self.sample_position = 0;
        self.fractional_offset = 0.0;
        self.jitter.clear();
        self.correction_count = 0;
        self.reanchor();
    }

    /// Forgets the host-time mapping. The next running callback re-establishes it.
    fn reanchor(&mut self) {
        self.host_base = None;
        self.previous = None;
        self.drift.clear();
    }

    /// Drops external sync. Re-anchors if a non-zero offset was in effect.
    fn clear_sync(&mut self) {
        if self.sync.offset_seconds != 0.0 {
            self.host_base = None;
        }
        self.sync = ClockSyncStatus::default();
    }

    fn nudge(&mut self, samples: f64) {
        self.fractional_offset = (self.fractional_offset + samples)
            .clamp(-MAX_FRACTIONAL_OFFSET, MAX_FRACTIONAL_OFFSET);
        self.correction_count += 1;
    }

    fn measure_jitter(&mut self, host_time: f64) {
        let sample_rate = self.config.sample_rate;
        let position = self.sample_position as f64 + self.fractional_offset;
        let sync_offset = self.sync.offset_seconds;

        let base = *self
            .host_base
            .get_or_insert_with(|| host_time - position / sample_rate - sync_offset);

        let host_estimate = (host_time - base) * sample_rate;
        let jitter = host_estimate - position - sync_offset * sample_rate;

        if self.config.jitter_compensation {
            self.jitter.push(jitter);
            if jitter.abs() > self.config.max_jitter_tolerance {
                self.nudge(jitter * JITTER_CORRECTION_GAIN);
            }
        }
    }

    fn measure_drift(&mut self, host_time: f64) {
        if !self.config.drift_compensation {
            return;
        }
        let Some((previous_time, previous_size)) = self.previous else {
            return;
        };

        let interval = (host_time - previous_time) * self.config.sample_rate;
        self.drift.push(interval - previous_size as f64);

        if self.drift.len() >= MIN_DRIFT_SAMPLES {
            let mean = self.drift.mean();
            if mean.abs() > self.config.drift_threshold {
                let limit = self.config.max_drift_correction;
                self.nudge(mean.clamp(-limit, limit));
            }
        }
    }

    fn accuracy(&self) -> AccuracyMetrics {
        let drift_per_buffer = self.drift.mean();
        let drift_ppm = if self.last_buffer_size == 0 {
            0.0
        } else {
            drift_per_buffer / self.last_buffer_size as f64 * 1e6
        };
        let timing_accuracy = if self.jitter.is_empty() {
            100.0
        } else {
            self.jitter.count_within(self.config.max_jitter_tolerance) as f64
                / self.jitter.len() as f64
                * 100.0
        };
        AccuracyMetrics {
            average_jitter: self.jitter.mean_abs(),
            max_jitter: self.jitter.max_abs(),
            jitter_std_dev: self.jitter.std_dev(),
            last_jitter: self.jitter.last().unwrap_or(0.0),
            drift_per_buffer,
            drift_ppm,
            timing_accuracy,
            correction_count: self.correction_count,
            history_len: self.jitter.len(),
        }
    }

    fn snapshot(
        &self,
        sample_position: u64,
        host_time: f64,
        buffer_size: usize,
    ) -> PrecisionTimingInfo {
        let sample_rate = self.config.sample_rate;
        PrecisionTimingInfo {
            sample_position,
            fractional_offset: self.fractional_offset,
            host_time,
            audio_time: sample_position as f64 / sample_rate,
            buffer_size,
            sample_rate,
            bpm: self.bpm,
            time_signature: self.time_signature,
            musical_position: MusicalPosition::from_samples(
                sample_position,
                sample_rate,
                self.bpm,
                self.time_signature,
                self.config.ticks_per_quarter_note,
            ),
            accuracy: self.accuracy(),
            sync: self.sync,
            state: self.state,
        }
    }
}

/// Authoritative sample clock for the render thread.
///
/// Once per hardware callback the audio thread calls
/// [`process_buffer`](Self::process_buffer) with the host timestamp of the
/// buffer. The clock advances its sample position by exactly the buffer size
/// and uses the host timestamp only to measure jitter and drift, which nudge a
/// bounded sub-sample offset. Musical position is derived from the sample
/// position on every call.
///
/// All methods take `&self`; share the clock between the audio and control
/// threads with `Arc`. State sits behind one short-held mutex and
/// `process_buffer` never allocates.
///
/// # Example
///
/// ```rust
/// use tactus_core::{ClockConfig, PrecisionClock};
///
/// let clock = PrecisionClock::new(ClockConfig::default().with_audio(44100.0, 441));
/// clock.start();
///
/// for i in 0..200_u32 {
///     clock.process_buffer(f64::from(i) * 0.01, 441);
/// }
///
/// // 88200 samples at 120 BPM in 4/4: the downbeat of bar 2.
/// let timing = clock.current_timing();
/// assert_eq!(timing.sample_position, 88_200);
/// assert_eq!((timing.musical_position.bar, timing.musical_position.beat), (2, 1));
/// assert_eq!(timing.accuracy.correction_count, 0);
/// ```
pub struct PrecisionClock {
    inner: Mutex<ClockInner>,
}

impl PrecisionClock {
    /// Creates a stopped clock. Out-of-range configuration values are clamped.
    pub fn new(config: ClockConfig) -> Self {
        Self {
            inner: Mutex::new(ClockInner::new(config)),
        }
    }

    /// Starts the transport from sample 0.
    ///
    /// Does nothing while already running. From Stopped or Paused this resets
    /// the sample position, sub-sample offset, host-time anchor, and history.
    pub fn start(&self) {
        let mut inner = self.inner.lock();
        if inner.state == ClockState::Running {
            return;
        }
        inner.full_reset();
        inner.state = ClockState::Running;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "clock_start: {} Hz, {} BPM",
            inner.config.sample_rate,
            inner.bpm
        );
    }

    /// Stops the transport, keeping the sample position.
    pub fn stop(&self) {
        let mut inner = self.inner.lock();
        if inner.state == ClockState::Stopped {
            return;
        }
        inner.state = ClockState::Stopped;

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_stop: at sample {}", inner.sample_position);
    }

    /// Freezes a running transport.
    pub fn pause(&self) {
        let mut inner = self.inner.lock();
        if inner.state != ClockState::Running {
            return;
        }
        inner.state = ClockState::Paused;

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_pause: at sample {}", inner.sample_position);
    }

    /// Continues a paused transport from the frozen position.
    ///
    /// Wall-clock time spent paused is not counted: the next callback
    /// re-anchors the host-time mapping to the frozen position.
    pub fn resume(&self) {
        let mut inner = self.inner.lock();
        if inner.state != ClockState::Paused {
            return;
        }
        inner.reanchor();
        inner.state = ClockState::Running;

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_resume: at sample {}", inner.sample_position);
    }

    /// Processes one hardware callback.
    ///
    /// `host_time` is the host timestamp of the buffer in seconds on any
    /// monotonic timeline; only differences between calls matter. While the
    /// clock is not running the snapshot is returned without advancing or
    /// measuring anything.
    ///
    /// A running clock always advances by `buffer_size`. A non-finite
    /// `host_time` only skips measurement, and the next drift interval starts
    /// from the following finite timestamp.
    pub fn process_buffer(&self, host_time: f64, buffer_size: usize) -> PrecisionTimingInfo {
        let mut inner = self.inner.lock();
        inner.last_host_time = host_time;

        if inner.state != ClockState::Running {
            let position = inner.sample_position;
            return inner.snapshot(position, host_time, buffer_size);
        }

        if host_time.is_finite() {
            inner.measure_jitter(host_time);
            inner.measure_drift(host_time);
            inner.previous = Some((host_time, buffer_size));
        } else {
            inner.previous = None;
        }
        inner.last_buffer_size = buffer_size;

        let position = inner.sample_position;
        let timing = inner.snapshot(position, host_time, buffer_size);
        inner.sample_position = position.saturating_add(buffer_size as u64);
        timing
    }

    /// Snapshot of the current position without advancing.
    pub fn current_timing(&self) -> PrecisionTimingInfo {
        let inner = self.inner.lock();
        inner.snapshot(inner.sample_position, inner.last_host_time, inner.last_buffer_size)
    }

    /// Current sample position (the start of the next buffer).
    pub fn sample_position(&self) -> u64 {
        self.inner.lock().sample_position
    }

    /// Current transport state.
    pub fn state(&self) -> ClockState {
        self.inner.lock().state
    }

    /// Current tempo in BPM.
    pub fn bpm(&self) -> f64 {
        self.inner.lock().bpm
    }

    /// Current time signature.
    pub fn time_signature(&self) -> TimeSignature {
        self.inner.lock().time_signature
    }

    /// Current sample rate in Hz.
    pub fn sample_rate(&self) -> f64 {
        self.inner.lock().config.sample_rate
    }

    /// Current external sync state.
    pub fn sync_status(&self) -> ClockSyncStatus {
        self.inner.lock().sync
    }

    /// Sets the tempo, clamped to 60..=200 BPM. Non-finite values are ignored.
    pub fn set_tempo(&self, bpm: f64) {
        if !bpm.is_finite() {
            return;
        }
        self.inner.lock().bpm = bpm.clamp(MIN_BPM, MAX_BPM);
    }

    /// Sets the time signature. Both fields are clamped to at least 1.
    pub fn set_time_signature(&self, numerator: u32, denominator: u32) {
        self.inner.lock().time_signature = TimeSignature::new(numerator, denominator);
    }

    /// Returns to sample 0 without changing the transport state.
    pub fn reset_musical_position(&self) {
        let mut inner = self.inner.lock();
        inner.sample_position = 0;
        inner.fractional_offset = 0.0;
        inner.reanchor();

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_reset: musical position");
    }

    /// Applies a new device sample rate. Non-positive or non-finite values are ignored.
    pub fn set_sample_rate(&self, sample_rate: f64) {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return;
        }
        let mut inner = self.inner.lock();
        inner.config.sample_rate = sample_rate;
        inner.reanchor();

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_reconfigure: sample rate {sample_rate} Hz");
    }

    /// Applies a new nominal buffer size. Zero is ignored.
    pub fn set_buffer_size(&self, buffer_size: usize) {
        if buffer_size == 0 {
            return;
        }
        let mut inner = self.inner.lock();
        inner.config.buffer_size = buffer_size;
        inner.last_buffer_size = buffer_size;
        inner.reanchor();

        #[cfg(feature = "tracing")]
        tracing::debug!("clock_reconfigure: buffer size {buffer_size}");
    }

    /// Makes `source` authoritative. The clock reports unlocked until a
    /// correction within tolerance is applied.
    pub fn enable_external_sync(&self, source: SyncSource) {
        let mut inner = self.inner.lock();
        if source == SyncSource::Internal {
            inner.clear_sync();
            return;
        }
        inner.sync.source = source;
        inner.sync.locked = false;

        #[cfg(feature = "tracing")]
        tracing::info!("clock_sync: following {source}");
    }

    /// Returns to the internal sample clock and clears the sync offset.
    pub fn disable_external_sync(&self) {
        let mut inner = self.inner.lock();
        if inner.sync.source == SyncSource::Internal {
            return;
        }
        inner.clear_sync();

        #[cfg(feature = "tracing")]
        tracing::info!("clock_sync: back to internal");
    }

    /// Feeds the measured offset to the external source, in seconds.
    ///
    /// Within `external_sync_tolerance` the offset is adopted from the next
    /// callback on and the clock reports locked. Outside it the clock reports
    /// unlocked and keeps the previous offset.
    pub fn apply_external_sync_correction(&self, offset_seconds: f64) {
        let mut inner = self.inner.lock();
        let tolerance = inner.config.external_sync_tolerance;
        if offset_seconds.is_finite() && offset_seconds.abs() <= tolerance {
            // The host-time anchor bakes in the offset current when it was
            // taken; a new offset needs a new anchor.
            if inner.sync.offset_seconds != offset_seconds {
                inner.host_base = None;
            }
            inner.sync.offset_seconds = offset_seconds;
            inner.sync.locked = true;
            inner.correction_count += 1;
        } else {
            #[cfg(feature = "tracing")]
            if inner.sync.locked {
                tracing::warn!("clock_sync: lost lock, offset {offset_seconds}s");
            }
            inner.sync.locked = false;
        }
    }
}

impl Default for PrecisionClock {
    fn default() -> Self {
        Self::new(ClockConfig::default())
    }
}

impl core::fmt::Debug for PrecisionClock {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("PrecisionClock")
            .field("state", &inner.state)
            .field("sample_position", &inner.sample_position)
            .field("bpm", &inner.bpm)
            .field("time_signature", &inner.time_signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f64 = 48000.0;
    const BLOCK: usize = 512;

    fn running_clock(config: ClockConfig) -> PrecisionClock {
        let clock = PrecisionClock::new(config);
        clock.start();
        clock
    }

    /// Drives `count` callbacks spaced exactly one buffer apart, starting at `t0`.
    /// Returns the host time of the next callback.
    fn drive(clock: &PrecisionClock, t0: f64, count: usize) -> f64 {
        let period = BLOCK as f64 / SR;
        for i in 0..count {
            clock.process_buffer(t0 + i as f64 * period, BLOCK);
        }
        t0 + count as f64 * period
    }

    #[test]
    fn test_position_advances_by_buffer_size() {
        let clock = running_clock(ClockConfig::default());
        drive(&clock, 10.0, 100);
        assert_eq!(clock.sample_position(), 100 * BLOCK as u64);
        let timing = clock.current_timing();
        assert_eq!(timing.accuracy.correction_count, 0);
        assert_eq!(timing.fractional_offset, 0.0);
        assert!(timing.accuracy.max_jitter < 1e-6);
    }

    #[test]
    fn test_snapshot_reports_position_before_advance() {
        let clock = running_clock(ClockConfig::default());
        let first = clock.process_buffer(0.0, BLOCK);
        let second = clock.process_buffer(BLOCK as f64 / SR, BLOCK);
        assert_eq!(first.sample_position, 0);
        assert_eq!(second.sample_position, BLOCK as u64);
        assert!(second.is_running());
    }

    #[test]
    fn test_stopped_clock_does_not_advance() {
        let clock = PrecisionClock::default();
        let timing = clock.process_buffer(1.0, BLOCK);
        assert_eq!(timing.state, ClockState::Stopped);
        assert_eq!(timing.host_time, 1.0);
        assert_eq!(clock.sample_position(), 0);
        assert_eq!(timing.accuracy.history_len, 0);
    }

    #[test]
    fn test_bar_two_after_one_bar_of_samples() {
        let clock = running_clock(ClockConfig::default().with_audio(44100.0, 441));
        for i in 0..200_u32 {
            clock.process_buffer(f64::from(i) * 0.01, 441);
        }
        let pos = clock.current_timing().musical_position;
        assert_eq!((pos.bar, pos.beat, pos.tick), (2, 1, 0));
    }

    #[test]
    fn test_tempo_clamps() {
        let clock = PrecisionClock::default();
        clock.set_tempo(300.0);
        assert_eq!(clock.bpm(), 200.0);
        clock.set_tempo(10.0);
        assert_eq!(clock.bpm(), 60.0);
        clock.set_tempo(f64::NAN);
        assert_eq!(clock.bpm(), 60.0);
    }

    #[test]
    fn test_time_signature_clamps() {
        let clock = PrecisionClock::default();
        clock.set_time_signature(0, 8);
        assert_eq!(clock.time_signature(), TimeSignature::new(1, 8));
    }

    #[test]
    fn test_start_while_running_is_noop() {
        let clock = running_clock(ClockConfig::default());
        drive(&clock, 0.0, 4);
        clock.start();
        assert_eq!(clock.sample_position(), 4 * BLOCK as u64);
        assert_eq!(clock.state(), ClockState::Running);
    }

    #[test]
    fn test_stop_keeps_position_and_start_resets() {
        let clock = running_clock(ClockConfig::default());
        drive(&clock, 0.0, 3);
        clock.stop();
        clock.stop();
        assert_eq!(clock.state(), ClockState::Stopped);
        assert_eq!(clock.sample_position(), 3 * BLOCK as u64);

        clock.start();
        assert_eq!(clock.sample_position(), 0);
    }

    #[test]
    fn test_pause_freezes_and_excludes_paused_interval() {
        let clock = running_clock(ClockConfig::default());
        let next = drive(&clock, 0.0, 10);
        clock.pause();
        assert_eq!(clock.state(), ClockState::Paused);

        // Callbacks keep arriving while paused.
        let frozen = clock.process_buffer(next, BLOCK);
        assert_eq!(frozen.sample_position, 10 * BLOCK as u64);
        assert_eq!(clock.sample_position(), 10 * BLOCK as u64);

        // Five seconds of wall time pass before resuming.
        clock.resume();
        drive(&clock, next + 5.0, 10);

        let timing = clock.current_timing();
        assert_eq!(timing.sample_position, 20 * BLOCK as u64);
        assert_eq!(timing.accuracy.correction_count, 0);
        assert!(timing.accuracy.last_jitter.abs() < 1e-6);
    }

    #[test]
    fn test_pause_ignored_unless_running() {
        let clock = PrecisionClock::default();
        clock.pause();
        assert_eq!(clock.state(), ClockState::Stopped);
        clock.resume();
        assert_eq!(clock.state(), ClockState::Stopped);
    }

    #[test]
    fn test_large_jitter_is_corrected_gently() {
        let clock = running_clock(ClockConfig::default());
        let next = drive(&clock, 0.0, 4);
        // Ten samples late.
        let timing = clock.process_buffer(next + 10.0 / SR, BLOCK);
        assert_eq!(timing.accuracy.correction_count, 1);
        assert!((timing.fractional_offset - 1.0).abs() < 1e-9);
        assert!((timing.accuracy.last_jitter - 10.0).abs() < 1e-6);
        assert_eq!(clock.sample_position(), 5 * BLOCK as u64);
    }

    #[test]
    fn test_small_jitter_within_tolerance_is_ignored() {
        let clock = running_clock(ClockConfig::default());
        let next = drive(&clock, 0.0, 4);
        let timing = clock.process_buffer(next + 0.5 / SR, BLOCK);
        assert_eq!(timing.accuracy.correction_count, 0);
        assert_eq!(timing.fractional_offset, 0.0);
    }

    #[test]
    fn test_jitter_compensation_disabled() {
        let clock = running_clock(ClockConfig {
            jitter_compensation: false,
            drift_compensation: false,
            ..ClockConfig::default()
        });
        let next = drive(&clock, 0.0, 4);
        let timing = clock.process_buffer(next + 100.0 / SR, BLOCK);
        assert_eq!(timing.accuracy.correction_count, 0);
        assert_eq!(timing.accuracy.history_len, 0);
    }

    #[test]
    fn test_persistent_drift_is_corrected_within_bounds() {
        let config = ClockConfig {
            jitter_compensation: false,
            ..ClockConfig::default()
        };
        let max_correction = config.max_drift_correction;
        let clock = running_clock(config);

        // Host clock runs 200 ppm fast: ~0.1 extra samples per buffer.
        let period = BLOCK as f64 / SR * (1.0 + 200e-6);
        let mut last_offset = 0.0;
        for i in 0..64_u32 {
            let timing = clock.process_buffer(f64::from(i) * period, BLOCK);
            let step = timing.fractional_offset - last_offset;
            assert!(step <= max_correction + 1e-12);
            assert!(timing.fractional_offset.abs() <= 1.0);
            last_offset = timing.fractional_offset;
        }

        let timing = clock.current_timing();
        assert!(timing.accuracy.correction_count > 0);
        assert!((timing.accuracy.drift_ppm - 200.0).abs() < 1.0);
        assert_eq!(clock.sample_position(), 64 * BLOCK as u64);
    }

    #[test]
    fn test_drift_needs_minimum_history() {
        let config = ClockConfig {
            jitter_compensation: false,
            ..ClockConfig::default()
        };
        let clock = running_clock(config);
        let period = BLOCK as f64 / SR * 1.001;
        // Seven period measurements: not enough to act on.
        for i in 0..8_u32 {
            clock.process_buffer(f64::from(i) * period, BLOCK);
        }
        assert_eq!(clock.current_timing().accuracy.correction_count, 0);
        clock.process_buffer(8.0 * period, BLOCK);
        assert_eq!(clock.current_timing().accuracy.correction_count, 1);
    }

    #[test]
    fn test_external_sync_lock_and_unlock() {
        let clock = running_clock(ClockConfig::default());
        clock.enable_external_sync(SyncSource::MidiClock);
        let status = clock.sync_status();
        assert_eq!(status.source, SyncSource::MidiClock);
        assert!(!status.locked);

        clock.apply_external_sync_correction(0.0005);
        let status = clock.sync_status();
        assert!(status.locked);
        assert_eq!(status.offset_seconds, 0.0005);
        assert_eq!(clock.current_timing().accuracy.correction_count, 1);

        clock.apply_external_sync_correction(0.5);
        let status = clock.sync_status();
        assert!(!status.locked);
        assert_eq!(status.offset_seconds, 0.0005);

        clock.disable_external_sync();
        clock.disable_external_sync();
        assert_eq!(clock.sync_status(), ClockSyncStatus::default());
    }

    #[test]
    fn test_adopted_sync_offset_adds_no_jitter() {
        let clock = running_clock(ClockConfig::default());
        clock.enable_external_sync(SyncSource::MidiClock);
        let next = drive(&clock, 0.0, 4);

        clock.apply_external_sync_correction(0.0005);
        let next = drive(&clock, next, 100);

        let timing = clock.current_timing();
        assert!(clock.sync_status().locked);
        assert_eq!(timing.accuracy.correction_count, 1);
        assert_eq!(timing.accuracy.timing_accuracy, 100.0);
        assert!(timing.accuracy.max_jitter < 1e-6);

        // Clearing the offset must not bias the mapping either.
        clock.disable_external_sync();
        drive(&clock, next, 20);
        let timing = clock.current_timing();
        assert_eq!(timing.accuracy.correction_count, 1);
        assert!(timing.accuracy.max_jitter < 1e-6);
    }

    #[test]
    fn test_sync_offset_before_first_callback() {
        let clock = PrecisionClock::default();
        clock.enable_external_sync(SyncSource::WordClock);
        clock.apply_external_sync_correction(-0.0002);
        clock.start();
        drive(&clock, 3.0, 50);

        let timing = clock.current_timing();
        assert_eq!(timing.accuracy.correction_count, 0);
        assert_eq!(timing.accuracy.timing_accuracy, 100.0);
        assert_eq!(clock.sync_status().offset_seconds, -0.0002);
    }

    #[test]
    fn test_non_finite_host_time_still_advances() {
        let clock = running_clock(ClockConfig::default());
        clock.process_buffer(0.0, BLOCK);
        let skipped = clock.process_buffer(f64::NAN, BLOCK);
        assert_eq!(skipped.sample_position, BLOCK as u64);
        clock.process_buffer(2.0 * BLOCK as f64 / SR, BLOCK);
        assert_eq!(clock.sample_position(), 3 * BLOCK as u64);

        // Measurement resumes with the next finite timestamps.
        let next = drive(&clock, 3.0 * BLOCK as f64 / SR, 12);
        clock.process_buffer(f64::INFINITY, BLOCK);
        drive(&clock, next + BLOCK as f64 / SR, 12);
        let timing = clock.current_timing();
        assert_eq!(clock.sample_position(), 28 * BLOCK as u64);
        assert_eq!(timing.accuracy.correction_count, 0);
        assert!(timing.accuracy.max_jitter < 1e-6);
    }

    #[test]
    fn test_start_from_paused_resets_everything() {
        let clock = running_clock(ClockConfig::default());
        let next = drive(&clock, 0.0, 6);
        // Ten samples late, to leave a correction behind.
        clock.process_buffer(next + 10.0 / SR, BLOCK);
        clock.pause();
        assert_eq!(clock.current_timing().accuracy.correction_count, 1);

        clock.start();
        assert_eq!(clock.state(), ClockState::Running);
        assert_eq!(clock.sample_position(), 0);
        let timing = clock.current_timing();
        assert_eq!(timing.fractional_offset, 0.0);
        assert_eq!(timing.accuracy.history_len, 0);
        assert_eq!(timing.accuracy.correction_count, 0);

        // The new run anchors on its own first callback.
        drive(&clock, 100.0, 4);
        let timing = clock.current_timing();
        assert_eq!(timing.sample_position, 4 * BLOCK as u64);
        assert_eq!(timing.accuracy.correction_count, 0);
    }

    #[test]
    fn test_reset_musical_position_reanchors() {
        let clock = running_clock(ClockConfig::default());
        let next = drive(&clock, 0.0, 8);
        clock.reset_musical_position();
        assert_eq!(clock.sample_position(), 0);

        drive(&clock, next + 1.0, 4);
        let timing = clock.current_timing();
        assert_eq!(timing.sample_position, 4 * BLOCK as u64);
        assert_eq!(timing.accuracy.correction_count, 0);
    }

    #[test]
    fn test_reconfiguration_ignores_invalid_values() {
        let clock = PrecisionClock::default();
        clock.set_sample_rate(0.0);
        clock.set_sample_rate(f64::INFINITY);
        assert_eq!(clock.sample_rate(), SR);
        clock.set_sample_rate(96000.0);
        assert_eq!(clock.sample_rate(), 96000.0);
        clock.set_buffer_size(0);
        assert_eq!(clock.current_timing().buffer_size, BLOCK);
    }

    #[test]
    fn test_timing_accuracy_counts_within_tolerance() {
        let clock = running_clock(ClockConfig {
            drift_compensation: false,
            ..ClockConfig::default()
        });
        let next = drive(&clock, 0.0, 3);
        clock.process_buffer(next + 50.0 / SR, BLOCK);
        let accuracy = clock.current_timing().accuracy;
        assert_eq!(accuracy.history_len, 4);
        assert!((accuracy.timing_accuracy - 75.0).abs() < 1e-9);
        assert!((accuracy.max_jitter - 50.0).abs() < 1e-6);
    }
}
