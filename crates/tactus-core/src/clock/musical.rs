//! Musical time: time signatures, bar/beat/tick positions, and note divisions.
//!
//! Musical position is never stored as independent state. It is always derived
//! from a sample position, a tempo, and a time signature, so tempo changes can
//! never leave it inconsistent with the sample clock.

/// Lowest tempo accepted by the clock, in BPM.
pub const MIN_BPM: f64 = 60.0;

/// Highest tempo accepted by the clock, in BPM.
pub const MAX_BPM: f64 = 200.0;

/// Default resolution of the tick grid.
pub const DEFAULT_TICKS_PER_QUARTER_NOTE: u32 = 960;

/// A time signature such as 4/4 or 6/8.
///
/// Both fields are at least 1; [`TimeSignature::new`] clamps them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeSignature {
    /// Beats per bar.
    pub numerator: u32,
    /// Note value of one beat (4 = quarter note, 8 = eighth note).
    pub denominator: u32,
}

impl TimeSignature {
    /// Creates a time signature, clamping both fields to at least 1.
    pub fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator: numerator.max(1),
            denominator: denominator.max(1),
        }
    }

    /// Length of one beat in quarter notes (1.0 for x/4, 0.5 for x/8).
    pub fn quarters_per_beat(&self) -> f64 {
        4.0 / f64::from(self.denominator)
    }

    /// Length of one bar in quarter notes.
    pub fn quarters_per_bar(&self) -> f64 {
        f64::from(self.numerator) * self.quarters_per_beat()
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::new(4, 4)
    }
}

impl core::fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Bar/beat/tick decomposition of an elapsed sample count.
///
/// `bar` and `beat` are 1-based. Beats are counted in units of the time
/// signature's denominator; the cumulative totals are in quarter notes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct MusicalPosition {
    /// Current bar, starting at 1.
    pub bar: u32,
    /// Current beat within the bar, starting at 1.
    pub beat: u32,
    /// Fractional progress through the current beat (0.0 to 1.0).
    pub beat_fraction: f64,
    /// Current tick within the beat.
    pub tick: u32,
    /// Fractional progress through the current tick (0.0 to 1.0).
    pub tick_fraction: f64,
    /// Quarter notes elapsed since sample 0.
    pub total_beats: f64,
    /// Ticks elapsed since sample 0.
    pub total_ticks: f64,
}

impl MusicalPosition {
    /// Derives the musical position of `sample_position`.
    ///
    /// Cumulative beats are `(sample_position / sample_rate) * (bpm / 60)`.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tactus_core::{MusicalPosition, TimeSignature};
    ///
    /// // 2 seconds at 120 BPM in 4/4 is exactly one bar.
    /// let pos = MusicalPosition::from_samples(88_200, 44_100.0, 120.0, TimeSignature::default(), 960);
    /// assert_eq!((pos.bar, pos.beat, pos.tick), (2, 1, 0));
    /// ```
    pub fn from_samples(
        sample_position: u64,
        sample_rate: f64,
        bpm: f64,
        time_signature: TimeSignature,
        ticks_per_quarter_note: u32,
    ) -> Self {
        let seconds = sample_position as f64 / sample_rate;
        let total_beats = seconds * (bpm / 60.0);
        Self::from_quarter_notes(total_beats, time_signature, ticks_per_quarter_note)
    }

    /// Derives the musical position of a cumulative quarter-note count.
    pub fn from_quarter_notes(
        total_beats: f64,
        time_signature: TimeSignature,
        ticks_per_quarter_note: u32,
    ) -> Self {
        let total_beats = if total_beats.is_finite() {
            total_beats.max(0.0)
        } else {
            0.0
        };
        let tpqn = f64::from(ticks_per_quarter_note.max(1));
        let numerator = f64::from(time_signature.numerator);

        // Beats in units of the signature's denominator.
        let signature_beats = total_beats / time_signature.quarters_per_beat();
        let whole_beats = snap_floor(signature_beats);
        let bar_index = (whole_beats / numerator).floor();
        let beat_index = whole_beats - bar_index * numerator;
        let beat_fraction = (signature_beats - whole_beats).clamp(0.0, 1.0);

        let ticks_per_beat = tpqn * time_signature.quarters_per_beat();
        let beat_ticks = beat_fraction * ticks_per_beat;
        let whole_ticks = snap_floor(beat_ticks);

        Self {
            bar: bar_index as u32 + 1,
            beat: beat_index as u32 + 1,
            beat_fraction,
            tick: whole_ticks as u32,
            tick_fraction: (beat_ticks - whole_ticks).clamp(0.0, 1.0),
            total_beats,
            total_ticks: total_beats * tpqn,
        }
    }
}

impl core::fmt::Display for MusicalPosition {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}.{}.{:03}", self.bar, self.beat, self.tick)
    }
}

/// Floors `value`, treating values within rounding error of the next integer
/// as that integer.
///
/// `88200 / 44100 * 2` is exactly 4.0, but other rates produce 3.9999999.
fn snap_floor(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < 1e-9 {
        rounded
    } else {
        value.floor()
    }
}

/// Musical note divisions for grid quantization.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NoteDivision {
    /// Whole note (4 beats)
    Whole,
    /// Half note (2 beats)
    Half,
    /// Quarter note (1 beat)
    #[default]
    Quarter,
    /// Eighth note (1/2 beat)
    Eighth,
    /// Sixteenth note (1/4 beat)
    Sixteenth,
    /// Thirty-second note (1/8 beat)
    ThirtySecond,
    /// Dotted quarter note (1.5 beats)
    DottedQuarter,
    /// Dotted eighth note (3/4 beat)
    DottedEighth,
    /// Triplet quarter note (2/3 beat)
    TripletQuarter,
    /// Triplet eighth note (1/3 beat)
    TripletEighth,
}

impl NoteDivision {
    /// Length of this division in quarter notes.
    pub fn beats(&self) -> f64 {
        match self {
            NoteDivision::Whole => 4.0,
            NoteDivision::Half => 2.0,
            NoteDivision::Quarter => 1.0,
            NoteDivision::Eighth => 0.5,
            NoteDivision::Sixteenth => 0.25,
            NoteDivision::ThirtySecond => 0.125,
            NoteDivision::DottedQuarter => 1.5,
            NoteDivision::DottedEighth => 0.75,
            NoteDivision::TripletQuarter => 2.0 / 3.0,
            NoteDivision::TripletEighth => 1.0 / 3.0,
        }
    }

    /// Length of this division in samples at the given tempo and sample rate.
    ///
    /// # Example
    ///
    /// ```rust
    /// use tactus_core::NoteDivision;
    ///
    /// // At 120 BPM, 48 kHz: quarter note = 24000 samples
    /// let samples = NoteDivision::Quarter.to_samples(120.0, 48000.0);
    /// assert!((samples - 24000.0).abs() < 1e-9);
    /// ```
    pub fn to_samples(&self, bpm: f64, sample_rate: f64) -> f64 {
        self.beats() * 60.0 / bpm * sample_rate
    }
}
