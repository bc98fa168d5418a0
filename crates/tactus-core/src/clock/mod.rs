//! Sample-accurate transport clock and musical time.
//!
//! [`PrecisionClock`] turns the host timestamp of each audio callback into an
//! authoritative sample position plus a [`PrecisionTimingInfo`] snapshot.
//!
//! # Architecture
//!
//! ```text
//! host timestamp ──► jitter measurement ──┐
//!                                         ├──► sub-sample offset (±1 sample)
//! callback period ─► drift measurement ───┘
//!
//! sample position ─(+buffer_size per callback)─► MusicalPosition (bar.beat.tick)
//! ```
//!
//! The sample position is the only authority. Host time never moves it; it only
//! feeds the correction state reported alongside it.

mod config;
mod history;
mod musical;
mod precision;
mod timing;

pub use config::ClockConfig;
pub use history::{MAX_HISTORY, MIN_HISTORY};
pub use musical::{
    DEFAULT_TICKS_PER_QUARTER_NOTE, MAX_BPM, MIN_BPM, MusicalPosition, NoteDivision, TimeSignature,
};
pub use precision::{ClockState, PrecisionClock};
pub use timing::{AccuracyMetrics, ClockSyncStatus, PrecisionTimingInfo, SyncSource};
