//! The `[audio]`, `[clock]`, `[graph]`, and `[monitor]` engine file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tactus_core::monitor::{DEFAULT_MISS_CAPACITY, DEFAULT_SAFETY_THRESHOLD};
use tactus_core::{
    ClockConfig, CyclePolicy, GraphConfig, PerformanceMonitor, RealTimeSafetyMonitor,
    TimeSignature,
};

use crate::error::ConfigError;
use crate::validation::{ValidationResult, validate_engine_config};

/// Complete engine configuration as stored on disk.
///
/// Every field has a default, so a partial file (or an empty one) loads.
///
/// # Example
///
/// ```rust
/// use tactus_config::EngineConfig;
///
/// let config = EngineConfig::from_toml_str(r#"
/// [audio]
/// sample_rate = 44100
/// buffer_size = 256
///
/// [clock]
/// bpm = 140.0
/// "#).unwrap();
///
/// let clock = config.clock_config();
/// assert_eq!(clock.sample_rate, 44100.0);
/// assert_eq!(clock.buffer_size, 256);
/// assert_eq!(clock.bpm, 140.0);
/// assert_eq!(config.graph_config().max_nodes, 256);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Device settings shared by the clock and the performance monitor.
    pub audio: AudioSection,
    /// Clock tempo, metre, and compensation settings.
    pub clock: ClockSection,
    /// Graph capacity and cycle handling.
    pub graph: GraphSection,
    /// Deadline monitor settings.
    pub monitor: MonitorSection,
}

/// `[audio]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSection {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Frames per callback.
    pub buffer_size: usize,
}

impl Default for AudioSection {
    fn default() -> Self {
        let clock = ClockConfig::default();
        Self {
            sample_rate: clock.sample_rate,
            buffer_size: clock.buffer_size,
        }
    }
}

/// `[clock]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockSection {
    /// Initial tempo in BPM.
    pub bpm: f64,
    /// Time signature numerator.
    pub beats_per_bar: u32,
    /// Time signature denominator.
    pub beat_unit: u32,
    /// Tick grid resolution.
    pub ticks_per_quarter_note: u32,
    /// Enable jitter compensation.
    pub jitter_compensation: bool,
    /// Enable drift compensation.
    pub drift_compensation: bool,
    /// Jitter in samples tolerated before correcting.
    pub max_jitter_tolerance: f64,
    /// Measurements retained for jitter and drift statistics.
    pub jitter_history_size: usize,
    /// Mean period error in samples that triggers drift correction.
    pub drift_threshold: f64,
    /// Largest drift correction per callback, in samples.
    pub max_drift_correction: f64,
    /// Largest external sync offset in seconds that still counts as locked.
    pub external_sync_tolerance: f64,
}

impl Default for ClockSection {
    fn default() -> Self {
        Self::from(&ClockConfig::default())
    }
}

impl From<&ClockConfig> for ClockSection {
    fn from(config: &ClockConfig) -> Self {
        Self {
            bpm: config.bpm,
            beats_per_bar: config.time_signature.numerator,
            beat_unit: config.time_signature.denominator,
            ticks_per_quarter_note: config.ticks_per_quarter_note,
            jitter_compensation: config.jitter_compensation,
            drift_compensation: config.drift_compensation,
            max_jitter_tolerance: config.max_jitter_tolerance,
            jitter_history_size: config.jitter_history_size,
            drift_threshold: config.drift_threshold,
            max_drift_correction: config.max_drift_correction,
            external_sync_tolerance: config.external_sync_tolerance,
        }
    }
}

/// How the graph treats connections that close a cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleHandling {
    /// Accept and skip back-edges when ordering.
    #[default]
    SkipBackEdges,
    /// Refuse the connection.
    RejectCycles,
}

impl From<CycleHandling> for CyclePolicy {
    fn from(handling: CycleHandling) -> Self {
        match handling {
            CycleHandling::SkipBackEdges => CyclePolicy::SkipBackEdges,
            CycleHandling::RejectCycles => CyclePolicy::RejectCycles,
        }
    }
}

/// `[graph]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphSection {
    /// Largest number of live nodes.
    pub max_nodes: usize,
    /// Largest number of live connections.
    pub max_connections: usize,
    /// Cache incoming connections in the published order.
    pub cache_connections: bool,
    /// Cycle handling.
    pub cycle_policy: CycleHandling,
}

impl Default for GraphSection {
    fn default() -> Self {
        let graph = GraphConfig::default();
        Self {
            max_nodes: graph.max_nodes,
            max_connections: graph.max_connections,
            cache_connections: graph.cache_connections,
            cycle_policy: CycleHandling::default(),
        }
    }
}

/// `[monitor]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorSection {
    /// Percentage of met deadlines required to count as real-time safe.
    pub safety_threshold: f64,
    /// Deadline miss records buffered between drains.
    pub miss_capacity: usize,
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            safety_threshold: DEFAULT_SAFETY_THRESHOLD,
            miss_capacity: DEFAULT_MISS_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Defaults with the clock settings (and audio device) of a clock preset.
    pub fn with_clock(clock: &ClockConfig) -> Self {
        Self {
            audio: AudioSection {
                sample_rate: clock.sample_rate,
                buffer_size: clock.buffer_size,
            },
            clock: ClockSection::from(clock),
            ..Self::default()
        }
    }

    /// Load a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Load a configuration, falling back to defaults when the file is missing.
    ///
    /// Other read errors and parse errors are still returned.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match Self::load(path) {
            Err(err) if err.is_not_found() => Ok(Self::default()),
            other => other,
        }
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Save the configuration to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }

        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))?;
        Ok(())
    }

    /// Serialize the configuration as pretty TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Check every field. See [`validate_engine_config`].
    pub fn validate(&self) -> ValidationResult<()> {
        validate_engine_config(self)
    }

    /// Clock settings. Out-of-range values are left for the clock to clamp.
    pub fn clock_config(&self) -> ClockConfig {
        let clock = &self.clock;
        ClockConfig {
            sample_rate: self.audio.sample_rate,
            buffer_size: self.audio.buffer_size,
            ticks_per_quarter_note: clock.ticks_per_quarter_note,
            bpm: clock.bpm,
            time_signature: TimeSignature::new(clock.beats_per_bar, clock.beat_unit),
            jitter_compensation: clock.jitter_compensation,
            drift_compensation: clock.drift_compensation,
            max_jitter_tolerance: clock.max_jitter_tolerance,
            jitter_history_size: clock.jitter_history_size,
            drift_threshold: clock.drift_threshold,
            max_drift_correction: clock.max_drift_correction,
            external_sync_tolerance: clock.external_sync_tolerance,
        }
    }

    /// Graph limits.
    pub fn graph_config(&self) -> GraphConfig {
        GraphConfig {
            max_nodes: self.graph.max_nodes,
            max_connections: self.graph.max_connections,
            cache_connections: self.graph.cache_connections,
            cycle_policy: self.graph.cycle_policy.into(),
        }
    }

    /// A performance monitor budgeted for one `[audio]` callback.
    pub fn performance_monitor(&self) -> PerformanceMonitor {
        PerformanceMonitor::new(self.audio.sample_rate, self.audio.buffer_size)
    }

    /// A deadline monitor with the `[monitor]` threshold and queue size.
    pub fn safety_monitor(&self) -> RealTimeSafetyMonitor {
        RealTimeSafetyMonitor::with_capacity(
            self.monitor.safety_threshold,
            self.monitor.miss_capacity,
        )
    }
}
