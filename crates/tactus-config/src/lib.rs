//! Engine configuration for tactus.
//!
//! A single TOML file configures the clock, the processing graph, and the
//! render monitors. Sections and fields are all optional; anything missing
//! takes the core's default.
//!
//! ```toml
//! [audio]
//! sample_rate = 48000.0
//! buffer_size = 512
//!
//! [clock]
//! bpm = 120.0
//! beats_per_bar = 4
//! beat_unit = 4
//!
//! [graph]
//! max_nodes = 256
//! cycle_policy = "skip_back_edges"
//!
//! [monitor]
//! safety_threshold = 95.0
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use tactus_config::{EngineConfig, default_config_path};
//! use tactus_core::{PrecisionClock, ProcessingGraph};
//!
//! let config = EngineConfig::load_or_default(default_config_path()).unwrap();
//! config.validate().unwrap();
//!
//! let clock = PrecisionClock::new(config.clock_config());
//! let graph = ProcessingGraph::new(config.graph_config());
//! ```

mod engine;
mod error;

/// Platform-specific configuration paths.
pub mod paths;

/// Range checks for engine configuration.
pub mod validation;

pub use engine::{
    AudioSection, ClockSection, CycleHandling, EngineConfig, GraphSection, MonitorSection,
};
pub use error::ConfigError;
pub use paths::{default_config_path, ensure_user_config_dir, user_config_dir};
pub use validation::{ValidationError, ValidationResult, validate_engine_config};
