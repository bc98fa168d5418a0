//! Shared helpers for CLI commands.

use std::path::Path;

use anyhow::Context;
use clap::ValueEnum;
use tactus_config::{EngineConfig, default_config_path};
use tactus_core::ClockConfig;

/// Clock presets selectable on the command line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ClockPreset {
    /// Balanced defaults (512 frames at 48 kHz)
    #[default]
    Default,
    /// Small buffers and a short history
    LowLatency,
    /// Large buffers and the full history
    HighPrecision,
}

impl ClockPreset {
    pub fn clock_config(self) -> ClockConfig {
        match self {
            ClockPreset::Default => ClockConfig::default(),
            ClockPreset::LowLatency => ClockConfig::low_latency(),
            ClockPreset::HighPrecision => ClockConfig::high_precision(),
        }
    }
}

/// Resolves the engine configuration for a command.
///
/// An explicit path must exist. A preset replaces the user file entirely.
/// Otherwise the user file is used when present, defaults when not.
pub fn load_engine_config(
    path: Option<&Path>,
    preset: Option<ClockPreset>,
) -> anyhow::Result<EngineConfig> {
    if let Some(path) = path {
        return EngineConfig::load(path)
            .with_context(|| format!("loading config {}", path.display()));
    }
    if let Some(preset) = preset {
        return Ok(EngineConfig::with_clock(&preset.clock_config()));
    }
    let path = default_config_path();
    EngineConfig::load_or_default(&path)
        .with_context(|| format!("loading config {}", path.display()))
}
