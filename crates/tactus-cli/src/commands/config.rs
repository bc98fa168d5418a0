//! Engine configuration commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use tactus_config::{EngineConfig, default_config_path, ensure_user_config_dir};

use super::common::{ClockPreset, load_engine_config};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration as TOML
    Show {
        /// Config file (defaults to the user config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Write a configuration file with default values
    Init {
        /// Destination (defaults to the user config)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Clock preset to start from
        #[arg(long, value_enum, default_value_t = ClockPreset::Default)]
        preset: ClockPreset,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Check a configuration file and list every out-of-range value
    Validate {
        /// Config file (defaults to the user config)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },

    /// Show the default configuration path
    Path,
}

pub fn run(args: ConfigArgs) -> anyhow::Result<()> {
    match args.command {
        ConfigCommand::Show { config } => show_config(config),
        ConfigCommand::Init {
            path,
            preset,
            force,
        } => init_config(path, preset, force),
        ConfigCommand::Validate { config } => validate_config(config),
        ConfigCommand::Path => {
            println!("{}", default_config_path().display());
            Ok(())
        }
    }
}

fn show_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_engine_config(path.as_deref(), None)?;
    print!("{}", config.to_toml_string()?);
    Ok(())
}

fn init_config(path: Option<PathBuf>, preset: ClockPreset, force: bool) -> anyhow::Result<()> {
    let path = match path {
        Some(path) => path,
        None => {
            ensure_user_config_dir()?;
            default_config_path()
        }
    };

    if path.exists() && !force {
        anyhow::bail!(
            "Config '{}' already exists. Use --force to overwrite.",
            path.display()
        );
    }

    EngineConfig::with_clock(&preset.clock_config()).save(&path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn validate_config(path: Option<PathBuf>) -> anyhow::Result<()> {
    let config = load_engine_config(path.as_deref(), None)?;
    match config.validate() {
        Ok(()) => {
            println!("Configuration is valid.");
            Ok(())
        }
        Err(err) => {
            println!("Configuration has {} issue(s):", err.len());
            for issue in err.issues() {
                println!("  - {issue}");
            }
            anyhow::bail!("invalid configuration")
        }
    }
}
