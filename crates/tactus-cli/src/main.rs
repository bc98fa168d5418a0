//! Tactus CLI - simulation and inspection harness for the tactus core.

mod commands;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tactus")]
#[command(author, version, about = "Tactus real-time scheduling CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulated audio callback loop and report timing statistics
    Simulate(commands::simulate::SimulateArgs),

    /// Print the processing order of a graph given as an edge list
    Order(commands::order::OrderArgs),

    /// Show, create, or validate the engine configuration file
    Config(commands::config::ConfigArgs),
}

fn main() -> anyhow::Result<()> {
    // Logs go to stderr so `--json` output stays parseable.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with_writer(std::io::stderr)
        .init();
    tracing_log::LogTracer::init().ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Simulate(args) => commands::simulate::run(args),
        Commands::Order(args) => commands::order::run(args),
        Commands::Config(args) => commands::config::run(args),
    }
}
