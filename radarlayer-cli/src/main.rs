//! RadarLayer CLI - Command-line interface
//!
//! This binary provides a command-line interface to the RadarLayer
//! library: running the RainViewer-compatible proxy server and
//! inspecting the resolved configuration.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// RainViewer-compatible weather radar tiles for TopSky.
#[derive(Debug, Parser)]
#[command(name = "radarlayer", version = radarlayer::VERSION)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run the tile proxy server
    Serve(commands::serve::ServeArgs),

    /// Inspect configuration
    Config {
        #[command(subcommand)]
        command: commands::config::ConfigCommands,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
