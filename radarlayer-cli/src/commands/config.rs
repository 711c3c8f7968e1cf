//! Configuration inspection CLI commands.

use clap::Subcommand;

use radarlayer::config::{default_config_path, Settings};

use crate::error::CliError;

/// Config subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Show the resolved configuration
    Show,

    /// Show the configuration file path
    Path,
}

/// Run a config subcommand.
pub fn run(command: ConfigCommands) -> Result<(), CliError> {
    match command {
        ConfigCommands::Show => run_show(),
        ConfigCommands::Path => run_path(),
    }
}

fn run_show() -> Result<(), CliError> {
    let settings = Settings::load()?;

    println!("api_key           = {}", settings.masked_api_key());
    println!("layer             = {}", settings.layer.as_path());
    println!("upstream_base_url = {}", settings.upstream_base_url);
    println!("public_base_url   = {}", settings.public_base_url);
    println!("bind              = {}", settings.bind_addr);
    println!("fetch_timeout     = {}s", settings.fetch_timeout.as_secs());
    println!("request_deadline  = {}s", settings.request_deadline.as_secs());
    Ok(())
}

fn run_path() -> Result<(), CliError> {
    match default_config_path() {
        Some(path) => println!("{}", path.display()),
        None => println!("No platform config directory available"),
    }
    Ok(())
}
