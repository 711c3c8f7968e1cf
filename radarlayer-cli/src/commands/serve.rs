//! Serve command - run the RainViewer-compatible proxy server.

use clap::Args;
use tracing::info;

use radarlayer::config::Settings;
use radarlayer::provider::TileLayer;
use radarlayer::server;

use crate::error::CliError;

/// Arguments for the serve command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Bind address override (e.g. 127.0.0.1:9000)
    #[arg(long)]
    pub bind: Option<String>,

    /// Weather layer override (precipitation_new, clouds_new, temp_new,
    /// wind_new, pressure_new, humidity_new)
    #[arg(long)]
    pub layer: Option<String>,
}

/// Run the serve command.
pub fn run(args: ServeArgs) -> Result<(), CliError> {
    let mut settings = Settings::load()?;

    if let Some(bind) = args.bind {
        settings.bind_addr = bind
            .parse()
            .map_err(|_| CliError::Argument(format!("Invalid bind address: {}", bind)))?;
    }
    if let Some(layer) = args.layer {
        settings.layer = TileLayer::from_name(&layer)
            .ok_or_else(|| CliError::Argument(format!("Unknown layer: {}", layer)))?;
    }

    log_startup(&settings);

    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| CliError::RuntimeCreation(e.to_string()))?;
    runtime.block_on(server::serve(settings))?;
    Ok(())
}

fn log_startup(settings: &Settings) {
    info!(version = radarlayer::VERSION, "Starting RadarLayer");
    info!(bind = %settings.bind_addr, "Server address");
    info!(layer = settings.layer.as_path(), "Weather layer");
    info!(api_key = %settings.masked_api_key(), "OpenWeatherMap API key");
    info!(
        endpoint = %format!("{}/public/weather-maps.json", settings.public_base_url),
        "Weather data endpoint"
    );
}
