//! RadarLayer - RainViewer-compatible weather tiles for TopSky
//!
//! This library is a translation proxy: the TopSky radar display plugin
//! only speaks the RainViewer tile API, so RadarLayer serves that API
//! shape while sourcing imagery from OpenWeatherMap, stitching upstream
//! slippy-map tiles into composites of exactly the size the plugin asks
//! for. Whatever goes wrong, tile endpoints always answer with a valid
//! PNG - the plugin treats anything else as fatal.
//!
//! # High-Level API
//!
//! The [`render`] module provides the pipeline facade:
//!
//! ```ignore
//! use radarlayer::provider::{OpenWeatherMapProvider, ReqwestClient, TileLayer};
//! use radarlayer::render::{RadarRenderer, RenderConfig};
//!
//! let client = ReqwestClient::new()?;
//! let provider = OpenWeatherMapProvider::new(client, api_key, TileLayer::PrecipitationNew);
//! let renderer = RadarRenderer::new(provider, RenderConfig::default());
//!
//! let png = renderer.render_radar_tile(51.5, -0.12, 5, 256).await;
//! ```
//!
//! The [`server`] module wires the renderer into the HTTP surface the
//! plugin connects to; [`config`] resolves settings from file and
//! environment.

pub mod compose;
pub mod config;
pub mod coord;
pub mod fetch;
pub mod frames;
pub mod grid;
pub mod provider;
pub mod render;
pub mod server;

/// Version of the RadarLayer library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    #[test]
    fn test_version_is_set() {
        assert!(!super::VERSION.is_empty());
    }

    #[test]
    fn test_coord_module_exists() {
        use crate::coord::to_tile_coord;
        let result = to_tile_coord(51.5, -0.12, 6);
        assert!(result.is_ok());
    }
}
