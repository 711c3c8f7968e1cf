//! Upstream weather imagery provider abstraction
//!
//! This module provides traits and implementations for downloading weather
//! raster tiles from the upstream provider (OpenWeatherMap).

mod http;
mod openweather;
mod types;

pub use http::{AsyncHttpClient, ReqwestClient, DEFAULT_TIMEOUT};
pub use openweather::{OpenWeatherMapProvider, TileLayer, DEFAULT_BASE_URL};
pub use types::{ProviderError, TileProvider};

#[cfg(test)]
pub use http::tests::MockHttpClient;
#[cfg(test)]
pub use types::tests::MockTileProvider;
