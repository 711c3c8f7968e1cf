//! OpenWeatherMap weather tile provider.
//!
//! Fetches raster weather layers from the OWM tile API. Requires users to
//! have their own OpenWeatherMap account and API key with the Weather Maps
//! product enabled.
//!
//! # API Endpoint
//!
//! `https://tile.openweathermap.org/map/{layer}/{z}/{x}/{y}.png?appid={API_KEY}`
//!
//! # Coordinate System
//!
//! Standard Web Mercator XYZ tile coordinates:
//! - X: Column (0 to 2^zoom - 1, west to east)
//! - Y: Row (0 to 2^zoom - 1, north to south)
//! - Z: Zoom level (0 to 18)
//!
//! These map directly to our tile coordinates (col = x, row = y).

use bytes::Bytes;

use crate::coord::TileCoord;
use crate::provider::{AsyncHttpClient, ProviderError, TileProvider};

/// Default OWM tile API base URL.
pub const DEFAULT_BASE_URL: &str = "https://tile.openweathermap.org/map";

/// Weather layers the OWM tile API serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileLayer {
    /// Rain/snow intensity
    PrecipitationNew,
    /// Cloud cover percentage
    CloudsNew,
    /// Temperature
    TempNew,
    /// Wind speed
    WindNew,
    /// Atmospheric pressure
    PressureNew,
    /// Relative humidity
    HumidityNew,
}

impl TileLayer {
    /// The layer's path segment in tile URLs.
    pub fn as_path(&self) -> &'static str {
        match self {
            TileLayer::PrecipitationNew => "precipitation_new",
            TileLayer::CloudsNew => "clouds_new",
            TileLayer::TempNew => "temp_new",
            TileLayer::WindNew => "wind_new",
            TileLayer::PressureNew => "pressure_new",
            TileLayer::HumidityNew => "humidity_new",
        }
    }

    /// Parse a layer from its URL path segment.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "precipitation_new" => Some(TileLayer::PrecipitationNew),
            "clouds_new" => Some(TileLayer::CloudsNew),
            "temp_new" => Some(TileLayer::TempNew),
            "wind_new" => Some(TileLayer::WindNew),
            "pressure_new" => Some(TileLayer::PressureNew),
            "humidity_new" => Some(TileLayer::HumidityNew),
            _ => None,
        }
    }
}

impl Default for TileLayer {
    fn default() -> Self {
        TileLayer::PrecipitationNew
    }
}

/// OpenWeatherMap weather tile provider.
///
/// # Example
///
/// ```no_run
/// use radarlayer::provider::{OpenWeatherMapProvider, ReqwestClient, TileLayer};
///
/// let client = ReqwestClient::new().unwrap();
/// let provider = OpenWeatherMapProvider::new(
///     client,
///     "YOUR_API_KEY".to_string(),
///     TileLayer::PrecipitationNew,
/// );
/// ```
pub struct OpenWeatherMapProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
    layer: TileLayer,
    base_url: String,
}

impl<C: AsyncHttpClient> OpenWeatherMapProvider<C> {
    /// Creates a new OWM provider against the public tile endpoint.
    ///
    /// # Arguments
    ///
    /// * `http_client` - HTTP client for making requests
    /// * `api_key` - Valid OpenWeatherMap API key
    /// * `layer` - Weather layer to serve
    pub fn new(http_client: C, api_key: String, layer: TileLayer) -> Self {
        Self {
            http_client,
            api_key,
            layer,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Override the base URL (testing, regional mirrors).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// The configured weather layer.
    pub fn layer(&self) -> TileLayer {
        self.layer
    }

    /// Builds the tile URL for the given coordinates.
    fn build_url(&self, tile: &TileCoord) -> String {
        format!(
            "{}/{}/{}/{}/{}.png?appid={}",
            self.base_url,
            self.layer.as_path(),
            tile.zoom,
            tile.col,
            tile.row,
            self.api_key
        )
    }
}

impl<C: AsyncHttpClient> TileProvider for OpenWeatherMapProvider<C> {
    async fn fetch_tile(&self, tile: &TileCoord) -> Result<Bytes, ProviderError> {
        if !self.supports_zoom(tile.zoom) {
            return Err(ProviderError::UnsupportedZoom(tile.zoom));
        }

        let url = self.build_url(tile);
        self.http_client.get(&url).await
    }

    fn name(&self) -> &str {
        "OpenWeatherMap"
    }

    fn min_zoom(&self) -> u8 {
        0
    }

    fn max_zoom(&self) -> u8 {
        18
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockHttpClient;

    fn provider_with(
        response: Result<Bytes, ProviderError>,
    ) -> OpenWeatherMapProvider<MockHttpClient> {
        OpenWeatherMapProvider::new(
            MockHttpClient::new(response),
            "test_key".to_string(),
            TileLayer::PrecipitationNew,
        )
    }

    #[test]
    fn test_provider_name() {
        let provider = provider_with(Ok(Bytes::new()));
        assert_eq!(provider.name(), "OpenWeatherMap");
    }

    #[test]
    fn test_zoom_range() {
        let provider = provider_with(Ok(Bytes::new()));
        assert_eq!(provider.min_zoom(), 0);
        assert_eq!(provider.max_zoom(), 18);
        assert!(provider.supports_zoom(18));
        assert!(!provider.supports_zoom(19));
    }

    #[test]
    fn test_url_construction() {
        let provider = provider_with(Ok(Bytes::new()));
        let tile = TileCoord { row: 21, col: 31, zoom: 6 };

        let url = provider.build_url(&tile);
        assert_eq!(
            url,
            "https://tile.openweathermap.org/map/precipitation_new/6/31/21.png?appid=test_key"
        );
    }

    #[test]
    fn test_url_with_custom_base_and_layer() {
        let provider = OpenWeatherMapProvider::new(
            MockHttpClient::new(Ok(Bytes::new())),
            "k".to_string(),
            TileLayer::CloudsNew,
        )
        .with_base_url("http://localhost:9999/map");

        let tile = TileCoord { row: 0, col: 1, zoom: 2 };
        assert_eq!(
            provider.build_url(&tile),
            "http://localhost:9999/map/clouds_new/2/1/0.png?appid=k"
        );
    }

    #[tokio::test]
    async fn test_fetch_tile_success() {
        let data = Bytes::from_static(&[1, 2, 3, 4]);
        let provider = provider_with(Ok(data.clone()));
        let tile = TileCoord { row: 21, col: 31, zoom: 6 };

        let result = provider.fetch_tile(&tile).await;
        assert_eq!(result.unwrap(), data);
    }

    #[tokio::test]
    async fn test_fetch_tile_http_error() {
        let provider = provider_with(Err(ProviderError::Http("Network error".to_string())));
        let tile = TileCoord { row: 21, col: 31, zoom: 6 };

        let result = provider.fetch_tile(&tile).await;
        assert!(matches!(result, Err(ProviderError::Http(_))));
    }

    #[tokio::test]
    async fn test_fetch_tile_unsupported_zoom() {
        let provider = provider_with(Ok(Bytes::new()));
        let tile = TileCoord { row: 0, col: 0, zoom: 19 };

        let result = provider.fetch_tile(&tile).await;
        assert!(matches!(result, Err(ProviderError::UnsupportedZoom(19))));
    }

    #[test]
    fn test_layer_round_trip() {
        for layer in [
            TileLayer::PrecipitationNew,
            TileLayer::CloudsNew,
            TileLayer::TempNew,
            TileLayer::WindNew,
            TileLayer::PressureNew,
            TileLayer::HumidityNew,
        ] {
            assert_eq!(TileLayer::from_name(layer.as_path()), Some(layer));
        }
        assert_eq!(TileLayer::from_name("lava_new"), None);
    }

    #[test]
    fn test_api_key_included_in_url() {
        let provider = OpenWeatherMapProvider::new(
            MockHttpClient::new(Ok(Bytes::new())),
            "secret_key_123".to_string(),
            TileLayer::default(),
        );
        let tile = TileCoord { row: 10, col: 20, zoom: 5 };
        assert!(provider.build_url(&tile).contains("appid=secret_key_123"));
    }
}
