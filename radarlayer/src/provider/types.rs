//! Provider types and traits

use std::fmt;
use std::future::Future;

use bytes::Bytes;

use crate::coord::TileCoord;

/// Errors that can occur during provider operations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// HTTP request failed at the transport level
    Http(String),
    /// Upstream answered with a non-success status code
    Status { code: u16, url: String },
    /// Zoom level not supported by this provider
    UnsupportedZoom(u8),
    /// The fetch did not complete within its time budget
    TimedOut,
}

impl fmt::Display for ProviderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderError::Http(msg) => write!(f, "HTTP error: {}", msg),
            ProviderError::Status { code, url } => {
                write!(f, "HTTP {} from {}", code, url)
            }
            ProviderError::UnsupportedZoom(zoom) => {
                write!(f, "Zoom level {} not supported by provider", zoom)
            }
            ProviderError::TimedOut => write!(f, "Tile fetch timed out"),
        }
    }
}

impl std::error::Error for ProviderError {}

/// Trait for upstream weather tile providers.
///
/// Implementors fetch one raster tile identified by slippy-map
/// coordinates. The raw bytes are returned undecoded; the compositor
/// decides whether they are a usable image.
pub trait TileProvider: Send + Sync {
    /// Fetches one tile asynchronously.
    ///
    /// # Arguments
    ///
    /// * `tile` - Tile coordinates, already wrapped/clamped into range
    ///
    /// # Returns
    ///
    /// Raw encoded image data (typically PNG) or an error.
    fn fetch_tile(
        &self,
        tile: &TileCoord,
    ) -> impl Future<Output = Result<Bytes, ProviderError>> + Send;

    /// Returns the provider's name for logging and identification.
    fn name(&self) -> &str;

    /// Returns the minimum supported zoom level.
    fn min_zoom(&self) -> u8;

    /// Returns the maximum supported zoom level.
    fn max_zoom(&self) -> u8;

    /// Checks if this provider supports the given zoom level.
    fn supports_zoom(&self, zoom: u8) -> bool {
        zoom >= self.min_zoom() && zoom <= self.max_zoom()
    }
}
