//! Coordinate type definitions

use std::fmt;

/// Latitude bound beyond which the Web Mercator projection diverges.
///
/// Latitudes are clamped to this range internally before projection;
/// the poles themselves have no finite tile position.
pub const MERCATOR_MAX_LAT: f64 = 85.05112878;

/// Valid geographic latitude range accepted at the input boundary
pub const MIN_LAT: f64 = -90.0;
pub const MAX_LAT: f64 = 90.0;

/// Valid geographic longitude range accepted at the input boundary
pub const MIN_LON: f64 = -180.0;
pub const MAX_LON: f64 = 180.0;

/// Zoom levels the upstream tile provider serves reliably
pub const MIN_ZOOM: u8 = 0;
pub const MAX_ZOOM: u8 = 18;

/// A validated geographic point.
///
/// Construction rejects non-finite and out-of-range values instead of
/// clamping them; clamping to the Mercator-safe range happens only later,
/// during tile-index derivation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a geographic point, validating both axes.
    ///
    /// # Errors
    ///
    /// Returns `CoordError` if either value is NaN/infinite or outside
    /// [-90, 90] / [-180, 180].
    pub fn new(lat: f64, lon: f64) -> Result<Self, CoordError> {
        if !lat.is_finite() {
            return Err(CoordError::NonFinite("latitude"));
        }
        if !lon.is_finite() {
            return Err(CoordError::NonFinite("longitude"));
        }
        if !(MIN_LAT..=MAX_LAT).contains(&lat) {
            return Err(CoordError::InvalidLatitude(lat));
        }
        if !(MIN_LON..=MAX_LON).contains(&lon) {
            return Err(CoordError::InvalidLongitude(lon));
        }
        Ok(Self { lat, lon })
    }

    /// Latitude in degrees.
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in degrees.
    pub fn lon(&self) -> f64 {
        self.lon
    }
}

/// Tile coordinates in the Web Mercator / slippy-map system.
///
/// Identifies one upstream 256×256 raster tile. `row` is the slippy `y`
/// (0 at the north edge), `col` is the slippy `x` (0 at the antimeridian).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileCoord {
    /// Y coordinate (north-south), 0 at north
    pub row: u32,
    /// X coordinate (east-west), 0 at west
    pub col: u32,
    /// Zoom level (0-18)
    pub zoom: u8,
}

impl TileCoord {
    /// Build a tile coordinate from possibly out-of-range grid indices.
    ///
    /// Columns wrap modulo 2^zoom (the world is periodic east-west); rows
    /// clamp to [0, 2^zoom - 1] (there is nothing beyond the poles). The
    /// result is always valid for use in a fetch URL.
    pub fn wrapped(row: i64, col: i64, zoom: u8) -> Self {
        let n = 1i64 << zoom;
        let col = col.rem_euclid(n) as u32;
        let row = row.clamp(0, n - 1) as u32;
        Self { row, col, zoom }
    }

    /// Largest valid row/col index at this tile's zoom level.
    pub fn max_index(&self) -> u32 {
        (1u32 << self.zoom) - 1
    }
}

impl fmt::Display for TileCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.col, self.row)
    }
}

/// Errors that can occur during coordinate conversion.
#[derive(Debug, Clone, PartialEq)]
pub enum CoordError {
    /// Latitude is outside valid range (-90 to 90)
    InvalidLatitude(f64),
    /// Longitude is outside valid range (-180 to 180)
    InvalidLongitude(f64),
    /// Zoom level is outside the range the upstream provider supports (0 to 18)
    InvalidZoom(u8),
    /// Input value was NaN or infinite
    NonFinite(&'static str),
}

impl fmt::Display for CoordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CoordError::InvalidLatitude(lat) => {
                write!(
                    f,
                    "Invalid latitude: {} (must be between {} and {})",
                    lat, MIN_LAT, MAX_LAT
                )
            }
            CoordError::InvalidLongitude(lon) => {
                write!(
                    f,
                    "Invalid longitude: {} (must be between {} and {})",
                    lon, MIN_LON, MAX_LON
                )
            }
            CoordError::InvalidZoom(zoom) => {
                write!(
                    f,
                    "Invalid zoom level: {} (must be between {} and {})",
                    zoom, MIN_ZOOM, MAX_ZOOM
                )
            }
            CoordError::NonFinite(axis) => {
                write!(f, "Non-finite {} value", axis)
            }
        }
    }
}

impl std::error::Error for CoordError {}
