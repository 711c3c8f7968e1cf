//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates used by the upstream weather imagery
//! provider, including the fractional positions the grid planner needs.

mod types;

pub use types::{
    CoordError, GeoPoint, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MERCATOR_MAX_LAT, MIN_LAT,
    MIN_LON, MIN_ZOOM,
};

use std::f64::consts::PI;

/// Converts geographic coordinates to a fractional tile position.
///
/// The fractional position locates the point *within* the tile grid: the
/// integer part selects a tile, the fraction is the offset inside it.
/// Latitude is clamped to ±85.05112878 to keep the projection finite;
/// longitude is wrapped modulo 360 into [-180, 180).
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees
/// * `zoom` - Zoom level (0 to 18)
///
/// # Returns
///
/// `(frac_x, frac_y)` in `[0, 2^zoom)`, or an error for non-finite input
/// or an unsupported zoom level.
#[inline]
pub fn to_frac_tile(lat: f64, lon: f64, zoom: u8) -> Result<(f64, f64), CoordError> {
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }
    if !lat.is_finite() {
        return Err(CoordError::NonFinite("latitude"));
    }
    if !lon.is_finite() {
        return Err(CoordError::NonFinite("longitude"));
    }

    let n = 2.0_f64.powi(zoom as i32);

    let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT);
    // rem_euclid keeps the result in [0, 360), so the shift lands in [-180, 180)
    let lon = (lon + 180.0).rem_euclid(360.0) - 180.0;

    let frac_x = (lon + 180.0) / 360.0 * n;

    let lat_rad = lat * PI / 180.0;
    let frac_y = (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n;

    // Float edges (lat exactly at the clamp bound) can land on n itself
    let frac_x = frac_x.clamp(0.0, next_down(n));
    let frac_y = frac_y.clamp(0.0, next_down(n));

    Ok((frac_x, frac_y))
}

/// Largest f64 strictly below `n`, for clamping fractional positions into
/// the half-open grid range. `n` is a positive power of two, never subnormal.
#[inline]
fn next_down(n: f64) -> f64 {
    f64::from_bits(n.to_bits() - 1)
}

/// Converts geographic coordinates to the integer tile coordinate
/// containing the point.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees
/// * `lon` - Longitude in degrees
/// * `zoom` - Zoom level (0 to 18)
///
/// # Returns
///
/// A `TileCoord` with row/col in `[0, 2^zoom - 1]`, or an error if inputs
/// are invalid.
#[inline]
pub fn to_tile_coord(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    let (frac_x, frac_y) = to_frac_tile(lat, lon, zoom)?;
    Ok(TileCoord::wrapped(
        frac_y.floor() as i64,
        frac_x.floor() as i64,
        zoom,
    ))
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.col as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}
