//! Request handlers for the RainViewer-compatible API surface.
//!
//! Tile routes uphold the renderer's contract at the HTTP level: they
//! always answer `200 image/png`, parsing their own path parameters so a
//! malformed request degrades to a blank tile instead of an extractor
//! rejection the plugin would treat as fatal.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde_json::json;
use tracing::debug;

use crate::provider::TileProvider;
use crate::render::DEFAULT_OUTPUT_SIZE;

use super::AppState;

/// Shared handler state alias.
type SharedState<P> = State<Arc<AppState<P>>>;

fn png_response(bytes: Vec<u8>) -> Response {
    ([(header::CONTENT_TYPE, "image/png")], bytes).into_response()
}

/// Root endpoint for health check and info.
pub async fn root() -> Response {
    Json(json!({
        "message": "RadarLayer - RainViewer-compatible weather tiles for TopSky",
        "status": "running",
    }))
    .into_response()
}

/// Health check endpoint.
pub async fn health() -> Response {
    Json(json!({
        "status": "healthy",
        "timestamp": Utc::now().timestamp(),
    }))
    .into_response()
}

/// RainViewer v2 frame listing.
///
/// Also reached through the catch-all for trailing-slash and
/// trailing-path variants, because the plugin appends extra segments to
/// the configured URL.
pub async fn weather_maps<P: TileProvider + 'static>(State(state): SharedState<P>) -> Response {
    let listing = crate::frames::FrameListing::now(&state.public_base_url);
    (
        [
            (header::CACHE_CONTROL, "no-cache, no-store, must-revalidate"),
            (header::PRAGMA, "no-cache"),
            (header::EXPIRES, "0"),
        ],
        Json(listing),
    )
        .into_response()
}

/// Standard RainViewer tile route: `/v2/radar/{ts}/{z}/{x}/{y}.png`.
///
/// The timestamp segment also absorbs `nowcast_<id>` frames; all of them
/// resolve to the live upstream layer. The final segment arrives with its
/// `.png` suffix because the router cannot split a suffix off a segment.
pub async fn radar_tile_standard<P: TileProvider + 'static>(
    State(state): SharedState<P>,
    Path((ts, z, x, y)): Path<(String, String, String, String)>,
) -> Response {
    debug!(ts = %ts, z = %z, x = %x, y = %y, "Standard radar tile request");

    let parsed = (
        z.parse::<u8>(),
        x.parse::<u32>(),
        strip_png_suffix(&y).parse::<u32>(),
    );
    match parsed {
        (Ok(zoom), Ok(col), Ok(row)) => {
            png_response(state.renderer.render_tile_xyz(zoom, col, row).await)
        }
        _ => {
            debug!("Unparseable tile path - returning blank tile");
            png_response(
                state
                    .renderer
                    .blank_tile(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE),
            )
        }
    }
}

/// TopSky tile route: `/v2/radar/{ts}/{x}/{z}/{lon}/{lat}/.png`.
///
/// EuroScope hands us a geographic point instead of tile indices; the
/// provided `x` is ignored and the correct tiles are derived from
/// lat/lon. An optional `size` query selects the output edge.
pub async fn radar_tile_topsky<P: TileProvider + 'static>(
    State(state): SharedState<P>,
    Path((ts, x, z, lon, lat)): Path<(String, String, String, String, String)>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    debug!(ts = %ts, x = %x, z = %z, lon = %lon, lat = %lat, "TopSky radar tile request");

    let size = query
        .get("size")
        .and_then(|value| value.parse::<u32>().ok())
        .unwrap_or(DEFAULT_OUTPUT_SIZE);

    let parsed = (z.parse::<u8>(), lat.parse::<f64>(), lon.parse::<f64>());
    match parsed {
        (Ok(zoom), Ok(lat), Ok(lon)) => png_response(
            state
                .renderer
                .render_radar_tile(lat, lon, zoom, size)
                .await,
        ),
        _ => {
            debug!("Unparseable lat/lon/zoom - returning blank tile");
            png_response(state.renderer.blank_tile(size, size))
        }
    }
}

/// Satellite tile route - no satellite data is proxied, always blank.
pub async fn satellite_tile<P: TileProvider + 'static>(State(state): SharedState<P>) -> Response {
    png_response(
        state
            .renderer
            .blank_tile(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE),
    )
}

/// Catch-all for unmatched paths.
///
/// The plugin is sloppy about the listing URL (trailing slashes, extra
/// segments), so any `/public/weather-maps.json*` path serves the
/// listing. Anything else gets a blank PNG if it looks like a tile
/// request, or a JSON 404.
pub async fn catch_all<P: TileProvider + 'static>(
    State(state): SharedState<P>,
    uri: Uri,
) -> Response {
    debug!(path = %uri.path(), "Unmatched request");

    if uri.path().starts_with("/public/weather-maps.json") {
        return weather_maps(State(state)).await;
    }

    if uri.path().ends_with(".png") {
        return png_response(
            state
                .renderer
                .blank_tile(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE),
        );
    }

    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "Not found",
            "path": uri.path(),
            "message": "Check your TopSky configuration",
        })),
    )
        .into_response()
}

fn strip_png_suffix(segment: &str) -> &str {
    segment.strip_suffix(".png").unwrap_or(segment)
}
