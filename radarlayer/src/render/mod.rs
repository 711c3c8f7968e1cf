//! Render pipeline facade.
//!
//! [`RadarRenderer`] wires the mapper, planner, fetcher, and compositor
//! together behind two operations that can never fail at the byte level:
//! whatever goes wrong - bad input, upstream outage, decode garbage, or a
//! bug - the caller receives a well-formed PNG. The consuming plugin
//! treats any non-image response as fatal, so the error funnel lives
//! here, at one auditable boundary, instead of scattered per component.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use crate::compose::{self, ComposeError};
use crate::coord::{CoordError, GeoPoint, TileCoord, MAX_ZOOM};
use crate::fetch;
use crate::grid::{GridPlan, PlanError};
use crate::provider::TileProvider;

/// Output edge used when the caller asks for a zero-sized tile.
pub const DEFAULT_OUTPUT_SIZE: u32 = 256;

/// Largest composite the renderer will build. Output size is caller
/// controlled; without a cap a single request could demand an arbitrarily
/// large canvas allocation.
pub const MAX_OUTPUT_SIZE: u32 = 4096;

/// Tunables for one renderer instance.
#[derive(Debug, Clone)]
pub struct RenderConfig {
    /// Upstream tile edge in pixels (256 for OWM).
    pub source_tile_size: u32,
    /// Time budget for one tile fetch.
    pub fetch_timeout: Duration,
    /// Overall deadline for one render; on expiry outstanding fetches are
    /// abandoned and the composite is built from partial results.
    pub request_deadline: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            source_tile_size: 256,
            fetch_timeout: Duration::from_secs(10),
            request_deadline: Duration::from_secs(25),
        }
    }
}

/// Internal failure funneled to the blank-tile fallback.
#[derive(Debug, Error)]
enum RenderError {
    #[error(transparent)]
    Coord(#[from] CoordError),
    #[error(transparent)]
    Plan(#[from] PlanError),
    #[error(transparent)]
    Encode(#[from] ComposeError),
}

/// Stitching renderer over an upstream tile provider.
///
/// Stateless across requests: every render builds its plan, fetches, and
/// composes from scratch, so concurrent requests share nothing but the
/// provider handle.
pub struct RadarRenderer<P: TileProvider> {
    provider: Arc<P>,
    config: RenderConfig,
}

impl<P: TileProvider + 'static> RadarRenderer<P> {
    /// Create a renderer over the given provider.
    pub fn new(provider: P, config: RenderConfig) -> Self {
        Self {
            provider: Arc::new(provider),
            config,
        }
    }

    /// Render a composite weather tile centered on a geographic point.
    ///
    /// Fetches the planned grid of upstream tiles concurrently, stitches
    /// them, and crops to exactly `output_size` × `output_size` pixels
    /// (zero is replaced by the 256 default, oversized requests are
    /// capped). Always returns decodable RGBA PNG bytes; every failure
    /// path degrades to a fully transparent tile of the same size.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn render_radar_tile(&self, lat: f64, lon: f64, zoom: u8, output_size: u32) -> Vec<u8> {
        let output_size = clamp_output_size(output_size);

        let rendered = AssertUnwindSafe(self.render_inner(lat, lon, zoom, output_size))
            .catch_unwind()
            .await;

        match rendered {
            Ok(Ok(png)) => png,
            Ok(Err(e)) => {
                warn!(error = %e, "Render failed - returning blank tile");
                compose::blank_png(output_size, output_size)
            }
            Err(_) => {
                error!("Render panicked - returning blank tile");
                compose::blank_png(output_size, output_size)
            }
        }
    }

    async fn render_inner(
        &self,
        lat: f64,
        lon: f64,
        zoom: u8,
        output_size: u32,
    ) -> Result<Vec<u8>, RenderError> {
        let center = GeoPoint::new(lat, lon)?;
        let plan = GridPlan::build(center, zoom, output_size, self.config.source_tile_size)?;

        debug!(
            effective_zoom = plan.effective_zoom(),
            grid = plan.tiles_per_axis(),
            distinct = plan.distinct_coords().len(),
            "Grid planned"
        );

        let cancel = CancellationToken::new();
        let results = {
            let fetch = fetch::fetch_plan(
                &plan,
                Arc::clone(&self.provider),
                self.config.fetch_timeout,
                cancel.clone(),
            );
            tokio::pin!(fetch);
            tokio::select! {
                results = &mut fetch => results,
                _ = tokio::time::sleep(self.config.request_deadline) => {
                    cancel.cancel();
                    fetch.await
                }
            }
        };

        let composite = compose::compose(&plan, &results);
        Ok(compose::encode_png(&composite)?)
    }

    /// Fetch one upstream tile by slippy coordinates and normalize it to
    /// RGBA PNG.
    ///
    /// This is the passthrough for consumers that already speak tile
    /// coordinates; no stitching is involved. Any failure - including an
    /// unsupported zoom - degrades to a blank default-size tile.
    #[instrument(skip(self), fields(provider = self.provider.name()))]
    pub async fn render_tile_xyz(&self, zoom: u8, col: u32, row: u32) -> Vec<u8> {
        if zoom > MAX_ZOOM {
            warn!("Unsupported zoom - returning blank tile");
            return compose::blank_png(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE);
        }

        let tile = TileCoord::wrapped(row as i64, col as i64, zoom);
        let fetched = tokio::time::timeout(
            self.config.fetch_timeout,
            self.provider.fetch_tile(&tile),
        )
        .await;

        let bytes = match fetched {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                warn!(tile = %tile, error = %e, "Tile fetch failed - returning blank tile");
                return compose::blank_png(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE);
            }
            Err(_) => {
                warn!(tile = %tile, "Tile fetch timed out - returning blank tile");
                return compose::blank_png(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE);
            }
        };

        match image::load_from_memory(&bytes) {
            Ok(img) => {
                let rgba = img.to_rgba8();
                compose::encode_png(&rgba)
                    .unwrap_or_else(|_| compose::blank_png(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE))
            }
            Err(e) => {
                warn!(tile = %tile, error = %e, "Fetched tile failed to decode - returning blank tile");
                compose::blank_png(DEFAULT_OUTPUT_SIZE, DEFAULT_OUTPUT_SIZE)
            }
        }
    }

    /// A fully transparent PNG of the requested size (zero clamps to the
    /// default, oversized requests are capped). Never fails.
    pub fn blank_tile(&self, width: u32, height: u32) -> Vec<u8> {
        compose::blank_png(clamp_output_size(width), clamp_output_size(height))
    }

    /// The renderer's configuration.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }
}

fn clamp_output_size(size: u32) -> u32 {
    if size == 0 {
        DEFAULT_OUTPUT_SIZE
    } else {
        size.min(MAX_OUTPUT_SIZE)
    }
}
