//! Tile grid planning module
//!
//! Turns a geographic center point, a zoom level, and a requested output
//! size into the rectangular grid of upstream tiles that must be fetched
//! to cover that output, together with each tile's destination offset on
//! the composite canvas and the crop rectangle to extract afterwards.

use std::collections::HashSet;
use std::fmt;

use crate::coord::{self, CoordError, GeoPoint, TileCoord, MAX_ZOOM};

/// Zoom levels added above the caller's request when stitching for extra
/// detail. Trades coverage area for resolution; a fixed policy constant,
/// not derived from the request.
pub const ZOOM_ENHANCEMENT_STEP: u8 = 1;

/// One grid cell: an upstream tile and where it lands on the canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedTile {
    /// Upstream tile to fetch (already wrapped/clamped into range)
    pub coord: TileCoord,
    /// Horizontal pixel offset of the tile's left edge on the canvas
    pub x_offset: u32,
    /// Vertical pixel offset of the tile's top edge on the canvas
    pub y_offset: u32,
}

/// Plan for assembling one composite image.
///
/// Cells are ordered row-major (y ascending, then x ascending) and their
/// offsets partition the canvas exactly: no gaps, no overlaps. The same
/// upstream coordinate can appear in several cells when the grid wraps at
/// the antimeridian or clamps at the poles; such duplicates are fetched
/// once and pasted at every offset that needs them.
#[derive(Debug, Clone)]
pub struct GridPlan {
    tiles: Vec<PlacedTile>,
    tiles_per_axis: u32,
    source_tile_size: u32,
    output_size: u32,
    crop_x: u32,
    crop_y: u32,
    effective_zoom: u8,
}

impl GridPlan {
    /// Build the grid plan for a composite centered on `center`.
    ///
    /// When the requested output is at least one source tile wide, the
    /// effective zoom is raised by [`ZOOM_ENHANCEMENT_STEP`] (capped at
    /// the provider maximum) so the stitched result carries more detail
    /// than a single tile at the caller's zoom would.
    ///
    /// # Arguments
    ///
    /// * `center` - Geographic point the output is centered on
    /// * `zoom` - Caller-requested zoom level (0 to 18)
    /// * `output_size` - Requested square output edge, in pixels
    /// * `source_tile_size` - Upstream tile edge, in pixels (256 for OWM)
    ///
    /// # Errors
    ///
    /// Returns `PlanError` for a zero size or an unsupported zoom level.
    pub fn build(
        center: GeoPoint,
        zoom: u8,
        output_size: u32,
        source_tile_size: u32,
    ) -> Result<Self, PlanError> {
        if output_size == 0 {
            return Err(PlanError::InvalidOutputSize(output_size));
        }
        if source_tile_size == 0 {
            return Err(PlanError::InvalidSourceTileSize(source_tile_size));
        }
        if zoom > MAX_ZOOM {
            return Err(PlanError::Coord(CoordError::InvalidZoom(zoom)));
        }

        let effective_zoom = if output_size >= source_tile_size {
            (zoom + ZOOM_ENHANCEMENT_STEP).min(MAX_ZOOM)
        } else {
            zoom
        };

        let (frac_x, frac_y) = coord::to_frac_tile(center.lat(), center.lon(), effective_zoom)?;

        // The +1 guarantees coverage even though the center almost never
        // aligns to a tile boundary
        let tiles_per_axis = output_size.div_ceil(source_tile_size) + 1;

        let half = tiles_per_axis as f64 / 2.0;
        let start_col = (frac_x - half).round() as i64;
        let start_row = (frac_y - half).round() as i64;

        let mut tiles = Vec::with_capacity((tiles_per_axis * tiles_per_axis) as usize);
        for j in 0..tiles_per_axis {
            for i in 0..tiles_per_axis {
                tiles.push(PlacedTile {
                    coord: TileCoord::wrapped(
                        start_row + j as i64,
                        start_col + i as i64,
                        effective_zoom,
                    ),
                    x_offset: i * source_tile_size,
                    y_offset: j * source_tile_size,
                });
            }
        }

        // Crop centered on the pixel where the fractional center falls.
        // That pixel is within half a tile of the canvas center, and the
        // canvas exceeds the output by at least one tile per axis, so the
        // clamp below only guards float rounding.
        let canvas = tiles_per_axis * source_tile_size;
        let center_px_x = (frac_x - start_col as f64) * source_tile_size as f64;
        let center_px_y = (frac_y - start_row as f64) * source_tile_size as f64;
        let max_crop = (canvas - output_size) as i64;
        let crop_x = (center_px_x.round() as i64 - (output_size / 2) as i64).clamp(0, max_crop);
        let crop_y = (center_px_y.round() as i64 - (output_size / 2) as i64).clamp(0, max_crop);

        Ok(Self {
            tiles,
            tiles_per_axis,
            source_tile_size,
            output_size,
            crop_x: crop_x as u32,
            crop_y: crop_y as u32,
            effective_zoom,
        })
    }

    /// All grid cells in row-major order.
    pub fn tiles(&self) -> &[PlacedTile] {
        &self.tiles
    }

    /// Distinct upstream coordinates, in first-seen (row-major) order.
    pub fn distinct_coords(&self) -> Vec<TileCoord> {
        let mut seen = HashSet::new();
        self.tiles
            .iter()
            .map(|placed| placed.coord)
            .filter(|coord| seen.insert(*coord))
            .collect()
    }

    /// Grid edge length, in tiles.
    pub fn tiles_per_axis(&self) -> u32 {
        self.tiles_per_axis
    }

    /// Canvas width = height, in pixels.
    pub fn canvas_size(&self) -> u32 {
        self.tiles_per_axis * self.source_tile_size
    }

    /// Upstream tile edge, in pixels.
    pub fn source_tile_size(&self) -> u32 {
        self.source_tile_size
    }

    /// Requested output edge, in pixels.
    pub fn output_size(&self) -> u32 {
        self.output_size
    }

    /// Left edge of the crop rectangle on the canvas.
    pub fn crop_x(&self) -> u32 {
        self.crop_x
    }

    /// Top edge of the crop rectangle on the canvas.
    pub fn crop_y(&self) -> u32 {
        self.crop_y
    }

    /// Zoom level the plan actually fetches at (caller zoom plus the
    /// enhancement step, when applied).
    pub fn effective_zoom(&self) -> u8 {
        self.effective_zoom
    }
}

/// Errors that can occur while planning a grid.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanError {
    /// Coordinate conversion rejected the inputs
    Coord(CoordError),
    /// Requested output size is zero
    InvalidOutputSize(u32),
    /// Source tile size is zero
    InvalidSourceTileSize(u32),
}

impl fmt::Display for PlanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlanError::Coord(e) => write!(f, "Coordinate error: {}", e),
            PlanError::InvalidOutputSize(size) => {
                write!(f, "Invalid output size: {} pixels", size)
            }
            PlanError::InvalidSourceTileSize(size) => {
                write!(f, "Invalid source tile size: {} pixels", size)
            }
        }
    }
}

impl std::error::Error for PlanError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PlanError::Coord(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CoordError> for PlanError {
    fn from(e: CoordError) -> Self {
        PlanError::Coord(e)
    }
}
