//! Composite image assembly.
//!
//! Decodes fetched tiles and places them on a transparent RGBA canvas at
//! their planned offsets, then crops (and, as a guard, resamples) down to
//! the exact output size the caller asked for. Regions whose tile failed
//! to fetch or decode stay fully transparent - the consuming plugin
//! overlays the result on its radar display, so transparent means
//! "no weather data here", never an error.

use std::collections::HashMap;

use image::codecs::png::PngEncoder;
use image::imageops::{self, FilterType};
use image::{ExtendedColorType, ImageEncoder, RgbaImage};
use thiserror::Error;
use tracing::{debug, warn};

use crate::coord::TileCoord;
use crate::fetch::TileResults;
use crate::grid::GridPlan;

/// Errors that can occur while serializing a composite.
#[derive(Debug, Error)]
pub enum ComposeError {
    /// PNG serialization failed.
    #[error("PNG encoding failed: {0}")]
    Encode(#[from] image::ImageError),
}

/// Assembles the fetched tiles into one composite of the plan's output size.
///
/// Deterministic given the plan and the fetch outcomes: each tile lands at
/// its planned offset regardless of fetch completion order, and duplicate
/// placements overwrite pixel-for-pixel with identical content.
pub fn compose(plan: &GridPlan, results: &TileResults) -> RgbaImage {
    let canvas_size = plan.canvas_size();
    let mut canvas = RgbaImage::new(canvas_size, canvas_size);

    // Decode each distinct coordinate once, even when the grid repeats it
    let mut decoded: HashMap<TileCoord, Option<RgbaImage>> = HashMap::new();

    for placed in plan.tiles() {
        let tile = decoded.entry(placed.coord).or_insert_with(|| {
            let bytes = results.get(&placed.coord)?;
            match image::load_from_memory(bytes) {
                Ok(img) => Some(img.to_rgba8()),
                Err(e) => {
                    warn!(tile = %placed.coord, error = %e, "Fetched tile failed to decode");
                    None
                }
            }
        });

        if let Some(tile) = tile {
            place_tile(
                &mut canvas,
                tile,
                placed.x_offset,
                placed.y_offset,
                plan.source_tile_size(),
            );
        }
    }

    let output_size = plan.output_size();
    let cropped = imageops::crop_imm(
        &canvas,
        plan.crop_x(),
        plan.crop_y(),
        output_size,
        output_size,
    )
    .to_image();

    // The planner guarantees the crop matches the output size; resample
    // only if that ever stops holding
    if cropped.dimensions() != (output_size, output_size) {
        debug!(
            got_width = cropped.width(),
            got_height = cropped.height(),
            want = output_size,
            "Crop size mismatch - resampling"
        );
        return imageops::resize(&cropped, output_size, output_size, FilterType::Lanczos3);
    }

    cropped
}

/// Places a decoded tile onto the canvas at the specified offset.
///
/// Overwrites the destination pixel-for-pixel, no blending. Tiles that
/// are not exactly the expected source size are clipped to their cell.
fn place_tile(canvas: &mut RgbaImage, tile: &RgbaImage, x_offset: u32, y_offset: u32, cell: u32) {
    let width = tile.width().min(cell).min(canvas.width() - x_offset);
    let height = tile.height().min(cell).min(canvas.height() - y_offset);

    for y in 0..height {
        for x in 0..width {
            canvas.put_pixel(x_offset + x, y_offset + y, *tile.get_pixel(x, y));
        }
    }
}

/// A fully transparent canvas of the given dimensions.
pub fn blank_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::new(width.max(1), height.max(1))
}

/// Serializes an RGBA image as baseline, non-interlaced PNG.
///
/// The consuming plugin's decoder is minimal; the default PNG encoder
/// settings here produce exactly the plain stream it expects.
pub fn encode_png(image: &RgbaImage) -> Result<Vec<u8>, ComposeError> {
    let mut buffer = Vec::new();
    PngEncoder::new(&mut buffer).write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// A fully transparent PNG tile of the given dimensions.
///
/// The pipeline's ultimate safety net: no network, no decoding, and an
/// in-memory PNG encode of a well-formed buffer, which cannot fail.
pub fn blank_png(width: u32, height: u32) -> Vec<u8> {
    encode_png(&blank_image(width, height))
        .expect("encoding a blank RGBA image to memory cannot fail")
}
