//! Grayscale RGBA rasters of height grids.

use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat};

use crate::chunk::{Chunk, HeightGrid};
use crate::profile::HeightRange;

/// Errors from encoding or writing a heightmap raster.
#[derive(Debug, thiserror::Error)]
pub enum RasterError {
    #[error("invalid height range: min ({0}) must be below max ({1})")]
    InvalidHeightRange(f64, f64),
    #[error("image encoding error: {0}")]
    Image(#[from] image::ImageError),
}

/// A heightmap as row-major RGBA pixels, one pixel per grid cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HeightmapImage {
    /// Image width in pixels (grid columns).
    pub width: u32,
    /// Image height in pixels (grid rows).
    pub height: u32,
    /// Length = `width * height * 4`. R, G and B hold the grey value; alpha
    /// is always 255.
    pub pixels: Vec<u8>,
}

impl HeightmapImage {
    /// Encode a chunk against its own profile height range.
    pub fn encode(chunk: &Chunk) -> Self {
        encode_grid(&chunk.height_grid, chunk.height_range)
    }

    /// Encode a chunk against an explicit height range.
    pub fn encode_with_range(chunk: &Chunk, range: HeightRange) -> Result<Self, RasterError> {
        if !range.is_valid() {
            return Err(RasterError::InvalidHeightRange(range.min, range.max));
        }
        Ok(encode_grid(&chunk.height_grid, range))
    }

    /// Grey value of pixel `(x, y)`.
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn grey(&self, x: u32, y: u32) -> u8 {
        self.pixels[((y * self.width + x) * 4) as usize]
    }

    /// The raw RGBA bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.pixels
    }

    /// PNG-encode the raster in memory.
    pub fn to_png(&self) -> Result<Vec<u8>, RasterError> {
        let mut out = Vec::new();
        PngEncoder::new(&mut out).write_image(
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
        )?;
        Ok(out)
    }

    /// Write the raster as a PNG file.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), RasterError> {
        image::save_buffer_with_format(
            path,
            &self.pixels,
            self.width,
            self.height,
            ExtendedColorType::Rgba8,
            ImageFormat::Png,
        )?;
        Ok(())
    }
}

/// Maps `h` linearly from `range` onto `0..=255`. A degenerate range maps
/// everything to 0.
fn grey_level(h: f64, range: HeightRange) -> u8 {
    let span = range.span();
    if !span.is_finite() || span <= 0.0 {
        return 0;
    }
    let t = ((h - range.min) / span).clamp(0.0, 1.0);
    (t * 255.0).round() as u8
}

fn encode_grid(grid: &HeightGrid, range: HeightRange) -> HeightmapImage {
    let mut pixels = Vec::with_capacity(grid.as_slice().len() * 4);
    for &h in grid.as_slice() {
        let g = grey_level(h, range);
        pixels.extend_from_slice(&[g, g, g, 255]);
    }
    HeightmapImage {
        width: grid.size() as u32,
        height: grid.size() as u32,
        pixels,
    }
}
