//! Layer blending: combines colorized layers weighted by their masks.
//!
//! Two policies produce the same image for masks with nonzero total weight:
//!
//! - [`NormalizedBlender`] keeps every layer and normalizes the weights per
//!   pixel at the end. Pixels no mask covers come out black.
//! - [`IncrementalBlender`] folds each layer into running sums and divides by
//!   the total weight, floored at [`WEIGHT_FLOOR`], when finalized. Only the
//!   accumulators are held, whatever the layer count.
//!
//! Both force the output alpha to fully opaque and round to the nearest
//! 8-bit value. Accumulation is commutative, so layer order does not matter.

use image::{Rgba, RgbaImage};
use thiserror::Error;
use tracing::debug;

use crate::extent::TerrainExtent;
use crate::layer::{Layer, Mask};

/// Smallest total weight used as a divisor.
pub const WEIGHT_FLOOR: f32 = 1e-6;

// ---------------------------------------------------------------------------
// BlendError
// ---------------------------------------------------------------------------

/// Errors returned by the blenders.
#[derive(Debug, Error, PartialEq)]
pub enum BlendError {
    /// A layer or mask does not match the blend extent.
    #[error("{what} is {found_w}x{found_h}, expected {expected}")]
    ExtentMismatch {
        /// Which raster was rejected ("layer" or "mask").
        what: &'static str,
        /// The blend extent.
        expected: TerrainExtent,
        /// Width of the rejected raster.
        found_w: u32,
        /// Height of the rejected raster.
        found_h: u32,
    },

    /// Finalize was called before any layer was added.
    #[error("no layers were blended")]
    Empty,
}

fn check_extent(extent: TerrainExtent, layer: &Layer, mask: &Mask) -> Result<(), BlendError> {
    let rasters = [("layer", layer.dimensions()), ("mask", mask.dimensions())];
    for (what, (found_w, found_h)) in rasters {
        if (found_w, found_h) != extent.dimensions() {
            return Err(BlendError::ExtentMismatch {
                what,
                expected: extent,
                found_w,
                found_h,
            });
        }
    }
    Ok(())
}

fn to_channel(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

/// Builds the opaque output from final RGB values, three per pixel.
fn opaque_image(extent: TerrainExtent, rgb: &[f32]) -> RgbaImage {
    let width = extent.width as usize;
    RgbaImage::from_fn(extent.width, extent.height, |x, y| {
        let i = (y as usize * width + x as usize) * 3;
        Rgba([
            to_channel(rgb[i]),
            to_channel(rgb[i + 1]),
            to_channel(rgb[i + 2]),
            u8::MAX,
        ])
    })
}

// ---------------------------------------------------------------------------
// IncrementalBlender
// ---------------------------------------------------------------------------

/// Streaming blender holding per-pixel running sums of `layer × mask` and `mask`.
pub struct IncrementalBlender {
    extent: TerrainExtent,
    /// Σ layer·mask, RGB per pixel. Alpha is never accumulated.
    weighted: Vec<f32>,
    /// Σ mask, one value per pixel.
    weights: Vec<f32>,
    layers: usize,
}

impl IncrementalBlender {
    /// Creates empty accumulators for `extent`.
    pub fn new(extent: TerrainExtent) -> Self {
        Self {
            extent,
            weighted: vec![0.0; extent.pixel_count() * 3],
            weights: vec![0.0; extent.pixel_count()],
            layers: 0,
        }
    }

    /// Folds one layer into the accumulators.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::ExtentMismatch`] if either raster differs from the extent.
    pub fn add(&mut self, layer: &Layer, mask: &Mask) -> Result<(), BlendError> {
        check_extent(self.extent, layer, mask)?;

        let pixels = layer.as_raw().chunks_exact(4);
        let sums = self.weighted.chunks_exact_mut(3);
        for (((sum, total), pixel), &m) in sums
            .zip(self.weights.iter_mut())
            .zip(pixels)
            .zip(mask.as_raw())
        {
            let w = f32::from(m) / 255.0;
            for (acc, &c) in sum.iter_mut().zip(&pixel[..3]) {
                *acc += f32::from(c) * w;
            }
            *total += w;
        }

        self.layers += 1;
        debug!(layers = self.layers, "accumulated layer");
        Ok(())
    }

    /// Number of layers accumulated so far.
    pub fn layer_count(&self) -> usize {
        self.layers
    }

    /// Divides the weighted sums by the floored total weight.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::Empty`] if no layer was added.
    pub fn finalize(self) -> Result<RgbaImage, BlendError> {
        if self.layers == 0 {
            return Err(BlendError::Empty);
        }

        let mut weighted = self.weighted;
        for (sum, &total) in weighted.chunks_exact_mut(3).zip(&self.weights) {
            let divisor = total.max(WEIGHT_FLOOR);
            sum.iter_mut().for_each(|c| *c /= divisor);
        }

        Ok(opaque_image(self.extent, &weighted))
    }
}

// ---------------------------------------------------------------------------
// NormalizedBlender
// ---------------------------------------------------------------------------

/// Batch blender: keeps every (layer, mask) pair and normalizes weights at the end.
pub struct NormalizedBlender {
    extent: TerrainExtent,
    layers: Vec<(Layer, Mask)>,
}

impl NormalizedBlender {
    /// Creates an empty blender for `extent`.
    pub fn new(extent: TerrainExtent) -> Self {
        Self {
            extent,
            layers: Vec::new(),
        }
    }

    /// Stores one layer for blending.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::ExtentMismatch`] if either raster differs from the extent.
    pub fn add(&mut self, layer: Layer, mask: Mask) -> Result<(), BlendError> {
        check_extent(self.extent, &layer, &mask)?;
        self.layers.push((layer, mask));
        Ok(())
    }

    /// Number of layers stored.
    pub fn layer_count(&self) -> usize {
        self.layers.len()
    }

    /// Blends all stored layers with per-pixel normalized weights.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::Empty`] if no layer was added.
    pub fn finalize(self) -> Result<RgbaImage, BlendError> {
        if self.layers.is_empty() {
            return Err(BlendError::Empty);
        }

        let pixel_count = self.extent.pixel_count();
        let mut totals = vec![0.0f32; pixel_count];
        for (_, mask) in &self.layers {
            for (total, &m) in totals.iter_mut().zip(mask.as_raw()) {
                *total += f32::from(m) / 255.0;
            }
        }

        let mut blended = vec![0.0f32; pixel_count * 3];
        for (layer, mask) in &self.layers {
            let pixels = layer.as_raw().chunks_exact(4);
            for (((acc, pixel), &m), &total) in blended
                .chunks_exact_mut(3)
                .zip(pixels)
                .zip(mask.as_raw())
                .zip(&totals)
            {
                if total <= 0.0 {
                    continue;
                }
                let w = (f32::from(m) / 255.0) / total;
                for (a, &c) in acc.iter_mut().zip(&pixel[..3]) {
                    *a += w * f32::from(c);
                }
            }
        }

        Ok(opaque_image(self.extent, &blended))
    }
}

// ---------------------------------------------------------------------------
// Blender
// ---------------------------------------------------------------------------

/// One blender for a run, under either policy.
pub enum Blender {
    /// See [`NormalizedBlender`].
    Normalized(NormalizedBlender),
    /// See [`IncrementalBlender`].
    Incremental(IncrementalBlender),
}

impl Blender {
    /// Adds one (layer, mask) pair.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::ExtentMismatch`] on a size mismatch.
    pub fn add(&mut self, layer: Layer, mask: Mask) -> Result<(), BlendError> {
        match self {
            Blender::Normalized(b) => b.add(layer, mask),
            Blender::Incremental(b) => b.add(&layer, &mask),
        }
    }

    /// Number of layers added so far.
    pub fn layer_count(&self) -> usize {
        match self {
            Blender::Normalized(b) => b.layer_count(),
            Blender::Incremental(b) => b.layer_count(),
        }
    }

    /// Produces the final opaque RGBA image.
    ///
    /// # Errors
    ///
    /// Returns [`BlendError::Empty`] if no layer was added.
    pub fn finalize(self) -> Result<RgbaImage, BlendError> {
        match self {
            Blender::Normalized(b) => b.finalize(),
            Blender::Incremental(b) => b.finalize(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
