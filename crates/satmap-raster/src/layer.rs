//! Per-material rasters: colorized layers and coverage masks.

use glam::Vec4;
use image::imageops;
use image::{GrayImage, RgbaImage};

use crate::extent::TerrainExtent;
use crate::tiler::RESAMPLE_FILTER;

/// A tiled, colorized RGBA raster for one material.
pub type Layer = RgbaImage;

/// A single-channel coverage raster for one material. 255 = full coverage.
pub type Mask = GrayImage;

/// Multiplies every pixel of `layer` by a display-encoded RGBA color.
pub fn colorize(layer: &mut Layer, color: Vec4) {
    let factors = color.to_array();
    for pixel in layer.pixels_mut() {
        for (channel, factor) in pixel.0.iter_mut().zip(factors) {
            *channel = (f32::from(*channel) * factor).round().clamp(0.0, 255.0) as u8;
        }
    }
}

/// Resamples `mask` to the terrain extent. Returns a copy when already that size.
pub fn resample_mask(mask: &Mask, extent: TerrainExtent) -> Mask {
    if mask.dimensions() == extent.dimensions() {
        mask.clone()
    } else {
        imageops::resize(mask, extent.width, extent.height, RESAMPLE_FILTER)
    }
}
