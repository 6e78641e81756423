//! Seamless tiling of a detail texture across the terrain extent.
//!
//! Tiles are anchored at the bottom-left corner of the extent: rows stack
//! upward from the bottom edge and columns run rightward from the left edge.
//! Tiles that overflow the top or right edge are cropped, never scaled, so
//! the repeat period is exact whatever the extent-to-tile ratio.

use image::RgbaImage;
use image::imageops::{self, FilterType};

use crate::extent::TerrainExtent;

/// Filter used when resizing detail textures and masks.
pub const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

/// Tile edge for a texture repeating every `scale` surface units.
///
/// One surface unit maps to one pixel. Never smaller than 1.
pub fn period_tile_size(scale: f32) -> (u32, u32) {
    let edge = scale.round().max(1.0) as u32;
    (edge, edge)
}

/// Tile size for a texture repeating `repeats` times across the extent on
/// each axis, rounded up so the repeats cover the whole extent.
pub fn repeat_tile_size(repeats: f32, extent: TerrainExtent) -> (u32, u32) {
    let axis = |len: u32| (len as f32 / repeats).ceil().max(1.0) as u32;
    (axis(extent.width), axis(extent.height))
}

/// Resizes `source` to `width × height`. Returns a copy when already that size.
pub fn resize_tile(source: &RgbaImage, width: u32, height: u32) -> RgbaImage {
    if source.dimensions() == (width, height) {
        source.clone()
    } else {
        imageops::resize(source, width, height, RESAMPLE_FILTER)
    }
}

/// Replicates `tile` across `extent`, anchored bottom-left, cropping the
/// tiles that overflow the top and right edges.
///
/// An empty tile yields a fully transparent layer.
pub fn tile(tile: &RgbaImage, extent: TerrainExtent) -> RgbaImage {
    let mut layer = RgbaImage::new(extent.width, extent.height);
    let (tile_w, tile_h) = tile.dimensions();
    if tile_w == 0 || tile_h == 0 {
        return layer;
    }

    let mut bottom = i64::from(extent.height);
    while bottom > 0 {
        let top = bottom - i64::from(tile_h);
        // Rows of this tile row that lie above the extent.
        let cropped_rows = (-top).max(0) as u32;
        let visible_h = tile_h - cropped_rows;

        let mut left = 0u32;
        while left < extent.width {
            let visible_w = tile_w.min(extent.width - left);
            let piece = imageops::crop_imm(tile, 0, cropped_rows, visible_w, visible_h).to_image();
            imageops::replace(&mut layer, &piece, i64::from(left), top.max(0));
            left += tile_w;
        }

        bottom = top;
    }

    layer
}

/// Resizes `source` to `tile_size` and tiles it across `extent`.
///
/// A tile larger than the extent is never built in full: only its visible
/// bottom-left window is resampled, from the matching region of `source`.
pub fn tile_texture(source: &RgbaImage, tile_size: (u32, u32), extent: TerrainExtent) -> RgbaImage {
    let (tile_w, tile_h) = tile_size;
    if tile_w <= extent.width && tile_h <= extent.height {
        return tile(&resize_tile(source, tile_w, tile_h), extent);
    }

    let (src_w, src_h) = source.dimensions();
    if src_w == 0 || src_h == 0 || tile_w == 0 || tile_h == 0 {
        return RgbaImage::new(extent.width, extent.height);
    }

    let visible_w = tile_w.min(extent.width);
    let visible_h = tile_h.min(extent.height);
    // Source pixels covering the visible fraction of the tile, at least one.
    let span = |src: u32, visible: u32, full: u32| {
        let fraction = f64::from(visible) / f64::from(full);
        ((f64::from(src) * fraction).ceil() as u32).clamp(1, src)
    };
    let crop_w = span(src_w, visible_w, tile_w);
    let crop_h = span(src_h, visible_h, tile_h);

    let region = imageops::crop_imm(source, 0, src_h - crop_h, crop_w, crop_h).to_image();
    tile(&resize_tile(&region, visible_w, visible_h), extent)
}
