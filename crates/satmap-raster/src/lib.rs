//! Raster stages of the texture pipeline: seamless tiling, layer colorization,
//! mask resampling, and weighted layer blending.

mod blend;
mod extent;
mod layer;
mod tiler;

pub use blend::{BlendError, Blender, IncrementalBlender, NormalizedBlender, WEIGHT_FLOOR};
pub use extent::{ExtentError, TerrainExtent};
pub use layer::{Layer, Mask, colorize, resample_mask};
pub use tiler::{
    RESAMPLE_FILTER, period_tile_size, repeat_tile_size, resize_tile, tile, tile_texture,
};
