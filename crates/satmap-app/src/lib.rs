//! Satmap generator: builds one seamless surface texture for a terrain from
//! per-material masks, material definitions and detail textures.
//!
//! [`run`] drives a whole generation. The [`locator`] module finds the files
//! it reads.

pub mod locator;
pub mod pipeline;

pub use locator::{AssetLocator, DefinitionFiles, list_masks};
pub use pipeline::{
    PipelineError, PipelineSettings, RunReport, SkipReason, Stage, build_layer, run, tile_size_for,
};
