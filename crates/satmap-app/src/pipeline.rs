//! The generation run: one colorized, tiled layer per mask, blended into a
//! single opaque surface texture.
//!
//! Per-material problems (no definition, no texture, broken inheritance) skip
//! that material and the run goes on. Unreadable images, size mismatches at
//! the blend stage and output failures end the run.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use image::{ImageError, RgbaImage};
use satmap_config::{BlendPolicy, Config, ConfigError, TileSizing};
use satmap_materials::{MaterialResolver, ResolveError, ResolvedMaterial, combine, resource_name};
use satmap_raster::{
    BlendError, Blender, ExtentError, IncrementalBlender, Layer, Mask, NormalizedBlender,
    TerrainExtent, colorize, period_tile_size, repeat_tile_size, resample_mask, tile_texture,
};
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::locator::{AssetLocator, DefinitionFiles, list_masks};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Stage of a material's processing that touches an image file.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// Decoding the detail texture.
    Texture,
    /// Decoding the mask.
    Mask,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Texture => write!(f, "texture"),
            Stage::Mask => write!(f, "mask"),
        }
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// No terrain size in config or on the command line.
    #[error("no terrain size given; pass --size WIDTHxHEIGHT or set generation.terrain_size")]
    MissingTerrainSize,

    /// The terrain size could not be parsed.
    #[error(transparent)]
    Extent(#[from] ExtentError),

    /// The data directory could not be indexed.
    #[error("failed to scan data directory {}: {source}", path.display())]
    Scan {
        /// Data directory.
        path: PathBuf,
        /// Walk error.
        #[source]
        source: walkdir::Error,
    },

    /// The masks directory could not be listed.
    #[error("failed to list masks in {}: {source}", path.display())]
    ListMasks {
        /// Masks directory.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An image could not be read or decoded.
    #[error("material {material}: failed to load {stage} {}: {source}", path.display())]
    Image {
        /// Material being processed.
        material: String,
        /// Which image.
        stage: Stage,
        /// Image file.
        path: PathBuf,
        /// Decode or I/O error.
        #[source]
        source: ImageError,
    },

    /// A layer or mask was rejected by the blender.
    #[error("material {material}: blend failed: {source}")]
    Blend {
        /// Material being processed.
        material: String,
        /// Blend error.
        #[source]
        source: BlendError,
    },

    /// Every material was skipped; there is nothing to write.
    #[error("no material could be blended ({skipped} skipped)")]
    NothingBlended {
        /// Number of skipped materials.
        skipped: usize,
    },

    /// The output image could not be written.
    #[error("failed to save {}: {source}", path.display())]
    Save {
        /// Output path.
        path: PathBuf,
        /// Encode or I/O error.
        #[source]
        source: ImageError,
    },
}

/// Why a material was left out of the blend.
#[derive(Debug, Error)]
pub enum SkipReason {
    /// No definition file for the mask's material.
    #[error("no material definition found")]
    NoDefinition,

    /// Inheritance could not be resolved.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Neither a middle map nor a detail map is referenced in the chain.
    #[error("no middle map or detail map referenced")]
    NoMapReference,

    /// The map reference does not name a file.
    #[error("map reference {0} has no file name")]
    UnnamedResource(String),

    /// No texture file matches the referenced name.
    #[error("no texture named {0} found")]
    TextureNotFound(String),
}

// ---------------------------------------------------------------------------
// Settings / report
// ---------------------------------------------------------------------------

/// Everything a run needs, resolved from [`Config`].
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineSettings {
    /// Directory with one mask per material.
    pub masks_dir: PathBuf,
    /// Directory with definitions and textures.
    pub data_dir: PathBuf,
    /// Output image path.
    pub output: PathBuf,
    /// Output size.
    pub extent: TerrainExtent,
    /// Blending policy.
    pub blend_policy: BlendPolicy,
    /// Tile size derivation.
    pub tile_sizing: TileSizing,
    /// Accepted mask extensions.
    pub mask_extensions: Vec<String>,
    /// Texture extensions in lookup order.
    pub texture_extensions: Vec<String>,
    /// Definition file extension.
    pub definition_extension: String,
}

impl PipelineSettings {
    /// Validates `config` and parses its terrain size.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::MissingTerrainSize`], [`PipelineError::Extent`]
    /// or [`PipelineError::Config`].
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        config.validate()?;
        let size = config
            .generation
            .terrain_size
            .as_deref()
            .ok_or(PipelineError::MissingTerrainSize)?;

        Ok(Self {
            masks_dir: config.paths.masks_dir.clone(),
            data_dir: config.paths.data_dir.clone(),
            output: config.paths.output.clone(),
            extent: size.parse()?,
            blend_policy: config.generation.blend_policy,
            tile_sizing: config.generation.tile_sizing,
            mask_extensions: config.generation.mask_extensions.clone(),
            texture_extensions: config.generation.texture_extensions.clone(),
            definition_extension: config.generation.definition_extension.clone(),
        })
    }
}

/// Outcome of a successful run.
#[derive(Debug)]
pub struct RunReport {
    /// Materials blended into the output, in processing order.
    pub blended: Vec<String>,
    /// Materials left out, with the reason.
    pub skipped: Vec<(String, SkipReason)>,
    /// Written image.
    pub output: PathBuf,
    /// Wall time of the run.
    pub elapsed: Duration,
}

// ---------------------------------------------------------------------------
// Layer construction
// ---------------------------------------------------------------------------

/// Tile size in pixels for `material` under the given sizing rule.
pub fn tile_size_for(
    material: &ResolvedMaterial,
    sizing: TileSizing,
    extent: TerrainExtent,
) -> (u32, u32) {
    match sizing {
        TileSizing::Period => period_tile_size(material.middle_scale),
        TileSizing::RepeatCount => repeat_tile_size(material.middle_scale, extent),
    }
}

/// Builds a material's layer: tiles `texture` across the extent and
/// multiplies it by the display-encoded `MiddleColor × Color`.
pub fn build_layer(
    material: &ResolvedMaterial,
    texture: &RgbaImage,
    extent: TerrainExtent,
    sizing: TileSizing,
) -> Layer {
    let tile_size = tile_size_for(material, sizing, extent);
    let mut layer = tile_texture(texture, tile_size, extent);
    colorize(&mut layer, combine(material.middle_color, material.color));
    layer
}

fn new_blender(policy: BlendPolicy, extent: TerrainExtent) -> Blender {
    match policy {
        BlendPolicy::Incremental => Blender::Incremental(IncrementalBlender::new(extent)),
        BlendPolicy::Normalized => Blender::Normalized(NormalizedBlender::new(extent)),
    }
}

// ---------------------------------------------------------------------------
// Run
// ---------------------------------------------------------------------------

enum Prepared {
    Ready(Layer, Mask),
    Skipped(SkipReason),
}

/// Runs a full generation and writes the output image.
///
/// # Errors
///
/// Returns a [`PipelineError`] for failures that make the output impossible
/// or untrustworthy. Per-material gaps are reported in [`RunReport::skipped`].
pub fn run(settings: &PipelineSettings) -> Result<RunReport, PipelineError> {
    let start = Instant::now();
    info!(
        extent = %settings.extent,
        policy = ?settings.blend_policy,
        "Starting generation"
    );

    let locator = AssetLocator::scan(&settings.data_dir).map_err(|source| PipelineError::Scan {
        path: settings.data_dir.clone(),
        source,
    })?;
    let masks = list_masks(&settings.masks_dir, &settings.mask_extensions).map_err(|source| {
        PipelineError::ListMasks {
            path: settings.masks_dir.clone(),
            source,
        }
    })?;
    info!("Found {} masks, {} data files", masks.len(), locator.len());
    if locator.is_empty() {
        warn!("Data directory {} holds no files", settings.data_dir.display());
    }

    let definitions = DefinitionFiles::new(&locator, &settings.definition_extension);
    let resolver = MaterialResolver::new(&definitions);
    let mut blender = new_blender(settings.blend_policy, settings.extent);
    let mut blended = Vec::new();
    let mut skipped = Vec::new();

    for mask_path in &masks {
        let Some(name) = mask_path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
            continue;
        };

        match prepare_material(&name, mask_path, settings, &locator, &resolver)? {
            Prepared::Ready(layer, mask) => {
                blender
                    .add(layer, mask)
                    .map_err(|source| PipelineError::Blend {
                        material: name.clone(),
                        source,
                    })?;
                blended.push(name);
            }
            Prepared::Skipped(reason) => {
                warn!("Skipping {name}: {reason}");
                skipped.push((name, reason));
            }
        }
    }

    let result = blender.finalize().map_err(|e| match e {
        BlendError::Empty => PipelineError::NothingBlended {
            skipped: skipped.len(),
        },
        other => PipelineError::Blend {
            material: String::new(),
            source: other,
        },
    })?;

    info!("Saving result to {}", settings.output.display());
    save_output(&result, &settings.output)?;

    let elapsed = start.elapsed();
    info!(
        blended = blended.len(),
        skipped = skipped.len(),
        "Generation completed in {:.2} seconds",
        elapsed.as_secs_f64()
    );

    Ok(RunReport {
        blended,
        skipped,
        output: settings.output.clone(),
        elapsed,
    })
}

#[instrument(skip_all, fields(material = %name))]
fn prepare_material(
    name: &str,
    mask_path: &Path,
    settings: &PipelineSettings,
    locator: &AssetLocator,
    resolver: &MaterialResolver<&DefinitionFiles<'_>>,
) -> Result<Prepared, PipelineError> {
    info!("Processing mask {name}");

    if resolver.source().path(name).is_none() {
        return Ok(Prepared::Skipped(SkipReason::NoDefinition));
    }
    let material = match resolver.resolve(name) {
        Ok(material) => material,
        Err(e) => return Ok(Prepared::Skipped(e.into())),
    };

    let Some(map) = material.tiling_map() else {
        return Ok(Prepared::Skipped(SkipReason::NoMapReference));
    };
    if material.middle_map.is_none() {
        warn!("No middle map referenced by {name}, falling back on detail map");
    }
    let Some(texture_name) = resource_name(map) else {
        return Ok(Prepared::Skipped(SkipReason::UnnamedResource(map.to_string())));
    };
    let Some(texture_path) = locator.find(texture_name, &settings.texture_extensions) else {
        return Ok(Prepared::Skipped(SkipReason::TextureNotFound(
            texture_name.to_string(),
        )));
    };

    let texture = open_image(name, Stage::Texture, texture_path)?.to_rgba8();
    let layer = build_layer(&material, &texture, settings.extent, settings.tile_sizing);

    let mask = open_image(name, Stage::Mask, mask_path)?.to_luma8();
    let mask = resample_mask(&mask, settings.extent);

    Ok(Prepared::Ready(layer, mask))
}

fn open_image(
    material: &str,
    stage: Stage,
    path: &Path,
) -> Result<image::DynamicImage, PipelineError> {
    image::open(path).map_err(|source| PipelineError::Image {
        material: material.to_string(),
        stage,
        path: path.to_path_buf(),
        source,
    })
}

fn save_output(image: &RgbaImage, path: &Path) -> Result<(), PipelineError> {
    let save_error = |source| PipelineError::Save {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| save_error(ImageError::IoError(e)))?;
    }
    image.save(path).map_err(save_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec4;
    use image::Rgba;

    fn material(scale: f32, color: Vec4, middle_color: Vec4) -> ResolvedMaterial {
        ResolvedMaterial {
            name: "m".to_string(),
            color,
            middle_color,
            detail_map: None,
            middle_map: Some("\"{00}Data/m.edds\"".to_string()),
            middle_scale: scale,
        }
    }

    #[test]
    fn test_tile_size_for_each_sizing() {
        let mat = material(64.0, Vec4::ONE, Vec4::ONE);
        let extent = TerrainExtent::new(256, 128);
        assert_eq!(tile_size_for(&mat, TileSizing::Period, extent), (64, 64));
        assert_eq!(tile_size_for(&mat, TileSizing::RepeatCount, extent), (4, 2));
    }

    #[test]
    fn test_build_layer_white_material_is_plain_tiling() {
        let texture = RgbaImage::from_fn(2, 2, |x, y| Rgba([x as u8 * 100, y as u8 * 100, 50, 255]));
        let layer = build_layer(
            &material(2.0, Vec4::ONE, Vec4::ONE),
            &texture,
            TerrainExtent::new(6, 4),
            TileSizing::Period,
        );
        assert_eq!(layer, satmap_raster::tile(&texture, TerrainExtent::new(6, 4)));
    }

    #[test]
    fn test_build_layer_applies_combined_color_once() {
        let texture = RgbaImage::from_pixel(2, 2, Rgba([200, 200, 200, 255]));
        let mat = material(2.0, Vec4::new(0.5, 1.0, 1.0, 1.0), Vec4::new(0.5, 1.0, 1.0, 1.0));
        let layer = build_layer(&mat, &texture, TerrainExtent::new(2, 2), TileSizing::Period);
        // 0.25 linear encodes to about 0.537 display.
        let expected_r = (200.0 * satmap_materials::linear_to_srgb(0.25)).round() as u8;
        assert!(layer.pixels().all(|p| *p == Rgba([expected_r, 200, 200, 255])));
    }

    #[test]
    fn test_settings_require_terrain_size() {
        let config = Config::default();
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(PipelineError::MissingTerrainSize)
        ));
    }

    #[test]
    fn test_settings_parse_terrain_size() {
        let mut config = Config::default();
        config.generation.terrain_size = Some("512x256".to_string());
        let settings = PipelineSettings::from_config(&config).unwrap();
        assert_eq!(settings.extent, TerrainExtent::new(512, 256));
        assert_eq!(settings.output, PathBuf::from("RESULT.png"));

        config.generation.terrain_size = Some("big".to_string());
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(PipelineError::Extent(_))
        ));
    }

    #[test]
    fn test_settings_reject_invalid_config() {
        let mut config = Config::default();
        config.generation.terrain_size = Some("8x8".to_string());
        config.generation.mask_extensions.clear();
        assert!(matches!(
            PipelineSettings::from_config(&config),
            Err(PipelineError::Config(_))
        ));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(Stage::Texture.to_string(), "texture");
        assert_eq!(Stage::Mask.to_string(), "mask");
    }
}
