//! Configuration structs with sensible defaults and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// File name of the persisted configuration.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level generator configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Input and output locations.
    pub paths: PathsConfig,
    /// Texture synthesis settings.
    pub generation: GenerationConfig,
    /// Debug/logging settings.
    pub debug: DebugConfig,
}

/// Input and output locations, relative to the working directory unless absolute.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    /// Directory holding one mask image per material.
    pub masks_dir: PathBuf,
    /// Directory searched recursively for material definitions and textures.
    pub data_dir: PathBuf,
    /// Output image path.
    pub output: PathBuf,
}

/// How layers are combined into the output image.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum BlendPolicy {
    /// Running weighted sums, finalized once. Holds only the accumulators.
    #[default]
    Incremental,
    /// All layers held, weights normalized per pixel at the end.
    Normalized,
}

/// How a material's `MiddleScaleUV` maps to a tile size in pixels.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum TileSizing {
    /// The scale is the repeat period in surface units (1 unit = 1 pixel).
    #[default]
    Period,
    /// The scale is the number of repeats across the terrain.
    RepeatCount,
}

/// Texture synthesis settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Terrain size as `WIDTHxHEIGHT` in surface units. Required for a run.
    pub terrain_size: Option<String>,
    /// Blending policy.
    pub blend_policy: BlendPolicy,
    /// Tile size derivation.
    pub tile_sizing: TileSizing,
    /// Mask file extensions, lowercase, without the dot.
    pub mask_extensions: Vec<String>,
    /// Texture file extensions in lookup order, lowercase, without the dot.
    pub texture_extensions: Vec<String>,
    /// Material definition file extension.
    pub definition_extension: String,
}

/// Debug/logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log filter (e.g., "debug", "info,satmap_raster=trace").
    pub log_level: String,
    /// Optional JSON log file.
    pub log_file: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            masks_dir: PathBuf::from("masks"),
            data_dir: PathBuf::from("data"),
            output: PathBuf::from("RESULT.png"),
        }
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            terrain_size: None,
            blend_policy: BlendPolicy::default(),
            tile_sizing: TileSizing::default(),
            mask_extensions: vec!["png".to_string()],
            texture_extensions: vec!["png".to_string(), "jpg".to_string()],
            definition_extension: "emat".to_string(),
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: None,
        }
    }
}

// --- Load / Save / Validate ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents =
                std::fs::read_to_string(&config_path).map_err(|source| ConfigError::Read {
                    path: config_path.clone(),
                    source,
                })?;
            let config: Config = ron::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: config_path.clone(),
                source,
            })?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(|source| ConfigError::Write {
            path: config_dir.to_path_buf(),
            source,
        })?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized = ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::Serialize)?;

        std::fs::write(&config_path, serialized).map_err(|source| ConfigError::Write {
            path: config_path,
            source,
        })?;
        Ok(())
    }

    /// Checks settings that have no usable default when left empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let generation = &self.generation;
        check_extensions("generation.mask_extensions", &generation.mask_extensions)?;
        check_extensions("generation.texture_extensions", &generation.texture_extensions)?;
        check_extensions(
            "generation.definition_extension",
            std::slice::from_ref(&generation.definition_extension),
        )?;
        if self.paths.output.as_os_str().is_empty() {
            return Err(ConfigError::Invalid {
                field: "paths.output",
                reason: "output path is empty".to_string(),
            });
        }
        Ok(())
    }
}

fn check_extensions(field: &'static str, extensions: &[String]) -> Result<(), ConfigError> {
    if extensions.is_empty() {
        return Err(ConfigError::Invalid {
            field,
            reason: "at least one extension is required".to_string(),
        });
    }
    if let Some(bad) = extensions
        .iter()
        .find(|e| e.is_empty() || e.starts_with('.'))
    {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{bad:?} must be a bare extension such as \"png\""),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("blend_policy: Incremental"));
        assert!(ron_str.contains("definition_extension: \"emat\""));
    }

    #[test]
    fn test_defaults_match_tool_layout() {
        let config = Config::default();
        assert_eq!(config.paths.masks_dir, PathBuf::from("masks"));
        assert_eq!(config.paths.data_dir, PathBuf::from("data"));
        assert_eq!(config.paths.output, PathBuf::from("RESULT.png"));
        assert_eq!(config.generation.texture_extensions, ["png", "jpg"]);
        assert_eq!(config.generation.tile_sizing, TileSizing::Period);
        assert_eq!(config.generation.terrain_size, None);
    }

    #[test]
    fn test_config_roundtrip() {
        let mut config = Config::default();
        config.generation.terrain_size = Some("2048x1024".to_string());
        config.generation.blend_policy = BlendPolicy::Normalized;
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(paths: (output: \"out.png\"))";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.paths.output, PathBuf::from("out.png"));
        assert_eq!(config.paths.masks_dir, PathBuf::from("masks"));
        assert_eq!(config.generation, GenerationConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_policies_parse_by_name() {
        let config: Config =
            ron::from_str("(generation: (blend_policy: Normalized, tile_sizing: RepeatCount))")
                .unwrap();
        assert_eq!(config.generation.blend_policy, BlendPolicy::Normalized);
        assert_eq!(config.generation.tile_sizing, TileSizing::RepeatCount);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.generation.terrain_size = Some("4096x4096".to_string());
        config.debug.log_file = Some(PathBuf::from("logs/satmap.json"));

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE), "{{not valid}}").unwrap();
        assert!(matches!(
            Config::load_or_create(dir.path()),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_empty_extension_list() {
        let mut config = Config::default();
        config.generation.texture_extensions.clear();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "generation.texture_extensions", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_dotted_extension() {
        let mut config = Config::default();
        config.generation.mask_extensions = vec![".png".to_string()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "generation.mask_extensions", .. })
        ));
    }

    #[test]
    fn test_ron_comments_accepted() {
        let ron_str = "// generator settings\n(\n  // nothing overridden\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }
}
