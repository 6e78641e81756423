//! Command-line argument parsing for the satmap generator.

use std::path::PathBuf;

use clap::Parser;

use crate::{BlendPolicy, Config, TileSizing};

/// Satmap generator command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(
    name = "satmap",
    about = "Generate a seamless terrain surface texture from material masks"
)]
pub struct CliArgs {
    /// Terrain size in surface units, e.g. 4096x4096.
    #[arg(long)]
    pub size: Option<String>,

    /// Directory with one mask image per material.
    #[arg(long)]
    pub masks: Option<PathBuf>,

    /// Directory searched for material definitions and textures.
    #[arg(long)]
    pub data: Option<PathBuf>,

    /// Output image path.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// Layer blending policy.
    #[arg(long, value_enum)]
    pub blend: Option<BlendPolicy>,

    /// How material scale maps to tile size.
    #[arg(long, value_enum)]
    pub tile_sizing: Option<TileSizing>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Write JSON logs to this file.
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Path to config directory (defaults to the working directory).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ref size) = args.size {
            self.generation.terrain_size = Some(size.clone());
        }
        if let Some(ref masks) = args.masks {
            self.paths.masks_dir = masks.clone();
        }
        if let Some(ref data) = args.data {
            self.paths.data_dir = data.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.output = output.clone();
        }
        if let Some(policy) = args.blend {
            self.generation.blend_policy = policy;
        }
        if let Some(sizing) = args.tile_sizing {
            self.generation.tile_sizing = sizing;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref file) = args.log_file {
            self.debug.log_file = Some(file.clone());
        }
    }
}
