//! Configuration for the satmap generator.
//!
//! Settings persist to disk as a RON file with per-field defaults, so older or
//! partial files keep loading. CLI flags parsed with clap override the file.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    BlendPolicy, CONFIG_FILE, Config, DebugConfig, GenerationConfig, PathsConfig, TileSizing,
};
pub use error::ConfigError;
