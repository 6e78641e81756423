//! Configuration error types.

use std::path::PathBuf;

/// Errors that can occur when loading, saving, or validating configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the config file from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// Config file path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the config file to disk.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Config file or directory path.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse RON content.
    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        /// Config file path.
        path: PathBuf,
        /// RON error with position.
        #[source]
        source: ron::error::SpannedError,
    },

    /// Failed to serialize config to RON.
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] ron::Error),

    /// A setting has an unusable value.
    #[error("invalid {field}: {reason}")]
    Invalid {
        /// Dotted field path, e.g. `generation.mask_extensions`.
        field: &'static str,
        /// What is wrong with it.
        reason: String,
    },
}
