//! Structured logging for the satmap generator.
//!
//! Console output goes through `tracing-subscriber` with uptime timestamps and
//! targets. The level comes from `RUST_LOG` when set, otherwise from the
//! config. A JSON copy of the log can be written to a file for later analysis.

use std::path::Path;

use satmap_config::Config;
use tracing::Subscriber;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config names a level.
pub const DEFAULT_FILTER: &str = "info";

/// Returns the filter directive configured for a run.
pub fn filter_directive(config: Option<&Config>) -> &str {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => config.debug.log_level.trim(),
        _ => DEFAULT_FILTER,
    }
}

/// Initialize the global tracing subscriber.
///
/// Sets up:
/// - Console output with uptime, targets and levels
/// - `RUST_LOG` filtering, falling back to the config `log_level`
/// - A JSON file layer when `debug.log_file` is set
///
/// If the log file cannot be created, console logging still starts and the
/// failure is reported as a warning.
///
/// # Examples
///
/// ```no_run
/// use satmap_config::Config;
/// use satmap_log::init_logging;
///
/// let config = Config::default();
/// init_logging(Some(&config));
/// ```
pub fn init_logging(config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    let log_file = config.and_then(|c| c.debug.log_file.as_deref());
    let Some(path) = log_file else {
        subscriber.init();
        return;
    };

    match open_log_file(path) {
        Ok(file) => subscriber.with(json_file_layer(file)).init(),
        Err(e) => {
            subscriber.init();
            tracing::warn!("could not open log file {}: {e}", path.display());
        }
    }
}

/// Structured JSON lines for machine parsing, no ANSI codes.
fn json_file_layer<S>(file: std::fs::File) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fmt::layer()
        .with_writer(file)
        .with_ansi(false)
        .with_target(true)
        .with_timer(fmt::time::uptime())
        .json()
}

fn open_log_file(path: &Path) -> std::io::Result<std::fs::File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::File::create(path)
}

/// Create an `EnvFilter` with [`DEFAULT_FILTER`].
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        let filter = default_env_filter();
        assert!(format!("{filter}").contains("info"));
    }

    #[test]
    fn test_filter_directive_without_config() {
        assert_eq!(filter_directive(None), "info");
    }

    #[test]
    fn test_filter_directive_from_config() {
        let mut config = Config::default();
        config.debug.log_level = "debug,satmap_raster=trace".to_string();
        assert_eq!(filter_directive(Some(&config)), "debug,satmap_raster=trace");
    }

    #[test]
    fn test_blank_level_falls_back_to_default() {
        let mut config = Config::default();
        config.debug.log_level = "  ".to_string();
        assert_eq!(filter_directive(Some(&config)), DEFAULT_FILTER);
    }

    #[test]
    fn test_env_filter_parsing() {
        let valid_filters = [
            "info",
            "debug,satmap_app=trace",
            "warn,satmap_materials=debug,satmap_raster=trace",
            "error",
        ];

        for filter_str in &valid_filters {
            let result = EnvFilter::try_new(filter_str);
            assert!(result.is_ok(), "Failed to parse filter: {filter_str}");
        }
    }

    #[test]
    fn test_log_file_parent_is_created() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("logs").join("satmap.json");
        open_log_file(&path).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_file_layer_writes_json_lines() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("satmap.json");
        let file = open_log_file(&path).unwrap();

        let subscriber = tracing_subscriber::registry().with(json_file_layer(file));
        tracing::subscriber::with_default(subscriber, || {
            tracing::info!(material = "Grass", "blended layer");
        });

        let contents = std::fs::read_to_string(&path).unwrap();
        let line = contents.lines().next().unwrap();
        let event: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(event["level"], "INFO");
        assert_eq!(event["fields"]["message"], "blended layer");
        assert_eq!(event["fields"]["material"], "Grass");
    }

    #[test]
    fn test_log_file_in_working_directory() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("satmap.json");
        assert!(open_log_file(&path).is_ok());
    }
}
