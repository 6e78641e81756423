//! Command-line entry point for the satmap generator.
//!
//! Settings come from `config.ron` in the config directory (created with
//! defaults on first run) and are overridden by CLI flags.
//! Run with `satmap --size 4096x4096 --masks masks --data data -o RESULT.png`.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use satmap_app::{PipelineSettings, run};
use satmap_config::{CliArgs, Config};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    // Resolve config directory
    let config_dir = args.config.clone().unwrap_or_else(|| PathBuf::from("."));

    // Load or create config, then apply CLI overrides
    let mut config = Config::load_or_create(&config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    config.apply_cli_overrides(&args);

    satmap_log::init_logging(Some(&config));

    let settings = match PipelineSettings::from_config(&config) {
        Ok(settings) => settings,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    match run(&settings) {
        Ok(report) => {
            info!(
                "Wrote {} ({} materials blended, {} skipped)",
                report.output.display(),
                report.blended.len(),
                report.skipped.len()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Generation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
