// ffdrive-cli/src/config.rs
//
// Layers the library configuration: file (or defaults), then FFDRIVE_*
// environment variables, then command-line flags.

use anyhow::{Context, Result};
use ffdrive_core::TranscoderConfig;

use crate::cli::Cli;

pub fn load_config(cli: &Cli) -> Result<TranscoderConfig> {
    let base = match &cli.config {
        Some(path) => TranscoderConfig::from_file(path)
            .with_context(|| format!("Failed to load config file {}", path.display()))?,
        None => TranscoderConfig::default(),
    };
    let mut config = base.apply_env_overrides();

    if let Some(ffmpeg) = &cli.ffmpeg {
        config.executable = ffmpeg.clone();
    }
    if let Some(level) = &cli.loglevel {
        config.loglevel = level.clone();
    }
    Ok(config)
}
