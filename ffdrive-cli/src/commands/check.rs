// ffdrive-cli/src/commands/check.rs

use anyhow::{Context, Result};
use ffdrive_core::Transcoder;

use crate::output::print_info;

/// Runs `<ffmpeg> -version` and reports the executable and its version line.
pub fn run_check(transcoder: &Transcoder) -> Result<()> {
    let exe = transcoder.ffmpeg_bin().display().to_string();
    let version = transcoder
        .check()
        .with_context(|| format!("ffmpeg executable '{exe}' is not usable"))?;
    print_info("Executable", &exe);
    print_info("Version", version);
    Ok(())
}
