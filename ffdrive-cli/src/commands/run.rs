// ffdrive-cli/src/commands/run.rs
//
// `ffdrive run -- <ARGS...>`: raw passthrough. Whatever ffmpeg wrote to
// stdout is forwarded; its diagnostics go to the log at trace level.

use std::io::{self, Write};

use anyhow::{Context, Result};
use ffdrive_core::{OptionInput, Transcoder};
use log::info;

use crate::cli::RunArgs;

pub fn run_options(transcoder: &Transcoder, args: &RunArgs) -> Result<()> {
    let output = transcoder
        .options(OptionInput::from_tokens(args.args.iter().cloned()))
        .context("ffmpeg run failed")?;

    info!(
        "ffmpeg finished in {:.2}s with code {:?}",
        output.elapsed.as_secs_f64(),
        output.code()
    );
    io::stdout()
        .write_all(output.stdout.as_bytes())
        .context("Failed to write ffmpeg output")?;
    Ok(())
}
