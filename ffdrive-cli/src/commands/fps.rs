// ffdrive-cli/src/commands/fps.rs

use anyhow::Result;
use ffdrive_core::Transcoder;

use crate::cli::FpsArgs;

/// Prints the frame rate; 0 when the file has no video stream or cannot be probed.
pub fn run_fps(transcoder: &Transcoder, args: &FpsArgs) -> Result<()> {
    println!("{}", transcoder.get_fps(&args.input));
    Ok(())
}
