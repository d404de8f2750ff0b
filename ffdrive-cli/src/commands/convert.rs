// ffdrive-cli/src/commands/convert.rs
//
// `ffdrive convert <INPUT> <OUTPUT> [--progress] [--timeout SECS]`
//
// The Transcoder is built by the caller with `report_progress` and the
// timeout already applied, so this only wires the progress bar.

use anyhow::{Context, Result};
use ffdrive_core::Transcoder;
use log::info;

use crate::cli::ConvertArgs;
use crate::output::create_progress_bar;

pub fn run_convert(transcoder: &Transcoder, args: &ConvertArgs) -> Result<()> {
    let bar = args.progress.then(|| {
        let pb = create_progress_bar(&args.input);
        let handle = pb.clone();
        transcoder.on_progress(move |percent| handle.set_position(u64::from(percent)));
        pb
    });

    let result = transcoder.convert(&args.input, &args.output);

    if let Some(pb) = bar {
        if result.is_ok() {
            pb.finish_with_message("done");
        } else {
            pb.abandon_with_message("failed");
        }
    }

    let out = result.with_context(|| format!("Failed to convert {}", args.input))?;
    info!("Wrote {}", out.display());
    println!("{}", out.display());
    Ok(())
}
