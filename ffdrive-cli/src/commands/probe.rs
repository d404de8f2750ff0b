// ffdrive-cli/src/commands/probe.rs
//
// `ffdrive probe <FILE> [--json]`

use anyhow::{Context, Result};
use ffdrive_core::{MediaMetadata, Transcoder};
use log::info;

use crate::cli::ProbeArgs;
use crate::output::{print_heading, print_info, print_section};

pub fn run_probe(transcoder: &Transcoder, args: &ProbeArgs) -> Result<()> {
    info!("Probing {}", args.input);
    let meta = transcoder
        .probe(&args.input)
        .with_context(|| format!("Failed to probe {}", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&meta).context("Failed to serialise metadata")?;
        println!("{json}");
    } else {
        print_metadata(&args.input, &meta);
    }
    Ok(())
}

fn print_metadata(input: &str, meta: &MediaMetadata) {
    print_heading(input);
    let unknown = "unknown";
    print_info("Type", meta.media_type().unwrap_or(unknown));
    print_info("Duration", meta.duration().unwrap_or(unknown));
    print_info("Start", meta.start().unwrap_or(unknown));
    print_info("Bitrate", meta.bitrate().unwrap_or(unknown));
    print_info("FPS", meta.fps().unwrap_or(unknown));

    if !meta.container().is_empty() {
        print_section("Container");
        for (key, value) in meta.container() {
            print_info(key, value);
        }
    }

    for stream in meta.streams() {
        let title = match &stream.index {
            Some(index) => format!("Stream #{index} ({:?})", stream.kind),
            None => format!("Stream ({:?})", stream.kind),
        };
        print_section(&title);
        for (key, value) in &stream.tags {
            print_info(key, value);
        }
    }

    if !meta.trailer().is_empty() {
        print_section("Summary");
        for (key, value) in meta.trailer() {
            print_info(key, value);
        }
    }
}
