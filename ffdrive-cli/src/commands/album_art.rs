// ffdrive-cli/src/commands/album_art.rs
//
// `ffdrive album-art <FILE> [-o OUT]`

use std::io::{self, Write};

use anyhow::{Context, Result};
use ffdrive_core::{AlbumArt, Transcoder};
use log::info;

use crate::cli::AlbumArtArgs;

pub fn run_album_art(transcoder: &Transcoder, args: &AlbumArtArgs) -> Result<()> {
    let art = transcoder
        .album_art(&args.input, args.output.as_deref())
        .with_context(|| format!("Failed to extract album art from {}", args.input))?;

    match art {
        AlbumArt::Saved(path) => {
            info!("Album art saved to {}", path.display());
            println!("{}", path.display());
        }
        AlbumArt::Bytes(bytes) => {
            info!("Album art is {} bytes", bytes.len());
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes).context("Failed to write album art")?;
            stdout.flush()?;
        }
    }
    Ok(())
}
