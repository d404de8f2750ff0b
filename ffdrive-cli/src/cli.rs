// ffdrive-cli/src/cli.rs
//
// Defines the command-line argument structures using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

// --- CLI Argument Definition ---

#[derive(Parser, Debug)]
#[command(
    author,
    version, // Reads from Cargo.toml via "cargo" feature in clap
    about = "ffdrive: drive ffmpeg from the command line",
    long_about = "Probes media files from ffmpeg's own diagnostic output and runs \
                  conversions through the ffdrive-core library."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// ffmpeg executable to use (a name on PATH or a full path)
    #[arg(long, global = true, value_name = "PATH", env = "FFDRIVE_FFMPEG")]
    pub ffmpeg: Option<PathBuf>,

    /// TOML configuration file
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// ffmpeg -loglevel for built commands (unknown values fall back to fatal)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub loglevel: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print container, stream and tag information for a media file
    Probe(ProbeArgs),
    /// Convert one input into one output
    Convert(ConvertArgs),
    /// Run ffmpeg with the given options; only -y/-n and -loglevel are added
    Run(RunArgs),
    /// Print the frame rate of the first video stream
    Fps(FpsArgs),
    /// Extract embedded cover art
    AlbumArt(AlbumArtArgs),
    /// Verify that the ffmpeg executable runs
    Check,
}

#[derive(Args, Debug)]
pub struct ProbeArgs {
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Print the full metadata as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ConvertArgs {
    #[arg(value_name = "INPUT")]
    pub input: String,

    /// Relative paths are placed under the configured save directory
    #[arg(value_name = "OUTPUT")]
    pub output: String,

    /// Show a progress bar estimated from the growing output file
    #[arg(long)]
    pub progress: bool,

    /// Kill ffmpeg if the conversion takes longer than this
    #[arg(long, value_name = "SECS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Options passed to ffmpeg as-is
    #[arg(
        value_name = "ARGS",
        required = true,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

#[derive(Args, Debug)]
pub struct FpsArgs {
    #[arg(value_name = "FILE")]
    pub input: String,
}

#[derive(Args, Debug)]
pub struct AlbumArtArgs {
    #[arg(value_name = "FILE")]
    pub input: String,

    /// Where to write the image; without it the bytes go to stdout
    #[arg(short, long, value_name = "OUT")]
    pub output: Option<PathBuf>,
}
