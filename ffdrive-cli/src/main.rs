// ============================================================================
// ffdrive-cli/src/main.rs
// ============================================================================
//
// FFDRIVE CLI: Main Entry Point
//
// Parses arguments, installs logging, layers the configuration and hands a
// Transcoder to the selected subcommand. Any error ends the process with
// exit code 1 after printing the full context chain.

use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use ffdrive_cli::commands::{album_art, check, convert, fps, probe, run};
use ffdrive_cli::output::print_error;
use ffdrive_cli::{Cli, Commands, load_config, logging};
use ffdrive_core::Transcoder;
use log::debug;

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    if let Err(e) = dispatch(cli) {
        print_error(&format!("{e:#}"));
        process::exit(1);
    }
}

fn dispatch(cli: Cli) -> Result<()> {
    let mut config = load_config(&cli)?;
    if let Commands::Convert(args) = &cli.command {
        config.report_progress = config.report_progress || args.progress;
        if args.timeout.is_some() {
            config.execute_timeout_secs = args.timeout;
        }
    }
    debug!("Effective configuration: {config:?}");

    let transcoder = Transcoder::new(config).context("Invalid configuration")?;

    match &cli.command {
        Commands::Probe(args) => probe::run_probe(&transcoder, args),
        Commands::Convert(args) => convert::run_convert(&transcoder, args),
        Commands::Run(args) => run::run_options(&transcoder, args),
        Commands::Fps(args) => fps::run_fps(&transcoder, args),
        Commands::AlbumArt(args) => album_art::run_album_art(&transcoder, args),
        Commands::Check => check::run_check(&transcoder),
    }
}
