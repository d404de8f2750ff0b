//! Logging helpers for launched commands and captured transcripts.
//!
//! The library only emits records through the `log` facade; choosing a sink
//! is left to the binary.

use log::{Level, debug, log_enabled, trace, warn};

use crate::command::FfmpegCommand;

/// Logs the command line about to be executed.
pub fn log_command(id: &str, cmd: &FfmpegCommand) {
    let mode = if cmd.uses_shell() { "shell" } else { "argv" };
    debug!("[{id}] Executing ({mode}): {cmd}");
    for notice in cmd.notices() {
        debug!("[{id}] Build notice: {notice}");
    }
}

/// Dumps a captured transcript line by line at trace level.
pub fn log_transcript(id: &str, transcript: &str) {
    if !log_enabled!(Level::Trace) {
        return;
    }
    for line in transcript.lines().filter(|l| !l.trim().is_empty()) {
        trace!("[{id}] {line}");
    }
}

/// Logs a registry replacement, which means two callers picked the same id.
pub fn log_replaced_handle(id: &str) {
    warn!("A process is already registered as '{id}'; the newer one replaces it");
}
