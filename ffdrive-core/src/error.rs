// ============================================================================
// ffdrive-core/src/error.rs
// ============================================================================
//
// ERROR HANDLING: Custom Error Types for ffdrive-core
//
// This module defines the error types used throughout the library. Every
// failure the library can surface maps onto one variant of `CoreError`:
// spawn failures, failed or timed out ffmpeg invocations, transcripts that
// cannot be probed, and configuration problems.
//
// KEY COMPONENTS:
// - CoreError: Main error enum with variants for each failure class
// - CoreResult: Type alias for Result with CoreError
// - Helper functions for building the common process errors

use std::io;
use thiserror::Error;

/// Number of diagnostic lines kept in a `CommandFailed` error.
pub const ERROR_TAIL_LINES: usize = 12;

/// Custom error type for ffdrive-core operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The executable could not be started at all.
    #[error("Failed to start '{0}': {1}")]
    Spawn(String, #[source] io::Error),

    #[error("Executable not found: {0}")]
    ExecutableNotFound(String),

    /// Non-zero exit, or a zero exit without the output-opened marker.
    #[error("ffmpeg command [{id}] failed (exit code {code:?}): {tail}")]
    CommandFailed {
        id: String,
        code: Option<i32>,
        tail: String,
    },

    #[error("ffmpeg command [{id}] timed out after {secs} seconds")]
    Timeout { id: String, secs: u64 },

    /// The transcript had no "Input" section.
    #[error("Unprobeable file: {0}")]
    Unprobeable(String),

    #[error("File corrupt or codecs not available: {0}")]
    CorruptMedia(String),

    #[error("ffmpeg produced an empty transcript")]
    EmptyTranscript,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to parse configuration file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type for ffdrive-core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Builds a `CommandFailed` error carrying the last lines of the transcript.
pub fn command_failed_error(id: &str, code: Option<i32>, transcript: &str) -> CoreError {
    CoreError::CommandFailed {
        id: id.to_string(),
        code,
        tail: transcript_tail(transcript, ERROR_TAIL_LINES),
    }
}

/// Maps a spawn failure, distinguishing a missing binary from other I/O problems.
pub fn spawn_error(program: &str, err: io::Error) -> CoreError {
    if err.kind() == io::ErrorKind::NotFound {
        CoreError::ExecutableNotFound(program.to_string())
    } else {
        CoreError::Spawn(program.to_string(), err)
    }
}

/// Returns the last `max_lines` non-empty lines of a transcript.
pub fn transcript_tail(transcript: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = transcript
        .lines()
        .map(str::trim_end)
        .filter(|l| !l.trim().is_empty())
        .collect();
    let start = lines.len().saturating_sub(max_lines);
    let tail = lines[start..].join("\n");
    if tail.is_empty() {
        "no diagnostic output".to_string()
    } else {
        tail
    }
}
