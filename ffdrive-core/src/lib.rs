//! Core library for driving ffmpeg through its command line and reading
//! media metadata out of its diagnostic log.
//!
//! This crate builds ffmpeg invocations, runs and cancels them under
//! caller-chosen ids, estimates conversion progress, and parses ffmpeg's
//! stream description text into structured metadata without needing ffprobe.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use ffdrive_core::{Transcoder, TranscoderConfig};
//!
//! let config = TranscoderConfig::builder()
//!     .save_dir("/tmp/out")
//!     .report_progress(true)
//!     .build();
//! let transcoder = Transcoder::new(config).unwrap();
//! transcoder.on_progress(|p| println!("{p}%"));
//!
//! let meta = transcoder.probe("movie.mp4").unwrap();
//! println!("duration: {:?}, fps: {:?}", meta.duration(), meta.fps());
//!
//! let out = transcoder.convert("movie.mp4", "movie.mkv").unwrap();
//! println!("wrote {}", out.display());
//! ```

pub mod command;
pub mod config;
pub mod error;
pub mod logging;
pub mod monitor;
pub mod platform;
pub mod probe;
pub mod process;
pub mod progress;
pub mod transcoder;

// Re-exports for public API
pub use command::{
    ChainBuilder, CommandBuilder, FfmpegCommand, InputSpec, LogLevel, OptionInput, OutputSpec,
    StreamType,
};
pub use config::{TranscoderConfig, TranscoderConfigBuilder};
pub use error::{CoreError, CoreResult};
pub use monitor::{DurationSource, MonitorSettings, ProgressMonitor};
pub use platform::{Platform, ShellMode};
pub use probe::{AlbumArt, LogParser, MediaMetadata, Prober, StreamDescriptor, StreamKind, Tags};
pub use process::{CapturedOutput, ProcessControl, ProcessManager, ProcessRegistry, check_executable};
pub use progress::ProgressState;
pub use transcoder::Transcoder;
