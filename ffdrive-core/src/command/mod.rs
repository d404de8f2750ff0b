//! ffmpeg command construction.
//!
//! - [`level`]: the closed set of accepted `-loglevel` values
//! - [`builder`]: argument assembly, flag injection, quoting and raw passthrough
//! - [`chain`]: incremental construction of one pending command

pub mod builder;
pub mod chain;
pub mod level;

pub use builder::{CommandBuilder, FfmpegCommand, InputSpec, OptionInput, OutputSpec};
pub use chain::{ChainBuilder, StreamType};
pub use level::{LogLevel, ResolvedLevel, resolve_loglevel};
