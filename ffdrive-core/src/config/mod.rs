//! Configuration for the ffdrive-core library.
//!
//! A [`TranscoderConfig`] can be built in code (directly or through
//! [`TranscoderConfigBuilder`]), loaded from a TOML file, and then adjusted
//! from `FFDRIVE_*` environment variables.

mod builder;
pub mod utils;

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::platform::ShellMode;
use utils::{get_env_bool, get_env_path, get_env_string};

pub use builder::TranscoderConfigBuilder;

// Default constants

/// Executable looked up on `PATH` when none is configured.
pub const DEFAULT_EXECUTABLE: &str = "ffmpeg";

/// ffmpeg verbosity for conversions; low enough to keep transcripts small.
pub const DEFAULT_LOGLEVEL: &str = "fatal";

/// Seconds a probe may run before it is killed.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 30;

/// Delay before a probe is asked to stop, giving ffmpeg time to print stream info.
pub const DEFAULT_PROBE_SETTLE_MS: u64 = 500;

/// Wait between the graceful stop request and a forced kill.
pub const DEFAULT_CANCEL_GRACE_MS: u64 = 1000;

/// Delay before the progress monitor's first poll.
pub const DEFAULT_MONITOR_GRACE_MS: u64 = 2000;

/// Interval between progress polls.
pub const DEFAULT_MONITOR_INTERVAL_MS: u64 = 1000;

// Environment variables

pub const ENV_FFMPEG: &str = "FFDRIVE_FFMPEG";
pub const ENV_LOGLEVEL: &str = "FFDRIVE_LOGLEVEL";
pub const ENV_SAVE_DIR: &str = "FFDRIVE_SAVE_DIR";
pub const ENV_OVERWRITE: &str = "FFDRIVE_OVERWRITE";
pub const ENV_REPORT_PROGRESS: &str = "FFDRIVE_REPORT_PROGRESS";

/// Settings shared by every command a [`Transcoder`](crate::Transcoder) runs.
///
/// Missing keys in a TOML file take their default values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscoderConfig {
    /// ffmpeg binary, a bare name resolved through `PATH` or a full path.
    pub executable: PathBuf,

    /// Base directory for relative output paths.
    pub save_dir: PathBuf,

    /// `-y` when true, `-n` when false.
    pub overwrite: bool,

    /// Create missing output directories.
    pub create_folders: bool,

    /// Requested ffmpeg `-loglevel`. Unknown values are replaced by `fatal`
    /// when a command is built.
    pub loglevel: String,

    /// Start a progress monitor during `convert`.
    pub report_progress: bool,

    pub shell: ShellMode,

    /// Upper bound for conversions, none by default.
    pub execute_timeout_secs: Option<u64>,

    pub probe_timeout_secs: Option<u64>,
    pub probe_settle_ms: u64,
    pub cancel_grace_ms: u64,
    pub monitor_grace_ms: u64,
    pub monitor_interval_ms: u64,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(DEFAULT_EXECUTABLE),
            save_dir: PathBuf::from("."),
            overwrite: true,
            create_folders: true,
            loglevel: DEFAULT_LOGLEVEL.to_string(),
            report_progress: false,
            shell: ShellMode::Auto,
            execute_timeout_secs: None,
            probe_timeout_secs: Some(DEFAULT_PROBE_TIMEOUT_SECS),
            probe_settle_ms: DEFAULT_PROBE_SETTLE_MS,
            cancel_grace_ms: DEFAULT_CANCEL_GRACE_MS,
            monitor_grace_ms: DEFAULT_MONITOR_GRACE_MS,
            monitor_interval_ms: DEFAULT_MONITOR_INTERVAL_MS,
        }
    }
}

impl TranscoderConfig {
    pub fn builder() -> TranscoderConfigBuilder {
        TranscoderConfigBuilder::new()
    }

    /// Loads a TOML file; absent keys keep their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Applies `FFDRIVE_*` environment variables on top of the current values.
    #[must_use]
    pub fn apply_env_overrides(mut self) -> Self {
        self.executable = get_env_path(ENV_FFMPEG, self.executable);
        self.loglevel = get_env_string(ENV_LOGLEVEL, self.loglevel);
        self.save_dir = get_env_path(ENV_SAVE_DIR, self.save_dir);
        self.overwrite = get_env_bool(ENV_OVERWRITE, self.overwrite);
        self.report_progress = get_env_bool(ENV_REPORT_PROGRESS, self.report_progress);
        self
    }

    /// Rejects settings no command could run with.
    ///
    /// An unknown loglevel is not rejected here; it is corrected at build time.
    pub fn validate(&self) -> CoreResult<()> {
        if self.executable.as_os_str().is_empty() {
            return Err(CoreError::Config("executable path is empty".to_string()));
        }
        let intervals = [
            ("monitor_interval_ms", self.monitor_interval_ms),
            ("cancel_grace_ms", self.cancel_grace_ms),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(CoreError::Config(format!("{name} must be greater than zero")));
            }
        }
        if self.execute_timeout_secs == Some(0) || self.probe_timeout_secs == Some(0) {
            return Err(CoreError::Config("timeouts must be greater than zero".to_string()));
        }
        Ok(())
    }

    /// Executable as a string for command lines.
    pub fn executable_str(&self) -> String {
        self.executable.to_string_lossy().into_owned()
    }
}
