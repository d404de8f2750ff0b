// ============================================================================
// ffdrive-core/src/config/builder.rs
// ============================================================================
//
// CONFIGURATION BUILDER: Builder Pattern for TranscoderConfig
//
// Fluent construction of TranscoderConfig starting from the defaults.

use std::path::PathBuf;

use super::TranscoderConfig;
use crate::platform::ShellMode;

/// Builder for creating TranscoderConfig instances.
///
/// # Examples
///
/// ```rust
/// use ffdrive_core::config::TranscoderConfigBuilder;
///
/// let config = TranscoderConfigBuilder::new()
///     .executable("/usr/local/bin/ffmpeg")
///     .save_dir("/tmp/out")
///     .overwrite(false)
///     .loglevel("error")
///     .report_progress(true)
///     .build();
/// assert!(!config.overwrite);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TranscoderConfigBuilder {
    config: TranscoderConfig,
}

impl TranscoderConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.executable = path.into();
        self
    }

    #[must_use]
    pub fn save_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.save_dir = dir.into();
        self
    }

    #[must_use]
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.config.overwrite = overwrite;
        self
    }

    #[must_use]
    pub fn create_folders(mut self, create: bool) -> Self {
        self.config.create_folders = create;
        self
    }

    #[must_use]
    pub fn loglevel(mut self, level: impl Into<String>) -> Self {
        self.config.loglevel = level.into();
        self
    }

    #[must_use]
    pub fn report_progress(mut self, enabled: bool) -> Self {
        self.config.report_progress = enabled;
        self
    }

    #[must_use]
    pub fn shell(mut self, mode: ShellMode) -> Self {
        self.config.shell = mode;
        self
    }

    #[must_use]
    pub fn execute_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.execute_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn probe_timeout_secs(mut self, secs: Option<u64>) -> Self {
        self.config.probe_timeout_secs = secs;
        self
    }

    #[must_use]
    pub fn probe_settle_ms(mut self, ms: u64) -> Self {
        self.config.probe_settle_ms = ms;
        self
    }

    #[must_use]
    pub fn cancel_grace_ms(mut self, ms: u64) -> Self {
        self.config.cancel_grace_ms = ms;
        self
    }

    #[must_use]
    pub fn monitor_grace_ms(mut self, ms: u64) -> Self {
        self.config.monitor_grace_ms = ms;
        self
    }

    #[must_use]
    pub fn monitor_interval_ms(mut self, ms: u64) -> Self {
        self.config.monitor_interval_ms = ms;
        self
    }

    #[must_use]
    pub fn build(self) -> TranscoderConfig {
        self.config
    }
}
