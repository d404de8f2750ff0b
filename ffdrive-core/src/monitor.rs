//! Background progress estimation for a running conversion.
//!
//! Instead of parsing ffmpeg's live stderr, the monitor re-probes the output
//! file on a timer and compares its duration against the input duration.
//! Values stay at or below 99 until the owning process has exited; only then
//! is 100 reported.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, trace};

use crate::error::CoreResult;
use crate::process::ProcessControl;
use crate::progress::ProgressState;

/// Highest value reported before the process is confirmed finished.
pub const MAX_RUNNING_PERCENT: u8 = 99;

/// Anything that can report how many seconds of media a file currently holds.
pub trait DurationSource: Send + Sync {
    /// `Ok(None)` when the file exists but its duration is not known yet.
    fn current_duration(&self, path: &Path) -> CoreResult<Option<f64>>;
}

/// Timing of the polling loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Delay before the first poll so the output file can appear.
    pub grace: Duration,
    pub interval: Duration,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            grace: Duration::from_millis(2000),
            interval: Duration::from_millis(1000),
        }
    }
}

/// `min(99, floor(current / input * 100))`; 0 when the input duration is unknown.
#[must_use]
pub fn progress_percent(current: f64, input: f64) -> u8 {
    if input.is_nan() || input <= 0.0 || !current.is_finite() || current <= 0.0 {
        return 0;
    }
    let percent = (current / input * 100.0).floor();
    if percent >= f64::from(MAX_RUNNING_PERCENT) {
        MAX_RUNNING_PERCENT
    } else {
        percent as u8
    }
}

/// Handle to the polling thread.
///
/// Stopping closes the control channel; dropping the handle does the same
/// without waiting for the thread.
pub struct ProgressMonitor {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl ProgressMonitor {
    /// Starts polling `output` while `process` runs.
    pub fn spawn(
        input_duration: f64,
        output: PathBuf,
        process: Arc<dyn ProcessControl>,
        source: Arc<dyn DurationSource>,
        state: Arc<ProgressState>,
        settings: MonitorSettings,
    ) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread = thread::spawn(move || {
            let stopped = |wait: Duration| {
                matches!(
                    stop_rx.recv_timeout(wait),
                    Ok(()) | Err(RecvTimeoutError::Disconnected)
                )
            };

            if stopped(settings.grace) {
                return;
            }
            loop {
                if !process.is_running() {
                    debug!("Monitored process exited, progress complete");
                    state.complete();
                    return;
                }
                if !output.exists() {
                    trace!("Waiting for {} to appear", output.display());
                } else if input_duration > 0.0 {
                    match source.current_duration(&output) {
                        Ok(Some(current)) => {
                            state.advance(progress_percent(current, input_duration));
                        }
                        Ok(None) => trace!("No duration yet for {}", output.display()),
                        Err(e) => debug!("Progress probe of {} failed: {e}", output.display()),
                    }
                }
                if stopped(settings.interval) {
                    return;
                }
            }
        });

        Self {
            stop: Some(stop_tx),
            thread: Some(thread),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stops polling and waits for the thread to exit.
    pub fn stop(mut self) {
        self.stop.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

impl Drop for ProgressMonitor {
    fn drop(&mut self) {
        self.stop.take();
    }
}
