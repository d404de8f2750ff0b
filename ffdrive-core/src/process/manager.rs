// ============================================================================
// ffdrive-core/src/process/manager.rs
// ============================================================================
//
// PROCESS MANAGER: Spawning, Supervising and Cancelling ffmpeg
//
// This module launches ffmpeg with piped stdin/stdout/stderr, drains both
// output pipes on reader threads, waits with an optional timeout and
// classifies the exit. Every launched process is registered under its caller
// id for exactly as long as it may be running.
//
// KEY COMPONENTS:
// - ChildProcess: ProcessControl over a std::process::Child
// - ProcessManager: execute / launch / cancel
// - RunningProcess: a registered process; dropping it unregisters it
// - CapturedOutput: exit status and fully drained output

use std::io::{self, BufRead, BufReader, Read, Write};
use std::process::{Child, ChildStdin, ExitStatus, Stdio};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, info, warn};

use super::registry::{ProcessControl, ProcessRegistry};
use crate::command::FfmpegCommand;
use crate::error::{CoreError, CoreResult, command_failed_error, spawn_error};
use crate::logging::{log_command, log_transcript};

/// Notice ffmpeg prints once the first output has been opened.
pub const OUTPUT_MARKER: &str = "Output #0";

/// Bytes written to stdin to ask ffmpeg to stop cleanly.
pub const QUIT_SEQUENCE: &[u8] = b"q\n";

/// Default wait between the graceful stop request and a forced kill.
pub const DEFAULT_CANCEL_GRACE: Duration = Duration::from_millis(1000);

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// How long to wait for a killed process to be reaped.
const REAP_TIMEOUT: Duration = Duration::from_secs(5);

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// CHILD PROCESS HANDLE
// ============================================================================

/// A spawned subprocess that can be polled, asked to quit, or killed.
pub struct ChildProcess {
    child: Mutex<Child>,
    stdin: Mutex<Option<ChildStdin>>,
    status: Mutex<Option<ExitStatus>>,
    pid: u32,
}

impl ChildProcess {
    fn new(mut child: Child) -> Self {
        let stdin = child.stdin.take();
        let pid = child.id();
        Self {
            child: Mutex::new(child),
            stdin: Mutex::new(stdin),
            status: Mutex::new(None),
            pid,
        }
    }

    /// Non-blocking exit check; the status is cached once seen.
    pub fn try_wait(&self) -> io::Result<Option<ExitStatus>> {
        let mut status = lock(&self.status);
        if status.is_none() {
            *status = lock(&self.child).try_wait()?;
        }
        Ok(*status)
    }

    /// Polls for exit for up to `limit`.
    ///
    /// The child lock is only held for each poll, so `kill` and `is_running`
    /// from other threads never wait behind this call.
    pub fn wait_for(&self, limit: Duration) -> io::Result<Option<ExitStatus>> {
        let deadline = Instant::now() + limit;
        loop {
            if let Some(status) = self.try_wait()? {
                return Ok(Some(status));
            }
            if Instant::now() >= deadline {
                return Ok(None);
            }
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Reaps a killed process, logging when it outlives [`REAP_TIMEOUT`].
    fn reap(&self, id: &str) -> bool {
        match self.wait_for(REAP_TIMEOUT) {
            Ok(Some(_)) => true,
            Ok(None) => {
                error!(
                    "[{id}] pid {} still running {}s after kill",
                    self.pid,
                    REAP_TIMEOUT.as_secs()
                );
                false
            }
            Err(e) => {
                error!("[{id}] Failed to wait for pid {}: {e}", self.pid);
                false
            }
        }
    }
}

impl ProcessControl for ChildProcess {
    fn is_running(&self) -> bool {
        matches!(self.try_wait(), Ok(None))
    }

    fn request_quit(&self) -> io::Result<()> {
        match lock(&self.stdin).as_mut() {
            Some(stdin) => {
                stdin.write_all(QUIT_SEQUENCE)?;
                stdin.flush()
            }
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "stdin already closed")),
        }
    }

    fn kill(&self) -> io::Result<()> {
        if self.try_wait()?.is_some() {
            return Ok(());
        }
        match lock(&self.child).kill() {
            // already exited and reaped between the check and the kill
            Err(e) if e.kind() == io::ErrorKind::InvalidInput => Ok(()),
            other => other,
        }
    }

    fn pid(&self) -> Option<u32> {
        Some(self.pid)
    }
}

// ============================================================================
// CAPTURED OUTPUT
// ============================================================================

/// Everything a finished process produced.
#[derive(Debug, Clone)]
pub struct CapturedOutput {
    pub id: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CapturedOutput {
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Diagnostic text: stderr, followed by stdout when stdout is not empty.
    pub fn transcript(&self) -> String {
        if self.stdout.trim().is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stderr, self.stdout)
        }
    }

    pub fn has_output_marker(&self) -> bool {
        self.stderr.contains(OUTPUT_MARKER) || self.stdout.contains(OUTPUT_MARKER)
    }
}

fn spawn_reader<R: Read + Send + 'static>(stream: Option<R>) -> JoinHandle<String> {
    thread::spawn(move || {
        let Some(stream) = stream else {
            return String::new();
        };
        let mut reader = BufReader::new(stream);
        let mut text = String::new();
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line) {
                Ok(0) => break,
                Ok(_) => text.push_str(&String::from_utf8_lossy(&line)),
                Err(e) => {
                    debug!("Stopped reading process output: {e}");
                    break;
                }
            }
        }
        text
    })
}

// ============================================================================
// RUNNING PROCESS
// ============================================================================

/// A launched, registered process.
///
/// The registry entry is removed when this value is dropped, whichever way
/// the caller leaves.
pub struct RunningProcess<'a> {
    registry: &'a ProcessRegistry,
    id: String,
    serial: u64,
    child: Arc<ChildProcess>,
    stdout: Option<JoinHandle<String>>,
    stderr: Option<JoinHandle<String>>,
    started: Instant,
}

impl RunningProcess<'_> {
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared control handle, e.g. for a progress monitor.
    pub fn control(&self) -> Arc<dyn ProcessControl> {
        self.child.clone()
    }

    pub fn request_quit(&self) -> io::Result<()> {
        self.child.request_quit()
    }

    fn drain(&mut self) -> (String, String) {
        let stdout = self
            .stdout
            .take()
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        let stderr = self
            .stderr
            .take()
            .map(|h| h.join().unwrap_or_default())
            .unwrap_or_default();
        (stdout, stderr)
    }

    /// Waits for exit, killing the process once `timeout` has elapsed.
    ///
    /// Output is returned only after both pipes are fully drained. A non-zero
    /// exit is not an error here; see [`classify`].
    pub fn wait(mut self, timeout: Option<Duration>) -> CoreResult<CapturedOutput> {
        let status = loop {
            if let Some(status) = self.child.try_wait()? {
                break status;
            }
            if let Some(limit) = timeout {
                if self.started.elapsed() >= limit {
                    warn!(
                        "[{}] Timed out after {:.1}s, killing process",
                        self.id,
                        limit.as_secs_f64()
                    );
                    if let Err(e) = self.child.kill() {
                        error!("[{}] Failed to kill timed out process: {e}", self.id);
                    }
                    // the pipes only close once the process is gone
                    if self.child.reap(&self.id) {
                        let (_, stderr) = self.drain();
                        log_transcript(&self.id, &stderr);
                    }
                    return Err(CoreError::Timeout {
                        id: self.id.clone(),
                        secs: limit.as_secs(),
                    });
                }
            }
            thread::sleep(POLL_INTERVAL);
        };

        let (stdout, stderr) = self.drain();
        log_transcript(&self.id, &stderr);
        Ok(CapturedOutput {
            id: self.id.clone(),
            status,
            stdout,
            stderr,
            elapsed: self.started.elapsed(),
        })
    }
}

impl Drop for RunningProcess<'_> {
    fn drop(&mut self) {
        if self.child.is_running() {
            // abandoned while still running; don't leave an orphan behind
            let _ = self.child.kill();
            self.child.reap(&self.id);
        }
        self.registry.unregister(&self.id, self.serial);
    }
}

/// Applies the exit rules: non-zero is a failure, and so is a zero exit
/// without the output marker when the loglevel would have printed it.
pub fn classify(output: CapturedOutput, expects_marker: bool) -> CoreResult<CapturedOutput> {
    if !output.success() {
        error!("[{}] ffmpeg exited with {:?}", output.id, output.code());
        return Err(command_failed_error(&output.id, output.code(), &output.transcript()));
    }
    if expects_marker && !output.has_output_marker() {
        error!("[{}] ffmpeg exited cleanly but never opened an output", output.id);
        return Err(command_failed_error(&output.id, output.code(), &output.transcript()));
    }
    Ok(output)
}

// ============================================================================
// MANAGER
// ============================================================================

/// Launches ffmpeg processes and tracks them by caller-chosen id.
#[derive(Debug)]
pub struct ProcessManager {
    registry: ProcessRegistry,
    cancel_grace: Duration,
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new(DEFAULT_CANCEL_GRACE)
    }
}

impl ProcessManager {
    #[must_use]
    pub fn new(cancel_grace: Duration) -> Self {
        Self {
            registry: ProcessRegistry::new(),
            cancel_grace,
        }
    }

    pub fn registry(&self) -> &ProcessRegistry {
        &self.registry
    }

    pub fn cancel_grace(&self) -> Duration {
        self.cancel_grace
    }

    /// Spawns `cmd` and registers it under `id`.
    pub fn launch(&self, id: &str, cmd: &FfmpegCommand) -> CoreResult<RunningProcess<'_>> {
        log_command(id, cmd);
        let mut process = cmd.to_process_command();
        process
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = process.spawn().map_err(|e| {
            error!("[{id}] Failed to spawn {}: {e}", cmd.program());
            spawn_error(cmd.program(), e)
        })?;

        let stdout = spawn_reader(child.stdout.take());
        let stderr = spawn_reader(child.stderr.take());
        let child = Arc::new(ChildProcess::new(child));
        let serial = self.registry.register(id, child.clone());
        debug!("[{id}] Started pid {}", child.pid);

        Ok(RunningProcess {
            registry: &self.registry,
            id: id.to_string(),
            serial,
            child,
            stdout: Some(stdout),
            stderr: Some(stderr),
            started: Instant::now(),
        })
    }

    /// Runs `cmd` to completion and classifies the result.
    ///
    /// The registry holds no entry for `id` once this returns, on any path.
    pub fn execute(
        &self,
        id: &str,
        cmd: &FfmpegCommand,
        timeout: Option<Duration>,
    ) -> CoreResult<CapturedOutput> {
        let running = self.launch(id, cmd)?;
        let output = running.wait(timeout)?;
        let output = classify(output, cmd.expects_output_marker())?;
        info!("[{id}] Completed in {:.2}s", output.elapsed.as_secs_f64());
        Ok(output)
    }

    /// Stops the process registered as `id`, or every live process for `None`.
    ///
    /// Each process is asked to quit, given the grace period, then killed.
    /// Unknown or already finished ids are ignored.
    pub fn cancel(&self, id: Option<&str>) {
        let targets: Vec<(String, Arc<dyn ProcessControl>)> = match id {
            Some(id) => self
                .registry
                .lookup(id)
                .map(|h| (id.to_string(), h))
                .into_iter()
                .collect(),
            None => self.registry.snapshot(),
        };

        match targets.as_slice() {
            [] => debug!("No live process to cancel for {id:?}"),
            [(id, handle)] => stop_gracefully(id, handle.as_ref(), self.cancel_grace),
            _ => thread::scope(|scope| {
                for (id, handle) in &targets {
                    let grace = self.cancel_grace;
                    scope.spawn(move || stop_gracefully(id, handle.as_ref(), grace));
                }
            }),
        }
    }
}

/// Quit request, bounded wait, then kill.
pub fn stop_gracefully(id: &str, handle: &dyn ProcessControl, grace: Duration) {
    if !handle.is_running() {
        debug!("[{id}] Already exited, nothing to cancel");
        return;
    }

    info!("[{id}] Requesting graceful stop");
    if let Err(e) = handle.request_quit() {
        debug!("[{id}] Could not send quit request: {e}");
    }

    let deadline = Instant::now() + grace;
    while Instant::now() < deadline {
        if !handle.is_running() {
            debug!("[{id}] Stopped after quit request");
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }

    if handle.is_running() {
        warn!("[{id}] Still running after {}ms, killing", grace.as_millis());
        if let Err(e) = handle.kill() {
            error!("[{id}] Kill failed: {e}");
        }
    }
}

/// Runs `<exe> -version` and returns the first line of its output.
pub fn check_executable(executable: &str) -> CoreResult<String> {
    let cmd = FfmpegCommand::from_argv(executable, ["-version"]);
    let manager = ProcessManager::default();
    // -version never prints the output marker, so only the exit code counts
    let output = manager
        .launch("check", &cmd)?
        .wait(Some(Duration::from_secs(10)))?;
    if !output.success() {
        return Err(command_failed_error("check", output.code(), &output.transcript()));
    }
    Ok(output.stdout.lines().next().unwrap_or_default().to_string())
}
