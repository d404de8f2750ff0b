// ============================================================================
// ffdrive-core/src/transcoder.rs
// ============================================================================
//
// TRANSCODER: High-Level Facade over Command Building, Execution and Probing
//
// One Transcoder owns the configuration, a process manager shared with its
// prober, the progress state, and the pending chained command. The ids under
// which it registers processes are fixed: "convert", "run_chain" and
// "raw_options".
//
// KEY COMPONENTS:
// - convert: one input to one output, with optional progress monitoring
// - chain / run: incremental construction, executed and cleared by `run`
// - options: raw passthrough with flag injection
// - quit: graceful-then-forced cancellation by id, or of everything

use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use log::{error, info, warn};

use crate::command::chain::{ensure_parent_dir, resolve_output_path};
use crate::command::{ChainBuilder, CommandBuilder, InputSpec, OptionInput, OutputSpec};
use crate::config::TranscoderConfig;
use crate::error::{CoreError, CoreResult};
use crate::monitor::{MonitorSettings, ProgressMonitor};
use crate::probe::{AlbumArt, MediaMetadata, Prober};
use crate::process::{CapturedOutput, ProcessManager, check_executable, classify};
use crate::progress::ProgressState;

pub const CONVERT_ID: &str = "convert";
pub const CHAIN_ID: &str = "run_chain";
pub const RAW_OPTIONS_ID: &str = "raw_options";

/// Entry point for driving ffmpeg.
#[derive(Debug)]
pub struct Transcoder {
    config: TranscoderConfig,
    builder: CommandBuilder,
    manager: Arc<ProcessManager>,
    prober: Prober,
    progress: Arc<ProgressState>,
    chain: ChainBuilder,
    last_error: Mutex<Option<String>>,
}

impl Transcoder {
    /// Validates `config` and sets up the shared components.
    ///
    /// The executable is not started here; see [`Transcoder::check`].
    pub fn new(config: TranscoderConfig) -> CoreResult<Self> {
        config.validate()?;
        let builder = CommandBuilder::from_config(&config);
        let manager = Arc::new(ProcessManager::new(Duration::from_millis(
            config.cancel_grace_ms,
        )));
        let prober = Prober::from_config(&config, Arc::clone(&manager));
        let chain = ChainBuilder::new(&config.save_dir, config.create_folders, builder.platform());
        info!("Using ffmpeg executable {}", config.executable.display());

        Ok(Self {
            config,
            builder,
            manager,
            prober,
            progress: Arc::new(ProgressState::new()),
            chain,
            last_error: Mutex::new(None),
        })
    }

    pub fn config(&self) -> &TranscoderConfig {
        &self.config
    }

    pub fn builder(&self) -> &CommandBuilder {
        &self.builder
    }

    pub fn prober(&self) -> &Prober {
        &self.prober
    }

    /// Shared manager, usable to cancel from another thread.
    pub fn process_manager(&self) -> Arc<ProcessManager> {
        Arc::clone(&self.manager)
    }

    pub fn ffmpeg_bin(&self) -> &Path {
        &self.config.executable
    }

    /// Runs `<exe> -version` and returns its first line.
    pub fn check(&self) -> CoreResult<String> {
        check_executable(&self.config.executable_str())
    }

    fn execute_timeout(&self) -> Option<Duration> {
        self.config.execute_timeout_secs.map(Duration::from_secs)
    }

    fn record<T>(&self, result: CoreResult<T>) -> CoreResult<T> {
        let mut last = self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match &result {
            Ok(_) => *last = None,
            Err(e) => *last = Some(e.to_string()),
        }
        result
    }

    /// Message of the most recent failure; cleared by the next success.
    pub fn last_error(&self) -> Option<String> {
        self.last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    // ------------------------------------------------------------------------
    // Conversion
    // ------------------------------------------------------------------------

    /// Converts `input` into `output` and returns the resolved output path.
    ///
    /// Relative outputs land in the configured save directory. With
    /// `report_progress` set, progress is estimated while ffmpeg runs; it is
    /// 100 once this returns successfully.
    pub fn convert(&self, input: &str, output: &str) -> CoreResult<PathBuf> {
        let result = self.convert_inner(input, output);
        if let Err(e) = &result {
            error!("Conversion of {input} failed: {e}");
        }
        self.record(result)
    }

    fn convert_inner(&self, input: &str, output: &str) -> CoreResult<PathBuf> {
        let out = resolve_output_path(&self.config.save_dir, output);
        if self.config.create_folders {
            ensure_parent_dir(&out)?;
        }
        self.progress.reset();

        let cmd = self.builder.build(
            &[],
            &[InputSpec::new(input)],
            &[OutputSpec::new(out.to_string_lossy())],
            &[],
        );

        let input_duration = if self.config.report_progress {
            match self.prober.probe(input) {
                Ok(meta) => meta.duration_seconds().unwrap_or(0.0),
                Err(e) => {
                    warn!("Could not read input duration, progress stays at 0: {e}");
                    0.0
                }
            }
        } else {
            0.0
        };

        info!("Converting {input} -> {}", out.display());
        let running = self.manager.launch(CONVERT_ID, &cmd)?;
        let monitor = self.config.report_progress.then(|| {
            ProgressMonitor::spawn(
                input_duration,
                out.clone(),
                running.control(),
                Arc::new(self.prober.clone()),
                Arc::clone(&self.progress),
                MonitorSettings {
                    grace: Duration::from_millis(self.config.monitor_grace_ms),
                    interval: Duration::from_millis(self.config.monitor_interval_ms),
                },
            )
        });

        let waited = running.wait(self.execute_timeout());
        if let Some(monitor) = monitor {
            monitor.stop();
        }
        classify(waited?, cmd.expects_output_marker())?;

        self.progress.complete();
        info!("Conversion finished: {}", out.display());
        Ok(out)
    }

    // ------------------------------------------------------------------------
    // Chained commands
    // ------------------------------------------------------------------------

    /// The pending chained command.
    pub fn chain(&mut self) -> &mut ChainBuilder {
        &mut self.chain
    }

    /// Executes the pending chain; the chain is empty afterwards either way.
    pub fn run(&mut self) -> CoreResult<CapturedOutput> {
        let tokens = self.chain.take_tokens();
        let result = if tokens.is_empty() {
            Err(CoreError::InvalidInput("no chained options to run".to_string()))
        } else {
            let cmd = self.builder.finalize(tokens);
            self.manager.execute(CHAIN_ID, &cmd, self.execute_timeout())
        };
        self.record(result)
    }

    /// Runs caller supplied options with only the overwrite and loglevel flags added.
    pub fn options(&self, input: OptionInput) -> CoreResult<CapturedOutput> {
        let result = self.builder.passthrough(input).and_then(|cmd| {
            self.manager
                .execute(RAW_OPTIONS_ID, &cmd, self.execute_timeout())
        });
        self.record(result)
    }

    /// Stops the process registered as `id`, or all of them.
    pub fn quit(&self, id: Option<&str>) {
        self.manager.cancel(id);
    }

    // ------------------------------------------------------------------------
    // Progress
    // ------------------------------------------------------------------------

    pub fn progress(&self) -> u8 {
        self.progress.get()
    }

    /// Replaces the progress callback; it runs on the monitor thread.
    pub fn on_progress<F>(&self, callback: F)
    where
        F: Fn(u8) + Send + Sync + 'static,
    {
        self.progress.set_callback(callback);
    }

    pub fn subscribe_progress(&self) -> Receiver<u8> {
        self.progress.subscribe()
    }

    // ------------------------------------------------------------------------
    // Probing
    // ------------------------------------------------------------------------

    pub fn probe(&self, input: &str) -> CoreResult<MediaMetadata> {
        self.prober.probe(input)
    }

    pub fn get_fps(&self, input: &str) -> f64 {
        self.prober.get_fps(input)
    }

    pub fn album_art(&self, input: &str, out: Option<&Path>) -> CoreResult<AlbumArt> {
        self.prober.album_art(input, out)
    }
}
