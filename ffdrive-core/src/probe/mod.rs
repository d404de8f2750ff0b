// ============================================================================
// ffdrive-core/src/probe/mod.rs
// ============================================================================
//
// PROBING: Media Metadata Without ffprobe
//
// ffmpeg is run against the file with a discarded output, stopped after its
// initial analysis, and its diagnostic transcript is parsed into
// MediaMetadata.
//
// KEY COMPONENTS:
// - Prober: spawns the probe invocation and parses the result
// - MediaMetadata / StreamDescriptor: the parsed model with typed accessors
// - LogParser (parser.rs) and the extraction rules (rules.rs)

pub mod parser;
pub mod rules;

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};
use serde::Serialize;

use crate::command::{CommandBuilder, InputSpec, OutputSpec};
use crate::command::chain::ensure_parent_dir;
use crate::config::TranscoderConfig;
use crate::error::CoreResult;
use crate::monitor::DurationSource;
use crate::process::{ProcessControl, ProcessManager};

pub use parser::{CONTINUATION_JOINER, LogParser, MISDETECTION_MARKER, UNPAIRED_KEY, generate_tags};
pub use rules::{DefaultRules, HeaderRules};

/// Attribute name → value.
pub type Tags = BTreeMap<String, String>;

// ============================================================================
// MODEL
// ============================================================================

/// Elementary stream class, from the word after the stream index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

impl StreamKind {
    #[must_use]
    pub fn from_header(line: &str) -> Self {
        [
            ("Video:", StreamKind::Video),
            ("Audio:", StreamKind::Audio),
            ("Subtitle:", StreamKind::Subtitle),
            ("Data:", StreamKind::Data),
            ("Attachment:", StreamKind::Attachment),
        ]
        .into_iter()
        .find(|(marker, _)| line.contains(marker))
        .map_or(StreamKind::Unknown, |(_, kind)| kind)
    }
}

/// One stream as declared in the transcript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    /// `input:stream`, e.g. `0:1`.
    pub index: Option<String>,
    pub kind: StreamKind,
    pub tags: Tags,
}

impl StreamDescriptor {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }
}

/// Everything recovered from one probe.
///
/// `tags` is the flat mapping of all stream and trailer attributes where a
/// later stream overwrites an earlier one with the same key; `streams` keeps
/// each stream's own attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MediaMetadata {
    pub(crate) container: Tags,
    pub(crate) tags: Tags,
    pub(crate) trailer: Tags,
    pub(crate) streams: Vec<StreamDescriptor>,
    pub(crate) media_type: Option<String>,
}

impl MediaMetadata {
    pub fn container(&self) -> &Tags {
        &self.container
    }

    pub fn tags(&self) -> &Tags {
        &self.tags
    }

    pub fn trailer(&self) -> &Tags {
        &self.trailer
    }

    pub fn streams(&self) -> &[StreamDescriptor] {
        &self.streams
    }

    /// Container value for `key`, falling back to the trailer.
    fn container_first(&self, key: &str) -> Option<&str> {
        self.container
            .get(key)
            .or_else(|| self.trailer.get(key))
            .map(String::as_str)
    }

    /// `Duration` as printed, e.g. `00:00:04.37`.
    pub fn duration(&self) -> Option<&str> {
        self.container_first("Duration")
    }

    pub fn start(&self) -> Option<&str> {
        self.container_first("start")
    }

    pub fn bitrate(&self) -> Option<&str> {
        self.container_first("bitrate")
    }

    /// Frame rate of the first stream that declares one.
    pub fn fps(&self) -> Option<&str> {
        self.streams.iter().find_map(|s| s.get("fps"))
    }

    pub fn fps_value(&self) -> Option<f64> {
        self.fps().and_then(parse_rate)
    }

    /// Preferred demuxer name, e.g. `mp4`.
    pub fn media_type(&self) -> Option<&str> {
        self.media_type.as_deref()
    }

    pub fn duration_seconds(&self) -> Option<f64> {
        self.duration().and_then(parse_timestamp)
    }

    pub fn video_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Video)
    }

    pub fn audio_streams(&self) -> impl Iterator<Item = &StreamDescriptor> {
        self.streams.iter().filter(|s| s.kind == StreamKind::Audio)
    }
}

/// `HH:MM:SS(.ss)` to seconds; `N/A` and malformed input give `None`.
#[must_use]
pub fn parse_timestamp(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.trim().split(':').collect();
    let [h, m, s] = parts.as_slice() else {
        return None;
    };
    let hours: f64 = h.parse().ok()?;
    let minutes: f64 = m.parse().ok()?;
    let seconds: f64 = s.parse().ok()?;
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}

/// Rates as ffmpeg prints them: `29.97`, `30k`, or `30000/1001`.
#[must_use]
pub fn parse_rate(text: &str) -> Option<f64> {
    let text = text.trim();
    if let Some((num, den)) = text.split_once('/') {
        let num: f64 = num.trim().parse().ok()?;
        let den: f64 = den.trim().parse().ok()?;
        return (den != 0.0).then(|| num / den);
    }
    match text.strip_suffix('k') {
        Some(thousands) => thousands.parse::<f64>().ok().map(|v| v * 1000.0),
        None => text.parse().ok(),
    }
}

// ============================================================================
// PROBER
// ============================================================================

/// Result of album art extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlbumArt {
    /// Written to the path the caller asked for.
    Saved(PathBuf),
    /// Read back from a temporary file that has since been removed.
    Bytes(Vec<u8>),
}

/// Runs probe invocations through a shared [`ProcessManager`].
#[derive(Debug, Clone)]
pub struct Prober {
    builder: CommandBuilder,
    manager: Arc<ProcessManager>,
    parser: LogParser,
    settle: Duration,
    timeout: Option<Duration>,
}

impl Prober {
    pub fn new(builder: CommandBuilder, manager: Arc<ProcessManager>) -> Self {
        Self {
            builder,
            manager,
            parser: LogParser::new(),
            settle: Duration::from_millis(500),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn from_config(config: &TranscoderConfig, manager: Arc<ProcessManager>) -> Self {
        Self::new(CommandBuilder::from_config(config), manager)
            .with_settle(Duration::from_millis(config.probe_settle_ms))
            .with_timeout(config.probe_timeout_secs.map(Duration::from_secs))
    }

    #[must_use]
    pub fn with_parser(mut self, parser: LogParser) -> Self {
        self.parser = parser;
        self
    }

    /// How long ffmpeg may analyse before it is asked to stop.
    #[must_use]
    pub fn with_settle(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn parser(&self) -> &LogParser {
        &self.parser
    }

    /// Probes `input` and parses the transcript.
    pub fn probe(&self, input: &str) -> CoreResult<MediaMetadata> {
        info!("Probing {input}");
        let cmd = self.builder.probe_command(input);
        let id = format!("probe:{input}");
        let running = self.manager.launch(&id, &cmd)?;

        let control = running.control();
        let deadline = Instant::now() + self.settle;
        while control.is_running() && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(10));
        }
        if control.is_running() {
            if let Err(e) = running.request_quit() {
                debug!("[{id}] Quit request failed: {e}");
            }
        }

        // exit status is irrelevant; a probe of a missing file exits non-zero
        let output = running.wait(self.timeout)?;
        self.parser.parse(&output.transcript())
    }

    /// Frames per second of the first video stream, 0.0 when unknown.
    pub fn get_fps(&self, input: &str) -> f64 {
        match self.probe(input) {
            Ok(meta) => meta.fps_value().unwrap_or(0.0),
            Err(e) => {
                warn!("Could not determine fps of {input}: {e}");
                0.0
            }
        }
    }

    /// Copies the embedded cover image of `input`.
    ///
    /// With `out` the image is written there; otherwise it goes through a
    /// temporary `.jpg` whose bytes are returned.
    pub fn album_art(&self, input: &str, out: Option<&Path>) -> CoreResult<AlbumArt> {
        match out {
            Some(path) => {
                ensure_parent_dir(path)?;
                self.extract_art(input, path)?;
                Ok(AlbumArt::Saved(path.to_path_buf()))
            }
            None => {
                let tmp = tempfile::Builder::new()
                    .prefix("ffdrive-art-")
                    .suffix(".jpg")
                    .tempfile()?;
                self.extract_art(input, tmp.path())?;
                let bytes = fs::read(tmp.path())?;
                Ok(AlbumArt::Bytes(bytes))
            }
        }
    }

    fn extract_art(&self, input: &str, out: &Path) -> CoreResult<()> {
        let output = OutputSpec::new(out.to_string_lossy())
            .with_flag("-an")
            .with_option("-vcodec", "copy");
        // the temporary target already exists, so overwriting is required
        let cmd = self.builder.build(
            &["-y".to_string()],
            &[InputSpec::new(input)],
            &[output],
            &[],
        );
        self.manager.execute("album_art", &cmd, self.timeout)?;
        Ok(())
    }
}

impl DurationSource for Prober {
    fn current_duration(&self, path: &Path) -> CoreResult<Option<f64>> {
        let meta = self.probe(&path.to_string_lossy())?;
        Ok(meta.duration_seconds())
    }
}
