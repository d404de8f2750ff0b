// ============================================================================
// ffdrive-core/src/probe/parser.rs
// ============================================================================
//
// LOG PARSER: ffmpeg Diagnostic Transcript → MediaMetadata
//
// ffmpeg describes its inputs in free text before it starts transcoding:
//
//   Input #0, mov,mp4,m4a,3gp,3g2,mj2, from 'countdown.mp4':
//     Metadata:
//       major_brand     : mp42
//     Duration: 00:00:04.37, start: 0.000000, bitrate: 322 kb/s
//     Stream #0:0(und): Video: h264 (High), yuv420p, 640x360 [SAR 1:1 DAR 16:9], ...
//       Metadata:
//         handler_name    : VideoHandler
//   Stream mapping:
//     Stream #0:0 -> #0:0 (h264 (native) -> wrapped_avframe (native))
//
// The text between the first `Input #` line and the `Stream mapping:` line is
// cut at every line opening with `Stream #`: the first piece is the container
// header, the rest are stream blocks. Lines after the stream mapping and
// before the first `Output #` line are the trailer. Markers only count at the
// start of a line, so paths and tag values may contain them.
//
// Tags use `key: value` lines. A line with an empty key continues the
// previous key; its value is appended after CONTINUATION_JOINER.

use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use super::rules::{DefaultRules, HeaderRules};
use super::{MediaMetadata, StreamDescriptor, StreamKind, Tags};
use crate::error::{CoreError, CoreResult};

/// Text placed between a key's value and its continuation lines.
///
/// This is the four characters `\r\n`, not a line break.
pub const CONTINUATION_JOINER: &str = "\\r\\n";

/// Key collecting continuation values that have no preceding key.
pub const UNPAIRED_KEY: &str = "unpaired_values";

/// ffmpeg's warning when it could not identify the input format reliably.
pub const MISDETECTION_MARKER: &str = "misdetection possible";

static INPUT_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Input( #)").unwrap());
static STREAM_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^[ \t]*Stream( #)").unwrap());
static MAPPING_MARKER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^[ \t]*Stream mapping:").unwrap());
static OUTPUT_SECTION_MARKER: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?m)^Output #").unwrap());
static BANNER_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"libpostproc [^\n]*\n").unwrap());
static DEMUXERS: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*#\d+, (.+?), from ").unwrap());
static STREAM_INDEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"#(\d+:\d+)").unwrap());

/// Turns transcripts into [`MediaMetadata`].
#[derive(Clone)]
pub struct LogParser {
    rules: Arc<dyn HeaderRules>,
}

impl Default for LogParser {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for LogParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogParser")
            .field("rules", &self.rules.version())
            .finish()
    }
}

impl LogParser {
    pub fn new() -> Self {
        Self::with_rules(Arc::new(DefaultRules))
    }

    pub fn with_rules(rules: Arc<dyn HeaderRules>) -> Self {
        Self { rules }
    }

    pub fn rules_version(&self) -> &str {
        self.rules.version()
    }

    /// Parses one complete transcript.
    ///
    /// Fails on an empty transcript, on ffmpeg's misdetection warning, and
    /// when there is no `Input` section (the error carries the text ffmpeg
    /// printed after its banner).
    pub fn parse(&self, transcript: &str) -> CoreResult<MediaMetadata> {
        if transcript.trim().is_empty() {
            return Err(CoreError::EmptyTranscript);
        }

        if let Some(line) = transcript.lines().find(|l| l.contains(MISDETECTION_MARKER)) {
            warn!("ffmpeg reported a possible misdetection: {}", line.trim());
            return Err(CoreError::CorruptMedia(line.trim().to_string()));
        }

        let (described, trailer) = match MAPPING_MARKER.find(transcript) {
            Some(m) => (&transcript[..m.start()], Some(&transcript[m.end()..])),
            None => {
                let end = OUTPUT_SECTION_MARKER.find(transcript).map_or(transcript.len(), |m| m.start());
                (&transcript[..end], None)
            }
        };

        let mut sections = split_at_marker(described, &INPUT_MARKER).into_iter();
        let Some(input) = sections.next() else {
            let message = error_text(described);
            warn!("No input section in transcript: {message}");
            return Err(CoreError::Unprobeable(message));
        };
        let extra_inputs = sections.count();
        if extra_inputs > 0 {
            warn!("Transcript describes {} inputs; only the first is probed", extra_inputs + 1);
        }

        let header = STREAM_MARKER.find(input).map_or(input, |m| &input[..m.start()]);
        let container = generate_tags(&container_lines(header));

        let mut tags = Tags::new();
        let mut streams = Vec::new();
        for block in split_at_marker(input, &STREAM_MARKER) {
            let stream = self.parse_stream(block);
            tags.extend(stream.tags.iter().map(|(k, v)| (k.clone(), v.clone())));
            streams.push(stream);
        }

        let trailer = trailer.map(parse_trailer).unwrap_or_default();
        tags.extend(trailer.iter().map(|(k, v)| (k.clone(), v.clone())));

        let media_type = DEMUXERS
            .captures(header)
            .map(|c| pick_media_type(&c[1]));

        debug!(
            "Parsed {} container tags, {} streams, {} flat tags",
            container.len(),
            streams.len(),
            tags.len()
        );

        Ok(MediaMetadata {
            container,
            tags,
            trailer,
            streams,
            media_type,
        })
    }

    fn parse_stream(&self, block: &str) -> StreamDescriptor {
        let mut lines = block.lines();
        let head = lines.next().unwrap_or_default();

        let mut entries = self.rules.parse_stream_header(head);
        entries.extend(lines.filter(|l| has_value(l)).map(str::to_string));

        StreamDescriptor {
            index: STREAM_INDEX.captures(head).map(|c| c[1].to_string()),
            kind: StreamKind::from_header(head),
            tags: generate_tags(&entries),
        }
    }
}

/// Pieces of `text` following each marker match, starting at the marker's
/// first capture group (` #0...`) and ending at the next match.
fn split_at_marker<'a>(text: &'a str, marker: &Regex) -> Vec<&'a str> {
    let starts: Vec<usize> = marker
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.start())
        .collect();
    starts
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = starts
                .get(i + 1)
                .map_or(text.len(), |&next| line_start(text, next));
            &text[start..end]
        })
        .collect()
}

/// Byte offset of the start of the line containing `pos`.
fn line_start(text: &str, pos: usize) -> usize {
    text[..pos].rfind('\n').map_or(0, |i| i + 1)
}

/// Whether `line` has a non-empty piece after its first `": "`.
fn has_value(line: &str) -> bool {
    line.split(": ").nth(1).is_some_and(|v| !v.is_empty())
}

/// Container header with `", "` turned into line breaks, keeping `key: value` lines.
fn container_lines(header: &str) -> Vec<String> {
    header
        .replace(", ", "\n")
        .lines()
        .filter(|l| has_value(l))
        .map(str::to_string)
        .collect()
}

/// Folds `key: value` lines into tags, appending blank-key lines to the previous key.
pub fn generate_tags<S: AsRef<str>>(lines: &[S]) -> Tags {
    let mut tags = Tags::new();
    let mut previous: Option<String> = None;

    for line in lines {
        let Some((key, value)) = line.as_ref().split_once(':') else {
            continue;
        };
        let (key, value) = (key.trim(), value.trim());

        if !key.is_empty() {
            tags.insert(key.to_string(), value.to_string());
            previous = Some(key.to_string());
            continue;
        }

        match &previous {
            Some(prev) => {
                let entry = tags.entry(prev.clone()).or_default();
                entry.push_str(CONTINUATION_JOINER);
                entry.push_str(value);
            }
            None => {
                let entry = tags.entry(UNPAIRED_KEY.to_string()).or_default();
                if !entry.is_empty() {
                    entry.push_str(CONTINUATION_JOINER);
                }
                entry.push_str(value);
            }
        }
    }
    tags
}

/// Comma separated `key: value` items between the stream mapping and the first output.
///
/// Everything from the first `Output #` line on is left out: the output's
/// metadata and stream lines describe the target, and folding them in would
/// overwrite the input's tags in the flat mapping. Notices printed before
/// that line (encoder and muxer option dumps) are kept.
fn parse_trailer(text: &str) -> Tags {
    let text = OUTPUT_SECTION_MARKER
        .find(text)
        .map_or(text, |m| &text[..m.start()]);

    let mut tags = Tags::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.contains("->") || line.contains("Press [q") {
            continue;
        }
        for item in line.split(',') {
            let parts: Vec<&str> = item.splitn(3, ':').collect();
            if parts.len() < 2 {
                continue;
            }
            let (mut key, mut value) = (parts[0].trim(), parts[1].trim());
            if key.is_empty() && parts.len() > 2 {
                key = value;
                value = parts[2].trim();
            }
            if !key.is_empty() {
                tags.insert(key.to_string(), value.to_string());
            }
        }
    }
    tags
}

/// Text ffmpeg printed after its version banner, or the whole transcript.
fn error_text(transcript: &str) -> String {
    let tail = BANNER_END
        .find_iter(transcript)
        .last()
        .map_or(transcript, |m| &transcript[m.end()..]);
    let tail = tail.trim();
    if tail.is_empty() {
        transcript.trim().to_string()
    } else {
        tail.to_string()
    }
}

/// `mp4` or `mp3` when listed, else the first demuxer name.
fn pick_media_type(demuxers: &str) -> String {
    let names: Vec<&str> = demuxers.split(',').map(str::trim).collect();
    ["mp4", "mp3"]
        .into_iter()
        .find(|preferred| names.contains(preferred))
        .or_else(|| names.first().copied())
        .unwrap_or_default()
        .to_string()
}
