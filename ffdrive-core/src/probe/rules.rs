// ============================================================================
// ffdrive-core/src/probe/rules.rs
// ============================================================================
//
// EXTRACTION RULES: Stream Header Line → `key: value` Attributes
//
// Each rule is a pure function over one stream header line such as
//
//   #0:0(und): Video: h264 (High), yuv420p, 640x360 [SAR 1:1 DAR 16:9], 223 kb/s, 29.97 fps
//
// returning zero or more `key: value` strings. A rule that finds nothing
// returns an empty list. Rules are grouped per stream kind and run in order.
//
// The patterns follow ffmpeg's human-readable wording, which changes between
// releases; a different rule set can be plugged in through `HeaderRules`.

use once_cell::sync::Lazy;
use regex::Regex;

/// One extraction rule.
pub type ExtractionRule = fn(&str) -> Vec<String>;

/// Produces canonical attributes from a stream header line.
pub trait HeaderRules: Send + Sync {
    /// Identifier of the rule set, for diagnostics.
    fn version(&self) -> &str;

    /// `key: value` strings extracted from `line`; empty when nothing matched.
    fn parse_stream_header(&self, line: &str) -> Vec<String>;
}

/// Rules for the stream description format of current ffmpeg releases.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRules;

impl HeaderRules for DefaultRules {
    fn version(&self) -> &str {
        "ffmpeg-4+"
    }

    fn parse_stream_header(&self, line: &str) -> Vec<String> {
        let rules: &[ExtractionRule] = if line.contains("Video:") {
            VIDEO_RULES
        } else if line.contains("Audio:") {
            AUDIO_RULES
        } else {
            return Vec::new();
        };
        rules.iter().flat_map(|rule| rule(line)).collect()
    }
}

pub const VIDEO_RULES: &[ExtractionRule] = &[
    video_codec,
    data_rate,
    dimensions,
    fps,
    tbc,
    tbn,
    tbr,
];

pub const AUDIO_RULES: &[ExtractionRule] = &[audio_codec, bitrate, channels, sample_rate];

// ============================================================================
// PATTERNS
// ============================================================================

static VIDEO_CODEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"Video: ([^\s,]+)").unwrap());
static AUDIO_CODEC: Lazy<Regex> = Lazy::new(|| Regex::new(r"Audio: ([^\s,]+)").unwrap());
static RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r", (\d+ [a-zA-Z]+/s)").unwrap());
static DIMENSIONS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r", (\d+x\d+)(?:[ ,]|$)").unwrap());
static ASPECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\[SAR (\S+) DAR ([^\]\s]+)\]").unwrap());
static FPS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?k?) fps").unwrap());
static TBC: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?k?) tbc").unwrap());
static TBN: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?k?) tbn").unwrap());
static TBR: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+(?:\.\d+)?k?) tbr").unwrap());
static SAMPLE_RATE: Lazy<Regex> = Lazy::new(|| Regex::new(r", (\d+ Hz)").unwrap());
static LAYOUT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d+ Hz, ([^,]+)").unwrap());

fn capture(re: &Regex, key: &str, line: &str) -> Vec<String> {
    re.captures(line)
        .and_then(|c| c.get(1))
        .map(|m| vec![format!("{key}: {}", m.as_str().trim())])
        .unwrap_or_default()
}

// ============================================================================
// VIDEO
// ============================================================================

pub fn video_codec(line: &str) -> Vec<String> {
    capture(&VIDEO_CODEC, "codec", line)
}

pub fn data_rate(line: &str) -> Vec<String> {
    capture(&RATE, "data_rate", line)
}

/// Dimensions, then DAR and SAR when the bracketed aspect block is present.
pub fn dimensions(line: &str) -> Vec<String> {
    let mut out = capture(&DIMENSIONS, "dimensions", line);
    if out.is_empty() {
        return out;
    }
    if let Some(c) = ASPECT.captures(line) {
        out.push(format!("DAR: {}", &c[2]));
        out.push(format!("SAR: {}", &c[1]));
    }
    out
}

pub fn fps(line: &str) -> Vec<String> {
    capture(&FPS, "fps", line)
}

pub fn tbc(line: &str) -> Vec<String> {
    capture(&TBC, "tbc", line)
}

pub fn tbn(line: &str) -> Vec<String> {
    capture(&TBN, "tbn", line)
}

pub fn tbr(line: &str) -> Vec<String> {
    capture(&TBR, "tbr", line)
}

// ============================================================================
// AUDIO
// ============================================================================

pub fn audio_codec(line: &str) -> Vec<String> {
    capture(&AUDIO_CODEC, "codec", line)
}

pub fn bitrate(line: &str) -> Vec<String> {
    capture(&RATE, "bitrate", line)
}

/// Channel layout following the sample rate; older logs only say stereo or mono.
pub fn channels(line: &str) -> Vec<String> {
    let layout = capture(&LAYOUT, "channels", line);
    if !layout.is_empty() {
        return layout;
    }
    let guess = if line.contains("stereo") { "stereo" } else { "mono" };
    vec![format!("channels: {guess}")]
}

pub fn sample_rate(line: &str) -> Vec<String> {
    capture(&SAMPLE_RATE, "sample_rate", line)
}
