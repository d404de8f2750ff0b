//! Incremental construction of a single pending ffmpeg command.
//!
//! Each helper appends one flag group in call order; nothing is deduplicated
//! and conflicting flags are the caller's problem. The accumulated tokens are
//! handed to [`CommandBuilder::finalize`](super::builder::CommandBuilder::finalize)
//! which injects the overwrite and loglevel flags.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, warn};

use crate::error::{CoreError, CoreResult};
use crate::platform::{Platform, normalize_separators};

/// Stream class used by the `:a`/`:v`/`:s` option specifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamType {
    Video,
    Audio,
    Subtitle,
}

impl StreamType {
    #[must_use]
    pub fn letter(self) -> char {
        match self {
            StreamType::Video => 'v',
            StreamType::Audio => 'a',
            StreamType::Subtitle => 's',
        }
    }
}

impl fmt::Display for StreamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

impl FromStr for StreamType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v" | "video" => Ok(StreamType::Video),
            "a" | "audio" => Ok(StreamType::Audio),
            "s" | "subtitle" => Ok(StreamType::Subtitle),
            other => Err(CoreError::InvalidInput(format!(
                "invalid stream type '{other}', expected 'v', 'a' or 's'"
            ))),
        }
    }
}

/// Resolves `output` against `save_dir` unless it is already absolute.
#[must_use]
pub fn resolve_output_path(save_dir: &Path, output: &str) -> PathBuf {
    let path = Path::new(output);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        save_dir.join(path)
    }
}

/// Creates the parent directory of `path` if it is missing.
pub fn ensure_parent_dir(path: &Path) -> CoreResult<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            fs::create_dir_all(parent)?;
            debug!("Created output directory {}", parent.display());
            Ok(())
        }
        _ => Ok(()),
    }
}

/// Pending chained command.
#[derive(Debug, Clone)]
pub struct ChainBuilder {
    tokens: Vec<String>,
    inputs: Vec<String>,
    outputs: Vec<PathBuf>,
    save_dir: PathBuf,
    create_folders: bool,
    platform: Platform,
}

impl ChainBuilder {
    #[must_use]
    pub fn new(save_dir: impl Into<PathBuf>, create_folders: bool, platform: Platform) -> Self {
        Self {
            tokens: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            save_dir: save_dir.into(),
            create_folders,
            platform,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Accumulated option tokens, without the injected global flags.
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }

    pub fn outputs(&self) -> &[PathBuf] {
        &self.outputs
    }

    /// Removes and returns the pending tokens, leaving the chain empty.
    pub fn take_tokens(&mut self) -> Vec<String> {
        self.inputs.clear();
        self.outputs.clear();
        std::mem::take(&mut self.tokens)
    }

    pub fn clear(&mut self) {
        self.take_tokens();
    }

    fn push(&mut self, flag: impl Into<String>, value: impl ToString) -> &mut Self {
        self.tokens.push(flag.into());
        self.tokens.push(value.to_string());
        self
    }

    fn with_specifier(flag: &str, spec: Option<StreamType>) -> String {
        match spec {
            Some(s) => format!("{flag}:{s}"),
            None => flag.to_string(),
        }
    }

    /// `-ss start -to end`, placed before the first `-i` when one exists.
    pub fn clip(&mut self, start: impl ToString, end: impl ToString) -> &mut Self {
        let group = [
            "-ss".to_string(),
            start.to_string(),
            "-to".to_string(),
            end.to_string(),
        ];
        match self.tokens.iter().position(|t| t == "-i") {
            Some(idx) => {
                self.tokens.splice(idx..idx, group);
            }
            None => self.tokens.extend(group),
        }
        self
    }

    pub fn duration(&mut self, duration: impl ToString) -> &mut Self {
        self.push("-t", duration)
    }

    /// Adds each path as `-i`, preceded by `-r rate` when given, then the maps.
    pub fn input<I, S>(&mut self, paths: I, stream_maps: &[&str], rate: Option<f64>) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            if let Some(rate) = rate {
                self.push("-r", rate);
            }
            let path = normalize_separators(path.as_ref(), self.platform);
            debug!("Input added to chain: {path}");
            self.push("-i", &path);
            self.inputs.push(path);
        }
        for map in stream_maps {
            self.push("-map", map);
        }
        self
    }

    /// Adds output paths, resolved against the save directory.
    ///
    /// A parent directory that cannot be created is logged, not raised; ffmpeg
    /// reports the real failure when it runs.
    pub fn output<I, S>(&mut self, paths: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for path in paths {
            let resolved = resolve_output_path(&self.save_dir, path.as_ref());
            if self.create_folders {
                if let Err(e) = ensure_parent_dir(&resolved) {
                    error!("Failed to create output directory for {}: {e}", resolved.display());
                }
            }
            let token = normalize_separators(&resolved.to_string_lossy(), self.platform);
            debug!("Output added to chain: {token}");
            self.tokens.push(token);
            self.outputs.push(resolved);
        }
        self
    }

    pub fn bitrate(&mut self, value: impl ToString, spec: Option<StreamType>) -> &mut Self {
        self.push(Self::with_specifier("-b", spec), value)
    }

    /// `-aspect[:spec] value`; `spec` is a free-form stream specifier such as `v:0`.
    pub fn aspect_ratio(&mut self, value: &str, spec: Option<&str>) -> &mut Self {
        let flag = match spec {
            Some(s) if !s.is_empty() => format!("-aspect:{s}"),
            _ => "-aspect".to_string(),
        };
        self.push(flag, value)
    }

    /// `-filter[:a|:v] graph`. Subtitle specifiers fall back to the plain flag.
    pub fn filter(&mut self, graph: &str, spec: Option<StreamType>) -> &mut Self {
        let spec = spec.filter(|s| *s != StreamType::Subtitle);
        self.push(Self::with_specifier("-filter", spec), graph)
    }

    pub fn format(&mut self, format: &str) -> &mut Self {
        self.push("-f", format)
    }

    /// Audio channel count (`-ac`). Video has no channel option and is skipped.
    pub fn channels(&mut self, count: u32, spec: Option<StreamType>) -> &mut Self {
        if spec == Some(StreamType::Video) {
            warn!("Video streams have no channel count; ignoring channels({count}) for video");
            return self;
        }
        self.push("-ac", count)
    }

    /// `-ar` for audio, `-r` otherwise.
    pub fn rate(&mut self, value: impl ToString, spec: Option<StreamType>) -> &mut Self {
        let flag = if spec == Some(StreamType::Audio) {
            "-ar"
        } else {
            "-r"
        };
        self.push(flag, value)
    }

    /// `-c[:v|a|s] value`; pass `"copy"` for stream copy.
    pub fn codec(&mut self, value: &str, spec: Option<StreamType>) -> &mut Self {
        self.push(Self::with_specifier("-c", spec), value)
    }

    /// `-vn`, `-an` or `-sn`. Anything else is logged and ignored.
    pub fn disable(&mut self, stream_type: &str) -> &mut Self {
        match stream_type.parse::<StreamType>() {
            Ok(kind) => self.tokens.push(format!("-{kind}n")),
            Err(e) => warn!("disable(): {e}"),
        }
        self
    }

    pub fn map(&mut self, spec: &str) -> &mut Self {
        self.push("-map", spec)
    }
}
