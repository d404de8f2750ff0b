//! ffmpeg log verbosity levels.
//!
//! Only the nine names ffmpeg accepts for `-loglevel` are valid. Anything
//! else is replaced by [`DEFAULT_LOGLEVEL`] and the correction is reported
//! back to the caller instead of failing the command.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Level used when the configured or supplied level is not recognised.
pub const DEFAULT_LOGLEVEL: LogLevel = LogLevel::Fatal;

/// Flag that introduces the verbosity level on the ffmpeg command line.
pub const LOGLEVEL_FLAG: &str = "-loglevel";

/// Short alias ffmpeg also accepts for `-loglevel`.
pub const LOGLEVEL_ALIAS: &str = "-v";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl LogLevel {
    /// All accepted levels, least to most verbose.
    pub const ALL: [LogLevel; 9] = [
        LogLevel::Quiet,
        LogLevel::Panic,
        LogLevel::Fatal,
        LogLevel::Error,
        LogLevel::Warning,
        LogLevel::Info,
        LogLevel::Verbose,
        LogLevel::Debug,
        LogLevel::Trace,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Quiet => "quiet",
            LogLevel::Panic => "panic",
            LogLevel::Fatal => "fatal",
            LogLevel::Error => "error",
            LogLevel::Warning => "warning",
            LogLevel::Info => "info",
            LogLevel::Verbose => "verbose",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }

    /// Whether ffmpeg prints its "Output #0" notice at this verbosity.
    #[must_use]
    pub fn reports_output_opened(self) -> bool {
        self >= LogLevel::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        LogLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == lowered)
            .ok_or_else(|| CoreError::Config(format!("\"{s}\" is not a valid ffmpeg loglevel")))
    }
}

/// Outcome of validating a requested level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedLevel {
    pub level: LogLevel,
    /// Set when the requested level was rejected and replaced.
    pub notice: Option<String>,
}

/// Validates `requested`, falling back to [`DEFAULT_LOGLEVEL`] with a notice.
///
/// The notice is also logged at warn level.
pub fn resolve_loglevel(requested: &str) -> ResolvedLevel {
    match requested.parse::<LogLevel>() {
        Ok(level) => ResolvedLevel {
            level,
            notice: None,
        },
        Err(_) => {
            let notice = format!(
                "\"{requested}\" is not a valid ffmpeg loglevel flag. Using \"{DEFAULT_LOGLEVEL}\" instead."
            );
            warn!("{notice}");
            ResolvedLevel {
                level: DEFAULT_LOGLEVEL,
                notice: Some(notice),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_case_insensitive() {
        assert_eq!("FATAL".parse::<LogLevel>().unwrap(), LogLevel::Fatal);
        assert_eq!(" warning ".parse::<LogLevel>().unwrap(), LogLevel::Warning);
        assert!("warn".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_resolve_invalid_level_falls_back() {
        let resolved = resolve_loglevel("fa");
        assert_eq!(resolved.level, LogLevel::Fatal);
        let notice = resolved.notice.expect("correction notice");
        assert!(notice.contains("\"fa\""));
        assert!(notice.contains("fatal"));
    }

    #[test]
    fn test_resolve_valid_level_has_no_notice() {
        let resolved = resolve_loglevel("debug");
        assert_eq!(resolved.level, LogLevel::Debug);
        assert!(resolved.notice.is_none());
    }

    #[test]
    fn test_output_marker_visibility() {
        assert!(!LogLevel::Fatal.reports_output_opened());
        assert!(!LogLevel::Warning.reports_output_opened());
        assert!(LogLevel::Info.reports_output_opened());
        assert!(LogLevel::Trace.reports_output_opened());
    }
}
