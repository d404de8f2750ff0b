//! Platform detection and path helpers.
//!
//! ffmpeg is launched directly (argv) on Linux and through the system shell
//! elsewhere, so command tokens have to be quoted for whichever shell will
//! parse them. Path separators are normalised to the native one first.

use serde::{Deserialize, Serialize};
use std::env;

/// Operating system families that change how commands are launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Windows,
    Other,
}

impl Platform {
    /// Detects the platform this binary is running on.
    #[must_use]
    pub fn current() -> Self {
        match env::consts::OS {
            "linux" => Platform::Linux,
            "macos" => Platform::MacOs,
            "windows" => Platform::Windows,
            _ => Platform::Other,
        }
    }

    /// Native path separator.
    #[must_use]
    pub fn separator(self) -> char {
        match self {
            Platform::Windows => '\\',
            _ => '/',
        }
    }

    /// Device ffmpeg writes to when output is discarded.
    #[must_use]
    pub fn null_device(self) -> &'static str {
        match self {
            Platform::Windows => "NUL",
            _ => "/dev/null",
        }
    }

    /// Whether commands go through the shell unless configured otherwise.
    #[must_use]
    pub fn requires_shell(self) -> bool {
        !matches!(self, Platform::Linux)
    }
}

/// How command tokens are handed to the operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShellMode {
    /// Follow the platform default.
    #[default]
    Auto,
    /// Always join the tokens into one quoted string for the shell.
    Always,
    /// Always pass discrete argv entries.
    Never,
}

impl ShellMode {
    /// Resolves `Auto` against the given platform.
    #[must_use]
    pub fn uses_shell(self, platform: Platform) -> bool {
        match self {
            ShellMode::Auto => platform.requires_shell(),
            ShellMode::Always => true,
            ShellMode::Never => false,
        }
    }
}

/// Rewrites both `/` and `\` to the platform's native separator.
///
/// Tokens that look like URLs (`scheme://...`) are left alone.
#[must_use]
pub fn normalize_separators(path: &str, platform: Platform) -> String {
    if path.contains("://") {
        return path.to_string();
    }
    let sep = platform.separator();
    path.chars()
        .map(|c| if c == '/' || c == '\\' { sep } else { c })
        .collect()
}

/// Quotes one token so the target platform's shell passes it through intact.
#[must_use]
pub fn quote_for_shell(token: &str, platform: Platform) -> String {
    match platform {
        Platform::Windows => {
            let needs_quotes = token.is_empty()
                || token
                    .chars()
                    .any(|c| c.is_whitespace() || "&|<>^()%!\"".contains(c));
            if needs_quotes {
                format!("\"{}\"", token.replace('"', "\\\""))
            } else {
                token.to_string()
            }
        }
        _ => shell_words::quote(token).into_owned(),
    }
}
