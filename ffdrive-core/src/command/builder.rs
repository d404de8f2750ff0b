// ============================================================================
// ffdrive-core/src/command/builder.rs
// ============================================================================
//
// COMMAND BUILDER: ffmpeg Argument Vector Construction
//
// This module turns structured intent (inputs, outputs, per-input and
// per-output flags, raw caller options) into the exact token sequence ffmpeg
// expects: global flags first, per-input flags immediately before each `-i`,
// output flags immediately before each output path.
//
// KEY COMPONENTS:
// - FfmpegCommand: An immutable, fully built invocation
// - CommandBuilder: Injects the overwrite and loglevel flags, normalises paths
// - InputSpec / OutputSpec: Structured inputs and outputs for `build`
// - OptionInput: Caller supplied options, either as tokens or as one raw string

use std::process::Command;

use log::warn;

use super::level::{LOGLEVEL_ALIAS, LOGLEVEL_FLAG, LogLevel, resolve_loglevel};
use crate::config::TranscoderConfig;
use crate::error::{CoreError, CoreResult};
use crate::platform::{Platform, ShellMode, normalize_separators, quote_for_shell};

/// Flag telling ffmpeg to overwrite outputs without asking.
pub const OVERWRITE_FLAG: &str = "-y";

/// Flag telling ffmpeg to never overwrite outputs.
pub const NO_OVERWRITE_FLAG: &str = "-n";

// ============================================================================
// BUILT COMMAND
// ============================================================================

/// One complete ffmpeg invocation.
///
/// Never mutated after construction; the process manager only reads it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FfmpegCommand {
    program: String,
    args: Vec<String>,
    loglevel: LogLevel,
    notices: Vec<String>,
    use_shell: bool,
    platform: Platform,
}

impl FfmpegCommand {
    /// Wraps an already complete argument list without injecting any flags.
    ///
    /// The effective loglevel is read from the arguments; ffmpeg's own
    /// default (`info`) applies when none is given.
    #[must_use]
    pub fn from_argv<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        let loglevel = args
            .iter()
            .position(|a| a == LOGLEVEL_FLAG || a == LOGLEVEL_ALIAS)
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse().ok())
            .unwrap_or(LogLevel::Info);
        Self {
            program: program.into(),
            args,
            loglevel,
            notices: Vec::new(),
            use_shell: false,
            platform: Platform::current(),
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Program followed by its arguments.
    #[must_use]
    pub fn tokens(&self) -> Vec<String> {
        std::iter::once(self.program.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    pub fn loglevel(&self) -> LogLevel {
        self.loglevel
    }

    /// Corrections made while building (e.g. a rejected loglevel).
    pub fn notices(&self) -> &[String] {
        &self.notices
    }

    pub fn uses_shell(&self) -> bool {
        self.use_shell
    }

    /// Whether a successful run must print ffmpeg's "Output #0" notice.
    ///
    /// Below `info` ffmpeg never prints it, so the check is skipped.
    pub fn expects_output_marker(&self) -> bool {
        self.loglevel.reports_output_opened()
    }

    /// All tokens quoted for the target shell and joined by spaces.
    #[must_use]
    pub fn shell_string(&self) -> String {
        self.tokens()
            .iter()
            .map(|t| quote_for_shell(t, self.platform))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Converts to a `std::process::Command`, going through the shell if required.
    ///
    /// On POSIX the shell `exec`s ffmpeg, so the spawned pid is ffmpeg itself.
    /// On Windows the spawned process is `cmd.exe`: ffmpeg inherits its stdin,
    /// so the quit request still reaches ffmpeg, but a kill only ends `cmd.exe`
    /// and can leave ffmpeg running.
    #[must_use]
    pub fn to_process_command(&self) -> Command {
        if !self.use_shell {
            let mut cmd = Command::new(&self.program);
            cmd.args(&self.args);
            return cmd;
        }
        shell_command(&self.shell_string())
    }
}

impl std::fmt::Display for FfmpegCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.shell_string())
    }
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    use std::os::windows::process::CommandExt;
    let mut cmd = Command::new("cmd");
    cmd.arg("/C").raw_arg(line);
    cmd
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    // exec keeps the pid pointing at ffmpeg so quit and kill reach it
    let mut cmd = Command::new("sh");
    cmd.arg("-c").arg(format!("exec {line}"));
    cmd
}

// ============================================================================
// STRUCTURED INPUTS
// ============================================================================

/// One `-i` input with the flags that must precede it and the maps that follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputSpec {
    pub path: String,
    pub options: Vec<String>,
    pub maps: Vec<String>,
}

impl InputSpec {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    /// Input frame rate, emitted as `-r <rate>` before the `-i`.
    #[must_use]
    pub fn with_rate(self, rate: impl ToString) -> Self {
        self.with_option("-r", rate)
    }

    #[must_use]
    pub fn with_option(mut self, flag: &str, value: impl ToString) -> Self {
        self.options.push(flag.to_string());
        self.options.push(value.to_string());
        self
    }

    /// Stream map directive emitted as `-map <spec>` right after this input.
    #[must_use]
    pub fn with_map(mut self, spec: impl Into<String>) -> Self {
        self.maps.push(spec.into());
        self
    }
}

/// One output path with the flags that must precede it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputSpec {
    pub path: String,
    pub options: Vec<String>,
}

impl OutputSpec {
    #[must_use]
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            options: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_option(mut self, flag: &str, value: impl ToString) -> Self {
        self.options.push(flag.to_string());
        self.options.push(value.to_string());
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: &str) -> Self {
        self.options.push(flag.to_string());
        self
    }
}

/// Options supplied by the caller that bypass the structured helpers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionInput {
    Tokens(Vec<String>),
    Raw(String),
}

impl OptionInput {
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        OptionInput::Tokens(tokens.into_iter().map(Into::into).collect())
    }

    pub fn from_raw_string(raw: impl Into<String>) -> Self {
        OptionInput::Raw(raw.into())
    }

    /// Splits raw strings, then normalises path tokens for `platform`.
    ///
    /// Tokens and raw strings go through the same path normalisation once
    /// split.
    pub fn into_tokens(self, platform: Platform) -> CoreResult<Vec<String>> {
        let tokens = match self {
            OptionInput::Tokens(tokens) => tokens,
            OptionInput::Raw(raw) if platform == Platform::Windows => split_windows(&raw),
            OptionInput::Raw(raw) => shell_words::split(&raw).map_err(|e| {
                CoreError::InvalidInput(format!("cannot split options '{raw}': {e}"))
            })?,
        };
        Ok(normalize_path_tokens(tokens, platform))
    }
}

/// Normalises input paths and the trailing output path; filter graphs stay untouched.
fn normalize_path_tokens(tokens: Vec<String>, platform: Platform) -> Vec<String> {
    let last = tokens.len().saturating_sub(1);
    let mut out = Vec::with_capacity(tokens.len());
    for (i, token) in tokens.into_iter().enumerate() {
        let is_path = (i == last && !token.starts_with('-'))
            || out.last().is_some_and(|prev: &String| prev == "-i");
        out.push(if is_path {
            normalize_separators(&token, platform)
        } else {
            token
        });
    }
    out
}

/// Whitespace split honouring double quotes; backslashes are kept literally.
fn split_windows(raw: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in raw.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    tokens.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        tokens.push(current);
    }
    tokens
}

// ============================================================================
// BUILDER
// ============================================================================

/// Builds ffmpeg invocations with the mandatory overwrite and loglevel flags.
#[derive(Debug, Clone)]
pub struct CommandBuilder {
    executable: String,
    overwrite: bool,
    loglevel: String,
    platform: Platform,
    shell_mode: ShellMode,
}

impl CommandBuilder {
    /// Creates a builder for `executable` with overwrite on and loglevel `fatal`.
    #[must_use]
    pub fn new(executable: impl Into<String>) -> Self {
        Self {
            executable: executable.into(),
            overwrite: true,
            loglevel: super::level::DEFAULT_LOGLEVEL.as_str().to_string(),
            platform: Platform::current(),
            shell_mode: ShellMode::Auto,
        }
    }

    #[must_use]
    pub fn from_config(config: &TranscoderConfig) -> Self {
        Self::new(config.executable.to_string_lossy())
            .with_overwrite(config.overwrite)
            .with_loglevel(&config.loglevel)
            .with_shell_mode(config.shell)
    }

    #[must_use]
    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Sets the requested loglevel; it is validated when a command is built.
    #[must_use]
    pub fn with_loglevel(mut self, level: &str) -> Self {
        self.loglevel = level.to_string();
        self
    }

    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }

    #[must_use]
    pub fn with_shell_mode(mut self, mode: ShellMode) -> Self {
        self.shell_mode = mode;
        self
    }

    pub fn executable(&self) -> &str {
        &self.executable
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn overwrite_flag(&self) -> &'static str {
        if self.overwrite {
            OVERWRITE_FLAG
        } else {
            NO_OVERWRITE_FLAG
        }
    }

    #[must_use]
    pub fn normalize_path(&self, path: &str) -> String {
        normalize_separators(path, self.platform)
    }

    /// Assembles a full invocation from structured parts.
    ///
    /// Order: `base_flags`, then for each input its options, `-i <path>` and
    /// its maps, then `extra`, then for each output its options and path.
    #[must_use]
    pub fn build(
        &self,
        base_flags: &[String],
        inputs: &[InputSpec],
        outputs: &[OutputSpec],
        extra: &[String],
    ) -> FfmpegCommand {
        let mut options: Vec<String> = base_flags.to_vec();

        for input in inputs {
            options.extend(input.options.iter().cloned());
            options.push("-i".to_string());
            options.push(self.normalize_path(&input.path));
            for map in &input.maps {
                options.push("-map".to_string());
                options.push(map.clone());
            }
        }

        options.extend(extra.iter().cloned());

        for output in outputs {
            options.extend(output.options.iter().cloned());
            options.push(self.normalize_path(&output.path));
        }

        self.finalize(options)
    }

    /// Runs caller supplied options through the same flag injection as `build`.
    pub fn passthrough(&self, input: OptionInput) -> CoreResult<FfmpegCommand> {
        let tokens = input.into_tokens(self.platform)?;
        Ok(self.finalize(tokens))
    }

    /// Injects exactly one overwrite flag and one loglevel flag at the front.
    ///
    /// A loglevel or overwrite flag already present in `options` is kept
    /// (the loglevel after validation); duplicates are dropped with a notice.
    #[must_use]
    pub fn finalize(&self, options: Vec<String>) -> FfmpegCommand {
        let mut notices = Vec::new();
        let mut rest = Vec::with_capacity(options.len());
        let mut level: Option<LogLevel> = None;
        let mut overwrite: Option<String> = None;

        let mut iter = options.into_iter();
        while let Some(token) = iter.next() {
            if token == LOGLEVEL_FLAG || token == LOGLEVEL_ALIAS {
                let value = iter.next();
                if level.is_some() {
                    notices.push(format!(
                        "Dropping repeated {token} {}",
                        value.as_deref().unwrap_or("")
                    ));
                    continue;
                }
                let requested = match value {
                    Some(v) => v,
                    None => {
                        notices.push(format!("{token} given without a value"));
                        self.loglevel.clone()
                    }
                };
                let resolved = resolve_loglevel(&requested);
                notices.extend(resolved.notice);
                level = Some(resolved.level);
            } else if token == OVERWRITE_FLAG || token == NO_OVERWRITE_FLAG {
                if overwrite.is_some() {
                    notices.push(format!("Dropping repeated overwrite flag {token}"));
                } else {
                    overwrite = Some(token);
                }
            } else {
                rest.push(token);
            }
        }

        let level = level.unwrap_or_else(|| {
            let resolved = resolve_loglevel(&self.loglevel);
            notices.extend(resolved.notice);
            resolved.level
        });
        let overwrite = overwrite.unwrap_or_else(|| self.overwrite_flag().to_string());

        for notice in notices.iter().filter(|n| n.starts_with("Dropping")) {
            warn!("{notice}");
        }

        let mut args = Vec::with_capacity(rest.len() + 3);
        args.push(LOGLEVEL_FLAG.to_string());
        args.push(level.as_str().to_string());
        args.push(overwrite);
        args.extend(rest);

        FfmpegCommand {
            program: self.executable.clone(),
            args,
            loglevel: level,
            notices,
            use_shell: self.shell_mode.uses_shell(self.platform),
            platform: self.platform,
        }
    }

    /// Discard-output probe: `<exe> -y -i <input> -f null <null-device>`.
    ///
    /// No loglevel is injected; the probe needs ffmpeg's default `info` output.
    #[must_use]
    pub fn probe_command(&self, input: &str) -> FfmpegCommand {
        FfmpegCommand {
            program: self.executable.clone(),
            args: vec![
                OVERWRITE_FLAG.to_string(),
                "-i".to_string(),
                self.normalize_path(input),
                "-f".to_string(),
                "null".to_string(),
                self.platform.null_device().to_string(),
            ],
            loglevel: LogLevel::Info,
            notices: Vec::new(),
            use_shell: self.shell_mode.uses_shell(self.platform),
            platform: self.platform,
        }
    }
}
