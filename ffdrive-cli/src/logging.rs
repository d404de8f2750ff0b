// ============================================================================
// ffdrive-cli/src/logging.rs
// ============================================================================
//
// LOGGING SETUP: env_logger Initialisation for the CLI
//
// The library only emits records through the `log` facade; this module
// installs the backend. `RUST_LOG` takes precedence over the level chosen
// from `--verbose`:
// - RUST_LOG=info (default): Normal operation logs
// - RUST_LOG=debug: Command lines and parser summaries
// - RUST_LOG=trace: Full ffmpeg transcripts

use std::io::Write;

use log::LevelFilter;

/// Level used when `RUST_LOG` is not set.
pub fn default_level(verbose: bool) -> LevelFilter {
    if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    }
}

/// Installs the global logger, writing to stderr so stdout stays clean for output.
pub fn init(verbose: bool) {
    env_logger::Builder::new()
        .filter_level(default_level(verbose))
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "{} {:<5} {}",
                get_timestamp(),
                record.level(),
                record.args()
            )
        })
        .target(env_logger::Target::Stderr)
        .init();
}

/// Current local time as "YYYY-MM-DD HH:MM:SS".
pub fn get_timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_selects_debug() {
        assert_eq!(default_level(true), LevelFilter::Debug);
        assert_eq!(default_level(false), LevelFilter::Info);
    }

    #[test]
    fn test_timestamp_shape() {
        let ts = get_timestamp();
        assert_eq!(ts.len(), 19);
        assert_eq!(&ts[4..5], "-");
        assert_eq!(&ts[13..14], ":");
    }
}
