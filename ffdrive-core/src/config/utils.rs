//! Configuration utility functions
//!
//! Helpers for reading environment variables with a fallback value.

use std::path::PathBuf;

/// Get a string value from an environment variable or use the default
pub fn get_env_string(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

/// Get a path value from an environment variable or use the default
pub fn get_env_path(key: &str, default: PathBuf) -> PathBuf {
    std::env::var(key).map(PathBuf::from).unwrap_or(default)
}

/// Get a boolean value from an environment variable or use the default
///
/// `true`/`1`/`yes` and `false`/`0`/`no` are recognised; anything else keeps the default.
pub fn get_env_bool(key: &str, default: bool) -> bool {
    match std::env::var(key) {
        Ok(val) => match val.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        Err(_) => default,
    }
}
