// ffdrive-cli/src/lib.rs
//
// Library portion of the ffdrive CLI application.
// Contains argument definitions and command logic.

pub mod cli;
pub mod commands;
pub mod config;
pub mod logging;
pub mod output;

// Re-export items needed by the binary or integration tests
pub use cli::{Cli, Commands};
pub use config::load_config;
