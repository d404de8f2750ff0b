// ffdrive-cli/src/output.rs
//
// Terminal output helpers: headings, aligned key/value lines and the
// conversion progress bar.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use owo_colors::{OwoColorize, Stream};

/// Width of the label column in `print_info`.
const LABEL_WIDTH: usize = 18;

/// Print a heading followed by an underline
pub fn print_heading(title: &str) {
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.bold()));
    println!("{}", "=".repeat(title.chars().count()));
}

/// Print a section title inside a heading
pub fn print_section(title: &str) {
    println!();
    println!("{}", title.if_supports_color(Stream::Stdout, |t| t.cyan()));
    println!("{}", "-".repeat(title.chars().count()));
}

/// Print an aligned `label: value` line
pub fn print_info<T: std::fmt::Display>(label: &str, value: T) {
    println!("  {:<width$} {value}", format!("{label}:"), width = LABEL_WIDTH);
}

/// Print an error message to stderr
pub fn print_error(message: &str) {
    eprintln!(
        "{} {message}",
        "Error:".if_supports_color(Stream::Stderr, |t| t.bright_red())
    );
}

/// Bar for a 0-100 conversion percentage
pub fn create_progress_bar(message: &str) -> ProgressBar {
    let pb = ProgressBar::new(100);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} {msg} [{bar:40.cyan/blue}] {pos:>3}% ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░ "),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}
