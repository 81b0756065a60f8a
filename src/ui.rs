// UI module for consistent terminal output with progress bars and styling
//
// Every user-facing line goes through here; the rest of the crate logs instead.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use crate::dists::DownloadReporter;
use console::{Term, style};
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

/// Spinner style similar to uv/pnpm
const SPINNER_CHARS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Check if stderr is a TTY (for interactive output)
fn is_tty() -> bool {
    Term::stderr().is_term()
}

fn hide_unless_tty(pb: ProgressBar) -> ProgressBar {
    if !is_tty() {
        pb.set_draw_target(ProgressDrawTarget::hidden());
    }
    pb
}

/// Create a styled spinner for async operations
pub fn spinner(message: &str) -> ProgressBar {
    let pb = hide_unless_tty(ProgressBar::new_spinner());

    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars(SPINNER_CHARS)
        .template("{spinner:.cyan} {msg}")
    {
        pb.set_style(template);
    }
    pb.set_message(message.to_string());

    if is_tty() {
        pb.enable_steady_tick(Duration::from_millis(80));
    }

    pb
}

/// Create a progress bar for downloads with size
fn download_bar(name: &str, total_size: u64) -> ProgressBar {
    let pb = hide_unless_tty(ProgressBar::new(total_size));
    if let Ok(template) = ProgressStyle::default_bar().template(
        "{spinner:.cyan} {msg} [{bar:25.cyan/dim}] {bytes}/{total_bytes} ({bytes_per_sec})",
    ) {
        pb.set_style(template.tick_chars(SPINNER_CHARS).progress_chars("━━╺"));
    }
    pb.set_message(name.to_string());
    pb
}

/// Create an indeterminate progress bar (when size is unknown)
fn download_bar_indeterminate(name: &str) -> ProgressBar {
    let pb = hide_unless_tty(ProgressBar::new_spinner());
    if let Ok(template) = ProgressStyle::default_spinner()
        .tick_chars(SPINNER_CHARS)
        .template("{spinner:.cyan} {msg} {bytes} ({bytes_per_sec})")
    {
        pb.set_style(template);
    }
    pb.set_message(name.to_string());
    if is_tty() {
        pb.enable_steady_tick(Duration::from_millis(80));
    }
    pb
}

/// Download progress on stderr, one bar per archive
#[derive(Default)]
pub struct ProgressReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DownloadReporter for ProgressReporter {
    fn on_download_start(&self, name: &str, total: Option<u64>) {
        let bar = match total {
            Some(total) => download_bar(name, total),
            None => download_bar_indeterminate(name),
        };
        if let Ok(mut current) = self.bar.lock() {
            if let Some(previous) = current.replace(bar) {
                previous.finish_and_clear();
            }
        }
    }

    fn on_download_progress(&self, inc: u64) {
        if let Ok(current) = self.bar.lock() {
            if let Some(bar) = current.as_ref() {
                bar.inc(inc);
            }
        }
    }

    fn on_download_complete(&self) {
        if let Ok(mut current) = self.bar.lock() {
            if let Some(bar) = current.take() {
                bar.finish_and_clear();
            }
        }
    }
}

/// Print a success message with checkmark
pub fn success(message: &str) {
    println!("{} {}", style("✓").green(), message);
}

/// Print an info/action message with arrow
pub fn action(message: &str) {
    println!("{} {}", style("→").cyan(), message);
}

/// Print a warning message
pub fn warning(message: &str) {
    eprintln!("{} {}", style("⚠").yellow(), message);
}

/// Print an error message
pub fn error(message: &str) {
    eprintln!("{} {}", style("✗").red(), message);
}

/// Print a header/section message
pub fn header(message: &str) {
    println!("{}", style(message).bold());
}

/// Print a dimmed/secondary message
pub fn dim(message: &str) {
    println!("{}", style(message).dim());
}

/// Print a status message: bold prefix, then the text
pub fn status(prefix: &str, message: &str) {
    println!("{} {}", style(prefix).cyan().bold(), message);
}

/// Print a line as-is (machine-readable output)
pub fn plain(message: &str) {
    println!("{}", message);
}

fn finish_with(pb: &ProgressBar, msg: String, to_stderr: bool) {
    if is_tty() {
        if let Ok(template) = ProgressStyle::default_spinner().template("{msg}") {
            pb.set_style(template);
        }
        pb.finish_with_message(msg);
    } else {
        pb.finish_and_clear();
        if to_stderr {
            eprintln!("{}", msg);
        } else {
            println!("{}", msg);
        }
    }
}

/// Finish a spinner with success
pub fn finish_spinner_success(pb: &ProgressBar, message: &str) {
    finish_with(pb, format!("{} {}", style("✓").green(), message), false);
}

/// Finish a spinner with error
pub fn finish_spinner_error(pb: &ProgressBar, message: &str) {
    finish_with(pb, format!("{} {}", style("✗").red(), message), true);
}
