//! Diagnostics display module
//!
//! Styled messages, run statistics and the optional input spinner. Everything
//! here writes to stderr; stdout is reserved for new lines.

use bytesize::ByteSize;
use colored::*;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Print an info message
pub fn print_info(text: &str) {
    eprintln!("  {} {}", "ℹ".cyan(), text);
}

/// Print a warning message
pub fn print_warning(text: &str) {
    eprintln!("  {} {}", "⚠".yellow(), text.yellow());
}

/// Print an error message
pub fn print_error(text: &str) {
    eprintln!("  {} {}", "✖".red(), text.red());
}

/// Create a spinner for the open-ended input stream.
///
/// Hidden unless `visible`, so callers can tick it unconditionally.
pub fn create_spinner(visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
    if let Ok(style) = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {pos} lines read ({per_sec}) {msg}")
    {
        pb.set_style(style.tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ "));
    }
    pb.enable_steady_tick(Duration::from_millis(100));

    pb
}

/// Run statistics, updated concurrently by the reader and the workers
#[derive(Debug)]
pub struct RunStats {
    pub loaded_lines: AtomicU64,
    pub blank_lines: AtomicU64,
    pub input_lines: AtomicU64,
    pub new_lines: AtomicU64,
    pub duplicate_lines: AtomicU64,
    pub appended_lines: AtomicU64,
    pub appended_bytes: AtomicU64,
    pub input_errors: AtomicU64,
    pub start_time: Instant,
}

impl RunStats {
    pub fn new() -> Self {
        Self {
            loaded_lines: AtomicU64::new(0),
            blank_lines: AtomicU64::new(0),
            input_lines: AtomicU64::new(0),
            new_lines: AtomicU64::new(0),
            duplicate_lines: AtomicU64::new(0),
            appended_lines: AtomicU64::new(0),
            appended_bytes: AtomicU64::new(0),
            input_errors: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn add_loaded(&self, count: u64) {
        self.loaded_lines.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_blank(&self, count: u64) {
        self.blank_lines.fetch_add(count, Ordering::Relaxed);
    }

    pub fn add_input_line(&self) {
        self.input_lines.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_check(&self, inserted: bool) {
        if inserted {
            self.new_lines.fetch_add(1, Ordering::Relaxed);
        } else {
            self.duplicate_lines.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn add_appended(&self, lines: u64, bytes: u64) {
        self.appended_lines.fetch_add(lines, Ordering::Relaxed);
        self.appended_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_input_error(&self) {
        self.input_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_loaded_lines(&self) -> u64 {
        self.loaded_lines.load(Ordering::Relaxed)
    }

    pub fn get_blank_lines(&self) -> u64 {
        self.blank_lines.load(Ordering::Relaxed)
    }

    pub fn get_input_lines(&self) -> u64 {
        self.input_lines.load(Ordering::Relaxed)
    }

    pub fn get_new_lines(&self) -> u64 {
        self.new_lines.load(Ordering::Relaxed)
    }

    pub fn get_duplicate_lines(&self) -> u64 {
        self.duplicate_lines.load(Ordering::Relaxed)
    }

    pub fn get_appended_lines(&self) -> u64 {
        self.appended_lines.load(Ordering::Relaxed)
    }

    pub fn get_appended_bytes(&self) -> u64 {
        self.appended_bytes.load(Ordering::Relaxed)
    }

    pub fn get_input_errors(&self) -> u64 {
        self.input_errors.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    pub fn lines_per_second(&self) -> f64 {
        let elapsed = self.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.get_input_lines() as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Print final statistics
    pub fn print_summary(&self) {
        let errors = self.get_input_errors();

        eprintln!();
        eprintln!("{}", "═".repeat(60).green());
        eprintln!("  {} {}", "Loaded lines:   ".green(), format_number(self.get_loaded_lines()));
        eprintln!("  {} {}", "Input lines:    ".green(), format_number(self.get_input_lines()));
        eprintln!("  {} {}", "Blank skipped:  ".green(), format_number(self.get_blank_lines()));
        eprintln!("  {} {}", "Duplicates:     ".yellow(), format_number(self.get_duplicate_lines()));
        eprintln!(
            "  {} {}",
            "New lines:      ".green().bold(),
            format_number(self.get_new_lines()).green().bold()
        );
        eprintln!(
            "  {} {} ({})",
            "Appended:       ".green(),
            format_number(self.get_appended_lines()),
            ByteSize(self.get_appended_bytes())
        );

        if errors > 0 {
            eprintln!("  {} {}", "Input errors:   ".red(), format_number(errors).red());
        }

        eprintln!();
        eprintln!("  {} {}", "Duration:       ".green(), format_duration(self.elapsed()));
        eprintln!("  {} {:.2} lines/sec", "Throughput:     ".green(), self.lines_per_second());
        eprintln!("{}", "═".repeat(60).green());
    }
}

impl Default for RunStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Format a number with thousand separators
fn format_number(n: u64) -> String {
    let s = n.to_string();
    let mut result = String::new();
    let chars: Vec<char> = s.chars().collect();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(*c);
    }

    result
}

/// Format duration as human-readable string
pub fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();

    if secs < 60 {
        format!("{:.1}s", duration.as_secs_f64())
    } else if secs < 3600 {
        let mins = secs / 60;
        let secs = secs % 60;
        format!("{}m {}s", mins, secs)
    } else {
        let hours = secs / 3600;
        let mins = (secs % 3600) / 60;
        format!("{}h {}m", hours, mins)
    }
}
