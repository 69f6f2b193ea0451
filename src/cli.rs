//! Command-line interface definition for anew
//!
//! Provides argument parsing and validation for the line dedup filter.

use clap::Parser;
use std::path::PathBuf;

use crate::processor::{DEFAULT_QUEUE_SIZE, DEFAULT_WORKERS};

/// Append lines from stdin to a file, but only if they don't already appear in it
///
/// New lines are also printed to stdout, so anew works as a "what's new"
/// filter at the end of a pipeline.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "anew",
    version,
    about = "Append lines from stdin to a file, but only if they don't already appear in it",
    long_about = r#"
Reads lines from stdin and prints the ones that have not been seen before.
When FILE is given, its lines count as already seen, and every new line is
appended to it. Blank lines are ignored.

EXAMPLES:
    # Keep a running list of discovered subdomains, print only the new ones
    subfinder -d example.com | anew subdomains.txt

    # See what would be added without touching the file
    cat hosts.txt | anew -d known-hosts.txt

    # Update the file silently
    cat urls.txt | anew -q urls-seen.txt

    # Treat "foo" and "  foo " as the same line
    cat words.txt | anew -t words-seen.txt
"#
)]
pub struct Args {
    /// File holding previously seen lines; new lines are appended to it
    #[arg(value_name = "FILE")]
    pub file: Option<PathBuf>,

    /// Quiet mode - don't print new lines to stdout
    #[arg(short, long, default_value_t = false)]
    pub quiet: bool,

    /// Dry run - print new lines but don't append anything to FILE
    #[arg(short, long, default_value_t = false)]
    pub dry_run: bool,

    /// Trim leading and trailing whitespace before comparison
    #[arg(short, long, default_value_t = false)]
    pub trim: bool,

    /// Number of worker threads checking lines
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Capacity of the work and append queues
    #[arg(long, value_name = "NUM", default_value_t = DEFAULT_QUEUE_SIZE)]
    pub queue_size: usize,

    /// Buffer size for reading stdin and writing FILE
    #[arg(long, value_name = "SIZE", default_value = "64KB")]
    pub buffer_size: String,

    /// Longest accepted line; a longer line stops reading with a warning
    #[arg(long, value_name = "SIZE", default_value = "1MB")]
    pub max_line_length: String,

    /// Verbose mode - debug logging on stderr
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Print run statistics to stderr when done
    #[arg(long, default_value_t = false)]
    pub stats: bool,

    /// Show a progress spinner on stderr
    #[arg(long, default_value_t = false)]
    pub progress: bool,
}

impl Args {
    /// Parse buffer size string to bytes
    pub fn parse_buffer_size(&self) -> anyhow::Result<usize> {
        let size = parse_size(&self.buffer_size)?;
        if size == 0 {
            anyhow::bail!("Buffer size must be greater than zero");
        }
        Ok(size)
    }

    /// Parse maximum line length string to bytes
    pub fn parse_max_line_length(&self) -> anyhow::Result<usize> {
        let size = parse_size(&self.max_line_length)?;
        if size == 0 {
            anyhow::bail!("Maximum line length must be greater than zero");
        }
        Ok(size)
    }
}

/// Parse human-readable size string to bytes
fn parse_size(size_str: &str) -> anyhow::Result<usize> {
    let size_str = size_str.trim().to_uppercase();

    let (num_str, multiplier) = if let Some(num) = size_str.strip_suffix("GB") {
        (num, 1024 * 1024 * 1024)
    } else if let Some(num) = size_str.strip_suffix("MB") {
        (num, 1024 * 1024)
    } else if let Some(num) = size_str.strip_suffix("KB") {
        (num, 1024)
    } else if let Some(num) = size_str.strip_suffix('B') {
        (num, 1)
    } else {
        (size_str.as_str(), 1)
    };

    let num: usize = num_str
        .trim()
        .parse()
        .map_err(|_| anyhow::anyhow!("Invalid size format: '{}'", size_str))?;

    num.checked_mul(multiplier)
        .ok_or_else(|| anyhow::anyhow!("Size too large: '{}'", size_str))
}
