//! # anew
//!
//! Stream filter that prints only lines it has not seen before, and keeps a
//! running memory of seen lines in a plain append-only file.
//!
//! ## Features
//!
//! - **Persistent dedup**: lines already in the backing file are never re-emitted
//! - **Append-only**: new lines are appended in acceptance order, nothing is rewritten
//! - **Concurrent checking**: a fixed worker pool checks lines against a shared set
//! - **Trim mode**: optionally compare lines with surrounding whitespace stripped
//! - **Dry run / quiet**: detect without writing, or write without printing
//!
//! ## Usage
//!
//! ```bash
//! # Print new subdomains and remember them
//! subfinder -d example.com | anew subdomains.txt
//!
//! # Only show what is new
//! cat hosts.txt | anew -d known-hosts.txt
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use anew::processor::{Processor, ProcessorConfig};
//! use std::io;
//! use std::path::PathBuf;
//!
//! let config = ProcessorConfig {
//!     backing_file: Some(PathBuf::from("seen.txt")),
//!     trim: true,
//!     ..ProcessorConfig::default()
//! };
//!
//! let processor = Processor::new(config);
//! let summary = processor.process(io::stdin().lock(), io::stdout()).unwrap();
//! eprintln!("{} new lines", summary.new_lines);
//! ```

pub mod cli;
pub mod dedup;
pub mod error;
pub mod filter;
pub mod loader;
pub mod output;
pub mod processor;
pub mod progress;
pub mod reader;

pub use cli::Args;
pub use error::{Error, Result};
pub use processor::{Processor, ProcessorConfig, RunSummary};
