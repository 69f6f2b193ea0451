//! Core processing engine
//!
//! Loads the backing file, then streams input through a fixed pool of
//! workers that check each line against the shared seen set. New lines go
//! to the output stream and to the appender thread.
//!
//! ```text
//! reader ──work queue──> worker × N ──append queue──> appender ──> FILE
//!                             └──────> output
//! ```

use crate::cli::Args;
use crate::dedup::{create_seen_set, SeenSet};
use crate::error::{Error, Result};
use crate::filter::LineFilter;
use crate::loader::load_backing_file;
use crate::output::{run_appender, AppendWriter};
use crate::progress::{create_spinner, print_warning, RunStats};
use crate::reader::{LineReader, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_LINE_LENGTH};

use crossbeam_channel::{Receiver, Sender};
use indicatif::ProgressBar;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;

/// Default number of workers
pub const DEFAULT_WORKERS: usize = 4;

/// Default capacity of the work and append queues
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// Processor configuration, fixed for the whole run
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    pub backing_file: Option<PathBuf>,
    pub quiet: bool,
    pub dry_run: bool,
    pub trim: bool,
    pub workers: usize,
    pub queue_size: usize,
    pub buffer_size: usize,
    pub max_line_length: usize,
    pub progress: bool,
}

impl ProcessorConfig {
    pub fn from_args(args: &Args) -> anyhow::Result<Self> {
        Ok(Self {
            backing_file: args.file.clone(),
            quiet: args.quiet,
            dry_run: args.dry_run,
            trim: args.trim,
            workers: args.workers,
            queue_size: args.queue_size,
            buffer_size: args.parse_buffer_size()?,
            max_line_length: args.parse_max_line_length()?,
            progress: args.progress,
        })
    }

    /// The file new lines are appended to, if writing is enabled
    pub fn append_target(&self) -> Option<&Path> {
        if self.dry_run {
            None
        } else {
            self.backing_file.as_deref()
        }
    }
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            backing_file: None,
            quiet: false,
            dry_run: false,
            trim: false,
            workers: DEFAULT_WORKERS,
            queue_size: DEFAULT_QUEUE_SIZE,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
            progress: false,
        }
    }
}

/// Snapshot of what a run did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub loaded: u64,
    pub new_lines: u64,
    pub duplicates: u64,
    pub appended: u64,
    pub input_errors: u64,
}

/// Main processor
pub struct Processor {
    config: ProcessorConfig,
    filter: LineFilter,
    seen: Box<dyn SeenSet>,
    stats: Arc<RunStats>,
}

impl Processor {
    pub fn new(config: ProcessorConfig) -> Self {
        let filter = LineFilter::new(config.trim);
        let seen = create_seen_set(config.workers);

        Self {
            config,
            filter,
            seen,
            stats: Arc::new(RunStats::new()),
        }
    }

    /// Run the whole pipeline over `input`, writing new lines to `output`.
    ///
    /// Fails only on write-side errors. The backing file is opened for
    /// writing before any input is consumed.
    pub fn process<R, W>(&self, input: R, output: W) -> Result<RunSummary>
    where
        R: BufRead,
        W: Write + Send,
    {
        if let Some(path) = self.config.backing_file.as_deref() {
            self.load(path);
        }

        let appender = match self.config.append_target() {
            Some(path) => Some(AppendWriter::open(path, self.config.buffer_size)?),
            None => None,
        };

        self.run_pipeline(input, output, appender)?;

        Ok(self.summary())
    }

    /// Seed the seen set from the backing file, warning on partial reads
    fn load(&self, path: &Path) {
        let report = load_backing_file(
            path,
            &self.filter,
            &*self.seen,
            self.config.buffer_size,
            self.config.max_line_length,
        );

        self.stats.add_loaded(report.loaded);
        self.stats.add_blank(report.blank);

        if let Some(e) = report.error {
            print_warning(&format!(
                "failed to read {:?}: {} (continuing with {} loaded lines)",
                path, e, report.loaded
            ));
        }

        log::info!("{} distinct lines known before reading input", self.seen.len());
    }

    fn run_pipeline<R, W>(&self, input: R, output: W, appender: Option<AppendWriter>) -> Result<()>
    where
        R: BufRead,
        W: Write + Send,
    {
        let workers = self.config.workers.max(1);
        let queue_size = self.config.queue_size.max(1);
        let output = Mutex::new(output);
        let spinner = create_spinner(self.config.progress);

        thread::scope(|s| -> Result<()> {
            let (append_tx, appender_handle) = match appender {
                Some(writer) => {
                    let (tx, rx) = crossbeam_channel::bounded::<Vec<u8>>(queue_size);
                    let handle = thread::Builder::new()
                        .name("anew-appender".to_string())
                        .spawn_scoped(s, move || run_appender(writer, rx))
                        .map_err(|e| Error::Spawn("appender", e))?;
                    (Some(tx), Some(handle))
                }
                None => (None, None),
            };

            let (work_tx, work_rx) = crossbeam_channel::bounded::<Vec<u8>>(queue_size);

            let mut handles = Vec::with_capacity(workers);
            for idx in 0..workers {
                let queue = work_rx.clone();
                let append = append_tx.clone();
                let output = &output;

                let handle = thread::Builder::new()
                    .name(format!("anew-worker-{idx}"))
                    .spawn_scoped(s, move || self.work(queue, append, output))
                    .map_err(|e| Error::Spawn("worker", e))?;
                handles.push(handle);
            }

            // Workers hold the only receivers and append senders from here on
            drop(work_rx);
            drop(append_tx);

            log::debug!("Started {} workers (queue size {})", workers, queue_size);

            self.feed(input, &work_tx, &spinner);
            drop(work_tx);

            let mut worker_error = None;
            for handle in handles {
                match handle.join() {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => {
                        worker_error.get_or_insert(e);
                    }
                    Err(_) => {
                        worker_error.get_or_insert(Error::WorkerPanicked("worker"));
                    }
                }
            }

            if let Some(handle) = appender_handle {
                let summary = handle
                    .join()
                    .map_err(|_| Error::WorkerPanicked("appender"))??;
                self.stats.add_appended(summary.lines, summary.bytes);
            }

            log::debug!("Pipeline drained");

            match worker_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        })?;

        spinner.finish_and_clear();

        let mut output = output.into_inner().unwrap_or_else(PoisonError::into_inner);
        output.flush().map_err(Error::Output)
    }

    /// Read input lines into the work queue until end of stream.
    ///
    /// A read error stops reading but is not fatal. A closed queue means
    /// every worker has stopped, so there is nobody left to feed.
    fn feed<R: BufRead>(&self, input: R, queue: &Sender<Vec<u8>>, spinner: &ProgressBar) {
        for line_result in LineReader::with_max_line_length(input, self.config.max_line_length) {
            match line_result {
                Ok(line) => {
                    self.stats.add_input_line();
                    spinner.inc(1);

                    if queue.send(line).is_err() {
                        log::debug!("Work queue closed, no longer reading input");
                        break;
                    }
                }
                Err(e) => {
                    self.stats.add_input_error();
                    print_warning(&format!("failed to read input: {}", e));
                    break;
                }
            }
        }
    }

    /// Worker loop: check-and-insert each line, route the new ones
    fn work<W: Write>(
        &self,
        queue: Receiver<Vec<u8>>,
        append: Option<Sender<Vec<u8>>>,
        output: &Mutex<W>,
    ) -> Result<()> {
        for raw in queue.iter() {
            let Some(line) = self.filter.normalize(&raw) else {
                self.stats.add_blank(1);
                continue;
            };

            let inserted = self.seen.check_and_insert(line);
            self.stats.record_check(inserted);
            if !inserted {
                continue;
            }

            if !self.config.quiet {
                emit(output, line)?;
            }

            if let Some(ref tx) = append {
                tx.send(line.to_vec()).map_err(|_| Error::AppenderClosed)?;
            }
        }

        Ok(())
    }

    /// Get processing statistics
    pub fn stats(&self) -> Arc<RunStats> {
        Arc::clone(&self.stats)
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            loaded: self.stats.get_loaded_lines(),
            new_lines: self.stats.get_new_lines(),
            duplicates: self.stats.get_duplicate_lines(),
            appended: self.stats.get_appended_lines(),
            input_errors: self.stats.get_input_errors(),
        }
    }
}

/// Write one line to the shared output. The lock keeps records whole.
fn emit<W: Write>(output: &Mutex<W>, line: &[u8]) -> Result<()> {
    let mut out = output.lock().unwrap_or_else(PoisonError::into_inner);
    out.write_all(line).map_err(Error::Output)?;
    out.write_all(b"\n").map_err(Error::Output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::io::{self, BufReader, Cursor, Read};
    use tempfile::TempDir;

    fn config(path: Option<PathBuf>) -> ProcessorConfig {
        ProcessorConfig {
            backing_file: path,
            ..ProcessorConfig::default()
        }
    }

    fn run(config: ProcessorConfig, input: &str) -> (RunSummary, Vec<String>) {
        let mut out = Vec::new();
        let summary = Processor::new(config)
            .process(Cursor::new(input.to_string()), &mut out)
            .unwrap();

        let lines = String::from_utf8(out)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect();
        (summary, lines)
    }

    fn as_set(lines: &[String]) -> HashSet<&str> {
        lines.iter().map(String::as_str).collect()
    }

    #[test]
    fn test_worked_example() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let (summary, out) = run(config(Some(path.clone())), "b\nc\nc\na\nd\n");

        assert_eq!(as_set(&out), HashSet::from(["c", "d"]));
        assert_eq!(out.len(), 2);
        assert_eq!(summary.loaded, 2);
        assert_eq!(summary.new_lines, 2);
        assert_eq!(summary.duplicates, 3);
        assert_eq!(summary.appended, 2);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(&lines[..2], &["a", "b"]);
        assert_eq!(lines[2..].iter().copied().collect::<HashSet<_>>(), HashSet::from(["c", "d"]));
    }

    #[test]
    fn test_single_worker_keeps_input_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        std::fs::write(&path, "a\nb\n").unwrap();

        let cfg = ProcessorConfig {
            workers: 1,
            ..config(Some(path.clone()))
        };
        let (_, out) = run(cfg, "b\nc\nc\na\nd\n");

        assert_eq!(out, vec!["c", "d"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc\nd\n");
    }

    #[test]
    fn test_second_run_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        let input = "x\ny\nz\nx\n";

        let (first, out) = run(config(Some(path.clone())), input);
        assert_eq!(first.new_lines, 3);
        assert_eq!(out.len(), 3);
        let after_first = std::fs::read(&path).unwrap();

        let (second, out) = run(config(Some(path.clone())), input);
        assert_eq!(second.new_lines, 0);
        assert!(out.is_empty());
        assert_eq!(std::fs::read(&path).unwrap(), after_first);
    }

    #[test]
    fn test_runs_only_ever_append() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        let single = |p: &PathBuf| ProcessorConfig {
            workers: 1,
            ..config(Some(p.clone()))
        };

        run(single(&path), "one\ntwo\n");
        run(single(&path), "two\nthree\none\nfour\n");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "one\ntwo\nthree\nfour\n");
    }

    #[test]
    fn test_unterminated_backing_file_is_joined_with_newline() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        std::fs::write(&path, "a\nb").unwrap();

        run(config(Some(path.clone())), "b\nc\n");

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\nc\n");
    }

    #[test]
    fn test_trim_treats_whitespace_variants_as_one_line() {
        let cfg = ProcessorConfig {
            trim: true,
            workers: 1,
            ..ProcessorConfig::default()
        };
        let (summary, out) = run(cfg, "  foo\nfoo \nfoo\n");

        assert_eq!(out, vec!["foo"]);
        assert_eq!(summary.new_lines, 1);
    }

    #[test]
    fn test_without_trim_whitespace_is_significant() {
        let (_, out) = run(ProcessorConfig::default(), "  foo\nfoo \nfoo\n");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn test_blank_lines_are_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let (summary, out) = run(config(Some(path.clone())), "\n   \na\n\t\n");

        assert_eq!(out, vec!["a"]);
        assert_eq!(summary.new_lines, 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\n");
    }

    #[test]
    fn test_dry_run_never_touches_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        std::fs::write(&path, "a\nb").unwrap();
        let before = std::fs::read(&path).unwrap();

        let cfg = ProcessorConfig {
            dry_run: true,
            ..config(Some(path.clone()))
        };
        let (summary, out) = run(cfg, "a\nnew\n");

        assert_eq!(out, vec!["new"]);
        assert_eq!(summary.appended, 0);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }

    #[test]
    fn test_dry_run_does_not_create_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let cfg = ProcessorConfig {
            dry_run: true,
            ..config(Some(path.clone()))
        };
        run(cfg, "a\n");

        assert!(!path.exists());
    }

    #[test]
    fn test_quiet_writes_nothing_to_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let cfg = ProcessorConfig {
            quiet: true,
            ..config(Some(path.clone()))
        };
        let (summary, out) = run(cfg, "a\nb\na\n");

        assert!(out.is_empty());
        assert_eq!(summary.new_lines, 2);
        assert_eq!(summary.appended, 2);
        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().collect::<HashSet<_>>(), HashSet::from(["a", "b"]));
    }

    #[test]
    fn test_without_backing_file_acts_as_unique_filter() {
        let (summary, out) = run(ProcessorConfig::default(), "a\nb\na\nc\nb\n");

        assert_eq!(as_set(&out), HashSet::from(["a", "b", "c"]));
        assert_eq!(out.len(), 3);
        assert_eq!(summary.appended, 0);
    }

    #[test]
    fn test_many_workers_accept_each_line_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let input: String = (0..5000).map(|i| format!("line-{}\n", i % 1000)).collect();
        let cfg = ProcessorConfig {
            workers: 8,
            queue_size: 16,
            ..config(Some(path.clone()))
        };
        let (summary, out) = run(cfg, &input);

        assert_eq!(out.len(), 1000);
        assert_eq!(as_set(&out).len(), 1000);
        assert_eq!(summary.new_lines, 1000);
        assert_eq!(summary.duplicates, 4000);

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1000);
        assert_eq!(content.lines().collect::<HashSet<_>>().len(), 1000);
    }

    #[test]
    fn test_open_for_write_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing-dir").join("seen.txt");

        let mut out = Vec::new();
        let err = Processor::new(config(Some(path)))
            .process(Cursor::new("a\n"), &mut out)
            .err()
            .unwrap();

        assert!(matches!(err, Error::OpenForWrite { .. }));
        assert!(out.is_empty());
    }

    #[test]
    fn test_input_error_keeps_accepted_lines() {
        struct FailAfter(Cursor<Vec<u8>>);

        impl Read for FailAfter {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                match self.0.read(buf)? {
                    0 => Err(io::Error::new(io::ErrorKind::Other, "stream broke")),
                    n => Ok(n),
                }
            }
        }

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");
        let input = BufReader::new(FailAfter(Cursor::new(b"a\nb\n".to_vec())));

        let cfg = ProcessorConfig {
            workers: 1,
            ..config(Some(path.clone()))
        };
        let mut out = Vec::new();
        let summary = Processor::new(cfg).process(input, &mut out).unwrap();

        assert_eq!(summary.input_errors, 1);
        assert_eq!(out, b"a\nb\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[test]
    fn test_output_failure_is_fatal() {
        struct Closed;

        impl Write for Closed {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let err = Processor::new(ProcessorConfig::default())
            .process(Cursor::new("a\nb\n"), Closed)
            .err()
            .unwrap();

        assert!(matches!(err, Error::Output(_)));
    }

    #[test]
    fn test_overlong_input_line_stops_reading() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("seen.txt");

        let cfg = ProcessorConfig {
            workers: 1,
            max_line_length: 8,
            ..config(Some(path.clone()))
        };
        let input = format!("a\nb\n{}\nc\n", "x".repeat(32));
        let (summary, out) = run(cfg, &input);

        assert_eq!(summary.input_errors, 1);
        assert_eq!(out, vec!["a", "b"]);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_append_failure_is_fatal() {
        // Every write to /dev/full fails with ENOSPC
        let writer = AppendWriter::open(Path::new("/dev/full"), 16).unwrap();
        let input: String = (0..20_000).map(|i| format!("line-{i}\n")).collect();

        let mut out = Vec::new();
        let processor = Processor::new(ProcessorConfig::default());
        let err = processor
            .run_pipeline(Cursor::new(input), &mut out, Some(writer))
            .err()
            .unwrap();

        assert!(matches!(err, Error::Append { .. }));
        assert_eq!(processor.summary().appended, 0);
    }
}
