//! Backing file appender
//!
//! Owns the backing file for the whole append phase. Records are written
//! by a single thread in the order they arrive on the append queue.

use crate::error::{Error, Result};

use crossbeam_channel::Receiver;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

/// Buffered append-only writer for the backing file
pub struct AppendWriter {
    writer: BufWriter<File>,
    path: PathBuf,
    needs_newline: bool,
    lines_written: u64,
    bytes_written: u64,
}

impl AppendWriter {
    /// Open `path` in append-create mode.
    ///
    /// The last byte of any existing content is inspected once here. If it
    /// is not `\n`, a newline is written before the first record so the new
    /// record does not run into the file's last line.
    pub fn open(path: &Path, buffer_size: usize) -> Result<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(path)
            .map_err(|source| Error::OpenForWrite {
                path: path.to_path_buf(),
                source,
            })?;

        let needs_newline = probe_missing_newline(&mut file).map_err(|source| Error::ProbeFile {
            path: path.to_path_buf(),
            source,
        })?;

        log::debug!(
            "Opened {:?} for appending (leading newline needed: {})",
            path,
            needs_newline
        );

        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size, file),
            path: path.to_path_buf(),
            needs_newline,
            lines_written: 0,
            bytes_written: 0,
        })
    }

    /// Append one record, newline-terminated
    pub fn write_line(&mut self, line: &[u8]) -> Result<()> {
        if self.needs_newline {
            self.writer.write_all(b"\n").map_err(|e| self.append_error(e))?;
            self.bytes_written += 1;
            self.needs_newline = false;
        }

        self.writer.write_all(line).map_err(|e| self.append_error(e))?;
        self.writer.write_all(b"\n").map_err(|e| self.append_error(e))?;
        self.lines_written += 1;
        self.bytes_written += line.len() as u64 + 1;
        Ok(())
    }

    /// Flush the buffer to disk
    pub fn flush(&mut self) -> Result<()> {
        self.writer.flush().map_err(|e| self.append_error(e))
    }

    /// Get the backing file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get number of records written
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Get bytes written, including a leading separator newline
    pub fn bytes_written(&self) -> u64 {
        self.bytes_written
    }

    fn append_error(&self, source: io::Error) -> Error {
        Error::Append {
            path: self.path.clone(),
            source,
        }
    }
}

/// Check whether a non-empty file lacks a trailing newline
fn probe_missing_newline(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }

    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

/// Totals reported by the appender once the queue is drained
#[derive(Debug, Default, Clone, Copy)]
pub struct AppendSummary {
    pub lines: u64,
    pub bytes: u64,
}

/// Drain the append queue into `writer` until every sender is gone.
///
/// The buffer is flushed whenever the queue runs empty, so an idle stream
/// still reaches the file promptly. Any write error ends the loop; dropping
/// the receiver then makes further sends fail.
pub fn run_appender(mut writer: AppendWriter, queue: Receiver<Vec<u8>>) -> Result<AppendSummary> {
    for line in queue.iter() {
        writer.write_line(&line)?;
        if queue.is_empty() {
            writer.flush()?;
        }
    }
    writer.flush()?;

    log::debug!(
        "Appender finished: {} records to {:?}",
        writer.lines_written(),
        writer.path()
    );

    Ok(AppendSummary {
        lines: writer.lines_written(),
        bytes: writer.bytes_written(),
    })
}
