//! Error types for the dedup pipeline
//!
//! Only write-side failures are errors. Load-phase problems and input read
//! errors are reported as warnings and never surface here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The backing file could not be opened in append-create mode
    #[error("failed to open {} for writing", path.display())]
    OpenForWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The last byte of the backing file could not be inspected
    #[error("failed to inspect the end of {}", path.display())]
    ProbeFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing a record to the backing file failed
    #[error("failed to write to {}", path.display())]
    Append {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Emitting an accepted line to the output stream failed
    #[error("failed to write to standard output")]
    Output(#[source] io::Error),

    /// A worker tried to hand a line to an appender that already stopped
    #[error("appender stopped before all new lines were persisted")]
    AppenderClosed,

    #[error("failed to spawn {0} thread")]
    Spawn(&'static str, #[source] io::Error),

    #[error("{0} thread panicked")]
    WorkerPanicked(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;
