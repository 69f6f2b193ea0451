//! Backing file loading
//!
//! Seeds the seen set with every line already stored in the backing file.
//! Loading is best effort: nothing here is fatal.

use crate::dedup::SeenSet;
use crate::filter::LineFilter;
use crate::reader::LineReader;

use std::fs::File;
use std::io::{self, BufReader};
use std::path::Path;

/// Outcome of loading a backing file
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Lines inserted into the seen set (duplicates within the file included)
    pub loaded: u64,
    /// Blank lines skipped
    pub blank: u64,
    /// Error that cut loading short, if any. Lines read before it are kept.
    pub error: Option<io::Error>,
    /// The file did not exist
    pub missing: bool,
}

/// Read `path` line by line into `seen`.
pub fn load_backing_file(
    path: &Path,
    filter: &LineFilter,
    seen: &dyn SeenSet,
    buffer_size: usize,
    max_line_length: usize,
) -> LoadReport {
    let mut report = LoadReport::default();

    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            log::debug!("Backing file {:?} does not exist yet", path);
            report.missing = true;
            return report;
        }
        Err(e) => {
            report.error = Some(e);
            return report;
        }
    };

    let reader = LineReader::with_max_line_length(
        BufReader::with_capacity(buffer_size, file),
        max_line_length,
    );
    for line_result in reader {
        match line_result {
            Ok(line) => match filter.normalize(&line) {
                Some(line) => {
                    seen.check_and_insert(line);
                    report.loaded += 1;
                }
                None => report.blank += 1,
            },
            Err(e) => {
                report.error = Some(e);
                break;
            }
        }
    }

    log::debug!(
        "Loaded {} lines ({} blank) from {:?}",
        report.loaded,
        report.blank,
        path
    );

    report
}
