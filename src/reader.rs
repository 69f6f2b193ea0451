//! Line reading
//!
//! Splits any buffered byte stream into lines without requiring UTF-8.

use std::io::{self, BufRead, Read};

/// Default buffer size for stream reading (64KB)
pub const DEFAULT_BUFFER_SIZE: usize = 64 * 1024;

/// Default cap on a single line, terminator excluded (1MB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 1024 * 1024;

/// Iterator over the lines of a buffered reader.
///
/// Each item is the line without its `\n` terminator (and without a `\r`
/// directly before it). A final line without terminator is still yielded.
/// A line longer than the cap yields an `InvalidData` error instead of
/// being buffered whole.
pub struct LineReader<R: BufRead> {
    reader: R,
    line_buffer: Vec<u8>,
    max_line_length: usize,
}

impl<R: BufRead> LineReader<R> {
    pub fn with_max_line_length(reader: R, max_line_length: usize) -> Self {
        Self {
            reader,
            line_buffer: Vec::with_capacity(4096),
            max_line_length: max_line_length.max(1),
        }
    }
}

impl<R: BufRead> Iterator for LineReader<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        self.line_buffer.clear();

        // One byte of headroom for the terminator
        let limit = self.max_line_length as u64 + 1;
        match (&mut self.reader).take(limit).read_until(b'\n', &mut self.line_buffer) {
            Ok(0) => None,
            Ok(_) => {
                if self.line_buffer.last() == Some(&b'\n') {
                    self.line_buffer.pop();
                    if self.line_buffer.last() == Some(&b'\r') {
                        self.line_buffer.pop();
                    }
                } else if self.line_buffer.len() > self.max_line_length {
                    return Some(Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("line longer than {} bytes", self.max_line_length),
                    )));
                }
                Some(Ok(self.line_buffer.clone()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
