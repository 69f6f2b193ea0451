//! Line normalization
//!
//! Decides what a line *is* before it is compared, stored or emitted.

use bstr::ByteSlice;

/// Normalization rules applied to every line, both on load and on input
#[derive(Debug, Clone, Copy, Default)]
pub struct LineFilter {
    /// Strip leading and trailing whitespace before comparison and storage
    pub trim: bool,
}

impl LineFilter {
    pub fn new(trim: bool) -> Self {
        Self { trim }
    }

    /// Normalize a raw line.
    ///
    /// Returns `None` for blank lines: a line that is empty once trimmed is
    /// ignored everywhere, even when trimming is off. Otherwise returns the
    /// bytes that take part in comparison, storage and emission.
    #[inline]
    pub fn normalize<'a>(&self, line: &'a [u8]) -> Option<&'a [u8]> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return None;
        }

        if self.trim {
            Some(trimmed)
        } else {
            Some(line)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_collapses_whitespace_variants() {
        let filter = LineFilter::new(true);

        assert_eq!(filter.normalize(b"  foo"), Some(&b"foo"[..]));
        assert_eq!(filter.normalize(b"foo "), Some(&b"foo"[..]));
        assert_eq!(filter.normalize(b"\tfoo\t"), Some(&b"foo"[..]));
        assert_eq!(filter.normalize(b"foo"), Some(&b"foo"[..]));
    }

    #[test]
    fn test_no_trim_keeps_line_verbatim() {
        let filter = LineFilter::new(false);

        assert_eq!(filter.normalize(b"  foo"), Some(&b"  foo"[..]));
        assert_eq!(filter.normalize(b"foo "), Some(&b"foo "[..]));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        for trim in [true, false] {
            let filter = LineFilter::new(trim);

            assert_eq!(filter.normalize(b""), None);
            assert_eq!(filter.normalize(b"   "), None);
            assert_eq!(filter.normalize(b"\t \t"), None);
            assert!(filter.normalize(b" x ").is_some());
        }
    }

    #[test]
    fn test_non_utf8_passes_through() {
        let filter = LineFilter::new(true);
        let line = b" \xff\xfeabc ";

        assert_eq!(filter.normalize(line), Some(&b"\xff\xfeabc"[..]));
    }
}
