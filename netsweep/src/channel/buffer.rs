//! Pattern buffer with efficient tail-search optimization.
//!
//! Only the last N bytes of the buffer are searched for prompt patterns,
//! rather than the entire output. For large outputs (full routing tables,
//! `show tech-support`) this keeps prompt detection cheap.

use memchr::memrchr;
use regex::bytes::Regex;

use super::ansi::AnsiStripper;

/// Buffer for accumulating output and efficiently searching for patterns.
#[derive(Debug)]
pub struct PatternBuffer {
    /// The accumulated output buffer (ANSI-stripped).
    buffer: Vec<u8>,

    /// How many bytes from the end to search for patterns.
    search_depth: usize,

    stripper: AnsiStripper,
}

impl PatternBuffer {
    /// Create a new pattern buffer with the specified search depth.
    ///
    /// # Arguments
    ///
    /// * `search_depth` - Number of bytes from the end to search for patterns.
    ///   Default recommendation is 1000 bytes.
    pub fn new(search_depth: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(4096),
            search_depth,
            stripper: AnsiStripper::new(),
        }
    }

    /// Extend the buffer with new data, stripping ANSI escape codes.
    pub fn extend(&mut self, data: &[u8]) {
        self.stripper.strip_into(data, &mut self.buffer);
    }

    /// Check whether the last line of the buffer matches the pattern.
    ///
    /// A device prompt is never followed by a newline, so matching against
    /// the last line keeps prompt-like text inside command output (for
    /// example `router#` in a config dump) from ending a read early.
    pub fn last_line_matches(&self, pattern: &Regex) -> bool {
        pattern.is_match(self.last_line())
    }

    /// The bytes after the final newline, bounded by the search depth.
    pub fn last_line(&self) -> &[u8] {
        let tail = self.tail();
        match memrchr(b'\n', tail) {
            Some(pos) => &tail[pos + 1..],
            None => tail,
        }
    }

    fn tail(&self) -> &[u8] {
        let start = self.buffer.len().saturating_sub(self.search_depth);
        &self.buffer[start..]
    }

    /// Take ownership of the buffer contents and reset.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buffer)
    }

    /// Get a reference to the buffer contents.
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    /// Get the current buffer length.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Check if the buffer is empty.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for PatternBuffer {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_extend() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"Hello, world!");
        assert_eq!(buffer.as_slice(), b"Hello, world!");
    }

    #[test]
    fn test_ansi_stripping() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"\x1b[32mGreen text\x1b[0m");
        assert_eq!(buffer.as_slice(), b"Green text");
    }

    #[test]
    fn test_last_line_bounded_by_search_depth() {
        let mut buffer = PatternBuffer::new(10);
        buffer.extend(b"router#");
        buffer.extend(&[b'x'; 100]);

        let pattern = Regex::new(r"router#").unwrap();
        assert!(!buffer.last_line_matches(&pattern));
        assert_eq!(buffer.last_line().len(), 10);
    }

    #[test]
    fn test_last_line_matches_only_trailing_prompt() {
        let pattern = Regex::new(r"(?m)^[\w.\-]+#\s?$").unwrap();

        let mut buffer = PatternBuffer::new(1000);
        buffer.extend(b"show run\r\nhostname core1\r\ncore1#\r\nend\r\n");
        assert!(!buffer.last_line_matches(&pattern));

        buffer.extend(b"core1#");
        assert!(buffer.last_line_matches(&pattern));
        assert_eq!(buffer.last_line(), b"core1#");
    }

    #[test]
    fn test_take_clears_buffer() {
        let mut buffer = PatternBuffer::new(100);
        buffer.extend(b"test data");
        assert_eq!(buffer.take(), b"test data");
        assert!(buffer.is_empty());
    }
}
