//! ANSI escape stripping on top of the `vte` state machine.
//!
//! The parser is kept across calls so an escape sequence split over two
//! SSH packets is still removed.

use vte::{Parser, Perform};

/// Incremental ANSI/VT100 escape sequence stripper.
pub struct AnsiStripper {
    parser: Parser,
}

impl AnsiStripper {
    pub fn new() -> Self {
        Self {
            parser: Parser::new(),
        }
    }

    /// Strip escape sequences from `data`, appending printable text to `out`.
    ///
    /// Carriage returns are dropped; newlines and tabs are kept.
    pub fn strip_into(&mut self, data: &[u8], out: &mut Vec<u8>) {
        let mut sink = Printable { out };
        self.parser.advance(&mut sink, data);
    }
}

impl Default for AnsiStripper {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AnsiStripper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnsiStripper").finish_non_exhaustive()
    }
}

struct Printable<'a> {
    out: &'a mut Vec<u8>,
}

impl Perform for Printable<'_> {
    fn print(&mut self, c: char) {
        let mut utf8 = [0u8; 4];
        self.out
            .extend_from_slice(c.encode_utf8(&mut utf8).as_bytes());
    }

    fn execute(&mut self, byte: u8) {
        match byte {
            b'\n' | b'\t' => self.out.push(byte),
            // Backspace erases the previous printable byte (pager redraws)
            0x08 => {
                self.out.pop();
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        AnsiStripper::new().strip_into(data, &mut out);
        out
    }

    #[test]
    fn test_plain_text_passes_through() {
        assert_eq!(strip(b"show version\r\n"), b"show version\n");
    }

    #[test]
    fn test_color_codes_removed() {
        assert_eq!(strip(b"\x1b[32mGreen text\x1b[0m"), b"Green text");
    }

    #[test]
    fn test_sequence_split_across_chunks() {
        let mut stripper = AnsiStripper::new();
        let mut out = Vec::new();
        stripper.strip_into(b"abc\x1b[3", &mut out);
        stripper.strip_into(b"1mdef", &mut out);
        assert_eq!(out, b"abcdef");
    }
}
