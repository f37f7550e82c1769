//! Fixed-capacity output of the shell.

use log::warn;
use std::fmt;

/// Memory-backed writer for command output.
///
/// Writes start at offset 0 after every [`OutputBuffer::reset`]. Whatever
/// does not fit is dropped silently; [`OutputBuffer::is_truncated`] tells
/// whether that happened since the last reset.
#[derive(Debug, Default)]
pub struct OutputBuffer<'m> {
    buf: &'m mut [u8],
    written: usize,
    truncated: bool,
}

impl<'m> OutputBuffer<'m> {
    pub fn new(buf: &'m mut [u8]) -> Self {
        Self {
            buf,
            written: 0,
            truncated: false,
        }
    }

    /// Copies as much of `bytes` as fits and returns how many bytes that was.
    pub fn write_bytes(&mut self, bytes: &[u8]) -> usize {
        let n = bytes.len().min(self.remaining());
        self.buf[self.written..self.written + n].copy_from_slice(&bytes[..n]);
        self.written += n;
        if n < bytes.len() && !self.truncated {
            warn!(
                "output truncated: {} bytes dropped, capacity is {}",
                bytes.len() - n,
                self.buf.len()
            );
            self.truncated = true;
        }
        n
    }

    /// Writes `bytes` as a double-quoted string. Invalid UTF-8 is shown as
    /// U+FFFD.
    pub fn write_quoted(&mut self, bytes: &[u8]) -> usize {
        let mut n = self.write_bytes(b"\"");
        for chunk in bytes.utf8_chunks() {
            n += self.write_bytes(chunk.valid().as_bytes());
            if !chunk.invalid().is_empty() {
                n += self.write_bytes("\u{FFFD}".as_bytes());
            }
        }
        n + self.write_bytes(b"\"")
    }

    pub fn reset(&mut self) {
        self.written = 0;
        self.truncated = false;
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.written]
    }

    pub fn len(&self) -> usize {
        self.written
    }

    pub fn is_empty(&self) -> bool {
        self.written == 0
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.written
    }

    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}

impl fmt::Write for OutputBuffer<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_bytes(s.as_bytes());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fmt::Write;

    #[test]
    fn test_writes_accumulate() {
        let mut buf = [0u8; 32];
        let mut out = OutputBuffer::new(&mut buf);

        assert_eq!(out.write_bytes(b"hello"), 5);
        write!(out, " {}", 42).unwrap();
        assert_eq!(out.as_bytes(), b"hello 42");
        assert_eq!(out.remaining(), 24);
        assert!(!out.is_truncated());
    }

    #[test]
    fn test_overflow_is_truncated_silently() {
        let mut buf = [0u8; 4];
        let mut out = OutputBuffer::new(&mut buf);

        assert_eq!(out.write_bytes(b"abcdef"), 4);
        assert_eq!(out.write_bytes(b"g"), 0);
        assert!(write!(out, "more").is_ok());
        assert_eq!(out.as_bytes(), b"abcd");
        assert!(out.is_truncated());

        out.reset();
        assert!(out.is_empty());
        assert!(!out.is_truncated());
    }

    #[test]
    fn test_quoted_strings_replace_invalid_utf8() {
        let mut buf = [0u8; 32];
        let mut out = OutputBuffer::new(&mut buf);

        out.write_quoted(b"a\xffb");
        assert_eq!(out.as_bytes(), "\"a\u{FFFD}b\"".as_bytes());
    }

    #[test]
    fn test_absent_buffer_drops_everything() {
        let mut out = OutputBuffer::default();
        assert_eq!(out.write_bytes(b"x"), 0);
        assert_eq!(out.capacity(), 0);
        assert!(out.is_truncated());
    }
}
