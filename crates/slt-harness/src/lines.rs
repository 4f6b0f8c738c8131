//! Line-by-line reader that tracks 1-based source line numbers.
//!
//! Scripts are decoded lossily: bytes that are not valid UTF-8 become
//! U+FFFD instead of failing the whole file.

use std::fs;
use std::io::BufRead;
use std::path::Path;

use slt_error::Result;
use tracing::warn;

/// Read a script from disk, replacing invalid UTF-8 sequences.
pub fn read_script(path: &Path) -> Result<String> {
    let bytes = fs::read(path)?;
    Ok(match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(err) => {
            warn!(file = %path.display(), error = %err.utf8_error(), "script is not valid utf-8");
            String::from_utf8_lossy(err.as_bytes()).into_owned()
        }
    })
}

/// Wraps a buffered reader and counts the lines consumed so far.
///
/// Lines are handed out exactly once; there is no pushback.
#[derive(Debug)]
pub struct LineSource<R> {
    reader: R,
    line_number: usize,
    buf: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    #[must_use]
    pub const fn new(reader: R) -> Self {
        Self {
            reader,
            line_number: 0,
            buf: Vec::new(),
        }
    }

    /// Read the next line without its terminator (`\n` or `\r\n`).
    ///
    /// Returns `Ok(None)` at end of input.
    pub fn next_line(&mut self) -> Result<Option<String>> {
        self.buf.clear();
        if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        if self.buf.ends_with(b"\n") {
            self.buf.pop();
            if self.buf.ends_with(b"\r") {
                self.buf.pop();
            }
        }
        Ok(Some(String::from_utf8_lossy(&self.buf).into_owned()))
    }

    /// Number of lines consumed so far; the current line's number right
    /// after a successful [`Self::next_line`].
    #[must_use]
    pub const fn line_number(&self) -> usize {
        self.line_number
    }
}
