use crate::error::{IngestError, Result};
use std::io::BufRead;

/// Iterator over the non-blank lines of a newline-delimited input.
///
/// Yields `(line_number, text)` with 1-based line numbers. A line that is not
/// valid UTF-8 yields [`IngestError::Encoding`] and iteration continues; a read
/// failure yields [`IngestError::IoError`] once and then ends the iteration.
pub struct Lines<R> {
    reader: R,
    line: usize,
    buf: Vec<u8>,
    done: bool,
}

impl<R: BufRead> Lines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: Vec::new(),
            done: false,
        }
    }
}

impl<R: BufRead> Iterator for Lines<R> {
    type Item = Result<(usize, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line += 1;
                    let line = self.line;
                    match std::str::from_utf8(&self.buf) {
                        Ok(text) if text.trim().is_empty() => continue,
                        Ok(text) => return Some(Ok((line, text.trim().to_string()))),
                        Err(_) => return Some(Err(IngestError::Encoding { line })),
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e.into()));
                }
            }
        }
        None
    }
}
