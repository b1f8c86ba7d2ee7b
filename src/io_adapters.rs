use std::cell::RefCell;
use std::io::{BufRead, Cursor, Read, Result as IoResult, Write};
use std::rc::Rc;

/// Memory-backed script source.
///
/// Holds raw bytes, so a script may contain lines that are not UTF-8.
#[derive(Debug, Default)]
pub struct MemReader {
    cursor: Cursor<Vec<u8>>,
}

impl MemReader {
    pub fn new(script: impl Into<Vec<u8>>) -> Self {
        Self {
            cursor: Cursor::new(script.into()),
        }
    }
}

impl Read for MemReader {
    fn read(&mut self, out: &mut [u8]) -> IoResult<usize> {
        self.cursor.read(out)
    }
}

impl BufRead for MemReader {
    fn fill_buf(&mut self) -> IoResult<&[u8]> {
        self.cursor.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.cursor.consume(amt)
    }
}

/// Memory-backed writer for capturing what the interpreter reports.
///
/// Hand one to [`crate::Interpreter::with_error_sink`] and keep the handle
/// returned by [`MemWriter::with_handle`] to read the bytes afterwards.
#[derive(Debug, Default)]
pub struct MemWriter {
    buf: Rc<RefCell<Vec<u8>>>,
}

impl MemWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared buffer holding every error report written so far.
    pub fn into_inner(self) -> Rc<RefCell<Vec<u8>>> {
        self.buf
    }

    /// A fresh sink plus a handle that stays readable once the sink has been
    /// moved into an interpreter.
    pub fn with_handle() -> (Self, Rc<RefCell<Vec<u8>>>) {
        let sink = MemWriter::new();
        let reports = Rc::clone(&sink.buf);
        (sink, reports)
    }
}

impl Write for MemWriter {
    fn write(&mut self, data: &[u8]) -> IoResult<usize> {
        self.buf.borrow_mut().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> IoResult<()> {
        Ok(())
    }
}
