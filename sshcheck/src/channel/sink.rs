//! Destinations for drained pty output.

use std::io::{self, Write};
use std::sync::{Arc, Mutex, MutexGuard};

use log::debug;

/// Forwards drained output to the log, one record per line.
///
/// Carriage returns (progress meters redraw with `\r`) are trimmed. An
/// unterminated last line is emitted on flush or drop.
#[derive(Debug)]
pub struct LogSink {
    label: String,
    pending: Vec<u8>,
}

impl LogSink {
    /// Create a sink whose records are prefixed with `label`.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            pending: Vec::new(),
        }
    }

    fn emit(&self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let line = line.trim_end_matches('\r');
        if !line.is_empty() {
            debug!(target: "sshcheck::output", "[{}] {}", self.label, line);
        }
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        let mut start = 0;
        while let Some(pos) = memchr::memchr(b'\n', &self.pending[start..]) {
            self.emit(&self.pending[start..start + pos]);
            start += pos + 1;
        }
        self.pending.drain(..start);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest);
        }
        Ok(())
    }
}

impl Drop for LogSink {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

/// Cloneable in-memory sink; every clone appends to the same buffer.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything written so far.
    pub fn contents(&self) -> Vec<u8> {
        self.lock().clone()
    }

    /// Number of bytes written so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing was written.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<u8>> {
        // A panicking writer cannot leave a Vec<u8> half-updated.
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
