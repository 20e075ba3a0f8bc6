//! Tracing output capture for the TUI.
//!
//! While the alternate screen is active, the fmt layer writes here instead of
//! stderr. Lines land in a bounded queue that the debug pane drains.

use std::collections::VecDeque;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tracing_subscriber::fmt::MakeWriter;

/// Lines kept between drains; older lines are dropped first.
const CAPACITY: usize = 500;

/// Shared, bounded queue of captured log lines.
#[derive(Clone, Default)]
pub struct LogBuffer {
    lines: Arc<Mutex<VecDeque<String>>>,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, line: String) {
        // A panic elsewhere must not take logging down with it.
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        while lines.len() >= CAPACITY {
            lines.pop_front();
        }
        lines.push_back(line);
    }

    /// Take everything captured so far, oldest first.
    pub fn drain(&self) -> Vec<String> {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.drain(..).collect()
    }
}

/// Per-event writer; splits what it receives into lines.
pub struct LineWriter {
    target: LogBuffer,
    partial: Vec<u8>,
}

impl LineWriter {
    fn emit(&mut self, bytes: &[u8]) {
        let text = String::from_utf8_lossy(bytes);
        let text = text.trim_end_matches(['\r', '\n']);
        self.target.push(text.to_string());
    }
}

impl Write for LineWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.partial.extend_from_slice(buf);
        while let Some(end) = self.partial.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.partial.drain(..=end).collect();
            self.emit(&line);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        if !self.partial.is_empty() {
            let rest = std::mem::take(&mut self.partial);
            self.emit(&rest);
        }
        Ok(())
    }
}

impl Drop for LineWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

impl<'a> MakeWriter<'a> for LogBuffer {
    type Writer = LineWriter;

    fn make_writer(&'a self) -> Self::Writer {
        LineWriter {
            target: self.clone(),
            partial: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties() {
        let buf = LogBuffer::new();
        buf.push("sync ok".to_string());
        buf.push("mark-read ok".to_string());
        assert_eq!(buf.drain(), vec!["sync ok", "mark-read ok"]);
        assert!(buf.drain().is_empty());
    }

    #[test]
    fn test_oldest_lines_dropped_at_capacity() {
        let buf = LogBuffer::new();
        for i in 0..CAPACITY + 20 {
            buf.push(format!("line {}", i));
        }
        let lines = buf.drain();
        assert_eq!(lines.len(), CAPACITY);
        assert_eq!(lines[0], "line 20");
    }

    #[test]
    fn test_writer_splits_lines_and_flushes_tail_on_drop() {
        let buf = LogBuffer::new();
        {
            let mut w = buf.make_writer();
            write!(w, "first\r\nsec").unwrap();
            write!(w, "ond\nthird").unwrap();
            assert_eq!(buf.drain(), vec!["first", "second"]);
        }
        assert_eq!(buf.drain(), vec!["third"]);
    }
}
