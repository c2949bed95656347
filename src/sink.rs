//! Serialized output and error sinks.
//!
//! Report tasks run in parallel but their output must not interleave, so a
//! sink takes whole assembled blocks and guards its writer internally. The
//! pipeline receives one sink for records and one for failures; nothing in
//! this crate writes to a global stream.

use parking_lot::Mutex;
use std::io::Write;

/// Destination for assembled text blocks.
///
/// `emit` must be atomic with respect to concurrent callers: two blocks
/// emitted from different tasks never interleave line-by-line.
pub trait Sink: Send + Sync {
    /// Writes one complete block (a record or an error line).
    fn emit(&self, message: &str);
}

/// Sink over any writer, serialized by an internal mutex.
pub struct WriterSink<W: Write + Send> {
    writer: Mutex<W>,
}

impl<W: Write + Send> WriterSink<W> {
    /// Wraps `writer` as a serialized sink.
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl<W: Write + Send> Sink for WriterSink<W> {
    fn emit(&self, message: &str) {
        let mut writer = self.writer.lock();
        // A sink write failure has nowhere left to be reported.
        let _ = writeln!(writer, "{}", message);
        let _ = writer.flush();
    }
}

/// In-memory sink collecting emitted blocks, for tests and embedders.
#[derive(Default)]
pub struct MemorySink {
    messages: Mutex<Vec<String>>,
}

impl MemorySink {
    /// Creates an empty collecting sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Sink for MemorySink {
    fn emit(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}
