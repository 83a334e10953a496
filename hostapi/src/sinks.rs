//! Log sink implementations.

use std::sync::{Arc, Mutex};

use crate::traits::LogSink;
use crate::types::{LogLevel, LogRecord};

/// Default sink: forwards guest output to `tracing` under the `guest` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&mut self, text: &str) {
        tracing::info!(target: "guest", "{}", text.trim_end_matches('\n'));
    }

    fn fail(&mut self, text: &str) {
        tracing::error!(target: "guest", fatal = true, "{}", text.trim_end_matches('\n'));
    }
}

/// In-memory sink that captures every record. Clones share the buffer.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// All captured records in arrival order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lock().clone()
    }

    /// Messages of all captured records, regardless of level.
    pub fn messages(&self) -> Vec<String> {
        self.lock().iter().map(|r| r.message.clone()).collect()
    }

    /// Messages captured through the fatal path.
    pub fn fatal_messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|r| r.level == LogLevel::Fatal)
            .map(|r| r.message.clone())
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<LogRecord>> {
        // A panicking writer cannot leave a Vec<LogRecord> half-updated.
        self.records.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn push(&self, level: LogLevel, text: &str) {
        self.lock().push(LogRecord {
            level,
            message: text.to_string(),
        });
    }
}

impl LogSink for MemorySink {
    fn write(&mut self, text: &str) {
        self.push(LogLevel::Info, text);
    }

    fn fail(&mut self, text: &str) {
        self.push(LogLevel::Fatal, text);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_sink_captures_levels() {
        let sink = MemorySink::new();
        let mut writer = sink.clone();
        writer.write("frame 1");
        writer.fail("assertion failed");

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].level, LogLevel::Info);
        assert_eq!(records[1].level, LogLevel::Fatal);
        assert_eq!(sink.fatal_messages(), vec!["assertion failed".to_string()]);
    }

    #[test]
    fn test_tracing_sink_accepts_any_text() {
        let mut sink = TracingSink;
        sink.write("plain\n");
        sink.fail("\u{FFFD} replaced");
    }
}
