//! Leveled log fan-out.
//!
//! The engine reports what it is doing through a `Logger`, which filters by
//! level and forwards plain text lines to registered `LogSink`
//! implementations. This keeps the engine decoupled from any specific
//! output technology; the CLI registers console and HTML file sinks, and
//! tests register an in-memory collector.
//!
//! Levels, lowest to highest:
//! - Trace: one line per source entry found, for debugging
//! - Detail: one line per copy, delete, or directory creation
//! - Info: task banners and run summaries
//! - Warn: missing folders, permission and I/O failures

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity of a log line. A `Logger` set to some level passes that level
/// and everything above it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Detail,
    Info,
    Warn,
}

impl LogLevel {
    /// Fixed-width tag used as a line prefix by text sinks.
    pub fn tag(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRCE",
            LogLevel::Detail => "DETL",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Receives log lines from the engine.
///
/// Implementations must be callable from the background worker thread.
pub trait LogSink: Send + Sync {
    /// Called for every line that passes the logger's level filter.
    fn write_line(&self, level: LogLevel, line: &str);

    /// Called once at the very end of a session so file sinks can write a
    /// closing line and any footer. The default does nothing.
    fn finish(&self, line: &str) {
        let _ = line;
    }
}

/// Level filter plus sink fan-out.
pub struct Logger {
    level: LogLevel,
    sinks: Vec<Box<dyn LogSink>>,
}

impl Logger {
    /// Create a logger passing `level` and above. No sinks are registered
    /// yet; a logger without sinks swallows everything.
    pub fn new(level: LogLevel) -> Self {
        Logger {
            level,
            sinks: Vec::new(),
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn LogSink>) {
        self.sinks.push(sink);
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    pub fn trace(&self, message: &str) {
        self.write(LogLevel::Trace, message);
    }

    pub fn detail(&self, message: &str) {
        self.write(LogLevel::Detail, message);
    }

    pub fn info(&self, message: &str) {
        self.write(LogLevel::Info, message);
    }

    pub fn warn(&self, message: &str) {
        self.write(LogLevel::Warn, message);
    }

    /// Forward a closing line to every sink, level filter not applied.
    pub fn finish(&self, message: &str) {
        for sink in &self.sinks {
            sink.finish(message);
        }
    }

    fn write(&self, level: LogLevel, message: &str) {
        if level >= self.level {
            for sink in &self.sinks {
                sink.write_line(level, message);
            }
        }
    }
}
