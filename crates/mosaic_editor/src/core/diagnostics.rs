//! Developer-visible diagnostics log.
//!
//! Non-fatal problems (selector misuse, loader misses, unknown command types)
//! are collected here and mirrored to the `log` facade.

use std::collections::VecDeque;
use std::time::Instant;

/// Severity of a diagnostic entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Debug,
}

impl LogLevel {
    pub fn prefix(&self) -> &'static str {
        match self {
            LogLevel::Info => "[INFO]",
            LogLevel::Warning => "[WARN]",
            LogLevel::Error => "[ERROR]",
            LogLevel::Debug => "[DEBUG]",
        }
    }

    fn as_log_level(&self) -> log::Level {
        match self {
            LogLevel::Info => log::Level::Info,
            LogLevel::Warning => log::Level::Warn,
            LogLevel::Error => log::Level::Error,
            LogLevel::Debug => log::Level::Debug,
        }
    }
}

/// A single diagnostic entry.
#[derive(Clone, Debug)]
pub struct DiagnosticEntry {
    pub level: LogLevel,
    /// Stable machine-readable key, e.g. `selector-object-not-found`
    pub key: String,
    pub message: String,
    pub timestamp: Instant,
    pub count: u32, // For collapsed duplicate messages
}

impl DiagnosticEntry {
    pub fn new(level: LogLevel, key: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            key: key.into(),
            message: message.into(),
            timestamp: Instant::now(),
            count: 1,
        }
    }
}

/// Bounded diagnostics ring.
#[derive(Debug)]
pub struct Diagnostics {
    entries: VecDeque<DiagnosticEntry>,
    max_entries: usize,
    pub collapse_duplicates: bool,
}

impl Default for Diagnostics {
    fn default() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }
}

impl Diagnostics {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            collapse_duplicates: true,
        }
    }

    /// Record an entry and forward it to the logger.
    pub fn report(&mut self, level: LogLevel, key: impl Into<String>, message: impl Into<String>) {
        let key = key.into();
        let message = message.into();
        log::log!(level.as_log_level(), "{}: {}", key, message);

        if self.collapse_duplicates {
            if let Some(last) = self.entries.back_mut() {
                if last.level == level && last.key == key && last.message == message {
                    last.count += 1;
                    last.timestamp = Instant::now();
                    return;
                }
            }
        }

        self.entries.push_back(DiagnosticEntry::new(level, key, message));

        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn info(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.report(LogLevel::Info, key, message);
    }

    pub fn warn(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.report(LogLevel::Warning, key, message);
    }

    pub fn error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.report(LogLevel::Error, key, message);
    }

    pub fn debug(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.report(LogLevel::Debug, key, message);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn entries(&self) -> &VecDeque<DiagnosticEntry> {
        &self.entries
    }

    pub fn last(&self) -> Option<&DiagnosticEntry> {
        self.entries.back()
    }

    /// Whether any retained entry carries the given key.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|e| e.key == key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Count entries by level: (info, warn, error, debug).
    pub fn count_by_level(&self) -> (usize, usize, usize, usize) {
        let mut info = 0;
        let mut warn = 0;
        let mut error = 0;
        let mut debug = 0;

        for entry in &self.entries {
            match entry.level {
                LogLevel::Info => info += entry.count as usize,
                LogLevel::Warning => warn += entry.count as usize,
                LogLevel::Error => error += entry.count as usize,
                LogLevel::Debug => debug += entry.count as usize,
            }
        }

        (info, warn, error, debug)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_collapse() {
        let mut diagnostics = Diagnostics::new();
        diagnostics.error("selector-object-not-found", "node 1");
        diagnostics.error("selector-object-not-found", "node 1");
        diagnostics.warn("selector-object-not-found", "node 1");

        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics.entries()[0].count, 2);
        assert_eq!(diagnostics.count_by_level(), (0, 1, 2, 0));
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut diagnostics = Diagnostics::with_capacity(2);
        diagnostics.info("a", "first");
        diagnostics.info("b", "second");
        diagnostics.info("c", "third");

        assert_eq!(diagnostics.len(), 2);
        assert!(!diagnostics.contains_key("a"));
        assert_eq!(diagnostics.last().map(|e| e.key.as_str()), Some("c"));
    }
}
