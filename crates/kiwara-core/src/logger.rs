//! Logger capability consumed by the resolver, attachments and checks.
//!
//! The core never writes anywhere itself. The CLI plugs in a sink (see
//! `kiwara-cli`'s `TracingLogger`); tests use [`MemoryLogger`].

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Verbosity threshold, ordered from silent to chatty.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    None,
    Error,
    Warn,
    Info,
    #[default]
    Log,
}

impl LogLevel {
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "none" | "off" => Some(Self::None),
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "log" | "all" => Some(Self::Log),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Log => "log",
        }
    }
}

/// Sink for human-oriented progress and diagnostic messages.
pub trait Logger: Send + Sync {
    fn log(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Shared logger handle passed through a run.
pub type SharedLogger = Arc<dyn Logger>;

/// Drops messages above a configured level before they reach the sink.
pub struct LevelFilter<L> {
    inner: L,
    level: LogLevel,
}

impl<L: Logger> LevelFilter<L> {
    pub fn new(inner: L, level: LogLevel) -> Self {
        Self { inner, level }
    }

    #[must_use]
    pub fn level(&self) -> LogLevel {
        self.level
    }

    fn enabled(&self, level: LogLevel) -> bool {
        level <= self.level
    }
}

impl<L: Logger> Logger for LevelFilter<L> {
    fn log(&self, message: &str) {
        if self.enabled(LogLevel::Log) {
            self.inner.log(message);
        }
    }

    fn info(&self, message: &str) {
        if self.enabled(LogLevel::Info) {
            self.inner.info(message);
        }
    }

    fn warn(&self, message: &str) {
        if self.enabled(LogLevel::Warn) {
            self.inner.warn(message);
        }
    }

    fn error(&self, message: &str) {
        if self.enabled(LogLevel::Error) {
            self.inner.error(message);
        }
    }
}

impl<L: Logger + ?Sized> Logger for Arc<L> {
    fn log(&self, message: &str) {
        (**self).log(message);
    }

    fn info(&self, message: &str) {
        (**self).info(message);
    }

    fn warn(&self, message: &str) {
        (**self).warn(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn log(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Records every message with its level.
#[derive(Debug, Default)]
pub struct MemoryLogger {
    lines: Mutex<Vec<(LogLevel, String)>>,
}

impl MemoryLogger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything logged so far.
    #[must_use]
    pub fn lines(&self) -> Vec<(LogLevel, String)> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Messages logged at exactly `level`.
    #[must_use]
    pub fn messages(&self, level: LogLevel) -> Vec<String> {
        self.lines()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: LogLevel, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push((level, message.to_string()));
        }
    }
}

impl Logger for MemoryLogger {
    fn log(&self, message: &str) {
        self.push(LogLevel::Log, message);
    }

    fn info(&self, message: &str) {
        self.push(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.push(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(LogLevel::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_are_ordered() {
        assert!(LogLevel::None < LogLevel::Error);
        assert!(LogLevel::Error < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Log);
    }

    #[test]
    fn test_filter_drops_chattier_messages() {
        let sink = Arc::new(MemoryLogger::new());
        let logger = LevelFilter::new(Arc::clone(&sink), LogLevel::Warn);

        logger.log("progress");
        logger.info("detail");
        logger.warn("careful");
        logger.error("broken");

        let lines = sink.lines();
        assert_eq!(
            lines,
            vec![
                (LogLevel::Warn, "careful".to_string()),
                (LogLevel::Error, "broken".to_string())
            ]
        );
    }

    #[test]
    fn test_filter_none_is_silent() {
        let sink = Arc::new(MemoryLogger::new());
        let logger = LevelFilter::new(Arc::clone(&sink), LogLevel::None);
        logger.error("broken");
        assert!(sink.lines().is_empty());
    }

    #[test]
    fn test_parse_level() {
        assert_eq!(LogLevel::parse("WARNING"), Some(LogLevel::Warn));
        assert_eq!(LogLevel::parse("off"), Some(LogLevel::None));
        assert_eq!(LogLevel::parse("loud"), None);
        assert_eq!(LogLevel::Info.as_str(), "info");
    }
}
