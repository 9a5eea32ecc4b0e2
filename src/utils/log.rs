// src/utils/log.rs

//! Console progress output with server-style formatting.
//!
//! Library code logs through the `log` facade; this module renders the
//! headers, steps and run summaries the CLI prints around a crawl. Everything
//! goes to stderr so stdout stays reserved for JSON output.

use std::sync::OnceLock;

use chrono::Local;

/// Log level enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" | "debug" => LogLevel::Debug,
            "warn" => LogLevel::Warn,
            "error" | "off" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

/// Current log level
static LOG_LEVEL: OnceLock<LogLevel> = OnceLock::new();

/// Set the level below which progress output is suppressed.
pub fn init(level: &str) {
    let _ = LOG_LEVEL.set(LogLevel::parse(level));
}

fn should_log(level: LogLevel) -> bool {
    let current = LOG_LEVEL.get().copied().unwrap_or(LogLevel::Info);
    level >= current
}

/// Format a log message with timestamp and level
fn format_log(level: LogLevel, message: &str) -> String {
    let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S");
    format!("[{}] [{}] {}", timestamp, level.as_str(), message)
}

fn emit(level: LogLevel, message: &str) {
    if should_log(level) {
        eprintln!("{}", format_log(level, message));
    }
}

/// Log a header
pub fn header(title: &str) {
    let border = "═".repeat(60);
    emit(LogLevel::Info, &border);
    emit(LogLevel::Info, &format!("  {title}"));
    emit(LogLevel::Info, &border);
}

/// Log a step in a process
pub fn step(step_num: usize, total: usize, message: &str) {
    emit(LogLevel::Info, &format!("[STEP {step_num}/{total}] {message}"));
}

/// Log a sub-item (indented)
pub fn sub_item(message: &str) {
    emit(LogLevel::Info, &format!("    {message}"));
}

/// Log a warning line
pub fn warn(message: &str) {
    emit(LogLevel::Warn, message);
}

/// Log a summary section
pub fn summary(title: &str, items: &[(&str, String)]) {
    if !should_log(LogLevel::Info) {
        return;
    }
    eprintln!();
    emit(LogLevel::Info, &format!("[SUMMARY] {title}"));
    for (key, value) in items {
        emit(LogLevel::Info, &format!("    {key}: {value}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Info < LogLevel::Warn);
        assert!(LogLevel::Warn < LogLevel::Error);
    }

    #[test]
    fn test_log_level_parse() {
        assert_eq!(LogLevel::parse("debug"), LogLevel::Debug);
        assert_eq!(LogLevel::parse("INFO"), LogLevel::Info);
        assert_eq!(LogLevel::parse("unknown"), LogLevel::Info);
    }

    #[test]
    fn test_format_contains_level() {
        assert!(format_log(LogLevel::Warn, "x").contains("[WARN] x"));
    }
}
