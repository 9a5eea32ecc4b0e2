// src/error.rs

//! Unified error handling for the extraction engine.
//!
//! Only [`AppError::Config`] makes an adapter unusable. Every crawl-time
//! error is scoped to the single stage invocation that raised it.

use std::fmt;

use thiserror::Error;

/// Result type alias for engine operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Category of a failed fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// The request deadline expired
    Timeout,
    /// Connection refused, reset or otherwise broken
    Connect,
    /// The server answered with a non-success status
    Status(u16),
    /// Anything else (bad URL, body read failure, ...)
    Other,
}

impl FetchKind {
    /// Whether a retry can be expected to change the outcome.
    pub fn is_transient(self) -> bool {
        match self {
            FetchKind::Timeout | FetchKind::Connect => true,
            FetchKind::Status(code) => code >= 500 || code == 429,
            FetchKind::Other => false,
        }
    }
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchKind::Timeout => f.write_str("timeout"),
            FetchKind::Connect => f.write_str("connection"),
            FetchKind::Status(code) => write!(f, "status {code}"),
            FetchKind::Other => f.write_str("request"),
        }
    }
}

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// Invalid adapter definition or application configuration
    #[error("Configuration error in '{field}': {message}")]
    Config { field: String, message: String },

    /// No adapter registered under the requested site identifier
    #[error("Adapter not found: {0}")]
    NotFound(String),

    /// A required node was absent from a fetched document
    #[error("Selector '{selector}' failed: {message}")]
    Selector { selector: String, message: String },

    /// Network, deadline or status failure
    #[error("Fetch failed for {url} ({kind}): {message}")]
    Fetch {
        url: String,
        kind: FetchKind,
        message: String,
    },

    /// The fetched body could not be decoded
    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    /// The adapter does not declare the requested stage
    #[error("Site '{site}' does not support the {stage} stage")]
    Unsupported { site: String, stage: &'static str },

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// HTTP client construction failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl AppError {
    /// Create a configuration error for the named field.
    pub fn config(field: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Config {
            field: field.into(),
            message: message.to_string(),
        }
    }

    /// Create a selector error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(url: impl Into<String>, kind: FetchKind, message: impl fmt::Display) -> Self {
        Self::Fetch {
            url: url.into(),
            kind,
            message: message.to_string(),
        }
    }

    /// Create a parse error.
    pub fn parse(url: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Parse {
            url: url.into(),
            message: message.to_string(),
        }
    }

    /// Whether the retry loop should try again.
    ///
    /// Parse and selector failures are deterministic for a given body.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Fetch { kind, .. } => kind.is_transient(),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_kinds() {
        assert!(FetchKind::Timeout.is_transient());
        assert!(FetchKind::Connect.is_transient());
        assert!(FetchKind::Status(503).is_transient());
        assert!(FetchKind::Status(429).is_transient());
        assert!(!FetchKind::Status(404).is_transient());
        assert!(!FetchKind::Other.is_transient());
    }

    #[test]
    fn test_parse_and_selector_never_transient() {
        assert!(!AppError::parse("u", "bad json").is_transient());
        assert!(!AppError::selector("//body", "missing").is_transient());
        assert!(AppError::fetch("u", FetchKind::Timeout, "deadline").is_transient());
    }

    #[test]
    fn test_config_error_names_field() {
        let err = AppError::config("homeVodIdR", "no capture group");
        assert!(err.to_string().contains("homeVodIdR"));
    }
}
