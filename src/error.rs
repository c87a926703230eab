//! Error types module.
//!
//! This module defines the error types used throughout blockcheck.
//! It uses `thiserror` for structured error handling and provides
//! a custom `Result` type alias for convenience.
//!
//! Probe adapters return these errors; the prober turns them into
//! [`ProbeOutcome::Failed`](crate::probe::ProbeOutcome) entries so that
//! they never escape a single target.

use thiserror::Error;

/// A specialized `Result` type for blockcheck operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for blockcheck.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error (input files, spawning traceroute, writing reports)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error (configuration files, report output)
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// DNS resolver error (DNS query failures)
    #[error("DNS resolver error: {0}")]
    Resolver(#[from] trust_dns_resolver::error::ResolveError),

    /// HTTP client error (connect, TLS, body read)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Network-related error that has no richer source
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration error (invalid config, no alternate resolvers)
    #[error("Config error: {0}")]
    Config(String),

    /// Parse error (invalid input line, malformed tool output)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Operation did not finish within its time limit
    #[error("timed out after {:.1}s", .0.as_secs_f64())]
    Timeout(std::time::Duration),
}

impl Error {
    /// Create a new network error with a message.
    #[must_use]
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new configuration error with a message.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new parse error with a message.
    #[must_use]
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }
}

impl From<color_eyre::Report> for Error {
    fn from(e: color_eyre::Report) -> Self {
        Self::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(
            Error::config("no alternate resolvers").to_string(),
            "Config error: no alternate resolvers"
        );
        assert_eq!(Error::parse("bad").to_string(), "Parse error: bad");
        assert_eq!(
            Error::Timeout(std::time::Duration::from_millis(1500)).to_string(),
            "timed out after 1.5s"
        );
    }
}
