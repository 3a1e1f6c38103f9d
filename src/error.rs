//! Error handling for the httpscan scanner
//!
//! Two layers of errors exist. [`ScanError`] covers everything that stops a
//! scan (bad range input, bad configuration, a broken output sink).
//! [`ProbeError`] describes why a single target produced no header; it is
//! carried as data inside a probe result and never aborts the scan.

use std::fmt;
use std::io;
use std::net::SocketAddrV4;
use thiserror::Error;

/// Main error type for scanning operations
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Not enough arguments: {0}")]
    NotEnoughArguments(String),

    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Invalid mask: {0}")]
    InvalidMask(String),

    #[error("Invalid octet: {0}")]
    InvalidOctet(String),

    #[error("Invalid port: {0}")]
    InvalidPort(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Output error: {0}")]
    Output(String),

    #[error("Task failed: {0}")]
    TaskFailed(String),
}

impl ScanError {
    /// Whether the error was caused by malformed range or port input.
    ///
    /// These are the errors the command line answers with usage text.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ScanError::NotEnoughArguments(_)
                | ScanError::InvalidRange(_)
                | ScanError::InvalidMask(_)
                | ScanError::InvalidOctet(_)
                | ScanError::InvalidPort(_)
        )
    }
}

/// Reason a single probe did not yield a header
#[derive(Debug, Error)]
pub enum ProbeError {
    /// The TCP connection could not be established
    #[error("{target}: {source}")]
    Connect {
        target: SocketAddrV4,
        #[source]
        source: io::Error,
    },

    /// The TCP connection attempt did not finish in time
    #[error("{target}: connect timeout after {timeout_ms}ms")]
    ConnectTimeout { target: SocketAddrV4, timeout_ms: u128 },

    /// Connected, but no header line arrived before the deadline
    #[error("read timeout for {target}")]
    ReadTimeout { target: SocketAddrV4 },
}

impl ProbeError {
    pub fn kind(&self) -> ProbeErrorKind {
        match self {
            ProbeError::Connect { .. } => ProbeErrorKind::Connect,
            ProbeError::ConnectTimeout { .. } => ProbeErrorKind::ConnectTimeout,
            ProbeError::ReadTimeout { .. } => ProbeErrorKind::ReadTimeout,
        }
    }
}

/// Coarse classification of [`ProbeError`], used by the output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeErrorKind {
    Connect,
    ConnectTimeout,
    ReadTimeout,
}

impl ProbeErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProbeErrorKind::Connect => "connect_error",
            ProbeErrorKind::ConnectTimeout => "connect_timeout",
            ProbeErrorKind::ReadTimeout => "read_timeout",
        }
    }
}

impl fmt::Display for ProbeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
