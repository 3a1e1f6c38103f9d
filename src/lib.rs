//! httpscan - scan IPv4 ranges for HTTP services and capture their headers
//!
//! A range such as `192.168.1.0/24` or `10 0 0-3 *` is expanded into targets,
//! each target gets one `HEAD` request under a fixed concurrency limit, and
//! whatever header text comes back is reported.

pub mod config;
pub mod error;
pub mod network;
pub mod output;
pub mod scanner;
pub mod utils;

// Re-export commonly used types
pub use config::ScanConfig;
pub use error::{ProbeError, ScanError};
pub use network::{HttpProber, Prober};
pub use output::{OutputFormat, OutputWriter, ResultSink};
pub use scanner::{Completion, ProbeResult, ScanEngine, ScanSpec, ScanSummary, Target};

pub type Result<T> = std::result::Result<T, ScanError>;
