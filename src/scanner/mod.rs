//! Scanner module containing the scan engine and its data model

pub mod aggregator;
pub mod engine;
pub mod range;
pub mod scan_spec;

use crate::error::ProbeError;
use std::fmt;
use std::time::Duration;

pub use aggregator::ResultAggregator;
pub use engine::ScanEngine;
pub use range::{AddressRange, OctetRange, Target, TargetIter};
pub use scan_spec::{ScanSpec, ScanSpecBuilder, DEFAULT_PORT};

/// What a single probe produced
#[derive(Debug)]
pub enum ProbeOutcome {
    /// Raw header lines as received, terminating blank line included
    Header(String),
    Failed(ProbeError),
}

/// Result of probing one target. Exactly one is produced per target.
#[derive(Debug)]
pub struct ProbeResult {
    pub target: Target,
    pub outcome: ProbeOutcome,
    /// Time from connect start until the result was ready
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn header(target: Target, header: String, elapsed: Duration) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Header(header),
            elapsed,
        }
    }

    pub fn failed(target: Target, error: ProbeError, elapsed: Duration) -> Self {
        Self {
            target,
            outcome: ProbeOutcome::Failed(error),
            elapsed,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, ProbeOutcome::Header(_))
    }

    pub fn header_text(&self) -> Option<&str> {
        match &self.outcome {
            ProbeOutcome::Header(header) => Some(header),
            ProbeOutcome::Failed(_) => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.outcome {
            ProbeOutcome::Header(_) => None,
            ProbeOutcome::Failed(e) => Some(e),
        }
    }
}

/// Renders the plain result line: the target followed by its header on
/// success, or the error text on failure.
impl fmt::Display for ProbeResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.outcome {
            ProbeOutcome::Header(header) => write!(f, "{}\n{}", self.target, header),
            ProbeOutcome::Failed(e) => write!(f, "{}", e),
        }
    }
}

/// How a scan ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Every expected result was received
    Done,
    /// The scan was cancelled before all results arrived
    Aborted,
    /// All producers finished but fewer results than expected arrived
    Incomplete,
}

/// Totals reported once the aggregator stops
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanSummary {
    pub completion: Completion,
    pub expected: u64,
    pub received: u64,
    pub successes: u64,
    pub failures: u64,
    pub duration: Duration,
}

impl ScanSummary {
    pub fn new(expected: u64) -> Self {
        Self {
            completion: Completion::Incomplete,
            expected,
            received: 0,
            successes: 0,
            failures: 0,
            duration: Duration::from_secs(0),
        }
    }

    /// Record one received result
    pub fn record(&mut self, result: &ProbeResult) {
        self.received += 1;
        if result.is_success() {
            self.successes += 1;
        } else {
            self.failures += 1;
        }
    }

    pub fn is_complete(&self) -> bool {
        self.completion == Completion::Done
    }

    /// Get scan rate in results per second
    pub fn scan_rate(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }
}
