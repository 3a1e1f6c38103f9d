//! Network module: the probe abstraction and its TCP implementation

pub mod socket;

use crate::scanner::{ProbeResult, Target};
use async_trait::async_trait;

pub use socket::HttpProber;

/// Probes one target and reports what happened.
///
/// Implementations must never fail past their own boundary: every error is
/// turned into a [`ProbeResult`], so each call yields exactly one result.
#[async_trait]
pub trait Prober: Send + Sync {
    async fn probe(&self, target: Target) -> ProbeResult;

    /// Get prober name
    fn name(&self) -> &str;
}
