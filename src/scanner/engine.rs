//! Main scanning engine implementation

use super::aggregator::ResultAggregator;
use super::{ProbeResult, ScanSpec, ScanSummary};
use crate::config::ScanConfig;
use crate::network::{HttpProber, Prober};
use crate::output::ResultSink;
use crate::ScanError;
use std::sync::Arc;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

/// Runs one scan: dispatches a probe per target under the concurrency limit
/// and aggregates the results.
pub struct ScanEngine {
    spec: Arc<ScanSpec>,
    prober: Arc<dyn Prober>,
    cancel: CancellationToken,
}

impl ScanEngine {
    /// Create an engine probing with [`HttpProber`] configured from `config`
    pub fn new(spec: ScanSpec, config: &ScanConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::with_prober(spec, Arc::new(HttpProber::from_config(config))))
    }

    /// Create an engine with a custom prober
    pub fn with_prober(spec: ScanSpec, prober: Arc<dyn Prober>) -> Self {
        Self {
            spec: Arc::new(spec),
            prober,
            cancel: CancellationToken::new(),
        }
    }

    /// Token that aborts the engine's scans when cancelled.
    ///
    /// Cancelling stops admission of new targets and ends aggregation early.
    /// Probes already in flight run to their own timeout. Each run works on
    /// a child of this token, so a run that ends early on its own leaves it
    /// untouched.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Perform the scan, writing every result to `sink`.
    ///
    /// Returns once the aggregator has stopped, with the sink handed back.
    pub async fn run<S>(&self, sink: S) -> crate::Result<(ScanSummary, S)>
    where
        S: ResultSink + 'static,
    {
        let concurrency = self.spec.concurrency();
        let expected = self.spec.expected_count();

        log::info!(
            "Scanning {} on {} port(s): {} probes, {} concurrent, prober {}",
            self.spec.range(),
            self.spec.ports().len(),
            expected,
            concurrency,
            self.prober.name()
        );

        let cancel = self.cancel.child_token();
        let (result_tx, result_rx) = mpsc::channel::<ProbeResult>(concurrency);

        let aggregator = ResultAggregator::new(expected, result_rx, sink, cancel.clone());
        let aggregator_handle = tokio::spawn(aggregator.run());

        let dispatch_handle = tokio::spawn(dispatch(
            self.spec.clone(),
            self.prober.clone(),
            result_tx,
            cancel.clone(),
        ));

        let aggregated = aggregator_handle
            .await
            .map_err(|e| ScanError::TaskFailed(format!("aggregator: {}", e)));

        // The dispatcher only outlives the aggregator if the scan ended early.
        if !dispatch_handle.is_finished() {
            cancel.cancel();
        }
        match dispatch_handle.await {
            Ok(dispatched) => log::debug!("Dispatcher admitted {} targets", dispatched),
            Err(e) => log::error!("Dispatcher task failed: {}", e),
        }

        aggregated?
    }
}

/// Admit every target in enumeration order, one semaphore permit each.
///
/// Blocks when all permits are out; a permit is returned when its probe task
/// finishes. Returns how many targets were admitted.
async fn dispatch(
    spec: Arc<ScanSpec>,
    prober: Arc<dyn Prober>,
    results: mpsc::Sender<ProbeResult>,
    cancel: CancellationToken,
) -> u64 {
    let semaphore = Arc::new(Semaphore::new(spec.concurrency()));
    let mut dispatched = 0u64;

    for target in spec.targets() {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = semaphore.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let prober = prober.clone();
        let results = results.clone();

        tokio::spawn(async move {
            let _permit = permit; // Released when the probe task ends
            let result = prober.probe(target).await;
            if results.send(result).await.is_err() {
                log::debug!("{}: result dropped, aggregation already stopped", target);
            }
        });

        dispatched += 1;
    }

    if dispatched < spec.expected_count() {
        log::info!("Dispatch stopped after {} of {} targets", dispatched, spec.expected_count());
    }

    dispatched
}
