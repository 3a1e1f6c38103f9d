//! Fan-in of probe results
//!
//! The aggregator owns the countdown of outstanding results. It stops in one
//! of three ways:
//! - the countdown reaches zero (`Completion::Done`)
//! - the scan is cancelled (`Completion::Aborted`)
//! - every sender is gone while results are still owed
//!   (`Completion::Incomplete`), which would otherwise be a silent hang

use super::{Completion, ProbeResult, ScanSummary};
use crate::output::ResultSink;
use crate::ScanError;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

pub struct ResultAggregator<S> {
    remaining: u64,
    results: mpsc::Receiver<ProbeResult>,
    sink: S,
    cancel: CancellationToken,
    summary: ScanSummary,
}

impl<S: ResultSink> ResultAggregator<S> {
    pub fn new(
        expected: u64,
        results: mpsc::Receiver<ProbeResult>,
        sink: S,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            remaining: expected,
            results,
            sink,
            cancel,
            summary: ScanSummary::new(expected),
        }
    }

    /// Results still owed
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Drain results until the countdown hits zero, forwarding each to the
    /// sink, and return the summary together with the sink.
    ///
    /// A sink error cancels the whole scan.
    pub async fn run(mut self) -> crate::Result<(ScanSummary, S)> {
        let start = Instant::now();

        let completion = loop {
            if self.remaining == 0 {
                break Completion::Done;
            }

            let received = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break Completion::Aborted,
                received = self.results.recv() => received,
            };

            let Some(result) = received else {
                log::warn!(
                    "All probes finished with {} of {} results missing",
                    self.remaining,
                    self.summary.expected
                );
                break Completion::Incomplete;
            };

            if let Err(e) = self.sink.emit(&result) {
                self.cancel.cancel();
                return Err(ScanError::Output(format!("failed to write result for {}: {}", result.target, e)));
            }

            self.summary.record(&result);
            self.remaining -= 1;
        };

        self.sink
            .finish()
            .map_err(|e| ScanError::Output(format!("failed to flush output: {}", e)))?;

        self.summary.completion = completion;
        self.summary.duration = start.elapsed();
        log::info!(
            "Aggregation finished: {:?}, {}/{} results",
            completion,
            self.summary.received,
            self.summary.expected
        );

        Ok((self.summary, self.sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProbeError;
    use crate::scanner::Target;
    use std::io;
    use std::time::Duration;

    #[derive(Default)]
    struct Collect(Vec<String>);

    impl ResultSink for Collect {
        fn emit(&mut self, result: &ProbeResult) -> io::Result<()> {
            self.0.push(result.target.to_string());
            Ok(())
        }
    }

    #[derive(Debug)]
    struct Broken;

    impl ResultSink for Broken {
        fn emit(&mut self, _result: &ProbeResult) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    fn result(last: u8) -> ProbeResult {
        ProbeResult::header(Target::new([10, 0, 0, last], 80), "HTTP/1.1 200 OK\r\n\r\n".to_string(), Duration::ZERO)
    }

    #[tokio::test]
    async fn test_stops_at_expected_count() {
        let (tx, rx) = mpsc::channel(8);
        for i in 1..=3 {
            tx.send(result(i)).await.unwrap();
        }
        let aggregator = ResultAggregator::new(2, rx, Collect::default(), CancellationToken::new());
        assert_eq!(aggregator.remaining(), 2);

        let (summary, sink) = aggregator.run().await.unwrap();
        assert_eq!(summary.completion, Completion::Done);
        assert_eq!(summary.received, 2);
        assert_eq!(sink.0, vec!["10.0.0.1:80", "10.0.0.2:80"]);
    }

    #[tokio::test]
    async fn test_zero_expected_is_done_immediately() {
        let (_tx, rx) = mpsc::channel(1);
        let (summary, _) = ResultAggregator::new(0, rx, Collect::default(), CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert!(summary.is_complete());
    }

    #[tokio::test]
    async fn test_closed_channel_is_incomplete() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(result(1)).await.unwrap();
        drop(tx);

        let (summary, _) = ResultAggregator::new(5, rx, Collect::default(), CancellationToken::new())
            .run()
            .await
            .unwrap();
        assert_eq!(summary.completion, Completion::Incomplete);
        assert_eq!(summary.received, 1);
    }

    #[tokio::test]
    async fn test_cancel_aborts() {
        let (_tx, rx) = mpsc::channel(4);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let (summary, _) = ResultAggregator::new(5, rx, Collect::default(), cancel)
            .run()
            .await
            .unwrap();
        assert_eq!(summary.completion, Completion::Aborted);
        assert_eq!(summary.received, 0);
    }

    #[tokio::test]
    async fn test_sink_error_cancels_scan() {
        let (tx, rx) = mpsc::channel(4);
        tx.send(result(1)).await.unwrap();
        let cancel = CancellationToken::new();

        let err = ResultAggregator::new(1, rx, Broken, cancel.clone()).run().await.unwrap_err();
        assert!(matches!(err, ScanError::Output(_)));
        assert!(cancel.is_cancelled());
    }
}
