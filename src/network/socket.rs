//! HTTP banner grabbing over plain TCP

use super::Prober;
use crate::config::ScanConfig;
use crate::error::ProbeError;
use crate::scanner::{ProbeResult, Target};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::{timeout, timeout_at, Instant};

const REQUEST_BEGIN: &[u8] = b"HEAD / HTTP/1.1\r\nHost:";
const REQUEST_END: &[u8] = b"\r\n\r\n";

/// Sends a minimal `HEAD` request and captures the response header.
///
/// This is a raw banner capture, not an HTTP client. The status line is not
/// checked and no body is ever read.
#[derive(Debug, Clone)]
pub struct HttpProber {
    timeout: Duration,
    max_header_bytes: usize,
}

impl HttpProber {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            max_header_bytes: ScanConfig::default().max_header_bytes,
        }
    }

    pub fn from_config(config: &ScanConfig) -> Self {
        Self {
            timeout: config.timeout_duration(),
            max_header_bytes: config.max_header_bytes,
        }
    }

    pub fn with_max_header_bytes(mut self, max_header_bytes: usize) -> Self {
        self.max_header_bytes = max_header_bytes;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Request bytes sent to `target`
    pub fn request_for(target: &Target) -> Vec<u8> {
        let host = target.to_string();
        let mut request = Vec::with_capacity(REQUEST_BEGIN.len() + host.len() + REQUEST_END.len());
        request.extend_from_slice(REQUEST_BEGIN);
        request.extend_from_slice(host.as_bytes());
        request.extend_from_slice(REQUEST_END);
        request
    }

    /// Connect, send the request and read header lines until the blank line.
    pub async fn grab(&self, target: Target) -> ProbeResult {
        let start = Instant::now();
        let addr = target.socket_addr();

        let mut stream = match timeout(self.timeout, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(source)) => {
                log::debug!("{}: connect failed: {}", target, source);
                return ProbeResult::failed(
                    target,
                    ProbeError::Connect { target: addr, source },
                    start.elapsed(),
                );
            }
            Err(_) => {
                log::debug!("{}: connect timed out", target);
                return ProbeResult::failed(
                    target,
                    ProbeError::ConnectTimeout {
                        target: addr,
                        timeout_ms: self.timeout.as_millis(),
                    },
                    start.elapsed(),
                );
            }
        };

        // One deadline covers the write and every line read.
        let deadline = Instant::now() + self.timeout;

        match timeout_at(deadline, stream.write_all(&Self::request_for(&target))).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => log::debug!("{}: request write failed: {}", target, e),
            Err(_) => log::debug!("{}: request write timed out", target),
        }

        let outcome = self.read_header(&mut stream, deadline, target).await;
        drop(stream);

        match outcome {
            Ok(header) => {
                log::debug!("{}: captured {} header bytes", target, header.len());
                ProbeResult::header(target, header, start.elapsed())
            }
            Err(e) => {
                log::debug!("{}", e);
                ProbeResult::failed(target, e, start.elapsed())
            }
        }
    }

    async fn read_header(
        &self,
        stream: &mut TcpStream,
        deadline: Instant,
        target: Target,
    ) -> Result<String, ProbeError> {
        let mut reader = BufReader::new(stream.take(self.max_header_bytes as u64));
        let mut header = String::new();
        let mut line = Vec::new();
        let mut lines_read = 0usize;

        loop {
            line.clear();
            // Timeouts, resets and EOF all count as "nothing more to read".
            let n = match timeout_at(deadline, reader.read_until(b'\n', &mut line)).await {
                Ok(Ok(n)) => n,
                Ok(Err(e)) => {
                    log::debug!("{}: read failed: {}", target, e);
                    0
                }
                Err(_) => 0,
            };

            if n == 0 {
                if lines_read == 0 {
                    return Err(ProbeError::ReadTimeout {
                        target: target.socket_addr(),
                    });
                }
                if !line.is_empty() {
                    header.push_str(&String::from_utf8_lossy(&line));
                }
                break;
            }

            let text = String::from_utf8_lossy(&line);
            header.push_str(&text);
            lines_read += 1;

            if text.trim().is_empty() {
                break;
            }
        }

        Ok(header)
    }
}

#[async_trait]
impl Prober for HttpProber {
    async fn probe(&self, target: Target) -> ProbeResult {
        self.grab(target).await
    }

    fn name(&self) -> &str {
        "http-head"
    }
}
