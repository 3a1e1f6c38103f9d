//! Output formatting for probe results

use crate::scanner::ProbeResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::{self, Write};

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Target line followed by the raw header, or the error text
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// `target,status,detail,elapsed_ms` rows with a header row
    Csv,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            "csv" => Ok(OutputFormat::Csv),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
            OutputFormat::Csv => "csv",
        };
        f.write_str(name)
    }
}

/// Destination for results as the aggregator receives them
pub trait ResultSink: Send {
    fn emit(&mut self, result: &ProbeResult) -> io::Result<()>;

    /// Called once after the last result
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonRecord<'a> {
    target: String,
    ip: String,
    port: u16,
    status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    header: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    elapsed_ms: u64,
    timestamp: DateTime<Utc>,
}

#[derive(Serialize)]
struct CsvRecord<'a> {
    target: String,
    status: &'static str,
    detail: &'a str,
    elapsed_ms: u64,
}

fn status_of(result: &ProbeResult) -> &'static str {
    match result.error() {
        None => "header",
        Some(e) => e.kind().as_str(),
    }
}

enum Inner<W: Write> {
    Text(W),
    Json(W),
    Csv(csv::Writer<W>),
}

/// Writes results to any `Write` in the configured format
pub struct OutputWriter<W: Write> {
    inner: Inner<W>,
}

impl OutputWriter<io::Stdout> {
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(format, io::stdout())
    }
}

impl<W: Write> OutputWriter<W> {
    pub fn new(format: OutputFormat, writer: W) -> Self {
        let inner = match format {
            OutputFormat::Text => Inner::Text(writer),
            OutputFormat::Json => Inner::Json(writer),
            OutputFormat::Csv => Inner::Csv(csv::Writer::from_writer(writer)),
        };
        Self { inner }
    }

    /// Flush and return the underlying writer
    pub fn into_inner(self) -> io::Result<W> {
        match self.inner {
            Inner::Text(mut w) | Inner::Json(mut w) => {
                w.flush()?;
                Ok(w)
            }
            Inner::Csv(w) => w.into_inner().map_err(|e| e.into_error()),
        }
    }

    fn write_result(&mut self, result: &ProbeResult) -> io::Result<()> {
        match &mut self.inner {
            Inner::Text(w) => writeln!(w, "{}", result),
            Inner::Json(w) => {
                let record = JsonRecord {
                    target: result.target.to_string(),
                    ip: result.target.ip().to_string(),
                    port: result.target.port(),
                    status: status_of(result),
                    header: result.header_text(),
                    error: result.error().map(|e| e.to_string()),
                    elapsed_ms: result.elapsed.as_millis() as u64,
                    timestamp: Utc::now(),
                };
                serde_json::to_writer(&mut *w, &record)?;
                writeln!(w)
            }
            Inner::Csv(w) => {
                let error_text = result.error().map(|e| e.to_string());
                let detail = match (result.header_text(), error_text.as_deref()) {
                    (Some(header), _) => header,
                    (None, Some(error)) => error,
                    (None, None) => "",
                };
                let record = CsvRecord {
                    target: result.target.to_string(),
                    status: status_of(result),
                    detail,
                    elapsed_ms: result.elapsed.as_millis() as u64,
                };
                w.serialize(record)
                    .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
                w.flush()
            }
        }
    }
}

impl<W: Write + Send> ResultSink for OutputWriter<W> {
    fn emit(&mut self, result: &ProbeResult) -> io::Result<()> {
        self.write_result(result)
    }

    fn finish(&mut self) -> io::Result<()> {
        match &mut self.inner {
            Inner::Text(w) | Inner::Json(w) => w.flush(),
            Inner::Csv(w) => w.flush(),
        }
    }
}
