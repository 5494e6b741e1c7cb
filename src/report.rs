//! # Window Reports and Sinks
//!
//! A [`WindowReport`] is the flat record produced at the end of every
//! reporting interval. Sinks decide how it leaves the process:
//!
//! - [`ConsoleSink`]: the comma-aligned table load-generator users expect,
//!   followed by the outstanding-requests line
//! - [`JsonLinesSink`]: one JSON object per window, streamed to a file so
//!   long runs can be post-processed while they are still going
//! - [`MultiSink`]: fan-out to several sinks
//!
//! Latencies are recorded in seconds and reported in milliseconds.
//! Undefined statistics of an idle window (mean, quantiles, extrema) are
//! NaN and serialize as JSON `null`.

use crate::cumulative::CumulativeRate;
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use colored::*;
use serde::Serialize;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Latency distribution of one window, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LatencySummary {
    pub mean_ms: f64,
    pub p90_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub std_dev_ms: f64,
    pub min_ms: f64,
    pub max_ms: f64,
}

/// Everything reported for one window.
#[derive(Debug, Clone, Serialize)]
pub struct WindowReport {
    pub timestamp: DateTime<Utc>,
    pub unix_ts: i64,
    pub interval_secs: f64,
    pub rps: f64,
    pub requests: u64,
    pub gets: u64,
    pub sets: u64,
    pub hits: u64,
    pub misses: u64,
    pub latency: LatencySummary,
    pub avg_get_size: f64,
    pub cumulative: CumulativeRate,
    /// Requests in flight per worker at report time.
    pub outstanding: Vec<u64>,
}

impl WindowReport {
    /// Column names matching the [`fmt::Display`] row layout.
    pub fn table_header() -> String {
        format!(
            "{:>10},{:>10},{:>8},{:>16}, {:>8},{:>11},{:>10},{:>13},{:>10},{:>10},{:>10},{:>12},{:>10},{:>10},{:>11},{:>14},{:>10},{:>20},{:>20},{:>20}",
            "unix_ts",
            "timeDiff",
            "rps",
            "requests",
            "gets",
            "sets",
            "hits",
            "misses",
            "avg_lat",
            "90th",
            "95th",
            "99th",
            "std",
            "min",
            "max",
            "avgGetSize",
            "count",
            "cumulative_mean_rps",
            "cumulative_std_rps",
            "cumulative_cv_rps"
        )
    }

    /// Outstanding requests as a space separated list, one entry per worker.
    pub fn outstanding_line(&self) -> String {
        self.outstanding
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for WindowReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>10}, {:>10.6}, {:>9.1}, {:>10}, {:>10}, {:>10}, {:>10}, {:>10}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10.6}, {:>10}, {:>20.10}, {:>20.10}, {:>20.10}",
            self.unix_ts,
            self.interval_secs,
            self.rps,
            self.requests,
            self.gets,
            self.sets,
            self.hits,
            self.misses,
            self.latency.mean_ms,
            self.latency.p90_ms,
            self.latency.p95_ms,
            self.latency.p99_ms,
            self.latency.std_dev_ms,
            self.latency.min_ms,
            self.latency.max_ms,
            self.avg_get_size,
            self.cumulative.interval_count,
            self.cumulative.mean_rps,
            self.cumulative.std_dev_rps,
            self.cumulative.cv_rps
        )
    }
}

/// Destination for window reports.
///
/// Sinks run on the reporting thread after the window lock is released.
pub trait ReportSink: Send {
    fn emit(&mut self, report: &WindowReport) -> Result<()>;

    /// Flush and close. Called once when the scheduler stops.
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Prints reports as a table to a writer, stdout by default.
pub struct ConsoleSink<W: Write + Send> {
    out: W,
    colorize: bool,
    banner_written: bool,
}

impl ConsoleSink<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout(), true)
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(out: W, colorize: bool) -> Self {
        Self {
            out,
            colorize,
            banner_written: false,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportSink for ConsoleSink<W> {
    fn emit(&mut self, report: &WindowReport) -> Result<()> {
        if !self.banner_written {
            writeln!(self.out, "Stats:")?;
            writeln!(self.out, "-------------------------")?;
            self.banner_written = true;
        }

        let header = WindowReport::table_header();
        if self.colorize {
            writeln!(self.out, "{}", header.bold())?;
        } else {
            writeln!(self.out, "{}", header)?;
        }
        writeln!(self.out, "{}", report)?;
        writeln!(self.out, "Outstanding requests per worker:")?;
        writeln!(self.out, "{}", report.outstanding_line())?;
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}

/// Streams reports as JSON lines to a file.
pub struct JsonLinesSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl JsonLinesSink {
    /// Create or truncate `path`.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .with_context(|| format!("Failed to open report output {:?}", path))?;

        debug!("Streaming window reports to: {:?}", path);
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonLinesSink {
    fn emit(&mut self, report: &WindowReport) -> Result<()> {
        serde_json::to_writer(&mut self.writer, report)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer
            .flush()
            .with_context(|| format!("Failed to flush {:?}", self.path()))?;
        debug!("Window reports written to: {:?}", self.path());
        Ok(())
    }
}

/// Forwards every report to each inner sink.
///
/// All sinks see every report even when an earlier one fails; the first
/// error is returned.
#[derive(Default)]
pub struct MultiSink {
    sinks: Vec<Box<dyn ReportSink>>,
}

impl MultiSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<S: ReportSink + 'static>(&mut self, sink: S) {
        self.sinks.push(Box::new(sink));
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl ReportSink for MultiSink {
    fn emit(&mut self, report: &WindowReport) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.emit(report) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    fn finish(&mut self) -> Result<()> {
        let mut first_error = None;
        for sink in &mut self.sinks {
            if let Err(e) = sink.finish() {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
