//! # memload-stats
//!
//! Statistics core for memcached-style load generators. Worker threads
//! record per-operation latency and payload size into a shared window; a
//! reporting thread closes the window at a fixed interval, prints an
//! aggregate report and tracks how steady the request rate is across
//! windows.
//!
//! ## Architecture Overview
//!
//! - `histogram`: three fixed-resolution bands covering latencies from 100ns
//!   to minutes in bounded memory
//! - `metrics`: `SampleAccumulator`, the per-quantity histogram plus running
//!   moments with O(1), allocation-free updates
//! - `quantile`: approximate quantiles walked out of the histogram bands
//! - `window`: the lock-guarded per-interval aggregate shared by producers
//!   and the reporter
//! - `cumulative`: cross-window mean, standard deviation and coefficient of
//!   variation of requests per second
//! - `scheduler`: the ticker-driven report/reset loop
//! - `report`: the per-window record and its console / JSON-lines sinks
//! - `workload`: a synthetic producer pool for driving the engine
//! - `cli`, `logging`, `utils`: configuration and process plumbing
//!
//! ## Usage Example
//!
//! ```rust
//! use memload_stats::{CompletedOperation, CumulativeRateTracker, OperationKind, StatsWindow};
//! use std::time::{Duration, Instant};
//!
//! let start = Instant::now();
//! let window = StatsWindow::starting_at(start);
//!
//! window
//!     .record(&CompletedOperation {
//!         kind: OperationKind::Get { hit: true },
//!         latency_secs: 0.000_35,
//!         payload_bytes: Some(512.0),
//!     })
//!     .unwrap();
//!
//! let mut tracker = CumulativeRateTracker::new();
//! let report = window.report_and_reset(start + Duration::from_secs(1), &mut tracker, vec![0]);
//! assert_eq!(report.requests, 1);
//! assert_eq!(report.rps, 1.0);
//! ```

pub mod cli;
pub mod cumulative;
pub mod error;
pub mod histogram;
pub mod logging;

/// Histogram-backed accumulator for one measured quantity
///
/// Running count, sum, sum of squares and extrema next to a banded
/// histogram. Mean and standard deviation come from the moments; quantiles
/// come from the histogram via the `quantile` module.
pub mod metrics;

pub mod quantile;
pub mod report;

/// Reporting loop
///
/// Owns the cumulative rate tracker, wakes on a monotonic ticker, closes
/// the shared window and hands each report to a sink. Returns to its owner
/// when the run time elapses or a stop is requested.
pub mod scheduler;

pub mod utils;
pub mod window;
pub mod workload;

pub use cumulative::{CumulativeRate, CumulativeRateTracker};
pub use error::StatsError;
pub use metrics::SampleAccumulator;
pub use quantile::{find_quantile, Quantile};
pub use report::{ConsoleSink, JsonLinesSink, MultiSink, ReportSink, WindowReport};
pub use scheduler::{
    OutstandingRequests, ReportingScheduler, RunLimit, SchedulerConfig, SchedulerExit, StopHandle,
};
pub use window::{CompletedOperation, GlobalStatsWindow, OperationKind, StatsWindow};

/// The current version of memload-stats
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default configuration values
pub mod defaults {
    /// Run until interrupted.
    pub const RUN_TIME_SECS: i64 = 0;

    /// One report per second.
    pub const STATS_INTERVAL_SECS: f64 = 1.0;

    /// Delay before the first interval, letting connections settle.
    pub const WARMUP_SECS: f64 = 2.0;

    /// Mean simulated service time in microseconds.
    pub const MEAN_LATENCY_US: u64 = 250;

    /// Read-heavy mix typical of cache workloads.
    pub const GET_RATIO: f64 = 0.9;

    pub const HIT_RATIO: f64 = 0.9;

    pub const MIN_PAYLOAD_BYTES: u32 = 64;

    pub const MAX_PAYLOAD_BYTES: u32 = 4096;
}
