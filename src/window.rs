//! # Shared Statistics Window
//!
//! [`GlobalStatsWindow`] holds one reporting interval of counters and
//! accumulators. It is only ever reached through a [`StatsWindow`] handle,
//! which owns the single lock shared by every producer and the reporting
//! thread. The lock discipline is part of the API: producers go through
//! [`StatsWindow::record`] or [`StatsWindow::apply`], and the reporting
//! thread uses [`StatsWindow::report_and_reset`], which reads, folds and
//! resets in one critical section so no update is lost or counted twice
//! across a window boundary.

use crate::cumulative::CumulativeRateTracker;
use crate::error::StatsError;
use crate::metrics::SampleAccumulator;
use crate::quantile::{find_quantile, Quantile};
use crate::report::{LatencySummary, WindowReport};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// Kind of a completed memcached-style operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Get { hit: bool },
    Set,
}

/// One completed operation as reported by a worker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletedOperation {
    pub kind: OperationKind,
    /// Request latency in seconds.
    pub latency_secs: f64,
    /// Bytes returned by a get, if the worker measured them.
    pub payload_bytes: Option<f64>,
}

/// Counters and accumulators for one reporting interval.
#[derive(Debug, Clone)]
pub struct GlobalStatsWindow {
    pub requests: u64,
    pub gets: u64,
    pub sets: u64,
    pub hits: u64,
    pub misses: u64,
    pub response_time: SampleAccumulator,
    pub get_size: SampleAccumulator,
    pub window_start: Instant,
}

impl GlobalStatsWindow {
    pub fn new(window_start: Instant) -> Self {
        Self {
            requests: 0,
            gets: 0,
            sets: 0,
            hits: 0,
            misses: 0,
            response_time: SampleAccumulator::new(),
            get_size: SampleAccumulator::new(),
            window_start,
        }
    }

    pub fn record_latency(&mut self, seconds: f64) -> Result<(), StatsError> {
        self.response_time.add_sample(seconds)
    }

    pub fn record_payload_size(&mut self, bytes: f64) -> Result<(), StatsError> {
        self.get_size.add_sample(bytes)
    }

    /// Bump `requests` and the per-kind counters for one operation.
    pub fn count_operation(&mut self, kind: OperationKind) {
        self.requests += 1;
        match kind {
            OperationKind::Get { hit } => {
                self.gets += 1;
                if hit {
                    self.hits += 1;
                } else {
                    self.misses += 1;
                }
            }
            OperationKind::Set => self.sets += 1,
        }
    }

    /// Zero every counter, restore the `min` sentinels and start a new
    /// window at `now`.
    pub fn reset(&mut self, now: Instant) {
        self.requests = 0;
        self.gets = 0;
        self.sets = 0;
        self.hits = 0;
        self.misses = 0;
        self.response_time.reset();
        self.get_size.reset();
        self.window_start = now;
    }
}

/// Cloneable handle to the process-wide [`GlobalStatsWindow`].
#[derive(Debug, Clone)]
pub struct StatsWindow {
    inner: Arc<Mutex<GlobalStatsWindow>>,
}

impl StatsWindow {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(window_start: Instant) -> Self {
        Self {
            inner: Arc::new(Mutex::new(GlobalStatsWindow::new(window_start))),
        }
    }

    /// Run `f` with the window locked.
    ///
    /// Keep the closure short and free of I/O: every producer and the
    /// reporter wait on this lock.
    pub fn apply<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut GlobalStatsWindow) -> R,
    {
        f(&mut *self.inner.lock())
    }

    /// Record a completed operation atomically.
    ///
    /// Samples are validated before any counter moves, so a rejected
    /// operation leaves the window untouched.
    pub fn record(&self, op: &CompletedOperation) -> Result<(), StatsError> {
        crate::histogram::locate(op.latency_secs)?;
        if let Some(bytes) = op.payload_bytes {
            crate::histogram::locate(bytes)?;
        }

        self.apply(|window| {
            window.count_operation(op.kind);
            window.record_latency(op.latency_secs)?;
            if let Some(bytes) = op.payload_bytes {
                window.record_payload_size(bytes)?;
            }
            Ok(())
        })
    }

    /// Copy of the current window, taken under the lock.
    pub fn snapshot(&self) -> GlobalStatsWindow {
        self.apply(|window| window.clone())
    }

    /// Reset the window and move its start to `now` without reporting.
    pub fn restart(&self, now: Instant) {
        self.apply(|window| window.reset(now));
    }

    /// Close the window ending at `now`.
    ///
    /// Computes the interval rate and latency statistics, folds the rate
    /// into `tracker`, builds the report and resets the window, all inside
    /// one critical section. The caller emits the report after the lock is
    /// gone.
    pub fn report_and_reset(
        &self,
        now: Instant,
        tracker: &mut CumulativeRateTracker,
        outstanding: Vec<u64>,
    ) -> WindowReport {
        let timestamp = chrono::Utc::now();

        self.apply(|window| {
            let interval_secs = now
                .saturating_duration_since(window.window_start)
                .as_secs_f64();
            let rps = if interval_secs > 0.0 {
                window.requests as f64 / interval_secs
            } else {
                0.0
            };

            let latency = &window.response_time;
            let summary = LatencySummary {
                mean_ms: 1000.0 * latency.mean(),
                p90_ms: 1000.0 * find_quantile(latency, Quantile::P90),
                p95_ms: 1000.0 * find_quantile(latency, Quantile::P95),
                p99_ms: 1000.0 * find_quantile(latency, Quantile::P99),
                std_dev_ms: 1000.0 * latency.std_dev(),
                min_ms: 1000.0 * latency.min(),
                max_ms: 1000.0 * latency.max(),
            };

            let cumulative = tracker.fold(rps);

            let report = WindowReport {
                timestamp,
                unix_ts: timestamp.timestamp(),
                interval_secs,
                rps,
                requests: window.requests,
                gets: window.gets,
                sets: window.sets,
                hits: window.hits,
                misses: window.misses,
                latency: summary,
                avg_get_size: window.get_size.mean(),
                cumulative,
                outstanding,
            };

            window.reset(now);
            report
        })
    }
}

impl Default for StatsWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MIN_SENTINEL;
    use std::time::Duration;

    fn get(latency_secs: f64, hit: bool, bytes: f64) -> CompletedOperation {
        CompletedOperation {
            kind: OperationKind::Get { hit },
            latency_secs,
            payload_bytes: Some(bytes),
        }
    }

    fn set(latency_secs: f64) -> CompletedOperation {
        CompletedOperation {
            kind: OperationKind::Set,
            latency_secs,
            payload_bytes: None,
        }
    }

    #[test]
    fn test_record_updates_counters() {
        let window = StatsWindow::new();
        window.record(&get(0.0004, true, 100.0)).unwrap();
        window.record(&get(0.0006, false, 300.0)).unwrap();
        window.record(&set(0.002)).unwrap();

        let snap = window.snapshot();
        assert_eq!(snap.requests, 3);
        assert_eq!(snap.gets, 2);
        assert_eq!(snap.sets, 1);
        assert_eq!(snap.hits, 1);
        assert_eq!(snap.misses, 1);
        assert_eq!(snap.response_time.count(), 3);
        assert_eq!(snap.get_size.count(), 2);
        assert_eq!(snap.get_size.mean(), 200.0);
    }

    #[test]
    fn test_rejected_operation_changes_nothing() {
        let window = StatsWindow::new();
        assert!(window.record(&set(-0.1)).is_err());
        assert!(window.record(&get(0.001, true, f64::NAN)).is_err());

        let snap = window.snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.gets, 0);
        assert_eq!(snap.response_time.count(), 0);
    }

    #[test]
    fn test_apply_exposes_entry_points() {
        let window = StatsWindow::new();
        window
            .apply(|w| {
                w.count_operation(OperationKind::Set);
                w.record_latency(0.25)?;
                w.record_payload_size(64.0)
            })
            .unwrap();

        let snap = window.snapshot();
        assert_eq!(snap.sets, 1);
        assert_eq!(snap.response_time.max(), 0.25);
        assert_eq!(snap.get_size.count(), 1);
    }

    #[test]
    fn test_report_and_reset() {
        let start = Instant::now();
        let window = StatsWindow::starting_at(start);
        let mut tracker = CumulativeRateTracker::new();

        for _ in 0..40 {
            window.record(&get(0.001_5, true, 512.0)).unwrap();
        }

        let report =
            window.report_and_reset(start + Duration::from_secs(2), &mut tracker, vec![1, 2]);
        assert_eq!(report.requests, 40);
        assert!((report.interval_secs - 2.0).abs() < 1e-9);
        assert!((report.rps - 20.0).abs() < 1e-9);
        assert!((report.latency.mean_ms - 1.5).abs() < 1e-9);
        assert!((report.latency.p99_ms - 1.6).abs() < 1e-9);
        assert!(report.latency.std_dev_ms < 1e-6);
        assert_eq!(report.avg_get_size, 512.0);
        assert_eq!(report.cumulative.interval_count, 1);
        assert_eq!(report.outstanding, vec![1, 2]);

        let snap = window.snapshot();
        assert_eq!(snap.requests, 0);
        assert_eq!(snap.response_time.raw_min(), MIN_SENTINEL);
        assert_eq!(snap.get_size.raw_min(), MIN_SENTINEL);
        assert_eq!(snap.window_start, start + Duration::from_secs(2));
    }

    #[test]
    fn test_idle_window_report() {
        let start = Instant::now();
        let window = StatsWindow::starting_at(start);
        let mut tracker = CumulativeRateTracker::new();

        let report =
            window.report_and_reset(start + Duration::from_millis(500), &mut tracker, Vec::new());
        assert_eq!(report.rps, 0.0);
        assert!(report.latency.mean_ms.is_nan());
        assert!(report.latency.p90_ms.is_nan());
        assert!(report.latency.min_ms.is_nan());
        assert_eq!(report.cumulative.cv_rps, 0.0);
    }

    #[test]
    fn test_zero_length_window_has_zero_rate() {
        let start = Instant::now();
        let window = StatsWindow::starting_at(start);
        window.record(&set(0.01)).unwrap();

        let mut tracker = CumulativeRateTracker::new();
        let report = window.report_and_reset(start, &mut tracker, Vec::new());
        assert_eq!(report.rps, 0.0);
        assert_eq!(report.requests, 1);
    }
}
