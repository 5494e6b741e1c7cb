//! # Reporting Scheduler
//!
//! Drives the fixed-interval report/reset cycle on a dedicated thread.
//!
//! ## State Machine
//!
//! ```text
//! start ─► warm-up ─► WaitingForInterval ─► Reporting ─┬─► WaitingForInterval ...
//!                           │                          │
//!                           └── stop ──► Terminated ◄──┴── run time reached
//! ```
//!
//! The loop waits on a monotonic ticker and a stop channel at the same time,
//! so a stop request is honoured mid-interval. Reaching the run-time limit
//! is not acted on here: the scheduler returns [`SchedulerExit`] and the
//! owner decides how the process ends.

use crate::cumulative::CumulativeRateTracker;
use crate::report::{ReportSink, WindowReport};
use crate::window::StatsWindow;
use anyhow::{anyhow, Context, Result};
use crossbeam::channel::{self, after, select, tick, Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Read-only view of the requests each worker currently has in flight.
///
/// Implemented by whatever owns the worker pool; the scheduler only
/// samples it once per report.
pub trait OutstandingRequests: Send + Sync {
    fn outstanding_requests(&self) -> Vec<u64>;
}

/// No workers to report on.
impl OutstandingRequests for () {
    fn outstanding_requests(&self) -> Vec<u64> {
        Vec::new()
    }
}

/// How long the scheduler keeps reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunLimit {
    Unbounded,
    For(Duration),
}

impl RunLimit {
    /// Zero or negative seconds mean run forever.
    pub fn from_secs(secs: i64) -> Self {
        if secs > 0 {
            RunLimit::For(Duration::from_secs(secs as u64))
        } else {
            RunLimit::Unbounded
        }
    }

    pub fn is_reached(&self, elapsed: Duration) -> bool {
        match self {
            RunLimit::Unbounded => false,
            RunLimit::For(limit) => elapsed >= *limit,
        }
    }
}

/// Timing parameters of the reporting loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub interval: Duration,
    pub warmup: Duration,
    pub run_limit: RunLimit,
}

impl SchedulerConfig {
    pub fn new(interval: Duration, warmup: Duration, run_limit: RunLimit) -> Result<Self> {
        if interval.is_zero() {
            return Err(anyhow!("Reporting interval must be greater than zero"));
        }
        Ok(Self {
            interval,
            warmup,
            run_limit,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    Idle,
    WaitingForInterval,
    Reporting,
    Terminated,
}

/// Why the reporting loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerExit {
    /// The configured run time elapsed after `intervals` reports.
    RunTimeElapsed { elapsed: Duration, intervals: u64 },
    /// A [`StopHandle`] asked the loop to end.
    Stopped { intervals: u64 },
}

impl SchedulerExit {
    pub fn intervals(&self) -> u64 {
        match *self {
            SchedulerExit::RunTimeElapsed { intervals, .. } => intervals,
            SchedulerExit::Stopped { intervals } => intervals,
        }
    }
}

/// Cooperative cancellation for a running [`ReportingScheduler`].
#[derive(Debug, Clone)]
pub struct StopHandle {
    tx: Sender<()>,
}

impl StopHandle {
    /// Ask the scheduler to stop. Extra calls are no-ops.
    pub fn stop(&self) {
        let _ = self.tx.try_send(());
    }
}

/// Periodically closes the [`StatsWindow`] and hands the report to a sink.
pub struct ReportingScheduler {
    window: StatsWindow,
    tracker: CumulativeRateTracker,
    config: SchedulerConfig,
    outstanding: Arc<dyn OutstandingRequests>,
    sink: Box<dyn ReportSink>,
    stop_tx: Sender<()>,
    stop_rx: Receiver<()>,
    state: SchedulerState,
}

impl ReportingScheduler {
    pub fn new(
        window: StatsWindow,
        config: SchedulerConfig,
        outstanding: Arc<dyn OutstandingRequests>,
        sink: Box<dyn ReportSink>,
    ) -> Self {
        let (stop_tx, stop_rx) = channel::bounded(1);
        Self {
            window,
            tracker: CumulativeRateTracker::new(),
            config,
            outstanding,
            sink,
            stop_tx,
            stop_rx,
            state: SchedulerState::Idle,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            tx: self.stop_tx.clone(),
        }
    }

    pub fn tracker(&self) -> &CumulativeRateTracker {
        &self.tracker
    }

    /// Close the current window at `now` and return its report.
    pub fn report_once(&mut self, now: Instant) -> WindowReport {
        let outstanding = self.outstanding.outstanding_requests();
        self.window
            .report_and_reset(now, &mut self.tracker, outstanding)
    }

    /// Run the loop on the calling thread until the run time elapses or a
    /// stop is requested.
    pub fn run(mut self) -> Result<SchedulerExit> {
        let stop = self.stop_rx.clone();
        let run_start = Instant::now();
        self.window.restart(run_start);
        info!(
            "Reporting every {:?} after a {:?} warm-up ({:?})",
            self.config.interval, self.config.warmup, self.config.run_limit
        );

        if !self.config.warmup.is_zero() {
            select! {
                recv(stop) -> _ => return self.finish(SchedulerExit::Stopped { intervals: 0 }),
                recv(after(self.config.warmup)) -> _ => {}
            }
        }

        let ticker = tick(self.config.interval);
        let mut intervals = 0u64;
        loop {
            self.transition(SchedulerState::WaitingForInterval);
            select! {
                recv(stop) -> _ => return self.finish(SchedulerExit::Stopped { intervals }),
                recv(ticker) -> _ => {}
            }

            self.transition(SchedulerState::Reporting);
            let now = Instant::now();
            let report = self.report_once(now);
            intervals += 1;
            if let Err(e) = self.sink.emit(&report) {
                warn!("Failed to emit window report: {:#}", e);
            }

            let elapsed = now.saturating_duration_since(run_start);
            if self.config.run_limit.is_reached(elapsed) {
                info!("Ran for {:.6}, exiting", elapsed.as_secs_f64());
                return self.finish(SchedulerExit::RunTimeElapsed { elapsed, intervals });
            }
        }
    }

    /// Run the loop on a dedicated `stats-reporter` thread.
    pub fn spawn(self) -> Result<(StopHandle, JoinHandle<Result<SchedulerExit>>)> {
        let stop = self.stop_handle();
        let handle = thread::Builder::new()
            .name("stats-reporter".to_string())
            .spawn(move || self.run())
            .context("Failed to spawn reporting thread")?;
        Ok((stop, handle))
    }

    fn transition(&mut self, next: SchedulerState) {
        if self.state != next {
            debug!("Scheduler {:?} -> {:?}", self.state, next);
            self.state = next;
        }
    }

    fn finish(&mut self, exit: SchedulerExit) -> Result<SchedulerExit> {
        self.transition(SchedulerState::Terminated);
        if let Err(e) = self.sink.finish() {
            warn!("Failed to finish report sink: {:#}", e);
        }
        Ok(exit)
    }
}
