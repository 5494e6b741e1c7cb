//! Synthetic producer pool.
//!
//! Stands in for the network workers of a real load generator: each thread
//! simulates a memcached-style get or set, measures how long it took and
//! records the result into the shared [`StatsWindow`]. Per-worker gauges of
//! in-flight requests are exposed through [`OutstandingRequests`].

use crate::scheduler::OutstandingRequests;
use crate::utils;
use crate::window::{CompletedOperation, OperationKind, StatsWindow};
use anyhow::{anyhow, Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Upper bound on one simulated request, so the exponential tail cannot
/// park a worker for long.
const MAX_SIMULATED_LATENCY: Duration = Duration::from_millis(250);

/// Requests in flight, one gauge per worker.
#[derive(Debug)]
pub struct WorkerGauges {
    gauges: Box<[AtomicU64]>,
}

impl WorkerGauges {
    pub fn new(workers: usize) -> Self {
        Self {
            gauges: (0..workers).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.gauges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gauges.is_empty()
    }

    pub fn begin(&self, worker: usize) {
        self.gauges[worker].fetch_add(1, Ordering::Relaxed);
    }

    pub fn end(&self, worker: usize) {
        self.gauges[worker].fetch_sub(1, Ordering::Relaxed);
    }
}

impl OutstandingRequests for WorkerGauges {
    fn outstanding_requests(&self) -> Vec<u64> {
        self.gauges
            .iter()
            .map(|g| g.load(Ordering::Relaxed))
            .collect()
    }
}

/// Shape of the simulated traffic.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkloadConfig {
    pub workers: usize,
    /// Mean of the exponentially distributed service time.
    pub mean_latency: Duration,
    /// Fraction of operations that are gets.
    pub get_ratio: f64,
    /// Fraction of gets that hit.
    pub hit_ratio: f64,
    /// Inclusive range of payload sizes returned by a hit, in bytes.
    pub payload_bytes: (u32, u32),
}

impl WorkloadConfig {
    pub fn validate(&self) -> Result<()> {
        utils::validate_workers(self.workers)?;
        utils::validate_ratio(self.get_ratio, "Get ratio")?;
        utils::validate_ratio(self.hit_ratio, "Hit ratio")?;
        if self.payload_bytes.0 > self.payload_bytes.1 {
            return Err(anyhow!(
                "Payload size range {}..={} is empty",
                self.payload_bytes.0,
                self.payload_bytes.1
            ));
        }
        Ok(())
    }
}

/// Running pool of synthetic workers.
pub struct SyntheticWorkload {
    running: Arc<AtomicBool>,
    gauges: Arc<WorkerGauges>,
    threads: Vec<JoinHandle<u64>>,
}

impl SyntheticWorkload {
    /// Start `config.workers` threads recording into `window`.
    pub fn spawn(config: &WorkloadConfig, window: StatsWindow) -> Result<Self> {
        config.validate()?;

        let running = Arc::new(AtomicBool::new(true));
        let gauges = Arc::new(WorkerGauges::new(config.workers));
        let mut threads = Vec::with_capacity(config.workers);

        for id in 0..config.workers {
            let worker = Worker {
                id,
                config: config.clone(),
                window: window.clone(),
                gauges: gauges.clone(),
                running: running.clone(),
            };
            let handle = thread::Builder::new()
                .name(format!("worker-{}", id))
                .spawn(move || worker.run())
                .with_context(|| format!("Failed to spawn worker {}", id))?;
            threads.push(handle);
        }

        debug!("Spawned {} synthetic workers", config.workers);
        Ok(Self {
            running,
            gauges,
            threads,
        })
    }

    pub fn gauges(&self) -> Arc<WorkerGauges> {
        self.gauges.clone()
    }

    /// Stop every worker and return the number of operations they recorded.
    pub fn shutdown(self) -> u64 {
        self.running.store(false, Ordering::SeqCst);
        self.threads.into_iter().map(join_worker).sum()
    }
}

/// Join one worker, counting a panicked worker as zero operations.
fn join_worker(handle: JoinHandle<u64>) -> u64 {
    let name = handle.thread().name().unwrap_or("worker").to_string();
    handle.join().unwrap_or_else(|_| {
        warn!("{} panicked, its recorded operations are not counted", name);
        0
    })
}

struct Worker {
    id: usize,
    config: WorkloadConfig,
    window: StatsWindow,
    gauges: Arc<WorkerGauges>,
    running: Arc<AtomicBool>,
}

impl Worker {
    fn run(self) -> u64 {
        // Each worker gets its own deterministic RNG seeded uniquely.
        let mut rng = StdRng::seed_from_u64(1000 + self.id as u64);
        let mut recorded = 0u64;

        while self.running.load(Ordering::Relaxed) {
            let op = self.simulate(&mut rng);
            match self.window.record(&op) {
                Ok(()) => recorded += 1,
                Err(e) => warn!(worker = self.id, "Dropping sample: {}", e),
            }
        }

        debug!(worker = self.id, recorded, "Worker stopped");
        recorded
    }

    fn simulate(&self, rng: &mut StdRng) -> CompletedOperation {
        let kind = if rng.gen_bool(self.config.get_ratio) {
            OperationKind::Get {
                hit: rng.gen_bool(self.config.hit_ratio),
            }
        } else {
            OperationKind::Set
        };

        // Exponential service time via inverse transform.
        let u: f64 = rng.gen();
        let service = self.config.mean_latency.as_secs_f64() * -(1.0 - u).ln();
        let service = Duration::from_secs_f64(service).min(MAX_SIMULATED_LATENCY);

        self.gauges.begin(self.id);
        let started = Instant::now();
        thread::sleep(service);
        let latency_secs = started.elapsed().as_secs_f64();
        self.gauges.end(self.id);

        let payload_bytes = match kind {
            OperationKind::Get { hit: true } => {
                let (lo, hi) = self.config.payload_bytes;
                Some(rng.gen_range(lo..=hi) as f64)
            }
            OperationKind::Get { hit: false } => Some(0.0),
            OperationKind::Set => None,
        };

        CompletedOperation {
            kind,
            latency_secs,
            payload_bytes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(workers: usize) -> WorkloadConfig {
        WorkloadConfig {
            workers,
            mean_latency: Duration::from_micros(200),
            get_ratio: 0.9,
            hit_ratio: 0.8,
            payload_bytes: (16, 1024),
        }
    }

    #[test]
    fn test_validate() {
        assert!(config(2).validate().is_ok());
        assert!(config(0).validate().is_err());

        let mut bad = config(1);
        bad.get_ratio = 1.5;
        assert!(bad.validate().is_err());

        let mut bad = config(1);
        bad.payload_bytes = (10, 1);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_gauges_track_in_flight_requests() {
        let gauges = WorkerGauges::new(3);
        gauges.begin(0);
        gauges.begin(2);
        gauges.begin(2);
        gauges.end(2);

        assert_eq!(gauges.len(), 3);
        assert_eq!(gauges.outstanding_requests(), vec![1, 0, 1]);
    }

    #[test]
    fn test_join_worker_survives_a_panicked_worker() {
        let ok = thread::Builder::new()
            .name("worker-0".into())
            .spawn(|| 7u64)
            .unwrap();
        let panicked = thread::Builder::new()
            .name("worker-1".into())
            .spawn(|| -> u64 { panic!("simulated worker failure") })
            .unwrap();

        assert_eq!(join_worker(ok), 7);
        assert_eq!(join_worker(panicked), 0);
    }

    #[test]
    fn test_workload_records_into_window() {
        let window = StatsWindow::new();
        let workload = SyntheticWorkload::spawn(&config(2), window.clone()).unwrap();
        assert_eq!(workload.gauges().len(), 2);

        thread::sleep(Duration::from_millis(50));
        let recorded = workload.shutdown();

        let snap = window.snapshot();
        assert!(recorded > 0);
        assert_eq!(snap.requests, recorded);
        assert_eq!(snap.response_time.count(), recorded);
        assert_eq!(snap.gets + snap.sets, snap.requests);
        assert_eq!(snap.hits + snap.misses, snap.gets);
        assert_eq!(snap.get_size.count(), snap.gets);
    }
}
