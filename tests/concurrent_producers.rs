use memload_stats::{
    CompletedOperation, CumulativeRateTracker, OperationKind, StatsWindow,
};
use std::sync::{Arc, Barrier};
use std::thread;
use std::time::{Duration, Instant};

const PRODUCERS: usize = 8;
const SAMPLES_PER_PRODUCER: usize = 5_000;

fn op(i: usize) -> CompletedOperation {
    let kind = if i % 4 == 0 {
        OperationKind::Set
    } else {
        OperationKind::Get { hit: i % 3 != 0 }
    };
    CompletedOperation {
        kind,
        latency_secs: 0.000_1 + (i % 97) as f64 * 0.000_3,
        payload_bytes: match kind {
            OperationKind::Set => None,
            _ => Some((i % 2048) as f64),
        },
    }
}

/// N producers adding M samples each under the shared lock lose nothing.
#[test]
fn concurrent_producers_lose_no_updates() {
    let window = StatsWindow::new();
    let barrier = Arc::new(Barrier::new(PRODUCERS));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let window = window.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..SAMPLES_PER_PRODUCER {
                    window.record(&op(i)).unwrap();
                    if i % 64 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    let total = (PRODUCERS * SAMPLES_PER_PRODUCER) as u64;
    let snap = window.snapshot();
    assert_eq!(snap.requests, total);
    assert_eq!(snap.response_time.count(), total);
    assert_eq!(snap.response_time.histogram().total(), total);
    assert_eq!(snap.gets + snap.sets, total);
    assert_eq!(snap.hits + snap.misses, snap.gets);
    assert_eq!(snap.get_size.count(), snap.gets);
}

/// Reports taken while producers are running never drop or double-count
/// a request: the per-window totals add up to everything recorded.
#[test]
fn reset_boundaries_preserve_every_update() {
    let start = Instant::now();
    let window = StatsWindow::starting_at(start);
    let barrier = Arc::new(Barrier::new(PRODUCERS + 1));

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|_| {
            let window = window.clone();
            let barrier = barrier.clone();
            thread::spawn(move || {
                barrier.wait();
                for i in 0..SAMPLES_PER_PRODUCER {
                    window
                        .apply(|w| {
                            w.count_operation(OperationKind::Set);
                            w.record_latency(0.002)
                        })
                        .unwrap();
                    if i % 128 == 0 {
                        thread::yield_now();
                    }
                }
            })
        })
        .collect();

    let mut tracker = CumulativeRateTracker::new();
    let mut reported = 0u64;
    let mut tick = start;
    barrier.wait();
    for _ in 0..20 {
        thread::sleep(Duration::from_millis(1));
        tick += Duration::from_millis(10);
        let report = window.report_and_reset(tick, &mut tracker, Vec::new());
        assert_eq!(report.requests, report.sets);
        reported += report.requests;
    }

    for handle in handles {
        handle.join().unwrap();
    }
    tick += Duration::from_millis(10);
    reported += window
        .report_and_reset(tick, &mut tracker, Vec::new())
        .requests;

    assert_eq!(reported, (PRODUCERS * SAMPLES_PER_PRODUCER) as u64);
    assert_eq!(tracker.interval_count(), 21);
}
