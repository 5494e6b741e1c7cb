use serde::{Deserialize, Serialize};

/// Cross-window statistics of the requests-per-second rate.
///
/// Survives every window reset and is owned by the reporting thread alone,
/// so it carries no lock.
#[derive(Debug, Clone, Default)]
pub struct CumulativeRateTracker {
    interval_count: u64,
    sum_rps: f64,
    sum_squared_rps: f64,
}

/// Derived view of a [`CumulativeRateTracker`] after a fold.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CumulativeRate {
    pub interval_count: u64,
    pub mean_rps: f64,
    pub std_dev_rps: f64,
    /// Zero when the mean is zero.
    pub cv_rps: f64,
}

impl CumulativeRateTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one interval's rate in and return the updated statistics.
    pub fn fold(&mut self, rps: f64) -> CumulativeRate {
        self.interval_count += 1;
        self.sum_rps += rps;
        self.sum_squared_rps += rps * rps;
        self.current()
    }

    /// Statistics over every interval folded so far.
    ///
    /// Uses the population variance `E[x^2] - E[x]^2`, clamped at zero.
    pub fn current(&self) -> CumulativeRate {
        if self.interval_count == 0 {
            return CumulativeRate {
                interval_count: 0,
                mean_rps: 0.0,
                std_dev_rps: 0.0,
                cv_rps: 0.0,
            };
        }

        let n = self.interval_count as f64;
        let mean = self.sum_rps / n;
        let variance = (self.sum_squared_rps / n - mean * mean).max(0.0);
        let std_dev = variance.sqrt();
        let cv = if mean != 0.0 { std_dev / mean } else { 0.0 };

        CumulativeRate {
            interval_count: self.interval_count,
            mean_rps: mean,
            std_dev_rps: std_dev,
            cv_rps: cv,
        }
    }

    pub fn interval_count(&self) -> u64 {
        self.interval_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fold_two_intervals() {
        let mut tracker = CumulativeRateTracker::new();

        let first = tracker.fold(100.0);
        assert_eq!(first.interval_count, 1);
        assert_eq!(first.mean_rps, 100.0);
        assert_eq!(first.std_dev_rps, 0.0);

        let second = tracker.fold(300.0);
        assert_eq!(second.interval_count, 2);
        assert_eq!(second.mean_rps, 200.0);
        assert!((second.std_dev_rps - 100.0).abs() < 1e-9);
        assert!((second.cv_rps - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_rate_has_zero_cv() {
        let mut tracker = CumulativeRateTracker::new();
        tracker.fold(0.0);
        let rate = tracker.fold(0.0);

        assert_eq!(rate.mean_rps, 0.0);
        assert_eq!(rate.cv_rps, 0.0);
        assert!(!rate.cv_rps.is_nan());
    }

    #[test]
    fn test_constant_rate_never_goes_nan() {
        let mut tracker = CumulativeRateTracker::new();
        let mut rate = tracker.current();
        for _ in 0..1000 {
            rate = tracker.fold(12_345.678);
        }
        assert_eq!(rate.interval_count, 1000);
        assert!(rate.std_dev_rps >= 0.0);
        assert!(rate.std_dev_rps < 1e-3);
    }

    #[test]
    fn test_empty_tracker() {
        let tracker = CumulativeRateTracker::new();
        assert_eq!(tracker.interval_count(), 0);
        assert_eq!(tracker.current().mean_rps, 0.0);
    }
}
