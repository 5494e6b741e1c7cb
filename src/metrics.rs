use crate::error::StatsError;
use crate::histogram::{self, BandedHistogram};

/// Initial value of `min`, large enough that the first real sample replaces it.
pub const MIN_SENTINEL: f64 = 1_000_000.0;

/// Histogram plus raw moments for one measured quantity.
///
/// Latencies are recorded in seconds and payload sizes in bytes. The
/// accumulator never stores individual samples: `add_sample` is O(1) and
/// does not allocate, and every statistic is derived from `count`, `sum`,
/// `sum_squares`, the extrema and the bucket counters.
#[derive(Debug, Clone)]
pub struct SampleAccumulator {
    count: u64,
    sum: f64,
    sum_squares: f64,
    min: f64,
    max: f64,
    histogram: BandedHistogram,
}

impl SampleAccumulator {
    /// Create an empty accumulator with the `min` sentinel in place.
    pub fn new() -> Self {
        Self {
            count: 0,
            sum: 0.0,
            sum_squares: 0.0,
            min: MIN_SENTINEL,
            max: 0.0,
            histogram: BandedHistogram::new(),
        }
    }

    /// Record one sample.
    ///
    /// The value is located in the histogram before anything is touched, so
    /// a rejected sample leaves the accumulator exactly as it was.
    pub fn add_sample(&mut self, value: f64) -> Result<(), StatsError> {
        let bucket = histogram::locate(value)?;

        self.count += 1;
        self.sum += value;
        self.sum_squares += value * value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.histogram.increment(bucket);
        Ok(())
    }

    /// Number of samples recorded since the last reset.
    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn sum(&self) -> f64 {
        self.sum
    }

    pub fn sum_squares(&self) -> f64 {
        self.sum_squares
    }

    /// Arithmetic mean, NaN for an empty accumulator.
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            return f64::NAN;
        }
        self.sum / self.count as f64
    }

    /// Unbiased sample standard deviation from the raw moments.
    ///
    /// NaN below two samples. Cancellation can push the numerator a hair
    /// below zero for near-constant input; that is clamped to zero.
    pub fn std_dev(&self) -> f64 {
        if self.count < 2 {
            return f64::NAN;
        }
        let n = self.count as f64;
        let numerator = (n * self.sum_squares - self.sum * self.sum).max(0.0);
        (numerator / (n * (n - 1.0))).sqrt()
    }

    /// Smallest sample, NaN for an empty accumulator.
    pub fn min(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.min
        }
    }

    /// Largest sample, NaN for an empty accumulator.
    pub fn max(&self) -> f64 {
        if self.count == 0 {
            f64::NAN
        } else {
            self.max
        }
    }

    /// Raw running minimum, including the sentinel when nothing was recorded.
    pub fn raw_min(&self) -> f64 {
        self.min
    }

    pub fn histogram(&self) -> &BandedHistogram {
        &self.histogram
    }

    /// Zero all moments and buckets and restore the `min` sentinel.
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.sum_squares = 0.0;
        self.min = MIN_SENTINEL;
        self.max = 0.0;
        self.histogram.clear();
    }
}

impl Default for SampleAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
