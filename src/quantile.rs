//! Approximate quantiles over a [`SampleAccumulator`]'s histogram bands.
//!
//! The estimate is the upper edge of the bucket where the cumulative count
//! first reaches the target rank, so its error is bounded by that band's
//! resolution: 100ns in the micro band, 100µs in the milli band and one
//! unit (or worse, near the folded overflow buckets) in the full band.

use crate::error::StatsError;
use crate::metrics::SampleAccumulator;
use serde::{Deserialize, Serialize};

/// Returned when the bucket walk never reaches the target rank.
pub const QUANTILE_FALLBACK: f64 = 1000.0;

/// A quantile on the open interval (0, 1).
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Quantile(f64);

impl Quantile {
    pub const P50: Quantile = Quantile(0.50);
    pub const P90: Quantile = Quantile(0.90);
    pub const P95: Quantile = Quantile(0.95);
    pub const P99: Quantile = Quantile(0.99);

    pub fn new(q: f64) -> Result<Self, StatsError> {
        if q > 0.0 && q < 1.0 {
            Ok(Self(q))
        } else {
            Err(StatsError::InvalidQuantile(q))
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Quantile {
    type Error = StatsError;

    fn try_from(q: f64) -> Result<Self, Self::Error> {
        Self::new(q)
    }
}

impl From<Quantile> for f64 {
    fn from(q: Quantile) -> f64 {
        q.0
    }
}

/// Approximate the `q` quantile of the samples in `acc`.
///
/// The target rank is `floor(count * q)` taken from `acc` itself. Buckets
/// are walked micro, milli, full with one running total across all three.
/// An empty accumulator yields NaN.
pub fn find_quantile(acc: &SampleAccumulator, q: Quantile) -> f64 {
    let count = acc.count();
    if count == 0 {
        return f64::NAN;
    }

    let rank = (count as f64 * q.value()).floor() as u64;
    let mut running = 0u64;
    for (at, bucket_count) in acc.histogram().buckets() {
        running += bucket_count;
        if running >= rank {
            return at.band.upper_bound(at.index);
        }
    }

    QUANTILE_FALLBACK
}
