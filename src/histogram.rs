//! # Banded Histogram
//!
//! Fixed-memory histogram made of three bands that cover increasing value
//! ranges at decreasing resolution. With latencies measured in seconds the
//! bands give 100ns buckets below one millisecond, 100µs buckets up to five
//! seconds and one-second buckets beyond that.
//!
//! ## Band Layout
//!
//! | band  | buckets | resolution | values          | bucket index            |
//! |-------|---------|------------|-----------------|-------------------------|
//! | micro | 10,000  | 1e-7       | [0, 0.001)      | `trunc(v * 1e7)`        |
//! | milli | 50,000  | 1e-4       | [0.001, 5.0)    | `trunc(v * 1e4)`        |
//! | full  | 1,000   | 1.0        | [5.0, 999)      | `trunc(v)`              |
//! | full  |         |            | [999, inf)      | `min(floor(v/1000),999)`|
//!
//! The milli band indexes from zero, so its first ten buckets are never
//! used. Values of 999 and above are folded into the full band by
//! thousands, which puts 999 itself into bucket 0 and everything from
//! 999,000 upwards into the last bucket. That folding is kept as-is so
//! reports stay comparable with existing load-generator output.
//!
//! Total footprint is 61,000 `u64` counters (~488 KiB), allocated once.

use crate::error::StatsError;
use std::fmt;

/// Number of buckets in the micro band.
pub const MICRO_BUCKETS: usize = 10_000;
/// Width of one micro bucket.
pub const MICRO_RESOLUTION: f64 = 1e-7;
/// Multiplier turning a micro-band value into its bucket index.
pub const MICRO_SCALE: f64 = 10_000_000.0;
/// Exclusive upper bound of the micro band.
pub const MICRO_LIMIT: f64 = 0.001;

/// Number of buckets in the milli band.
pub const MILLI_BUCKETS: usize = 50_000;
/// Width of one milli bucket.
pub const MILLI_RESOLUTION: f64 = 1e-4;
/// Multiplier turning a milli-band value into its bucket index.
pub const MILLI_SCALE: f64 = 10_000.0;
/// Exclusive upper bound of the milli band.
pub const MILLI_LIMIT: f64 = 5.0;

/// Number of buckets in the full band.
pub const FULL_BUCKETS: usize = 1_000;
/// Width of one full bucket.
pub const FULL_RESOLUTION: f64 = 1.0;
/// Values at or above this are folded by [`OVERFLOW_DIVISOR`].
pub const FULL_LIMIT: f64 = 999.0;
/// Divisor applied to values at or above [`FULL_LIMIT`].
pub const OVERFLOW_DIVISOR: f64 = 1000.0;

/// One of the three fixed-resolution sub-ranges of a [`BandedHistogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Band {
    Micro,
    Milli,
    Full,
}

impl Band {
    /// All bands in increasing value-range order.
    pub const ALL: [Band; 3] = [Band::Micro, Band::Milli, Band::Full];

    /// Number of buckets in this band.
    pub const fn bucket_count(self) -> usize {
        match self {
            Band::Micro => MICRO_BUCKETS,
            Band::Milli => MILLI_BUCKETS,
            Band::Full => FULL_BUCKETS,
        }
    }

    /// Width of a single bucket in this band.
    pub const fn resolution(self) -> f64 {
        match self {
            Band::Micro => MICRO_RESOLUTION,
            Band::Milli => MILLI_RESOLUTION,
            Band::Full => FULL_RESOLUTION,
        }
    }

    /// Upper boundary of bucket `index`, the value reported for a quantile
    /// that resolves inside it.
    pub fn upper_bound(self, index: usize) -> f64 {
        match self {
            Band::Full => (index + 1) as f64,
            band => (index + 1) as f64 * band.resolution(),
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Band::Micro => write!(f, "micro"),
            Band::Milli => write!(f, "milli"),
            Band::Full => write!(f, "full"),
        }
    }
}

/// Location of a sample inside a [`BandedHistogram`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketIndex {
    pub band: Band,
    pub index: usize,
}

/// Map a sample value to its band and bucket.
///
/// Pure range dispatch over the band constants. Fails for negative or
/// non-finite values and for any computed index that does not fit its band.
pub fn locate(value: f64) -> Result<BucketIndex, StatsError> {
    if !value.is_finite() {
        return Err(StatsError::NonFiniteSample(value));
    }
    if value < 0.0 {
        return Err(StatsError::NegativeSample(value));
    }

    let (band, index) = if value < MICRO_LIMIT {
        (Band::Micro, (value * MICRO_SCALE) as usize)
    } else if value < MILLI_LIMIT {
        (Band::Milli, (value * MILLI_SCALE) as usize)
    } else if value < FULL_LIMIT {
        (Band::Full, value as usize)
    } else {
        let folded = (value / OVERFLOW_DIVISOR).floor() as usize;
        (Band::Full, folded.min(FULL_BUCKETS - 1))
    };

    if index >= band.bucket_count() {
        return Err(StatsError::BucketOverflow {
            value,
            band,
            bucket: index,
        });
    }

    Ok(BucketIndex { band, index })
}

/// Three fixed-capacity bucket arrays, one per [`Band`].
#[derive(Debug, Clone)]
pub struct BandedHistogram {
    micro: Box<[u64]>,
    milli: Box<[u64]>,
    full: Box<[u64]>,
}

impl BandedHistogram {
    /// Allocate all bands zeroed. This is the only allocation the histogram
    /// ever makes.
    pub fn new() -> Self {
        Self {
            micro: vec![0; MICRO_BUCKETS].into_boxed_slice(),
            milli: vec![0; MILLI_BUCKETS].into_boxed_slice(),
            full: vec![0; FULL_BUCKETS].into_boxed_slice(),
        }
    }

    /// Count one sample at a previously located bucket.
    pub fn increment(&mut self, at: BucketIndex) {
        self.band_mut(at.band)[at.index] += 1;
    }

    /// Bucket counters of one band.
    pub fn band(&self, band: Band) -> &[u64] {
        match band {
            Band::Micro => &self.micro,
            Band::Milli => &self.milli,
            Band::Full => &self.full,
        }
    }

    fn band_mut(&mut self, band: Band) -> &mut [u64] {
        match band {
            Band::Micro => &mut self.micro,
            Band::Milli => &mut self.milli,
            Band::Full => &mut self.full,
        }
    }

    /// Count stored at a single bucket.
    pub fn count_at(&self, at: BucketIndex) -> u64 {
        self.band(at.band)[at.index]
    }

    /// Sum of every bucket in every band.
    pub fn total(&self) -> u64 {
        Band::ALL
            .iter()
            .map(|&band| self.band(band).iter().sum::<u64>())
            .sum()
    }

    /// Walk every bucket in increasing value order: micro, milli, then full.
    pub fn buckets(&self) -> impl Iterator<Item = (BucketIndex, u64)> + '_ {
        Band::ALL.into_iter().flat_map(move |band| {
            self.band(band)
                .iter()
                .enumerate()
                .map(move |(index, &count)| (BucketIndex { band, index }, count))
        })
    }

    /// Zero every counter without reallocating.
    pub fn clear(&mut self) {
        self.micro.fill(0);
        self.milli.fill(0);
        self.full.fill(0);
    }
}

impl Default for BandedHistogram {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(band: Band, index: usize) -> BucketIndex {
        BucketIndex { band, index }
    }

    #[test]
    fn test_locate_band_boundaries() {
        assert_eq!(locate(0.0).unwrap(), at(Band::Micro, 0));
        assert_eq!(locate(0.000_999_9).unwrap().band, Band::Micro);
        assert_eq!(locate(0.001).unwrap(), at(Band::Milli, 10));
        assert_eq!(locate(4.999_9).unwrap().band, Band::Milli);
        assert_eq!(locate(5.0).unwrap(), at(Band::Full, 5));
        assert_eq!(locate(998.5).unwrap(), at(Band::Full, 998));
    }

    #[test]
    fn test_locate_folds_large_values() {
        assert_eq!(locate(999.0).unwrap(), at(Band::Full, 0));
        assert_eq!(locate(1_500.0).unwrap(), at(Band::Full, 1));
        assert_eq!(locate(998_999.0).unwrap(), at(Band::Full, 998));
        assert_eq!(locate(999_000.0).unwrap(), at(Band::Full, 999));
        assert_eq!(locate(5.0e9).unwrap(), at(Band::Full, 999));
    }

    #[test]
    fn test_locate_rejects_invalid_values() {
        assert_eq!(locate(-0.5), Err(StatsError::NegativeSample(-0.5)));
        assert!(matches!(
            locate(f64::NAN),
            Err(StatsError::NonFiniteSample(_))
        ));
        assert!(matches!(
            locate(f64::INFINITY),
            Err(StatsError::NonFiniteSample(_))
        ));
    }

    #[test]
    fn test_upper_bound() {
        assert!((Band::Micro.upper_bound(0) - 1e-7).abs() < 1e-15);
        assert!((Band::Milli.upper_bound(20) - 0.0021).abs() < 1e-12);
        assert_eq!(Band::Full.upper_bound(41), 42.0);
    }

    #[test]
    fn test_histogram_increment_and_clear() {
        let mut hist = BandedHistogram::new();
        for value in [0.0005, 0.002, 0.002, 7.5, 2_000.0] {
            hist.increment(locate(value).unwrap());
        }

        assert_eq!(hist.total(), 5);
        assert_eq!(hist.count_at(locate(0.002).unwrap()), 2);
        assert_eq!(hist.band(Band::Full)[7], 1);
        assert_eq!(hist.band(Band::Full)[2], 1);

        hist.clear();
        assert_eq!(hist.total(), 0);
        assert_eq!(hist.band(Band::Milli).len(), MILLI_BUCKETS);
    }

    #[test]
    fn test_buckets_walk_in_band_order() {
        let hist = BandedHistogram::new();
        let bands: Vec<Band> = hist
            .buckets()
            .map(|(at, _)| at.band)
            .filter({
                let mut last = None;
                move |band| {
                    let changed = last != Some(*band);
                    last = Some(*band);
                    changed
                }
            })
            .collect();
        assert_eq!(bands, Band::ALL.to_vec());
        assert_eq!(
            hist.buckets().count(),
            MICRO_BUCKETS + MILLI_BUCKETS + FULL_BUCKETS
        );
    }
}
