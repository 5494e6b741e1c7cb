//! Error types for the statistics engine.
//!
//! Degenerate statistics (an idle window, a single sample) are not errors:
//! they are reported as NaN. Everything in this module is a broken
//! precondition on the producer side, which the engine refuses to absorb
//! silently because a mis-bucketed sample corrupts every quantile computed
//! afterwards.

use crate::histogram::Band;
use thiserror::Error;

/// A sample or query the engine refused to accept.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum StatsError {
    /// Samples are durations or byte counts; negative values have no bucket.
    #[error("sample value {0} is negative")]
    NegativeSample(f64),

    /// NaN or infinity would poison the running moments.
    #[error("sample value {0} is not finite")]
    NonFiniteSample(f64),

    /// The computed bucket index fell outside its band.
    #[error("sample value {value} maps to bucket {bucket} outside the {band} band")]
    BucketOverflow {
        value: f64,
        band: Band,
        bucket: usize,
    },

    /// Quantiles are only defined on the open interval (0, 1).
    #[error("quantile {0} is outside the open interval (0, 1)")]
    InvalidQuantile(f64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            StatsError::NegativeSample(-1.5).to_string(),
            "sample value -1.5 is negative"
        );
        let overflow = StatsError::BucketOverflow {
            value: 5.0,
            band: Band::Milli,
            bucket: 50_000,
        };
        assert_eq!(
            overflow.to_string(),
            "sample value 5 maps to bucket 50000 outside the milli band"
        );
        assert!(StatsError::InvalidQuantile(1.0)
            .to_string()
            .contains("(0, 1)"));
    }
}
