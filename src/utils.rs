//! # Utility Functions
//!
//! Small helpers shared by the configuration layer and the binary:
//! converting fractional-second options into `Duration`s, validating
//! user-supplied parameters with clear error messages, and formatting
//! durations for log output.

use anyhow::{bail, Result};
use std::time::Duration;

/// Upper bound on the worker count accepted from the command line.
pub const MAX_WORKERS: usize = 1024;

/// Convert a fractional number of seconds into a `Duration`
///
/// Reporting intervals and warm-up delays are configured in seconds with
/// sub-second precision (e.g. `0.25`).
///
/// ## Parameters
/// - `secs`: Number of seconds, may be fractional
/// - `name`: Option name used in the error message
///
/// ## Errors
///
/// Fails for negative, NaN, infinite or out-of-range values.
pub fn secs_to_duration(secs: f64, name: &str) -> Result<Duration> {
    if !secs.is_finite() || secs < 0.0 {
        bail!("{} must be a non-negative number of seconds, got {}", name, secs);
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Ok(duration),
        Err(_) => bail!("{} of {} seconds is out of range", name, secs),
    }
}

/// Validate the reporting interval
///
/// The interval must be strictly positive: a zero interval would make the
/// reporting thread spin on the window lock.
pub fn validate_interval(secs: f64) -> Result<Duration> {
    let interval = secs_to_duration(secs, "Reporting interval")?;
    if interval.is_zero() {
        bail!("Reporting interval must be greater than zero");
    }
    Ok(interval)
}

/// Validate the number of producer threads
///
/// ## Validation Rules
///
/// - **Minimum**: 1 worker
/// - **Maximum**: [`MAX_WORKERS`] workers
pub fn validate_workers(workers: usize) -> Result<()> {
    if workers == 0 {
        bail!("Worker count cannot be zero");
    }
    if workers > MAX_WORKERS {
        bail!("Worker count {} is too high (maximum {})", workers, MAX_WORKERS);
    }
    Ok(())
}

/// Validate a probability-like ratio in `[0, 1]`.
pub fn validate_ratio(ratio: f64, name: &str) -> Result<()> {
    if !(0.0..=1.0).contains(&ratio) {
        bail!("{} must be within [0, 1], got {}", name, ratio);
    }
    Ok(())
}

/// Number of logical CPU cores available to the process.
pub fn get_cpu_cores() -> usize {
    num_cpus::get()
}

/// Default worker count: one per core, capped at 8.
pub fn get_recommended_workers() -> usize {
    get_cpu_cores().clamp(1, 8)
}

/// Format a duration for log output
///
/// ## Examples
///
/// ```rust
/// # use memload_stats::utils::format_duration;
/// # use std::time::Duration;
/// assert_eq!(format_duration(Duration::from_nanos(750)), "750ns");
/// assert_eq!(format_duration(Duration::from_micros(2500)), "2.50ms");
/// assert_eq!(format_duration(Duration::from_secs(90)), "1m 30s");
/// ```
pub fn format_duration(duration: Duration) -> String {
    let total_ns = duration.as_nanos();

    if total_ns < 1_000 {
        format!("{}ns", total_ns)
    } else if total_ns < 1_000_000 {
        format!("{:.2}μs", total_ns as f64 / 1_000.0)
    } else if total_ns < 1_000_000_000 {
        format!("{:.2}ms", total_ns as f64 / 1_000_000.0)
    } else if total_ns < 60_000_000_000 {
        format!("{:.2}s", total_ns as f64 / 1_000_000_000.0)
    } else {
        let seconds = duration.as_secs();
        let minutes = seconds / 60;
        let remaining_seconds = seconds % 60;

        if minutes < 60 {
            format!("{}m {}s", minutes, remaining_seconds)
        } else {
            let hours = minutes / 60;
            let remaining_minutes = minutes % 60;
            format!("{}h {}m {}s", hours, remaining_minutes, remaining_seconds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_secs_to_duration() {
        assert_eq!(secs_to_duration(0.25, "x").unwrap(), Duration::from_millis(250));
        assert_eq!(secs_to_duration(0.0, "x").unwrap(), Duration::ZERO);
        assert!(secs_to_duration(-1.0, "x").is_err());
        assert!(secs_to_duration(f64::NAN, "x").is_err());
        assert!(secs_to_duration(f64::INFINITY, "x").is_err());
    }

    #[test]
    fn test_validate_interval() {
        assert_eq!(validate_interval(1.5).unwrap(), Duration::from_millis(1500));
        assert!(validate_interval(0.0).is_err());
        assert!(validate_interval(-0.5).is_err());
    }

    #[test]
    fn test_validate_workers() {
        assert!(validate_workers(1).is_ok());
        assert!(validate_workers(MAX_WORKERS).is_ok());
        assert!(validate_workers(0).is_err());
        assert!(validate_workers(MAX_WORKERS + 1).is_err());
    }

    #[test]
    fn test_validate_ratio() {
        assert!(validate_ratio(0.0, "r").is_ok());
        assert!(validate_ratio(1.0, "r").is_ok());
        assert!(validate_ratio(1.01, "r").is_err());
        assert!(validate_ratio(f64::NAN, "r").is_err());
    }

    #[test]
    fn test_get_recommended_workers() {
        let workers = get_recommended_workers();
        assert!(workers > 0);
        assert!(workers <= 8);
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_nanos(500)), "500ns");
        assert_eq!(format_duration(Duration::from_nanos(1500)), "1.50μs");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }
}
