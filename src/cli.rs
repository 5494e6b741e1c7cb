use crate::scheduler::{RunLimit, SchedulerConfig};
use crate::utils;
use crate::workload::WorkloadConfig;
use anyhow::{bail, Result};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// memload-stats - windowed latency statistics for memcached-style load
#[derive(Parser, Debug, Clone)]
#[clap(version, about, long_about = None)]
pub struct Args {
    /// Total run time in seconds (0 or negative runs until interrupted)
    #[clap(
        short = 't',
        long,
        default_value_t = crate::defaults::RUN_TIME_SECS,
        allow_negative_numbers = true,
        help_heading = "Core Options"
    )]
    pub run_time: i64,

    /// Seconds between statistics reports (fractional values allowed)
    #[clap(
        short = 'S',
        long,
        default_value_t = crate::defaults::STATS_INTERVAL_SECS,
        help_heading = "Core Options"
    )]
    pub stats_interval: f64,

    /// Seconds to wait before the first reporting interval starts
    #[clap(long, default_value_t = crate::defaults::WARMUP_SECS, help_heading = "Core Options")]
    pub warmup: f64,

    /// Number of producer threads (defaults to one per core, at most 8)
    #[clap(short = 'T', long)]
    pub workers: Option<usize>,

    /// Stream every window report as a JSON line to this file
    #[clap(short = 'o', long)]
    pub json_output: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[clap(long)]
    pub log_file: Option<PathBuf>,

    /// Verbose output
    #[clap(short = 'v', long, default_value_t = false)]
    pub verbose: bool,

    /// Mean simulated service time in microseconds
    #[clap(
        long,
        default_value_t = crate::defaults::MEAN_LATENCY_US,
        help_heading = "Workload Options"
    )]
    pub mean_latency_us: u64,

    /// Fraction of operations that are gets
    #[clap(long, default_value_t = crate::defaults::GET_RATIO, help_heading = "Workload Options")]
    pub get_ratio: f64,

    /// Fraction of gets that hit
    #[clap(long, default_value_t = crate::defaults::HIT_RATIO, help_heading = "Workload Options")]
    pub hit_ratio: f64,

    /// Smallest payload returned by a hit, in bytes
    #[clap(
        long,
        default_value_t = crate::defaults::MIN_PAYLOAD_BYTES,
        help_heading = "Workload Options"
    )]
    pub min_payload: u32,

    /// Largest payload returned by a hit, in bytes
    #[clap(
        long,
        default_value_t = crate::defaults::MAX_PAYLOAD_BYTES,
        help_heading = "Workload Options"
    )]
    pub max_payload: u32,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            run_time: crate::defaults::RUN_TIME_SECS,
            stats_interval: crate::defaults::STATS_INTERVAL_SECS,
            warmup: crate::defaults::WARMUP_SECS,
            workers: None,
            json_output: None,
            log_file: None,
            verbose: false,
            mean_latency_us: crate::defaults::MEAN_LATENCY_US,
            get_ratio: crate::defaults::GET_RATIO,
            hit_ratio: crate::defaults::HIT_RATIO,
            min_payload: crate::defaults::MIN_PAYLOAD_BYTES,
            max_payload: crate::defaults::MAX_PAYLOAD_BYTES,
        }
    }
}

/// Validated configuration for one run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StatsConfig {
    /// Zero or negative means run forever.
    pub run_time_secs: i64,
    pub stats_interval: Duration,
    pub warmup: Duration,
    pub workers: usize,
    pub json_output: Option<PathBuf>,
    pub mean_latency: Duration,
    pub get_ratio: f64,
    pub hit_ratio: f64,
    pub payload_bytes: (u32, u32),
}

impl StatsConfig {
    /// Convert parsed arguments, rejecting values the engine cannot run with.
    pub fn from_args(args: &Args) -> Result<Self> {
        let stats_interval = utils::validate_interval(args.stats_interval)?;
        let warmup = utils::secs_to_duration(args.warmup, "Warm-up")?;
        let workers = args.workers.unwrap_or_else(utils::get_recommended_workers);
        utils::validate_workers(workers)?;
        utils::validate_ratio(args.get_ratio, "Get ratio")?;
        utils::validate_ratio(args.hit_ratio, "Hit ratio")?;
        if args.min_payload > args.max_payload {
            bail!(
                "Minimum payload {} exceeds maximum payload {}",
                args.min_payload,
                args.max_payload
            );
        }

        Ok(Self {
            run_time_secs: args.run_time,
            stats_interval,
            warmup,
            workers,
            json_output: args.json_output.clone(),
            mean_latency: Duration::from_micros(args.mean_latency_us),
            get_ratio: args.get_ratio,
            hit_ratio: args.hit_ratio,
            payload_bytes: (args.min_payload, args.max_payload),
        })
    }

    pub fn run_limit(&self) -> RunLimit {
        RunLimit::from_secs(self.run_time_secs)
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        SchedulerConfig::new(self.stats_interval, self.warmup, self.run_limit())
    }

    pub fn workload_config(&self) -> WorkloadConfig {
        WorkloadConfig {
            workers: self.workers,
            mean_latency: self.mean_latency,
            get_ratio: self.get_ratio,
            hit_ratio: self.hit_ratio,
            payload_bytes: self.payload_bytes,
        }
    }
}
