//! # memload-stats - Main Entry Point
//!
//! Runs the statistics engine end to end against a synthetic workload:
//! 1. **Parse arguments** and validate them into a `StatsConfig`
//! 2. **Initialize logging** with tracing, to stderr or a log file
//! 3. **Start producers**: a fixed pool of worker threads recording into
//!    the shared window
//! 4. **Start the reporter** on its own thread, printing one table row per
//!    interval and optionally streaming JSON lines
//! 5. **Exit** with success once the configured run time has elapsed

use anyhow::{anyhow, Result};
use clap::Parser;
use memload_stats::{
    cli::{Args, StatsConfig},
    logging,
    utils::format_duration,
    workload::SyntheticWorkload,
    ConsoleSink, JsonLinesSink, MultiSink, ReportingScheduler, SchedulerExit, StatsWindow,
};
use tracing::info;

fn main() -> Result<()> {
    let args = Args::parse();
    // The guard flushes the non-blocking log writer on drop.
    let _log_guard = logging::init(args.verbose, args.log_file.as_deref())?;

    info!("Starting memload-stats {}", memload_stats::VERSION);
    let config = StatsConfig::from_args(&args)?;
    info!("Configuration: {:?}", config);

    let mut sink = MultiSink::new();
    sink.push(ConsoleSink::stdout());
    if let Some(ref path) = config.json_output {
        info!("Streaming window reports to: {:?}", path);
        sink.push(JsonLinesSink::create(path)?);
    }

    let window = StatsWindow::new();
    let workload = SyntheticWorkload::spawn(&config.workload_config(), window.clone())?;
    info!(
        "Started {} workers, mean service time {}",
        config.workers,
        format_duration(config.mean_latency)
    );

    let scheduler = ReportingScheduler::new(
        window,
        config.scheduler_config()?,
        workload.gauges(),
        Box::new(sink),
    );
    let (_stop, reporter) = scheduler.spawn()?;

    let exit = reporter
        .join()
        .map_err(|_| anyhow!("Reporting thread panicked"))??;
    let recorded = workload.shutdown();

    match exit {
        SchedulerExit::RunTimeElapsed { elapsed, intervals } => info!(
            "Finished after {} ({} intervals, {} operations)",
            format_duration(elapsed),
            intervals,
            recorded
        ),
        SchedulerExit::Stopped { intervals } => {
            info!("Stopped after {} intervals ({} operations)", intervals, recorded)
        }
    }
    Ok(())
}
