//! Command-line front end of the capsule line simulator.
//!
//! Without arguments, a single run of the built-in line is performed and its
//! outcome is printed on stdout. Logs go to stderr.

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use linesim::batch;
use linesim::config::LineConfig;
use linesim::line;
use linesim::trace::SimulationTime;

/// Simulates a print, dry and scan capsule line and reports its throughput.
#[derive(Parser, Debug)]
#[command(name = "linesim", version, about, long_about = None)]
struct Args {
    /// TOML configuration file; missing fields take their built-in value
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Seed of the random stream
    #[arg(long)]
    seed: Option<u64>,

    /// Simulated duration, in hours
    #[arg(long, value_name = "HOURS")]
    hours: Option<f64>,

    /// Number of independent replications
    #[arg(short, long, default_value = "1")]
    replications: NonZeroUsize,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn init_logging(verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(match verbose {
            0 => "warn",
            1 => "linesim=info",
            2 => "linesim=debug",
            _ => "linesim=trace",
        })
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(SimulationTime::with_system_timer())
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut config = match &args.config {
        Some(path) => LineConfig::load(path)
            .with_context(|| format!("invalid configuration file {}", path.display()))?,
        None => LineConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(hours) = args.hours {
        config.horizon_hours = hours;
    }
    config.validate().context("invalid configuration")?;

    if args.replications.get() == 1 {
        let report = line::run(&config).context("simulation failed")?;

        println!("Good capsules: {}", report.kpis.completed_count);
        println!(
            "Throughput  : {:.1} caps / day",
            report.kpis.throughput_per_day
        );
    } else {
        let summary = batch::replicate(&config, args.replications).context("simulation failed")?;

        println!("Replications : {}", summary.runs.len());
        println!(
            "Good capsules: {:.1} ± {:.1} (min {}, max {})",
            summary.completed.mean,
            summary.completed.std_dev,
            summary.completed.min,
            summary.completed.max
        );
        println!(
            "Throughput  : {:.1} ± {:.1} caps / day",
            summary.throughput.mean, summary.throughput.std_dev
        );
    }

    Ok(())
}
