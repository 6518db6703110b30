//! The print, dry and scan capsule line.
//!
//! [`run`] simulates the line described by a [`LineConfig`] up to its horizon
//! and returns a [`RunReport`] with the key performance indicators of the run.
//!
//! Each printer runs an endless loop: it starts a new capsule, prints it for a
//! random duration and then either scraps it or hands it over to a dryer
//! process. The dryer process waits for a free drying slot, dries the capsule,
//! frees the slot and hands the capsule over to a scanner process, which in
//! turn waits for a free scanning slot and scans the capsule. A capsule is
//! completed when its scan is over.
//!
//! Capsules still in the dryer or scanner stage when the horizon is reached
//! are reported as in flight.
//!
//! # Examples
//!
//! ```
//! use linesim::config::LineConfig;
//! use linesim::line;
//!
//! let report = line::run(&LineConfig::default()).unwrap();
//! let kpis = report.kpis;
//!
//! assert_eq!(kpis.printed, kpis.good + kpis.scrapped);
//! assert_eq!(kpis.good, kpis.completed_count + kpis.in_flight);
//! println!("throughput: {:.1} caps / day", kpis.throughput_per_day);
//! ```
mod entity;
mod stages;

pub use entity::{Entity, EntityId};

use std::rc::Rc;

use tracing::info;

use crate::config::{ConfigError, LineConfig, Stage};
use crate::resource::ResourceStats;
use crate::sampler::Sampler;
use crate::simulation::{ExecutionError, Simulation};
use crate::time::{SimTime, HOURS_PER_DAY};

use stages::{Line, Process};

/// Key performance indicators of a run.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Kpis {
    /// Number of capsules whose scan was completed.
    pub completed_count: u64,
    /// Completed capsules per simulated day.
    pub throughput_per_day: f64,
    /// Number of capsules whose printing was started.
    pub started: u64,
    /// Number of capsules whose printing was completed.
    pub printed: u64,
    /// Number of printed capsules that were scrapped.
    pub scrapped: u64,
    /// Number of printed capsules handed over to the dryer stage.
    pub good: u64,
    /// Number of good capsules not completed by the horizon.
    pub in_flight: u64,
    /// Mean time from print start to scan completion, in hours, or `None` if
    /// no capsule was completed.
    pub mean_flow_hours: Option<f64>,
}

/// Outcome of a run.
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Key performance indicators.
    pub kpis: Kpis,
    /// Identifiers of the completed capsules in completion order.
    pub completion_log: Vec<EntityId>,
    /// Usage of the drying slots.
    pub dryer: ResourceStats,
    /// Usage of the scanning slots.
    pub scanner: ResourceStats,
    /// Number of events processed during the run.
    pub executed_events: u64,
    /// Simulation time at the end of the run.
    pub end_time: SimTime,
}

/// An error which prevented a run from completing.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum RunError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The simulation was aborted.
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// Simulates the line with a random stream seeded from the configuration.
pub fn run(config: &LineConfig) -> Result<RunReport, RunError> {
    run_with_sampler(config, Sampler::seed_from_u64(config.seed))
}

/// Simulates the line, drawing all random numbers from the provided sampler.
///
/// The `seed` field of the configuration is ignored.
pub fn run_with_sampler(config: &LineConfig, sampler: Sampler) -> Result<RunReport, RunError> {
    config.validate()?;
    let horizon = config.horizon()?;
    let process = Process {
        print: config.print.distribution(Stage::Printer)?,
        dry: config.dry.distribution(Stage::Dryer)?,
        scan: config.scan.distribution(Stage::Scanner)?,
        scrap_probability: config.scrap_probability,
    };

    let mut simu = Simulation::new();
    let line = Rc::new(Line::new(
        simu.context(),
        sampler,
        process,
        config.dryers,
        config.scanners,
    ));
    for printer in 0..config.printers {
        simu.spawn(stages::printer(line.clone(), printer));
    }

    simu.step_until(horizon)?;

    let report = report(&line, &simu, config.horizon_hours);
    info!(
        completed = report.kpis.completed_count,
        scrapped = report.kpis.scrapped,
        in_flight = report.kpis.in_flight,
        throughput_per_day = report.kpis.throughput_per_day,
        "run completed"
    );

    Ok(report)
}

fn report(line: &Line, simu: &Simulation, horizon_hours: f64) -> RunReport {
    let completion_log = line.completion_log.borrow().clone();
    let completed_count = completion_log.len() as u64;
    let good = line.counters.good.get();
    let mean_flow_hours = (completed_count > 0)
        .then(|| line.counters.flow_hours.get() / completed_count as f64);

    let kpis = Kpis {
        completed_count,
        throughput_per_day: completed_count as f64 / (horizon_hours / HOURS_PER_DAY),
        started: line.entities.borrow().created(),
        printed: line.counters.printed.get(),
        scrapped: line.counters.scrapped.get(),
        good,
        in_flight: good - completed_count,
        mean_flow_hours,
    };

    RunReport {
        kpis,
        completion_log,
        dryer: line.dryer.stats(),
        scanner: line.scanner.stats(),
        executed_events: simu.executed_events(),
        end_time: simu.time(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CycleTime;

    fn fixed_line(print: f64, dry: f64, scan: f64, horizon_hours: f64) -> LineConfig {
        LineConfig {
            horizon_hours,
            print: CycleTime::fixed(print),
            dry: CycleTime::fixed(dry),
            scan: CycleTime::fixed(scan),
            scrap_probability: 0.0,
            ..LineConfig::default()
        }
    }

    #[test]
    fn line_fixed_cycle_times() {
        let report = run(&fixed_line(60.0, 30.0, 10.0, 10.0)).unwrap();
        let kpis = report.kpis;

        // Prints end at 1h, 2h, ..., 10h; the last capsule is still drying.
        assert_eq!(kpis.started, 11);
        assert_eq!(kpis.printed, 10);
        assert_eq!(kpis.good, 10);
        assert_eq!(kpis.scrapped, 0);
        assert_eq!(kpis.completed_count, 9);
        assert_eq!(kpis.in_flight, 1);
        assert!((kpis.throughput_per_day - 21.6).abs() < 1e-9);
        assert_eq!(report.end_time, SimTime::from_hours(10.0));
        assert_eq!(
            report.completion_log,
            (0..9).map(EntityId::new).collect::<Vec<_>>()
        );

        let flow = kpis.mean_flow_hours.unwrap();
        assert!((flow - 100.0 / 60.0).abs() < 1e-9);
    }

    #[test]
    fn line_dryer_bottleneck() {
        // A new capsule every 30min, but drying takes 60min.
        let report = run(&fixed_line(30.0, 60.0, 6.0, 6.0)).unwrap();

        assert_eq!(report.kpis.printed, 12);
        assert_eq!(report.dryer.peak_in_use, 1);
        assert!(report.dryer.peak_queue_len > 1);
        assert!(report.kpis.completed_count < 6);
        assert!(report.dryer.utilization() > 0.8);
    }

    #[test]
    fn line_parallel_dryers() {
        let mut config = fixed_line(30.0, 60.0, 6.0, 6.0);
        config.dryers = 2;
        let report = run(&config).unwrap();

        assert_eq!(report.dryer.peak_in_use, 2);
        assert_eq!(report.dryer.peak_queue_len, 0);
        // Capsules printed at 0.5h, 1h, ..., 4.5h complete by 6h.
        assert_eq!(report.kpis.completed_count, 9);
    }

    #[test]
    fn line_rejects_invalid_config() {
        let config = LineConfig {
            printers: 0,
            ..LineConfig::default()
        };

        assert_eq!(
            run(&config),
            Err(RunError::Config(ConfigError::ZeroCapacity {
                stage: Stage::Printer
            }))
        );
    }

    #[test]
    fn line_chained_runs_share_stream() {
        let config = LineConfig::default();
        let sampler = Sampler::seed_from_u64(config.seed);

        let first = run_with_sampler(&config, sampler.clone()).unwrap();
        let second = run_with_sampler(&config, sampler).unwrap();

        assert_eq!(first, run(&config).unwrap());
        assert_ne!(first.completion_log.len(), 0);
        assert_ne!(first.executed_events, 0);
        assert_eq!(second.end_time, first.end_time);
    }
}
