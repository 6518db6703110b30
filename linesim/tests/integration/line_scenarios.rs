//! End-to-end runs of the capsule line.

use std::num::NonZeroUsize;

use linesim::batch;
use linesim::config::{CycleTime, LineConfig, LoadError};
use linesim::line::{self, EntityId};

#[test]
fn line_reference_scenario() {
    let config = LineConfig::default();
    assert_eq!(config.seed, 42);
    assert_eq!(config.horizon_hours, 24.0);

    let report = line::run(&config).unwrap();
    let kpis = report.kpis;

    assert_eq!(kpis.completed_count, 22);
    assert_eq!(kpis.printed, 25);
    assert_eq!(kpis.scrapped, 1);
    assert_eq!(kpis.good, 24);
    assert_eq!(kpis.in_flight, 2);
    assert_eq!(kpis.started, kpis.printed + 1);
    // Over one day the throughput is the completed count.
    assert_eq!(kpis.throughput_per_day, 22.0);

    // With a single dryer and scanner, capsules complete in creation order:
    // the log holds the 22 oldest of the 24 good capsules among #0..#24.
    let log: Vec<u64> = report.completion_log.iter().map(|id| id.as_u64()).collect();
    assert_eq!(log.len(), 22);
    assert!(log.windows(2).all(|w| w[0] < w[1]));
    for (i, id) in log.iter().enumerate() {
        assert!(*id == i as u64 || *id == i as u64 + 1, "{log:?}");
    }
    let missing: Vec<u64> = (0..25).filter(|id| !log.contains(id)).collect();
    assert_eq!(missing.len(), 3, "{missing:?}");
    assert_eq!(missing[2], 24);
}

#[test]
fn line_is_deterministic() {
    let config = LineConfig {
        seed: 2024,
        dryers: 2,
        printers: 3,
        ..LineConfig::default()
    };

    let a = line::run(&config).unwrap();
    let b = line::run(&config).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.completion_log, b.completion_log);
}

#[test]
fn line_zero_scrap() {
    let config = LineConfig {
        horizon_hours: 10.5,
        print: CycleTime::fixed(60.0),
        dry: CycleTime::fixed(10.0),
        scan: CycleTime::fixed(10.0),
        scrap_probability: 0.0,
        ..LineConfig::default()
    };

    let kpis = line::run(&config).unwrap().kpis;

    assert_eq!(kpis.printed, 10);
    assert_eq!(kpis.scrapped, 0);
    assert_eq!(kpis.completed_count, kpis.printed);
    assert_eq!(kpis.in_flight, 0);
}

#[test]
fn line_full_scrap() {
    let config = LineConfig {
        scrap_probability: 1.0,
        ..LineConfig::default()
    };

    let report = line::run(&config).unwrap();

    assert_eq!(report.kpis.completed_count, 0);
    assert_eq!(report.kpis.throughput_per_day, 0.0);
    assert_eq!(report.kpis.scrapped, report.kpis.printed);
    assert_eq!(report.kpis.mean_flow_hours, None);
    assert!(report.completion_log.is_empty());
    assert_eq!(report.dryer.grants, 0);
    assert_eq!(report.scanner.grants, 0);
}

/// A line whose scanner is the bottleneck.
pub(crate) fn scanner_bound_line(seed: u64) -> LineConfig {
    LineConfig {
        seed,
        printers: 3,
        dryers: 3,
        scan: CycleTime::new(20.0, 30.0, 60.0),
        ..LineConfig::default()
    }
}

#[test]
fn line_extra_scanner_never_reduces_output() {
    for seed in [1, 42, 1337, 9001] {
        let base = scanner_bound_line(seed);
        let doubled = LineConfig {
            scanners: 2,
            ..base.clone()
        };

        let base = line::run(&base).unwrap();
        let doubled = line::run(&doubled).unwrap();

        // Capsules do queue for the scanner.
        assert!(base.scanner.peak_queue_len > 0);
        assert_eq!(doubled.scanner.peak_in_use, 2);
        assert!(doubled.kpis.completed_count >= base.kpis.completed_count);
    }
}

#[test]
fn line_completion_log_is_per_run() {
    let config = LineConfig::default();

    let first = line::run(&config).unwrap();
    let second = line::run(&config).unwrap();

    assert_eq!(first.completion_log, second.completion_log);
    assert!(first
        .completion_log
        .iter()
        .all(|id| *id < EntityId::new(first.kpis.started)));
}

#[test]
fn line_config_from_file() {
    let path = std::env::temp_dir().join(format!("linesim-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        r#"
        horizon_hours = 48.0
        scanners = 2
        seed = 5

        [print]
        min = 50.0
        mode = 55.0
        max = 60.0
        "#,
    )
    .unwrap();

    let config = LineConfig::load(&path);
    std::fs::remove_file(&path).unwrap();
    let config = config.unwrap();

    assert_eq!(config.horizon_hours, 48.0);
    assert_eq!(config.scanners, 2);
    assert_eq!(config.print, CycleTime::new(50.0, 55.0, 60.0));
    assert_eq!(config.dry, LineConfig::default().dry);

    let kpis = line::run(&config).unwrap().kpis;
    assert_eq!(kpis.throughput_per_day, kpis.completed_count as f64 / 2.0);
}

#[test]
fn line_config_file_errors() {
    let err = LineConfig::from_toml_str("scrap_probability = 2.0").unwrap_err();
    assert!(matches!(err, LoadError::Invalid(_)));
    assert_eq!(
        err.to_string(),
        "the scrap probability should lie within [0, 1] (got 2)"
    );

    let err = LineConfig::from_toml_str("printers = \"one\"").unwrap_err();
    assert!(matches!(err, LoadError::Parse(_)));
}

#[test]
fn line_batch_is_reproducible() {
    let config = LineConfig::default();
    let replications = NonZeroUsize::new(8).unwrap();

    let a = batch::replicate(&config, replications).unwrap();
    let b = batch::replicate(&config, replications).unwrap();

    assert_eq!(a, b);
    assert_eq!(a.runs[0], line::run(&config).unwrap().kpis);
    assert!(a.throughput.min <= a.throughput.mean && a.throughput.mean <= a.throughput.max);
    assert_eq!(a.completed.count, 8);
}
