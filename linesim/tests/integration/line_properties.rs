//! Properties of the line checked over random configurations and seeds.

use std::collections::HashSet;

use proptest::prelude::*;

use linesim::config::{CycleTime, LineConfig};
use linesim::line;

use crate::line_scenarios::scanner_bound_line;

fn arb_cycle_time() -> impl Strategy<Value = CycleTime> {
    (1.0..60.0f64, 0.0..30.0f64, 0.0..30.0f64).prop_map(|(min, to_mode, to_max)| {
        CycleTime::new(min, min + to_mode, min + to_mode + to_max)
    })
}

fn arb_config() -> impl Strategy<Value = LineConfig> {
    (
        1.0..48.0f64,
        (1..4usize, 1..4usize, 1..4usize),
        (arb_cycle_time(), arb_cycle_time(), arb_cycle_time()),
        0.0..=1.0f64,
        any::<u64>(),
    )
        .prop_map(|(horizon_hours, capacities, cycle_times, scrap_probability, seed)| {
            let (printers, dryers, scanners) = capacities;
            let (print, dry, scan) = cycle_times;

            LineConfig {
                horizon_hours,
                printers,
                dryers,
                scanners,
                print,
                dry,
                scan,
                scrap_probability,
                seed,
            }
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn conservation(config in arb_config()) {
        let report = line::run(&config).unwrap();
        let kpis = report.kpis;

        prop_assert_eq!(kpis.printed, kpis.good + kpis.scrapped);
        prop_assert_eq!(kpis.good, kpis.completed_count + kpis.in_flight);
        prop_assert!(kpis.printed <= kpis.started);
        // Each printer has at most one capsule in print.
        prop_assert!(kpis.started - kpis.printed <= config.printers as u64);
        prop_assert_eq!(report.completion_log.len() as u64, kpis.completed_count);
    }

    #[test]
    fn capacity_is_respected(config in arb_config()) {
        let report = line::run(&config).unwrap();

        prop_assert!(report.dryer.peak_in_use <= config.dryers);
        prop_assert!(report.scanner.peak_in_use <= config.scanners);
        prop_assert!(report.dryer.utilization() <= 1.0 + 1e-9);
        prop_assert!(report.scanner.utilization() <= 1.0 + 1e-9);
        prop_assert!(report.dryer.grants >= report.scanner.grants);
    }

    #[test]
    fn completed_entities_are_unique(config in arb_config()) {
        let report = line::run(&config).unwrap();

        let mut seen = HashSet::new();
        for id in &report.completion_log {
            prop_assert!(seen.insert(*id), "entity {} completed twice", id);
        }
    }

    #[test]
    fn runs_are_reproducible(config in arb_config()) {
        prop_assert_eq!(line::run(&config).unwrap(), line::run(&config).unwrap());
    }

    #[test]
    fn flow_time_is_bounded_below(config in arb_config()) {
        let report = line::run(&config).unwrap();

        if let Some(flow) = report.kpis.mean_flow_hours {
            let fastest = (config.print.min + config.dry.min + config.scan.min) / 60.0;
            prop_assert!(flow >= fastest - 1e-9);
            prop_assert!(flow <= config.horizon_hours + 1e-9);
        }
    }

    #[test]
    fn extra_scanner_never_reduces_output(seed in any::<u64>()) {
        let base = scanner_bound_line(seed);
        let doubled = LineConfig {
            scanners: 2,
            ..base.clone()
        };

        let base = line::run(&base).unwrap();
        let doubled = line::run(&doubled).unwrap();

        prop_assert!(base.scanner.peak_queue_len > 0);
        prop_assert!(doubled.kpis.completed_count >= base.kpis.completed_count);
    }
}
