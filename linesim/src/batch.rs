//! Monte Carlo replications.
//!
//! A single run only gives one sample of the throughput of a stochastic line.
//! [`replicate`] runs independent replications of the same configuration in
//! parallel, replication `i` being seeded with `seed + i` (wrapping), and
//! summarizes their outcomes.

use std::num::NonZeroUsize;

use rayon::prelude::*;
use tracing::info;

use crate::config::LineConfig;
use crate::line::{self, Kpis, RunError};

/// Descriptive statistics of a set of samples.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Summary {
    /// Arithmetic mean.
    pub mean: f64,
    /// Sample standard deviation, or zero for a single sample.
    pub std_dev: f64,
    /// Smallest sample.
    pub min: f64,
    /// Largest sample.
    pub max: f64,
    /// Number of samples.
    pub count: usize,
}

impl Summary {
    /// Summarizes the samples, or returns `None` if there is none.
    pub fn from_samples(samples: &[f64]) -> Option<Self> {
        (!samples.is_empty()).then(|| Self::compute(samples))
    }

    fn compute(samples: &[f64]) -> Self {
        let count = samples.len();
        let n = count as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let std_dev = if count > 1 {
            let sum_sq: f64 = samples.iter().map(|x| (x - mean) * (x - mean)).sum();
            (sum_sq / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        Self {
            mean,
            std_dev,
            min,
            max,
            count,
        }
    }
}

/// Outcome of a batch of replications.
#[derive(Clone, Debug, PartialEq)]
pub struct BatchSummary {
    /// KPIs of each replication, in seed order.
    pub runs: Vec<Kpis>,
    /// Statistics of the completed count.
    pub completed: Summary,
    /// Statistics of the throughput per day.
    pub throughput: Summary,
}

/// Runs independent replications of the line in parallel.
pub fn replicate(
    config: &LineConfig,
    replications: NonZeroUsize,
) -> Result<BatchSummary, RunError> {
    config.validate()?;

    let runs = (0..replications.get())
        .into_par_iter()
        .map(|i| {
            let config = LineConfig {
                seed: config.seed.wrapping_add(i as u64),
                ..config.clone()
            };
            line::run(&config).map(|report| report.kpis)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let completed: Vec<f64> = runs.iter().map(|k| k.completed_count as f64).collect();
    let throughput: Vec<f64> = runs.iter().map(|k| k.throughput_per_day).collect();
    // Never empty since there is at least one replication.
    let completed = Summary::compute(&completed);
    let throughput = Summary::compute(&throughput);

    info!(
        replications = runs.len(),
        mean_throughput = throughput.mean,
        std_dev = throughput.std_dev,
        "batch completed"
    );

    Ok(BatchSummary {
        runs,
        completed,
        throughput,
    })
}
