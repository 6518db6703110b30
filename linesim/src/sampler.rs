//! Random cycle times and scrap draws.
//!
//! All random draws of a run come from a single [`Sampler`], which wraps an
//! explicitly seeded random stream. Given the same seed and the same sequence
//! of draws, a run is reproduced bit for bit.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Triangular};

use crate::time::MINUTES_PER_HOUR;

/// A triangular cycle-time distribution, in minutes.
#[derive(Copy, Clone, Debug)]
pub struct CycleDistribution {
    minutes: Triangular<f64>,
}

impl CycleDistribution {
    /// Creates a triangular distribution over `[min, max]` peaking at `mode`,
    /// all in minutes.
    ///
    /// An error is returned unless all parameters are positive and finite and
    /// `min <= mode <= max`.
    pub fn new(min: f64, mode: f64, max: f64) -> Result<Self, CycleDistributionError> {
        if ![min, mode, max].iter().all(|v| v.is_finite() && *v > 0.0) {
            return Err(CycleDistributionError::NotPositive);
        }

        Triangular::new(min, max, mode)
            .map(|minutes| Self { minutes })
            .map_err(|_| CycleDistributionError::ModeOutOfRange)
    }
}

/// An error returned for inadmissible cycle-time parameters.
#[derive(Copy, Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CycleDistributionError {
    /// A parameter is zero, negative or not finite.
    #[error("all parameters should be positive and finite")]
    NotPositive,
    /// The mode lies outside `[min, max]`.
    #[error("the mode should lie within [min, max]")]
    ModeOutOfRange,
}

/// A shared source of random cycle times and scrap decisions.
///
/// Clones of a `Sampler` draw from the same underlying stream, which makes it
/// possible to chain several runs on a single stream. Independent runs should
/// each use their own `Sampler`.
#[derive(Clone)]
pub struct Sampler {
    rng: Rc<RefCell<StdRng>>,
}

impl Sampler {
    /// Creates a sampler from a seed.
    pub fn seed_from_u64(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    /// Creates a sampler from an existing random stream.
    pub fn from_rng(rng: StdRng) -> Self {
        Self {
            rng: Rc::new(RefCell::new(rng)),
        }
    }

    /// Draws a cycle time and returns it in hours.
    pub fn sample_duration(&self, cycle: &CycleDistribution) -> f64 {
        let minutes = cycle.minutes.sample(&mut *self.rng.borrow_mut());

        minutes / MINUTES_PER_HOUR
    }

    /// Draws a uniform number in `[0, 1)` and returns `true` if it lies below
    /// `probability`.
    ///
    /// A number is drawn whatever the probability, so the sequence of draws
    /// does not depend on it.
    pub fn sample_scrap(&self, probability: f64) -> bool {
        let u: f64 = self.rng.borrow_mut().gen();

        u < probability
    }
}

impl fmt::Debug for Sampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sampler").finish_non_exhaustive()
    }
}
