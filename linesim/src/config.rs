//! Line configuration.
//!
//! A [`LineConfig`] gathers all the parameters of a run. It can be built in
//! code, starting for instance from the built-in defaults, or loaded from a
//! TOML document in which every field is optional:
//!
//! ```
//! use linesim::config::LineConfig;
//!
//! let config = LineConfig::from_toml_str(
//!     r#"
//!     horizon_hours = 48.0
//!     dryers = 2
//!     seed = 7
//!
//!     [dry]
//!     min = 40.0
//!     mode = 50.0
//!     max = 80.0
//!     "#,
//! )
//! .unwrap();
//!
//! assert_eq!(config.dryers, 2);
//! assert_eq!(config.scanners, LineConfig::default().scanners);
//! ```
//!
//! Configurations must be validated with [`LineConfig::validate`] before a
//! simulation is started; [`LineConfig::from_toml_str`] and
//! [`LineConfig::load`] validate automatically.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::sampler::{CycleDistribution, CycleDistributionError};
use crate::time::SimTime;

/// A stage of the line.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    /// Capsule printing.
    Printer,
    /// Capsule drying.
    Dryer,
    /// CT scanning.
    Scanner,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Printer => "printer",
            Self::Dryer => "dryer",
            Self::Scanner => "scanner",
        })
    }
}

/// Triangular cycle-time parameters, in minutes.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CycleTime {
    /// Shortest cycle time.
    pub min: f64,
    /// Most likely cycle time.
    pub mode: f64,
    /// Longest cycle time.
    pub max: f64,
}

impl CycleTime {
    /// Creates cycle-time parameters.
    pub const fn new(min: f64, mode: f64, max: f64) -> Self {
        Self { min, mode, max }
    }

    /// Creates parameters of a constant cycle time.
    pub const fn fixed(minutes: f64) -> Self {
        Self::new(minutes, minutes, minutes)
    }

    /// Checks that all parameters are positive and finite and that
    /// `min <= mode <= max`.
    pub fn validate(&self, stage: Stage) -> Result<(), ConfigError> {
        self.distribution(stage).map(|_| ())
    }

    /// Returns the corresponding distribution after validating the
    /// parameters.
    pub fn distribution(&self, stage: Stage) -> Result<CycleDistribution, ConfigError> {
        CycleDistribution::new(self.min, self.mode, self.max).map_err(|reason| {
            ConfigError::InvalidCycleTime {
                stage,
                min: self.min,
                mode: self.mode,
                max: self.max,
                reason,
            }
        })
    }
}

/// Parameters of a simulation run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LineConfig {
    /// Simulated duration, in hours.
    pub horizon_hours: f64,
    /// Number of printers, each running its own printing loop.
    pub printers: usize,
    /// Number of drying slots.
    pub dryers: usize,
    /// Number of scanning slots.
    pub scanners: usize,
    /// Printing cycle time.
    pub print: CycleTime,
    /// Drying cycle time.
    pub dry: CycleTime,
    /// Scanning cycle time.
    pub scan: CycleTime,
    /// Probability that a printed capsule is scrapped, within `[0, 1]`.
    pub scrap_probability: f64,
    /// Seed of the random stream.
    pub seed: u64,
}

impl LineConfig {
    /// Checks all parameters, reporting the first invalid one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.horizon_hours.is_finite() && self.horizon_hours > 0.0) {
            return Err(ConfigError::InvalidHorizon(self.horizon_hours));
        }
        for stage in [Stage::Printer, Stage::Dryer, Stage::Scanner] {
            if self.capacity(stage) == 0 {
                return Err(ConfigError::ZeroCapacity { stage });
            }
        }
        for stage in [Stage::Printer, Stage::Dryer, Stage::Scanner] {
            self.cycle_time(stage).validate(stage)?;
        }
        if !(0.0..=1.0).contains(&self.scrap_probability) {
            return Err(ConfigError::InvalidScrapProbability(
                self.scrap_probability,
            ));
        }

        Ok(())
    }

    /// Returns the number of units of the specified stage.
    pub fn capacity(&self, stage: Stage) -> usize {
        match stage {
            Stage::Printer => self.printers,
            Stage::Dryer => self.dryers,
            Stage::Scanner => self.scanners,
        }
    }

    /// Returns the cycle time of the specified stage.
    pub fn cycle_time(&self, stage: Stage) -> &CycleTime {
        match stage {
            Stage::Printer => &self.print,
            Stage::Dryer => &self.dry,
            Stage::Scanner => &self.scan,
        }
    }

    /// Returns the horizon as a simulation timestamp.
    pub fn horizon(&self) -> Result<SimTime, ConfigError> {
        SimTime::try_from_hours(self.horizon_hours)
            .filter(|h| *h > SimTime::ZERO)
            .ok_or(ConfigError::InvalidHorizon(self.horizon_hours))
    }

    /// Parses and validates a TOML configuration.
    pub fn from_toml_str(s: &str) -> Result<Self, LoadError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;

        Ok(config)
    }

    /// Reads, parses and validates a TOML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, LoadError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Self::from_toml_str(&content)
    }
}

impl Default for LineConfig {
    /// The reference line: one printer, one dryer and one scanner run for a
    /// day with a 5% scrap rate.
    fn default() -> Self {
        Self {
            horizon_hours: 24.0,
            printers: 1,
            dryers: 1,
            scanners: 1,
            print: CycleTime::new(45.0, 55.0, 70.0),
            dry: CycleTime::new(40.0, 50.0, 80.0),
            scan: CycleTime::new(10.0, 12.0, 15.0),
            scrap_probability: 0.05,
            seed: 42,
        }
    }
}

/// An invalid configuration parameter.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// The horizon is not a positive, finite number of hours.
    #[error("the simulation horizon should be a positive, finite number of hours (got {0})")]
    InvalidHorizon(f64),
    /// A stage has no unit.
    #[error("the {stage} count should be at least 1")]
    ZeroCapacity {
        /// Offending stage.
        stage: Stage,
    },
    /// Cycle-time parameters are not admissible.
    #[error("invalid {stage} cycle time (min={min}, mode={mode}, max={max}): {reason}")]
    InvalidCycleTime {
        /// Offending stage.
        stage: Stage,
        /// Shortest cycle time.
        min: f64,
        /// Most likely cycle time.
        mode: f64,
        /// Longest cycle time.
        max: f64,
        /// Violated constraint.
        #[source]
        reason: CycleDistributionError,
    },
    /// The scrap probability lies outside `[0, 1]`.
    #[error("the scrap probability should lie within [0, 1] (got {0})")]
    InvalidScrapProbability(f64),
}

/// An error returned when loading a configuration.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// The configuration file could not be read.
    #[error("could not read {path}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The document is not a valid TOML configuration.
    #[error("could not parse the configuration: {0}")]
    Parse(#[from] toml::de::Error),
    /// The document was parsed but a parameter is invalid.
    #[error(transparent)]
    Invalid(#[from] ConfigError),
}
