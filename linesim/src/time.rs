//! Simulation time.
//!
//! Simulation time is expressed in hours, the unit in which line cycle times
//! are accumulated once converted from their natural unit (minutes).
//!
//! [`SimTime`] is a thin wrapper over an `f64` that provides the total order
//! required by the event queue. Only finite, non-negative timestamps can be
//! built, which makes the total order coincide with the usual numerical order.
//!
//! # Examples
//!
//! ```
//! use linesim::time::SimTime;
//!
//! let t0 = SimTime::ZERO;
//! let t1 = t0 + SimTime::from_minutes(90.0).as_hours();
//!
//! assert_eq!(t1, SimTime::from_hours(1.5));
//! assert!(t1 > t0);
//! ```

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Sub};

/// Number of hours in a simulated day.
pub const HOURS_PER_DAY: f64 = 24.0;

/// Number of minutes in a simulated hour.
pub const MINUTES_PER_HOUR: f64 = 60.0;

/// A point on the simulation time axis, in hours since the start of the run.
#[derive(Copy, Clone, Default, PartialEq)]
pub struct SimTime(f64);

impl SimTime {
    /// The start of a simulation run.
    pub const ZERO: Self = Self(0.0);

    /// Creates a timestamp from a number of hours.
    ///
    /// # Panics
    ///
    /// This will panic if `hours` is negative or not finite.
    pub fn from_hours(hours: f64) -> Self {
        Self::try_from_hours(hours)
            .unwrap_or_else(|| panic!("invalid simulation time: {hours} h"))
    }

    /// Creates a timestamp from a number of hours, returning `None` if `hours`
    /// is negative or not finite.
    pub fn try_from_hours(hours: f64) -> Option<Self> {
        if hours.is_finite() && hours >= 0.0 {
            // Normalize -0.0 so that equality and ordering agree.
            Some(Self(hours + 0.0))
        } else {
            None
        }
    }

    /// Creates a timestamp from a number of minutes.
    ///
    /// # Panics
    ///
    /// This will panic if `minutes` is negative or not finite.
    pub fn from_minutes(minutes: f64) -> Self {
        Self::from_hours(minutes / MINUTES_PER_HOUR)
    }

    /// Returns the timestamp in hours.
    pub fn as_hours(self) -> f64 {
        self.0
    }

    /// Returns the timestamp in minutes.
    pub fn as_minutes(self) -> f64 {
        self.0 * MINUTES_PER_HOUR
    }

    /// Returns the timestamp incremented by `hours`, or `None` if the result
    /// would not be a valid timestamp.
    pub fn checked_add_hours(self, hours: f64) -> Option<Self> {
        if hours.is_finite() && hours >= 0.0 {
            Self::try_from_hours(self.0 + hours)
        } else {
            None
        }
    }
}

impl Eq for SimTime {}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Add<f64> for SimTime {
    type Output = Self;

    /// Adds a non-negative number of hours.
    ///
    /// # Panics
    ///
    /// This will panic if the result is not a valid timestamp.
    fn add(self, hours: f64) -> Self {
        self.checked_add_hours(hours)
            .unwrap_or_else(|| panic!("invalid time increment: {hours} h"))
    }
}

impl Sub for SimTime {
    type Output = f64;

    /// Returns the signed difference in hours.
    fn sub(self, other: Self) -> f64 {
        self.0 - other.0
    }
}

impl fmt::Debug for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.0)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match f.precision() {
            Some(p) => write!(f, "{:.*}h", p, self.0),
            None => write!(f, "{}h", self.0),
        }
    }
}
