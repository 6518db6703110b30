//! Support for structured logging.
//!
//! # Overview
//!
//! The library emits [`tracing`] events, most of them at the `debug` and
//! `trace` levels: pipeline stages log each entity they handle and the
//! executor logs each process resumption. A summary of each run is logged at
//! the `info` level.
//!
//! By default, the [`tracing_subscriber::fmt`][mod@tracing_subscriber::fmt]
//! subscriber stamps events with the wall clock time. Because it is often
//! more useful to know *when in the simulation* something happened, this
//! module provides a [`SimulationTime`] timer which stamps events emitted
//! while a process is being resumed with the simulation time, in hours.
//!
//! # Configuration
//!
//! ```
//! use linesim::trace::SimulationTime;
//!
//! tracing_subscriber::fmt()
//!     .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
//!     .with_timer(SimulationTime::with_system_timer())
//!     .init();
//! ```
//!
//! Events generated outside of simulation processes fall back to the system
//! timer:
//!
//! ```text
//! [t=    3.1742h] DEBUG linesim::line::stages: capsule dried entity=#2
//! 2025-06-10T14:39:24.670921Z  INFO linesim::line: run completed completed=21
//! ```
//!
//! `SimulationTime::with_system_timer_always()` prepends the system time to
//! simulation events as well.

use std::cell::Cell;
use std::fmt;

use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::{FormatTime, SystemTime};

use crate::time::SimTime;

thread_local! {
    /// Time of the event being processed on this thread, if any.
    static CURRENT_TIME: Cell<Option<SimTime>> = const { Cell::new(None) };
}

/// Runs a closure with the simulation time of the current thread set to
/// `time`, restoring the previous value afterwards.
pub(crate) fn with_time<R>(time: SimTime, f: impl FnOnce() -> R) -> R {
    struct Restore(Option<SimTime>);

    impl Drop for Restore {
        fn drop(&mut self) {
            CURRENT_TIME.with(|t| t.set(self.0));
        }
    }

    let _restore = Restore(CURRENT_TIME.with(|t| t.replace(Some(time))));

    f()
}

/// Returns the time of the event being processed on this thread, if any.
pub(crate) fn current_time() -> Option<SimTime> {
    CURRENT_TIME.with(|t| t.get())
}

/// A `tracing-subscriber` timer stamping events with the simulation time.
///
/// Events emitted while a process runs are stamped `[t=    1.5000h]`. Other
/// events, and optionally process events as well, are stamped by a fallback
/// timer.
#[derive(Clone, Debug, Default)]
pub struct SimulationTime<T = SystemTime> {
    fallback: T,
    always_fallback: bool,
}

impl SimulationTime {
    /// Falls back to the system time outside of processes.
    pub fn with_system_timer() -> Self {
        Self::default()
    }

    /// Prefixes all events with the system time, process events being
    /// stamped with the simulation time as well.
    pub fn with_system_timer_always() -> Self {
        Self {
            always_fallback: true,
            ..Self::default()
        }
    }
}

impl<T: FormatTime> SimulationTime<T> {
    /// Falls back to `fallback` outside of processes.
    pub fn with_custom_timer(fallback: T) -> Self {
        Self {
            fallback,
            always_fallback: false,
        }
    }
}

impl<T: FormatTime> FormatTime for SimulationTime<T> {
    fn format_time(&self, w: &mut Writer<'_>) -> fmt::Result {
        let Some(time) = current_time() else {
            return self.fallback.format_time(w);
        };
        if self.always_fallback {
            self.fallback.format_time(w)?;
            w.write_char(' ')?;
        }

        write!(w, "[t={:>10.4}h]", time.as_hours())
    }
}
