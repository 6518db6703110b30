//! Discrete-event simulation management.
//!
//! This module contains most notably the [`Simulation`] environment and the
//! [`Context`] handle through which processes interact with the simulation.
//!
//! # Processes
//!
//! A process is an `async` block spawned with [`Simulation::spawn`] or
//! [`Context::spawn`]. Processes run cooperatively on a single thread: a
//! process runs uninterrupted until it reaches a suspension point, which is
//! either a timed delay ([`Context::timeout`]) or a request to a
//! [`Resource`](crate::resource::Resource) which cannot be granted
//! immediately. Since no two processes ever run concurrently, processes can
//! freely share state through `Rc<RefCell<_>>` or `Cell`.
//!
//! # Event ordering
//!
//! Each resumption of a process is an event with a scheduled time. Events are
//! processed in chronological order and events scheduled for the same time are
//! processed in the order in which they were scheduled. Spawning a process,
//! granting a resource and timing out are all scheduled events, so given the
//! same initial processes and the same random draws, two simulations always
//! produce identical outcomes.
//!
//! # Simulation lifecycle
//!
//! 1. creation of a [`Simulation`] and of the shared
//!    [`Resource`](crate::resource::Resource)s,
//! 2. spawning of the initial processes,
//! 3. execution with [`Simulation::step`] or [`Simulation::step_until`].
//!
//! Processes still suspended when the simulation is dropped are dropped as
//! well, releasing any resource they hold.
mod context;
pub(crate) mod scheduler;

pub use context::{Context, Timeout};
pub use scheduler::SchedulingError;

use std::fmt;
use std::future::Future;

use tracing::debug;

use crate::executor::{Executor, ExecutorError};
use crate::time::SimTime;
use crate::trace;

use scheduler::Scheduler;

/// Run state of a simulation.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum RunState {
    /// No event was processed yet.
    Idle,
    /// At least one event was processed and the simulation was not halted.
    Running,
    /// The simulation reached its horizon, ran out of events or was aborted by
    /// an error.
    Halted,
}

/// Simulation environment.
///
/// A `Simulation` owns the event queue, the simulation clock and the executor
/// of all spawned processes. The clock starts at [`SimTime::ZERO`] and only
/// moves forward.
///
/// A call to [`step()`](Simulation::step) will:
///
/// 1. pull the earliest scheduled event,
/// 2. move the simulation time forward to that of the event, and
/// 3. resume the corresponding process until its next suspension point.
///
/// The [`step_until()`](Simulation::step_until) method operates similarly but
/// iterates until the specified horizon has been reached.
pub struct Simulation {
    executor: Executor,
    scheduler: Scheduler,
    state: RunState,
    executed_events: u64,
}

impl Simulation {
    /// Creates an empty simulation with the clock set to zero.
    pub fn new() -> Self {
        let scheduler = Scheduler::new();

        Self {
            executor: Executor::new(scheduler.clone()),
            scheduler,
            state: RunState::Idle,
            executed_events: 0,
        }
    }

    /// Returns a new process context for this simulation.
    pub fn context(&self) -> Context {
        Context::new(self.scheduler.clone(), self.executor.spawner())
    }

    /// Spawns a new process starting at the current simulation time.
    ///
    /// See also: [`Context::spawn`].
    pub fn spawn<F>(&self, process: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.executor.spawner().spawn(process);
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.scheduler.time()
    }

    /// Returns the run state.
    pub fn state(&self) -> RunState {
        self.state
    }

    /// Returns the number of events processed so far.
    pub fn executed_events(&self) -> u64 {
        self.executed_events
    }

    /// Returns the number of pending events.
    pub fn pending_events(&self) -> usize {
        self.scheduler.pending_events()
    }

    /// Returns the time of the earliest pending event, if any.
    pub fn next_event_time(&self) -> Option<SimTime> {
        self.scheduler.next_event_time()
    }

    /// Returns the number of processes that have not completed yet.
    pub fn active_processes(&self) -> usize {
        self.executor.active_tasks()
    }

    /// Advances simulation time to that of the next scheduled event and
    /// processes that event.
    ///
    /// The new simulation time is returned, or `None` if no event was pending,
    /// in which case the simulation is halted.
    pub fn step(&mut self) -> Result<Option<SimTime>, ExecutionError> {
        let time = self.step_bounded(None)?;
        if time.is_none() {
            self.state = RunState::Halted;
        }

        Ok(time)
    }

    /// Iteratively processes all events scheduled up to and including the
    /// specified horizon, as if by calling [`Simulation::step()`] repeatedly,
    /// then halts.
    ///
    /// The simulation time upon completion is equal to the horizon, whether or
    /// not an event was scheduled for that time. Events scheduled after the
    /// horizon are left unprocessed.
    ///
    /// An error is returned if the horizon lies in the past of the current
    /// simulation time.
    pub fn step_until(&mut self, horizon: SimTime) -> Result<(), ExecutionError> {
        let now = self.time();
        if horizon < now {
            return Err(ExecutionError::InvalidHorizon { now, horizon });
        }

        while self.step_bounded(Some(horizon))?.is_some() {}

        self.scheduler.set_time(horizon);
        self.state = RunState::Halted;
        debug!(
            %horizon,
            executed_events = self.executed_events,
            pending_events = self.pending_events(),
            active_processes = self.active_processes(),
            "simulation halted"
        );

        Ok(())
    }

    /// Processes the next event if its time does not exceed the specified
    /// bound, returning its time.
    fn step_bounded(
        &mut self,
        upper_time_bound: Option<SimTime>,
    ) -> Result<Option<SimTime>, ExecutionError> {
        let now = self.scheduler.time();
        let Some((time, waker)) = self.scheduler.pull_event(upper_time_bound) else {
            return Ok(None);
        };
        if time < now {
            self.state = RunState::Halted;
            return Err(ExecutionError::ClockRegression {
                now,
                event_time: time,
            });
        }

        self.state = RunState::Running;
        self.scheduler.set_time(time);
        self.executed_events += 1;
        waker.wake();

        let executor = &self.executor;
        if let Err(ExecutorError::Panic(message)) = trace::with_time(time, || executor.run()) {
            self.state = RunState::Halted;
            return Err(ExecutionError::ProcessPanicked { time, message });
        }

        Ok(Some(time))
    }

    #[cfg(test)]
    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Simulation {
    fn drop(&mut self) {
        // Pending events hold wakers of tasks that are about to be dropped.
        self.scheduler.clear();
    }
}

impl fmt::Debug for Simulation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Simulation")
            .field("time", &self.time())
            .field("state", &self.state)
            .field("executed_events", &self.executed_events)
            .finish_non_exhaustive()
    }
}

/// A fatal error which aborted the simulation.
///
/// These errors reveal a logic defect, either in the simulator itself or in a
/// process, and are not recoverable.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ExecutionError {
    /// An event was pulled with a time in the past of the simulation clock.
    #[error("event scheduled at {event_time} was pulled while the simulation clock was at {now}")]
    ClockRegression {
        /// Simulation time when the event was pulled.
        now: SimTime,
        /// Scheduled time of the event.
        event_time: SimTime,
    },
    /// A process panicked.
    #[error("a process panicked at {time}: {message}")]
    ProcessPanicked {
        /// Simulation time of the event during which the panic occurred.
        time: SimTime,
        /// Panic message.
        message: String,
    },
    /// The requested horizon lies in the past of the simulation clock.
    #[error("cannot step until {horizon} since the simulation clock is already at {now}")]
    InvalidHorizon {
        /// Current simulation time.
        now: SimTime,
        /// Requested horizon.
        horizon: SimTime,
    },
}
