//! Process context.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context as TaskContext, Poll};

use crate::executor::Spawner;
use crate::simulation::scheduler::Scheduler;
use crate::time::SimTime;

/// A handle giving simulation processes access to the simulation time, to
/// timed delays and to the spawning of other processes.
///
/// A `Context` is cheap to clone; processes usually capture their own copy.
///
/// # Examples
///
/// A process which ticks every half-hour:
///
/// ```
/// use std::cell::Cell;
/// use std::rc::Rc;
///
/// use linesim::simulation::Simulation;
/// use linesim::time::SimTime;
///
/// let mut simu = Simulation::new();
/// let ctx = simu.context();
/// let ticks = Rc::new(Cell::new(0));
///
/// simu.spawn({
///     let ticks = ticks.clone();
///     async move {
///         loop {
///             ctx.timeout(0.5).await;
///             ticks.set(ticks.get() + 1);
///         }
///     }
/// });
///
/// simu.step_until(SimTime::from_hours(2.0)).unwrap();
/// assert_eq!(ticks.get(), 4);
/// ```
#[derive(Clone)]
pub struct Context {
    scheduler: Scheduler,
    spawner: Spawner,
}

impl Context {
    pub(crate) fn new(scheduler: Scheduler, spawner: Spawner) -> Self {
        Self { scheduler, spawner }
    }

    /// Returns the current simulation time.
    pub fn time(&self) -> SimTime {
        self.scheduler.time()
    }

    /// Returns a future that completes after the specified delay in hours.
    ///
    /// Awaiting the future suspends the process until all events scheduled up
    /// to the resumption time have been processed. A zero delay suspends the
    /// process until all events already scheduled for the current time have
    /// been processed.
    ///
    /// # Panics
    ///
    /// Awaiting the future will panic if the delay is negative or not finite.
    pub fn timeout(&self, hours: f64) -> Timeout {
        Timeout {
            scheduler: self.scheduler.clone(),
            target: Target::Delay(hours),
            deadline: None,
        }
    }

    /// Returns a future that completes at the specified time.
    ///
    /// # Panics
    ///
    /// Awaiting the future will panic if the time lies in the past of the
    /// simulation time at the first poll.
    pub fn timeout_until(&self, time: SimTime) -> Timeout {
        Timeout {
            scheduler: self.scheduler.clone(),
            target: Target::At(time),
            deadline: None,
        }
    }

    /// Spawns a new process.
    ///
    /// The process starts at the current simulation time, after all events
    /// already scheduled for that time.
    pub fn spawn<F>(&self, process: F)
    where
        F: Future<Output = ()> + 'static,
    {
        self.spawner.spawn(process);
    }

    pub(crate) fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("time", &self.time())
            .finish_non_exhaustive()
    }
}

/// Future returned by [`Context::timeout`].
#[must_use = "futures do nothing unless you `.await` or poll them"]
#[derive(Debug)]
pub struct Timeout {
    scheduler: Scheduler,
    target: Target,
    deadline: Option<SimTime>,
}

#[derive(Copy, Clone, Debug)]
enum Target {
    Delay(f64),
    At(SimTime),
}

impl Future for Timeout {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<()> {
        let this = self.get_mut();

        match this.deadline {
            None => {
                let waker = cx.waker().clone();
                let deadline = match this.target {
                    Target::Delay(hours) => this.scheduler.schedule_in(hours, waker),
                    Target::At(time) => this.scheduler.schedule_at(time, waker).map(|()| time),
                }
                .unwrap_or_else(|e| panic!("invalid timeout: {e}"));
                this.deadline = Some(deadline);

                Poll::Pending
            }
            Some(deadline) if this.scheduler.time() >= deadline => Poll::Ready(()),
            Some(_) => Poll::Pending,
        }
    }
}
