//! Event queue and simulation clock.

use std::cell::{RefCell, RefMut};
use std::fmt;
use std::rc::Rc;
use std::task::Waker;

use crate::time::SimTime;
use crate::util::priority_queue::PriorityQueue;

/// Queue of pending events.
///
/// Each event is the waker of a suspended process: executing the event
/// resumes that process. Events scheduled for the same time are pulled in
/// insertion order.
pub(crate) type SchedulerQueue = PriorityQueue<SimTime, Waker>;

/// Shared handle to the event queue and to the simulation clock.
///
/// The handle is shared by the simulation, the spawners and the resources of
/// a single simulation thread. Process wakers never hold it.
#[derive(Clone)]
pub(crate) struct Scheduler {
    inner: Rc<RefCell<SchedulerInner>>,
}

struct SchedulerInner {
    time: SimTime,
    queue: SchedulerQueue,
}

impl Scheduler {
    /// Creates a scheduler with an empty queue and a clock set to zero.
    pub(crate) fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(SchedulerInner {
                time: SimTime::ZERO,
                queue: PriorityQueue::new(),
            })),
        }
    }

    /// Returns the current simulation time.
    pub(crate) fn time(&self) -> SimTime {
        self.inner_mut().time
    }

    /// Schedules the resumption of a process at the specified time.
    ///
    /// An error is returned if the specified time lies in the past of the
    /// current simulation time.
    pub(crate) fn schedule_at(&self, time: SimTime, waker: Waker) -> Result<(), SchedulingError> {
        let mut inner = self.inner_mut();
        if time < inner.time {
            return Err(SchedulingError::InvalidScheduledTime);
        }
        inner.queue.insert(time, waker);

        Ok(())
    }

    /// Schedules the resumption of a process after the specified delay in
    /// hours and returns the scheduled time.
    ///
    /// An error is returned if the delay is negative or not finite.
    pub(crate) fn schedule_in(&self, delay: f64, waker: Waker) -> Result<SimTime, SchedulingError> {
        let mut inner = self.inner_mut();
        let time = inner
            .time
            .checked_add_hours(delay)
            .ok_or(SchedulingError::InvalidDelay(delay))?;
        inner.queue.insert(time, waker);

        Ok(time)
    }

    /// Schedules the resumption of a process at the current simulation time,
    /// after all events already scheduled for that time.
    pub(crate) fn schedule_now(&self, waker: Waker) {
        let mut inner = self.inner_mut();
        let time = inner.time;
        inner.queue.insert(time, waker);
    }

    /// Returns the time of the earliest pending event, if any.
    pub(crate) fn next_event_time(&self) -> Option<SimTime> {
        self.inner_mut().queue.peek_key().copied()
    }

    /// Pulls the earliest pending event if its time does not exceed the
    /// specified bound.
    ///
    /// The clock is left untouched.
    pub(crate) fn pull_event(&self, upper_time_bound: Option<SimTime>) -> Option<(SimTime, Waker)> {
        let mut inner = self.inner_mut();
        let next_time = *inner.queue.peek_key()?;
        if matches!(upper_time_bound, Some(bound) if next_time > bound) {
            return None;
        }

        inner.queue.pull()
    }

    /// Sets the simulation time.
    pub(crate) fn set_time(&self, time: SimTime) {
        self.inner_mut().time = time;
    }

    /// Returns the number of pending events.
    pub(crate) fn pending_events(&self) -> usize {
        self.inner_mut().queue.len()
    }

    /// Discards all pending events.
    pub(crate) fn clear(&self) {
        // Wakers are dropped outside the borrow.
        let queue = std::mem::replace(&mut self.inner_mut().queue, PriorityQueue::new());
        drop(queue);
    }

    /// The borrow is never held across process code.
    fn inner_mut(&self) -> RefMut<'_, SchedulerInner> {
        self.inner.borrow_mut()
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Scheduler")
            .field("time", &inner.time)
            .field("pending_events", &inner.queue.len())
            .finish()
    }
}

/// Error returned when the scheduled time or delay is not admissible.
#[derive(Clone, Copy, Debug, PartialEq, thiserror::Error)]
pub enum SchedulingError {
    /// The scheduled time lies in the past of the current simulation time.
    #[error("the scheduled time should not lie in the past of the current simulation time")]
    InvalidScheduledTime,
    /// The delay is negative or not finite.
    #[error("the delay should be a finite, non-negative number of hours (got {0})")]
    InvalidDelay(f64),
}
