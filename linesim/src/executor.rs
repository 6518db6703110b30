//! Single-threaded executor for simulation processes.
//!
//! Processes are `async` blocks which are polled on the simulation thread. A
//! process is never resumed directly when woken: its waker pushes it onto the
//! ready queue of the executor, which the simulation drains after each event.
//! Since all resumptions of processes originating from the simulation are
//! mediated by the event queue, the interleaving of processes is entirely
//! determined by the order of events.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, Waker};

use futures_task::ArcWake;
use slab::Slab;
use tracing::trace;

use crate::simulation::scheduler::Scheduler;

/// A boxed process body.
type ProcessFuture = Pin<Box<dyn Future<Output = ()>>>;

/// An error returned by the executor.
#[derive(Debug)]
pub(crate) enum ExecutorError {
    /// A process has panicked; the payload message is provided if available.
    Panic(String),
}

/// A single-threaded `async` executor.
pub(crate) struct Executor {
    /// Tasks that have not completed yet.
    tasks: Rc<RefCell<TaskSet>>,
    /// Tasks that were woken and must be polled.
    ready: Arc<ReadyQueue>,
    /// Event queue on which task starts are scheduled.
    scheduler: Scheduler,
}

impl Executor {
    /// Creates an executor scheduling task starts on the provided event queue.
    pub(crate) fn new(scheduler: Scheduler) -> Self {
        Self {
            tasks: Rc::new(RefCell::new(TaskSet::default())),
            ready: Arc::new(ReadyQueue::default()),
            scheduler,
        }
    }

    /// Returns a handle that can spawn new tasks on this executor.
    pub(crate) fn spawner(&self) -> Spawner {
        Spawner {
            tasks: Rc::downgrade(&self.tasks),
            ready: self.ready.clone(),
            scheduler: self.scheduler.clone(),
        }
    }

    /// Returns the number of tasks that have not completed yet.
    pub(crate) fn active_tasks(&self) -> usize {
        self.tasks.borrow().tasks.len()
    }

    /// Polls all woken tasks until the ready queue is empty.
    pub(crate) fn run(&self) -> Result<(), ExecutorError> {
        while let Some(id) = self.ready.pop() {
            // Temporarily move the future out of the task set so that the task
            // can spawn other tasks while it is being polled.
            let (mut future, waker) = {
                let mut tasks = self.tasks.borrow_mut();
                match tasks.tasks.get_mut(id.key) {
                    Some(task) if task.epoch == id.epoch => match task.future.take() {
                        Some(future) => (future, task.waker.clone()),
                        None => continue,
                    },
                    // Stale wake-up of a completed task.
                    _ => continue,
                }
            };

            trace!(task = id.key, "resuming process");
            let mut cx = Context::from_waker(&waker);
            let result = panic::catch_unwind(AssertUnwindSafe(|| future.as_mut().poll(&mut cx)));

            match result {
                Ok(Poll::Pending) => {
                    let mut tasks = self.tasks.borrow_mut();
                    if let Some(task) = tasks.tasks.get_mut(id.key) {
                        task.future = Some(future);
                    }
                }
                Ok(Poll::Ready(())) => {
                    let task = self.tasks.borrow_mut().tasks.try_remove(id.key);
                    trace!(task = id.key, "process completed");
                    // Drop outside the borrow.
                    drop(task);
                    drop(future);
                }
                Err(payload) => {
                    let task = self.tasks.borrow_mut().tasks.try_remove(id.key);
                    drop(task);
                    drop(future);

                    return Err(ExecutorError::Panic(panic_message(payload.as_ref())));
                }
            }
        }

        Ok(())
    }
}

impl Drop for Executor {
    fn drop(&mut self) {
        // Drop all tasks that have not completed. The task set is moved out
        // first because dropped tasks may release resources, which in turn
        // may try to access the task set.
        let tasks = mem::take(&mut self.tasks.borrow_mut().tasks);
        drop(tasks);
    }
}

impl fmt::Debug for Executor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Executor")
            .field("active_tasks", &self.active_tasks())
            .finish_non_exhaustive()
    }
}

/// A handle used to spawn tasks on an executor.
///
/// The handle does not keep the executor alive: spawning after the executor
/// was dropped silently drops the process.
#[derive(Clone)]
pub(crate) struct Spawner {
    tasks: Weak<RefCell<TaskSet>>,
    ready: Arc<ReadyQueue>,
    scheduler: Scheduler,
}

impl Spawner {
    /// Spawns a task and schedules its start at the current simulation time,
    /// after all events already scheduled for that time.
    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + 'static,
    {
        let Some(tasks) = self.tasks.upgrade() else {
            return;
        };

        let waker = {
            let mut tasks = tasks.borrow_mut();
            let epoch = tasks.next_epoch;
            tasks.next_epoch += 1;

            let entry = tasks.tasks.vacant_entry();
            let id = TaskId {
                key: entry.key(),
                epoch,
            };
            let waker = futures_task::waker(Arc::new(TaskWaker {
                id,
                ready: self.ready.clone(),
            }));
            entry.insert(Task {
                epoch,
                future: Some(Box::pin(future)),
                waker: waker.clone(),
            });
            trace!(task = id.key, "process spawned");

            waker
        };

        self.scheduler.schedule_now(waker);
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner").finish_non_exhaustive()
    }
}

/// Set of live tasks.
#[derive(Default)]
struct TaskSet {
    tasks: Slab<Task>,
    /// Epoch of the next spawned task.
    ///
    /// Slab keys are recycled, so the epoch is what makes task identifiers
    /// unique.
    next_epoch: u64,
}

/// A spawned process.
struct Task {
    epoch: u64,
    /// The process body, or `None` while it is being polled.
    future: Option<ProcessFuture>,
    waker: Waker,
}

/// Unique task identifier.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct TaskId {
    key: usize,
    epoch: u64,
}

/// FIFO queue of woken tasks.
#[derive(Default)]
struct ReadyQueue {
    queue: Mutex<VecDeque<TaskId>>,
}

impl ReadyQueue {
    fn push(&self, id: TaskId) {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(id);
    }

    fn pop(&self) -> Option<TaskId> {
        self.queue
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }
}

/// Waker pushing its task onto the ready queue.
struct TaskWaker {
    id: TaskId,
    ready: Arc<ReadyQueue>,
}

impl ArcWake for TaskWaker {
    fn wake_by_ref(arc_self: &Arc<Self>) {
        arc_self.ready.push(arc_self.id);
    }
}

/// Extracts the message of a panic payload.
fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_owned()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "process panicked with a non-string payload".to_owned()
    }
}
