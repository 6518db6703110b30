//! Finite-capacity shared resources.
//!
//! A [`Resource`] models a pool of identical slots, such as the drying ovens
//! of a production line. Processes request a slot with
//! [`Resource::request`] and hold it for as long as they keep the returned
//! [`ResourceGuard`] alive. Releasing is tied to dropping the guard, so a
//! slot is returned on every exit path of a process.
//!
//! Requests are granted in strict arrival order. When a slot is released
//! while requests are waiting, the slot is handed over to the oldest request
//! and the requesting process is resumed at the current simulation time.
//!
//! # Examples
//!
//! ```
//! use std::cell::RefCell;
//! use std::rc::Rc;
//!
//! use linesim::resource::Resource;
//! use linesim::simulation::Simulation;
//! use linesim::time::SimTime;
//!
//! let mut simu = Simulation::new();
//! let oven = Resource::new(&simu.context(), "oven", 1);
//! let done = Rc::new(RefCell::new(Vec::new()));
//!
//! for batch in 0..3 {
//!     let ctx = simu.context();
//!     let oven = oven.clone();
//!     let done = done.clone();
//!     simu.spawn(async move {
//!         let _slot = oven.request().await;
//!         ctx.timeout(1.0).await;
//!         done.borrow_mut().push((batch, ctx.time()));
//!     });
//! }
//!
//! simu.step_until(SimTime::from_hours(10.0)).unwrap();
//!
//! assert_eq!(
//!     *done.borrow(),
//!     vec![
//!         (0, SimTime::from_hours(1.0)),
//!         (1, SimTime::from_hours(2.0)),
//!         (2, SimTime::from_hours(3.0)),
//!     ]
//! );
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context as TaskContext, Poll, Waker};

use tracing::trace;

use crate::simulation::scheduler::Scheduler;
use crate::simulation::Context;
use crate::time::SimTime;

/// A finite-capacity resource with a FIFO queue of pending requests.
///
/// `Resource` is a cheap handle: clones refer to the same pool of slots.
#[derive(Clone)]
pub struct Resource {
    inner: Rc<RefCell<ResourceInner>>,
    scheduler: Scheduler,
}

impl Resource {
    /// Creates a resource with the specified number of slots.
    ///
    /// # Panics
    ///
    /// This will panic if the capacity is zero.
    pub fn new(context: &Context, name: impl Into<String>, capacity: usize) -> Self {
        let name = name.into();
        assert!(capacity > 0, "resource `{name}` must have at least one slot");

        let scheduler = context.scheduler().clone();
        let now = scheduler.time();

        Self {
            inner: Rc::new(RefCell::new(ResourceInner {
                name,
                capacity,
                in_use: 0,
                waiters: VecDeque::new(),
                created_at: now,
                last_change: now,
                busy_area: 0.0,
                grants: 0,
                peak_in_use: 0,
                peak_queue_len: 0,
            })),
            scheduler,
        }
    }

    /// Returns a future that resolves to a guard holding one slot.
    ///
    /// The request joins the queue when it is first polled.
    pub fn request(&self) -> Request {
        Request {
            resource: self.clone(),
            state: RequestState::Idle,
        }
    }

    /// Returns the name of the resource.
    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Returns the number of slots.
    pub fn capacity(&self) -> usize {
        self.inner.borrow().capacity
    }

    /// Returns the number of slots currently held, including slots granted to
    /// processes which have not resumed yet.
    pub fn in_use(&self) -> usize {
        self.inner.borrow().in_use
    }

    /// Returns the number of requests waiting for a slot.
    pub fn queue_len(&self) -> usize {
        self.inner.borrow().waiters.len()
    }

    /// Returns usage statistics accumulated up to the current simulation
    /// time.
    pub fn stats(&self) -> ResourceStats {
        let now = self.scheduler.time();
        let inner = self.inner.borrow();
        let busy_hours = inner.busy_area + inner.in_use as f64 * (now - inner.last_change);

        ResourceStats {
            capacity: inner.capacity,
            grants: inner.grants,
            peak_in_use: inner.peak_in_use,
            peak_queue_len: inner.peak_queue_len,
            busy_hours,
            elapsed_hours: now - inner.created_at,
        }
    }

    /// Returns a slot to the pool, handing it over to the oldest waiting
    /// request if any.
    ///
    /// # Panics
    ///
    /// This will panic if no slot is currently held.
    fn release(&self) {
        let now = self.scheduler.time();
        let mut inner = self.inner.borrow_mut();
        if inner.in_use == 0 {
            let name = inner.name.clone();
            drop(inner);
            panic!("resource `{name}` was released without a matching grant");
        }

        match inner.waiters.pop_front() {
            Some(waiter) => {
                // The slot changes hands without becoming free.
                waiter.granted.set(true);
                inner.grants += 1;
                trace!(resource = %inner.name, queue_len = inner.waiters.len(), "slot handed over");
                let waker = waiter.waker.borrow().clone();
                drop(inner);

                self.scheduler.schedule_now(waker);
            }
            None => {
                inner.record_change(now);
                inner.in_use -= 1;
            }
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Resource")
            .field("name", &inner.name)
            .field("capacity", &inner.capacity)
            .field("in_use", &inner.in_use)
            .field("queue_len", &inner.waiters.len())
            .finish()
    }
}

struct ResourceInner {
    name: String,
    capacity: usize,
    in_use: usize,
    waiters: VecDeque<Rc<Waiter>>,
    created_at: SimTime,
    // Statistics.
    last_change: SimTime,
    busy_area: f64,
    grants: u64,
    peak_in_use: usize,
    peak_queue_len: usize,
}

impl ResourceInner {
    /// Accumulates the busy area up to `now`, before `in_use` changes.
    fn record_change(&mut self, now: SimTime) {
        self.busy_area += self.in_use as f64 * (now - self.last_change);
        self.last_change = now;
    }
}

/// A request waiting in the queue of a resource.
struct Waiter {
    granted: Cell<bool>,
    waker: RefCell<Waker>,
}

/// Future returned by [`Resource::request`].
///
/// Dropping a request which is still queued withdraws it; dropping a request
/// which was granted but not yet polled returns the slot.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct Request {
    resource: Resource,
    state: RequestState,
}

enum RequestState {
    Idle,
    Waiting(Rc<Waiter>),
    Done,
}

impl Future for Request {
    type Output = ResourceGuard;

    fn poll(self: Pin<&mut Self>, cx: &mut TaskContext<'_>) -> Poll<ResourceGuard> {
        let this = self.get_mut();

        match &this.state {
            RequestState::Idle => {
                let now = this.resource.scheduler.time();
                let mut inner = this.resource.inner.borrow_mut();

                if inner.in_use < inner.capacity && inner.waiters.is_empty() {
                    inner.record_change(now);
                    inner.in_use += 1;
                    inner.grants += 1;
                    inner.peak_in_use = inner.peak_in_use.max(inner.in_use);
                    drop(inner);
                    this.state = RequestState::Done;

                    return Poll::Ready(ResourceGuard {
                        resource: this.resource.clone(),
                    });
                }

                let waiter = Rc::new(Waiter {
                    granted: Cell::new(false),
                    waker: RefCell::new(cx.waker().clone()),
                });
                inner.waiters.push_back(waiter.clone());
                inner.peak_queue_len = inner.peak_queue_len.max(inner.waiters.len());
                trace!(resource = %inner.name, queue_len = inner.waiters.len(), "request queued");
                drop(inner);
                this.state = RequestState::Waiting(waiter);

                Poll::Pending
            }
            RequestState::Waiting(waiter) => {
                if !waiter.granted.get() {
                    let mut waker = waiter.waker.borrow_mut();
                    if !waker.will_wake(cx.waker()) {
                        waker.clone_from(cx.waker());
                    }

                    return Poll::Pending;
                }
                this.state = RequestState::Done;

                Poll::Ready(ResourceGuard {
                    resource: this.resource.clone(),
                })
            }
            RequestState::Done => panic!("`Request` polled after completion"),
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if let RequestState::Waiting(waiter) = &self.state {
            if waiter.granted.get() {
                self.resource.release();
            } else {
                self.resource
                    .inner
                    .borrow_mut()
                    .waiters
                    .retain(|w| !Rc::ptr_eq(w, waiter));
            }
        }
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            RequestState::Idle => "idle",
            RequestState::Waiting(w) if w.granted.get() => "granted",
            RequestState::Waiting(_) => "waiting",
            RequestState::Done => "done",
        };
        f.debug_struct("Request")
            .field("resource", &self.resource)
            .field("state", &state)
            .finish()
    }
}

/// A slot held on a [`Resource`], returned to the pool when dropped.
#[must_use = "the slot is released as soon as the guard is dropped"]
pub struct ResourceGuard {
    resource: Resource,
}

impl ResourceGuard {
    /// Returns the resource the slot belongs to.
    pub fn resource(&self) -> &Resource {
        &self.resource
    }
}

impl Drop for ResourceGuard {
    fn drop(&mut self) {
        self.resource.release();
    }
}

impl fmt::Debug for ResourceGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceGuard")
            .field("resource", &self.resource)
            .finish()
    }
}

/// Usage statistics of a [`Resource`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ResourceStats {
    /// Number of slots.
    pub capacity: usize,
    /// Number of requests granted so far.
    pub grants: u64,
    /// Largest number of slots held at the same time.
    pub peak_in_use: usize,
    /// Largest number of requests queued at the same time.
    pub peak_queue_len: usize,
    /// Slot-hours during which slots were held.
    pub busy_hours: f64,
    /// Hours elapsed since the creation of the resource.
    pub elapsed_hours: f64,
}

impl ResourceStats {
    /// Returns the fraction of the available slot-hours during which slots
    /// were held, or zero if no time has elapsed.
    pub fn utilization(&self) -> f64 {
        if self.elapsed_hours > 0.0 {
            self.busy_hours / (self.capacity as f64 * self.elapsed_hours)
        } else {
            0.0
        }
    }
}
