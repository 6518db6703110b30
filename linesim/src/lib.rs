//! A discrete-event simulator of a print, dry and scan capsule line.
//!
//! Linesim estimates the throughput of a three-stage manufacturing line in
//! which capsules are printed, dried and CT-scanned, with random cycle times
//! at each stage and random scrap losses at the printer. The simulator is
//! built on a small process-oriented discrete-event engine which can also be
//! used on its own to model other pipelines.
//!
//! # A practical overview
//!
//! ## Running the line
//!
//! The line is fully described by a [`LineConfig`](config::LineConfig), which
//! can be built in code or loaded from a TOML file. A run returns a
//! [`RunReport`](line::RunReport) with the key performance indicators of the
//! run:
//!
//! ```
//! use linesim::config::{CycleTime, LineConfig};
//! use linesim::line;
//!
//! let config = LineConfig {
//!     horizon_hours: 48.0,
//!     scanners: 2,
//!     dry: CycleTime::new(35.0, 45.0, 60.0),
//!     ..LineConfig::default()
//! };
//!
//! let report = line::run(&config).unwrap();
//! println!(
//!     "{} good capsules, {:.1} caps / day",
//!     report.kpis.completed_count, report.kpis.throughput_per_day
//! );
//! ```
//!
//! Runs are reproducible: all random draws come from a single stream seeded
//! from [`LineConfig::seed`](config::LineConfig::seed). Since the outcome of a
//! single run is just one sample of a random variable,
//! [`batch::replicate`] runs independent replications in parallel and
//! summarizes them.
//!
//! ## The simulation engine
//!
//! The engine is process-oriented: each activity of the simulated system is an
//! `async` block spawned on a [`Simulation`](simulation::Simulation). A
//! process runs until it reaches a suspension point, which is either a timed
//! delay ([`Context::timeout`](simulation::Context::timeout)) or a request for
//! a slot of a [`Resource`](resource::Resource) which is not immediately
//! available. Every resumption of a process is an event of the simulation;
//! events are processed in chronological order and events scheduled for the
//! same time are processed in the order in which they were scheduled.
//!
//! ```
//! use std::cell::Cell;
//! use std::rc::Rc;
//!
//! use linesim::resource::Resource;
//! use linesim::simulation::Simulation;
//! use linesim::time::SimTime;
//!
//! let mut simu = Simulation::new();
//! let press = Resource::new(&simu.context(), "press", 1);
//! let pressed = Rc::new(Cell::new(0));
//!
//! // Two operators share a single press, each pressing a part every 15min.
//! for _ in 0..2 {
//!     let ctx = simu.context();
//!     let press = press.clone();
//!     let pressed = pressed.clone();
//!     simu.spawn(async move {
//!         loop {
//!             let _slot = press.request().await;
//!             ctx.timeout(0.25).await;
//!             pressed.set(pressed.get() + 1);
//!         }
//!     });
//! }
//!
//! simu.step_until(SimTime::from_hours(1.0)).unwrap();
//! assert_eq!(pressed.get(), 4);
//! ```
//!
//! # Logging
//!
//! The simulator emits [`tracing`] events: a summary of each run at the
//! `info` level, the progress of each capsule at the `debug` and `trace`
//! levels. The [`trace::SimulationTime`] timer can be plugged into a
//! `tracing-subscriber` formatter to stamp events with the simulation time.
#![warn(missing_docs, missing_debug_implementations, unreachable_pub)]

pub mod batch;
pub mod config;
pub(crate) mod executor;
pub mod line;
pub mod resource;
pub mod sampler;
pub mod simulation;
pub mod time;
pub mod trace;
pub(crate) mod util;
