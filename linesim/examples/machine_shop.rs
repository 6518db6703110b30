//! Example: machine shop with a shared repair crew.
//!
//! This example demonstrates in particular:
//!
//! * the use of the simulation engine on its own, outside the capsule line,
//! * resources shared by many processes,
//! * random draws from a single seeded sampler.
//!
//! ```text
//!                 ┌───────────┐   breakdown   ┌─────────────┐
//!  Machine 1 ●───►│           ├──────────────►│             │
//!     ...         │  Machines │               │ Repair crew │
//!  Machine N ●───►│           │◄──────────────┤  (k slots)  │
//!                 └───────────┘    repaired   └─────────────┘
//! ```

use std::cell::Cell;
use std::rc::Rc;

use linesim::resource::Resource;
use linesim::sampler::{CycleDistribution, Sampler};
use linesim::simulation::{Context, ExecutionError, Simulation};
use linesim::time::SimTime;

const MACHINES: usize = 8;
const REPAIRERS: usize = 2;
const HORIZON_HOURS: f64 = 24.0 * 7.0;

/// Up time and repair time of a machine, in minutes.
#[derive(Copy, Clone)]
struct Reliability {
    up: CycleDistribution,
    repair: CycleDistribution,
}

#[derive(Default)]
struct Counters {
    breakdowns: Cell<u64>,
    down_hours: Cell<f64>,
}

/// A machine which alternates between production and repairs.
async fn machine(
    ctx: Context,
    crew: Resource,
    sampler: Sampler,
    reliability: Reliability,
    counters: Rc<Counters>,
) {
    loop {
        ctx.timeout(sampler.sample_duration(&reliability.up)).await;

        let broke_at = ctx.time();
        counters.breakdowns.set(counters.breakdowns.get() + 1);

        {
            let _repairer = crew.request().await;
            ctx.timeout(sampler.sample_duration(&reliability.repair)).await;
        }

        counters
            .down_hours
            .set(counters.down_hours.get() + (ctx.time() - broke_at));
    }
}

fn main() -> Result<(), ExecutionError> {
    let mut simu = Simulation::new();
    let crew = Resource::new(&simu.context(), "repair crew", REPAIRERS);
    let sampler = Sampler::seed_from_u64(1);
    let counters = Rc::new(Counters::default());
    let reliability = Reliability {
        up: CycleDistribution::new(240.0, 600.0, 1200.0).expect("valid distribution"),
        repair: CycleDistribution::new(30.0, 60.0, 180.0).expect("valid distribution"),
    };

    for _ in 0..MACHINES {
        simu.spawn(machine(
            simu.context(),
            crew.clone(),
            sampler.clone(),
            reliability,
            counters.clone(),
        ));
    }

    simu.step_until(SimTime::from_hours(HORIZON_HOURS))?;

    let stats = crew.stats();
    let availability =
        1.0 - counters.down_hours.get() / (MACHINES as f64 * HORIZON_HOURS);
    println!("Breakdowns        : {}", counters.breakdowns.get());
    println!("Machine uptime    : {:.1}%", availability * 100.0);
    println!("Crew utilization  : {:.1}%", stats.utilization() * 100.0);
    println!("Longest crew queue: {}", stats.peak_queue_len);

    Ok(())
}
