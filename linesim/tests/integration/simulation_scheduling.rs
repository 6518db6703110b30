//! Event ordering and clock management of a `Simulation`.

use std::cell::RefCell;
use std::rc::Rc;

use linesim::sampler::{CycleDistribution, Sampler};
use linesim::simulation::{ExecutionError, RunState, Simulation};
use linesim::time::SimTime;

type Log = Rc<RefCell<Vec<(&'static str, SimTime)>>>;

fn log_after(simu: &Simulation, log: &Log, label: &'static str, hours: f64) {
    let ctx = simu.context();
    let log = log.clone();
    simu.spawn(async move {
        ctx.timeout(hours).await;
        log.borrow_mut().push((label, ctx.time()));
    });
}

#[test]
fn simulation_same_time_events_in_scheduling_order() {
    let mut simu = Simulation::new();
    let log = Log::default();

    log_after(&simu, &log, "a", 1.0);
    log_after(&simu, &log, "b", 0.5);
    log_after(&simu, &log, "c", 1.0);
    log_after(&simu, &log, "d", 0.0);

    simu.step_until(SimTime::from_hours(2.0)).unwrap();

    let labels: Vec<_> = log.borrow().iter().map(|(l, _)| *l).collect();
    assert_eq!(labels, ["d", "b", "a", "c"]);
}

#[test]
fn simulation_horizon_is_inclusive() {
    let mut simu = Simulation::new();
    let log = Log::default();

    log_after(&simu, &log, "at", 3.0);
    log_after(&simu, &log, "after", 3.5);

    assert_eq!(simu.state(), RunState::Idle);
    simu.step_until(SimTime::from_hours(3.0)).unwrap();

    assert_eq!(*log.borrow(), [("at", SimTime::from_hours(3.0))]);
    assert_eq!(simu.time(), SimTime::from_hours(3.0));
    assert_eq!(simu.state(), RunState::Halted);
    assert_eq!(simu.pending_events(), 1);
    assert_eq!(simu.next_event_time(), Some(SimTime::from_hours(3.5)));

    // The simulation can be resumed.
    assert_eq!(simu.step(), Ok(Some(SimTime::from_hours(3.5))));
    assert_eq!(simu.step(), Ok(None));
    assert_eq!(simu.state(), RunState::Halted);
    assert_eq!(log.borrow().len(), 2);
    assert_eq!(simu.active_processes(), 0);
}

#[test]
fn simulation_horizon_without_events() {
    let mut simu = Simulation::new();

    simu.step_until(SimTime::from_hours(5.0)).unwrap();

    assert_eq!(simu.time(), SimTime::from_hours(5.0));
    assert_eq!(simu.executed_events(), 0);
    assert!(simu.step_until(SimTime::from_hours(4.0)).is_err());
}

#[test]
fn simulation_spawned_process_starts_after_queued_events() {
    let mut simu = Simulation::new();
    let log = Log::default();

    let ctx = simu.context();
    let parent_log = log.clone();
    simu.spawn(async move {
        ctx.timeout(1.0).await;
        let child_ctx = ctx.clone();
        let child_log = parent_log.clone();
        ctx.spawn(async move {
            child_log.borrow_mut().push(("child", child_ctx.time()));
        });
        parent_log.borrow_mut().push(("parent", ctx.time()));
    });
    log_after(&simu, &log, "sibling", 1.0);

    simu.step_until(SimTime::from_hours(1.0)).unwrap();

    let hour = SimTime::from_hours(1.0);
    assert_eq!(
        *log.borrow(),
        [("parent", hour), ("sibling", hour), ("child", hour)]
    );
}

#[test]
fn simulation_clock_is_monotonic() {
    let mut simu = Simulation::new();
    let sampler = Sampler::seed_from_u64(7);
    let cycle = CycleDistribution::new(1.0, 5.0, 30.0).unwrap();

    for _ in 0..10 {
        let ctx = simu.context();
        let sampler = sampler.clone();
        simu.spawn(async move {
            loop {
                ctx.timeout(sampler.sample_duration(&cycle)).await;
            }
        });
    }

    let mut last = simu.time();
    for _ in 0..1000 {
        let time = simu.step().unwrap().unwrap();
        assert!(time >= last);
        last = time;
    }
    assert_eq!(simu.executed_events(), 1000);
    assert_eq!(simu.state(), RunState::Running);
}

#[test]
fn simulation_timeout_until() {
    let mut simu = Simulation::new();
    let log = Log::default();

    let ctx = simu.context();
    let shift_log = log.clone();
    simu.spawn(async move {
        ctx.timeout(0.5).await;
        // Wait for the next shift change.
        ctx.timeout_until(SimTime::from_hours(8.0)).await;
        shift_log.borrow_mut().push(("shift", ctx.time()));
        // A timestamp in the past is a logic error.
        ctx.timeout_until(SimTime::from_hours(1.0)).await;
    });

    let res = simu.step_until(SimTime::from_hours(10.0));

    assert_eq!(*log.borrow(), [("shift", SimTime::from_hours(8.0))]);
    assert!(matches!(
        res,
        Err(ExecutionError::ProcessPanicked { time, .. }) if time == SimTime::from_hours(8.0)
    ));
}
