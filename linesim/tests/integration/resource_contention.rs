//! Contention of concurrent processes on shared resources.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use linesim::resource::Resource;
use linesim::sampler::{CycleDistribution, Sampler};
use linesim::simulation::Simulation;
use linesim::time::SimTime;

#[test]
fn resource_capacity_is_never_exceeded() {
    const CAPACITY: usize = 3;

    let mut simu = Simulation::new();
    let resource = Resource::new(&simu.context(), "oven", CAPACITY);
    let sampler = Sampler::seed_from_u64(123);
    let hold = CycleDistribution::new(10.0, 30.0, 90.0).unwrap();
    let idle = CycleDistribution::new(1.0, 10.0, 20.0).unwrap();
    let holders = Rc::new(Cell::new(0usize));
    let max_holders = Rc::new(Cell::new(0usize));

    for _ in 0..12 {
        let ctx = simu.context();
        let resource = resource.clone();
        let sampler = sampler.clone();
        let holders = holders.clone();
        let max_holders = max_holders.clone();
        simu.spawn(async move {
            loop {
                ctx.timeout(sampler.sample_duration(&idle)).await;
                let _slot = resource.request().await;
                holders.set(holders.get() + 1);
                max_holders.set(max_holders.get().max(holders.get()));
                assert!(resource.in_use() <= resource.capacity());

                ctx.timeout(sampler.sample_duration(&hold)).await;
                holders.set(holders.get() - 1);
            }
        });
    }

    simu.step_until(SimTime::from_hours(100.0)).unwrap();

    let stats = resource.stats();
    assert_eq!(max_holders.get(), CAPACITY);
    assert_eq!(stats.peak_in_use, CAPACITY);
    assert!(stats.peak_queue_len > 0);
    assert!(stats.utilization() > 0.9 && stats.utilization() <= 1.0 + 1e-9);
}

#[test]
fn resource_grants_in_arrival_order() {
    let mut simu = Simulation::new();
    let resource = Resource::new(&simu.context(), "scanner", 1);
    let order = Rc::new(RefCell::new(Vec::new()));

    // Requests arrive at 0h, 0.3h, 0.2h, 0.1h, 0.4h while each hold lasts 1h.
    for (i, arrival) in [0.0, 0.3, 0.2, 0.1, 0.4].into_iter().enumerate() {
        let ctx = simu.context();
        let resource = resource.clone();
        let order = order.clone();
        simu.spawn(async move {
            ctx.timeout(arrival).await;
            let _slot = resource.request().await;
            order.borrow_mut().push((i, ctx.time()));
            ctx.timeout(1.0).await;
        });
    }

    simu.step_until(SimTime::from_hours(10.0)).unwrap();

    let order = order.borrow();
    let ids: Vec<_> = order.iter().map(|(i, _)| *i).collect();
    assert_eq!(ids, [0, 3, 2, 1, 4]);
    for (n, (_, granted_at)) in order.iter().enumerate() {
        assert_eq!(*granted_at, SimTime::from_hours(n as f64));
    }
}

#[test]
fn resource_released_when_simulation_is_dropped() {
    let mut simu = Simulation::new();
    let resource = Resource::new(&simu.context(), "dryer", 1);

    for _ in 0..3 {
        let ctx = simu.context();
        let resource = resource.clone();
        simu.spawn(async move {
            let _slot = resource.request().await;
            ctx.timeout(10.0).await;
        });
    }

    simu.step_until(SimTime::from_hours(1.0)).unwrap();
    assert_eq!(resource.in_use(), 1);
    assert_eq!(resource.queue_len(), 2);

    drop(simu);

    assert_eq!(resource.queue_len(), 0);
    assert_eq!(resource.in_use(), 0);
}
