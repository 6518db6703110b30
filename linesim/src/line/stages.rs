//! Printer, dryer and scanner processes.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::line::entity::{Entity, EntityFactory, EntityId};
use crate::resource::Resource;
use crate::sampler::{CycleDistribution, Sampler};
use crate::simulation::Context;

/// Cycle-time distributions and scrap rate of the line.
#[derive(Copy, Clone, Debug)]
pub(crate) struct Process {
    pub(crate) print: CycleDistribution,
    pub(crate) dry: CycleDistribution,
    pub(crate) scan: CycleDistribution,
    pub(crate) scrap_probability: f64,
}

/// Counters updated by the stages.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) printed: Cell<u64>,
    pub(crate) scrapped: Cell<u64>,
    pub(crate) good: Cell<u64>,
    pub(crate) flow_hours: Cell<f64>,
}

fn increment(counter: &Cell<u64>) {
    counter.set(counter.get() + 1);
}

/// State shared by all stage processes of a run.
#[derive(Debug)]
pub(crate) struct Line {
    pub(crate) ctx: Context,
    pub(crate) sampler: Sampler,
    pub(crate) process: Process,
    pub(crate) dryer: Resource,
    pub(crate) scanner: Resource,
    pub(crate) entities: RefCell<EntityFactory>,
    pub(crate) counters: Counters,
    pub(crate) completion_log: RefCell<Vec<EntityId>>,
}

impl Line {
    pub(crate) fn new(
        ctx: Context,
        sampler: Sampler,
        process: Process,
        dryers: usize,
        scanners: usize,
    ) -> Self {
        let dryer = Resource::new(&ctx, "dryer", dryers);
        let scanner = Resource::new(&ctx, "scanner", scanners);

        Self {
            ctx,
            sampler,
            process,
            dryer,
            scanner,
            entities: RefCell::new(EntityFactory::default()),
            counters: Counters::default(),
            completion_log: RefCell::new(Vec::new()),
        }
    }

    fn complete(&self, entity: Entity) {
        let flow = self.ctx.time() - entity.created_at();
        self.counters
            .flow_hours
            .set(self.counters.flow_hours.get() + flow);
        self.completion_log.borrow_mut().push(entity.id());
    }
}

/// Prints capsules forever, scrapping some and handing the others over to a
/// new dryer process.
pub(crate) async fn printer(line: Rc<Line>, printer: usize) {
    loop {
        let entity = line.entities.borrow_mut().create(line.ctx.time());
        trace!(printer, entity = %entity.id(), "print started");

        let duration = line.sampler.sample_duration(&line.process.print);
        line.ctx.timeout(duration).await;
        increment(&line.counters.printed);

        if line.sampler.sample_scrap(line.process.scrap_probability) {
            increment(&line.counters.scrapped);
            debug!(printer, entity = %entity.id(), "capsule scrapped");
            continue;
        }

        increment(&line.counters.good);
        debug!(printer, entity = %entity.id(), "capsule printed");
        line.ctx.spawn(dryer(line.clone(), entity));
    }
}

async fn dryer(line: Rc<Line>, entity: Entity) {
    let slot = line.dryer.request().await;
    trace!(entity = %entity.id(), "drying started");

    let duration = line.sampler.sample_duration(&line.process.dry);
    line.ctx.timeout(duration).await;
    drop(slot);
    debug!(entity = %entity.id(), "capsule dried");

    line.ctx.spawn(scanner(line.clone(), entity));
}

async fn scanner(line: Rc<Line>, entity: Entity) {
    let _slot = line.scanner.request().await;
    trace!(entity = %entity.id(), "scan started");

    let duration = line.sampler.sample_duration(&line.process.scan);
    line.ctx.timeout(duration).await;
    debug!(entity = %entity.id(), "capsule completed");

    line.complete(entity);
}
