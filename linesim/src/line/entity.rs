//! Units flowing through the line.

use std::fmt;

use crate::time::SimTime;

/// Identifier of a unit, unique within a run.
///
/// Identifiers are assigned in creation order starting from 0.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates an identifier from its raw value.
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw value of the identifier.
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A capsule moving through the line.
///
/// An entity is owned by exactly one stage at a time and is moved, never
/// copied, from one stage to the next.
#[derive(Debug)]
pub struct Entity {
    id: EntityId,
    created_at: SimTime,
}

impl Entity {
    pub(crate) fn new(id: EntityId, created_at: SimTime) -> Self {
        Self { id, created_at }
    }

    /// Returns the identifier of the entity.
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Returns the time at which printing of the entity started.
    pub fn created_at(&self) -> SimTime {
        self.created_at
    }
}

/// Allocator of monotonically increasing identifiers.
#[derive(Debug, Default)]
pub(crate) struct EntityFactory {
    next_id: u64,
}

impl EntityFactory {
    pub(crate) fn create(&mut self, now: SimTime) -> Entity {
        let id = EntityId(self.next_id);
        self.next_id += 1;

        Entity::new(id, now)
    }

    /// Number of entities created so far.
    pub(crate) fn created(&self) -> u64 {
        self.next_id
    }
}
