//! Entity handles and per-entity bookkeeping.
//!
//! An [`Entity`] is just an id; everything the engine knows about it lives
//! in the context's [`EntityIndex`]: its current signature, where its
//! record is placed, and which component groups it belongs to.

use std::collections::HashMap;

use crate::engine::types::{DataLocation, EntityId, Signature, SlotId};


/// Copyable handle to an entity owned by a context.
///
/// Ids are issued monotonically and never reused, so a handle stays unique
/// for the lifetime of the process; it merely goes stale once the entity is
/// destroyed.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Entity(pub EntityId);

impl Entity {
    /// Raw id value.
    #[inline]
    pub fn id(self) -> EntityId {
        self.0
    }
}

/// Where an entity's component record currently lives.
#[derive(Clone, Copy, Debug)]
pub struct Placement {
    /// Signature keying the owning template.
    pub template: Signature,
    /// Index of the collection within that template.
    pub collection: usize,
    /// Slot within the collection slab.
    pub slot: SlotId,
    /// Resolved byte address of the record.
    pub location: DataLocation,
}

/// Per-entity bookkeeping held by the context.
///
/// `placement` is `None` while the entity carries no components (freshly
/// stripped by a remove-all); `groups` lists the component groups the
/// entity currently belongs to.
#[derive(Clone, Debug, Default)]
pub struct EntityRecord {
    /// Set of component types the entity currently carries.
    pub signature: Signature,
    /// Storage placement, absent for component-less entities.
    pub placement: Option<Placement>,
    /// Signatures of the groups this entity is a member of.
    pub groups: Vec<Signature>,
}

/// Issues entity ids and stores records for live entities.
#[derive(Default)]
pub struct EntityIndex {
    records: HashMap<EntityId, EntityRecord>,
    next_id: EntityId,
}

impl EntityIndex {
    /// Creates an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes the next id. Ids advance even when the creation that requested
    /// them subsequently fails.
    #[inline]
    pub fn issue_id(&mut self) -> Entity {
        let id = self.next_id;
        self.next_id += 1;
        Entity(id)
    }

    /// Stores the record for a newly created entity.
    pub fn insert(&mut self, entity: Entity, record: EntityRecord) {
        self.records.insert(entity.0, record);
    }

    /// Drops an entity's record, returning it for final cleanup.
    pub fn remove(&mut self, entity: Entity) -> Option<EntityRecord> {
        self.records.remove(&entity.0)
    }

    /// Record of a live entity.
    pub fn get(&self, entity: Entity) -> Option<&EntityRecord> {
        self.records.get(&entity.0)
    }

    /// Mutable record of a live entity.
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut EntityRecord> {
        self.records.get_mut(&entity.0)
    }

    /// Returns `true` if the entity exists.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.records.contains_key(&entity.0)
    }

    /// Number of live entities.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no entities are alive.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
