//! Entity templates and collection slabs.
//!
//! An [`EntityTemplate`] is the canonical fixed byte layout for one unique
//! signature; a [`Collection`] is a fixed-capacity slab of entity records
//! sharing that template, carved out of a single allocator block range.
//! Templates own their collections for the context's lifetime.
//!
//! Slot ids are one byte, reused smallest-first through a min-heap free
//! list: low-index slots stay hot and memory growth stays bounded for
//! churny entity sets without compaction or copying on removal.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use log::debug;

use crate::engine::allocator::Allocator;
use crate::engine::error::AllocationError;
use crate::engine::layout::{ComponentOffsetItem, EntityLayout};
use crate::engine::types::{
    ComponentTypeId, DataLocation, Signature, SlotId, MAX_ENTITIES_PER_COLLECTION,
};


/// A fixed-capacity slab of entity records inside one allocator block range.
///
/// Entities are addressed by [`SlotId`]; the record of slot `s` starts at
/// `base.offset + s * entity_size`. A collection never shrinks and is never
/// destroyed individually — its template owns it for the context's lifetime.
pub struct Collection {
    base: DataLocation,
    entity_size: usize,
    capacity: u16,
    free_entries: BinaryHeap<Reverse<SlotId>>,
    last_free_entry: u16,
}

impl Collection {
    fn new(base: DataLocation, entity_size: usize, capacity: u16) -> Self {
        debug_assert!(capacity as usize <= MAX_ENTITIES_PER_COLLECTION);
        Self {
            base,
            entity_size,
            capacity,
            free_entries: BinaryHeap::new(),
            last_free_entry: 0,
        }
    }

    /// Pops the smallest returned slot id, or advances the high-water mark.
    ///
    /// Returns `None` when the collection is full.
    pub fn get_free_entry(&mut self) -> Option<SlotId> {
        if let Some(Reverse(slot)) = self.free_entries.pop() {
            return Some(slot);
        }
        if self.last_free_entry < self.capacity {
            let slot = self.last_free_entry as SlotId;
            self.last_free_entry += 1;
            return Some(slot);
        }
        None
    }

    /// Returns a slot to the free list.
    ///
    /// Callers must not return the same slot twice without re-acquiring it.
    pub fn return_entry(&mut self, slot: SlotId) {
        debug_assert!((slot as u16) < self.last_free_entry);
        self.free_entries.push(Reverse(slot));
    }

    /// Returns `true` when the high-water mark has reached capacity and no
    /// slot has been returned.
    pub fn is_full(&self) -> bool {
        self.last_free_entry >= self.capacity && self.free_entries.is_empty()
    }

    /// Number of entity slots this collection can hold.
    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    /// Byte location of a slot's entity record.
    #[inline]
    pub fn slot_location(&self, slot: SlotId) -> DataLocation {
        self.base.advanced(slot as usize * self.entity_size)
    }
}

/// Canonical layout and slab storage for one unique signature.
///
/// Immutable once constructed apart from its growing collection list:
/// `entity_size`, the ordered offset list, and the id → offset map never
/// change after creation.
pub struct EntityTemplate {
    entity_size: usize,
    entities_per_collection: u16,
    offsets: Vec<ComponentOffsetItem>,
    offset_map: BTreeMap<ComponentTypeId, ComponentOffsetItem>,
    collections: Vec<Collection>,
}

impl EntityTemplate {
    /// Builds a template from a canonical layout.
    ///
    /// The per-collection entity count is clamped so one slab always fits
    /// inside a single allocator block: `min(configured, block_size /
    /// entity_size)`, at least 1. A record larger than a block therefore
    /// fails at allocation time, while any record that fits can always be
    /// slabbed.
    pub fn new(layout: &EntityLayout, entities_per_collection: usize, block_size: usize) -> Self {
        let configured = entities_per_collection.clamp(1, MAX_ENTITIES_PER_COLLECTION);
        let per_block = if layout.entity_size == 0 {
            configured
        } else {
            (block_size / layout.entity_size).max(1)
        };

        let offset_map = layout
            .items
            .iter()
            .map(|item| (item.component_id, *item))
            .collect();

        Self {
            entity_size: layout.entity_size,
            entities_per_collection: configured.min(per_block) as u16,
            offsets: layout.items.clone(),
            offset_map,
            collections: Vec::new(),
        }
    }

    /// Total record size in bytes, including padding.
    pub fn entity_size(&self) -> usize {
        self.entity_size
    }

    /// Effective entity capacity of each collection slab.
    pub fn entities_per_collection(&self) -> usize {
        self.entities_per_collection as usize
    }

    /// Ordered, duplicate-free offset entries of this template.
    pub fn offsets(&self) -> &[ComponentOffsetItem] {
        &self.offsets
    }

    /// Offset entry for a component type, if the template carries it.
    pub fn offset_of(&self, component_id: ComponentTypeId) -> Option<&ComponentOffsetItem> {
        self.offset_map.get(&component_id)
    }

    /// Collections owned by this template.
    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    /// Mutable access to one owned collection.
    pub(crate) fn collection_mut(&mut self, index: usize) -> &mut Collection {
        &mut self.collections[index]
    }

    /// Returns the index of a collection with a free slot, creating a new
    /// collection from `allocator` when every existing one is full.
    ///
    /// # Errors
    /// Propagates the allocator error when a fresh slab cannot be carved —
    /// in practice only when a single record exceeds the block size.
    pub fn get_free_collection(
        &mut self,
        allocator: &mut Allocator,
        signature: &Signature,
    ) -> Result<usize, AllocationError> {
        if let Some(index) = self.collections.iter().position(|c| !c.is_full()) {
            return Ok(index);
        }

        let slab_bytes = self.entities_per_collection as usize * self.entity_size;
        let base = allocator.request(slab_bytes)?;
        self.collections
            .push(Collection::new(base, self.entity_size, self.entities_per_collection));
        debug!(
            "new collection for signature {signature}: {} entities x {} bytes at block {} offset {}",
            self.entities_per_collection, self.entity_size, base.block, base.offset
        );
        Ok(self.collections.len() - 1)
    }
}
