//! Component layout calculation for packed entity records.
//!
//! Pure functions that turn a list of component-type ids into byte offsets
//! inside an entity's contiguous record, in two orderings:
//!
//! - **Ordered-unique** ([`ordered_offsets`]): sorted by component id with
//!   duplicates dropped. This is the canonical [`EntityTemplate`] layout —
//!   two calls with the same *set* of types, in any order and with any
//!   multiplicity, resolve to the same layout.
//! - **Caller-order** ([`unordered_offsets`]): offsets in the caller's
//!   argument order, with repeat occurrences after the first mapped to the
//!   [`OFFSET_ALREADY_PLACED`] sentinel so their data is never written
//!   twice.
//!
//! [`migration_offsets`] merges two ordered layouts into the copy plan used
//! when an entity moves between templates after a component add or remove.
//!
//! Offsets respect each component's natural alignment (capped at
//! [`MAX_COMPONENT_ALIGN`](crate::engine::allocator::MAX_COMPONENT_ALIGN) by
//! the registry) and the total record size is rounded up to 8 so every slot
//! in a collection slab starts aligned.
//!
//! [`EntityTemplate`]: crate::engine::template::EntityTemplate
//! [`ordered_offsets`]: fn@ordered_offsets
//! [`unordered_offsets`]: fn@unordered_offsets
//! [`migration_offsets`]: fn@migration_offsets

use crate::engine::component::ComponentRegistry;
use crate::engine::types::ComponentTypeId;


/// Sentinel offset marking a duplicate occurrence in a caller-order list.
///
/// The first occurrence of a type carries the real offset; repeats carry
/// this value and must be skipped by the consumer.
pub const OFFSET_ALREADY_PLACED: usize = usize::MAX;

/// Size and byte offset of one component type within an entity record.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ComponentOffsetItem {
    /// The component type this entry describes.
    pub component_id: ComponentTypeId,
    /// Size of the component in bytes.
    pub size: usize,
    /// Byte offset from the start of the entity record.
    pub offset: usize,
}

/// Copy instruction for one component type present in both an old and a new
/// layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MigrationComponentOffsetItem {
    /// Size of the component in bytes.
    pub size: usize,
    /// Byte offset within the old record.
    pub old_offset: usize,
    /// Byte offset within the new record.
    pub new_offset: usize,
}

/// Canonical byte layout for one unique component set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityLayout {
    /// Total record size in bytes, including alignment padding, rounded up
    /// to 8.
    pub entity_size: usize,
    /// Offset entries sorted by component id, duplicate-free.
    pub items: Vec<ComponentOffsetItem>,
}

impl EntityLayout {
    /// Looks up the offset entry for a component id.
    pub fn item(&self, component_id: ComponentTypeId) -> Option<&ComponentOffsetItem> {
        self.items
            .binary_search_by_key(&component_id, |item| item.component_id)
            .ok()
            .map(|index| &self.items[index])
    }
}

/// Plan for copying an entity's bytes from one layout to another.
///
/// Built by a single two-pointer merge over two sorted, duplicate-free
/// offset lists. Component types present in both layouts appear in
/// `moved`; types present only in the new layout appear in `added` and are
/// default-constructed at their new offsets. Types present only in the old
/// layout are simply dropped (components are plain `Copy` data; there is
/// nothing to destruct).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationPlan {
    /// Byte-copy instructions for surviving component types.
    pub moved: Vec<MigrationComponentOffsetItem>,
    /// Offset entries present only in the new layout.
    pub added: Vec<ComponentOffsetItem>,
}

#[inline]
const fn align_up(value: usize, align: usize) -> usize {
    (value + align - 1) & !(align - 1)
}

/// Computes the canonical ordered-unique layout for a component id list.
///
/// Ids are sorted, duplicates dropped, and contiguous offsets assigned with
/// per-component alignment padding. Argument order and multiplicity do not
/// affect the result.
pub fn ordered_offsets(
    registry: &ComponentRegistry,
    component_ids: &[ComponentTypeId],
) -> EntityLayout {
    let mut unique: Vec<ComponentTypeId> = component_ids.to_vec();
    unique.sort_unstable();
    unique.dedup();

    let mut items = Vec::with_capacity(unique.len());
    let mut cursor = 0usize;
    for component_id in unique {
        let desc = registry.descriptor_unchecked(component_id);
        cursor = align_up(cursor, desc.align);
        items.push(ComponentOffsetItem { component_id, size: desc.size, offset: cursor });
        cursor += desc.size;
    }

    EntityLayout { entity_size: align_up(cursor, 8), items }
}

/// Maps a caller-order component id list onto a canonical layout.
///
/// Each entry carries the offset the type occupies in `layout`; repeat
/// occurrences after the first carry [`OFFSET_ALREADY_PLACED`]. Consumers
/// construct each component at most once by skipping the sentinel.
pub fn unordered_offsets(
    layout: &EntityLayout,
    component_ids: &[ComponentTypeId],
) -> Vec<ComponentOffsetItem> {
    let mut placed = Vec::with_capacity(component_ids.len());
    let mut out = Vec::with_capacity(component_ids.len());

    for &component_id in component_ids {
        let canonical = layout
            .item(component_id)
            .expect("caller-order id list must be a subset of the layout");

        let offset = if placed.contains(&component_id) {
            OFFSET_ALREADY_PLACED
        } else {
            placed.push(component_id);
            canonical.offset
        };

        out.push(ComponentOffsetItem { component_id, size: canonical.size, offset });
    }
    out
}

/// Builds the migration plan between two canonical layouts.
///
/// Both inputs must be sorted by component id and duplicate-free, which
/// [`ordered_offsets`] guarantees; the merge is a standard two-pointer walk,
/// O(n + m).
///
/// [`ordered_offsets`]: fn@ordered_offsets
pub fn migration_offsets(old: &EntityLayout, new: &EntityLayout) -> MigrationPlan {
    let mut plan = MigrationPlan::default();
    let mut old_index = 0;
    let mut new_index = 0;

    while old_index < old.items.len() && new_index < new.items.len() {
        let old_item = &old.items[old_index];
        let new_item = &new.items[new_index];

        match old_item.component_id.cmp(&new_item.component_id) {
            std::cmp::Ordering::Equal => {
                plan.moved.push(MigrationComponentOffsetItem {
                    size: old_item.size,
                    old_offset: old_item.offset,
                    new_offset: new_item.offset,
                });
                old_index += 1;
                new_index += 1;
            }
            std::cmp::Ordering::Less => {
                // Present only in the old layout: dropped on migration.
                old_index += 1;
            }
            std::cmp::Ordering::Greater => {
                plan.added.push(*new_item);
                new_index += 1;
            }
        }
    }

    plan.added.extend_from_slice(&new.items[new_index..]);
    plan
}
