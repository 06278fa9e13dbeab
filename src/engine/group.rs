//! Per-signature packed component arrays for registered systems.
//!
//! A [`ComponentGroup`] is keyed by a system's required [`Signature`] and
//! tracks every entity whose own signature is a **superset** of it. For each
//! member entity the group stores one [`DataLocation`] per required
//! component type, flattened into a single packed array:
//!
//! ```text
//! slots: [ e0.c0, e0.c1, e1.c0, e1.c1, e2.c0, e2.c1, ... ]
//! ```
//!
//! so `entity_count * components_per_entity == slots.len()` at all times.
//! Removal swap-removes the whole span, keeping the arrays dense; group
//! order is therefore *not* creation order, and systems address members by
//! group-local index.
//!
//! [`GroupView`] is the window a system receives during `process`: typed,
//! bounds-checked access to the packed members, resolved through the
//! registry and the allocator's stable block pointers.
//!
//! ## Safety
//!
//! Typed access casts raw block bytes to `&T`/`&mut T`. Soundness rests on:
//! - locations in `slots` always pointing at live, aligned component data
//!   (the context refreshes them on every migration),
//! - the registry mapping `T` to the id whose bytes are stored there,
//! - `GroupView` holding the allocator mutably, so no second view aliases
//!   the same frame.

use std::cell::RefCell;
use std::rc::Rc;

use crate::engine::allocator::Allocator;
use crate::engine::component::{Component, ComponentRegistry};
use crate::engine::entity::Entity;
use crate::engine::systems::System;
use crate::engine::types::{ComponentTypeId, DataLocation, Signature};


/// Packed component array shared by every system requiring one signature.
pub struct ComponentGroup {
    signature: Signature,
    component_ids: Vec<ComponentTypeId>,
    entities: Vec<Entity>,
    slots: Vec<DataLocation>,
    systems: Vec<Rc<RefCell<dyn System>>>,
}

impl ComponentGroup {
    /// Creates an empty group for `signature`, pre-sizing the packed arrays
    /// for `reserved_components` component slots.
    pub fn new(signature: Signature, reserved_components: usize) -> Self {
        let component_ids: Vec<ComponentTypeId> = signature.iter_ids().collect();
        let components_per_entity = component_ids.len().max(1);
        Self {
            signature,
            component_ids,
            entities: Vec::with_capacity(reserved_components / components_per_entity),
            slots: Vec::with_capacity(reserved_components),
            systems: Vec::new(),
        }
    }

    /// The required signature keying this group.
    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Component ids of the signature, ascending.
    pub fn component_ids(&self) -> &[ComponentTypeId] {
        &self.component_ids
    }

    /// Number of component slots per member entity.
    #[inline]
    pub fn components_per_entity(&self) -> usize {
        self.component_ids.len()
    }

    /// Number of member entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at a group-local index.
    #[inline]
    pub fn entity_at(&self, index: usize) -> Entity {
        self.entities[index]
    }

    /// Returns `true` if `entity` is a member.
    pub fn contains(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// Attaches a system, ignoring a second registration of the same
    /// instance. Returns `true` if the system was newly attached.
    pub fn attach_system(&mut self, system: &Rc<RefCell<dyn System>>) -> bool {
        if self.systems.iter().any(|existing| Rc::ptr_eq(existing, system)) {
            return false;
        }
        self.systems.push(Rc::clone(system));
        true
    }

    /// Systems attached to this group.
    pub fn systems(&self) -> &[Rc<RefCell<dyn System>>] {
        &self.systems
    }

    /// Adds a member with one location per required component, in id order.
    pub(crate) fn add_entity(&mut self, entity: Entity, locations: &[DataLocation]) {
        debug_assert_eq!(locations.len(), self.components_per_entity());
        debug_assert!(!self.contains(entity));
        self.entities.push(entity);
        self.slots.extend_from_slice(locations);
    }

    /// Swap-removes a member and its component span. Returns `false` if the
    /// entity was not a member.
    pub(crate) fn remove_entity(&mut self, entity: Entity) -> bool {
        let Some(index) = self.entities.iter().position(|&e| e == entity) else {
            return false;
        };

        let cpe = self.components_per_entity();
        let last = self.entities.len() - 1;
        self.entities.swap_remove(index);
        if index != last {
            for slot in 0..cpe {
                self.slots.swap(index * cpe + slot, last * cpe + slot);
            }
        }
        self.slots.truncate(last * cpe);
        true
    }

    /// Rewrites a member's component locations after its record moved.
    pub(crate) fn refresh_entity(&mut self, entity: Entity, locations: &[DataLocation]) {
        debug_assert_eq!(locations.len(), self.components_per_entity());
        if let Some(index) = self.entities.iter().position(|&e| e == entity) {
            let cpe = self.components_per_entity();
            self.slots[index * cpe..(index + 1) * cpe].copy_from_slice(locations);
        }
    }

    #[inline]
    fn slot(&self, index: usize, component_position: usize) -> DataLocation {
        self.slots[index * self.components_per_entity() + component_position]
    }
}

/// A system's read/write window onto its group for one `process` call.
///
/// Component references returned here are scoped to the borrow of the view,
/// which itself lives only for the duration of the call — a system cannot
/// retain a component pointer across a structural mutation.
pub struct GroupView<'a> {
    group: &'a ComponentGroup,
    allocator: &'a mut Allocator,
    registry: &'a ComponentRegistry,
}

impl<'a> GroupView<'a> {
    pub(crate) fn new(
        group: &'a ComponentGroup,
        allocator: &'a mut Allocator,
        registry: &'a ComponentRegistry,
    ) -> Self {
        Self { group, allocator, registry }
    }

    /// Number of member entities.
    #[inline]
    pub fn len(&self) -> usize {
        self.group.len()
    }

    /// Returns `true` if the group has no members.
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// Entity at a group-local index.
    #[inline]
    pub fn entity(&self, index: usize) -> Entity {
        self.group.entity_at(index)
    }

    #[inline]
    fn component_position<T: Component>(&self) -> Option<usize> {
        let component_id = self.registry.id_of::<T>()?;
        self.group.component_ids.binary_search(&component_id).ok()
    }

    /// Reads component `T` of the member at `index`.
    ///
    /// Returns `None` if `T` is not part of the group's signature or the
    /// index is out of bounds.
    pub fn component<T: Component>(&self, index: usize) -> Option<&T> {
        if index >= self.group.len() {
            return None;
        }
        let position = self.component_position::<T>()?;
        let location = self.group.slot(index, position);

        // Location validity: see module-level safety notes.
        let ptr = unsafe { self.allocator.block_ptr(location.block).add(location.offset) };
        Some(unsafe { &*(ptr as *const T) })
    }

    /// Mutably borrows component `T` of the member at `index`.
    pub fn component_mut<T: Component>(&mut self, index: usize) -> Option<&mut T> {
        if index >= self.group.len() {
            return None;
        }
        let position = self.component_position::<T>()?;
        let location = self.group.slot(index, position);

        let ptr = unsafe { self.allocator.block_ptr_mut(location.block).add(location.offset) };
        Some(unsafe { &mut *(ptr as *mut T) })
    }
}
