//! Context orchestration: entity lifecycle, migration, and system dispatch.
//!
//! The [`Context`] is the single owner of everything the engine manages:
//! the block [`Allocator`], every [`EntityTemplate`] (and transitively every
//! collection slab), every [`ComponentGroup`], the registered systems, and
//! the per-entity metadata. Entities and component data have no existence
//! outside their owning context, and all memory is reclaimed only when the
//! context is dropped.
//!
//! ## Execution model
//!
//! The context is **single-threaded, synchronous, and non-reentrant**:
//! every public operation runs to completion on the caller's thread with no
//! internal locking. A frame consists of the host calling
//! [`Context::process`], which drives each registered system in
//! registration order over its group's packed arrays.
//!
//! Structural mutation from inside a system is not expressible: lifecycle
//! callbacks receive only an [`Entity`] handle, and `process` receives a
//! [`GroupView`] — neither grants access to the context. Mutations happen
//! between frames, on the caller's side, under `&mut Context`.
//!
//! ## Component references
//!
//! [`Context::get_component`] borrows are scoped to the context borrow, so
//! any mutating call (which takes `&mut self`) statically invalidates every
//! outstanding component reference. A stale pointer past a migrating
//! component add cannot be written in safe code.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use log::{debug, trace};
use serde::{Deserialize, Serialize};

use crate::engine::allocator::Allocator;
use crate::engine::component::{Component, ComponentRegistry, ComponentSet};
use crate::engine::entity::{Entity, EntityIndex, EntityRecord, Placement};
use crate::engine::error::{EcsResult, StaleEntityError};
use crate::engine::group::{ComponentGroup, GroupView};
use crate::engine::layout::{
    migration_offsets, ordered_offsets, unordered_offsets, EntityLayout, OFFSET_ALREADY_PLACED,
};
use crate::engine::systems::System;
use crate::engine::template::EntityTemplate;
use crate::engine::types::{ComponentTypeId, DataLocation, Signature};


/// Configuration surface of a [`Context`].
///
/// Loaded once at startup; hosts typically deserialize it from their config
/// file alongside the rest of their settings.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ContextDescriptor {
    /// Bytes per allocator block. Must be at least the size of the largest
    /// entity record the application will create.
    pub memory_block_size: usize,

    /// Requested entities per collection slab, clamped to `1..=256` and
    /// further clamped per template so one slab fits in one block.
    pub entities_per_collection: usize,

    /// Initial capacity hint for each group's packed component array.
    pub reserved_components_per_group: usize,
}

impl Default for ContextDescriptor {
    fn default() -> Self {
        Self {
            memory_block_size: 16_384,
            entities_per_collection: 64,
            reserved_components_per_group: 128,
        }
    }
}

/// Central owner and orchestrator of the storage engine.
pub struct Context {
    descriptor: ContextDescriptor,
    registry: ComponentRegistry,
    allocator: Allocator,
    templates: BTreeMap<Signature, EntityTemplate>,
    groups: BTreeMap<Signature, ComponentGroup>,
    systems: Vec<(Signature, Rc<RefCell<dyn System>>)>,
    entities: EntityIndex,
}

impl Context {
    /// Creates a context from a descriptor and a component registry.
    ///
    /// The registry is frozen here: component identity is fixed for the
    /// lifetime of the context.
    ///
    /// # Errors
    /// [`AllocationError::ZeroBlockSize`](crate::engine::error::AllocationError::ZeroBlockSize)
    /// if the descriptor's block size is zero.
    pub fn new(descriptor: ContextDescriptor, mut registry: ComponentRegistry) -> EcsResult<Self> {
        let allocator = Allocator::new(descriptor.memory_block_size)?;
        registry.freeze();
        debug!(
            "context created: block size {}, {} component types registered",
            descriptor.memory_block_size,
            registry.len()
        );

        Ok(Self {
            descriptor,
            registry,
            allocator,
            templates: BTreeMap::new(),
            groups: BTreeMap::new(),
            systems: Vec::new(),
            entities: EntityIndex::new(),
        })
    }

    /// The component registry backing this context.
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    /// Read-only access to the allocator, for diagnostics.
    pub fn allocator(&self) -> &Allocator {
        &self.allocator
    }

    /// The descriptor this context was built from.
    pub fn descriptor(&self) -> &ContextDescriptor {
        &self.descriptor
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if `entity` exists in this context.
    pub fn is_alive(&self, entity: Entity) -> bool {
        self.entities.is_alive(entity)
    }

    /// The component group for a signature, if one exists.
    pub fn group(&self, signature: &Signature) -> Option<&ComponentGroup> {
        self.groups.get(signature)
    }

    /// Registers a system, attaching it to the group for its signature.
    ///
    /// Idempotent by instance identity: registering the same `Rc` twice is
    /// a silent no-op. There is no retroactive notification — entities
    /// created before registration do not fire `on_create_entity`.
    pub fn register_system(&mut self, system: Rc<RefCell<dyn System>>) {
        let signature = system.borrow().signature();
        let reserved = self.descriptor.reserved_components_per_group;
        let group = self.groups.entry(signature).or_insert_with(|| {
            debug!("new component group for signature {signature}");
            ComponentGroup::new(signature, reserved)
        });

        if group.attach_system(&system) {
            self.systems.push((signature, Rc::clone(&system)));
            system.borrow_mut().on_register();
        }
    }

    /// Creates an entity carrying the component set `S`.
    ///
    /// Duplicate types in `S` are collapsed; each distinct component is
    /// default-constructed exactly once. Every group whose signature the
    /// new entity's signature contains receives the entity and fires
    /// `on_create_entity` on its systems.
    ///
    /// The entity id is consumed even when the call fails, so ids keep
    /// incrementing across rejected attempts.
    ///
    /// # Errors
    /// * Registry errors for unregistered component types.
    /// * Allocation errors when the record cannot be placed — notably when
    ///   a single record exceeds the configured block size.
    pub fn create_entity<S: ComponentSet>(&mut self) -> EcsResult<Entity> {
        let entity = self.entities.issue_id();
        let ids = S::component_ids(&self.registry)?;
        let signature = Signature::from_ids(&ids);
        let layout = ordered_offsets(&self.registry, &ids);

        self.ensure_template(signature, &layout);
        let placement = self
            .allocate_slot(signature)?
            .expect("component sets always name at least one type");

        // Default-construct each distinct component once; repeats in the
        // caller's list carry the sentinel and are skipped.
        for item in unordered_offsets(&layout, &ids) {
            if item.offset == OFFSET_ALREADY_PLACED {
                continue;
            }
            let desc = self.registry.descriptor_unchecked(item.component_id);
            let slot = placement.location.offset + item.offset;
            let ptr = unsafe { self.allocator.block_ptr_mut(placement.location.block).add(slot) };
            unsafe { (desc.write_default)(ptr) };
        }

        let mut record =
            EntityRecord { signature, placement: Some(placement), groups: Vec::new() };

        let mut created = Vec::new();
        let template = self.templates.get(&signature).expect("template ensured above");
        for (group_signature, group) in self.groups.iter_mut() {
            if !signature.contains_all(group_signature) {
                continue;
            }
            let locations = member_locations(template, placement.location, group.component_ids());
            group.add_entity(entity, &locations);
            record.groups.push(*group_signature);
            for system in group.systems() {
                created.push(Rc::clone(system));
            }
        }

        self.entities.insert(entity, record);
        trace!("created entity {} with signature {signature}", entity.0);

        for system in created {
            system.borrow_mut().on_create_entity(entity);
        }
        Ok(entity)
    }

    /// Adds the component set `S` to an existing entity.
    ///
    /// Types the entity already carries (and duplicates within `S`) are
    /// ignored; if nothing would change, this is a silent no-op. Otherwise
    /// the entity's bytes migrate to the template of the grown signature,
    /// newly added components are default-constructed, and groups the
    /// entity newly matches fire `on_create_entity`. Existing memberships
    /// are refreshed in place — signatures only grow here, so none are
    /// lost.
    ///
    /// # Errors
    /// * [`StaleEntityError`] for unknown or destroyed entities.
    /// * Registry and allocation errors as for
    ///   [`Context::create_entity`]; on failure the entity is left
    ///   untouched in its old placement.
    pub fn add_components<S: ComponentSet>(&mut self, entity: Entity) -> EcsResult<()> {
        let record = self
            .entities
            .get(entity)
            .ok_or(StaleEntityError { entity: entity.0 })?;
        let old_signature = record.signature;
        let old_placement = record.placement;

        let ids = S::component_ids(&self.registry)?;
        let new_signature = old_signature | Signature::from_ids(&ids);
        if new_signature == old_signature {
            return Ok(());
        }

        let old_ids: Vec<ComponentTypeId> = old_signature.iter_ids().collect();
        let new_ids: Vec<ComponentTypeId> = new_signature.iter_ids().collect();
        let old_layout = ordered_offsets(&self.registry, &old_ids);
        let new_layout = ordered_offsets(&self.registry, &new_ids);

        self.ensure_template(new_signature, &new_layout);
        let new_placement = self
            .allocate_slot(new_signature)?
            .expect("a grown signature is never empty");

        let plan = migration_offsets(&old_layout, &new_layout);
        if let Some(old) = &old_placement {
            for item in &plan.moved {
                self.allocator.copy_bytes(
                    old.location.advanced(item.old_offset),
                    new_placement.location.advanced(item.new_offset),
                    item.size,
                );
            }
        }
        for item in &plan.added {
            let desc = self.registry.descriptor_unchecked(item.component_id);
            let slot = new_placement.location.offset + item.offset;
            let ptr =
                unsafe { self.allocator.block_ptr_mut(new_placement.location.block).add(slot) };
            unsafe { (desc.write_default)(ptr) };
        }

        if let Some(old) = &old_placement {
            self.release_slot(old);
        }

        let record = self.entities.get_mut(entity).expect("checked above");
        record.signature = new_signature;
        record.placement = Some(new_placement);

        let mut created = Vec::new();
        let template = self.templates.get(&new_signature).expect("template ensured above");
        for (group_signature, group) in self.groups.iter_mut() {
            let was_member = old_signature.contains_all(group_signature);
            let is_member = new_signature.contains_all(group_signature);

            if was_member {
                let locations =
                    member_locations(template, new_placement.location, group.component_ids());
                group.refresh_entity(entity, &locations);
            } else if is_member {
                let locations =
                    member_locations(template, new_placement.location, group.component_ids());
                group.add_entity(entity, &locations);
                record.groups.push(*group_signature);
                for system in group.systems() {
                    created.push(Rc::clone(system));
                }
            }
        }

        trace!(
            "entity {} migrated {old_signature} -> {new_signature} (add)",
            entity.0
        );
        for system in created {
            system.borrow_mut().on_create_entity(entity);
        }
        Ok(())
    }

    /// Removes the component set `S` from an entity.
    ///
    /// Types the entity does not carry are ignored; if nothing would
    /// change, this is a silent no-op. Groups the entity stops matching
    /// fire `on_destroy_entity`; surviving component bytes migrate
    /// unchanged.
    ///
    /// # Errors
    /// [`StaleEntityError`] for unknown entities; registry errors for
    /// unregistered types; allocation errors for the shrunken record.
    pub fn remove_components<S: ComponentSet>(&mut self, entity: Entity) -> EcsResult<()> {
        let record = self
            .entities
            .get(entity)
            .ok_or(StaleEntityError { entity: entity.0 })?;
        let old_signature = record.signature;

        let ids = S::component_ids(&self.registry)?;
        let mut new_signature = old_signature;
        new_signature.unset_all(&ids);

        self.migrate_down(entity, old_signature, new_signature)
    }

    /// Strips every component from an entity, leaving it alive and empty.
    ///
    /// # Errors
    /// [`StaleEntityError`] for unknown entities.
    pub fn remove_all_components(&mut self, entity: Entity) -> EcsResult<()> {
        let record = self
            .entities
            .get(entity)
            .ok_or(StaleEntityError { entity: entity.0 })?;
        let old_signature = record.signature;
        self.migrate_down(entity, old_signature, Signature::new())
    }

    /// Destroys an entity: every group it belonged to fires
    /// `on_destroy_entity`, its slot returns to its collection's free list,
    /// and its metadata is dropped. The id is never reused.
    ///
    /// # Errors
    /// [`StaleEntityError`] if the entity does not exist.
    pub fn destroy_entity(&mut self, entity: Entity) -> EcsResult<()> {
        let record = self
            .entities
            .remove(entity)
            .ok_or(StaleEntityError { entity: entity.0 })?;

        let mut destroyed = Vec::new();
        for group_signature in &record.groups {
            if let Some(group) = self.groups.get_mut(group_signature) {
                group.remove_entity(entity);
                for system in group.systems() {
                    destroyed.push(Rc::clone(system));
                }
            }
        }

        if let Some(placement) = &record.placement {
            self.release_slot(placement);
        }
        trace!("destroyed entity {}", entity.0);

        for system in destroyed {
            system.borrow_mut().on_destroy_entity(entity);
        }
        Ok(())
    }

    /// Reads component `T` of an entity.
    ///
    /// Returns `None` when the entity is unknown, `T` is unregistered, or
    /// the entity does not carry `T`.
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        let (location, _) = self.component_location::<T>(entity)?;
        let ptr = unsafe { self.allocator.block_ptr(location.block).add(location.offset) };
        Some(unsafe { &*(ptr as *const T) })
    }

    /// Mutably borrows component `T` of an entity.
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        let (location, _) = self.component_location::<T>(entity)?;
        let ptr = unsafe { self.allocator.block_ptr_mut(location.block).add(location.offset) };
        Some(unsafe { &mut *(ptr as *mut T) })
    }

    /// Runs one frame: each registered system, in registration order,
    /// processes its group's packed component arrays.
    pub fn process(&mut self, delta_time: f32) {
        let systems = self.systems.clone();
        for (signature, system) in systems {
            let group = self
                .groups
                .get(&signature)
                .expect("every registered system has a group");
            let mut view = GroupView::new(group, &mut self.allocator, &self.registry);
            system.borrow_mut().process(&mut view, delta_time);
        }
    }

    /// Returns a mutation handle for an entity.
    ///
    /// # Errors
    /// [`StaleEntityError`] if the entity does not exist.
    pub fn entity_mut(&mut self, entity: Entity) -> EcsResult<EntityHandle<'_>> {
        if !self.entities.is_alive(entity) {
            return Err(StaleEntityError { entity: entity.0 }.into());
        }
        Ok(EntityHandle { entity, context: self })
    }
}

impl Context {
    fn ensure_template(&mut self, signature: Signature, layout: &EntityLayout) {
        if signature.is_empty() || self.templates.contains_key(&signature) {
            return;
        }
        debug!(
            "new entity template for signature {signature}: {} bytes, {} components",
            layout.entity_size,
            layout.items.len()
        );
        self.templates.insert(
            signature,
            EntityTemplate::new(
                layout,
                self.descriptor.entities_per_collection,
                self.allocator.block_size(),
            ),
        );
    }

    /// Obtains a free slot in the template for `signature`.
    ///
    /// An empty signature has no storage and yields no placement.
    fn allocate_slot(&mut self, signature: Signature) -> EcsResult<Option<Placement>> {
        if signature.is_empty() {
            return Ok(None);
        }

        let template = self
            .templates
            .get_mut(&signature)
            .expect("template must be ensured before allocating");
        let collection = template.get_free_collection(&mut self.allocator, &signature)?;
        let slot = template
            .collection_mut(collection)
            .get_free_entry()
            .expect("free collection must yield a slot");
        let location = template.collection_mut(collection).slot_location(slot);

        Ok(Some(Placement { template: signature, collection, slot, location }))
    }

    fn release_slot(&mut self, placement: &Placement) {
        if let Some(template) = self.templates.get_mut(&placement.template) {
            template.collection_mut(placement.collection).return_entry(placement.slot);
        }
    }

    /// Shared path for component removal: migrates an entity from
    /// `old_signature` down to `new_signature` (a subset).
    fn migrate_down(
        &mut self,
        entity: Entity,
        old_signature: Signature,
        new_signature: Signature,
    ) -> EcsResult<()> {
        if new_signature == old_signature {
            return Ok(());
        }

        let old_placement = self
            .entities
            .get(entity)
            .and_then(|record| record.placement);

        let old_ids: Vec<ComponentTypeId> = old_signature.iter_ids().collect();
        let new_ids: Vec<ComponentTypeId> = new_signature.iter_ids().collect();
        let old_layout = ordered_offsets(&self.registry, &old_ids);
        let new_layout = ordered_offsets(&self.registry, &new_ids);

        self.ensure_template(new_signature, &new_layout);
        let new_placement = self.allocate_slot(new_signature)?;

        if let (Some(old), Some(new)) = (&old_placement, &new_placement) {
            let plan = migration_offsets(&old_layout, &new_layout);
            for item in &plan.moved {
                self.allocator.copy_bytes(
                    old.location.advanced(item.old_offset),
                    new.location.advanced(item.new_offset),
                    item.size,
                );
            }
        }

        if let Some(old) = &old_placement {
            self.release_slot(old);
        }

        let record = self.entities.get_mut(entity).expect("caller verified liveness");
        record.signature = new_signature;
        record.placement = new_placement;

        let mut destroyed = Vec::new();
        let template = self.templates.get(&new_signature);
        let mut kept_groups = Vec::new();
        for group_signature in std::mem::take(&mut record.groups) {
            let group = self
                .groups
                .get_mut(&group_signature)
                .expect("membership lists only name existing groups");

            if new_signature.contains_all(&group_signature) {
                let locations = match (&new_placement, template) {
                    (Some(placement), Some(template)) => {
                        member_locations(template, placement.location, group.component_ids())
                    }
                    // Only the empty group signature matches a bare entity.
                    _ => Vec::new(),
                };
                group.refresh_entity(entity, &locations);
                kept_groups.push(group_signature);
            } else {
                group.remove_entity(entity);
                for system in group.systems() {
                    destroyed.push(Rc::clone(system));
                }
            }
        }
        record.groups = kept_groups;

        trace!(
            "entity {} migrated {old_signature} -> {new_signature} (remove)",
            entity.0
        );
        for system in destroyed {
            system.borrow_mut().on_destroy_entity(entity);
        }
        Ok(())
    }

    fn component_location<T: Component>(&self, entity: Entity) -> Option<(DataLocation, usize)> {
        let record = self.entities.get(entity)?;
        let placement = record.placement.as_ref()?;
        let component_id = self.registry.id_of::<T>()?;
        if record.signature.is_unset(component_id) {
            return None;
        }

        let template = self.templates.get(&placement.template)?;
        let item = template.offset_of(component_id)?;
        Some((placement.location.advanced(item.offset), item.size))
    }
}

/// Resolves a member's per-component locations for one group, in the
/// group's ascending component-id order.
fn member_locations(
    template: &EntityTemplate,
    base: DataLocation,
    component_ids: &[ComponentTypeId],
) -> Vec<DataLocation> {
    component_ids
        .iter()
        .map(|&component_id| {
            let item = template
                .offset_of(component_id)
                .expect("member signature covers every group component");
            base.advanced(item.offset)
        })
        .collect()
}

/// Mutation handle pairing an [`Entity`] with its owning [`Context`].
///
/// Thin sugar over the context operations for call sites that hold a
/// specific entity.
pub struct EntityHandle<'a> {
    entity: Entity,
    context: &'a mut Context,
}

impl<'a> EntityHandle<'a> {
    /// The entity this handle refers to.
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// See [`Context::add_components`].
    pub fn add_components<S: ComponentSet>(&mut self) -> EcsResult<()> {
        self.context.add_components::<S>(self.entity)
    }

    /// See [`Context::remove_components`].
    pub fn remove_components<S: ComponentSet>(&mut self) -> EcsResult<()> {
        self.context.remove_components::<S>(self.entity)
    }

    /// See [`Context::remove_all_components`].
    pub fn remove_all_components(&mut self) -> EcsResult<()> {
        self.context.remove_all_components(self.entity)
    }

    /// See [`Context::get_component`].
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.context.get_component::<T>(self.entity)
    }

    /// See [`Context::get_component_mut`].
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.context.get_component_mut::<T>(self.entity)
    }
}
