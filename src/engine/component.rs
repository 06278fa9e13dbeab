//! # Component Registry
//!
//! This module assigns stable [`ComponentTypeId`] values to Rust component
//! types and records the metadata (size, alignment, default constructor) the
//! layout calculator and context need to place component data inside raw
//! entity records.
//!
//! ## Purpose
//! The registry decouples component type information (`TypeId`, name, size,
//! alignment) from storage, so templates can compute byte layouts for
//! arbitrary component sets without any per-type code.
//!
//! ## Design
//! - The registry is an **explicit value built once at startup** and handed
//!   to [`Context::new`](crate::engine::context::Context::new), which
//!   freezes it. There is no global mutable state: ids are deterministic in
//!   registration order, not call-order-dependent.
//! - Components are assigned compact ids in `[0, MAX_COMPONENT_TYPES)`.
//! - Re-registering a type returns its existing id.
//!
//! ## Invariants
//! - `ComponentTypeId` values are unique and stable for the registry's
//!   lifetime, and dense enough to index a [`Signature`] bitset.
//! - Every registered component has a descriptor with a valid in-place
//!   default constructor.
//! - When frozen, registration is disallowed.

use std::any::{type_name, TypeId};
use std::collections::HashMap;
use std::mem::{align_of, size_of};
use std::ptr;

use crate::engine::allocator::MAX_COMPONENT_ALIGN;
use crate::engine::error::RegistryError;
use crate::engine::types::{ComponentTypeId, Signature, MAX_COMPONENT_TYPES};


/// Marker trait for types storable as entity components.
///
/// `Copy` makes byte-for-byte migration between template layouts sound (no
/// drop glue, no interior ownership); `Default` supplies the value written
/// when a component is constructed in place. Implement it explicitly:
///
/// ```
/// use packed_ecs::engine::component::Component;
///
/// #[derive(Clone, Copy, Default)]
/// struct Translation { x: f32, y: f32, z: f32 }
///
/// impl Component for Translation {}
/// ```
pub trait Component: Copy + Default + 'static {}

/// Writes `T::default()` into an uninitialized, properly aligned slot.
///
/// # Safety
/// `slot` must be valid for writes of `size_of::<T>()` bytes and aligned to
/// `align_of::<T>()`.
unsafe fn write_default<T: Component>(slot: *mut u8) {
    unsafe { ptr::write(slot as *mut T, T::default()) };
}

/// Describes a registered component type.
///
/// `ComponentDesc` is `Copy` and safe to clone freely for diagnostics.
#[derive(Clone, Copy)]
pub struct ComponentDesc {
    /// Identifier assigned by the registry.
    pub component_id: ComponentTypeId,

    /// Rust type name, for diagnostics.
    pub name: &'static str,

    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,

    /// Size of the component type in bytes.
    pub size: usize,

    /// Alignment of the component type in bytes.
    pub align: usize,

    /// In-place default constructor.
    ///
    /// # Safety
    /// The pointer must address `size` writable bytes aligned to `align`.
    pub write_default: unsafe fn(*mut u8),
}

impl std::fmt::Debug for ComponentDesc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentDesc")
            .field("component_id", &self.component_id)
            .field("name", &self.name)
            .field("size", &self.size)
            .field("align", &self.align)
            .finish()
    }
}

/// Explicit mapping between Rust component types and compact ids.
///
/// Build one at startup, register every component type the application uses,
/// then pass it to `Context::new`, which freezes it. Deterministic,
/// injectable, and testable — two registries built with the same
/// registration order assign the same ids.
#[derive(Default)]
pub struct ComponentRegistry {
    by_type: HashMap<TypeId, ComponentTypeId>,
    descriptors: Vec<ComponentDesc>,
    frozen: bool,
}

impl ComponentRegistry {
    /// Creates an empty, unfrozen registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers component type `T` and returns its assigned id.
    ///
    /// If `T` is already registered, the existing id is returned and the
    /// registry is unchanged (including when frozen).
    ///
    /// # Errors
    /// * [`RegistryError::Frozen`] if the registry was frozen.
    /// * [`RegistryError::CapacityExceeded`] past [`MAX_COMPONENT_TYPES`].
    /// * [`RegistryError::ZeroSized`] for zero-sized types; byte-packed
    ///   records cannot address them.
    /// * [`RegistryError::UnsupportedAlignment`] for alignment above
    ///   [`MAX_COMPONENT_ALIGN`].
    pub fn register<T: Component>(&mut self) -> Result<ComponentTypeId, RegistryError> {
        let type_id = TypeId::of::<T>();
        if let Some(&existing) = self.by_type.get(&type_id) {
            return Ok(existing);
        }

        if self.frozen {
            return Err(RegistryError::Frozen);
        }
        if self.descriptors.len() >= MAX_COMPONENT_TYPES {
            return Err(RegistryError::CapacityExceeded { capacity: MAX_COMPONENT_TYPES });
        }
        if size_of::<T>() == 0 {
            return Err(RegistryError::ZeroSized { name: type_name::<T>() });
        }
        if align_of::<T>() > MAX_COMPONENT_ALIGN {
            return Err(RegistryError::UnsupportedAlignment {
                name: type_name::<T>(),
                align: align_of::<T>(),
                max: MAX_COMPONENT_ALIGN,
            });
        }

        let component_id = self.descriptors.len() as ComponentTypeId;
        self.by_type.insert(type_id, component_id);
        self.descriptors.push(ComponentDesc {
            component_id,
            name: type_name::<T>(),
            type_id,
            size: size_of::<T>(),
            align: align_of::<T>(),
            write_default: write_default::<T>,
        });
        Ok(component_id)
    }

    /// Freezes the registry, preventing further registrations.
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Returns `true` if the registry has been frozen.
    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Number of registered component types.
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    /// Returns `true` if no component types are registered.
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Returns the id for `T`, if registered.
    pub fn id_of<T: Component>(&self) -> Option<ComponentTypeId> {
        self.by_type.get(&TypeId::of::<T>()).copied()
    }

    /// Returns the id for `T`, or an error naming the missing type.
    pub fn require_id_of<T: Component>(&self) -> Result<ComponentTypeId, RegistryError> {
        self.id_of::<T>()
            .ok_or(RegistryError::UnknownComponent { name: type_name::<T>() })
    }

    /// Returns the descriptor for a component id, if one is registered.
    pub fn descriptor(&self, component_id: ComponentTypeId) -> Option<&ComponentDesc> {
        self.descriptors.get(component_id as usize)
    }

    /// Returns the descriptor for a component id.
    ///
    /// Internal callers only pass ids previously issued by this registry.
    #[inline]
    pub(crate) fn descriptor_unchecked(&self, component_id: ComponentTypeId) -> &ComponentDesc {
        &self.descriptors[component_id as usize]
    }
}

/// A compile-time list of component types.
///
/// Implemented for any single [`Component`] and for tuples up to arity
/// eight. The id list preserves the caller's order and multiplicity;
/// duplicate types are collapsed downstream by the layout calculator, so
/// `(A, B, A)` behaves exactly like `(B, A)`.
pub trait ComponentSet {
    /// Resolves the set to registered component ids, in declaration order.
    fn component_ids(registry: &ComponentRegistry) -> Result<Vec<ComponentTypeId>, RegistryError>;

    /// Resolves the set to its signature (order-independent).
    fn signature(registry: &ComponentRegistry) -> Result<Signature, RegistryError> {
        Ok(Signature::from_ids(&Self::component_ids(registry)?))
    }
}

impl<T: Component> ComponentSet for T {
    fn component_ids(registry: &ComponentRegistry) -> Result<Vec<ComponentTypeId>, RegistryError> {
        Ok(vec![registry.require_id_of::<T>()?])
    }
}

macro_rules! impl_component_set_for_tuple {
    ($($ty:ident),+) => {
        impl<$($ty: Component),+> ComponentSet for ($($ty,)+) {
            fn component_ids(
                registry: &ComponentRegistry,
            ) -> Result<Vec<ComponentTypeId>, RegistryError> {
                Ok(vec![$(registry.require_id_of::<$ty>()?),+])
            }
        }
    };
}

impl_component_set_for_tuple!(A);
impl_component_set_for_tuple!(A, B);
impl_component_set_for_tuple!(A, B, C);
impl_component_set_for_tuple!(A, B, C, D);
impl_component_set_for_tuple!(A, B, C, D, E);
impl_component_set_for_tuple!(A, B, C, D, E, F);
impl_component_set_for_tuple!(A, B, C, D, E, F, G);
impl_component_set_for_tuple!(A, B, C, D, E, F, G, H);
