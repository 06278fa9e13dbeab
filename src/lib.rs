//! # Packed ECS
//!
//! A storage-and-membership engine for entity-component data: packed
//! slab storage, signature-keyed layouts, and group-based system
//! dispatch.
//!
//! ## Design Goals
//! - Block-backed, bump-allocated component storage
//! - Canonical per-signature layouts with stable migration
//! - Smallest-first slot reuse inside fixed-capacity collections
//! - Safe, explicit data access
//!
//! ## Execution model
//!
//! The engine is single-threaded, synchronous, and non-reentrant. All
//! mutation flows through `&mut Context` between frames; systems observe
//! their groups through a [`GroupView`] during [`Context::process`].

#![forbid(unsafe_op_in_unsafe_fn)]
#![warn(missing_docs)]
#![allow(clippy::module_inception)]

pub mod engine;

// ─────────────────────────────────────────────────────────────────────────────
// Re-exports (Public API)
// ─────────────────────────────────────────────────────────────────────────────

// Core types

pub use engine::context::{
    Context,
    ContextDescriptor,
    EntityHandle,
};

pub use engine::entity::{
    Entity,
    Placement,
};

pub use engine::component::{
    Component,
    ComponentRegistry,
    ComponentSet,
};

pub use engine::systems::System;

pub use engine::group::{
    ComponentGroup,
    GroupView,
};

pub use engine::allocator::{
    Allocator,
    MAX_COMPONENT_ALIGN,
};

pub use engine::error::{
    EcsResult,
    EcsError,
    AllocationError,
    RegistryError,
    StaleEntityError,
};

pub use engine::types::{
    ComponentTypeId,
    DataLocation,
    EntityId,
    Signature,
    SlotId,
    MAX_COMPONENT_TYPES,
    MAX_ENTITIES_PER_COLLECTION,
};

// ─────────────────────────────────────────────────────────────────────────────
// Prelude (Optional but recommended)
// ─────────────────────────────────────────────────────────────────────────────

/// Commonly used engine types.
///
/// Import with:
/// ```rust
/// use packed_ecs::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Component,
        ComponentRegistry,
        ComponentSet,
        Context,
        ContextDescriptor,
        EcsResult,
        Entity,
        GroupView,
        Signature,
        System,
    };
}
