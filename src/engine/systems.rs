//! System abstractions and lifecycle callbacks.
//!
//! A **system** is a unit of logic interested in every entity whose
//! signature is a superset of the system's required signature. Systems:
//! - declare their required components once, as a [`Signature`],
//! - share a [`ComponentGroup`](crate::engine::group::ComponentGroup) with
//!   every other system requiring the same signature,
//! - receive lifecycle callbacks as entities enter and leave that group,
//! - are driven once per frame through [`System::process`] with a
//!   [`GroupView`] over the group's packed component arrays.
//!
//! ## Callback contract
//!
//! * [`System::on_register`] — fired once when the system is attached to a
//!   context. No retroactive `on_create_entity` calls are made for entities
//!   that already existed.
//! * [`System::on_create_entity`] — fired when an entity starts matching
//!   the system's signature, whether by creation or by a component add.
//! * [`System::on_destroy_entity`] — fired when the superset relation stops
//!   holding: a component remove, or the entity's destruction.
//! * [`System::process`] — the per-frame hook; the only required method.
//!
//! Lifecycle callbacks receive only the [`Entity`] handle. Structural
//! mutation of the owning context from inside a callback is therefore not
//! expressible — mutations must happen between frames, on the caller's
//! side.
//!
//! The engine is single-threaded (see the crate docs); systems are stored
//! and dispatched as `Rc<RefCell<dyn System>>`.

use crate::engine::entity::Entity;
use crate::engine::group::GroupView;
use crate::engine::types::Signature;


/// A processing unit registered with a context.
///
/// Only [`System::process`] is required; the lifecycle callbacks default to
/// no-ops, matching the common case of systems that just iterate their
/// group each frame.
pub trait System {
    /// The set of component types this system requires.
    ///
    /// Must be stable: the value returned at registration time keys the
    /// system's component group for the lifetime of the context.
    fn signature(&self) -> Signature;

    /// Called once when the system is registered with a context.
    fn on_register(&mut self) {}

    /// Called when `entity` starts matching this system's signature.
    fn on_create_entity(&mut self, entity: Entity) {
        let _ = entity;
    }

    /// Called when `entity` stops matching this system's signature.
    fn on_destroy_entity(&mut self, entity: Entity) {
        let _ = entity;
    }

    /// Per-frame processing over the system's packed component group.
    fn process(&mut self, view: &mut GroupView<'_>, delta_time: f32);
}
