use packed_ecs::engine::error::RegistryError;
use packed_ecs::prelude::*;
use packed_ecs::MAX_COMPONENT_ALIGN;

#[derive(Clone, Copy, Default, Debug)]
struct Position {
    x: f32,
    y: f32,
}

#[derive(Clone, Copy, Default, Debug)]
struct Velocity {
    dx: f32,
    dy: f32,
}

#[derive(Clone, Copy, Default, Debug)]
struct Marker;

#[derive(Clone, Copy, Default, Debug)]
#[repr(align(16))]
struct Wide([f32; 4]);

impl Component for Position {}
impl Component for Velocity {}
impl Component for Marker {}
impl Component for Wide {}

#[test]
fn ids_are_dense_and_assigned_in_registration_order() {
    let mut registry = ComponentRegistry::new();
    assert!(registry.is_empty());

    assert_eq!(registry.register::<Position>().unwrap(), 0);
    assert_eq!(registry.register::<Velocity>().unwrap(), 1);
    assert_eq!(registry.len(), 2);

    assert_eq!(registry.id_of::<Position>(), Some(0));
    assert_eq!(registry.id_of::<Wide>(), None);
}

#[test]
fn reregistering_a_type_returns_the_existing_id() {
    let mut registry = ComponentRegistry::new();

    let first = registry.register::<Position>().unwrap();
    registry.register::<Velocity>().unwrap();
    let again = registry.register::<Position>().unwrap();

    assert_eq!(first, again);
    assert_eq!(registry.len(), 2, "a repeat registration must not add a descriptor");
}

#[test]
fn registration_after_freeze_is_rejected() {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>().unwrap();

    registry.freeze();
    assert!(registry.is_frozen());

    match registry.register::<Velocity>() {
        Err(RegistryError::Frozen) => {}
        other => panic!("expected Frozen, got {other:?}"),
    }

    // Known types still resolve through a frozen registry.
    assert_eq!(registry.register::<Position>().unwrap(), 0);
    assert_eq!(registry.len(), 1);
}

#[test]
fn context_construction_freezes_the_registry() {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>().unwrap();
    assert!(!registry.is_frozen());

    let ctx = Context::new(ContextDescriptor::default(), registry).unwrap();
    assert!(ctx.registry().is_frozen());
}

#[test]
fn zero_sized_components_are_rejected() {
    let mut registry = ComponentRegistry::new();

    match registry.register::<Marker>() {
        Err(RegistryError::ZeroSized { name }) => assert!(name.contains("Marker")),
        other => panic!("expected ZeroSized, got {other:?}"),
    }
    assert!(registry.is_empty());
}

#[test]
fn over_aligned_components_are_rejected() {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>().unwrap();

    match registry.register::<Wide>() {
        Err(RegistryError::UnsupportedAlignment { name, align, max }) => {
            assert!(name.contains("Wide"));
            assert_eq!(align, 16);
            assert_eq!(max, MAX_COMPONENT_ALIGN);
        }
        other => panic!("expected UnsupportedAlignment, got {other:?}"),
    }

    // The rejected type must not have consumed an id.
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.id_of::<Wide>(), None);
}

#[test]
fn descriptors_record_size_and_alignment() {
    let mut registry = ComponentRegistry::new();
    let id = registry.register::<Position>().unwrap();

    let desc = registry.descriptor(id).expect("descriptor exists");
    assert_eq!(desc.component_id, id);
    assert_eq!(desc.size, 8);
    assert_eq!(desc.align, 4);
    assert!(registry.descriptor(id + 1).is_none());
}
