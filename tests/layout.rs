use packed_ecs::engine::component::{Component, ComponentRegistry};
use packed_ecs::engine::layout::{
    migration_offsets, ordered_offsets, unordered_offsets, OFFSET_ALREADY_PLACED,
};
use packed_ecs::engine::types::ComponentTypeId;

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Translation {
    x: f64,
    y: f64,
    z: f64,
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Physics {
    vx: f64,
    vy: f64,
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Health(u32);

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Tag(u8);

impl Component for Translation {}
impl Component for Physics {}
impl Component for Health {}
impl Component for Tag {}

// Registration order fixes the ids: Translation=0 (24B), Physics=1 (16B),
// Health=2 (4B), Tag=3 (1B).
fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register::<Translation>().unwrap();
    registry.register::<Physics>().unwrap();
    registry.register::<Health>().unwrap();
    registry.register::<Tag>().unwrap();
    registry
}

#[test]
fn ordered_layout_is_order_and_multiplicity_independent() {
    let registry = registry();

    let canonical = ordered_offsets(&registry, &[0, 1]);
    let scrambled = ordered_offsets(&registry, &[1, 0, 1, 0, 0]);
    assert_eq!(canonical, scrambled);

    assert_eq!(canonical.items.len(), 2);
    assert_eq!(canonical.items[0].offset, 0);
    assert_eq!(canonical.items[1].offset, 24);
    assert_eq!(canonical.entity_size, 40);
}

#[test]
fn offsets_respect_component_alignment() {
    let registry = registry();

    // Tag (1B, id 3) after Health (4B, id 2): tag lands right after with no
    // padding, but a following 8-aligned type would be padded.
    let layout = ordered_offsets(&registry, &[3, 2]);
    assert_eq!(layout.items[0].component_id, 2);
    assert_eq!(layout.items[0].offset, 0);
    assert_eq!(layout.items[1].component_id, 3);
    assert_eq!(layout.items[1].offset, 4);

    // Tag then Physics: the 8-byte type must start aligned.
    let layout = ordered_offsets(&registry, &[3, 1]);
    assert_eq!(layout.items[0].component_id, 1);
    assert_eq!(layout.items[0].offset, 0);
    assert_eq!(layout.items[1].component_id, 3);
    assert_eq!(layout.items[1].offset, 16);
}

#[test]
fn entity_size_is_rounded_up_to_eight() {
    let registry = registry();

    let layout = ordered_offsets(&registry, &[3]);
    assert_eq!(layout.entity_size, 8);

    let layout = ordered_offsets(&registry, &[2, 3]);
    assert_eq!(layout.entity_size, 8);

    let layout = ordered_offsets(&registry, &[0]);
    assert_eq!(layout.entity_size, 24);
}

#[test]
fn caller_order_offsets_carry_the_sentinel_for_repeats() {
    let registry = registry();
    let layout = ordered_offsets(&registry, &[0, 1]);

    let items = unordered_offsets(&layout, &[1, 0, 1]);
    assert_eq!(items.len(), 3);

    assert_eq!(items[0].component_id, 1);
    assert_eq!(items[0].offset, 24);
    assert_eq!(items[1].component_id, 0);
    assert_eq!(items[1].offset, 0);

    // Second occurrence of Physics: placed already, never written twice.
    assert_eq!(items[2].component_id, 1);
    assert_eq!(items[2].offset, OFFSET_ALREADY_PLACED);
}

#[test]
fn migration_plan_moves_shared_adds_new_drops_old() {
    let registry = registry();

    let old = ordered_offsets(&registry, &[0, 1]); // Translation, Physics
    let new = ordered_offsets(&registry, &[0, 2]); // Translation, Health

    let plan = migration_offsets(&old, &new);

    assert_eq!(plan.moved.len(), 1);
    assert_eq!(plan.moved[0].size, 24);
    assert_eq!(plan.moved[0].old_offset, 0);
    assert_eq!(plan.moved[0].new_offset, 0);

    assert_eq!(plan.added.len(), 1);
    assert_eq!(plan.added[0].component_id, 2);
    assert_eq!(plan.added[0].offset, 24);
}

#[test]
fn migration_between_identical_layouts_moves_everything() {
    let registry = registry();
    let layout = ordered_offsets(&registry, &[0, 1, 2]);

    let plan = migration_offsets(&layout, &layout);
    assert_eq!(plan.moved.len(), 3);
    assert!(plan.added.is_empty());
    for item in &plan.moved {
        assert_eq!(item.old_offset, item.new_offset);
    }
}

#[test]
fn migration_to_a_disjoint_layout_only_adds() {
    let registry = registry();

    let old = ordered_offsets(&registry, &[0]);
    let new = ordered_offsets(&registry, &[1, 2]);

    let plan = migration_offsets(&old, &new);
    assert!(plan.moved.is_empty());
    let added: Vec<ComponentTypeId> =
        plan.added.iter().map(|item| item.component_id).collect();
    assert_eq!(added, vec![1, 2]);
}

#[test]
fn layout_lookup_finds_only_member_types() {
    let registry = registry();
    let layout = ordered_offsets(&registry, &[0, 2]);

    assert!(layout.item(0).is_some());
    assert!(layout.item(1).is_none());
    assert_eq!(layout.item(2).unwrap().size, 4);
}
