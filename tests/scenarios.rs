//! End-to-end scenarios: tight memory budgets and sustained churn.

use rand::prelude::*;

use packed_ecs::engine::error::{AllocationError, EcsError};
use packed_ecs::prelude::*;

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
struct GroupIndex(u32);

impl Component for Translation {}
impl Component for Physics {}
impl Component for GroupIndex {}

fn registry() -> ComponentRegistry {
    let _ = env_logger::builder().is_test(true).try_init();

    let mut registry = ComponentRegistry::new();
    registry.register::<Translation>().unwrap();
    registry.register::<Physics>().unwrap();
    registry.register::<GroupIndex>().unwrap();
    registry
}

fn context(memory_block_size: usize) -> Context {
    let descriptor = ContextDescriptor {
        memory_block_size,
        entities_per_collection: 64,
        reserved_components_per_group: 64,
    };
    Context::new(descriptor, registry()).unwrap()
}

#[test]
fn hundred_byte_blocks_hold_forty_byte_records() {
    let mut ctx = context(100);

    // Translation (24B) + Physics (16B) packs to a 40-byte record; two fit
    // per collection under a 100-byte block.
    let first = ctx.create_entity::<(Translation, Physics)>().unwrap();
    let second = ctx.create_entity::<(Translation, Physics)>().unwrap();
    let third = ctx.create_entity::<(Translation, Physics)>().unwrap();

    ctx.get_component_mut::<Translation>(first).unwrap().x = 1.0;
    ctx.get_component_mut::<Translation>(second).unwrap().x = 2.0;
    ctx.get_component_mut::<Translation>(third).unwrap().x = 3.0;

    assert_eq!(ctx.get_component::<Translation>(first).unwrap().x, 1.0);
    assert_eq!(ctx.get_component::<Translation>(second).unwrap().x, 2.0);
    assert_eq!(ctx.get_component::<Translation>(third).unwrap().x, 3.0);

    // The third record forced a second slab, which no longer fit in block 0.
    assert_eq!(ctx.allocator().block_count(), 2);
}

#[test]
fn records_larger_than_a_block_fail_but_consume_the_id() {
    let mut ctx = context(39);

    // 40 bytes cannot be placed in a 39-byte block.
    match ctx.create_entity::<(Translation, Physics)>() {
        Err(EcsError::Allocation(AllocationError::RequestTooLarge { .. })) => {}
        other => panic!("expected RequestTooLarge, got {other:?}"),
    }

    // Each component alone still fits, and the failed attempt burned id 0.
    let translation_only = ctx.create_entity::<Translation>().unwrap();
    assert_eq!(translation_only.id(), 1);

    let physics_only = ctx.create_entity::<Physics>().unwrap();
    assert_eq!(physics_only.id(), 2);

    assert_eq!(ctx.entity_count(), 2);
}

/// Writes each member's group-local index into its [`GroupIndex`] component.
struct Enumerate {
    signature: Signature,
}

impl System for Enumerate {
    fn signature(&self) -> Signature {
        self.signature
    }

    fn process(&mut self, view: &mut GroupView<'_>, _delta_time: f32) {
        for index in 0..view.len() {
            view.component_mut::<GroupIndex>(index).unwrap().0 = index as u32;
        }
    }
}

#[test]
fn five_hundred_entities_survive_random_churn() {
    let mut ctx = context(4096);
    let signature =
        <(Translation, GroupIndex) as ComponentSet>::signature(ctx.registry()).unwrap();

    ctx.register_system(std::rc::Rc::new(std::cell::RefCell::new(Enumerate {
        signature,
    })));

    let mut entities: Vec<Entity> = (0..500)
        .map(|_| ctx.create_entity::<(Translation, GroupIndex)>().unwrap())
        .collect();
    assert_eq!(ctx.group(&signature).unwrap().len(), 500);

    // Destroy half in random order.
    let mut rng = rand::rng();
    entities.shuffle(&mut rng);
    for entity in entities.drain(..250) {
        ctx.destroy_entity(entity).unwrap();
    }
    assert_eq!(ctx.group(&signature).unwrap().len(), 250);

    // After a frame, the survivors carry each group-local index exactly
    // once, regardless of how swap-removal shuffled the packed array.
    ctx.process(1.0);

    let mut seen = [false; 250];
    for &entity in &entities {
        let index = ctx.get_component::<GroupIndex>(entity).unwrap().0 as usize;
        assert!(index < 250);
        assert!(!seen[index], "group index {index} assigned twice");
        seen[index] = true;
    }

    // Refill: freed slots absorb the new entities, ids keep climbing.
    for _ in 0..250 {
        entities.push(ctx.create_entity::<(Translation, GroupIndex)>().unwrap());
    }
    assert_eq!(ctx.group(&signature).unwrap().len(), 500);
    assert!(entities.iter().all(|e| e.id() < 750));
    assert!(entities[entities.len() - 1].id() >= 500, "ids are never reused");
}

#[test]
fn migration_churn_keeps_component_bytes_intact() {
    let mut ctx = context(4096);

    let mut entities: Vec<Entity> = (0..64)
        .map(|i| {
            let entity = ctx.create_entity::<Translation>().unwrap();
            ctx.get_component_mut::<Translation>(entity).unwrap().x = i as f64;
            entity
        })
        .collect();

    let mut rng = rand::rng();
    entities.shuffle(&mut rng);

    // Grow and shrink every entity; Translation must ride along untouched.
    for &entity in &entities {
        ctx.add_components::<Physics>(entity).unwrap();
        ctx.get_component_mut::<Physics>(entity).unwrap().vx = 0.25;
    }
    for &entity in &entities {
        ctx.add_components::<GroupIndex>(entity).unwrap();
        ctx.remove_components::<Physics>(entity).unwrap();
    }

    for &entity in &entities {
        let translation = ctx.get_component::<Translation>(entity).unwrap();
        assert_eq!(translation.x, entity.id() as f64);
        assert!(ctx.get_component::<Physics>(entity).is_none());
        assert_eq!(*ctx.get_component::<GroupIndex>(entity).unwrap(), GroupIndex(0));
    }
}
