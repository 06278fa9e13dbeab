use std::cell::RefCell;
use std::hint::black_box;
use std::rc::Rc;

use criterion::*;

use packed_ecs::prelude::*;

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
struct Health(u32);

impl Component for Position {}
impl Component for Velocity {}
impl Component for Health {}

const ENTITIES: usize = 10_000;

fn registry() -> ComponentRegistry {
    let mut registry = ComponentRegistry::new();
    registry.register::<Position>().unwrap();
    registry.register::<Velocity>().unwrap();
    registry.register::<Health>().unwrap();
    registry
}

fn context() -> Context {
    let descriptor = ContextDescriptor {
        memory_block_size: 1 << 20,
        entities_per_collection: 256,
        reserved_components_per_group: 4 * ENTITIES,
    };
    Context::new(descriptor, registry()).unwrap()
}

struct Integrate {
    signature: Signature,
}

impl System for Integrate {
    fn signature(&self) -> Signature {
        self.signature
    }

    fn process(&mut self, view: &mut GroupView<'_>, delta_time: f32) {
        for index in 0..view.len() {
            let velocity = *view.component::<Velocity>(index).unwrap();
            let position = view.component_mut::<Position>(index).unwrap();
            position.x += velocity.dx * delta_time;
            position.y += velocity.dy * delta_time;
        }
    }
}

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    group.throughput(Throughput::Elements(ENTITIES as u64));

    group.bench_function("spawn_10k", |b| {
        b.iter(|| {
            let mut ctx = context();
            for _ in 0..ENTITIES {
                black_box(ctx.create_entity::<(Position, Velocity)>().unwrap());
            }
            ctx
        })
    });

    group.finish();
}

fn migrate_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("migrate");
    group.throughput(Throughput::Elements(ENTITIES as u64));

    group.bench_function("add_remove_10k", |b| {
        b.iter_batched(
            || {
                let mut ctx = context();
                let entities: Vec<Entity> = (0..ENTITIES)
                    .map(|_| ctx.create_entity::<(Position, Velocity)>().unwrap())
                    .collect();
                (ctx, entities)
            },
            |(mut ctx, entities)| {
                for &entity in &entities {
                    ctx.add_components::<Health>(entity).unwrap();
                }
                for &entity in &entities {
                    ctx.remove_components::<Health>(entity).unwrap();
                }
                ctx
            },
            BatchSize::LargeInput,
        )
    });

    group.finish();
}

fn process_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("process");
    group.throughput(Throughput::Elements(ENTITIES as u64));

    group.bench_function("integrate_10k", |b| {
        let mut ctx = context();
        let signature =
            <(Position, Velocity) as ComponentSet>::signature(ctx.registry()).unwrap();
        ctx.register_system(Rc::new(RefCell::new(Integrate { signature })));

        for i in 0..ENTITIES {
            let entity = ctx.create_entity::<(Position, Velocity)>().unwrap();
            ctx.get_component_mut::<Velocity>(entity).unwrap().dx = i as f32;
        }

        b.iter(|| {
            ctx.process(black_box(1.0 / 60.0));
        })
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark, migrate_benchmark, process_benchmark);
criterion_main!(benches);
