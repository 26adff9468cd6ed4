//! Crafting session walkthrough: flower → powder → paint, on a headless world.
//!
//! Builds a workshop with a bench, a mixer, a basket and a paint area, then
//! plays the signals a VR host would send: flowers gathered into the basket,
//! taken back out, placed on the bench, ground with a pestle, and the powder
//! poured through a kettle. Every delivered event is printed.
//!
//! Run with: `RUST_LOG=debug cargo run -p petalcraft-core --example crafting_session`

use petalcraft_core::config::{BasketConfig, PipelineConfig, SlotAllocatorConfig, SlotSpec, WorkbenchConfig};
use petalcraft_core::event::{CraftEvent, EventKind};
use petalcraft_core::headless::{HeadlessEntity, HeadlessWorld};
use petalcraft_core::id::{AnchorId, Color, HandId, ItemKind};
use petalcraft_core::pipeline::PipelineOutcome;
use petalcraft_core::pose::Pose;
use petalcraft_core::registry::{CatalogBuilder, PrefabRole};
use petalcraft_core::station::{ZoneEvent, ZoneRole};
use petalcraft_core::workshop::Workshop;
use std::cell::Cell;
use std::rc::Rc;
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn main() {
    init_tracing();

    // --- Step 1: Register prefabs ---

    let mut catalog = CatalogBuilder::new();
    for (color, name) in [(Color::Red, "red"), (Color::Yellow, "yellow"), (Color::Blue, "blue")] {
        for (role, suffix) in [
            (PrefabRole::Flower, "flower"),
            (PrefabRole::Display, "flower_display"),
            (PrefabRole::Substance, "powder"),
            (PrefabRole::Artifact, "paint"),
        ] {
            let id = catalog.register_prefab(&format!("{name}_{suffix}"));
            catalog.map(role, color, id);
        }
    }
    let catalog = catalog.build().expect("catalog is complete");

    // --- Step 2: Build stations ---

    let mut world = HeadlessWorld::new();
    let mut shop = Workshop::new(catalog);

    let bench = shop
        .add_workbench(WorkbenchConfig {
            slots: SlotAllocatorConfig {
                slots: (0..4)
                    .map(|i| SlotSpec::new(Pose::at(0.15 * i as f64, 1.0, 0.0)).with_anchor(AnchorId(i)))
                    .collect(),
                ..Default::default()
            },
            output_pose: Some(Pose::at(0.0, 1.2, 0.3)),
            ..Default::default()
        })
        .expect("bench config is valid");
    let mixer = shop
        .add_mixer(PipelineConfig::default())
        .expect("mixer config is valid");
    let basket_body = world.insert(HeadlessEntity::dynamic(Pose::at(0.0, 0.0, 3.0)));
    let basket = shop
        .add_basket(basket_body, BasketConfig::default())
        .expect("basket config is valid");
    let paint_area = shop.add_paint_area();

    for kind in EventKind::ALL {
        shop.on_event(kind, Box::new(|e| println!("  event: {e:?}")));
    }
    let last_powder = Rc::new(Cell::new(None));
    let sink = last_powder.clone();
    shop.on_event(
        EventKind::SubstanceSpawned,
        Box::new(move |e| {
            if let CraftEvent::SubstanceSpawned { entity, .. } = e {
                sink.set(Some(*entity));
            }
        }),
    );

    // --- Step 3: Gather four red flowers into the basket ---

    println!("gathering");
    for _ in 0..4 {
        let flower = world.insert(HeadlessEntity::dynamic(Pose::at(-1.0, 0.5, 0.0)));
        shop.dispatch(&mut world, ZoneEvent::enter(basket, flower, ItemKind::Flower(Color::Red)));
    }

    // --- Step 4: Take them out and lay them on the bench ---

    println!("placing");
    let mut flowers = Vec::new();
    for _ in 0..4 {
        if let Some(flower) =
            shop.take_from_basket(&mut world, basket, Color::Red, HandId(0), Pose::at(0.2, 1.4, 0.5))
        {
            flowers.push(flower);
        }
        shop.advance(&mut world, 6);
    }
    for &flower in &flowers {
        shop.dispatch(&mut world, ZoneEvent::enter(bench, flower, ItemKind::Flower(Color::Red)));
    }

    // --- Step 5: Grind ---

    println!("grinding");
    let pestle = world.insert(HeadlessEntity::dynamic(Pose::at(0.5, 1.0, 0.0)));
    for _ in 0..3 {
        shop.dispatch(&mut world, ZoneEvent::enter(bench, pestle, ItemKind::Tool));
        shop.dispatch(&mut world, ZoneEvent::exit(bench, pestle, ItemKind::Tool));
    }

    // --- Step 6: Pour ---

    println!("mixing");
    let Some(powder) = last_powder.get() else {
        println!("no powder produced");
        return;
    };
    shop.dispatch(&mut world, ZoneEvent::enter(mixer, powder, ItemKind::Powder(Color::Red)));

    let kettle = world.insert(HeadlessEntity::dynamic(Pose::at(2.0, 0.0, 0.0)).with_animator());
    shop.dispatch(&mut world, ZoneEvent::enter(mixer, kettle, ItemKind::Catalyst));
    shop.advance(&mut world, 90);
    match shop.processing_finished(&mut world, mixer) {
        PipelineOutcome::ArtifactSpawned(paint) => println!("paint ready: {paint:?}"),
        other => println!("pour did not finish: {other:?}"),
    }

    // --- Step 7: Walk into the paint area and dock the basket ---

    println!("painting");
    let player = world.insert(HeadlessEntity::dynamic(Pose::at(0.0, 0.0, 5.0)).with_kinematic(None));
    shop.dispatch(&mut world, ZoneEvent::enter(paint_area, player, ItemKind::Player));
    shop.confirm_prompt(&mut world);
    shop.dispatch(
        &mut world,
        ZoneEvent::enter(basket, basket_body, ItemKind::Other).in_role(ZoneRole::Dock),
    );

    println!(
        "tick {} mode {:?} hash {:016x}",
        shop.tick(),
        shop.session().mode(),
        shop.state_hash()
    );
}

