//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::config::{BasketConfig, PipelineConfig, SlotAllocatorConfig, SlotSpec, WorkbenchConfig};
use crate::event::{CraftEvent, EventBus, EventKind};
use crate::fixed::Ticks;
use crate::headless::{HeadlessEntity, HeadlessWorld};
use crate::id::{AnchorId, Color, EntityId, ItemKind, StationId};
use crate::pose::Pose;
use crate::registry::{Catalog, CatalogBuilder, PrefabRole};
use crate::station::{StationContext, ZoneEvent, ZoneRole};
use crate::workshop::Workshop;
use slotmap::SlotMap;
use std::cell::RefCell;
use std::rc::Rc;

// ===========================================================================
// Catalog
// ===========================================================================

fn color_name(color: Color) -> &'static str {
    match color {
        Color::Red => "red",
        Color::Yellow => "yellow",
        Color::Blue => "blue",
    }
}

/// A catalog with every role mapped for every colour, using prefab names
/// like `red_flower`, `red_flower_display`, `red_powder`, `red_paint`.
pub fn full_catalog() -> Catalog {
    let mut b = CatalogBuilder::new();
    for color in Color::ALL {
        let name = color_name(color);
        for (role, suffix) in [
            (PrefabRole::Flower, "flower"),
            (PrefabRole::Display, "flower_display"),
            (PrefabRole::Substance, "powder"),
            (PrefabRole::Artifact, "paint"),
        ] {
            let id = b.register_prefab(&format!("{name}_{suffix}"));
            b.map(role, color, id);
        }
    }
    b.build().expect("full catalog is valid")
}

/// A catalog that maps everything except `role` for `color`.
pub fn catalog_without(role: PrefabRole, color: Color) -> Catalog {
    let full = full_catalog();
    let mut b = CatalogBuilder::new();
    for i in 0..full.prefab_count() {
        if let Some(def) = full.get_prefab(crate::id::PrefabId(i as u32)) {
            b.register_prefab(&def.name);
        }
    }
    for c in Color::ALL {
        for r in [PrefabRole::Flower, PrefabRole::Display, PrefabRole::Substance, PrefabRole::Artifact] {
            if (r, c) == (role, color) {
                continue;
            }
            if let Some(id) = full.prefab(r, c) {
                b.map(r, c, id);
            }
        }
    }
    b.build().expect("reduced catalog is valid")
}

// ===========================================================================
// Single-station rig
// ===========================================================================

/// Everything a lone station needs, for driving it without a workshop.
pub struct Rig {
    pub world: HeadlessWorld,
    pub events: EventBus,
    pub catalog: Catalog,
    pub station: StationId,
    pub tick: Ticks,
}

impl Rig {
    pub fn new() -> Self {
        Self::with_catalog(full_catalog())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        let mut stations = SlotMap::<StationId, ()>::with_key();
        Self {
            world: HeadlessWorld::new(),
            events: EventBus::new(1024),
            catalog,
            station: stations.insert(()),
            tick: 0,
        }
    }

    pub fn ctx(&mut self) -> StationContext<'_> {
        StationContext {
            host: &mut self.world,
            events: &mut self.events,
            catalog: &self.catalog,
            station: self.station,
            tick: self.tick,
        }
    }

    /// A loose flower lying a little away from any slot.
    pub fn flower(&mut self) -> EntityId {
        self.world
            .insert(HeadlessEntity::dynamic(Pose::at(-1.0, 0.5, 0.0)))
    }

    /// Any other grabbable body.
    pub fn item(&mut self) -> EntityId {
        self.world
            .insert(HeadlessEntity::dynamic(Pose::at(-2.0, 0.5, 0.0)))
    }

    /// Events of one kind emitted so far (buffers are never delivered here).
    pub fn emitted(&self, kind: EventKind) -> Vec<CraftEvent> {
        self.events
            .buffer(kind)
            .map(|b| b.iter().cloned().collect())
            .unwrap_or_default()
    }
}

impl Default for Rig {
    fn default() -> Self {
        Self::new()
    }
}

// ===========================================================================
// Event capture
// ===========================================================================

/// Record every delivered event, in delivery order.
pub fn record_events(shop: &mut Workshop) -> Rc<RefCell<Vec<CraftEvent>>> {
    let log = Rc::new(RefCell::new(Vec::new()));
    for kind in EventKind::ALL {
        let sink = log.clone();
        shop.on_event(kind, Box::new(move |e| sink.borrow_mut().push(e.clone())));
    }
    log
}

// ===========================================================================
// Full workshop fixture
// ===========================================================================

/// A workshop with one of each station, wired to a headless world.
pub struct Stage {
    pub world: HeadlessWorld,
    pub shop: Workshop,
    pub bench: StationId,
    pub mixer: StationId,
    pub basket: StationId,
    pub basket_body: EntityId,
    pub paint_area: StationId,
    pub log: Rc<RefCell<Vec<CraftEvent>>>,
}

impl Stage {
    pub fn new() -> Self {
        Self::with_catalog(full_catalog())
    }

    pub fn with_catalog(catalog: Catalog) -> Self {
        Self::with_configs(catalog, bench_config(), PipelineConfig::default())
    }

    pub fn with_configs(catalog: Catalog, bench: WorkbenchConfig, mixer: PipelineConfig) -> Self {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(catalog);
        let log = record_events(&mut shop);
        let basket_body = world.insert(HeadlessEntity::dynamic(Pose::at(0.0, 0.0, 3.0)));

        let bench = shop.add_workbench(bench).expect("bench config is valid");
        let mixer = shop.add_mixer(mixer).expect("mixer config is valid");
        let basket = shop
            .add_basket(basket_body, BasketConfig::default())
            .expect("basket config is valid");
        let paint_area = shop.add_paint_area();

        Self {
            world,
            shop,
            bench,
            mixer,
            basket,
            basket_body,
            paint_area,
            log,
        }
    }

    pub fn spawn(&mut self) -> EntityId {
        self.world
            .insert(HeadlessEntity::dynamic(Pose::at(-1.0, 0.5, 0.0)))
    }

    pub fn kettle(&mut self) -> EntityId {
        self.world
            .insert(HeadlessEntity::dynamic(Pose::at(2.0, 0.0, 0.0)).with_animator())
    }

    pub fn enter(&mut self, station: StationId, entity: EntityId, kind: ItemKind) {
        self.shop
            .dispatch(&mut self.world, ZoneEvent::enter(station, entity, kind));
    }

    pub fn exit(&mut self, station: StationId, entity: EntityId, kind: ItemKind) {
        self.shop
            .dispatch(&mut self.world, ZoneEvent::exit(station, entity, kind));
    }

    pub fn dock_basket(&mut self) {
        let event = ZoneEvent::enter(self.basket, self.basket_body, ItemKind::Other).in_role(ZoneRole::Dock);
        self.shop.dispatch(&mut self.world, event);
    }

    /// Spawn a flower and drop it on the bench.
    pub fn bench_flower(&mut self, color: Color) -> EntityId {
        let f = self.spawn();
        self.enter(self.bench, f, ItemKind::Flower(color));
        f
    }

    /// Spawn a flower and drop it into the basket.
    pub fn basket_flower(&mut self, color: Color) -> EntityId {
        let f = self.spawn();
        self.enter(self.basket, f, ItemKind::Flower(color));
        f
    }

    /// One stroke of the tool: in and back out.
    pub fn pulse(&mut self, tool: EntityId) {
        self.enter(self.bench, tool, ItemKind::Tool);
        self.exit(self.bench, tool, ItemKind::Tool);
    }

    pub fn logged(&self, kind: EventKind) -> Vec<CraftEvent> {
        self.log
            .borrow()
            .iter()
            .filter(|e| e.kind() == kind)
            .cloned()
            .collect()
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}

/// Four anchored slots above the bench, output point beside it.
pub fn bench_config() -> WorkbenchConfig {
    WorkbenchConfig {
        slots: SlotAllocatorConfig {
            slots: (0..4)
                .map(|i| SlotSpec::new(Pose::at(0.15 * i as f64, 1.0, 0.0)).with_anchor(AnchorId(i)))
                .collect(),
            ..Default::default()
        },
        output_pose: Some(Pose::at(0.0, 1.2, 0.3)),
        ..Default::default()
    }
}
