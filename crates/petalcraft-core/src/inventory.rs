//! Per-colour inventory of a container, with one display stand-in per
//! non-empty colour.
//!
//! Collected items are destroyed and counted; the container shows a single
//! display-only representative for each colour it holds. Withdrawal swaps a
//! unit of the count for a freshly spawned full-fidelity item.

use crate::config::SlotSpec;
use crate::event::{CraftEvent, MissingConfig};
use crate::id::{Color, EntityId, PrefabId};
use crate::pose::Pose;
use crate::registry::PrefabRole;
use crate::station::StationContext;
use std::collections::{BTreeMap, BTreeSet};

/// Count and display handle for one colour.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InventoryRecord {
    pub count: u32,
    /// Present iff `count > 0`.
    pub display: Option<EntityId>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectOutcome {
    Collected { count: u32 },
    Locked,
    AlreadyCollected,
    /// No display prefab or slot for a first item of this colour.
    Misconfigured,
}

#[derive(Debug, Clone)]
pub struct InventoryLedger {
    /// The container's own body; collected items stop colliding with it.
    container: EntityId,
    display_slots: BTreeMap<Color, SlotSpec>,
    /// Created lazily on first collection.
    records: BTreeMap<Color, InventoryRecord>,
    collected: BTreeSet<EntityId>,
    locked: bool,
}

impl InventoryLedger {
    pub fn new(container: EntityId, display_slots: BTreeMap<Color, SlotSpec>) -> Self {
        Self {
            container,
            display_slots,
            records: BTreeMap::new(),
            collected: BTreeSet::new(),
            locked: false,
        }
    }

    pub fn container(&self) -> EntityId {
        self.container
    }

    /// Take an item into the inventory.
    pub fn collect(&mut self, ctx: &mut StationContext<'_>, entity: EntityId, color: Color) -> CollectOutcome {
        if self.locked {
            tracing::trace!(station = ?ctx.station, entity = ?entity, "collect while locked");
            return CollectOutcome::Locked;
        }
        if self.collected.contains(&entity) {
            return CollectOutcome::AlreadyCollected;
        }

        let first = self.quantity(color) == 0;
        let display = if first {
            let Some(display) = self.display_target(ctx, color) else {
                return CollectOutcome::Misconfigured;
            };
            Some(display)
        } else {
            None
        };

        self.collected.insert(entity);
        let host = &mut *ctx.host;
        host.zero_velocity(entity);
        host.set_kinematic(entity, true);
        host.disable_physics(entity);
        host.ignore_collision(entity, self.container);

        let record = self.records.entry(color).or_default();
        record.count += 1;
        if let Some((prefab, slot)) = display {
            record.display = Some(host.spawn(prefab, slot.pose, slot.anchor));
        }
        let count = record.count;
        host.destroy(entity);

        tracing::debug!(station = ?ctx.station, entity = ?entity, ?color, count, "item collected");
        ctx.emit(CraftEvent::ItemCollected {
            station: ctx.station,
            entity,
            color,
            count,
            tick: ctx.tick,
        });
        CollectOutcome::Collected { count }
    }

    /// Exchange one unit of `color` for a new item at `pose`.
    pub fn withdraw(&mut self, ctx: &mut StationContext<'_>, color: Color, pose: Pose) -> Option<EntityId> {
        if self.quantity(color) == 0 {
            return None;
        }
        let Some(prefab) = ctx.catalog.prefab(PrefabRole::Flower, color) else {
            tracing::error!(station = ?ctx.station, ?color, "no flower prefab mapped; withdrawal skipped");
            ctx.emit(CraftEvent::ConfigurationMissing {
                station: ctx.station,
                missing: MissingConfig::FlowerPrefab(color),
                tick: ctx.tick,
            });
            return None;
        };

        let record = self.records.entry(color).or_default();
        record.count -= 1;
        if record.count == 0
            && let Some(display) = record.display.take()
        {
            ctx.host.destroy(display);
        }
        let count = record.count;
        let entity = ctx.host.spawn(prefab, pose, None);

        tracing::info!(station = ?ctx.station, entity = ?entity, ?color, count, "item withdrawn");
        ctx.emit(CraftEvent::ItemWithdrawn {
            station: ctx.station,
            entity,
            color,
            count,
            tick: ctx.tick,
        });

        if self.locked && self.total() == 0 {
            self.set_locked(ctx, false);
        }
        Some(entity)
    }

    /// Set or clear the container lock. Emits only on change.
    pub fn set_locked(&mut self, ctx: &mut StationContext<'_>, locked: bool) {
        if self.locked == locked {
            return;
        }
        self.locked = locked;
        tracing::debug!(station = ?ctx.station, locked, "container lock changed");
        let event = if locked {
            CraftEvent::ContainerLocked {
                station: ctx.station,
                tick: ctx.tick,
            }
        } else {
            CraftEvent::ContainerUnlocked {
                station: ctx.station,
                tick: ctx.tick,
            }
        };
        ctx.emit(event);
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn quantity(&self, color: Color) -> u32 {
        self.records.get(&color).map(|r| r.count).unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.records.values().map(|r| r.count).sum()
    }

    pub fn record(&self, color: Color) -> Option<&InventoryRecord> {
        self.records.get(&color)
    }

    pub fn display(&self, color: Color) -> Option<EntityId> {
        self.records.get(&color).and_then(|r| r.display)
    }

    /// Which colour a display entity stands in for.
    pub fn color_of_display(&self, entity: EntityId) -> Option<Color> {
        self.records
            .iter()
            .find(|(_, r)| r.display == Some(entity))
            .map(|(&c, _)| c)
    }

    fn display_target(
        &self,
        ctx: &mut StationContext<'_>,
        color: Color,
    ) -> Option<(PrefabId, SlotSpec)> {
        let missing = match (
            ctx.catalog.prefab(PrefabRole::Display, color),
            self.display_slots.get(&color),
        ) {
            (Some(prefab), Some(slot)) => return Some((prefab, *slot)),
            (None, _) => MissingConfig::DisplayPrefab(color),
            (Some(_), None) => MissingConfig::DisplaySlot(color),
        };
        tracing::error!(station = ?ctx.station, ?color, ?missing, "cannot display collected colour; collect skipped");
        ctx.emit(CraftEvent::ConfigurationMissing {
            station: ctx.station,
            missing,
            tick: ctx.tick,
        });
        None
    }
}
