//! Fixed-capacity placement slots.
//!
//! A [`SlotAllocator`] snaps eligible entities into the first free slot,
//! holds them kinematic until they are picked up, and suppresses re-entry
//! for a short cooldown after release so bouncing colliders do not flap.

use crate::config::{SlotAllocatorConfig, SlotSpec};
use crate::event::CraftEvent;
use crate::fixed::{Fixed64, Ticks, scale_by};
use crate::id::{EntityId, ItemKind};
use crate::station::StationContext;
use std::collections::BTreeMap;

/// Why an entering entity was not snapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapRejection {
    NotAccepted,
    AlreadyTracked,
    CoolingDown,
    NoFreeSlot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapOutcome {
    Snapped(usize),
    Rejected(SnapRejection),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TrackedEntity {
    slot: usize,
    original_scale: Option<Fixed64>,
}

#[derive(Debug, Clone)]
pub struct SlotAllocator {
    config: SlotAllocatorConfig,
    occupants: Vec<Option<EntityId>>,
    tracked: BTreeMap<EntityId, TrackedEntity>,
    /// Entity -> tick at which its cooldown ends.
    cooldowns: BTreeMap<EntityId, Ticks>,
}

impl SlotAllocator {
    pub fn new(config: SlotAllocatorConfig) -> Self {
        let occupants = vec![None; config.slots.len()];
        Self {
            config,
            occupants,
            tracked: BTreeMap::new(),
            cooldowns: BTreeMap::new(),
        }
    }

    pub fn accepts(&self, kind: ItemKind) -> bool {
        self.config.accepted.contains(&kind)
    }

    /// Snap an entering entity into the first free slot.
    pub fn on_entered(
        &mut self,
        ctx: &mut StationContext<'_>,
        entity: EntityId,
        kind: ItemKind,
    ) -> SnapOutcome {
        if !self.accepts(kind) {
            return SnapOutcome::Rejected(SnapRejection::NotAccepted);
        }
        if self.tracked.contains_key(&entity) {
            return SnapOutcome::Rejected(SnapRejection::AlreadyTracked);
        }
        if self.is_cooling_down(entity, ctx.tick) {
            tracing::trace!(station = ?ctx.station, entity = ?entity, "slot re-entry during cooldown");
            return SnapOutcome::Rejected(SnapRejection::CoolingDown);
        }
        let Some(slot) = self.occupants.iter().position(Option::is_none) else {
            tracing::debug!(station = ?ctx.station, entity = ?entity, "no free slot");
            return SnapOutcome::Rejected(SnapRejection::NoFreeSlot);
        };

        let spec = self.config.slots[slot];
        let host = &mut *ctx.host;
        if host.is_held(entity) {
            host.force_release(entity);
        }
        host.zero_velocity(entity);
        host.set_kinematic(entity, true);
        host.set_pose(entity, spec.pose);

        let original_scale = match self.config.scale_multiplier {
            Some(multiplier) => host.scale(entity).inspect(|&scale| {
                host.set_scale(entity, scale_by(scale, multiplier));
            }),
            None => None,
        };
        if spec.anchor.is_some() {
            host.set_parent(entity, spec.anchor);
        }
        host.watch_pickup(entity, true);

        self.occupants[slot] = Some(entity);
        self.tracked.insert(
            entity,
            TrackedEntity {
                slot,
                original_scale,
            },
        );

        tracing::debug!(station = ?ctx.station, entity = ?entity, slot, "snapped into slot");
        ctx.emit(CraftEvent::ItemSnapped {
            station: ctx.station,
            entity,
            slot,
            tick: ctx.tick,
        });
        SnapOutcome::Snapped(slot)
    }

    /// Release the slot of a picked-up entity. Returns the freed slot index,
    /// or `None` if the entity was not tracked.
    pub fn on_picked_up(&mut self, ctx: &mut StationContext<'_>, entity: EntityId) -> Option<usize> {
        let tracked = self.tracked.remove(&entity)?;
        self.occupants[tracked.slot] = None;

        let host = &mut *ctx.host;
        if let Some(scale) = tracked.original_scale {
            host.set_scale(entity, scale);
        }
        host.set_parent(entity, None);
        host.set_kinematic(entity, false);
        host.watch_pickup(entity, false);

        if self.config.cooldown > 0 {
            self.cooldowns
                .insert(entity, ctx.tick.saturating_add(self.config.cooldown));
        }

        tracing::debug!(station = ?ctx.station, entity = ?entity, slot = tracked.slot, "slot released");
        ctx.emit(CraftEvent::SlotReleased {
            station: ctx.station,
            entity,
            slot: tracked.slot,
            tick: ctx.tick,
        });
        Some(tracked.slot)
    }

    /// Clear every slot record, then detach or destroy whatever the host
    /// still has parented under the slot frames. Returns
    /// `(detached, destroyed)`.
    pub fn reset_all(&mut self, ctx: &mut StationContext<'_>, destroy_occupants: bool) -> (u32, u32) {
        for &entity in self.tracked.keys() {
            if ctx.host.exists(entity) {
                ctx.host.watch_pickup(entity, false);
            }
        }
        self.tracked.clear();
        self.occupants.iter_mut().for_each(|o| *o = None);

        let mut detached = 0;
        let mut destroyed = 0;
        for anchor in self.config.slots.iter().filter_map(|s| s.anchor) {
            for child in ctx.host.children_of(anchor) {
                if destroy_occupants {
                    ctx.host.destroy(child);
                    destroyed += 1;
                } else {
                    ctx.host.set_parent(child, None);
                    ctx.host.set_kinematic(child, false);
                    detached += 1;
                }
            }
        }

        tracing::debug!(station = ?ctx.station, detached, destroyed, "slots reset");
        ctx.emit(CraftEvent::SlotsReset {
            station: ctx.station,
            detached,
            destroyed,
            tick: ctx.tick,
        });
        (detached, destroyed)
    }

    /// Drop cooldowns that have run out.
    pub fn tick(&mut self, now: Ticks) {
        self.cooldowns.retain(|_, until| *until > now);
    }

    pub fn is_cooling_down(&self, entity: EntityId, now: Ticks) -> bool {
        self.cooldowns.get(&entity).is_some_and(|&until| until > now)
    }

    pub fn occupant(&self, slot: usize) -> Option<EntityId> {
        self.occupants.get(slot).copied().flatten()
    }

    pub fn slot_of(&self, entity: EntityId) -> Option<usize> {
        self.tracked.get(&entity).map(|t| t.slot)
    }

    pub fn is_tracked(&self, entity: EntityId) -> bool {
        self.tracked.contains_key(&entity)
    }

    pub fn occupied_count(&self) -> usize {
        self.occupants.iter().filter(|o| o.is_some()).count()
    }

    pub fn capacity(&self) -> usize {
        self.occupants.len()
    }

    pub fn slot_spec(&self, slot: usize) -> Option<&SlotSpec> {
        self.config.slots.get(slot)
    }
}
