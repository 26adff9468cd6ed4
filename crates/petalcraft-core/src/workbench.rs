//! The crafting workbench: slots, batch, agitation tool, and completion.

use crate::advisory::{Advisory, AdvisoryBoard};
use crate::batch::{AgitationOutcome, BatchAccumulator, EnterOutcome};
use crate::config::WorkbenchConfig;
use crate::event::{CraftEvent, MissingConfig};
use crate::id::{Color, EntityId, ItemKind};
use crate::pose::Pose;
use crate::registry::PrefabRole;
use crate::slots::SlotAllocator;
use crate::station::{StationContext, ZoneEvent, ZonePhase};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct Workbench {
    slots: SlotAllocator,
    batch: BatchAccumulator,
    advisories: AdvisoryBoard,
    output_pose: Option<Pose>,
    /// Tools currently inside the zone. A pulse counts on the enter edge only.
    tools_inside: BTreeSet<EntityId>,
}

impl Workbench {
    pub fn new(config: WorkbenchConfig) -> Self {
        Self {
            slots: SlotAllocator::new(config.slots),
            batch: BatchAccumulator::new(config.batch),
            advisories: AdvisoryBoard::new(config.advisory_duration),
            output_pose: config.output_pose,
            tools_inside: BTreeSet::new(),
        }
    }

    pub fn slots(&self) -> &SlotAllocator {
        &self.slots
    }

    pub fn batch(&self) -> &BatchAccumulator {
        &self.batch
    }

    pub fn visible_advisory(&self) -> Option<Advisory> {
        self.advisories.visible()
    }

    pub fn handle_zone(&mut self, ctx: &mut StationContext<'_>, event: &ZoneEvent) {
        match (event.phase, event.kind) {
            (ZonePhase::Enter, ItemKind::Flower(color)) => self.flower_entered(ctx, event.entity, event.kind, color),
            (ZonePhase::Exit, ItemKind::Flower(_)) => {
                self.batch.on_item_exited(ctx, event.entity);
            }
            (ZonePhase::Enter, ItemKind::Powder(_)) => self.batch.lock_entered(event.entity),
            (ZonePhase::Exit, ItemKind::Powder(_)) => self.batch.lock_exited(event.entity),
            (ZonePhase::Enter, ItemKind::Tool) => {
                if self.tools_inside.insert(event.entity) {
                    self.agitate(ctx);
                }
            }
            (ZonePhase::Exit, ItemKind::Tool) => {
                self.tools_inside.remove(&event.entity);
            }
            _ => {}
        }
    }

    fn flower_entered(&mut self, ctx: &mut StationContext<'_>, entity: EntityId, kind: ItemKind, color: Color) {
        if self.batch.is_locked() {
            tracing::trace!(station = ?ctx.station, entity = ?entity, "bench locked by downstream item");
            return;
        }
        self.slots.on_entered(ctx, entity, kind);
        if let EnterOutcome::Mismatch { .. } = self.batch.on_item_entered(ctx, entity, color) {
            self.show_advisory(ctx, Advisory::ColorMismatch);
        }
    }

    /// One agitation pulse. Completes the batch when the count is reached.
    pub fn agitate(&mut self, ctx: &mut StationContext<'_>) -> AgitationOutcome {
        let outcome = self.batch.agitate(ctx);
        match outcome {
            AgitationOutcome::NotEnoughItems => self.show_advisory(ctx, Advisory::NotEnoughItems),
            AgitationOutcome::Ready { color } => {
                self.complete(ctx, color);
            }
            AgitationOutcome::Counted(_) | AgitationOutcome::Locked => {}
        }
        outcome
    }

    pub fn on_picked_up(&mut self, ctx: &mut StationContext<'_>, entity: EntityId) -> Option<usize> {
        self.slots.on_picked_up(ctx, entity)
    }

    pub fn tick(&mut self, ctx: &mut StationContext<'_>) {
        self.slots.tick(ctx.tick);
        if let Some(advisory) = self.advisories.tick(ctx.host, ctx.tick) {
            ctx.emit(CraftEvent::AdvisoryDismissed {
                station: Some(ctx.station),
                advisory,
                tick: ctx.tick,
            });
        }
    }

    /// Spawn the substance, consume the members and clear the slots. A
    /// missing substance prefab leaves the batch ready so the next pulse
    /// retries.
    fn complete(&mut self, ctx: &mut StationContext<'_>, color: Color) -> Option<EntityId> {
        let Some(prefab) = ctx.catalog.prefab(PrefabRole::Substance, color) else {
            tracing::error!(station = ?ctx.station, ?color, "no substance prefab mapped; batch kept");
            ctx.emit(CraftEvent::ConfigurationMissing {
                station: ctx.station,
                missing: MissingConfig::SubstancePrefab(color),
                tick: ctx.tick,
            });
            return None;
        };
        let (color, members) = self.batch.take_completed()?;

        let pose = self
            .output_pose
            .or_else(|| members.first().and_then(|&m| ctx.host.pose(m)))
            .unwrap_or(Pose::IDENTITY);
        let substance = ctx.host.spawn(prefab, pose, None);

        let required = self.batch.config().required_items as usize;
        for &member in members.iter().take(required) {
            ctx.host.destroy(member);
        }
        self.slots.reset_all(ctx, false);

        tracing::info!(station = ?ctx.station, entity = ?substance, ?color, "substance spawned");
        ctx.emit(CraftEvent::SubstanceSpawned {
            station: ctx.station,
            entity: substance,
            color,
            tick: ctx.tick,
        });
        Some(substance)
    }

    fn show_advisory(&mut self, ctx: &mut StationContext<'_>, advisory: Advisory) {
        if let Some(replaced) = self.advisories.show(ctx.host, ctx.station, advisory, ctx.tick) {
            ctx.emit(CraftEvent::AdvisoryDismissed {
                station: Some(ctx.station),
                advisory: replaced,
                tick: ctx.tick,
            });
        }
        ctx.emit(CraftEvent::AdvisoryShown {
            station: Some(ctx.station),
            advisory,
            tick: ctx.tick,
        });
    }
}
