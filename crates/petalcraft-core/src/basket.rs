//! The collection basket: an inventory ledger plus its docking latch and
//! hand-withdrawal debounce.

use crate::config::BasketConfig;
use crate::fixed::Ticks;
use crate::id::{Color, EntityId, HandId};
use crate::inventory::{CollectOutcome, InventoryLedger};
use crate::pose::Pose;
use crate::station::{StationContext, ZoneEvent, ZonePhase, ZoneRole};
use std::collections::BTreeMap;

#[derive(Debug, Clone)]
pub struct Basket {
    ledger: InventoryLedger,
    dock_pose: Pose,
    take_debounce: Ticks,
    /// Set on the first dock enter, cleared when the body leaves the dock.
    docked: bool,
    /// Colour -> tick at which the next take is allowed.
    take_cooldowns: BTreeMap<Color, Ticks>,
}

impl Basket {
    pub fn new(body: EntityId, config: BasketConfig) -> Self {
        Self {
            ledger: InventoryLedger::new(body, config.display_slots),
            dock_pose: config.dock_pose,
            take_debounce: config.take_debounce,
            docked: false,
            take_cooldowns: BTreeMap::new(),
        }
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn is_docked(&self) -> bool {
        self.docked
    }

    pub fn handle_zone(&mut self, ctx: &mut StationContext<'_>, event: &ZoneEvent) -> Option<CollectOutcome> {
        match (event.zone.role, event.phase) {
            (ZoneRole::Primary, ZonePhase::Enter) => {
                let color = event.kind.flower_color()?;
                Some(self.ledger.collect(ctx, event.entity, color))
            }
            (ZoneRole::Dock, ZonePhase::Enter) if event.entity == self.ledger.container() => {
                self.dock(ctx);
                None
            }
            (ZoneRole::Dock, ZonePhase::Exit) if event.entity == self.ledger.container() => {
                self.docked = false;
                None
            }
            _ => None,
        }
    }

    fn dock(&mut self, ctx: &mut StationContext<'_>) {
        if self.docked {
            return;
        }
        self.docked = true;
        let body = self.ledger.container();
        if ctx.host.is_held(body) {
            ctx.host.force_release(body);
        }
        ctx.host.zero_velocity(body);
        ctx.host.set_kinematic(body, true);
        ctx.host.set_pose(body, self.dock_pose);
        self.ledger.set_locked(ctx, true);
        tracing::debug!(station = ?ctx.station, "basket docked");
    }

    /// A hand grabbed a display: hand over a real item of that colour.
    pub fn take(
        &mut self,
        ctx: &mut StationContext<'_>,
        color: Color,
        hand: HandId,
        hand_pose: Pose,
    ) -> Option<EntityId> {
        if self
            .take_cooldowns
            .get(&color)
            .is_some_and(|&until| until > ctx.tick)
        {
            tracing::trace!(station = ?ctx.station, ?color, "repeat take ignored");
            return None;
        }
        let entity = self.ledger.withdraw(ctx, color, hand_pose)?;
        ctx.host.attach_to_hand(entity, hand);
        if self.take_debounce > 0 {
            self.take_cooldowns
                .insert(color, ctx.tick.saturating_add(self.take_debounce));
        }
        Some(entity)
    }

    pub fn set_locked(&mut self, ctx: &mut StationContext<'_>, locked: bool) {
        self.ledger.set_locked(ctx, locked);
    }

    pub fn tick(&mut self, now: Ticks) {
        self.take_cooldowns.retain(|_, until| *until > now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Grab;
    use crate::id::ItemKind;
    use crate::test_utils::Rig;

    fn basket(rig: &mut Rig) -> Basket {
        let body = rig.item();
        Basket::new(body, BasketConfig::default())
    }

    fn collect(rig: &mut Rig, basket: &mut Basket, color: Color) -> Option<CollectOutcome> {
        let flower = rig.flower();
        let event = ZoneEvent::enter(rig.station, flower, ItemKind::Flower(color));
        basket.handle_zone(&mut rig.ctx(), &event)
    }

    #[test]
    fn only_flowers_are_collected() {
        let mut rig = Rig::new();
        let mut basket = basket(&mut rig);
        let tool = rig.item();
        let event = ZoneEvent::enter(rig.station, tool, ItemKind::Tool);
        assert_eq!(basket.handle_zone(&mut rig.ctx(), &event), None);
        assert_eq!(
            collect(&mut rig, &mut basket, Color::Red),
            Some(CollectOutcome::Collected { count: 1 })
        );
    }

    #[test]
    fn take_attaches_to_hand_and_debounces() {
        let mut rig = Rig::new();
        let mut basket = basket(&mut rig);
        collect(&mut rig, &mut basket, Color::Red);
        collect(&mut rig, &mut basket, Color::Red);

        let hand_pose = Pose::at(0.0, 1.5, 0.2);
        let first = basket.take(&mut rig.ctx(), Color::Red, HandId(1), hand_pose).unwrap();
        assert!(rig.world.is_held(first));
        assert_eq!(rig.world.entity(first).unwrap().held_by, Some(HandId(1)));
        assert_eq!(rig.world.entity(first).unwrap().pose, hand_pose);

        rig.tick = 5;
        assert_eq!(basket.take(&mut rig.ctx(), Color::Red, HandId(1), hand_pose), None);
        assert_eq!(basket.ledger().quantity(Color::Red), 1);

        rig.tick = 6;
        basket.tick(rig.tick);
        assert!(basket.take(&mut rig.ctx(), Color::Red, HandId(1), hand_pose).is_some());
        assert_eq!(basket.ledger().quantity(Color::Red), 0);
    }

    #[test]
    fn docking_latches_and_locks() {
        let mut rig = Rig::new();
        let mut basket = basket(&mut rig);
        let body = basket.ledger().container();
        collect(&mut rig, &mut basket, Color::Blue);

        let dock = ZoneEvent::enter(rig.station, body, ItemKind::Other).in_role(ZoneRole::Dock);
        basket.handle_zone(&mut rig.ctx(), &dock);
        assert!(basket.is_docked());
        assert!(basket.ledger().is_locked());
        assert_eq!(rig.world.entity(body).unwrap().kinematic, Some(true));

        // Re-entering while latched changes nothing.
        rig.world.entity_mut(body).unwrap().pose = Pose::at(9.0, 0.0, 0.0);
        basket.handle_zone(&mut rig.ctx(), &dock);
        assert_eq!(rig.world.entity(body).unwrap().pose, Pose::at(9.0, 0.0, 0.0));

        assert_eq!(
            collect(&mut rig, &mut basket, Color::Blue),
            Some(CollectOutcome::Locked)
        );

        // Emptying the basket unlocks it.
        basket.take(&mut rig.ctx(), Color::Blue, HandId(0), Pose::IDENTITY);
        assert!(!basket.ledger().is_locked());

        let undock = ZoneEvent::exit(rig.station, body, ItemKind::Other).in_role(ZoneRole::Dock);
        basket.handle_zone(&mut rig.ctx(), &undock);
        assert!(!basket.is_docked());
    }

    #[test]
    fn other_entities_in_dock_are_ignored() {
        let mut rig = Rig::new();
        let mut basket = basket(&mut rig);
        let stranger = rig.item();
        let dock = ZoneEvent::enter(rig.station, stranger, ItemKind::Other).in_role(ZoneRole::Dock);
        basket.handle_zone(&mut rig.ctx(), &dock);
        assert!(!basket.is_docked());
    }
}
