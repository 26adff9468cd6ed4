//! The top-level controller.
//!
//! A [`Workshop`] owns every station, the prefab catalog, the session mode,
//! the clock, and the event bus. The host feeds it zone reports, pickup
//! signals, completion callbacks and elapsed ticks; each entry point runs
//! synchronously and ends by delivering buffered events to listeners.

use crate::basket::Basket;
use crate::config::{BasketConfig, ConfigError, PipelineConfig, WorkbenchConfig, WorkshopConfig};
use crate::event::{EventBus, EventFilter, EventKind, Listener, SubscriberPriority};
use crate::fixed::Ticks;
use crate::host::Host;
use crate::id::{Color, EntityId, HandId, ItemKind, StationId};
use crate::pipeline::{PipelineOutcome, TransformationPipeline};
use crate::pose::Pose;
use crate::registry::Catalog;
use crate::session::{Session, SessionMode};
use crate::sim::{AdvanceResult, SimState, StateHash};
use crate::station::{StationContext, StationKind, ZoneEvent, ZonePhase};
use crate::workbench::Workbench;
use slotmap::{SecondaryMap, SlotMap};
use std::hash::Hasher;

/// Build a [`StationContext`] from disjoint workshop fields.
macro_rules! station_ctx {
    ($self:ident, $host:expr, $station:expr) => {
        StationContext {
            host: $host,
            events: &mut $self.events,
            catalog: &$self.catalog,
            station: $station,
            tick: $self.sim.tick,
        }
    };
}

#[derive(Debug)]
pub struct Workshop {
    catalog: Catalog,
    session: Session,
    sim: SimState,
    paused: bool,
    events: EventBus,

    stations: SlotMap<StationId, StationKind>,

    // -- Per-station state (SoA, keyed by StationId) --
    workbenches: SecondaryMap<StationId, Workbench>,
    mixers: SecondaryMap<StationId, TransformationPipeline>,
    baskets: SecondaryMap<StationId, Basket>,
}

impl Workshop {
    pub fn new(catalog: Catalog) -> Self {
        Self::with_config(catalog, WorkshopConfig::default())
    }

    pub fn with_config(catalog: Catalog, config: WorkshopConfig) -> Self {
        Self {
            catalog,
            session: Session::new(),
            sim: SimState::new(),
            paused: false,
            events: EventBus::new(config.event_capacity),
            stations: SlotMap::with_key(),
            workbenches: SecondaryMap::new(),
            mixers: SecondaryMap::new(),
            baskets: SecondaryMap::new(),
        }
    }

    // -----------------------------------------------------------------------
    // Stations
    // -----------------------------------------------------------------------

    pub fn add_workbench(&mut self, config: WorkbenchConfig) -> Result<StationId, ConfigError> {
        config.validate()?;
        let id = self.stations.insert(StationKind::Workbench);
        self.workbenches.insert(id, Workbench::new(config));
        tracing::debug!(station = ?id, "workbench added");
        Ok(id)
    }

    pub fn add_mixer(&mut self, config: PipelineConfig) -> Result<StationId, ConfigError> {
        config.validate()?;
        let id = self.stations.insert(StationKind::Mixer);
        self.mixers.insert(id, TransformationPipeline::new(config));
        tracing::debug!(station = ?id, "mixing station added");
        Ok(id)
    }

    /// Add a basket whose scene body is `body`.
    pub fn add_basket(&mut self, body: EntityId, config: BasketConfig) -> Result<StationId, ConfigError> {
        config.validate()?;
        let id = self.stations.insert(StationKind::Basket);
        self.baskets.insert(id, Basket::new(body, config));
        tracing::debug!(station = ?id, body = ?body, "basket added");
        Ok(id)
    }

    /// Add a paint area; player presence in it drives the session prompts.
    pub fn add_paint_area(&mut self) -> StationId {
        self.stations.insert(StationKind::PaintArea)
    }

    pub fn station_kind(&self, station: StationId) -> Option<StationKind> {
        self.stations.get(station).copied()
    }

    pub fn station_count(&self) -> usize {
        self.stations.len()
    }

    pub fn workbench(&self, station: StationId) -> Option<&Workbench> {
        self.workbenches.get(station)
    }

    pub fn mixer(&self, station: StationId) -> Option<&TransformationPipeline> {
        self.mixers.get(station)
    }

    pub fn basket(&self, station: StationId) -> Option<&Basket> {
        self.baskets.get(station)
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tick(&self) -> Ticks {
        self.sim.tick
    }

    // -----------------------------------------------------------------------
    // Host signals
    // -----------------------------------------------------------------------

    /// Route a zone report to its station. Returns `false` if the station
    /// is unknown.
    pub fn dispatch(&mut self, host: &mut dyn Host, event: ZoneEvent) -> bool {
        let station = event.zone.station;
        let Some(&kind) = self.stations.get(station) else {
            tracing::warn!(station = ?station, entity = ?event.entity, "zone event for unknown station");
            return false;
        };

        match kind {
            StationKind::Workbench => {
                if let Some(bench) = self.workbenches.get_mut(station) {
                    bench.handle_zone(&mut station_ctx!(self, host, station), &event);
                }
            }
            StationKind::Mixer => {
                if let Some(mixer) = self.mixers.get_mut(station) {
                    mixer.handle_zone(&mut station_ctx!(self, host, station), &event);
                }
            }
            StationKind::Basket => {
                if let Some(basket) = self.baskets.get_mut(station) {
                    basket.handle_zone(&mut station_ctx!(self, host, station), &event);
                }
            }
            StationKind::PaintArea => {
                if event.kind == ItemKind::Player {
                    let tick = self.sim.tick;
                    match event.phase {
                        ZonePhase::Enter => self.session.player_entered(host, &mut self.events, station, tick),
                        ZonePhase::Exit => self.session.player_exited(host, &mut self.events, station, tick),
                    }
                }
            }
        }

        self.events.deliver();
        true
    }

    /// The host saw a grab on a watched entity. Releases its slot on every
    /// workbench that holds it.
    pub fn picked_up(&mut self, host: &mut dyn Host, entity: EntityId) -> bool {
        let mut released = false;
        let tick = self.sim.tick;
        for (station, bench) in self.workbenches.iter_mut() {
            if !bench.slots().is_tracked(entity) {
                continue;
            }
            let mut ctx = StationContext {
                host: &mut *host,
                events: &mut self.events,
                catalog: &self.catalog,
                station,
                tick,
            };
            released |= bench.on_picked_up(&mut ctx, entity).is_some();
        }
        self.events.deliver();
        released
    }

    /// Completion callback for the operation started at a mixing station.
    pub fn processing_finished(&mut self, host: &mut dyn Host, station: StationId) -> PipelineOutcome {
        let Some(mixer) = self.mixers.get_mut(station) else {
            tracing::warn!(station = ?station, "completion for unknown mixing station");
            return PipelineOutcome::Ignored;
        };
        let outcome = mixer.processing_finished(&mut station_ctx!(self, host, station));
        self.events.deliver();
        outcome
    }

    /// Withdraw one `color` item from a basket straight into `hand`.
    pub fn take_from_basket(
        &mut self,
        host: &mut dyn Host,
        station: StationId,
        color: Color,
        hand: HandId,
        hand_pose: Pose,
    ) -> Option<EntityId> {
        let basket = self.baskets.get_mut(station)?;
        let taken = basket.take(&mut station_ctx!(self, host, station), color, hand, hand_pose);
        self.events.deliver();
        taken
    }

    /// A hand grabbed one of a basket's display stand-ins.
    pub fn display_grabbed(
        &mut self,
        host: &mut dyn Host,
        station: StationId,
        display: EntityId,
        hand: HandId,
        hand_pose: Pose,
    ) -> Option<EntityId> {
        let color = self.baskets.get(station)?.ledger().color_of_display(display)?;
        self.take_from_basket(host, station, color, hand, hand_pose)
    }

    pub fn set_basket_locked(&mut self, host: &mut dyn Host, station: StationId, locked: bool) -> bool {
        let Some(basket) = self.baskets.get_mut(station) else {
            return false;
        };
        basket.set_locked(&mut station_ctx!(self, host, station), locked);
        self.events.deliver();
        true
    }

    // -----------------------------------------------------------------------
    // Session
    // -----------------------------------------------------------------------

    pub fn confirm_prompt(&mut self, host: &mut dyn Host) -> Option<SessionMode> {
        let changed = self.session.confirm(host, &mut self.events, self.sim.tick);
        self.events.deliver();
        changed
    }

    pub fn cancel_prompt(&mut self, host: &mut dyn Host) {
        self.session.cancel(host, &mut self.events, self.sim.tick);
        self.events.deliver();
    }

    // -----------------------------------------------------------------------
    // Event system
    // -----------------------------------------------------------------------

    /// Suppress an event kind. Suppressed events are never allocated or buffered.
    pub fn suppress_event(&mut self, kind: EventKind) {
        self.events.suppress(kind);
    }

    /// Register a listener for an event kind.
    pub fn on_event(&mut self, kind: EventKind, listener: Listener) {
        self.events.on(kind, listener);
    }

    pub fn on_event_filtered(
        &mut self,
        kind: EventKind,
        priority: SubscriberPriority,
        filter: Option<EventFilter>,
        listener: Listener,
    ) {
        self.events.on_filtered(kind, priority, filter, listener);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    // -----------------------------------------------------------------------
    // Pause / Resume
    // -----------------------------------------------------------------------

    /// While paused, `advance()` is a no-op. Zone events are still handled.
    pub fn pause(&mut self) {
        self.paused = true;
    }

    pub fn resume(&mut self) {
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    // -----------------------------------------------------------------------
    // Advance
    // -----------------------------------------------------------------------

    /// Move the clock forward `ticks` steps, running every station's timers
    /// at each step.
    pub fn advance(&mut self, host: &mut dyn Host, ticks: Ticks) -> AdvanceResult {
        let mut result = AdvanceResult::default();
        if self.paused {
            return result;
        }
        for _ in 0..ticks {
            self.sim.tick += 1;
            self.step_timers(&mut *host, &mut result);
            result.steps_run += 1;
        }
        self.events.deliver();
        result
    }

    fn step_timers(&mut self, host: &mut dyn Host, result: &mut AdvanceResult) {
        let tick = self.sim.tick;
        for (station, bench) in self.workbenches.iter_mut() {
            let mut ctx = StationContext {
                host: &mut *host,
                events: &mut self.events,
                catalog: &self.catalog,
                station,
                tick,
            };
            bench.tick(&mut ctx);
        }
        for (station, mixer) in self.mixers.iter_mut() {
            let mut ctx = StationContext {
                host: &mut *host,
                events: &mut self.events,
                catalog: &self.catalog,
                station,
                tick,
            };
            if mixer.tick(&mut ctx) {
                result.timeouts += 1;
            }
        }
        for (_, basket) in self.baskets.iter_mut() {
            basket.tick(tick);
        }
    }

    // -----------------------------------------------------------------------
    // State hash
    // -----------------------------------------------------------------------

    /// Deterministic hash of clock, session and per-station state. Two
    /// workshops fed the same signals hash the same.
    pub fn state_hash(&self) -> u64 {
        let mut h = StateHash::new();
        h.write_u64(self.sim.tick);
        h.write_bool(self.session.mode() == SessionMode::Painting);
        h.write_u32(self.session.presence());

        for (station, kind) in &self.stations {
            h.write_u32(*kind as u32);
            if let Some(bench) = self.workbenches.get(station) {
                let slots = bench.slots();
                for slot in 0..slots.capacity() {
                    h.write_entity(slots.occupant(slot));
                }
                let state = bench.batch().state();
                h.write_u32(state.color().map(|c| c as u32 + 1).unwrap_or(0));
                for &member in state.members() {
                    h.write_entity(Some(member));
                }
                h.write_u32(state.agitations());
                h.write_bool(bench.batch().is_locked());
            }
            if let Some(mixer) = self.mixers.get(station) {
                h.write_bool(mixer.is_busy());
                h.write_entity(mixer.held_substance());
                h.write_entity(mixer.held_catalyst());
            }
            if let Some(basket) = self.baskets.get(station) {
                let ledger = basket.ledger();
                for color in Color::ALL {
                    h.write_u32(ledger.quantity(color));
                    h.write_entity(ledger.display(color));
                }
                h.write_bool(ledger.is_locked());
                h.write_bool(basket.is_docked());
            }
        }
        h.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::CraftEvent;
    use crate::headless::{HeadlessEntity, HeadlessWorld};
    use crate::test_utils::{full_catalog, record_events};

    #[test]
    fn unknown_station_is_ignored() {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(full_catalog());
        let mut other = Workshop::new(full_catalog());
        let foreign = other.add_paint_area();
        let e = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));

        assert!(!shop.dispatch(&mut world, ZoneEvent::enter(foreign, e, ItemKind::Tool)));
    }

    #[test]
    fn invalid_config_is_rejected() {
        let mut shop = Workshop::new(full_catalog());
        let cfg = PipelineConfig {
            operation: String::new(),
            ..Default::default()
        };
        assert_eq!(shop.add_mixer(cfg), Err(ConfigError::EmptyOperationName));
        assert_eq!(shop.station_count(), 0);
    }

    #[test]
    fn events_are_delivered_per_entry_point() {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(full_catalog());
        let log = record_events(&mut shop);
        let bench = shop.add_workbench(WorkbenchConfig::default()).unwrap();
        let f = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));

        shop.dispatch(&mut world, ZoneEvent::enter(bench, f, ItemKind::Flower(Color::Red)));
        let kinds: Vec<EventKind> = log.borrow().iter().map(CraftEvent::kind).collect();
        assert_eq!(
            kinds,
            vec![EventKind::ItemSnapped, EventKind::BatchStarted, EventKind::BatchMemberAdded]
        );
        assert_eq!(shop.events().buffered_count(EventKind::ItemSnapped), 0);
    }

    #[test]
    fn paused_workshop_does_not_advance() {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(full_catalog());
        shop.pause();
        assert_eq!(shop.advance(&mut world, 10).steps_run, 0);
        assert_eq!(shop.tick(), 0);
        shop.resume();
        assert_eq!(shop.advance(&mut world, 10).steps_run, 10);
        assert_eq!(shop.tick(), 10);
    }

    #[test]
    fn paint_area_drives_session() {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(full_catalog());
        let area = shop.add_paint_area();
        let player = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));

        shop.dispatch(&mut world, ZoneEvent::enter(area, player, ItemKind::Player));
        assert_eq!(shop.confirm_prompt(&mut world), Some(SessionMode::Painting));
        shop.dispatch(&mut world, ZoneEvent::exit(area, player, ItemKind::Player));
        assert_eq!(shop.confirm_prompt(&mut world), Some(SessionMode::Crafting));
    }

    #[test]
    fn state_hash_tracks_changes() {
        let mut world = HeadlessWorld::new();
        let mut shop = Workshop::new(full_catalog());
        let bench = shop.add_workbench(WorkbenchConfig::default()).unwrap();
        let before = shop.state_hash();

        let f = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));
        shop.dispatch(&mut world, ZoneEvent::enter(bench, f, ItemKind::Flower(Color::Red)));
        assert_ne!(shop.state_hash(), before);
    }
}
