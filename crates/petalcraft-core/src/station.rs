//! Station plumbing shared by every state machine.
//!
//! Stations never hold references to the host or to each other. Each entry
//! point receives a [`StationContext`] for the duration of one call.

use crate::event::{CraftEvent, EventBus};
use crate::fixed::Ticks;
use crate::host::Host;
use crate::id::{EntityId, ItemKind, StationId};
use crate::registry::Catalog;

// ---------------------------------------------------------------------------
// StationContext
// ---------------------------------------------------------------------------

/// Mutable context passed to a station for one event.
pub struct StationContext<'a> {
    /// Scene, physics, grab, animation and display collaborators.
    pub host: &'a mut dyn Host,
    /// The event bus for emitting events.
    pub events: &'a mut EventBus,
    /// Prefab mappings.
    pub catalog: &'a Catalog,
    /// The station being driven.
    pub station: StationId,
    /// The current workshop tick.
    pub tick: Ticks,
}

impl StationContext<'_> {
    pub fn emit(&mut self, event: CraftEvent) {
        self.events.emit(event);
    }
}

// ---------------------------------------------------------------------------
// Zone events
// ---------------------------------------------------------------------------

/// Which volume of a station reported the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZoneRole {
    /// The station's working volume: bench top, mixer bowl, basket opening,
    /// paint area.
    Primary,
    /// The basket's docking volume.
    Dock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Zone {
    pub station: StationId,
    pub role: ZoneRole,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ZonePhase {
    Enter,
    Exit,
}

/// An enter/exit report from a host trigger volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoneEvent {
    pub zone: Zone,
    pub entity: EntityId,
    pub kind: ItemKind,
    pub phase: ZonePhase,
}

impl ZoneEvent {
    pub fn enter(station: StationId, entity: EntityId, kind: ItemKind) -> Self {
        Self {
            zone: Zone {
                station,
                role: ZoneRole::Primary,
            },
            entity,
            kind,
            phase: ZonePhase::Enter,
        }
    }

    pub fn exit(station: StationId, entity: EntityId, kind: ItemKind) -> Self {
        Self {
            phase: ZonePhase::Exit,
            ..Self::enter(station, entity, kind)
        }
    }

    pub fn in_role(mut self, role: ZoneRole) -> Self {
        self.zone.role = role;
        self
    }
}

/// What kind of station a [`StationId`] names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StationKind {
    Workbench,
    Mixer,
    Basket,
    PaintArea,
}
