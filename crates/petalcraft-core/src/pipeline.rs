//! Two-stage transformation at the mixing station.
//!
//! Stage 1 docks a substance. Stage 2 docks a catalyst, marks the station
//! busy and fires a timed operation on the catalyst's animator. The host
//! reports the end of that operation through
//! [`TransformationPipeline::processing_finished`]; only then is the
//! artifact spawned and the station released.
//!
//! ```text
//!  Idle ──substance──▶ SubstanceLoaded ──catalyst──▶ Processing
//!   ▲                                                   │
//!   └──────────── finished (or timed out) ◀─────────────┘
//! ```

use crate::config::PipelineConfig;
use crate::event::{CraftEvent, FaultReason, MissingConfig};
use crate::fixed::Ticks;
use crate::id::{Color, EntityId, ItemKind};
use crate::registry::PrefabRole;
use crate::station::{StationContext, ZoneEvent, ZonePhase};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelinePhase {
    Idle,
    SubstanceLoaded,
    Processing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineOutcome {
    SubstanceLoaded,
    ProcessingStarted,
    ArtifactSpawned(EntityId),
    /// Rejected: an operation is running.
    Busy,
    /// Rejected: a substance is already docked.
    Occupied,
    /// Rejected: the catalyst arrived before any substance.
    NoSubstance,
    /// Rejected: the catalyst cannot play the operation.
    NoAnimator,
    /// Completion arrived with nothing running.
    NotBusy,
    /// Completion arrived but no artifact is mapped; the station stays busy.
    MissingOutput,
    Ignored,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldSubstance {
    entity: EntityId,
    color: Color,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct HeldCatalyst {
    entity: EntityId,
    saved_kinematic: Option<bool>,
    started_at: Ticks,
}

#[derive(Debug, Clone)]
pub struct TransformationPipeline {
    config: PipelineConfig,
    substance: Option<HeldSubstance>,
    catalyst: Option<HeldCatalyst>,
    busy: bool,
}

impl TransformationPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            config,
            substance: None,
            catalyst: None,
            busy: false,
        }
    }

    pub fn phase(&self) -> PipelinePhase {
        if self.busy {
            PipelinePhase::Processing
        } else if self.substance.is_some() {
            PipelinePhase::SubstanceLoaded
        } else {
            PipelinePhase::Idle
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn held_substance(&self) -> Option<EntityId> {
        self.substance.map(|s| s.entity)
    }

    pub fn held_catalyst(&self) -> Option<EntityId> {
        self.catalyst.map(|c| c.entity)
    }

    /// Route a zone report. While busy every enter is ignored; a substance
    /// is always considered before the catalyst.
    pub fn handle_zone(&mut self, ctx: &mut StationContext<'_>, event: &ZoneEvent) -> PipelineOutcome {
        match event.phase {
            ZonePhase::Enter if self.busy => PipelineOutcome::Busy,
            ZonePhase::Enter => match event.kind {
                ItemKind::Powder(color) => self.on_substance_entered(ctx, event.entity, color),
                ItemKind::Catalyst => self.on_catalyst_entered(ctx, event.entity),
                _ => PipelineOutcome::Ignored,
            },
            ZonePhase::Exit => {
                self.on_substance_exited(ctx, event.entity);
                PipelineOutcome::Ignored
            }
        }
    }

    /// Stage 1: dock the substance.
    pub fn on_substance_entered(
        &mut self,
        ctx: &mut StationContext<'_>,
        entity: EntityId,
        color: Color,
    ) -> PipelineOutcome {
        if self.busy {
            return PipelineOutcome::Busy;
        }
        if self.substance.is_some() {
            return PipelineOutcome::Occupied;
        }

        let host = &mut *ctx.host;
        if host.is_held(entity) {
            host.force_release(entity);
        }
        host.zero_velocity(entity);
        host.set_kinematic(entity, true);
        host.set_pose(entity, self.config.substance_dock);
        if self.config.disable_substance_grab {
            host.set_grab_enabled(entity, false);
        }
        self.substance = Some(HeldSubstance { entity, color });

        tracing::debug!(station = ?ctx.station, entity = ?entity, ?color, "substance loaded");
        ctx.emit(CraftEvent::SubstanceLoaded {
            station: ctx.station,
            entity,
            color,
            tick: ctx.tick,
        });
        PipelineOutcome::SubstanceLoaded
    }

    /// The player took a docked substance back out before processing.
    pub fn on_substance_exited(&mut self, ctx: &mut StationContext<'_>, entity: EntityId) -> bool {
        if self.busy || self.held_substance() != Some(entity) {
            return false;
        }
        self.substance = None;
        ctx.host.set_kinematic(entity, false);
        if self.config.disable_substance_grab {
            ctx.host.set_grab_enabled(entity, true);
        }
        tracing::debug!(station = ?ctx.station, entity = ?entity, "substance unloaded");
        true
    }

    /// Stage 2: dock the catalyst and start the timed operation.
    pub fn on_catalyst_entered(&mut self, ctx: &mut StationContext<'_>, entity: EntityId) -> PipelineOutcome {
        if self.busy {
            tracing::debug!(station = ?ctx.station, entity = ?entity, "catalyst rejected, station busy");
            return PipelineOutcome::Busy;
        }
        if self.substance.is_none() {
            return PipelineOutcome::NoSubstance;
        }
        if !ctx.host.has_animator(entity) {
            tracing::error!(station = ?ctx.station, entity = ?entity, "catalyst has no animator");
            ctx.emit(CraftEvent::ConfigurationMissing {
                station: ctx.station,
                missing: MissingConfig::Animator,
                tick: ctx.tick,
            });
            return PipelineOutcome::NoAnimator;
        }

        self.busy = true;
        let host = &mut *ctx.host;
        let saved_kinematic = host.is_kinematic(entity);
        host.set_kinematic(entity, true);
        host.zero_velocity(entity);
        host.set_pose(entity, self.config.catalyst_in);
        host.set_grab_enabled(entity, false);
        host.trigger(entity, &self.config.operation);
        self.catalyst = Some(HeldCatalyst {
            entity,
            saved_kinematic,
            started_at: ctx.tick,
        });

        tracing::debug!(station = ?ctx.station, entity = ?entity, operation = %self.config.operation, "processing started");
        ctx.emit(CraftEvent::ProcessingStarted {
            station: ctx.station,
            catalyst: entity,
            tick: ctx.tick,
        });
        PipelineOutcome::ProcessingStarted
    }

    /// Completion callback for the operation started in stage 2.
    pub fn processing_finished(&mut self, ctx: &mut StationContext<'_>) -> PipelineOutcome {
        let (Some(substance), Some(catalyst)) = (self.substance, self.catalyst) else {
            tracing::warn!(station = ?ctx.station, "completion received while idle");
            return PipelineOutcome::NotBusy;
        };
        if !self.busy {
            tracing::warn!(station = ?ctx.station, "completion received while idle");
            return PipelineOutcome::NotBusy;
        }

        let Some(prefab) = ctx.catalog.prefab(PrefabRole::Artifact, substance.color) else {
            tracing::error!(
                station = ?ctx.station,
                color = ?substance.color,
                "no artifact mapped; station stays busy"
            );
            ctx.emit(CraftEvent::ConfigurationMissing {
                station: ctx.station,
                missing: MissingConfig::ArtifactPrefab(substance.color),
                tick: ctx.tick,
            });
            ctx.emit(CraftEvent::PipelineFaulted {
                station: ctx.station,
                reason: FaultReason::MissingOutput,
                tick: ctx.tick,
            });
            return PipelineOutcome::MissingOutput;
        };

        let host = &mut *ctx.host;
        host.set_pose(catalyst.entity, self.config.catalyst_out);
        let artifact = host.spawn(prefab, self.config.substance_dock, None);
        host.destroy(substance.entity);
        self.release_catalyst(ctx, catalyst);
        self.substance = None;
        self.busy = false;

        tracing::info!(station = ?ctx.station, entity = ?artifact, color = ?substance.color, "artifact spawned");
        ctx.emit(CraftEvent::ArtifactSpawned {
            station: ctx.station,
            entity: artifact,
            color: substance.color,
            tick: ctx.tick,
        });
        PipelineOutcome::ArtifactSpawned(artifact)
    }

    /// Force-fail an operation that outlived the configured timeout.
    /// Returns `true` if the pipeline was reset.
    pub fn tick(&mut self, ctx: &mut StationContext<'_>) -> bool {
        let (Some(timeout), Some(catalyst)) = (self.config.timeout, self.catalyst) else {
            return false;
        };
        if !self.busy || ctx.tick < catalyst.started_at.saturating_add(timeout) {
            return false;
        }

        ctx.host.set_pose(catalyst.entity, self.config.catalyst_out);
        self.release_catalyst(ctx, catalyst);
        if let Some(substance) = self.substance.take() {
            ctx.host.set_grab_enabled(substance.entity, true);
            ctx.host.set_kinematic(substance.entity, false);
        }
        self.busy = false;

        tracing::error!(station = ?ctx.station, started_at = catalyst.started_at, "operation timed out");
        ctx.emit(CraftEvent::PipelineFaulted {
            station: ctx.station,
            reason: FaultReason::TimedOut,
            tick: ctx.tick,
        });
        true
    }

    fn release_catalyst(&mut self, ctx: &mut StationContext<'_>, catalyst: HeldCatalyst) {
        ctx.host.set_grab_enabled(catalyst.entity, true);
        if let Some(kinematic) = catalyst.saved_kinematic {
            ctx.host.set_kinematic(catalyst.entity, kinematic);
        }
        self.catalyst = None;
    }
}
