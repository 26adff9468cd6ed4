//! Homogeneous batch accumulation with agitation gating.
//!
//! The first accepted item fixes the batch colour. Further items of that
//! colour join until the required count is reached; items of any other
//! colour are turned away. Once full, agitation pulses are counted, and any
//! membership change throws the partial count away.
//!
//! Completion itself (spawning the substance, consuming members, resetting
//! slots) belongs to the owning [`Workbench`](crate::workbench::Workbench).
//! The accumulator only reports [`AgitationOutcome::Ready`] and hands the
//! members over through [`BatchAccumulator::take_completed`].

use crate::config::BatchConfig;
use crate::event::CraftEvent;
use crate::id::{Color, EntityId};
use crate::station::StationContext;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BatchState {
    #[default]
    Empty,
    Collecting {
        color: Color,
        members: Vec<EntityId>,
    },
    Full {
        color: Color,
        members: Vec<EntityId>,
        agitations: u32,
    },
}

impl BatchState {
    pub fn color(&self) -> Option<Color> {
        match self {
            BatchState::Empty => None,
            BatchState::Collecting { color, .. } | BatchState::Full { color, .. } => Some(*color),
        }
    }

    /// Members in arrival order.
    pub fn members(&self) -> &[EntityId] {
        match self {
            BatchState::Empty => &[],
            BatchState::Collecting { members, .. } | BatchState::Full { members, .. } => members,
        }
    }

    pub fn agitations(&self) -> u32 {
        match self {
            BatchState::Full { agitations, .. } => *agitations,
            _ => 0,
        }
    }

    pub fn is_full(&self) -> bool {
        matches!(self, BatchState::Full { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterOutcome {
    /// First member; the batch colour is now set.
    Started,
    Added { members: u32 },
    /// The item filled the batch.
    Filled,
    Mismatch { expected: Color },
    AlreadyMember,
    AlreadyFull,
    Locked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgitationOutcome {
    Counted(u32),
    /// The required count is reached; the batch is ready to be consumed.
    Ready { color: Color },
    NotEnoughItems,
    Locked,
}

#[derive(Debug, Clone)]
pub struct BatchAccumulator {
    config: BatchConfig,
    state: BatchState,
    /// Downstream items currently sitting on the station.
    lock_items: BTreeSet<EntityId>,
}

impl BatchAccumulator {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            state: BatchState::Empty,
            lock_items: BTreeSet::new(),
        }
    }

    pub fn state(&self) -> &BatchState {
        &self.state
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn is_locked(&self) -> bool {
        !self.lock_items.is_empty()
    }

    pub fn lock_entered(&mut self, entity: EntityId) {
        self.lock_items.insert(entity);
    }

    pub fn lock_exited(&mut self, entity: EntityId) {
        self.lock_items.remove(&entity);
    }

    pub fn on_item_entered(
        &mut self,
        ctx: &mut StationContext<'_>,
        entity: EntityId,
        color: Color,
    ) -> EnterOutcome {
        if self.is_locked() {
            return EnterOutcome::Locked;
        }
        let required = self.config.required_items as usize;

        let outcome = match &mut self.state {
            BatchState::Empty => {
                ctx.emit(CraftEvent::BatchStarted {
                    station: ctx.station,
                    color,
                    tick: ctx.tick,
                });
                self.state = if required <= 1 {
                    BatchState::Full {
                        color,
                        members: vec![entity],
                        agitations: 0,
                    }
                } else {
                    BatchState::Collecting {
                        color,
                        members: vec![entity],
                    }
                };
                EnterOutcome::Started
            }
            BatchState::Collecting { members, .. } | BatchState::Full { members, .. }
                if members.contains(&entity) =>
            {
                return EnterOutcome::AlreadyMember;
            }
            BatchState::Collecting { color: expected, .. } | BatchState::Full { color: expected, .. }
                if *expected != color =>
            {
                let expected = *expected;
                tracing::debug!(station = ?ctx.station, ?expected, incoming = ?color, "batch colour mismatch");
                ctx.emit(CraftEvent::BatchMismatch {
                    station: ctx.station,
                    expected,
                    incoming: color,
                    tick: ctx.tick,
                });
                return EnterOutcome::Mismatch { expected };
            }
            BatchState::Full { .. } => return EnterOutcome::AlreadyFull,
            BatchState::Collecting { members, .. } => {
                members.push(entity);
                if members.len() >= required {
                    let members = std::mem::take(members);
                    self.state = BatchState::Full {
                        color,
                        members,
                        agitations: 0,
                    };
                    EnterOutcome::Filled
                } else {
                    EnterOutcome::Added {
                        members: members.len() as u32,
                    }
                }
            }
        };

        let members = self.state.members().len() as u32;
        tracing::debug!(station = ?ctx.station, entity = ?entity, ?color, members, "batch member added");
        ctx.emit(CraftEvent::BatchMemberAdded {
            station: ctx.station,
            entity,
            members,
            tick: ctx.tick,
        });
        outcome
    }

    /// A member left before completion. Returns `false` for non-members.
    pub fn on_item_exited(&mut self, ctx: &mut StationContext<'_>, entity: EntityId) -> bool {
        let members = match &mut self.state {
            BatchState::Empty => return false,
            BatchState::Collecting { members, .. } | BatchState::Full { members, .. } => members,
        };
        let Some(pos) = members.iter().position(|&m| m == entity) else {
            return false;
        };
        members.remove(pos);
        let remaining = members.len() as u32;

        self.state = match std::mem::take(&mut self.state) {
            BatchState::Collecting { color, members } | BatchState::Full { color, members, .. }
                if !members.is_empty() =>
            {
                BatchState::Collecting { color, members }
            }
            _ => BatchState::Empty,
        };

        tracing::debug!(station = ?ctx.station, entity = ?entity, remaining, "batch member removed");
        ctx.emit(CraftEvent::BatchMemberRemoved {
            station: ctx.station,
            entity,
            members: remaining,
            tick: ctx.tick,
        });
        true
    }

    /// Count one agitation pulse.
    pub fn agitate(&mut self, ctx: &mut StationContext<'_>) -> AgitationOutcome {
        if self.is_locked() {
            return AgitationOutcome::Locked;
        }
        let required = self.config.required_agitations;
        let BatchState::Full {
            color, agitations, ..
        } = &mut self.state
        else {
            return AgitationOutcome::NotEnoughItems;
        };

        if *agitations < required {
            *agitations += 1;
            tracing::debug!(station = ?ctx.station, count = *agitations, required, "agitation counted");
            ctx.emit(CraftEvent::AgitationCounted {
                station: ctx.station,
                count: *agitations,
                tick: ctx.tick,
            });
        }
        if *agitations >= required {
            AgitationOutcome::Ready { color: *color }
        } else {
            AgitationOutcome::Counted(*agitations)
        }
    }

    /// Consume a ready batch, returning its colour and members and resetting
    /// to `Empty`. Returns `None` and leaves the state alone otherwise.
    pub fn take_completed(&mut self) -> Option<(Color, Vec<EntityId>)> {
        match &self.state {
            BatchState::Full { agitations, .. } if *agitations >= self.config.required_agitations => {}
            _ => return None,
        }
        match std::mem::take(&mut self.state) {
            BatchState::Full { color, members, .. } => Some((color, members)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::test_utils::Rig;

    fn fill(rig: &mut Rig, batch: &mut BatchAccumulator, color: Color, n: usize) -> Vec<EntityId> {
        (0..n)
            .map(|_| {
                let e = rig.flower();
                batch.on_item_entered(&mut rig.ctx(), e, color);
                e
            })
            .collect()
    }

    #[test]
    fn first_item_sets_colour() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        let e = rig.flower();

        assert_eq!(batch.on_item_entered(&mut rig.ctx(), e, Color::Red), EnterOutcome::Started);
        assert_eq!(batch.state().color(), Some(Color::Red));
        assert_eq!(batch.state().members(), &[e]);
        assert_eq!(rig.emitted(EventKind::BatchStarted).len(), 1);
    }

    #[test]
    fn filling_reaches_full() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        fill(&mut rig, &mut batch, Color::Red, 3);
        assert!(!batch.state().is_full());

        let last = rig.flower();
        assert_eq!(batch.on_item_entered(&mut rig.ctx(), last, Color::Red), EnterOutcome::Filled);
        assert!(batch.state().is_full());
        assert_eq!(batch.state().members().len(), 4);
    }

    #[test]
    fn mismatch_does_not_mutate() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        fill(&mut rig, &mut batch, Color::Red, 2);
        let before = batch.state().clone();

        let blue = rig.flower();
        assert_eq!(
            batch.on_item_entered(&mut rig.ctx(), blue, Color::Blue),
            EnterOutcome::Mismatch { expected: Color::Red }
        );
        assert_eq!(batch.state(), &before);
        assert_eq!(rig.emitted(EventKind::BatchMismatch).len(), 1);
    }

    #[test]
    fn same_colour_into_full_batch_is_rejected() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        fill(&mut rig, &mut batch, Color::Yellow, 4);
        batch.agitate(&mut rig.ctx());
        let before = batch.state().clone();

        let extra = rig.flower();
        assert_eq!(
            batch.on_item_entered(&mut rig.ctx(), extra, Color::Yellow),
            EnterOutcome::AlreadyFull
        );
        assert_eq!(batch.state(), &before);
    }

    #[test]
    fn duplicate_enter_is_ignored() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        let members = fill(&mut rig, &mut batch, Color::Red, 2);
        assert_eq!(
            batch.on_item_entered(&mut rig.ctx(), members[0], Color::Red),
            EnterOutcome::AlreadyMember
        );
        assert_eq!(batch.state().members().len(), 2);
    }

    #[test]
    fn agitation_only_counts_when_full() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::NotEnoughItems);

        fill(&mut rig, &mut batch, Color::Red, 3);
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::NotEnoughItems);

        fill(&mut rig, &mut batch, Color::Red, 1);
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::Counted(1));
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::Counted(2));
        assert_eq!(
            batch.agitate(&mut rig.ctx()),
            AgitationOutcome::Ready { color: Color::Red }
        );
        // Further pulses keep reporting ready without overcounting.
        assert_eq!(
            batch.agitate(&mut rig.ctx()),
            AgitationOutcome::Ready { color: Color::Red }
        );
        assert_eq!(batch.state().agitations(), 3);
    }

    #[test]
    fn exit_discards_agitation_progress() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        let members = fill(&mut rig, &mut batch, Color::Red, 4);
        batch.agitate(&mut rig.ctx());
        batch.agitate(&mut rig.ctx());

        assert!(batch.on_item_exited(&mut rig.ctx(), members[1]));
        assert_eq!(batch.state().agitations(), 0);
        assert!(!batch.state().is_full());

        // Refill: counting starts over.
        batch.on_item_entered(&mut rig.ctx(), members[1], Color::Red);
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::Counted(1));
    }

    #[test]
    fn last_exit_returns_to_empty() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        let members = fill(&mut rig, &mut batch, Color::Blue, 2);
        batch.on_item_exited(&mut rig.ctx(), members[0]);
        batch.on_item_exited(&mut rig.ctx(), members[1]);
        assert_eq!(batch.state(), &BatchState::Empty);

        // Any colour may start the next batch.
        let red = rig.flower();
        assert_eq!(batch.on_item_entered(&mut rig.ctx(), red, Color::Red), EnterOutcome::Started);
    }

    #[test]
    fn non_member_exit_keeps_full_batch_intact() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        fill(&mut rig, &mut batch, Color::Red, 4);
        batch.agitate(&mut rig.ctx());
        let stranger = rig.flower();

        assert!(!batch.on_item_exited(&mut rig.ctx(), stranger));
        assert!(batch.state().is_full());
    }

    #[test]
    fn lock_suppresses_enter_and_agitation() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig::default());
        fill(&mut rig, &mut batch, Color::Red, 4);
        let powder = rig.item();
        batch.lock_entered(powder);

        let red = rig.flower();
        assert_eq!(batch.on_item_entered(&mut rig.ctx(), red, Color::Red), EnterOutcome::Locked);
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::Locked);
        assert_eq!(batch.state().agitations(), 0);

        batch.lock_exited(powder);
        assert_eq!(batch.agitate(&mut rig.ctx()), AgitationOutcome::Counted(1));
    }

    #[test]
    fn take_completed_requires_ready_batch() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig {
            required_items: 2,
            required_agitations: 1,
        });
        let members = fill(&mut rig, &mut batch, Color::Yellow, 2);
        assert_eq!(batch.take_completed(), None);

        batch.agitate(&mut rig.ctx());
        assert_eq!(batch.take_completed(), Some((Color::Yellow, members)));
        assert_eq!(batch.state(), &BatchState::Empty);
    }

    #[test]
    fn single_item_batch_is_full_immediately() {
        let mut rig = Rig::new();
        let mut batch = BatchAccumulator::new(BatchConfig {
            required_items: 1,
            required_agitations: 1,
        });
        let e = rig.flower();
        batch.on_item_entered(&mut rig.ctx(), e, Color::Red);
        assert!(batch.state().is_full());
    }
}
