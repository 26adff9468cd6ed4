//! In-memory [`Host`](crate::host::Host) implementation.
//!
//! `HeadlessWorld` keeps just enough scene state to drive a workshop without
//! a game engine: entities with pose, scale, parent anchor, body and grab
//! flags, plus logs of panel visibility, collision-ignore pairs and
//! triggered operations. Zone events are not generated automatically; the
//! caller feeds them to the workshop.

use crate::advisory::Advisory;
use crate::fixed::Fixed64;
use crate::host::{Animator, Display, Grab, Physics, Scene};
use crate::id::{AnchorId, EntityId, HandId, PrefabId, StationId};
use crate::pose::Pose;
use slotmap::SlotMap;
use std::collections::HashSet;

/// Scene state of one headless entity.
#[derive(Debug, Clone, PartialEq)]
pub struct HeadlessEntity {
    /// The prefab this entity was spawned from, if any.
    pub prefab: Option<PrefabId>,
    pub pose: Pose,
    pub scale: Fixed64,
    pub parent: Option<AnchorId>,
    /// `None` means the entity has no rigid body.
    pub kinematic: Option<bool>,
    pub physics_enabled: bool,
    /// Number of times the host was asked to zero this entity's velocity.
    pub velocity_resets: u32,
    pub grab_enabled: bool,
    pub held_by: Option<HandId>,
    pub pickup_watched: bool,
    pub has_animator: bool,
}

impl HeadlessEntity {
    /// A grabbable dynamic body at `pose` with unit scale.
    pub fn dynamic(pose: Pose) -> Self {
        Self {
            prefab: None,
            pose,
            scale: Fixed64::ONE,
            parent: None,
            kinematic: Some(false),
            physics_enabled: true,
            velocity_resets: 0,
            grab_enabled: true,
            held_by: None,
            pickup_watched: false,
            has_animator: false,
        }
    }

    pub fn with_animator(mut self) -> Self {
        self.has_animator = true;
        self
    }

    pub fn with_kinematic(mut self, kinematic: Option<bool>) -> Self {
        self.kinematic = kinematic;
        self
    }

    pub fn with_scale(mut self, scale: Fixed64) -> Self {
        self.scale = scale;
        self
    }
}

/// A scene host with no rendering, physics stepping or input.
#[derive(Debug, Default)]
pub struct HeadlessWorld {
    entities: SlotMap<EntityId, HeadlessEntity>,
    visible_panels: HashSet<(StationId, Advisory)>,
    ignored_pairs: Vec<(EntityId, EntityId)>,
    operations: Vec<(EntityId, String)>,
    destroyed: Vec<EntityId>,
}

impl HeadlessWorld {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entity directly (scene authoring, not a spawn request).
    pub fn insert(&mut self, entity: HeadlessEntity) -> EntityId {
        self.entities.insert(entity)
    }

    pub fn entity(&self, id: EntityId) -> Option<&HeadlessEntity> {
        self.entities.get(id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut HeadlessEntity> {
        self.entities.get_mut(id)
    }

    /// Simulate a hand grabbing the entity. Returns `true` when the host
    /// should forward a pickup signal to the workshop.
    pub fn grab(&mut self, id: EntityId, hand: HandId) -> bool {
        match self.entities.get_mut(id) {
            Some(e) if e.grab_enabled => {
                e.held_by = Some(hand);
                e.pickup_watched
            }
            _ => false,
        }
    }

    /// Live entities spawned from `prefab`, in slot order.
    pub fn spawned_from(&self, prefab: PrefabId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.prefab == Some(prefab))
            .map(|(id, _)| id)
            .collect()
    }

    pub fn live_count(&self) -> usize {
        self.entities.len()
    }

    /// Whether any station is showing `advisory`.
    pub fn is_panel_visible(&self, advisory: Advisory) -> bool {
        self.visible_panels.iter().any(|&(_, a)| a == advisory)
    }

    pub fn is_panel_visible_at(&self, station: StationId, advisory: Advisory) -> bool {
        self.visible_panels.contains(&(station, advisory))
    }

    pub fn ignored_pairs(&self) -> &[(EntityId, EntityId)] {
        &self.ignored_pairs
    }

    /// Every operation triggered so far, oldest first.
    pub fn operations(&self) -> &[(EntityId, String)] {
        &self.operations
    }

    /// Every entity destroyed so far, oldest first.
    pub fn destroyed(&self) -> &[EntityId] {
        &self.destroyed
    }
}

impl Physics for HeadlessWorld {
    fn is_kinematic(&self, entity: EntityId) -> Option<bool> {
        self.entities.get(entity).and_then(|e| e.kinematic)
    }

    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool) {
        if let Some(e) = self.entities.get_mut(entity)
            && e.kinematic.is_some()
        {
            e.kinematic = Some(kinematic);
        }
    }

    fn zero_velocity(&mut self, entity: EntityId) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.velocity_resets += 1;
        }
    }

    fn ignore_collision(&mut self, a: EntityId, b: EntityId) {
        self.ignored_pairs.push((a, b));
    }

    fn disable_physics(&mut self, entity: EntityId) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.physics_enabled = false;
        }
    }
}

impl Grab for HeadlessWorld {
    fn is_held(&self, entity: EntityId) -> bool {
        self.entities
            .get(entity)
            .is_some_and(|e| e.held_by.is_some())
    }

    fn force_release(&mut self, entity: EntityId) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.held_by = None;
        }
    }

    fn set_grab_enabled(&mut self, entity: EntityId, enabled: bool) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.grab_enabled = enabled;
            if !enabled {
                e.held_by = None;
            }
        }
    }

    fn watch_pickup(&mut self, entity: EntityId, watch: bool) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.pickup_watched = watch;
        }
    }

    fn attach_to_hand(&mut self, entity: EntityId, hand: HandId) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.held_by = Some(hand);
        }
    }
}

impl Scene for HeadlessWorld {
    fn exists(&self, entity: EntityId) -> bool {
        self.entities.contains_key(entity)
    }

    fn pose(&self, entity: EntityId) -> Option<Pose> {
        self.entities.get(entity).map(|e| e.pose)
    }

    fn set_pose(&mut self, entity: EntityId, pose: Pose) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.pose = pose;
        }
    }

    fn scale(&self, entity: EntityId) -> Option<Fixed64> {
        self.entities.get(entity).map(|e| e.scale)
    }

    fn set_scale(&mut self, entity: EntityId, scale: Fixed64) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.scale = scale;
        }
    }

    fn set_parent(&mut self, entity: EntityId, parent: Option<AnchorId>) {
        if let Some(e) = self.entities.get_mut(entity) {
            e.parent = parent;
        }
    }

    fn children_of(&self, anchor: AnchorId) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.parent == Some(anchor))
            .map(|(id, _)| id)
            .collect()
    }

    fn spawn(&mut self, prefab: PrefabId, pose: Pose, parent: Option<AnchorId>) -> EntityId {
        let mut entity = HeadlessEntity::dynamic(pose);
        entity.prefab = Some(prefab);
        entity.parent = parent;
        self.entities.insert(entity)
    }

    fn destroy(&mut self, entity: EntityId) {
        if self.entities.remove(entity).is_some() {
            self.destroyed.push(entity);
        }
    }
}

impl Animator for HeadlessWorld {
    fn has_animator(&self, entity: EntityId) -> bool {
        self.entities.get(entity).is_some_and(|e| e.has_animator)
    }

    fn trigger(&mut self, entity: EntityId, operation: &str) {
        self.operations.push((entity, operation.to_string()));
    }
}

impl Display for HeadlessWorld {
    fn show(&mut self, station: StationId, advisory: Advisory) {
        self.visible_panels.insert((station, advisory));
    }

    fn hide(&mut self, station: StationId, advisory: Advisory) {
        self.visible_panels.remove(&(station, advisory));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_and_destroy_are_logged() {
        let mut world = HeadlessWorld::new();
        let e = world.spawn(PrefabId(7), Pose::at(1.0, 0.0, 0.0), Some(AnchorId(2)));
        assert_eq!(world.spawned_from(PrefabId(7)), vec![e]);
        assert_eq!(world.children_of(AnchorId(2)), vec![e]);

        world.destroy(e);
        assert!(!world.exists(e));
        assert_eq!(world.destroyed(), &[e]);

        // Destroying twice logs once.
        world.destroy(e);
        assert_eq!(world.destroyed().len(), 1);
    }

    #[test]
    fn set_kinematic_needs_a_body() {
        let mut world = HeadlessWorld::new();
        let body = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));
        let bodiless =
            world.insert(HeadlessEntity::dynamic(Pose::IDENTITY).with_kinematic(None));

        world.set_kinematic(body, true);
        world.set_kinematic(bodiless, true);
        assert_eq!(world.is_kinematic(body), Some(true));
        assert_eq!(world.is_kinematic(bodiless), None);
    }

    #[test]
    fn grab_forwards_only_when_watched() {
        let mut world = HeadlessWorld::new();
        let e = world.insert(HeadlessEntity::dynamic(Pose::IDENTITY));
        assert!(!world.grab(e, HandId(0)));

        world.watch_pickup(e, true);
        assert!(world.grab(e, HandId(1)));
        assert!(world.is_held(e));

        world.set_grab_enabled(e, false);
        assert!(!world.is_held(e));
        assert!(!world.grab(e, HandId(1)));
    }
}
