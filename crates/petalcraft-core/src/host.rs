//! Host collaborator interfaces.
//!
//! The workshop never touches the scene graph, physics, interaction or
//! animation systems directly. Stations request changes through these
//! traits; the host (game engine adapter, [`HeadlessWorld`], or a test
//! double) applies them.
//!
//! All methods are infallible from the station's point of view. Requests
//! against entities the host no longer knows are silently ignored by the
//! host, matching how a destroyed scene object behaves.
//!
//! [`HeadlessWorld`]: crate::headless::HeadlessWorld

use crate::advisory::Advisory;
use crate::fixed::Fixed64;
use crate::id::{AnchorId, EntityId, HandId, PrefabId, StationId};
use crate::pose::Pose;

/// Rigid-body control.
pub trait Physics {
    /// Whether the entity's body is kinematic. `None` if it has no body.
    fn is_kinematic(&self, entity: EntityId) -> Option<bool>;
    fn set_kinematic(&mut self, entity: EntityId, kinematic: bool);
    /// Zero linear and angular velocity.
    fn zero_velocity(&mut self, entity: EntityId);
    /// Stop collisions between two entities' colliders.
    fn ignore_collision(&mut self, a: EntityId, b: EntityId);
    /// Turn off an entity's colliders and simulation entirely.
    fn disable_physics(&mut self, entity: EntityId);
}

/// Grab/interaction control.
pub trait Grab {
    fn is_held(&self, entity: EntityId) -> bool;
    /// Cancel any in-progress grab on the entity.
    fn force_release(&mut self, entity: EntityId);
    fn set_grab_enabled(&mut self, entity: EntityId, enabled: bool);
    /// Start or stop forwarding the entity's pickup signal to the workshop.
    fn watch_pickup(&mut self, entity: EntityId, watch: bool);
    /// Put the entity straight into the given hand.
    fn attach_to_hand(&mut self, entity: EntityId, hand: HandId);
}

/// Scene graph: transforms, hierarchy, spawning.
pub trait Scene {
    fn exists(&self, entity: EntityId) -> bool;
    fn pose(&self, entity: EntityId) -> Option<Pose>;
    fn set_pose(&mut self, entity: EntityId, pose: Pose);
    /// Uniform local scale.
    fn scale(&self, entity: EntityId) -> Option<Fixed64>;
    fn set_scale(&mut self, entity: EntityId, scale: Fixed64);
    /// Reparent under an anchor frame, or detach with `None`. World pose is kept.
    fn set_parent(&mut self, entity: EntityId, parent: Option<AnchorId>);
    /// Entities currently parented under an anchor.
    fn children_of(&self, anchor: AnchorId) -> Vec<EntityId>;
    fn spawn(&mut self, prefab: PrefabId, pose: Pose, parent: Option<AnchorId>) -> EntityId;
    fn destroy(&mut self, entity: EntityId);
}

/// Animation/effect playback for externally timed operations.
pub trait Animator {
    fn has_animator(&self, entity: EntityId) -> bool;
    /// Fire a named operation. Completion is reported back later through
    /// [`Workshop::processing_finished`](crate::workshop::Workshop::processing_finished).
    fn trigger(&mut self, entity: EntityId, operation: &str);
}

/// Advisory panels. Each station owns its own copy of a panel, so hiding
/// one station's panel leaves the others alone.
pub trait Display {
    fn show(&mut self, station: StationId, advisory: Advisory);
    fn hide(&mut self, station: StationId, advisory: Advisory);
}

/// Everything a station may ask of the host.
pub trait Host: Physics + Grab + Scene + Animator + Display {}

impl<T: Physics + Grab + Scene + Animator + Display> Host for T {}
