//! Fixed-point spatial types exchanged with the host scene.

use crate::fixed::{Fixed64, f64_to_fixed64};
use serde::{Deserialize, Serialize};

/// A position in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
    };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
            z: f64_to_fixed64(z),
        }
    }
}

/// A rotation quaternion `(x, y, z, w)`. Not renormalised; the host owns
/// the maths, stations only copy rotations between poses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quat {
    pub x: Fixed64,
    pub y: Fixed64,
    pub z: Fixed64,
    pub w: Fixed64,
}

impl Quat {
    pub const IDENTITY: Quat = Quat {
        x: Fixed64::ZERO,
        y: Fixed64::ZERO,
        z: Fixed64::ZERO,
        w: Fixed64::ONE,
    };

    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self {
            x: f64_to_fixed64(x),
            y: f64_to_fixed64(y),
            z: f64_to_fixed64(z),
            w: f64_to_fixed64(w),
        }
    }
}

impl Default for Quat {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default)]
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    /// A pose at the given position with identity rotation.
    pub fn at(x: f64, y: f64, z: f64) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            rotation: Quat::IDENTITY,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_at_uses_identity_rotation() {
        let p = Pose::at(1.0, 2.0, 3.0);
        assert_eq!(p.rotation, Quat::IDENTITY);
        assert_eq!(p.position.y, f64_to_fixed64(2.0));
    }

    #[test]
    fn default_pose_is_identity() {
        assert_eq!(Pose::default(), Pose::IDENTITY);
    }
}
