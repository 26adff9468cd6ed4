//! Serde data file structs for workshop layouts.
//!
//! These structs define the on-disk format: prefab names, role mappings and
//! station layouts. Poses are plain floats and durations are in seconds;
//! the loader converts both into engine types.

use petalcraft_core::id::{AnchorId, Color};
use petalcraft_core::pose::{Pose, Quat, Vec3};
use petalcraft_core::registry::PrefabRole;
use serde::Deserialize;

// ===========================================================================
// Shared
// ===========================================================================

/// Colour names as written in data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorName {
    Red,
    Yellow,
    Blue,
}

impl From<ColorName> for Color {
    fn from(c: ColorName) -> Self {
        match c {
            ColorName::Red => Color::Red,
            ColorName::Yellow => Color::Yellow,
            ColorName::Blue => Color::Blue,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleName {
    Flower,
    Display,
    Substance,
    Artifact,
}

impl From<RoleName> for PrefabRole {
    fn from(r: RoleName) -> Self {
        match r {
            RoleName::Flower => PrefabRole::Flower,
            RoleName::Display => PrefabRole::Display,
            RoleName::Substance => PrefabRole::Substance,
            RoleName::Artifact => PrefabRole::Artifact,
        }
    }
}

/// A pose: `position = [x, y, z]`, optional `rotation = [x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PoseData {
    pub position: [f64; 3],
    #[serde(default)]
    pub rotation: Option<[f64; 4]>,
}

impl PoseData {
    pub fn to_pose(self) -> Pose {
        let [x, y, z] = self.position;
        let rotation = match self.rotation {
            Some([qx, qy, qz, qw]) => Quat::new(qx, qy, qz, qw),
            None => Quat::IDENTITY,
        };
        Pose {
            position: Vec3::new(x, y, z),
            rotation,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct SlotData {
    pub pose: PoseData,
    #[serde(default)]
    pub anchor: Option<u32>,
}

impl SlotData {
    pub fn anchor_id(&self) -> Option<AnchorId> {
        self.anchor.map(AnchorId)
    }
}

// ===========================================================================
// Catalog
// ===========================================================================

/// One `(role, color) -> prefab` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct MappingData {
    pub role: RoleName,
    pub color: ColorName,
    pub prefab: String,
}

// ===========================================================================
// Stations
// ===========================================================================

/// A workbench: slot layout plus batch rules. Omitted fields keep the
/// stock values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkbenchData {
    #[serde(default)]
    pub slots: Vec<SlotData>,
    #[serde(default)]
    pub accepted: Option<Vec<ColorName>>,
    #[serde(default)]
    pub scale_multiplier: Option<f64>,
    /// Keep the original scale while snapped.
    #[serde(default)]
    pub keep_scale: bool,
    #[serde(default)]
    pub cooldown_seconds: Option<f64>,
    #[serde(default)]
    pub required_items: Option<u32>,
    #[serde(default)]
    pub required_agitations: Option<u32>,
    #[serde(default)]
    pub output: Option<PoseData>,
    #[serde(default)]
    pub advisory_seconds: Option<f64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MixerData {
    pub substance_dock: PoseData,
    pub catalyst_in: PoseData,
    pub catalyst_out: PoseData,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub timeout_seconds: Option<f64>,
    /// Wait forever for the completion callback.
    #[serde(default)]
    pub no_timeout: bool,
    #[serde(default)]
    pub keep_substance_grabbable: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DisplayData {
    pub color: ColorName,
    pub pose: PoseData,
    #[serde(default)]
    pub anchor: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BasketData {
    #[serde(default)]
    pub displays: Vec<DisplayData>,
    #[serde(default)]
    pub dock: Option<PoseData>,
    #[serde(default)]
    pub take_debounce_seconds: Option<f64>,
}

// ===========================================================================
// Top level
// ===========================================================================

/// The whole `workshop.{ron,toml,json}` file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WorkshopFile {
    #[serde(default)]
    pub prefabs: Vec<String>,
    #[serde(default)]
    pub mappings: Vec<MappingData>,
    #[serde(default)]
    pub workbenches: Vec<WorkbenchData>,
    #[serde(default)]
    pub mixers: Vec<MixerData>,
    #[serde(default)]
    pub baskets: Vec<BasketData>,
    #[serde(default)]
    pub paint_areas: u32,
    #[serde(default)]
    pub event_capacity: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_without_rotation_is_upright() {
        let p = PoseData {
            position: [0.5, 1.0, -0.25],
            rotation: None,
        };
        assert_eq!(p.to_pose(), Pose::at(0.5, 1.0, -0.25));
    }

    #[test]
    fn snake_case_names() {
        let m: MappingData =
            serde_json::from_str(r#"{"role": "artifact", "color": "yellow", "prefab": "yellow_paint"}"#)
                .unwrap();
        assert_eq!(PrefabRole::from(m.role), PrefabRole::Artifact);
        assert_eq!(Color::from(m.color), Color::Yellow);
    }

    #[test]
    fn workbench_fields_are_optional() {
        let w: WorkbenchData = serde_json::from_str("{}").unwrap();
        assert!(w.slots.is_empty());
        assert!(w.required_items.is_none());
        assert!(!w.keep_scale);
    }
}
