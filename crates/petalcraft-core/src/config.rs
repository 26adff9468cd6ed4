//! Station configuration.
//!
//! Every config derives serde with field defaults, so a data file only needs
//! to name what differs from the stock workshop. Durations are in ticks.

use crate::fixed::{Fixed64, Ticks, f64_to_fixed64, seconds_to_ticks};
use crate::id::{AnchorId, Color, ItemKind};
use crate::pose::Pose;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

/// A placement point: where an entity snaps to and, optionally, the host
/// frame it is parented under while it sits there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotSpec {
    pub pose: Pose,
    #[serde(default)]
    pub anchor: Option<AnchorId>,
}

impl SlotSpec {
    pub fn new(pose: Pose) -> Self {
        Self { pose, anchor: None }
    }

    pub fn with_anchor(mut self, anchor: AnchorId) -> Self {
        self.anchor = Some(anchor);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotAllocatorConfig {
    /// Slots in search order.
    pub slots: Vec<SlotSpec>,
    /// Categories that may take a slot.
    pub accepted: Vec<ItemKind>,
    /// Uniform scale applied while snapped. `None` keeps the original scale.
    pub scale_multiplier: Option<Fixed64>,
    /// How long a released entity is ignored by the zone.
    pub cooldown: Ticks,
}

impl Default for SlotAllocatorConfig {
    fn default() -> Self {
        Self {
            slots: (0..4)
                .map(|i| SlotSpec::new(Pose::at(0.15 * i as f64, 0.0, 0.0)))
                .collect(),
            accepted: Color::ALL.iter().map(|&c| ItemKind::Flower(c)).collect(),
            scale_multiplier: Some(f64_to_fixed64(0.4)),
            cooldown: seconds_to_ticks(0.25),
        }
    }
}

impl SlotAllocatorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slots.is_empty() {
            return Err(ConfigError::NoSlots);
        }
        if self.accepted.is_empty() {
            return Err(ConfigError::NothingAccepted);
        }
        if let Some(m) = self.scale_multiplier
            && m <= Fixed64::ZERO
        {
            return Err(ConfigError::InvalidScale(m));
        }
        check_unique_anchors(self.slots.iter())
    }
}

fn check_unique_anchors<'a>(slots: impl Iterator<Item = &'a SlotSpec>) -> Result<(), ConfigError> {
    let mut seen = BTreeSet::new();
    for anchor in slots.filter_map(|s| s.anchor) {
        if !seen.insert(anchor) {
            return Err(ConfigError::DuplicateAnchor(anchor));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Workbench
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Members needed before agitation counts.
    pub required_items: u32,
    /// Pulses needed to complete a full batch.
    pub required_agitations: u32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            required_items: 4,
            required_agitations: 3,
        }
    }
}

impl BatchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.required_items == 0 {
            return Err(ConfigError::ZeroRequiredItems);
        }
        if self.required_agitations == 0 {
            return Err(ConfigError::ZeroRequiredAgitations);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkbenchConfig {
    pub slots: SlotAllocatorConfig,
    pub batch: BatchConfig,
    /// Where the substance spawns. `None` uses the first member's pose.
    pub output_pose: Option<Pose>,
    pub advisory_duration: Ticks,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        Self {
            slots: SlotAllocatorConfig::default(),
            batch: BatchConfig::default(),
            output_pose: None,
            advisory_duration: seconds_to_ticks(2.0),
        }
    }
}

impl WorkbenchConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.slots.validate()?;
        self.batch.validate()?;
        if self.batch.required_items as usize > self.slots.slots.len() {
            tracing::warn!(
                required = self.batch.required_items,
                slots = self.slots.slots.len(),
                "batch needs more items than the bench has slots"
            );
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Mixing station
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Where the substance is held, and where the artifact appears.
    pub substance_dock: Pose,
    /// Catalyst pose while the operation runs.
    pub catalyst_in: Pose,
    /// Catalyst pose after the operation.
    pub catalyst_out: Pose,
    /// Stop the player from taking the substance back once loaded.
    pub disable_substance_grab: bool,
    /// Name of the operation triggered on the catalyst's animator.
    pub operation: String,
    /// Force-fail a started operation that never reports completion.
    /// `None` waits forever.
    pub timeout: Option<Ticks>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            substance_dock: Pose::IDENTITY,
            catalyst_in: Pose::at(0.0, 0.3, 0.0),
            catalyst_out: Pose::at(0.3, 0.0, 0.0),
            disable_substance_grab: true,
            operation: "Pour".to_string(),
            timeout: Some(seconds_to_ticks(10.0)),
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.operation.is_empty() {
            return Err(ConfigError::EmptyOperationName);
        }
        if self.timeout == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Basket
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasketConfig {
    /// One display slot per colour that can be collected.
    pub display_slots: BTreeMap<Color, SlotSpec>,
    /// Where the basket body snaps when docked.
    pub dock_pose: Pose,
    /// Repeat takes of one colour inside this window are ignored.
    pub take_debounce: Ticks,
}

impl Default for BasketConfig {
    fn default() -> Self {
        Self {
            display_slots: Color::ALL
                .iter()
                .enumerate()
                .map(|(i, &c)| (c, SlotSpec::new(Pose::at(0.1 * i as f64, 0.1, 0.0))))
                .collect(),
            dock_pose: Pose::IDENTITY,
            take_debounce: seconds_to_ticks(0.1),
        }
    }
}

impl BasketConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unique_anchors(self.display_slots.values())
    }
}

// ---------------------------------------------------------------------------
// Workshop
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkshopConfig {
    /// Ring buffer capacity per event kind.
    pub event_capacity: usize,
}

impl Default for WorkshopConfig {
    fn default() -> Self {
        Self {
            event_capacity: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("slot allocator has no slots")]
    NoSlots,
    #[error("slot allocator accepts no item kinds")]
    NothingAccepted,
    #[error("scale multiplier must be positive, got {0}")]
    InvalidScale(Fixed64),
    #[error("anchor {0:?} is used by more than one slot")]
    DuplicateAnchor(AnchorId),
    #[error("batch requires zero items")]
    ZeroRequiredItems,
    #[error("batch requires zero agitations")]
    ZeroRequiredAgitations,
    #[error("operation name is empty")]
    EmptyOperationName,
    #[error("timeout of zero ticks would fail every operation")]
    ZeroTimeout,
}
