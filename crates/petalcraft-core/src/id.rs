use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a placeable entity in the host scene.
    pub struct EntityId;

    /// Identifies a station (workbench, mixing station, basket) in a workshop.
    pub struct StationId;
}

/// Identifies a prefab in the catalog. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefabId(pub u32);

/// Identifies a host-side frame that entities can be parented to (slot frames,
/// display slots).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnchorId(pub u32);

/// Identifies an interactor (hand/controller) on the host side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HandId(pub u32);

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// The closed colour set shared by flowers, powders and paints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Yellow,
    Blue,
}

impl Color {
    /// All colours in declaration order.
    pub const ALL: [Color; 3] = [Color::Red, Color::Yellow, Color::Blue];
}

/// The category tag carried by every zone event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    /// A collectible raw item.
    Flower(Color),
    /// The intermediate substance produced by a completed batch.
    Powder(Color),
    /// The finished artifact.
    Paint(Color),
    /// The secondary object required by the transformation (the kettle).
    Catalyst,
    /// The agitation tool (the shovel).
    Tool,
    /// The player rig.
    Player,
    Other,
}

impl ItemKind {
    /// The colour of a flower, if this is one.
    pub fn flower_color(self) -> Option<Color> {
        match self {
            ItemKind::Flower(c) => Some(c),
            _ => None,
        }
    }
}
