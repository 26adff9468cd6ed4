//! Prefab catalog: which prefab to spawn for each role and colour.
//!
//! Replaces per-colour prefab fields and switch dispatch with a single
//! mapping table, frozen at startup.

use crate::id::{Color, PrefabId};
use std::collections::{BTreeMap, HashMap};

/// A prefab definition in the catalog.
#[derive(Debug, Clone)]
pub struct PrefabDef {
    pub name: String,
}

/// What a mapped prefab is spawned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrefabRole {
    /// Full-fidelity grabbable item handed out on withdrawal.
    Flower,
    /// Display-only representative shown in a container slot.
    Display,
    /// Intermediate substance spawned by a completed batch.
    Substance,
    /// Final artifact spawned by the transformation pipeline.
    Artifact,
}

/// Builder for constructing an immutable [`Catalog`].
/// Two-phase lifecycle: registration -> finalization.
#[derive(Debug, Default)]
pub struct CatalogBuilder {
    prefabs: Vec<PrefabDef>,
    prefab_name_to_id: HashMap<String, PrefabId>,
    mappings: BTreeMap<(PrefabRole, Color), PrefabId>,
    duplicates: Vec<String>,
}

impl CatalogBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a prefab by name. Returns its ID. Registering the same name
    /// twice is reported by [`CatalogBuilder::build`].
    pub fn register_prefab(&mut self, name: &str) -> PrefabId {
        let id = PrefabId(self.prefabs.len() as u32);
        self.prefabs.push(PrefabDef {
            name: name.to_string(),
        });
        if self.prefab_name_to_id.insert(name.to_string(), id).is_some() {
            self.duplicates.push(name.to_string());
        }
        id
    }

    /// Map a role and colour to a prefab. Later mappings replace earlier ones.
    pub fn map(&mut self, role: PrefabRole, color: Color, prefab: PrefabId) -> &mut Self {
        self.mappings.insert((role, color), prefab);
        self
    }

    /// Map a role and colour to a prefab registered under `name`.
    pub fn map_by_name(
        &mut self,
        role: PrefabRole,
        color: Color,
        name: &str,
    ) -> Result<&mut Self, CatalogError> {
        let id = self
            .prefab_id(name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))?;
        Ok(self.map(role, color, id))
    }

    /// Lookup prefab ID by name.
    pub fn prefab_id(&self, name: &str) -> Option<PrefabId> {
        self.prefab_name_to_id.get(name).copied()
    }

    /// Finalize and build the immutable catalog.
    pub fn build(self) -> Result<Catalog, CatalogError> {
        if let Some(name) = self.duplicates.into_iter().next() {
            return Err(CatalogError::DuplicateName(name));
        }
        for (&(role, color), prefab) in &self.mappings {
            if prefab.0 as usize >= self.prefabs.len() {
                return Err(CatalogError::InvalidPrefabRef {
                    role,
                    color,
                    prefab: *prefab,
                });
            }
        }

        Ok(Catalog {
            prefabs: self.prefabs,
            prefab_name_to_id: self.prefab_name_to_id,
            mappings: self.mappings,
        })
    }
}

/// Immutable catalog. Frozen after build().
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    prefabs: Vec<PrefabDef>,
    prefab_name_to_id: HashMap<String, PrefabId>,
    mappings: BTreeMap<(PrefabRole, Color), PrefabId>,
}

impl Catalog {
    /// The prefab mapped for a role and colour, if configured.
    pub fn prefab(&self, role: PrefabRole, color: Color) -> Option<PrefabId> {
        self.mappings.get(&(role, color)).copied()
    }

    pub fn get_prefab(&self, id: PrefabId) -> Option<&PrefabDef> {
        self.prefabs.get(id.0 as usize)
    }

    pub fn prefab_id(&self, name: &str) -> Option<PrefabId> {
        self.prefab_name_to_id.get(name).copied()
    }

    pub fn prefab_count(&self) -> usize {
        self.prefabs.len()
    }

    pub fn mapping_count(&self) -> usize {
        self.mappings.len()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate prefab name: {0}")]
    DuplicateName(String),
    #[error("invalid prefab reference {prefab:?} for {role:?}/{color:?}")]
    InvalidPrefabRef {
        role: PrefabRole,
        color: Color,
        prefab: PrefabId,
    },
}
