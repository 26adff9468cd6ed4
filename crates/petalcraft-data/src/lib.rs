//! Data-driven workshop layouts.
//!
//! A workshop is described by a single `workshop.{ron,toml,json}` file:
//! prefab names, `(role, colour) -> prefab` mappings, and the stations with
//! their poses and rules. [`load_workshop`] finds and parses the file and
//! resolves every name through a [`CatalogBuilder`], producing a
//! [`WorkshopData`] that can instantiate a [`Workshop`].

pub mod loader;
pub mod schema;

pub use loader::DataLoadError;

use loader::{check_duplicate, deserialize_file, require_data_file, resolve_name};
use petalcraft_core::config::{
    BasketConfig, BatchConfig, PipelineConfig, SlotAllocatorConfig, SlotSpec, WorkbenchConfig, WorkshopConfig,
};
use petalcraft_core::fixed::{f64_to_fixed64, seconds_to_ticks};
use petalcraft_core::id::{EntityId, ItemKind, PrefabId, StationId};
use petalcraft_core::registry::{Catalog, CatalogBuilder};
use petalcraft_core::workshop::Workshop;
use schema::{BasketData, MixerData, WorkbenchData, WorkshopFile};
use std::collections::HashMap;
use std::path::Path;

/// Base name of the layout file.
pub const WORKSHOP_FILE: &str = "workshop";

/// A resolved, validated layout.
#[derive(Debug, Clone)]
pub struct WorkshopData {
    pub catalog: Catalog,
    pub config: WorkshopConfig,
    pub workbenches: Vec<WorkbenchConfig>,
    pub mixers: Vec<PipelineConfig>,
    pub baskets: Vec<BasketConfig>,
    pub paint_areas: u32,
}

/// Station ids of an instantiated layout, in file order.
#[derive(Debug)]
pub struct BuiltWorkshop {
    pub workshop: Workshop,
    pub workbenches: Vec<StationId>,
    pub mixers: Vec<StationId>,
    pub baskets: Vec<StationId>,
    pub paint_areas: Vec<StationId>,
}

/// Find, parse and resolve the layout file in `dir`.
pub fn load_workshop(dir: &Path) -> Result<WorkshopData, DataLoadError> {
    let path = require_data_file(dir, WORKSHOP_FILE)?;
    let file: WorkshopFile = deserialize_file(&path)?;
    let data = resolve(file, &path)?;
    tracing::info!(
        file = %path.display(),
        prefabs = data.catalog.prefab_count(),
        workbenches = data.workbenches.len(),
        mixers = data.mixers.len(),
        baskets = data.baskets.len(),
        "workshop layout loaded"
    );
    Ok(data)
}

/// Resolve a parsed file. `path` is only used in error messages.
pub fn resolve(file: WorkshopFile, path: &Path) -> Result<WorkshopData, DataLoadError> {
    let mut builder = CatalogBuilder::new();
    let mut names: HashMap<String, PrefabId> = HashMap::new();
    for name in &file.prefabs {
        check_duplicate(&names, name, path)?;
        names.insert(name.clone(), builder.register_prefab(name));
    }
    for mapping in &file.mappings {
        let prefab = *resolve_name(&names, &mapping.prefab, path, "prefab")?;
        builder.map(mapping.role.into(), mapping.color.into(), prefab);
    }
    let catalog = builder.build()?;

    let config = WorkshopConfig {
        event_capacity: file.event_capacity.unwrap_or(WorkshopConfig::default().event_capacity),
    };

    let workbenches = file
        .workbenches
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let cfg = workbench_config(data);
            cfg.validate().map_err(|source| DataLoadError::Config {
                station: "workbench",
                index,
                source,
            })?;
            Ok(cfg)
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let mixers = file
        .mixers
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let cfg = mixer_config(data);
            cfg.validate().map_err(|source| DataLoadError::Config {
                station: "mixer",
                index,
                source,
            })?;
            Ok(cfg)
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    let baskets = file
        .baskets
        .iter()
        .enumerate()
        .map(|(index, data)| {
            let cfg = basket_config(data);
            cfg.validate().map_err(|source| DataLoadError::Config {
                station: "basket",
                index,
                source,
            })?;
            Ok(cfg)
        })
        .collect::<Result<Vec<_>, DataLoadError>>()?;

    Ok(WorkshopData {
        catalog,
        config,
        workbenches,
        mixers,
        baskets,
        paint_areas: file.paint_areas,
    })
}

impl WorkshopData {
    /// Create the workshop and its stations. Each basket needs the host
    /// entity of its body, in file order.
    pub fn build(self, basket_bodies: &[EntityId]) -> Result<BuiltWorkshop, DataLoadError> {
        if basket_bodies.len() != self.baskets.len() {
            return Err(DataLoadError::BasketBodies {
                expected: self.baskets.len(),
                got: basket_bodies.len(),
            });
        }

        let mut workshop = Workshop::with_config(self.catalog, self.config);

        let mut workbenches = Vec::with_capacity(self.workbenches.len());
        for (index, cfg) in self.workbenches.into_iter().enumerate() {
            let id = workshop.add_workbench(cfg).map_err(|source| DataLoadError::Config {
                station: "workbench",
                index,
                source,
            })?;
            workbenches.push(id);
        }
        let mut mixers = Vec::with_capacity(self.mixers.len());
        for (index, cfg) in self.mixers.into_iter().enumerate() {
            let id = workshop.add_mixer(cfg).map_err(|source| DataLoadError::Config {
                station: "mixer",
                index,
                source,
            })?;
            mixers.push(id);
        }
        let mut baskets = Vec::with_capacity(self.baskets.len());
        for (index, (cfg, &body)) in self.baskets.into_iter().zip(basket_bodies).enumerate() {
            let id = workshop.add_basket(body, cfg).map_err(|source| DataLoadError::Config {
                station: "basket",
                index,
                source,
            })?;
            baskets.push(id);
        }
        let paint_areas = (0..self.paint_areas).map(|_| workshop.add_paint_area()).collect();

        Ok(BuiltWorkshop {
            workshop,
            workbenches,
            mixers,
            baskets,
            paint_areas,
        })
    }
}

// ===========================================================================
// Station conversion
// ===========================================================================

fn workbench_config(data: &WorkbenchData) -> WorkbenchConfig {
    let stock = WorkbenchConfig::default();
    let stock_slots = stock.slots;

    let slots = SlotAllocatorConfig {
        slots: if data.slots.is_empty() {
            stock_slots.slots
        } else {
            data.slots
                .iter()
                .map(|s| SlotSpec {
                    pose: s.pose.to_pose(),
                    anchor: s.anchor_id(),
                })
                .collect()
        },
        accepted: match &data.accepted {
            Some(colors) => colors.iter().map(|&c| ItemKind::Flower(c.into())).collect(),
            None => stock_slots.accepted,
        },
        scale_multiplier: if data.keep_scale {
            None
        } else {
            data.scale_multiplier
                .map(f64_to_fixed64)
                .or(stock_slots.scale_multiplier)
        },
        cooldown: data
            .cooldown_seconds
            .map(seconds_to_ticks)
            .unwrap_or(stock_slots.cooldown),
    };

    WorkbenchConfig {
        slots,
        batch: BatchConfig {
            required_items: data.required_items.unwrap_or(stock.batch.required_items),
            required_agitations: data
                .required_agitations
                .unwrap_or(stock.batch.required_agitations),
        },
        output_pose: data.output.map(|p| p.to_pose()),
        advisory_duration: data
            .advisory_seconds
            .map(seconds_to_ticks)
            .unwrap_or(stock.advisory_duration),
    }
}

fn mixer_config(data: &MixerData) -> PipelineConfig {
    let stock = PipelineConfig::default();
    PipelineConfig {
        substance_dock: data.substance_dock.to_pose(),
        catalyst_in: data.catalyst_in.to_pose(),
        catalyst_out: data.catalyst_out.to_pose(),
        disable_substance_grab: !data.keep_substance_grabbable,
        operation: data.operation.clone().unwrap_or(stock.operation),
        timeout: if data.no_timeout {
            None
        } else {
            data.timeout_seconds.map(seconds_to_ticks).or(stock.timeout)
        },
    }
}

fn basket_config(data: &BasketData) -> BasketConfig {
    let stock = BasketConfig::default();
    BasketConfig {
        display_slots: if data.displays.is_empty() {
            stock.display_slots
        } else {
            data.displays
                .iter()
                .map(|d| {
                    let slot = SlotSpec {
                        pose: d.pose.to_pose(),
                        anchor: d.anchor.map(petalcraft_core::id::AnchorId),
                    };
                    (d.color.into(), slot)
                })
                .collect()
        },
        dock_pose: data.dock.map(|p| p.to_pose()).unwrap_or(stock.dock_pose),
        take_debounce: data
            .take_debounce_seconds
            .map(seconds_to_ticks)
            .unwrap_or(stock.take_debounce),
    }
}
