//! Petalcraft Core -- the crafting coordination engine.
//!
//! This crate provides the cooperating state machines behind the flower
//! workshop: placement slots, homogeneous batch accumulation, the two-stage
//! transformation pipeline, and the per-colour inventory of the basket. It
//! never touches a scene graph or physics world directly; everything flows
//! through the [`host::Host`] collaborator traits.
//!
//! # Signal Flow
//!
//! The host forwards four kinds of signal into a [`workshop::Workshop`]:
//!
//! 1. **Zone reports** -- an entity entered or left a station's volume
//!    ([`workshop::Workshop::dispatch`]).
//! 2. **Pickups** -- a watched entity was grabbed
//!    ([`workshop::Workshop::picked_up`]).
//! 3. **Completions** -- a timed operation fired on a catalyst finished
//!    ([`workshop::Workshop::processing_finished`]).
//! 4. **Time** -- ticks elapsed ([`workshop::Workshop::advance`]), which
//!    expires advisories, cooldowns, debounces and pipeline timeouts.
//!
//! Each entry point runs to completion synchronously and ends by delivering
//! buffered events.
//!
//! ```rust,ignore
//! let mut shop = Workshop::new(catalog);
//! let bench = shop.add_workbench(WorkbenchConfig::default())?;
//! shop.dispatch(&mut host, ZoneEvent::enter(bench, flower, ItemKind::Flower(Color::Red)));
//! ```
//!
//! # Key Types
//!
//! - [`workshop::Workshop`] -- Top-level controller and station storage.
//! - [`slots::SlotAllocator`] -- Fixed placement slots with pickup cooldown.
//! - [`batch::BatchAccumulator`] -- Colour-homogeneous batch with agitation gating.
//! - [`pipeline::TransformationPipeline`] -- Substance + catalyst → artifact,
//!   busy-locked across an externally timed operation.
//! - [`inventory::InventoryLedger`] -- Per-colour counts with display stand-ins.
//! - [`registry::Catalog`] -- Immutable prefab mapping (frozen at startup).
//! - [`event::EventBus`] -- Typed event bus with buffered delivery.
//! - [`fixed::Fixed64`] -- Q32.32 fixed-point type for deterministic poses.

pub mod advisory;
pub mod basket;
pub mod batch;
pub mod config;
pub mod event;
pub mod fixed;
pub mod headless;
pub mod host;
pub mod id;
pub mod inventory;
pub mod pipeline;
pub mod pose;
pub mod registry;
pub mod session;
pub mod sim;
pub mod slots;
pub mod station;
pub mod workbench;
pub mod workshop;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
