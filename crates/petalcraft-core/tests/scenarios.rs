//! End-to-end scenarios for the petalcraft workshop.
//!
//! Each test drives a full [`Stage`] (bench, mixer, basket, paint area on a
//! headless world) through the same signals a VR host would send.

use petalcraft_core::advisory::Advisory;
use petalcraft_core::batch::BatchState;
use petalcraft_core::config::PipelineConfig;
use petalcraft_core::event::{CraftEvent, EventKind, FaultReason};
use petalcraft_core::fixed::TICKS_PER_SECOND;
use petalcraft_core::host::{Grab, Scene};
use petalcraft_core::id::{Color, HandId, ItemKind};
use petalcraft_core::pipeline::{PipelineOutcome, PipelinePhase};
use petalcraft_core::pose::Pose;
use petalcraft_core::registry::PrefabRole;
use petalcraft_core::test_utils::*;

// ===========================================================================
// Scenario A: basket collection and withdrawal
// ===========================================================================

#[test]
fn scenario_a_collect_and_withdraw() {
    let mut stage = Stage::new();
    let display_prefab = stage
        .shop
        .catalog()
        .prefab(PrefabRole::Display, Color::Red)
        .unwrap();

    stage.basket_flower(Color::Red);
    let ledger = stage.shop.basket(stage.basket).unwrap().ledger();
    assert_eq!(ledger.quantity(Color::Red), 1);
    assert_eq!(stage.world.spawned_from(display_prefab).len(), 1);

    stage.basket_flower(Color::Red);
    let ledger = stage.shop.basket(stage.basket).unwrap().ledger();
    assert_eq!(ledger.quantity(Color::Red), 2);
    assert_eq!(stage.world.spawned_from(display_prefab).len(), 1);

    let hand_pose = Pose::at(0.2, 1.4, 0.5);
    let taken = stage
        .shop
        .take_from_basket(&mut stage.world, stage.basket, Color::Red, HandId(0), hand_pose)
        .expect("one red flower available");
    assert!(stage.world.exists(taken));
    assert!(stage.world.is_held(taken));

    let ledger = stage.shop.basket(stage.basket).unwrap().ledger();
    assert_eq!(ledger.quantity(Color::Red), 1);
    let display = ledger.display(Color::Red).unwrap();
    assert!(stage.world.exists(display));
}

#[test]
fn grabbing_a_display_withdraws_its_colour() {
    let mut stage = Stage::new();
    stage.basket_flower(Color::Yellow);
    let display = stage
        .shop
        .basket(stage.basket)
        .unwrap()
        .ledger()
        .display(Color::Yellow)
        .unwrap();

    let taken = stage.shop.display_grabbed(
        &mut stage.world,
        stage.basket,
        display,
        HandId(1),
        Pose::IDENTITY,
    );
    assert!(taken.is_some());
    assert!(!stage.world.exists(display));
    assert_eq!(stage.logged(EventKind::ItemWithdrawn).len(), 1);
}

// ===========================================================================
// Scenario B: a full batch becomes powder
// ===========================================================================

#[test]
fn scenario_b_batch_to_substance() {
    let mut stage = Stage::new();
    let members: Vec<_> = (0..4).map(|_| stage.bench_flower(Color::Red)).collect();
    assert!(stage.shop.workbench(stage.bench).unwrap().batch().state().is_full());

    let tool = stage.spawn();
    for _ in 0..3 {
        stage.pulse(tool);
    }

    let bench = stage.shop.workbench(stage.bench).unwrap();
    assert_eq!(bench.batch().state(), &BatchState::Empty);
    assert_eq!(bench.slots().occupied_count(), 0);
    assert!(members.iter().all(|&m| !stage.world.exists(m)));

    let powder = stage.logged(EventKind::SubstanceSpawned);
    assert_eq!(powder.len(), 1);
    let CraftEvent::SubstanceSpawned { entity, color, .. } = powder[0] else {
        unreachable!();
    };
    assert_eq!(color, Color::Red);
    assert_eq!(stage.world.pose(entity), Some(Pose::at(0.0, 1.2, 0.3)));
    assert_eq!(stage.logged(EventKind::SlotsReset).len(), 1);
}

// ===========================================================================
// Scenario C: colour mismatch
// ===========================================================================

#[test]
fn scenario_c_mismatch_rejected_with_advisory() {
    let mut stage = Stage::new();
    let red = stage.bench_flower(Color::Red);
    stage.bench_flower(Color::Blue);

    let bench = stage.shop.workbench(stage.bench).unwrap();
    assert_eq!(bench.batch().state().members(), &[red]);
    assert_eq!(bench.batch().state().color(), Some(Color::Red));
    assert_eq!(bench.visible_advisory(), Some(Advisory::ColorMismatch));
    assert!(stage.world.is_panel_visible(Advisory::ColorMismatch));

    // Auto-dismissed after two seconds.
    stage.shop.advance(&mut stage.world, 2 * TICKS_PER_SECOND);
    assert!(!stage.world.is_panel_visible(Advisory::ColorMismatch));
}

// ===========================================================================
// Scenario D: powder + kettle → paint
// ===========================================================================

#[test]
fn scenario_d_pipeline_cycle() {
    let mut stage = Stage::new();
    let powder = stage.spawn();
    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Blue));
    assert_eq!(
        stage.shop.mixer(stage.mixer).unwrap().phase(),
        PipelinePhase::SubstanceLoaded
    );

    let kettle = stage.kettle();
    stage.enter(stage.mixer, kettle, ItemKind::Catalyst);
    assert!(stage.shop.mixer(stage.mixer).unwrap().is_busy());

    let second = stage.kettle();
    stage.enter(stage.mixer, second, ItemKind::Catalyst);
    assert_eq!(stage.logged(EventKind::ProcessingStarted).len(), 1);
    assert_eq!(stage.world.operations().len(), 1);

    let outcome = stage.shop.processing_finished(&mut stage.world, stage.mixer);
    let PipelineOutcome::ArtifactSpawned(paint) = outcome else {
        panic!("expected artifact, got {outcome:?}");
    };
    let paint_prefab = stage
        .shop
        .catalog()
        .prefab(PrefabRole::Artifact, Color::Blue)
        .unwrap();
    assert_eq!(stage.world.entity(paint).unwrap().prefab, Some(paint_prefab));
    assert!(!stage.world.exists(powder));

    let mixer = stage.shop.mixer(stage.mixer).unwrap();
    assert!(!mixer.is_busy());
    assert_eq!(mixer.held_substance(), None);
    assert_eq!(mixer.held_catalyst(), None);

    // A duplicate completion is ignored.
    assert_eq!(
        stage.shop.processing_finished(&mut stage.world, stage.mixer),
        PipelineOutcome::NotBusy
    );
}

#[test]
fn powder_drifting_out_of_mixer_is_grabbable_again() {
    let mut stage = Stage::new();
    let powder = stage.spawn();
    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Red));
    assert!(!stage.world.entity(powder).unwrap().grab_enabled);

    stage.exit(stage.mixer, powder, ItemKind::Powder(Color::Red));

    let mixer = stage.shop.mixer(stage.mixer).unwrap();
    assert_eq!(mixer.phase(), PipelinePhase::Idle);
    assert_eq!(mixer.held_substance(), None);
    let e = stage.world.entity(powder).unwrap();
    assert!(e.grab_enabled);
    assert_eq!(e.kinematic, Some(false));

    stage.world.grab(powder, HandId(0));
    assert_eq!(stage.world.entity(powder).unwrap().held_by, Some(HandId(0)));
}

// ===========================================================================
// Faults
// ===========================================================================

#[test]
fn lost_completion_times_out() {
    let mut stage = Stage::new();
    let powder = stage.spawn();
    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Red));
    let kettle = stage.kettle();
    stage.enter(stage.mixer, kettle, ItemKind::Catalyst);

    let result = stage.shop.advance(&mut stage.world, 599);
    assert_eq!(result.timeouts, 0);
    assert!(stage.shop.mixer(stage.mixer).unwrap().is_busy());

    let result = stage.shop.advance(&mut stage.world, 1);
    assert_eq!(result.timeouts, 1);
    assert_eq!(
        stage.shop.mixer(stage.mixer).unwrap().phase(),
        PipelinePhase::Idle
    );
    assert_eq!(
        stage.logged(EventKind::PipelineFaulted),
        vec![CraftEvent::PipelineFaulted {
            station: stage.mixer,
            reason: FaultReason::TimedOut,
            tick: 600,
        }]
    );

    // The station accepts a fresh substance afterwards.
    let again = stage.spawn();
    stage.enter(stage.mixer, again, ItemKind::Powder(Color::Red));
    assert_eq!(
        stage.shop.mixer(stage.mixer).unwrap().held_substance(),
        Some(again)
    );
}

#[test]
fn missing_artifact_fences_station_until_timeout() {
    let mut stage = Stage::with_catalog(catalog_without(PrefabRole::Artifact, Color::Yellow));
    let powder = stage.spawn();
    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Yellow));
    let kettle = stage.kettle();
    stage.enter(stage.mixer, kettle, ItemKind::Catalyst);

    assert_eq!(
        stage.shop.processing_finished(&mut stage.world, stage.mixer),
        PipelineOutcome::MissingOutput
    );
    assert!(stage.shop.mixer(stage.mixer).unwrap().is_busy());
    assert!(stage.world.exists(powder));

    stage.shop.advance(&mut stage.world, 600);
    assert!(!stage.shop.mixer(stage.mixer).unwrap().is_busy());
    let reasons: Vec<_> = stage
        .logged(EventKind::PipelineFaulted)
        .into_iter()
        .map(|e| match e {
            CraftEvent::PipelineFaulted { reason, .. } => reason,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(reasons, vec![FaultReason::MissingOutput, FaultReason::TimedOut]);
}

#[test]
fn without_timeout_station_stays_busy() {
    let mut stage = Stage::with_configs(
        full_catalog(),
        bench_config(),
        PipelineConfig {
            timeout: None,
            ..Default::default()
        },
    );
    let powder = stage.spawn();
    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Red));
    let kettle = stage.kettle();
    stage.enter(stage.mixer, kettle, ItemKind::Catalyst);

    stage.shop.advance(&mut stage.world, 100 * TICKS_PER_SECOND);
    assert!(stage.shop.mixer(stage.mixer).unwrap().is_busy());
}

// ===========================================================================
// Cooldown and pickup
// ===========================================================================

#[test]
fn picked_up_flower_cannot_bounce_back_immediately() {
    let mut stage = Stage::new();
    let f = stage.bench_flower(Color::Red);
    assert!(stage.shop.picked_up(&mut stage.world, f));

    stage.enter(stage.bench, f, ItemKind::Flower(Color::Red));
    assert!(!stage.shop.workbench(stage.bench).unwrap().slots().is_tracked(f));

    stage.shop.advance(&mut stage.world, 15);
    stage.enter(stage.bench, f, ItemKind::Flower(Color::Red));
    assert!(stage.shop.workbench(stage.bench).unwrap().slots().is_tracked(f));
}

#[test]
fn pickup_of_unknown_entity_releases_nothing() {
    let mut stage = Stage::new();
    let loose = stage.spawn();
    assert!(!stage.shop.picked_up(&mut stage.world, loose));
}

// ===========================================================================
// Full session
// ===========================================================================

#[test]
fn flower_to_paint_to_basket() {
    let mut stage = Stage::new();
    stage.dock_basket();
    assert!(stage.shop.basket(stage.basket).unwrap().ledger().is_locked());

    // Locked basket refuses collection.
    let refused = stage.basket_flower(Color::Yellow);
    assert!(stage.world.exists(refused));
    stage
        .shop
        .set_basket_locked(&mut stage.world, stage.basket, false);

    for _ in 0..4 {
        stage.basket_flower(Color::Yellow);
    }
    let mut flowers = Vec::new();
    for _ in 0..4 {
        let f = stage
            .shop
            .take_from_basket(&mut stage.world, stage.basket, Color::Yellow, HandId(0), Pose::IDENTITY)
            .unwrap();
        stage.shop.advance(&mut stage.world, 6);
        flowers.push(f);
    }
    assert_eq!(stage.shop.basket(stage.basket).unwrap().ledger().total(), 0);

    for &f in &flowers {
        stage.enter(stage.bench, f, ItemKind::Flower(Color::Yellow));
    }
    let tool = stage.spawn();
    for _ in 0..3 {
        stage.pulse(tool);
    }
    let CraftEvent::SubstanceSpawned { entity: powder, .. } = stage.logged(EventKind::SubstanceSpawned)[0]
    else {
        unreachable!();
    };

    stage.enter(stage.mixer, powder, ItemKind::Powder(Color::Yellow));
    let kettle = stage.kettle();
    stage.enter(stage.mixer, kettle, ItemKind::Catalyst);
    stage.shop.advance(&mut stage.world, 3 * TICKS_PER_SECOND);
    let outcome = stage.shop.processing_finished(&mut stage.world, stage.mixer);
    assert!(matches!(outcome, PipelineOutcome::ArtifactSpawned(_)));
    assert_eq!(stage.logged(EventKind::ArtifactSpawned).len(), 1);
}

#[test]
fn identical_signal_streams_hash_identically() {
    fn run() -> u64 {
        let mut stage = Stage::new();
        for _ in 0..3 {
            stage.bench_flower(Color::Blue);
        }
        stage.basket_flower(Color::Red);
        stage.shop.advance(&mut stage.world, 30);
        stage.shop.state_hash()
    }
    assert_eq!(run(), run());
}
