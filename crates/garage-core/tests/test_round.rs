//! Integration tests for whole rounds on hand-drawn garages.
//!
//! Guards are parked (very long patrol interval) unless a test needs them to
//! move, so every sighting is deterministic.

use std::time::Duration;

use garage_core::prelude::*;
use garage_logic::characters::{CharacterEvent, CharacterKind, MoveState};
use garage_logic::config::Tuning;
use garage_logic::garage::Garage;
use garage_logic::grid::{Cell, Direction, FloorGrid, FloorPos, GridPos, Item};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

// ── Helpers ────────────────────────────────────────────────────────────

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn parked_guards() -> Tuning {
    Tuning {
        guard_step: Duration::from_secs(3600),
        ..Tuning::default()
    }
}

fn round(floors: &[&str], starts: &[FloorPos], roster: Vec<CharacterKind>, tuning: Tuning) -> GarageEngine {
    let mut garage = Garage::from_floors(floors.iter().map(|f| FloorGrid::from_ascii(f)).collect());
    garage.start_positions = starts.to_vec();
    let config = GarageConfig {
        roster,
        tuning,
        seed: Some(1),
        ..GarageConfig::default()
    };
    match GarageEngine::with_garage(config, garage) {
        Ok(engine) => engine,
        Err(e) => panic!("round setup failed: {e}"),
    }
}

/// Request a step, then let it finish.
fn walk(engine: &mut GarageEngine, dir: Direction) {
    engine.update(Duration::ZERO, Intent::go(dir));
    engine.update(ms(250), Intent::idle());
}

fn character(engine: &GarageEngine, slot: usize) -> garage_core::components::Character {
    match engine.character(slot) {
        Some(c) => c,
        None => panic!("no character in slot {slot}"),
    }
}

// ── Catch ──────────────────────────────────────────────────────────────

const GUARDED: &str = "
    #########
    #.A.....#
    #.......#
    #....g..#
    #########
";

#[test]
fn caught_character_pays_penalty_resets_and_drops_item() {
    let mut engine = round(
        &[GUARDED],
        &[FloorPos::new(0, 1, 1)],
        vec![CharacterKind::George],
        parked_guards(),
    );

    walk(&mut engine, Direction::Right);
    assert!(character(&engine, 0).carrying());
    walk(&mut engine, Direction::Down);
    walk(&mut engine, Direction::Right);
    walk(&mut engine, Direction::Right);
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 2, 4));
    engine.drain_events();

    // Directly above the guard: close-range detection.
    engine.update(Duration::ZERO, Intent::go(Direction::Right));

    let george = character(&engine, 0);
    assert_eq!(george.at, FloorPos::new(0, 1, 1));
    assert_eq!(george.state(), MoveState::Frozen);
    assert!(!george.carrying());
    assert_eq!(engine.time_left(), Duration::from_secs(169));

    let dropped = engine.garage().pickup_location(Item::AcUnit);
    let Some(at) = dropped else {
        panic!("AC unit was not dropped back on the floor");
    };
    assert_eq!(at.floor, 0);
    assert_eq!(engine.garage().cell_at(at), Some(Cell::Pickup(Item::AcUnit)));

    let events = engine.drain_events();
    assert!(events.contains(&EngineEvent::Caught {
        slot: 0,
        guard_at: FloorPos::new(0, 3, 5),
        penalty_ms: 10_000,
    }));
    assert!(events.contains(&EngineEvent::ItemDropped {
        item: Item::AcUnit,
        at: Some(at),
    }));

    // Frozen: input is ignored until the catch freeze wears off.
    walk(&mut engine, Direction::Down);
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 1, 1));
    let freeze = engine.tuning().catch_freeze;
    engine.update(freeze, Intent::idle());
    assert_eq!(character(&engine, 0).state(), MoveState::Idle);
    walk(&mut engine, Direction::Down);
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 2, 1));
}

#[test]
fn cone_sighting_catches_at_range() {
    let floor = "
        #########
        #g......#
        #########
    ";
    let mut engine = round(
        &[floor],
        &[FloorPos::new(0, 1, 7)],
        vec![CharacterKind::Jerry],
        parked_guards(),
    );
    engine.update(Duration::ZERO, Intent::idle());
    assert_eq!(character(&engine, 0).state(), MoveState::Unstarted);

    // Five cells ahead of the guard is out of range; four is not.
    walk(&mut engine, Direction::Left);
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 1, 6));
    assert_eq!(character(&engine, 0).state(), MoveState::Idle);

    engine.update(Duration::ZERO, Intent::go(Direction::Left));
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 1, 7));
    assert_eq!(character(&engine, 0).state(), MoveState::Frozen);
}

#[test]
fn long_update_checks_sightings_after_each_guard_step() {
    let floor = "
        ##############
        #g...........#
        ##############
    ";
    let tuning = Tuning {
        guard_step: ms(100),
        ..Tuning::default()
    };
    let mut engine = round(&[floor], &[FloorPos::new(0, 1, 6)], vec![CharacterKind::Jerry], tuning);
    engine.update(Duration::ZERO, Intent::idle());
    assert_eq!(character(&engine, 0).state(), MoveState::Unstarted);

    // Eleven patrol steps in one update: the guard ends up at the far wall
    // with the character behind it, but spotted them after its first step.
    engine.update(ms(1100), Intent::idle());

    let guards = engine.guards();
    assert_eq!(guards[0].pos, GridPos::new(1, 12));
    assert_eq!(character(&engine, 0).state(), MoveState::Frozen);
    assert!(engine.drain_events().contains(&EngineEvent::Caught {
        slot: 0,
        guard_at: FloorPos::new(0, 1, 2),
        penalty_ms: 10_000,
    }));
    assert_eq!(engine.time_left(), ms(180_000 - 1_100 - 10_000));
}

// ── Winning ────────────────────────────────────────────────────────────

#[test]
fn round_won_when_everyone_reaches_the_car() {
    let floor = "
        #######
        #.KC..#
        #.....#
        #######
    ";
    let mut engine = round(
        &[floor],
        &[FloorPos::new(0, 2, 3), FloorPos::new(0, 1, 1)],
        vec![CharacterKind::Jerry, CharacterKind::Kramer],
        parked_guards(),
    );

    walk(&mut engine, Direction::Up);
    assert!(character(&engine, 0).at_goal());
    assert_eq!(engine.active_slot(), Some(1));
    assert_eq!(engine.outcome(), RoundOutcome::InProgress);

    walk(&mut engine, Direction::Right);
    assert!(character(&engine, 1).has(Item::Keys));
    assert_eq!(engine.garage().cell_at(FloorPos::new(0, 1, 2)), Some(Cell::Floor));
    walk(&mut engine, Direction::Right);

    assert_eq!(engine.outcome(), RoundOutcome::Won);
    assert_eq!(engine.pending_timers(), 0);
    let events = engine.drain_events();
    assert!(events.contains(&EngineEvent::ReachedGoal { slot: 0 }));
    assert!(events.contains(&EngineEvent::ReachedGoal { slot: 1 }));
    assert_eq!(events.last(), Some(&EngineEvent::RoundOver(RoundOutcome::Won)));
}

#[test]
fn car_stays_shut_without_prerequisite() {
    let floor = "
        ######
        #.C..#
        ######
    ";
    let mut engine = round(
        &[floor],
        &[FloorPos::new(0, 1, 1)],
        vec![CharacterKind::George],
        parked_guards(),
    );
    walk(&mut engine, Direction::Right);
    assert_eq!(character(&engine, 0).at, FloorPos::new(0, 1, 1));
    assert_eq!(character(&engine, 0).state(), MoveState::Unstarted);
    assert_eq!(engine.outcome(), RoundOutcome::InProgress);
}

#[test]
fn finished_character_cannot_be_selected() {
    let floor = "
        ######
        #C...#
        ######
    ";
    let mut engine = round(
        &[floor],
        &[FloorPos::new(0, 1, 2), FloorPos::new(0, 1, 4)],
        vec![CharacterKind::Jerry, CharacterKind::Elaine],
        parked_guards(),
    );
    walk(&mut engine, Direction::Left);
    assert_eq!(engine.active_slot(), Some(1));
    assert!(matches!(engine.select_character(0), Ok(false)));
    assert_eq!(engine.active_slot(), Some(1));
}

// ── Stairs ─────────────────────────────────────────────────────────────

#[test]
fn stairs_carry_character_between_floors() {
    let ground = "
        ######
        #S...#
        ######
    ";
    let top = "
        ######
        #S.C.#
        ######
    ";
    let mut engine = round(
        &[ground, top],
        &[FloorPos::new(0, 1, 1)],
        vec![CharacterKind::Jerry],
        parked_guards(),
    );

    assert!(!engine.use_stairs(false));
    assert!(engine.use_stairs(true));
    assert_eq!(character(&engine, 0).at, FloorPos::new(1, 1, 1));
    assert!(!engine.use_stairs(true));

    walk(&mut engine, Direction::Right);
    walk(&mut engine, Direction::Right);
    assert_eq!(engine.outcome(), RoundOutcome::Won);
}

#[test]
fn stairs_ignored_mid_step() {
    let floor = "
        ######
        #.S..#
        ######
    ";
    let mut engine = round(
        &[floor, floor],
        &[FloorPos::new(0, 1, 1)],
        vec![CharacterKind::Jerry],
        parked_guards(),
    );
    engine.update(Duration::ZERO, Intent::go(Direction::Right));
    assert!(!engine.use_stairs(true));
    engine.update(ms(150), Intent::idle());
    assert!(engine.use_stairs(true));
}

// ── Mechanics in a round ───────────────────────────────────────────────

#[test]
fn meter_strike_out_loses_round() {
    let floor = "
        #####
        #...#
        #####
    ";
    let tuning = Tuning {
        meter_max: 10.0,
        meter_fill_per_sec: 100.0,
        meter_freeze: ms(100),
        ..parked_guards()
    };
    let mut engine = round(&[floor], &[FloorPos::new(0, 1, 1)], vec![CharacterKind::Elaine], tuning);

    for _ in 0..50 {
        engine.update(ms(100), Intent::idle());
        if engine.outcome().is_over() {
            break;
        }
    }
    assert_eq!(
        engine.outcome(),
        RoundOutcome::Lost(LossReason::StruckOut(CharacterKind::Elaine))
    );
    let overflows = engine
        .drain_events()
        .into_iter()
        .filter(|e| {
            matches!(
                e,
                EngineEvent::Character {
                    event: CharacterEvent::MeterOverflow { .. },
                    ..
                }
            )
        })
        .count();
    assert_eq!(overflows, 3);
}

#[test]
fn bathroom_resets_meter_in_round() {
    let floor = "
        #####
        #.B.#
        #####
    ";
    let mut engine = round(
        &[floor],
        &[FloorPos::new(0, 1, 1)],
        vec![CharacterKind::Elaine],
        parked_guards(),
    );
    engine.update(ms(1000), Intent::idle());
    assert!(character(&engine, 0).meter() > 8.0);
    walk(&mut engine, Direction::Right);
    assert!(character(&engine, 0).meter() < 3.0);
}

// ── Generated rounds ───────────────────────────────────────────────────

#[test]
fn random_play_keeps_invariants() {
    let config = GarageConfig {
        seed: Some(21),
        ..GarageConfig::default()
    };
    let mut engine = match GarageEngine::new(config) {
        Ok(engine) => engine,
        Err(e) => panic!("setup failed: {e}"),
    };
    let mut input = StdRng::seed_from_u64(21);
    let mut last_clock = engine.time_left();

    for frame in 0..3750 {
        if frame % 200 == 0 {
            let slot = input.gen_range(0..engine.character_count());
            let _ = engine.select_character(slot);
        }
        if input.gen_bool(0.05) {
            engine.use_stairs(input.gen_bool(0.5));
        }
        let dir = Direction::ALL[input.gen_range(0..4)];
        engine.update(ms(16), Intent::go(dir));

        assert!(engine.time_left() <= last_clock);
        last_clock = engine.time_left();
        for slot in 0..engine.character_count() {
            let c = character(&engine, slot);
            assert!(engine.garage().is_walkable(c.at), "slot {slot} inside a wall at {:?}", c.at);
        }
        for guard in engine.guards() {
            assert!(engine.garage().is_walkable(FloorPos {
                floor: guard.floor,
                pos: guard.pos,
            }));
        }
        if engine.outcome().is_over() {
            break;
        }
    }
}
