//! Parking Garage Headless Harness
//!
//! Validates garage generation, guard vision, character mechanics and whole
//! rounds without a renderer. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p garage-simtest
//!   cargo run -p garage-simtest -- --verbose --seeds 50
//!   cargo run -p garage-simtest -- --config garage.json --dump round.json

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::{debug, info};

use garage_core::prelude::*;
use garage_logic::characters::{Character, CharacterKind, CharacterTimer, Mechanic, MoveState};
use garage_logic::config::{validate_config, Tuning};
use garage_logic::garage::{generate_garage, Garage};
use garage_logic::grid::{Cell, Direction, FloorGrid, FloorPos, GridPos, Item};
use garage_logic::guard::{CloseRange, SecurityGuard, VisionCone};
use garage_logic::scheduler::TimerQueue;
use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless parking garage harness", long_about = None)]
struct Args {
    /// Print every check, not just failures
    #[arg(short, long, default_value_t = false)]
    verbose: bool,

    /// Number of seeds for the generation sweep and autoplay rounds
    #[arg(short, long, default_value_t = 25)]
    seeds: u64,

    /// JSON garage config (missing fields use defaults)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write the final snapshot of the first autoplay round here
    #[arg(short, long)]
    dump: Option<PathBuf>,
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    println!("=== Parking Garage Harness ===\n");

    let mut results = Vec::new();

    // 1. Config
    let config = match load_config(&args, &mut results) {
        Some(config) => config,
        None => {
            report(&results, args.verbose);
            std::process::exit(1);
        }
    };

    // 2. Generation sweep
    results.extend(validate_generation(&config, args.seeds, args.verbose));

    // 3. Guard vision
    results.extend(validate_vision(args.verbose));

    // 4. Character mechanics
    results.extend(validate_mechanics(&config.tuning, args.verbose));

    // 5. Autoplay rounds
    results.extend(validate_autoplay(&config, args.seeds, args.dump.as_ref(), args.verbose));

    if !report(&results, args.verbose) {
        std::process::exit(1);
    }
}

/// Print the summary; returns whether everything passed.
fn report(results: &[TestResult], verbose: bool) -> bool {
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );
    failed == 0
}

// ── 1. Config ───────────────────────────────────────────────────────────

fn load_config(args: &Args, results: &mut Vec<TestResult>) -> Option<GarageConfig> {
    println!("--- Config ---");

    let config = match &args.config {
        Some(path) => {
            let text = match std::fs::read_to_string(path) {
                Ok(text) => text,
                Err(e) => {
                    results.push(TestResult {
                        name: "config_read".into(),
                        passed: false,
                        detail: format!("{}: {}", path.display(), e),
                    });
                    return None;
                }
            };
            match serde_json::from_str::<GarageConfig>(&text) {
                Ok(config) => config,
                Err(e) => {
                    results.push(TestResult {
                        name: "config_parse".into(),
                        passed: false,
                        detail: format!("JSON parse error: {}", e),
                    });
                    return None;
                }
            }
        }
        None => GarageConfig::default(),
    };

    let errors = validate_config(&config);
    results.push(TestResult {
        name: "config_valid".into(),
        passed: errors.is_empty(),
        detail: if errors.is_empty() {
            format!(
                "{} floors of {}x{}, {} characters",
                config.floors,
                config.cols,
                config.rows,
                config.roster.len()
            )
        } else {
            errors
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join("; ")
        },
    });

    if errors.is_empty() {
        Some(config)
    } else {
        None
    }
}

// ── 2. Generation Sweep ─────────────────────────────────────────────────

fn validate_generation(config: &GarageConfig, seeds: u64, verbose: bool) -> Vec<TestResult> {
    println!("--- Generation Sweep ---");
    let mut results = Vec::new();
    let params = config.garage_params();

    let mut disconnected = Vec::new();
    let mut bad_stairs = Vec::new();
    let mut bad_goal = Vec::new();
    let mut missing_items = Vec::new();
    let mut unreachable = Vec::new();
    let mut shortfalls = 0;

    for seed in 0..seeds {
        let mut rng = StdRng::seed_from_u64(seed);
        let garage = generate_garage(&params, &mut rng);
        shortfalls += garage.shortfalls.len();

        if !garage.floors().iter().all(FloorGrid::is_connected) {
            disconnected.push(seed);
        }

        let stairs_everywhere = garage.stairs.len() == params.stair_count
            && garage
                .floors()
                .iter()
                .all(|f| garage.stairs.iter().all(|s| f.cell_at(*s) == Some(Cell::Stairs)));
        if !stairs_everywhere {
            bad_stairs.push(seed);
        }

        let goals: usize = garage
            .floors()
            .iter()
            .map(|f| f.positions_of(Cell::Goal).len())
            .sum();
        if goals != 1 || garage.goal.map(|g| g.floor) != Some(garage.top_floor()) {
            bad_goal.push(seed);
        }

        for item in &params.items {
            let placed = garage
                .pickup_location(*item)
                .filter(|at| Some(at.floor) != garage.goal.map(|g| g.floor));
            if placed.is_none() {
                missing_items.push((seed, *item));
            }
        }

        // Every start must reach every stair on floor 0.
        let starts_ok = garage.start_positions.iter().all(|start| {
            garage
                .stairs
                .iter()
                .all(|s| garage.is_reachable(*start, FloorPos { floor: 0, pos: *s }))
        });
        if !starts_ok || garage.start_positions.len() < params.characters {
            unreachable.push(seed);
        }

        if verbose && seed == 0 {
            for (idx, floor) in garage.floors().iter().enumerate() {
                println!("  Floor {} (seed 0):", idx);
                for line in floor.to_ascii().lines() {
                    println!("    {}", line);
                }
            }
        }
    }

    results.push(TestResult {
        name: "gen_floors_connected".into(),
        passed: disconnected.is_empty(),
        detail: format!("{}/{} garages fully connected", seeds as usize - disconnected.len(), seeds),
    });
    results.push(TestResult {
        name: "gen_stairs_aligned".into(),
        passed: bad_stairs.is_empty(),
        detail: if bad_stairs.is_empty() {
            "stairs share coordinates on every floor".into()
        } else {
            format!("misaligned stairs for seeds {:?}", bad_stairs)
        },
    });
    results.push(TestResult {
        name: "gen_single_goal_on_top".into(),
        passed: bad_goal.is_empty(),
        detail: if bad_goal.is_empty() {
            "exactly one car, always on the top floor".into()
        } else {
            format!("bad goal placement for seeds {:?}", bad_goal)
        },
    });
    results.push(TestResult {
        name: "gen_items_off_goal_floor".into(),
        passed: missing_items.is_empty(),
        detail: if missing_items.is_empty() {
            format!("{} required items placed below the car", params.items.len())
        } else {
            format!("missing pickups: {:?}", missing_items)
        },
    });
    results.push(TestResult {
        name: "gen_starts_reach_stairs".into(),
        passed: unreachable.is_empty(),
        detail: if unreachable.is_empty() {
            format!("{} starts per garage, all reach the stairs", params.characters)
        } else {
            format!("unreachable stairs for seeds {:?}", unreachable)
        },
    });
    results.push(TestResult {
        name: "gen_no_shortfalls".into(),
        passed: shortfalls == 0,
        detail: format!("{} placement shortfalls across {} seeds", shortfalls, seeds),
    });

    results
}

// ── 3. Guard Vision ─────────────────────────────────────────────────────

fn validate_vision(_verbose: bool) -> Vec<TestResult> {
    println!("--- Guard Vision ---");
    let mut results = Vec::new();

    let grid = FloorGrid::filled(11, 15, Cell::Floor);
    let guard = SecurityGuard::new(0, GridPos::new(5, 5), VisionCone::default()).facing(Direction::Right);

    let cases = [
        ("vision_ahead_in_reach", GridPos::new(5, 9), true),
        ("vision_ahead_out_of_reach", GridPos::new(5, 10), false),
        ("vision_cone_edge", GridPos::new(4, 7), true),
        ("vision_outside_spread", GridPos::new(3, 7), false),
        ("vision_behind", GridPos::new(5, 3), false),
        ("vision_adjacent_behind", GridPos::new(5, 4), true),
        ("vision_diagonal_neighbour", GridPos::new(4, 4), false),
    ];
    for (name, target, expected) in cases {
        let seen = guard.can_see(&grid, target);
        results.push(TestResult {
            name: name.into(),
            passed: seen == expected,
            detail: format!("({}, {}) seen={} expected={}", target.row, target.col, seen, expected),
        });
    }

    let surrounding = SecurityGuard {
        vision: guard.vision.with_close_range(CloseRange::Surrounding),
        ..guard.clone()
    };
    results.push(TestResult {
        name: "vision_surrounding_diagonal".into(),
        passed: surrounding.can_see(&grid, GridPos::new(4, 4)),
        detail: "surrounding close range covers diagonals".into(),
    });

    // Same guard, pillar two cells ahead.
    let pillar = FloorGrid::from_ascii(
        "
        .......
        ...#...
        .......
        ",
    );
    let guard = SecurityGuard::new(0, GridPos::new(1, 1), VisionCone::default()).facing(Direction::Right);
    let in_front = guard.can_see(&pillar, GridPos::new(1, 2));
    let behind_pillar = guard.can_see(&pillar, GridPos::new(1, 4));
    results.push(TestResult {
        name: "vision_wall_blocks".into(),
        passed: in_front && !behind_pillar,
        detail: format!(
            "in front of wall seen={}, behind wall seen={}",
            in_front, behind_pillar
        ),
    });

    results
}

// ── 4. Character Mechanics ──────────────────────────────────────────────

fn validate_mechanics(tuning: &Tuning, verbose: bool) -> Vec<TestResult> {
    println!("--- Character Mechanics ---");
    let mut results = Vec::new();
    let start = FloorPos::new(0, 1, 1);
    let mut timers = TimerQueue::<CharacterTimer>::new();

    for kind in CharacterKind::ALL {
        let c = Character::new(kind, start);
        let step = c.step_duration(tuning);
        let expected = tuning.step.as_secs_f64() / f64::from(kind.def().base_speed);
        results.push(TestResult {
            name: format!("step_time_{}", kind.def().name.to_lowercase()),
            passed: (step.as_secs_f64() - expected).abs() < 1e-5,
            detail: format!("{:?} per cell", step),
        });
    }

    // Carrying slows the carrier.
    let mut george = Character::new(CharacterKind::George, start);
    let empty = george.step_duration(tuning);
    george.pick_up(Item::AcUnit, &mut timers);
    let loaded = george.step_duration(tuning);
    results.push(TestResult {
        name: "carry_slows_down".into(),
        passed: loaded > empty,
        detail: format!("{:?} empty, {:?} carrying", empty, loaded),
    });

    // Meter fills to overflow in meter_max / fill_rate seconds.
    let mut elaine = Character::new(CharacterKind::Elaine, start);
    let mut rng = StdRng::seed_from_u64(1);
    let frame = Duration::from_millis(16);
    let mut clock = Duration::ZERO;
    let mut overflowed_at = None;
    while clock < Duration::from_secs(60) && overflowed_at.is_none() {
        clock += frame;
        let events = elaine.update_mechanics(frame, tuning, &mut rng, &mut timers);
        if !events.is_empty() {
            overflowed_at = Some(clock);
        }
    }
    let expected = tuning.meter_max / tuning.meter_fill_per_sec;
    results.push(TestResult {
        name: "meter_overflow_time".into(),
        passed: overflowed_at.is_some_and(|t| (t.as_secs_f64() - expected).abs() < 0.05),
        detail: format!("overflow after {:?}, expected ~{:.2}s", overflowed_at, expected),
    });
    results.push(TestResult {
        name: "meter_overflow_freezes".into(),
        passed: elaine.state() == MoveState::Frozen && elaine.strikes() == 1,
        detail: format!("state {:?}, {} strikes", elaine.state(), elaine.strikes()),
    });

    // Kramer lurches only until he has the keys.
    let mut kramer = Character::new(CharacterKind::Kramer, start);
    let mut lurches = 0;
    for _ in 0..625 {
        lurches += kramer
            .update_mechanics(frame, tuning, &mut rng, &mut timers)
            .len();
    }
    kramer.pick_up(Item::Keys, &mut timers);
    let mut after_keys = 0;
    for _ in 0..625 {
        after_keys += kramer
            .update_mechanics(frame, tuning, &mut rng, &mut timers)
            .len();
    }
    results.push(TestResult {
        name: "erratic_until_keys".into(),
        passed: lurches > 0 && after_keys == 0,
        detail: format!("{} lurches in 10s without keys, {} with", lurches, after_keys),
    });

    if verbose {
        for kind in CharacterKind::ALL {
            let def = kind.def();
            println!(
                "    [{}] {:7} speed {:.1} {:?} needs {:?}",
                def.hotkey, def.name, def.base_speed, def.mechanic, def.prerequisite
            );
        }
    }
    debug!("{} timers left armed by mechanics checks", timers.len());

    results
}

// ── 5. Autoplay Rounds ──────────────────────────────────────────────────

enum Plan {
    Step(Direction),
    Stairs { up: bool },
    Stuck,
}

/// First step of a shortest path from `from` to any of `targets`. The car is
/// only entered when it is one of the targets.
fn first_step(grid: &FloorGrid, from: GridPos, targets: &[GridPos]) -> Option<Direction> {
    let idx = |p: GridPos| p.row as usize * grid.cols() + p.col as usize;
    let mut first: Vec<Option<Option<Direction>>> = vec![None; grid.rows() * grid.cols()];
    let mut queue = VecDeque::new();
    first[idx(from)] = Some(None);
    queue.push_back(from);

    while let Some(pos) = queue.pop_front() {
        if targets.contains(&pos) {
            return first[idx(pos)].flatten();
        }
        for dir in Direction::ALL {
            let next = pos.step(dir);
            let open = match grid.cell_at(next) {
                Some(Cell::Goal) => targets.contains(&next),
                Some(cell) => cell.is_walkable(),
                None => false,
            };
            if !open || first[idx(next)].is_some() {
                continue;
            }
            first[idx(next)] = Some(first[idx(pos)].flatten().or(Some(dir)));
            queue.push_back(next);
        }
    }
    None
}

fn plan(garage: &Garage, c: &Character, tuning: &Tuning) -> Plan {
    let Some(grid) = garage.floor(c.at.floor) else {
        return Plan::Stuck;
    };

    let urgent_bathroom = c.def().mechanic == Mechanic::Meter && c.meter() > tuning.meter_max * 0.6;
    let bathroom = garage
        .bathrooms
        .iter()
        .find(|b| b.floor == c.at.floor)
        .filter(|_| urgent_bathroom);

    let target = match bathroom {
        Some(b) => Some(*b),
        None if c.meets_goal_requirement() => garage.goal,
        None => c
            .def()
            .prerequisite
            .and_then(|p| garage.pickup_location(p.item())),
    };
    let Some(target) = target else {
        return Plan::Stuck;
    };

    if target.floor != c.at.floor {
        if grid.cell_at(c.at.pos) == Some(Cell::Stairs) {
            return Plan::Stairs {
                up: target.floor > c.at.floor,
            };
        }
        return first_step(grid, c.at.pos, &garage.stairs).map_or(Plan::Stuck, Plan::Step);
    }
    first_step(grid, c.at.pos, &[target.pos]).map_or(Plan::Stuck, Plan::Step)
}

/// Drive one round with a shortest-path autopilot. Characters with a
/// meter go first.
fn autoplay(engine: &mut GarageEngine) {
    let frame = Duration::from_millis(16);
    let meter_first = (0..engine.character_count()).find(|slot| {
        engine
            .character(*slot)
            .is_some_and(|c| c.def().mechanic == Mechanic::Meter)
    });
    if let Some(slot) = meter_first {
        let _ = engine.select_character(slot);
    }

    let limit = engine.tuning().round_length.as_millis() / frame.as_millis() + 1;
    for _ in 0..limit {
        if engine.outcome().is_over() {
            break;
        }
        let mut intent = Intent::idle();
        if let Some(slot) = engine.active_slot() {
            if let Some(c) = engine.character(slot) {
                if c.accepts_input() {
                    match plan(engine.garage(), &c, engine.tuning()) {
                        Plan::Step(dir) => intent = Intent::go(dir),
                        Plan::Stairs { up } => {
                            engine.use_stairs(up);
                        }
                        Plan::Stuck => {
                            let next = (slot + 1) % engine.character_count();
                            let _ = engine.select_character(next);
                        }
                    }
                }
            }
        }
        engine.update(frame, intent);
    }
}

fn validate_autoplay(
    config: &GarageConfig,
    seeds: u64,
    dump: Option<&PathBuf>,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Autoplay Rounds ---");
    let mut results = Vec::new();

    let mut won = 0;
    let mut timed_out = 0;
    let mut struck_out = 0;
    let mut unfinished = Vec::new();
    let mut catches = 0;
    let mut setup_errors = Vec::new();

    for seed in 0..seeds {
        let round_config = GarageConfig {
            seed: Some(config.seed.unwrap_or(0).wrapping_add(seed)),
            ..config.clone()
        };
        let mut engine = match GarageEngine::new(round_config) {
            Ok(engine) => engine,
            Err(e) => {
                setup_errors.push(format!("seed {}: {}", seed, e));
                continue;
            }
        };

        autoplay(&mut engine);
        let events = engine.drain_events();
        catches += events
            .iter()
            .filter(|e| matches!(e, EngineEvent::Caught { .. }))
            .count();

        match engine.outcome() {
            RoundOutcome::Won => won += 1,
            RoundOutcome::Lost(LossReason::TimeUp) => timed_out += 1,
            RoundOutcome::Lost(LossReason::StruckOut(_)) => struck_out += 1,
            RoundOutcome::InProgress => unfinished.push(seed),
        }
        info!("seed {}: {:?} after {:?}", engine.seed(), engine.outcome(), engine.elapsed());

        if verbose {
            for e in events.iter().filter(|e| !matches!(e, EngineEvent::Selected { .. })) {
                debug!("  seed {}: {}", seed, e.describe());
            }
        }

        if seed == 0 {
            if let Some(path) = dump {
                let written = engine
                    .snapshot()
                    .to_json()
                    .map_err(|e| e.to_string())
                    .and_then(|json| std::fs::write(path, json).map_err(|e| e.to_string()));
                results.push(TestResult {
                    name: "snapshot_dump".into(),
                    passed: written.is_ok(),
                    detail: match written {
                        Ok(()) => format!("wrote {}", path.display()),
                        Err(e) => e,
                    },
                });
            }
        }
    }

    results.push(TestResult {
        name: "autoplay_setup".into(),
        passed: setup_errors.is_empty(),
        detail: if setup_errors.is_empty() {
            format!("{} rounds started", seeds)
        } else {
            setup_errors.join("; ")
        },
    });
    results.push(TestResult {
        name: "autoplay_rounds_end".into(),
        passed: unfinished.is_empty(),
        detail: if unfinished.is_empty() {
            format!(
                "won={} time_up={} struck_out={} catches={}",
                won, timed_out, struck_out, catches
            )
        } else {
            format!("rounds still running past the clock: {:?}", unfinished)
        },
    });

    results
}
