//! Building Management Headless Simulation Harness
//!
//! Loads a building save file, drives the minute clock through a scenario
//! (fire drill start/cancel), and validates the hierarchy invariants along
//! the way. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p bms-simtest
//!   cargo run -p bms-simtest -- --verbose
//!   cargo run -p bms-simtest -- --scenario path/to/scenario.json

use std::str::FromStr;

use bms_logic::building::Building;
use bms_logic::clock::SimulationClock;
use bms_logic::error::BuildingError;
use bms_logic::floor::Floor;
use bms_logic::hazard::HazardEvaluator;
use bms_logic::initialiser::{self, FileFormatError};
use bms_logic::maintenance::required_minutes;
use bms_logic::persistence;
use bms_logic::recommender::recommend_study_room;
use bms_logic::room::{Room, RoomState, RoomType};
use bms_logic::sensors::{Sensor, SensorType};
use log::LevelFilter;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;

// ── Embedded data ───────────────────────────────────────────────────────
const SCENARIO_JSON: &str = include_str!("../../../data/scenario.json");
const CAMPUS_TXT: &str = include_str!("../../../data/campus.txt");

/// Harness scenario. Missing fields fall back to [`SimConfig::default`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct SimConfig {
    /// Save file to load; the embedded campus when absent.
    save_file: Option<String>,
    /// Minutes to advance the clock.
    minutes: u64,
    /// Room type to drill (`STUDY`, `OFFICE`, `LABORATORY`); every room when absent.
    drill_room_type: Option<String>,
    drill_at_minute: Option<u64>,
    cancel_drill_at_minute: Option<u64>,
    seed: u64,
    random_mutations: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            save_file: None,
            minutes: 60,
            drill_room_type: None,
            drill_at_minute: None,
            cancel_drill_at_minute: None,
            seed: 42,
            random_mutations: 200,
        }
    }
}

// ── Logging ─────────────────────────────────────────────────────────────

struct StderrLogger;

impl log::Log for StderrLogger {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &log::Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}: {}", record.level(), record.target(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbose: bool) {
    if verbose && log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(LevelFilter::Debug);
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn main() {
    let args: Vec<String> = std::env::args().collect();
    let verbose = args.iter().any(|a| a == "--verbose");
    let scenario_path = args
        .iter()
        .position(|a| a == "--scenario")
        .and_then(|i| args.get(i + 1));
    init_logging(verbose);
    println!("=== Building Management Simulation Harness ===\n");

    let mut results = Vec::new();

    // 1. Scenario config
    let config = match load_config(scenario_path.map(String::as_str)) {
        Ok(config) => config,
        Err(detail) => {
            println!("  ✗ scenario_parse: {}", detail);
            std::process::exit(1);
        }
    };
    if verbose {
        println!("  scenario: {:?}", config);
    }

    // 2. Save file
    let (mut buildings, load_results) = validate_save_file(&config, verbose);
    results.extend(load_results);

    // 3. Structural invariants of the loaded hierarchy
    results.extend(validate_structure(&buildings));

    // 4. Text and snapshot round-trips
    results.extend(validate_round_trips(&buildings));

    // 5. Clock-driven maintenance under the drill scenario
    results.extend(validate_clock_run(&mut buildings, &config, verbose));

    // 6. Seeded random mutations
    results.extend(validate_random_mutations(&buildings, &config, verbose));

    // 7. Study room recommendations
    results.extend(validate_recommendations(&buildings, verbose));

    // 8. Reference properties on small fixtures
    results.extend(validate_reference_properties());

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

fn load_config(path: Option<&str>) -> Result<SimConfig, String> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .map_err(|e| format!("cannot read scenario {}: {}", path, e))?,
        None => SCENARIO_JSON.to_string(),
    };
    serde_json::from_str(&text).map_err(|e| format!("JSON parse error: {}", e))
}

/// Every containment violation in `building`, described.
fn containment_violations(building: &Building) -> Vec<String> {
    let mut violations = Vec::new();
    for floor in building.floors() {
        if floor.occupied_area() > floor.footprint_area() {
            violations.push(format!(
                "{} floor {}: {:.2}m^2 of rooms in {:.2}m^2",
                building.name(),
                floor.number(),
                floor.occupied_area(),
                floor.footprint_area()
            ));
        }
        if floor.number() < 2 {
            continue;
        }
        match building.floor(floor.number() - 1) {
            None => violations.push(format!(
                "{} floor {}: no floor below",
                building.name(),
                floor.number()
            )),
            Some(below) if floor.width() > below.width() || floor.length() > below.length() => {
                violations.push(format!(
                    "{} floor {}: overhangs floor {}",
                    building.name(),
                    floor.number(),
                    below.number()
                ))
            }
            Some(_) => {}
        }
    }
    violations
}

// ── 2. Save File ────────────────────────────────────────────────────────

fn validate_save_file(config: &SimConfig, verbose: bool) -> (Vec<Building>, Vec<TestResult>) {
    println!("--- Save File ---");
    let mut results = Vec::new();

    let loaded = match &config.save_file {
        Some(path) => initialiser::load_buildings_from_path(path),
        None => initialiser::load_buildings(CAMPUS_TXT.as_bytes()),
    };
    let buildings = match loaded {
        Ok(buildings) => buildings,
        Err(e) => {
            let detail = match e {
                FileFormatError::Io(_) => format!("cannot open save file: {}", e),
                FileFormatError::InvalidFormat { .. } => e.to_string(),
            };
            results.push(TestResult {
                name: "save_file_parse".into(),
                passed: false,
                detail,
            });
            return (Vec::new(), results);
        }
    };

    let floors: usize = buildings.iter().map(|b| b.floors().len()).sum();
    let rooms: usize = buildings
        .iter()
        .flat_map(Building::floors)
        .map(|f| f.rooms().len())
        .sum();
    results.push(TestResult {
        name: "save_file_not_empty".into(),
        passed: !buildings.is_empty(),
        detail: format!(
            "{} buildings, {} floors, {} rooms",
            buildings.len(),
            floors,
            rooms
        ),
    });

    if verbose {
        for building in &buildings {
            println!("  {}", building);
            for floor in building.floors() {
                println!("    {}", floor);
                for room in floor.rooms() {
                    println!("      {} [{}]", room, room.evaluate_state());
                }
            }
        }
    }

    (buildings, results)
}

// ── 3. Structure ────────────────────────────────────────────────────────

fn validate_structure(buildings: &[Building]) -> Vec<TestResult> {
    println!("--- Structure ---");
    let mut results = Vec::new();

    let violations: Vec<String> = buildings.iter().flat_map(containment_violations).collect();
    results.push(TestResult {
        name: "structure_containment".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            "every floor fits its rooms and the floor below".into()
        } else {
            violations.join("; ")
        },
    });

    // Every weighting evaluator must sum to 100 and read only present sensors.
    let mut bad_evaluators = Vec::new();
    for building in buildings {
        for room in building.floors().iter().flat_map(Floor::rooms) {
            let Some(evaluator) = room.hazard_evaluator() else {
                continue;
            };
            let missing = evaluator
                .sensor_types()
                .into_iter()
                .any(|t| room.sensor(t).is_none());
            let weights: u32 = evaluator
                .sensor_types()
                .into_iter()
                .filter_map(|t| evaluator.weight_for(t))
                .sum();
            let weighting = matches!(evaluator, HazardEvaluator::WeightingBased { .. });
            if missing || (weighting && weights != 100) {
                bad_evaluators.push(format!("{} room {}", building.name(), room.number()));
            }
        }
    }
    results.push(TestResult {
        name: "structure_evaluators".into(),
        passed: bad_evaluators.is_empty(),
        detail: if bad_evaluators.is_empty() {
            "all hazard evaluators are consistent".into()
        } else {
            format!("inconsistent evaluators: {}", bad_evaluators.join(", "))
        },
    });

    results
}

// ── 4. Round Trips ──────────────────────────────────────────────────────

fn validate_round_trips(buildings: &[Building]) -> Vec<TestResult> {
    println!("--- Round Trips ---");
    let mut results = Vec::new();

    let text = initialiser::encode_buildings(buildings);
    let reloaded = initialiser::load_buildings(text.as_bytes());
    results.push(TestResult {
        name: "text_round_trip".into(),
        passed: reloaded.as_deref().is_ok_and(|r| r == buildings),
        detail: match &reloaded {
            Ok(r) if r == buildings => format!("{} bytes re-parsed to equal buildings", text.len()),
            Ok(_) => "re-parsed buildings differ".into(),
            Err(e) => format!("re-parse failed: {}", e),
        },
    });

    let mut buffer = Vec::new();
    let snapshot = persistence::save_snapshot(&mut buffer, buildings)
        .and_then(|()| persistence::load_snapshot(&buffer[..]));
    results.push(TestResult {
        name: "snapshot_round_trip".into(),
        passed: snapshot.as_deref().is_ok_and(|s| s == buildings),
        detail: match &snapshot {
            Ok(s) if s == buildings => format!("{} byte snapshot restored", buffer.len()),
            Ok(_) => "restored buildings differ".into(),
            Err(e) => format!("snapshot failed: {}", e),
        },
    });

    results
}

// ── 5. Clock Run ────────────────────────────────────────────────────────

/// (building index, floor number, current room, minutes elapsed)
type ScheduleState = (usize, u32, u32, u32);

fn schedule_states(buildings: &[Building]) -> Vec<ScheduleState> {
    let mut states = Vec::new();
    for (index, building) in buildings.iter().enumerate() {
        for floor in building.floors() {
            if let Some(schedule) = floor.maintenance_schedule() {
                states.push((
                    index,
                    floor.number(),
                    schedule.current_room(),
                    schedule.minutes_elapsed(),
                ));
            }
        }
    }
    states
}

fn validate_clock_run(
    buildings: &mut [Building],
    config: &SimConfig,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Clock Run ---");
    let mut results = Vec::new();

    let drill_type = match config.drill_room_type.as_deref().map(RoomType::from_str) {
        None => None,
        Some(Ok(room_type)) => Some(room_type),
        Some(Err(e)) => {
            results.push(TestResult {
                name: "clock_drill_type".into(),
                passed: false,
                detail: e.to_string(),
            });
            return results;
        }
    };

    let mut clock = SimulationClock::new();
    for building in buildings.iter_mut() {
        building.register_schedules(&mut clock);
    }
    let scheduled = schedule_states(buildings).len();
    results.push(TestResult {
        name: "clock_registration".into(),
        passed: clock.consumers().len() == scheduled,
        detail: format!(
            "{} consumers for {} scheduled floors",
            clock.consumers().len(),
            scheduled
        ),
    });

    let mut faults = 0;
    let mut orphaned = 0;
    let mut rotations = 0;
    let mut frozen_violations = Vec::new();
    let mut flag_violations = Vec::new();

    for minute in 1..=config.minutes {
        if config.drill_at_minute == Some(minute) {
            for building in buildings.iter_mut() {
                if let Err(e) = building.fire_drill(drill_type) {
                    log::warn!("{}: drill not started: {}", building.name(), e);
                }
            }
        }
        if config.cancel_drill_at_minute == Some(minute) {
            for building in buildings.iter_mut() {
                building.cancel_fire_drill();
            }
        }

        let before = schedule_states(buildings);
        let report = clock.advance_one_minute(&mut *buildings);
        faults += report.faults.len();
        orphaned += report.orphaned;
        let after = schedule_states(buildings);

        for (old, new) in before.iter().zip(&after) {
            let (index, floor_number, room, _) = *old;
            let evacuating = buildings[index]
                .floor(floor_number)
                .and_then(|f| f.room(room))
                .is_some_and(|r| r.evaluate_state() == RoomState::Evacuate);
            if evacuating && old != new {
                frozen_violations.push(format!(
                    "minute {}: floor {} advanced while room {} evacuated",
                    minute, floor_number, room
                ));
            }
            if old.2 != new.2 {
                rotations += 1;
            }
        }

        for building in buildings.iter() {
            for floor in building.floors() {
                let Some(schedule) = floor.maintenance_schedule() else {
                    continue;
                };
                let flagged: Vec<u32> = floor
                    .rooms()
                    .iter()
                    .filter(|r| r.maintenance_ongoing())
                    .map(Room::number)
                    .collect();
                let within_time = floor
                    .room(schedule.current_room())
                    .is_some_and(|r| schedule.minutes_elapsed() < required_minutes(r));
                if flagged != [schedule.current_room()] || !within_time {
                    flag_violations.push(format!(
                        "minute {}: {} floor {} flags {:?}, {}",
                        minute,
                        building.name(),
                        floor.number(),
                        flagged,
                        schedule
                    ));
                }
            }
        }
    }

    results.push(TestResult {
        name: "clock_minutes".into(),
        passed: clock.minutes() == config.minutes,
        detail: format!("{} minutes advanced", clock.minutes()),
    });
    results.push(TestResult {
        name: "clock_no_faults".into(),
        passed: faults == 0 && orphaned == 0,
        detail: format!("{} faults, {} orphaned ticks", faults, orphaned),
    });
    results.push(TestResult {
        name: "clock_evacuation_freeze".into(),
        passed: frozen_violations.is_empty(),
        detail: if frozen_violations.is_empty() {
            "no rotation advanced during evacuation".into()
        } else {
            frozen_violations.join("; ")
        },
    });
    results.push(TestResult {
        name: "clock_maintenance_flags".into(),
        passed: flag_violations.is_empty(),
        detail: if flag_violations.is_empty() {
            format!("flags tracked {} rotations", rotations)
        } else {
            flag_violations.join("; ")
        },
    });

    if verbose {
        for building in buildings.iter() {
            for floor in building.floors() {
                if let Some(schedule) = floor.maintenance_schedule() {
                    println!("  {} floor {}: {}", building.name(), floor.number(), schedule);
                }
            }
        }
    }

    results
}

// ── 6. Random Mutations ─────────────────────────────────────────────────

/// Random length in `lo..hi`, kept to two decimals.
fn random_length(rng: &mut StdRng, lo: u32, hi: u32) -> f64 {
    f64::from(rng.gen_range(lo * 100..hi * 100)) / 100.0
}

/// Apply one random mutation; returns whether it was accepted.
fn random_mutation(rng: &mut StdRng, building: &mut Building, next_room: &mut u32) -> bool {
    let floor_count = building.floors().len() as u32;
    let outcome: Result<(), BuildingError> = match rng.gen_range(0..3) {
        0 => {
            let number = rng.gen_range(1..=floor_count + 2);
            let width = random_length(rng, 3, 30);
            let length = random_length(rng, 3, 30);
            building.add_floor(Floor::new(number, width, length))
        }
        1 if floor_count > 0 => {
            let number = rng.gen_range(1..=floor_count);
            let width = random_length(rng, 3, 30);
            let length = random_length(rng, 3, 30);
            building.renovate_floor(number, width, length)
        }
        _ if floor_count > 0 => {
            let number = rng.gen_range(1..=floor_count);
            let room_type = RoomType::ALL[rng.gen_range(0..RoomType::ALL.len())];
            let room = Room::new(*next_room, room_type, random_length(rng, 4, 60));
            *next_room += 1;
            match building.floor_mut(number) {
                Some(floor) => floor.add_room(room),
                None => Err(BuildingError::InvalidArgument(format!(
                    "floor {} does not exist",
                    number
                ))),
            }
        }
        _ => Ok(()),
    };
    outcome.is_ok()
}

fn validate_random_mutations(
    buildings: &[Building],
    config: &SimConfig,
    verbose: bool,
) -> Vec<TestResult> {
    println!("--- Random Mutations ---");
    let mut results = Vec::new();

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut targets = buildings.to_vec();
    targets.push(Building::new("Scratch"));
    let mut next_room = 10_000;
    let mut accepted = 0;
    let mut violations = Vec::new();

    for step in 0..config.random_mutations {
        let index = rng.gen_range(0..targets.len());
        if random_mutation(&mut rng, &mut targets[index], &mut next_room) {
            accepted += 1;
        }
        for violation in containment_violations(&targets[index]) {
            violations.push(format!("step {}: {}", step, violation));
        }
    }

    if verbose {
        println!(
            "  seed {}: {}/{} mutations accepted",
            config.seed, accepted, config.random_mutations
        );
    }

    results.push(TestResult {
        name: "random_mutation_invariants".into(),
        passed: violations.is_empty(),
        detail: if violations.is_empty() {
            format!(
                "{} mutations ({} accepted), invariants held",
                config.random_mutations, accepted
            )
        } else {
            violations.join("; ")
        },
    });

    let text = initialiser::encode_buildings(&targets);
    let reloaded = initialiser::load_buildings(text.as_bytes());
    results.push(TestResult {
        name: "random_mutation_round_trip".into(),
        passed: reloaded.as_deref().is_ok_and(|r| r == targets),
        detail: match reloaded {
            Ok(_) => format!("{} mutated buildings re-parsed", targets.len()),
            Err(e) => format!("re-parse failed: {}", e),
        },
    });

    results
}

// ── 7. Recommendations ──────────────────────────────────────────────────

fn validate_recommendations(buildings: &[Building], verbose: bool) -> Vec<TestResult> {
    println!("--- Recommendations ---");
    let mut results = Vec::new();

    let mut bad = Vec::new();
    for building in buildings {
        let recommended = recommend_study_room(building);
        if verbose {
            match recommended {
                Some(room) => println!(
                    "  {}: {} (comfort {})",
                    building.name(),
                    room,
                    room.comfort_level()
                ),
                None => println!("  {}: no study room available", building.name()),
            }
        }
        if let Some(room) = recommended {
            if room.room_type() != RoomType::Study || room.evaluate_state() != RoomState::Open {
                bad.push(format!("{} room {}", building.name(), room.number()));
            }
        }
    }

    results.push(TestResult {
        name: "recommendation_open_study".into(),
        passed: bad.is_empty(),
        detail: if bad.is_empty() {
            "every recommendation is an open study room".into()
        } else {
            format!("unsuitable recommendations: {}", bad.join(", "))
        },
    });

    results
}

// ── 8. Reference Properties ─────────────────────────────────────────────

fn validate_reference_properties() -> Vec<TestResult> {
    println!("--- Reference Properties ---");
    let mut results = Vec::new();

    // Weighted hazard: levels {80, 40} with weights {25, 75} → 50
    let weighted = weighted_lab_hazard();
    results.push(TestResult {
        name: "weighted_hazard".into(),
        passed: weighted == Ok(Some(50)),
        detail: format!("{:?}", weighted),
    });

    let bad_weights = HazardEvaluator::weighting_based([
        (SensorType::Temperature, 50),
        (SensorType::Occupancy, 60),
    ]);
    results.push(TestResult {
        name: "weights_must_sum_to_100".into(),
        passed: matches!(bad_weights, Err(BuildingError::InvalidArgument(_))),
        detail: format!("{:?}", bad_weights.err()),
    });

    let mut upside_down = Building::new("Upside Down");
    let no_floor_below = upside_down.add_floor(Floor::new(2, 10.0, 10.0));
    results.push(TestResult {
        name: "no_floor_below".into(),
        passed: no_floor_below == Err(BuildingError::NoFloorBelow(2))
            && upside_down.floors().is_empty(),
        detail: format!("{:?}", no_floor_below),
    });

    let rotation = study_office_rotation();
    results.push(TestResult {
        name: "maintenance_rotation".into(),
        passed: rotation == Ok((2, 1)),
        detail: format!("{:?}", rotation),
    });

    results
}

fn weighted_lab_hazard() -> Result<Option<u8>, BuildingError> {
    let mut room = Room::new(1, RoomType::Laboratory, 10.0);
    room.add_sensor(Sensor::temperature(vec![55])?)?;
    room.add_sensor(Sensor::occupancy(vec![4], 1, 10)?)?;
    room.set_hazard_evaluator(HazardEvaluator::weighting_based([
        (SensorType::Temperature, 25),
        (SensorType::Occupancy, 75),
    ])?)?;
    Ok(room.hazard_level())
}

/// Current room after 6 and after 14 minutes of a study (10m^2, 6 minutes)
/// and office (5m^2, 8 minutes) rotation.
fn study_office_rotation() -> Result<(u32, u32), BuildingError> {
    let mut clock = SimulationClock::new();
    let mut floor = Floor::new(1, 10.0, 10.0);
    floor.add_room(Room::new(1, RoomType::Study, 10.0))?;
    floor.add_room(Room::new(2, RoomType::Office, 5.0))?;
    floor.create_maintenance_schedule(&[1, 2], &mut clock)?;
    clock.advance(&mut floor, 6);
    let after_six = floor.maintenance_schedule().map_or(0, |s| s.current_room());
    clock.advance(&mut floor, 8);
    let after_fourteen = floor.maintenance_schedule().map_or(0, |s| s.current_room());
    Ok((after_six, after_fourteen))
}
