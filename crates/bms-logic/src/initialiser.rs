//! Building save files in the line-oriented text format.
//!
//! A save file holds zero or more buildings back to back:
//!
//! ```text
//! <building name>
//! <floor count>
//! <floor>:<width>:<length>:<room count>[:<room>,<room>,...]
//! <room>:<TYPE>:<area>:<sensor count>[:RuleBased|:WeightingBased]
//! <SensorId>:<r1>,<r2>,...[:<params>...][@<weight>]
//! ```
//!
//! Every entity goes through the same construction and mutation operations
//! as hand-built ones, so a file is accepted only if it describes a valid
//! hierarchy. Any rejection surfaces as [`FileFormatError::InvalidFormat`]
//! carrying the offending line number; the underlying reason is logged.
//!
//! Loaded maintenance schedules are not registered with any clock. Callers
//! register them with their own clock through
//! [`Building::register_schedules`].
//!
//! A room that declares an evaluator but no sensors is loaded without one.

use std::fmt::Display;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::building::Building;
use crate::floor::Floor;
use crate::hazard::{EvaluatorKind, HazardEvaluator};
use crate::room::{Room, RoomType};
use crate::sensors::{HazardSensor, Sensor, SensorType};

/// Why a save file could not be loaded.
#[derive(Debug, Error)]
pub enum FileFormatError {
    #[error("could not read building file: {0}")]
    Io(#[from] io::Error),

    #[error("invalid building file format at line {line}")]
    InvalidFormat { line: usize },
}

type LoadResult<T> = std::result::Result<T, FileFormatError>;

/// Line cursor that remembers where it is for error reporting.
struct Lines<R> {
    inner: io::Lines<R>,
    line: usize,
}

impl<R: BufRead> Lines<R> {
    fn new(reader: R) -> Self {
        Self {
            inner: reader.lines(),
            line: 0,
        }
    }

    /// Next line, or `None` at end of input.
    fn next_opt(&mut self) -> LoadResult<Option<String>> {
        match self.inner.next() {
            None => Ok(None),
            Some(line) => {
                self.line += 1;
                let line = line?;
                if line.trim().is_empty() {
                    return Err(self.reject("empty line"));
                }
                Ok(Some(line))
            }
        }
    }

    /// Next line, where running out of input is a format error.
    fn next_line(&mut self) -> LoadResult<String> {
        match self.next_opt()? {
            Some(line) => Ok(line),
            None => {
                self.line += 1;
                Err(self.reject("unexpected end of file"))
            }
        }
    }

    fn reject(&self, reason: impl Display) -> FileFormatError {
        log::warn!("building file rejected at line {}: {}", self.line, reason);
        FileFormatError::InvalidFormat { line: self.line }
    }

    fn parse<T>(&self, field: &str) -> LoadResult<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        field
            .parse()
            .map_err(|e| self.reject(format!("'{field}': {e}")))
    }

    fn parse_dimension(&self, field: &str) -> LoadResult<f64> {
        let value: f64 = self.parse(field)?;
        if !value.is_finite() {
            return Err(self.reject(format!("'{field}' is not a finite number")));
        }
        Ok(value)
    }
}

/// Load every building in `reader`.
pub fn load_buildings<R: BufRead>(reader: R) -> LoadResult<Vec<Building>> {
    let mut lines = Lines::new(reader);
    let mut buildings = Vec::new();

    while let Some(name) = lines.next_opt()? {
        let mut building = Building::new(name);
        let count_line = lines.next_line()?;
        let floor_count: usize = lines.parse(&count_line)?;
        for _ in 0..floor_count {
            let floor = read_floor(&mut lines)?;
            building.add_floor(floor).map_err(|e| lines.reject(e))?;
        }
        log::debug!(
            "loaded building '{}' with {} floors",
            building.name(),
            floor_count
        );
        buildings.push(building);
    }
    Ok(buildings)
}

/// Load every building in the file at `path`.
pub fn load_buildings_from_path(path: impl AsRef<Path>) -> LoadResult<Vec<Building>> {
    let file = File::open(path.as_ref())?;
    let buildings = load_buildings(BufReader::new(file))?;
    log::info!(
        "loaded {} buildings from {}",
        buildings.len(),
        path.as_ref().display()
    );
    Ok(buildings)
}

/// Encode `buildings` in save-file form, one building after another.
pub fn encode_buildings(buildings: &[Building]) -> String {
    buildings
        .iter()
        .map(|b| b.encode() + "\n")
        .collect()
}

/// Write `buildings` to `writer` in save-file form.
pub fn write_buildings<W: Write>(mut writer: W, buildings: &[Building]) -> io::Result<()> {
    writer.write_all(encode_buildings(buildings).as_bytes())?;
    writer.flush()
}

fn read_floor<R: BufRead>(lines: &mut Lines<R>) -> LoadResult<Floor> {
    let header = lines.next_line()?;
    let fields: Vec<&str> = header.split(':').collect();
    if !(4..=5).contains(&fields.len()) {
        return Err(lines.reject(format!("floor line has {} fields", fields.len())));
    }
    let number: u32 = lines.parse(fields[0])?;
    let width = lines.parse_dimension(fields[1])?;
    let length = lines.parse_dimension(fields[2])?;
    let room_count: usize = lines.parse(fields[3])?;
    let order = fields
        .get(4)
        .map(|order| {
            order
                .split(',')
                .map(|n| lines.parse::<u32>(n))
                .collect::<LoadResult<Vec<_>>>()
        })
        .transpose()?;
    let header_line = lines.line;

    let mut floor = Floor::new(number, width, length);
    for _ in 0..room_count {
        let room = read_room(lines)?;
        floor.add_room(room).map_err(|e| lines.reject(e))?;
    }

    if let Some(order) = order {
        floor
            .create_unregistered_schedule(&order)
            .map_err(|e| {
                log::warn!("building file rejected at line {header_line}: {e}");
                FileFormatError::InvalidFormat { line: header_line }
            })?;
    }
    Ok(floor)
}

fn read_room<R: BufRead>(lines: &mut Lines<R>) -> LoadResult<Room> {
    let header = lines.next_line()?;
    let fields: Vec<&str> = header.split(':').collect();
    if !(4..=5).contains(&fields.len()) {
        return Err(lines.reject(format!("room line has {} fields", fields.len())));
    }
    let number: u32 = lines.parse(fields[0])?;
    let room_type: RoomType = lines.parse(fields[1])?;
    let area = lines.parse_dimension(fields[2])?;
    let sensor_count: usize = lines.parse(fields[3])?;
    let evaluator = match fields.get(4) {
        None => None,
        Some(&"RuleBased") => Some(EvaluatorKind::RuleBased),
        Some(&"WeightingBased") => Some(EvaluatorKind::WeightingBased),
        Some(other) => return Err(lines.reject(format!("unknown evaluator '{other}'"))),
    };
    let header_line = lines.line;

    let mut room = Room::new(number, room_type, area);
    let mut weights = Vec::new();
    for _ in 0..sensor_count {
        let line = lines.next_line()?;
        let sensor = match evaluator {
            Some(EvaluatorKind::WeightingBased) => {
                let (sensor, weight) = line
                    .rsplit_once('@')
                    .ok_or_else(|| lines.reject("sensor has no weighting"))?;
                let weight: u32 = lines.parse(weight)?;
                let sensor = read_sensor(lines, sensor)?;
                weights.push((sensor.sensor_type(), weight));
                sensor
            }
            _ => read_sensor(lines, &line)?,
        };
        room.add_sensor(sensor).map_err(|e| lines.reject(e))?;
    }

    let evaluator = match evaluator {
        None => return Ok(room),
        Some(_) if sensor_count == 0 => return Ok(room),
        Some(EvaluatorKind::RuleBased) => {
            Ok(HazardEvaluator::rule_based(room.sensors().iter().map(Sensor::sensor_type)))
        }
        Some(EvaluatorKind::WeightingBased) => HazardEvaluator::weighting_based(weights),
    };
    evaluator
        .and_then(|e| room.set_hazard_evaluator(e))
        .map_err(|e| {
            log::warn!("building file rejected at line {header_line}: {e}");
            FileFormatError::InvalidFormat { line: header_line }
        })?;
    Ok(room)
}

fn read_sensor<R: BufRead>(lines: &Lines<R>, line: &str) -> LoadResult<Sensor> {
    let fields: Vec<&str> = line.split(':').collect();
    let sensor_type: SensorType = lines.parse(fields[0])?;
    let expected = match sensor_type {
        SensorType::CarbonDioxide => 5,
        SensorType::Noise => 3,
        SensorType::Occupancy => 4,
        SensorType::Temperature => 2,
    };
    if fields.len() != expected {
        return Err(lines.reject(format!(
            "{sensor_type} line has {} fields, expected {expected}",
            fields.len()
        )));
    }
    let readings = fields[1]
        .split(',')
        .map(|r| lines.parse::<i32>(r))
        .collect::<LoadResult<Vec<_>>>()?;

    let sensor = match sensor_type {
        SensorType::CarbonDioxide => Sensor::carbon_dioxide(
            readings,
            lines.parse(fields[2])?,
            lines.parse(fields[3])?,
            lines.parse(fields[4])?,
        ),
        SensorType::Noise => Sensor::noise(readings, lines.parse(fields[2])?),
        SensorType::Occupancy => {
            Sensor::occupancy(readings, lines.parse(fields[2])?, lines.parse(fields[3])?)
        }
        SensorType::Temperature => Sensor::temperature(readings),
    };
    sensor.map_err(|e| lines.reject(e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::RoomState;

    const SAMPLE: &str = "\
Working Building
3
1:10.00:10.00:2:101,102
101:STUDY:20.00:1
OccupancySensor:13,24,28,15,6:4:30
102:STUDY:15.00:0
2:10.00:10.00:1
201:OFFICE:50.00:2:RuleBased
NoiseSensor:55,62,69,63:3
TemperatureSensor:28,29,26,24
3:10.00:8.00:1
301:LABORATORY:30.00:2:WeightingBased
NoiseSensor:55,62,69,63:3@25
TemperatureSensor:28,29,26,24@75
";

    fn load(text: &str) -> LoadResult<Vec<Building>> {
        load_buildings(text.as_bytes())
    }

    fn rejected_at(text: &str) -> usize {
        match load(text) {
            Err(FileFormatError::InvalidFormat { line }) => line,
            other => panic!("expected a format error, got {other:?}"),
        }
    }

    #[test]
    fn test_loads_sample() {
        let buildings = load(SAMPLE).unwrap();
        assert_eq!(buildings.len(), 1);
        let building = &buildings[0];
        assert_eq!(building.name(), "Working Building");
        assert_eq!(building.floors().len(), 3);

        let ground = building.floor(1).unwrap();
        let schedule = ground.maintenance_schedule().unwrap();
        assert_eq!(schedule.room_order(), &[101, 102]);
        assert_eq!(
            ground.room(101).unwrap().evaluate_state(),
            RoomState::Maintenance
        );

        let office = building.floor(2).unwrap().room(201).unwrap();
        assert_eq!(
            office.hazard_evaluator().map(HazardEvaluator::kind),
            Some(EvaluatorKind::RuleBased)
        );
        let lab = building.floor(3).unwrap().room(301).unwrap();
        let evaluator = lab.hazard_evaluator().unwrap();
        assert_eq!(evaluator.weight_for(SensorType::Temperature), Some(75));
    }

    #[test]
    fn test_encoding_round_trips() {
        let buildings = load(SAMPLE).unwrap();
        assert_eq!(encode_buildings(&buildings), SAMPLE);
        assert_eq!(load(&encode_buildings(&buildings)).unwrap(), buildings);
    }

    #[test]
    fn test_loads_several_buildings() {
        let text = format!("{SAMPLE}Annex\n1\n1:6.00:6.00:0\n");
        let buildings = load(&text).unwrap();
        assert_eq!(buildings.len(), 2);
        assert_eq!(buildings[1].name(), "Annex");
    }

    #[test]
    fn test_empty_input_has_no_buildings() {
        assert!(load("").unwrap().is_empty());
    }

    #[test]
    fn test_rejects_too_few_floors() {
        // declares 2 floors but the file ends after one
        assert_eq!(rejected_at("B\n2\n1:10:10:0\n"), 4);
    }

    #[test]
    fn test_rejects_wrong_room_count() {
        let text = "B\n1\n1:10:10:2\n101:STUDY:10:0\n";
        assert_eq!(rejected_at(text), 5);
    }

    #[test]
    fn test_rejects_wrong_sensor_count() {
        let text = "B\n1\n1:10:10:1\n101:STUDY:10:2\nTemperatureSensor:20\n";
        assert_eq!(rejected_at(text), 6);
    }

    #[test]
    fn test_rejects_schedule_for_unknown_room() {
        let text = "B\n1\n1:10:10:1:101,999\n101:STUDY:10:0\n";
        assert_eq!(rejected_at(text), 3);
    }

    #[test]
    fn test_rejects_repeated_schedule_room() {
        let text = "B\n1\n1:10:10:2:101,101,102\n101:STUDY:10:0\n102:STUDY:10:0\n";
        assert_eq!(rejected_at(text), 3);
    }

    #[test]
    fn test_rejects_hierarchy_violations() {
        // duplicate floor
        rejected_at("B\n2\n1:10:10:0\n1:10:10:0\n");
        // floor above overhangs the floor below
        rejected_at("B\n2\n1:10:10:0\n2:11:10:0\n");
        // floor above with nothing below
        rejected_at("B\n1\n2:10:10:0\n");
        // rooms exceed the floor
        rejected_at("B\n1\n1:5:5:2\n1:STUDY:20:0\n2:STUDY:20:0\n");
        // floor too narrow
        rejected_at("B\n1\n1:4:10:0\n");
    }

    #[test]
    fn test_rejects_malformed_fields() {
        for text in [
            "B\nthree\n",
            "B\n1\n1:10:10\n",
            "B\n1\n1:10:10:0:1:2\n",
            "B\n1\n1:NaN:10:0\n",
            "B\n1\n1:10:10:1\n101:KITCHEN:10:0\n",
            "B\n1\n1:10:10:1\n101:STUDY:10:1:Guesswork\nTemperatureSensor:20\n",
            "B\n1\n1:10:10:1\n101:STUDY:10:1\nSmokeSensor:20\n",
            "B\n1\n1:10:10:1\n101:STUDY:10:1\nNoiseSensor:50\n",
            "B\n1\n1:10:10:1\n101:STUDY:10:1\nNoiseSensor:50:9\n",
            "B\n1\n1:10:10:1\n101:STUDY:10:1\nTemperatureSensor:20,x\n",
        ] {
            assert!(
                matches!(load(text), Err(FileFormatError::InvalidFormat { .. })),
                "accepted {text:?}"
            );
        }
    }

    #[test]
    fn test_rejects_bad_weightings() {
        let missing = "B\n1\n1:10:10:1\n101:STUDY:10:1:WeightingBased\nTemperatureSensor:20\n";
        assert_eq!(rejected_at(missing), 5);
        let short = "B\n1\n1:10:10:1\n101:STUDY:10:1:WeightingBased\nTemperatureSensor:20@60\n";
        assert_eq!(rejected_at(short), 4);
    }

    #[test]
    fn test_evaluator_without_sensors_is_dropped() {
        for kind in ["RuleBased", "WeightingBased"] {
            let text = format!("B\n1\n1:10:10:1\n101:STUDY:10:0:{kind}\n");
            let buildings = load(&text).unwrap();
            let room = buildings[0].floor(1).unwrap().room(101).unwrap();
            assert!(room.sensors().is_empty());
            assert!(room.hazard_evaluator().is_none());
        }
    }

    #[test]
    fn test_loaded_schedules_are_unregistered() {
        let buildings = load(SAMPLE).unwrap();
        let schedule = buildings[0].floor(1).unwrap().maintenance_schedule().unwrap();
        assert_eq!(schedule.id(), None);
    }

    #[test]
    fn test_rejects_empty_lines() {
        let text = format!("{SAMPLE}\nAnnex\n1\n1:6:6:0\n");
        assert_eq!(rejected_at(&text), 15);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_buildings_from_path("no/such/building-file.txt");
        assert!(matches!(result, Err(FileFormatError::Io(_))));
    }

    #[test]
    fn test_writes_to_any_writer() {
        let buildings = load(SAMPLE).unwrap();
        let mut out = Vec::new();
        write_buildings(&mut out, &buildings).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), SAMPLE);
    }
}
