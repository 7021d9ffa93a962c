//! Rooms and the room state machine.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{DIMENSION_TOLERANCE, MAX_HAZARD_LEVEL};
use crate::error::{BuildingError, Result};
use crate::hazard::{EvaluatorKind, HazardEvaluator};
use crate::sensors::{HazardSensor, Sensor, SensorType};

/// What a room is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomType {
    Study,
    Office,
    Laboratory,
}

impl RoomType {
    pub const ALL: [RoomType; 3] = [RoomType::Study, RoomType::Office, RoomType::Laboratory];

    pub fn as_str(&self) -> &'static str {
        match self {
            RoomType::Study => "STUDY",
            RoomType::Office => "OFFICE",
            RoomType::Laboratory => "LABORATORY",
        }
    }
}

impl fmt::Display for RoomType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RoomType {
    type Err = BuildingError;

    fn from_str(s: &str) -> Result<Self> {
        RoomType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| BuildingError::invalid(format!("unknown room type '{s}'")))
    }
}

/// Operational state of a room, derived on every query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RoomState {
    /// Reserved; no current transition produces it.
    Error,
    Evacuate,
    Maintenance,
    Open,
}

impl fmt::Display for RoomState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoomState::Error => "ERROR",
            RoomState::Evacuate => "EVACUATE",
            RoomState::Maintenance => "MAINTENANCE",
            RoomState::Open => "OPEN",
        };
        f.write_str(s)
    }
}

/// A room on a floor.
///
/// Rooms are created bare: no sensors, no evaluator, no drill or
/// maintenance in progress. Area is validated when the room is added to a
/// [`Floor`](crate::floor::Floor).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    number: u32,
    room_type: RoomType,
    area: f64,
    /// At most one per type, kept sorted by type.
    sensors: Vec<Sensor>,
    evaluator: Option<HazardEvaluator>,
    fire_drill: bool,
    maintenance: bool,
}

impl Room {
    pub fn new(number: u32, room_type: RoomType, area: f64) -> Self {
        Self {
            number,
            room_type,
            area,
            sensors: Vec::new(),
            evaluator: None,
            fire_drill: false,
            maintenance: false,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn room_type(&self) -> RoomType {
        self.room_type
    }

    pub fn area(&self) -> f64 {
        self.area
    }

    pub fn fire_drill_ongoing(&self) -> bool {
        self.fire_drill
    }

    pub fn maintenance_ongoing(&self) -> bool {
        self.maintenance
    }

    pub fn set_fire_drill(&mut self, active: bool) {
        self.fire_drill = active;
    }

    pub fn set_maintenance(&mut self, active: bool) {
        self.maintenance = active;
    }

    /// Sensors in type order.
    pub fn sensors(&self) -> &[Sensor] {
        &self.sensors
    }

    pub fn sensor(&self, sensor_type: SensorType) -> Option<&Sensor> {
        self.sensors.iter().find(|s| s.sensor_type() == sensor_type)
    }

    /// Attach a sensor.
    ///
    /// Side effect: any installed hazard evaluator is discarded. Callers
    /// install a new one once the sensor set is complete.
    pub fn add_sensor(&mut self, sensor: Sensor) -> Result<()> {
        let sensor_type = sensor.sensor_type();
        let position = match self
            .sensors
            .binary_search_by_key(&sensor_type, |s| s.sensor_type())
        {
            Ok(_) => return Err(BuildingError::DuplicateSensor(sensor_type)),
            Err(position) => position,
        };
        self.sensors.insert(position, sensor);
        if self.evaluator.take().is_some() {
            log::debug!(
                "room {}: hazard evaluator reset after adding {}",
                self.number,
                sensor_type
            );
        }
        Ok(())
    }

    pub fn hazard_evaluator(&self) -> Option<&HazardEvaluator> {
        self.evaluator.as_ref()
    }

    /// Install `evaluator`, replacing any previous one. Every sensor type it
    /// reads must already be attached to this room.
    pub fn set_hazard_evaluator(&mut self, evaluator: HazardEvaluator) -> Result<()> {
        self.check_evaluator(&evaluator)?;
        self.evaluator = Some(evaluator);
        Ok(())
    }

    fn check_evaluator(&self, evaluator: &HazardEvaluator) -> Result<()> {
        match evaluator
            .sensor_types()
            .into_iter()
            .find(|t| self.sensor(*t).is_none())
        {
            Some(missing) => Err(BuildingError::invalid(format!(
                "room {} has no {} for the evaluator to read",
                self.number, missing
            ))),
            None => Ok(()),
        }
    }

    pub fn clear_hazard_evaluator(&mut self) {
        self.evaluator = None;
    }

    /// Check the sensor set and evaluator of a room that was deserialized.
    /// Area is checked by the owning floor.
    pub(crate) fn validate(&self) -> Result<()> {
        for sensor in &self.sensors {
            sensor.validate()?;
        }
        if let Some(pair) = self
            .sensors
            .windows(2)
            .find(|pair| pair[0].sensor_type() >= pair[1].sensor_type())
        {
            return Err(BuildingError::DuplicateSensor(pair[1].sensor_type()));
        }
        if let Some(evaluator) = &self.evaluator {
            evaluator.validate()?;
            self.check_evaluator(evaluator)?;
        }
        Ok(())
    }

    /// Current hazard score, or `None` when no evaluator is installed.
    pub fn hazard_level(&self) -> Option<u8> {
        self.evaluator
            .as_ref()
            .map(|evaluator| evaluator.evaluate(&self.sensors))
    }

    /// Derive the room's state from its sensors and flags.
    ///
    /// Priority: extreme temperature, then fire drill, then maintenance.
    pub fn evaluate_state(&self) -> RoomState {
        let extreme_heat = self
            .sensor(SensorType::Temperature)
            .is_some_and(|s| s.hazard_level() == MAX_HAZARD_LEVEL);
        if extreme_heat || self.fire_drill {
            RoomState::Evacuate
        } else if self.maintenance {
            RoomState::Maintenance
        } else {
            RoomState::Open
        }
    }

    /// Mean comfort across comfort-reporting sensors, 0 when there are none.
    pub fn comfort_level(&self) -> u32 {
        let levels: Vec<u32> = self
            .sensors
            .iter()
            .filter_map(|s| s.comfort_level())
            .map(u32::from)
            .collect();
        if levels.is_empty() {
            return 0;
        }
        levels.iter().sum::<u32>() / levels.len() as u32
    }

    /// Canonical save-file block: a header line followed by one line per
    /// sensor. Sensors carry an `@weight` suffix under a weighting evaluator.
    pub fn encode(&self) -> String {
        let mut header = format!(
            "{}:{}:{:.2}:{}",
            self.number,
            self.room_type,
            self.area,
            self.sensors.len()
        );
        if let Some(evaluator) = &self.evaluator {
            header.push(':');
            header.push_str(evaluator.kind().as_str());
        }
        let weighting = self
            .evaluator
            .as_ref()
            .filter(|e| e.kind() == EvaluatorKind::WeightingBased);
        let mut lines = vec![header];
        for sensor in &self.sensors {
            lines.push(match weighting {
                Some(evaluator) => format!(
                    "{}@{}",
                    sensor.encode(),
                    evaluator.weight_for(sensor.sensor_type()).unwrap_or(0)
                ),
                None => sensor.encode(),
            });
        }
        lines.join("\n")
    }
}

impl PartialEq for Room {
    /// Value equality: number, type, area within tolerance, and sensor set.
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
            && self.room_type == other.room_type
            && (self.area - other.area).abs() <= DIMENSION_TOLERANCE
            && self.sensors == other.sensors
    }
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Room #{}: type={}, area={:.2}m^2, sensors={}",
            self.number,
            self.room_type,
            self.area,
            self.sensors.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn study() -> Room {
        Room::new(101, RoomType::Study, 20.0)
    }

    #[test]
    fn test_new_room_is_open() {
        let room = study();
        assert_eq!(room.evaluate_state(), RoomState::Open);
        assert!(room.sensors().is_empty());
        assert!(room.hazard_evaluator().is_none());
        assert_eq!(room.hazard_level(), None);
    }

    #[test]
    fn test_drill_takes_priority_over_maintenance() {
        let mut room = study();
        room.set_maintenance(true);
        assert_eq!(room.evaluate_state(), RoomState::Maintenance);
        room.set_fire_drill(true);
        assert_eq!(room.evaluate_state(), RoomState::Evacuate);
        room.set_fire_drill(false);
        assert_eq!(room.evaluate_state(), RoomState::Maintenance);
    }

    #[test]
    fn test_extreme_temperature_forces_evacuation() {
        let mut room = study();
        room.add_sensor(Sensor::temperature(vec![70]).unwrap())
            .unwrap();
        room.set_maintenance(true);
        assert_eq!(room.evaluate_state(), RoomState::Evacuate);
    }

    #[test]
    fn test_noise_at_max_does_not_evacuate() {
        let mut room = study();
        room.add_sensor(Sensor::noise(vec![90], 1).unwrap()).unwrap();
        assert_eq!(room.evaluate_state(), RoomState::Open);
    }

    #[test]
    fn test_rejects_second_sensor_of_same_type() {
        let mut room = study();
        room.add_sensor(Sensor::noise(vec![50], 1).unwrap()).unwrap();
        let err = room
            .add_sensor(Sensor::noise(vec![60], 2).unwrap())
            .unwrap_err();
        assert_eq!(err, BuildingError::DuplicateSensor(SensorType::Noise));
        assert_eq!(room.sensors().len(), 1);
    }

    #[test]
    fn test_sensors_are_kept_in_type_order() {
        let mut room = study();
        room.add_sensor(Sensor::temperature(vec![20]).unwrap())
            .unwrap();
        room.add_sensor(Sensor::carbon_dioxide(vec![700], 1, 600, 300).unwrap())
            .unwrap();
        room.add_sensor(Sensor::noise(vec![40], 1).unwrap()).unwrap();
        let order: Vec<_> = room.sensors().iter().map(|s| s.sensor_type()).collect();
        assert_eq!(
            order,
            vec![
                SensorType::CarbonDioxide,
                SensorType::Noise,
                SensorType::Temperature
            ]
        );
    }

    #[test]
    fn test_adding_sensor_resets_evaluator() {
        let mut room = study();
        room.add_sensor(Sensor::noise(vec![50], 1).unwrap()).unwrap();
        room.set_hazard_evaluator(HazardEvaluator::rule_based([SensorType::Noise]))
            .unwrap();
        assert!(room.hazard_evaluator().is_some());
        room.add_sensor(Sensor::temperature(vec![20]).unwrap())
            .unwrap();
        assert!(room.hazard_evaluator().is_none());
    }

    #[test]
    fn test_evaluator_must_read_attached_sensors() {
        let mut room = study();
        let err = room
            .set_hazard_evaluator(HazardEvaluator::rule_based([SensorType::Noise]))
            .unwrap_err();
        assert!(matches!(err, BuildingError::InvalidArgument(_)));
    }

    #[test]
    fn test_validate_rejects_duplicate_sensor_types() {
        let mut room = study();
        room.add_sensor(Sensor::noise(vec![50], 1).unwrap()).unwrap();
        room.validate().unwrap();
        room.sensors.push(Sensor::noise(vec![60], 1).unwrap());
        assert_eq!(
            room.validate(),
            Err(BuildingError::DuplicateSensor(SensorType::Noise))
        );
    }

    #[test]
    fn test_validate_rejects_evaluator_without_its_sensors() {
        let mut room = study();
        room.evaluator = Some(HazardEvaluator::rule_based([SensorType::Temperature]));
        assert!(matches!(room.validate(), Err(BuildingError::InvalidArgument(_))));
    }

    #[test]
    fn test_hazard_level_uses_current_readings() {
        let mut room = study();
        room.add_sensor(Sensor::noise(vec![60], 1).unwrap()).unwrap();
        room.set_hazard_evaluator(HazardEvaluator::rule_based([SensorType::Noise]))
            .unwrap();
        assert_eq!(room.hazard_level(), Some(50));
    }

    #[test]
    fn test_comfort_averages_comfort_sensors_only() {
        let mut room = study();
        room.add_sensor(Sensor::occupancy(vec![6], 1, 20).unwrap())
            .unwrap();
        room.add_sensor(Sensor::carbon_dioxide(vec![750], 1, 600, 300).unwrap())
            .unwrap();
        room.add_sensor(Sensor::noise(vec![40], 1).unwrap()).unwrap();
        // occupancy 70, co2 50
        assert_eq!(room.comfort_level(), 60);
    }

    #[test]
    fn test_encodes_weights_per_sensor() {
        let mut room = Room::new(301, RoomType::Laboratory, 30.0);
        room.add_sensor(Sensor::noise(vec![55, 62], 3).unwrap())
            .unwrap();
        room.add_sensor(Sensor::temperature(vec![28, 29]).unwrap())
            .unwrap();
        room.set_hazard_evaluator(
            HazardEvaluator::weighting_based([
                (SensorType::Noise, 25),
                (SensorType::Temperature, 75),
            ])
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            room.encode(),
            "301:LABORATORY:30.00:2:WeightingBased\n\
             NoiseSensor:55,62:3@25\n\
             TemperatureSensor:28,29@75"
        );
    }

    #[test]
    fn test_equality_ignores_flags_and_tiny_area_drift() {
        let a = study();
        let mut b = Room::new(101, RoomType::Study, 20.0005);
        b.set_fire_drill(true);
        assert_eq!(a, b);
        assert_ne!(a, Room::new(101, RoomType::Office, 20.0));
    }

    #[test]
    fn test_display_summarises_room() {
        assert_eq!(
            study().to_string(),
            "Room #101: type=STUDY, area=20.00m^2, sensors=0"
        );
    }
}
