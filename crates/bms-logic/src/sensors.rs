//! Room sensors: the hazard-reading providers consumed by rooms and evaluators.
//!
//! The rest of the crate only depends on the [`HazardSensor`] contract: a
//! hazard level in `[0, 100]` and a stable type identifier. [`Sensor`] is the
//! concrete provider used by the save-file format; its variants form a closed
//! set, so dispatch is a `match` on [`SensorKind`] rather than a type-name
//! comparison.
//!
//! A sensor's current reading is the head of its readings buffer. Cycling the
//! buffer over time belongs to the sensor hardware, not to this crate.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::constants::{sensors as limits, MAX_HAZARD_LEVEL};
use crate::error::{BuildingError, Result};

/// Read-only capability every hazard provider offers.
pub trait HazardSensor {
    /// Current hazard level, `0..=100`.
    fn hazard_level(&self) -> u8;
    /// Identifier shared by every sensor of the same type.
    fn sensor_type(&self) -> SensorType;
}

/// Sensor categories. A room holds at most one sensor per category.
///
/// Ordering follows the alphabetical order of the type identifiers, which is
/// the order rooms list their sensors in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SensorType {
    CarbonDioxide,
    Noise,
    Occupancy,
    Temperature,
}

impl SensorType {
    pub const ALL: [SensorType; 4] = [
        SensorType::CarbonDioxide,
        SensorType::Noise,
        SensorType::Occupancy,
        SensorType::Temperature,
    ];

    /// Stable identifier used in save files and log output.
    pub fn id(&self) -> &'static str {
        match self {
            SensorType::CarbonDioxide => "CarbonDioxideSensor",
            SensorType::Noise => "NoiseSensor",
            SensorType::Occupancy => "OccupancySensor",
            SensorType::Temperature => "TemperatureSensor",
        }
    }

    /// Whether sensors of this type also report a comfort level.
    pub fn reports_comfort(&self) -> bool {
        matches!(self, SensorType::CarbonDioxide | SensorType::Occupancy)
    }
}

impl fmt::Display for SensorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SensorType {
    type Err = BuildingError;

    fn from_str(s: &str) -> Result<Self> {
        SensorType::ALL
            .into_iter()
            .find(|t| t.id() == s)
            .ok_or_else(|| BuildingError::invalid(format!("unknown sensor type '{s}'")))
    }
}

/// Type-specific calibration carried by a sensor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SensorKind {
    CarbonDioxide {
        update_frequency: u32,
        /// Ideal concentration in ppm.
        ideal_value: i32,
        /// Acceptable deviation from the ideal, in ppm.
        variation_limit: i32,
    },
    Noise {
        update_frequency: u32,
    },
    Occupancy {
        update_frequency: u32,
        /// Maximum number of people the room is rated for.
        capacity: i32,
    },
    Temperature,
}

/// A concrete sensor: a readings buffer plus its type-specific calibration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sensor {
    readings: Vec<i32>,
    kind: SensorKind,
}

impl Sensor {
    /// Temperature sensor; readings in °C.
    pub fn temperature(readings: Vec<i32>) -> Result<Self> {
        Self::build(readings, SensorKind::Temperature)
    }

    /// Noise sensor; readings in dB.
    pub fn noise(readings: Vec<i32>, update_frequency: u32) -> Result<Self> {
        Self::build(readings, SensorKind::Noise { update_frequency })
    }

    /// Occupancy sensor; readings are head counts.
    pub fn occupancy(readings: Vec<i32>, update_frequency: u32, capacity: i32) -> Result<Self> {
        Self::build(
            readings,
            SensorKind::Occupancy {
                update_frequency,
                capacity,
            },
        )
    }

    /// Carbon dioxide sensor; readings in ppm.
    pub fn carbon_dioxide(
        readings: Vec<i32>,
        update_frequency: u32,
        ideal_value: i32,
        variation_limit: i32,
    ) -> Result<Self> {
        Self::build(
            readings,
            SensorKind::CarbonDioxide {
                update_frequency,
                ideal_value,
                variation_limit,
            },
        )
    }

    fn build(readings: Vec<i32>, kind: SensorKind) -> Result<Self> {
        check(&readings, &kind)?;
        Ok(Self { readings, kind })
    }

    /// Re-run the construction checks, for sensors that were deserialized.
    pub(crate) fn validate(&self) -> Result<()> {
        check(&self.readings, &self.kind)
    }

    pub fn kind(&self) -> &SensorKind {
        &self.kind
    }

    pub fn readings(&self) -> &[i32] {
        &self.readings
    }

    /// Reading at the head of the buffer.
    pub fn current_reading(&self) -> i32 {
        // Construction guarantees a non-empty buffer.
        self.readings.first().copied().unwrap_or_default()
    }

    /// Comfort level in `0..=100` for sensor types that report one.
    pub fn comfort_level(&self) -> Option<u8> {
        let reading = i64::from(self.current_reading());
        let comfort = match self.kind {
            SensorKind::CarbonDioxide {
                ideal_value,
                variation_limit,
                ..
            } => {
                let deviation = (reading - i64::from(ideal_value)).abs();
                100 - deviation * 100 / i64::from(variation_limit)
            }
            SensorKind::Occupancy { capacity, .. } => 100 - reading * 100 / i64::from(capacity),
            SensorKind::Noise { .. } | SensorKind::Temperature => return None,
        };
        Some(comfort.clamp(0, 100) as u8)
    }

    /// Canonical save-file line, e.g. `NoiseSensor:55,62,69:3`.
    pub fn encode(&self) -> String {
        let readings = self
            .readings
            .iter()
            .map(|r| r.to_string())
            .collect::<Vec<_>>()
            .join(",");
        let id = self.sensor_type().id();
        match &self.kind {
            SensorKind::CarbonDioxide {
                update_frequency,
                ideal_value,
                variation_limit,
            } => format!("{id}:{readings}:{update_frequency}:{ideal_value}:{variation_limit}"),
            SensorKind::Noise { update_frequency } => format!("{id}:{readings}:{update_frequency}"),
            SensorKind::Occupancy {
                update_frequency,
                capacity,
            } => format!("{id}:{readings}:{update_frequency}:{capacity}"),
            SensorKind::Temperature => format!("{id}:{readings}"),
        }
    }
}

/// Construction rules shared by every sensor kind.
fn check(readings: &[i32], kind: &SensorKind) -> Result<()> {
    if readings.is_empty() {
        return Err(BuildingError::invalid("sensor needs at least one reading"));
    }
    if let Some(bad) = readings.iter().find(|r| **r < 0) {
        return Err(BuildingError::invalid(format!(
            "sensor readings cannot be negative, got {bad}"
        )));
    }
    if let Some(freq) = kind.update_frequency() {
        if !(limits::MIN_UPDATE_FREQUENCY..=limits::MAX_UPDATE_FREQUENCY).contains(&freq) {
            return Err(BuildingError::invalid(format!(
                "update frequency must be between {} and {}, got {freq}",
                limits::MIN_UPDATE_FREQUENCY,
                limits::MAX_UPDATE_FREQUENCY
            )));
        }
    }
    match *kind {
        SensorKind::Occupancy { capacity, .. } if capacity < 1 => Err(BuildingError::invalid(
            format!("occupancy capacity must be positive, got {capacity}"),
        )),
        SensorKind::CarbonDioxide {
            ideal_value,
            variation_limit,
            ..
        } => {
            if ideal_value < 1 || variation_limit < 1 {
                return Err(BuildingError::invalid(
                    "CO2 ideal value and variation limit must be positive",
                ));
            }
            if ideal_value - variation_limit < 0 {
                return Err(BuildingError::invalid(format!(
                    "CO2 variation limit {variation_limit} exceeds ideal value {ideal_value}"
                )));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

impl SensorKind {
    fn update_frequency(&self) -> Option<u32> {
        match self {
            SensorKind::CarbonDioxide {
                update_frequency, ..
            }
            | SensorKind::Noise { update_frequency }
            | SensorKind::Occupancy {
                update_frequency, ..
            } => Some(*update_frequency),
            SensorKind::Temperature => None,
        }
    }
}

impl HazardSensor for Sensor {
    fn hazard_level(&self) -> u8 {
        let reading = self.current_reading();
        match self.kind {
            SensorKind::Temperature => {
                if reading >= limits::SPRINKLER_TEMPERATURE {
                    MAX_HAZARD_LEVEL
                } else {
                    (reading * 100 / limits::SPRINKLER_TEMPERATURE) as u8
                }
            }
            SensorKind::Noise { .. } => {
                let relative =
                    2f64.powf((f64::from(reading) - limits::NOISE_REFERENCE_DB) / 10.0);
                (relative * 100.0).min(100.0) as u8
            }
            SensorKind::Occupancy { capacity, .. } => {
                (i64::from(reading) * 100 / i64::from(capacity)).min(100) as u8
            }
            SensorKind::CarbonDioxide { .. } => {
                if reading < limits::CO2_NO_EFFECT_PPM {
                    0
                } else if reading < limits::CO2_DROWSY_PPM {
                    limits::CO2_DROWSY_HAZARD
                } else if reading < limits::CO2_HEADACHE_PPM {
                    limits::CO2_HEADACHE_HAZARD
                } else {
                    MAX_HAZARD_LEVEL
                }
            }
        }
    }

    fn sensor_type(&self) -> SensorType {
        match self.kind {
            SensorKind::CarbonDioxide { .. } => SensorType::CarbonDioxide,
            SensorKind::Noise { .. } => SensorType::Noise,
            SensorKind::Occupancy { .. } => SensorType::Occupancy,
            SensorKind::Temperature => SensorType::Temperature,
        }
    }
}

impl fmt::Display for Sensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: current={}, hazard={}",
            self.sensor_type(),
            self.current_reading(),
            self.hazard_level()
        )
    }
}
