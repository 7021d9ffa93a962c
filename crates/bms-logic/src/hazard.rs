//! Hazard evaluation strategies that combine a room's sensor readings into one score.
//!
//! An evaluator is bound to sensor *types*, not sensor instances. It resolves
//! them against whatever sensors it is handed at evaluation time, so the
//! score always reflects current readings and nothing is cached.
//!
//! Two strategies exist:
//!
//! - [`HazardEvaluator::RuleBased`]: a unit count of non-occupancy sensors
//!   relative to all bound sensors, optionally scaled by occupancy. Any
//!   non-occupancy sensor at 100 short-circuits to 100.
//! - [`HazardEvaluator::WeightingBased`]: the weighted mean of the bound
//!   sensors' levels, rounded to the nearest integer.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::constants::MAX_HAZARD_LEVEL;
use crate::error::{BuildingError, Result};
use crate::sensors::{HazardSensor, SensorType};

/// Discriminator surfaced to the save-file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EvaluatorKind {
    RuleBased,
    WeightingBased,
}

impl EvaluatorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvaluatorKind::RuleBased => "RuleBased",
            EvaluatorKind::WeightingBased => "WeightingBased",
        }
    }
}

impl fmt::Display for EvaluatorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A hazard evaluation strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HazardEvaluator {
    RuleBased { sensors: BTreeSet<SensorType> },
    WeightingBased { weights: BTreeMap<SensorType, u32> },
}

impl HazardEvaluator {
    /// Rule-based evaluator over the given sensor types.
    pub fn rule_based(sensors: impl IntoIterator<Item = SensorType>) -> Self {
        HazardEvaluator::RuleBased {
            sensors: sensors.into_iter().collect(),
        }
    }

    /// Weighting-based evaluator. Every weight must lie in `0..=100`, each
    /// sensor type may appear once, and the weights must sum to exactly 100.
    pub fn weighting_based(weights: impl IntoIterator<Item = (SensorType, u32)>) -> Result<Self> {
        let mut map = BTreeMap::new();
        for (sensor, weight) in weights {
            if weight > 100 {
                return Err(BuildingError::invalid(format!(
                    "weighting for {sensor} must be between 0 and 100, got {weight}"
                )));
            }
            if map.insert(sensor, weight).is_some() {
                return Err(BuildingError::invalid(format!(
                    "{sensor} weighted more than once"
                )));
            }
        }
        let total: u32 = map.values().sum();
        if total != 100 {
            return Err(BuildingError::invalid(format!(
                "weightings must sum to 100, got {total}"
            )));
        }
        Ok(HazardEvaluator::WeightingBased { weights: map })
    }

    /// Re-check the weighting rules on an evaluator that skipped
    /// [`HazardEvaluator::weighting_based`].
    pub(crate) fn validate(&self) -> Result<()> {
        match self {
            HazardEvaluator::RuleBased { .. } => Ok(()),
            HazardEvaluator::WeightingBased { weights } => {
                Self::weighting_based(weights.iter().map(|(t, w)| (*t, *w))).map(|_| ())
            }
        }
    }

    pub fn kind(&self) -> EvaluatorKind {
        match self {
            HazardEvaluator::RuleBased { .. } => EvaluatorKind::RuleBased,
            HazardEvaluator::WeightingBased { .. } => EvaluatorKind::WeightingBased,
        }
    }

    /// Sensor types this evaluator reads.
    pub fn sensor_types(&self) -> Vec<SensorType> {
        match self {
            HazardEvaluator::RuleBased { sensors } => sensors.iter().copied().collect(),
            HazardEvaluator::WeightingBased { weights } => weights.keys().copied().collect(),
        }
    }

    /// Weight assigned to `sensor`, if this is a weighting-based evaluator
    /// that reads it.
    pub fn weight_for(&self, sensor: SensorType) -> Option<u32> {
        match self {
            HazardEvaluator::RuleBased { .. } => None,
            HazardEvaluator::WeightingBased { weights } => weights.get(&sensor).copied(),
        }
    }

    /// Evaluate the hazard level from the current readings of `sensors`.
    ///
    /// Bound types missing from `sensors` are ignored.
    pub fn evaluate<S: HazardSensor>(&self, sensors: &[S]) -> u8 {
        match self {
            HazardEvaluator::RuleBased { sensors: bound } => {
                let resolved: Vec<&S> = sensors
                    .iter()
                    .filter(|s| bound.contains(&s.sensor_type()))
                    .collect();
                rule_based_level(&resolved)
            }
            HazardEvaluator::WeightingBased { weights } => {
                let mut total = 0u32;
                let mut divisor = 0u32;
                for sensor in sensors {
                    if let Some(weight) = weights.get(&sensor.sensor_type()) {
                        total += u32::from(sensor.hazard_level()) * weight;
                        divisor += weight;
                    }
                }
                if divisor == 0 {
                    return 0;
                }
                (f64::from(total) / f64::from(divisor)).round() as u8
            }
        }
    }
}

// Truncating integer division is deliberate: with an occupancy sensor
// present the unit ratio is always below 1 and collapses to 0, and any
// occupancy below 100 also collapses to 0.
fn rule_based_level<S: HazardSensor>(sensors: &[&S]) -> u8 {
    match sensors {
        [] => 0,
        [only] => only.hazard_level(),
        _ => {
            let mut accumulated = 0u32;
            let mut occupancy = 0u32;
            for sensor in sensors {
                let level = sensor.hazard_level();
                if sensor.sensor_type() == SensorType::Occupancy {
                    occupancy = u32::from(level);
                } else {
                    if level == MAX_HAZARD_LEVEL {
                        return MAX_HAZARD_LEVEL;
                    }
                    accumulated += 1;
                }
            }
            let ratio = accumulated / sensors.len() as u32;
            let level = if occupancy != 0 {
                ratio * (occupancy / 100)
            } else {
                ratio
            };
            level as u8
        }
    }
}

impl fmt::Display for HazardEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind().as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(SensorType, u8);

    impl HazardSensor for Fixed {
        fn hazard_level(&self) -> u8 {
            self.1
        }
        fn sensor_type(&self) -> SensorType {
            self.0
        }
    }

    #[test]
    fn test_rule_based_without_sensors_is_zero() {
        let eval = HazardEvaluator::rule_based(Vec::new());
        assert_eq!(eval.evaluate::<Fixed>(&[]), 0);
    }

    #[test]
    fn test_rule_based_single_sensor_passes_through() {
        let eval = HazardEvaluator::rule_based([SensorType::Noise]);
        assert_eq!(eval.evaluate(&[Fixed(SensorType::Noise, 42)]), 42);
    }

    #[test]
    fn test_rule_based_short_circuits_on_max_level() {
        let eval = HazardEvaluator::rule_based([SensorType::Noise, SensorType::Temperature]);
        let sensors = [
            Fixed(SensorType::Noise, 10),
            Fixed(SensorType::Temperature, 100),
        ];
        assert_eq!(eval.evaluate(&sensors), 100);
    }

    #[test]
    fn test_rule_based_counts_units_without_occupancy() {
        let eval = HazardEvaluator::rule_based([SensorType::Noise, SensorType::Temperature]);
        let sensors = [
            Fixed(SensorType::Noise, 10),
            Fixed(SensorType::Temperature, 40),
        ];
        assert_eq!(eval.evaluate(&sensors), 1);
    }

    #[test]
    fn test_rule_based_occupancy_scaling_truncates_to_zero() {
        // 1 / 2 truncates to 0 before occupancy is even applied.
        let eval = HazardEvaluator::rule_based([SensorType::Noise, SensorType::Occupancy]);
        let sensors = [
            Fixed(SensorType::Noise, 10),
            Fixed(SensorType::Occupancy, 100),
        ];
        assert_eq!(eval.evaluate(&sensors), 0);
    }

    #[test]
    fn test_rule_based_occupancy_does_not_short_circuit() {
        let eval = HazardEvaluator::rule_based([SensorType::Noise, SensorType::Occupancy]);
        let sensors = [
            Fixed(SensorType::Occupancy, 100),
            Fixed(SensorType::Noise, 20),
        ];
        assert_eq!(eval.evaluate(&sensors), 0);
    }

    #[test]
    fn test_weighting_based_rounds_weighted_mean() {
        let eval = HazardEvaluator::weighting_based([
            (SensorType::Noise, 25),
            (SensorType::Temperature, 75),
        ])
        .unwrap();
        let sensors = [
            Fixed(SensorType::Noise, 80),
            Fixed(SensorType::Temperature, 40),
        ];
        assert_eq!(eval.evaluate(&sensors), 50);
    }

    #[test]
    fn test_weighting_based_rounds_half_up() {
        let eval = HazardEvaluator::weighting_based([
            (SensorType::Noise, 50),
            (SensorType::Temperature, 50),
        ])
        .unwrap();
        let sensors = [
            Fixed(SensorType::Noise, 1),
            Fixed(SensorType::Temperature, 0),
        ];
        assert_eq!(eval.evaluate(&sensors), 1);
    }

    #[test]
    fn test_weighting_based_rejects_bad_weights() {
        let over = HazardEvaluator::weighting_based([
            (SensorType::Noise, 50),
            (SensorType::Temperature, 60),
        ]);
        assert!(matches!(over, Err(BuildingError::InvalidArgument(_))));

        let out_of_range = HazardEvaluator::weighting_based([(SensorType::Noise, 101)]);
        assert!(matches!(out_of_range, Err(BuildingError::InvalidArgument(_))));

        let empty = HazardEvaluator::weighting_based(Vec::new());
        assert!(matches!(empty, Err(BuildingError::InvalidArgument(_))));
    }

    #[test]
    fn test_weighting_based_rejects_repeated_sensor() {
        let repeated = HazardEvaluator::weighting_based([
            (SensorType::Noise, 50),
            (SensorType::Noise, 50),
        ]);
        assert!(matches!(repeated, Err(BuildingError::InvalidArgument(_))));
    }

    #[test]
    fn test_validate_rechecks_weight_total() {
        let weighted = HazardEvaluator::weighting_based([(SensorType::Noise, 100)]).unwrap();
        weighted.validate().unwrap();
        let lopsided = HazardEvaluator::WeightingBased {
            weights: BTreeMap::from([(SensorType::Noise, 30)]),
        };
        assert!(matches!(
            lopsided.validate(),
            Err(BuildingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_reports_discriminator() {
        assert_eq!(HazardEvaluator::rule_based(Vec::new()).to_string(), "RuleBased");
        let weighted = HazardEvaluator::weighting_based([(SensorType::Noise, 100)]).unwrap();
        assert_eq!(weighted.to_string(), "WeightingBased");
        assert_eq!(weighted.weight_for(SensorType::Noise), Some(100));
        assert_eq!(weighted.weight_for(SensorType::Temperature), None);
    }
}
