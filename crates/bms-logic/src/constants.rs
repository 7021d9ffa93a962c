//! Domain constants: minimum dimensions, maintenance timing and sensor thresholds.
//!
//! Plain `const` values with no runtime configuration. Both the library and
//! the headless harness read these.

/// Smallest width a floor may have, in metres.
pub const MIN_FLOOR_WIDTH: f64 = 5.0;

/// Smallest length a floor may have, in metres.
pub const MIN_FLOOR_LENGTH: f64 = 5.0;

/// Smallest area a room may have, in square metres.
pub const MIN_ROOM_AREA: f64 = 5.0;

/// Two dimensions closer than this are considered equal.
pub const DIMENSION_TOLERANCE: f64 = 0.001;

/// Highest hazard level any sensor or evaluator reports.
pub const MAX_HAZARD_LEVEL: u8 = 100;

pub mod maintenance {
    /// Minutes needed to service a room of minimum area.
    pub const BASE_MINUTES: f64 = 5.0;
    /// Extra minutes per square metre above the minimum room area.
    pub const MINUTES_PER_EXTRA_AREA: f64 = 0.2;

    pub const STUDY_FACTOR: f64 = 1.0;
    pub const OFFICE_FACTOR: f64 = 1.5;
    /// Applied to every category without its own factor.
    pub const DEFAULT_FACTOR: f64 = 2.0;
}

pub mod sensors {
    pub const MIN_UPDATE_FREQUENCY: u32 = 1;
    pub const MAX_UPDATE_FREQUENCY: u32 = 5;

    /// Temperature (°C) at which sprinklers activate.
    pub const SPRINKLER_TEMPERATURE: i32 = 68;

    /// Reference loudness (dB) for relative noise hazard.
    pub const NOISE_REFERENCE_DB: f64 = 70.0;

    // CO2 concentration bands (ppm) and the hazard level reported below each.
    pub const CO2_NO_EFFECT_PPM: i32 = 1000;
    pub const CO2_DROWSY_PPM: i32 = 2000;
    pub const CO2_HEADACHE_PPM: i32 = 5000;
    pub const CO2_DROWSY_HAZARD: u8 = 25;
    pub const CO2_HEADACHE_HAZARD: u8 = 50;
}
