//! Building management logic.
//!
//! Models buildings as a floor → room containment hierarchy, derives each
//! room's operational state from its hazard sensors and drill/maintenance
//! flags, and rotates maintenance across a floor's rooms on a simulated
//! minute clock. Everything is plain single-threaded data: no I/O beyond the
//! readers and writers handed to the persistence functions.
//!
//! # Module Overview
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`building`] | Floor stack and inter-floor footprint containment |
//! | [`clock`] | Minute clock over registered tick-consumers |
//! | [`constants`] | Minimum dimensions, maintenance timing, sensor thresholds |
//! | [`error`] | `BuildingError` validation failures |
//! | [`floor`] | Room capacity, fire drills, the floor's maintenance schedule |
//! | [`hazard`] | Rule-based and weighting-based hazard evaluators |
//! | [`initialiser`] | Line-oriented save-file loading and writing |
//! | [`maintenance`] | Round-robin maintenance rotation and required minutes |
//! | [`persistence`] | Versioned bincode snapshots |
//! | [`recommender`] | Most comfortable open study room in a building |
//! | [`room`] | Room types, sensors, and the room state machine |
//! | [`sensors`] | Hazard sensor contract and the concrete sensor kinds |

pub mod building;
pub mod clock;
pub mod constants;
pub mod error;
pub mod floor;
pub mod hazard;
pub mod initialiser;
pub mod maintenance;
pub mod persistence;
pub mod recommender;
pub mod room;
pub mod sensors;

pub use building::Building;
pub use clock::{ConsumerId, SimulationClock, TickFault, TickReport, TickTarget};
pub use error::{BuildingError, Result};
pub use floor::Floor;
pub use hazard::{EvaluatorKind, HazardEvaluator};
pub use maintenance::MaintenanceSchedule;
pub use room::{Room, RoomState, RoomType};
pub use sensors::{HazardSensor, Sensor, SensorKind, SensorType};
