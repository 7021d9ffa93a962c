//! Validation errors raised by the building hierarchy.

use thiserror::Error;

use crate::sensors::SensorType;

/// Result type for hierarchy operations.
pub type Result<T> = std::result::Result<T, BuildingError>;

/// Every way a construction or mutation request can be rejected.
///
/// All variants are local validation failures: nothing is retried and no
/// field has been changed when one is returned.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildingError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("floor {0} already exists in the building")]
    DuplicateFloor(u32),

    #[error("room {0} is already taken on this floor")]
    DuplicateRoom(u32),

    #[error("there is no floor below floor {0} to support it")]
    NoFloorBelow(u32),

    #[error("floor too small: {0}")]
    FloorTooSmall(String),

    #[error(
        "insufficient space to add room: floor area {footprint:.2}m^2, \
         occupied area {occupied:.2}m^2, this room {requested:.2}m^2"
    )]
    InsufficientSpace {
        footprint: f64,
        occupied: f64,
        requested: f64,
    },

    #[error("cannot conduct fire drill: {0}")]
    NoRoomsAvailable(String),

    #[error("duplicate sensor of type {0}")]
    DuplicateSensor(SensorType),
}

impl BuildingError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        BuildingError::InvalidArgument(message.into())
    }
}
