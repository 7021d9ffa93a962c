//! Binary snapshots of a set of buildings.
//!
//! Uses bincode over the serde representation of the whole hierarchy,
//! including transient room flags and each schedule's rotation position.
//! The simulation clock is not part of a snapshot: after loading, the driver
//! registers the restored schedules with its own clock through
//! [`Building::register_schedules`].
//!
//! A snapshot is untrusted input. Every restored building is re-checked
//! against the hierarchy rules before it is handed back.

use std::io::{Read, Write};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::building::Building;
use crate::error::BuildingError;

/// Snapshot format version (increment when the layout changes)
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct SnapshotData {
    version: u32,
    buildings: Vec<Building>,
}

/// Errors that can occur while saving or loading a snapshot
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),

    #[error("snapshot version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },

    #[error("snapshot holds an invalid building: {0}")]
    Invalid(#[from] BuildingError),
}

/// Save `buildings` to a writer
pub fn save_snapshot<W: Write>(writer: W, buildings: &[Building]) -> Result<(), SnapshotError> {
    let data = SnapshotData {
        version: SNAPSHOT_VERSION,
        buildings: buildings.to_vec(),
    };
    bincode::serialize_into(writer, &data)?;
    Ok(())
}

/// Load buildings from a reader
pub fn load_snapshot<R: Read>(reader: R) -> Result<Vec<Building>, SnapshotError> {
    let data: SnapshotData = bincode::deserialize_from(reader)?;

    if data.version != SNAPSHOT_VERSION {
        return Err(SnapshotError::VersionMismatch {
            expected: SNAPSHOT_VERSION,
            found: data.version,
        });
    }

    for building in &data.buildings {
        building.validate()?;
    }
    Ok(data.buildings)
}
