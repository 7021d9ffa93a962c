//! Study room recommendation.

use crate::building::Building;
use crate::floor::Floor;
use crate::room::{Room, RoomState, RoomType};

/// Most comfortable open study room on `floor`; the first room wins ties.
fn best_room_on_floor(floor: &Floor) -> Option<&Room> {
    floor
        .rooms()
        .iter()
        .filter(|room| room.evaluate_state() == RoomState::Open)
        .filter(|room| room.room_type() == RoomType::Study)
        .fold(None, |best: Option<&Room>, room| match best {
            Some(current) if room.comfort_level() <= current.comfort_level() => Some(current),
            _ => Some(room),
        })
}

/// Recommend the most comfortable open study room in `building`.
///
/// A floor's best room only replaces the running pick when it is strictly
/// more comfortable, starting from a comfort of 0. Rooms with no comfort
/// sensors therefore never get recommended.
pub fn recommend_study_room(building: &Building) -> Option<&Room> {
    let mut best: Option<&Room> = None;
    for floor in building.floors() {
        let Some(candidate) = best_room_on_floor(floor) else {
            continue;
        };
        let best_comfort = best.map_or(0, Room::comfort_level);
        if candidate.comfort_level() > best_comfort {
            best = Some(candidate);
        }
    }
    best
}
