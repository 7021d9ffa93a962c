//! Round-robin maintenance rotation over a floor's rooms.
//!
//! A schedule belongs to exactly one [`Floor`](crate::floor::Floor) and refers
//! to that floor's rooms by room number. The floor drives it: the clock asks
//! the floor to tick, and the floor lends its rooms to the schedule for the
//! duration of the tick.
//!
//! Each minute the current room accrues one minute of maintenance unless it
//! is being evacuated. Once it has received its [`required_minutes`], the
//! maintenance flag moves on to the next room in the order, wrapping around.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::{ConsumerId, TickFault};
use crate::constants::{maintenance as timing, MIN_ROOM_AREA};
use crate::error::{BuildingError, Result};
use crate::room::{Room, RoomState, RoomType};

/// Minutes of maintenance a room needs per rotation.
///
/// `round(base * factor)` where the base grows by 0.2 minutes per square
/// metre above the minimum room area.
pub fn required_minutes(room: &Room) -> u32 {
    let mut base = timing::BASE_MINUTES;
    if room.area() > MIN_ROOM_AREA {
        base += timing::MINUTES_PER_EXTRA_AREA * (room.area() - MIN_ROOM_AREA);
    }
    let factor = match room.room_type() {
        RoomType::Study => timing::STUDY_FACTOR,
        RoomType::Office => timing::OFFICE_FACTOR,
        _ => timing::DEFAULT_FACTOR,
    };
    (base * factor).round() as u32
}

/// Check a proposed room order against the rooms of the owning floor.
///
/// The order must be non-empty, name only rooms on the floor, and never
/// repeat a room in adjacent positions (first and last count as adjacent).
pub(crate) fn validate_order(order: &[u32], rooms: &[Room]) -> Result<()> {
    if order.is_empty() {
        return Err(BuildingError::invalid("maintenance order cannot be empty"));
    }
    if let Some(stranger) = order
        .iter()
        .find(|n| !rooms.iter().any(|r| r.number() == **n))
    {
        return Err(BuildingError::invalid(format!(
            "room {stranger} is not on this floor"
        )));
    }
    if order.len() > 1 {
        for (i, room) in order.iter().enumerate() {
            let next = order[(i + 1) % order.len()];
            if *room == next {
                return Err(BuildingError::invalid(format!(
                    "room {room} is scheduled twice in a row"
                )));
            }
        }
    }
    Ok(())
}

fn index_of(rooms: &[Room], number: u32) -> std::result::Result<usize, TickFault> {
    rooms
        .iter()
        .position(|r| r.number() == number)
        .ok_or(TickFault::MissingRoom { room: number })
}

/// Round-robin maintenance rotation for one floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceSchedule {
    /// Clock registration. Never persisted: a restored schedule stays idle
    /// until its building is registered with a clock.
    #[serde(skip)]
    id: Option<ConsumerId>,
    room_order: Vec<u32>,
    current_index: usize,
    minutes_elapsed: u32,
}

impl MaintenanceSchedule {
    /// Start a validated rotation, flagging the first room for maintenance.
    pub(crate) fn start(id: Option<ConsumerId>, room_order: Vec<u32>, rooms: &mut [Room]) -> Result<Self> {
        let first = room_order
            .first()
            .copied()
            .ok_or_else(|| BuildingError::invalid("maintenance order cannot be empty"))?;
        let index = index_of(rooms, first)
            .map_err(|_| BuildingError::invalid(format!("room {first} is not on this floor")))?;
        rooms[index].set_maintenance(true);
        Ok(Self {
            id,
            room_order,
            current_index: 0,
            minutes_elapsed: 0,
        })
    }

    /// Clock registration, or `None` while the schedule is unregistered.
    pub fn id(&self) -> Option<ConsumerId> {
        self.id
    }

    pub(crate) fn bind(&mut self, id: ConsumerId) {
        self.id = Some(id);
    }

    /// Check the stored order and rotation position against `rooms`.
    pub(crate) fn validate(&self, rooms: &[Room]) -> Result<()> {
        validate_order(&self.room_order, rooms)?;
        if self.current_index >= self.room_order.len() {
            return Err(BuildingError::invalid(format!(
                "rotation position {} is outside an order of {} rooms",
                self.current_index,
                self.room_order.len()
            )));
        }
        Ok(())
    }

    /// Room numbers in rotation order.
    pub fn room_order(&self) -> &[u32] {
        &self.room_order
    }

    /// Number of the room currently under maintenance.
    pub fn current_room(&self) -> u32 {
        self.room_order[self.current_index]
    }

    /// Minutes the current room has been under maintenance.
    pub fn minutes_elapsed(&self) -> u32 {
        self.minutes_elapsed
    }

    /// Clear the maintenance flag on the current room. Used when the
    /// schedule is being replaced.
    pub(crate) fn release(&self, rooms: &mut [Room]) {
        if let Ok(index) = index_of(rooms, self.current_room()) {
            rooms[index].set_maintenance(false);
        }
    }

    /// Advance one minute. Nothing happens while the current room evacuates.
    pub(crate) fn per_minute_tick(&mut self, rooms: &mut [Room]) -> std::result::Result<(), TickFault> {
        let current = index_of(rooms, self.current_room())?;
        if rooms[current].evaluate_state() == RoomState::Evacuate {
            return Ok(());
        }
        self.minutes_elapsed += 1;
        if self.minutes_elapsed >= required_minutes(&rooms[current]) {
            self.rotate(rooms)?;
        }
        Ok(())
    }

    /// Move straight to the next room, regardless of evacuation.
    pub(crate) fn skip_current_maintenance(
        &mut self,
        rooms: &mut [Room],
    ) -> std::result::Result<(), TickFault> {
        self.rotate(rooms)
    }

    fn rotate(&mut self, rooms: &mut [Room]) -> std::result::Result<(), TickFault> {
        let next_index = (self.current_index + 1) % self.room_order.len();
        // Resolve both rooms before touching either flag.
        let current = index_of(rooms, self.current_room())?;
        let next = index_of(rooms, self.room_order[next_index])?;

        rooms[current].set_maintenance(false);
        self.current_index = next_index;
        rooms[next].set_maintenance(true);
        self.minutes_elapsed = 0;
        log::debug!(
            "maintenance moved from room {} to room {}",
            rooms[current].number(),
            rooms[next].number()
        );
        Ok(())
    }

    /// Comma-separated room order, as stored in a floor's save-file header.
    pub fn encode(&self) -> String {
        self.room_order
            .iter()
            .map(|n| n.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for MaintenanceSchedule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MaintenanceSchedule: currentRoom={}, currentElapsed={}",
            self.current_room(),
            self.minutes_elapsed
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SimulationClock;
    use crate::floor::Floor;

    /// Floor with a study (10m²), an office (5m²) and a lab (10m²) rotating
    /// in that order.
    fn scheduled_floor(clock: &mut SimulationClock) -> Floor {
        let mut floor = Floor::new(1, 10.0, 10.0);
        floor.add_room(Room::new(101, RoomType::Study, 10.0)).unwrap();
        floor.add_room(Room::new(102, RoomType::Office, 5.0)).unwrap();
        floor
            .add_room(Room::new(103, RoomType::Laboratory, 10.0))
            .unwrap();
        floor
            .create_maintenance_schedule(&[101, 102, 103], clock)
            .unwrap();
        floor
    }

    fn schedule(floor: &Floor) -> &MaintenanceSchedule {
        floor.maintenance_schedule().unwrap()
    }

    #[test]
    fn test_required_minutes_by_type() {
        assert_eq!(required_minutes(&Room::new(1, RoomType::Study, 10.0)), 6);
        assert_eq!(required_minutes(&Room::new(2, RoomType::Office, 5.0)), 8);
        assert_eq!(
            required_minutes(&Room::new(3, RoomType::Laboratory, 10.0)),
            12
        );
    }

    #[test]
    fn test_starts_on_first_room() {
        let mut clock = SimulationClock::new();
        let floor = scheduled_floor(&mut clock);
        assert_eq!(schedule(&floor).current_room(), 101);
        assert_eq!(schedule(&floor).minutes_elapsed(), 0);
        assert!(floor.room(101).unwrap().maintenance_ongoing());
        assert!(!floor.room(102).unwrap().maintenance_ongoing());
    }

    #[test]
    fn test_tick_accrues_minutes() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        floor.tick_maintenance().unwrap();
        assert_eq!(schedule(&floor).minutes_elapsed(), 1);
        assert_eq!(schedule(&floor).current_room(), 101);
    }

    #[test]
    fn test_rotates_after_required_minutes() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        for _ in 0..6 {
            floor.tick_maintenance().unwrap();
        }
        assert_eq!(schedule(&floor).current_room(), 102);
        assert_eq!(schedule(&floor).minutes_elapsed(), 0);
        assert!(!floor.room(101).unwrap().maintenance_ongoing());
        assert!(floor.room(102).unwrap().maintenance_ongoing());
    }

    #[test]
    fn test_wraps_after_last_room() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        for _ in 0..(6 + 8 + 12) {
            floor.tick_maintenance().unwrap();
        }
        assert_eq!(schedule(&floor).current_room(), 101);
        assert!(floor.room(101).unwrap().maintenance_ongoing());
        assert!(!floor.room(103).unwrap().maintenance_ongoing());
    }

    #[test]
    fn test_evacuation_freezes_rotation() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        floor.tick_maintenance().unwrap();
        floor.room_mut(101).unwrap().set_fire_drill(true);
        floor.tick_maintenance().unwrap();
        assert_eq!(schedule(&floor).minutes_elapsed(), 1);
    }

    #[test]
    fn test_skip_ignores_evacuation() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        floor.room_mut(101).unwrap().set_fire_drill(true);
        floor.skip_current_maintenance().unwrap();
        assert_eq!(schedule(&floor).current_room(), 102);
    }

    #[test]
    fn test_skip_wraps_around() {
        let mut clock = SimulationClock::new();
        let mut floor = scheduled_floor(&mut clock);
        for _ in 0..3 {
            floor.skip_current_maintenance().unwrap();
        }
        assert_eq!(schedule(&floor).current_room(), 101);
    }

    #[test]
    fn test_rejects_bad_orders() {
        let rooms = vec![
            Room::new(1, RoomType::Study, 10.0),
            Room::new(2, RoomType::Office, 10.0),
        ];
        assert!(validate_order(&[], &rooms).is_err());
        assert!(validate_order(&[1, 9], &rooms).is_err());
        assert!(validate_order(&[1, 1, 2], &rooms).is_err());
        // first and last are adjacent
        assert!(validate_order(&[1, 2, 1], &rooms).is_err());
        assert!(validate_order(&[1], &rooms).is_ok());
        assert!(validate_order(&[1, 2, 1, 2], &rooms).is_ok());
    }

    #[test]
    fn test_validate_rejects_position_outside_order() {
        let mut clock = SimulationClock::new();
        let floor = scheduled_floor(&mut clock);
        let mut broken = schedule(&floor).clone();
        broken.validate(floor.rooms()).unwrap();

        broken.current_index = 3;
        assert!(matches!(
            broken.validate(floor.rooms()),
            Err(BuildingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_overdue_room_rotates_on_next_tick() {
        let mut clock = SimulationClock::new();
        let floor = scheduled_floor(&mut clock);
        let mut rooms = floor.rooms().to_vec();
        let mut overdue = schedule(&floor).clone();
        overdue.minutes_elapsed = 40;

        overdue.per_minute_tick(&mut rooms).unwrap();

        assert_eq!(overdue.current_room(), 102);
        assert_eq!(overdue.minutes_elapsed(), 0);
        assert!(rooms[1].maintenance_ongoing());
    }

    #[test]
    fn test_display_and_encode() {
        let mut clock = SimulationClock::new();
        let floor = scheduled_floor(&mut clock);
        assert_eq!(
            schedule(&floor).to_string(),
            "MaintenanceSchedule: currentRoom=101, currentElapsed=0"
        );
        assert_eq!(schedule(&floor).encode(), "101,102,103");
    }
}
