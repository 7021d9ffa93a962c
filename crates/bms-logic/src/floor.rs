//! Floors, their rooms, and the maintenance schedule each floor may own.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::{ConsumerId, SimulationClock, TickFault, TickTarget};
use crate::constants::{DIMENSION_TOLERANCE, MIN_FLOOR_LENGTH, MIN_FLOOR_WIDTH, MIN_ROOM_AREA};
use crate::error::{BuildingError, Result};
use crate::maintenance::{validate_order, MaintenanceSchedule};
use crate::room::{Room, RoomType};

/// One storey of a building.
///
/// Invariant: the summed area of all rooms never exceeds `width * length`.
/// Rooms are only ever appended, so room numbers stay stable keys.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Floor {
    number: u32,
    width: f64,
    length: f64,
    rooms: Vec<Room>,
    maintenance: Option<MaintenanceSchedule>,
}

impl Floor {
    /// Create an empty floor. Dimensions are validated when the floor is
    /// added to a [`Building`](crate::building::Building).
    pub fn new(number: u32, width: f64, length: f64) -> Self {
        Self {
            number,
            width,
            length,
            rooms: Vec::new(),
            maintenance: None,
        }
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn width(&self) -> f64 {
        self.width
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    /// Rooms in insertion order.
    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, number: u32) -> Option<&Room> {
        self.rooms.iter().find(|r| r.number() == number)
    }

    pub fn room_mut(&mut self, number: u32) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.number() == number)
    }

    /// `width * length`: the most room area this floor can hold.
    pub fn footprint_area(&self) -> f64 {
        self.width * self.length
    }

    /// Sum of all room areas.
    pub fn occupied_area(&self) -> f64 {
        self.rooms.iter().map(Room::area).sum()
    }

    /// Resize the floor in place. Rejects dimensions below the minimum and
    /// footprints smaller than the area already occupied.
    ///
    /// Only [`Building::renovate_floor`](crate::building::Building::renovate_floor)
    /// may call this, since it alone can check the floors above and below.
    pub(crate) fn change_dimensions(&mut self, width: f64, length: f64) -> Result<()> {
        check_dimensions(width, length)?;
        if width * length < self.occupied_area() {
            return Err(BuildingError::FloorTooSmall(format!(
                "{:.2}m^2 cannot hold the {:.2}m^2 of rooms on floor {}",
                width * length,
                self.occupied_area(),
                self.number
            )));
        }
        self.width = width;
        self.length = length;
        Ok(())
    }

    /// Append a room if its area is valid, its number is free and it fits.
    pub fn add_room(&mut self, room: Room) -> Result<()> {
        check_room_area(room.area())?;
        if self.room(room.number()).is_some() {
            return Err(BuildingError::DuplicateRoom(room.number()));
        }
        let occupied = self.occupied_area();
        if occupied + room.area() > self.footprint_area() {
            return Err(BuildingError::InsufficientSpace {
                footprint: self.footprint_area(),
                occupied,
                requested: room.area(),
            });
        }
        self.rooms.push(room);
        Ok(())
    }

    /// Start a drill in every room of `room_type`, or every room if `None`.
    pub fn fire_drill(&mut self, room_type: Option<RoomType>) {
        for room in &mut self.rooms {
            if room_type.map_or(true, |t| t == room.room_type()) {
                room.set_fire_drill(true);
            }
        }
    }

    /// End the drill in every room, whatever its type.
    pub fn cancel_fire_drill(&mut self) {
        for room in &mut self.rooms {
            room.set_fire_drill(false);
        }
    }

    pub fn maintenance_schedule(&self) -> Option<&MaintenanceSchedule> {
        self.maintenance.as_ref()
    }

    /// Replace this floor's maintenance schedule with a rotation over
    /// `room_order` and register it with `clock`.
    ///
    /// The room currently flagged by the previous schedule is released first.
    pub fn create_maintenance_schedule(
        &mut self,
        room_order: &[u32],
        clock: &mut SimulationClock,
    ) -> Result<()> {
        validate_order(room_order, &self.rooms)?;
        self.install_schedule(room_order, Some(clock.register()))
    }

    /// Like [`Floor::create_maintenance_schedule`], but the schedule stays
    /// idle until [`Floor::register_schedule`] binds it to a clock.
    pub(crate) fn create_unregistered_schedule(&mut self, room_order: &[u32]) -> Result<()> {
        validate_order(room_order, &self.rooms)?;
        self.install_schedule(room_order, None)
    }

    fn install_schedule(&mut self, room_order: &[u32], id: Option<ConsumerId>) -> Result<()> {
        if let Some(previous) = self.maintenance.take() {
            previous.release(&mut self.rooms);
        }
        let schedule = MaintenanceSchedule::start(id, room_order.to_vec(), &mut self.rooms)?;
        log::info!(
            "floor {}: maintenance rotation over rooms [{}]",
            self.number,
            schedule.encode()
        );
        self.maintenance = Some(schedule);
        Ok(())
    }

    /// Give this floor's schedule a fresh clock registration.
    pub(crate) fn register_schedule(&mut self, clock: &mut SimulationClock) {
        if let Some(schedule) = self.maintenance.as_mut() {
            schedule.bind(clock.register());
        }
    }

    /// Re-check every rule a floor built through its own operations obeys.
    /// Used on data that bypassed them, such as a deserialized snapshot.
    pub(crate) fn validate(&self) -> Result<()> {
        check_dimensions(self.width, self.length)?;
        for (i, room) in self.rooms.iter().enumerate() {
            check_room_area(room.area())?;
            room.validate()?;
            if self.rooms[..i].iter().any(|r| r.number() == room.number()) {
                return Err(BuildingError::DuplicateRoom(room.number()));
            }
        }
        if self.occupied_area() > self.footprint_area() {
            return Err(BuildingError::FloorTooSmall(format!(
                "{:.2}m^2 cannot hold the {:.2}m^2 of rooms on floor {}",
                self.footprint_area(),
                self.occupied_area(),
                self.number
            )));
        }
        match &self.maintenance {
            Some(schedule) => schedule.validate(&self.rooms),
            None => Ok(()),
        }
    }

    /// Advance the maintenance schedule by one minute, if there is one.
    pub fn tick_maintenance(&mut self) -> std::result::Result<(), TickFault> {
        match self.maintenance.as_mut() {
            Some(schedule) => schedule.per_minute_tick(&mut self.rooms),
            None => Ok(()),
        }
    }

    /// Operator override: move maintenance on to the next room now.
    pub fn skip_current_maintenance(&mut self) -> std::result::Result<(), TickFault> {
        match self.maintenance.as_mut() {
            Some(schedule) => schedule.skip_current_maintenance(&mut self.rooms),
            None => Ok(()),
        }
    }

    /// Canonical save-file block: `number:width:length:roomCount[:order]`
    /// followed by each room's block.
    pub fn encode(&self) -> String {
        let mut header = format!(
            "{}:{:.2}:{:.2}:{}",
            self.number,
            self.width,
            self.length,
            self.rooms.len()
        );
        if let Some(schedule) = &self.maintenance {
            header.push(':');
            header.push_str(&schedule.encode());
        }
        std::iter::once(header)
            .chain(self.rooms.iter().map(Room::encode))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Floor dimensions must be finite and at least the minimum.
pub(crate) fn check_dimensions(width: f64, length: f64) -> Result<()> {
    if !width.is_finite() || !length.is_finite() {
        return Err(BuildingError::invalid(format!(
            "floor dimensions {width}x{length} must be finite"
        )));
    }
    if width < MIN_FLOOR_WIDTH {
        return Err(BuildingError::invalid(format!(
            "width cannot be less than {MIN_FLOOR_WIDTH}"
        )));
    }
    if length < MIN_FLOOR_LENGTH {
        return Err(BuildingError::invalid(format!(
            "length cannot be less than {MIN_FLOOR_LENGTH}"
        )));
    }
    Ok(())
}

pub(crate) fn check_room_area(area: f64) -> Result<()> {
    if !area.is_finite() || area < MIN_ROOM_AREA {
        return Err(BuildingError::invalid(format!(
            "room area {area:.2} must be a finite number of at least {MIN_ROOM_AREA}"
        )));
    }
    Ok(())
}

impl TickTarget for Floor {
    fn tick_consumer(&mut self, id: ConsumerId) -> Option<std::result::Result<(), TickFault>> {
        let scheduled_here = self
            .maintenance
            .as_ref()
            .is_some_and(|schedule| schedule.id() == Some(id));
        scheduled_here.then(|| self.tick_maintenance())
    }
}

impl PartialEq for Floor {
    /// Value equality: number, dimensions within tolerance, and the set of
    /// rooms regardless of insertion order.
    fn eq(&self, other: &Self) -> bool {
        self.number == other.number
            && (self.width - other.width).abs() <= DIMENSION_TOLERANCE
            && (self.length - other.length).abs() <= DIMENSION_TOLERANCE
            && self.rooms.len() == other.rooms.len()
            && self
                .rooms
                .iter()
                .all(|room| other.room(room.number()) == Some(room))
    }
}

impl fmt::Display for Floor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Floor #{}: width={:.2}m, length={:.2}m, rooms={}",
            self.number,
            self.width,
            self.length,
            self.rooms.len()
        )
    }
}
