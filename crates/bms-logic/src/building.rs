//! Buildings and the footprint rules between their floors.
//!
//! # Invariants
//!
//! - Floor numbers are unique and at least 1.
//! - Floor `N >= 2` is only accepted while floor `N - 1` exists.
//! - Whenever both exist, floor `N` is no wider and no longer than floor
//!   `N - 1`. Additions and renovations that would break this are rejected.
//! - Floors keep insertion order, not numeric order.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::clock::{ConsumerId, SimulationClock, TickFault, TickTarget};
use crate::error::{BuildingError, Result};
use crate::floor::{check_dimensions, Floor};
use crate::room::RoomType;

/// A named building made of floors.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Building {
    name: String,
    floors: Vec<Floor>,
}

impl Building {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            floors: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Floors in insertion order.
    pub fn floors(&self) -> &[Floor] {
        &self.floors
    }

    pub fn floor(&self, number: u32) -> Option<&Floor> {
        self.floors.iter().find(|f| f.number() == number)
    }

    pub fn floor_mut(&mut self, number: u32) -> Option<&mut Floor> {
        self.floors.iter_mut().find(|f| f.number() == number)
    }

    fn floor_below(&self, number: u32) -> Option<&Floor> {
        number.checked_sub(1).and_then(|below| self.floor(below))
    }

    /// Add a floor on top of the stack.
    pub fn add_floor(&mut self, floor: Floor) -> Result<()> {
        let number = floor.number();
        if number < 1 {
            return Err(BuildingError::invalid("floor number must be 1 or higher"));
        }
        check_dimensions(floor.width(), floor.length())?;
        if self.floor(number).is_some() {
            return Err(BuildingError::DuplicateFloor(number));
        }
        if number >= 2 {
            let below = self
                .floor_below(number)
                .ok_or(BuildingError::NoFloorBelow(number))?;
            if floor.width() > below.width() || floor.length() > below.length() {
                return Err(BuildingError::FloorTooSmall(format!(
                    "floor {} ({:.2}x{:.2}) cannot support floor {number} ({:.2}x{:.2})",
                    below.number(),
                    below.width(),
                    below.length(),
                    floor.width(),
                    floor.length()
                )));
            }
        }

        log::info!(
            "{}: added floor {} ({:.2}x{:.2})",
            self.name,
            number,
            floor.width(),
            floor.length()
        );
        self.floors.push(floor);
        Ok(())
    }

    /// Resize floor `number` in place, keeping its rooms.
    ///
    /// Shrinking must still hold the floor's rooms and the floor above.
    /// Growing must still fit on the floor below. A change that shrinks one
    /// dimension and grows the other is checked both ways.
    pub fn renovate_floor(&mut self, number: u32, width: f64, length: f64) -> Result<()> {
        let floor = self
            .floor(number)
            .ok_or_else(|| BuildingError::invalid(format!("floor {number} does not exist")))?;
        check_dimensions(width, length)?;

        let shrinking = width < floor.width() || length < floor.length();
        let growing = width > floor.width() || length > floor.length();

        if shrinking {
            if floor.occupied_area() > width * length {
                return Err(BuildingError::FloorTooSmall(format!(
                    "{:.2}m^2 cannot hold the {:.2}m^2 of rooms on floor {number}",
                    width * length,
                    floor.occupied_area()
                )));
            }
            if let Some(above) = self.floor(number + 1) {
                if above.width() > width || above.length() > length {
                    return Err(BuildingError::FloorTooSmall(format!(
                        "floor {number} would no longer support floor {}",
                        above.number()
                    )));
                }
            }
        }
        if growing {
            if let Some(below) = self.floor_below(number) {
                if width > below.width() || length > below.length() {
                    return Err(BuildingError::FloorTooSmall(format!(
                        "floor {} cannot support floor {number} at {width:.2}x{length:.2}",
                        below.number()
                    )));
                }
            }
        }

        let floor = self
            .floor_mut(number)
            .ok_or_else(|| BuildingError::invalid(format!("floor {number} does not exist")))?;
        floor.change_dimensions(width, length)?;
        log::info!(
            "{}: renovated floor {} to {:.2}x{:.2}",
            self.name,
            number,
            width,
            length
        );
        Ok(())
    }

    /// Start a drill in every room of `room_type` (every room if `None`)
    /// across all floors.
    pub fn fire_drill(&mut self, room_type: Option<RoomType>) -> Result<()> {
        if self.floors.is_empty() {
            return Err(BuildingError::NoRoomsAvailable(
                "there are no floors in the building yet".into(),
            ));
        }
        if self.floors.iter().all(|f| f.rooms().is_empty()) {
            return Err(BuildingError::NoRoomsAvailable(
                "there are no rooms in the building yet".into(),
            ));
        }
        for floor in &mut self.floors {
            floor.fire_drill(room_type);
        }
        match room_type {
            Some(t) => log::info!("{}: fire drill started in {} rooms", self.name, t),
            None => log::info!("{}: fire drill started in all rooms", self.name),
        }
        Ok(())
    }

    /// End any drill in every room. Never fails.
    pub fn cancel_fire_drill(&mut self) {
        for floor in &mut self.floors {
            floor.cancel_fire_drill();
        }
    }

    /// Register every floor's maintenance schedule with `clock`.
    ///
    /// Needed after a building is loaded from a save file or restored from a
    /// snapshot: those schedules carry no clock registration and stay idle
    /// until registered. Registering again hands out fresh ids and orphans
    /// the old ones.
    pub fn register_schedules(&mut self, clock: &mut SimulationClock) {
        for floor in &mut self.floors {
            floor.register_schedule(clock);
        }
    }

    /// Re-check every hierarchy rule on a building that did not come
    /// through [`Building::add_floor`], such as a deserialized snapshot.
    pub(crate) fn validate(&self) -> Result<()> {
        for (i, floor) in self.floors.iter().enumerate() {
            let number = floor.number();
            if number < 1 {
                return Err(BuildingError::invalid("floor number must be 1 or higher"));
            }
            if self.floors[..i].iter().any(|f| f.number() == number) {
                return Err(BuildingError::DuplicateFloor(number));
            }
            floor.validate()?;
            if number >= 2 {
                let below = self
                    .floor_below(number)
                    .ok_or(BuildingError::NoFloorBelow(number))?;
                if floor.width() > below.width() || floor.length() > below.length() {
                    return Err(BuildingError::FloorTooSmall(format!(
                        "floor {} cannot support floor {number}",
                        below.number()
                    )));
                }
            }
        }
        Ok(())
    }

    /// Canonical save-file block: name, floor count, then each floor's block.
    pub fn encode(&self) -> String {
        let mut lines = vec![self.name.clone(), self.floors.len().to_string()];
        lines.extend(self.floors.iter().map(Floor::encode));
        lines.join("\n")
    }
}

impl TickTarget for Building {
    fn tick_consumer(&mut self, id: ConsumerId) -> Option<std::result::Result<(), TickFault>> {
        self.floors
            .iter_mut()
            .find_map(|floor| floor.tick_consumer(id))
    }
}

impl TickTarget for [Building] {
    fn tick_consumer(&mut self, id: ConsumerId) -> Option<std::result::Result<(), TickFault>> {
        self.iter_mut()
            .find_map(|building| building.tick_consumer(id))
    }
}

impl PartialEq for Building {
    /// Value equality: name and the set of floors regardless of order.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.floors.len() == other.floors.len()
            && self
                .floors
                .iter()
                .all(|floor| other.floor(floor.number()) == Some(floor))
    }
}

impl fmt::Display for Building {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Building: name=\"{}\", floors={}",
            self.name,
            self.floors.len()
        )
    }
}
