//! Array-backed lane state
//!
//! Holds the cyclic-or-linear array of cells and the position-ordered
//! vehicle list, and keeps the two mutually consistent.

use super::types::{SimulationError, Vehicle, VehicleId};

/// The authoritative representation of lane occupancy.
///
/// Invariant: at most one vehicle per cell, and every vehicle in the list
/// is referenced by exactly the cell at its position.
#[derive(Debug)]
pub struct RoadState {
    cells: Vec<Option<VehicleId>>,
    vehicles: Vec<Vehicle>,
}

impl RoadState {
    pub fn new(road_length: usize) -> Self {
        Self {
            cells: vec![None; road_length],
            vehicles: Vec::new(),
        }
    }

    /// Number of cells on the road.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    pub fn cells(&self) -> &[Option<VehicleId>] {
        &self.cells
    }

    /// Vehicles in the order established by the last `sort_by_position`.
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn occupant(&self, position: usize) -> Option<VehicleId> {
        self.cells[position]
    }

    /// Places a new vehicle on the road. Fails when the destination cell
    /// is already occupied; random initial placement retries with a fresh
    /// position on that error.
    pub fn place(&mut self, vehicle: Vehicle) -> Result<(), SimulationError> {
        let slot = &mut self.cells[vehicle.position];
        if slot.is_some() {
            return Err(SimulationError::OccupiedCell {
                position: vehicle.position,
            });
        }
        *slot = Some(vehicle.id);
        self.vehicles.push(vehicle);
        Ok(())
    }

    /// Moves the vehicle at list index `index` to `new_position`, clearing
    /// the old cell. The caller must guarantee the destination is free;
    /// the update rules guarantee this by clamping velocity to the gap.
    pub fn relocate(&mut self, index: usize, new_position: usize) {
        let vehicle = &mut self.vehicles[index];
        debug_assert!(
            new_position == vehicle.position || self.cells[new_position].is_none(),
            "relocating vehicle {:?} onto occupied cell {}",
            vehicle.id,
            new_position
        );
        self.cells[vehicle.position] = None;
        vehicle.position = new_position;
        self.cells[new_position] = Some(vehicle.id);
    }

    pub fn set_velocity(&mut self, index: usize, velocity: u32) {
        self.vehicles[index].velocity = velocity;
    }

    /// Re-establishes ascending position order of the vehicle list.
    /// Required after every movement pass since gap lookups assume sorted
    /// order.
    pub fn sort_by_position(&mut self) {
        self.vehicles.sort_by_key(|vehicle| vehicle.position);
    }
}
