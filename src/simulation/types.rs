//! Core data types for the lane simulation

use thiserror::Error;

/// Cell index of the fixed flow detector. Vehicles are counted on the tick
/// they depart this cell going forward.
pub const DETECTOR_POSITION: usize = 0;

/// A unique identifier for a vehicle, stable across position sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VehicleId(pub usize);

/// A vehicle on the lane.
///
/// Velocity is measured in cells per tick and never exceeds the
/// configured maximum speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    pub id: VehicleId,
    pub position: usize,
    pub velocity: u32,
}

impl Vehicle {
    pub fn new(id: VehicleId, position: usize, velocity: u32) -> Self {
        Self {
            id,
            position,
            velocity,
        }
    }
}

/// Read-only view of the lane produced once per tick.
///
/// Created at the end of each step and never mutated afterwards; the
/// statistics and output collaborators consume it before the next step
/// begins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrafficSnapshot {
    /// Occupancy of every cell, in road order.
    pub cells: Vec<Option<VehicleId>>,
    /// All vehicles, sorted by position.
    pub vehicles: Vec<Vehicle>,
    /// Zero-based index of the tick that produced this snapshot.
    pub step: u64,
    /// Vehicles that departed the detector cell during this tick.
    pub vehicles_passed: u32,
}

impl TrafficSnapshot {
    /// Length of the road in cells.
    pub fn road_length(&self) -> usize {
        self.cells.len()
    }
}

/// Fatal defects in the update logic itself.
///
/// These signal a broken invariant and must abort the run rather than be
/// caught and ignored.
#[derive(Debug, Error)]
pub enum SimulationError {
    #[error("cell {position} is already occupied")]
    OccupiedCell { position: usize },

    #[error(
        "next vehicle at position {next} is behind the current vehicle at \
         position {current} in an open lane"
    )]
    VehicleOrder { current: usize, next: usize },
}
