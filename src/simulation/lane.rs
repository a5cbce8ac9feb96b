//! Shared car-following update core
//!
//! The Nagel-Schreckenberg model and its slow-to-start extensions differ
//! only in the randomisation rule applied to each vehicle's candidate
//! velocity. Everything else - random initial placement, the two-pass
//! tick, gap computation, detector accounting and boundary handling -
//! lives here and is composed into the model variants.

use crate::config::SimulationConfig;

use super::detector::did_cross;
use super::rng::RandomSource;
use super::road::RoadState;
use super::types::{SimulationError, TrafficSnapshot, Vehicle, VehicleId, DETECTOR_POSITION};

/// Stand-in id for the virtual vehicle representing empty space beyond an
/// open road end. Never placed on a cell.
const PHANTOM_ID: VehicleId = VehicleId(usize::MAX);

/// Lane state plus the update passes common to all car-following models.
#[derive(Debug)]
pub(crate) struct LaneCore {
    pub config: SimulationConfig,
    pub road: RoadState,
    pub rng: RandomSource,
    step: u64,
    vehicles_passed: u32,
}

impl LaneCore {
    pub fn new(config: SimulationConfig) -> Self {
        let road = RoadState::new(config.road_length);
        let rng = RandomSource::from_seed(config.random_seed);
        Self {
            config,
            road,
            rng,
            step: 0,
            vehicles_passed: 0,
        }
    }

    /// Drops vehicles at uniformly random free positions (retrying on
    /// collision), sorts them, then assigns each a random initial speed
    /// clamped so it cannot overlap the vehicle ahead at time zero.
    pub fn randomise_vehicles(&mut self) -> Result<(), SimulationError> {
        for id in 0..self.config.car_count {
            loop {
                let position = self.rng.next_int(self.config.road_length);
                let vehicle = Vehicle::new(VehicleId(id), position, 0);
                if self.road.place(vehicle).is_ok() {
                    break;
                }
            }
        }
        self.road.sort_by_position();

        let count = self.road.vehicles().len();
        for index in 0..count {
            let speed = self.rng.next_int(self.config.max_speed as usize + 1) as u32;
            let current = self.road.vehicles()[index];
            let next = self.next_vehicle(index, count);
            let gap = self.gap_to_next(&current, &next)?;
            let limit = gap.saturating_sub(1) as u32;
            self.road.set_velocity(index, speed.min(limit));
        }
        Ok(())
    }

    /// One tick: a velocity pass over tick-start positions followed by a
    /// movement pass. `randomise` maps each vehicle's candidate velocity
    /// (after acceleration and gap clamping) to its final velocity and is
    /// where the model variants diverge.
    pub fn step_with<F>(&mut self, mut randomise: F) -> Result<(), SimulationError>
    where
        F: FnMut(&mut RandomSource, u32) -> u32,
    {
        let count = self.road.vehicles().len();

        // Velocity pass: positions are not mutated here, so every gap is
        // computed against tick-start positions.
        for index in 0..count {
            let current = self.road.vehicles()[index];
            let next = self.next_vehicle(index, count);
            let gap = self.gap_to_next(&current, &next)?;

            let accelerated = (current.velocity + 1).min(self.config.max_speed);
            // A vehicle may approach to distance 1 of the one ahead, never 0.
            let candidate = accelerated.min(gap.saturating_sub(1) as u32);
            let velocity = randomise(&mut self.rng, candidate);
            self.road.set_velocity(index, velocity);
        }

        // Movement pass, in ascending position order.
        for index in 0..count {
            let current = self.road.vehicles()[index];
            if did_cross(
                current.position,
                current.velocity,
                DETECTOR_POSITION,
                self.config.road_length,
                self.config.cyclic,
            ) {
                self.vehicles_passed += 1;
            }
            self.advance(index)?;
        }
        Ok(())
    }

    /// Restores position order and produces the tick's snapshot, stamped
    /// with the zero-based tick index, then advances the counter and
    /// resets the per-tick detector count.
    pub fn complete_tick(&mut self) -> TrafficSnapshot {
        self.road.sort_by_position();
        let snapshot = self.take_snapshot();
        self.step += 1;
        self.vehicles_passed = 0;
        snapshot
    }

    pub fn take_snapshot(&self) -> TrafficSnapshot {
        TrafficSnapshot {
            cells: self.road.cells().to_vec(),
            vehicles: self.road.vehicles().to_vec(),
            step: self.step,
            vehicles_passed: self.vehicles_passed,
        }
    }

    /// The vehicle ahead of list index `index`. On a cyclic lane the last
    /// vehicle sees the first; on an open lane it sees a phantom vehicle
    /// representing the empty space beyond the road end.
    fn next_vehicle(&self, index: usize, count: usize) -> Vehicle {
        if index + 1 < count {
            return self.road.vehicles()[index + 1];
        }
        if self.config.cyclic {
            return self.road.vehicles()[0];
        }
        let road_length = self.config.road_length;
        let max_speed = self.config.max_speed;
        if self.road.vehicles()[0].position != 0 {
            // Unconstrained exit: the phantom sits a full max-speed gap
            // beyond the end.
            Vehicle::new(PHANTOM_ID, road_length + max_speed as usize, max_speed)
        } else {
            // A vehicle occupies cell 0, so an exiting vehicle would be
            // re-injected there; hold it just before the end instead.
            Vehicle::new(PHANTOM_ID, road_length, 0)
        }
    }

    /// Gap from `current` to the vehicle ahead, wrapping on a cyclic
    /// lane. A vehicle behind its successor on an open lane contradicts
    /// the sorted order and is reported as a fatal invariant violation.
    fn gap_to_next(&self, current: &Vehicle, next: &Vehicle) -> Result<usize, SimulationError> {
        if current.id == next.id {
            // Alone on a cyclic lane: the whole road is free.
            return Ok(self.config.road_length);
        }
        let distance = next.position as isize - current.position as isize;
        if distance >= 0 {
            return Ok(distance as usize);
        }
        if self.config.cyclic {
            Ok((distance + self.config.road_length as isize) as usize)
        } else {
            Err(SimulationError::VehicleOrder {
                current: current.position,
                next: next.position,
            })
        }
    }

    /// Moves the vehicle at `index` by its velocity, wrapping on a cyclic
    /// lane. On an open lane a vehicle stepping past the end exits and is
    /// re-injected into the free space before the first vehicle.
    fn advance(&mut self, index: usize) -> Result<(), SimulationError> {
        let current = self.road.vehicles()[index];
        let target = current.position + current.velocity as usize;
        let road_length = self.config.road_length;

        if target < road_length {
            self.road.relocate(index, target);
            return Ok(());
        }
        if self.config.cyclic {
            self.road.relocate(index, target % road_length);
            return Ok(());
        }
        self.reinject(index)
    }

    /// Open-boundary inflow approximation: an exiting vehicle reappears
    /// at a random cell in the free stretch before the first vehicle,
    /// clamped to `max_speed - 1`, with its velocity rederived from the
    /// distance it effectively travelled past the road start. Only the
    /// last vehicle can exit in a tick (every other vehicle is clamped
    /// below its successor's tick-start position), so the landing stretch
    /// is free; an occupied landing cell means the update logic is
    /// broken.
    fn reinject(&mut self, index: usize) -> Result<(), SimulationError> {
        let current = self.road.vehicles()[index];
        let first_position = self.road.vehicles()[0].position.max(1);
        let max_landing = self.config.max_speed.saturating_sub(1) as usize;
        let landing = self.rng.next_int(first_position).min(max_landing);
        if self
            .road
            .occupant(landing)
            .is_some_and(|id| id != current.id)
        {
            return Err(SimulationError::OccupiedCell { position: landing });
        }

        let distance = landing.max(1);
        let accelerated = (current.velocity + 1).min(self.config.max_speed);
        let velocity = accelerated.min(distance.saturating_sub(1) as u32);
        self.road.set_velocity(index, velocity);
        self.road.relocate(index, landing);
        Ok(())
    }
}
