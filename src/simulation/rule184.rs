//! Rule 184 binary cellular automaton
//!
//! A max-speed-1 automaton evaluated as a strictly local 3-cell rule at
//! every position, writing into a fresh occupancy array so the update is
//! synchronous.

use crate::config::{ConfigError, SimulationConfig};

use super::model::TrafficModel;
use super::rng::RandomSource;
use super::stats::{SimulationStatistics, StatisticsAccumulator};
use super::types::{SimulationError, TrafficSnapshot, Vehicle, VehicleId, DETECTOR_POSITION};

#[derive(Debug)]
pub struct Rule184Model {
    config: SimulationConfig,
    cells: Vec<Option<VehicleId>>,
    next_cells: Vec<Option<VehicleId>>,
    rng: RandomSource,
    /// Ids handed to vehicles synthesized at open boundaries.
    next_boundary_id: usize,
    step: u64,
    vehicles_passed: u32,
    snapshot: TrafficSnapshot,
    stats: StatisticsAccumulator,
}

impl Rule184Model {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate_common()?;
        if config.max_speed != 1 {
            return Err(ConfigError::Rule184MaxSpeed(config.max_speed));
        }

        let mut rng = RandomSource::from_seed(config.random_seed);
        let mut cells = vec![None; config.road_length];
        for id in 0..config.car_count {
            loop {
                let position = rng.next_int(config.road_length);
                if cells[position].is_none() {
                    cells[position] = Some(VehicleId(id));
                    break;
                }
            }
        }

        let next_cells = cells.clone();
        let snapshot = build_snapshot(&cells, &config, 0, 0);
        Ok(Self {
            next_boundary_id: config.car_count,
            config,
            cells,
            next_cells,
            rng,
            step: 0,
            vehicles_passed: 0,
            snapshot,
            stats: StatisticsAccumulator::new(),
        })
    }

    /// Occupant of logical position `index`, which may lie one cell
    /// outside the road. A cyclic lane wraps; an open lane synthesizes an
    /// occupant with probability 1/2, producing nondeterministic inflow
    /// and outflow at the ends.
    fn neighbor(&mut self, index: isize) -> Option<VehicleId> {
        let road_length = self.config.road_length as isize;
        if self.config.cyclic {
            let wrapped = index.rem_euclid(road_length) as usize;
            return self.cells[wrapped];
        }
        if index < 0 || index >= road_length {
            if self.rng.next_int(self.config.max_speed as usize + 1) == 1 {
                let id = VehicleId(self.next_boundary_id);
                self.next_boundary_id += 1;
                return Some(id);
            }
            return None;
        }
        self.cells[index as usize]
    }
}

impl TrafficModel for Rule184Model {
    fn step(&mut self) -> Result<(), SimulationError> {
        for i in 0..self.config.road_length {
            let index = i as isize;
            let left = self.neighbor(index - 1);
            let current = self.cells[i];
            let right = self.neighbor(index + 1);

            // A vehicle passes the detector when it occupies the detector
            // cell and is about to move off it.
            if i == DETECTOR_POSITION && current.is_some() && right.is_none() {
                self.vehicles_passed += 1;
            }

            self.next_cells[i] = if left.is_some() && current.is_none() {
                // A vehicle moves into this empty cell from behind.
                left
            } else if current.is_some() && right.is_none() {
                // The vehicle here moved forward.
                None
            } else {
                current
            };
        }
        std::mem::swap(&mut self.cells, &mut self.next_cells);

        let snapshot = build_snapshot(&self.cells, &self.config, self.step, self.vehicles_passed);
        self.step += 1;
        self.stats.add(&snapshot);
        self.snapshot = snapshot;
        self.vehicles_passed = 0;
        Ok(())
    }

    fn snapshot(&self) -> &TrafficSnapshot {
        &self.snapshot
    }

    fn statistics(&self) -> &SimulationStatistics {
        self.stats.totals()
    }

    fn config(&self) -> &SimulationConfig {
        &self.config
    }
}

/// Derives the vehicle list from occupancy. A vehicle's velocity is 1
/// when the cell ahead is free (it will move next tick), otherwise 0; the
/// cell past an open road end counts as free.
fn build_snapshot(
    cells: &[Option<VehicleId>],
    config: &SimulationConfig,
    step: u64,
    vehicles_passed: u32,
) -> TrafficSnapshot {
    let road_length = cells.len();
    let vehicles = cells
        .iter()
        .enumerate()
        .filter_map(|(position, occupant)| {
            occupant.map(|id| {
                let ahead = position + 1;
                let ahead_occupied = if ahead < road_length {
                    cells[ahead].is_some()
                } else if config.cyclic {
                    cells[0].is_some()
                } else {
                    false
                };
                Vehicle::new(id, position, if ahead_occupied { 0 } else { 1 })
            })
        })
        .collect();

    TrafficSnapshot {
        cells: cells.to_vec(),
        vehicles,
        step,
        vehicles_passed,
    }
}
