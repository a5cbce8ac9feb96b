//! Nagel-Schreckenberg cellular-automaton model
//!
//! The classic four-rule update: accelerate, clamp to the gap ahead,
//! randomly brake, move.

use crate::config::{ConfigError, SimulationConfig};

use super::lane::LaneCore;
use super::model::TrafficModel;
use super::stats::{SimulationStatistics, StatisticsAccumulator};
use super::types::{SimulationError, TrafficSnapshot};

pub struct NagelSchreckenbergModel {
    core: LaneCore,
    snapshot: TrafficSnapshot,
    stats: StatisticsAccumulator,
}

impl NagelSchreckenbergModel {
    pub fn new(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate_common()?;
        let mut core = LaneCore::new(config);
        core.randomise_vehicles()
            .expect("initial placement cannot break the sorted-order invariant");
        let snapshot = core.take_snapshot();
        Ok(Self {
            core,
            snapshot,
            stats: StatisticsAccumulator::new(),
        })
    }
}

impl TrafficModel for NagelSchreckenbergModel {
    fn step(&mut self) -> Result<(), SimulationError> {
        let braking_probability = self.core.config.braking_probability;
        self.core.step_with(|rng, candidate| {
            let draw = rng.next_float();
            if draw < braking_probability && candidate > 0 {
                candidate - 1
            } else {
                candidate
            }
        })?;
        let snapshot = self.core.complete_tick();
        self.stats.add(&snapshot);
        self.snapshot = snapshot;
        Ok(())
    }

    fn snapshot(&self) -> &TrafficSnapshot {
        &self.snapshot
    }

    fn statistics(&self) -> &SimulationStatistics {
        self.stats.totals()
    }

    fn config(&self) -> &SimulationConfig {
        &self.core.config
    }
}
