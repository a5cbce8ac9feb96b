//! Slow-to-start extensions of the car-following model
//!
//! Both variants replace the standard randomisation step with a chain of
//! stochastic rules evaluated against a single uniform draw per vehicle
//! per tick, in fixed priority order. The first rule whose velocity class
//! and probability band both match fires; a draw that misses one band
//! falls through to the remaining rules.

use crate::config::{
    AccelerationBasedConfig, ConfigError, SimulationConfig, VelocityBasedConfig,
};

use super::lane::LaneCore;
use super::model::TrafficModel;
use super::stats::{SimulationStatistics, StatisticsAccumulator};
use super::types::{SimulationError, TrafficSnapshot};

/// Probability band widening applied on top of the standard braking
/// probability for vehicles near max speed.
const HIGH_SPEED_BAND: f64 = 0.1;

/// Car-following model with slow-to-start and low-speed asymmetric
/// braking rules keyed on a velocity threshold.
#[derive(Debug)]
pub struct AccelerationBasedModel {
    core: LaneCore,
    params: AccelerationBasedConfig,
    snapshot: TrafficSnapshot,
    stats: StatisticsAccumulator,
}

impl AccelerationBasedModel {
    pub fn new(config: AccelerationBasedConfig) -> Result<Self, ConfigError> {
        config.base.validate_common()?;
        if config.low_speed_threshold >= config.base.max_speed {
            return Err(ConfigError::LowSpeedThreshold {
                threshold: config.low_speed_threshold,
                max_speed: config.base.max_speed,
            });
        }
        let mut core = LaneCore::new(config.base.clone());
        core.randomise_vehicles()
            .expect("initial placement cannot break the sorted-order invariant");
        let snapshot = core.take_snapshot();
        Ok(Self {
            core,
            params: config,
            snapshot,
            stats: StatisticsAccumulator::new(),
        })
    }
}

impl TrafficModel for AccelerationBasedModel {
    fn step(&mut self) -> Result<(), SimulationError> {
        let max_speed = self.core.config.max_speed;
        let braking = self.core.config.braking_probability;
        let start = self.params.start_acceleration_probability;
        let low_braking = self.params.low_speed_braking_probability;
        let low_threshold = self.params.low_speed_threshold;
        let high_speed_braking = (braking + HIGH_SPEED_BAND).min(1.0);

        self.core.step_with(|rng, candidate| {
            let draw = rng.next_float();
            if candidate == 0 {
                return 0;
            }
            // Velocity the vehicle effectively carried into this tick.
            let previous = candidate - 1;
            // Slow to start, then the asymmetric low-speed band, then the
            // standard rule, then extra caution near top speed. A draw
            // that misses one band falls through to the next rule.
            let brake = (previous == 0 && draw < start)
                || (previous < low_threshold && draw < low_braking)
                || draw < braking
                || (previous >= max_speed - 1 && draw < high_speed_braking);
            if brake {
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

/// Car-following model with the slow-to-start rule and an explicit
/// braking probability for vehicles at max speed, without the low-speed
/// threshold band.
pub struct VelocityBasedModel {
    core: LaneCore,
    params: VelocityBasedConfig,
    snapshot: TrafficSnapshot,
    stats: StatisticsAccumulator,
}

impl VelocityBasedModel {
    pub fn new(config: VelocityBasedConfig) -> Result<Self, ConfigError> {
        config.base.validate_common()?;
        let mut core = LaneCore::new(config.base.clone());
        core.randomise_vehicles()
            .expect("initial placement cannot break the sorted-order invariant");
        let snapshot = core.take_snapshot();
        Ok(Self {
            core,
            params: config,
            snapshot,
            stats: StatisticsAccumulator::new(),
        })
    }
}

impl TrafficModel for VelocityBasedModel {
    fn step(&mut self) -> Result<(), SimulationError> {
        let max_speed = self.core.config.max_speed;
        let braking = self.core.config.braking_probability;
        let start = self.params.start_acceleration_probability;
        let high_speed_braking = self
            .params
            .max_speed_braking_probability
            .unwrap_or((braking + HIGH_SPEED_BAND).min(1.0));

        self.core.step_with(|rng, candidate| {
            let draw = rng.next_float();
            if candidate == 0 {
                return 0;
            }
            let previous = candidate - 1;
            let brake = (previous == 0 && draw < start)
                || draw < braking
                || (previous >= max_speed - 1 && draw < high_speed_braking);
            if brake {
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
