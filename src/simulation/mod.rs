//! Core traffic simulation logic
//!
//! Everything in this module is deterministic given a seed and performs no
//! I/O. The entry points are [`build_model`] to construct a model variant
//! from a validated config and [`SimulationEngine`] to drive it across
//! discrete ticks.

mod detector;
mod engine;
mod lane;
mod model;
mod nagel_schreckenberg;
mod rng;
mod road;
mod rule184;
mod slow_to_start;
mod stats;
mod types;

pub use detector::did_cross;
pub use engine::{EngineState, SimulationEngine, StopHandle};
pub use model::{build_model, TrafficModel};
pub use nagel_schreckenberg::NagelSchreckenbergModel;
pub use rng::RandomSource;
pub use road::RoadState;
pub use rule184::Rule184Model;
pub use slow_to_start::{AccelerationBasedModel, VelocityBasedModel};
pub use stats::{SimulationStatistics, StatisticsAccumulator};
pub use types::{SimulationError, TrafficSnapshot, Vehicle, VehicleId, DETECTOR_POSITION};
