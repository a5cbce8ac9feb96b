//! Traffic model contract and factory

use crate::config::{ConfigError, ModelConfig, SimulationConfig};

use super::nagel_schreckenberg::NagelSchreckenbergModel;
use super::rule184::Rule184Model;
use super::slow_to_start::{AccelerationBasedModel, VelocityBasedModel};
use super::stats::SimulationStatistics;
use super::types::{SimulationError, TrafficSnapshot};

/// One discrete-update traffic rule.
///
/// A model owns its lane state and random source; construction performs
/// the model-specific config validation and the random initial placement.
/// Models are `Send` so independent sweep runs can execute on worker
/// threads; a single run never shares its model.
pub trait TrafficModel: Send {
    /// Advances the simulation by one tick. Errors signal a broken
    /// invariant and abort the run.
    fn step(&mut self) -> Result<(), SimulationError>;

    /// The snapshot taken at the end of the most recent tick (the initial
    /// state before the first `step`).
    fn snapshot(&self) -> &TrafficSnapshot;

    /// Running aggregate statistics over all completed ticks.
    fn statistics(&self) -> &SimulationStatistics;

    fn config(&self) -> &SimulationConfig;
}

/// Builds the model variant selected by the config.
pub fn build_model(config: &ModelConfig) -> Result<Box<dyn TrafficModel>, ConfigError> {
    match config {
        ModelConfig::NagelSchreckenberg(base) => {
            Ok(Box::new(NagelSchreckenbergModel::new(base.clone())?))
        }
        ModelConfig::Rule184(base) => Ok(Box::new(Rule184Model::new(base.clone())?)),
        ModelConfig::AccelerationBased(config) => {
            Ok(Box::new(AccelerationBasedModel::new(config.clone())?))
        }
        ModelConfig::VelocityBased(config) => {
            Ok(Box::new(VelocityBasedModel::new(config.clone())?))
        }
    }
}
