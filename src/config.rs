//! Run configuration: model selection, parameter validation, config-file
//! loading and parameter sweeps
//!
//! The simulation core consumes fully built config values; everything
//! here runs once before a model is constructed. A config file is a plain
//! `key=value` list, and CLI sweeps expand one base config into a list of
//! run configs varying a single parameter each.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;
use log::warn;
use thiserror::Error;

/// Errors raised while building or validating a run configuration. All of
/// these are fatal and reported before the simulation starts.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unknown model type '{0}'")]
    UnknownModel(String),

    #[error("rule 184 requires max speed 1, got {0}")]
    Rule184MaxSpeed(u32),

    #[error("low speed threshold {threshold} must be below max speed {max_speed}")]
    LowSpeedThreshold { threshold: u32, max_speed: u32 },

    #[error("step delay must not be negative, got {0} ms")]
    NegativeStepDelay(i64),

    #[error("cannot place {car_count} vehicles on a road of {road_length} cells")]
    TooManyVehicles {
        car_count: usize,
        road_length: usize,
    },

    #[error("road length must be positive")]
    ZeroLengthRoad,

    #[error("max speed must be positive")]
    ZeroMaxSpeed,

    #[error("invalid sweep range '{0}', expected min:max:delta with a positive delta")]
    InvalidSweep(String),

    #[error("invalid value '{value}' for config key '{key}'")]
    InvalidValue { key: String, value: String },
}

/// The family of discrete-update rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelType {
    NagelSchreckenberg,
    Rule184,
    AccelerationBased,
    VelocityBased,
}

impl ModelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::NagelSchreckenberg => "nagel_schreckenberg",
            ModelType::Rule184 => "rule184",
            ModelType::AccelerationBased => "acceleration_based",
            ModelType::VelocityBased => "velocity_based",
        }
    }
}

impl FromStr for ModelType {
    type Err = ConfigError;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let all = [
            ModelType::NagelSchreckenberg,
            ModelType::Rule184,
            ModelType::AccelerationBased,
            ModelType::VelocityBased,
        ];
        all.into_iter()
            .find(|model| model.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))
    }
}

/// Parameters shared by every model variant, immutable per run.
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    pub road_length: usize,
    pub car_count: usize,
    pub max_speed: u32,
    /// Inter-tick delay for live presentation; zero for batch runs.
    pub step_delay: Duration,
    pub braking_probability: f64,
    pub cyclic: bool,
    pub output_prefix: String,
    /// Ticks to run; `None` runs until an external stop.
    pub step_count: Option<u64>,
    pub random_seed: u64,
}

impl SimulationConfig {
    pub fn defaults() -> Self {
        Self {
            road_length: 20,
            car_count: 3,
            max_speed: 5,
            step_delay: Duration::ZERO,
            braking_probability: 0.3,
            cyclic: false,
            output_prefix: "out/run".to_string(),
            step_count: Some(200),
            random_seed: 394,
        }
    }

    /// Validation shared by every model variant, performed at model
    /// construction.
    pub fn validate_common(&self) -> Result<(), ConfigError> {
        if self.road_length == 0 {
            return Err(ConfigError::ZeroLengthRoad);
        }
        if self.max_speed == 0 {
            return Err(ConfigError::ZeroMaxSpeed);
        }
        if self.car_count > self.road_length {
            return Err(ConfigError::TooManyVehicles {
                car_count: self.car_count,
                road_length: self.road_length,
            });
        }
        Ok(())
    }
}

/// Extension parameters for the acceleration-based model.
#[derive(Debug, Clone)]
pub struct AccelerationBasedConfig {
    pub base: SimulationConfig,
    /// Slow-to-start probability for vehicles pulling away from standstill.
    pub start_acceleration_probability: f64,
    /// Velocities strictly below this use the asymmetric braking rule.
    /// Must be below `max_speed`.
    pub low_speed_threshold: u32,
    pub low_speed_braking_probability: f64,
}

impl AccelerationBasedConfig {
    pub fn defaults(base: SimulationConfig) -> Self {
        Self {
            base,
            start_acceleration_probability: 0.5,
            low_speed_threshold: 2,
            low_speed_braking_probability: 0.2,
        }
    }
}

/// Extension parameters for the velocity-based model.
#[derive(Debug, Clone)]
pub struct VelocityBasedConfig {
    pub base: SimulationConfig,
    pub start_acceleration_probability: f64,
    /// Braking probability for vehicles near max speed; when unset, the
    /// standard probability widened by 0.1 is used.
    pub max_speed_braking_probability: Option<f64>,
}

impl VelocityBasedConfig {
    pub fn defaults(base: SimulationConfig) -> Self {
        Self {
            base,
            start_acceleration_probability: 0.5,
            max_speed_braking_probability: Some(0.3),
        }
    }
}

/// A complete run configuration: the selected model variant together with
/// its parameters.
#[derive(Debug, Clone)]
pub enum ModelConfig {
    NagelSchreckenberg(SimulationConfig),
    Rule184(SimulationConfig),
    AccelerationBased(AccelerationBasedConfig),
    VelocityBased(VelocityBasedConfig),
}

impl ModelConfig {
    /// Wraps a base config for the given model, with default extension
    /// parameters where the variant has any.
    pub fn from_base(model: ModelType, base: SimulationConfig) -> Self {
        match model {
            ModelType::NagelSchreckenberg => ModelConfig::NagelSchreckenberg(base),
            ModelType::Rule184 => ModelConfig::Rule184(base),
            ModelType::AccelerationBased => {
                ModelConfig::AccelerationBased(AccelerationBasedConfig::defaults(base))
            }
            ModelType::VelocityBased => {
                ModelConfig::VelocityBased(VelocityBasedConfig::defaults(base))
            }
        }
    }

    pub fn model_type(&self) -> ModelType {
        match self {
            ModelConfig::NagelSchreckenberg(_) => ModelType::NagelSchreckenberg,
            ModelConfig::Rule184(_) => ModelType::Rule184,
            ModelConfig::AccelerationBased(_) => ModelType::AccelerationBased,
            ModelConfig::VelocityBased(_) => ModelType::VelocityBased,
        }
    }

    pub fn base(&self) -> &SimulationConfig {
        match self {
            ModelConfig::NagelSchreckenberg(base) | ModelConfig::Rule184(base) => base,
            ModelConfig::AccelerationBased(config) => &config.base,
            ModelConfig::VelocityBased(config) => &config.base,
        }
    }

    pub fn base_mut(&mut self) -> &mut SimulationConfig {
        match self {
            ModelConfig::NagelSchreckenberg(base) | ModelConfig::Rule184(base) => base,
            ModelConfig::AccelerationBased(config) => &mut config.base,
            ModelConfig::VelocityBased(config) => &mut config.base,
        }
    }
}

/// Loads a `key=value` config file. Lines without a single `=` are
/// skipped with a warning; unknown keys are ignored so one file can carry
/// parameters for several model variants.
pub fn load_file(path: &Path) -> anyhow::Result<ModelConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;

    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        match line.split_once('=') {
            Some((key, value)) => {
                map.insert(key.trim().to_string(), value.trim().to_string());
            }
            None => warn!("skipping malformed config line: {line}"),
        }
    }

    Ok(from_map(&map)?)
}

fn from_map(map: &HashMap<String, String>) -> Result<ModelConfig, ConfigError> {
    let mut base = SimulationConfig::defaults();

    if let Some(value) = parse_value::<usize>(map, "road_length")? {
        base.road_length = value;
    }
    if let Some(value) = parse_value::<usize>(map, "car_count")? {
        base.car_count = value;
    }
    if let Some(value) = parse_value::<u32>(map, "max_speed")? {
        base.max_speed = value;
    }
    if let Some(ms) = parse_value::<i64>(map, "step_delay_ms")? {
        if ms < 0 {
            return Err(ConfigError::NegativeStepDelay(ms));
        }
        base.step_delay = Duration::from_millis(ms as u64);
    }
    if let Some(value) = parse_value::<f64>(map, "braking_probability")? {
        base.braking_probability = value;
    }
    if let Some(value) = parse_value::<bool>(map, "cyclic")? {
        base.cyclic = value;
    }
    if let Some(value) = map.get("output_prefix") {
        base.output_prefix = value.clone();
    }
    if let Some(steps) = parse_value::<i64>(map, "step_count")? {
        // A negative step count is the legacy spelling of "run forever".
        base.step_count = if steps < 0 { None } else { Some(steps as u64) };
    }
    if let Some(value) = parse_value::<u64>(map, "random_seed")? {
        base.random_seed = value;
    }

    let model = match map.get("model") {
        Some(name) => name.parse()?,
        None => ModelType::NagelSchreckenberg,
    };

    let mut config = ModelConfig::from_base(model, base);
    match &mut config {
        ModelConfig::AccelerationBased(ext) => {
            if let Some(value) = parse_value(map, "start_acceleration_probability")? {
                ext.start_acceleration_probability = value;
            }
            if let Some(value) = parse_value(map, "low_speed_threshold")? {
                ext.low_speed_threshold = value;
            }
            if let Some(value) = parse_value(map, "low_speed_braking_probability")? {
                ext.low_speed_braking_probability = value;
            }
        }
        ModelConfig::VelocityBased(ext) => {
            if let Some(value) = parse_value(map, "start_acceleration_probability")? {
                ext.start_acceleration_probability = value;
            }
            if let Some(value) = parse_value(map, "max_speed_braking_probability")? {
                ext.max_speed_braking_probability = Some(value);
            }
        }
        ModelConfig::NagelSchreckenberg(_) | ModelConfig::Rule184(_) => {}
    }
    Ok(config)
}

fn parse_value<T: FromStr>(
    map: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    match map.get(key) {
        None => Ok(None),
        Some(raw) => raw.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.clone(),
        }),
    }
}

/// Which parameter a sweep varies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepParameter {
    CarCount,
    RoadLength,
    MaxSpeed,
    BrakingProbability,
    StartAccelerationProbability,
    LowSpeedThreshold,
    LowSpeedBrakingProbability,
}

/// An inclusive `min:max:delta` parameter range.
#[derive(Debug, Clone, Copy)]
pub struct SweepRange {
    pub min: f64,
    pub max: f64,
    pub delta: f64,
}

impl SweepRange {
    pub fn values(&self) -> Vec<f64> {
        let mut values = Vec::new();
        let mut value = self.min;
        // Tolerance keeps the inclusive upper bound stable under float
        // accumulation.
        while value <= self.max + 1e-9 {
            values.push(value);
            value += self.delta;
        }
        values
    }
}

impl FromStr for SweepRange {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidSweep(raw.to_string());
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 3 {
            return Err(invalid());
        }
        let min: f64 = parts[0].trim().parse().map_err(|_| invalid())?;
        let max: f64 = parts[1].trim().parse().map_err(|_| invalid())?;
        let delta: f64 = parts[2].trim().parse().map_err(|_| invalid())?;
        if delta <= 0.0 || max < min {
            return Err(invalid());
        }
        Ok(Self { min, max, delta })
    }
}

/// Expands a base config into one run config per sweep value. Each sweep
/// varies a single parameter from the base (no cross product). With no
/// sweeps the base alone is returned. When the expansion produces more
/// than one run, output prefixes are suffixed with the run index so the
/// writers do not clobber each other.
pub fn apply_sweeps(
    base: &ModelConfig,
    sweeps: &[(SweepParameter, SweepRange)],
) -> Vec<ModelConfig> {
    let mut configs = Vec::new();
    for (parameter, range) in sweeps {
        for value in range.values() {
            let mut config = base.clone();
            set_parameter(&mut config, *parameter, value);
            configs.push(config);
        }
    }
    if configs.is_empty() {
        configs.push(base.clone());
    }
    if configs.len() > 1 {
        let prefix = base.base().output_prefix.clone();
        for (index, config) in configs.iter_mut().enumerate() {
            config.base_mut().output_prefix = format!("{prefix}_{index}");
        }
    }
    configs
}

fn set_parameter(config: &mut ModelConfig, parameter: SweepParameter, value: f64) {
    match parameter {
        SweepParameter::CarCount => config.base_mut().car_count = value.round() as usize,
        SweepParameter::RoadLength => config.base_mut().road_length = value.round() as usize,
        SweepParameter::MaxSpeed => config.base_mut().max_speed = value.round() as u32,
        SweepParameter::BrakingProbability => config.base_mut().braking_probability = value,
        SweepParameter::StartAccelerationProbability => match config {
            ModelConfig::AccelerationBased(ext) => ext.start_acceleration_probability = value,
            ModelConfig::VelocityBased(ext) => ext.start_acceleration_probability = value,
            _ => warn!("start acceleration probability sweep ignored for {:?} model", config.model_type()),
        },
        SweepParameter::LowSpeedThreshold => match config {
            ModelConfig::AccelerationBased(ext) => ext.low_speed_threshold = value.round() as u32,
            _ => warn!("low speed threshold sweep ignored for {:?} model", config.model_type()),
        },
        SweepParameter::LowSpeedBrakingProbability => match config {
            ModelConfig::AccelerationBased(ext) => ext.low_speed_braking_probability = value,
            _ => warn!("low speed braking sweep ignored for {:?} model", config.model_type()),
        },
    }
}
