//! Config loading, validation and sweep expansion tests.

use std::io::Write;
use std::time::Duration;

use traffic_ca::config::{
    self, ConfigError, ModelConfig, ModelType, SimulationConfig, SweepParameter, SweepRange,
};

#[test]
fn config_file_overrides_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        "# reference run\n\
         model = acceleration_based\n\
         road_length = 50\n\
         car_count = 10\n\
         max_speed = 4\n\
         braking_probability = 0.25\n\
         cyclic = true\n\
         step_count = 500\n\
         random_seed = 7\n\
         low_speed_threshold = 1\n\
         this line is malformed and skipped"
    )
    .unwrap();

    let config = config::load_file(file.path()).unwrap();
    assert_eq!(config.model_type(), ModelType::AccelerationBased);
    let base = config.base();
    assert_eq!(base.road_length, 50);
    assert_eq!(base.car_count, 10);
    assert_eq!(base.max_speed, 4);
    assert!((base.braking_probability - 0.25).abs() < 1e-12);
    assert!(base.cyclic);
    assert_eq!(base.step_count, Some(500));
    assert_eq!(base.random_seed, 7);

    match config {
        ModelConfig::AccelerationBased(ext) => {
            assert_eq!(ext.low_speed_threshold, 1);
            // Untouched extension keys keep their defaults.
            assert!((ext.start_acceleration_probability - 0.5).abs() < 1e-12);
        }
        other => panic!("expected acceleration-based config, got {other:?}"),
    }
}

#[test]
fn negative_step_count_means_unbounded() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "step_count = -1").unwrap();
    let config = config::load_file(file.path()).unwrap();
    assert_eq!(config.base().step_count, None);
}

#[test]
fn negative_step_delay_is_rejected() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "step_delay_ms = -5").unwrap();
    let error = config::load_file(file.path()).unwrap_err();
    let config_error = error.downcast::<ConfigError>().unwrap();
    assert!(matches!(config_error, ConfigError::NegativeStepDelay(-5)));
}

#[test]
fn unknown_model_name_is_rejected() {
    let error = "two_lane".parse::<ModelType>().unwrap_err();
    assert!(matches!(error, ConfigError::UnknownModel(_)));
}

#[test]
fn sweep_range_parses_and_enumerates_inclusively() {
    let range: SweepRange = "0.1:0.5:0.2".parse().unwrap();
    let values = range.values();
    assert_eq!(values.len(), 3);
    assert!((values[0] - 0.1).abs() < 1e-9);
    assert!((values[2] - 0.5).abs() < 1e-9);

    assert!("1:2".parse::<SweepRange>().is_err());
    assert!("5:1:1".parse::<SweepRange>().is_err());
    assert!("1:5:0".parse::<SweepRange>().is_err());
}

#[test]
fn sweeps_expand_base_config_with_distinct_prefixes() {
    let base = ModelConfig::from_base(
        ModelType::NagelSchreckenberg,
        SimulationConfig::defaults(),
    );
    let sweeps = vec![
        (SweepParameter::CarCount, "2:6:2".parse().unwrap()),
        (SweepParameter::BrakingProbability, "0.1:0.3:0.1".parse().unwrap()),
    ];
    let configs = config::apply_sweeps(&base, &sweeps);

    assert_eq!(configs.len(), 6);
    let car_counts: Vec<usize> = configs[..3].iter().map(|c| c.base().car_count).collect();
    assert_eq!(car_counts, vec![2, 4, 6]);
    for (index, run) in configs.iter().enumerate() {
        assert!(run.base().output_prefix.ends_with(&format!("_{index}")));
    }
}

#[test]
fn no_sweeps_returns_the_base_alone() {
    let base = ModelConfig::from_base(ModelType::Rule184, SimulationConfig::defaults());
    let configs = config::apply_sweeps(&base, &[]);
    assert_eq!(configs.len(), 1);
    assert_eq!(
        configs[0].base().output_prefix,
        base.base().output_prefix
    );
}

#[test]
fn common_validation_rejects_overfull_roads() {
    let config = SimulationConfig {
        road_length: 5,
        car_count: 6,
        ..SimulationConfig::defaults()
    };
    assert!(matches!(
        config.validate_common(),
        Err(ConfigError::TooManyVehicles { .. })
    ));
}

#[test]
fn defaults_carry_no_delay() {
    assert_eq!(SimulationConfig::defaults().step_delay, Duration::ZERO);
}
