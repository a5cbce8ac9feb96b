//! File sink tests: one row per tick in every output file, with the
//! velocity gap-fill applied.

use std::fs;

use traffic_ca::config::{ModelConfig, ModelType, SimulationConfig};
use traffic_ca::output::FileSink;
use traffic_ca::simulation::{build_model, SimulationEngine};

fn run_config(prefix: String) -> SimulationConfig {
    SimulationConfig {
        road_length: 12,
        car_count: 4,
        max_speed: 3,
        braking_probability: 0.2,
        cyclic: true,
        random_seed: 11,
        step_count: Some(25),
        output_prefix: prefix,
        ..SimulationConfig::defaults()
    }
}

#[test]
fn file_sink_writes_one_row_per_tick() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir.path().join("run").to_string_lossy().into_owned();
    let config = run_config(prefix.clone());

    let model = build_model(&ModelConfig::from_base(
        ModelType::NagelSchreckenberg,
        config.clone(),
    ))
    .unwrap();
    let mut sink = FileSink::create(&config).unwrap();
    let mut engine = SimulationEngine::new(model);
    engine.run(&mut sink).unwrap();
    drop(sink);

    for suffix in ["position", "velocity", "time", "density", "speed", "flow"] {
        let text = fs::read_to_string(format!("{prefix}_{suffix}")).unwrap();
        assert_eq!(
            text.lines().count(),
            25,
            "file '{suffix}' should have one row per tick"
        );
    }

    let positions = fs::read_to_string(format!("{prefix}_position")).unwrap();
    for line in positions.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(tokens.len(), config.road_length);
        assert_eq!(
            tokens.iter().filter(|token| **token == "1").count(),
            config.car_count
        );
    }

    // Every cell is filled on a populated cyclic lane, so no -1 markers
    // survive the gap-fill.
    let velocities = fs::read_to_string(format!("{prefix}_velocity")).unwrap();
    for line in velocities.lines() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        assert_eq!(tokens.len(), config.road_length);
        for token in tokens {
            let velocity: i64 = token.parse().unwrap();
            assert!((0..=i64::from(config.max_speed)).contains(&velocity));
        }
    }

    let ticks: Vec<u64> = fs::read_to_string(format!("{prefix}_time"))
        .unwrap()
        .lines()
        .map(|line| line.parse().unwrap())
        .collect();
    assert_eq!(ticks, (0..25).collect::<Vec<u64>>());
}

#[test]
fn sink_creates_missing_output_directories() {
    let dir = tempfile::tempdir().unwrap();
    let prefix = dir
        .path()
        .join("nested/out/run")
        .to_string_lossy()
        .into_owned();
    let config = run_config(prefix.clone());
    let sink = FileSink::create(&config);
    assert!(sink.is_ok());
    assert!(fs::metadata(format!("{prefix}_position")).is_ok());
}
