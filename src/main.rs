use std::path::PathBuf;
use std::str::FromStr;
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{error, info};

use traffic_ca::config::{
    self, ConfigError, ModelConfig, ModelType, SimulationConfig, SweepParameter, SweepRange,
};
use traffic_ca::output::FileSink;
use traffic_ca::simulation::{build_model, SimulationEngine};

#[derive(Parser)]
#[command(name = "traffic_ca")]
#[command(about = "1D cellular-automaton traffic simulator")]
struct Cli {
    /// Path to a key=value config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Traffic model: nagel_schreckenberg, rule184, acceleration_based or
    /// velocity_based
    #[arg(short, long)]
    model: Option<String>,

    /// Number of steps to run (negative runs until interrupted)
    #[arg(short = 'n', long)]
    steps: Option<i64>,

    /// Random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Wrap the far end of the lane back to cell 0
    #[arg(long)]
    cyclic: bool,

    /// Inter-tick delay in milliseconds for live runs
    #[arg(long)]
    step_delay_ms: Option<i64>,

    /// Prefix for the output files
    #[arg(short, long)]
    output_prefix: Option<String>,

    /// Sweep the car count, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_cars: Option<SweepRange>,

    /// Sweep the road length, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_road_length: Option<SweepRange>,

    /// Sweep the max speed, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_max_speed: Option<SweepRange>,

    /// Sweep the braking probability, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_braking: Option<SweepRange>,

    /// Sweep the slow-to-start probability, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_start_probability: Option<SweepRange>,

    /// Sweep the low speed threshold, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_low_speed_threshold: Option<SweepRange>,

    /// Sweep the low speed braking probability, min:max:delta
    #[arg(long, value_name = "RANGE")]
    sweep_low_speed_braking: Option<SweepRange>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let base = resolve_base_config(&cli)?;
    let sweeps = collect_sweeps(&cli);
    let configs = config::apply_sweeps(&base, &sweeps);

    info!(
        "running {} simulation(s) of model {}",
        configs.len(),
        base.model_type().as_str()
    );
    run_all(configs)
}

/// Builds the base run config: config file first, then CLI overrides.
fn resolve_base_config(cli: &Cli) -> Result<ModelConfig> {
    let mut config = match &cli.config {
        Some(path) => config::load_file(path)?,
        None => {
            let model = match &cli.model {
                Some(name) => ModelType::from_str(name)?,
                None => ModelType::NagelSchreckenberg,
            };
            ModelConfig::from_base(model, SimulationConfig::defaults())
        }
    };

    // A model given on the command line wins over the config file.
    if let Some(name) = &cli.model {
        let model = ModelType::from_str(name)?;
        if model != config.model_type() {
            config = ModelConfig::from_base(model, config.base().clone());
        }
    }

    let base = config.base_mut();
    if let Some(steps) = cli.steps {
        base.step_count = if steps < 0 { None } else { Some(steps as u64) };
    }
    if let Some(seed) = cli.seed {
        base.random_seed = seed;
    }
    if cli.cyclic {
        base.cyclic = true;
    }
    if let Some(ms) = cli.step_delay_ms {
        if ms < 0 {
            return Err(ConfigError::NegativeStepDelay(ms).into());
        }
        base.step_delay = Duration::from_millis(ms as u64);
    }
    if let Some(prefix) = &cli.output_prefix {
        base.output_prefix = prefix.clone();
    }
    Ok(config)
}

fn collect_sweeps(cli: &Cli) -> Vec<(SweepParameter, SweepRange)> {
    let options = [
        (SweepParameter::CarCount, cli.sweep_cars),
        (SweepParameter::RoadLength, cli.sweep_road_length),
        (SweepParameter::MaxSpeed, cli.sweep_max_speed),
        (SweepParameter::BrakingProbability, cli.sweep_braking),
        (
            SweepParameter::StartAccelerationProbability,
            cli.sweep_start_probability,
        ),
        (
            SweepParameter::LowSpeedThreshold,
            cli.sweep_low_speed_threshold,
        ),
        (
            SweepParameter::LowSpeedBrakingProbability,
            cli.sweep_low_speed_braking,
        ),
    ];
    options
        .into_iter()
        .filter_map(|(parameter, range)| range.map(|range| (parameter, range)))
        .collect()
}

/// Runs every config on its own worker thread. Runs are independent and
/// share no state; each owns its model, random source and output files.
fn run_all(configs: Vec<ModelConfig>) -> Result<()> {
    let mut failures = 0usize;
    thread::scope(|scope| {
        let handles: Vec<_> = configs
            .into_iter()
            .map(|config| scope.spawn(move || run_one(config)))
            .collect();
        for handle in handles {
            match handle.join() {
                Ok(Ok(())) => {}
                Ok(Err(err)) => {
                    error!("simulation run failed: {err:#}");
                    failures += 1;
                }
                Err(_) => {
                    error!("simulation worker panicked");
                    failures += 1;
                }
            }
        }
    });
    if failures > 0 {
        return Err(anyhow!("{failures} simulation run(s) failed"));
    }
    Ok(())
}

fn run_one(config: ModelConfig) -> Result<()> {
    let prefix = config.base().output_prefix.clone();
    let model = build_model(&config)?;
    let mut sink = FileSink::create(config.base())
        .with_context(|| format!("failed to open output files under '{prefix}'"))?;

    let mut engine = SimulationEngine::new(model);
    engine.run(&mut sink)?;

    let statistics = engine.model().statistics();
    if statistics.iteration_count() == 0 {
        info!("run '{prefix}' finished without completing any step");
        return Ok(());
    }
    info!(
        "run '{}' finished: steps={} density={:.4} avg_speed={:.4} flow={:.4}",
        prefix,
        statistics.iteration_count(),
        statistics.density(),
        statistics.average_speed(),
        statistics.flow(),
    );
    Ok(())
}
