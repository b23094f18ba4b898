//! `tof-localize` CLI: scenario runs, replay, one-shot estimates and grid sweeps.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use localizer_core::{EstimatorConfig, PoseEstimator, SolverKind};
use sensor_models::{Arena, SensorRig};
use sim::replay::{load_replay, rerun, save_replay, ReplayLog};
use sim::scenarios::{ScenarioConfig, ScenarioKind};
use sim::sweep::{sweep, SweepGrid};
use sim::{NoiseModel, Simulation};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Parser)]
#[command(name = "tof-localize", about = "Rangefinder pose localization in a square arena")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a named scenario in batch mode and output metrics.
    RunScenario {
        #[arg(value_enum)]
        scenario: ScenarioKind,
        /// Random seed for reproducible noise. Omit for fresh entropy on every run
        #[arg(long)]
        seed: Option<u64>,
        /// Override the scenario's tick count
        #[arg(long)]
        ticks: Option<usize>,
        /// Override the scenario's solver
        #[arg(long, value_enum)]
        solver: Option<SolverKind>,
        /// Load the scenario from a JSON file instead of the preset
        #[arg(long)]
        config: Option<PathBuf>,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
        /// Also save the full replay log
        #[arg(long)]
        save_replay: Option<PathBuf>,
    },
    /// Load a recorded log and re-run the estimator on its readings.
    Replay {
        /// Path to replay JSON file
        input: PathBuf,
        /// Output metrics to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Estimate a single pose from a reading vector.
    Estimate {
        /// Comma-separated readings, one per sensor (default rig: 0°, 120°, −120°)
        #[arg(long, value_delimiter = ',', allow_hyphen_values = true, required = true)]
        readings: Vec<f64>,
        /// Arena side length
        #[arg(long, default_value_t = 10.0)]
        arena: f64,
        #[arg(long, value_enum, default_value_t = SolverKind::LevenbergMarquardt)]
        solver: SolverKind,
    },
    /// Estimate every pose of a grid in parallel and report accuracy.
    Sweep {
        /// Grid spacing
        #[arg(long, default_value_t = 0.5)]
        step: f64,
        /// Heading at every grid cell (degrees)
        #[arg(long, default_value_t = 30.0)]
        heading_deg: f64,
        /// Scenario supplying arena, rig, noise and estimator settings
        #[arg(long, value_enum, default_value_t = ScenarioKind::Noiseless)]
        scenario: ScenarioKind,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        /// Output the full report to a JSON file
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::RunScenario {
            scenario,
            seed,
            ticks,
            solver,
            config,
            output,
            save_replay: save_path,
        } => {
            let mut cfg = match config {
                Some(path) => ScenarioConfig::from_json_file(&path)
                    .with_context(|| format!("loading scenario from {}", path.display()))?,
                None => ScenarioConfig::build(scenario, seed.unwrap_or_default())?,
            };
            if let Some(s) = seed {
                cfg.seed = s;
            }
            if let Some(t) = ticks {
                cfg.ticks = t;
            }
            if let Some(s) = solver {
                cfg.estimator.solver = s;
            }
            run_scenario(cfg, seed.is_some(), output.as_deref(), save_path.as_deref())?;
        }
        Commands::Replay { input, output } => {
            run_replay(&input, output.as_deref())?;
        }
        Commands::Estimate {
            readings,
            arena,
            solver,
        } => {
            run_estimate(&readings, arena, solver)?;
        }
        Commands::Sweep {
            step,
            heading_deg,
            scenario,
            seed,
            output,
        } => {
            let cfg = ScenarioConfig::build(scenario, seed)?;
            run_sweep(&cfg, &SweepGrid { step, heading_deg }, output.as_deref())?;
        }
    }

    Ok(())
}

fn run_scenario(
    cfg: ScenarioConfig,
    seeded: bool,
    output_path: Option<&Path>,
    replay_path: Option<&Path>,
) -> Result<()> {
    let sim = Simulation::new(cfg)?;
    let cfg = sim.config();
    let mut noise = if seeded {
        sim.noise_model()?
    } else {
        NoiseModel::from_entropy(&cfg.noise, &cfg.arena)?
    };

    let seed_label = if seeded { cfg.seed.to_string() } else { "entropy".into() };
    println!(
        "Running scenario '{}' (seed={}, ticks={}, solver={:?})...",
        cfg.name, seed_label, cfg.ticks, cfg.estimator.solver
    );
    let start = std::time::Instant::now();
    let outcome = sim.run(&mut noise)?;
    let elapsed = start.elapsed();

    let m = &outcome.metrics;
    println!(
        "Done: {} ticks, elapsed={:.2}s, converged={:.1}%, trusted={:.1}%",
        m.n_estimates,
        elapsed.as_secs_f64(),
        100.0 * m.convergence_rate(),
        100.0 * m.trusted_rate(),
    );
    println!(
        "RMSE position={:.4} (symmetry-aware {:.4}), heading={:.4} rad",
        m.rmse_position(),
        m.rmse_position_symmetric(),
        m.rmse_heading(),
    );

    if let Some(rpath) = replay_path {
        let log = ReplayLog::new(cfg, outcome.records.clone());
        save_replay(&log, rpath)?;
        println!("Replay saved to {}", rpath.display());
    }

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": cfg.name,
            "seed": seeded.then_some(cfg.seed),
            "elapsed_s": elapsed.as_secs_f64(),
            "metrics": m,
            "rmse_position": m.rmse_position(),
            "rmse_position_symmetric": m.rmse_position_symmetric(),
            "rmse_heading": m.rmse_heading(),
            "convergence_rate": m.convergence_rate(),
            "trusted_rate": m.trusted_rate(),
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
        println!("Metrics saved to {}", opath.display());
    }

    Ok(())
}

fn run_replay(input: &Path, output_path: Option<&Path>) -> Result<()> {
    let log = load_replay(input).with_context(|| format!("reading replay {}", input.display()))?;
    println!("Replaying '{}' ({} ticks)...", log.scenario_name, log.records.len());

    let start = std::time::Instant::now();
    let outcome = rerun(&log)?;
    let elapsed = start.elapsed();

    let changed = outcome
        .records
        .iter()
        .zip(&log.records)
        .filter(|(new, old)| new.estimate != old.estimate)
        .count();
    if changed > 0 {
        warn!(changed, "replayed estimates differ from the recorded ones");
    }

    let m = &outcome.metrics;
    println!(
        "Replay done: elapsed={:.2}s, rmse_position={:.4}, converged={:.1}%",
        elapsed.as_secs_f64(),
        m.rmse_position(),
        100.0 * m.convergence_rate(),
    );

    if let Some(opath) = output_path {
        let json = serde_json::json!({
            "scenario": log.scenario_name,
            "seed": log.seed,
            "elapsed_s": elapsed.as_secs_f64(),
            "changed_estimates": changed,
            "metrics": m,
        });
        std::fs::write(opath, serde_json::to_string_pretty(&json)?)?;
    }

    Ok(())
}

fn run_estimate(readings: &[f64], side: f64, solver: SolverKind) -> Result<()> {
    let arena = Arena::new(side)?;
    let config = EstimatorConfig {
        solver,
        ..Default::default()
    };
    let estimator = PoseEstimator::new(arena, SensorRig::default(), config)?;
    let estimate = estimator.estimate(readings)?;
    if !estimate.is_trusted(estimator.config().trust_tolerance) {
        warn!(
            rms = estimate.reprojection_rms,
            "estimate does not reproduce the readings; it may be a local minimum"
        );
    }
    println!("{}", serde_json::to_string_pretty(&estimate)?);
    Ok(())
}

fn run_sweep(cfg: &ScenarioConfig, grid: &SweepGrid, output_path: Option<&Path>) -> Result<()> {
    let start = std::time::Instant::now();
    let report = sweep(cfg, grid)?;
    let m = &report.metrics;
    println!(
        "Sweep '{}': {} cells, elapsed={:.2}s, exact={:.1}%, up to symmetry={:.1}%, trusted={:.1}%",
        cfg.name,
        report.cells.len(),
        start.elapsed().as_secs_f64(),
        100.0 * m.exact_rate(),
        100.0 * m.symmetric_rate(),
        100.0 * m.trusted_rate(),
    );

    if let Some(opath) = output_path {
        std::fs::write(opath, serde_json::to_string_pretty(&report)?)?;
        println!("Report saved to {}", opath.display());
    }
    Ok(())
}
