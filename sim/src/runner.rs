//! Tick-driven simulation loop.
//!
//! One tick is Motion → Sense → Noise → Estimate, in that order. All state
//! lives in a [`SimState`] value passed into and returned from [`Simulation::tick`].

use crate::{
    error::SimError,
    motion::MotionState,
    noise::NoiseModel,
    scenarios::ScenarioConfig,
};
use localizer_core::{LocalizationMetrics, PoseEstimate, PoseEstimator};
use rand::Rng;
use sensor_models::{sense, Pose};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Position/heading radius under which an estimate counts as a hit in the metrics.
pub const SUCCESS_RADIUS: f64 = 0.05;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimState {
    /// Ticks completed so far
    pub tick: usize,
    pub motion: MotionState,
}

/// Everything observed during one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: usize,
    pub true_pose: Pose,
    /// Noisy, clipped readings handed to the estimator
    pub readings: Vec<f64>,
    pub estimate: PoseEstimate,
}

/// Result of a full run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimOutcome {
    pub records: Vec<TickRecord>,
    pub metrics: LocalizationMetrics,
}

/// A validated scenario with its estimator built once.
#[derive(Clone, Debug)]
pub struct Simulation {
    config: ScenarioConfig,
    estimator: PoseEstimator,
}

impl Simulation {
    pub fn new(config: ScenarioConfig) -> Result<Self, SimError> {
        config.validate()?;
        let estimator = PoseEstimator::new(config.arena, config.rig.clone(), config.estimator.clone())?;
        Ok(Self { config, estimator })
    }

    pub fn config(&self) -> &ScenarioConfig {
        &self.config
    }

    pub fn estimator(&self) -> &PoseEstimator {
        &self.estimator
    }

    pub fn initial_state(&self) -> SimState {
        SimState {
            tick: 0,
            motion: self.config.motion.initial_state(self.config.start),
        }
    }

    /// Noise model seeded from the scenario seed.
    pub fn noise_model(&self) -> Result<NoiseModel, SimError> {
        NoiseModel::seeded(&self.config.noise, &self.config.arena, self.config.seed)
    }

    /// Advance the true pose, sense it, perturb the readings and estimate.
    pub fn tick<R: Rng>(
        &self,
        state: SimState,
        noise: &mut NoiseModel<R>,
    ) -> Result<(SimState, TickRecord), SimError> {
        let motion = self.config.motion.step(state.motion, &self.config.arena);
        let clean = sense(&motion.pose, &self.config.rig, &self.config.arena);
        let readings = noise.perturb(&clean);
        let estimate = self.estimator.estimate(&readings)?;

        let tick = state.tick + 1;
        let record = TickRecord {
            tick,
            true_pose: motion.pose,
            readings,
            estimate,
        };
        Ok((SimState { tick, motion }, record))
    }

    /// Run `config.ticks` ticks from the initial state.
    pub fn run<R: Rng>(&self, noise: &mut NoiseModel<R>) -> Result<SimOutcome, SimError> {
        info!(
            scenario = %self.config.name,
            ticks = self.config.ticks,
            sigma = noise.sigma(),
            "scenario started"
        );

        let mut state = self.initial_state();
        let mut records = Vec::with_capacity(self.config.ticks);
        for _ in 0..self.config.ticks {
            let (next, record) = self.tick(state, noise)?;
            state = next;
            records.push(record);
        }

        let metrics = self.score(&records);
        info!(
            scenario = %self.config.name,
            rmse_position = metrics.rmse_position(),
            rmse_position_symmetric = metrics.rmse_position_symmetric(),
            convergence_rate = metrics.convergence_rate(),
            "scenario finished"
        );
        Ok(SimOutcome { records, metrics })
    }

    /// Accumulate metrics over recorded ticks.
    pub fn score(&self, records: &[TickRecord]) -> LocalizationMetrics {
        let mut metrics = LocalizationMetrics::default();
        for r in records {
            metrics.accumulate(
                &r.true_pose,
                &r.estimate,
                &self.config.arena,
                self.config.estimator.trust_tolerance,
                SUCCESS_RADIUS,
            );
        }
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;
    use approx::assert_abs_diff_eq;

    fn short(kind: ScenarioKind, ticks: usize) -> Simulation {
        let mut cfg = ScenarioConfig::build(kind, 42).unwrap();
        cfg.ticks = ticks;
        Simulation::new(cfg).unwrap()
    }

    #[test]
    fn tick_moves_then_senses() {
        let sim = short(ScenarioKind::Noiseless, 1);
        let mut noise = sim.noise_model().unwrap();
        let s0 = sim.initial_state();
        let (s1, rec) = sim.tick(s0, &mut noise).unwrap();

        assert_eq!(s1.tick, 1);
        assert_eq!(rec.tick, 1);
        assert_abs_diff_eq!(rec.true_pose.x, 6.02, epsilon = 1e-12);
        assert_abs_diff_eq!(rec.true_pose.y, 3.015, epsilon = 1e-12);
        assert_eq!(rec.true_pose, s1.motion.pose);

        let cfg = sim.config();
        assert_eq!(rec.readings, sense(&rec.true_pose, &cfg.rig, &cfg.arena));
    }

    #[test]
    fn run_produces_one_record_per_tick() {
        let sim = short(ScenarioKind::Baseline, 25);
        let out = sim.run(&mut sim.noise_model().unwrap()).unwrap();
        assert_eq!(out.records.len(), 25);
        assert_eq!(out.metrics.n_estimates, 25);
        for (i, r) in out.records.iter().enumerate() {
            assert_eq!(r.tick, i + 1);
            assert_eq!(r.readings.len(), 3);
            assert!(r.readings.iter().all(|d| (0.0..=10.0).contains(d)));
            assert!(r.estimate.pose.x >= 0.0 && r.estimate.pose.x <= 10.0);
            assert!(r.estimate.pose.y >= 0.0 && r.estimate.pose.y <= 10.0);
        }
    }

    #[test]
    fn same_seed_same_run() {
        let sim = short(ScenarioKind::HighNoise, 10);
        let a = sim.run(&mut sim.noise_model().unwrap()).unwrap();
        let b = sim.run(&mut sim.noise_model().unwrap()).unwrap();
        assert_eq!(a.records, b.records);
    }

    #[test]
    fn different_seeds_differ_under_noise() {
        let sim = short(ScenarioKind::HighNoise, 3);
        let a = sim.run(&mut sim.noise_model().unwrap()).unwrap();
        let mut other = NoiseModel::seeded(&sim.config().noise, &sim.config().arena, 43).unwrap();
        let b = sim.run(&mut other).unwrap();
        assert_ne!(a.records[0].readings, b.records[0].readings);
    }

    #[test]
    fn score_matches_run_metrics() {
        let sim = short(ScenarioKind::Noiseless, 5);
        let out = sim.run(&mut sim.noise_model().unwrap()).unwrap();
        assert_eq!(sim.score(&out.records), out.metrics);
    }

    #[test]
    fn invalid_scenario_fails_at_construction() {
        let mut cfg = ScenarioConfig::build(ScenarioKind::Baseline, 0).unwrap();
        cfg.noise.sigma = -1.0;
        assert!(matches!(Simulation::new(cfg), Err(SimError::InvalidNoise(_))));

        let mut cfg = ScenarioConfig::build(ScenarioKind::Baseline, 0).unwrap();
        cfg.estimator.trust_tolerance = f64::NAN;
        assert!(matches!(Simulation::new(cfg), Err(SimError::Estimate(_))));
    }
}
