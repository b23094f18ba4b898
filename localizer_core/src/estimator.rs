//! Pose estimator: noisy range readings → best-fit pose.
//!
//! Each call is independent. There is no carry-over between ticks, no
//! smoothing and no retry from other starting points. The solver result is
//! returned as-is together with two quality signals:
//! - `converged`: the solver stopped at a stationary point of the bounded
//!   problem, not on a cap or a stall
//! - `reprojection_rms`: how well readings re-cast from the estimate match
//!   the observed ones
//!
//! A converged, well-reprojected estimate can still be wrong. Readings from a
//! square arena are invariant under 90° rotations about the center, and three
//! beams do not always pin the pose down uniquely.

use crate::{
    error::EstimateError,
    lm::{LevenbergMarquardt, LmConfig},
    nelder_mead::{NelderMead, NelderMeadConfig},
    objective::WallResidual,
    optimizer::{Bounds, Optimizer, Param, Termination},
};
use sensor_models::{sense, Arena, Pose, SensorRig};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Which minimizer backs the estimator.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "clap", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum SolverKind {
    #[default]
    LevenbergMarquardt,
    NelderMead,
}

/// Configuration for the pose estimator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Starting point. `None` → arena center, heading 0
    pub initial_guess: Option<Pose>,
    /// Search box. `None` → `x, y ∈ [0, L]`, `θ ∈ [0, 2π]` with a periodic heading
    pub bounds: Option<Bounds>,
    pub solver: SolverKind,
    pub lm: LmConfig,
    pub nelder_mead: NelderMeadConfig,
    /// Wall-clock cap per estimate (milliseconds). `None` → iteration cap only
    pub time_limit_ms: Option<u64>,
    /// Reprojection RMS (world units) under which a converged estimate is trusted
    pub trust_tolerance: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            initial_guess: None,
            bounds: None,
            solver: SolverKind::default(),
            lm: LmConfig::default(),
            nelder_mead: NelderMeadConfig::default(),
            time_limit_ms: None,
            trust_tolerance: 0.05,
        }
    }
}

/// Result of one estimate.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PoseEstimate {
    /// Best pose found, heading normalized to `[0, 2π)`
    pub pose: Pose,
    /// Objective value at `pose`
    pub cost: f64,
    pub converged: bool,
    pub termination: Termination,
    pub iterations: usize,
    pub evaluations: usize,
    /// RMS of (re-cast readings − observed readings), both clipped to `[0, L]`
    pub reprojection_rms: f64,
}

impl PoseEstimate {
    /// Converged and consistent with the observed readings.
    pub fn is_trusted(&self, tolerance: f64) -> bool {
        self.converged && self.reprojection_rms <= tolerance
    }
}

/// Pose estimator bound to one arena and rig.
#[derive(Clone, Debug)]
pub struct PoseEstimator {
    arena: Arena,
    rig: SensorRig,
    config: EstimatorConfig,
    bounds: Bounds,
    initial: Param,
}

impl PoseEstimator {
    /// Validate the configuration once; per-tick calls only validate readings.
    pub fn new(arena: Arena, rig: SensorRig, config: EstimatorConfig) -> Result<Self, EstimateError> {
        config.lm.validate().map_err(EstimateError::InvalidConfig)?;
        config.nelder_mead.validate().map_err(EstimateError::InvalidConfig)?;
        if !(config.trust_tolerance >= 0.0) {
            return Err(EstimateError::InvalidConfig(format!(
                "trust_tolerance must be non-negative, got {}",
                config.trust_tolerance
            )));
        }

        let bounds = config.bounds.unwrap_or_else(|| Bounds::for_arena(arena.side()));
        bounds.validate()?;

        let (cx, cy) = arena.center();
        let guess = config.initial_guess.unwrap_or(Pose::new(cx, cy, 0.0));
        let initial = Param::new(guess.x, guess.y, guess.theta);
        if !bounds.contains(&initial) {
            return Err(EstimateError::InitialGuessOutOfBounds {
                x: guess.x,
                y: guess.y,
                theta: guess.theta,
            });
        }

        Ok(Self {
            arena,
            rig,
            config,
            bounds,
            initial,
        })
    }

    pub fn arena(&self) -> &Arena {
        &self.arena
    }

    pub fn rig(&self) -> &SensorRig {
        &self.rig
    }

    pub fn config(&self) -> &EstimatorConfig {
        &self.config
    }

    fn validate_readings(&self, readings: &[f64]) -> Result<(), EstimateError> {
        if readings.len() != self.rig.len() {
            return Err(EstimateError::ReadingCount {
                expected: self.rig.len(),
                got: readings.len(),
            });
        }
        if let Some((index, &value)) = readings.iter().enumerate().find(|(_, d)| !d.is_finite()) {
            return Err(EstimateError::NonFiniteReading { index, value });
        }
        Ok(())
    }

    /// Estimate the pose that best explains `readings`.
    pub fn estimate(&self, readings: &[f64]) -> Result<PoseEstimate, EstimateError> {
        self.validate_readings(readings)?;

        let problem = WallResidual::new(readings, &self.rig, &self.arena);
        let deadline = self
            .config
            .time_limit_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));

        let result = match self.config.solver {
            SolverKind::LevenbergMarquardt => LevenbergMarquardt::new(self.config.lm.clone())
                .minimize(&problem, &self.bounds, self.initial, deadline),
            SolverKind::NelderMead => NelderMead::new(self.config.nelder_mead.clone())
                .minimize(&problem, &self.bounds, self.initial, deadline),
        };

        let pose = Pose::new(result.x[0], result.x[1], result.x[2]);
        let reprojection_rms = self.reprojection_rms(&pose, readings);
        let converged = result.converged();

        if converged {
            tracing::debug!(
                %pose,
                cost = result.cost,
                iterations = result.iterations,
                reprojection_rms,
                "pose estimate converged"
            );
        } else {
            tracing::warn!(
                %pose,
                cost = result.cost,
                iterations = result.iterations,
                termination = ?result.termination,
                "pose estimate did not converge; returning best point"
            );
        }

        Ok(PoseEstimate {
            pose,
            cost: result.cost,
            converged,
            termination: result.termination,
            iterations: result.iterations,
            evaluations: result.evaluations,
            reprojection_rms,
        })
    }

    fn reprojection_rms(&self, pose: &Pose, readings: &[f64]) -> f64 {
        let side = self.arena.side();
        let predicted = sense(pose, &self.rig, &self.arena);
        let sum_sq: f64 = predicted
            .iter()
            .zip(readings)
            .map(|(p, d)| {
                let diff = p.clamp(0.0, side) - d.clamp(0.0, side);
                diff * diff
            })
            .sum();
        (sum_sq / readings.len() as f64).sqrt()
    }
}

/// One-shot estimate with the default solver and the given start and box.
pub fn estimate(
    readings: &[f64],
    rig: &SensorRig,
    arena: &Arena,
    initial_guess: Pose,
    bounds: Bounds,
) -> Result<PoseEstimate, EstimateError> {
    let config = EstimatorConfig {
        initial_guess: Some(initial_guess),
        bounds: Some(bounds),
        ..Default::default()
    };
    PoseEstimator::new(*arena, rig.clone(), config)?.estimate(readings)
}
