//! Parallel grid sweep of the estimator.
//!
//! Every grid cell is an independent single-tick experiment with its own
//! seeded generator, so results do not depend on rayon's scheduling.

use crate::{error::SimError, noise::NoiseModel, runner::SUCCESS_RADIUS, scenarios::ScenarioConfig};
use localizer_core::{LocalizationMetrics, PoseEstimate, PoseEstimator};
use rayon::prelude::*;
use sensor_models::{sense, Pose};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Grid layout: positions `step, 2·step, …` strictly inside the arena on both axes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepGrid {
    pub step: f64,
    /// Heading used at every cell
    pub heading_deg: f64,
}

impl Default for SweepGrid {
    fn default() -> Self {
        Self {
            step: 0.5,
            heading_deg: 30.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SweepCell {
    pub true_pose: Pose,
    pub readings: Vec<f64>,
    pub estimate: PoseEstimate,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SweepReport {
    pub cells: Vec<SweepCell>,
    pub metrics: LocalizationMetrics,
}

impl SweepGrid {
    pub fn poses(&self, side: f64) -> Result<Vec<Pose>, SimError> {
        if !(self.step.is_finite() && self.step > 0.0 && self.step < side) {
            return Err(SimError::InvalidSweep(format!(
                "step {} must lie in (0, {side})",
                self.step
            )));
        }
        if !self.heading_deg.is_finite() {
            return Err(SimError::InvalidSweep("heading must be finite".into()));
        }

        let n = ((side / self.step).ceil() as usize).saturating_sub(1);
        let coords: Vec<f64> = (1..=n)
            .map(|i| i as f64 * self.step)
            .filter(|&c| c < side)
            .collect();
        Ok(coords
            .iter()
            .flat_map(|&x| coords.iter().map(move |&y| (x, y)))
            .map(|(x, y)| Pose::from_degrees(x, y, self.heading_deg))
            .collect())
    }
}

/// Estimate every grid pose of `scenario`'s arena in parallel.
pub fn sweep(scenario: &ScenarioConfig, grid: &SweepGrid) -> Result<SweepReport, SimError> {
    scenario.noise.validate()?;
    let estimator = PoseEstimator::new(scenario.arena, scenario.rig.clone(), scenario.estimator.clone())?;
    let poses = grid.poses(scenario.arena.side())?;
    info!(cells = poses.len(), step = grid.step, "sweep started");

    let cells: Vec<SweepCell> = poses
        .par_iter()
        .enumerate()
        .map(|(i, pose)| -> Result<SweepCell, SimError> {
            let seed = scenario.seed.wrapping_add(i as u64);
            let mut noise = NoiseModel::seeded(&scenario.noise, &scenario.arena, seed)?;
            let readings = noise.perturb(&sense(pose, &scenario.rig, &scenario.arena));
            let estimate = estimator.estimate(&readings)?;
            Ok(SweepCell {
                true_pose: *pose,
                readings,
                estimate,
            })
        })
        .collect::<Result<_, SimError>>()?;

    let mut metrics = LocalizationMetrics::default();
    for c in &cells {
        metrics.accumulate(
            &c.true_pose,
            &c.estimate,
            &scenario.arena,
            scenario.estimator.trust_tolerance,
            SUCCESS_RADIUS,
        );
    }
    info!(
        cells = cells.len(),
        symmetric_rate = metrics.symmetric_rate(),
        rmse_position_symmetric = metrics.rmse_position_symmetric(),
        "sweep finished"
    );
    Ok(SweepReport { cells, metrics })
}
