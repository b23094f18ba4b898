//! Localization metrics: RMSE position/heading, convergence and trust rates.

use crate::estimator::PoseEstimate;
use sensor_models::{Arena, Pose};
use serde::{Deserialize, Serialize};

/// Accumulated metric statistics over a run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LocalizationMetrics {
    /// Number of estimates evaluated
    pub n_estimates: u64,
    /// Estimates whose solver reported convergence
    pub n_converged: u64,
    /// Converged estimates whose reprojection RMS was within tolerance
    pub n_trusted: u64,
    /// Estimates within the success radius of the true pose
    pub n_exact: u64,
    /// Estimates within the success radius of some symmetric alias
    pub n_symmetric: u64,
    /// Sum of squared position errors (for RMSE)
    pub sum_sq_pos_err: f64,
    /// Sum of squared heading errors (for RMSE)
    pub sum_sq_heading_err: f64,
    /// Sum of squared position errors to the nearest symmetric alias
    pub sum_sq_pos_err_symmetric: f64,
}

impl LocalizationMetrics {
    /// Root-mean-square position error (world units).
    pub fn rmse_position(&self) -> f64 {
        self.rmse(self.sum_sq_pos_err)
    }

    /// Root-mean-square heading error (radians).
    pub fn rmse_heading(&self) -> f64 {
        self.rmse(self.sum_sq_heading_err)
    }

    /// Position RMSE modulo the arena's 90° symmetry.
    pub fn rmse_position_symmetric(&self) -> f64 {
        self.rmse(self.sum_sq_pos_err_symmetric)
    }

    pub fn convergence_rate(&self) -> f64 {
        self.rate(self.n_converged)
    }

    pub fn trusted_rate(&self) -> f64 {
        self.rate(self.n_trusted)
    }

    pub fn exact_rate(&self) -> f64 {
        self.rate(self.n_exact)
    }

    pub fn symmetric_rate(&self) -> f64 {
        self.rate(self.n_symmetric)
    }

    fn rmse(&self, sum_sq: f64) -> f64 {
        if self.n_estimates == 0 {
            return 0.0;
        }
        (sum_sq / self.n_estimates as f64).sqrt()
    }

    fn rate(&self, count: u64) -> f64 {
        if self.n_estimates == 0 {
            0.0
        } else {
            count as f64 / self.n_estimates as f64
        }
    }

    /// Accumulate one tick.
    ///
    /// `success_radius` bounds both the position error (world units) and the
    /// heading error (radians) for a tick to count as exact.
    pub fn accumulate(
        &mut self,
        truth: &Pose,
        estimate: &PoseEstimate,
        arena: &Arena,
        trust_tolerance: f64,
        success_radius: f64,
    ) {
        self.n_estimates += 1;
        if estimate.converged {
            self.n_converged += 1;
        }
        if estimate.is_trusted(trust_tolerance) {
            self.n_trusted += 1;
        }

        let est = &estimate.pose;
        let pos_err = truth.position_error(est);
        let heading_err = truth.heading_error(est);
        self.sum_sq_pos_err += pos_err * pos_err;
        self.sum_sq_heading_err += heading_err * heading_err;

        let within = |p: &Pose| p.position_error(est) <= success_radius && p.heading_error(est).abs() <= success_radius;
        if within(truth) {
            self.n_exact += 1;
        }

        let aliases = arena.symmetric_poses(truth);
        if aliases.iter().any(within) {
            self.n_symmetric += 1;
        }
        let sym_err = aliases
            .iter()
            .map(|p| p.position_error(est))
            .fold(f64::INFINITY, f64::min);
        self.sum_sq_pos_err_symmetric += sym_err * sym_err;
    }

    /// Fold another run's statistics into this one.
    pub fn merge(&mut self, other: &LocalizationMetrics) {
        self.n_estimates += other.n_estimates;
        self.n_converged += other.n_converged;
        self.n_trusted += other.n_trusted;
        self.n_exact += other.n_exact;
        self.n_symmetric += other.n_symmetric;
        self.sum_sq_pos_err += other.sum_sq_pos_err;
        self.sum_sq_heading_err += other.sum_sq_heading_err;
        self.sum_sq_pos_err_symmetric += other.sum_sq_pos_err_symmetric;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::optimizer::Termination;
    use approx::assert_abs_diff_eq;

    fn estimate_at(pose: Pose, converged: bool) -> PoseEstimate {
        PoseEstimate {
            pose,
            cost: 0.0,
            converged,
            termination: if converged {
                Termination::CostTolerance
            } else {
                Termination::MaxIterations
            },
            iterations: 1,
            evaluations: 4,
            reprojection_rms: 0.0,
        }
    }

    #[test]
    fn empty_metrics_are_zero() {
        let m = LocalizationMetrics::default();
        assert_eq!(m.rmse_position(), 0.0);
        assert_eq!(m.convergence_rate(), 0.0);
    }

    #[test]
    fn accumulates_errors_and_rates() {
        let arena = Arena::new(10.0).unwrap();
        let truth = Pose::from_degrees(6.0, 3.0, 30.0);
        let mut m = LocalizationMetrics::default();
        m.accumulate(&truth, &estimate_at(truth, true), &arena, 0.05, 1e-2);
        m.accumulate(&truth, &estimate_at(Pose::from_degrees(9.0, 7.0, 30.0), false), &arena, 0.05, 1e-2);

        assert_eq!(m.n_estimates, 2);
        assert_abs_diff_eq!(m.convergence_rate(), 0.5);
        assert_abs_diff_eq!(m.trusted_rate(), 0.5);
        assert_abs_diff_eq!(m.exact_rate(), 0.5);
        // Second estimate is 5 units away: RMSE = sqrt(25 / 2)
        assert_abs_diff_eq!(m.rmse_position(), (12.5f64).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(m.rmse_heading(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn symmetric_alias_counts_as_symmetric_success() {
        let arena = Arena::new(10.0).unwrap();
        let truth = Pose::from_degrees(6.5, 4.5, 100.0);
        let alias = Pose::from_degrees(4.5, 3.5, 10.0);
        let mut m = LocalizationMetrics::default();
        m.accumulate(&truth, &estimate_at(alias, true), &arena, 0.05, 1e-2);
        assert_eq!(m.n_exact, 0);
        assert_eq!(m.n_symmetric, 1);
        assert_abs_diff_eq!(m.rmse_position_symmetric(), 0.0, epsilon = 1e-9);
        assert!(m.rmse_position() > 2.0);
    }

    #[test]
    fn merge_adds_counts() {
        let arena = Arena::new(10.0).unwrap();
        let truth = Pose::from_degrees(6.0, 3.0, 30.0);
        let mut a = LocalizationMetrics::default();
        a.accumulate(&truth, &estimate_at(truth, true), &arena, 0.05, 1e-2);
        let mut b = a.clone();
        b.merge(&a);
        assert_eq!(b.n_estimates, 2);
        assert_eq!(b.n_exact, 2);
    }
}
