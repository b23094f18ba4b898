//! Bounded Levenberg-Marquardt solver.
//!
//! Each iteration builds a forward-difference Jacobian `J` of the residual
//! vector, solves the damped normal equations
//!
//! `(JᵀJ + λ·diag(JᵀJ + ε))·δ = −Jᵀr`
//!
//! over the free variables only, and projects `p + δ` back into the box. A
//! variable is held fixed when it sits on a bound and the gradient pushes it
//! outward (active set), so the step does not waste itself against the box.
//! A step is accepted only if it lowers the cost; λ shrinks after an accepted
//! step and grows after a rejected one.
//!
//! Tiny steps, tiny decreases and runaway λ only end the run. Whether the
//! run counts as converged is decided by the projected gradient at the final
//! point; a point that is not stationary is reported as
//! [`Termination::Stalled`].
//!
//! The objective is piecewise smooth (the wall residual switches walls), so
//! the finite-difference Jacobian is only locally valid. The damping keeps
//! steps short enough to stay on one piece near the solution.

use crate::optimizer::{self, Bounds, OptimizeResult, Optimizer, Param, ResidualProblem, Termination};
use nalgebra::{DMatrix, DVector, Matrix3};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Added to the damping diagonal so a zero Jacobian column still gets damped.
const DIAG_FLOOR: f64 = 1e-9;

/// Configuration for the Levenberg-Marquardt solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of outer iterations.
    /// Default: 200
    pub max_iterations: usize,
    /// Stop when the cost is at or below this value.
    /// Default: 1e-16
    pub cost_tolerance: f64,
    /// Stop when an accepted step is shorter than this.
    /// Default: 1e-12
    pub step_tolerance: f64,
    /// Stop when an accepted step lowers the cost by at most this fraction.
    /// Default: 1e-15
    pub relative_decrease_tolerance: f64,
    /// A stopped run counts as converged only if the projected gradient is
    /// at most this, scaled by `1 + cost`.
    /// Default: 1e-8
    pub gradient_tolerance: f64,
    /// Initial damping λ.
    /// Default: 1e-3
    pub initial_lambda: f64,
    /// Factor to scale λ down (accepted step) or up (rejected step).
    /// Default: 10
    pub lambda_factor: f64,
    /// Floor for λ after accepted steps.
    /// Default: 1e-12
    pub min_lambda: f64,
    /// λ above this means no damped step lowers the cost.
    /// Default: 1e10
    pub max_lambda: f64,
    /// Relative finite-difference step, scaled by `max(1, |p_j|)`.
    /// Default: 1e-7
    pub fd_step: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            cost_tolerance: 1e-16,
            step_tolerance: 1e-12,
            relative_decrease_tolerance: 1e-15,
            gradient_tolerance: 1e-8,
            initial_lambda: 1e-3,
            lambda_factor: 10.0,
            min_lambda: 1e-12,
            max_lambda: 1e10,
            fd_step: 1e-7,
        }
    }
}

impl LmConfig {
    /// Builder-style setter for maximum iterations.
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("lm.max_iterations must be at least 1".into());
        }
        if !(self.lambda_factor > 1.0) {
            return Err(format!("lm.lambda_factor must exceed 1, got {}", self.lambda_factor));
        }
        if !(self.fd_step > 0.0) {
            return Err(format!("lm.fd_step must be positive, got {}", self.fd_step));
        }
        if !(self.gradient_tolerance > 0.0) {
            return Err(format!(
                "lm.gradient_tolerance must be positive, got {}",
                self.gradient_tolerance
            ));
        }
        if !(self.initial_lambda >= 0.0 && self.min_lambda >= 0.0 && self.max_lambda > self.min_lambda) {
            return Err("lm damping limits must satisfy 0 <= min_lambda < max_lambda".into());
        }
        Ok(())
    }
}

/// Bounded Levenberg-Marquardt minimizer.
#[derive(Clone, Debug, Default)]
pub struct LevenbergMarquardt {
    pub config: LmConfig,
}

impl LevenbergMarquardt {
    pub fn new(config: LmConfig) -> Self {
        Self { config }
    }

    /// `reason` if `x` is stationary, [`Termination::Stalled`] otherwise.
    fn settle(&self, bounds: &Bounds, x: &Param, g: &Param, cost: f64, reason: Termination) -> Termination {
        if bounds.is_stationary(x, g, cost, self.config.gradient_tolerance) {
            reason
        } else {
            Termination::Stalled
        }
    }
}

impl Optimizer for LevenbergMarquardt {
    fn minimize(
        &self,
        problem: &dyn ResidualProblem,
        bounds: &Bounds,
        x0: Param,
        deadline: Option<Instant>,
    ) -> OptimizeResult {
        let cfg = &self.config;
        let m = problem.num_residuals();

        let mut x = bounds.project(x0);
        let mut r = DVector::zeros(m);
        problem.residuals(&x, &mut r);
        let mut cost = r.norm_squared();
        let mut evaluations = 1;

        let mut lambda = cfg.initial_lambda;
        let mut jac = DMatrix::zeros(m, 3);
        let mut probe_r = DVector::zeros(m);
        let mut candidate_r = DVector::zeros(m);
        // Set once progress dries up; confirmed or rejected at the next gradient
        let mut stagnation: Option<Termination> = None;

        let finish = |x: Param, cost: f64, iterations: usize, evaluations: usize, termination| {
            OptimizeResult {
                x,
                cost,
                iterations,
                evaluations,
                termination,
            }
        };

        for iter in 0..cfg.max_iterations {
            if cost <= cfg.cost_tolerance {
                return finish(x, cost, iter, evaluations, Termination::CostTolerance);
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                return finish(x, cost, iter, evaluations, Termination::TimeLimit);
            }

            optimizer::forward_jacobian(problem, bounds, &x, &r, cfg.fd_step, &mut probe_r, &mut jac);
            evaluations += 3;

            // Normal equations: H = JᵀJ, g = Jᵀr
            let h_dyn = jac.tr_mul(&jac);
            let h = Matrix3::from_fn(|i, k| h_dyn[(i, k)]);
            let g = optimizer::gradient(&jac, &r);

            if let Some(reason) = stagnation {
                let termination = self.settle(bounds, &x, &g, cost, reason);
                return finish(x, cost, iter, evaluations, termination);
            }

            let blocked = [0, 1, 2].map(|i| bounds.blocks(&x, &g, i));

            // Raise λ until the damped step lowers the cost
            let (candidate, candidate_cost) = loop {
                if lambda > cfg.max_lambda {
                    let termination = self.settle(bounds, &x, &g, cost, Termination::StepTolerance);
                    return finish(x, cost, iter, evaluations, termination);
                }
                let mut a = h;
                for i in 0..3 {
                    a[(i, i)] += lambda * (h[(i, i)] + DIAG_FLOOR);
                }
                let mut rhs = -g;
                for i in (0..3).filter(|&i| blocked[i]) {
                    a.row_mut(i).fill(0.0);
                    a.column_mut(i).fill(0.0);
                    a[(i, i)] = 1.0;
                    rhs[i] = 0.0;
                }
                let Some(delta) = a.lu().solve(&rhs) else {
                    lambda *= cfg.lambda_factor;
                    continue;
                };
                let candidate = bounds.project(x + delta);
                problem.residuals(&candidate, &mut candidate_r);
                evaluations += 1;
                let candidate_cost = candidate_r.norm_squared();
                if candidate_cost < cost {
                    break (candidate, candidate_cost);
                }
                lambda *= cfg.lambda_factor;
            };

            let step = (candidate - x).norm();
            let decrease = cost - candidate_cost;
            x = candidate;
            r.copy_from(&candidate_r);
            cost = candidate_cost;
            lambda = (lambda / cfg.lambda_factor).max(cfg.min_lambda);

            if step < cfg.step_tolerance {
                stagnation = Some(Termination::StepTolerance);
            } else if decrease <= cfg.relative_decrease_tolerance * cost {
                stagnation = Some(Termination::DecreaseTolerance);
            }
        }

        finish(x, cost, cfg.max_iterations, evaluations, Termination::MaxIterations)
    }
}
