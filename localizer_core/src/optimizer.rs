//! Bounded local minimizer capability.
//!
//! The estimator only needs "given residuals, a box and a start point, return
//! the best point found and whether the solver believes it converged". Any
//! bounded local method fits; two are provided:
//! - [`LevenbergMarquardt`](crate::lm::LevenbergMarquardt): damped Gauss-Newton
//!   with box projection (default)
//! - [`NelderMead`](crate::nelder_mead::NelderMead): derivative-free simplex
//!   with box projection
//!
//! "Converged" means the returned point is stationary for the bounded problem:
//! the projected gradient `P(x − g) − x` vanishes. A clamped step that merely
//! got short is not enough.

use crate::error::EstimateError;
use nalgebra::{DMatrix, DVector, Vector3};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Parameter vector `[x, y, θ]`.
pub type Param = Vector3<f64>;

/// A least-squares problem: `cost(p) = ‖r(p)‖²`.
pub trait ResidualProblem {
    fn num_residuals(&self) -> usize;

    /// Write `r(p)` into `out` (length [`num_residuals`](Self::num_residuals)).
    fn residuals(&self, p: &Param, out: &mut DVector<f64>);

    fn cost(&self, p: &Param) -> f64 {
        let mut r = DVector::zeros(self.num_residuals());
        self.residuals(p, &mut r);
        r.norm_squared()
    }
}

/// Trait for a bounded local minimizer.
pub trait Optimizer {
    /// Minimize `problem` over `bounds` starting at `x0`.
    ///
    /// Always returns the best point evaluated. `deadline` caps wall-clock
    /// time; the iteration cap lives in each solver's config.
    fn minimize(
        &self,
        problem: &dyn ResidualProblem,
        bounds: &Bounds,
        x0: Param,
        deadline: Option<Instant>,
    ) -> OptimizeResult;
}

/// Why the solver stopped.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Termination {
    /// Cost fell below the absolute tolerance
    CostTolerance,
    /// Step shorter than the step tolerance at a stationary point
    StepTolerance,
    /// Relative cost decrease (or simplex spread) below tolerance at a
    /// stationary point
    DecreaseTolerance,
    /// Iteration cap reached
    MaxIterations,
    /// Wall-clock limit reached
    TimeLimit,
    /// No further progress, but the point is not stationary
    Stalled,
}

impl Termination {
    pub fn converged(self) -> bool {
        matches!(
            self,
            Termination::CostTolerance | Termination::StepTolerance | Termination::DecreaseTolerance
        )
    }
}

/// Output of [`Optimizer::minimize`].
#[derive(Clone, Debug)]
pub struct OptimizeResult {
    pub x: Param,
    pub cost: f64,
    pub iterations: usize,
    /// Number of residual evaluations
    pub evaluations: usize,
    pub termination: Termination,
}

impl OptimizeResult {
    pub fn converged(&self) -> bool {
        self.termination.converged()
    }
}

/// Axis-aligned box `lower ≤ p ≤ upper`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub lower: [f64; 3],
    pub upper: [f64; 3],
    /// Axes along which the objective repeats with period `upper − lower`.
    /// Points are still clamped, but the bounds of such an axis are a seam:
    /// resting on one never makes a point stationary.
    #[serde(default)]
    pub periodic: [bool; 3],
}

impl Bounds {
    pub fn new(lower: [f64; 3], upper: [f64; 3]) -> Result<Self, EstimateError> {
        let bounds = Self {
            lower,
            upper,
            periodic: [false; 3],
        };
        bounds.validate()?;
        Ok(bounds)
    }

    /// `x, y ∈ [0, L]`, `θ ∈ [0, 2π]` with the heading periodic.
    pub fn for_arena(side: f64) -> Self {
        Self {
            lower: [0.0, 0.0, 0.0],
            upper: [side, side, std::f64::consts::TAU],
            periodic: [false, false, true],
        }
    }

    pub fn with_periodic(mut self, axis: usize) -> Self {
        self.periodic[axis] = true;
        self
    }

    pub fn validate(&self) -> Result<(), EstimateError> {
        for axis in 0..3 {
            let (lower, upper) = (self.lower[axis], self.upper[axis]);
            if !lower.is_finite() || !upper.is_finite() || lower > upper {
                return Err(EstimateError::InvalidBounds { axis, lower, upper });
            }
        }
        Ok(())
    }

    pub fn contains(&self, p: &Param) -> bool {
        (0..3).all(|i| p[i] >= self.lower[i] && p[i] <= self.upper[i])
    }

    /// Clamp `p` into the box.
    pub fn project(&self, p: Param) -> Param {
        Param::from_fn(|i, _| p[i].clamp(self.lower[i], self.upper[i]))
    }

    pub fn width(&self, axis: usize) -> f64 {
        self.upper[axis] - self.lower[axis]
    }

    /// True when `axis` sits on a bound and descent along `-g` leaves the box.
    pub fn blocks(&self, x: &Param, g: &Param, axis: usize) -> bool {
        (x[axis] <= self.lower[axis] && g[axis] > 0.0) || (x[axis] >= self.upper[axis] && g[axis] < 0.0)
    }

    /// `‖P(x − g) − x‖∞`, with periodic axes left unprojected.
    pub fn projected_gradient_norm(&self, x: &Param, g: &Param) -> f64 {
        (0..3)
            .map(|i| {
                if self.periodic[i] {
                    g[i].abs()
                } else {
                    ((x[i] - g[i]).clamp(self.lower[i], self.upper[i]) - x[i]).abs()
                }
            })
            .fold(0.0, f64::max)
    }

    /// First-order optimality of `x` for a cost of `cost` with gradient `g`.
    ///
    /// The tolerance grows with the cost: far from zero, the cost cannot
    /// resolve a gradient much below `√ε · cost`.
    pub fn is_stationary(&self, x: &Param, g: &Param, cost: f64, tolerance: f64) -> bool {
        self.projected_gradient_norm(x, g) <= tolerance * (1.0 + cost)
    }
}

/// Forward-difference Jacobian of `problem` at `x` (residuals `r` already
/// evaluated). Steps backwards at an upper bound so every probe stays inside.
pub(crate) fn forward_jacobian(
    problem: &dyn ResidualProblem,
    bounds: &Bounds,
    x: &Param,
    r: &DVector<f64>,
    fd_step: f64,
    probe_r: &mut DVector<f64>,
    jac: &mut DMatrix<f64>,
) {
    for j in 0..3 {
        let mut h = fd_step * x[j].abs().max(1.0);
        if x[j] + h > bounds.upper[j] {
            h = -h;
        }
        let mut probe = *x;
        probe[j] += h;
        problem.residuals(&probe, probe_r);
        for i in 0..r.len() {
            jac[(i, j)] = (probe_r[i] - r[i]) / h;
        }
    }
}

/// Gradient of `½‖r‖²`: `Jᵀr`.
pub(crate) fn gradient(jac: &DMatrix<f64>, r: &DVector<f64>) -> Param {
    let g = jac.tr_mul(r);
    Param::new(g[0], g[1], g[2])
}
