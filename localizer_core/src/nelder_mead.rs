//! Nelder-Mead simplex minimizer with box projection.
//!
//! Derivative-free, so it copes with the kinks of the wall residual, at the
//! price of many more cost evaluations than Levenberg-Marquardt. Every trial
//! vertex is clamped into the box; shrink steps stay inside by convexity.
//!
//! A simplex can also collapse against a bound face at a point that is not a
//! minimum. Once the simplex is small, one finite-difference gradient at the
//! best vertex decides between converged and [`Termination::Stalled`].

use crate::optimizer::{self, Bounds, OptimizeResult, Optimizer, Param, ResidualProblem, Termination};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Configuration for the Nelder-Mead solver.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Maximum number of simplex iterations.
    /// Default: 2000
    pub max_iterations: usize,
    /// Initial simplex edge as a fraction of each bound width.
    /// Default: 0.05
    pub initial_step_fraction: f64,
    /// Converged when the spread of vertex costs is at most this...
    /// Default: 1e-16
    pub f_tolerance: f64,
    /// ...and every vertex is within this of the best one (per axis).
    /// Default: 1e-10
    pub x_tolerance: f64,
    /// A collapsed simplex at or below this cost is converged outright.
    /// Default: 1e-16
    pub cost_tolerance: f64,
    /// Otherwise the projected gradient at the best vertex must be at most
    /// this, scaled by `1 + cost`.
    /// Default: 1e-8
    pub gradient_tolerance: f64,
    /// Relative finite-difference step for that gradient.
    /// Default: 1e-7
    pub fd_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            initial_step_fraction: 0.05,
            f_tolerance: 1e-16,
            x_tolerance: 1e-10,
            cost_tolerance: 1e-16,
            gradient_tolerance: 1e-8,
            fd_step: 1e-7,
        }
    }
}

impl NelderMeadConfig {
    pub fn with_max_iterations(mut self, iterations: usize) -> Self {
        self.max_iterations = iterations;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.max_iterations == 0 {
            return Err("nelder_mead.max_iterations must be at least 1".into());
        }
        if !(self.initial_step_fraction > 0.0 && self.initial_step_fraction <= 1.0) {
            return Err(format!(
                "nelder_mead.initial_step_fraction must be in (0, 1], got {}",
                self.initial_step_fraction
            ));
        }
        if !(self.fd_step > 0.0 && self.gradient_tolerance > 0.0) {
            return Err("nelder_mead.fd_step and gradient_tolerance must be positive".into());
        }
        Ok(())
    }
}

const REFLECTION: f64 = 1.0;
const EXPANSION: f64 = 2.0;
const CONTRACTION: f64 = 0.5;
const SHRINK: f64 = 0.5;

/// Bound-projected Nelder-Mead minimizer.
#[derive(Clone, Debug, Default)]
pub struct NelderMead {
    pub config: NelderMeadConfig,
}

impl NelderMead {
    pub fn new(config: NelderMeadConfig) -> Self {
        Self { config }
    }

    fn initial_simplex(&self, bounds: &Bounds, x0: Param) -> [Param; 4] {
        let mut simplex = [x0; 4];
        for axis in 0..3 {
            let mut step = self.config.initial_step_fraction * bounds.width(axis);
            if x0[axis] + step > bounds.upper[axis] {
                step = -step;
            }
            simplex[axis + 1][axis] += step;
        }
        simplex
    }

    /// Converged if `best` is a zero of the cost or a stationary point.
    fn settle(&self, bounds: &Bounds, best: &Param, eval: &mut Evaluator<'_>) -> Termination {
        let cost = eval.cost(best);
        if cost <= self.config.cost_tolerance {
            return Termination::DecreaseTolerance;
        }
        let problem = eval.problem;
        let m = problem.num_residuals();
        let r = eval.buf.clone();
        let mut probe_r = DVector::zeros(m);
        let mut jac = DMatrix::zeros(m, 3);
        optimizer::forward_jacobian(problem, bounds, best, &r, self.config.fd_step, &mut probe_r, &mut jac);
        eval.count += 3;
        let g = optimizer::gradient(&jac, &r);
        if bounds.is_stationary(best, &g, cost, self.config.gradient_tolerance) {
            Termination::DecreaseTolerance
        } else {
            Termination::Stalled
        }
    }
}

struct Evaluator<'a> {
    problem: &'a dyn ResidualProblem,
    buf: DVector<f64>,
    count: usize,
}

impl Evaluator<'_> {
    fn cost(&mut self, p: &Param) -> f64 {
        self.count += 1;
        self.problem.residuals(p, &mut self.buf);
        self.buf.norm_squared()
    }
}

impl Optimizer for NelderMead {
    fn minimize(
        &self,
        problem: &dyn ResidualProblem,
        bounds: &Bounds,
        x0: Param,
        deadline: Option<Instant>,
    ) -> OptimizeResult {
        let cfg = &self.config;
        let mut eval = Evaluator {
            problem,
            buf: DVector::zeros(problem.num_residuals()),
            count: 0,
        };

        let mut simplex = self.initial_simplex(bounds, bounds.project(x0));
        let mut values = [0.0; 4];
        for (v, p) in values.iter_mut().zip(&simplex) {
            *v = eval.cost(p);
        }

        let mut termination = Termination::MaxIterations;
        let mut iterations = cfg.max_iterations;

        for iter in 0..cfg.max_iterations {
            // Order vertices best → worst (stable, so ties keep their order)
            let mut order = [0usize, 1, 2, 3];
            order.sort_by(|&a, &b| values[a].total_cmp(&values[b]));
            simplex = order.map(|i| simplex[i]);
            values = order.map(|i| values[i]);

            let f_spread = values[3] - values[0];
            let x_spread = simplex[1..]
                .iter()
                .map(|v| (v - simplex[0]).amax())
                .fold(0.0, f64::max);
            if f_spread <= cfg.f_tolerance && x_spread <= cfg.x_tolerance {
                termination = self.settle(bounds, &simplex[0], &mut eval);
                iterations = iter;
                break;
            }
            if deadline.is_some_and(|d| Instant::now() >= d) {
                termination = Termination::TimeLimit;
                iterations = iter;
                break;
            }

            let centroid = (simplex[0] + simplex[1] + simplex[2]) / 3.0;
            let worst = simplex[3];

            let reflected = bounds.project(centroid + (centroid - worst) * REFLECTION);
            let f_reflected = eval.cost(&reflected);

            if f_reflected < values[0] {
                let expanded = bounds.project(centroid + (centroid - worst) * EXPANSION);
                let f_expanded = eval.cost(&expanded);
                if f_expanded < f_reflected {
                    simplex[3] = expanded;
                    values[3] = f_expanded;
                } else {
                    simplex[3] = reflected;
                    values[3] = f_reflected;
                }
            } else if f_reflected < values[2] {
                simplex[3] = reflected;
                values[3] = f_reflected;
            } else {
                // Outside contraction if the reflection helped at all, inside otherwise
                let (contracted, accept_below) = if f_reflected < values[3] {
                    (bounds.project(centroid + (reflected - centroid) * CONTRACTION), None)
                } else {
                    (bounds.project(centroid + (worst - centroid) * CONTRACTION), Some(values[3]))
                };
                let f_contracted = eval.cost(&contracted);
                let accepted = match accept_below {
                    None => f_contracted <= f_reflected,
                    Some(f_worst) => f_contracted < f_worst,
                };
                if accepted {
                    simplex[3] = contracted;
                    values[3] = f_contracted;
                } else {
                    let best = simplex[0];
                    for i in 1..4 {
                        simplex[i] = best + (simplex[i] - best) * SHRINK;
                        values[i] = eval.cost(&simplex[i]);
                    }
                }
            }
        }

        let best = (0..4)
            .min_by(|&a, &b| values[a].total_cmp(&values[b]))
            .unwrap_or(0);
        OptimizeResult {
            x: simplex[best],
            cost: values[best],
            iterations,
            evaluations: eval.count,
            termination,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    struct Shifted {
        target: Param,
    }

    impl ResidualProblem for Shifted {
        fn num_residuals(&self) -> usize {
            3
        }
        fn residuals(&self, p: &Param, out: &mut DVector<f64>) {
            for i in 0..3 {
                out[i] = p[i] - self.target[i];
            }
        }
    }

    struct Rosenbrock;

    impl ResidualProblem for Rosenbrock {
        fn num_residuals(&self) -> usize {
            3
        }
        fn residuals(&self, p: &Param, out: &mut DVector<f64>) {
            out[0] = 10.0 * (p[1] - p[0] * p[0]);
            out[1] = 1.0 - p[0];
            out[2] = p[2] - 1.0;
        }
    }

    fn wide_box() -> Bounds {
        Bounds::new([-5.0; 3], [5.0; 3]).unwrap()
    }

    #[test]
    fn solves_quadratic() {
        let problem = Shifted { target: Param::new(1.0, -2.0, 3.0) };
        let res = NelderMead::default().minimize(&problem, &wide_box(), Param::zeros(), None);
        assert!(res.converged());
        assert_abs_diff_eq!(res.x, problem.target, epsilon = 1e-6);
    }

    #[test]
    fn solves_rosenbrock() {
        let res = NelderMead::default().minimize(&Rosenbrock, &wide_box(), Param::new(-1.2, 1.0, 0.0), None);
        assert!(res.converged());
        assert_abs_diff_eq!(res.x, Param::new(1.0, 1.0, 1.0), epsilon = 1e-6);
    }

    #[test]
    fn stays_in_box() {
        let problem = Shifted { target: Param::new(8.0, 0.5, 0.5) };
        let res = NelderMead::default().minimize(&problem, &wide_box(), Param::zeros(), None);
        assert!(wide_box().contains(&res.x));
        assert!(res.converged(), "termination {:?}", res.termination);
        assert_abs_diff_eq!(res.x[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(res.x[1], 0.5, epsilon = 1e-6);
    }

    /// sin²(θ + 0.5) decreases below θ = 0.
    struct Seam;

    impl ResidualProblem for Seam {
        fn num_residuals(&self) -> usize {
            3
        }
        fn residuals(&self, p: &Param, out: &mut DVector<f64>) {
            out[0] = p[0] - 1.0;
            out[1] = p[1] - 1.0;
            out[2] = (p[2] + 0.5).sin();
        }
    }

    #[test]
    fn collapse_on_a_seam_is_stalled() {
        let hard = Bounds::new([-5.0, -5.0, 0.0], [5.0, 5.0, std::f64::consts::TAU]).unwrap();
        let res = NelderMead::default().minimize(&Seam, &hard, Param::zeros(), None);
        assert!(res.converged(), "termination {:?}", res.termination);
        assert_abs_diff_eq!(res.x[2], 0.0, epsilon = 1e-9);

        let res = NelderMead::default().minimize(&Seam, &hard.with_periodic(2), Param::zeros(), None);
        assert_eq!(res.termination, Termination::Stalled);
        assert!(res.cost > 0.2);
    }

    #[test]
    fn iteration_cap_keeps_best_vertex() {
        let problem = Shifted { target: Param::new(1.0, -2.0, 3.0) };
        let nm = NelderMead::new(NelderMeadConfig::default().with_max_iterations(5));
        let res = nm.minimize(&problem, &wide_box(), Param::zeros(), None);
        assert_eq!(res.termination, Termination::MaxIterations);
        assert!(res.cost < problem.cost(&Param::zeros()));
    }

    #[test]
    fn initial_simplex_flips_at_upper_bound() {
        let nm = NelderMead::default();
        let b = Bounds::for_arena(10.0);
        let s = nm.initial_simplex(&b, Param::new(10.0, 5.0, 0.0));
        assert_abs_diff_eq!(s[1][0], 9.5, epsilon = 1e-12);
        assert_abs_diff_eq!(s[2][1], 5.5, epsilon = 1e-12);
        assert!(s.iter().all(|v| b.contains(v)));
    }
}
