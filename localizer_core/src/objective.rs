//! Wall-consistency objective.
//!
//! Every true beam ends on a wall, so for a candidate pose `(x, y, θ)` the
//! implied endpoint `p_i = (x + d_i cos(θ+a_i), y + d_i sin(θ+a_i))` should sit
//! on the boundary. The residual for beam `i` is the distance from `p_i` to the
//! nearest wall, `min(p.x, L − p.x, p.y, L − p.y)`, negative when the endpoint
//! falls outside the arena. The objective is `Σ residual_i²`, which is zero at
//! the true pose for noiseless readings.

use crate::optimizer::{Param, ResidualProblem};
use nalgebra::DVector;
use sensor_models::{Arena, Pose, SensorRig};

/// Residual vector for one reading vector; borrowed, evaluated many times per solve.
#[derive(Clone, Copy, Debug)]
pub struct WallResidual<'a> {
    readings: &'a [f64],
    rig: &'a SensorRig,
    arena: &'a Arena,
}

impl<'a> WallResidual<'a> {
    /// `readings` must hold one value per rig beam; the estimator checks this.
    pub fn new(readings: &'a [f64], rig: &'a SensorRig, arena: &'a Arena) -> Self {
        debug_assert_eq!(readings.len(), rig.len());
        Self { readings, rig, arena }
    }

    /// Residual of one beam. A non-finite reading gives an infinite residual
    /// instead of propagating `inf · 0 = NaN` through the trig products.
    fn beam_residual(&self, x: f64, y: f64, angle: f64, d: f64) -> f64 {
        if !d.is_finite() {
            return f64::INFINITY;
        }
        let (s, c) = angle.sin_cos();
        self.arena.wall_distance(x + d * c, y + d * s)
    }

    pub fn cost(&self, pose: &Pose) -> f64 {
        self.rig
            .beam_angles(pose.theta)
            .zip(self.readings)
            .map(|(angle, &d)| self.beam_residual(pose.x, pose.y, angle, d).powi(2))
            .sum()
    }
}

impl ResidualProblem for WallResidual<'_> {
    fn num_residuals(&self) -> usize {
        self.readings.len()
    }

    fn residuals(&self, p: &Param, out: &mut DVector<f64>) {
        for (i, (angle, &d)) in self.rig.beam_angles(p[2]).zip(self.readings).enumerate() {
            out[i] = self.beam_residual(p[0], p[1], angle, d);
        }
    }
}

/// Objective `Σ residual_i²` for `pose` given `readings`.
pub fn objective(pose: &Pose, readings: &[f64], rig: &SensorRig, arena: &Arena) -> f64 {
    WallResidual::new(readings, rig, arena).cost(pose)
}
