//! Motion driver: moves the true pose along a bouncing, spinning trajectory.
//!
//! Position advances by a constant velocity per tick and the heading by a
//! constant rate. After each step, a velocity component whose coordinate has
//! left `(margin, L − margin)` is negated, so the agent bounces around the
//! arena forever. Only used to feed varied poses through the pipeline.
//!
//! A single step must not carry the agent from inside the margin band past a
//! wall, so each velocity component must be shorter than the margin and the
//! start must lie within the band.

use crate::error::SimError;
use sensor_models::{Arena, Pose};
use serde::{Deserialize, Serialize};

/// Constant-rate motion parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionDriver {
    /// Initial velocity (world units per tick)
    pub velocity: [f64; 2],
    /// Heading change per tick (radians)
    pub angular_rate: f64,
    /// Distance from a wall at which the velocity component flips
    pub margin: f64,
}

impl Default for MotionDriver {
    fn default() -> Self {
        Self {
            velocity: [0.02, 0.015],
            angular_rate: 2f64.to_radians(),
            margin: 0.5,
        }
    }
}

/// Mutable part of the motion: the true pose and the current velocity signs.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    pub pose: Pose,
    pub velocity: [f64; 2],
}

impl MotionDriver {
    pub fn validate(&self, arena: &Arena) -> Result<(), SimError> {
        if !self.velocity.iter().all(|v| v.is_finite()) || !self.angular_rate.is_finite() {
            return Err(SimError::InvalidMotion("velocity and angular rate must be finite".into()));
        }
        if !(self.margin >= 0.0 && self.margin < arena.side() / 2.0) {
            return Err(SimError::InvalidMotion(format!(
                "margin {} must lie in [0, {})",
                self.margin,
                arena.side() / 2.0
            )));
        }
        if let Some(v) = self.velocity.iter().find(|v| **v != 0.0 && v.abs() >= self.margin) {
            return Err(SimError::InvalidMotion(format!(
                "velocity component {v} per tick must be shorter than the margin {}",
                self.margin
            )));
        }
        Ok(())
    }

    /// `start` must be at least `margin` from every wall.
    pub fn validate_start(&self, start: &Pose, arena: &Arena) -> Result<(), SimError> {
        let band = self.margin..=arena.side() - self.margin;
        if !(band.contains(&start.x) && band.contains(&start.y)) {
            return Err(SimError::InvalidMotion(format!(
                "start pose {start} must be at least {} from every wall",
                self.margin
            )));
        }
        Ok(())
    }

    pub fn initial_state(&self, start: Pose) -> MotionState {
        MotionState {
            pose: start.normalized(),
            velocity: self.velocity,
        }
    }

    /// Advance one tick.
    pub fn step(&self, state: MotionState, arena: &Arena) -> MotionState {
        let [mut vx, mut vy] = state.velocity;
        let x = state.pose.x + vx;
        let y = state.pose.y + vy;
        let theta = state.pose.theta + self.angular_rate;

        let lo = self.margin;
        let hi = arena.side() - self.margin;
        if !(x > lo && x < hi) {
            vx = -vx;
        }
        if !(y > lo && y < hi) {
            vy = -vy;
        }

        MotionState {
            pose: Pose::new(x, y, theta),
            velocity: [vx, vy],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::TAU;

    fn arena() -> Arena {
        Arena::new(10.0).unwrap()
    }

    #[test]
    fn constant_velocity_step() {
        let driver = MotionDriver::default();
        let s0 = driver.initial_state(Pose::from_degrees(6.0, 3.0, 30.0));
        let s1 = driver.step(s0, &arena());
        assert_abs_diff_eq!(s1.pose.x, 6.02, epsilon = 1e-12);
        assert_abs_diff_eq!(s1.pose.y, 3.015, epsilon = 1e-12);
        assert_abs_diff_eq!(s1.pose.theta, 32f64.to_radians(), epsilon = 1e-12);
        assert_eq!(s1.velocity, [0.02, 0.015]);
    }

    #[test]
    fn reflects_near_wall() {
        let driver = MotionDriver {
            velocity: [0.1, 0.0],
            angular_rate: 0.0,
            margin: 0.5,
        };
        let mut state = driver.initial_state(Pose::new(9.35, 5.0, 0.0));
        state = driver.step(state, &arena()); // 9.45: still inside
        assert_eq!(state.velocity[0], 0.1);
        state = driver.step(state, &arena()); // 9.55: past the margin
        assert_eq!(state.velocity[0], -0.1);
        state = driver.step(state, &arena());
        assert_abs_diff_eq!(state.pose.x, 9.45, epsilon = 1e-9);
    }

    #[test]
    fn trajectory_stays_inside_and_heading_wraps() {
        let driver = MotionDriver::default();
        let arena = arena();
        let mut state = driver.initial_state(Pose::from_degrees(6.0, 3.0, 30.0));
        for _ in 0..5000 {
            state = driver.step(state, &arena);
            assert!(arena.is_interior(state.pose.x, state.pose.y));
            assert!((0.0..TAU).contains(&state.pose.theta));
        }
    }

    #[test]
    fn rejects_oversized_margin() {
        let driver = MotionDriver {
            margin: 5.0,
            ..Default::default()
        };
        assert!(driver.validate(&arena()).is_err());
        assert!(MotionDriver::default().validate(&arena()).is_ok());
    }

    #[test]
    fn rejects_velocity_that_could_cross_a_wall() {
        let arena = arena();
        for velocity in [[0.5, 0.0], [0.0, -0.5], [0.3, 2.0]] {
            let driver = MotionDriver {
                velocity,
                angular_rate: 0.0,
                margin: 0.5,
            };
            assert!(matches!(driver.validate(&arena), Err(SimError::InvalidMotion(_))), "{velocity:?}");
        }
        let parked = MotionDriver {
            velocity: [0.0, 0.0],
            angular_rate: 0.1,
            margin: 0.0,
        };
        assert!(parked.validate(&arena).is_ok());
    }

    #[test]
    fn fastest_valid_velocity_stays_inside() {
        let arena = arena();
        let driver = MotionDriver {
            velocity: [0.499, -0.431],
            angular_rate: 0.3,
            margin: 0.5,
        };
        driver.validate(&arena).unwrap();
        for start in [Pose::new(0.5, 9.5, 0.0), Pose::new(5.0, 5.0, 1.0), Pose::new(9.5, 0.5, 2.0)] {
            driver.validate_start(&start, &arena).unwrap();
            let mut state = driver.initial_state(start);
            for _ in 0..2000 {
                state = driver.step(state, &arena);
                assert!(arena.is_interior(state.pose.x, state.pose.y), "{}", state.pose);
            }
        }
    }

    #[test]
    fn start_inside_margin_is_rejected() {
        let driver = MotionDriver::default();
        assert!(driver.validate_start(&Pose::new(0.2, 5.0, 0.0), &arena()).is_err());
        assert!(driver.validate_start(&Pose::new(5.0, 9.8, 0.0), &arena()).is_err());
        assert!(driver.validate_start(&Pose::new(0.5, 9.5, 0.0), &arena()).is_ok());
    }
}
