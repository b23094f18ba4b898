//! Planar agent pose: position in world units, heading in radians.

use serde::{Deserialize, Serialize};
use std::f64::consts::{PI, TAU};
use std::fmt;

/// Pose `(x, y, θ)` with θ kept in `[0, 2π)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub x: f64,
    pub y: f64,
    /// Heading (radians, counter-clockwise from +x)
    pub theta: f64,
}

impl Pose {
    /// Build a pose, normalizing the heading into `[0, 2π)`.
    pub fn new(x: f64, y: f64, theta: f64) -> Self {
        Self { x, y, theta: normalize_angle(theta) }
    }

    /// Convenience constructor taking the heading in degrees.
    pub fn from_degrees(x: f64, y: f64, heading_deg: f64) -> Self {
        Self::new(x, y, heading_deg.to_radians())
    }

    pub fn normalized(self) -> Self {
        Self::new(self.x, self.y, self.theta)
    }

    /// Euclidean distance between the two positions.
    pub fn position_error(&self, other: &Pose) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Signed heading difference `self − other`, wrapped to `(−π, π]`.
    pub fn heading_error(&self, other: &Pose) -> f64 {
        wrap_to_pi(self.theta - other.theta)
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.x, self.y, self.theta]
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

impl fmt::Display for Pose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({:.3}, {:.3}, {:.1}°)",
            self.x,
            self.y,
            self.theta.to_degrees()
        )
    }
}

/// Map any angle into `[0, 2π)`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU for tiny negative inputs
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Map any angle into `(−π, π]`.
pub fn wrap_to_pi(angle: f64) -> f64 {
    let a = normalize_angle(angle);
    if a > PI {
        a - TAU
    } else {
        a
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn heading_normalized_on_construction() {
        let p = Pose::new(1.0, 2.0, -FRAC_PI_2);
        assert_abs_diff_eq!(p.theta, 3.0 * FRAC_PI_2, epsilon = 1e-12);
        assert_abs_diff_eq!(Pose::new(0.0, 0.0, TAU).theta, 0.0);
        assert_abs_diff_eq!(Pose::new(0.0, 0.0, 5.0 * TAU + 0.25).theta, 0.25, epsilon = 1e-9);
    }

    #[test]
    fn heading_error_wraps_across_zero() {
        let a = Pose::from_degrees(0.0, 0.0, 359.0);
        let b = Pose::from_degrees(0.0, 0.0, 1.0);
        assert_abs_diff_eq!(a.heading_error(&b), (-2.0f64).to_radians(), epsilon = 1e-12);
        assert_abs_diff_eq!(b.heading_error(&a), 2.0f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn tiny_negative_angle_stays_below_tau() {
        let a = normalize_angle(-1e-18);
        assert!((0.0..TAU).contains(&a));
    }
}
