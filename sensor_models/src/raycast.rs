//! Ray casting against the arena boundary.
//!
//! A ray from `(x, y)` with unit direction `(cos a, sin a)` is intersected
//! with the four wall lines `x = 0`, `x = L`, `y = 0`, `y = L`. Only forward
//! crossings (`t > 0`) count; the nearest one is the hit.

use crate::arena::{Arena, Wall};
use serde::{Deserialize, Serialize};

/// Direction components with magnitude at or below this are treated as zero:
/// the ray is parallel to that axis's walls and never crosses them.
pub const PARALLEL_EPS: f64 = 1e-12;

/// Result of a detailed ray cast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// Distance along the ray, or `f64::INFINITY` when nothing is hit
    pub distance: f64,
    /// Wall that was crossed first, if any
    pub wall: Option<Wall>,
    /// Crossing point in world coordinates, if any
    pub point: Option<(f64, f64)>,
}

impl RayHit {
    fn unbounded() -> Self {
        Self {
            distance: f64::INFINITY,
            wall: None,
            point: None,
        }
    }

    pub fn is_bounded(&self) -> bool {
        self.distance.is_finite()
    }
}

/// Distance from `(x, y)` along heading `angle` to the first wall of the
/// square `[0, side]²`.
///
/// Returns `f64::INFINITY` when no forward crossing exists (origin on or
/// outside the boundary, pointing away). For any origin strictly inside the
/// square the result is finite and positive.
pub fn cast(x: f64, y: f64, angle: f64, side: f64) -> f64 {
    nearest_crossing(x, y, angle, side)
        .map(|(t, _)| t)
        .unwrap_or(f64::INFINITY)
}

/// Same as [`cast`], also reporting which wall was hit and where.
pub fn cast_detailed(arena: &Arena, x: f64, y: f64, angle: f64) -> RayHit {
    match nearest_crossing(x, y, angle, arena.side()) {
        Some((t, wall)) => RayHit {
            distance: t,
            wall: Some(wall),
            point: Some((x + t * angle.cos(), y + t * angle.sin())),
        },
        None => RayHit::unbounded(),
    }
}

fn nearest_crossing(x: f64, y: f64, angle: f64, side: f64) -> Option<(f64, Wall)> {
    let (dy, dx) = angle.sin_cos();
    let mut best: Option<(f64, Wall)> = None;

    let mut consider = |t: f64, wall: Wall| {
        if t > 0.0 && best.map_or(true, |(b, _)| t < b) {
            best = Some((t, wall));
        }
    };

    if dx.abs() > PARALLEL_EPS {
        consider((0.0 - x) / dx, Wall::Left);
        consider((side - x) / dx, Wall::Right);
    }
    if dy.abs() > PARALLEL_EPS {
        consider((0.0 - y) / dy, Wall::Bottom);
        consider((side - y) / dy, Wall::Top);
    }

    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::{FRAC_PI_2, PI, TAU};

    #[test]
    fn axis_aligned_rays() {
        assert_abs_diff_eq!(cast(6.0, 3.0, 0.0, 10.0), 4.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cast(6.0, 3.0, PI, 10.0), 6.0, epsilon = 1e-12);
        assert_abs_diff_eq!(cast(6.0, 3.0, FRAC_PI_2, 10.0), 7.0, epsilon = 1e-9);
        assert_abs_diff_eq!(cast(6.0, 3.0, -FRAC_PI_2, 10.0), 3.0, epsilon = 1e-9);
    }

    #[test]
    fn thirty_degrees_from_six_three() {
        let d = cast(6.0, 3.0, 30f64.to_radians(), 10.0);
        // Crosses x = 10 before y = 10: 4 / cos 30°
        assert_abs_diff_eq!(d, 4.0 / 30f64.to_radians().cos(), epsilon = 1e-12);
        assert_abs_diff_eq!(d, 4.618802153517006, epsilon = 1e-9);
    }

    #[test]
    fn interior_rays_end_on_a_wall() {
        let arena = Arena::new(10.0).unwrap();
        let origins = [(0.3, 0.3), (5.0, 5.0), (9.9, 0.1), (2.0, 8.5), (6.0, 3.0)];
        for &(x, y) in &origins {
            for k in 0..72 {
                let angle = k as f64 * TAU / 72.0 + 0.013;
                let hit = cast_detailed(&arena, x, y, angle);
                assert!(hit.distance.is_finite() && hit.distance > 0.0);
                let (px, py) = hit.point.unwrap();
                assert_abs_diff_eq!(arena.wall_distance(px, py), 0.0, epsilon = 1e-9);
                assert_eq!(hit.distance, cast(x, y, angle, 10.0));
            }
        }
    }

    #[test]
    fn reports_wall_identity() {
        let arena = Arena::new(10.0).unwrap();
        assert_eq!(cast_detailed(&arena, 5.0, 5.0, 0.0).wall, Some(Wall::Right));
        assert_eq!(cast_detailed(&arena, 5.0, 5.0, PI).wall, Some(Wall::Left));
        assert_eq!(cast_detailed(&arena, 5.0, 2.0, FRAC_PI_2).wall, Some(Wall::Top));
        assert_eq!(cast_detailed(&arena, 5.0, 2.0, -FRAC_PI_2).wall, Some(Wall::Bottom));
    }

    #[test]
    fn corner_origin_does_not_divide_by_zero() {
        // Pointing along the bottom wall: only x = 10 is ahead
        assert_abs_diff_eq!(cast(0.0, 0.0, 0.0, 10.0), 10.0, epsilon = 1e-12);
        // Pointing out of the arena: no forward crossing at all
        assert_eq!(cast(0.0, 0.0, PI, 10.0), f64::INFINITY);
        assert_eq!(cast(0.0, 0.0, -120f64.to_radians(), 10.0), f64::INFINITY);
        assert!(!cast_detailed(&Arena::default(), 0.0, 0.0, PI).is_bounded());
    }

    #[test]
    fn outside_origin_is_unbounded_when_pointing_away() {
        assert_eq!(cast(12.0, 5.0, 0.0, 10.0), f64::INFINITY);
        assert!(!cast(f64::NAN, 5.0, 0.0, 10.0).is_nan());
    }
}
