//! Square arena `[0, L] × [0, L]` with wall-distance queries.

use crate::{error::GeometryError, pose::Pose};
use serde::{Deserialize, Serialize};
use std::f64::consts::FRAC_PI_2;

/// One of the four arena walls.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wall {
    /// x = 0
    Left,
    /// x = L
    Right,
    /// y = 0
    Bottom,
    /// y = L
    Top,
}

/// Axis-aligned square arena anchored at the origin.
///
/// The side length is validated once at construction; an `Arena` value is
/// always usable for ray casting without further checks.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ArenaRepr", into = "ArenaRepr")]
pub struct Arena {
    side: f64,
}

#[derive(Serialize, Deserialize)]
struct ArenaRepr {
    side: f64,
}

impl TryFrom<ArenaRepr> for Arena {
    type Error = GeometryError;

    fn try_from(repr: ArenaRepr) -> Result<Self, Self::Error> {
        Arena::new(repr.side)
    }
}

impl From<Arena> for ArenaRepr {
    fn from(arena: Arena) -> Self {
        ArenaRepr { side: arena.side }
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self { side: 10.0 }
    }
}

impl Arena {
    pub fn new(side: f64) -> Result<Self, GeometryError> {
        if !side.is_finite() || side <= 0.0 {
            return Err(GeometryError::InvalidArenaSize(side));
        }
        Ok(Self { side })
    }

    /// Side length `L`.
    pub fn side(&self) -> f64 {
        self.side
    }

    pub fn center(&self) -> (f64, f64) {
        (self.side / 2.0, self.side / 2.0)
    }

    /// True if `(x, y)` lies in the closed square.
    pub fn contains(&self, x: f64, y: f64) -> bool {
        (0.0..=self.side).contains(&x) && (0.0..=self.side).contains(&y)
    }

    /// True if `(x, y)` lies strictly inside the square.
    pub fn is_interior(&self, x: f64, y: f64) -> bool {
        x > 0.0 && x < self.side && y > 0.0 && y < self.side
    }

    /// Distance to the nearest wall: `min(x, L−x, y, L−y)`.
    ///
    /// Negative when the point is outside the square, zero on the boundary.
    pub fn wall_distance(&self, x: f64, y: f64) -> f64 {
        x.min(self.side - x).min(y).min(self.side - y)
    }

    /// Nearest wall to `(x, y)` (ties resolved Left, Right, Bottom, Top).
    pub fn nearest_wall(&self, x: f64, y: f64) -> Wall {
        let candidates = [
            (Wall::Left, x),
            (Wall::Right, self.side - x),
            (Wall::Bottom, y),
            (Wall::Top, self.side - y),
        ];
        candidates
            .into_iter()
            .fold((Wall::Left, f64::INFINITY), |best, (wall, d)| {
                if d.abs() < best.1 {
                    (wall, d.abs())
                } else {
                    best
                }
            })
            .0
    }

    /// The four poses related to `pose` by 90° rotations about the arena
    /// center. A rig sees identical readings from all of them, so an
    /// estimator can at best recover the pose up to this set.
    pub fn symmetric_poses(&self, pose: &Pose) -> [Pose; 4] {
        let rotate = |p: Pose| Pose::new(self.side - p.y, p.x, p.theta + FRAC_PI_2);
        let p0 = pose.normalized();
        let p1 = rotate(p0);
        let p2 = rotate(p1);
        let p3 = rotate(p2);
        [p0, p1, p2, p3]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn rejects_degenerate_sizes() {
        assert_eq!(Arena::new(0.0), Err(GeometryError::InvalidArenaSize(0.0)));
        assert!(Arena::new(-3.0).is_err());
        assert!(Arena::new(f64::NAN).is_err());
        assert!(Arena::new(f64::INFINITY).is_err());
        assert!(Arena::new(1e-6).is_ok());
    }

    #[test]
    fn wall_distance_sign() {
        let arena = Arena::new(10.0).unwrap();
        assert_abs_diff_eq!(arena.wall_distance(6.0, 3.0), 3.0);
        assert_abs_diff_eq!(arena.wall_distance(0.0, 0.0), 0.0);
        assert_abs_diff_eq!(arena.wall_distance(10.0, 5.0), 0.0);
        assert!(arena.wall_distance(-1.0, 5.0) < 0.0);
        assert!(arena.wall_distance(5.0, 12.0) < 0.0);
    }

    #[test]
    fn nearest_wall_picks_closest() {
        let arena = Arena::new(10.0).unwrap();
        assert_eq!(arena.nearest_wall(0.5, 5.0), Wall::Left);
        assert_eq!(arena.nearest_wall(9.9, 5.0), Wall::Right);
        assert_eq!(arena.nearest_wall(5.0, 0.1), Wall::Bottom);
        assert_eq!(arena.nearest_wall(4.0, 9.0), Wall::Top);
    }

    #[test]
    fn interior_excludes_boundary() {
        let arena = Arena::new(10.0).unwrap();
        assert!(arena.contains(0.0, 10.0));
        assert!(!arena.is_interior(0.0, 5.0));
        assert!(arena.is_interior(0.001, 9.999));
    }

    #[test]
    fn symmetric_poses_cycle_back() {
        let arena = Arena::new(10.0).unwrap();
        let pose = Pose::from_degrees(6.5, 4.5, 100.0);
        let sym = arena.symmetric_poses(&pose);
        // One quarter turn counter-clockwise about (5, 5)
        assert_abs_diff_eq!(sym[1].x, 5.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sym[1].y, 6.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sym[1].theta, 190f64.to_radians(), epsilon = 1e-12);
        // Three quarter turns: the alias at (4.5, 3.5, 10°)
        assert_abs_diff_eq!(sym[3].x, 4.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sym[3].y, 3.5, epsilon = 1e-12);
        assert_abs_diff_eq!(sym[3].theta, 10f64.to_radians(), epsilon = 1e-9);
    }

    #[test]
    fn deserialization_path_validates_side() {
        assert!(Arena::try_from(ArenaRepr { side: -1.0 }).is_err());
        assert_eq!(Arena::try_from(ArenaRepr { side: 4.0 }).unwrap().side(), 4.0);
    }
}
