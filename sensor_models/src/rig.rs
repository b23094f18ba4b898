//! Rangefinder rig: a fixed set of beams at angular offsets from the heading.

use crate::{arena::Arena, error::GeometryError, pose::Pose, raycast::cast};
use serde::{Deserialize, Serialize};

/// Ordered, non-empty list of beam offsets (radians) relative to the heading.
///
/// The sensor array and the pose estimator must share the same rig: the
/// estimator interprets reading `i` as a range along offset `i`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct SensorRig {
    offsets: Vec<f64>,
}

impl TryFrom<Vec<f64>> for SensorRig {
    type Error = GeometryError;

    fn try_from(offsets: Vec<f64>) -> Result<Self, Self::Error> {
        SensorRig::new(offsets)
    }
}

impl From<SensorRig> for Vec<f64> {
    fn from(rig: SensorRig) -> Self {
        rig.offsets
    }
}

impl Default for SensorRig {
    /// Three beams: forward, and ±120°.
    fn default() -> Self {
        Self {
            offsets: vec![0.0, 120f64.to_radians(), (-120f64).to_radians()],
        }
    }
}

impl SensorRig {
    pub fn new(offsets: Vec<f64>) -> Result<Self, GeometryError> {
        if offsets.is_empty() {
            return Err(GeometryError::EmptyRig);
        }
        if let Some((index, &value)) = offsets.iter().enumerate().find(|(_, a)| !a.is_finite()) {
            return Err(GeometryError::NonFiniteOffset { index, value });
        }
        Ok(Self { offsets })
    }

    pub fn from_degrees(offsets_deg: &[f64]) -> Result<Self, GeometryError> {
        Self::new(offsets_deg.iter().map(|d| d.to_radians()).collect())
    }

    pub fn offsets(&self) -> &[f64] {
        &self.offsets
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    /// Always false: construction rejects empty rigs.
    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// World-frame beam angles for a given heading.
    pub fn beam_angles(&self, heading: f64) -> impl Iterator<Item = f64> + '_ {
        self.offsets.iter().map(move |a| heading + a)
    }
}

/// Noiseless readings: one ray cast per beam from the pose position.
pub fn sense(pose: &Pose, rig: &SensorRig, arena: &Arena) -> Vec<f64> {
    rig.beam_angles(pose.theta)
        .map(|angle| cast(pose.x, pose.y, angle, arena.side()))
        .collect()
}

/// Beam endpoints implied by `readings` if the agent were at `pose`.
///
/// For the true pose and noiseless readings every endpoint lies on a wall.
pub fn endpoints(pose: &Pose, readings: &[f64], rig: &SensorRig) -> Vec<(f64, f64)> {
    rig.beam_angles(pose.theta)
        .zip(readings)
        .map(|(angle, d)| {
            let (s, c) = angle.sin_cos();
            (pose.x + d * c, pose.y + d * s)
        })
        .collect()
}
