//! `sensor_models` — Arena geometry, ray casting and the rangefinder rig.
//!
//! # Module layout
//! - [`arena`]   — Square arena, wall-distance queries, rotational symmetry
//! - [`pose`]    — Planar pose and angle helpers
//! - [`raycast`] — Ray / boundary intersection
//! - [`rig`]     — Beam offsets and noiseless sensing

pub mod arena;
pub mod error;
pub mod pose;
pub mod raycast;
pub mod rig;

pub use arena::{Arena, Wall};
pub use error::GeometryError;
pub use pose::{normalize_angle, wrap_to_pi, Pose};
pub use raycast::{cast, cast_detailed, RayHit};
pub use rig::{endpoints, sense, SensorRig};
