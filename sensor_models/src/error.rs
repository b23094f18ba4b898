//! Configuration errors for arena and rig construction.

use thiserror::Error;

/// Rejected geometry configuration. Raised once at construction time, never per tick.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum GeometryError {
    #[error("arena side length must be finite and positive, got {0}")]
    InvalidArenaSize(f64),
    #[error("sensor rig must contain at least one offset")]
    EmptyRig,
    #[error("sensor offset #{index} is not finite ({value})")]
    NonFiniteOffset { index: usize, value: f64 },
}
