//! Simulator errors.

use localizer_core::EstimateError;
use sensor_models::GeometryError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Geometry(#[from] GeometryError),
    #[error(transparent)]
    Estimate(#[from] EstimateError),
    #[error("noise standard deviation must be finite and non-negative, got {0}")]
    InvalidNoise(f64),
    #[error("invalid motion configuration: {0}")]
    InvalidMotion(String),
    #[error("invalid sweep grid: {0}")]
    InvalidSweep(String),
    #[error("replay I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("replay JSON is malformed: {0}")]
    Json(#[from] serde_json::Error),
}
