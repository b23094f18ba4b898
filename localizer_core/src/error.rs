//! Estimator input and configuration errors.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Error)]
pub enum EstimateError {
    #[error("expected {expected} readings (one per beam), got {got}")]
    ReadingCount { expected: usize, got: usize },
    #[error("reading #{index} is not finite ({value})")]
    NonFiniteReading { index: usize, value: f64 },
    #[error("invalid bounds on axis {axis}: [{lower}, {upper}]")]
    InvalidBounds { axis: usize, lower: f64, upper: f64 },
    #[error("initial guess ({x}, {y}, {theta}) lies outside the search bounds")]
    InitialGuessOutOfBounds { x: f64, y: f64, theta: f64 },
    #[error("invalid estimator configuration: {0}")]
    InvalidConfig(String),
}
