//! `localizer_core` — Pose estimation from rangefinder readings.
//!
//! # Module layout
//! - [`objective`]   — Wall-distance residuals and the least-squares cost
//! - [`optimizer`]   — Bounded minimizer trait, bounds, termination reasons
//! - [`lm`]          — Levenberg-Marquardt with box projection
//! - [`nelder_mead`] — Nelder-Mead simplex with box projection
//! - [`estimator`]   — Readings → pose estimate with quality flags
//! - [`metrics`]     — RMSE, convergence and trust rates
//! - [`error`]       — Input and configuration errors

pub mod error;
pub mod estimator;
pub mod lm;
pub mod metrics;
pub mod nelder_mead;
pub mod objective;
pub mod optimizer;

pub use error::EstimateError;
pub use estimator::{estimate, EstimatorConfig, PoseEstimate, PoseEstimator, SolverKind};
pub use metrics::LocalizationMetrics;
pub use objective::{objective, WallResidual};
pub use optimizer::{Bounds, OptimizeResult, Optimizer, Param, ResidualProblem, Termination};
