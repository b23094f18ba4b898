//! `sim` — Arena simulator: motion driver, range noise, scenarios, sweeps, replay.

pub mod error;
pub mod motion;
pub mod noise;
pub mod replay;
pub mod runner;
pub mod scenarios;
pub mod sweep;

pub use error::SimError;
pub use motion::{MotionDriver, MotionState};
pub use noise::{perturb, NoiseConfig, NoiseModel};
pub use replay::{load_replay, rerun, save_replay, ReplayLog};
pub use runner::{SimOutcome, SimState, Simulation, TickRecord, SUCCESS_RADIUS};
pub use scenarios::{ScenarioConfig, ScenarioKind};
pub use sweep::{sweep, SweepCell, SweepGrid, SweepReport};
