//! Scenario definitions.
//!
//! A scenario bundles everything one run needs: arena, sensor rig, start pose,
//! motion, noise, estimator settings and tick count. Presets are deterministic
//! given the same seed; any of them can be overridden from a JSON file.

use crate::{error::SimError, motion::MotionDriver, noise::NoiseConfig};
use localizer_core::EstimatorConfig;
use sensor_models::{Arena, Pose, SensorRig};
use serde::{Deserialize, Serialize};
use std::io::BufReader;
use std::path::Path;

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ScenarioKind {
    /// 10×10 arena, start (6, 3, 30°), σ = 0.01, 300 ticks
    Baseline,
    /// Baseline without range noise
    Noiseless,
    /// Baseline with σ = 0.1
    HighNoise,
    /// Baseline spinning at 10° per tick
    FastSpin,
    /// 50×50 arena, proportionally faster motion
    LargeArena,
}

impl ScenarioKind {
    pub fn name(self) -> &'static str {
        match self {
            ScenarioKind::Baseline => "baseline",
            ScenarioKind::Noiseless => "noiseless",
            ScenarioKind::HighNoise => "high-noise",
            ScenarioKind::FastSpin => "fast-spin",
            ScenarioKind::LargeArena => "large-arena",
        }
    }
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub name: String,
    pub seed: u64,
    pub ticks: usize,
    pub arena: Arena,
    pub rig: SensorRig,
    /// True pose before the first tick
    pub start: Pose,
    pub motion: MotionDriver,
    pub noise: NoiseConfig,
    pub estimator: EstimatorConfig,
}

impl Default for ScenarioConfig {
    fn default() -> Self {
        Self::baseline(0)
    }
}

impl ScenarioConfig {
    /// Build the named scenario. Uses `seed` for repeatable noise.
    pub fn build(kind: ScenarioKind, seed: u64) -> Result<Self, SimError> {
        let mut cfg = Self::baseline(seed);
        match kind {
            ScenarioKind::Baseline => {}
            ScenarioKind::Noiseless => cfg.noise.sigma = 0.0,
            ScenarioKind::HighNoise => cfg.noise.sigma = 0.1,
            ScenarioKind::FastSpin => cfg.motion.angular_rate = 10f64.to_radians(),
            ScenarioKind::LargeArena => {
                cfg.arena = Arena::new(50.0)?;
                cfg.start = Pose::from_degrees(30.0, 15.0, 30.0);
                cfg.motion.velocity = [0.1, 0.075];
                cfg.motion.margin = 2.5;
            }
        }
        cfg.name = kind.name().into();
        cfg.validate()?;
        Ok(cfg)
    }

    fn baseline(seed: u64) -> Self {
        ScenarioConfig {
            name: ScenarioKind::Baseline.name().into(),
            seed,
            ticks: 300,
            arena: Arena::default(),
            rig: SensorRig::default(),
            start: Pose::from_degrees(6.0, 3.0, 30.0),
            motion: MotionDriver::default(),
            noise: NoiseConfig::default(),
            estimator: EstimatorConfig::default(),
        }
    }

    /// Load a scenario from a JSON file. Missing fields take baseline values.
    pub fn from_json_file(path: &Path) -> Result<Self, SimError> {
        let file = std::fs::File::open(path)?;
        let cfg: ScenarioConfig = serde_json::from_reader(BufReader::new(file))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Checks that do not need an estimator; those happen in `Simulation::new`.
    pub fn validate(&self) -> Result<(), SimError> {
        self.noise.validate()?;
        self.motion.validate(&self.arena)?;
        self.motion.validate_start(&self.start, &self.arena)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use clap::ValueEnum;
    use std::io::Write;

    #[test]
    fn every_preset_is_valid() {
        for kind in ScenarioKind::value_variants() {
            let cfg = ScenarioConfig::build(*kind, 7).unwrap();
            cfg.validate().unwrap();
            assert_eq!(cfg.name, kind.name());
            assert_eq!(cfg.seed, 7);
        }
    }

    #[test]
    fn baseline_matches_reference_setup() {
        let cfg = ScenarioConfig::build(ScenarioKind::Baseline, 0).unwrap();
        assert_eq!(cfg.arena.side(), 10.0);
        assert_eq!(cfg.ticks, 300);
        assert_eq!(cfg.noise.sigma, 0.01);
        assert_abs_diff_eq!(cfg.start.theta, 30f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn presets_differ_where_named() {
        assert_eq!(ScenarioConfig::build(ScenarioKind::Noiseless, 0).unwrap().noise.sigma, 0.0);
        assert_eq!(ScenarioConfig::build(ScenarioKind::HighNoise, 0).unwrap().noise.sigma, 0.1);
        assert_eq!(ScenarioConfig::build(ScenarioKind::LargeArena, 0).unwrap().arena.side(), 50.0);
        let spin = ScenarioConfig::build(ScenarioKind::FastSpin, 0).unwrap();
        assert_abs_diff_eq!(spin.motion.angular_rate, 10f64.to_radians(), epsilon = 1e-12);
    }

    #[test]
    fn partial_json_fills_in_baseline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "ticks": 12, "noise": {{ "sigma": 0.05 }}, "arena": {{ "side": 20.0 }} }}"#).unwrap();
        let cfg = ScenarioConfig::from_json_file(file.path()).unwrap();
        assert_eq!(cfg.ticks, 12);
        assert_eq!(cfg.noise.sigma, 0.05);
        assert_eq!(cfg.arena.side(), 20.0);
        assert_eq!(cfg.rig, SensorRig::default());
    }

    #[test]
    fn json_with_bad_arena_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "arena": {{ "side": -1.0 }} }}"#).unwrap();
        assert!(matches!(
            ScenarioConfig::from_json_file(file.path()),
            Err(SimError::Json(_))
        ));
    }

    #[test]
    fn start_outside_arena_is_rejected() {
        let mut cfg = ScenarioConfig::build(ScenarioKind::Baseline, 0).unwrap();
        cfg.start = Pose::new(12.0, 3.0, 0.0);
        assert!(cfg.validate().is_err());
        // Inside the arena, but closer to a wall than the motion margin
        cfg.start = Pose::new(9.8, 3.0, 0.0);
        assert!(matches!(cfg.validate(), Err(SimError::InvalidMotion(_))));
    }
}
