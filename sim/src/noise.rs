//! Range noise injection.
//!
//! Each channel gets independent zero-mean Gaussian noise, then every value is
//! clipped into `[0, L]`. The generator is injected so tests can fix the
//! sequence; only the CLI seeds from entropy.

use crate::error::SimError;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use sensor_models::Arena;
use serde::{Deserialize, Serialize};

/// Noise parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoiseConfig {
    /// Range noise standard deviation (world units)
    pub sigma: f64,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self { sigma: 0.01 }
    }
}

impl NoiseConfig {
    pub fn validate(&self) -> Result<(), SimError> {
        if !self.sigma.is_finite() || self.sigma < 0.0 {
            return Err(SimError::InvalidNoise(self.sigma));
        }
        Ok(())
    }
}

/// Add `N(0, σ²)` to each reading and clip into `[0, side]`.
pub fn perturb<R: Rng + ?Sized>(readings: &[f64], sigma: f64, side: f64, rng: &mut R) -> Vec<f64> {
    readings
        .iter()
        .map(|&d| {
            let noise = if sigma == 0.0 {
                0.0
            } else {
                let n: f64 = rng.sample(StandardNormal);
                n * sigma
            };
            (d + noise).clamp(0.0, side)
        })
        .collect()
}

/// Noise source bound to one arena and one generator.
#[derive(Clone, Debug)]
pub struct NoiseModel<R = ChaCha8Rng> {
    sigma: f64,
    side: f64,
    rng: R,
}

impl NoiseModel<ChaCha8Rng> {
    /// Deterministic noise for tests and reproducible runs.
    pub fn seeded(config: &NoiseConfig, arena: &Arena, seed: u64) -> Result<Self, SimError> {
        Self::with_rng(config, arena, ChaCha8Rng::seed_from_u64(seed))
    }

    /// Non-reproducible noise; use only at the composition boundary.
    pub fn from_entropy(config: &NoiseConfig, arena: &Arena) -> Result<Self, SimError> {
        Self::with_rng(config, arena, ChaCha8Rng::from_entropy())
    }
}

impl<R: Rng> NoiseModel<R> {
    pub fn with_rng(config: &NoiseConfig, arena: &Arena, rng: R) -> Result<Self, SimError> {
        config.validate()?;
        Ok(Self {
            sigma: config.sigma,
            side: arena.side(),
            rng,
        })
    }

    pub fn sigma(&self) -> f64 {
        self.sigma
    }

    pub fn perturb(&mut self, readings: &[f64]) -> Vec<f64> {
        perturb(readings, self.sigma, self.side, &mut self.rng)
    }
}
