//! Engine configuration.
//!
//! Stored as JSON. Every field has a default, so a partial file (or `{}`)
//! yields a usable configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DegradeError, Result};
use crate::level::{LevelScale, DEFAULT_MAX_LEVEL};
use crate::photometric::DEFAULT_PIXELATION_BLOCK_SCALE;

/// Default Gaussian noise scale S: sigma runs from 0 to S code values.
pub const DEFAULT_GAUSSIAN_SCALE: f64 = 50.0;

/// Default number of steps produced by the gradient sequencer.
pub const DEFAULT_GRADIENT_STEPS: u32 = 100;

/// Tunable constants of the level-to-parameter contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Top of the level scale (99 and 100 are both in use)
    pub max_level: u32,
    /// Gaussian sigma at the maximum level
    pub gaussian_scale: f64,
    /// Pixelation block scale K; blocks run from 1 to K + 1
    pub pixelation_block_scale: u32,
    /// Use the perceptually corrected color-vision matrices
    pub improved_color_matrices: bool,
    /// Default step count for gradient sequences
    pub gradient_steps: u32,
    /// Base seed for stochastic kinds; `None` draws a fresh seed per run
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_level: DEFAULT_MAX_LEVEL,
            gaussian_scale: DEFAULT_GAUSSIAN_SCALE,
            pixelation_block_scale: DEFAULT_PIXELATION_BLOCK_SCALE,
            improved_color_matrices: true,
            gradient_steps: DEFAULT_GRADIENT_STEPS,
            seed: None,
        }
    }
}

impl EngineConfig {
    /// Check internal consistency.
    ///
    /// # Errors
    /// `InvalidConfig` for a level scale outside `[1, MAX_LEVEL_LIMIT]`, a
    /// non-positive noise scale, a zero block scale or a zero step count.
    pub fn validate(&self) -> Result<()> {
        self.level_scale()?;
        if !(self.gaussian_scale > 0.0 && self.gaussian_scale.is_finite()) {
            return Err(DegradeError::InvalidConfig(format!(
                "gaussian_scale must be positive, got {}",
                self.gaussian_scale
            )));
        }
        if self.pixelation_block_scale == 0 {
            return Err(DegradeError::InvalidConfig(
                "pixelation_block_scale must be at least 1".to_string(),
            ));
        }
        if self.gradient_steps == 0 {
            return Err(DegradeError::InvalidConfig(
                "gradient_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Level scale described by `max_level`.
    pub fn level_scale(&self) -> Result<LevelScale> {
        LevelScale::new(self.max_level)
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Read a configuration and validate it.
    ///
    /// # Errors
    /// `Io` or `Json` when the file cannot be read or parsed,
    /// `InvalidConfig` when the values are inconsistent.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let config: Self = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        config.validate()?;
        Ok(config)
    }
}
