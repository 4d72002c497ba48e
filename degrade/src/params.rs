//! Concrete transform parameters and the level-to-parameter contract.

use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::error::{DegradeError, Result};
use crate::gradient::ParameterRange;
use crate::kind::DegradationKind;
use crate::photometric::{
    blur_sigma, brightness_factor, contrast_factor, hue_shift, pixelation_block_size,
    resolution_scale, saturation_factor, ChannelBias,
};

/// Salt-and-pepper fraction per side at the maximum level.
pub const SALT_PEPPER_MAX_FRACTION: f64 = 0.05;

/// Speckle sigma at the maximum level.
pub const SPECKLE_MAX_SIGMA: f64 = 20.0;

/// Upper end of the blur sigma range.
pub const BLUR_MAX_SIGMA: f64 = 20.0;

/// The concrete values one transform consumes.
///
/// Serialized with the kind name as a `"kind"` tag, which is the form stored
/// in variant metadata records.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Parameters {
    Protanopia {
        severity: f64,
        improved: bool,
    },
    Deuteranopia {
        severity: f64,
        improved: bool,
    },
    Tritanopia {
        severity: f64,
        improved: bool,
    },
    GaussianNoise {
        sigma: f64,
    },
    SaltPepperNoise {
        fraction: f64,
    },
    PoissonNoise {
        intensity: f64,
    },
    SpeckleNoise {
        sigma: f64,
    },
    Blur {
        sigma: f64,
    },
    Pixelation {
        block_size: u32,
    },
    Brightness {
        factor: f64,
    },
    Contrast {
        factor: f64,
    },
    ColorDistortion {
        intensity: f64,
        hue_shift: f64,
        saturation_factor: f64,
    },
    ColorShift {
        intensity: f64,
        bias: ChannelBias,
    },
    Resolution {
        scale: f64,
    },
}

impl Parameters {
    pub fn kind(&self) -> DegradationKind {
        match self {
            Parameters::Protanopia { .. } => DegradationKind::Protanopia,
            Parameters::Deuteranopia { .. } => DegradationKind::Deuteranopia,
            Parameters::Tritanopia { .. } => DegradationKind::Tritanopia,
            Parameters::GaussianNoise { .. } => DegradationKind::GaussianNoise,
            Parameters::SaltPepperNoise { .. } => DegradationKind::SaltPepperNoise,
            Parameters::PoissonNoise { .. } => DegradationKind::PoissonNoise,
            Parameters::SpeckleNoise { .. } => DegradationKind::SpeckleNoise,
            Parameters::Blur { .. } => DegradationKind::Blur,
            Parameters::Pixelation { .. } => DegradationKind::Pixelation,
            Parameters::Brightness { .. } => DegradationKind::Brightness,
            Parameters::Contrast { .. } => DegradationKind::Contrast,
            Parameters::ColorDistortion { .. } => DegradationKind::ColorDistortion,
            Parameters::ColorShift { .. } => DegradationKind::ColorShift,
            Parameters::Resolution { .. } => DegradationKind::Resolution,
        }
    }

    /// Parameters for `kind` at `level`.
    ///
    /// # Errors
    /// `ParameterOutOfRange` when `level` exceeds the configured maximum.
    pub fn for_level(kind: DegradationKind, level: u32, config: &EngineConfig) -> Result<Self> {
        let scale = config.level_scale()?;
        let f = scale.fraction(level)?;
        let improved = config.improved_color_matrices;

        Ok(match kind {
            DegradationKind::Protanopia => Parameters::Protanopia {
                severity: f,
                improved,
            },
            DegradationKind::Deuteranopia => Parameters::Deuteranopia {
                severity: f,
                improved,
            },
            DegradationKind::Tritanopia => Parameters::Tritanopia {
                severity: f,
                improved,
            },
            DegradationKind::GaussianNoise => Parameters::GaussianNoise {
                sigma: f * config.gaussian_scale,
            },
            DegradationKind::SaltPepperNoise => Parameters::SaltPepperNoise {
                fraction: f * SALT_PEPPER_MAX_FRACTION,
            },
            DegradationKind::PoissonNoise => Parameters::PoissonNoise { intensity: f },
            DegradationKind::SpeckleNoise => Parameters::SpeckleNoise {
                sigma: f * SPECKLE_MAX_SIGMA,
            },
            DegradationKind::Blur => Parameters::Blur {
                sigma: blur_sigma(f),
            },
            DegradationKind::Pixelation => Parameters::Pixelation {
                block_size: pixelation_block_size(f, config.pixelation_block_scale),
            },
            DegradationKind::Brightness => Parameters::Brightness {
                factor: brightness_factor(level, &scale)?,
            },
            DegradationKind::Contrast => Parameters::Contrast {
                factor: contrast_factor(f),
            },
            DegradationKind::ColorDistortion => Parameters::ColorDistortion {
                intensity: f,
                hue_shift: hue_shift(f),
                saturation_factor: saturation_factor(f),
            },
            DegradationKind::ColorShift => Parameters::ColorShift {
                intensity: f,
                bias: ChannelBias::from_level(level),
            },
            DegradationKind::Resolution => Parameters::Resolution {
                scale: resolution_scale(f),
            },
        })
    }

    /// Declared range of the primary parameter of `kind`, undegraded end
    /// first.
    pub fn range(kind: DegradationKind, config: &EngineConfig) -> ParameterRange {
        match kind {
            DegradationKind::Protanopia
            | DegradationKind::Deuteranopia
            | DegradationKind::Tritanopia => ParameterRange::new("severity", 0.0, 1.0),
            DegradationKind::GaussianNoise => {
                ParameterRange::new("sigma", 0.0, config.gaussian_scale)
            }
            DegradationKind::SaltPepperNoise => {
                ParameterRange::new("fraction", 0.0, SALT_PEPPER_MAX_FRACTION)
            }
            DegradationKind::PoissonNoise => ParameterRange::new("intensity", 0.0, 1.0),
            DegradationKind::SpeckleNoise => ParameterRange::new("sigma", 0.0, SPECKLE_MAX_SIGMA),
            DegradationKind::Blur => ParameterRange::new("sigma", 0.0, BLUR_MAX_SIGMA),
            DegradationKind::Pixelation => ParameterRange::new(
                "block_size",
                1.0,
                config.pixelation_block_scale as f64 + 1.0,
            ),
            DegradationKind::Brightness => ParameterRange::new("factor", 1.0, 2.5),
            DegradationKind::Contrast => ParameterRange::new("factor", 1.0, 0.01),
            DegradationKind::ColorDistortion | DegradationKind::ColorShift => {
                ParameterRange::new("intensity", 0.0, 1.0)
            }
            DegradationKind::Resolution => ParameterRange::new("scale", 1.0, 0.05),
        }
    }

    /// Parameters for `kind` from a value of its declared range, as produced
    /// by the gradient sequencer.
    ///
    /// Derived values (hue shift, saturation, color-cast direction) follow
    /// from the nearest equivalent level.
    pub fn from_value(kind: DegradationKind, value: f64, config: &EngineConfig) -> Result<Self> {
        let improved = config.improved_color_matrices;
        let params = match kind {
            DegradationKind::Protanopia => Parameters::Protanopia {
                severity: value,
                improved,
            },
            DegradationKind::Deuteranopia => Parameters::Deuteranopia {
                severity: value,
                improved,
            },
            DegradationKind::Tritanopia => Parameters::Tritanopia {
                severity: value,
                improved,
            },
            DegradationKind::GaussianNoise => Parameters::GaussianNoise { sigma: value },
            DegradationKind::SaltPepperNoise => Parameters::SaltPepperNoise { fraction: value },
            DegradationKind::PoissonNoise => Parameters::PoissonNoise { intensity: value },
            DegradationKind::SpeckleNoise => Parameters::SpeckleNoise { sigma: value },
            DegradationKind::Blur => Parameters::Blur { sigma: value },
            DegradationKind::Pixelation => Parameters::Pixelation {
                block_size: value.round().max(1.0) as u32,
            },
            DegradationKind::Brightness => Parameters::Brightness { factor: value },
            DegradationKind::Contrast => Parameters::Contrast { factor: value },
            DegradationKind::ColorDistortion => Parameters::ColorDistortion {
                intensity: value,
                hue_shift: hue_shift(value),
                saturation_factor: saturation_factor(value),
            },
            DegradationKind::ColorShift => Parameters::ColorShift {
                intensity: value,
                bias: ChannelBias::from_level(config.level_scale()?.level_at(value)),
            },
            DegradationKind::Resolution => Parameters::Resolution { scale: value },
        };
        params.validate()?;
        Ok(params)
    }

    /// Check every value against its valid domain.
    pub fn validate(&self) -> Result<()> {
        fn within(name: &'static str, value: f64, min: f64, max: f64) -> Result<()> {
            if (min..=max).contains(&value) {
                Ok(())
            } else {
                Err(DegradeError::out_of_range(name, value, min, max))
            }
        }

        match *self {
            Parameters::Protanopia { severity, .. }
            | Parameters::Deuteranopia { severity, .. }
            | Parameters::Tritanopia { severity, .. } => within("severity", severity, 0.0, 1.0),
            Parameters::GaussianNoise { sigma }
            | Parameters::SpeckleNoise { sigma }
            | Parameters::Blur { sigma } => within("sigma", sigma, 0.0, f64::MAX),
            Parameters::SaltPepperNoise { fraction } => within("fraction", fraction, 0.0, 0.5),
            Parameters::PoissonNoise { intensity }
            | Parameters::ColorShift { intensity, .. }
            | Parameters::ColorDistortion { intensity, .. } => {
                within("intensity", intensity, 0.0, 1.0)
            }
            Parameters::Pixelation { block_size } => {
                within("block_size", block_size as f64, 1.0, u32::MAX as f64)
            }
            Parameters::Brightness { factor } | Parameters::Contrast { factor } => {
                within("factor", factor, 0.0, f64::MAX)
            }
            Parameters::Resolution { scale } => within("scale", scale, f64::MIN_POSITIVE, 1.0),
        }
    }

    /// True when the transform would return its input unchanged.
    pub fn is_identity(&self) -> bool {
        match *self {
            Parameters::Protanopia { severity, .. }
            | Parameters::Deuteranopia { severity, .. }
            | Parameters::Tritanopia { severity, .. } => severity <= 0.0,
            Parameters::GaussianNoise { sigma }
            | Parameters::SpeckleNoise { sigma }
            | Parameters::Blur { sigma } => sigma <= 0.0,
            Parameters::SaltPepperNoise { fraction } => fraction <= 0.0,
            Parameters::PoissonNoise { intensity }
            | Parameters::ColorDistortion { intensity, .. }
            | Parameters::ColorShift { intensity, .. } => intensity <= 0.0,
            Parameters::Pixelation { block_size } => block_size <= 1,
            Parameters::Brightness { factor } | Parameters::Contrast { factor } => factor == 1.0,
            Parameters::Resolution { scale } => scale >= 1.0,
        }
    }

    /// The value that varies along the kind's declared range.
    pub fn primary_value(&self) -> f64 {
        match *self {
            Parameters::Protanopia { severity, .. }
            | Parameters::Deuteranopia { severity, .. }
            | Parameters::Tritanopia { severity, .. } => severity,
            Parameters::GaussianNoise { sigma }
            | Parameters::SpeckleNoise { sigma }
            | Parameters::Blur { sigma } => sigma,
            Parameters::SaltPepperNoise { fraction } => fraction,
            Parameters::PoissonNoise { intensity }
            | Parameters::ColorDistortion { intensity, .. }
            | Parameters::ColorShift { intensity, .. } => intensity,
            Parameters::Pixelation { block_size } => block_size as f64,
            Parameters::Brightness { factor } | Parameters::Contrast { factor } => factor,
            Parameters::Resolution { scale } => scale,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_level_zero_is_identity_for_every_kind() {
        let config = EngineConfig::default();
        for kind in DegradationKind::ALL {
            let params = Parameters::for_level(kind, 0, &config).unwrap();
            assert!(params.is_identity(), "{kind} at level 0: {params:?}");
            assert_eq!(params.kind(), kind);
        }
    }

    #[test]
    fn test_max_level_values() {
        let config = EngineConfig::default();
        let at_max = |kind| Parameters::for_level(kind, 100, &config).unwrap();
        assert_relative_eq!(at_max(DegradationKind::GaussianNoise).primary_value(), 50.0);
        assert_relative_eq!(at_max(DegradationKind::SaltPepperNoise).primary_value(), 0.05);
        assert_relative_eq!(at_max(DegradationKind::Blur).primary_value(), 20.0);
        assert_eq!(
            at_max(DegradationKind::Pixelation),
            Parameters::Pixelation { block_size: 21 }
        );
        assert_relative_eq!(
            at_max(DegradationKind::Resolution).primary_value(),
            0.05,
            epsilon = 1e-12
        );
        assert!(Parameters::for_level(DegradationKind::Blur, 101, &config).is_err());
    }

    #[test]
    fn test_max_level_is_configurable() {
        let config = EngineConfig {
            max_level: 99,
            ..EngineConfig::default()
        };
        let params = Parameters::for_level(DegradationKind::PoissonNoise, 99, &config).unwrap();
        assert_relative_eq!(params.primary_value(), 1.0);
    }

    #[test]
    fn test_level_and_range_endpoints_agree() {
        let config = EngineConfig::default();
        for kind in DegradationKind::ALL {
            let range = Parameters::range(kind, &config);
            let start = Parameters::for_level(kind, 0, &config).unwrap();
            assert_relative_eq!(start.primary_value(), range.start);
        }
    }

    #[test]
    fn test_from_value_derives_color_parameters() {
        let config = EngineConfig::default();
        let params = Parameters::from_value(DegradationKind::ColorShift, 0.07, &config).unwrap();
        assert_eq!(
            params,
            Parameters::ColorShift {
                intensity: 0.07,
                bias: ChannelBias::Greenward
            }
        );
        assert!(Parameters::from_value(DegradationKind::Protanopia, 1.5, &config).is_err());
        assert_eq!(
            Parameters::from_value(DegradationKind::Pixelation, 7.6, &config).unwrap(),
            Parameters::Pixelation { block_size: 8 }
        );
    }

    #[test]
    fn test_serialized_form_is_tagged_by_kind() {
        let params = Parameters::SaltPepperNoise { fraction: 0.01 };
        let json = serde_json::to_value(params).unwrap();
        assert_eq!(json["kind"], "salt_pepper_noise");
        assert_eq!(json["fraction"], 0.01);
        let back: Parameters = serde_json::from_value(json).unwrap();
        assert_eq!(back, params);
    }
}
