//! The closed set of degradation kinds.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::DegradeError;

/// Broad family a degradation kind belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KindFamily {
    /// Dichromacy simulation through a fixed 3x3 matrix
    ColorVision,
    /// Stochastic per-pixel noise
    Noise,
    /// Deterministic per-pixel intensity or color changes
    Photometric,
    /// Sampling and spatial filtering
    Geometric,
}

/// Every image alteration the engine knows how to produce.
///
/// The serialized form (and [`DegradationKind::as_str`]) is the snake_case
/// name used in output file names and metadata records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegradationKind {
    Protanopia,
    Deuteranopia,
    Tritanopia,
    GaussianNoise,
    SaltPepperNoise,
    PoissonNoise,
    SpeckleNoise,
    Blur,
    Pixelation,
    Brightness,
    Contrast,
    ColorDistortion,
    ColorShift,
    Resolution,
}

impl DegradationKind {
    /// All kinds in declaration order.
    pub const ALL: [DegradationKind; 14] = [
        DegradationKind::Protanopia,
        DegradationKind::Deuteranopia,
        DegradationKind::Tritanopia,
        DegradationKind::GaussianNoise,
        DegradationKind::SaltPepperNoise,
        DegradationKind::PoissonNoise,
        DegradationKind::SpeckleNoise,
        DegradationKind::Blur,
        DegradationKind::Pixelation,
        DegradationKind::Brightness,
        DegradationKind::Contrast,
        DegradationKind::ColorDistortion,
        DegradationKind::ColorShift,
        DegradationKind::Resolution,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DegradationKind::Protanopia => "protanopia",
            DegradationKind::Deuteranopia => "deuteranopia",
            DegradationKind::Tritanopia => "tritanopia",
            DegradationKind::GaussianNoise => "gaussian_noise",
            DegradationKind::SaltPepperNoise => "salt_pepper_noise",
            DegradationKind::PoissonNoise => "poisson_noise",
            DegradationKind::SpeckleNoise => "speckle_noise",
            DegradationKind::Blur => "blur",
            DegradationKind::Pixelation => "pixelation",
            DegradationKind::Brightness => "brightness",
            DegradationKind::Contrast => "contrast",
            DegradationKind::ColorDistortion => "color_distortion",
            DegradationKind::ColorShift => "color_shift",
            DegradationKind::Resolution => "resolution",
        }
    }

    pub fn family(&self) -> KindFamily {
        match self {
            DegradationKind::Protanopia
            | DegradationKind::Deuteranopia
            | DegradationKind::Tritanopia => KindFamily::ColorVision,
            DegradationKind::GaussianNoise
            | DegradationKind::SaltPepperNoise
            | DegradationKind::PoissonNoise
            | DegradationKind::SpeckleNoise => KindFamily::Noise,
            DegradationKind::Brightness
            | DegradationKind::Contrast
            | DegradationKind::ColorDistortion
            | DegradationKind::ColorShift => KindFamily::Photometric,
            DegradationKind::Blur | DegradationKind::Pixelation | DegradationKind::Resolution => {
                KindFamily::Geometric
            }
        }
    }

    /// True for kinds whose output depends on a random source.
    pub fn is_stochastic(&self) -> bool {
        self.family() == KindFamily::Noise
    }

    /// Position of this kind within [`DegradationKind::ALL`].
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for DegradationKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DegradationKind {
    type Err = DegradeError;

    /// Parse a kind name. Accepts the canonical snake_case names plus the
    /// legacy directory names used by older dataset generators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let kind = match normalized.as_str() {
            "protanopia" => DegradationKind::Protanopia,
            "deuteranopia" => DegradationKind::Deuteranopia,
            "tritanopia" => DegradationKind::Tritanopia,
            "gaussian_noise" => DegradationKind::GaussianNoise,
            "salt_pepper_noise" | "salt_and_pepper_noise" => DegradationKind::SaltPepperNoise,
            "poisson_noise" => DegradationKind::PoissonNoise,
            "speckle_noise" => DegradationKind::SpeckleNoise,
            "blur" | "blur_effect" | "sharpness" => DegradationKind::Blur,
            "pixelation" => DegradationKind::Pixelation,
            "brightness" | "brightness_variation" => DegradationKind::Brightness,
            "contrast" | "contrast_variation" => DegradationKind::Contrast,
            "color_distortion" => DegradationKind::ColorDistortion,
            "color_shift" => DegradationKind::ColorShift,
            "resolution" => DegradationKind::Resolution,
            _ => return Err(DegradeError::UnsupportedDegradationKind(s.to_string())),
        };
        Ok(kind)
    }
}
