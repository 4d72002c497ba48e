//! Color-vision-deficiency simulation.
//!
//! Every pixel is treated as a row vector of normalized channel values and
//! mapped through `pixels · Mᵀ`. A severity below one blends the result with
//! the original, so anomalous trichromacy is the same transform at partial
//! severity. Results are clamped to `[0, 1]` before returning to 8-bit codes.

use ndarray::{Array2, Array3};
use serde::Serialize;

use super::matrices::{Dichromacy, TransformMatrix};
use crate::error::{DegradeError, Result};
use crate::frame::Frame;
use crate::level::check_severity;

/// Severity used for the anomalous-trichromacy presets.
pub const ANOMALY_SEVERITY: f64 = 0.5;

/// Apply a dichromacy matrix to a frame, blended by `severity`.
///
/// # Errors
/// `ParameterOutOfRange` when `severity` is outside `[0, 1]`.
pub fn apply_matrix(frame: &Frame, matrix: &TransformMatrix, severity: f64) -> Result<Frame> {
    let severity = check_severity(severity)?;
    let original = frame.to_unit();
    let rows = matrix.rows();

    let transformed = Array3::from_shape_fn(original.dim(), |(y, x, c)| {
        let row = &rows[c];
        let mapped = row[0] * original[[y, x, 0]]
            + row[1] * original[[y, x, 1]]
            + row[2] * original[[y, x, 2]];
        if severity < 1.0 {
            (1.0 - severity) * original[[y, x, c]] + severity * mapped
        } else {
            mapped
        }
    });

    Ok(Frame::quantize_unit(&transformed))
}

/// Simulate a dichromacy at the given severity.
pub fn simulate(
    frame: &Frame,
    deficiency: Dichromacy,
    severity: f64,
    improved: bool,
) -> Result<Frame> {
    apply_matrix(frame, deficiency.matrix(improved), severity)
}

pub fn simulate_protanopia(frame: &Frame, severity: f64, improved: bool) -> Result<Frame> {
    simulate(frame, Dichromacy::Protanopia, severity, improved)
}

pub fn simulate_deuteranopia(frame: &Frame, severity: f64, improved: bool) -> Result<Frame> {
    simulate(frame, Dichromacy::Deuteranopia, severity, improved)
}

pub fn simulate_tritanopia(frame: &Frame, severity: f64, improved: bool) -> Result<Frame> {
    simulate(frame, Dichromacy::Tritanopia, severity, improved)
}

/// Anomalous trichromacy (protanomaly, deuteranomaly, tritanomaly): the
/// improved dichromacy matrix at [`ANOMALY_SEVERITY`].
pub fn simulate_anomaly(frame: &Frame, deficiency: Dichromacy) -> Result<Frame> {
    simulate(frame, deficiency, ANOMALY_SEVERITY, true)
}

/// One frame of a severity gradient.
#[derive(Debug, Clone)]
pub struct SeverityStep {
    pub step: u32,
    pub severity: f64,
    pub frame: Frame,
}

/// Render `num_steps + 1` frames with `severity = step / num_steps`.
///
/// # Errors
/// `InvalidConfig` when `num_steps` is zero.
pub fn severity_gradient(
    frame: &Frame,
    deficiency: Dichromacy,
    num_steps: u32,
    improved: bool,
) -> Result<Vec<SeverityStep>> {
    if num_steps == 0 {
        return Err(DegradeError::InvalidConfig(
            "severity gradient needs at least one step".to_string(),
        ));
    }
    (0..=num_steps)
        .map(|step| {
            let severity = step as f64 / num_steps as f64;
            simulate(frame, deficiency, severity, improved).map(|frame| SeverityStep {
                step,
                severity,
                frame,
            })
        })
        .collect()
}

/// Color and contrast change introduced by a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ColorContrastAnalysis {
    pub deficiency: Dichromacy,
    pub severity: f64,
    /// Mean absolute channel difference, normalized to `[0, 1]`
    pub color_difference: f64,
    pub original_contrast: f64,
    pub simulated_contrast: f64,
    pub contrast_change: f64,
}

/// Measure how much a simulation changes colors and local contrast.
pub fn analyze_color_contrast(
    frame: &Frame,
    deficiency: Dichromacy,
    severity: f64,
    improved: bool,
) -> Result<ColorContrastAnalysis> {
    let simulated = simulate(frame, deficiency, severity, improved)?;
    let color_difference = frame.mean_abs_difference(&simulated)?;
    let original_contrast = local_contrast(&frame.channel_mean());
    let simulated_contrast = local_contrast(&simulated.channel_mean());

    Ok(ColorContrastAnalysis {
        deficiency,
        severity,
        color_difference,
        original_contrast,
        simulated_contrast,
        contrast_change: (original_contrast - simulated_contrast).abs(),
    })
}

/// Mean gradient magnitude of a gray image.
///
/// Interior samples use central differences and edges use one-sided
/// differences. An axis of length one contributes no gradient.
pub fn local_contrast(gray: &Array2<f64>) -> f64 {
    let (height, width) = gray.dim();
    if height == 0 || width == 0 {
        return 0.0;
    }

    let derivative = |get: &dyn Fn(usize) -> f64, i: usize, n: usize| -> f64 {
        if n < 2 {
            0.0
        } else if i == 0 {
            get(1) - get(0)
        } else if i == n - 1 {
            get(n - 1) - get(n - 2)
        } else {
            (get(i + 1) - get(i - 1)) / 2.0
        }
    };

    let mut total = 0.0;
    for y in 0..height {
        for x in 0..width {
            let gx = derivative(&|i| gray[[y, i]], x, width);
            let gy = derivative(&|i| gray[[i, x]], y, height);
            total += (gx * gx + gy * gy).sqrt();
        }
    }
    total / (height * width) as f64
}
