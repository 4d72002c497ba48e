//! Color-space operations: dichromacy matrices, CVD simulation and HSV.

pub mod cvd;
pub mod hsv;
pub mod matrices;

pub use cvd::{
    analyze_color_contrast, apply_matrix, local_contrast, severity_gradient, simulate,
    simulate_anomaly, simulate_deuteranopia, simulate_protanopia, simulate_tritanopia,
    ColorContrastAnalysis, SeverityStep, ANOMALY_SEVERITY,
};
pub use matrices::{Dichromacy, TransformMatrix};
