//! Error types for the degradation engine.
//!
//! Every fallible operation in this crate returns [`DegradeError`]. The
//! numeric transforms themselves never fail for in-range inputs; errors come
//! from malformed images, out-of-range levels or severities, and kind names
//! that do not map onto a [`DegradationKind`](crate::DegradationKind).

use thiserror::Error;

use crate::kind::DegradationKind;

/// Errors raised by the degradation engine.
#[derive(Error, Debug)]
pub enum DegradeError {
    /// The image cannot be normalized to three-channel color, or is empty.
    #[error("Invalid image format: {0}")]
    InvalidImageFormat(String),

    /// A level, severity or other scalar fell outside its valid range.
    #[error("{name} = {value} is outside the valid range [{min}, {max}]")]
    ParameterOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    /// The requested kind name or tag is not part of the closed kind set,
    /// or the kind is not registered with the engine.
    #[error("Unsupported degradation kind: {0}")]
    UnsupportedDegradationKind(String),

    /// A transform was handed parameters belonging to another kind.
    #[error("Parameters for {actual} cannot drive the {expected} transform")]
    ParameterMismatch {
        expected: DegradationKind,
        actual: DegradationKind,
    },

    /// Engine or generator configuration is inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Image codec error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl DegradeError {
    pub(crate) fn out_of_range(name: &'static str, value: f64, min: f64, max: f64) -> Self {
        DegradeError::ParameterOutOfRange {
            name,
            value,
            min,
            max,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, DegradeError>;
