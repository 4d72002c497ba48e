//! Deterministic degradation and gradient synthesis for perceptual boundary
//! benchmarks.
//!
//! Given a base image, a [`DegradationKind`] and a level in `[0, max_level]`,
//! the [`DegradationEngine`] produces a reproducible degraded variant. Level 0
//! always reproduces the input; the maximum level reaches each kind's
//! saturation behavior. The [`GradientSequencer`] spreads parameter values
//! over a step count with several interpolation curves, and the
//! [`BoundaryAnalyzer`] locates the level at which an external comparator
//! stops handling a sequence.
//!
//! # Modules
//!
//! - [`color`] - Color-vision-deficiency matrices and HSV helpers
//! - [`photometric`] - Brightness, contrast, color, resolution, pixelation and blur
//! - [`noise`] - Gaussian, salt-and-pepper, Poisson and speckle noise
//! - [`gradient`] - Interpolation curves and parameter sequencing
//! - [`illusion`] - Procedurally drawn optical illusions
//! - [`boundary`] - Failure/recovery thresholds and aggregate statistics
//! - [`engine`] - Kind dispatch over all of the above

pub mod boundary;
pub mod color;
pub mod config;
pub mod engine;
pub mod error;
pub mod frame;
pub mod gradient;
pub mod illusion;
pub mod image_size;
pub mod kind;
pub mod level;
pub mod noise;
pub mod params;
pub mod photometric;
pub mod resample;

pub use boundary::{BoundaryAnalyzer, BoundaryResult, FailurePolicy, Judgement, Leveled, Threshold};
pub use color::Dichromacy;
pub use config::EngineConfig;
pub use engine::{DegradationEngine, GradientVariant, SequenceStep, Variant};
pub use error::{DegradeError, Result};
pub use frame::Frame;
pub use gradient::{CurveBand, GradientSequencer, InterpolationPolicy, ParameterRange, ParameterSet};
pub use illusion::Illusion;
pub use image_size::ImageSize;
pub use kind::{DegradationKind, KindFamily};
pub use level::LevelScale;
pub use params::Parameters;
pub use photometric::ChannelBias;
