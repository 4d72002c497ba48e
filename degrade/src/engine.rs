//! The degradation engine: one entry point over every transform family.
//!
//! The engine resolves each [`DegradationKind`] to a transform function when
//! it is built, so an unknown kind name is rejected up front rather than in
//! the middle of a sweep. Transforms are plain function pointers and the
//! engine holds no interior state, so a single engine can be shared across
//! rayon workers.
//!
//! # Example
//!
//! ```
//! use degrade::{DegradationEngine, DegradationKind, EngineConfig, Frame, ImageSize};
//! use degrade::noise::seeded_rng;
//!
//! let engine = DegradationEngine::new(EngineConfig::default()).unwrap();
//! let frame = Frame::filled(ImageSize::from_width_height(16, 16), [200, 40, 40]).unwrap();
//! let mut rng = seeded_rng(Some(7));
//!
//! let untouched = engine.apply_level(&frame, DegradationKind::Contrast, 0, &mut rng).unwrap();
//! assert_eq!(untouched.frame, frame);
//! ```

use std::collections::BTreeMap;

use rand::RngCore;
use serde::Serialize;

use crate::boundary::Leveled;
use crate::color::cvd::{simulate_deuteranopia, simulate_protanopia, simulate_tritanopia};
use crate::config::EngineConfig;
use crate::error::{DegradeError, Result};
use crate::frame::Frame;
use crate::gradient::{CurveBand, GradientSequencer};
use crate::kind::DegradationKind;
use crate::level::LevelScale;
use crate::noise::{add_gaussian_noise, add_poisson_noise, add_salt_pepper_noise, add_speckle_noise};
use crate::params::Parameters;
use crate::photometric::{
    adjust_brightness, adjust_contrast, distort_color, gaussian_blur, pixelate, reduce_resolution,
    shift_color,
};

/// Signature shared by every registered transform.
pub type TransformFn = fn(&Frame, &Parameters, &mut dyn RngCore) -> Result<Frame>;

/// A degraded copy of a frame together with what produced it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variant {
    pub level: u32,
    pub parameters: Parameters,
    #[serde(skip)]
    pub frame: Frame,
}

impl Leveled for Variant {
    fn level(&self) -> u32 {
        self.level
    }
}

impl AsRef<Frame> for Variant {
    fn as_ref(&self) -> &Frame {
        &self.frame
    }
}

/// One entry of a gradient sequence: position and concrete parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SequenceStep {
    pub index: u32,
    pub band: Option<CurveBand>,
    pub t: f64,
    pub parameters: Parameters,
}

/// A rendered gradient step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradientVariant {
    pub step: SequenceStep,
    #[serde(skip)]
    pub frame: Frame,
}

impl Leveled for GradientVariant {
    fn level(&self) -> u32 {
        self.step.index
    }
}

impl AsRef<Frame> for GradientVariant {
    fn as_ref(&self) -> &Frame {
        &self.frame
    }
}

/// Dispatches degradation requests to the registered transforms.
#[derive(Clone)]
pub struct DegradationEngine {
    config: EngineConfig,
    scale: LevelScale,
    transforms: BTreeMap<DegradationKind, TransformFn>,
}

impl std::fmt::Debug for DegradationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DegradationEngine")
            .field("config", &self.config)
            .field("kinds", &self.transforms.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl DegradationEngine {
    /// Engine with every kind registered.
    ///
    /// # Errors
    /// `InvalidConfig` when the configuration does not validate.
    pub fn new(config: EngineConfig) -> Result<Self> {
        Self::with_kinds(config, DegradationKind::ALL)
    }

    /// Engine restricted to the given kinds.
    pub fn with_kinds<I>(config: EngineConfig, kinds: I) -> Result<Self>
    where
        I: IntoIterator<Item = DegradationKind>,
    {
        config.validate()?;
        let scale = config.level_scale()?;
        let transforms: BTreeMap<_, _> = kinds
            .into_iter()
            .map(|kind| (kind, transform_for(kind)))
            .collect();
        log::debug!(
            "Degradation engine over {} kinds, levels 0..={}",
            transforms.len(),
            scale.max_level()
        );
        Ok(Self {
            config,
            scale,
            transforms,
        })
    }

    /// Engine restricted to kinds given by name.
    ///
    /// # Errors
    /// `UnsupportedDegradationKind` for the first name that is not a kind.
    pub fn from_kind_names<I, S>(config: EngineConfig, names: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let kinds = names
            .into_iter()
            .map(|name| name.as_ref().parse::<DegradationKind>())
            .collect::<Result<Vec<_>>>()?;
        Self::with_kinds(config, kinds)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn level_scale(&self) -> LevelScale {
        self.scale
    }

    pub fn max_level(&self) -> u32 {
        self.scale.max_level()
    }

    /// Registered kinds in their canonical order.
    pub fn kinds(&self) -> impl Iterator<Item = DegradationKind> + '_ {
        self.transforms.keys().copied()
    }

    pub fn supports(&self, kind: DegradationKind) -> bool {
        self.transforms.contains_key(&kind)
    }

    fn transform(&self, kind: DegradationKind) -> Result<TransformFn> {
        self.transforms
            .get(&kind)
            .copied()
            .ok_or_else(|| DegradeError::UnsupportedDegradationKind(kind.to_string()))
    }

    /// Concrete parameters for `kind` at `level`.
    pub fn parameters_for_level(&self, kind: DegradationKind, level: u32) -> Result<Parameters> {
        self.transform(kind)?;
        Parameters::for_level(kind, level, &self.config)
    }

    /// Run the transform selected by `params`.
    ///
    /// Identity parameters return a copy of the input without touching the
    /// random source.
    pub fn apply_parameters(
        &self,
        frame: &Frame,
        params: &Parameters,
        rng: &mut dyn RngCore,
    ) -> Result<Frame> {
        let transform = self.transform(params.kind())?;
        params.validate()?;
        if params.is_identity() {
            return Ok(frame.clone());
        }
        transform(frame, params, rng)
    }

    /// Degrade `frame` with `kind` at `level`.
    pub fn apply_level(
        &self,
        frame: &Frame,
        kind: DegradationKind,
        level: u32,
        rng: &mut dyn RngCore,
    ) -> Result<Variant> {
        let parameters = self.parameters_for_level(kind, level)?;
        let frame = self.apply_parameters(frame, &parameters, rng)?;
        Ok(Variant {
            level,
            parameters,
            frame,
        })
    }

    /// Every level from 0 to the configured maximum.
    pub fn sweep(
        &self,
        frame: &Frame,
        kind: DegradationKind,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Variant>> {
        self.sweep_levels(frame, kind, self.scale.levels(), rng)
    }

    /// The given levels, in the order given.
    pub fn sweep_levels<I>(
        &self,
        frame: &Frame,
        kind: DegradationKind,
        levels: I,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<Variant>>
    where
        I: IntoIterator<Item = u32>,
    {
        levels
            .into_iter()
            .map(|level| self.apply_level(frame, kind, level, rng))
            .collect()
    }

    /// Parameter sequence for `kind` positioned by `sequencer`.
    ///
    /// Step 0 carries the start of the kind's range and the last step its
    /// end, whatever the interpolation policy.
    pub fn sequence(
        &self,
        kind: DegradationKind,
        sequencer: &GradientSequencer,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<SequenceStep>> {
        self.transform(kind)?;
        let range = Parameters::range(kind, &self.config);
        sequencer
            .steps(&range, rng)
            .into_iter()
            .map(|step| {
                Ok(SequenceStep {
                    index: step.index,
                    band: step.band,
                    t: step.t,
                    parameters: Parameters::from_value(kind, step.value, &self.config)?,
                })
            })
            .collect()
    }

    /// Sequence `kind` and render every step from `frame`.
    pub fn render_sequence(
        &self,
        frame: &Frame,
        kind: DegradationKind,
        sequencer: &GradientSequencer,
        rng: &mut dyn RngCore,
    ) -> Result<Vec<GradientVariant>> {
        self.sequence(kind, sequencer, rng)?
            .into_iter()
            .map(|step| {
                let frame = self.apply_parameters(frame, &step.parameters, rng)?;
                Ok(GradientVariant { step, frame })
            })
            .collect()
    }
}

fn transform_for(kind: DegradationKind) -> TransformFn {
    match kind {
        DegradationKind::Protanopia => protanopia,
        DegradationKind::Deuteranopia => deuteranopia,
        DegradationKind::Tritanopia => tritanopia,
        DegradationKind::GaussianNoise => gaussian_noise,
        DegradationKind::SaltPepperNoise => salt_pepper_noise,
        DegradationKind::PoissonNoise => poisson_noise,
        DegradationKind::SpeckleNoise => speckle_noise,
        DegradationKind::Blur => blur,
        DegradationKind::Pixelation => pixelation,
        DegradationKind::Brightness => brightness,
        DegradationKind::Contrast => contrast,
        DegradationKind::ColorDistortion => color_distortion,
        DegradationKind::ColorShift => color_shift,
        DegradationKind::Resolution => resolution,
    }
}

fn mismatch(expected: DegradationKind, params: &Parameters) -> DegradeError {
    DegradeError::ParameterMismatch {
        expected,
        actual: params.kind(),
    }
}

fn protanopia(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Protanopia { severity, improved } => {
            simulate_protanopia(frame, severity, improved)
        }
        _ => Err(mismatch(DegradationKind::Protanopia, params)),
    }
}

fn deuteranopia(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Deuteranopia { severity, improved } => {
            simulate_deuteranopia(frame, severity, improved)
        }
        _ => Err(mismatch(DegradationKind::Deuteranopia, params)),
    }
}

fn tritanopia(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Tritanopia { severity, improved } => {
            simulate_tritanopia(frame, severity, improved)
        }
        _ => Err(mismatch(DegradationKind::Tritanopia, params)),
    }
}

fn gaussian_noise(frame: &Frame, params: &Parameters, rng: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::GaussianNoise { sigma } => add_gaussian_noise(frame, sigma, rng),
        _ => Err(mismatch(DegradationKind::GaussianNoise, params)),
    }
}

fn salt_pepper_noise(frame: &Frame, params: &Parameters, rng: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::SaltPepperNoise { fraction } => add_salt_pepper_noise(frame, fraction, rng),
        _ => Err(mismatch(DegradationKind::SaltPepperNoise, params)),
    }
}

fn poisson_noise(frame: &Frame, params: &Parameters, rng: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::PoissonNoise { intensity } => add_poisson_noise(frame, intensity, rng),
        _ => Err(mismatch(DegradationKind::PoissonNoise, params)),
    }
}

fn speckle_noise(frame: &Frame, params: &Parameters, rng: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::SpeckleNoise { sigma } => add_speckle_noise(frame, sigma, rng),
        _ => Err(mismatch(DegradationKind::SpeckleNoise, params)),
    }
}

fn blur(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Blur { sigma } => gaussian_blur(frame, sigma),
        _ => Err(mismatch(DegradationKind::Blur, params)),
    }
}

fn pixelation(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Pixelation { block_size } => pixelate(frame, block_size),
        _ => Err(mismatch(DegradationKind::Pixelation, params)),
    }
}

fn brightness(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Brightness { factor } => Ok(adjust_brightness(frame, factor)),
        _ => Err(mismatch(DegradationKind::Brightness, params)),
    }
}

fn contrast(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Contrast { factor } => Ok(adjust_contrast(frame, factor)),
        _ => Err(mismatch(DegradationKind::Contrast, params)),
    }
}

fn color_distortion(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::ColorDistortion {
            hue_shift,
            saturation_factor,
            ..
        } => distort_color(frame, hue_shift, saturation_factor),
        _ => Err(mismatch(DegradationKind::ColorDistortion, params)),
    }
}

fn color_shift(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::ColorShift { intensity, bias } => Ok(shift_color(frame, bias, intensity)),
        _ => Err(mismatch(DegradationKind::ColorShift, params)),
    }
}

fn resolution(frame: &Frame, params: &Parameters, _: &mut dyn RngCore) -> Result<Frame> {
    match *params {
        Parameters::Resolution { scale } => reduce_resolution(frame, scale),
        _ => Err(mismatch(DegradationKind::Resolution, params)),
    }
}
