//! Gradient sequencing: ordinal step index to normalized position.
//!
//! A sequence of `n` steps always starts exactly at the range start (index 0)
//! and ends exactly at the range end (index `n - 1`). Interior indices are
//! mapped through an interpolation curve. The banded policy splits the index
//! range into five contiguous bands, each with its own curve, which gives
//! large generated batches a mix of evenly spaced, front-loaded, back-loaded
//! and randomly placed samples.

use std::collections::BTreeMap;
use std::f64::consts::PI;

use rand::RngCore;
use rand_distr::{Beta, Distribution};
use serde::{Deserialize, Serialize};

use crate::error::{DegradeError, Result};

/// Number of bands in the banded policy.
pub const BAND_COUNT: usize = 5;

/// One interpolation curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CurveBand {
    /// `i / (n - 1)`
    Linear,
    /// `(e^(i/s) - 1) / (e^((n-1)/s) - 1)` with `s = n / 5`
    Exponential,
    /// `ln(i + 1) / ln(n)`
    Logarithmic,
    /// `(sin(i·π/n) + 1) / 2`
    Sinusoidal,
    /// A Beta(0.5, 0.5) draw, ignoring the index
    BetaRandom,
}

impl CurveBand {
    pub const ALL: [CurveBand; BAND_COUNT] = [
        CurveBand::Linear,
        CurveBand::Exponential,
        CurveBand::Logarithmic,
        CurveBand::Sinusoidal,
        CurveBand::BetaRandom,
    ];

    /// Band owning `index` under the banded policy: `min(4, 5·i / n)`.
    pub fn for_index(index: u32, total_steps: u32) -> Self {
        let band = if total_steps == 0 {
            0
        } else {
            (BAND_COUNT as u64 * index as u64 / total_steps as u64) as usize
        };
        Self::ALL[band.min(BAND_COUNT - 1)]
    }

    /// Evaluate the curve, clamped to `[0, 1]`.
    pub fn evaluate<R>(&self, index: u32, total_steps: u32, rng: &mut R) -> f64
    where
        R: RngCore + ?Sized,
    {
        let i = index as f64;
        let n = total_steps as f64;
        let t = match self {
            CurveBand::Linear => ratio(i, n - 1.0),
            CurveBand::Exponential => {
                let s = n / BAND_COUNT as f64;
                if s <= 0.0 {
                    0.0
                } else {
                    ratio((i / s).exp() - 1.0, ((n - 1.0) / s).exp() - 1.0)
                }
            }
            CurveBand::Logarithmic => ratio((i + 1.0).ln(), n.ln()),
            CurveBand::Sinusoidal => {
                if n <= 0.0 {
                    0.5
                } else {
                    ((i * PI / n).sin() + 1.0) / 2.0
                }
            }
            CurveBand::BetaRandom => match Beta::new(0.5, 0.5) {
                Ok(beta) => beta.sample(rng),
                Err(_) => 0.5,
            },
        };
        if t.is_nan() {
            0.0
        } else {
            t.clamp(0.0, 1.0)
        }
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// How interior indices are assigned to curves.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "policy", content = "curve")]
pub enum InterpolationPolicy {
    /// Five contiguous bands, one curve each
    #[default]
    Banded,
    /// One curve over the whole index range
    Single(CurveBand),
}

/// A named parameter range. `start` is the undegraded end; `end` may be
/// smaller than `start` for parameters that shrink as degradation grows.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ParameterRange {
    pub name: &'static str,
    pub start: f64,
    pub end: f64,
}

impl ParameterRange {
    pub const fn new(name: &'static str, start: f64, end: f64) -> Self {
        Self { name, start, end }
    }

    /// Linear map of `t ∈ [0, 1]` into the range.
    pub fn at(&self, t: f64) -> f64 {
        self.start + (self.end - self.start) * t
    }
}

/// Named parameter values for one step of a multi-parameter sequence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, f64>);

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.0.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    /// Value for `name`, or `default` when absent.
    pub fn value_or(&self, name: &str, default: f64) -> f64 {
        self.get(name).unwrap_or(default)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> FromIterator<(&'a str, f64)> for ParameterSet {
    fn from_iter<I: IntoIterator<Item = (&'a str, f64)>>(iter: I) -> Self {
        let mut set = ParameterSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

/// One step of a single-parameter sequence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GradientStep {
    pub index: u32,
    /// Curve used for this index; `None` for the pinned endpoints
    pub band: Option<CurveBand>,
    pub t: f64,
    pub value: f64,
}

/// One step of a multi-parameter sequence.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpaceStep {
    pub index: u32,
    pub band: Option<CurveBand>,
    pub values: ParameterSet,
}

/// Maps step indices to normalized positions and parameter values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GradientSequencer {
    total_steps: u32,
    policy: InterpolationPolicy,
}

impl GradientSequencer {
    /// # Errors
    /// `InvalidConfig` when `total_steps` is zero.
    pub fn new(total_steps: u32, policy: InterpolationPolicy) -> Result<Self> {
        if total_steps == 0 {
            return Err(DegradeError::InvalidConfig(
                "a gradient sequence needs at least one step".to_string(),
            ));
        }
        Ok(Self {
            total_steps,
            policy,
        })
    }

    pub fn total_steps(&self) -> u32 {
        self.total_steps
    }

    pub fn policy(&self) -> InterpolationPolicy {
        self.policy
    }

    /// Curve assigned to an interior index, `None` for the endpoints.
    pub fn band(&self, index: u32) -> Option<CurveBand> {
        if index == 0 || index + 1 >= self.total_steps {
            return None;
        }
        Some(match self.policy {
            InterpolationPolicy::Banded => CurveBand::for_index(index, self.total_steps),
            InterpolationPolicy::Single(curve) => curve,
        })
    }

    /// Normalized position of `index`.
    ///
    /// # Errors
    /// `ParameterOutOfRange` when `index >= total_steps`.
    pub fn position<R>(&self, index: u32, rng: &mut R) -> Result<f64>
    where
        R: RngCore + ?Sized,
    {
        self.check_index(index)?;
        if index == 0 {
            return Ok(0.0);
        }
        if index + 1 == self.total_steps {
            return Ok(1.0);
        }
        Ok(self
            .band(index)
            .map_or(0.0, |band| band.evaluate(index, self.total_steps, rng)))
    }

    /// Every step of a single-parameter sequence over `range`.
    pub fn steps<R>(&self, range: &ParameterRange, rng: &mut R) -> Vec<GradientStep>
    where
        R: RngCore + ?Sized,
    {
        (0..self.total_steps)
            .map(|index| {
                let t = self.position(index, rng).unwrap_or(0.0);
                GradientStep {
                    index,
                    band: self.band(index),
                    t,
                    value: range.at(t),
                }
            })
            .collect()
    }

    /// Every step of a multi-parameter sequence.
    ///
    /// Deterministic curves share one position across all parameters; the
    /// random band draws independently per parameter.
    pub fn sequence_space<R>(&self, ranges: &[ParameterRange], rng: &mut R) -> Vec<SpaceStep>
    where
        R: RngCore + ?Sized,
    {
        (0..self.total_steps)
            .map(|index| {
                let values = ranges
                    .iter()
                    .map(|range| {
                        let t = self.position(index, rng).unwrap_or(0.0);
                        (range.name, range.at(t))
                    })
                    .collect();
                SpaceStep {
                    index,
                    band: self.band(index),
                    values,
                }
            })
            .collect()
    }

    fn check_index(&self, index: u32) -> Result<()> {
        if index >= self.total_steps {
            return Err(DegradeError::out_of_range(
                "index",
                index as f64,
                0.0,
                (self.total_steps - 1) as f64,
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::seeded_rng;
    use approx::assert_relative_eq;

    const RANGE: ParameterRange = ParameterRange::new("sigma", 0.0, 50.0);

    #[test]
    fn test_band_partition_for_hundred_steps() {
        assert_eq!(CurveBand::for_index(0, 100), CurveBand::Linear);
        assert_eq!(CurveBand::for_index(19, 100), CurveBand::Linear);
        assert_eq!(CurveBand::for_index(20, 100), CurveBand::Exponential);
        assert_eq!(CurveBand::for_index(40, 100), CurveBand::Logarithmic);
        assert_eq!(CurveBand::for_index(79, 100), CurveBand::Sinusoidal);
        assert_eq!(CurveBand::for_index(80, 100), CurveBand::BetaRandom);
        assert_eq!(CurveBand::for_index(99, 100), CurveBand::BetaRandom);
    }

    #[test]
    fn test_exponential_matches_fixed_scale_at_hundred() {
        let mut rng = seeded_rng(Some(0));
        let t = CurveBand::Exponential.evaluate(30, 100, &mut rng);
        let expected = ((30.0f64 / 20.0).exp() - 1.0) / (4.95f64.exp() - 1.0);
        assert_relative_eq!(t, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_endpoints_pinned_for_every_policy() {
        let mut policies = vec![InterpolationPolicy::Banded];
        policies.extend(CurveBand::ALL.iter().map(|&c| InterpolationPolicy::Single(c)));
        for policy in policies {
            let sequencer = GradientSequencer::new(100, policy).unwrap();
            let steps = sequencer.steps(&RANGE, &mut seeded_rng(Some(1)));
            assert_eq!(steps.len(), 100);
            assert_eq!(steps[0].value, RANGE.start, "{policy:?}");
            assert_eq!(steps[99].value, RANGE.end, "{policy:?}");
            assert!(steps.iter().all(|s| (0.0..=1.0).contains(&s.t)));
        }
    }

    #[test]
    fn test_reversed_range_maps_start_to_undegraded_end() {
        let range = ParameterRange::new("scale", 1.0, 0.05);
        let sequencer = GradientSequencer::new(10, InterpolationPolicy::Single(CurveBand::Linear))
            .unwrap();
        let steps = sequencer.steps(&range, &mut seeded_rng(Some(1)));
        assert_relative_eq!(steps[0].value, 1.0);
        assert_relative_eq!(steps[9].value, 0.05);
        assert!(steps.windows(2).all(|w| w[1].value < w[0].value));
    }

    #[test]
    fn test_beta_band_is_seed_controlled() {
        let sequencer = GradientSequencer::new(100, InterpolationPolicy::Banded).unwrap();
        let a = sequencer.steps(&RANGE, &mut seeded_rng(Some(5)));
        let b = sequencer.steps(&RANGE, &mut seeded_rng(Some(5)));
        let c = sequencer.steps(&RANGE, &mut seeded_rng(Some(6)));
        assert_eq!(a, b);
        assert_ne!(a[80..99], c[80..99]);
        assert_eq!(a[..80], c[..80]);
    }

    #[test]
    fn test_small_sequences() {
        let one = GradientSequencer::new(1, InterpolationPolicy::Banded).unwrap();
        let steps = one.steps(&RANGE, &mut seeded_rng(Some(1)));
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].value, RANGE.start);

        let two = GradientSequencer::new(2, InterpolationPolicy::Banded).unwrap();
        let steps = two.steps(&RANGE, &mut seeded_rng(Some(1)));
        assert_eq!(steps[1].value, RANGE.end);

        assert!(GradientSequencer::new(0, InterpolationPolicy::Banded).is_err());
        assert!(two.position(2, &mut seeded_rng(Some(1))).is_err());
    }

    #[test]
    fn test_sequence_space_names_every_parameter() {
        let ranges = [
            ParameterRange::new("gray", 80.0, 180.0),
            ParameterRange::new("width", 20.0, 100.0),
        ];
        let sequencer = GradientSequencer::new(100, InterpolationPolicy::Banded).unwrap();
        let steps = sequencer.sequence_space(&ranges, &mut seeded_rng(Some(2)));
        assert_eq!(steps.len(), 100);
        assert_eq!(steps[0].values.get("gray"), Some(80.0));
        assert_eq!(steps[99].values.get("width"), Some(100.0));
        // Deterministic bands move every parameter to the same position
        let s = &steps[10].values;
        assert_relative_eq!(
            (s.value_or("gray", 0.0) - 80.0) / 100.0,
            (s.value_or("width", 0.0) - 20.0) / 80.0,
            epsilon = 1e-12
        );
    }
}
