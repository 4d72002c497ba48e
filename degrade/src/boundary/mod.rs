//! Locating the level at which a degradation sequence stops being handled.
//!
//! A [`BoundaryAnalyzer`] walks a sequence of variants in level order, asks an
//! external comparator for a [`Judgement`] on each, and reports where success
//! first breaks down and where (if anywhere) it resumes. Ordering always uses
//! the level recorded on each variant, so sparse or shuffled subsets of a
//! sweep are analyzed the same way as the full sequence.

pub mod judgement;
pub mod stats;

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::frame::Frame;

pub use judgement::{prediction_matches, Judgement, DEFAULT_CONFIDENCE_THRESHOLD};
pub use stats::{severity_accuracy, SeverityBin, ThresholdStats, DEFAULT_SEVERITY_BINS};

/// Anything that carries the level it was generated at.
pub trait Leveled {
    fn level(&self) -> u32;
}

/// Where a sequence stops being handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "status", content = "level", rename_all = "snake_case")]
pub enum Threshold {
    /// No usable observation was available.
    #[default]
    NotFound,
    /// First level at which the failure condition held.
    AtLevel(u32),
    /// Every observed level was handled.
    NeverDegrades,
}

impl Threshold {
    /// The explicit level, if one was found.
    pub fn level(&self) -> Option<u32> {
        match self {
            Threshold::AtLevel(level) => Some(*level),
            _ => None,
        }
    }

    /// Collapse to a single level, treating "never degrades" as `max_level`.
    pub fn resolve(&self, max_level: u32) -> Option<u32> {
        match self {
            Threshold::NotFound => None,
            Threshold::AtLevel(level) => Some(*level),
            Threshold::NeverDegrades => Some(max_level),
        }
    }
}

/// How failures are turned into a threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first unsuccessful level is the threshold.
    #[default]
    FirstFailure,
    /// The threshold is the first level of the first run of this many
    /// consecutive failures. Values below 2 behave like `FirstFailure`.
    ConsecutiveFailures(u32),
}

impl FailurePolicy {
    fn streak_length(&self) -> u32 {
        match self {
            FailurePolicy::FirstFailure => 1,
            FailurePolicy::ConsecutiveFailures(n) => (*n).max(1),
        }
    }
}

/// The verdict for one level. `judgement` is `None` when the comparator
/// failed on that variant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelOutcome {
    pub level: u32,
    pub judgement: Option<Judgement>,
}

/// Thresholds and per-level series for one degradation sequence.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundaryResult {
    pub failure_threshold: Threshold,
    pub recovery_threshold: Option<u32>,
    /// Outcomes in ascending level order
    pub outcomes: Vec<LevelOutcome>,
    /// `(level, divergence)` against the reference, ascending by level
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub divergence: Vec<(u32, f64)>,
}

impl BoundaryResult {
    fn judged(&self) -> impl Iterator<Item = &Judgement> {
        self.outcomes.iter().filter_map(|o| o.judgement.as_ref())
    }

    /// Highest level that was looked at.
    pub fn max_tested_level(&self) -> Option<u32> {
        self.outcomes.iter().map(|o| o.level).max()
    }

    /// Failure threshold with "never degrades" resolved to the highest
    /// tested level.
    pub fn resolved_failure_level(&self) -> Option<u32> {
        self.max_tested_level()
            .and_then(|max| self.failure_threshold.resolve(max))
    }

    /// Fraction of judged levels that were successes.
    pub fn success_rate(&self) -> Option<f64> {
        let (total, successes) = self
            .judged()
            .fold((0usize, 0usize), |(t, s), j| (t + 1, s + usize::from(j.is_success())));
        (total > 0).then(|| successes as f64 / total as f64)
    }

    /// Mean of the reported confidences, ignoring judgements without one.
    pub fn mean_confidence(&self) -> Option<f64> {
        let confidences: Vec<f64> = self.judged().filter_map(|j| j.confidence).collect();
        (!confidences.is_empty())
            .then(|| confidences.iter().sum::<f64>() / confidences.len() as f64)
    }

    /// Number of levels the comparator could not judge.
    pub fn unjudged_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.judgement.is_none()).count()
    }
}

/// Finds failure and recovery thresholds over leveled variants.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryAnalyzer {
    policy: FailurePolicy,
}

impl BoundaryAnalyzer {
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Analyze already judged levels. Input order does not matter.
    pub fn analyze_judgements<I>(&self, outcomes: I) -> BoundaryResult
    where
        I: IntoIterator<Item = LevelOutcome>,
    {
        let mut outcomes: Vec<LevelOutcome> = outcomes.into_iter().collect();
        outcomes.sort_by_key(|o| o.level);

        let needed = self.policy.streak_length();
        let mut streak = 0u32;
        let mut streak_start = 0u32;
        let mut failure = None;
        let mut recovery = None;
        let mut seen_any = false;

        for outcome in &outcomes {
            let Some(judgement) = outcome.judgement else {
                continue;
            };
            seen_any = true;

            if failure.is_some() {
                if judgement.is_success() {
                    recovery = Some(outcome.level);
                    break;
                }
                continue;
            }

            if judgement.is_success() {
                streak = 0;
            } else {
                if streak == 0 {
                    streak_start = outcome.level;
                }
                streak += 1;
                if streak >= needed {
                    failure = Some(streak_start);
                }
            }
        }

        let failure_threshold = match (failure, seen_any) {
            (Some(level), _) => Threshold::AtLevel(level),
            (None, true) => Threshold::NeverDegrades,
            (None, false) => Threshold::NotFound,
        };
        log::debug!(
            "Boundary over {} levels: failure {:?}, recovery {:?}",
            outcomes.len(),
            failure_threshold,
            recovery
        );

        BoundaryResult {
            failure_threshold,
            recovery_threshold: recovery,
            outcomes,
            divergence: Vec::new(),
        }
    }

    /// Judge every variant with `comparator` and analyze the results.
    ///
    /// Comparator errors are logged and the level is left unjudged; they
    /// never abort the analysis.
    pub fn analyze<V, E, F>(&self, variants: &[V], mut comparator: F) -> BoundaryResult
    where
        V: Leveled,
        E: Display,
        F: FnMut(&V) -> std::result::Result<Judgement, E>,
    {
        let outcomes: Vec<LevelOutcome> = variants
            .iter()
            .map(|variant| {
                let level = variant.level();
                let judgement = match comparator(variant) {
                    Ok(judgement) => Some(judgement),
                    Err(e) => {
                        log::warn!("Comparator failed at level {level}: {e}");
                        None
                    }
                };
                LevelOutcome { level, judgement }
            })
            .collect();
        self.analyze_judgements(outcomes)
    }

    /// Like [`analyze`](Self::analyze), also recording each variant's
    /// divergence from `reference`.
    pub fn analyze_with_reference<V, E, F>(
        &self,
        reference: &Frame,
        variants: &[V],
        comparator: F,
    ) -> Result<BoundaryResult>
    where
        V: Leveled + AsRef<Frame>,
        E: Display,
        F: FnMut(&V) -> std::result::Result<Judgement, E>,
    {
        let divergence = divergence_series(reference, variants)?;
        let mut result = self.analyze(variants, comparator);
        result.divergence = divergence;
        Ok(result)
    }
}

/// Mean absolute channel difference of each variant against `reference`,
/// in `[0, 1]`, sorted by level.
///
/// # Errors
/// `InvalidImageFormat` when a variant's size differs from the reference.
pub fn divergence_series<V>(reference: &Frame, variants: &[V]) -> Result<Vec<(u32, f64)>>
where
    V: Leveled + AsRef<Frame>,
{
    let mut series = variants
        .iter()
        .map(|v| Ok((v.level(), reference.mean_abs_difference(v.as_ref())?)))
        .collect::<Result<Vec<_>>>()?;
    series.sort_by_key(|(level, _)| *level);
    Ok(series)
}

/// First level whose divergence reaches `visibility`.
pub fn divergence_threshold(series: &[(u32, f64)], visibility: f64) -> Threshold {
    if series.is_empty() {
        return Threshold::NotFound;
    }
    series
        .iter()
        .filter(|(_, d)| *d >= visibility)
        .map(|(level, _)| *level)
        .min()
        .map_or(Threshold::NeverDegrades, Threshold::AtLevel)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image_size::ImageSize;

    struct Sample {
        level: u32,
        frame: Frame,
    }

    impl Leveled for Sample {
        fn level(&self) -> u32 {
            self.level
        }
    }

    impl AsRef<Frame> for Sample {
        fn as_ref(&self) -> &Frame {
            &self.frame
        }
    }

    fn samples(levels: &[u32]) -> Vec<Sample> {
        levels
            .iter()
            .map(|&level| Sample {
                level,
                frame: Frame::filled(ImageSize::from_width_height(4, 4), [level as u8; 3]).unwrap(),
            })
            .collect()
    }

    fn outcome(level: u32, success: bool) -> LevelOutcome {
        LevelOutcome {
            level,
            judgement: Some(Judgement::new(success, true)),
        }
    }

    #[test]
    fn test_always_successful_never_degrades() {
        let variants = samples(&[0, 10, 20, 100]);
        let result = BoundaryAnalyzer::default()
            .analyze(&variants, |_| Ok::<_, String>(Judgement::new(true, true)));
        assert_eq!(result.failure_threshold, Threshold::NeverDegrades);
        assert_eq!(result.recovery_threshold, None);
        assert_eq!(result.resolved_failure_level(), Some(100));
        assert_eq!(result.success_rate(), Some(1.0));
    }

    #[test]
    fn test_always_failing_fails_at_zero() {
        let variants = samples(&[0, 1, 2]);
        let result = BoundaryAnalyzer::default()
            .analyze(&variants, |_| Ok::<_, String>(Judgement::new(false, false)));
        assert_eq!(result.failure_threshold, Threshold::AtLevel(0));
        assert_eq!(result.resolved_failure_level(), Some(0));
    }

    #[test]
    fn test_sparse_unsorted_levels_use_recorded_level() {
        let variants = samples(&[60, 0, 90, 30]);
        let result = BoundaryAnalyzer::default().analyze(&variants, |v| {
            Ok::<_, String>(Judgement::new(v.level < 60, true))
        });
        assert_eq!(result.failure_threshold, Threshold::AtLevel(60));
        let levels: Vec<u32> = result.outcomes.iter().map(|o| o.level).collect();
        assert_eq!(levels, vec![0, 30, 60, 90]);
    }

    #[test]
    fn test_recovery_after_failure() {
        let outcomes = [
            outcome(0, true),
            outcome(10, false),
            outcome(20, false),
            outcome(30, true),
            outcome(40, false),
        ];
        let result = BoundaryAnalyzer::default().analyze_judgements(outcomes);
        assert_eq!(result.failure_threshold, Threshold::AtLevel(10));
        assert_eq!(result.recovery_threshold, Some(30));
    }

    #[test]
    fn test_unconfident_answer_is_a_failure() {
        let result = BoundaryAnalyzer::default().analyze_judgements([
            outcome(0, true),
            LevelOutcome {
                level: 5,
                judgement: Some(Judgement::new(true, false)),
            },
        ]);
        assert_eq!(result.failure_threshold, Threshold::AtLevel(5));
    }

    #[test]
    fn test_consecutive_failure_policy() {
        let outcomes = vec![
            outcome(0, true),
            outcome(1, false),
            outcome(2, true),
            outcome(3, false),
            outcome(4, false),
            outcome(5, false),
            outcome(6, true),
        ];
        let analyzer = BoundaryAnalyzer::new(FailurePolicy::ConsecutiveFailures(3));
        let result = analyzer.analyze_judgements(outcomes.clone());
        assert_eq!(result.failure_threshold, Threshold::AtLevel(3));
        assert_eq!(result.recovery_threshold, Some(6));

        let first = BoundaryAnalyzer::default().analyze_judgements(outcomes);
        assert_eq!(first.failure_threshold, Threshold::AtLevel(1));
        assert_eq!(first.recovery_threshold, Some(2));
    }

    #[test]
    fn test_comparator_errors_are_skipped() {
        let _ = env_logger::builder().is_test(true).try_init();
        let variants = samples(&[0, 10, 20]);
        let result = BoundaryAnalyzer::default().analyze(&variants, |v| {
            if v.level == 10 {
                Err("model timed out")
            } else {
                Ok(Judgement::new(true, true))
            }
        });
        assert_eq!(result.failure_threshold, Threshold::NeverDegrades);
        assert_eq!(result.unjudged_count(), 1);
        assert_eq!(result.outcomes.len(), 3);
    }

    #[test]
    fn test_no_observations_is_not_found() {
        let result = BoundaryAnalyzer::default().analyze_judgements(Vec::new());
        assert_eq!(result.failure_threshold, Threshold::NotFound);
        assert_eq!(result.resolved_failure_level(), None);
        assert_eq!(result.success_rate(), None);
    }

    #[test]
    fn test_divergence_and_visibility_threshold() {
        let reference = Frame::filled(ImageSize::from_width_height(4, 4), [0; 3]).unwrap();
        let variants = samples(&[51, 0, 102]);
        let result = BoundaryAnalyzer::default()
            .analyze_with_reference(&reference, &variants, |_| {
                Ok::<_, String>(Judgement::new(true, true))
            })
            .unwrap();

        assert_eq!(result.divergence.len(), 3);
        assert_eq!(result.divergence[0], (0, 0.0));
        assert!((result.divergence[1].1 - 0.2).abs() < 1e-12);
        assert!((result.divergence[2].1 - 0.4).abs() < 1e-12);

        assert_eq!(
            divergence_threshold(&result.divergence, 0.3),
            Threshold::AtLevel(102)
        );
        assert_eq!(
            divergence_threshold(&result.divergence, 0.9),
            Threshold::NeverDegrades
        );
        assert_eq!(divergence_threshold(&[], 0.1), Threshold::NotFound);
    }

    #[test]
    fn test_mean_confidence() {
        let result = BoundaryAnalyzer::default().analyze_judgements([
            LevelOutcome {
                level: 0,
                judgement: Some(Judgement::from_prediction("3", "3", 0.9, 0.5)),
            },
            LevelOutcome {
                level: 1,
                judgement: Some(Judgement::from_prediction("4", "3", 0.3, 0.5)),
            },
        ]);
        assert!((result.mean_confidence().unwrap() - 0.6).abs() < 1e-12);
        assert_eq!(result.success_rate(), Some(0.5));
    }
}
