//! Comparator-driven evaluation of generated sequences.
//!
//! The comparator is any callable that takes an image path and returns a
//! `(prediction, confidence)` pair, typically a vision model behind an API.
//! Retries and timeouts are its own business; a failed call is logged and
//! the level is left unjudged.

use std::collections::BTreeMap;
use std::fmt::Display;
use std::path::{Path, PathBuf};

use degrade::boundary::{severity_accuracy, SeverityBin, ThresholdStats, DEFAULT_SEVERITY_BINS};
use degrade::{BoundaryAnalyzer, BoundaryResult, DegradationKind, FailurePolicy, Judgement, Threshold};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SweepError};
use crate::naming::MANIFEST_FILE_NAME;
use crate::record::{write_json, SequenceManifest};

/// Boundary analysis of one manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SequenceEvaluation {
    pub source: String,
    pub kind: DegradationKind,
    pub max_level: u32,
    pub expected: String,
    pub result: BoundaryResult,
}

impl SequenceEvaluation {
    /// Failure level with "never degrades" resolved to the scale maximum.
    pub fn failure_level(&self) -> Option<u32> {
        self.result.failure_threshold.resolve(self.max_level)
    }
}

/// Judges sequences with a caller-supplied comparator.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    analyzer: BoundaryAnalyzer,
    confidence_threshold: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(
            FailurePolicy::FirstFailure,
            degrade::boundary::DEFAULT_CONFIDENCE_THRESHOLD,
        )
    }
}

impl Evaluator {
    pub fn new(policy: FailurePolicy, confidence_threshold: f64) -> Self {
        Self {
            analyzer: BoundaryAnalyzer::new(policy),
            confidence_threshold,
        }
    }

    /// Run `comparator` over every variant listed in the manifest at
    /// `manifest_path` and locate the failure and recovery thresholds.
    ///
    /// # Errors
    /// Only a manifest that cannot be read fails the call. Comparator
    /// errors are logged per variant.
    pub fn evaluate_sequence<F, E>(
        &self,
        manifest_path: &Path,
        expected: &str,
        mut comparator: F,
    ) -> Result<SequenceEvaluation>
    where
        F: FnMut(&Path) -> std::result::Result<(String, f64), E>,
        E: Display,
    {
        let manifest = SequenceManifest::load_from_file(manifest_path)?;
        let dir = manifest_path.parent().unwrap_or_else(|| Path::new("."));

        let result = self.analyzer.analyze(&manifest.variants, |record| {
            let path = dir.join(&record.output);
            let (prediction, confidence) =
                comparator(&path).map_err(|e| SweepError::Comparator {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
            Ok::<_, SweepError>(Judgement::from_prediction(
                &prediction,
                expected,
                confidence,
                self.confidence_threshold,
            ))
        });

        log::info!(
            "{} {}: failure {:?}, recovery {:?}",
            manifest.source,
            manifest.kind,
            result.failure_threshold,
            result.recovery_threshold
        );

        Ok(SequenceEvaluation {
            source: manifest.source,
            kind: manifest.kind,
            max_level: manifest.max_level,
            expected: expected.to_string(),
            result,
        })
    }
}

/// Every sequence manifest under a dataset root laid out as
/// `{root}/{kind}/{source}/manifest.json`, in path order.
pub fn find_manifests(root: &Path) -> Result<Vec<PathBuf>> {
    let mut manifests = Vec::new();
    for kind_dir in std::fs::read_dir(root)? {
        let kind_dir = kind_dir?.path();
        if !kind_dir.is_dir() {
            continue;
        }
        for source_dir in std::fs::read_dir(&kind_dir)? {
            let manifest = source_dir?.path().join(MANIFEST_FILE_NAME);
            if manifest.is_file() {
                manifests.push(manifest);
            }
        }
    }
    manifests.sort();
    Ok(manifests)
}

/// Aggregates over a group of evaluated sequences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KindSummary {
    pub sequences: usize,
    pub judged_variants: usize,
    pub success_rate: Option<f64>,
    pub mean_confidence: Option<f64>,
    pub never_degrades: usize,
    /// Distribution of resolved failure levels
    pub thresholds: Option<ThresholdStats>,
    /// Accuracy by `level / max_level`
    pub severity_bins: Vec<SeverityBin>,
}

impl KindSummary {
    pub fn from_evaluations<'a, I>(evaluations: I) -> Self
    where
        I: IntoIterator<Item = &'a SequenceEvaluation>,
    {
        let mut sequences = 0;
        let mut never_degrades = 0;
        let mut failure_levels = Vec::new();
        let mut observations = Vec::new();
        let mut confidences = Vec::new();

        for evaluation in evaluations {
            sequences += 1;
            if evaluation.result.failure_threshold == Threshold::NeverDegrades {
                never_degrades += 1;
            }
            if let Some(level) = evaluation.failure_level() {
                failure_levels.push(level as f64);
            }
            let max_level = evaluation.max_level.max(1) as f64;
            for outcome in &evaluation.result.outcomes {
                if let Some(judgement) = outcome.judgement {
                    observations.push((outcome.level as f64 / max_level, judgement.is_success()));
                    confidences.extend(judgement.confidence);
                }
            }
        }

        let successes = observations.iter().filter(|(_, ok)| *ok).count();
        Self {
            sequences,
            judged_variants: observations.len(),
            success_rate: (!observations.is_empty())
                .then(|| successes as f64 / observations.len() as f64),
            mean_confidence: (!confidences.is_empty())
                .then(|| confidences.iter().sum::<f64>() / confidences.len() as f64),
            never_degrades,
            thresholds: ThresholdStats::from_values(&failure_levels),
            severity_bins: severity_accuracy(&observations, DEFAULT_SEVERITY_BINS),
        }
    }
}

/// Per-kind and overall aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationSummary {
    pub per_kind: BTreeMap<DegradationKind, KindSummary>,
    pub overall: KindSummary,
}

impl EvaluationSummary {
    pub fn from_evaluations(evaluations: &[SequenceEvaluation]) -> Self {
        let mut grouped: BTreeMap<DegradationKind, Vec<&SequenceEvaluation>> = BTreeMap::new();
        for evaluation in evaluations {
            grouped.entry(evaluation.kind).or_default().push(evaluation);
        }
        Self {
            per_kind: grouped
                .into_iter()
                .map(|(kind, group)| (kind, KindSummary::from_evaluations(group)))
                .collect(),
            overall: KindSummary::from_evaluations(evaluations),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        write_json(self, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use degrade::boundary::LevelOutcome;

    fn evaluation(kind: DegradationKind, successes: &[(u32, bool)]) -> SequenceEvaluation {
        let outcomes = successes.iter().map(|&(level, ok)| LevelOutcome {
            level,
            judgement: Some(Judgement::from_prediction(
                if ok { "4" } else { "5" },
                "4",
                0.8,
                0.5,
            )),
        });
        SequenceEvaluation {
            source: "img".to_string(),
            kind,
            max_level: 100,
            expected: "4".to_string(),
            result: BoundaryAnalyzer::default().analyze_judgements(outcomes),
        }
    }

    #[test]
    fn test_summary_groups_by_kind() {
        let evaluations = vec![
            evaluation(DegradationKind::Blur, &[(0, true), (50, false), (100, false)]),
            evaluation(DegradationKind::Blur, &[(0, true), (50, true), (100, false)]),
            evaluation(DegradationKind::Contrast, &[(0, true), (50, true), (100, true)]),
        ];
        let summary = EvaluationSummary::from_evaluations(&evaluations);

        let blur = &summary.per_kind[&DegradationKind::Blur];
        assert_eq!(blur.sequences, 2);
        let stats = blur.thresholds.unwrap();
        assert_relative_eq!(stats.mean, 75.0);
        assert_relative_eq!(stats.min, 50.0);

        let contrast = &summary.per_kind[&DegradationKind::Contrast];
        assert_eq!(contrast.never_degrades, 1);
        assert_relative_eq!(contrast.thresholds.unwrap().mean, 100.0);
        assert_eq!(contrast.success_rate, Some(1.0));

        assert_eq!(summary.overall.sequences, 3);
        assert_eq!(summary.overall.judged_variants, 9);
        assert_relative_eq!(summary.overall.success_rate.unwrap(), 6.0 / 9.0);
        assert_relative_eq!(summary.overall.mean_confidence.unwrap(), 0.8);
        // Level 100 lands in the last severity bin
        assert_eq!(summary.overall.severity_bins[9].count, 3);
        assert_eq!(summary.overall.severity_bins[9].successes, 1);
    }

    #[test]
    fn test_summary_serializes_kinds_as_keys() {
        let summary = EvaluationSummary::from_evaluations(&[evaluation(
            DegradationKind::PoissonNoise,
            &[(0, true)],
        )]);
        let json = serde_json::to_value(&summary).unwrap();
        assert!(json["per_kind"]["poisson_noise"].is_object());
    }
}
