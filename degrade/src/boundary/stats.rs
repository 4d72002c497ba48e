//! Aggregate statistics over many boundary analyses.

use serde::{Deserialize, Serialize};

/// Default number of severity bins over `[0, 1]`.
pub const DEFAULT_SEVERITY_BINS: usize = 10;

/// Distribution of failure thresholds across images.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdStats {
    pub count: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl ThresholdStats {
    /// Summarize a set of thresholds. Returns `None` for an empty set.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let count = values.len();
        let mean = values.iter().sum::<f64>() / count as f64;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let median = if count % 2 == 1 {
            sorted[count / 2]
        } else {
            (sorted[count / 2 - 1] + sorted[count / 2]) / 2.0
        };

        Some(Self {
            count,
            mean,
            std: variance.sqrt(),
            median,
            min: sorted[0],
            max: sorted[count - 1],
        })
    }
}

/// Accuracy within one severity interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub successes: usize,
    /// `None` when no observation falls in the bin
    pub accuracy: Option<f64>,
}

/// Bucket `(severity, success)` observations into `bins` equal intervals of
/// `[0, 1]`. Severity 1.0 lands in the last bin; out-of-range severities are
/// clamped.
pub fn severity_accuracy(observations: &[(f64, bool)], bins: usize) -> Vec<SeverityBin> {
    let bins = bins.max(1);
    let mut counts = vec![(0usize, 0usize); bins];
    for &(severity, success) in observations {
        if severity.is_nan() {
            continue;
        }
        let index = ((severity.clamp(0.0, 1.0) * bins as f64) as usize).min(bins - 1);
        counts[index].0 += 1;
        if success {
            counts[index].1 += 1;
        }
    }

    counts
        .into_iter()
        .enumerate()
        .map(|(i, (count, successes))| SeverityBin {
            lower: i as f64 / bins as f64,
            upper: (i + 1) as f64 / bins as f64,
            count,
            successes,
            accuracy: (count > 0).then(|| successes as f64 / count as f64),
        })
        .collect()
}
