// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{AnalysisRunResult, ConfidenceTier, GadError};
use std::collections::BTreeMap;

/// Precision/recall/F1 summary for tolerance-based matching.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct F1Metrics {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

/// Scores of one analysis run against labelled anomaly indices.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct DetectionMetrics {
    /// Lowest tier counted as a detection.
    pub min_tier: ConfidenceTier,
    pub tolerance: usize,
    pub f1: F1Metrics,
    /// Mean distance from each detection to its nearest labelled index;
    /// `None` when either side is empty.
    pub mean_localization_error: Option<f64>,
    /// Fused anomalies per tier, regardless of `min_tier`.
    pub tier_counts: BTreeMap<ConfidenceTier, usize>,
    /// Labelled anomalies no detection was matched to.
    pub missed_labels: Vec<usize>,
}

/// Scores `result` against `truth` (strictly increasing indices).
///
/// Anomalies below `min_tier` are ignored; a detection matches a labelled
/// index within `tolerance` samples, one-to-one.
pub fn evaluate(
    result: &AnalysisRunResult,
    truth: &[usize],
    tolerance: usize,
    min_tier: ConfidenceTier,
) -> Result<DetectionMetrics, GadError> {
    let n = result.diagnostics.n;
    result.validate(n).map_err(|err| {
        GadError::invalid_config(format!("AnalysisRunResult is invalid: {err}"))
    })?;
    validate_truth(truth, n)?;

    let detected = detected_indices(result, min_tier);
    let f1 = f1_with_tolerance(&detected, truth, tolerance)?;
    let matched: Vec<usize> = match_labels(&detected, truth, tolerance)
        .into_iter()
        .map(|(_, label)| label)
        .collect();
    let missed_labels = truth
        .iter()
        .copied()
        .filter(|label| matched.binary_search(label).is_err())
        .collect();
    Ok(DetectionMetrics {
        min_tier,
        tolerance,
        f1,
        mean_localization_error: localization_error(&detected, truth),
        tier_counts: tier_counts(result),
        missed_labels,
    })
}

/// Sorted indices of anomalies at or above `min_tier`.
pub fn detected_indices(result: &AnalysisRunResult, min_tier: ConfidenceTier) -> Vec<usize> {
    let mut indices: Vec<usize> = result.at_least(min_tier).map(|a| a.index).collect();
    indices.sort_unstable();
    indices
}

/// Counts of fused anomalies per tier; every tier is present.
pub fn tier_counts(result: &AnalysisRunResult) -> BTreeMap<ConfidenceTier, usize> {
    let mut counts = BTreeMap::from([
        (ConfidenceTier::Low, 0),
        (ConfidenceTier::Medium, 0),
        (ConfidenceTier::High, 0),
    ]);
    for anomaly in &result.fused_anomalies {
        *counts.entry(anomaly.confidence_tier).or_default() += 1;
    }
    counts
}

/// Computes precision, recall, and F1 using one-to-one tolerance matching
/// over sorted index sets.
pub fn f1_with_tolerance(
    detected: &[usize],
    truth: &[usize],
    tolerance: usize,
) -> Result<F1Metrics, GadError> {
    require_strictly_increasing(detected, "detected")?;
    require_strictly_increasing(truth, "truth")?;

    let true_positives = match_labels(detected, truth, tolerance).len();
    let false_positives = detected.len() - true_positives;
    let false_negatives = truth.len() - true_positives;

    if detected.is_empty() && truth.is_empty() {
        return Ok(F1Metrics {
            true_positives,
            false_positives,
            false_negatives,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        });
    }

    let precision = ratio(true_positives, detected.len());
    let recall = ratio(true_positives, truth.len());
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };

    Ok(F1Metrics {
        true_positives,
        false_positives,
        false_negatives,
        precision,
        recall,
        f1,
    })
}

/// Mean absolute distance from each detection to the nearest labelled index.
pub fn localization_error(detected: &[usize], truth: &[usize]) -> Option<f64> {
    if detected.is_empty() || truth.is_empty() {
        return None;
    }
    let total = detected
        .iter()
        .map(|&hit| distance_to_nearest_label(hit, truth) as u128)
        .sum::<u128>();
    Some(total as f64 / detected.len() as f64)
}

/// Micro-averaged F1 over several evaluated runs.
pub fn pooled_f1(metrics: &[DetectionMetrics]) -> F1Metrics {
    let (tp, fp, fn_) = metrics.iter().fold((0, 0, 0), |(tp, fp, fn_), m| {
        (
            tp + m.f1.true_positives,
            fp + m.f1.false_positives,
            fn_ + m.f1.false_negatives,
        )
    });
    if tp + fp + fn_ == 0 {
        return F1Metrics {
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
            precision: 1.0,
            recall: 1.0,
            f1: 1.0,
        };
    }
    let precision = ratio(tp, tp + fp);
    let recall = ratio(tp, tp + fn_);
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    F1Metrics {
        true_positives: tp,
        false_positives: fp,
        false_negatives: fn_,
        precision,
        recall,
        f1,
    }
}

fn validate_truth(truth: &[usize], n: usize) -> Result<(), GadError> {
    require_strictly_increasing(truth, "truth")?;
    if let Some(last) = truth.last().copied().filter(|last| *last >= n) {
        return Err(GadError::invalid_config(format!(
            "truth index {last} is out of range for n={n}"
        )));
    }
    Ok(())
}

fn require_strictly_increasing(indices: &[usize], label: &str) -> Result<(), GadError> {
    if let Some(pos) = indices.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(GadError::invalid_config(format!(
            "{label} indices must be strictly increasing; got {} then {} at position {}",
            indices[pos],
            indices[pos + 1],
            pos + 1
        )));
    }
    Ok(())
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

/// Pairs each detection with the labelled anomaly it explains, as
/// `(detected, label)`. Both inputs are sorted; each label is used at most
/// once and a detection takes the earliest label within `tolerance`.
pub fn match_labels(
    detected: &[usize],
    truth: &[usize],
    tolerance: usize,
) -> Vec<(usize, usize)> {
    let mut pairs = Vec::new();
    let mut labels = truth.iter().copied().peekable();
    for &hit in detected {
        // Labels this far behind cannot be reached by any later detection.
        while labels
            .next_if(|&label| label.saturating_add(tolerance) < hit)
            .is_some()
        {}
        if let Some(label) = labels.next_if(|&label| label.abs_diff(hit) <= tolerance) {
            pairs.push((hit, label));
        }
    }
    pairs
}

fn distance_to_nearest_label(hit: usize, labels: &[usize]) -> usize {
    let after = labels.partition_point(|&label| label < hit);
    [after.checked_sub(1), Some(after)]
        .into_iter()
        .flatten()
        .filter_map(|pos| labels.get(pos))
        .map(|label| label.abs_diff(hit))
        .min()
        .unwrap_or(usize::MAX)
}

/// Evaluation utilities crate name helper.
pub fn crate_name() -> &'static str {
    "gad-eval"
}
