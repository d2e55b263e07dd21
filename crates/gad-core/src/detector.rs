// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{Candidate, DetectorStatus, GadError, MethodId, Signal};
use std::collections::BTreeMap;

/// Output of one detector pass.
#[derive(Clone, Debug, PartialEq)]
pub struct DetectorOutput {
    pub method: MethodId,
    /// Sorted by index, at most one candidate per index.
    pub candidates: Vec<Candidate>,
    pub status: DetectorStatus,
    pub notes: Vec<String>,
}

impl DetectorOutput {
    /// Builds a completed output from per-index scores.
    pub fn from_scores(method: MethodId, scores: BTreeMap<usize, f64>) -> Self {
        let candidates = scores
            .into_iter()
            .map(|(index, raw_score)| Candidate::new(index, method, raw_score))
            .collect();
        Self {
            method,
            candidates,
            status: DetectorStatus::Completed,
            notes: vec![],
        }
    }

    pub fn insufficient(method: MethodId, required: usize, actual: usize) -> Self {
        Self {
            method,
            candidates: vec![],
            status: DetectorStatus::InsufficientData { required, actual },
            notes: vec![],
        }
    }

    pub fn degenerate(method: MethodId, reason: impl Into<String>) -> Self {
        Self {
            method,
            candidates: vec![],
            status: DetectorStatus::Degenerate {
                reason: reason.into(),
            },
            notes: vec![],
        }
    }

    pub fn failed(method: MethodId, reason: impl Into<String>) -> Self {
        Self {
            method,
            candidates: vec![],
            status: DetectorStatus::Failed {
                reason: reason.into(),
            },
            notes: vec![],
        }
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }
}

/// Detector contract: full signal in, candidate set out.
///
/// Implementations are pure functions of the signal so the bank may run them
/// on any thread in any order.
pub trait Detector: Send + Sync {
    fn method(&self) -> MethodId;

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError>;
}

/// Keeps the larger score when an index is flagged by several sub-tests.
pub fn merge_max(scores: &mut BTreeMap<usize, f64>, index: usize, score: f64) {
    scores
        .entry(index)
        .and_modify(|existing| {
            if score > *existing {
                *existing = score;
            }
        })
        .or_insert(score);
}

#[cfg(test)]
mod tests {
    use super::{Detector, DetectorOutput, merge_max};
    use crate::{DetectorStatus, GadError, MethodId, Signal};
    use std::collections::BTreeMap;

    struct ThresholdDetector {
        threshold: f64,
    }

    impl Detector for ThresholdDetector {
        fn method(&self) -> MethodId {
            MethodId::Statistical
        }

        fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
            if signal.len() < 3 {
                return Ok(DetectorOutput::insufficient(self.method(), 3, signal.len()));
            }
            let mut scores = BTreeMap::new();
            for (idx, value) in signal.values().iter().enumerate() {
                if *value > self.threshold {
                    merge_max(&mut scores, idx, *value);
                }
            }
            Ok(DetectorOutput::from_scores(self.method(), scores))
        }
    }

    #[test]
    fn detector_trait_shape_sanity() {
        let detector = ThresholdDetector { threshold: 2.5 };
        let signal = Signal::from_values(vec![1.0, 3.0, 2.0, 4.0]).expect("valid signal");
        let output = detector.detect(&signal).expect("detect should succeed");
        assert_eq!(output.status, DetectorStatus::Completed);
        let indices: Vec<usize> = output.candidates.iter().map(|c| c.index).collect();
        assert_eq!(indices, vec![1, 3]);
        assert!(output.candidates.iter().all(|c| c.method == MethodId::Statistical));
    }

    #[test]
    fn short_signal_degrades_to_insufficient_data() {
        let detector = ThresholdDetector { threshold: 0.0 };
        let signal = Signal::from_values(vec![1.0, 2.0]).expect("valid signal");
        let output = detector.detect(&signal).expect("detect should not fail");
        assert!(output.candidates.is_empty());
        assert_eq!(
            output.status,
            DetectorStatus::InsufficientData {
                required: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn merge_max_keeps_largest_score() {
        let mut scores = BTreeMap::new();
        merge_max(&mut scores, 4, 1.0);
        merge_max(&mut scores, 4, 3.0);
        merge_max(&mut scores, 4, 2.0);
        assert_eq!(scores[&4], 3.0);
    }
}
