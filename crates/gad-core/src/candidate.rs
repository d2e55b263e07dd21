// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::MethodId;
use std::collections::{BTreeMap, BTreeSet};

/// A single detector's opinion that one signal index is anomalous.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    pub index: usize,
    pub method: MethodId,
    pub raw_score: f64,
}

impl Candidate {
    pub fn new(index: usize, method: MethodId, raw_score: f64) -> Self {
        Self {
            index,
            method,
            raw_score,
        }
    }
}

/// Candidate plus the multipliers applied before fusion.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ConstraintAdjustedCandidate {
    pub candidate: Candidate,
    pub context_multiplier: f64,
    pub constraint_multiplier: f64,
    pub method_weight: f64,
    pub adjusted_score: f64,
}

impl ConstraintAdjustedCandidate {
    /// Computes `raw_score * context * constraint * weight`.
    pub fn new(
        candidate: Candidate,
        context_multiplier: f64,
        constraint_multiplier: f64,
        method_weight: f64,
    ) -> Self {
        let adjusted_score =
            candidate.raw_score * context_multiplier * constraint_multiplier * method_weight;
        Self {
            candidate,
            context_multiplier,
            constraint_multiplier,
            method_weight,
            adjusted_score,
        }
    }

    pub fn index(&self) -> usize {
        self.candidate.index
    }

    pub fn method(&self) -> MethodId {
        self.candidate.method
    }
}

/// Per-method candidate sets from one detector-bank pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateSets {
    by_method: BTreeMap<MethodId, Vec<Candidate>>,
}

impl CandidateSets {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the output of one method, replacing any earlier entry.
    pub fn insert(&mut self, method: MethodId, candidates: Vec<Candidate>) {
        self.by_method.insert(method, candidates);
    }

    /// Methods that ran, in canonical order (including ones with no output).
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.by_method.keys().copied()
    }

    pub fn get(&self, method: MethodId) -> &[Candidate] {
        self.by_method.get(&method).map_or(&[], Vec::as_slice)
    }

    /// Distinct indices flagged by `method`.
    pub fn index_set(&self, method: MethodId) -> BTreeSet<usize> {
        self.get(method).iter().map(|c| c.index).collect()
    }

    /// Number of candidates per method that ran.
    pub fn counts(&self) -> BTreeMap<MethodId, usize> {
        self.by_method
            .iter()
            .map(|(method, candidates)| (*method, candidates.len()))
            .collect()
    }

    pub fn total(&self) -> usize {
        self.by_method.values().map(Vec::len).sum()
    }

    /// All candidates, ordered by method and then by detector output order.
    pub fn iter(&self) -> impl Iterator<Item = &Candidate> + '_ {
        self.by_method.values().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::{Candidate, CandidateSets, ConstraintAdjustedCandidate};
    use crate::MethodId;

    #[test]
    fn adjusted_score_is_product_of_factors() {
        let adjusted = ConstraintAdjustedCandidate::new(
            Candidate::new(4, MethodId::Statistical, 2.0),
            1.2,
            0.5,
            0.9,
        );
        assert!((adjusted.adjusted_score - 1.08).abs() < 1e-12);
        assert_eq!(adjusted.index(), 4);
        assert_eq!(adjusted.method(), MethodId::Statistical);
    }

    #[test]
    fn candidate_sets_report_counts_and_indices() {
        let mut sets = CandidateSets::new();
        sets.insert(
            MethodId::Temporal,
            vec![
                Candidate::new(3, MethodId::Temporal, 1.0),
                Candidate::new(9, MethodId::Temporal, 2.0),
            ],
        );
        sets.insert(MethodId::Pattern, vec![]);

        assert_eq!(
            sets.methods().collect::<Vec<_>>(),
            vec![MethodId::Pattern, MethodId::Temporal]
        );
        assert_eq!(sets.counts()[&MethodId::Pattern], 0);
        assert_eq!(sets.counts()[&MethodId::Temporal], 2);
        assert_eq!(sets.total(), 2);
        assert!(sets.get(MethodId::Density).is_empty());
        assert_eq!(
            sets.index_set(MethodId::Temporal).into_iter().collect::<Vec<_>>(),
            vec![3, 9]
        );
    }
}
