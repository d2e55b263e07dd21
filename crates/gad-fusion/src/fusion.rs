// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{
    ConfidenceTier, ConstraintAdjustedCandidate, FusedAnomaly, FusionConfig, GadError, MethodId,
    rank_order,
};
use std::collections::{BTreeMap, BTreeSet};

/// Result of one arbitration pass.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FusionOutcome {
    pub anomalies: Vec<FusedAnomaly>,
    /// Contributions discarded because no other method agreed.
    pub uncorroborated: usize,
    /// Indices whose support was too weak for any tier.
    pub discarded: usize,
}

/// Arbitrates adjusted candidates into ranked, tiered anomalies.
///
/// The pass runs in three phases: collect groups contributions by index,
/// resolve applies the corroboration rule and sums scores, and emit assigns
/// tiers and sorts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FusionEngine {
    config: FusionConfig,
}

impl FusionEngine {
    pub fn new(config: FusionConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn fuse(&self, candidates: &[ConstraintAdjustedCandidate]) -> FusionOutcome {
        let grouped = collect(candidates);
        let mut outcome = FusionOutcome::default();
        for (index, contributions) in grouped {
            let (resolved, dropped) = self.resolve(&contributions);
            outcome.uncorroborated += dropped;
            let Some((total_score, supporting_methods)) = resolved else {
                outcome.discarded += 1;
                continue;
            };
            match self.tier(supporting_methods.len(), total_score) {
                Some(confidence_tier) => outcome.anomalies.push(FusedAnomaly {
                    index,
                    total_score,
                    supporting_methods,
                    confidence_tier,
                }),
                None => outcome.discarded += 1,
            }
        }
        outcome.anomalies.sort_by(rank_order);
        outcome
    }

    /// Sums the surviving contributions at one index; returns the number of
    /// contributions dropped for lack of corroboration.
    fn resolve(
        &self,
        contributions: &[ConstraintAdjustedCandidate],
    ) -> (Option<(f64, BTreeSet<MethodId>)>, usize) {
        let methods: BTreeSet<MethodId> = contributions.iter().map(|c| c.method()).collect();
        let mut total = 0.0;
        let mut supporting = BTreeSet::new();
        let mut dropped = 0;
        for contribution in contributions {
            let method = contribution.method();
            if self.config.requires_corroboration(method) {
                if !methods.iter().any(|other| *other != method) {
                    dropped += 1;
                    continue;
                }
                total += contribution.adjusted_score * self.config.corroboration_bonus;
            } else {
                total += contribution.adjusted_score;
            }
            supporting.insert(method);
        }
        if supporting.is_empty() {
            (None, dropped)
        } else {
            (Some((total, supporting)), dropped)
        }
    }

    fn tier(&self, methods: usize, total_score: f64) -> Option<ConfidenceTier> {
        if methods >= self.config.high_min_methods {
            Some(ConfidenceTier::High)
        } else if methods >= self.config.medium_min_methods {
            Some(ConfidenceTier::Medium)
        } else if total_score > self.config.low_min_score {
            Some(ConfidenceTier::Low)
        } else {
            None
        }
    }
}

fn collect(
    candidates: &[ConstraintAdjustedCandidate],
) -> BTreeMap<usize, Vec<ConstraintAdjustedCandidate>> {
    let mut grouped: BTreeMap<usize, Vec<ConstraintAdjustedCandidate>> = BTreeMap::new();
    for candidate in candidates {
        grouped.entry(candidate.index()).or_default().push(*candidate);
    }
    grouped
}
