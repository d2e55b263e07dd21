// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{GadError, MethodId, RunDiagnostics};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Coarse confidence bucket of a fused anomaly; ordered `Low < Medium < High`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfidenceTier {
    Low,
    Medium,
    High,
}

impl ConfidenceTier {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConfidenceTier {
    type Err = GadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(GadError::invalid_config(format!(
                "unknown confidence tier '{s}'; expected one of low, medium, high"
            ))),
        }
    }
}

/// Ranked ensemble output for one signal index.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct FusedAnomaly {
    pub index: usize,
    pub total_score: f64,
    pub supporting_methods: BTreeSet<MethodId>,
    pub confidence_tier: ConfidenceTier,
}

/// Relationship class between two detectors.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Relation {
    Conflict,
    Support,
    Independent,
}

/// Pairwise comparison of two detectors' candidate sets over one signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipEdge {
    pub method_a: MethodId,
    pub method_b: MethodId,
    /// `|A ∩ B| / min(|A|, |B|)`.
    pub overlap_ratio: f64,
    pub relation: Relation,
    pub size_a: usize,
    pub size_b: usize,
    pub intersection: usize,
}

/// Fraction of `source`'s candidates that `target` also flagged.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct InfluenceEntry {
    pub source: MethodId,
    pub target: MethodId,
    pub fraction: f64,
}

/// Everything one analysis run hands to external collaborators.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisRunResult {
    pub fused_anomalies: Vec<FusedAnomaly>,
    pub relationship_report: Vec<RelationshipEdge>,
    pub per_method_counts: BTreeMap<MethodId, usize>,
    pub influence: Vec<InfluenceEntry>,
    pub diagnostics: RunDiagnostics,
}

impl AnalysisRunResult {
    /// Anomalies at or above `tier`, preserving rank order.
    pub fn at_least(&self, tier: ConfidenceTier) -> impl Iterator<Item = &FusedAnomaly> + '_ {
        self.fused_anomalies
            .iter()
            .filter(move |anomaly| anomaly.confidence_tier >= tier)
    }

    pub fn anomaly_at(&self, index: usize) -> Option<&FusedAnomaly> {
        self.fused_anomalies.iter().find(|a| a.index == index)
    }

    /// Checks the output invariants: in-range indices, non-empty support,
    /// unique indices, and rank order with its tie-break.
    pub fn validate(&self, n: usize) -> Result<(), GadError> {
        let mut seen = BTreeSet::new();
        for anomaly in &self.fused_anomalies {
            if anomaly.index >= n {
                return Err(GadError::numerical_issue(format!(
                    "fused anomaly index {} out of range for n={n}",
                    anomaly.index
                )));
            }
            if anomaly.supporting_methods.is_empty() {
                return Err(GadError::numerical_issue(format!(
                    "fused anomaly at index {} has no supporting methods",
                    anomaly.index
                )));
            }
            if !seen.insert(anomaly.index) {
                return Err(GadError::numerical_issue(format!(
                    "duplicate fused anomaly index {}",
                    anomaly.index
                )));
            }
        }

        for (pos, pair) in self.fused_anomalies.windows(2).enumerate() {
            if rank_order(&pair[0], &pair[1]) == std::cmp::Ordering::Greater {
                return Err(GadError::numerical_issue(format!(
                    "fused anomalies out of rank order at positions {pos} and {}",
                    pos + 1
                )));
            }
        }
        Ok(())
    }
}

/// Rank order of fused anomalies: total score descending, then more
/// supporting methods, then earlier index.
pub fn rank_order(a: &FusedAnomaly, b: &FusedAnomaly) -> std::cmp::Ordering {
    b.total_score
        .total_cmp(&a.total_score)
        .then_with(|| b.supporting_methods.len().cmp(&a.supporting_methods.len()))
        .then_with(|| a.index.cmp(&b.index))
}

#[cfg(test)]
mod tests {
    use super::{AnalysisRunResult, ConfidenceTier, FusedAnomaly, rank_order};
    use crate::{MethodId, RunDiagnostics};
    use std::cmp::Ordering;
    use std::collections::{BTreeMap, BTreeSet};

    fn anomaly(index: usize, score: f64, methods: &[MethodId]) -> FusedAnomaly {
        FusedAnomaly {
            index,
            total_score: score,
            supporting_methods: methods.iter().copied().collect::<BTreeSet<_>>(),
            confidence_tier: ConfidenceTier::Low,
        }
    }

    fn result(anomalies: Vec<FusedAnomaly>) -> AnalysisRunResult {
        AnalysisRunResult {
            fused_anomalies: anomalies,
            relationship_report: vec![],
            per_method_counts: BTreeMap::new(),
            influence: vec![],
            diagnostics: RunDiagnostics::default(),
        }
    }

    #[test]
    fn tiers_are_ordered_low_to_high() {
        assert!(ConfidenceTier::Low < ConfidenceTier::Medium);
        assert!(ConfidenceTier::Medium < ConfidenceTier::High);
        assert_eq!(ConfidenceTier::High.to_string(), "high");
        assert_eq!(" Medium".parse::<ConfidenceTier>(), Ok(ConfidenceTier::Medium));
        let err = "urgent".parse::<ConfidenceTier>().expect_err("unknown tier");
        assert!(err.to_string().contains("unknown confidence tier"));
    }

    #[test]
    fn rank_order_breaks_ties_by_support_then_index() {
        let a = anomaly(10, 2.0, &[MethodId::Statistical]);
        let b = anomaly(5, 2.0, &[MethodId::Statistical, MethodId::Temporal]);
        let c = anomaly(3, 2.0, &[MethodId::Pattern]);
        let d = anomaly(20, 3.0, &[MethodId::Pattern]);

        assert_eq!(rank_order(&d, &a), Ordering::Less);
        assert_eq!(rank_order(&b, &a), Ordering::Less);
        assert_eq!(rank_order(&c, &a), Ordering::Less);
        assert_eq!(rank_order(&a, &a), Ordering::Equal);
    }

    #[test]
    fn validate_rejects_out_of_range_and_misordered_output() {
        let ok = result(vec![
            anomaly(1, 3.0, &[MethodId::Pattern]),
            anomaly(0, 1.0, &[MethodId::Pattern]),
        ]);
        ok.validate(2).expect("valid output");

        let err = ok.validate(1).expect_err("index 1 is out of range for n=1");
        assert!(err.to_string().contains("out of range"));

        let misordered = result(vec![
            anomaly(0, 1.0, &[MethodId::Pattern]),
            anomaly(1, 3.0, &[MethodId::Pattern]),
        ]);
        let err = misordered.validate(2).expect_err("misordered must fail");
        assert!(err.to_string().contains("rank order"));

        let empty_support = result(vec![anomaly(0, 1.0, &[])]);
        let err = empty_support.validate(1).expect_err("empty support must fail");
        assert!(err.to_string().contains("no supporting methods"));
    }

    #[test]
    fn at_least_filters_by_tier() {
        let mut high = anomaly(4, 5.0, &[MethodId::Pattern]);
        high.confidence_tier = ConfidenceTier::High;
        let low = anomaly(2, 1.0, &[MethodId::Pattern]);
        let output = result(vec![high, low]);

        let indices: Vec<usize> = output
            .at_least(ConfidenceTier::Medium)
            .map(|a| a.index)
            .collect();
        assert_eq!(indices, vec![4]);
        assert_eq!(output.anomaly_at(2).map(|a| a.index), Some(2));
        assert!(output.anomaly_at(3).is_none());
    }
}
