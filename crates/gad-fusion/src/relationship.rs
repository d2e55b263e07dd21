// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{
    CandidateSets, GadError, InfluenceEntry, MethodId, MethodWeights, PairExpectation, Relation,
    RelationshipConfig, RelationshipEdge,
};
use std::collections::{BTreeMap, BTreeSet};

/// Pairwise agreement structure of one or more detector-bank passes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationshipReport {
    pub edges: Vec<RelationshipEdge>,
    pub influence: Vec<InfluenceEntry>,
}

impl RelationshipReport {
    pub fn edge(&self, a: MethodId, b: MethodId) -> Option<&RelationshipEdge> {
        self.edges.iter().find(|edge| {
            (edge.method_a == a && edge.method_b == b) || (edge.method_a == b && edge.method_b == a)
        })
    }

    pub fn conflicts(&self) -> impl Iterator<Item = &RelationshipEdge> + '_ {
        self.edges
            .iter()
            .filter(|edge| edge.relation == Relation::Conflict)
    }
}

/// Set sizes and pairwise intersections pooled over runs.
#[derive(Default)]
struct OverlapCounts {
    sizes: BTreeMap<MethodId, usize>,
    intersections: BTreeMap<(MethodId, MethodId), usize>,
}

impl OverlapCounts {
    fn add(&mut self, sets: &CandidateSets) {
        let index_sets: Vec<(MethodId, BTreeSet<usize>)> = sets
            .methods()
            .map(|method| (method, sets.index_set(method)))
            .collect();
        for (method, indices) in &index_sets {
            *self.sizes.entry(*method).or_default() += indices.len();
        }
        for (i, (a, set_a)) in index_sets.iter().enumerate() {
            for (b, set_b) in &index_sets[i + 1..] {
                *self.intersections.entry((*a, *b)).or_default() +=
                    set_a.intersection(set_b).count();
            }
        }
    }

    fn intersection(&self, a: MethodId, b: MethodId) -> usize {
        let key = if a <= b { (a, b) } else { (b, a) };
        self.intersections.get(&key).copied().unwrap_or(0)
    }
}

/// Classifies method pairs as supporting, conflicting or independent, and
/// measures directed influence. Never vetoes a candidate.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RelationshipAnalyzer {
    config: RelationshipConfig,
}

impl RelationshipAnalyzer {
    pub fn new(config: RelationshipConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RelationshipConfig {
        &self.config
    }

    /// Relationship report for a single run.
    pub fn analyze(&self, sets: &CandidateSets) -> RelationshipReport {
        let mut counts = OverlapCounts::default();
        counts.add(sets);
        self.report(&counts)
    }

    /// Relationship report with intersections and set sizes pooled over many
    /// runs.
    pub fn analyze_runs(&self, runs: &[CandidateSets]) -> RelationshipReport {
        let mut counts = OverlapCounts::default();
        for sets in runs {
            counts.add(sets);
        }
        self.report(&counts)
    }

    fn report(&self, counts: &OverlapCounts) -> RelationshipReport {
        let methods: Vec<MethodId> = counts.sizes.keys().copied().collect();
        let mut edges = vec![];
        for (i, a) in methods.iter().enumerate() {
            for b in &methods[i + 1..] {
                let (size_a, size_b) = (counts.sizes[a], counts.sizes[b]);
                if size_a == 0 || size_b == 0 {
                    continue;
                }
                let intersection = counts.intersection(*a, *b);
                let overlap_ratio = intersection as f64 / size_a.min(size_b) as f64;
                edges.push(RelationshipEdge {
                    method_a: *a,
                    method_b: *b,
                    overlap_ratio,
                    relation: self.classify(*a, *b, overlap_ratio, size_a.max(size_b)),
                    size_a,
                    size_b,
                    intersection,
                });
            }
        }

        let mut influence = vec![];
        for source in &methods {
            let size = counts.sizes[source];
            if size == 0 {
                continue;
            }
            for target in methods.iter().filter(|target| *target != source) {
                influence.push(InfluenceEntry {
                    source: *source,
                    target: *target,
                    fraction: counts.intersection(*source, *target) as f64 / size as f64,
                });
            }
        }
        RelationshipReport { edges, influence }
    }

    fn classify(&self, a: MethodId, b: MethodId, overlap: f64, larger: usize) -> Relation {
        if overlap >= self.config.support_overlap {
            Relation::Support
        } else if self.config.expectation(a, b) == PairExpectation::Agree
            && overlap <= self.config.conflict_overlap
            && larger >= self.config.conflict_min_size
        {
            Relation::Conflict
        } else {
            Relation::Independent
        }
    }

    /// Nudges each method's weight up per supporting edge and down per
    /// conflicting edge, clamped to the configured range.
    pub fn calibrate_weights(
        &self,
        edges: &[RelationshipEdge],
        weights: &MethodWeights,
    ) -> MethodWeights {
        let mut steps: BTreeMap<MethodId, i64> = BTreeMap::new();
        for edge in edges {
            let delta = match edge.relation {
                Relation::Support => 1,
                Relation::Conflict => -1,
                Relation::Independent => 0,
            };
            *steps.entry(edge.method_a).or_default() += delta;
            *steps.entry(edge.method_b).or_default() += delta;
        }

        let mut calibrated = weights.clone();
        for method in MethodId::ALL {
            let step = steps.get(&method).copied().unwrap_or(0);
            if step == 0 {
                continue;
            }
            let adjusted = weights.get(method) + step as f64 * self.config.weight_step;
            calibrated.set(
                method,
                adjusted.clamp(self.config.min_weight, self.config.max_weight),
            );
        }
        calibrated
    }
}
