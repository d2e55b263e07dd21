// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Core shared types and traits for the glucose anomaly ensemble.

pub mod candidate;
pub mod config;
pub mod context;
pub mod detector;
pub mod diagnostics;
pub mod error;
pub mod method;
pub mod results;
pub mod signal;

pub use candidate::{Candidate, CandidateSets, ConstraintAdjustedCandidate};
pub use config::{
    AnalysisConfig, ConstraintConfig, ConstraintRule, ContextConfig, DensityConfig, Expectation,
    FrequencyConfig, FusionConfig, MethodPairRule, MethodWeights, PairExpectation, PatternConfig,
    PhysiologicalConfig, RelationshipConfig, RuleCondition, StatisticalConfig, TemporalConfig,
    TimeWindow, default_constraint_rules, default_pair_rules, default_time_windows,
};
pub use context::AnalysisContext;
pub use detector::{Detector, DetectorOutput, merge_max};
pub use diagnostics::{DIAGNOSTICS_SCHEMA_VERSION, DetectorReport, DetectorStatus, RunDiagnostics};
pub use error::GadError;
pub use method::MethodId;
pub use results::{
    AnalysisRunResult, ConfidenceTier, FusedAnomaly, InfluenceEntry, Relation, RelationshipEdge,
    rank_order,
};
pub use signal::{Sample, Signal, TimeIndex};

/// Core shared types and traits for gad-rs.
pub fn crate_name() -> &'static str {
    "gad-core"
}
