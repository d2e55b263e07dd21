// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Cross-detector stages of the glucose anomaly ensemble.
//!
//! [`Analyzer::run`] drives a signal through the detector bank, the
//! [`RelationshipAnalyzer`], the [`ContextScorer`], the
//! [`ConstraintEvaluator`] and finally the [`FusionEngine`], producing a
//! ranked [`gad_core::AnalysisRunResult`].

pub mod constraints;
pub mod context;
pub mod fusion;
pub mod pipeline;
pub mod relationship;

pub use constraints::{ConstraintEvaluator, ConstraintOutcome};
pub use context::ContextScorer;
pub use fusion::{FusionEngine, FusionOutcome};
pub use pipeline::{Analyzer, run};
pub use relationship::{RelationshipAnalyzer, RelationshipReport};

/// Fusion and pipeline namespace.
pub fn crate_name() -> &'static str {
    let _ = (gad_core::crate_name(), gad_detectors::crate_name());
    "gad-fusion"
}
