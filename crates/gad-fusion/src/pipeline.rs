// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::constraints::ConstraintEvaluator;
use crate::context::ContextScorer;
use crate::fusion::FusionEngine;
use crate::relationship::RelationshipAnalyzer;
use gad_core::{
    AnalysisConfig, AnalysisContext, AnalysisRunResult, CandidateSets, DetectorOutput,
    DetectorReport, DetectorStatus, GadError, Relation, RunDiagnostics, Signal,
};
use gad_detectors::DetectorBank;
use tracing::{debug, info, info_span};

/// Reusable analysis engine: detector bank, relationship analysis, context
/// scoring, constraint rules and fusion wired from one [`AnalysisConfig`].
///
/// Runs are deterministic and share no state, so one `Analyzer` may serve
/// many signals, including from several threads.
#[derive(Debug)]
pub struct Analyzer {
    config: AnalysisConfig,
    bank: DetectorBank,
    relationships: RelationshipAnalyzer,
    context: ContextScorer,
    constraints: ConstraintEvaluator,
    fusion: FusionEngine,
}

impl Analyzer {
    pub fn new(config: AnalysisConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self {
            bank: DetectorBank::from_config(&config)?,
            relationships: RelationshipAnalyzer::new(config.relationships.clone())?,
            context: ContextScorer::new(config.context.clone(), &config.physiological)?,
            constraints: ConstraintEvaluator::new(
                config.constraints.clone(),
                config.weights.clone(),
                config.physiological.clone(),
                config.context.clone(),
            )?,
            fusion: FusionEngine::new(config.fusion.clone())?,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn relationships(&self) -> &RelationshipAnalyzer {
        &self.relationships
    }

    /// Runs only the detector bank, returning per-method candidate sets
    /// alongside the raw detector outputs.
    pub fn detect(
        &self,
        signal: &Signal,
    ) -> Result<(CandidateSets, Vec<DetectorOutput>), GadError> {
        let outputs = self.bank.detect_all(signal)?;
        let mut sets = CandidateSets::new();
        for output in &outputs {
            sets.insert(output.method, output.candidates.clone());
        }
        Ok((sets, outputs))
    }

    /// Full analysis of one signal.
    pub fn run(
        &self,
        signal: &Signal,
        context: Option<&AnalysisContext>,
    ) -> Result<AnalysisRunResult, GadError> {
        if let Some(ctx) = context {
            ctx.validate(signal)?;
        }
        let span = info_span!("analysis_run", n = signal.len());
        let _guard = span.enter();

        let (sets, outputs) = self.detect(signal)?;
        let report = self.relationships.analyze(&sets);

        let context_scores =
            self.context
                .score_all(signal, sets.iter().map(|candidate| candidate.index), context);
        let adjusted = self.constraints.adjust_all(sets.iter(), signal, context, |index| {
            context_scores.get(&index).copied().unwrap_or(1.0)
        });
        let fused = self.fusion.fuse(&adjusted.kept);

        let mut diagnostics = RunDiagnostics {
            n: signal.len(),
            has_timestamps: signal.has_timestamps(),
            candidates_considered: sets.total(),
            candidates_below_floor: adjusted.below_floor,
            candidates_uncorroborated: fused.uncorroborated,
            ..RunDiagnostics::default()
        };
        for output in &outputs {
            if let DetectorStatus::Failed { reason } = &output.status {
                diagnostics
                    .warnings
                    .push(format!("{} detector failed: {reason}", output.method));
            }
            diagnostics.detectors.push(DetectorReport {
                method: output.method,
                status: output.status.clone(),
                candidates: output.candidates.len(),
                notes: output.notes.clone(),
            });
        }
        for edge in report.edges.iter().filter(|e| e.relation == Relation::Conflict) {
            diagnostics.notes.push(format!(
                "{} and {} are expected to agree but overlap {:.2} ({} vs {} candidates)",
                edge.method_a, edge.method_b, edge.overlap_ratio, edge.size_a, edge.size_b
            ));
        }
        if fused.discarded > 0 {
            debug!(discarded = fused.discarded, "indices below every confidence tier");
        }

        info!(
            candidates = diagnostics.candidates_considered,
            below_floor = diagnostics.candidates_below_floor,
            uncorroborated = diagnostics.candidates_uncorroborated,
            fused = fused.anomalies.len(),
            "analysis run complete"
        );

        Ok(AnalysisRunResult {
            fused_anomalies: fused.anomalies,
            relationship_report: report.edges,
            per_method_counts: sets.counts(),
            influence: report.influence,
            diagnostics,
        })
    }
}

/// Analyzes `signal` with a one-off [`Analyzer`] built from `config`.
pub fn run(
    signal: &Signal,
    context: Option<&AnalysisContext>,
    config: &AnalysisConfig,
) -> Result<AnalysisRunResult, GadError> {
    Analyzer::new(config.clone())?.run(signal, context)
}
