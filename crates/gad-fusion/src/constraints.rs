// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{
    AnalysisContext, Candidate, ConstraintAdjustedCandidate, ConstraintConfig, ConstraintRule,
    ContextConfig, Expectation, GadError, MethodWeights, PhysiologicalConfig, RuleCondition,
    Signal,
};

/// Applies the declarative rule table and the static method weights to raw
/// candidate scores.
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintEvaluator {
    config: ConstraintConfig,
    weights: MethodWeights,
    physiological: PhysiologicalConfig,
    context: ContextConfig,
}

impl Default for ConstraintEvaluator {
    fn default() -> Self {
        Self {
            config: ConstraintConfig::default(),
            weights: MethodWeights::default(),
            physiological: PhysiologicalConfig::default(),
            context: ContextConfig::default(),
        }
    }
}

/// Adjusted candidates that cleared the floor, plus how many did not.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConstraintOutcome {
    pub kept: Vec<ConstraintAdjustedCandidate>,
    pub below_floor: usize,
}

impl ConstraintEvaluator {
    pub fn new(
        config: ConstraintConfig,
        weights: MethodWeights,
        physiological: PhysiologicalConfig,
        context: ContextConfig,
    ) -> Result<Self, GadError> {
        config.validate()?;
        weights.validate()?;
        Ok(Self {
            config,
            weights,
            physiological,
            context,
        })
    }

    pub fn weights(&self) -> &MethodWeights {
        &self.weights
    }

    /// Product of the multipliers of every rule matching `candidate`.
    pub fn rule_multiplier(
        &self,
        candidate: &Candidate,
        signal: &Signal,
        context: Option<&AnalysisContext>,
    ) -> f64 {
        self.config
            .rules
            .iter()
            .filter(|rule| self.rule_applies(rule, candidate, signal, context))
            .map(|rule| rule.multiplier)
            .product()
    }

    pub fn adjust(
        &self,
        candidate: Candidate,
        signal: &Signal,
        context: Option<&AnalysisContext>,
        context_multiplier: f64,
    ) -> ConstraintAdjustedCandidate {
        ConstraintAdjustedCandidate::new(
            candidate,
            context_multiplier,
            self.rule_multiplier(&candidate, signal, context),
            self.weights.get(candidate.method),
        )
    }

    /// Whether an adjusted candidate survives into fusion.
    pub fn passes(&self, adjusted: &ConstraintAdjustedCandidate) -> bool {
        adjusted.adjusted_score >= self.config.min_score
    }

    /// Adjusts every candidate and drops those under `min_score`.
    /// `context_multiplier` maps an index to its context score.
    pub fn adjust_all<'a>(
        &self,
        candidates: impl IntoIterator<Item = &'a Candidate>,
        signal: &Signal,
        context: Option<&AnalysisContext>,
        context_multiplier: impl Fn(usize) -> f64,
    ) -> ConstraintOutcome {
        let mut outcome = ConstraintOutcome::default();
        for candidate in candidates {
            let adjusted = self.adjust(
                *candidate,
                signal,
                context,
                context_multiplier(candidate.index),
            );
            if self.passes(&adjusted) {
                outcome.kept.push(adjusted);
            } else {
                outcome.below_floor += 1;
            }
        }
        outcome
    }

    fn rule_applies(
        &self,
        rule: &ConstraintRule,
        candidate: &Candidate,
        signal: &Signal,
        context: Option<&AnalysisContext>,
    ) -> bool {
        if rule.method != candidate.method {
            return false;
        }
        match rule.condition {
            RuleCondition::Always => true,
            RuleCondition::InsideNormalBand => signal
                .values()
                .get(candidate.index)
                .is_some_and(|value| self.physiological.in_normal_band(*value)),
            RuleCondition::DuringStableWindow => context
                .and_then(|ctx| ctx.hour_of_day(signal, candidate.index))
                .and_then(|hour| self.context.window_at(hour))
                .is_some_and(|window| window.expectation == Expectation::Stable),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ConstraintEvaluator;
    use gad_core::{
        AnalysisContext, Candidate, ConstraintConfig, ConstraintRule, ContextConfig, MethodId,
        MethodWeights, PhysiologicalConfig, RuleCondition, Signal,
    };

    fn assert_close(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn construction_validates_weights() {
        let mut weights = MethodWeights::default();
        weights.set(MethodId::Pattern, 0.35);
        let ok = ConstraintEvaluator::new(
            ConstraintConfig::default(),
            weights.clone(),
            PhysiologicalConfig::default(),
            ContextConfig::default(),
        )
        .expect("positive weights are valid");
        assert_eq!(ok.weights(), &weights);
        assert_eq!(ok.weights().get(MethodId::Pattern), 0.35);

        weights.set(MethodId::Density, 0.0);
        let err = ConstraintEvaluator::new(
            ConstraintConfig::default(),
            weights,
            PhysiologicalConfig::default(),
            ContextConfig::default(),
        )
        .expect_err("zero weight must fail");
        assert!(err.to_string().contains("MethodWeights[density]"));
    }

    #[test]
    fn statistical_flags_inside_normal_band_are_halved() {
        let evaluator = ConstraintEvaluator::default();
        let signal = Signal::from_values(vec![120.0, 300.0]).expect("valid");
        let in_band = evaluator.adjust(
            Candidate::new(0, MethodId::Statistical, 3.0),
            &signal,
            None,
            1.0,
        );
        assert_close(in_band.constraint_multiplier, 0.5);
        assert_close(in_band.adjusted_score, 1.5);

        let out_of_band = evaluator.adjust(
            Candidate::new(1, MethodId::Statistical, 3.0),
            &signal,
            None,
            1.2,
        );
        assert_close(out_of_band.constraint_multiplier, 1.0);
        assert_close(out_of_band.adjusted_score, 3.6);
    }

    #[test]
    fn pattern_rule_needs_a_stable_window() {
        let evaluator = ConstraintEvaluator::default();
        let signal = Signal::from_values(vec![100.0, 100.0]).expect("valid");
        let candidate = Candidate::new(1, MethodId::Pattern, 1.0);

        let night = AnalysisContext::default().with_hours(vec![2.0, 2.0]);
        assert_close(evaluator.rule_multiplier(&candidate, &signal, Some(&night)), 0.6);

        let lunch = AnalysisContext::default().with_hours(vec![13.0, 13.0]);
        assert_close(evaluator.rule_multiplier(&candidate, &signal, Some(&lunch)), 1.0);
        assert_close(evaluator.rule_multiplier(&candidate, &signal, None), 1.0);
    }

    #[test]
    fn matching_rules_multiply_and_weights_apply() {
        let evaluator = ConstraintEvaluator::new(
            ConstraintConfig {
                rules: vec![
                    ConstraintRule::new(MethodId::Physiological, RuleCondition::Always, 1.5),
                    ConstraintRule::new(MethodId::Physiological, RuleCondition::Always, 2.0),
                    ConstraintRule::new(MethodId::Temporal, RuleCondition::Always, 9.0),
                ],
                ..ConstraintConfig::default()
            },
            MethodWeights::default(),
            PhysiologicalConfig::default(),
            ContextConfig::default(),
        )
        .expect("valid config");
        let signal = Signal::from_values(vec![10.0]).expect("valid");
        let adjusted = evaluator.adjust(
            Candidate::new(0, MethodId::Physiological, 3.0),
            &signal,
            None,
            1.0,
        );
        assert_close(adjusted.constraint_multiplier, 3.0);
        assert_close(adjusted.method_weight, 1.2);
        assert_close(adjusted.adjusted_score, 10.8);
    }

    #[test]
    fn adjust_all_drops_candidates_below_floor() {
        let evaluator = ConstraintEvaluator::default();
        let signal = Signal::from_values(vec![100.0, 100.0, 100.0]).expect("valid");
        let candidates = [
            // 1.0 * 0.6 (needs corroboration) * 0.8 weight = 0.48
            Candidate::new(0, MethodId::Density, 1.0),
            // 0.5 * 0.7 weight = 0.35
            Candidate::new(1, MethodId::Pattern, 0.5),
            // 1.0 * 0.5 (in band) * 1.0 = 0.5
            Candidate::new(2, MethodId::Statistical, 1.0),
        ];
        let outcome = evaluator.adjust_all(&candidates, &signal, None, |_| 1.0);
        assert_eq!(outcome.below_floor, 1);
        let kept: Vec<usize> = outcome.kept.iter().map(|c| c.index()).collect();
        assert_eq!(kept, vec![0, 2]);
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let err = ConstraintEvaluator::new(
            ConstraintConfig {
                rules: vec![ConstraintRule::new(
                    MethodId::Pattern,
                    RuleCondition::Always,
                    0.0,
                )],
                ..ConstraintConfig::default()
            },
            MethodWeights::default(),
            PhysiologicalConfig::default(),
            ContextConfig::default(),
        )
        .expect_err("zero multiplier");
        assert!(err.to_string().contains("multiplier"));
    }
}
