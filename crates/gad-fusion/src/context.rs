// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{
    AnalysisContext, ContextConfig, Expectation, GadError, PhysiologicalConfig, Signal, TimeWindow,
};
use gad_detectors::stats::std_dev;
use std::collections::BTreeMap;

const NEUTRAL: f64 = 1.0;

/// Plausibility multiplier of a flagged sample given its surroundings and
/// the time of day.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextScorer {
    config: ContextConfig,
    normal_low: f64,
    normal_high: f64,
}

impl Default for ContextScorer {
    fn default() -> Self {
        let physiological = PhysiologicalConfig::default();
        Self {
            config: ContextConfig::default(),
            normal_low: physiological.normal_low,
            normal_high: physiological.normal_high,
        }
    }
}

impl ContextScorer {
    pub fn new(
        config: ContextConfig,
        physiological: &PhysiologicalConfig,
    ) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self {
            config,
            normal_low: physiological.normal_low,
            normal_high: physiological.normal_high,
        })
    }

    /// Multiplier for `index`, clamped to `[min_multiplier, max_multiplier]`.
    pub fn score(&self, signal: &Signal, index: usize, context: Option<&AnalysisContext>) -> f64 {
        self.score_with_global(signal, index, context, std_dev(signal.values()))
    }

    /// Scores every index in `indices`, computing the global spread once.
    pub fn score_all(
        &self,
        signal: &Signal,
        indices: impl IntoIterator<Item = usize>,
        context: Option<&AnalysisContext>,
    ) -> BTreeMap<usize, f64> {
        let global = std_dev(signal.values());
        let mut scores = BTreeMap::new();
        for index in indices {
            scores
                .entry(index)
                .or_insert_with(|| self.score_with_global(signal, index, context, global));
        }
        scores
    }

    /// Time window covering `index`, if the hour of day is known.
    pub fn window_for(
        &self,
        signal: &Signal,
        index: usize,
        context: Option<&AnalysisContext>,
    ) -> Option<&TimeWindow> {
        let hour = context?.hour_of_day(signal, index)?;
        self.config.window_at(hour)
    }

    fn score_with_global(
        &self,
        signal: &Signal,
        index: usize,
        context: Option<&AnalysisContext>,
        global_std: f64,
    ) -> f64 {
        let combined = self.neighborhood_factor(signal.values(), index, global_std)
            * self.time_of_day_factor(signal, index, context);
        combined.clamp(self.config.min_multiplier, self.config.max_multiplier)
    }

    fn neighborhood_factor(&self, values: &[f64], index: usize, global_std: f64) -> f64 {
        if global_std <= f64::EPSILON || index >= values.len() {
            return NEUTRAL;
        }
        let half = self.config.neighborhood_half_window;
        let start = index.saturating_sub(half);
        let end = (index + half + 1).min(values.len());
        let neighbours: Vec<f64> = (start..end)
            .filter(|i| *i != index)
            .map(|i| values[i])
            .collect();
        if neighbours.len() < 2 {
            return NEUTRAL;
        }

        let ratio = std_dev(&neighbours) / global_std;
        let (stable, noisy) = (self.config.stable_ratio, self.config.noisy_ratio);
        if ratio <= stable {
            self.config.stable_multiplier
        } else if ratio >= noisy {
            self.config.noisy_multiplier
        } else {
            let frac = (ratio - stable) / (noisy - stable);
            self.config.stable_multiplier
                + frac * (self.config.noisy_multiplier - self.config.stable_multiplier)
        }
    }

    fn time_of_day_factor(
        &self,
        signal: &Signal,
        index: usize,
        context: Option<&AnalysisContext>,
    ) -> f64 {
        let Some(window) = self.window_for(signal, index, context) else {
            return NEUTRAL;
        };
        let Some(value) = signal.values().get(index).copied() else {
            return NEUTRAL;
        };
        let in_band = value >= self.normal_low && value <= self.normal_high;
        let consistent = match window.expectation {
            Expectation::Stable => Some(in_band),
            Expectation::Elevated if value > self.normal_high => Some(true),
            Expectation::Elevated if value < self.normal_low => Some(false),
            Expectation::Elevated => None,
        };
        match consistent {
            Some(true) => window.consistent_multiplier,
            Some(false) => window.inconsistent_multiplier,
            None => NEUTRAL,
        }
    }
}
