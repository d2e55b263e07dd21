// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::median;
use gad_core::{
    Detector, DetectorOutput, GadError, MethodId, PhysiologicalConfig, Signal, merge_max,
};
use std::collections::{BTreeMap, HashMap};

const NANOS_PER_MINUTE: f64 = 60.0 * 1_000_000_000.0;

/// Domain-knowledge rules: hard range, rate of change, extreme constant runs
/// and globally repeated readings. Each rule carries a fixed severity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PhysiologicalDetector {
    config: PhysiologicalConfig,
}

impl PhysiologicalDetector {
    pub fn new(config: PhysiologicalConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PhysiologicalConfig {
        &self.config
    }

    fn out_of_range(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let mut hits = 0;
        for (idx, value) in values.iter().enumerate() {
            if *value < self.config.hard_min || *value > self.config.hard_max {
                hits += 1;
                merge_max(scores, idx, self.config.severity_out_of_range);
            }
        }
        hits
    }

    fn minutes_between(&self, signal: &Signal, t: usize) -> f64 {
        match (signal.timestamp_ns(t - 1), signal.timestamp_ns(t)) {
            // Widened so gaps spanning most of the i64 range do not overflow.
            (Some(prev), Some(curr)) => {
                (i128::from(curr) - i128::from(prev)) as f64 / NANOS_PER_MINUTE
            }
            _ => self.config.sample_interval_s / 60.0,
        }
    }

    fn rate_violations(&self, signal: &Signal, scores: &mut BTreeMap<usize, f64>) -> usize {
        let values = signal.values();
        let mut hits = 0;
        for t in 1..values.len() {
            let minutes = self.minutes_between(signal, t);
            if minutes <= 0.0 {
                continue;
            }
            let rate = (values[t] - values[t - 1]).abs() / minutes;
            if rate <= self.config.max_rate_per_min {
                continue;
            }
            // Blame the endpoint that departs from its surroundings.
            let half = self.config.rate_median_half_window;
            let lo = (t - 1).saturating_sub(half);
            let hi = (t + half + 1).min(values.len());
            let local = median(&values[lo..hi]).unwrap_or(values[t]);
            let culprit = if (values[t - 1] - local).abs() > (values[t] - local).abs() {
                t - 1
            } else {
                t
            };
            hits += 1;
            merge_max(scores, culprit, self.config.severity_rate);
        }
        hits
    }

    fn is_extreme(&self, value: f64) -> bool {
        value <= self.config.extreme_low || value >= self.config.extreme_high
    }

    fn extreme_runs(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let mut runs = 0;
        let mut start = 0;
        while start < values.len() {
            if !self.is_extreme(values[start]) {
                start += 1;
                continue;
            }
            let mut end = start;
            while end + 1 < values.len()
                && self.is_extreme(values[end + 1])
                && (values[end + 1] - values[end]).abs() <= self.config.flat_tolerance
            {
                end += 1;
            }
            if end - start + 1 >= self.config.min_extreme_run {
                runs += 1;
                for idx in start..=end {
                    merge_max(scores, idx, self.config.severity_extreme_run);
                }
            }
            start = end + 1;
        }
        runs
    }

    fn repeated_values(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let mut counts: HashMap<u64, usize> = HashMap::new();
        for value in values {
            *counts.entry(canonical_bits(*value)).or_default() += 1;
        }
        let n = values.len() as f64;
        let repeated: Vec<u64> = counts
            .into_iter()
            .filter(|(_, count)| {
                *count >= self.config.min_repeat_count
                    && *count as f64 / n > self.config.max_repeat_fraction
            })
            .map(|(bits, _)| bits)
            .collect();
        for (idx, value) in values.iter().enumerate() {
            if repeated.contains(&canonical_bits(*value)) {
                merge_max(scores, idx, self.config.severity_repeated);
            }
        }
        repeated.len()
    }
}

/// Bit pattern used to group equal readings; folds `-0.0` into `0.0`.
fn canonical_bits(value: f64) -> u64 {
    if value == 0.0 { 0 } else { value.to_bits() }
}

impl Detector for PhysiologicalDetector {
    fn method(&self) -> MethodId {
        MethodId::Physiological
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let mut scores = BTreeMap::new();
        let range = self.out_of_range(values, &mut scores);
        let rate = self.rate_violations(signal, &mut scores);
        let extreme = self.extreme_runs(values, &mut scores);
        let repeated = self.repeated_values(values, &mut scores);

        let notes = [
            (range, "out-of-range reading(s)"),
            (rate, "rate-of-change violation(s)"),
            (extreme, "extreme constant run(s)"),
            (repeated, "over-represented value(s)"),
        ]
        .into_iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{count} {label}"))
        .collect();
        Ok(DetectorOutput::from_scores(self.method(), scores).with_notes(notes))
    }
}
