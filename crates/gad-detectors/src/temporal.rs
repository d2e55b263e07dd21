// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{MAD_TO_SIGMA, centered_bounds, mad, mean, median, std_dev};
use gad_core::{Detector, DetectorOutput, GadError, MethodId, Signal, TemporalConfig, merge_max};
use std::collections::BTreeMap;
use tracing::debug;

/// Cap on the short-gap score when consecutive timestamps coincide.
const MAX_GAP_SCORE: f64 = 10.0;

/// Time-structure detector: irregular sampling gaps, residuals from a
/// trailing moving-average prediction, and local z-scores.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TemporalDetector {
    config: TemporalConfig,
}

impl TemporalDetector {
    pub fn new(config: TemporalConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn gaps(
        &self,
        signal: &Signal,
        scores: &mut BTreeMap<usize, f64>,
        notes: &mut Vec<String>,
    ) -> usize {
        let Some(gaps) = signal.gaps_ns().filter(|gaps| !gaps.is_empty()) else {
            return 0;
        };
        let expected = match self.config.expected_interval_ns {
            Some(interval) => interval as f64,
            None => {
                let observed: Vec<f64> = gaps.iter().map(|g| *g as f64).collect();
                median(&observed).unwrap_or(0.0)
            }
        };
        if expected <= 0.0 {
            notes.push("gap check skipped: median sampling interval is zero".to_string());
            return 0;
        }

        let mut hits = 0;
        for (offset, gap) in gaps.iter().enumerate() {
            let ratio = *gap as f64 / expected;
            let score = if ratio < self.config.short_gap_ratio {
                (self.config.short_gap_ratio / ratio.max(f64::MIN_POSITIVE)).min(MAX_GAP_SCORE)
            } else if ratio > self.config.long_gap_ratio {
                ratio / self.config.long_gap_ratio
            } else {
                continue;
            };
            hits += 1;
            merge_max(scores, offset + 1, score);
        }
        hits
    }

    fn residuals(
        &self,
        values: &[f64],
        scores: &mut BTreeMap<usize, f64>,
        notes: &mut Vec<String>,
    ) -> usize {
        let w = self.config.residual_window;
        if values.len() <= w {
            return 0;
        }

        let first_pass: Vec<f64> = (w..values.len())
            .map(|t| values[t] - mean(&values[t - w..t]))
            .collect();
        let center = median(&first_pass).unwrap_or(0.0);
        let robust = mad(&first_pass, center).unwrap_or(0.0) * MAD_TO_SIGMA;
        let scale = if robust > f64::EPSILON {
            robust
        } else {
            std_dev(&first_pass)
        };
        if scale <= f64::EPSILON {
            debug!(n = values.len(), "temporal residual check skipped: zero residual scale");
            notes.push("residual check skipped: zero residual scale".to_string());
            return 0;
        }

        let limit = self.config.residual_sigma * scale;
        let mut cleaned = values.to_vec();
        let mut hits = 0;
        for t in w..values.len() {
            let prediction = mean(&cleaned[t - w..t]);
            let residual = values[t] - prediction;
            if residual.abs() > limit {
                hits += 1;
                merge_max(scores, t, residual.abs() / limit);
                cleaned[t] = prediction;
            }
        }
        hits
    }

    fn local_z(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        if values.len() < self.config.local_min_len {
            return 0;
        }
        let mut hits = 0;
        for t in 0..values.len() {
            let (lo, hi) = centered_bounds(t, self.config.local_half_window, values.len());
            let window = &values[lo..hi];
            let sigma = std_dev(window);
            if sigma <= f64::EPSILON {
                continue;
            }
            let z = (values[t] - mean(window)).abs() / sigma;
            if z > self.config.local_z_threshold {
                hits += 1;
                merge_max(scores, t, z / self.config.local_z_threshold);
            }
        }
        hits
    }
}

impl Detector for TemporalDetector {
    fn method(&self) -> MethodId {
        MethodId::Temporal
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let mut scores = BTreeMap::new();
        let mut notes = vec![];
        let gaps = self.gaps(signal, &mut scores, &mut notes);
        let residuals = self.residuals(values, &mut scores, &mut notes);
        let local = self.local_z(values, &mut scores);

        for (count, label) in [
            (gaps, "irregular sampling gap(s)"),
            (residuals, "prediction residual outlier(s)"),
            (local, "local z-score outlier(s)"),
        ] {
            if count > 0 {
                notes.push(format!("{count} {label}"));
            }
        }
        Ok(DetectorOutput::from_scores(self.method(), scores).with_notes(notes))
    }
}
