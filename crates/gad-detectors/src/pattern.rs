// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{autocorr_at_lag, std_dev, theil_sen_slope};
use gad_core::{Detector, DetectorOutput, GadError, MethodId, PatternConfig, Signal, merge_max};
use std::collections::BTreeMap;
use tracing::debug;

const PATTERN_SCORE: f64 = 1.0;
/// Minimum rise over the previous lag for an ACF local maximum.
const ACF_PEAK_EPS: f64 = 1e-9;

/// Shape-based detector: stuck runs, oscillation bursts, abrupt trend
/// reversals, and excessive short-lag periodicity.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PatternDetector {
    config: PatternConfig,
}

impl PatternDetector {
    pub fn new(config: PatternConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn stuck_runs(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let mut runs = 0;
        let mut start = 0;
        while start < values.len() {
            let mut end = start;
            while end + 1 < values.len()
                && (values[end + 1] - values[end]).abs() <= self.config.flat_tolerance
            {
                end += 1;
            }
            if end - start + 1 >= self.config.min_flat_run {
                runs += 1;
                for idx in start..=end {
                    merge_max(scores, idx, PATTERN_SCORE);
                }
            }
            start = end + 1;
        }
        runs
    }

    fn oscillations(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let d2: Vec<f64> = values
            .windows(3)
            .map(|w| w[2] - 2.0 * w[1] + w[0])
            .collect();
        let sigma = std_dev(&d2);
        if sigma <= f64::EPSILON {
            return 0;
        }
        let limit = self.config.oscillation_sigma * sigma;

        let mut bursts = 0;
        let mut j = 0;
        while j < d2.len() {
            if d2[j].abs() <= limit {
                j += 1;
                continue;
            }
            let start = j;
            while j + 1 < d2.len()
                && d2[j + 1].abs() > limit
                && d2[j + 1].signum() != d2[j].signum()
            {
                j += 1;
            }
            if j - start + 1 >= self.config.min_oscillation_run {
                bursts += 1;
                // d2[k] is centred on sample k + 1.
                for k in start..=j {
                    merge_max(scores, k + 1, PATTERN_SCORE);
                }
            }
            j += 1;
        }
        bursts
    }

    fn trend_reversals(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let w = self.config.trend_window;
        if values.len() < 2 * w - 1 {
            return 0;
        }
        let mut reversals = 0;
        for i in (w - 1)..=(values.len() - w) {
            let (Some(trailing), Some(leading)) = (
                theil_sen_slope(&values[i + 1 - w..=i]),
                theil_sen_slope(&values[i..i + w]),
            ) else {
                continue;
            };
            if (trailing - leading).abs() > self.config.trend_reversal_threshold {
                reversals += 1;
                merge_max(scores, i, PATTERN_SCORE);
            }
        }
        reversals
    }

    fn excessive_periodicity(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> bool {
        let max_lag = self.config.max_acf_lag.min(values.len().saturating_sub(4));
        if max_lag < 2 {
            return false;
        }
        let acf: Vec<f64> = (0..=max_lag + 1)
            .map(|lag| autocorr_at_lag(values, lag))
            .collect();
        let peaks = (2..=max_lag)
            .filter(|&lag| {
                acf[lag] >= self.config.acf_peak_threshold
                    && acf[lag] > acf[lag - 1] + ACF_PEAK_EPS
                    && acf[lag] >= acf[lag + 1]
            })
            .count();
        if peaks <= self.config.max_acf_peaks {
            return false;
        }
        for idx in 1..values.len() - 1 {
            if values[idx] > values[idx - 1] && values[idx] >= values[idx + 1] {
                merge_max(scores, idx, PATTERN_SCORE);
            }
        }
        true
    }
}

impl Detector for PatternDetector {
    fn method(&self) -> MethodId {
        MethodId::Pattern
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let n = values.len();
        if n < self.config.min_len {
            debug!(
                n,
                required = self.config.min_len,
                "pattern detector skipped: too few samples"
            );
            return Ok(DetectorOutput::insufficient(self.method(), self.config.min_len, n));
        }

        let mut scores = BTreeMap::new();
        let stuck = self.stuck_runs(values, &mut scores);
        let bursts = self.oscillations(values, &mut scores);
        let reversals = self.trend_reversals(values, &mut scores);
        let periodic = self.excessive_periodicity(values, &mut scores);

        let mut notes = vec![];
        if stuck > 0 {
            notes.push(format!("{stuck} stuck run(s)"));
        }
        if bursts > 0 {
            notes.push(format!("{bursts} oscillation burst(s)"));
        }
        if reversals > 0 {
            notes.push(format!("{reversals} trend reversal(s)"));
        }
        if periodic {
            notes.push("excessive short-lag periodicity".to_string());
        }
        Ok(DetectorOutput::from_scores(self.method(), scores).with_notes(notes))
    }
}
