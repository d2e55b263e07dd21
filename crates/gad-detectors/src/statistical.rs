// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{mad, mean, median, quantile_sorted, std_dev};
use gad_core::{
    Detector, DetectorOutput, GadError, MethodId, Signal, StatisticalConfig, merge_max,
};
use std::collections::BTreeMap;
use tracing::debug;

const MODIFIED_Z_CONSTANT: f64 = 0.6745;
const MIN_LEN: usize = 3;

/// Global-distribution outlier tests: z-score, IQR fences and modified z.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatisticalDetector {
    config: StatisticalConfig,
}

impl StatisticalDetector {
    pub fn new(config: StatisticalConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &StatisticalConfig {
        &self.config
    }
}

impl Detector for StatisticalDetector {
    fn method(&self) -> MethodId {
        MethodId::Statistical
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let n = values.len();
        if n < MIN_LEN {
            debug!(n, required = MIN_LEN, "statistical detector skipped: too few samples");
            return Ok(DetectorOutput::insufficient(self.method(), MIN_LEN, n));
        }

        let mu = mean(values);
        let sigma = std_dev(values);
        if sigma <= f64::EPSILON || values.iter().all(|v| *v == values[0]) {
            debug!(n, "statistical detector skipped: zero variance");
            return Ok(DetectorOutput::degenerate(self.method(), "zero variance"));
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        let (q1, q3) = match (quantile_sorted(&sorted, 0.25), quantile_sorted(&sorted, 0.75)) {
            (Some(q1), Some(q3)) => (q1, q3),
            _ => return Err(GadError::numerical_issue("quartiles of a non-empty signal")),
        };
        let iqr = q3 - q1;
        let lower_fence = q1 - self.config.iqr_multiplier * iqr;
        let upper_fence = q3 + self.config.iqr_multiplier * iqr;

        let med = median(values).unwrap_or(mu);
        let mad_value = mad(values, med).unwrap_or(0.0);
        let mut notes = vec![];
        if mad_value <= f64::EPSILON {
            debug!(n, "statistical detector: modified z-score skipped, MAD is zero");
            notes.push("modified z-score skipped: MAD is zero".to_string());
        }

        let mut scores = BTreeMap::new();
        for (idx, value) in values.iter().copied().enumerate() {
            let z = (value - mu).abs() / sigma;
            let z_hit = z > self.config.z_threshold;
            let iqr_hit = value < lower_fence || value > upper_fence;
            let mad_hit = mad_value > f64::EPSILON
                && MODIFIED_Z_CONSTANT * (value - med).abs() / mad_value
                    > self.config.mad_threshold;
            if z_hit || iqr_hit || mad_hit {
                merge_max(&mut scores, idx, z);
            }
        }

        Ok(DetectorOutput::from_scores(self.method(), scores).with_notes(notes))
    }
}

#[cfg(test)]
mod tests {
    use super::StatisticalDetector;
    use gad_core::{Detector, DetectorStatus, MethodId, Signal, StatisticalConfig};

    fn indices(detector: &StatisticalDetector, values: Vec<f64>) -> Vec<usize> {
        let signal = Signal::from_values(values).expect("valid signal");
        detector
            .detect(&signal)
            .expect("detect should succeed")
            .candidates
            .iter()
            .map(|c| c.index)
            .collect()
    }

    #[test]
    fn config_defaults_and_validation() {
        let default_cfg = StatisticalConfig::default();
        assert_eq!(default_cfg.z_threshold, 2.5);
        assert_eq!(default_cfg.iqr_multiplier, 1.5);
        assert_eq!(default_cfg.mad_threshold, 3.5);

        let ok = StatisticalDetector::new(default_cfg.clone()).expect("default config is valid");
        assert_eq!(ok.config(), &default_cfg);

        let err = StatisticalDetector::new(StatisticalConfig {
            mad_threshold: 0.0,
            ..default_cfg
        })
        .expect_err("mad_threshold=0 must fail");
        assert!(err.to_string().contains("mad_threshold"));
    }

    #[test]
    fn isolated_spike_in_flat_signal_is_flagged_once() {
        let mut values = vec![100.0; 200];
        values[150] = 400.0;
        let signal = Signal::from_values(values).expect("valid signal");
        let output = StatisticalDetector::default()
            .detect(&signal)
            .expect("detect should succeed");
        assert_eq!(output.status, DetectorStatus::Completed);
        assert_eq!(output.candidates.len(), 1);
        let candidate = output.candidates[0];
        assert_eq!(candidate.index, 150);
        assert_eq!(candidate.method, MethodId::Statistical);
        assert!(candidate.raw_score > 10.0, "z={}", candidate.raw_score);
        assert!(output.notes.iter().any(|n| n.contains("MAD is zero")));
    }

    #[test]
    fn smooth_sine_has_no_outliers_until_a_drop() {
        let mut values: Vec<f64> = (0..200)
            .map(|i| 120.0 + 20.0 * (std::f64::consts::TAU * i as f64 / 100.0).sin())
            .collect();
        let detector = StatisticalDetector::default();
        assert!(indices(&detector, values.clone()).is_empty());

        values[80] = 10.0;
        assert_eq!(indices(&detector, values), vec![80]);
    }

    #[test]
    fn iqr_fence_catches_moderate_outlier_below_z_threshold() {
        let mut values = vec![];
        for _ in 0..4 {
            values.extend([10.0, 11.0, 12.0, 11.0, 10.0]);
        }
        values.push(30.0);
        let detector = StatisticalDetector::new(StatisticalConfig {
            z_threshold: 10.0,
            mad_threshold: 100.0,
            ..StatisticalConfig::default()
        })
        .expect("valid config");
        assert_eq!(indices(&detector, values), vec![20]);
    }

    #[test]
    fn constant_and_short_signals_degrade_to_empty() {
        let detector = StatisticalDetector::default();
        let output = detector
            .detect(&Signal::from_values(vec![5.0; 30]).expect("valid"))
            .expect("detect");
        assert!(output.candidates.is_empty());
        assert!(matches!(output.status, DetectorStatus::Degenerate { .. }));

        let output = detector
            .detect(&Signal::from_values(vec![1.0, 2.0]).expect("valid"))
            .expect("detect");
        assert_eq!(
            output.status,
            DetectorStatus::InsufficientData {
                required: 3,
                actual: 2
            }
        );
    }

    #[test]
    fn invalid_config_is_rejected() {
        let err = StatisticalDetector::new(StatisticalConfig {
            z_threshold: -1.0,
            ..StatisticalConfig::default()
        })
        .expect_err("negative threshold must fail");
        assert!(err.to_string().contains("z_threshold"));
    }
}
