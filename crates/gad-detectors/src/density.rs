// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::stats::{centered_bounds, fit_linear, mean, median, standardize, std_dev};
use gad_core::{DensityConfig, Detector, DetectorOutput, GadError, MethodId, Signal};
use std::collections::BTreeMap;
use tracing::debug;

const FEATURE_COUNT: usize = 7;

/// Density-outlier procedure over a fixed per-sample feature vector.
///
/// The score of a sample is its mean Euclidean distance to the
/// `k_neighbors` closest other samples in standardized feature space; the
/// `contamination` fraction with the largest positive scores is flagged.
/// Pairwise distances make this quadratic in the signal length.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DensityDetector {
    config: DensityConfig,
}

impl DensityDetector {
    pub fn new(config: DensityConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Standardized feature columns, one `Vec` per feature.
    fn features(&self, values: &[f64]) -> Vec<Vec<f64>> {
        let n = values.len();
        let half = self.config.local_window / 2;
        let mut columns = vec![Vec::with_capacity(n); FEATURE_COUNT];
        for t in 0..n {
            let d1 = if t > 0 { values[t] - values[t - 1] } else { 0.0 };
            let d2 = if t > 0 && t + 1 < n {
                values[t + 1] - 2.0 * values[t] + values[t - 1]
            } else {
                0.0
            };
            let (lo, hi) = centered_bounds(t, half, n);
            let local = &values[lo..hi];
            let trailing_start = (t + 1).saturating_sub(self.config.trailing_window);
            let trailing = &values[trailing_start..=t];
            let local_samples: Vec<(f64, f64)> = local
                .iter()
                .enumerate()
                .map(|(offset, v)| (offset as f64, *v))
                .collect();
            let slope = fit_linear(&local_samples).map_or(0.0, |(_, slope)| slope);

            let row = [
                values[t],
                d1,
                d2,
                mean(local),
                std_dev(local),
                values[t] - mean(trailing),
                slope,
            ];
            for (column, value) in columns.iter_mut().zip(row) {
                column.push(value);
            }
        }
        for column in &mut columns {
            standardize(column);
        }
        columns
    }

    fn knn_scores(&self, columns: &[Vec<f64>], n: usize) -> Vec<f64> {
        let k = self.config.k_neighbors.min(n.saturating_sub(1)).max(1);
        let mut distances = Vec::with_capacity(n.saturating_sub(1));
        (0..n)
            .map(|i| {
                distances.clear();
                for j in (0..n).filter(|&j| j != i) {
                    let squared: f64 = columns
                        .iter()
                        .map(|column| {
                            let diff = column[i] - column[j];
                            diff * diff
                        })
                        .sum();
                    distances.push(squared.sqrt());
                }
                distances.sort_by(|a, b| a.total_cmp(b));
                distances.iter().take(k).sum::<f64>() / k as f64
            })
            .collect()
    }
}

impl Detector for DensityDetector {
    fn method(&self) -> MethodId {
        MethodId::Density
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let n = values.len();
        if n < self.config.min_len {
            debug!(
                n,
                required = self.config.min_len,
                "density detector skipped: too few samples"
            );
            return Ok(DetectorOutput::insufficient(self.method(), self.config.min_len, n));
        }

        let columns = self.features(values);
        let scores = self.knn_scores(&columns, n);
        let positive: Vec<f64> = scores.iter().copied().filter(|s| *s > 0.0).collect();
        let Some(reference) = median(&positive) else {
            debug!(n, "density detector skipped: all feature vectors coincide");
            return Ok(DetectorOutput::degenerate(
                self.method(),
                "all feature vectors coincide",
            ));
        };

        let budget = (self.config.contamination * n as f64).ceil() as usize;
        let mut ranked: Vec<(usize, f64)> = scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| *score > 0.0)
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let flagged: BTreeMap<usize, f64> = ranked
            .into_iter()
            .take(budget)
            .map(|(idx, score)| (idx, (score / reference).max(1.0)))
            .collect();
        Ok(DetectorOutput::from_scores(self.method(), flagged))
    }
}
