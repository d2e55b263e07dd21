// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::spectrum::PowerSpectrum;
use crate::stats::{fit_linear, mean};
use gad_core::{Detector, DetectorOutput, FrequencyConfig, GadError, MethodId, Signal, merge_max};
use std::collections::BTreeMap;
use tracing::debug;

/// Per-sample energy below which a window is treated as silent.
const ZERO_ENERGY_PER_SAMPLE: f64 = 1e-9;

/// Spectral detector: bursts of high-frequency noise and windows dominated
/// by a short oscillation period.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrequencyDetector {
    config: FrequencyConfig,
}

impl FrequencyDetector {
    pub fn new(config: FrequencyConfig) -> Result<Self, GadError> {
        config.validate()?;
        Ok(Self { config })
    }

    fn is_silent(spectrum: &PowerSpectrum, len: usize) -> bool {
        spectrum.total_energy() <= ZERO_ENERGY_PER_SAMPLE * len as f64
    }

    fn high_fraction(&self, spectrum: &PowerSpectrum) -> Option<f64> {
        let cutoff = self.config.hf_cutoff;
        spectrum.band_fraction(|f| f > cutoff)
    }

    fn in_period_band(&self, frequency: f64) -> bool {
        frequency >= 1.0 / self.config.max_period && frequency <= 1.0 / self.config.min_period
    }

    fn high_frequency_windows(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let mut flagged = 0;
        let windows = window_ranges(values.len(), self.config.window_len, self.config.window_step);
        for (start, end) in windows {
            let window = &values[start..end];
            let spectrum = PowerSpectrum::of_centered(window);
            if Self::is_silent(&spectrum, window.len()) {
                continue;
            }
            let Some(fraction) = self.high_fraction(&spectrum) else {
                continue;
            };
            if fraction <= self.config.window_hf_fraction {
                continue;
            }
            let window_mean = mean(window);
            let peak = window
                .iter()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (offset, v)| {
                    let deviation = (v - window_mean).abs();
                    if deviation > best.1 { (offset, deviation) } else { best }
                })
                .0;
            flagged += 1;
            merge_max(scores, start + peak, fraction / self.config.window_hf_fraction);
        }
        flagged
    }

    fn periodic_windows(&self, values: &[f64], scores: &mut BTreeMap<usize, f64>) -> usize {
        let len = self.config.periodicity_window;
        if values.len() < len {
            return 0;
        }
        let mut flagged = 0;
        for (start, end) in window_ranges(values.len(), len, self.config.periodicity_step) {
            let residual = detrend(&values[start..end]);
            let spectrum = PowerSpectrum::of_centered(&residual);
            if Self::is_silent(&spectrum, residual.len()) {
                continue;
            }
            let Some(share) = spectrum.band_fraction(|f| self.in_period_band(f)) else {
                continue;
            };
            let dominant_in_band = spectrum
                .dominant_bin()
                .is_some_and(|bin| self.in_period_band(spectrum.frequency(bin)));
            if share >= self.config.periodicity_fraction && dominant_in_band {
                flagged += 1;
                merge_max(
                    scores,
                    start + (end - start) / 2,
                    share / self.config.periodicity_fraction,
                );
            }
        }
        flagged
    }
}

impl Detector for FrequencyDetector {
    fn method(&self) -> MethodId {
        MethodId::Frequency
    }

    fn detect(&self, signal: &Signal) -> Result<DetectorOutput, GadError> {
        let values = signal.values();
        let n = values.len();
        if n < self.config.min_len {
            debug!(
                n,
                required = self.config.min_len,
                "frequency detector skipped: too few samples"
            );
            return Ok(DetectorOutput::insufficient(self.method(), self.config.min_len, n));
        }

        let spectrum = PowerSpectrum::of_centered(values);
        if Self::is_silent(&spectrum, n) {
            debug!(n, "frequency detector skipped: zero spectral energy");
            return Ok(DetectorOutput::degenerate(self.method(), "zero spectral energy"));
        }

        let mut scores = BTreeMap::new();
        let mut notes = vec![];
        let signal_hf = self.high_fraction(&spectrum).unwrap_or(0.0);
        if signal_hf > self.config.signal_hf_fraction {
            let windows = self.high_frequency_windows(values, &mut scores);
            notes.push(format!(
                "high-frequency share {signal_hf:.3}; {windows} noisy window(s)"
            ));
        }
        let periodic = self.periodic_windows(values, &mut scores);
        if periodic > 0 {
            notes.push(format!("{periodic} short-period window(s)"));
        }

        Ok(DetectorOutput::from_scores(self.method(), scores).with_notes(notes))
    }
}

/// Start/end pairs of sliding windows; one window over everything when the
/// series is shorter than `len`.
fn window_ranges(n: usize, len: usize, step: usize) -> Vec<(usize, usize)> {
    if n <= len {
        return vec![(0, n)];
    }
    (0..=n - len)
        .step_by(step.max(1))
        .map(|start| (start, start + len))
        .collect()
}

/// Removes the least-squares line; returns the input unchanged when the fit
/// is degenerate.
fn detrend(window: &[f64]) -> Vec<f64> {
    let samples: Vec<(f64, f64)> = window
        .iter()
        .enumerate()
        .map(|(t, v)| (t as f64, *v))
        .collect();
    match fit_linear(&samples) {
        Some((intercept, slope)) => samples
            .iter()
            .map(|(t, v)| v - (intercept + slope * t))
            .collect(),
        None => window.to_vec(),
    }
}
