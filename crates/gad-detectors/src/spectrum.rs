// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Direct real-input DFT. Quadratic in the window length, which stays small.

use crate::stats::mean;
use std::f64::consts::TAU;

/// One-sided power spectrum of a real series.
#[derive(Clone, Debug, PartialEq)]
pub struct PowerSpectrum {
    len: usize,
    /// Power per bin `k = 0..=len/2`; bin `k` sits at `k / len` cycles/sample.
    power: Vec<f64>,
}

impl PowerSpectrum {
    /// Spectrum of `values` after removing their mean.
    pub fn of_centered(values: &[f64]) -> Self {
        let m = mean(values);
        let centered: Vec<f64> = values.iter().map(|v| v - m).collect();
        Self::of(&centered)
    }

    pub fn of(values: &[f64]) -> Self {
        let n = values.len();
        let bins = n / 2 + 1;
        let mut power = Vec::with_capacity(bins);
        for k in 0..bins {
            let (mut re, mut im) = (0.0, 0.0);
            for (t, value) in values.iter().enumerate() {
                let angle = TAU * (k * t % n.max(1)) as f64 / n as f64;
                re += value * angle.cos();
                im -= value * angle.sin();
            }
            power.push(re * re + im * im);
        }
        Self { len: n, power }
    }

    pub fn frequency(&self, bin: usize) -> f64 {
        if self.len == 0 {
            0.0
        } else {
            bin as f64 / self.len as f64
        }
    }

    /// Total power excluding the DC bin.
    pub fn total_energy(&self) -> f64 {
        self.power.iter().skip(1).sum()
    }

    /// Share of non-DC power in bins whose frequency satisfies `in_band`.
    /// `None` when there is no energy to share.
    pub fn band_fraction(&self, in_band: impl Fn(f64) -> bool) -> Option<f64> {
        let total = self.total_energy();
        if total <= f64::EPSILON {
            return None;
        }
        let band: f64 = self
            .power
            .iter()
            .enumerate()
            .skip(1)
            .filter(|(bin, _)| in_band(self.frequency(*bin)))
            .map(|(_, p)| *p)
            .sum();
        Some(band / total)
    }

    /// Non-DC bin carrying the most power; the lowest such bin on ties.
    pub fn dominant_bin(&self) -> Option<usize> {
        self.power
            .iter()
            .enumerate()
            .skip(1)
            .fold(None, |best: Option<(usize, f64)>, (bin, p)| match best {
                Some((_, bp)) if bp >= *p => best,
                _ => Some((bin, *p)),
            })
            .map(|(bin, _)| bin)
    }
}
