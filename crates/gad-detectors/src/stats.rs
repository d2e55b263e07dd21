// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Small numeric helpers shared by the detectors.

/// Consistency constant turning a MAD into a normal-equivalent sigma.
pub const MAD_TO_SIGMA: f64 = 1.4826;

pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Population standard deviation.
pub fn std_dev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let variance = values
        .iter()
        .map(|v| {
            let diff = *v - m;
            diff * diff
        })
        .sum::<f64>()
        / values.len() as f64;
    variance.sqrt()
}

pub fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) * 0.5)
    }
}

/// Median absolute deviation around `center`.
pub fn mad(values: &[f64], center: f64) -> Option<f64> {
    let deviations: Vec<f64> = values.iter().map(|v| (v - center).abs()).collect();
    median(&deviations)
}

/// Quantile of an already sorted slice, linear interpolation between ranks.
pub fn quantile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let pos = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

/// Pearson autocorrelation between `series[t]` and `series[t - lag]`.
pub fn autocorr_at_lag(series: &[f64], lag: usize) -> f64 {
    if lag == 0 || lag >= series.len() {
        return 0.0;
    }
    let pairs: Vec<(f64, f64)> = (lag..series.len())
        .map(|t| (series[t], series[t - lag]))
        .collect();
    if pairs.len() < 3 {
        return 0.0;
    }
    let m = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(a, _)| *a).sum::<f64>() / m;
    let mean_b = pairs.iter().map(|(_, b)| *b).sum::<f64>() / m;
    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (a, b) in &pairs {
        let da = *a - mean_a;
        let db = *b - mean_b;
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        0.0
    } else {
        (cov / denom).clamp(-1.0, 1.0)
    }
}

/// Least-squares `(intercept, slope)`; `None` when the abscissae are degenerate.
pub fn fit_linear(samples: &[(f64, f64)]) -> Option<(f64, f64)> {
    let m = samples.len() as f64;
    let (sum_t, sum_y, sum_tt, sum_ty) = samples
        .iter()
        .fold((0.0, 0.0, 0.0, 0.0), |(st, sy, stt, sty), (t, y)| {
            (st + *t, sy + *y, stt + t * t, sty + t * y)
        });
    let denom = m * sum_tt - sum_t * sum_t;
    if !denom.is_finite() || denom.abs() <= f64::EPSILON {
        return None;
    }
    let slope = (m * sum_ty - sum_t * sum_y) / denom;
    let intercept = (sum_y - slope * sum_t) / m;
    Some((intercept, slope))
}

/// Theil–Sen slope of equally spaced values: median of pairwise slopes.
pub fn theil_sen_slope(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }
    let mut slopes = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            slopes.push((values[j] - values[i]) / (j - i) as f64);
        }
    }
    median(&slopes)
}

/// Spread below this fraction of the column magnitude counts as rounding noise.
const RELATIVE_SPREAD_FLOOR: f64 = 1e-12;

/// Z-standardizes in place; a zero-spread column becomes all zeros.
pub fn standardize(values: &mut [f64]) {
    let m = mean(values);
    let s = std_dev(values);
    let degenerate = s <= RELATIVE_SPREAD_FLOOR * m.abs().max(1.0);
    for v in values.iter_mut() {
        *v = if degenerate { 0.0 } else { (*v - m) / s };
    }
}

/// Inclusive-exclusive bounds of a window of `half` samples each side of `t`.
pub fn centered_bounds(t: usize, half: usize, n: usize) -> (usize, usize) {
    (t.saturating_sub(half), (t + half + 1).min(n))
}
