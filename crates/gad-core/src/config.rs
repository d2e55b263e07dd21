// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Consolidated analysis configuration.
//!
//! Every threshold used by the detectors, the context scorer, the constraint
//! rules and the fusion engine lives here with its default, so a run is fully
//! described by one [`AnalysisConfig`] value.

use crate::{GadError, MethodId};
use std::collections::BTreeMap;

const DEFAULT_Z_THRESHOLD: f64 = 2.5;
const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
const DEFAULT_MAD_THRESHOLD: f64 = 3.5;

const DEFAULT_PATTERN_MIN_LEN: usize = 10;
const DEFAULT_FLAT_TOLERANCE: f64 = 0.1;
const DEFAULT_MIN_FLAT_RUN: usize = 6;
const DEFAULT_OSCILLATION_SIGMA: f64 = 2.0;
const DEFAULT_MIN_OSCILLATION_RUN: usize = 4;
const DEFAULT_TREND_WINDOW: usize = 5;
const DEFAULT_TREND_REVERSAL_THRESHOLD: f64 = 3.0;
const DEFAULT_MAX_ACF_LAG: usize = 20;
const DEFAULT_ACF_PEAK_THRESHOLD: f64 = 0.3;
const DEFAULT_MAX_ACF_PEAKS: usize = 3;

const DEFAULT_FREQUENCY_MIN_LEN: usize = 10;
const DEFAULT_HF_CUTOFF: f64 = 0.25;
const DEFAULT_SIGNAL_HF_FRACTION: f64 = 0.15;
const DEFAULT_WINDOW_LEN: usize = 20;
const DEFAULT_WINDOW_STEP: usize = 10;
const DEFAULT_WINDOW_HF_FRACTION: f64 = 0.20;
const DEFAULT_PERIODICITY_WINDOW: usize = 32;
const DEFAULT_PERIODICITY_STEP: usize = 8;
const DEFAULT_MIN_PERIOD: f64 = 5.0;
const DEFAULT_MAX_PERIOD: f64 = 20.0;
const DEFAULT_PERIODICITY_FRACTION: f64 = 0.6;

const DEFAULT_DENSITY_MIN_LEN: usize = 20;
const DEFAULT_CONTAMINATION: f64 = 0.1;
const DEFAULT_K_NEIGHBORS: usize = 5;
const DEFAULT_LOCAL_WINDOW: usize = 5;
const DEFAULT_TRAILING_WINDOW: usize = 10;

const DEFAULT_HARD_MIN: f64 = 20.0;
const DEFAULT_HARD_MAX: f64 = 600.0;
const DEFAULT_MAX_RATE_PER_MIN: f64 = 4.0;
const DEFAULT_SAMPLE_INTERVAL_S: f64 = 300.0;
const DEFAULT_RATE_MEDIAN_HALF_WINDOW: usize = 3;
const DEFAULT_EXTREME_LOW: f64 = 40.0;
const DEFAULT_EXTREME_HIGH: f64 = 400.0;
const DEFAULT_MIN_EXTREME_RUN: usize = 6;
const DEFAULT_MAX_REPEAT_FRACTION: f64 = 0.2;
const DEFAULT_MIN_REPEAT_COUNT: usize = 10;
const DEFAULT_NORMAL_LOW: f64 = 70.0;
const DEFAULT_NORMAL_HIGH: f64 = 180.0;
const DEFAULT_SEVERITY_OUT_OF_RANGE: f64 = 3.0;
const DEFAULT_SEVERITY_RATE: f64 = 2.0;
const DEFAULT_SEVERITY_EXTREME_RUN: f64 = 1.5;
const DEFAULT_SEVERITY_REPEATED: f64 = 1.0;

const DEFAULT_SHORT_GAP_RATIO: f64 = 0.5;
const DEFAULT_LONG_GAP_RATIO: f64 = 2.0;
const DEFAULT_RESIDUAL_WINDOW: usize = 5;
const DEFAULT_RESIDUAL_SIGMA: f64 = 3.0;
const DEFAULT_LOCAL_HALF_WINDOW: usize = 7;
const DEFAULT_LOCAL_Z_THRESHOLD: f64 = 3.0;
const DEFAULT_LOCAL_MIN_LEN: usize = 11;

const DEFAULT_NEIGHBORHOOD_HALF_WINDOW: usize = 3;
const DEFAULT_STABLE_RATIO: f64 = 0.25;
const DEFAULT_NOISY_RATIO: f64 = 1.0;
const DEFAULT_STABLE_MULTIPLIER: f64 = 1.2;
const DEFAULT_NOISY_MULTIPLIER: f64 = 0.8;
const DEFAULT_MIN_CONTEXT_MULTIPLIER: f64 = 0.5;
const DEFAULT_MAX_CONTEXT_MULTIPLIER: f64 = 1.5;
const DEFAULT_CONSISTENT_MULTIPLIER: f64 = 0.8;
const DEFAULT_INCONSISTENT_MULTIPLIER: f64 = 1.2;

const DEFAULT_MIN_ADJUSTED_SCORE: f64 = 0.4;
const DEFAULT_NEEDS_CORROBORATION_MULTIPLIER: f64 = 0.6;

const DEFAULT_SUPPORT_OVERLAP: f64 = 0.7;
const DEFAULT_CONFLICT_OVERLAP: f64 = 0.1;
const DEFAULT_CONFLICT_MIN_SIZE: usize = 5;
const DEFAULT_WEIGHT_STEP: f64 = 0.05;
const DEFAULT_MIN_WEIGHT: f64 = 0.2;
const DEFAULT_MAX_WEIGHT: f64 = 2.0;

const DEFAULT_HIGH_MIN_METHODS: usize = 3;
const DEFAULT_MEDIUM_MIN_METHODS: usize = 2;
const DEFAULT_LOW_MIN_SCORE: f64 = 0.4;

/// Thresholds for the global-distribution detector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct StatisticalConfig {
    pub z_threshold: f64,
    pub iqr_multiplier: f64,
    pub mad_threshold: f64,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            z_threshold: DEFAULT_Z_THRESHOLD,
            iqr_multiplier: DEFAULT_IQR_MULTIPLIER,
            mad_threshold: DEFAULT_MAD_THRESHOLD,
        }
    }
}

impl StatisticalConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        for (name, value) in [
            ("z_threshold", self.z_threshold),
            ("iqr_multiplier", self.iqr_multiplier),
            ("mad_threshold", self.mad_threshold),
        ] {
            require_positive("StatisticalConfig", name, value)?;
        }
        Ok(())
    }
}

/// Thresholds for the stuck / oscillation / reversal / periodicity detector.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct PatternConfig {
    pub min_len: usize,
    pub flat_tolerance: f64,
    pub min_flat_run: usize,
    pub oscillation_sigma: f64,
    pub min_oscillation_run: usize,
    pub trend_window: usize,
    pub trend_reversal_threshold: f64,
    pub max_acf_lag: usize,
    pub acf_peak_threshold: f64,
    pub max_acf_peaks: usize,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_PATTERN_MIN_LEN,
            flat_tolerance: DEFAULT_FLAT_TOLERANCE,
            min_flat_run: DEFAULT_MIN_FLAT_RUN,
            oscillation_sigma: DEFAULT_OSCILLATION_SIGMA,
            min_oscillation_run: DEFAULT_MIN_OSCILLATION_RUN,
            trend_window: DEFAULT_TREND_WINDOW,
            trend_reversal_threshold: DEFAULT_TREND_REVERSAL_THRESHOLD,
            max_acf_lag: DEFAULT_MAX_ACF_LAG,
            acf_peak_threshold: DEFAULT_ACF_PEAK_THRESHOLD,
            max_acf_peaks: DEFAULT_MAX_ACF_PEAKS,
        }
    }
}

impl PatternConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        require_non_negative("PatternConfig", "flat_tolerance", self.flat_tolerance)?;
        for (name, value) in [
            ("oscillation_sigma", self.oscillation_sigma),
            ("trend_reversal_threshold", self.trend_reversal_threshold),
        ] {
            require_positive("PatternConfig", name, value)?;
        }
        require_unit_interval("PatternConfig", "acf_peak_threshold", self.acf_peak_threshold)?;
        for (name, value, min) in [
            ("min_len", self.min_len, 1),
            ("min_flat_run", self.min_flat_run, 2),
            ("min_oscillation_run", self.min_oscillation_run, 2),
            ("trend_window", self.trend_window, 2),
            ("max_acf_lag", self.max_acf_lag, 2),
        ] {
            require_at_least("PatternConfig", name, value, min)?;
        }
        Ok(())
    }
}

/// Spectral thresholds; frequencies are in cycles per sample.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct FrequencyConfig {
    pub min_len: usize,
    pub hf_cutoff: f64,
    pub signal_hf_fraction: f64,
    pub window_len: usize,
    pub window_step: usize,
    pub window_hf_fraction: f64,
    pub periodicity_window: usize,
    pub periodicity_step: usize,
    pub min_period: f64,
    pub max_period: f64,
    pub periodicity_fraction: f64,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_FREQUENCY_MIN_LEN,
            hf_cutoff: DEFAULT_HF_CUTOFF,
            signal_hf_fraction: DEFAULT_SIGNAL_HF_FRACTION,
            window_len: DEFAULT_WINDOW_LEN,
            window_step: DEFAULT_WINDOW_STEP,
            window_hf_fraction: DEFAULT_WINDOW_HF_FRACTION,
            periodicity_window: DEFAULT_PERIODICITY_WINDOW,
            periodicity_step: DEFAULT_PERIODICITY_STEP,
            min_period: DEFAULT_MIN_PERIOD,
            max_period: DEFAULT_MAX_PERIOD,
            periodicity_fraction: DEFAULT_PERIODICITY_FRACTION,
        }
    }
}

impl FrequencyConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        if !(self.hf_cutoff > 0.0 && self.hf_cutoff < 0.5) {
            return Err(GadError::invalid_config(format!(
                "FrequencyConfig.hf_cutoff must be in (0, 0.5); got {}",
                self.hf_cutoff
            )));
        }
        for (name, value) in [
            ("signal_hf_fraction", self.signal_hf_fraction),
            ("window_hf_fraction", self.window_hf_fraction),
            ("periodicity_fraction", self.periodicity_fraction),
        ] {
            require_unit_interval("FrequencyConfig", name, value)?;
        }
        for (name, value, min) in [
            ("min_len", self.min_len, 1),
            ("window_len", self.window_len, 4),
            ("window_step", self.window_step, 1),
            ("periodicity_window", self.periodicity_window, 4),
            ("periodicity_step", self.periodicity_step, 1),
        ] {
            require_at_least("FrequencyConfig", name, value, min)?;
        }
        if !(self.min_period >= 2.0 && self.max_period > self.min_period) {
            return Err(GadError::invalid_config(format!(
                "FrequencyConfig period band must satisfy 2 <= min_period < max_period; got [{}, {}]",
                self.min_period, self.max_period
            )));
        }
        Ok(())
    }
}

/// Settings of the density-outlier procedure.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct DensityConfig {
    pub min_len: usize,
    pub contamination: f64,
    pub k_neighbors: usize,
    pub local_window: usize,
    pub trailing_window: usize,
}

impl Default for DensityConfig {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_DENSITY_MIN_LEN,
            contamination: DEFAULT_CONTAMINATION,
            k_neighbors: DEFAULT_K_NEIGHBORS,
            local_window: DEFAULT_LOCAL_WINDOW,
            trailing_window: DEFAULT_TRAILING_WINDOW,
        }
    }
}

impl DensityConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        if !(self.contamination > 0.0 && self.contamination <= 0.5) {
            return Err(GadError::invalid_config(format!(
                "DensityConfig.contamination must be in (0, 0.5]; got {}",
                self.contamination
            )));
        }
        for (name, value, min) in [
            ("k_neighbors", self.k_neighbors, 1),
            ("local_window", self.local_window, 3),
            ("trailing_window", self.trailing_window, 2),
        ] {
            require_at_least("DensityConfig", name, value, min)?;
        }
        if self.min_len <= self.k_neighbors {
            return Err(GadError::invalid_config(format!(
                "DensityConfig.min_len must exceed k_neighbors; got min_len={}, k_neighbors={}",
                self.min_len, self.k_neighbors
            )));
        }
        Ok(())
    }
}

/// Domain-knowledge limits of the signal's physical meaning (mg/dL glucose).
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct PhysiologicalConfig {
    pub hard_min: f64,
    pub hard_max: f64,
    /// Maximum plausible rate of change, units per minute.
    pub max_rate_per_min: f64,
    /// Spacing assumed between samples when the signal has no timestamps.
    pub sample_interval_s: f64,
    pub rate_median_half_window: usize,
    pub extreme_low: f64,
    pub extreme_high: f64,
    pub flat_tolerance: f64,
    pub min_extreme_run: usize,
    pub max_repeat_fraction: f64,
    pub min_repeat_count: usize,
    /// Lower edge of the normal band.
    pub normal_low: f64,
    /// Upper edge of the normal band.
    pub normal_high: f64,
    pub severity_out_of_range: f64,
    pub severity_rate: f64,
    pub severity_extreme_run: f64,
    pub severity_repeated: f64,
}

impl Default for PhysiologicalConfig {
    fn default() -> Self {
        Self {
            hard_min: DEFAULT_HARD_MIN,
            hard_max: DEFAULT_HARD_MAX,
            max_rate_per_min: DEFAULT_MAX_RATE_PER_MIN,
            sample_interval_s: DEFAULT_SAMPLE_INTERVAL_S,
            rate_median_half_window: DEFAULT_RATE_MEDIAN_HALF_WINDOW,
            extreme_low: DEFAULT_EXTREME_LOW,
            extreme_high: DEFAULT_EXTREME_HIGH,
            flat_tolerance: DEFAULT_FLAT_TOLERANCE,
            min_extreme_run: DEFAULT_MIN_EXTREME_RUN,
            max_repeat_fraction: DEFAULT_MAX_REPEAT_FRACTION,
            min_repeat_count: DEFAULT_MIN_REPEAT_COUNT,
            normal_low: DEFAULT_NORMAL_LOW,
            normal_high: DEFAULT_NORMAL_HIGH,
            severity_out_of_range: DEFAULT_SEVERITY_OUT_OF_RANGE,
            severity_rate: DEFAULT_SEVERITY_RATE,
            severity_extreme_run: DEFAULT_SEVERITY_EXTREME_RUN,
            severity_repeated: DEFAULT_SEVERITY_REPEATED,
        }
    }
}

impl PhysiologicalConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        let ordered = [
            ("hard_min", self.hard_min),
            ("extreme_low", self.extreme_low),
            ("normal_low", self.normal_low),
            ("normal_high", self.normal_high),
            ("extreme_high", self.extreme_high),
            ("hard_max", self.hard_max),
        ];
        for (name, value) in ordered {
            require_finite("PhysiologicalConfig", name, value)?;
        }
        for pair in ordered.windows(2) {
            let ((lo_name, lo), (hi_name, hi)) = (pair[0], pair[1]);
            if lo >= hi {
                return Err(GadError::invalid_config(format!(
                    "PhysiologicalConfig requires {lo_name} < {hi_name}; got {lo} >= {hi}"
                )));
            }
        }
        for (name, value) in [
            ("max_rate_per_min", self.max_rate_per_min),
            ("sample_interval_s", self.sample_interval_s),
            ("severity_out_of_range", self.severity_out_of_range),
            ("severity_rate", self.severity_rate),
            ("severity_extreme_run", self.severity_extreme_run),
            ("severity_repeated", self.severity_repeated),
        ] {
            require_positive("PhysiologicalConfig", name, value)?;
        }
        require_non_negative("PhysiologicalConfig", "flat_tolerance", self.flat_tolerance)?;
        require_unit_interval(
            "PhysiologicalConfig",
            "max_repeat_fraction",
            self.max_repeat_fraction,
        )?;
        for (name, value, min) in [
            ("rate_median_half_window", self.rate_median_half_window, 1),
            ("min_extreme_run", self.min_extreme_run, 2),
            ("min_repeat_count", self.min_repeat_count, 2),
        ] {
            require_at_least("PhysiologicalConfig", name, value, min)?;
        }
        Ok(())
    }

    /// Returns true when `value` lies inside the normal band.
    pub fn in_normal_band(&self, value: f64) -> bool {
        value >= self.normal_low && value <= self.normal_high
    }
}

/// Gap, residual and local-z thresholds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct TemporalConfig {
    /// Expected sampling interval; the median observed gap when `None`.
    pub expected_interval_ns: Option<i64>,
    pub short_gap_ratio: f64,
    pub long_gap_ratio: f64,
    pub residual_window: usize,
    pub residual_sigma: f64,
    pub local_half_window: usize,
    pub local_z_threshold: f64,
    /// Minimum signal length for the local z-score test.
    pub local_min_len: usize,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            expected_interval_ns: None,
            short_gap_ratio: DEFAULT_SHORT_GAP_RATIO,
            long_gap_ratio: DEFAULT_LONG_GAP_RATIO,
            residual_window: DEFAULT_RESIDUAL_WINDOW,
            residual_sigma: DEFAULT_RESIDUAL_SIGMA,
            local_half_window: DEFAULT_LOCAL_HALF_WINDOW,
            local_z_threshold: DEFAULT_LOCAL_Z_THRESHOLD,
            local_min_len: DEFAULT_LOCAL_MIN_LEN,
        }
    }
}

impl TemporalConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        if let Some(interval) = self.expected_interval_ns.filter(|interval| *interval <= 0) {
            return Err(GadError::invalid_config(format!(
                "TemporalConfig.expected_interval_ns must be > 0 when provided; got {interval}"
            )));
        }
        if !(self.short_gap_ratio > 0.0 && self.short_gap_ratio < 1.0) {
            return Err(GadError::invalid_config(format!(
                "TemporalConfig.short_gap_ratio must be in (0, 1); got {}",
                self.short_gap_ratio
            )));
        }
        if !(self.long_gap_ratio > 1.0 && self.long_gap_ratio.is_finite()) {
            return Err(GadError::invalid_config(format!(
                "TemporalConfig.long_gap_ratio must be finite and > 1; got {}",
                self.long_gap_ratio
            )));
        }
        for (name, value) in [
            ("residual_sigma", self.residual_sigma),
            ("local_z_threshold", self.local_z_threshold),
        ] {
            require_positive("TemporalConfig", name, value)?;
        }
        for (name, value, min) in [
            ("residual_window", self.residual_window, 1),
            ("local_half_window", self.local_half_window, 1),
            ("local_min_len", self.local_min_len, 3),
        ] {
            require_at_least("TemporalConfig", name, value, min)?;
        }
        Ok(())
    }
}

/// What a time-of-day window expects of the signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// Elevated readings are expected (e.g. post-meal).
    Elevated,
    /// Stable, in-band readings are expected (e.g. overnight).
    Stable,
}

/// One entry of the swappable time-of-day domain table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct TimeWindow {
    pub label: String,
    /// Inclusive start hour in `[0, 24)`.
    pub start_hour: f64,
    /// Exclusive end hour in `(0, 24]`; windows may wrap past midnight.
    pub end_hour: f64,
    pub expectation: Expectation,
    pub consistent_multiplier: f64,
    pub inconsistent_multiplier: f64,
}

impl TimeWindow {
    pub fn new(label: &str, start_hour: f64, end_hour: f64, expectation: Expectation) -> Self {
        Self {
            label: label.to_string(),
            start_hour,
            end_hour,
            expectation,
            consistent_multiplier: DEFAULT_CONSISTENT_MULTIPLIER,
            inconsistent_multiplier: DEFAULT_INCONSISTENT_MULTIPLIER,
        }
    }

    pub fn contains(&self, hour: f64) -> bool {
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }

    fn validate(&self) -> Result<(), GadError> {
        if !(self.start_hour >= 0.0 && self.start_hour < 24.0)
            || !(self.end_hour > 0.0 && self.end_hour <= 24.0)
            || self.start_hour == self.end_hour
        {
            return Err(GadError::invalid_config(format!(
                "TimeWindow '{}' hours must satisfy 0 <= start < 24, 0 < end <= 24, start != end; got [{}, {})",
                self.label, self.start_hour, self.end_hour
            )));
        }
        for (name, value) in [
            ("consistent_multiplier", self.consistent_multiplier),
            ("inconsistent_multiplier", self.inconsistent_multiplier),
        ] {
            require_positive("TimeWindow", name, value)?;
        }
        Ok(())
    }
}

/// Default daily glucose rhythm: stable nights, post-meal elevations.
pub fn default_time_windows() -> Vec<TimeWindow> {
    vec![
        TimeWindow::new("overnight", 0.0, 6.0, Expectation::Stable),
        TimeWindow::new("post-breakfast", 7.0, 10.0, Expectation::Elevated),
        TimeWindow::new("post-lunch", 12.0, 15.0, Expectation::Elevated),
        TimeWindow::new("post-dinner", 18.0, 21.0, Expectation::Elevated),
    ]
}

/// Context scorer settings.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct ContextConfig {
    pub neighborhood_half_window: usize,
    pub stable_ratio: f64,
    pub noisy_ratio: f64,
    pub stable_multiplier: f64,
    pub noisy_multiplier: f64,
    pub min_multiplier: f64,
    pub max_multiplier: f64,
    pub time_windows: Vec<TimeWindow>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            neighborhood_half_window: DEFAULT_NEIGHBORHOOD_HALF_WINDOW,
            stable_ratio: DEFAULT_STABLE_RATIO,
            noisy_ratio: DEFAULT_NOISY_RATIO,
            stable_multiplier: DEFAULT_STABLE_MULTIPLIER,
            noisy_multiplier: DEFAULT_NOISY_MULTIPLIER,
            min_multiplier: DEFAULT_MIN_CONTEXT_MULTIPLIER,
            max_multiplier: DEFAULT_MAX_CONTEXT_MULTIPLIER,
            time_windows: default_time_windows(),
        }
    }
}

impl ContextConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        require_at_least(
            "ContextConfig",
            "neighborhood_half_window",
            self.neighborhood_half_window,
            1,
        )?;
        for (name, value) in [
            ("stable_ratio", self.stable_ratio),
            ("noisy_ratio", self.noisy_ratio),
            ("stable_multiplier", self.stable_multiplier),
            ("noisy_multiplier", self.noisy_multiplier),
            ("min_multiplier", self.min_multiplier),
            ("max_multiplier", self.max_multiplier),
        ] {
            require_positive("ContextConfig", name, value)?;
        }
        if self.stable_ratio >= self.noisy_ratio {
            return Err(GadError::invalid_config(format!(
                "ContextConfig requires stable_ratio < noisy_ratio; got {} >= {}",
                self.stable_ratio, self.noisy_ratio
            )));
        }
        if self.min_multiplier > self.max_multiplier {
            return Err(GadError::invalid_config(format!(
                "ContextConfig requires min_multiplier <= max_multiplier; got {} > {}",
                self.min_multiplier, self.max_multiplier
            )));
        }
        for window in &self.time_windows {
            window.validate()?;
        }
        Ok(())
    }

    /// First configured window containing `hour`.
    pub fn window_at(&self, hour: f64) -> Option<&TimeWindow> {
        self.time_windows.iter().find(|w| w.contains(hour))
    }
}

/// Condition under which a constraint rule applies.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleCondition {
    Always,
    /// The flagged value lies inside the physiological normal band.
    InsideNormalBand,
    /// The flagged sample falls in a time window expecting stability.
    DuringStableWindow,
}

/// Declarative, per-method weight adjustment.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintRule {
    pub method: MethodId,
    pub condition: RuleCondition,
    pub multiplier: f64,
}

impl ConstraintRule {
    pub fn new(method: MethodId, condition: RuleCondition, multiplier: f64) -> Self {
        Self {
            method,
            condition,
            multiplier,
        }
    }
}

/// Default domain rule table.
pub fn default_constraint_rules() -> Vec<ConstraintRule> {
    vec![
        ConstraintRule::new(MethodId::Statistical, RuleCondition::InsideNormalBand, 0.5),
        ConstraintRule::new(MethodId::Pattern, RuleCondition::DuringStableWindow, 0.6),
        ConstraintRule::new(MethodId::Physiological, RuleCondition::Always, 1.5),
        ConstraintRule::new(
            MethodId::Density,
            RuleCondition::Always,
            DEFAULT_NEEDS_CORROBORATION_MULTIPLIER,
        ),
    ]
}

/// Constraint rule table and the pre-fusion score floor.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct ConstraintConfig {
    pub rules: Vec<ConstraintRule>,
    pub min_score: f64,
}

impl Default for ConstraintConfig {
    fn default() -> Self {
        Self {
            rules: default_constraint_rules(),
            min_score: DEFAULT_MIN_ADJUSTED_SCORE,
        }
    }
}

impl ConstraintConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        require_non_negative("ConstraintConfig", "min_score", self.min_score)?;
        for rule in &self.rules {
            if !(rule.multiplier.is_finite() && rule.multiplier > 0.0) {
                return Err(GadError::invalid_config(format!(
                    "ConstraintRule for {} must have a finite multiplier > 0; got {}",
                    rule.method, rule.multiplier
                )));
            }
        }
        Ok(())
    }
}

/// Static per-method trust weights.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
#[derive(Clone, Debug, PartialEq)]
pub struct MethodWeights(BTreeMap<MethodId, f64>);

impl Default for MethodWeights {
    fn default() -> Self {
        Self(BTreeMap::from([
            (MethodId::Statistical, 1.0),
            (MethodId::Pattern, 0.7),
            (MethodId::Frequency, 0.7),
            (MethodId::Density, 0.8),
            (MethodId::Physiological, 1.2),
            (MethodId::Temporal, 0.9),
        ]))
    }
}

impl MethodWeights {
    /// Weight of `method`; methods without an entry weigh 1.0.
    pub fn get(&self, method: MethodId) -> f64 {
        self.0.get(&method).copied().unwrap_or(1.0)
    }

    pub fn set(&mut self, method: MethodId, weight: f64) {
        self.0.insert(method, weight);
    }

    pub fn iter(&self) -> impl Iterator<Item = (MethodId, f64)> + '_ {
        self.0.iter().map(|(method, weight)| (*method, *weight))
    }

    pub fn validate(&self) -> Result<(), GadError> {
        for (method, weight) in self.iter() {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(GadError::invalid_config(format!(
                    "MethodWeights[{method}] must be finite and > 0; got {weight}"
                )));
            }
        }
        Ok(())
    }
}

/// Whether two methods are domain-expected to flag the same indices.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PairExpectation {
    Agree,
    Independent,
}

/// One row of the method-pair expectation table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct MethodPairRule {
    pub methods: (MethodId, MethodId),
    pub expectation: PairExpectation,
}

impl MethodPairRule {
    pub fn agree(a: MethodId, b: MethodId) -> Self {
        Self {
            methods: (a, b),
            expectation: PairExpectation::Agree,
        }
    }

    pub fn matches(&self, a: MethodId, b: MethodId) -> bool {
        self.methods == (a, b) || self.methods == (b, a)
    }
}

/// Default pairs expected to corroborate each other.
pub fn default_pair_rules() -> Vec<MethodPairRule> {
    vec![
        MethodPairRule::agree(MethodId::Statistical, MethodId::Physiological),
        MethodPairRule::agree(MethodId::Statistical, MethodId::Temporal),
        MethodPairRule::agree(MethodId::Physiological, MethodId::Temporal),
        MethodPairRule::agree(MethodId::Pattern, MethodId::Physiological),
    ]
}

/// Relationship analyzer thresholds and expectation table.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct RelationshipConfig {
    pub pair_rules: Vec<MethodPairRule>,
    pub support_overlap: f64,
    pub conflict_overlap: f64,
    pub conflict_min_size: usize,
    pub weight_step: f64,
    pub min_weight: f64,
    pub max_weight: f64,
}

impl Default for RelationshipConfig {
    fn default() -> Self {
        Self {
            pair_rules: default_pair_rules(),
            support_overlap: DEFAULT_SUPPORT_OVERLAP,
            conflict_overlap: DEFAULT_CONFLICT_OVERLAP,
            conflict_min_size: DEFAULT_CONFLICT_MIN_SIZE,
            weight_step: DEFAULT_WEIGHT_STEP,
            min_weight: DEFAULT_MIN_WEIGHT,
            max_weight: DEFAULT_MAX_WEIGHT,
        }
    }
}

impl RelationshipConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        require_unit_interval("RelationshipConfig", "support_overlap", self.support_overlap)?;
        require_unit_interval("RelationshipConfig", "conflict_overlap", self.conflict_overlap)?;
        if self.conflict_overlap >= self.support_overlap {
            return Err(GadError::invalid_config(format!(
                "RelationshipConfig requires conflict_overlap < support_overlap; got {} >= {}",
                self.conflict_overlap, self.support_overlap
            )));
        }
        require_at_least(
            "RelationshipConfig",
            "conflict_min_size",
            self.conflict_min_size,
            1,
        )?;
        require_non_negative("RelationshipConfig", "weight_step", self.weight_step)?;
        require_positive("RelationshipConfig", "min_weight", self.min_weight)?;
        if self.min_weight > self.max_weight || !self.max_weight.is_finite() {
            return Err(GadError::invalid_config(format!(
                "RelationshipConfig requires finite min_weight <= max_weight; got [{}, {}]",
                self.min_weight, self.max_weight
            )));
        }
        Ok(())
    }

    /// Declared expectation for an unordered pair.
    pub fn expectation(&self, a: MethodId, b: MethodId) -> PairExpectation {
        self.pair_rules
            .iter()
            .find(|rule| rule.matches(a, b))
            .map_or(PairExpectation::Independent, |rule| rule.expectation)
    }
}

/// Arbitration thresholds.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct FusionConfig {
    pub high_min_methods: usize,
    pub medium_min_methods: usize,
    pub low_min_score: f64,
    /// Methods whose candidates only count when another method agrees.
    pub corroboration_required: Vec<MethodId>,
    /// Applied to a corroborated contribution of such a method.
    pub corroboration_bonus: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            high_min_methods: DEFAULT_HIGH_MIN_METHODS,
            medium_min_methods: DEFAULT_MEDIUM_MIN_METHODS,
            low_min_score: DEFAULT_LOW_MIN_SCORE,
            corroboration_required: vec![MethodId::Density],
            corroboration_bonus: 1.0 / DEFAULT_NEEDS_CORROBORATION_MULTIPLIER,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), GadError> {
        if self.medium_min_methods < 2 || self.high_min_methods <= self.medium_min_methods {
            return Err(GadError::invalid_config(format!(
                "FusionConfig requires 2 <= medium_min_methods < high_min_methods; got medium={}, high={}",
                self.medium_min_methods, self.high_min_methods
            )));
        }
        require_non_negative("FusionConfig", "low_min_score", self.low_min_score)?;
        require_positive("FusionConfig", "corroboration_bonus", self.corroboration_bonus)?;
        Ok(())
    }

    pub fn requires_corroboration(&self, method: MethodId) -> bool {
        self.corroboration_required.contains(&method)
    }
}

/// Complete configuration of one analysis run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, PartialEq)]
pub struct AnalysisConfig {
    /// Enabled detectors.
    pub methods: Vec<MethodId>,
    pub statistical: StatisticalConfig,
    pub pattern: PatternConfig,
    pub frequency: FrequencyConfig,
    pub density: DensityConfig,
    pub physiological: PhysiologicalConfig,
    pub temporal: TemporalConfig,
    pub context: ContextConfig,
    pub constraints: ConstraintConfig,
    pub weights: MethodWeights,
    pub relationships: RelationshipConfig,
    pub fusion: FusionConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            methods: MethodId::ALL.to_vec(),
            statistical: StatisticalConfig::default(),
            pattern: PatternConfig::default(),
            frequency: FrequencyConfig::default(),
            density: DensityConfig::default(),
            physiological: PhysiologicalConfig::default(),
            temporal: TemporalConfig::default(),
            context: ContextConfig::default(),
            constraints: ConstraintConfig::default(),
            weights: MethodWeights::default(),
            relationships: RelationshipConfig::default(),
            fusion: FusionConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Validates every component configuration.
    pub fn validate(&self) -> Result<(), GadError> {
        self.statistical.validate()?;
        self.pattern.validate()?;
        self.frequency.validate()?;
        self.density.validate()?;
        self.physiological.validate()?;
        self.temporal.validate()?;
        self.context.validate()?;
        self.constraints.validate()?;
        self.weights.validate()?;
        self.relationships.validate()?;
        self.fusion.validate()
    }

    pub fn is_enabled(&self, method: MethodId) -> bool {
        self.methods.contains(&method)
    }

    /// Enabled methods, deduplicated, in canonical order.
    pub fn enabled_methods(&self) -> Vec<MethodId> {
        MethodId::ALL
            .into_iter()
            .filter(|method| self.is_enabled(*method))
            .collect()
    }

    /// Returns a copy with `method` disabled.
    pub fn without(mut self, method: MethodId) -> Self {
        self.methods.retain(|m| *m != method);
        self
    }

    /// Returns a copy with exactly `methods` enabled.
    pub fn with_methods(mut self, methods: &[MethodId]) -> Self {
        self.methods = methods.to_vec();
        self
    }
}

fn require_finite(owner: &str, name: &str, value: f64) -> Result<(), GadError> {
    if !value.is_finite() {
        return Err(GadError::invalid_config(format!(
            "{owner}.{name} must be finite; got {value}"
        )));
    }
    Ok(())
}

fn require_positive(owner: &str, name: &str, value: f64) -> Result<(), GadError> {
    if !(value.is_finite() && value > 0.0) {
        return Err(GadError::invalid_config(format!(
            "{owner}.{name} must be finite and > 0.0; got {value}"
        )));
    }
    Ok(())
}

fn require_non_negative(owner: &str, name: &str, value: f64) -> Result<(), GadError> {
    if !(value.is_finite() && value >= 0.0) {
        return Err(GadError::invalid_config(format!(
            "{owner}.{name} must be finite and >= 0.0; got {value}"
        )));
    }
    Ok(())
}

fn require_unit_interval(owner: &str, name: &str, value: f64) -> Result<(), GadError> {
    if !(value > 0.0 && value <= 1.0) {
        return Err(GadError::invalid_config(format!(
            "{owner}.{name} must be in (0, 1]; got {value}"
        )));
    }
    Ok(())
}

fn require_at_least(owner: &str, name: &str, value: usize, min: usize) -> Result<(), GadError> {
    if value < min {
        return Err(GadError::invalid_config(format!(
            "{owner}.{name} must be >= {min}; got {value}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{
        AnalysisConfig, ContextConfig, DensityConfig, Expectation, FrequencyConfig, FusionConfig,
        MethodWeights, PairExpectation, PhysiologicalConfig, RelationshipConfig, TemporalConfig,
        TimeWindow,
    };
    use crate::MethodId;

    #[test]
    fn default_config_is_valid_and_enables_all_methods() {
        let config = AnalysisConfig::default();
        config.validate().expect("defaults must validate");
        assert_eq!(config.enabled_methods(), MethodId::ALL.to_vec());
    }

    #[test]
    fn defaults_match_documented_thresholds() {
        let config = AnalysisConfig::default();
        assert_eq!(config.statistical.z_threshold, 2.5);
        assert_eq!(config.statistical.iqr_multiplier, 1.5);
        assert_eq!(config.statistical.mad_threshold, 3.5);
        assert_eq!(config.pattern.min_flat_run, 6);
        assert_eq!(config.frequency.window_hf_fraction, 0.20);
        assert_eq!(config.frequency.signal_hf_fraction, 0.15);
        assert_eq!(config.density.contamination, 0.1);
        assert_eq!(config.density.min_len, 20);
        assert_eq!(config.temporal.local_half_window, 7);
        assert_eq!(config.temporal.local_min_len, 11);
        assert_eq!(config.constraints.min_score, 0.4);
        assert_eq!(config.relationships.support_overlap, 0.7);
    }

    #[test]
    fn without_and_with_methods_control_enabled_set() {
        let config = AnalysisConfig::default().without(MethodId::Density);
        assert!(!config.is_enabled(MethodId::Density));
        assert_eq!(config.enabled_methods().len(), 5);

        let config = AnalysisConfig::default()
            .with_methods(&[MethodId::Temporal, MethodId::Statistical, MethodId::Temporal]);
        assert_eq!(
            config.enabled_methods(),
            vec![MethodId::Statistical, MethodId::Temporal]
        );
    }

    #[test]
    fn physiological_band_must_be_ordered() {
        let config = PhysiologicalConfig {
            normal_low: 200.0,
            ..PhysiologicalConfig::default()
        };
        let err = config.validate().expect_err("normal_low > normal_high must fail");
        assert!(err.to_string().contains("normal_low < normal_high"));

        let defaults = PhysiologicalConfig::default();
        assert!(defaults.in_normal_band(70.0));
        assert!(defaults.in_normal_band(180.0));
        assert!(!defaults.in_normal_band(181.0));
    }

    #[test]
    fn invalid_component_values_are_rejected() {
        let err = FrequencyConfig {
            hf_cutoff: 0.5,
            ..FrequencyConfig::default()
        }
        .validate()
        .expect_err("cutoff at nyquist must fail");
        assert!(err.to_string().contains("hf_cutoff"));

        let err = DensityConfig {
            contamination: 0.0,
            ..DensityConfig::default()
        }
        .validate()
        .expect_err("zero contamination must fail");
        assert!(err.to_string().contains("contamination"));

        let err = TemporalConfig {
            expected_interval_ns: Some(0),
            ..TemporalConfig::default()
        }
        .validate()
        .expect_err("zero interval must fail");
        assert!(err.to_string().contains("expected_interval_ns"));

        let err = FusionConfig {
            medium_min_methods: 3,
            ..FusionConfig::default()
        }
        .validate()
        .expect_err("medium == high must fail");
        assert!(err.to_string().contains("medium_min_methods"));

        let mut weights = MethodWeights::default();
        weights.set(MethodId::Pattern, f64::NAN);
        let err = weights.validate().expect_err("nan weight must fail");
        assert!(err.to_string().contains("MethodWeights[pattern]"));

        let err = ContextConfig {
            stable_ratio: 2.0,
            ..ContextConfig::default()
        }
        .validate()
        .expect_err("stable ratio above noisy must fail");
        assert!(err.to_string().contains("stable_ratio < noisy_ratio"));
    }

    #[test]
    fn time_windows_wrap_past_midnight() {
        let late = TimeWindow::new("late", 22.0, 2.0, Expectation::Stable);
        assert!(late.contains(23.5));
        assert!(late.contains(1.0));
        assert!(!late.contains(2.0));
        assert!(!late.contains(12.0));

        let config = ContextConfig::default();
        assert_eq!(
            config.window_at(3.0).map(|w| w.expectation),
            Some(Expectation::Stable)
        );
        assert_eq!(
            config.window_at(13.0).map(|w| w.expectation),
            Some(Expectation::Elevated)
        );
        assert!(config.window_at(16.0).is_none());
    }

    #[test]
    fn pair_expectations_are_symmetric() {
        let config = RelationshipConfig::default();
        assert_eq!(
            config.expectation(MethodId::Physiological, MethodId::Statistical),
            PairExpectation::Agree
        );
        assert_eq!(
            config.expectation(MethodId::Statistical, MethodId::Physiological),
            PairExpectation::Agree
        );
        assert_eq!(
            config.expectation(MethodId::Density, MethodId::Frequency),
            PairExpectation::Independent
        );
    }

    #[test]
    fn unknown_weights_default_to_one() {
        let weights = MethodWeights(Default::default());
        assert_eq!(weights.get(MethodId::Temporal), 1.0);
        assert_eq!(MethodWeights::default().get(MethodId::Physiological), 1.2);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn config_serde_roundtrip_and_partial_documents() {
        let config = AnalysisConfig::default();
        let encoded = serde_json::to_string(&config).expect("serialize config");
        let decoded: AnalysisConfig = serde_json::from_str(&encoded).expect("deserialize config");
        assert_eq!(decoded, config);

        let raw = r#"{"statistical": {"z_threshold": 3.0}, "methods": ["temporal"]}"#;
        let partial: AnalysisConfig =
            serde_json::from_str(raw).expect("partial config should fill defaults");
        assert_eq!(partial.statistical.z_threshold, 3.0);
        assert_eq!(partial.statistical.iqr_multiplier, 1.5);
        assert_eq!(partial.methods, vec![MethodId::Temporal]);
    }
}
