// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{GadError, Signal};

const NANOS_PER_SECOND: i64 = 1_000_000_000;
const SECONDS_PER_DAY: i64 = 86_400;
const MAX_UTC_OFFSET_MINUTES: i32 = 18 * 60;

/// Side-channel context supplied alongside a signal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AnalysisContext {
    /// Offset applied to timestamps when deriving local time of day.
    pub utc_offset_minutes: i32,
    /// Explicit local hour of day (`[0, 24)`) per sample; overrides timestamps.
    pub hours: Option<Vec<f64>>,
}

impl AnalysisContext {
    pub fn with_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.utc_offset_minutes = minutes;
        self
    }

    pub fn with_hours(mut self, hours: Vec<f64>) -> Self {
        self.hours = Some(hours);
        self
    }

    /// Checks the context against the signal it accompanies.
    pub fn validate(&self, signal: &Signal) -> Result<(), GadError> {
        if self.utc_offset_minutes.abs() > MAX_UTC_OFFSET_MINUTES {
            return Err(GadError::invalid_config(format!(
                "AnalysisContext.utc_offset_minutes must be within +/-{MAX_UTC_OFFSET_MINUTES}; got {}",
                self.utc_offset_minutes
            )));
        }
        if let Some(hours) = &self.hours {
            if hours.len() != signal.len() {
                return Err(GadError::invalid_config(format!(
                    "AnalysisContext.hours length mismatch: got {}, expected n={}",
                    hours.len(),
                    signal.len()
                )));
            }
            if let Some((idx, hour)) = hours
                .iter()
                .copied()
                .enumerate()
                .find(|(_, h)| !h.is_finite() || *h < 0.0 || *h >= 24.0)
            {
                return Err(GadError::invalid_config(format!(
                    "AnalysisContext.hours[{idx}] must be in [0, 24); got {hour}"
                )));
            }
        }
        Ok(())
    }

    /// Local hour of day for sample `t`, if it can be determined.
    pub fn hour_of_day(&self, signal: &Signal, t: usize) -> Option<f64> {
        if let Some(hours) = &self.hours {
            return hours.get(t).copied();
        }
        let ts_ns = signal.timestamp_ns(t)?;
        let seconds = ts_ns.div_euclid(NANOS_PER_SECOND) + i64::from(self.utc_offset_minutes) * 60;
        let second_of_day = seconds.rem_euclid(SECONDS_PER_DAY);
        Some(second_of_day as f64 / 3600.0)
    }
}
