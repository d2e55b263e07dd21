// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GadError;

/// One timestamped reading as delivered by the data source.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Sample {
    /// Unix nanoseconds.
    pub timestamp_ns: i64,
    pub value: f64,
}

/// Time index metadata for a [`Signal`].
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimeIndex {
    /// Implicit sample index (0..n-1); no true timestamps.
    None,
    /// Uniformly sampled time index in Unix nanoseconds.
    Uniform { t0_ns: i64, dt_ns: i64 },
    /// Explicit timestamps in Unix nanoseconds, one per sample.
    Explicit(Vec<i64>),
}

/// Ordered, time-ascending sequence of readings.
///
/// Only constructible through validating constructors, so every `Signal`
/// handed to a detector already satisfies the input contract.
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    values: Vec<f64>,
    time: TimeIndex,
}

impl Signal {
    /// Constructs a validated `Signal`.
    pub fn new(values: Vec<f64>, time: TimeIndex) -> Result<Self, GadError> {
        let n = values.len();
        if n == 0 {
            return Err(GadError::malformed_signal("signal must contain >= 1 sample"));
        }

        if let Some((idx, value)) = values
            .iter()
            .copied()
            .enumerate()
            .find(|(_, v)| !v.is_finite())
        {
            return Err(GadError::malformed_signal(format!(
                "value at index {idx} is not finite: {value}"
            )));
        }

        match &time {
            TimeIndex::None => {}
            TimeIndex::Uniform { t0_ns, dt_ns } => {
                if *dt_ns <= 0 {
                    return Err(GadError::malformed_signal(format!(
                        "uniform time index requires dt_ns > 0, got {dt_ns}"
                    )));
                }
                uniform_timestamp(n - 1, *t0_ns, *dt_ns)?;
            }
            TimeIndex::Explicit(timestamps) => {
                if timestamps.len() != n {
                    return Err(GadError::malformed_signal(format!(
                        "explicit time index length mismatch: got {}, expected n={n}",
                        timestamps.len()
                    )));
                }
                if let Some(pos) = timestamps.windows(2).position(|pair| pair[1] < pair[0]) {
                    return Err(GadError::malformed_signal(format!(
                        "timestamps must be non-decreasing: index {} ({}) precedes index {} ({})",
                        pos,
                        timestamps[pos],
                        pos + 1,
                        timestamps[pos + 1]
                    )));
                }
            }
        }

        Ok(Self { values, time })
    }

    /// Signal without true timestamps.
    pub fn from_values(values: Vec<f64>) -> Result<Self, GadError> {
        Self::new(values, TimeIndex::None)
    }

    /// Evenly spaced signal starting at `t0_ns` with step `dt_ns`.
    pub fn uniform(values: Vec<f64>, t0_ns: i64, dt_ns: i64) -> Result<Self, GadError> {
        Self::new(values, TimeIndex::Uniform { t0_ns, dt_ns })
    }

    /// Builds a signal from timestamped samples, keeping their order.
    pub fn from_samples(samples: &[Sample]) -> Result<Self, GadError> {
        let values = samples.iter().map(|s| s.value).collect();
        let timestamps = samples.iter().map(|s| s.timestamp_ns).collect();
        Self::new(values, TimeIndex::Explicit(timestamps))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false for a constructed signal; kept for slice-like ergonomics.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn time(&self) -> &TimeIndex {
        &self.time
    }

    /// Returns true when the signal carries true timestamps.
    pub fn has_timestamps(&self) -> bool {
        !matches!(self.time, TimeIndex::None)
    }

    /// Timestamp of sample `t` in Unix nanoseconds, if the signal has one.
    pub fn timestamp_ns(&self, t: usize) -> Option<i64> {
        if t >= self.values.len() {
            return None;
        }
        match &self.time {
            TimeIndex::None => None,
            // Overflow of the last timestamp was rejected at construction.
            TimeIndex::Uniform { t0_ns, dt_ns } => uniform_timestamp(t, *t0_ns, *dt_ns).ok(),
            TimeIndex::Explicit(ts) => Some(ts[t]),
        }
    }

    /// Sample `t` with its timestamp, if the signal has timestamps.
    pub fn sample(&self, t: usize) -> Option<Sample> {
        let timestamp_ns = self.timestamp_ns(t)?;
        Some(Sample {
            timestamp_ns,
            value: self.values[t],
        })
    }

    /// Consecutive inter-sample gaps in nanoseconds (`n - 1` entries).
    pub fn gaps_ns(&self) -> Option<Vec<i64>> {
        if !self.has_timestamps() {
            return None;
        }
        let timestamps: Vec<i64> = (0..self.len())
            .filter_map(|t| self.timestamp_ns(t))
            .collect();
        Some(
            timestamps
                .windows(2)
                .map(|pair| pair[1].saturating_sub(pair[0]))
                .collect(),
        )
    }
}

fn uniform_timestamp(t: usize, t0_ns: i64, dt_ns: i64) -> Result<i64, GadError> {
    let t_i64 = i64::try_from(t).map_err(|_| {
        GadError::malformed_signal(format!("time index overflow: t={t} does not fit into i64"))
    })?;
    let delta = dt_ns.checked_mul(t_i64).ok_or_else(|| {
        GadError::malformed_signal(format!("uniform timestamp overflow: dt_ns={dt_ns}, t={t}"))
    })?;
    t0_ns.checked_add(delta).ok_or_else(|| {
        GadError::malformed_signal(format!(
            "uniform timestamp overflow: t0_ns={t0_ns}, delta={delta}"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::{Sample, Signal, TimeIndex};

    #[test]
    fn from_values_has_no_timestamps() {
        let signal = Signal::from_values(vec![1.0, 2.0, 3.0]).expect("valid signal");
        assert_eq!(signal.len(), 3);
        assert!(!signal.is_empty());
        assert!(!signal.has_timestamps());
        assert_eq!(signal.timestamp_ns(0), None);
        assert_eq!(signal.gaps_ns(), None);
        assert_eq!(signal.sample(1), None);
    }

    #[test]
    fn rejects_empty_signal() {
        let err = Signal::from_values(vec![]).expect_err("empty must fail");
        assert!(err.to_string().contains(">= 1 sample"));
        assert!(err.is_fatal());
    }

    #[test]
    fn rejects_non_finite_values() {
        let err = Signal::from_values(vec![1.0, f64::NAN]).expect_err("nan must fail");
        assert!(err.to_string().contains("index 1 is not finite"));

        let err = Signal::from_values(vec![f64::INFINITY]).expect_err("inf must fail");
        assert!(err.to_string().contains("index 0 is not finite"));
    }

    #[test]
    fn uniform_timestamps_are_derived_from_step() {
        let signal = Signal::uniform(vec![1.0, 2.0, 3.0], 1_000, 5).expect("valid signal");
        assert_eq!(signal.timestamp_ns(0), Some(1_000));
        assert_eq!(signal.timestamp_ns(2), Some(1_010));
        assert_eq!(signal.timestamp_ns(3), None);
        assert_eq!(signal.gaps_ns(), Some(vec![5, 5]));
    }

    #[test]
    fn rejects_uniform_with_non_positive_step() {
        let zero = Signal::uniform(vec![1.0, 2.0], 0, 0).expect_err("dt=0 must fail");
        assert!(zero.to_string().contains("dt_ns > 0"));
        let neg = Signal::uniform(vec![1.0, 2.0], 0, -1).expect_err("dt<0 must fail");
        assert!(neg.to_string().contains("dt_ns > 0"));
    }

    #[test]
    fn rejects_uniform_timestamp_overflow() {
        let err = Signal::uniform(vec![1.0, 2.0], i64::MAX - 1, 2).expect_err("overflow");
        assert!(err.to_string().contains("uniform timestamp overflow"));
    }

    #[test]
    fn explicit_timestamps_must_match_length_and_order() {
        let err = Signal::new(vec![1.0, 2.0, 3.0], TimeIndex::Explicit(vec![1, 2]))
            .expect_err("length mismatch must fail");
        assert!(err.to_string().contains("length mismatch"));

        let err = Signal::new(vec![1.0, 2.0, 3.0], TimeIndex::Explicit(vec![1, 3, 2]))
            .expect_err("decreasing timestamps must fail");
        assert!(err.to_string().contains("non-decreasing"));
    }

    #[test]
    fn equal_consecutive_timestamps_are_accepted() {
        let signal = Signal::new(vec![1.0, 2.0, 3.0], TimeIndex::Explicit(vec![10, 10, 20]))
            .expect("non-decreasing timestamps are valid");
        assert_eq!(signal.gaps_ns(), Some(vec![0, 10]));
    }

    #[test]
    fn from_samples_preserves_order_and_timestamps() {
        let samples = [
            Sample {
                timestamp_ns: 7,
                value: 100.0,
            },
            Sample {
                timestamp_ns: 11,
                value: 101.0,
            },
        ];
        let signal = Signal::from_samples(&samples).expect("valid samples");
        assert_eq!(signal.values(), &[100.0, 101.0]);
        assert_eq!(signal.sample(1), Some(samples[1]));
        assert_eq!(signal.time(), &TimeIndex::Explicit(vec![7, 11]));
    }
}
