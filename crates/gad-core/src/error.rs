// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use thiserror::Error;

/// Errors surfaced to callers of the ensemble.
///
/// Insufficient data is deliberately absent: detectors degrade to an empty
/// candidate set instead of failing.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum GadError {
    /// The input contract was violated before entering the core.
    #[error("malformed signal: {0}")]
    MalformedSignal(String),
    /// A configuration or side-channel value is out of its legal range.
    #[error("invalid config: {0}")]
    InvalidConfig(String),
    /// A numeric computation produced a non-finite or undefined value.
    #[error("numerical issue: {0}")]
    NumericalIssue(String),
}

impl GadError {
    pub fn malformed_signal(message: impl Into<String>) -> Self {
        Self::MalformedSignal(message.into())
    }

    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig(message.into())
    }

    pub fn numerical_issue(message: impl Into<String>) -> Self {
        Self::NumericalIssue(message.into())
    }

    /// Returns true for errors that must propagate out of a run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::MalformedSignal(_) | Self::InvalidConfig(_))
    }
}
