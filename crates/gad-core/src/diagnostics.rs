// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::MethodId;
use std::fmt;

/// Diagnostics schema version for analysis run metadata.
pub const DIAGNOSTICS_SCHEMA_VERSION: u32 = 1;

/// How a single detector pass ended.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DetectorStatus {
    Completed,
    /// Too few samples for the algorithm; output is empty.
    InsufficientData { required: usize, actual: usize },
    /// A numeric guard (zero variance, zero energy) skipped the whole test.
    Degenerate { reason: String },
    /// The detector failed and was degraded to empty by the bank.
    Failed { reason: String },
}

impl DetectorStatus {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for DetectorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::InsufficientData { required, actual } => {
                write!(f, "insufficient data (required {required}, got {actual})")
            }
            Self::Degenerate { reason } => write!(f, "degenerate: {reason}"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// Per-detector summary captured during a run.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DetectorReport {
    pub method: MethodId,
    pub status: DetectorStatus,
    pub candidates: usize,
    pub notes: Vec<String>,
}

/// Structured diagnostics captured from an analysis run.
///
/// Contains no wall-clock data so repeated runs compare equal.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, PartialEq)]
pub struct RunDiagnostics {
    pub n: usize,
    pub has_timestamps: bool,
    pub schema_version: u32,
    pub engine_version: Option<String>,
    pub detectors: Vec<DetectorReport>,
    pub candidates_considered: usize,
    pub candidates_below_floor: usize,
    pub candidates_uncorroborated: usize,
    pub notes: Vec<String>,
    pub warnings: Vec<String>,
}

impl Default for RunDiagnostics {
    fn default() -> Self {
        Self {
            n: 0,
            has_timestamps: false,
            schema_version: DIAGNOSTICS_SCHEMA_VERSION,
            engine_version: Some(env!("CARGO_PKG_VERSION").to_string()),
            detectors: vec![],
            candidates_considered: 0,
            candidates_below_floor: 0,
            candidates_uncorroborated: 0,
            notes: vec![],
            warnings: vec![],
        }
    }
}

impl RunDiagnostics {
    pub fn detector(&self, method: MethodId) -> Option<&DetectorReport> {
        self.detectors.iter().find(|report| report.method == method)
    }
}

#[cfg(test)]
mod tests {
    use super::{DIAGNOSTICS_SCHEMA_VERSION, DetectorReport, DetectorStatus, RunDiagnostics};
    use crate::MethodId;

    #[test]
    fn diagnostics_default_sets_schema_and_engine_version() {
        let diagnostics = RunDiagnostics::default();
        assert_eq!(diagnostics.schema_version, DIAGNOSTICS_SCHEMA_VERSION);
        assert_eq!(
            diagnostics.engine_version,
            Some(env!("CARGO_PKG_VERSION").to_string())
        );
        assert_eq!(diagnostics.n, 0);
        assert!(diagnostics.detectors.is_empty());
        assert!(diagnostics.notes.is_empty());
        assert!(diagnostics.warnings.is_empty());
    }

    #[test]
    fn detector_lookup_by_method() {
        let diagnostics = RunDiagnostics {
            detectors: vec![DetectorReport {
                method: MethodId::Density,
                status: DetectorStatus::InsufficientData {
                    required: 20,
                    actual: 12,
                },
                candidates: 0,
                notes: vec![],
            }],
            ..RunDiagnostics::default()
        };
        let report = diagnostics.detector(MethodId::Density).expect("density report");
        assert!(!report.status.is_completed());
        assert_eq!(
            report.status.to_string(),
            "insufficient data (required 20, got 12)"
        );
        assert!(diagnostics.detector(MethodId::Pattern).is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn diagnostics_serde_roundtrip() {
        let diagnostics = RunDiagnostics {
            n: 42,
            has_timestamps: true,
            detectors: vec![DetectorReport {
                method: MethodId::Frequency,
                status: DetectorStatus::Degenerate {
                    reason: "zero spectral energy".to_string(),
                },
                candidates: 0,
                notes: vec!["skipped windowed pass".to_string()],
            }],
            warnings: vec!["w".to_string()],
            ..RunDiagnostics::default()
        };
        let encoded = serde_json::to_string(&diagnostics).expect("serialize diagnostics");
        let decoded: RunDiagnostics =
            serde_json::from_str(&encoded).expect("deserialize diagnostics");
        assert_eq!(decoded, diagnostics);
    }
}
