// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Independent anomaly detectors over a glucose [`gad_core::Signal`].
//!
//! Each detector implements [`gad_core::Detector`]: a pure function of the
//! signal returning per-index candidates. [`DetectorBank`] runs the enabled
//! set (in parallel with the `rayon` feature) and contains failures.

pub mod bank;
pub mod density;
pub mod frequency;
pub mod pattern;
pub mod physiological;
pub mod spectrum;
pub mod stats;
pub mod statistical;
pub mod temporal;

pub use bank::DetectorBank;
pub use density::DensityDetector;
pub use frequency::FrequencyDetector;
pub use pattern::PatternDetector;
pub use physiological::PhysiologicalDetector;
pub use statistical::StatisticalDetector;
pub use temporal::TemporalDetector;

/// Detector implementations namespace.
pub fn crate_name() -> &'static str {
    let _ = gad_core::crate_name();
    "gad-detectors"
}
