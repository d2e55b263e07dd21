// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::{
    DensityDetector, FrequencyDetector, PatternDetector, PhysiologicalDetector,
    StatisticalDetector, TemporalDetector,
};
use gad_core::{AnalysisConfig, Detector, DetectorOutput, GadError, MethodId, Signal};
#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, warn};

/// The set of enabled detectors, run independently over one signal.
pub struct DetectorBank {
    detectors: Vec<Box<dyn Detector>>,
}

impl std::fmt::Debug for DetectorBank {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorBank")
            .field("methods", &self.methods())
            .finish()
    }
}

impl DetectorBank {
    /// Builds the enabled detectors from `config`, in canonical method order.
    pub fn from_config(config: &AnalysisConfig) -> Result<Self, GadError> {
        let mut detectors: Vec<Box<dyn Detector>> = vec![];
        for method in config.enabled_methods() {
            let detector: Box<dyn Detector> = match method {
                MethodId::Statistical => {
                    Box::new(StatisticalDetector::new(config.statistical.clone())?)
                }
                MethodId::Pattern => Box::new(PatternDetector::new(config.pattern.clone())?),
                MethodId::Frequency => Box::new(FrequencyDetector::new(config.frequency.clone())?),
                MethodId::Density => Box::new(DensityDetector::new(config.density.clone())?),
                MethodId::Physiological => {
                    Box::new(PhysiologicalDetector::new(config.physiological.clone())?)
                }
                MethodId::Temporal => Box::new(TemporalDetector::new(config.temporal.clone())?),
            };
            detectors.push(detector);
        }
        Ok(Self { detectors })
    }

    /// Builds a bank from arbitrary detectors; outputs are still reported in
    /// method order.
    pub fn from_detectors(detectors: Vec<Box<dyn Detector>>) -> Self {
        Self { detectors }
    }

    pub fn methods(&self) -> Vec<MethodId> {
        self.detectors.iter().map(|d| d.method()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }

    /// Runs every detector over `signal`.
    ///
    /// A failing detector is degraded to an empty `Failed` output; only
    /// fatal errors (malformed signal, invalid config) are propagated.
    pub fn detect_all(&self, signal: &Signal) -> Result<Vec<DetectorOutput>, GadError> {
        #[cfg(feature = "rayon")]
        let results: Vec<(MethodId, Result<DetectorOutput, GadError>)> = self
            .detectors
            .par_iter()
            .map(|detector| (detector.method(), detector.detect(signal)))
            .collect();

        #[cfg(not(feature = "rayon"))]
        let results: Vec<(MethodId, Result<DetectorOutput, GadError>)> = self
            .detectors
            .iter()
            .map(|detector| (detector.method(), detector.detect(signal)))
            .collect();

        let mut outputs = Vec::with_capacity(results.len());
        for (method, result) in results {
            let output = match result {
                Ok(output) => output,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(%method, error = %err, "detector failed; continuing without it");
                    DetectorOutput::failed(method, err.to_string())
                }
            };
            if !output.status.is_completed() {
                debug!(%method, status = %output.status, "detector degraded to empty output");
            }
            outputs.push(output);
        }
        outputs.sort_by_key(|output| output.method);
        Ok(outputs)
    }
}
