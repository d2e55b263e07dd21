// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{AnalysisConfig, DetectorOutput, Signal, TimeIndex};
use gad_detectors::DetectorBank;
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, FileFailurePersistence};

const MIN_PROPTEST_CASES: u32 = 1000;
const FIVE_MINUTES_NS: i64 = 300_000_000_000;

fn proptest_cases() -> u32 {
    std::env::var("PROPTEST_CASES")
        .ok()
        .and_then(|raw| raw.parse::<u32>().ok())
        .map(|parsed| parsed.max(MIN_PROPTEST_CASES))
        .unwrap_or(MIN_PROPTEST_CASES)
}

fn assert_output_invariants(outputs: &[DetectorOutput], n: usize) {
    let mut previous_method = None;
    for output in outputs {
        assert!(
            previous_method < Some(output.method),
            "outputs must be ordered by method"
        );
        previous_method = Some(output.method);
        for pair in output.candidates.windows(2) {
            assert!(
                pair[0].index < pair[1].index,
                "{} candidates must be strictly increasing",
                output.method
            );
        }
        for candidate in &output.candidates {
            assert_eq!(candidate.method, output.method);
            assert!(candidate.index < n, "index {} out of range", candidate.index);
            assert!(
                candidate.raw_score.is_finite() && candidate.raw_score >= 0.0,
                "{} produced raw score {}",
                output.method,
                candidate.raw_score
            );
        }
        if !output.status.is_completed() {
            assert!(output.candidates.is_empty());
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: proptest_cases(),
        max_shrink_iters: 1024,
        failure_persistence: Some(Box::new(FileFailurePersistence::Direct("proptest-regressions/tests/detector_invariants.txt"))),
        .. ProptestConfig::default()
    })]

    #[test]
    fn bank_outputs_are_well_formed_and_deterministic(
        values in prop::collection::vec(30.0f64..450.0, 1..128),
        timestamped in any::<bool>(),
    ) {
        let n = values.len();
        let time = if timestamped {
            TimeIndex::Uniform { t0_ns: 0, dt_ns: FIVE_MINUTES_NS }
        } else {
            TimeIndex::None
        };
        let signal = Signal::new(values, time).expect("generated signal is valid");
        let bank = DetectorBank::from_config(&AnalysisConfig::default()).expect("default config");

        let first = bank.detect_all(&signal).expect("detectors never reject a valid signal");
        let second = bank.detect_all(&signal).expect("detectors never reject a valid signal");
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.len(), 6);
        assert_output_invariants(&first, n);
    }

    #[test]
    fn irregular_timestamps_keep_outputs_in_range(
        steps in prop::collection::vec(0i64..3_600, 2..64),
        base in 70.0f64..180.0,
    ) {
        let mut timestamps = Vec::with_capacity(steps.len());
        let mut now = 0i64;
        for step in &steps {
            now += step * 1_000_000_000;
            timestamps.push(now);
        }
        let values: Vec<f64> = (0..steps.len()).map(|i| base + (i % 9) as f64).collect();
        let n = values.len();
        let signal = Signal::new(values, TimeIndex::Explicit(timestamps)).expect("valid signal");
        let bank = DetectorBank::from_config(&AnalysisConfig::default()).expect("default config");
        let outputs = bank.detect_all(&signal).expect("detect_all");
        assert_output_invariants(&outputs, n);
    }

    #[test]
    fn constant_signals_yield_no_statistical_or_density_flags(
        level in 20.0f64..600.0,
        n in 20usize..96,
    ) {
        let signal = Signal::from_values(vec![level; n]).expect("valid signal");
        let bank = DetectorBank::from_config(&AnalysisConfig::default()).expect("default config");
        let outputs = bank.detect_all(&signal).expect("detect_all");
        for output in &outputs {
            if matches!(
                output.method,
                gad_core::MethodId::Statistical
                    | gad_core::MethodId::Density
                    | gad_core::MethodId::Frequency
                    | gad_core::MethodId::Temporal
            ) {
                prop_assert!(
                    output.candidates.is_empty(),
                    "{} flagged a constant signal",
                    output.method
                );
            }
        }
    }
}
