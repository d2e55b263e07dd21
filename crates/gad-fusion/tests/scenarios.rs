// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gad_core::{AnalysisConfig, AnalysisContext, ConfidenceTier, MethodId, Signal};
use gad_fusion::{Analyzer, run};
use std::f64::consts::TAU;

const FIVE_MINUTES_NS: i64 = 300_000_000_000;

fn stuck_sensor_with_spike() -> Signal {
    let mut values = vec![100.0; 200];
    values[150] = 400.0;
    Signal::uniform(values, 0, FIVE_MINUTES_NS).expect("valid signal")
}

fn sine_with_floor_violation() -> Signal {
    let mut values: Vec<f64> = (0..200)
        .map(|i| 120.0 + 20.0 * (TAU * i as f64 / 100.0).sin())
        .collect();
    values[80] = 10.0;
    Signal::from_values(values).expect("valid signal")
}

#[test]
fn isolated_spike_is_high_and_stuck_run_is_at_least_medium() {
    let signal = stuck_sensor_with_spike();
    let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
    result.validate(signal.len()).expect("well-formed output");

    let spike = result.anomaly_at(150).expect("spike is reported");
    assert_eq!(spike.confidence_tier, ConfidenceTier::High);
    for method in [
        MethodId::Statistical,
        MethodId::Physiological,
        MethodId::Temporal,
    ] {
        assert!(
            spike.supporting_methods.contains(&method),
            "{method} should support the spike"
        );
    }
    assert_eq!(result.fused_anomalies[0].index, 150);

    for index in 40..=60 {
        let anomaly = result
            .anomaly_at(index)
            .unwrap_or_else(|| panic!("flat index {index} should be reported"));
        assert!(anomaly.confidence_tier >= ConfidenceTier::Medium);
        assert!(anomaly.supporting_methods.contains(&MethodId::Pattern));
        assert!(anomaly.supporting_methods.contains(&MethodId::Physiological));
    }
}

#[test]
fn single_floor_violation_is_the_only_anomaly() {
    let signal = sine_with_floor_violation();
    let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
    result.validate(signal.len()).expect("well-formed output");

    assert_eq!(result.fused_anomalies.len(), 1, "{:?}", result.fused_anomalies);
    let anomaly = &result.fused_anomalies[0];
    assert_eq!(anomaly.index, 80);
    assert!(anomaly.confidence_tier >= ConfidenceTier::Medium);
    assert!(anomaly.supporting_methods.contains(&MethodId::Physiological));
    assert!(anomaly.supporting_methods.contains(&MethodId::Statistical));
}

#[test]
fn density_alone_is_never_reported() {
    let signal = sine_with_floor_violation();
    let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
    assert!(result.per_method_counts[&MethodId::Density] > 0);
    assert!(result.diagnostics.candidates_uncorroborated > 0);
    for anomaly in &result.fused_anomalies {
        assert!(
            anomaly.supporting_methods.len() > 1
                || !anomaly.supporting_methods.contains(&MethodId::Density)
        );
    }
}

#[test]
fn constant_signal_has_no_high_confidence_anomalies() {
    for level in [15.0, 55.0, 100.0, 450.0, 650.0] {
        for n in [20, 64, 150] {
            let signal = Signal::from_values(vec![level; n]).expect("valid signal");
            let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
            assert_eq!(
                result.at_least(ConfidenceTier::High).count(),
                0,
                "level {level}, n {n}"
            );
        }
    }
}

#[test]
fn disabling_a_supporting_detector_never_raises_a_tier() {
    let signal = stuck_sensor_with_spike();
    let config = AnalysisConfig::default();
    let baseline = run(&signal, None, &config).expect("run");

    let probes = [150usize, 50, 149, 151];
    for index in probes {
        let Some(original) = baseline.anomaly_at(index) else {
            continue;
        };
        for method in &original.supporting_methods {
            let reduced = run(&signal, None, &config.clone().without(*method)).expect("run");
            if let Some(after) = reduced.anomaly_at(index) {
                assert!(
                    after.confidence_tier <= original.confidence_tier,
                    "disabling {method} raised index {index} from {} to {}",
                    original.confidence_tier,
                    after.confidence_tier
                );
                assert!(!after.supporting_methods.contains(method));
            }
        }
    }
}

#[test]
fn repeated_runs_are_identical() {
    let signal = stuck_sensor_with_spike();
    let context = AnalysisContext::default().with_utc_offset_minutes(60);
    let analyzer = Analyzer::new(AnalysisConfig::default()).expect("default config");
    let first = analyzer.run(&signal, Some(&context)).expect("run");
    let second = analyzer.run(&signal, Some(&context)).expect("run");
    assert_eq!(first, second);
}

#[test]
fn overnight_context_discounts_pattern_evidence() {
    let signal = stuck_sensor_with_spike();
    let analyzer = Analyzer::new(AnalysisConfig::default()).expect("default config");
    let daytime = AnalysisContext::default().with_hours(vec![16.5; 200]);
    let overnight = AnalysisContext::default().with_hours(vec![3.0; 200]);

    let day = analyzer.run(&signal, Some(&daytime)).expect("run");
    let night = analyzer.run(&signal, Some(&overnight)).expect("run");
    let day_score = day.anomaly_at(50).expect("flat run at day").total_score;
    let night_score = night.anomaly_at(50).expect("flat run at night").total_score;
    assert!(
        night_score < day_score,
        "night {night_score} should be below day {day_score}"
    );
}

#[test]
fn conflicting_pairs_are_reported_in_diagnostics() {
    let signal = stuck_sensor_with_spike();
    let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
    let conflicts: Vec<_> = result
        .relationship_report
        .iter()
        .filter(|edge| edge.relation == gad_core::Relation::Conflict)
        .collect();
    assert_eq!(
        conflicts.len(),
        result
            .diagnostics
            .notes
            .iter()
            .filter(|note| note.contains("expected to agree"))
            .count()
    );
}

#[cfg(feature = "serde")]
#[test]
fn run_result_serde_roundtrip() {
    let signal = stuck_sensor_with_spike();
    let result = run(&signal, None, &AnalysisConfig::default()).expect("run");
    let encoded = serde_json::to_string(&result).expect("serialize result");
    let decoded: gad_core::AnalysisRunResult =
        serde_json::from_str(&encoded).expect("deserialize result");
    assert_eq!(decoded.fused_anomalies.len(), result.fused_anomalies.len());
    assert_eq!(decoded.per_method_counts, result.per_method_counts);
    assert_eq!(decoded.diagnostics, result.diagnostics);
}
