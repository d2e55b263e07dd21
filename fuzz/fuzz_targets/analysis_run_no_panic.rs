// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

#[path = "common.rs"]
mod common;

use gad_core::{AnalysisConfig, AnalysisContext, MethodId, Signal, TimeIndex};
use gad_fusion::Analyzer;
use libfuzzer_sys::fuzz_target;

const FIVE_MINUTES_NS: i64 = 300_000_000_000;

fn build_value(mode_seed: u8, raw_seed: i16, previous: f64) -> f64 {
    match mode_seed % 8 {
        0 => previous,
        1 => 100.0 + f64::from(raw_seed) / 64.0,
        2 => f64::from(raw_seed),
        3 => (previous + f64::from(raw_seed % 32)).clamp(-1_000.0, 1_000.0),
        4 => 0.0,
        5 => f64::NAN,
        6 => f64::INFINITY,
        _ => 39.0 + f64::from(raw_seed.unsigned_abs() % 400),
    }
}

fn build_time(seed: u8, n: usize, gaps: &mut common::ByteCursor<'_>) -> TimeIndex {
    match seed % 3 {
        0 => TimeIndex::None,
        1 => TimeIndex::Uniform {
            t0_ns: 0,
            dt_ns: FIVE_MINUTES_NS,
        },
        _ => {
            let mut ts = 0i64;
            let stamps = (0..n)
                .map(|_| {
                    let step = i64::from(gaps.next_i16()) * 1_000_000_000;
                    ts = ts.saturating_add(step);
                    ts
                })
                .collect();
            TimeIndex::Explicit(stamps)
        }
    }
}

fn build_config(seed: u8) -> AnalysisConfig {
    let config = AnalysisConfig::default();
    if seed & 0x80 == 0 {
        return config;
    }
    let methods: Vec<MethodId> = MethodId::ALL
        .iter()
        .enumerate()
        .filter(|(bit, _)| seed & (1 << bit) != 0)
        .map(|(_, method)| *method)
        .collect();
    config.with_methods(&methods)
}

fuzz_target!(|data: &[u8]| {
    let mut cursor = common::ByteCursor::new(data);

    let n = common::bounded(cursor.next_u8(), 0, 255);
    let mut values = Vec::with_capacity(n);
    let mut previous = 120.0;
    for _ in 0..n {
        previous = build_value(cursor.next_u8(), cursor.next_i16(), previous);
        values.push(previous);
    }

    let time = build_time(cursor.next_u8(), n, &mut cursor);
    let config = build_config(cursor.next_u8());
    let context = AnalysisContext::default()
        .with_utc_offset_minutes(i32::from(cursor.next_i16() % 841));

    let Ok(signal) = Signal::new(values, time) else {
        return;
    };
    let Ok(analyzer) = Analyzer::new(config) else {
        return;
    };

    if let Ok(result) = analyzer.run(&signal, Some(&context)) {
        assert!(
            result.validate(signal.len()).is_ok(),
            "fused output must satisfy its ordering and range invariants"
        );
        assert_eq!(result.diagnostics.n, signal.len());
    }
});
