// SPDX-License-Identifier: MIT OR Apache-2.0

#![no_main]

use gad_cli::parse_csv_signal;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Ok(raw) = std::str::from_utf8(data) else {
        return;
    };
    if let Ok(signal) = parse_csv_signal(raw) {
        assert!(!signal.is_empty());
        assert!(signal.values().iter().all(|v| v.is_finite()));
    }
});
