// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

//! Input loading shared by the `gad` binary: CSV signals, JSON configs,
//! truth index files and saved analysis results.

use anyhow::Context;
use gad_core::{AnalysisConfig, AnalysisRunResult, GadError, Signal, TimeIndex};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

const NANOS_PER_SECOND: f64 = 1e9;

/// A signal read from disk plus where it came from.
#[derive(Clone, Debug)]
pub struct LoadedSignal {
    pub path: PathBuf,
    pub signal: Signal,
}

impl LoadedSignal {
    pub fn summary(&self) -> InputSummary {
        InputSummary {
            path: self.path.display().to_string(),
            n: self.signal.len(),
            has_timestamps: self.signal.has_timestamps(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct InputSummary {
    pub path: String,
    pub n: usize,
    pub has_timestamps: bool,
}

/// Reads a CSV signal: one `value` column, or `timestamp,value` with epoch
/// seconds. A single header row is skipped; named headers may reorder the
/// two columns.
pub fn load_signal(path: &Path) -> anyhow::Result<LoadedSignal> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read '{}'", path.display()))?;
    let signal =
        parse_csv_signal(&raw).with_context(|| format!("invalid signal in '{}'", path.display()))?;
    Ok(LoadedSignal {
        path: path.to_path_buf(),
        signal,
    })
}

pub fn parse_csv_signal(raw: &str) -> Result<Signal, GadError> {
    let rows: Vec<Vec<&str>> = raw
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(|line| line.split(',').map(str::trim).collect())
        .collect();
    let Some(first) = rows.first() else {
        return Err(GadError::malformed_signal("CSV input is empty"));
    };

    let has_header = first.iter().all(|cell| cell.parse::<f64>().is_err());
    let (timestamp_col, value_col) = match (first.len(), has_header) {
        (1, _) => (None, 0),
        (2, true) => header_columns(first),
        (2, false) => (Some(0), 1),
        (cols, _) => {
            return Err(GadError::malformed_signal(format!(
                "CSV input must have 1 or 2 columns (value, or timestamp,value); got {cols}"
            )));
        }
    };
    let body = if has_header { &rows[1..] } else { &rows[..] };

    let mut values = Vec::with_capacity(body.len());
    let mut timestamps = Vec::with_capacity(body.len());
    for (offset, cells) in body.iter().enumerate() {
        let line = offset + 1 + usize::from(has_header);
        if cells.len() != first.len() {
            return Err(GadError::malformed_signal(format!(
                "CSV row {line} has {} columns but expected {}",
                cells.len(),
                first.len()
            )));
        }
        values.push(parse_cell(cells[value_col], line, "value")?);
        if let Some(col) = timestamp_col {
            let seconds = parse_cell(cells[col], line, "timestamp")?;
            timestamps.push(seconds_to_ns(seconds, line)?);
        }
    }

    let time = if timestamp_col.is_some() {
        TimeIndex::Explicit(timestamps)
    } else {
        TimeIndex::None
    };
    Signal::new(values, time)
}

fn header_columns(header: &[&str]) -> (Option<usize>, usize) {
    let is_value = |cell: &str| {
        let lower = cell.to_ascii_lowercase();
        lower == "value" || lower == "glucose"
    };
    if is_value(header[0]) && !is_value(header[1]) {
        (Some(1), 0)
    } else {
        (Some(0), 1)
    }
}

fn parse_cell(cell: &str, line: usize, label: &str) -> Result<f64, GadError> {
    if cell.is_empty() {
        return Err(GadError::malformed_signal(format!(
            "CSV row {line} has an empty {label}"
        )));
    }
    cell.parse::<f64>().map_err(|_| {
        GadError::malformed_signal(format!(
            "CSV row {line} {label} is not a valid number: '{cell}'"
        ))
    })
}

fn seconds_to_ns(seconds: f64, line: usize) -> Result<i64, GadError> {
    let ns = (seconds * NANOS_PER_SECOND).round();
    if !ns.is_finite() || ns.abs() >= i64::MAX as f64 {
        return Err(GadError::malformed_signal(format!(
            "CSV row {line} timestamp {seconds} is out of range"
        )));
    }
    Ok(ns as i64)
}

/// Loads a JSON config; missing fields take their defaults.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<AnalysisConfig> {
    let Some(path) = path else {
        return Ok(AnalysisConfig::default());
    };
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config '{}'", path.display()))?;
    let config: AnalysisConfig = serde_json::from_str(&raw)
        .with_context(|| format!("invalid config JSON in '{}'", path.display()))?;
    config.validate()?;
    Ok(config)
}

/// Parses labelled anomaly indices: a JSON array, a JSON object with an
/// `indices` array, or one integer per line / comma separated. The result is
/// sorted and deduplicated.
pub fn parse_truth(raw: &str) -> Result<Vec<usize>, GadError> {
    let trimmed = raw.trim();
    let mut indices = if trimmed.starts_with('[') || trimmed.starts_with('{') {
        let value: Value = serde_json::from_str(trimmed)
            .map_err(|err| GadError::invalid_config(format!("invalid truth JSON: {err}")))?;
        let array = match &value {
            Value::Array(items) => items,
            Value::Object(map) => map
                .get("indices")
                .and_then(Value::as_array)
                .ok_or_else(|| {
                    GadError::invalid_config("truth JSON object must contain an 'indices' array")
                })?,
            _ => return Err(GadError::invalid_config("truth JSON must be an array")),
        };
        array
            .iter()
            .map(|item| {
                item.as_u64()
                    .and_then(|index| usize::try_from(index).ok())
                    .ok_or_else(|| {
                        GadError::invalid_config(format!(
                            "truth index must be a non-negative integer; got {item}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?
    } else {
        trimmed
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|token| !token.is_empty())
            .map(|token| {
                token.parse::<usize>().map_err(|_| {
                    GadError::invalid_config(format!(
                        "truth index must be a non-negative integer; got '{token}'"
                    ))
                })
            })
            .collect::<Result<Vec<_>, _>>()?
    };
    indices.sort_unstable();
    indices.dedup();
    Ok(indices)
}

pub fn load_truth(path: &Path) -> anyhow::Result<Vec<usize>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read truth file '{}'", path.display()))?;
    parse_truth(&raw).with_context(|| format!("invalid truth file '{}'", path.display()))
}

/// Reads a saved analysis result, either bare or wrapped in the `analyze`
/// command's output envelope.
pub fn load_predictions(path: &Path) -> anyhow::Result<AnalysisRunResult> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read predictions '{}'", path.display()))?;
    let mut value: Value = serde_json::from_str(&raw)
        .with_context(|| format!("invalid JSON in '{}'", path.display()))?;
    if let Some(inner) = value.get_mut("result").map(Value::take) {
        value = inner;
    }
    serde_json::from_value(value)
        .with_context(|| format!("'{}' is not an analysis result", path.display()))
}

/// CLI crate name helper.
pub fn crate_name() -> &'static str {
    let _ = (
        gad_core::crate_name(),
        gad_fusion::crate_name(),
        gad_eval::crate_name(),
    );
    "gad-cli"
}
