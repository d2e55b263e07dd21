// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use crate::GadError;
use std::fmt;
use std::str::FromStr;

/// Identifier of one detector in the bank.
///
/// Ordering follows declaration order and is used wherever output order must
/// be deterministic.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MethodId {
    Statistical,
    Pattern,
    Frequency,
    Density,
    Physiological,
    Temporal,
}

impl MethodId {
    /// All methods in canonical order.
    pub const ALL: [MethodId; 6] = [
        MethodId::Statistical,
        MethodId::Pattern,
        MethodId::Frequency,
        MethodId::Density,
        MethodId::Physiological,
        MethodId::Temporal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Statistical => "statistical",
            Self::Pattern => "pattern",
            Self::Frequency => "frequency",
            Self::Density => "density",
            Self::Physiological => "physiological",
            Self::Temporal => "temporal",
        }
    }
}

impl fmt::Display for MethodId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MethodId {
    type Err = GadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase();
        MethodId::ALL
            .into_iter()
            .find(|method| method.as_str() == normalized)
            .ok_or_else(|| {
                GadError::invalid_config(format!(
                    "unknown method '{s}'; expected one of statistical, pattern, frequency, density, physiological, temporal"
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::MethodId;

    #[test]
    fn parse_accepts_canonical_names_case_insensitively() {
        for method in MethodId::ALL {
            assert_eq!(method.as_str().parse::<MethodId>(), Ok(method));
        }
        assert_eq!(" Density ".parse::<MethodId>(), Ok(MethodId::Density));
    }

    #[test]
    fn parse_rejects_unknown_names() {
        let err = "isolation".parse::<MethodId>().expect_err("unknown must fail");
        assert!(err.to_string().contains("unknown method 'isolation'"));
    }

    #[test]
    fn canonical_order_matches_ord() {
        let mut sorted = MethodId::ALL;
        sorted.sort();
        assert_eq!(sorted, MethodId::ALL);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn method_serializes_as_snake_case() {
        let encoded = serde_json::to_string(&MethodId::Physiological).expect("serialize");
        assert_eq!(encoded, "\"physiological\"");
        let decoded: MethodId = serde_json::from_str("\"temporal\"").expect("deserialize");
        assert_eq!(decoded, MethodId::Temporal);
    }
}
