use std::fmt;

use serde::{Deserialize, Serialize};

/// Taxpayer category that selects which bracket table applies.
///
/// Serialized using the short codes (`S`, `HH`, `MFJ`, `MFS`) that the rate
/// store and the bulk-input files use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FilingStatus {
    #[serde(rename = "S")]
    Single,
    #[serde(rename = "HH", alias = "HOH")]
    HeadOfHousehold,
    #[serde(rename = "MFJ")]
    MarriedFilingJointly,
    #[serde(rename = "MFS")]
    MarriedFilingSeparately,
}

/// Code and display label for every filing status, in declaration order.
pub const FILING_STATUS_LABELS: [(FilingStatus, &str, &str); 4] = [
    (FilingStatus::Single, "S", "Single"),
    (FilingStatus::HeadOfHousehold, "HH", "Head of Household"),
    (FilingStatus::MarriedFilingJointly, "MFJ", "Married Filing Jointly"),
    (FilingStatus::MarriedFilingSeparately, "MFS", "Married Filing Separately"),
];

impl FilingStatus {
    pub const ALL: [FilingStatus; 4] = [
        Self::Single,
        Self::HeadOfHousehold,
        Self::MarriedFilingJointly,
        Self::MarriedFilingSeparately,
    ];

    /// Number of filing statuses. A year whose every status carries a zero
    /// rate is recorded as a no-income-tax year.
    pub const COUNT: usize = Self::ALL.len();

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "S",
            Self::HeadOfHousehold => "HH",
            Self::MarriedFilingJointly => "MFJ",
            Self::MarriedFilingSeparately => "MFS",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Single => "Single",
            Self::HeadOfHousehold => "Head of Household",
            Self::MarriedFilingJointly => "Married Filing Jointly",
            Self::MarriedFilingSeparately => "Married Filing Separately",
        }
    }

    /// Parses a status code. `HOH` is accepted as an alias of `HH`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "S" => Some(Self::Single),
            "HH" | "HOH" => Some(Self::HeadOfHousehold),
            "MFJ" => Some(Self::MarriedFilingJointly),
            "MFS" => Some(Self::MarriedFilingSeparately),
            _ => None,
        }
    }
}

impl fmt::Display for FilingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn label_table_matches_methods() {
        for (status, code, label) in FILING_STATUS_LABELS {
            assert_eq!(status.as_str(), code);
            assert_eq!(status.label(), label);
        }
    }

    #[test]
    fn parse_round_trips_every_code() {
        for status in FilingStatus::ALL {
            assert_eq!(FilingStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn parse_accepts_lowercase_and_hoh_alias() {
        assert_eq!(FilingStatus::parse("mfj"), Some(FilingStatus::MarriedFilingJointly));
        assert_eq!(FilingStatus::parse(" HOH "), Some(FilingStatus::HeadOfHousehold));
    }

    #[test]
    fn parse_rejects_unknown_code() {
        assert_eq!(FilingStatus::parse("QSS"), None);
        assert_eq!(FilingStatus::parse(""), None);
    }
}
