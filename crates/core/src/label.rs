//! Backblast field labels.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A recognized backblast field label.
///
/// Variants are declared in the lexicographic order of their labels, so the
/// derived `Ord` matches the order used when reporting missing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FieldLabel {
    #[serde(rename = "AO")]
    Ao,
    Count,
    Date,
    #[serde(rename = "FNGs")]
    Fngs,
    #[serde(rename = "PAX")]
    Pax,
    Q,
}

/// Every label a backblast must carry, in dispatch order.
pub const REQUIRED_LABELS: [FieldLabel; 6] = [
    FieldLabel::Q,
    FieldLabel::Count,
    FieldLabel::Fngs,
    FieldLabel::Date,
    FieldLabel::Ao,
    FieldLabel::Pax,
];

impl FieldLabel {
    /// The label as it appears in a backblast.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ao => "AO",
            Self::Count => "Count",
            Self::Date => "Date",
            Self::Fngs => "FNGs",
            Self::Pax => "PAX",
            Self::Q => "Q",
        }
    }

    /// If `line` starts with this label immediately followed by a colon,
    /// returns the trimmed remainder after the colon.
    ///
    /// Label matching ignores ASCII case (`Pax:` and `PAX:` both match).
    pub fn strip_from<'a>(&self, line: &'a str) -> Option<&'a str> {
        let label = self.as_str();
        let head = line.get(..label.len())?;
        if !head.eq_ignore_ascii_case(label) {
            return None;
        }
        line[label.len()..].strip_prefix(':').map(str::trim)
    }

    /// Finds the label a trimmed line starts with, along with its value.
    pub fn match_line(line: &str) -> Option<(FieldLabel, &str)> {
        REQUIRED_LABELS
            .iter()
            .find_map(|label| label.strip_from(line).map(|value| (*label, value)))
    }
}

impl fmt::Display for FieldLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FieldLabel {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        REQUIRED_LABELS
            .iter()
            .copied()
            .find(|label| label.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseError::unrecognized_label(s))
    }
}
