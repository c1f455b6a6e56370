//! Unified error types for the backblast miner.
//!
//! Error codes:
//! - PARSE_001-006: Backblast parse errors (reported back to the author)
//! - PLATFORM/STORE/TIMEOUT: Processing failures (generic diagnostic reply)

use thiserror::Error;

use crate::label::FieldLabel;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Reply text for failures that are not the author's fault.
pub const GENERIC_DIAGNOSTIC: &str =
    "Something went wrong while recording this backblast and it was not saved. \
     Please let an admin know.";

/// The kind of a backblast parse failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// PARSE_001: One or more required fields were absent or empty.
    MissingFields(Vec<FieldLabel>),
    /// PARSE_002: `Count` was not a non-negative base-10 integer.
    InvalidCount,
    /// PARSE_003: `Date` was not `YYYY-MM-DD`.
    InvalidDate,
    /// PARSE_004: `AO` referenced a channel the platform does not know.
    UnknownChannel,
    /// PARSE_005: `AO` was not a channel mention.
    AoMustBeMention,
    /// PARSE_006: A label outside the recognized set.
    UnrecognizedLabel,
}

impl ParseErrorKind {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingFields(_) => "PARSE_001",
            Self::InvalidCount => "PARSE_002",
            Self::InvalidDate => "PARSE_003",
            Self::UnknownChannel => "PARSE_004",
            Self::AoMustBeMention => "PARSE_005",
            Self::UnrecognizedLabel => "PARSE_006",
        }
    }
}

/// A backblast that could not be turned into a record.
///
/// `Display` yields the text replied to the author.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ParseError {
    kind: ParseErrorKind,
    message: String,
}

impl ParseError {
    pub fn missing_fields(mut labels: Vec<FieldLabel>) -> Self {
        labels.sort_by_key(|l| l.as_str());
        labels.dedup();
        let names: Vec<&str> = labels.iter().map(FieldLabel::as_str).collect();
        Self {
            message: format!(
                "Backblast is missing required fields: {}. Please post a corrected backblast with \
                 each of them as `Label: value` on its own line.",
                names.join(", ")
            ),
            kind: ParseErrorKind::MissingFields(labels),
        }
    }

    pub fn invalid_count(value: &str) -> Self {
        Self {
            kind: ParseErrorKind::InvalidCount,
            message: format!("`Count: {value}` is not a number. Use digits, e.g. `Count: 7`."),
        }
    }

    pub fn invalid_date(value: &str) -> Self {
        Self {
            kind: ParseErrorKind::InvalidDate,
            message: format!(
                "`Date: {value}` is not a valid date. Use YYYY-MM-DD, e.g. `Date: 2023-05-01`."
            ),
        }
    }

    pub fn unknown_channel(value: &str) -> Self {
        Self {
            kind: ParseErrorKind::UnknownChannel,
            message: format!("`AO: {value}` does not refer to a channel on this server."),
        }
    }

    pub fn ao_must_be_mention(value: &str) -> Self {
        Self {
            kind: ParseErrorKind::AoMustBeMention,
            message: format!(
                "`AO: {value}` must be a channel mention. Type `#` and pick the AO channel from \
                 the list so it turns into a link."
            ),
        }
    }

    pub fn unrecognized_label(label: &str) -> Self {
        Self {
            kind: ParseErrorKind::UnrecognizedLabel,
            message: format!("`{}` is not a recognized backblast field.", label.trim()),
        }
    }

    pub fn kind(&self) -> &ParseErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }
}

/// Unified error type for the backblast miner.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("platform error: {0}")]
    Platform(String),

    #[error("store error: {0}")]
    Store(String),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn platform(msg: impl Into<String>) -> Self {
        Self::Platform(msg.into())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error is the author's to fix.
    pub fn is_parse(&self) -> bool {
        matches!(self, Self::Parse(_))
    }

    /// Text to reply to the originating message.
    pub fn reply_text(&self) -> String {
        match self {
            Self::Parse(e) => e.to_string(),
            _ => GENERIC_DIAGNOSTIC.to_string(),
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::Parse(e) => Some(e.code()),
            _ => None,
        }
    }
}
