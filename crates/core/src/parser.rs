//! Backblast parser.
//!
//! A single pass over the message lines. Each trimmed line that starts with
//! a recognized label and a colon is dispatched to that field's validator.
//! Malformed values fail on the first offending line; omissions are
//! collected and reported together once every line has been seen. A label
//! that appears on several lines keeps its last valid value.

use chrono::NaiveDate;
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;

use crate::error::{Error, ParseError, Result};
use crate::ids::{ChannelId, MessageId, UserId};
use crate::label::{FieldLabel, REQUIRED_LABELS};
use crate::limits::{DEFAULT_FNG_ZERO_SENTINELS, DEFAULT_LOOKUP_TIMEOUT_MS, FNG_SEPARATOR};
use crate::mention::{parse_channel_mention, resolve_mentions};
use crate::record::{BackblastRecord, RecordParts};
use crate::traits::ChannelDirectory;

/// Parser configuration.
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// `FNGs:` values meaning zero FNGs (case-insensitive).
    pub fng_zero_sentinels: Vec<String>,
    /// Budget for the AO channel-existence lookup.
    pub lookup_timeout: Duration,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            fng_zero_sentinels: DEFAULT_FNG_ZERO_SENTINELS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            lookup_timeout: Duration::from_millis(DEFAULT_LOOKUP_TIMEOUT_MS),
        }
    }
}

/// One message's worth of parser input.
#[derive(Debug, Clone, Copy)]
pub struct ParseInput<'a> {
    pub message_id: MessageId,
    pub text: &'a str,
    /// Users mentioned anywhere in the message, in platform order.
    pub mentions: &'a [UserId],
}

/// Field values seen so far. `None` means not (validly) present.
#[derive(Debug, Default)]
struct FieldSet {
    q: Option<(UserId, Option<UserId>)>,
    count: Option<u32>,
    fngs: Option<(String, u32)>,
    date: Option<NaiveDate>,
    ao: Option<ChannelId>,
    pax: Option<Vec<UserId>>,
}

impl FieldSet {
    fn is_present(&self, label: FieldLabel) -> bool {
        match label {
            FieldLabel::Q => self.q.is_some(),
            FieldLabel::Count => self.count.is_some(),
            FieldLabel::Fngs => self.fngs.is_some(),
            FieldLabel::Date => self.date.is_some(),
            FieldLabel::Ao => self.ao.is_some(),
            FieldLabel::Pax => self.pax.is_some(),
        }
    }

    fn into_record(
        self,
        source_message_id: MessageId,
    ) -> std::result::Result<BackblastRecord, ParseError> {
        let missing: Vec<FieldLabel> = REQUIRED_LABELS
            .iter()
            .copied()
            .filter(|label| !self.is_present(*label))
            .collect();

        match (self.q, self.count, self.fngs, self.date, self.ao, self.pax) {
            (
                Some((q, coq)),
                Some(count),
                Some((fngs_raw, fng_count)),
                Some(date),
                Some(ao),
                Some(pax),
            ) => Ok(BackblastRecord::from_parts(RecordParts {
                ao_id: ao,
                q_user_id: q,
                coq_user_id: coq,
                pax_count: count,
                fngs_raw,
                fng_count,
                bd_date: date,
                pax,
                source_message_id,
            })),
            _ => Err(ParseError::missing_fields(missing)),
        }
    }
}

/// Converts backblast text into a [`BackblastRecord`].
#[derive(Debug, Clone)]
pub struct BackblastParser {
    zero_sentinels: HashSet<String>,
    lookup_timeout: Duration,
}

impl Default for BackblastParser {
    fn default() -> Self {
        Self::new(ParserConfig::default())
    }
}

impl BackblastParser {
    pub fn new(config: ParserConfig) -> Self {
        Self {
            zero_sentinels: config
                .fng_zero_sentinels
                .iter()
                .map(|s| s.trim().to_lowercase())
                .collect(),
            lookup_timeout: config.lookup_timeout,
        }
    }

    /// Parses one message.
    ///
    /// Returns [`Error::Parse`] for anything the author must fix. A failed
    /// or timed-out AO lookup surfaces as a platform or timeout error.
    pub async fn parse(
        &self,
        input: ParseInput<'_>,
        channels: &dyn ChannelDirectory,
    ) -> Result<BackblastRecord> {
        let mut fields = FieldSet::default();

        for line in input.text.lines() {
            let Some((label, value)) = FieldLabel::match_line(line.trim()) else {
                continue;
            };

            match label {
                FieldLabel::Q => {
                    let mut leaders = resolve_mentions(value, input.mentions).into_iter();
                    if let Some(q) = leaders.next() {
                        fields.q = Some((q, leaders.next()));
                    }
                }
                FieldLabel::Count => {
                    let count = value
                        .parse::<u32>()
                        .map_err(|_| ParseError::invalid_count(value))?;
                    fields.count = Some(count);
                }
                FieldLabel::Fngs => {
                    fields.fngs = Some((value.to_string(), self.count_fngs(value)));
                }
                FieldLabel::Date => {
                    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
                        .map_err(|_| ParseError::invalid_date(value))?;
                    fields.date = Some(date);
                }
                FieldLabel::Ao => {
                    let channel = parse_channel_mention(value)
                        .ok_or_else(|| ParseError::ao_must_be_mention(value))?;
                    if !self.channel_exists(channel, channels).await? {
                        return Err(ParseError::unknown_channel(value).into());
                    }
                    fields.ao = Some(channel);
                }
                FieldLabel::Pax => {
                    let pax = resolve_mentions(value, input.mentions);
                    if !pax.is_empty() {
                        fields.pax = Some(pax);
                    }
                }
            }
        }

        let record = fields.into_record(input.message_id)?;
        debug!(
            message_id = %input.message_id,
            ao_id = %record.ao_id(),
            pax = record.pax().len(),
            "Parsed backblast"
        );
        Ok(record)
    }

    /// Number of FNGs named in a `FNGs:` value.
    pub fn count_fngs(&self, value: &str) -> u32 {
        let value = value.trim();
        if self.zero_sentinels.contains(&value.to_lowercase()) {
            return 0;
        }
        value
            .split(FNG_SEPARATOR)
            .filter(|name| !name.trim().is_empty())
            .count() as u32
    }

    async fn channel_exists(
        &self,
        channel: ChannelId,
        channels: &dyn ChannelDirectory,
    ) -> Result<bool> {
        tokio::time::timeout(self.lookup_timeout, channels.channel_exists(channel))
            .await
            .map_err(|_| {
                Error::timeout(format!(
                    "channel lookup for {channel} exceeded {}ms",
                    self.lookup_timeout.as_millis()
                ))
            })?
    }
}
