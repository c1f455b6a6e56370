//! The validated attendance record extracted from a backblast.

use chrono::NaiveDate;
use serde::Serialize;

use crate::ids::{ChannelId, MessageId, UserId};

/// One workout event's attendance.
///
/// Only the parser can build one, and only once every required field has
/// been validated. Fields are read-only after construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackblastRecord {
    ao_id: ChannelId,
    q_user_id: UserId,
    coq_user_id: Option<UserId>,
    pax_count: u32,
    fngs_raw: String,
    fng_count: u32,
    bd_date: NaiveDate,
    pax: Vec<UserId>,
    source_message_id: MessageId,
}

/// Validated field values gathered by the parser.
pub(crate) struct RecordParts {
    pub ao_id: ChannelId,
    pub q_user_id: UserId,
    pub coq_user_id: Option<UserId>,
    pub pax_count: u32,
    pub fngs_raw: String,
    pub fng_count: u32,
    pub bd_date: NaiveDate,
    pub pax: Vec<UserId>,
    pub source_message_id: MessageId,
}

impl BackblastRecord {
    pub(crate) fn from_parts(parts: RecordParts) -> Self {
        Self {
            ao_id: parts.ao_id,
            q_user_id: parts.q_user_id,
            coq_user_id: parts.coq_user_id,
            pax_count: parts.pax_count,
            fngs_raw: parts.fngs_raw,
            fng_count: parts.fng_count,
            bd_date: parts.bd_date,
            pax: parts.pax,
            source_message_id: parts.source_message_id,
        }
    }

    /// The AO channel where the workout happened.
    pub fn ao_id(&self) -> ChannelId {
        self.ao_id
    }

    pub fn q_user_id(&self) -> UserId {
        self.q_user_id
    }

    pub fn coq_user_id(&self) -> Option<UserId> {
        self.coq_user_id
    }

    /// Headcount as written by the Q (not derived from `pax`).
    pub fn pax_count(&self) -> u32 {
        self.pax_count
    }

    pub fn fngs_raw(&self) -> &str {
        &self.fngs_raw
    }

    pub fn fng_count(&self) -> u32 {
        self.fng_count
    }

    pub fn bd_date(&self) -> NaiveDate {
        self.bd_date
    }

    /// Mentioned participants, in mention order. Never empty.
    pub fn pax(&self) -> &[UserId] {
        &self.pax
    }

    /// Idempotency key.
    pub fn source_message_id(&self) -> MessageId {
        self.source_message_id
    }
}
