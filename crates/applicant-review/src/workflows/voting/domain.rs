use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Timestamp layout used in the vote log and in API payloads.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Judge decision for an applicant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VoteStatus {
    Approve,
    Reject,
    Maybe,
}

impl VoteStatus {
    pub const ALL: [VoteStatus; 3] = [VoteStatus::Approve, VoteStatus::Reject, VoteStatus::Maybe];

    pub const fn label(self) -> &'static str {
        match self {
            VoteStatus::Approve => "Approve",
            VoteStatus::Reject => "Reject",
            VoteStatus::Maybe => "Maybe",
        }
    }
}

impl fmt::Display for VoteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VoteStatus {
    type Err = InvalidVoteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        VoteStatus::ALL
            .into_iter()
            .find(|status| status.label().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| InvalidVoteError::UnknownStatus(trimmed.to_string()))
    }
}

/// One immutable entry of the vote ledger.
///
/// Field names double as the vote log's CSV header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEvent {
    #[serde(with = "log_timestamp")]
    pub timestamp: NaiveDateTime,
    pub judge_name: String,
    pub applicant_name: String,
    pub status: VoteStatus,
    #[serde(deserialize_with = "lenient::integer")]
    pub rating: u8,
    pub comment: Option<String>,
    pub original_status: Option<VoteStatus>,
    #[serde(deserialize_with = "lenient::optional_integer")]
    pub original_rating: Option<u8>,
    #[serde(rename = "vote_version", deserialize_with = "lenient::integer")]
    pub version: u32,
}

impl VoteEvent {
    pub fn is_revision(&self) -> bool {
        self.version > 1
    }
}

/// Raw vote as submitted by a judge, before validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteSubmission {
    pub judge_name: String,
    pub applicant_name: String,
    pub status: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

/// A submission that passed validation; names are trimmed and blank comments dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidVote {
    pub judge_name: String,
    pub applicant_name: String,
    pub status: VoteStatus,
    pub rating: u8,
    pub comment: Option<String>,
}

impl VoteSubmission {
    pub fn validate(&self) -> Result<ValidVote, InvalidVoteError> {
        let judge_name = self.judge_name.trim();
        if judge_name.is_empty() {
            return Err(InvalidVoteError::MissingJudge);
        }
        let applicant_name = self.applicant_name.trim();
        if applicant_name.is_empty() {
            return Err(InvalidVoteError::MissingApplicant);
        }
        let status = self.status.parse::<VoteStatus>()?;
        let rating = u8::try_from(self.rating)
            .ok()
            .filter(|rating| (MIN_RATING..=MAX_RATING).contains(rating))
            .ok_or(InvalidVoteError::RatingOutOfRange(self.rating))?;

        let comment = self
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|comment| !comment.is_empty())
            .map(str::to_string);

        Ok(ValidVote {
            judge_name: judge_name.to_string(),
            applicant_name: applicant_name.to_string(),
            status,
            rating,
            comment,
        })
    }
}

/// Rejections raised before anything is written to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidVoteError {
    #[error("rating {0} is outside the 1-5 range")]
    RatingOutOfRange(i64),
    #[error("unknown vote status '{0}'; expected Approve, Reject or Maybe")]
    UnknownStatus(String),
    #[error("judge name is required")]
    MissingJudge,
    #[error("applicant name is required")]
    MissingApplicant,
}

mod log_timestamp {
    use chrono::NaiveDateTime;
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use super::TIMESTAMP_FORMAT;

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&value.format(TIMESTAMP_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(raw.trim(), TIMESTAMP_FORMAT).map_err(D::Error::custom)
    }
}

/// Spreadsheet tools rewrite integer columns as `4.0`; accept that on read.
mod lenient {
    use serde::{de::Error, Deserialize, Deserializer};

    pub fn integer<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).map_err(D::Error::custom)
    }

    pub fn optional_integer<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: TryFrom<u64>,
    {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.trim().is_empty() => parse(&raw).map(Some).map_err(D::Error::custom),
            _ => Ok(None),
        }
    }

    pub(super) fn parse<T: TryFrom<u64>>(raw: &str) -> Result<T, String> {
        let trimmed = raw.trim();
        let whole = match trimmed.parse::<u64>() {
            Ok(value) => value,
            Err(_) => match trimmed.parse::<f64>() {
                Ok(value) if value.is_finite() && value >= 0.0 && value.fract() == 0.0 => {
                    value as u64
                }
                _ => return Err(format!("'{trimmed}' is not a whole number")),
            },
        };
        T::try_from(whole).map_err(|_| format!("'{trimmed}' is out of range"))
    }
}
