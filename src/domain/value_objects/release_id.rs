//! Release identifier value object
//!
//! A release is named by the UTC timestamp of its creation,
//! formatted as `YYYYMMDDHHMMSS`. The fixed width makes lexical and
//! chronological ordering agree.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

const FORMAT: &str = "%Y%m%d%H%M%S";
const WIDTH: usize = 14;

/// Identifier of one release directory under `releases/`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReleaseId(String);

impl ReleaseId {
    /// Build an id from a point in time (sub-second precision is dropped)
    pub fn from_datetime(at: DateTime<Utc>) -> Self {
        Self(at.format(FORMAT).to_string())
    }

    /// Parse a directory name. Returns `None` for anything that is not a
    /// well-formed timestamp, so stray directories are never treated as
    /// releases.
    pub fn parse(name: &str) -> Option<Self> {
        if name.len() != WIDTH || !name.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        NaiveDateTime::parse_from_str(name, FORMAT).ok()?;
        Some(Self(name.to_string()))
    }

    /// Pick the id for a new release: `now`, or one second past the newest
    /// existing release when `now` would not sort after it (clock skew or
    /// two deploys within the same second).
    pub fn next<'a>(now: DateTime<Utc>, existing: impl IntoIterator<Item = &'a ReleaseId>) -> Self {
        let candidate = Self::from_datetime(now);
        match existing.into_iter().max() {
            Some(latest) if *latest >= candidate => {
                Self::from_datetime(latest.created_at() + Duration::seconds(1))
            }
            _ => candidate,
        }
    }

    /// Creation time encoded in the id
    pub fn created_at(&self) -> DateTime<Utc> {
        NaiveDateTime::parse_from_str(&self.0, FORMAT)
            .map(|naive| naive.and_utc())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ReleaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ReleaseId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}
