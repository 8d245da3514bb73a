//! Serde helpers for the `expiresAt` field.
//!
//! Servers in the wild send expiry as an RFC 3339 string
//! (`"2026-10-19T12:00:00Z"`), as an ISO 8601 date-time without an offset
//! (`"2026-10-19T12:00:00.000"`, taken as UTC), or as epoch milliseconds
//! (`1792411200000`, possibly fractional). All are accepted on input;
//! output is always RFC 3339 so the persisted slice stays human-readable.

use serde::{Deserialize, Deserializer, Serializer};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

/// The accepted input shapes.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawTimestamp {
    Text(String),
    Millis(i64),
    FractionalMillis(f64),
}

impl RawTimestamp {
    fn into_datetime(self) -> Result<OffsetDateTime, String> {
        match self {
            Self::Text(text) => parse_text(&text),
            Self::Millis(ms) => from_nanos(i128::from(ms) * 1_000_000),
            Self::FractionalMillis(ms) if ms.is_finite() => {
                from_nanos((ms * 1_000_000.0).round() as i128)
            }
            Self::FractionalMillis(ms) => Err(format!("timestamp {ms} is not a number")),
        }
    }
}

fn parse_text(text: &str) -> Result<OffsetDateTime, String> {
    OffsetDateTime::parse(text, &Rfc3339).or_else(|rfc_err| {
        PrimitiveDateTime::parse(text, &Iso8601::DEFAULT)
            .map(PrimitiveDateTime::assume_utc)
            .map_err(|_| format!("invalid timestamp {text:?}: {rfc_err}"))
    })
}

fn from_nanos(nanos: i128) -> Result<OffsetDateTime, String> {
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|e| format!("timestamp out of range: {e}"))
}

/// `#[serde(with = "timestamp::option")]` for `Option<OffsetDateTime>`.
pub mod option {
    use super::*;

    pub fn serialize<S: Serializer>(
        value: &Option<OffsetDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(ts) => {
                let text = ts.format(&Rfc3339).map_err(serde::ser::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<OffsetDateTime>, D::Error> {
        Option::<RawTimestamp>::deserialize(deserializer)?
            .map(RawTimestamp::into_datetime)
            .transpose()
            .map_err(serde::de::Error::custom)
    }
}
