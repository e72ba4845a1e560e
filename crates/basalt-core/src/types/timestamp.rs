use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

///
/// TimestampError
///

#[derive(Debug, ThisError)]
pub enum TimestampError {
    #[error("timestamp out of the representable range: {millis}ms")]
    OutOfRange { millis: u64 },

    #[error("invalid ISO-8601 timestamp '{raw}'")]
    Parse { raw: String },
}

///
/// Timestamp
///
/// Milliseconds since the Unix epoch. Envelope fields serialize through the
/// ISO-8601 (RFC 3339) text form; metadata rows keep the integer form.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
    Serialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    #[must_use]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Render as ISO-8601 UTC with millisecond precision.
    pub fn to_iso8601(self) -> Result<String, TimestampError> {
        let nanos = i128::from(self.0) * 1_000_000;
        let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
            .map_err(|_| TimestampError::OutOfRange { millis: self.0 })?;
        dt.format(&Rfc3339)
            .map_err(|_| TimestampError::OutOfRange { millis: self.0 })
    }

    /// Parse an ISO-8601 UTC timestamp, truncating below milliseconds.
    pub fn from_iso8601(raw: &str) -> Result<Self, TimestampError> {
        let dt = OffsetDateTime::parse(raw, &Rfc3339).map_err(|_| TimestampError::Parse {
            raw: raw.to_string(),
        })?;
        let millis = dt.unix_timestamp_nanos() / 1_000_000;
        u64::try_from(millis)
            .map(Self)
            .map_err(|_| TimestampError::Parse {
                raw: raw.to_string(),
            })
    }

}

///
/// Serde adapters for the ISO-8601 text form used by snapshot envelopes.
///

pub mod iso8601 {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as DeError, ser::Error as SerError};

    pub fn serialize<S: Serializer>(ts: &Timestamp, serializer: S) -> Result<S::Ok, S::Error> {
        let text = ts.to_iso8601().map_err(S::Error::custom)?;
        serializer.serialize_str(&text)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Timestamp, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Timestamp::from_iso8601(&raw).map_err(D::Error::custom)
    }
}

pub mod iso8601_opt {
    use super::Timestamp;
    use serde::{Deserialize, Deserializer, Serializer, de::Error as DeError, ser::Error as SerError};

    pub fn serialize<S: Serializer>(
        ts: &Option<Timestamp>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match ts {
            Some(ts) => {
                let text = ts.to_iso8601().map_err(S::Error::custom)?;
                serializer.serialize_some(&text)
            }
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Timestamp>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        raw.map(|raw| Timestamp::from_iso8601(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

///
/// TESTS
///
