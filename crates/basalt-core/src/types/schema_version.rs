use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// SchemaVersionError
///

#[derive(Debug, ThisError)]
pub enum SchemaVersionError {
    #[error("invalid schema version '{raw}', expected MAJOR.MINOR.PATCH")]
    Malformed { raw: String },
}

///
/// SchemaVersion
///
/// Snapshot-envelope schema version, MAJOR.MINOR.PATCH. Readers accept the
/// current and the previous major; writers always emit the latest.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct SchemaVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl SchemaVersion {
    #[must_use]
    pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    pub fn try_from_str(raw: &str) -> Result<Self, SchemaVersionError> {
        let malformed = || SchemaVersionError::Malformed {
            raw: raw.to_string(),
        };

        let mut parts = raw.split('.');
        let mut next_part = || -> Result<u32, SchemaVersionError> {
            parts
                .next()
                .ok_or_else(malformed)?
                .parse::<u32>()
                .map_err(|_| malformed())
        };

        let major = next_part()?;
        let minor = next_part()?;
        let patch = next_part()?;
        if parts.next().is_some() {
            return Err(malformed());
        }

        Ok(Self {
            major,
            minor,
            patch,
        })
    }

    /// Whether a reader at `self` accepts an envelope written at `written`.
    /// Current and previous major are accepted.
    #[must_use]
    pub const fn accepts(self, written: Self) -> bool {
        written.major == self.major || written.major + 1 == self.major
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

impl TryFrom<String> for SchemaVersion {
    type Error = SchemaVersionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from_str(&value)
    }
}

impl From<SchemaVersion> for String {
    fn from(value: SchemaVersion) -> Self {
        value.to_string()
    }
}

///
/// TESTS
///
