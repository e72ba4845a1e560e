use crate::types::{ExternalId, RevisionId};
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// SnapshotKeyError
///

#[derive(Debug, ThisError)]
pub enum SnapshotKeyError {
    #[error("snapshot path '{path}' is not '{{external_id}}/r{{revision_id}}.json'")]
    Malformed { path: String },
}

///
/// SnapshotKey
///
/// Derived object key `{external_id}/r{revision_id}.json` under the
/// configured bucket. Never stored; always recomputed.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct SnapshotKey {
    pub external_id: ExternalId,
    pub revision_id: RevisionId,
}

impl SnapshotKey {
    #[must_use]
    pub const fn new(external_id: ExternalId, revision_id: RevisionId) -> Self {
        Self {
            external_id,
            revision_id,
        }
    }

    #[must_use]
    pub fn object_path(&self) -> String {
        format!("{}/r{}.json", self.external_id, self.revision_id)
    }

    /// Parse an object path back into its key parts.
    pub fn parse(path: &str) -> Result<Self, SnapshotKeyError> {
        let malformed = || SnapshotKeyError::Malformed {
            path: path.to_string(),
        };

        let (external, rest) = path.split_once('/').ok_or_else(malformed)?;
        let external_id = ExternalId::try_from_str(external).map_err(|_| malformed())?;
        let digits = rest
            .strip_prefix('r')
            .and_then(|r| r.strip_suffix(".json"))
            .ok_or_else(malformed)?;
        let revision = digits.parse::<u64>().map_err(|_| malformed())?;
        if revision == 0 || (digits.len() > 1 && digits.starts_with('0')) {
            return Err(malformed());
        }

        Ok(Self {
            external_id,
            revision_id: RevisionId::new(revision),
        })
    }
}

impl Display for SnapshotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/r{}.json", self.external_id, self.revision_id)
    }
}

///
/// TESTS
///
