use crate::{
    db::meta::EditKind,
    error::{ErrorOrigin, InternalError},
    hash::ContentHash,
    types::{EntityType, ExternalId, RevisionId, SchemaVersion, Timestamp},
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

///
/// SnapshotEnvelope
///
/// The complete, immutable JSON object stored per revision. Everything the
/// reconciler needs to rebuild a metadata row is in here; the entity body
/// itself travels opaquely.
///
/// Unknown fields are tolerated on read: minor schema revisions may add
/// fields, and readers accept the current and previous major.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SnapshotEnvelope {
    pub schema_version: SchemaVersion,
    pub revision_id: RevisionId,
    #[serde(with = "crate::types::timestamp::iso8601")]
    pub created_at: Timestamp,
    pub created_by: String,
    pub entity_type: EntityType,
    pub edit_type: String,
    pub content_hash: ContentHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirects_to: Option<ExternalId>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_deleted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_reason: Option<String>,
    #[serde(
        default,
        with = "crate::types::timestamp::iso8601_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub deleted_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_by: Option<String>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_mass_edit: bool,
    pub entity: JsonValue,
}

impl SnapshotEnvelope {
    pub fn to_bytes(&self) -> Result<Vec<u8>, InternalError> {
        serde_json::to_vec(self).map_err(|err| {
            InternalError::serialize(
                ErrorOrigin::Snapshot,
                format!("envelope encode failed: {err}"),
            )
        })
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, InternalError> {
        serde_json::from_slice(bytes).map_err(|err| {
            InternalError::corruption(
                ErrorOrigin::Snapshot,
                format!("envelope decode failed: {err}"),
            )
        })
    }

    /// Enforce the reader acceptance window: current and previous major.
    pub fn check_version(&self, current: SchemaVersion) -> Result<(), InternalError> {
        if current.accepts(self.schema_version) {
            return Ok(());
        }

        Err(InternalError::new(
            crate::error::ErrorClass::Unsupported,
            ErrorOrigin::Snapshot,
            format!(
                "envelope schema {} outside the acceptance window of {current}",
                self.schema_version
            ),
        ))
    }

    /// Reconstruct the revision classification from envelope flags.
    #[must_use]
    pub fn edit_kind(&self) -> EditKind {
        if self.redirects_to.is_some() {
            return EditKind::Redirect;
        }
        if self.is_deleted {
            return if self.edit_type == EditKind::HardDelete.as_str() {
                EditKind::HardDelete
            } else {
                EditKind::SoftDelete
            };
        }
        if self.edit_type == EditKind::RedirectRevert.as_str() {
            return EditKind::RedirectRevert;
        }
        if self.edit_type == EditKind::Undelete.as_str() {
            return EditKind::Undelete;
        }

        EditKind::Normal
    }
}

///
/// TESTS
///
