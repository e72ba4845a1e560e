use crate::{
    hash::ContentHash,
    types::{EntityType, ExternalId, InternalId, RevisionId, SchemaVersion, Timestamp},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

///
/// MappingRow
///
/// One side of the hybrid id scheme: `(internal_id ↔ external_id)`.
/// One-to-one and immutable after creation.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MappingRow {
    pub internal_id: InternalId,
    pub external_id: ExternalId,
    pub entity_type: EntityType,
}

///
/// EditKind
///
/// Classification of a revision recorded alongside its metadata so dedupe
/// and the poller can branch without fetching the snapshot.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EditKind {
    Normal,
    Redirect,
    RedirectRevert,
    SoftDelete,
    HardDelete,
    Undelete,
}

impl EditKind {
    /// Tombstone revisions never satisfy content-hash dedupe.
    #[must_use]
    pub const fn is_tombstone(self) -> bool {
        matches!(self, Self::Redirect | Self::SoftDelete | Self::HardDelete)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Redirect => "redirect",
            Self::RedirectRevert => "redirect_revert",
            Self::SoftDelete => "soft_delete",
            Self::HardDelete => "hard_delete",
            Self::Undelete => "undelete",
        }
    }
}

///
/// ValidationStatus
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    #[default]
    Pending,
    Valid,
    Invalid,
}

///
/// RevisionRow
///
/// Metadata tuple for one immutable revision. The snapshot URI is derived,
/// never stored.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RevisionRow {
    pub internal_id: InternalId,
    pub revision_id: RevisionId,
    pub created_at: Timestamp,
    pub created_by: String,
    pub size_bytes: u64,
    pub is_mass_edit: bool,
    pub validation_status: ValidationStatus,
    pub schema_version: SchemaVersion,
    pub content_hash: Option<ContentHash>,
    pub edit_kind: EditKind,
}

///
/// ProtectionFlags
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProtectionFlags {
    pub is_semi_protected: bool,
    pub is_locked: bool,
    pub is_archived: bool,
    pub is_mass_edit_protected: bool,
}

///
/// HeadRow
///
/// Exactly one row per entity: the authoritative pointer plus status flags.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HeadRow {
    pub internal_id: InternalId,
    pub head_revision_id: RevisionId,
    pub updated_at: Timestamp,
    pub flags: ProtectionFlags,
    pub is_deleted: bool,
    pub redirects_to: Option<InternalId>,
}

impl HeadRow {
    /// The cursor position of this head in the change feed.
    #[must_use]
    pub const fn cursor(&self) -> HeadCursor {
        HeadCursor {
            updated_at: self.updated_at,
            internal_id: self.internal_id,
        }
    }
}

///
/// HeadCursor
///
/// Change-feed position: `updated_at` ordered, ties broken by internal id.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct HeadCursor {
    pub updated_at: Timestamp,
    pub internal_id: InternalId,
}

impl Ord for HeadCursor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.updated_at
            .cmp(&other.updated_at)
            .then(self.internal_id.cmp(&other.internal_id))
    }
}

impl PartialOrd for HeadCursor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

///
/// DeleteType
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteType {
    Soft,
    Hard,
}

///
/// DeleteAudit
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DeleteAudit {
    pub internal_id: InternalId,
    pub delete_type: DeleteType,
    pub reason: String,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub timestamp: Timestamp,
    pub retention_expiry: Option<Timestamp>,
}

///
/// RedirectRow
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RedirectRow {
    pub from_internal_id: InternalId,
    pub to_internal_id: InternalId,
    pub created_at: Timestamp,
    pub created_by: String,
}

///
/// TESTS
///
