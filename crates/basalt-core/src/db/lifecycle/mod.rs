//! Module: lifecycle
//! Responsibility: the specialized write paths (redirects, deletions, and
//! their reversals) layered over the standard pipeline.
//! Does not own: pipeline phases or protection policy.

mod delete;
mod redirect;

pub use delete::{DeleteRequest, DeletionService};
pub use redirect::{RedirectRequest, RedirectRevertRequest, RedirectService};

use crate::{
    db::{
        StoreCtx,
        meta::HeadRow,
        snapshot::{SnapshotEnvelope, SnapshotKey},
        write::WriteError,
    },
    error::{ErrorOrigin, InternalError},
    types::ExternalId,
};
use serde_json::Value as JsonValue;

// Load the entity body preserved in the head revision's snapshot.
pub(crate) fn head_entity_body(
    ctx: &StoreCtx,
    external_id: &ExternalId,
    head: &HeadRow,
) -> Result<JsonValue, WriteError> {
    let key = SnapshotKey::new(external_id.clone(), head.head_revision_id);
    let object = ctx.snapshots.get(&key)?.ok_or_else(|| {
        WriteError::Internal(InternalError::corruption(
            ErrorOrigin::Snapshot,
            format!("head snapshot missing at {key}"),
        ))
    })?;
    let envelope = SnapshotEnvelope::from_bytes(&object.bytes)?;

    Ok(envelope.entity)
}
