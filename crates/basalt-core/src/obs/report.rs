//! Storage reporting for operators: row and object counts across the
//! metadata layer, the snapshot store, and the outbox.

use crate::{
    db::{
        event::Outbox,
        meta::MetadataStore,
        snapshot::SnapshotStore,
    },
    error::InternalError,
};

///
/// StorageReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct StorageReport {
    pub entities: u64,
    pub revisions: u64,
    pub redirects: u64,
    pub delete_audits: u64,
    pub snapshot_objects: u64,
    pub pending_snapshots: u64,
    pub outbox_depth: u64,
}

/// Collect one storage report across the store surfaces.
pub fn storage_report(
    meta: &dyn MetadataStore,
    snapshots: &dyn SnapshotStore,
    outbox: &Outbox,
) -> Result<StorageReport, InternalError> {
    let meta_stats = meta.stats()?;
    let snapshot_stats = snapshots.stats()?;

    Ok(StorageReport {
        entities: meta_stats.entities,
        revisions: meta_stats.revisions,
        redirects: meta_stats.redirects,
        delete_audits: meta_stats.delete_audits,
        snapshot_objects: snapshot_stats.objects,
        pending_snapshots: snapshot_stats.pending,
        outbox_depth: outbox.len() as u64,
    })
}
