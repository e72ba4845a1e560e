//! Module: reconcile
//! Responsibility: restoring the write invariants after partial failures.
//! Does not own: new writes. Every effect here is idempotent, per entity,
//! and never moves a head backward.
//!
//! Repairs, in order of discovery:
//! - pending object without a metadata row: insert the row from envelope
//!   fields, or abandon past the ttl (object stays; immutability).
//! - pending object at or below the head: retag published.
//! - metadata row one past the head with its object present: publish, then
//!   advance the head via CAS.
//! - parked change events: drain the outbox into the sink.
//!
//! A snapshot whose content hash disagrees with its metadata row is an
//! invariant violation: logged loudly, skipped, never rewritten.

use crate::{
    db::{
        StoreCtx,
        meta::{EditKind, HeadRow, MappingRow, ProtectionFlags, RevisionInsert, RevisionRow,
            ValidationStatus},
        snapshot::{PublicationState, SnapshotEnvelope, SnapshotKey},
    },
    error::{ErrorOrigin, InternalError},
    obs::{MetricsEvent, RepairKind},
    types::{InternalId, RevisionId, Timestamp},
};
use parking_lot::Mutex;
use std::{collections::BTreeSet, sync::Arc};

const LAG_SCAN_LIMIT: usize = 1_024;
const OUTBOX_DRAIN_BATCH: usize = 256;

///
/// ReconcileReport
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ReconcileReport {
    pub meta_inserted: u64,
    pub republished: u64,
    pub heads_advanced: u64,
    pub abandoned: u64,
    pub outbox_drained: u64,
    pub invariant_faults: u64,
}

///
/// Reconciler
///
/// Background sweep over pending snapshots and lagging heads. Safe to run
/// any number of times on any reachable state.
///

pub struct Reconciler {
    ctx: Arc<StoreCtx>,
    abandoned: Mutex<BTreeSet<SnapshotKey>>,
}

impl Reconciler {
    #[must_use]
    pub(crate) fn new(ctx: Arc<StoreCtx>) -> Self {
        Self {
            ctx,
            abandoned: Mutex::new(BTreeSet::new()),
        }
    }

    /// One full sweep. Returns what was repaired.
    pub fn run_once(&self) -> Result<ReconcileReport, InternalError> {
        let mut report = ReconcileReport::default();
        let now = Timestamp::from_millis(self.ctx.clock.now_millis());

        // Sweep 1: pending snapshots, oldest first.
        for pending in self.ctx.snapshots.list_pending_older_than(now)? {
            self.repair_pending(&pending.key, pending.put_at, now, &mut report)?;
        }

        // Sweep 2: heads lagging behind their metadata rows.
        for lag in self.ctx.meta.list_lagging_heads(LAG_SCAN_LIMIT)? {
            self.advance_entity(lag.internal_id, &mut report)?;
        }

        // Sweep 3: parked change events.
        let drained = self.ctx.outbox.drain(self.ctx.sink.as_ref(), OUTBOX_DRAIN_BATCH);
        if drained > 0 {
            report.outbox_drained = drained as u64;
            self.ctx.metrics.record(MetricsEvent::OutboxDrained {
                events: drained as u64,
            });
        }

        Ok(report)
    }

    // -- pending-object repair -------------------------------------------

    fn repair_pending(
        &self,
        key: &SnapshotKey,
        put_at: Timestamp,
        now: Timestamp,
        report: &mut ReconcileReport,
    ) -> Result<(), InternalError> {
        let Some(mapping) = self.ctx.meta.resolve_external(&key.external_id)? else {
            log::error!("pending snapshot {key} has no id mapping; skipping");
            report.invariant_faults += 1;
            return Ok(());
        };
        let internal_id = mapping.internal_id;

        let Some((envelope, size_bytes)) = self.decode(key, report)? else {
            return Ok(());
        };
        if envelope.revision_id != key.revision_id {
            log::error!(
                "pending snapshot {key} carries revision {}; skipping",
                envelope.revision_id
            );
            report.invariant_faults += 1;
            return Ok(());
        }

        let meta_row = self.ctx.meta.get_revision(internal_id, key.revision_id)?;
        match meta_row {
            None => {
                let age_ms = now.as_millis().saturating_sub(put_at.as_millis());
                if age_ms >= self.ctx.config.reconciler.abandonment_ttl_ms {
                    self.abandon(key, report);
                    return Ok(());
                }

                // Complete the interrupted phase B from envelope fields.
                let row = revision_row_from_envelope(internal_id, &envelope, size_bytes);
                if matches!(
                    self.ctx.meta.insert_revision(row)?,
                    RevisionInsert::Inserted
                ) {
                    report.meta_inserted += 1;
                    self.ctx.metrics.record(MetricsEvent::ReconcilerRepair {
                        kind: RepairKind::MetaInserted,
                    });
                }
            }
            Some(row) => {
                if !hashes_agree(&row, &envelope) {
                    log::error!(
                        "snapshot {key} hash disagrees with its metadata row; not repairing"
                    );
                    report.invariant_faults += 1;
                    return Ok(());
                }
            }
        }

        // Already behind the head: only the tag is missing.
        let head_rev = self
            .ctx
            .meta
            .get_head(internal_id)?
            .map_or(RevisionId::NONE, |h| h.head_revision_id);
        if head_rev >= key.revision_id {
            self.ctx.snapshots.set_published(key)?;
            report.republished += 1;
            self.ctx.metrics.record(MetricsEvent::ReconcilerRepair {
                kind: RepairKind::Republished,
            });
            return Ok(());
        }

        self.advance_entity(internal_id, report)
    }

    // -- head advancement ------------------------------------------------

    // Walk committed-but-unadvanced revisions one step at a time:
    // publish the object, then CAS the head forward. Gaps stop the walk;
    // they belong to writes that never reached phase B.
    fn advance_entity(
        &self,
        internal_id: InternalId,
        report: &mut ReconcileReport,
    ) -> Result<(), InternalError> {
        let Some(mapping) = self.ctx.meta.get_mapping(internal_id)? else {
            return Ok(());
        };

        loop {
            let head = self.ctx.meta.get_head(internal_id)?;
            let head_rev = head.as_ref().map_or(RevisionId::NONE, |h| h.head_revision_id);
            let next = head_rev.next();

            let Some(row) = self.ctx.meta.get_revision(internal_id, next)? else {
                return Ok(());
            };
            let key = SnapshotKey::new(mapping.external_id.clone(), next);
            let Some(object) = self.ctx.snapshots.get(&key)? else {
                log::error!("metadata row {key} has no snapshot object; not repairing");
                report.invariant_faults += 1;
                return Ok(());
            };
            let envelope = match SnapshotEnvelope::from_bytes(&object.bytes) {
                Ok(envelope) => envelope,
                Err(err) => {
                    log::error!("snapshot {key} undecodable: {err}; not repairing");
                    report.invariant_faults += 1;
                    return Ok(());
                }
            };
            if !hashes_agree(&row, &envelope) {
                log::error!("snapshot {key} hash disagrees with its metadata row; not repairing");
                report.invariant_faults += 1;
                return Ok(());
            }

            if object.state == PublicationState::Pending {
                self.ctx.snapshots.set_published(&key)?;
                report.republished += 1;
                self.ctx.metrics.record(MetricsEvent::ReconcilerRepair {
                    kind: RepairKind::Republished,
                });
            }

            let new_head = self.rebuild_head(&mapping, head.as_ref(), &row, &envelope)?;
            if !self.ctx.meta.cas_head(internal_id, head_rev, new_head.clone())? {
                // A live writer advanced concurrently; its pipeline owns the
                // remaining repairs.
                return Ok(());
            }
            if row.edit_kind == EditKind::Redirect
                && let Some(target) = new_head.redirects_to
            {
                self.ctx.meta.remove_redirect(internal_id)?;
                self.ctx.meta.create_redirect(crate::db::meta::RedirectRow {
                    from_internal_id: internal_id,
                    to_internal_id: target,
                    created_at: row.created_at,
                    created_by: row.created_by.clone(),
                })?;
            }
            self.ctx.cache.put_head(new_head);
            report.heads_advanced += 1;
            self.ctx.metrics.record(MetricsEvent::ReconcilerRepair {
                kind: RepairKind::HeadAdvanced,
            });
        }
    }

    fn rebuild_head(
        &self,
        mapping: &MappingRow,
        prior: Option<&HeadRow>,
        row: &RevisionRow,
        envelope: &SnapshotEnvelope,
    ) -> Result<HeadRow, InternalError> {
        let redirects_to = match &envelope.redirects_to {
            Some(target_external) => {
                let target = self
                    .ctx
                    .meta
                    .resolve_external(target_external)?
                    .ok_or_else(|| {
                        InternalError::corruption(
                            ErrorOrigin::Reconciler,
                            format!("redirect target {target_external} unresolvable"),
                        )
                    })?;
                Some(target.internal_id)
            }
            None => None,
        };

        Ok(HeadRow {
            internal_id: mapping.internal_id,
            head_revision_id: row.revision_id,
            updated_at: Timestamp::from_millis(self.ctx.clock.now_millis()),
            flags: prior.map_or_else(ProtectionFlags::default, |h| h.flags),
            is_deleted: row.edit_kind == EditKind::HardDelete,
            redirects_to,
        })
    }

    // -- helpers ---------------------------------------------------------

    fn decode(
        &self,
        key: &SnapshotKey,
        report: &mut ReconcileReport,
    ) -> Result<Option<(SnapshotEnvelope, u64)>, InternalError> {
        let Some(object) = self.ctx.snapshots.get(key)? else {
            return Ok(None);
        };
        match SnapshotEnvelope::from_bytes(&object.bytes) {
            Ok(envelope) => Ok(Some((envelope, object.bytes.len() as u64))),
            Err(err) => {
                log::error!("pending snapshot {key} undecodable: {err}; skipping");
                report.invariant_faults += 1;
                Ok(None)
            }
        }
    }

    fn abandon(&self, key: &SnapshotKey, report: &mut ReconcileReport) {
        let mut abandoned = self.abandoned.lock();
        if abandoned.insert(key.clone()) {
            // The object stays in place; revisions are never deleted here.
            log::warn!("abandoning orphan pending snapshot {key}");
            report.abandoned += 1;
            self.ctx.metrics.record(MetricsEvent::ReconcilerRepair {
                kind: RepairKind::Abandoned,
            });
        }
    }
}

fn hashes_agree(row: &RevisionRow, envelope: &SnapshotEnvelope) -> bool {
    row.content_hash
        .is_none_or(|hash| hash == envelope.content_hash)
}

fn revision_row_from_envelope(
    internal_id: InternalId,
    envelope: &SnapshotEnvelope,
    size_bytes: u64,
) -> RevisionRow {
    RevisionRow {
        internal_id,
        revision_id: envelope.revision_id,
        created_at: envelope.created_at,
        created_by: envelope.created_by.clone(),
        size_bytes,
        is_mass_edit: envelope.is_mass_edit,
        validation_status: ValidationStatus::Pending,
        schema_version: envelope.schema_version,
        content_hash: Some(envelope.content_hash),
        edit_kind: envelope.edit_kind(),
    }
}
