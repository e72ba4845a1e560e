use crate::{
    db::{
        StoreCtx,
        alloc::AllocatorError,
        event::{EntityChangeEvent, PublishOutcome},
        meta::{
            DeleteAudit, DeleteType, EditKind, HeadRow, MappingInsert, MappingRow,
            ProtectionFlags, RedirectRow, RevisionInsert, RevisionRow, ValidationStatus,
        },
        protect::{self, Decision, EditDescriptor},
        snapshot::{PublicationState, SnapshotEnvelope, SnapshotKey},
        write::request::{WriteError, WriteOutcome, WriteRequest},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    hash::{ContentHash, content_hash},
    obs::{CacheKind, MetricsEvent},
    types::{ExternalId, InternalId, RevisionId, Timestamp},
    validate::validate_entity_body,
};
use serde_json::Value as JsonValue;
use std::sync::Arc;

///
/// RevisionIntent
///
/// What kind of revision a plan writes. Lifecycle services reuse the whole
/// pipeline and differ only here.
///

#[derive(Clone, Debug)]
pub(crate) enum RevisionIntent {
    Normal,
    Redirect {
        target_external: ExternalId,
        target_internal: InternalId,
    },
    RedirectRevert,
    SoftDelete {
        reason: String,
        approved_by: Option<String>,
        retention_expiry: Option<Timestamp>,
    },
    HardDelete {
        reason: String,
        approved_by: Option<String>,
        retention_expiry: Option<Timestamp>,
    },
    Undelete,
}

impl RevisionIntent {
    pub(crate) const fn edit_kind(&self) -> EditKind {
        match self {
            Self::Normal => EditKind::Normal,
            Self::Redirect { .. } => EditKind::Redirect,
            Self::RedirectRevert => EditKind::RedirectRevert,
            Self::SoftDelete { .. } => EditKind::SoftDelete,
            Self::HardDelete { .. } => EditKind::HardDelete,
            Self::Undelete => EditKind::Undelete,
        }
    }

    /// Content-hash dedupe applies only to plain edits; lifecycle revisions
    /// change state even when the body bytes repeat.
    const fn allows_dedupe(&self) -> bool {
        matches!(self, Self::Normal)
    }
}

///
/// WritePlan
///
/// Fully resolved input to one pipeline run.
///

#[derive(Clone, Debug)]
pub(crate) struct WritePlan {
    pub external_id: ExternalId,
    pub entity: JsonValue,
    pub edit_type: String,
    pub actor: String,
    pub edit: EditDescriptor,
    pub flags: Option<ProtectionFlags>,
    pub intent: RevisionIntent,
    pub allow_create: bool,
}

///
/// WritePipeline
///
/// Orchestrates validate → resolve → dedupe → assign rev → snapshot
/// (pending) → metadata insert → head CAS → publish → cache/event.
/// Linearizable per entity: every restart re-enters at the head load, and
/// at most one writer wins each revision step.
///

pub struct WritePipeline {
    ctx: Arc<StoreCtx>,
}

impl WritePipeline {
    #[must_use]
    pub(crate) const fn new(ctx: Arc<StoreCtx>) -> Self {
        Self { ctx }
    }

    /// Execute one normal edit.
    pub fn execute(&self, request: WriteRequest) -> Result<WriteOutcome, WriteError> {
        let plan = WritePlan {
            external_id: request.external_id,
            entity: request.entity,
            edit_type: request.edit_type,
            actor: request.actor,
            edit: EditDescriptor {
                is_mass_edit: request.is_mass_edit,
                is_not_autoconfirmed_user: request.is_not_autoconfirmed_user,
            },
            flags: request.flags,
            intent: RevisionIntent::Normal,
            allow_create: true,
        };

        self.execute_plan(plan)
    }

    pub(crate) fn execute_plan(&self, plan: WritePlan) -> Result<WriteOutcome, WriteError> {
        self.ctx.metrics.record(MetricsEvent::WriteStarted);

        validate_entity_body(&plan.external_id, &plan.entity)?;

        if self.ctx.config.write.outbox_blocking
            && self.ctx.outbox.has_pending_for(&plan.external_id)
        {
            return Err(WriteError::TransientUnavailable(format!(
                "outbox has unfinished emissions for {}",
                plan.external_id
            )));
        }

        // Step 1: resolve or allocate the internal id.
        let mapping = self.resolve_or_allocate(&plan)?;
        let hash = content_hash(&plan.entity);

        let budget = self.ctx.config.write.cas_retry_budget;
        let mut bypass_cache = false;

        for attempt in 0..=budget {
            match self.attempt(&plan, &mapping, hash, bypass_cache)? {
                Attempt::Committed(outcome) => return Ok(outcome),
                Attempt::Restart => {
                    self.ctx.metrics.record(MetricsEvent::CasConflict);
                    bypass_cache = true;
                    // Brief backoff so the winning writer can move the head
                    // before the next probe.
                    std::thread::sleep(std::time::Duration::from_millis(u64::from(attempt.min(8))));
                }
            }
        }

        Err(WriteError::TransientUnavailable(format!(
            "write to {} lost {budget} consecutive head races",
            plan.external_id
        )))
    }

    // One pass through steps 2-10. `Restart` means: reload the head and try
    // again; never resume mid-pipeline.
    fn attempt(
        &self,
        plan: &WritePlan,
        mapping: &MappingRow,
        hash: ContentHash,
        bypass_cache: bool,
    ) -> Result<Attempt, WriteError> {
        let internal_id = mapping.internal_id;

        // Step 2: load head. A missing row reads as revision zero.
        let head = self.load_head(internal_id, bypass_cache)?;
        let head_rev = head
            .as_ref()
            .map_or(RevisionId::NONE, |h| h.head_revision_id);

        // Step 3: protection, re-evaluated on every restart.
        if let Decision::Reject(reason) = protect::evaluate(head.as_ref(), plan.edit) {
            return Err(WriteError::ProtectionDenied(reason));
        }

        // Step 4: content-hash dedupe against the current head revision.
        if plan.intent.allows_dedupe()
            && !head_rev.is_none()
            && let Some(head_row) = self.ctx.meta.get_revision(internal_id, head_rev)?
            && !head_row.edit_kind.is_tombstone()
            && head_row.content_hash == Some(hash)
        {
            self.ctx.metrics.record(MetricsEvent::DedupeHit);

            return Ok(Attempt::Committed(WriteOutcome {
                external_id: plan.external_id.clone(),
                internal_id,
                revision_id: head_rev,
                content_hash: hash,
                deduplicated: true,
            }));
        }

        // Step 5: assign the revision. Always head + 1: a collision with an
        // orphan row parks the writer until the reconciler completes or
        // abandons the interrupted write that left it.
        let new_rev = head_rev.next();

        let now = Timestamp::from_millis(self.ctx.clock.now_millis());
        let envelope = self.build_envelope(plan, new_rev, now, hash);
        let bytes = envelope.to_bytes()?;
        if bytes.len() > crate::MAX_SNAPSHOT_BYTES {
            return Err(WriteError::WriteFailed(format!(
                "snapshot of {} bytes exceeds the {} byte limit",
                bytes.len(),
                crate::MAX_SNAPSHOT_BYTES
            )));
        }
        let key = SnapshotKey::new(plan.external_id.clone(), new_rev);

        // Phase A: pending snapshot. Failure aborts with no metadata
        // touched. A published object already at this key means the head
        // moved past us while we raced; that is a restart, not a failure.
        if let Err(err) = self
            .ctx
            .snapshots
            .put(&key, bytes.clone(), PublicationState::Pending)
        {
            if err.class == ErrorClass::InvariantViolation {
                log::debug!("{key} already published under a newer head; restarting");
                return Ok(Attempt::Restart);
            }

            return Err(WriteError::WriteFailed(err.to_string()));
        }

        // Phase B: metadata insert, idempotent on (internal_id, revision_id).
        let row = RevisionRow {
            internal_id,
            revision_id: new_rev,
            created_at: now,
            created_by: plan.actor.clone(),
            size_bytes: bytes.len() as u64,
            is_mass_edit: plan.edit.is_mass_edit,
            validation_status: ValidationStatus::Pending,
            schema_version: self.ctx.config.schema.current_schema_version,
            content_hash: Some(hash),
            edit_kind: plan.intent.edit_kind(),
        };
        match self.ctx.meta.insert_revision(row)? {
            RevisionInsert::Inserted => {}
            RevisionInsert::AlreadyExists(existing) => {
                let ours = existing.content_hash == Some(hash)
                    && existing.created_by == plan.actor
                    && existing.edit_kind == plan.intent.edit_kind();
                if !ours {
                    // A competing writer claimed this revision id. The
                    // pending object stays for the reconciler to rule on.
                    log::debug!(
                        "revision {new_rev} of {} taken by a competing writer; restarting",
                        plan.external_id
                    );
                    return Ok(Attempt::Restart);
                }
            }
        }

        // Phase C: head CAS. Flags, deletion state, and redirect pointer
        // move atomically with the pointer.
        let new_head = self.build_head(plan, head.as_ref(), internal_id, new_rev, now);
        if !self.ctx.meta.cas_head(internal_id, head_rev, new_head.clone())? {
            return Ok(Attempt::Restart);
        }

        // Phase D: publish. The tag must cover the bytes this revision
        // committed; a racing loser may have re-put the pending object.
        self.publish_snapshot(&key, hash, &bytes);

        // Phase E: intent side effects, cache write-through, change event.
        self.apply_intent_effects(plan, mapping, now)?;
        self.ctx.cache.put_head(new_head);
        self.emit_event(plan, head_rev, new_rev, now);
        self.ctx.metrics.record(MetricsEvent::WriteCommitted);

        Ok(Attempt::Committed(WriteOutcome {
            external_id: plan.external_id.clone(),
            internal_id,
            revision_id: new_rev,
            content_hash: hash,
            deduplicated: false,
        }))
    }

    // -- step helpers ----------------------------------------------------

    fn resolve_or_allocate(&self, plan: &WritePlan) -> Result<MappingRow, WriteError> {
        if let Some(mapping) = self.ctx.cache.get_mapping(&plan.external_id) {
            self.ctx.metrics.record(MetricsEvent::CacheHit {
                cache: CacheKind::IdMap,
            });
            return Ok(mapping);
        }
        self.ctx.metrics.record(MetricsEvent::CacheMiss {
            cache: CacheKind::IdMap,
        });

        if let Some(mapping) = self.ctx.meta.resolve_external(&plan.external_id)? {
            self.ctx.cache.put_mapping(mapping.clone());
            return Ok(mapping);
        }
        if !plan.allow_create {
            return Err(WriteError::EntityNotFound(plan.external_id.clone()));
        }

        let budget = self.ctx.config.allocator.allocator_retry_budget;
        for _ in 0..budget {
            let candidate = self.ctx.allocator.generate().map_err(map_allocator_error)?;
            let row = MappingRow {
                internal_id: candidate,
                external_id: plan.external_id.clone(),
                entity_type: plan.external_id.entity_type(),
            };
            match self.ctx.meta.insert_mapping(row.clone())? {
                MappingInsert::Inserted => {
                    self.ctx.cache.put_mapping(row.clone());
                    return Ok(row);
                }
                MappingInsert::ExternalExists(existing) => {
                    // Lost the creation race; the winner's mapping stands.
                    self.ctx.cache.put_mapping(existing.clone());
                    return Ok(existing);
                }
                MappingInsert::InternalCollision => {
                    self.ctx.metrics.record(MetricsEvent::AllocatorCollision);
                }
            }
        }

        Err(WriteError::TransientUnavailable(format!(
            "internal id allocation exhausted after {budget} retries"
        )))
    }

    fn load_head(
        &self,
        internal_id: InternalId,
        bypass_cache: bool,
    ) -> Result<Option<HeadRow>, InternalError> {
        if !bypass_cache {
            if let Some(head) = self.ctx.cache.get_head(internal_id) {
                self.ctx.metrics.record(MetricsEvent::CacheHit {
                    cache: CacheKind::Head,
                });
                return Ok(Some(head));
            }
            self.ctx.metrics.record(MetricsEvent::CacheMiss {
                cache: CacheKind::Head,
            });
        }

        let head = self.ctx.meta.get_head(internal_id)?;
        if let Some(head) = &head {
            self.ctx.cache.put_head(head.clone());
        }

        Ok(head)
    }

    fn build_envelope(
        &self,
        plan: &WritePlan,
        revision_id: RevisionId,
        now: Timestamp,
        hash: ContentHash,
    ) -> SnapshotEnvelope {
        let mut envelope = SnapshotEnvelope {
            schema_version: self.ctx.config.schema.current_schema_version,
            revision_id,
            created_at: now,
            created_by: plan.actor.clone(),
            entity_type: plan.external_id.entity_type(),
            edit_type: plan.edit_type.clone(),
            content_hash: hash,
            redirects_to: None,
            is_deleted: false,
            deletion_reason: None,
            deleted_at: None,
            deleted_by: None,
            is_mass_edit: plan.edit.is_mass_edit,
            entity: plan.entity.clone(),
        };

        match &plan.intent {
            RevisionIntent::Normal
            | RevisionIntent::RedirectRevert
            | RevisionIntent::Undelete => {}
            RevisionIntent::Redirect {
                target_external, ..
            } => {
                envelope.redirects_to = Some(target_external.clone());
            }
            RevisionIntent::SoftDelete { reason, .. }
            | RevisionIntent::HardDelete { reason, .. } => {
                envelope.is_deleted = true;
                envelope.deletion_reason = Some(reason.clone());
                envelope.deleted_at = Some(now);
                envelope.deleted_by = Some(plan.actor.clone());
            }
        }

        envelope
    }

    fn build_head(
        &self,
        plan: &WritePlan,
        prior: Option<&HeadRow>,
        internal_id: InternalId,
        new_rev: RevisionId,
        now: Timestamp,
    ) -> HeadRow {
        let flags = plan
            .flags
            .unwrap_or_else(|| prior.map_or_else(ProtectionFlags::default, |h| h.flags));
        let (is_deleted, redirects_to) = match &plan.intent {
            RevisionIntent::Normal
            | RevisionIntent::RedirectRevert
            | RevisionIntent::SoftDelete { .. }
            | RevisionIntent::Undelete => (false, None),
            RevisionIntent::Redirect {
                target_internal, ..
            } => (false, Some(*target_internal)),
            RevisionIntent::HardDelete { .. } => (true, None),
        };

        HeadRow {
            internal_id,
            head_revision_id: new_rev,
            updated_at: now,
            flags,
            is_deleted,
            redirects_to,
        }
    }

    // Publish must tag the bytes this revision committed: a racing loser
    // may have re-put the pending object between our put and the CAS.
    fn publish_snapshot(&self, key: &SnapshotKey, hash: ContentHash, bytes: &[u8]) {
        let verified = self
            .ctx
            .snapshots
            .get(key)
            .ok()
            .flatten()
            .and_then(|object| SnapshotEnvelope::from_bytes(&object.bytes).ok())
            .is_some_and(|envelope| envelope.content_hash == hash);

        if !verified
            && let Err(err) =
                self.ctx
                    .snapshots
                    .put(key, bytes.to_vec(), PublicationState::Pending)
        {
            log::warn!("re-put of {key} before publish failed: {err}; reconciler will rule");
            return;
        }

        if let Err(err) = self.ctx.snapshots.set_published(key) {
            // Head already advanced; the reconciler retags.
            log::warn!("publish tag of {key} failed: {err}; deferred to reconciler");
        }
    }

    fn apply_intent_effects(
        &self,
        plan: &WritePlan,
        mapping: &MappingRow,
        now: Timestamp,
    ) -> Result<(), InternalError> {
        match &plan.intent {
            RevisionIntent::Normal | RevisionIntent::Undelete => Ok(()),
            RevisionIntent::Redirect {
                target_internal, ..
            } => {
                // Re-targeting an existing redirect replaces the relation.
                self.ctx.meta.remove_redirect(mapping.internal_id)?;
                self.ctx.meta.create_redirect(RedirectRow {
                    from_internal_id: mapping.internal_id,
                    to_internal_id: *target_internal,
                    created_at: now,
                    created_by: plan.actor.clone(),
                })
            }
            RevisionIntent::RedirectRevert => self.ctx.meta.remove_redirect(mapping.internal_id),
            RevisionIntent::SoftDelete {
                reason,
                approved_by,
                retention_expiry,
            } => self.ctx.meta.record_delete_audit(DeleteAudit {
                internal_id: mapping.internal_id,
                delete_type: DeleteType::Soft,
                reason: reason.clone(),
                requested_by: plan.actor.clone(),
                approved_by: approved_by.clone(),
                timestamp: now,
                retention_expiry: *retention_expiry,
            }),
            RevisionIntent::HardDelete {
                reason,
                approved_by,
                retention_expiry,
            } => {
                self.ctx.meta.hard_delete_mark(DeleteAudit {
                    internal_id: mapping.internal_id,
                    delete_type: DeleteType::Hard,
                    reason: reason.clone(),
                    requested_by: plan.actor.clone(),
                    approved_by: approved_by.clone(),
                    timestamp: now,
                    retention_expiry: *retention_expiry,
                })?;
                // The id-map cache is invalidated only here.
                self.ctx.cache.invalidate_mapping(&plan.external_id);

                Ok(())
            }
        }
    }

    fn emit_event(
        &self,
        plan: &WritePlan,
        from: RevisionId,
        to: RevisionId,
        changed_at: Timestamp,
    ) {
        let event = EntityChangeEvent {
            external_id: plan.external_id.clone(),
            from_revision_id: (!from.is_none()).then_some(from),
            to_revision_id: to,
            changed_at,
        };

        match self.ctx.sink.publish(&event) {
            PublishOutcome::Ack => {}
            outcome @ (PublishOutcome::Retryable | PublishOutcome::Fatal) => {
                log::warn!(
                    "change event for {} rev {to} refused ({outcome:?}); parked in outbox",
                    plan.external_id
                );
                self.ctx.metrics.record(MetricsEvent::OutboxParked);
                if let Err(err) = self.ctx.outbox.enqueue(event) {
                    log::error!("outbox enqueue failed for {}: {err}", plan.external_id);
                }
            }
        }
    }
}

enum Attempt {
    Committed(WriteOutcome),
    Restart,
}

fn map_allocator_error(err: AllocatorError) -> WriteError {
    WriteError::Internal(InternalError::invariant(
        ErrorOrigin::Allocator,
        err.to_string(),
    ))
}
