use crate::{
    db::{
        StoreCtx,
        meta::{EditKind, MappingRow},
        protect::{EditDescriptor, ProtectionReason},
        snapshot::{SnapshotEnvelope, SnapshotKey},
        write::{
            RedirectViolation, RevisionIntent, WriteError, WriteOutcome, WritePipeline, WritePlan,
        },
    },
    error::{ErrorOrigin, InternalError},
    types::{ExternalId, RevisionId},
};
use serde_json::json;
use std::sync::Arc;

///
/// RedirectRequest
///

#[derive(Clone, Debug)]
pub struct RedirectRequest {
    pub source: ExternalId,
    pub target: ExternalId,
    pub actor: String,
}

///
/// RedirectRevertRequest
///
/// Restores the source entity to the body of a named prior revision and
/// clears the redirect pointer.
///

#[derive(Clone, Debug)]
pub struct RedirectRevertRequest {
    pub source: ExternalId,
    pub restore_to_revision: RevisionId,
    pub actor: String,
}

///
/// RedirectService
///
/// Redirect creation writes a minimal tombstone revision on the source:
/// empty body, non-null `redirects_to`. Strictly single-hop; chains and
/// cycles are rejected up front, and again under the CAS retry loop because
/// the pipeline re-evaluates protection on every restart.
///

pub struct RedirectService {
    ctx: Arc<StoreCtx>,
    pipeline: WritePipeline,
}

impl RedirectService {
    #[must_use]
    pub(crate) fn new(ctx: Arc<StoreCtx>) -> Self {
        Self {
            pipeline: WritePipeline::new(ctx.clone()),
            ctx,
        }
    }

    pub fn create(&self, request: RedirectRequest) -> Result<WriteOutcome, WriteError> {
        if request.source == request.target {
            return Err(WriteError::InvalidRedirect(RedirectViolation::SelfTarget));
        }

        let source = self.resolve(&request.source)?;
        let target = self.resolve(&request.target)?;

        // Target must be a live, non-redirect entity.
        let target_head = self
            .ctx
            .meta
            .get_head(target.internal_id)?
            .ok_or_else(|| WriteError::NoRevisions(request.target.clone()))?;
        if target_head.is_deleted {
            return Err(WriteError::Gone(request.target.clone()));
        }
        if target_head.flags.is_archived {
            return Err(WriteError::ProtectionDenied(ProtectionReason::Archived));
        }
        if target_head.flags.is_locked {
            return Err(WriteError::ProtectionDenied(ProtectionReason::Locked));
        }
        // One lookup settles both hazards: a target pointing back at the
        // source closes a cycle, any other pointer makes a chain.
        if let Some(beyond) = self.ctx.meta.get_redirect_target(target.internal_id)? {
            let violation = if beyond == source.internal_id {
                RedirectViolation::Cycle
            } else {
                RedirectViolation::Chain
            };
            return Err(WriteError::InvalidRedirect(violation));
        }

        self.pipeline.execute_plan(WritePlan {
            external_id: request.source,
            entity: json!({}),
            edit_type: EditKind::Redirect.as_str().to_string(),
            actor: request.actor,
            edit: EditDescriptor::default(),
            flags: None,
            intent: RevisionIntent::Redirect {
                target_external: request.target,
                target_internal: target.internal_id,
            },
            allow_create: false,
        })
    }

    pub fn revert(&self, request: RedirectRevertRequest) -> Result<WriteOutcome, WriteError> {
        let source = self.resolve(&request.source)?;

        let head = self
            .ctx
            .meta
            .get_head(source.internal_id)?
            .ok_or_else(|| WriteError::NoRevisions(request.source.clone()))?;
        if head.redirects_to.is_none() {
            return Err(WriteError::WriteFailed(format!(
                "{} is not a redirect",
                request.source
            )));
        }

        // The restored body comes from the named prior revision.
        let row = self
            .ctx
            .meta
            .get_revision(source.internal_id, request.restore_to_revision)?
            .ok_or_else(|| WriteError::RevisionNotFound {
                external_id: request.source.clone(),
                revision_id: request.restore_to_revision,
            })?;
        let key = SnapshotKey::new(request.source.clone(), row.revision_id);
        let object = self.ctx.snapshots.get(&key)?.ok_or_else(|| {
            WriteError::Internal(InternalError::corruption(
                ErrorOrigin::Snapshot,
                format!("snapshot missing at {key}"),
            ))
        })?;
        let entity = SnapshotEnvelope::from_bytes(&object.bytes)?.entity;

        self.pipeline.execute_plan(WritePlan {
            external_id: request.source,
            entity,
            edit_type: EditKind::RedirectRevert.as_str().to_string(),
            actor: request.actor,
            edit: EditDescriptor::default(),
            flags: None,
            intent: RevisionIntent::RedirectRevert,
            allow_create: false,
        })
    }

    fn resolve(&self, external_id: &ExternalId) -> Result<MappingRow, WriteError> {
        self.ctx
            .meta
            .resolve_external(external_id)?
            .ok_or_else(|| WriteError::EntityNotFound(external_id.clone()))
    }
}
