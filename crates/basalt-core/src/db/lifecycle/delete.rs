use crate::{
    db::{
        StoreCtx,
        lifecycle::head_entity_body,
        meta::{DeleteType, EditKind, MappingRow},
        protect::EditDescriptor,
        write::{RevisionIntent, WriteError, WriteOutcome, WritePipeline, WritePlan},
    },
    types::{ExternalId, Timestamp},
};
use std::sync::Arc;

///
/// DeleteRequest
///

#[derive(Clone, Debug)]
pub struct DeleteRequest {
    pub external_id: ExternalId,
    pub delete_type: DeleteType,
    pub reason: String,
    pub actor: String,
    pub approved_by: Option<String>,
    pub retention_expiry: Option<Timestamp>,
}

///
/// DeletionService
///
/// Soft and hard deletion, plus undeletion of soft-deleted entities. Both
/// deletion forms write the same tombstone snapshot (deletion flags set,
/// prior body preserved); only the hard form flips `head.is_deleted` and
/// thereby makes reads answer gone.
///

pub struct DeletionService {
    ctx: Arc<StoreCtx>,
    pipeline: WritePipeline,
}

impl DeletionService {
    #[must_use]
    pub(crate) fn new(ctx: Arc<StoreCtx>) -> Self {
        Self {
            pipeline: WritePipeline::new(ctx.clone()),
            ctx,
        }
    }

    pub fn delete(&self, request: DeleteRequest) -> Result<WriteOutcome, WriteError> {
        let mapping = self.resolve(&request.external_id)?;
        let head = self
            .ctx
            .meta
            .get_head(mapping.internal_id)?
            .ok_or_else(|| WriteError::NoRevisions(request.external_id.clone()))?;
        if head.is_deleted {
            return Err(WriteError::Gone(request.external_id.clone()));
        }

        // The tombstone preserves the body being deleted.
        let entity = head_entity_body(&self.ctx, &request.external_id, &head)?;

        let (edit_kind, intent) = match request.delete_type {
            DeleteType::Soft => (
                EditKind::SoftDelete,
                RevisionIntent::SoftDelete {
                    reason: request.reason,
                    approved_by: request.approved_by,
                    retention_expiry: request.retention_expiry,
                },
            ),
            DeleteType::Hard => (
                EditKind::HardDelete,
                RevisionIntent::HardDelete {
                    reason: request.reason,
                    approved_by: request.approved_by,
                    retention_expiry: request.retention_expiry,
                },
            ),
        };

        self.pipeline.execute_plan(WritePlan {
            external_id: request.external_id,
            entity,
            edit_type: edit_kind.as_str().to_string(),
            actor: request.actor,
            edit: EditDescriptor::default(),
            flags: None,
            intent,
            allow_create: false,
        })
    }

    /// Undelete a soft-deleted entity: a normal revision restoring the body
    /// the tombstone preserved. Hard-deleted entities cannot come back
    /// through this API.
    pub fn undelete(
        &self,
        external_id: ExternalId,
        actor: impl Into<String>,
    ) -> Result<WriteOutcome, WriteError> {
        let mapping = self.resolve(&external_id)?;
        let head = self
            .ctx
            .meta
            .get_head(mapping.internal_id)?
            .ok_or_else(|| WriteError::NoRevisions(external_id.clone()))?;
        if head.is_deleted {
            return Err(WriteError::Gone(external_id.clone()));
        }

        let head_row = self
            .ctx
            .meta
            .get_revision(mapping.internal_id, head.head_revision_id)?
            .ok_or_else(|| WriteError::RevisionNotFound {
                external_id: external_id.clone(),
                revision_id: head.head_revision_id,
            })?;
        if head_row.edit_kind != EditKind::SoftDelete {
            return Err(WriteError::WriteFailed(format!(
                "{external_id} is not soft-deleted"
            )));
        }

        let entity = head_entity_body(&self.ctx, &external_id, &head)?;

        self.pipeline.execute_plan(WritePlan {
            external_id,
            entity,
            edit_type: EditKind::Undelete.as_str().to_string(),
            actor: actor.into(),
            edit: EditDescriptor::default(),
            flags: None,
            intent: RevisionIntent::Undelete,
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
