//! Module: read
//! Responsibility: resolve → head → snapshot reads with gone/redirect
//! semantics.
//! Does not own: authority ordering. The head row is the source of truth;
//! the bare presence of a snapshot object proves nothing.

use crate::{
    db::{
        StoreCtx,
        meta::{HeadRow, MappingRow, RevisionRow},
        snapshot::{SnapshotEnvelope, SnapshotKey},
    },
    error::{ErrorOrigin, InternalError},
    obs::{CacheKind, MetricsEvent},
    types::{ExternalId, InternalId, RevisionId},
};
use serde_json::Value as JsonValue;
use std::sync::Arc;
use thiserror::Error as ThisError;

///
/// ReadError
///

#[derive(Debug, ThisError)]
pub enum ReadError {
    #[error("entity not found: {0}")]
    EntityNotFound(ExternalId),

    #[error("revision {revision_id} of {external_id} not found")]
    RevisionNotFound {
        external_id: ExternalId,
        revision_id: RevisionId,
    },

    #[error("entity {0} has no revisions")]
    NoRevisions(ExternalId),

    #[error("entity {0} is gone")]
    Gone(ExternalId),

    #[error("redirect chain via {via}")]
    RedirectChain { via: ExternalId },

    #[error(transparent)]
    Internal(InternalError),
}

impl From<InternalError> for ReadError {
    fn from(err: InternalError) -> Self {
        Self::Internal(err)
    }
}

///
/// EntityRead
///
/// Result of a head read. The caller decides whether to follow a redirect.
///

#[derive(Clone, Debug)]
pub enum EntityRead {
    Entity {
        revision_id: RevisionId,
        envelope: SnapshotEnvelope,
    },
    RedirectsTo {
        target: ExternalId,
    },
}

///
/// HistoryWindow
///

#[derive(Clone, Copy, Debug, Default)]
pub struct HistoryWindow {
    pub offset: usize,
    /// Zero means unbounded.
    pub limit: usize,
}

///
/// ReadPath
///

pub struct ReadPath {
    ctx: Arc<StoreCtx>,
}

impl ReadPath {
    #[must_use]
    pub(crate) const fn new(ctx: Arc<StoreCtx>) -> Self {
        Self { ctx }
    }

    /// Read the authoritative state of an entity by external id.
    pub fn get_entity(&self, external_id: &ExternalId) -> Result<EntityRead, ReadError> {
        let mapping = self.resolve(external_id)?;
        let head = self
            .load_head(mapping.internal_id)?
            .ok_or_else(|| ReadError::NoRevisions(external_id.clone()))?;

        if head.is_deleted {
            return Err(ReadError::Gone(external_id.clone()));
        }
        if let Some(target_internal) = head.redirects_to {
            let target = self
                .ctx
                .meta
                .get_mapping(target_internal)?
                .ok_or_else(|| {
                    InternalError::corruption(
                        ErrorOrigin::Meta,
                        format!("redirect target {target_internal} has no mapping"),
                    )
                })?;

            return Ok(EntityRead::RedirectsTo {
                target: target.external_id,
            });
        }

        let envelope = self.load_envelope(external_id, head.head_revision_id)?;

        Ok(EntityRead::Entity {
            revision_id: head.head_revision_id,
            envelope,
        })
    }

    /// Read an entity, following at most one redirect hop. A second hop is
    /// a chain and surfaces as an explicit error.
    pub fn get_entity_following_redirect(
        &self,
        external_id: &ExternalId,
    ) -> Result<EntityRead, ReadError> {
        match self.get_entity(external_id)? {
            EntityRead::RedirectsTo { target } => match self.get_entity(&target)? {
                read @ EntityRead::Entity { .. } => Ok(read),
                EntityRead::RedirectsTo { .. } => {
                    Err(ReadError::RedirectChain { via: target })
                }
            },
            read => Ok(read),
        }
    }

    /// Read one specific revision's full envelope. Revision reads serve the
    /// audit trail, so they stay available for hard-deleted entities.
    pub fn get_revision(
        &self,
        external_id: &ExternalId,
        revision_id: RevisionId,
    ) -> Result<SnapshotEnvelope, ReadError> {
        let mapping = self.resolve(external_id)?;
        self.ctx
            .meta
            .get_revision(mapping.internal_id, revision_id)?
            .ok_or_else(|| ReadError::RevisionNotFound {
                external_id: external_id.clone(),
                revision_id,
            })?;

        self.load_envelope(external_id, revision_id)
    }

    /// Read one revision's unwrapped entity body.
    pub fn get_raw_revision(
        &self,
        external_id: &ExternalId,
        revision_id: RevisionId,
    ) -> Result<JsonValue, ReadError> {
        Ok(self.get_revision(external_id, revision_id)?.entity)
    }

    /// List revision metadata ascending by revision id. Hard-deleted
    /// entities keep their history, tombstone included.
    pub fn get_history(
        &self,
        external_id: &ExternalId,
        window: HistoryWindow,
    ) -> Result<Vec<RevisionRow>, ReadError> {
        let mapping = self.resolve(external_id)?;
        let mut rows = self.ctx.meta.list_history(mapping.internal_id)?;

        if window.offset > 0 {
            rows.drain(..window.offset.min(rows.len()));
        }
        if window.limit > 0 {
            rows.truncate(window.limit);
        }

        Ok(rows)
    }

    // -- internals -------------------------------------------------------

    fn load_head(&self, internal_id: InternalId) -> Result<Option<HeadRow>, ReadError> {
        if let Some(head) = self.ctx.cache.get_head(internal_id) {
            self.ctx.metrics.record(MetricsEvent::CacheHit {
                cache: CacheKind::Head,
            });
            return Ok(Some(head));
        }
        self.ctx.metrics.record(MetricsEvent::CacheMiss {
            cache: CacheKind::Head,
        });

        let head = self.ctx.meta.get_head(internal_id)?;
        if let Some(head) = &head {
            self.ctx.cache.put_head(head.clone());
        }

        Ok(head)
    }

    fn resolve(&self, external_id: &ExternalId) -> Result<MappingRow, ReadError> {
        if let Some(mapping) = self.ctx.cache.get_mapping(external_id) {
            self.ctx.metrics.record(MetricsEvent::CacheHit {
                cache: CacheKind::IdMap,
            });
            return Ok(mapping);
        }
        self.ctx.metrics.record(MetricsEvent::CacheMiss {
            cache: CacheKind::IdMap,
        });

        let mapping = self
            .ctx
            .meta
            .resolve_external(external_id)?
            .ok_or_else(|| ReadError::EntityNotFound(external_id.clone()))?;
        self.ctx.cache.put_mapping(mapping.clone());

        Ok(mapping)
    }

    fn load_envelope(
        &self,
        external_id: &ExternalId,
        revision_id: RevisionId,
    ) -> Result<SnapshotEnvelope, ReadError> {
        let key = SnapshotKey::new(external_id.clone(), revision_id);
        let object = self.ctx.snapshots.get(&key)?.ok_or_else(|| {
            InternalError::corruption(
                ErrorOrigin::Snapshot,
                format!("snapshot missing at {key}"),
            )
        })?;
        let envelope = SnapshotEnvelope::from_bytes(&object.bytes)?;
        envelope.check_version(self.ctx.config.schema.current_schema_version)?;

        Ok(envelope)
    }
}
