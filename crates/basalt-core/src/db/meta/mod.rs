//! Module: meta
//! Responsibility: typed access to the sharded relational metadata layer.
//! Does not own: snapshot bytes (snapshot gateway) or caching (cache layer).
//!
//! Invariants:
//! - Every operation is scoped to a single entity (single shard key).
//! - No multi-entity transactions exist on this surface.
//! - Contention surfaces as an unapplied CAS, never silently.

mod memory;
mod row;

pub use memory::MemoryMetadataStore;
pub use row::{
    DeleteAudit, DeleteType, EditKind, HeadCursor, HeadRow, MappingRow, ProtectionFlags,
    RedirectRow, RevisionRow, ValidationStatus,
};

use crate::{
    error::InternalError,
    types::{ExternalId, InternalId, RevisionId},
};

///
/// MappingInsert
///
/// Outcome of an id-mapping insert. A lost creation race hands back the
/// winning row so the caller can proceed against it.
///

#[derive(Clone, Debug)]
pub enum MappingInsert {
    Inserted,
    /// The external id is already mapped; the existing row wins.
    ExternalExists(MappingRow),
    /// The freshly allocated internal id collided; the caller re-allocates.
    InternalCollision,
}

///
/// RevisionInsert
///
/// Outcome of a revision-metadata insert, idempotent on
/// `(internal_id, revision_id)`.
///

#[derive(Clone, Debug)]
pub enum RevisionInsert {
    Inserted,
    /// A row already exists at that key; the caller decides whether it is
    /// its own earlier attempt or a competing writer.
    AlreadyExists(RevisionRow),
}

///
/// HeadLag
///
/// One entity whose metadata rows run ahead of its head pointer.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct HeadLag {
    pub internal_id: InternalId,
    pub head_revision_id: RevisionId,
    pub max_revision_id: RevisionId,
}

///
/// MetaStats
///
/// Row counts for storage reporting.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MetaStats {
    pub entities: u64,
    pub revisions: u64,
    pub redirects: u64,
    pub delete_audits: u64,
}

///
/// MetadataStore
///
/// Narrow typed gateway over the metadata tables. Implementations must be
/// linearizable per entity; the in-memory implementation doubles as the
/// test harness backend.
///

pub trait MetadataStore: Send + Sync {
    // -- id mapping ------------------------------------------------------

    fn resolve_external(&self, external_id: &ExternalId)
    -> Result<Option<MappingRow>, InternalError>;

    fn get_mapping(&self, internal_id: InternalId) -> Result<Option<MappingRow>, InternalError>;

    fn insert_mapping(&self, row: MappingRow) -> Result<MappingInsert, InternalError>;

    // -- heads and revisions ---------------------------------------------

    fn get_head(&self, internal_id: InternalId) -> Result<Option<HeadRow>, InternalError>;

    /// Tight next-revision probe: one past the highest metadata row,
    /// whether or not that row ever published.
    fn next_revision_id(&self, internal_id: InternalId) -> Result<RevisionId, InternalError>;

    fn get_revision(
        &self,
        internal_id: InternalId,
        revision_id: RevisionId,
    ) -> Result<Option<RevisionRow>, InternalError>;

    fn insert_revision(&self, row: RevisionRow) -> Result<RevisionInsert, InternalError>;

    /// Compare-and-swap the head pointer. Applies `new_head` only when the
    /// stored `head_revision_id` equals `expected` (`RevisionId::NONE` for a
    /// missing row). Flags, deletion state, and the redirect pointer are
    /// replaced atomically with the pointer.
    fn cas_head(
        &self,
        internal_id: InternalId,
        expected: RevisionId,
        new_head: HeadRow,
    ) -> Result<bool, InternalError>;

    fn list_history(&self, internal_id: InternalId) -> Result<Vec<RevisionRow>, InternalError>;

    /// Heads whose `(updated_at, internal_id)` cursor lies strictly beyond
    /// `cursor`, in cursor order, at most `limit` rows.
    fn list_heads_updated_since(
        &self,
        cursor: Option<HeadCursor>,
        limit: usize,
    ) -> Result<Vec<HeadRow>, InternalError>;

    /// Entities whose highest metadata revision lies beyond the head
    /// pointer (the reconciler's second sweep feed).
    fn list_lagging_heads(&self, limit: usize) -> Result<Vec<HeadLag>, InternalError>;

    // -- deletion --------------------------------------------------------

    /// Append a delete audit row (soft deletions).
    fn record_delete_audit(&self, audit: DeleteAudit) -> Result<(), InternalError>;

    /// Set `is_deleted` on the head and append the audit in one transaction
    /// (hard deletions).
    fn hard_delete_mark(&self, audit: DeleteAudit) -> Result<(), InternalError>;

    fn list_delete_audits(
        &self,
        internal_id: InternalId,
    ) -> Result<Vec<DeleteAudit>, InternalError>;

    // -- redirects -------------------------------------------------------

    fn create_redirect(&self, row: RedirectRow) -> Result<(), InternalError>;

    /// Drop the redirect relation rooted at `from` (redirect revert).
    fn remove_redirect(&self, from: InternalId) -> Result<(), InternalError>;

    fn get_redirect_target(&self, from: InternalId)
    -> Result<Option<InternalId>, InternalError>;

    fn get_incoming_redirects(&self, to: InternalId) -> Result<Vec<InternalId>, InternalError>;

    // -- reporting -------------------------------------------------------

    fn stats(&self) -> Result<MetaStats, InternalError>;
}
