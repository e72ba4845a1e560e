use crate::{
    db::{meta::ProtectionFlags, protect::ProtectionReason},
    error::InternalError,
    hash::ContentHash,
    types::{ExternalId, InternalId, RevisionId},
    validate::ValidateError,
};
use serde_json::Value as JsonValue;
use std::fmt::{self, Display};
use thiserror::Error as ThisError;

///
/// WriteRequest
///
/// One normal edit: full entity body replacement on an existing or new
/// entity.
///

#[derive(Clone, Debug)]
pub struct WriteRequest {
    pub external_id: ExternalId,
    pub entity: JsonValue,
    pub edit_type: String,
    pub actor: String,
    pub is_mass_edit: bool,
    pub is_not_autoconfirmed_user: bool,
    /// Replacement protection flags carried into the head CAS; `None`
    /// carries the current flags forward.
    pub flags: Option<ProtectionFlags>,
}

impl WriteRequest {
    /// A plain edit with default edit facts.
    #[must_use]
    pub fn edit(external_id: ExternalId, entity: JsonValue, actor: impl Into<String>) -> Self {
        Self {
            external_id,
            entity,
            edit_type: "edit_entity".to_string(),
            actor: actor.into(),
            is_mass_edit: false,
            is_not_autoconfirmed_user: false,
            flags: None,
        }
    }
}

///
/// WriteOutcome
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WriteOutcome {
    pub external_id: ExternalId,
    pub internal_id: InternalId,
    pub revision_id: RevisionId,
    pub content_hash: ContentHash,
    /// True when the write deduplicated against the existing head and no
    /// new revision was created.
    pub deduplicated: bool,
}

///
/// RedirectViolation
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RedirectViolation {
    /// Source and target are the same entity.
    SelfTarget,
    /// The target is itself a redirect; chains are rejected.
    Chain,
    /// The relation would close a redirect cycle.
    Cycle,
}

impl Display for RedirectViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::SelfTarget => "self",
            Self::Chain => "chain",
            Self::Cycle => "cycle",
        };
        f.write_str(label)
    }
}

///
/// WriteError
///
/// Caller-facing write failures. `CasFailed` never appears here; losing a
/// CAS is retried inside the pipeline and only surfaces as
/// `TransientUnavailable` once the budget is spent.
///

#[derive(Debug, ThisError)]
pub enum WriteError {
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

    #[error("edit rejected: {0}")]
    ProtectionDenied(ProtectionReason),

    #[error("invalid redirect: {0}")]
    InvalidRedirect(RedirectViolation),

    #[error("invalid entity body: {0}")]
    InvalidEntity(#[from] ValidateError),

    #[error("write failed: {0}")]
    WriteFailed(String),

    #[error("transiently unavailable: {0}")]
    TransientUnavailable(String),

    #[error(transparent)]
    Internal(InternalError),
}

impl From<InternalError> for WriteError {
    fn from(err: InternalError) -> Self {
        Self::Internal(err)
    }
}
