//! Module: snapshot
//! Responsibility: put/get/tag of immutable JSON snapshot objects.
//! Does not own: metadata rows or head pointers (the metadata gateway).
//!
//! Invariants:
//! - A published object is never overwritten; attempts fail loudly.
//! - Writes are read-after-write consistent for the same key.
//! - Objects are never deleted here; lifecycle expiry is external.

mod envelope;
mod key;
mod memory;

pub use envelope::SnapshotEnvelope;
pub use key::{SnapshotKey, SnapshotKeyError};
pub use memory::MemorySnapshotStore;

use crate::{error::InternalError, types::Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

///
/// PublicationState
///
/// Object tag marking whether a revision is authoritative. `pending` objects
/// belong to in-flight or failed writes until the reconciler rules on them.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationState {
    Pending,
    Published,
}

impl Display for PublicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "pending",
            Self::Published => "published",
        };
        f.write_str(label)
    }
}

///
/// SnapshotObject
///

#[derive(Clone, Debug)]
pub struct SnapshotObject {
    pub bytes: Vec<u8>,
    pub state: PublicationState,
    pub put_at: Timestamp,
}

///
/// PendingSnapshot
///
/// One pending object surfaced to the reconciler sweep.
///

#[derive(Clone, Debug)]
pub struct PendingSnapshot {
    pub key: SnapshotKey,
    pub put_at: Timestamp,
}

///
/// SnapshotStats
///
/// Object counts for storage reporting.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct SnapshotStats {
    pub objects: u64,
    pub pending: u64,
}

///
/// SnapshotStore
///
/// Gateway to the object store holding one immutable JSON object per
/// revision at `{external_id}/r{revision_id}.json`.
///

pub trait SnapshotStore: Send + Sync {
    /// Write an object. Overwriting a pending object is allowed (retried
    /// writes); overwriting a published object is an invariant violation.
    fn put(
        &self,
        key: &SnapshotKey,
        bytes: Vec<u8>,
        state: PublicationState,
    ) -> Result<(), InternalError>;

    /// Move an object's tag to `published`. Idempotent on published objects.
    fn set_published(&self, key: &SnapshotKey) -> Result<(), InternalError>;

    fn get(&self, key: &SnapshotKey) -> Result<Option<SnapshotObject>, InternalError>;

    /// Pending objects whose write time is at or before `cutoff`, oldest
    /// first.
    fn list_pending_older_than(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<PendingSnapshot>, InternalError>;

    fn stats(&self) -> Result<SnapshotStats, InternalError>;
}
