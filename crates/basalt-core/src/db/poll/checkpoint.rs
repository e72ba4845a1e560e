use crate::{
    db::meta::HeadCursor,
    error::InternalError,
    types::{InternalId, RevisionId},
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

///
/// Checkpoint
///
/// Durable poller position: the head cursor the feed has been consumed up
/// to, plus the last revision emitted per entity. The per-entity marks are
/// what lets a batched poll emit every intermediate revision step exactly
/// once.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Checkpoint {
    pub cursor: Option<HeadCursor>,
    pub last_emitted: BTreeMap<InternalId, RevisionId>,
}

impl Checkpoint {
    #[must_use]
    pub fn last_emitted_for(&self, internal_id: InternalId) -> RevisionId {
        self.last_emitted
            .get(&internal_id)
            .copied()
            .unwrap_or(RevisionId::NONE)
    }
}

///
/// CheckpointStore
///
/// Persistence seam for the poller position. Saves are atomic: a partially
/// emitted batch is never reflected.
///

pub trait CheckpointStore: Send + Sync {
    fn load(&self) -> Result<Option<Checkpoint>, InternalError>;
    fn save(&self, checkpoint: &Checkpoint) -> Result<(), InternalError>;
}

///
/// MemoryCheckpointStore
///

#[derive(Default)]
pub struct MemoryCheckpointStore {
    inner: Mutex<Option<Checkpoint>>,
}

impl MemoryCheckpointStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl CheckpointStore for MemoryCheckpointStore {
    fn load(&self) -> Result<Option<Checkpoint>, InternalError> {
        Ok(self.inner.lock().clone())
    }

    fn save(&self, checkpoint: &Checkpoint) -> Result<(), InternalError> {
        *self.inner.lock() = Some(checkpoint.clone());

        Ok(())
    }
}

///
/// TESTS
///
