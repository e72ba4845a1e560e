use crate::{
    clock::Clock,
    db::snapshot::{
        PendingSnapshot, PublicationState, SnapshotKey, SnapshotObject, SnapshotStats,
        SnapshotStore,
    },
    error::{ErrorOrigin, InternalError},
    types::Timestamp,
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};

///
/// MemorySnapshotStore
///
/// Reference implementation and test double for the snapshot gateway.
/// Strongly read-after-write consistent by construction.
///

pub struct MemorySnapshotStore {
    clock: Arc<dyn Clock>,
    objects: Mutex<BTreeMap<SnapshotKey, SnapshotObject>>,
}

impl MemorySnapshotStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Number of stored objects, for harness assertions.
    #[must_use]
    pub fn object_count(&self) -> usize {
        self.objects.lock().len()
    }
}

impl SnapshotStore for MemorySnapshotStore {
    fn put(
        &self,
        key: &SnapshotKey,
        bytes: Vec<u8>,
        state: PublicationState,
    ) -> Result<(), InternalError> {
        let mut objects = self.objects.lock();

        if let Some(existing) = objects.get(key) {
            if existing.state == PublicationState::Published {
                return Err(InternalError::invariant(
                    ErrorOrigin::Snapshot,
                    format!("refusing to overwrite published object {key}"),
                ));
            }
        }

        objects.insert(
            key.clone(),
            SnapshotObject {
                bytes,
                state,
                put_at: Timestamp::from_millis(self.clock.now_millis()),
            },
        );

        Ok(())
    }

    fn set_published(&self, key: &SnapshotKey) -> Result<(), InternalError> {
        let mut objects = self.objects.lock();

        let object = objects.get_mut(key).ok_or_else(|| {
            InternalError::not_found(
                ErrorOrigin::Snapshot,
                format!("cannot publish missing object {key}"),
            )
        })?;
        object.state = PublicationState::Published;

        Ok(())
    }

    fn get(&self, key: &SnapshotKey) -> Result<Option<SnapshotObject>, InternalError> {
        Ok(self.objects.lock().get(key).cloned())
    }

    fn list_pending_older_than(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<PendingSnapshot>, InternalError> {
        let objects = self.objects.lock();
        let mut pending = objects
            .iter()
            .filter(|(_, object)| {
                object.state == PublicationState::Pending && object.put_at <= cutoff
            })
            .map(|(key, object)| PendingSnapshot {
                key: key.clone(),
                put_at: object.put_at,
            })
            .collect::<Vec<_>>();
        pending.sort_by_key(|p| p.put_at);

        Ok(pending)
    }

    fn stats(&self) -> Result<SnapshotStats, InternalError> {
        let objects = self.objects.lock();

        Ok(SnapshotStats {
            objects: objects.len() as u64,
            pending: objects
                .values()
                .filter(|o| o.state == PublicationState::Pending)
                .count() as u64,
        })
    }
}

///
/// TESTS
///
