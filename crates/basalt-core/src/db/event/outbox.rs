use crate::{
    clock::Clock,
    db::event::{EntityChangeEvent, EventSink, PublishOutcome, UlidGen},
    error::{ErrorOrigin, InternalError},
    types::{ExternalId, Timestamp},
};
use parking_lot::Mutex;
use std::{collections::BTreeMap, sync::Arc};
use ulid::Ulid;

///
/// OutboxEntry
///

#[derive(Clone, Debug)]
pub struct OutboxEntry {
    pub id: Ulid,
    pub event: EntityChangeEvent,
    pub enqueued_at: Timestamp,
    pub attempts: u32,
}

///
/// Outbox
///
/// Durable parking lot for events a sink refused. Entries are keyed by
/// monotonic ULIDs so the drain order matches enqueue order, which keeps
/// per-entity ordering intact across retries.
///

pub struct Outbox {
    clock: Arc<dyn Clock>,
    ids: UlidGen,
    entries: Mutex<BTreeMap<Ulid, OutboxEntry>>,
}

impl Outbox {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, ids: UlidGen) -> Self {
        Self {
            clock,
            ids,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn enqueue(&self, event: EntityChangeEvent) -> Result<Ulid, InternalError> {
        let id = self.ids.generate().map_err(|err| {
            InternalError::unavailable(ErrorOrigin::Event, format!("outbox id: {err}"))
        })?;
        let entry = OutboxEntry {
            id,
            event,
            enqueued_at: Timestamp::from_millis(self.clock.now_millis()),
            attempts: 0,
        };
        self.entries.lock().insert(id, entry);

        Ok(id)
    }

    /// Re-offer parked events to the sink in enqueue order, stopping at the
    /// first refusal to preserve per-entity ordering. Returns the number of
    /// events the sink accepted.
    pub fn drain(&self, sink: &dyn EventSink, max: usize) -> usize {
        let mut drained = 0;

        while drained < max {
            // Take the oldest entry out of the lock before publishing so
            // sink latency never holds the outbox mutex.
            let Some(mut entry) = self.pop_front() else {
                break;
            };

            match sink.publish(&entry.event) {
                PublishOutcome::Ack => {
                    drained += 1;
                }
                outcome @ (PublishOutcome::Retryable | PublishOutcome::Fatal) => {
                    entry.attempts += 1;
                    log::warn!(
                        "outbox drain stopped: sink returned {outcome:?} for {} (attempt {})",
                        entry.event.external_id,
                        entry.attempts
                    );
                    self.entries.lock().insert(entry.id, entry);
                    break;
                }
            }
        }

        drained
    }

    fn pop_front(&self) -> Option<OutboxEntry> {
        let mut entries = self.entries.lock();
        let id = *entries.keys().next()?;
        entries.remove(&id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether any parked event targets the given entity. The pipeline
    /// consults this when configured to block on a lagging outbox.
    #[must_use]
    pub fn has_pending_for(&self, external_id: &ExternalId) -> bool {
        self.entries
            .lock()
            .values()
            .any(|entry| &entry.event.external_id == external_id)
    }
}

///
/// TESTS
///
