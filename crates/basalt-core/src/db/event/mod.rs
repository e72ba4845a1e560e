//! Module: event
//! Responsibility: the change-event contract and the shipped sinks.
//! Does not own: deriving events (the poller) or retrying lost emissions
//! (the reconciler drains the outbox).
//!
//! Ordering per entity must be preserved by every implementation; sinks
//! that partition (Kafka-style) key by external id.

mod file;
mod memory;
mod outbox;
mod ulid_gen;

pub use file::FileSink;
pub use memory::InProcSink;
pub use outbox::{Outbox, OutboxEntry};
pub use ulid_gen::UlidGen;

use crate::types::{ExternalId, RevisionId, Timestamp};
use serde::{Deserialize, Serialize};

///
/// EntityChangeEvent
///
/// Per-revision change notification. `from_revision_id` is null for the
/// first revision of an entity.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct EntityChangeEvent {
    pub external_id: ExternalId,
    pub from_revision_id: Option<RevisionId>,
    pub to_revision_id: RevisionId,
    pub changed_at: Timestamp,
}

impl EntityChangeEvent {
    /// Partition key for ordered delivery.
    #[must_use]
    pub fn partition_key(&self) -> &str {
        self.external_id.as_str()
    }
}

///
/// PublishOutcome
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PublishOutcome {
    Ack,
    /// Transient refusal; the caller may retry or park the event.
    Retryable,
    /// Permanent refusal; the event goes to the outbox and is logged.
    Fatal,
}

///
/// EventSink
///
/// Narrow output contract. Emission failures never block a committed write;
/// the pipeline parks refused events in the outbox instead.
///

pub trait EventSink: Send + Sync {
    fn publish(&self, event: &EntityChangeEvent) -> PublishOutcome;
}
