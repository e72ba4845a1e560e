// 1️⃣ Module declarations
pub mod alloc;
pub mod cache;
pub mod event;
pub mod lifecycle;
pub mod meta;
pub mod poll;
pub mod protect;
pub mod read;
pub mod reconcile;
pub mod session;
pub mod snapshot;
pub mod supervisor;
pub mod write;

// 2️⃣ Public re-exports (stable API surface)
pub use event::{EntityChangeEvent, EventSink, FileSink, InProcSink, Outbox, PublishOutcome};
pub use lifecycle::{
    DeleteRequest, DeletionService, RedirectRequest, RedirectRevertRequest, RedirectService,
};
pub use meta::{MemoryMetadataStore, MetadataStore};
pub use poll::{
    Backfill, ChangePoller, Checkpoint, CheckpointStore, MemoryCheckpointStore, PollReport,
};
pub use protect::{Decision, EditDescriptor, ProtectionReason};
pub use read::{EntityRead, HistoryWindow, ReadError, ReadPath};
pub use reconcile::{ReconcileReport, Reconciler};
pub use session::{Store, StoreBuilder};
pub use snapshot::{MemorySnapshotStore, PublicationState, SnapshotEnvelope, SnapshotStore};
pub use supervisor::TaskSupervisor;
pub use write::{RedirectViolation, WriteError, WriteOutcome, WritePipeline, WriteRequest};

// 3️⃣ Internal wiring
use crate::{
    clock::Clock,
    config::CoreConfig,
    db::{alloc::IdAllocator, cache::CacheLayer},
    obs::MetricsSink,
};
use std::sync::Arc;

///
/// StoreCtx
///
/// The wired component set every pipeline stage runs against. Built once by
/// the store builder and shared via `Arc`.
///

pub(crate) struct StoreCtx {
    pub meta: Arc<dyn MetadataStore>,
    pub snapshots: Arc<dyn SnapshotStore>,
    pub cache: CacheLayer,
    pub allocator: IdAllocator,
    pub sink: Arc<dyn EventSink>,
    pub outbox: Outbox,
    pub clock: Arc<dyn Clock>,
    pub metrics: Arc<dyn MetricsSink>,
    pub config: CoreConfig,
}
