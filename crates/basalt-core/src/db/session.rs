//! Module: session
//! Responsibility: wiring the configured component set into one handle and
//! exposing the public store surface.
//! Does not own: component semantics; everything here delegates.

use crate::{
    clock::{Clock, SystemClock},
    config::{CoreConfig, EventSinkChoice},
    db::{
        StoreCtx,
        alloc::IdAllocator,
        cache::CacheLayer,
        event::{EventSink, FileSink, InProcSink, Outbox, UlidGen},
        lifecycle::{
            DeleteRequest, DeletionService, RedirectRequest, RedirectRevertRequest,
            RedirectService,
        },
        meta::{DeleteAudit, MemoryMetadataStore, MetadataStore, RevisionRow},
        poll::{Backfill, ChangePoller, CheckpointStore, MemoryCheckpointStore, PollReport},
        read::{EntityRead, HistoryWindow, ReadError, ReadPath},
        reconcile::{ReconcileReport, Reconciler},
        snapshot::{MemorySnapshotStore, SnapshotEnvelope, SnapshotStore},
        supervisor::TaskSupervisor,
        write::{WriteError, WriteOutcome, WritePipeline, WriteRequest},
    },
    error::{ErrorClass, ErrorOrigin, InternalError},
    obs::{MetricsSink, NoopMetricsSink, StorageReport, storage_report},
    types::{ExternalId, RevisionId},
};
use rand::RngCore;
use serde_json::Value as JsonValue;
use std::sync::Arc;

///
/// Store
///
/// The assembled revision store: write pipeline, read path, lifecycle
/// services, reconciler, and change poller over one component context.
///

pub struct Store {
    ctx: Arc<StoreCtx>,
    pipeline: WritePipeline,
    reads: ReadPath,
    redirects: RedirectService,
    deletions: DeletionService,
    reconciler: Arc<Reconciler>,
    poller: Arc<ChangePoller>,
}

impl Store {
    /// Start configuring a store.
    #[must_use]
    pub fn builder() -> StoreBuilder {
        StoreBuilder::default()
    }

    // -- writes ----------------------------------------------------------

    /// Write one entity revision (creates the entity on first write).
    pub fn put_entity(&self, request: WriteRequest) -> Result<WriteOutcome, WriteError> {
        self.pipeline.execute(request)
    }

    pub fn create_redirect(&self, request: RedirectRequest) -> Result<WriteOutcome, WriteError> {
        self.redirects.create(request)
    }

    pub fn revert_redirect(
        &self,
        request: RedirectRevertRequest,
    ) -> Result<WriteOutcome, WriteError> {
        self.redirects.revert(request)
    }

    pub fn delete_entity(&self, request: DeleteRequest) -> Result<WriteOutcome, WriteError> {
        self.deletions.delete(request)
    }

    pub fn undelete_entity(
        &self,
        external_id: ExternalId,
        actor: impl Into<String>,
    ) -> Result<WriteOutcome, WriteError> {
        self.deletions.undelete(external_id, actor)
    }

    // -- reads -----------------------------------------------------------

    pub fn get_entity(&self, external_id: &ExternalId) -> Result<EntityRead, ReadError> {
        self.reads.get_entity(external_id)
    }

    pub fn get_entity_following_redirect(
        &self,
        external_id: &ExternalId,
    ) -> Result<EntityRead, ReadError> {
        self.reads.get_entity_following_redirect(external_id)
    }

    pub fn get_revision(
        &self,
        external_id: &ExternalId,
        revision_id: RevisionId,
    ) -> Result<SnapshotEnvelope, ReadError> {
        self.reads.get_revision(external_id, revision_id)
    }

    pub fn get_raw_revision(
        &self,
        external_id: &ExternalId,
        revision_id: RevisionId,
    ) -> Result<JsonValue, ReadError> {
        self.reads.get_raw_revision(external_id, revision_id)
    }

    pub fn get_history(
        &self,
        external_id: &ExternalId,
        window: HistoryWindow,
    ) -> Result<Vec<RevisionRow>, ReadError> {
        self.reads.get_history(external_id, window)
    }

    pub fn delete_audits(
        &self,
        external_id: &ExternalId,
    ) -> Result<Vec<DeleteAudit>, ReadError> {
        let mapping = self
            .ctx
            .meta
            .resolve_external(external_id)
            .map_err(ReadError::Internal)?
            .ok_or_else(|| ReadError::EntityNotFound(external_id.clone()))?;

        self.ctx
            .meta
            .list_delete_audits(mapping.internal_id)
            .map_err(ReadError::Internal)
    }

    /// External ids of entities currently redirecting to the given one.
    pub fn incoming_redirects(
        &self,
        external_id: &ExternalId,
    ) -> Result<Vec<ExternalId>, ReadError> {
        let mapping = self
            .ctx
            .meta
            .resolve_external(external_id)
            .map_err(ReadError::Internal)?
            .ok_or_else(|| ReadError::EntityNotFound(external_id.clone()))?;

        let mut sources = Vec::new();
        for from in self
            .ctx
            .meta
            .get_incoming_redirects(mapping.internal_id)
            .map_err(ReadError::Internal)?
        {
            let from_mapping = self
                .ctx
                .meta
                .get_mapping(from)
                .map_err(ReadError::Internal)?
                .ok_or_else(|| {
                    ReadError::Internal(InternalError::corruption(
                        ErrorOrigin::Meta,
                        format!("redirect source {from} has no mapping"),
                    ))
                })?;
            sources.push(from_mapping.external_id);
        }

        Ok(sources)
    }

    // -- background processes --------------------------------------------

    /// One reconciler sweep, for embedded and test driving.
    pub fn reconcile_once(&self) -> Result<ReconcileReport, InternalError> {
        self.reconciler.run_once()
    }

    /// One change-poller pass, for embedded and test driving.
    pub fn poll_once(&self) -> Result<PollReport, InternalError> {
        self.poller.poll_once()
    }

    /// Replay a historical window into the event sink.
    pub fn backfill(&self, window: Backfill) -> Result<u64, InternalError> {
        self.poller.backfill(window)
    }

    /// Attach the reconciler and poller to a supervisor at their configured
    /// intervals.
    pub fn spawn_background(&self, supervisor: &TaskSupervisor) {
        let reconciler = self.reconciler.clone();
        supervisor.spawn(
            "basalt-reconciler",
            self.ctx.config.reconciler.reconciler_interval_ms,
            move || {
                if let Err(err) = reconciler.run_once() {
                    log::error!("reconciler sweep failed: {err}");
                }
            },
        );

        let poller = self.poller.clone();
        supervisor.spawn(
            "basalt-poller",
            self.ctx.config.poller.poll_interval_ms,
            move || {
                if let Err(err) = poller.poll_once() {
                    log::error!("change poll failed: {err}");
                }
            },
        );
    }

    // -- operator surface ------------------------------------------------

    pub fn storage_report(&self) -> Result<StorageReport, InternalError> {
        storage_report(
            self.ctx.meta.as_ref(),
            self.ctx.snapshots.as_ref(),
            &self.ctx.outbox,
        )
    }

    /// Depth of the event outbox (parked emissions awaiting retry).
    #[must_use]
    pub fn outbox_depth(&self) -> usize {
        self.ctx.outbox.len()
    }
}

///
/// StoreBuilder
///
/// Every dependency is injectable; anything left out gets the in-memory
/// default wired to the configured clock.
///

#[derive(Default)]
pub struct StoreBuilder {
    config: CoreConfig,
    clock: Option<Arc<dyn Clock>>,
    meta: Option<Arc<dyn MetadataStore>>,
    snapshots: Option<Arc<dyn SnapshotStore>>,
    sink: Option<Arc<dyn EventSink>>,
    checkpoints: Option<Arc<dyn CheckpointStore>>,
    metrics: Option<Arc<dyn MetricsSink>>,
    allocator_rng: Option<Box<dyn RngCore + Send>>,
    outbox_rng: Option<Box<dyn RngCore + Send>>,
}

impl StoreBuilder {
    #[must_use]
    pub fn config(mut self, config: CoreConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn metadata_store(mut self, meta: Arc<dyn MetadataStore>) -> Self {
        self.meta = Some(meta);
        self
    }

    #[must_use]
    pub fn snapshot_store(mut self, snapshots: Arc<dyn SnapshotStore>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    #[must_use]
    pub fn checkpoint_store(mut self, checkpoints: Arc<dyn CheckpointStore>) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    #[must_use]
    pub fn metrics_sink(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Deterministic randomness for the id allocator (harness use).
    #[must_use]
    pub fn allocator_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.allocator_rng = Some(rng);
        self
    }

    /// Deterministic randomness for outbox ids (harness use).
    #[must_use]
    pub fn outbox_rng(mut self, rng: Box<dyn RngCore + Send>) -> Self {
        self.outbox_rng = Some(rng);
        self
    }

    pub fn build(self) -> Result<Store, InternalError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let meta = self
            .meta
            .unwrap_or_else(|| Arc::new(MemoryMetadataStore::new()));
        let snapshots = self
            .snapshots
            .unwrap_or_else(|| Arc::new(MemorySnapshotStore::new(clock.clone())));
        let metrics = self.metrics.unwrap_or_else(|| Arc::new(NoopMetricsSink));
        let checkpoints = self
            .checkpoints
            .unwrap_or_else(|| Arc::new(MemoryCheckpointStore::new()));

        let sink = match self.sink {
            Some(sink) => sink,
            None => built_in_sink(&self.config.event_sink)?,
        };

        let cache = CacheLayer::new(
            clock.clone(),
            self.config.cache.id_map_cache_ttl_ms,
            self.config.cache.head_cache_ttl_ms,
        );
        let allocator = match self.allocator_rng {
            Some(rng) => IdAllocator::new(
                self.config.allocator.allocator_epoch_ms,
                clock.clone(),
                rng,
            ),
            None => {
                IdAllocator::with_os_entropy(self.config.allocator.allocator_epoch_ms, clock.clone())
            }
        };
        let outbox_ids = match self.outbox_rng {
            Some(rng) => UlidGen::new(clock.clone(), rng),
            None => UlidGen::with_os_entropy(clock.clone()),
        };
        let outbox = Outbox::new(clock.clone(), outbox_ids);

        let ctx = Arc::new(StoreCtx {
            meta,
            snapshots,
            cache,
            allocator,
            sink,
            outbox,
            clock,
            metrics,
            config: self.config,
        });

        Ok(Store {
            pipeline: WritePipeline::new(ctx.clone()),
            reads: ReadPath::new(ctx.clone()),
            redirects: RedirectService::new(ctx.clone()),
            deletions: DeletionService::new(ctx.clone()),
            reconciler: Arc::new(Reconciler::new(ctx.clone())),
            poller: Arc::new(ChangePoller::new(ctx.clone(), checkpoints)),
            ctx,
        })
    }
}

fn built_in_sink(choice: &EventSinkChoice) -> Result<Arc<dyn EventSink>, InternalError> {
    match choice {
        EventSinkChoice::Inproc => Ok(Arc::new(InProcSink::new())),
        EventSinkChoice::File { path } => {
            let sink = FileSink::open(path).map_err(|err| {
                InternalError::unavailable(
                    ErrorOrigin::Event,
                    format!("file sink at {path} unavailable: {err}"),
                )
            })?;
            Ok(Arc::new(sink))
        }
        EventSinkChoice::Kafka => Err(InternalError::new(
            ErrorClass::Unsupported,
            ErrorOrigin::Event,
            "the kafka sink is an external collaborator; inject it via event_sink()",
        )),
    }
}
