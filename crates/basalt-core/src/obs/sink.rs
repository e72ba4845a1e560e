//! Metrics sink boundary.
//!
//! Core store logic MUST NOT own counters directly. All instrumentation
//! flows through `MetricsEvent` and `MetricsSink`; this module is the only
//! bridge between execution logic and metrics state.

use parking_lot::Mutex;

///
/// CacheKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CacheKind {
    IdMap,
    Head,
}

///
/// RepairKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RepairKind {
    MetaInserted,
    Republished,
    HeadAdvanced,
    Abandoned,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug)]
pub enum MetricsEvent {
    WriteStarted,
    WriteCommitted,
    DedupeHit,
    CasConflict,
    AllocatorCollision,
    CacheHit { cache: CacheKind },
    CacheMiss { cache: CacheKind },
    ReconcilerRepair { kind: RepairKind },
    PollerBatch { events: u64 },
    OutboxParked,
    OutboxDrained { events: u64 },
}

///
/// MetricsSink
///

pub trait MetricsSink: Send + Sync {
    fn record(&self, event: MetricsEvent);
}

///
/// NoopMetricsSink
///

pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
    fn record(&self, _: MetricsEvent) {}
}

///
/// MetricsSnapshot
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct MetricsSnapshot {
    pub writes_started: u64,
    pub writes_committed: u64,
    pub dedupe_hits: u64,
    pub cas_conflicts: u64,
    pub allocator_collisions: u64,
    pub id_map_cache_hits: u64,
    pub id_map_cache_misses: u64,
    pub head_cache_hits: u64,
    pub head_cache_misses: u64,
    pub repairs_meta_inserted: u64,
    pub repairs_republished: u64,
    pub repairs_head_advanced: u64,
    pub repairs_abandoned: u64,
    pub poller_batches: u64,
    pub poller_events: u64,
    pub outbox_parked: u64,
    pub outbox_drained: u64,
}

///
/// CountingSink
///
/// In-memory counters; the harness sink and a reasonable default for
/// embedded callers.
///

#[derive(Default)]
pub struct CountingSink {
    state: Mutex<MetricsSnapshot>,
}

impl CountingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        *self.state.lock()
    }

    pub fn reset(&self) {
        *self.state.lock() = MetricsSnapshot::default();
    }
}

impl MetricsSink for CountingSink {
    fn record(&self, event: MetricsEvent) {
        let mut m = self.state.lock();
        match event {
            MetricsEvent::WriteStarted => {
                m.writes_started = m.writes_started.saturating_add(1);
            }
            MetricsEvent::WriteCommitted => {
                m.writes_committed = m.writes_committed.saturating_add(1);
            }
            MetricsEvent::DedupeHit => m.dedupe_hits = m.dedupe_hits.saturating_add(1),
            MetricsEvent::CasConflict => m.cas_conflicts = m.cas_conflicts.saturating_add(1),
            MetricsEvent::AllocatorCollision => {
                m.allocator_collisions = m.allocator_collisions.saturating_add(1);
            }
            MetricsEvent::CacheHit { cache } => match cache {
                CacheKind::IdMap => {
                    m.id_map_cache_hits = m.id_map_cache_hits.saturating_add(1);
                }
                CacheKind::Head => m.head_cache_hits = m.head_cache_hits.saturating_add(1),
            },
            MetricsEvent::CacheMiss { cache } => match cache {
                CacheKind::IdMap => {
                    m.id_map_cache_misses = m.id_map_cache_misses.saturating_add(1);
                }
                CacheKind::Head => {
                    m.head_cache_misses = m.head_cache_misses.saturating_add(1);
                }
            },
            MetricsEvent::ReconcilerRepair { kind } => match kind {
                RepairKind::MetaInserted => {
                    m.repairs_meta_inserted = m.repairs_meta_inserted.saturating_add(1);
                }
                RepairKind::Republished => {
                    m.repairs_republished = m.repairs_republished.saturating_add(1);
                }
                RepairKind::HeadAdvanced => {
                    m.repairs_head_advanced = m.repairs_head_advanced.saturating_add(1);
                }
                RepairKind::Abandoned => {
                    m.repairs_abandoned = m.repairs_abandoned.saturating_add(1);
                }
            },
            MetricsEvent::PollerBatch { events } => {
                m.poller_batches = m.poller_batches.saturating_add(1);
                m.poller_events = m.poller_events.saturating_add(events);
            }
            MetricsEvent::OutboxParked => m.outbox_parked = m.outbox_parked.saturating_add(1),
            MetricsEvent::OutboxDrained { events } => {
                m.outbox_drained = m.outbox_drained.saturating_add(events);
            }
        }
    }
}

///
/// TESTS
///
