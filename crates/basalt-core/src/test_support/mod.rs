//! Deterministic harness for store-level tests: logical clock, seeded
//! randomness, in-memory gateways, and entity-body builders. Integration
//! suites and downstream crates drive whole scenarios through this.

mod invariants;

pub use invariants::assert_store_invariants;

use crate::{
    clock::LogicalClock,
    config::CoreConfig,
    db::{
        event::InProcSink,
        meta::MemoryMetadataStore,
        poll::MemoryCheckpointStore,
        session::Store,
        snapshot::MemorySnapshotStore,
        write::{WriteOutcome, WriteRequest},
    },
    obs::CountingSink,
    types::ExternalId,
};
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use serde_json::{Value as JsonValue, json};
use std::sync::Arc;

/// Harness clock start: comfortably after the default allocator epoch.
pub const HARNESS_START_MS: u64 = 1_700_000_000_000;

///
/// TestHarness
///
/// One fully wired store over shared in-memory doubles, with handles to
/// every seam a test wants to inspect or corrupt.
///

pub struct TestHarness {
    pub store: Store,
    pub clock: Arc<LogicalClock>,
    pub sink: Arc<InProcSink>,
    pub metrics: Arc<CountingSink>,
    pub meta: Arc<MemoryMetadataStore>,
    pub snapshots: Arc<MemorySnapshotStore>,
    pub checkpoints: Arc<MemoryCheckpointStore>,
}

impl TestHarness {
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(CoreConfig::default())
    }

    #[must_use]
    pub fn with_config(config: CoreConfig) -> Self {
        let clock = Arc::new(LogicalClock::new(HARNESS_START_MS));
        let sink = Arc::new(InProcSink::new());
        let metrics = Arc::new(CountingSink::new());
        let meta = Arc::new(MemoryMetadataStore::new());
        let snapshots = Arc::new(MemorySnapshotStore::new(clock.clone()));
        let checkpoints = Arc::new(MemoryCheckpointStore::new());

        let store = Store::builder()
            .config(config)
            .clock(clock.clone())
            .metadata_store(meta.clone())
            .snapshot_store(snapshots.clone())
            .event_sink(sink.clone())
            .metrics_sink(metrics.clone())
            .checkpoint_store(checkpoints.clone())
            .allocator_rng(Box::new(ChaCha20Rng::seed_from_u64(0xBA5A17)))
            .outbox_rng(Box::new(ChaCha20Rng::seed_from_u64(0x0B0)))
            .build()
            .expect("harness store wiring cannot fail");

        Self {
            store,
            clock,
            sink,
            metrics,
            meta,
            snapshots,
            checkpoints,
        }
    }

    /// Parse an external id, panicking on malformed test input.
    #[must_use]
    pub fn id(external: &str) -> ExternalId {
        ExternalId::try_from_str(external).expect("well-formed external id")
    }

    /// Write an item with a single English label, advancing the clock one
    /// millisecond so every revision gets a distinct timestamp.
    pub fn write_labeled(&self, external: &str, label: &str) -> WriteOutcome {
        self.clock.advance(1);
        self.store
            .put_entity(WriteRequest::edit(
                Self::id(external),
                item_body(external, label),
                "harness",
            ))
            .expect("harness write should succeed")
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// Minimal well-formed item body with one English label.
#[must_use]
pub fn item_body(external: &str, label: &str) -> JsonValue {
    json!({
        "id": external,
        "type": "item",
        "labels": {"en": {"language": "en", "value": label}},
        "descriptions": {},
        "aliases": {},
        "claims": {},
        "sitelinks": {}
    })
}

/// Item body with one statement on the given property.
#[must_use]
pub fn item_body_with_claim(external: &str, label: &str, property: &str) -> JsonValue {
    let mut body = item_body(external, label);
    body["claims"] = json!({
        property: [{
            "mainsnak": {
                "snaktype": "value",
                "property": property,
                "datavalue": {
                    "type": "string",
                    "value": "payload"
                }
            },
            "type": "statement",
            "rank": "normal"
        }]
    });

    body
}
