//! Module: config
//! Responsibility: every tunable the core recognises, with defaults.
//! Does not own: wiring the configured components together (the store
//! builder owns that).

use crate::types::SchemaVersion;
use serde::Deserialize;

///
/// CoreConfig
///
/// Deserializable configuration for the whole core. Every field has a
/// default so partial configs stay valid.
///

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CoreConfig {
    pub allocator: AllocatorConfig,
    pub cache: CacheConfig,
    pub event_sink: EventSinkChoice,
    pub metadata: MetadataConfig,
    pub poller: PollerConfig,
    pub reconciler: ReconcilerConfig,
    pub schema: SchemaConfig,
    pub snapshot: SnapshotConfig,
    pub write: WriteConfig,
}

///
/// AllocatorConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AllocatorConfig {
    /// Epoch for the millis component of internal ids. Configured at boot
    /// and immutable thereafter.
    pub allocator_epoch_ms: u64,
    /// Fresh-id retries on unique-constraint collision before giving up.
    pub allocator_retry_budget: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        Self {
            // 2020-01-01T00:00:00Z
            allocator_epoch_ms: 1_577_836_800_000,
            allocator_retry_budget: 8,
        }
    }
}

///
/// CacheConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    pub id_map_cache_ttl_ms: u64,
    pub head_cache_ttl_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            id_map_cache_ttl_ms: 60 * 60 * 1_000,
            head_cache_ttl_ms: 5 * 60 * 1_000,
        }
    }
}

///
/// EventSinkChoice
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum EventSinkChoice {
    /// External Kafka-compatible emitter; the core only keys events for it.
    Kafka,
    /// Append-only JSON-lines file.
    File { path: String },
    /// In-process buffer, used by tests and embedded callers.
    #[default]
    Inproc,
}

///
/// MetadataConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MetadataConfig {
    pub metadata_connection_pool_size: u32,
    pub metadata_stmt_timeout_ms: u64,
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            metadata_connection_pool_size: 16,
            metadata_stmt_timeout_ms: 5_000,
        }
    }
}

///
/// PollerConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PollerConfig {
    pub poll_interval_ms: u64,
    pub poll_batch_size: u32,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 60_000,
            poll_batch_size: 500,
        }
    }
}

///
/// ReconcilerConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReconcilerConfig {
    pub reconciler_interval_ms: u64,
    /// Pending snapshots older than this with no metadata row are abandoned.
    pub abandonment_ttl_ms: u64,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            reconciler_interval_ms: 30_000,
            abandonment_ttl_ms: 15 * 60 * 1_000,
        }
    }
}

///
/// SchemaConfig
///

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchemaConfig {
    pub current_schema_version: SchemaVersion,
    pub schema_versions_supported: Vec<SchemaVersion>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            current_schema_version: SchemaVersion::new(1, 0, 0),
            schema_versions_supported: vec![SchemaVersion::new(1, 0, 0)],
        }
    }
}

///
/// SnapshotConfig
///

#[derive(Clone, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotConfig {
    pub snapshot_bucket: String,
    pub snapshot_put_timeout_ms: u64,
    pub snapshot_get_timeout_ms: u64,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            snapshot_bucket: "basalt-snapshots".to_string(),
            snapshot_put_timeout_ms: 10_000,
            snapshot_get_timeout_ms: 5_000,
        }
    }
}

///
/// WriteConfig
///

#[derive(Clone, Copy, Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WriteConfig {
    /// Head-refresh restarts on CAS loss or revision-insert collision.
    pub cas_retry_budget: u32,
    /// Whether writes to an entity with pending outbox entries block until
    /// the outbox drains. Non-blocking relies on per-entity event ordering
    /// being restored downstream.
    pub outbox_blocking: bool,
}

impl Default for WriteConfig {
    fn default() -> Self {
        Self {
            cas_retry_budget: 8,
            outbox_blocking: false,
        }
    }
}

///
/// TESTS
///
