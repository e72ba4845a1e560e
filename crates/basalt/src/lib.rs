//! # basalt
//!
//! `basalt` is the **public facade crate** for the Basalt revision store.
//! It is the recommended dependency for downstream services.
//!
//! This crate exposes:
//! - the stable store surface (`Store`, requests, reads, reports),
//! - the identifier and timestamp vocabulary,
//! - and the gateway traits needed to plug in real metadata, snapshot,
//!   checkpoint, and event-sink backends.
//!
//! Low-level pipeline internals live in `basalt-core` and are exposed here
//! only through `core`.
//!
//! ## Crate layout
//!
//! - `store`
//!   The assembled store: builder, write/read surface, lifecycle
//!   operations, and background process hooks.
//!
//! - `types` / `config` / `error`
//!   Stable vocabulary shared by every integration.
//!
//! - `gateway`
//!   The traits a production deployment implements: metadata store,
//!   snapshot store, checkpoint store, event sink, metrics sink.
//!
//! - `core` *(internal)*
//!   Full engine internals for harnesses and tests. Not covered by semver
//!   guarantees.
//!
//! ## Preludes
//!
//! - `prelude`
//!   Opinionated prelude for service code. Intended to be glob-imported to
//!   keep endpoints concise.

pub use basalt_core::{config, error, types};

/// The assembled store surface.
pub mod store {
    pub use basalt_core::db::{
        Backfill, DeleteRequest, EntityRead, HistoryWindow, PollReport, ReadError,
        ReconcileReport, RedirectRequest, RedirectRevertRequest, RedirectViolation, Store,
        StoreBuilder, TaskSupervisor, WriteError, WriteOutcome, WriteRequest,
    };
    pub use basalt_core::db::meta::{
        DeleteAudit, DeleteType, EditKind, HeadRow, ProtectionFlags, RevisionRow,
        ValidationStatus,
    };
    pub use basalt_core::db::{EntityChangeEvent, PublishOutcome};
    pub use basalt_core::obs::{MetricsSnapshot, StorageReport};
}

/// The traits a deployment implements to replace the in-memory defaults.
pub mod gateway {
    pub use basalt_core::clock::Clock;
    pub use basalt_core::db::{CheckpointStore, EventSink, MetadataStore, SnapshotStore};
    pub use basalt_core::obs::MetricsSink;
}

/// Engine internals for harnesses and tests. Not semver-stable.
pub mod core {
    pub use basalt_core::*;
}

///
/// Prelude
///

pub mod prelude {
    pub use basalt_core::prelude::*;

    pub use crate::store::{
        DeleteRequest, EntityRead, HistoryWindow, RedirectRequest, RedirectRevertRequest,
        WriteOutcome,
    };
}

///
/// TESTS
///
