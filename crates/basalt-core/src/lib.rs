//! Core runtime for Basalt: the revision write pipeline, metadata and
//! snapshot gateways, caches, lifecycle services, reconciler, and change
//! poller, plus the ergonomics exported via the `prelude`.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod canon;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod hash;
pub mod obs;
pub mod types;
pub mod validate;
pub mod value;

// deterministic fixtures, shared with integration suites
pub mod test_support;

///
/// CONSTANTS
///

/// Upper bound on serialized snapshot size accepted by the write path.
///
/// This keeps single objects within sane object-store request sizes and
/// simplifies sizing assumptions in the gateways.
pub const MAX_SNAPSHOT_BYTES: usize = 16 * 1024 * 1024;

///
/// Prelude
///
/// Prelude contains only domain vocabulary.
/// No errors, gateways, pipelines, or helpers are re-exported here.
///

pub mod prelude {
    pub use crate::{
        db::meta::{EditKind, HeadRow, ProtectionFlags, RevisionRow},
        db::session::Store,
        db::write::WriteRequest,
        types::{EntityType, ExternalId, InternalId, RevisionId, Timestamp},
    };
}
