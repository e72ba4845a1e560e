//! Stable identifier and timestamp vocabulary shared across the store.

mod external_id;
mod internal_id;
mod revision;
mod schema_version;
pub mod timestamp;

pub use external_id::{EntityType, ExternalId, ExternalIdError};
pub use internal_id::{InternalId, InternalIdError};
pub use revision::RevisionId;
pub use schema_version::{SchemaVersion, SchemaVersionError};
pub use timestamp::Timestamp;
