use crate::canon::to_canonical_string;
use derive_more::Display;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use xxhash_rust::xxh3::xxh3_64_with_seed;

/// Content-hash format version byte prepended to the canonical bytes.
pub(crate) const CONTENT_HASH_VERSION: u8 = 1;

/// Stable XXH3 seed used by content hashing across upgrades.
pub(crate) const CONTENT_HASH_SEED: u64 = 0;

///
/// ContentHash
///
/// 64-bit non-cryptographic fingerprint of a canonical-JSON entity body.
/// Used for idempotent write deduplication; collisions are tolerated and
/// carry no security meaning.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct ContentHash(u64);

impl ContentHash {
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

/// Fingerprint one entity body.
#[must_use]
pub fn content_hash(body: &JsonValue) -> ContentHash {
    let canonical = to_canonical_string(body);
    let mut bytes = Vec::with_capacity(1 + canonical.len());
    bytes.push(CONTENT_HASH_VERSION);
    bytes.extend_from_slice(canonical.as_bytes());

    ContentHash(xxh3_64_with_seed(&bytes, CONTENT_HASH_SEED))
}

///
/// TESTS
///
