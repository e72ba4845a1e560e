//! Module: internal_id
//! Responsibility: the packed 64-bit internal identifier layout.
//! Does not own: allocation policy or collision retry (the allocator owns those).
//!
//! Invariants:
//! - Bit 63 is always zero so the id stays positive in signed columns.
//! - Bits 21–62 carry milliseconds since the configured epoch (42 bits).
//! - Bits 0–20 carry CSPRNG randomness (21 bits).
//! - Ids are approximately time-ordered, never strictly ordered.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

const RANDOM_BITS: u32 = 21;
const MILLIS_BITS: u32 = 42;
const RANDOM_MASK: u64 = (1 << RANDOM_BITS) - 1;
const MILLIS_MASK: u64 = (1 << MILLIS_BITS) - 1;

///
/// InternalIdError
///

#[derive(Debug, ThisError)]
pub enum InternalIdError {
    #[error("millis offset {offset} exceeds the {MILLIS_BITS}-bit id budget")]
    MillisOverflow { offset: u64 },

    #[error("raw id {raw} has the sign bit set")]
    SignBitSet { raw: u64 },
}

///
/// InternalId
///
/// 64-bit unsigned internal identifier, assigned once at entity creation.
/// Shard key and join key for all metadata rows; never exposed externally.
///

#[derive(
    Clone, Copy, Debug, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct InternalId(u64);

impl InternalId {
    pub const MIN: Self = Self(0);
    pub const MAX: Self = Self(i64::MAX as u64);

    /// Pack a millis-since-epoch offset and a random component.
    pub const fn compose(millis_offset: u64, random: u64) -> Result<Self, InternalIdError> {
        if millis_offset > MILLIS_MASK {
            return Err(InternalIdError::MillisOverflow {
                offset: millis_offset,
            });
        }

        Ok(Self((millis_offset << RANDOM_BITS) | (random & RANDOM_MASK)))
    }

    /// Accept a raw id from storage; the sign bit must be clear.
    pub const fn try_from_raw(raw: u64) -> Result<Self, InternalIdError> {
        if raw > i64::MAX as u64 {
            return Err(InternalIdError::SignBitSet { raw });
        }

        Ok(Self(raw))
    }

    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }

    /// Milliseconds since the configured epoch embedded in this id.
    #[must_use]
    pub const fn millis_offset(self) -> u64 {
        (self.0 >> RANDOM_BITS) & MILLIS_MASK
    }

    /// The random component embedded in this id.
    #[must_use]
    pub const fn random(self) -> u64 {
        self.0 & RANDOM_MASK
    }
}

///
/// TESTS
///
