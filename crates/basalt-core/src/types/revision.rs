use derive_more::Display;
use serde::{Deserialize, Serialize};

///
/// RevisionId
///
/// Monotonic per-entity revision counter, starting at 1. Revision 0 is the
/// sentinel for "no revisions yet" and never appears in metadata rows.
///

#[derive(
    Clone, Copy, Debug, Default, Deserialize, Display, Eq, Hash, Ord, PartialEq, PartialOrd,
    Serialize,
)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RevisionId(u64);

impl RevisionId {
    pub const NONE: Self = Self(0);
    pub const FIRST: Self = Self(1);

    #[must_use]
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    #[must_use]
    pub const fn is_none(self) -> bool {
        self.0 == 0
    }

    /// The next revision in sequence.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }

    /// The previous revision, or `None` below revision 1.
    #[must_use]
    pub const fn prev(self) -> Option<Self> {
        if self.0 <= 1 {
            None
        } else {
            Some(Self(self.0 - 1))
        }
    }
}

///
/// TESTS
///
