//! Module: cache
//! Responsibility: the hot id-mapping and head-pointer caches.
//! Does not own: authority. The metadata store is always the source of
//! truth; a cache miss is never an error.
//!
//! Invariants:
//! - Mappings are immutable, so the id-map cache is invalidated only on
//!   hard deletion.
//! - Heads are write-through: a successful CAS populates the cache before
//!   the write returns.
//! - No stale write-back: entries are only ever replaced with fresher rows
//!   or dropped.

mod ttl;

pub use ttl::TtlCache;

use crate::{
    clock::Clock,
    db::meta::{HeadRow, MappingRow},
    types::{ExternalId, InternalId},
};
use std::sync::Arc;

///
/// CacheLayer
///
/// Process-local cache pair in front of the metadata gateway.
///

pub struct CacheLayer {
    clock: Arc<dyn Clock>,
    id_map: TtlCache<String, MappingRow>,
    heads: TtlCache<InternalId, HeadRow>,
}

impl CacheLayer {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, id_map_ttl_ms: u64, head_ttl_ms: u64) -> Self {
        Self {
            clock,
            id_map: TtlCache::new(id_map_ttl_ms),
            heads: TtlCache::new(head_ttl_ms),
        }
    }

    // -- id mapping ------------------------------------------------------

    #[must_use]
    pub fn get_mapping(&self, external_id: &ExternalId) -> Option<MappingRow> {
        self.id_map
            .get(external_id.as_str(), self.clock.now_millis())
    }

    pub fn put_mapping(&self, row: MappingRow) {
        self.id_map.insert(
            row.external_id.as_str().to_string(),
            row,
            self.clock.now_millis(),
        );
    }

    /// Drop a mapping entry; only hard deletion calls this.
    pub fn invalidate_mapping(&self, external_id: &ExternalId) {
        self.id_map.remove(external_id.as_str());
    }

    // -- heads -----------------------------------------------------------

    #[must_use]
    pub fn get_head(&self, internal_id: InternalId) -> Option<HeadRow> {
        self.heads.get(&internal_id, self.clock.now_millis())
    }

    /// Write-through after a successful CAS. Only rows that advance (or
    /// match) the cached pointer are kept; anything else drops the entry so
    /// a stale racer can never shadow a newer head.
    pub fn put_head(&self, row: HeadRow) {
        let now = self.clock.now_millis();
        let fresh_enough = self
            .heads
            .get(&row.internal_id, now)
            .is_none_or(|cached| cached.head_revision_id <= row.head_revision_id);

        if fresh_enough {
            self.heads.insert(row.internal_id, row, now);
        } else {
            self.heads.remove(&row.internal_id);
        }
    }

    pub fn invalidate_head(&self, internal_id: InternalId) {
        self.heads.remove(&internal_id);
    }

    /// Drop everything; restart-equivalent and always correctness-neutral.
    pub fn flush(&self) {
        self.id_map.clear();
        self.heads.clear();
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        clock::LogicalClock,
        db::meta::ProtectionFlags,
        types::{EntityType, RevisionId, Timestamp},
    };

    fn mapping(external: &str, raw: u64) -> MappingRow {
        let external_id = ExternalId::try_from_str(external).expect("id");
        MappingRow {
            internal_id: InternalId::try_from_raw(raw).expect("id"),
            entity_type: external_id.entity_type(),
            external_id,
        }
    }

    fn head(raw: u64, rev: u64) -> HeadRow {
        HeadRow {
            internal_id: InternalId::try_from_raw(raw).expect("id"),
            head_revision_id: RevisionId::new(rev),
            updated_at: Timestamp::from_millis(rev),
            flags: ProtectionFlags::default(),
            is_deleted: false,
            redirects_to: None,
        }
    }

    fn layer() -> (Arc<LogicalClock>, CacheLayer) {
        let clock = Arc::new(LogicalClock::new(0));
        let layer = CacheLayer::new(clock.clone(), 1_000, 100);
        (clock, layer)
    }

    #[test]
    fn entries_expire_per_ttl() {
        let (clock, cache) = layer();
        let q1 = ExternalId::try_from_str("Q1").expect("id");
        cache.put_mapping(mapping("Q1", 1));
        cache.put_head(head(1, 1));

        clock.advance(101);
        assert!(cache.get_head(InternalId::try_from_raw(1).expect("id")).is_none());
        assert!(cache.get_mapping(&q1).is_some(), "id map has a longer ttl");

        clock.advance(900);
        assert!(cache.get_mapping(&q1).is_none());
    }

    #[test]
    fn head_write_through_never_regresses() {
        let (_, cache) = layer();
        let id = InternalId::try_from_raw(1).expect("id");
        cache.put_head(head(1, 5));
        // a racer holding an older row cannot shadow the newer head
        cache.put_head(head(1, 3));
        assert!(cache.get_head(id).is_none(), "conflicting write drops the key");

        cache.put_head(head(1, 6));
        assert_eq!(
            cache.get_head(id).expect("cached").head_revision_id,
            RevisionId::new(6)
        );
    }

    #[test]
    fn invalidation_and_flush_drop_entries() {
        let (_, cache) = layer();
        let q1 = ExternalId::try_from_str("Q1").expect("id");
        let id = InternalId::try_from_raw(1).expect("id");
        cache.put_mapping(mapping("Q1", 1));
        cache.put_head(head(1, 1));

        cache.invalidate_head(id);
        assert!(cache.get_head(id).is_none());

        cache.invalidate_mapping(&q1);
        assert!(cache.get_mapping(&q1).is_none());

        cache.put_mapping(mapping("Q1", 1));
        cache.flush();
        assert!(cache.get_mapping(&q1).is_none());
    }
}
