use crate::{
    db::meta::{
        DeleteAudit, HeadCursor, HeadLag, HeadRow, MappingInsert, MappingRow, MetaStats,
        MetadataStore, RedirectRow, RevisionInsert, RevisionRow,
    },
    error::{ErrorOrigin, InternalError},
    types::{ExternalId, InternalId, RevisionId},
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};

///
/// MemoryMetadataStore
///
/// Reference implementation and test double for the metadata gateway. One
/// mutex over the whole interior keeps every operation linearizable, which
/// is stronger than the per-entity contract requires and exactly what the
/// harness needs.
///

#[derive(Default)]
pub struct MemoryMetadataStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    by_external: BTreeMap<String, InternalId>,
    mappings: BTreeMap<InternalId, MappingRow>,
    heads: BTreeMap<InternalId, HeadRow>,
    revisions: BTreeMap<(InternalId, RevisionId), RevisionRow>,
    redirects: BTreeMap<InternalId, RedirectRow>,
    incoming: BTreeMap<InternalId, BTreeSet<InternalId>>,
    audits: BTreeMap<InternalId, Vec<DeleteAudit>>,
}

impl MemoryMetadataStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn revision_range(internal_id: InternalId) -> ((InternalId, RevisionId), (InternalId, RevisionId)) {
        (
            (internal_id, RevisionId::NONE),
            (internal_id, RevisionId::new(u64::MAX)),
        )
    }
}

impl MetadataStore for MemoryMetadataStore {
    fn resolve_external(
        &self,
        external_id: &ExternalId,
    ) -> Result<Option<MappingRow>, InternalError> {
        let inner = self.inner.lock();
        let Some(internal_id) = inner.by_external.get(external_id.as_str()) else {
            return Ok(None);
        };

        Ok(inner.mappings.get(internal_id).cloned())
    }

    fn get_mapping(&self, internal_id: InternalId) -> Result<Option<MappingRow>, InternalError> {
        Ok(self.inner.lock().mappings.get(&internal_id).cloned())
    }

    fn insert_mapping(&self, row: MappingRow) -> Result<MappingInsert, InternalError> {
        let mut inner = self.inner.lock();

        if let Some(existing_id) = inner.by_external.get(row.external_id.as_str()) {
            let existing = inner.mappings.get(existing_id).cloned().ok_or_else(|| {
                InternalError::corruption(
                    ErrorOrigin::Meta,
                    format!("dangling external index for {}", row.external_id),
                )
            })?;

            return Ok(MappingInsert::ExternalExists(existing));
        }
        if inner.mappings.contains_key(&row.internal_id) {
            return Ok(MappingInsert::InternalCollision);
        }

        inner
            .by_external
            .insert(row.external_id.as_str().to_string(), row.internal_id);
        inner.mappings.insert(row.internal_id, row);

        Ok(MappingInsert::Inserted)
    }

    fn get_head(&self, internal_id: InternalId) -> Result<Option<HeadRow>, InternalError> {
        Ok(self.inner.lock().heads.get(&internal_id).cloned())
    }

    fn next_revision_id(&self, internal_id: InternalId) -> Result<RevisionId, InternalError> {
        let inner = self.inner.lock();
        let (lo, hi) = Self::revision_range(internal_id);
        let last = inner
            .revisions
            .range(lo..=hi)
            .next_back()
            .map_or(RevisionId::NONE, |((_, rev), _)| *rev);

        Ok(last.next())
    }

    fn get_revision(
        &self,
        internal_id: InternalId,
        revision_id: RevisionId,
    ) -> Result<Option<RevisionRow>, InternalError> {
        Ok(self
            .inner
            .lock()
            .revisions
            .get(&(internal_id, revision_id))
            .cloned())
    }

    fn insert_revision(&self, row: RevisionRow) -> Result<RevisionInsert, InternalError> {
        let mut inner = self.inner.lock();
        let key = (row.internal_id, row.revision_id);

        if let Some(existing) = inner.revisions.get(&key) {
            return Ok(RevisionInsert::AlreadyExists(existing.clone()));
        }
        inner.revisions.insert(key, row);

        Ok(RevisionInsert::Inserted)
    }

    fn cas_head(
        &self,
        internal_id: InternalId,
        expected: RevisionId,
        new_head: HeadRow,
    ) -> Result<bool, InternalError> {
        if new_head.internal_id != internal_id {
            return Err(InternalError::invariant(
                ErrorOrigin::Meta,
                "cas_head row targets a different entity",
            ));
        }

        let mut inner = self.inner.lock();
        let current = inner
            .heads
            .get(&internal_id)
            .map_or(RevisionId::NONE, |head| head.head_revision_id);

        if current != expected {
            return Ok(false);
        }
        // Head decrease is an invariant violation, never a lost race.
        if new_head.head_revision_id < current {
            return Err(InternalError::invariant(
                ErrorOrigin::Meta,
                format!(
                    "head decrease attempt on {internal_id}: {current} -> {}",
                    new_head.head_revision_id
                ),
            ));
        }

        inner.heads.insert(internal_id, new_head);

        Ok(true)
    }

    fn list_history(&self, internal_id: InternalId) -> Result<Vec<RevisionRow>, InternalError> {
        let inner = self.inner.lock();
        let (lo, hi) = Self::revision_range(internal_id);

        Ok(inner.revisions.range(lo..=hi).map(|(_, row)| row.clone()).collect())
    }

    fn list_heads_updated_since(
        &self,
        cursor: Option<HeadCursor>,
        limit: usize,
    ) -> Result<Vec<HeadRow>, InternalError> {
        let inner = self.inner.lock();
        let mut rows = inner
            .heads
            .values()
            .filter(|head| cursor.is_none_or(|c| head.cursor() > c))
            .cloned()
            .collect::<Vec<_>>();
        rows.sort_by_key(HeadRow::cursor);
        rows.truncate(limit);

        Ok(rows)
    }

    fn list_lagging_heads(&self, limit: usize) -> Result<Vec<HeadLag>, InternalError> {
        let inner = self.inner.lock();
        let mut lagging = Vec::new();

        for (&internal_id, _) in &inner.mappings {
            if lagging.len() >= limit {
                break;
            }
            let (lo, hi) = Self::revision_range(internal_id);
            let Some(max_revision_id) =
                inner.revisions.range(lo..=hi).next_back().map(|((_, rev), _)| *rev)
            else {
                continue;
            };
            let head_revision_id = inner
                .heads
                .get(&internal_id)
                .map_or(RevisionId::NONE, |head| head.head_revision_id);
            if max_revision_id > head_revision_id {
                lagging.push(HeadLag {
                    internal_id,
                    head_revision_id,
                    max_revision_id,
                });
            }
        }

        Ok(lagging)
    }

    fn record_delete_audit(&self, audit: DeleteAudit) -> Result<(), InternalError> {
        let mut inner = self.inner.lock();
        inner
            .audits
            .entry(audit.internal_id)
            .or_default()
            .push(audit);

        Ok(())
    }

    fn hard_delete_mark(&self, audit: DeleteAudit) -> Result<(), InternalError> {
        let mut inner = self.inner.lock();
        let internal_id = audit.internal_id;

        let head = inner.heads.get_mut(&internal_id).ok_or_else(|| {
            InternalError::invariant(
                ErrorOrigin::Meta,
                format!("hard delete mark on headless entity {internal_id}"),
            )
        })?;
        head.is_deleted = true;
        inner.audits.entry(internal_id).or_default().push(audit);

        Ok(())
    }

    fn list_delete_audits(
        &self,
        internal_id: InternalId,
    ) -> Result<Vec<DeleteAudit>, InternalError> {
        Ok(self
            .inner
            .lock()
            .audits
            .get(&internal_id)
            .cloned()
            .unwrap_or_default())
    }

    fn create_redirect(&self, row: RedirectRow) -> Result<(), InternalError> {
        let mut inner = self.inner.lock();

        if let Some(existing) = inner.redirects.get(&row.from_internal_id) {
            if existing.to_internal_id == row.to_internal_id {
                // Unique on the pair; the same relation is idempotent.
                return Ok(());
            }

            return Err(InternalError::conflict(
                ErrorOrigin::Meta,
                format!(
                    "redirect source {} already points at {}",
                    row.from_internal_id, existing.to_internal_id
                ),
            ));
        }

        inner
            .incoming
            .entry(row.to_internal_id)
            .or_default()
            .insert(row.from_internal_id);
        inner.redirects.insert(row.from_internal_id, row);

        Ok(())
    }

    fn remove_redirect(&self, from: InternalId) -> Result<(), InternalError> {
        let mut inner = self.inner.lock();

        if let Some(row) = inner.redirects.remove(&from) {
            if let Some(set) = inner.incoming.get_mut(&row.to_internal_id) {
                set.remove(&from);
                if set.is_empty() {
                    inner.incoming.remove(&row.to_internal_id);
                }
            }
        }

        Ok(())
    }

    fn get_redirect_target(
        &self,
        from: InternalId,
    ) -> Result<Option<InternalId>, InternalError> {
        Ok(self
            .inner
            .lock()
            .redirects
            .get(&from)
            .map(|row| row.to_internal_id))
    }

    fn get_incoming_redirects(&self, to: InternalId) -> Result<Vec<InternalId>, InternalError> {
        Ok(self
            .inner
            .lock()
            .incoming
            .get(&to)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default())
    }

    fn stats(&self) -> Result<MetaStats, InternalError> {
        let inner = self.inner.lock();

        Ok(MetaStats {
            entities: inner.mappings.len() as u64,
            revisions: inner.revisions.len() as u64,
            redirects: inner.redirects.len() as u64,
            delete_audits: inner.audits.values().map(|a| a.len() as u64).sum(),
        })
    }
}

///
/// TESTS
///
