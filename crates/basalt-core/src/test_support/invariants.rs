//! Whole-store invariant assertions, run by scenario tests after every
//! interesting sequence of operations.

use crate::{
    db::{
        meta::MetadataStore,
        snapshot::{PublicationState, SnapshotEnvelope, SnapshotKey, SnapshotStore},
    },
    test_support::TestHarness,
    types::RevisionId,
};

/// Assert the cross-store invariants on a quiesced harness:
/// every metadata row has a snapshot whose envelope agrees with it, and
/// every head points at the maximum published revision.
pub fn assert_store_invariants(harness: &TestHarness) {
    let heads = harness
        .meta
        .list_heads_updated_since(None, usize::MAX)
        .expect("head feed");

    for head in heads {
        let mapping = harness
            .meta
            .get_mapping(head.internal_id)
            .expect("mapping read")
            .expect("every head has a mapping");
        let history = harness
            .meta
            .list_history(head.internal_id)
            .expect("history read");

        let mut previous = RevisionId::NONE;
        let mut max_published = RevisionId::NONE;

        for row in &history {
            assert!(
                row.revision_id > previous,
                "{}: history must ascend strictly",
                mapping.external_id
            );
            previous = row.revision_id;

            let key = SnapshotKey::new(mapping.external_id.clone(), row.revision_id);
            let object = harness
                .snapshots
                .get(&key)
                .expect("snapshot read")
                .unwrap_or_else(|| panic!("{key}: metadata row without snapshot object"));
            let envelope =
                SnapshotEnvelope::from_bytes(&object.bytes).expect("snapshot must decode");
            assert_eq!(
                envelope.revision_id, row.revision_id,
                "{key}: envelope revision disagrees with its key"
            );
            if let Some(hash) = row.content_hash {
                assert_eq!(
                    envelope.content_hash, hash,
                    "{key}: envelope hash disagrees with metadata"
                );
            }
            if object.state == PublicationState::Published {
                max_published = max_published.max(row.revision_id);
            }
        }

        assert_eq!(
            head.head_revision_id, max_published,
            "{}: head must equal the maximum published revision",
            mapping.external_id
        );
    }
}
