use basalt_core::{
    clock::Clock,
    db::{
        EntityRead, PublishOutcome,
        meta::{
            EditKind, HeadRow, MetadataStore, ProtectionFlags, RevisionInsert, RevisionRow,
            ValidationStatus,
        },
        snapshot::{PublicationState, SnapshotEnvelope, SnapshotKey, SnapshotStore},
    },
    hash::content_hash,
    test_support::{TestHarness, assert_store_invariants, item_body},
    types::{EntityType, ExternalId, InternalId, RevisionId, SchemaVersion, Timestamp},
};
use serde_json::Value as JsonValue;

// Plant a pending snapshot as an interrupted writer would have left it
// after phase A. Returns the envelope for follow-up injections.
fn inject_pending(
    harness: &TestHarness,
    external: &str,
    revision: u64,
    entity: JsonValue,
) -> SnapshotEnvelope {
    let envelope = SnapshotEnvelope {
        schema_version: SchemaVersion::new(1, 0, 0),
        revision_id: RevisionId::new(revision),
        created_at: Timestamp::from_millis(harness.clock.now_millis()),
        created_by: "crashed-writer".to_string(),
        entity_type: EntityType::Item,
        edit_type: "edit_entity".to_string(),
        content_hash: content_hash(&entity),
        redirects_to: None,
        is_deleted: false,
        deletion_reason: None,
        deleted_at: None,
        deleted_by: None,
        is_mass_edit: false,
        entity,
    };
    let key = SnapshotKey::new(
        ExternalId::try_from_str(external).expect("id"),
        RevisionId::new(revision),
    );
    harness
        .snapshots
        .put(&key, envelope.to_bytes().expect("encode"), PublicationState::Pending)
        .expect("inject pending");

    envelope
}

fn internal_id_of(harness: &TestHarness, external: &str) -> InternalId {
    harness
        .meta
        .resolve_external(&TestHarness::id(external))
        .expect("resolve")
        .expect("mapping")
        .internal_id
}

#[test]
fn orphan_pending_snapshot_is_completed_into_a_revision() {
    crate::init_test_logging();
    let harness = TestHarness::new();
    for label in ["one", "two", "three"] {
        harness.write_labeled("Q7", label);
    }

    inject_pending(&harness, "Q7", 4, item_body("Q7", "recovered"));

    let report = harness.store.reconcile_once().expect("sweep");
    assert_eq!(report.meta_inserted, 1);
    assert_eq!(report.heads_advanced, 1);
    assert!(report.republished >= 1);
    assert_eq!(report.abandoned, 0);
    assert_eq!(report.invariant_faults, 0);

    match harness.store.get_entity(&TestHarness::id("Q7")).expect("read") {
        EntityRead::Entity {
            revision_id,
            envelope,
        } => {
            assert_eq!(revision_id, RevisionId::new(4));
            assert_eq!(envelope.entity["labels"]["en"]["value"], "recovered");
        }
        EntityRead::RedirectsTo { .. } => panic!("not a redirect"),
    }

    assert_store_invariants(&harness);
}

#[test]
fn reconciler_is_idempotent_over_repaired_state() {
    let harness = TestHarness::new();
    for label in ["one", "two", "three"] {
        harness.write_labeled("Q7", label);
    }
    inject_pending(&harness, "Q7", 4, item_body("Q7", "recovered"));

    harness.store.reconcile_once().expect("first sweep");
    let head_after_first = internal_head(&harness, "Q7");

    for _ in 0..3 {
        let report = harness.store.reconcile_once().expect("repeat sweep");
        assert_eq!(report.meta_inserted, 0);
        assert_eq!(report.heads_advanced, 0);
        assert_eq!(report.republished, 0);
        assert_eq!(head_after_first, internal_head(&harness, "Q7"), "head never moves again");
    }

    assert_store_invariants(&harness);
}

#[test]
fn stale_orphans_are_abandoned_not_repaired() {
    crate::init_test_logging();
    let harness = TestHarness::new();
    for label in ["one", "two", "three"] {
        harness.write_labeled("Q7", label);
    }
    inject_pending(&harness, "Q7", 4, item_body("Q7", "too late"));

    // Past the abandonment ttl the orphan is logged and left in place.
    harness.clock.advance(16 * 60 * 1_000);
    let report = harness.store.reconcile_once().expect("sweep");
    assert_eq!(report.abandoned, 1);
    assert_eq!(report.meta_inserted, 0);
    assert_eq!(internal_head(&harness, "Q7"), RevisionId::new(3));

    // Abandonment is reported once, not on every sweep.
    let repeat = harness.store.reconcile_once().expect("repeat sweep");
    assert_eq!(repeat.abandoned, 0);

    // The revision id is reusable because no metadata row exists.
    let next = harness.write_labeled("Q7", "fresh start");
    assert_eq!(next.revision_id, RevisionId::new(4));

    assert_store_invariants(&harness);
}

#[test]
fn interrupted_cas_is_completed_from_the_metadata_row() {
    let harness = TestHarness::new();
    harness.write_labeled("Q8", "one");

    // Crash between phase B and phase C: snapshot pending, row inserted,
    // head untouched.
    let envelope = inject_pending(&harness, "Q8", 2, item_body("Q8", "committed"));
    let internal_id = internal_id_of(&harness, "Q8");
    let inserted = harness
        .meta
        .insert_revision(RevisionRow {
            internal_id,
            revision_id: RevisionId::new(2),
            created_at: envelope.created_at,
            created_by: envelope.created_by.clone(),
            size_bytes: 1,
            is_mass_edit: false,
            validation_status: ValidationStatus::Pending,
            schema_version: envelope.schema_version,
            content_hash: Some(envelope.content_hash),
            edit_kind: EditKind::Normal,
        })
        .expect("insert row");
    assert!(matches!(inserted, RevisionInsert::Inserted));

    let report = harness.store.reconcile_once().expect("sweep");
    assert_eq!(report.heads_advanced, 1);
    assert_eq!(internal_head(&harness, "Q8"), RevisionId::new(2));

    assert_store_invariants(&harness);
}

#[test]
fn missed_publish_tag_is_repaired_in_place() {
    let harness = TestHarness::new();
    harness.write_labeled("Q8", "one");

    // Crash between phase C and phase D: head advanced, object pending.
    let envelope = inject_pending(&harness, "Q8", 2, item_body("Q8", "tag me"));
    let internal_id = internal_id_of(&harness, "Q8");
    harness
        .meta
        .insert_revision(RevisionRow {
            internal_id,
            revision_id: RevisionId::new(2),
            created_at: envelope.created_at,
            created_by: envelope.created_by.clone(),
            size_bytes: 1,
            is_mass_edit: false,
            validation_status: ValidationStatus::Pending,
            schema_version: envelope.schema_version,
            content_hash: Some(envelope.content_hash),
            edit_kind: EditKind::Normal,
        })
        .expect("insert row");
    assert!(
        harness
            .meta
            .cas_head(
                internal_id,
                RevisionId::new(1),
                HeadRow {
                    internal_id,
                    head_revision_id: RevisionId::new(2),
                    updated_at: Timestamp::from_millis(harness.clock.now_millis()),
                    flags: ProtectionFlags::default(),
                    is_deleted: false,
                    redirects_to: None,
                },
            )
            .expect("cas")
    );

    let report = harness.store.reconcile_once().expect("sweep");
    assert_eq!(report.republished, 1);
    assert_eq!(report.heads_advanced, 0);

    let key = SnapshotKey::new(TestHarness::id("Q8"), RevisionId::new(2));
    let object = harness.snapshots.get(&key).expect("get").expect("object");
    assert_eq!(object.state, PublicationState::Published);

    assert_store_invariants(&harness);
}

#[test]
fn parked_events_drain_through_the_reconciler() {
    let harness = TestHarness::new();

    harness.sink.set_refusal(Some(PublishOutcome::Retryable));
    harness.write_labeled("Q1", "a");
    harness.write_labeled("Q1", "b");
    assert_eq!(harness.store.outbox_depth(), 2, "refused events park");
    assert!(harness.sink.is_empty());

    harness.sink.set_refusal(None);
    let report = harness.store.reconcile_once().expect("sweep");
    assert_eq!(report.outbox_drained, 2);
    assert_eq!(harness.store.outbox_depth(), 0);

    let events = harness.sink.take();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].to_revision_id, RevisionId::new(1));
    assert_eq!(events[1].to_revision_id, RevisionId::new(2));
}

fn internal_head(harness: &TestHarness, external: &str) -> RevisionId {
    let internal_id = internal_id_of(harness, external);
    harness
        .meta
        .get_head(internal_id)
        .expect("head read")
        .expect("head row")
        .head_revision_id
}
