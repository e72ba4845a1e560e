use basalt_core::{
    db::{EntityRead, HistoryWindow, ReadError, WriteError, WriteRequest},
    test_support::{TestHarness, assert_store_invariants, item_body},
    types::RevisionId,
};

#[test]
fn identical_writes_deduplicate_to_one_revision() {
    let harness = TestHarness::new();

    let first = harness.write_labeled("Q42", "A");
    assert_eq!(first.revision_id, RevisionId::FIRST);
    assert!(!first.deduplicated);

    let objects_after_first = harness.snapshots.object_count();

    let second = harness.write_labeled("Q42", "A");
    assert_eq!(second.revision_id, RevisionId::FIRST, "same body, same revision");
    assert!(second.deduplicated);
    assert_eq!(
        harness.snapshots.object_count(),
        objects_after_first,
        "no new snapshot object on a deduplicated write"
    );

    assert_store_invariants(&harness);
}

#[test]
fn distinct_bodies_advance_the_revision_sequence() {
    let harness = TestHarness::new();

    assert_eq!(harness.write_labeled("Q42", "A").revision_id, RevisionId::new(1));
    assert_eq!(harness.write_labeled("Q42", "B").revision_id, RevisionId::new(2));

    let history = harness
        .store
        .get_history(&TestHarness::id("Q42"), HistoryWindow::default())
        .expect("history");
    let revisions = history.iter().map(|r| r.revision_id.get()).collect::<Vec<_>>();
    assert_eq!(revisions, vec![1, 2]);

    assert_store_invariants(&harness);
}

#[test]
fn head_read_returns_the_latest_envelope() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");
    harness.write_labeled("Q42", "B");

    match harness.store.get_entity(&TestHarness::id("Q42")).expect("read") {
        EntityRead::Entity {
            revision_id,
            envelope,
        } => {
            assert_eq!(revision_id, RevisionId::new(2));
            assert_eq!(envelope.entity["labels"]["en"]["value"], "B");
            assert_eq!(envelope.revision_id, RevisionId::new(2));
        }
        EntityRead::RedirectsTo { .. } => panic!("Q42 is not a redirect"),
    }
}

#[test]
fn revision_reads_serve_historical_snapshots() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");
    harness.write_labeled("Q42", "B");

    let id = TestHarness::id("Q42");
    let old = harness
        .store
        .get_revision(&id, RevisionId::new(1))
        .expect("revision 1");
    assert_eq!(old.entity["labels"]["en"]["value"], "A");

    let raw = harness
        .store
        .get_raw_revision(&id, RevisionId::new(1))
        .expect("raw revision 1");
    assert_eq!(raw["labels"]["en"]["value"], "A");
    assert!(raw.get("schema_version").is_none(), "raw body is unwrapped");

    assert!(matches!(
        harness.store.get_revision(&id, RevisionId::new(9)),
        Err(ReadError::RevisionNotFound { .. })
    ));
}

#[test]
fn history_pagination_windows_the_ascending_list() {
    let harness = TestHarness::new();
    for label in ["A", "B", "C", "D", "E"] {
        harness.write_labeled("Q42", label);
    }

    let id = TestHarness::id("Q42");
    let window = harness
        .store
        .get_history(
            &id,
            HistoryWindow {
                offset: 1,
                limit: 2,
            },
        )
        .expect("history window");
    let revisions = window.iter().map(|r| r.revision_id.get()).collect::<Vec<_>>();
    assert_eq!(revisions, vec![2, 3]);
}

#[test]
fn unknown_entities_read_as_not_found() {
    let harness = TestHarness::new();
    assert!(matches!(
        harness.store.get_entity(&TestHarness::id("Q404")),
        Err(ReadError::EntityNotFound(_))
    ));
}

#[test]
fn malformed_bodies_are_rejected_before_any_write() {
    let harness = TestHarness::new();

    let err = harness
        .store
        .put_entity(WriteRequest::edit(
            TestHarness::id("Q42"),
            item_body("Q43", "mismatched id"),
            "tester",
        ))
        .expect_err("id mismatch must be rejected");
    assert!(matches!(err, WriteError::InvalidEntity(_)));
    assert_eq!(harness.snapshots.object_count(), 0, "nothing was stored");
}

#[test]
fn cache_serves_repeat_head_reads() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "A");

    let id = TestHarness::id("Q42");
    harness.store.get_entity(&id).expect("first read");
    harness.store.get_entity(&id).expect("second read");

    let metrics = harness.metrics.snapshot();
    assert!(
        metrics.id_map_cache_hits >= 1,
        "repeat resolution must hit the id-map cache"
    );
}
