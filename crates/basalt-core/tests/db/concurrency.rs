use basalt_core::{
    db::{EntityRead, WriteRequest},
    test_support::{TestHarness, assert_store_invariants, item_body},
    types::RevisionId,
};
use std::collections::BTreeSet;

#[test]
fn concurrent_writers_serialize_into_consecutive_revisions() {
    let harness = TestHarness::new();
    harness.write_labeled("Q42", "one");
    harness.write_labeled("Q42", "two");
    harness.write_labeled("Q42", "three");

    let store = &harness.store;
    let (left, right) = std::thread::scope(|scope| {
        let a = scope.spawn(|| {
            store
                .put_entity(WriteRequest::edit(
                    TestHarness::id("Q42"),
                    item_body("Q42", "from writer a"),
                    "writer-a",
                ))
                .expect("writer a commits")
        });
        let b = scope.spawn(|| {
            store
                .put_entity(WriteRequest::edit(
                    TestHarness::id("Q42"),
                    item_body("Q42", "from writer b"),
                    "writer-b",
                ))
                .expect("writer b commits")
        });
        (a.join().expect("thread a"), b.join().expect("thread b"))
    });

    let observed = BTreeSet::from([left.revision_id.get(), right.revision_id.get()]);
    assert_eq!(
        observed,
        BTreeSet::from([4, 5]),
        "exactly one writer lands revision 4 and one revision 5"
    );

    match harness.store.get_entity(&TestHarness::id("Q42")).expect("read") {
        EntityRead::Entity { revision_id, .. } => assert_eq!(revision_id, RevisionId::new(5)),
        EntityRead::RedirectsTo { .. } => panic!("not a redirect"),
    }

    // Both committed revisions are readable with their own bodies.
    for (outcome, body) in [(&left, "from writer a"), (&right, "from writer b")] {
        let envelope = harness
            .store
            .get_revision(&TestHarness::id("Q42"), outcome.revision_id)
            .expect("committed revision is readable");
        assert_eq!(envelope.entity["labels"]["en"]["value"], *body);
    }

    assert_store_invariants(&harness);
}

#[test]
fn concurrent_identical_creates_produce_one_revision() {
    let harness = TestHarness::new();
    let store = &harness.store;

    let outcomes = std::thread::scope(|scope| {
        let handles = (0..4)
            .map(|_| {
                scope.spawn(|| {
                    store
                        .put_entity(WriteRequest::edit(
                            TestHarness::id("Q7"),
                            item_body("Q7", "the answer"),
                            "creator",
                        ))
                        .expect("create commits")
                })
            })
            .collect::<Vec<_>>();
        handles
            .into_iter()
            .map(|h| h.join().expect("writer thread"))
            .collect::<Vec<_>>()
    });

    // Every caller observes the same revision id.
    for outcome in &outcomes {
        assert_eq!(outcome.revision_id, RevisionId::FIRST);
    }
    let history = harness
        .store
        .get_history(&TestHarness::id("Q7"), basalt_core::db::HistoryWindow::default())
        .expect("history");
    assert_eq!(history.len(), 1, "identical concurrent creates collapse");

    assert_store_invariants(&harness);
}

#[test]
fn writers_on_distinct_entities_never_contend() {
    let harness = TestHarness::new();
    let store = &harness.store;

    std::thread::scope(|scope| {
        for (external, label) in [("Q1", "a"), ("Q2", "b"), ("Q3", "c"), ("Q4", "d"), ("Q5", "e")]
        {
            scope.spawn(move || {
                store
                    .put_entity(WriteRequest::edit(
                        TestHarness::id(external),
                        item_body(external, label),
                        "writer",
                    ))
                    .expect("independent write commits")
            });
        }
    });

    let metrics = harness.metrics.snapshot();
    assert_eq!(metrics.cas_conflicts, 0, "distinct entities share no CAS");
    assert_eq!(metrics.writes_committed, 5);

    assert_store_invariants(&harness);
}
