use basalt_core::{
    clock::Clock,
    db::{Backfill, EntityChangeEvent, PublishOutcome},
    test_support::TestHarness,
    types::{RevisionId, Timestamp},
};

fn steps_for(events: &[EntityChangeEvent], external: &str) -> Vec<(Option<u64>, u64)> {
    events
        .iter()
        .filter(|e| e.external_id.as_str() == external)
        .map(|e| {
            (
                e.from_revision_id.map(RevisionId::get),
                e.to_revision_id.get(),
            )
        })
        .collect()
}

#[test]
fn poller_emits_every_revision_step_in_order() {
    let harness = TestHarness::new();

    // Interleave Q9's five revisions with other traffic.
    harness.write_labeled("Q9", "v1");
    harness.write_labeled("Q1", "noise 1");
    harness.write_labeled("Q9", "v2");
    harness.write_labeled("Q9", "v3");
    harness.write_labeled("Q2", "noise 2");
    harness.write_labeled("Q9", "v4");
    harness.write_labeled("Q1", "noise 3");
    harness.write_labeled("Q9", "v5");

    // Drop the pipeline's own emissions; the poller must derive the stream
    // from the stores alone.
    let _ = harness.sink.take();

    let report = harness.store.poll_once().expect("poll");
    assert!(!report.paused);
    assert_eq!(report.entities_seen, 3);

    let events = harness.sink.take();
    assert_eq!(
        steps_for(&events, "Q9"),
        vec![
            (None, 1),
            (Some(1), 2),
            (Some(2), 3),
            (Some(3), 4),
            (Some(4), 5),
        ],
        "revision-ordered, gap-free, duplicate-free chain"
    );
    assert_eq!(steps_for(&events, "Q1"), vec![(None, 1), (Some(1), 2)]);
    assert_eq!(steps_for(&events, "Q2"), vec![(None, 1)]);
}

#[test]
fn poller_resumes_from_its_checkpoint_without_duplicates() {
    let harness = TestHarness::new();
    harness.write_labeled("Q9", "v1");
    harness.write_labeled("Q9", "v2");

    let _ = harness.sink.take();
    harness.store.poll_once().expect("first poll");
    assert_eq!(
        steps_for(&harness.sink.take(), "Q9"),
        vec![(None, 1), (Some(1), 2)]
    );

    // Nothing new: the next poll emits nothing.
    let report = harness.store.poll_once().expect("idle poll");
    assert_eq!(report.events_emitted, 0);

    harness.write_labeled("Q9", "v3");
    let _ = harness.sink.take();
    harness.store.poll_once().expect("incremental poll");
    assert_eq!(
        steps_for(&harness.sink.take(), "Q9"),
        vec![(Some(2), 3)],
        "only the step since the checkpoint"
    );
}

#[test]
fn sink_refusal_pauses_the_checkpoint() {
    let harness = TestHarness::new();
    harness.write_labeled("Q9", "v1");
    harness.write_labeled("Q9", "v2");
    let _ = harness.sink.take();

    harness.sink.set_refusal(Some(PublishOutcome::Retryable));
    let report = harness.store.poll_once().expect("refused poll");
    assert!(report.paused);
    assert_eq!(report.events_emitted, 0);

    // Once the sink recovers, the full chain arrives exactly once.
    harness.sink.set_refusal(None);
    harness.store.poll_once().expect("recovered poll");
    assert_eq!(
        steps_for(&harness.sink.take(), "Q9"),
        vec![(None, 1), (Some(1), 2)]
    );
}

#[test]
fn backfill_replays_a_window_without_moving_the_checkpoint() {
    let harness = TestHarness::new();

    harness.write_labeled("Q9", "v1");
    let window_start = Timestamp::from_millis(harness.clock.now_millis() + 1);
    harness.clock.advance(10);
    harness.write_labeled("Q9", "v2");
    harness.clock.advance(10);
    harness.write_labeled("Q9", "v3");
    let window_end = Timestamp::from_millis(harness.clock.now_millis());
    harness.clock.advance(10);
    harness.write_labeled("Q9", "v4");

    let _ = harness.sink.take();
    let emitted = harness
        .store
        .backfill(Backfill {
            start: window_start,
            end: window_end,
        })
        .expect("backfill");
    assert_eq!(emitted, 2);
    assert_eq!(
        steps_for(&harness.sink.take(), "Q9"),
        vec![(Some(1), 2), (Some(2), 3)],
        "window bounds select revisions 2 and 3; from-chain stays intact"
    );

    // The live checkpoint was never created, so a live poll starts from
    // scratch and emits the whole chain.
    let report = harness.store.poll_once().expect("live poll");
    assert_eq!(report.events_emitted, 4);
}
