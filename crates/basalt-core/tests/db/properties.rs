use basalt_core::{
    canon::to_canonical_string,
    hash::content_hash,
    test_support::{TestHarness, assert_store_invariants},
    types::{InternalId, RevisionId},
};
use proptest::prelude::*;
use serde_json::Value as JsonValue;

// Strategy for arbitrary JSON documents of bounded depth.
fn arb_json() -> impl Strategy<Value = JsonValue> {
    let leaf = prop_oneof![
        Just(JsonValue::Null),
        any::<bool>().prop_map(JsonValue::Bool),
        any::<i64>().prop_map(|n| serde_json::json!(n)),
        (-1.0e9_f64..1.0e9_f64).prop_map(|f| serde_json::json!(f)),
        "[a-zA-Z0-9 _-]{0,12}".prop_map(JsonValue::String),
    ];

    leaf.prop_recursive(3, 24, 6, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(JsonValue::Array),
            prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                .prop_map(|map| JsonValue::Object(map.into_iter().collect())),
        ]
    })
}

proptest! {
    // Hashing is a pure function of the document.
    #[test]
    fn hash_is_deterministic(doc in arb_json()) {
        prop_assert_eq!(content_hash(&doc), content_hash(&doc.clone()));
    }

    // Canonical text re-parses to the same document and the same hash.
    #[test]
    fn canonical_text_round_trips(doc in arb_json()) {
        let canonical = to_canonical_string(&doc);
        let reparsed: JsonValue = serde_json::from_str(&canonical)
            .expect("canonical text is valid JSON");
        prop_assert_eq!(content_hash(&doc), content_hash(&reparsed));
        prop_assert_eq!(to_canonical_string(&reparsed), canonical);
    }

    // Object key order in the source text never changes the fingerprint.
    #[test]
    fn hash_ignores_source_key_order(
        entries in prop::collection::btree_map("[a-z]{1,8}", arb_json(), 1..6),
        seed in any::<u64>(),
    ) {
        let mut ordered = entries.iter().collect::<Vec<_>>();
        let sorted_text = object_text(&ordered);

        // Deterministic pseudo-shuffle driven by the seed.
        let len = ordered.len();
        for i in 0..len {
            let j = (seed as usize).wrapping_mul(31).wrapping_add(i * 7) % len;
            ordered.swap(i, j);
        }
        let shuffled_text = object_text(&ordered);

        let sorted: JsonValue = serde_json::from_str(&sorted_text).expect("sorted parse");
        let shuffled: JsonValue = serde_json::from_str(&shuffled_text).expect("shuffled parse");
        prop_assert_eq!(content_hash(&sorted), content_hash(&shuffled));
    }

    // Equivalent numeric source forms collapse to one fingerprint.
    #[test]
    fn hash_collapses_equivalent_numeric_forms(f in -1.0e12_f64..1.0e12_f64) {
        let plain: JsonValue = serde_json::from_str(&format!("{{\"n\":{f}}}"))
            .expect("plain form");
        let lower_exp: JsonValue = serde_json::from_str(&format!("{{\"n\":{f:e}}}"))
            .expect("lower exponent form");
        let upper_exp: JsonValue = serde_json::from_str(&format!("{{\"n\":{f:E}}}"))
            .expect("upper exponent form");

        prop_assert_eq!(content_hash(&plain), content_hash(&lower_exp));
        prop_assert_eq!(content_hash(&plain), content_hash(&upper_exp));
    }

    // Internal-id packing: sign bit clear, both components recoverable.
    #[test]
    fn internal_id_layout_round_trips(
        millis in 0_u64..(1 << 42),
        random in any::<u64>(),
    ) {
        let id = InternalId::compose(millis, random).expect("compose");
        prop_assert_eq!(id.as_u64() >> 63, 0);
        prop_assert_eq!(id.millis_offset(), millis);
        prop_assert_eq!(id.random(), random & ((1 << 21) - 1));
        let back = InternalId::try_from_raw(id.as_u64()).expect("raw round trip");
        prop_assert_eq!(back, id);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    // A random label sequence keeps the head monotonic, the store
    // invariants intact, and repeats deduplicated.
    #[test]
    fn write_sequences_preserve_head_monotonicity(
        labels in prop::collection::vec("[a-c]", 1..12),
    ) {
        let harness = TestHarness::new();
        let mut last_head = RevisionId::NONE;
        let mut last_label: Option<String> = None;

        for label in labels {
            let outcome = harness.write_labeled("Q1", &label);
            prop_assert!(
                outcome.revision_id >= last_head,
                "head must never decrease"
            );
            let repeated = last_label.as_deref() == Some(label.as_str());
            prop_assert_eq!(
                outcome.deduplicated, repeated,
                "dedupe exactly on repeated bodies"
            );
            last_head = outcome.revision_id;
            last_label = Some(label);
        }

        assert_store_invariants(&harness);
    }
}

fn object_text(entries: &[(&String, &JsonValue)]) -> String {
    let mut out = String::from("{");
    for (i, (key, value)) in entries.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&serde_json::to_string(key).expect("key"));
        out.push(':');
        out.push_str(&serde_json::to_string(value).expect("value"));
    }
    out.push('}');
    out
}
