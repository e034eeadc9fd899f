//! Property-Based Tests for the mastery model
//!
//! Invariants:
//! - Reward bounds: compute_reward always in [-1, 1]
//! - Mastery bounds: any response sequence keeps mastery in [-100, 100]
//! - Calibration round-trip: denormalize(normalize(x)) within 0.01 of x
//! - Interval monotonicity across the tier table
//! - Replay determinism: sorted replay ignores arrival order
//! - Transfer cap: aggregate boost per target never exceeds 40
//! - Live processing in any arrival order converges to the sorted replay

mod common;

use chrono::Duration;
use proptest::prelude::*;

use common::{base_time, key};
use mastery_algo::{
    aggregate_transfer, calibration, compute_reward, infer_transfer, BloomLevel, Confidence,
    IntervalTable, MasteryUpdateEngine, RelatedTopics, Response, RewardComponents, TopicMastery,
    MASTERY_MAX, MASTERY_MIN, TRANSFER_TOTAL_CAP,
};
use mastery_engine::store::RecordStore;
use mastery_engine::{Config, OrderingPolicy};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_confidence() -> impl Strategy<Value = Confidence> {
    (1u8..=5u8).prop_map(|c| Confidence::new(c).unwrap())
}

fn arb_components() -> impl Strategy<Value = Option<RewardComponents>> {
    proptest::option::of((-1.0f64..=1.0f64, -1.0f64..=1.0f64).prop_map(
        |(calibration, recognition)| RewardComponents {
            calibration,
            recognition,
        },
    ))
}

fn arb_response(minute: i64) -> impl Strategy<Value = Response> {
    (any::<bool>(), arb_confidence(), 0.0f64..600.0f64, arb_components()).prop_map(
        move |(is_correct, confidence, latency_secs, reward_components)| Response {
            id: format!("r{minute}"),
            user_id: "u1".into(),
            topic_id: "loops".into(),
            question_id: format!("q{minute}"),
            chapter_id: None,
            bloom_level: BloomLevel::APPLY,
            is_correct,
            confidence,
            latency_secs,
            reward_components,
            raw_calibration: None,
            answered_at: base_time() + Duration::minutes(minute),
        },
    )
}

/// Distinct timestamps, chronological order
fn arb_history(max_len: usize) -> impl Strategy<Value = Vec<Response>> {
    (1..=max_len).prop_flat_map(|len| {
        (0..len as i64)
            .map(arb_response)
            .collect::<Vec<_>>()
    })
}

fn arb_shuffled_history(max_len: usize) -> impl Strategy<Value = (Vec<Response>, Vec<Response>)> {
    arb_history(max_len).prop_flat_map(|history| {
        let sorted = history.clone();
        (Just(sorted), Just(history).prop_shuffle())
    })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_reward_bounded(
        is_correct in any::<bool>(),
        confidence in arb_confidence(),
        latency in 0.0f64..10_000.0f64,
    ) {
        let reward = compute_reward(is_correct, confidence, latency);
        prop_assert!((-1.0..=1.0).contains(&reward));
    }

    #[test]
    fn prop_mastery_bounded(history in arb_history(120)) {
        let engine = MasteryUpdateEngine::default();
        let mut state = TopicMastery::new(key("u1", "loops", 3));
        for response in &history {
            state = engine.fold(&state, response).unwrap().mastery;
            prop_assert!(state.mastery_score >= MASTERY_MIN);
            prop_assert!(state.mastery_score <= MASTERY_MAX);
            prop_assert!(state.questions_correct <= state.questions_attempted);
        }
        prop_assert_eq!(state.questions_attempted as usize, history.len());
    }

    #[test]
    fn prop_calibration_round_trip(raw in -1.5f64..=1.5f64) {
        let normalized = calibration::normalize(raw);
        prop_assert!((0.0..=1.0).contains(&normalized));
        prop_assert!((calibration::denormalize(normalized) - raw).abs() <= 0.01);
    }

    #[test]
    fn prop_normalize_clamps_any_input(raw in any::<f64>()) {
        let normalized = calibration::normalize(raw);
        prop_assert!((0.0..=1.0).contains(&normalized));
    }

    #[test]
    fn prop_interval_monotonic(a in 0.0f64..=1.0f64, b in 0.0f64..=1.0f64) {
        let table = IntervalTable::default();
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(table.interval_hours(low) <= table.interval_hours(high));
        prop_assert!((4..=336).contains(&table.interval_hours(low)));
    }

    #[test]
    fn prop_sorted_replay_is_order_independent((sorted, shuffled) in arb_shuffled_history(60)) {
        let engine = MasteryUpdateEngine::default();
        let k = key("u1", "loops", 3);
        let first = engine.replay(&k, &sorted);
        let second = engine.replay(&k, &sorted);
        let from_shuffled = engine.replay(&k, &shuffled);
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(&first, &from_shuffled);
    }

    #[test]
    fn prop_transfer_total_capped(
        masteries in proptest::collection::vec(70.0f64..=100.0f64, 1..12),
    ) {
        let related = RelatedTopics {
            siblings: vec!["target".into()],
            cousins: vec!["target".into()],
            parents: vec!["other".into()],
            children: vec!["target".into()],
        };
        let mut edges = Vec::new();
        for (i, mastery) in masteries.iter().enumerate() {
            edges.extend(infer_transfer(&format!("source{i}"), *mastery, &related));
        }
        for total in aggregate_transfer(&edges).values() {
            prop_assert!(*total <= TRANSFER_TOTAL_CAP);
        }
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_live_processing_converges_to_replay((sorted, shuffled) in arb_shuffled_history(25)) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let config = Config {
            ordering_policy: OrderingPolicy::Replay,
            ..Config::default()
        };
        let (state, store, _) = common::memory_state(config);

        runtime.block_on(async {
            for response in shuffled {
                state.responses.process(response).await.unwrap();
            }
        });

        let k = key("u1", "loops", 3);
        let expected = MasteryUpdateEngine::default().replay(&k, &sorted);
        let stored = store.get_mastery(&k).unwrap();
        prop_assert!((stored.mastery_score - expected.mastery_score).abs() < 1e-9);
        prop_assert_eq!(stored.questions_attempted, expected.questions_attempted);
        prop_assert_eq!(stored.questions_correct, expected.questions_correct);
    }
}
