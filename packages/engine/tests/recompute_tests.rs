//! Batch recomputation: sorted replay, idempotence, partial failure and
//! in-flight scope exclusion.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{key, memory_state, response, FaultyStore};
use mastery_algo::MasteryUpdateEngine;
use mastery_engine::graph::MemoryGraph;
use mastery_engine::store::RecordStore;
use mastery_engine::{AppState, Config, EngineError};

fn seed_shuffled(store: &dyn RecordStore, user: &str, topic: &str) -> Vec<mastery_algo::Response> {
    let responses: Vec<_> = [7, 2, 9, 0, 4]
        .into_iter()
        .map(|minute| {
            response(user, topic, minute)
                .correct(minute % 2 == 0)
                .build()
        })
        .collect();
    for r in &responses {
        store.append_response(r.clone()).unwrap();
    }
    responses
}

#[tokio::test]
async fn test_recompute_replays_sorted_history() {
    let (state, store, _) = memory_state(Config::default());
    let responses = seed_shuffled(store.as_ref(), "u1", "loops");

    let summary = state.recompute.recompute_all(None).await.unwrap();

    let expected = MasteryUpdateEngine::default().replay(&key("u1", "loops", 1), &responses);
    assert_eq!(summary.records_updated, 1);
    assert_eq!(summary.users_processed, 1);
    assert_eq!(summary.users_failed, 0);
    assert_eq!(store.get_mastery(&key("u1", "loops", 1)).unwrap(), expected);
    assert_eq!(summary.preview, vec![expected]);
}

#[tokio::test]
async fn test_recompute_is_idempotent() {
    let (state, store, _) = memory_state(Config::default());
    seed_shuffled(store.as_ref(), "u1", "loops");
    seed_shuffled(store.as_ref(), "u2", "graphs");

    state.recompute.recompute_all(None).await.unwrap();
    let first = store.all_masteries();
    state.recompute.recompute_all(None).await.unwrap();
    assert_eq!(store.all_masteries(), first);
}

#[tokio::test]
async fn test_preview_is_bounded() {
    let (state, store, _) = memory_state(Config::default());
    for topic in 0..25 {
        store
            .append_response(response("u1", &format!("t{topic:02}"), topic).build())
            .unwrap();
    }

    let summary = state.recompute.recompute_all(None).await.unwrap();
    assert_eq!(summary.records_updated, 25);
    assert_eq!(summary.preview.len(), 20);
    assert_eq!(summary.preview[0].key.topic_id, "t00");
    assert_eq!(summary.preview[19].key.topic_id, "t19");
}

#[tokio::test]
async fn test_scope_limits_users() {
    let (state, store, _) = memory_state(Config::default());
    seed_shuffled(store.as_ref(), "u1", "loops");
    seed_shuffled(store.as_ref(), "u2", "loops");

    let summary = state.recompute.recompute_all(Some("u2")).await.unwrap();
    assert_eq!(summary.users_processed, 1);
    assert!(store.get_mastery(&key("u1", "loops", 1)).is_err());
    assert!(store.get_mastery(&key("u2", "loops", 1)).is_ok());
}

#[tokio::test]
async fn test_partial_failure_continues_batch() {
    let store = Arc::new(FaultyStore::default());
    let state = AppState::new(Config::default(), store.clone(), Arc::new(MemoryGraph::default()));
    seed_shuffled(store.as_ref(), "u1", "loops");
    seed_shuffled(store.as_ref(), "u2", "loops");
    seed_shuffled(store.as_ref(), "u3", "loops");
    seed_shuffled(store.as_ref(), "u3", "broken");
    store.fail_user("u2");
    store.fail_topic_writes("broken");

    let summary = state.recompute.recompute_all(None).await.unwrap();

    assert_eq!(summary.users_processed, 2);
    assert_eq!(summary.users_failed, 1);
    assert_eq!(summary.keys_failed, 1);
    assert_eq!(summary.records_updated, 2);
    assert!(store.get_mastery(&key("u1", "loops", 1)).is_ok());
    assert!(store.get_mastery(&key("u3", "loops", 1)).is_ok());
    assert!(store.get_mastery(&key("u2", "loops", 1)).is_err());
    assert!(store.get_mastery(&key("u3", "broken", 1)).is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_overlapping_batch_rejected() {
    let (state, store, _) = memory_state(Config::default());
    seed_shuffled(store.as_ref(), "u1", "loops");
    seed_shuffled(store.as_ref(), "u2", "loops");

    // park the u1 batch on its key lock
    let held = state.locks.lock(&key("u1", "loops", 1)).await;
    let background = {
        let state = state.clone();
        tokio::spawn(async move { state.recompute.recompute_all(Some("u1")).await })
    };
    tokio::time::timeout(Duration::from_secs(5), async {
        while !state.recompute.is_running() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .unwrap();

    assert!(matches!(
        state.recompute.recompute_all(Some("u1")).await,
        Err(EngineError::BatchInFlight(scope)) if scope == "u1"
    ));
    assert!(matches!(
        state.recompute.recompute_all(None).await,
        Err(EngineError::BatchInFlight(_))
    ));
    let other = state.recompute.recompute_all(Some("u2")).await.unwrap();
    assert_eq!(other.users_processed, 1);

    drop(held);
    let summary = background.await.unwrap().unwrap();
    assert_eq!(summary.records_updated, 1);
    assert!(!state.recompute.is_running());

    // scope released, a new full run is accepted
    assert!(state.recompute.recompute_all(None).await.is_ok());
}

#[tokio::test]
async fn test_recompute_agrees_with_live_processing() {
    let (state, store, _) = memory_state(Config::default());
    for minute in 0..6 {
        state
            .responses
            .process(
                response("u1", "loops", minute)
                    .correct(minute != 3)
                    .components(0.4, if minute == 3 { -0.6 } else { 0.8 })
                    .build(),
            )
            .await
            .unwrap();
    }
    let live = store.get_mastery(&key("u1", "loops", 1)).unwrap();
    state.recompute.recompute_all(None).await.unwrap();
    assert_eq!(store.get_mastery(&key("u1", "loops", 1)).unwrap(), live);
}
