//! IRT batch persistence, calibration metrics and seed loading.

mod common;

use std::io::Write;

use common::{memory_state, response};
use mastery_algo::{BloomLevel, CalibrationLevel, CalibrationMethod};
use mastery_engine::graph::GraphService;
use mastery_engine::seed::{self, SeedError};
use mastery_engine::store::{RecordStore, StoreError};
use mastery_engine::Config;

fn answer_item(store: &dyn RecordStore, question: &str, total: usize, correct: usize, users: usize) {
    for i in 0..total {
        let user = format!("u{}", i % users);
        store
            .append_response(
                response(&user, "loops", i as i64)
                    .id(&format!("{question}-{i}"))
                    .question(question)
                    .correct(i < correct)
                    .build(),
            )
            .unwrap();
    }
}

#[test]
fn test_irt_batch_persists_only_empirical() {
    let (state, store, _) = memory_state(Config::default());
    answer_item(store.as_ref(), "q1", 40, 32, 15);
    answer_item(store.as_ref(), "q2", 12, 6, 12);
    answer_item(store.as_ref(), "q3", 40, 20, 5);

    let summary = state.irt.recalibrate_all().unwrap();
    assert_eq!(summary.calibrated, 1);
    assert_eq!(summary.insufficient, 2);
    assert_eq!(summary.failed, 0);

    let q1 = store.get_irt_parameters("q1").unwrap();
    assert_eq!(q1.calibration_method, CalibrationMethod::Empirical);
    assert!((q1.difficulty + 1.7 * 4f64.ln()).abs() < 1e-9);
    assert_eq!(q1.sample_size, 40);
    assert_eq!(q1.unique_user_count, 15);

    assert!(matches!(store.get_irt_parameters("q2"), Err(StoreError::NotFound(_))));
    assert!(matches!(store.get_irt_parameters("q3"), Err(StoreError::NotFound(_))));
}

#[test]
fn test_effective_parameters_fall_back_to_bloom_defaults() {
    let (state, store, _) = memory_state(Config::default());
    answer_item(store.as_ref(), "q1", 40, 32, 15);
    state.irt.recalibrate_all().unwrap();

    let empirical = state.irt.effective_parameters("q1", BloomLevel::APPLY).unwrap();
    assert!(empirical.is_empirical());

    let fallback = state.irt.effective_parameters("q9", BloomLevel::APPLY).unwrap();
    assert_eq!(fallback.calibration_method, CalibrationMethod::InsufficientData);
    assert_eq!(fallback.question_id, "q9");
    assert_eq!(fallback.difficulty, 0.0);
}

#[test]
fn test_calibrate_single_question_reports_insufficient() {
    let (state, store, _) = memory_state(Config::default());
    answer_item(store.as_ref(), "q1", 29, 20, 15);
    let params = state.irt.calibrate_question("q1").unwrap();
    assert_eq!(params.calibration_method, CalibrationMethod::InsufficientData);
    assert_eq!(params.sample_size, 29);
}

#[test]
fn test_calibration_metrics_from_ordered_history() {
    let (state, store, _) = memory_state(Config::default());
    // stored out of order; metrics must follow answered_at
    for (minute, raw) in [(3, 0.5), (0, -1.0), (2, 0.0), (1, -0.5)] {
        store
            .append_response(response("u1", "loops", minute).raw_calibration(raw).build())
            .unwrap();
    }
    store.append_response(response("u1", "loops", 9).build()).unwrap();
    store
        .append_response(response("u1", "graphs", 4).raw_calibration(1.5).build())
        .unwrap();

    let report = state.calibration.calibration_metrics("u1", Some("loops")).unwrap();
    assert_eq!(report.metrics.count, 4);
    assert_eq!(report.skipped, 1);
    assert!((report.metrics.mean + 0.25).abs() < 1e-10);
    assert!((report.metrics.slope - 0.5).abs() < 1e-10);
    assert!((report.metrics.r_squared - 1.0).abs() < 1e-10);
    assert_eq!(report.status.unwrap().level, CalibrationLevel::Developing);
    assert!((report.priority.unwrap() - 1.75 / 3.0).abs() < 1e-10);
    assert!((report.normalized_mean.unwrap() - 0.4167).abs() < 1e-10);

    let all = state.calibration.calibration_metrics("u1", None).unwrap();
    assert_eq!(all.metrics.count, 5);
}

#[test]
fn test_calibration_metrics_without_signal_has_no_status() {
    let (state, store, _) = memory_state(Config::default());
    let empty = state.calibration.calibration_metrics("u1", None).unwrap();
    assert_eq!(empty.metrics.count, 0);
    assert!(empty.status.is_none());
    assert!(empty.normalized_mean.is_none());
    assert!(empty.priority.is_none());

    store.append_response(response("u1", "loops", 0).build()).unwrap();
    let unsignalled = state.calibration.calibration_metrics("u1", None).unwrap();
    assert_eq!(unsignalled.skipped, 1);
    assert!(unsignalled.status.is_none());
}

const SEED_JSON: &str = r#"{
  "responses": [
    {"id": "r1", "userId": "u1", "topicId": "loops", "questionId": "q1", "bloomLevel": 1,
     "isCorrect": true, "confidence": 4, "latencySecs": 20.0, "answeredAt": "2026-02-02T09:05:00Z"},
    {"userId": "u1", "topicId": "loops", "questionId": "q2", "bloomLevel": 1,
     "isCorrect": false, "confidence": 2, "latencySecs": 50.0, "answeredAt": "2026-02-02T09:00:00Z"},
    {"id": "bad", "userId": "u1", "topicId": "loops", "questionId": "q3", "bloomLevel": 1,
     "isCorrect": true, "confidence": 3, "latencySecs": -4.0, "answeredAt": "2026-02-02T09:10:00Z"},
    {"id": "r1", "userId": "u2", "topicId": "loops", "questionId": "q1", "bloomLevel": 2,
     "isCorrect": true, "confidence": 3, "latencySecs": 30.0, "answeredAt": "2026-02-02T09:00:00Z"}
  ],
  "prerequisites": [
    {"topic": "loops", "prerequisite": "variables"},
    {"topic": "functions", "prerequisite": "variables"}
  ],
  "related": {
    "recursion": {"siblings": ["loops"], "cousins": [], "parents": [], "children": []}
  }
}"#;

#[tokio::test]
async fn test_seed_file_round_trip() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(SEED_JSON.as_bytes()).unwrap();

    let data = seed::load_seed(file.path()).await.unwrap();
    assert_eq!(data.responses.len(), 4);
    assert!(data.responses[1].id.is_empty());

    let (state, store, graph) = memory_state(Config::default());
    let stats = seed::apply_seed(data, store.as_ref(), graph.as_ref()).unwrap();
    assert_eq!(stats.responses_loaded, 2);
    assert_eq!(stats.responses_rejected, 2);
    assert_eq!(stats.edges_loaded, 2);

    let loaded = store.responses_for_user("u1").unwrap();
    assert!(loaded.iter().all(|r| !r.id.is_empty()));

    assert_eq!(graph.related_topics("loops").unwrap().siblings, vec!["functions"]);
    assert_eq!(graph.related_topics("recursion").unwrap().siblings, vec!["loops"]);
    assert_eq!(graph.dependent_count("variables").unwrap(), 2);

    let summary = state.recompute.recompute_all(None).await.unwrap();
    assert_eq!(summary.records_updated, 1);
    // 09:00 wrong, then 09:05 right
    assert!((summary.preview[0].mastery_score - 30.0).abs() < 1e-10);
}

#[tokio::test]
async fn test_seed_errors() {
    let dir = tempfile::tempdir().unwrap();
    let missing = seed::load_seed(&dir.path().join("absent.json")).await;
    assert!(matches!(missing, Err(SeedError::Io(_))));

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(b"{ not json").unwrap();
    assert!(matches!(
        seed::load_seed(file.path()).await,
        Err(SeedError::Parse(_))
    ));
}
