#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use parking_lot::RwLock;

use mastery_algo::{
    BloomLevel, Confidence, MasteryKey, QuestionIrtParameters, Response, ReviewSchedule,
    RewardComponents, TopicMastery,
};
use mastery_engine::graph::MemoryGraph;
use mastery_engine::store::{MemoryStore, RecordStore, ResponseCommit, StoreError};
use mastery_engine::{AppState, Config};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 2, 9, 0, 0).unwrap()
}

pub struct ResponseBuilder {
    response: Response,
}

impl ResponseBuilder {
    pub fn new(user: &str, topic: &str, minute: i64) -> Self {
        Self {
            response: Response {
                id: format!("{user}-{topic}-{minute}"),
                user_id: user.into(),
                topic_id: topic.into(),
                question_id: format!("{topic}-q{minute}"),
                chapter_id: None,
                bloom_level: BloomLevel::REMEMBER,
                is_correct: true,
                confidence: Confidence::new(3).unwrap(),
                latency_secs: 45.0,
                reward_components: None,
                raw_calibration: None,
                answered_at: base_time() + Duration::minutes(minute),
            },
        }
    }

    pub fn id(mut self, id: &str) -> Self {
        self.response.id = id.into();
        self
    }

    pub fn question(mut self, question: &str) -> Self {
        self.response.question_id = question.into();
        self
    }

    pub fn level(mut self, level: u8) -> Self {
        self.response.bloom_level = BloomLevel::new(level).unwrap();
        self
    }

    pub fn correct(mut self, correct: bool) -> Self {
        self.response.is_correct = correct;
        self
    }

    pub fn confidence(mut self, confidence: u8) -> Self {
        self.response.confidence = Confidence::new(confidence).unwrap();
        self
    }

    pub fn latency(mut self, secs: f64) -> Self {
        self.response.latency_secs = secs;
        self
    }

    pub fn components(mut self, calibration: f64, recognition: f64) -> Self {
        self.response.reward_components = Some(RewardComponents {
            calibration,
            recognition,
        });
        self
    }

    pub fn raw_calibration(mut self, raw: f64) -> Self {
        self.response.raw_calibration = Some(raw);
        self
    }

    pub fn build(self) -> Response {
        self.response
    }
}

pub fn response(user: &str, topic: &str, minute: i64) -> ResponseBuilder {
    ResponseBuilder::new(user, topic, minute)
}

pub fn key(user: &str, topic: &str, level: u8) -> MasteryKey {
    MasteryKey {
        user_id: user.into(),
        topic_id: topic.into(),
        bloom_level: BloomLevel::new(level).unwrap(),
        chapter_id: None,
    }
}

pub fn memory_state(config: Config) -> (AppState, Arc<MemoryStore>, Arc<MemoryGraph>) {
    let store = Arc::new(MemoryStore::new());
    let graph = Arc::new(MemoryGraph::default());
    let state = AppState::new(config, store.clone(), graph.clone());
    (state, store, graph)
}

/// Memory store with switchable faults
#[derive(Default)]
pub struct FaultyStore {
    pub inner: MemoryStore,
    pub failing_users: RwLock<HashSet<String>>,
    pub failing_topics: RwLock<HashSet<String>>,
    pub fail_commits: AtomicBool,
    pub fail_mastery_reads: AtomicBool,
}

impl FaultyStore {
    pub fn fail_user(&self, user: &str) {
        self.failing_users.write().insert(user.to_string());
    }

    pub fn fail_topic_writes(&self, topic: &str) {
        self.failing_topics.write().insert(topic.to_string());
    }

    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::Relaxed);
    }

    /// Fails per-user mastery listings; single-key reads still work
    pub fn set_fail_mastery_reads(&self, fail: bool) {
        self.fail_mastery_reads.store(fail, Ordering::Relaxed);
    }
}

impl RecordStore for FaultyStore {
    fn append_response(&self, response: Response) -> Result<(), StoreError> {
        self.inner.append_response(response)
    }

    fn responses_for_user(&self, user_id: &str) -> Result<Vec<Response>, StoreError> {
        if self.failing_users.read().contains(user_id) {
            return Err(StoreError::Unavailable(format!("user {user_id}")));
        }
        self.inner.responses_for_user(user_id)
    }

    fn responses_for_key(&self, key: &MasteryKey) -> Result<Vec<Response>, StoreError> {
        self.inner.responses_for_key(key)
    }

    fn responses_for_question(&self, question_id: &str) -> Result<Vec<Response>, StoreError> {
        self.inner.responses_for_question(question_id)
    }

    fn user_ids(&self) -> Result<Vec<String>, StoreError> {
        self.inner.user_ids()
    }

    fn question_ids(&self) -> Result<Vec<String>, StoreError> {
        self.inner.question_ids()
    }

    fn get_mastery(&self, key: &MasteryKey) -> Result<TopicMastery, StoreError> {
        self.inner.get_mastery(key)
    }

    fn put_mastery(&self, mastery: TopicMastery) -> Result<(), StoreError> {
        if self.failing_topics.read().contains(&mastery.key.topic_id) {
            return Err(StoreError::Unavailable(format!("topic {}", mastery.key.topic_id)));
        }
        self.inner.put_mastery(mastery)
    }

    fn masteries_for_user(&self, user_id: &str) -> Result<Vec<TopicMastery>, StoreError> {
        if self.fail_mastery_reads.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable(format!("masteries for {user_id}")));
        }
        self.inner.masteries_for_user(user_id)
    }

    fn get_review_schedule(&self, user_id: &str, question_id: &str) -> Result<ReviewSchedule, StoreError> {
        self.inner.get_review_schedule(user_id, question_id)
    }

    fn put_review_schedule(&self, schedule: ReviewSchedule) -> Result<(), StoreError> {
        self.inner.put_review_schedule(schedule)
    }

    fn get_irt_parameters(&self, question_id: &str) -> Result<QuestionIrtParameters, StoreError> {
        self.inner.get_irt_parameters(question_id)
    }

    fn put_irt_parameters(&self, params: QuestionIrtParameters) -> Result<(), StoreError> {
        self.inner.put_irt_parameters(params)
    }

    fn commit_response(&self, commit: ResponseCommit) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::Relaxed) {
            return Err(StoreError::Unavailable("commit".into()));
        }
        self.inner.commit_response(commit)
    }
}
