//! Record persistence capability
//!
//! The engine depends only on [`RecordStore`]. Every write the engine issues
//! for one response goes through [`RecordStore::commit_response`] so a failure
//! leaves no partial state behind.

mod memory;

pub use memory::MemoryStore;

use mastery_algo::{MasteryKey, QuestionIrtParameters, Response, ReviewSchedule, TopicMastery};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("duplicate response id: {0}")]
    DuplicateResponse(String),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Everything persisted for one processed response
#[derive(Debug, Clone)]
pub struct ResponseCommit {
    pub response: Response,
    pub mastery: TopicMastery,
    pub schedule: Option<ReviewSchedule>,
}

pub trait RecordStore: Send + Sync {
    fn append_response(&self, response: Response) -> Result<(), StoreError>;

    /// All responses of one user, any order
    fn responses_for_user(&self, user_id: &str) -> Result<Vec<Response>, StoreError>;

    fn responses_for_key(&self, key: &MasteryKey) -> Result<Vec<Response>, StoreError>;

    fn responses_for_question(&self, question_id: &str) -> Result<Vec<Response>, StoreError>;

    /// Users with at least one response, sorted
    fn user_ids(&self) -> Result<Vec<String>, StoreError>;

    /// Questions with at least one response, sorted
    fn question_ids(&self) -> Result<Vec<String>, StoreError>;

    fn get_mastery(&self, key: &MasteryKey) -> Result<TopicMastery, StoreError>;

    fn put_mastery(&self, mastery: TopicMastery) -> Result<(), StoreError>;

    fn masteries_for_user(&self, user_id: &str) -> Result<Vec<TopicMastery>, StoreError>;

    fn get_review_schedule(&self, user_id: &str, question_id: &str) -> Result<ReviewSchedule, StoreError>;

    fn put_review_schedule(&self, schedule: ReviewSchedule) -> Result<(), StoreError>;

    fn get_irt_parameters(&self, question_id: &str) -> Result<QuestionIrtParameters, StoreError>;

    fn put_irt_parameters(&self, params: QuestionIrtParameters) -> Result<(), StoreError>;

    /// Persist response, mastery and schedule together or not at all
    fn commit_response(&self, commit: ResponseCommit) -> Result<(), StoreError>;
}

/// Map `NotFound` to `None`, keep every other error
pub fn optional<T>(result: Result<T, StoreError>) -> Result<Option<T>, StoreError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(StoreError::NotFound(_)) => Ok(None),
        Err(e) => Err(e),
    }
}
