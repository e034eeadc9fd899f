use std::collections::{BTreeMap, BTreeSet, HashSet};

use parking_lot::RwLock;

use mastery_algo::{MasteryKey, QuestionIrtParameters, Response, ReviewSchedule, TopicMastery};

use super::{RecordStore, ResponseCommit, StoreError};

#[derive(Default)]
struct Tables {
    responses: Vec<Response>,
    response_ids: HashSet<String>,
    masteries: BTreeMap<MasteryKey, TopicMastery>,
    schedules: BTreeMap<(String, String), ReviewSchedule>,
    irt: BTreeMap<String, QuestionIrtParameters>,
}

impl Tables {
    fn check_new_response(&self, response: &Response) -> Result<(), StoreError> {
        if self.response_ids.contains(&response.id) {
            return Err(StoreError::DuplicateResponse(response.id.clone()));
        }
        Ok(())
    }

    fn insert_response(&mut self, response: Response) {
        self.response_ids.insert(response.id.clone());
        self.responses.push(response);
    }
}

/// In-process store. One lock guards all tables so a commit is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn response_count(&self) -> usize {
        self.tables.read().responses.len()
    }

    pub fn mastery_count(&self) -> usize {
        self.tables.read().masteries.len()
    }

    pub fn all_masteries(&self) -> Vec<TopicMastery> {
        self.tables.read().masteries.values().cloned().collect()
    }
}

impl RecordStore for MemoryStore {
    fn append_response(&self, response: Response) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.check_new_response(&response)?;
        tables.insert_response(response);
        Ok(())
    }

    fn responses_for_user(&self, user_id: &str) -> Result<Vec<Response>, StoreError> {
        Ok(self
            .tables
            .read()
            .responses
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect())
    }

    fn responses_for_key(&self, key: &MasteryKey) -> Result<Vec<Response>, StoreError> {
        Ok(self
            .tables
            .read()
            .responses
            .iter()
            .filter(|r| {
                r.user_id == key.user_id
                    && r.topic_id == key.topic_id
                    && r.bloom_level == key.bloom_level
                    && r.chapter_id == key.chapter_id
            })
            .cloned()
            .collect())
    }

    fn responses_for_question(&self, question_id: &str) -> Result<Vec<Response>, StoreError> {
        Ok(self
            .tables
            .read()
            .responses
            .iter()
            .filter(|r| r.question_id == question_id)
            .cloned()
            .collect())
    }

    fn user_ids(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read();
        let users: BTreeSet<&str> = tables.responses.iter().map(|r| r.user_id.as_str()).collect();
        Ok(users.into_iter().map(str::to_string).collect())
    }

    fn question_ids(&self) -> Result<Vec<String>, StoreError> {
        let tables = self.tables.read();
        let questions: BTreeSet<&str> = tables
            .responses
            .iter()
            .map(|r| r.question_id.as_str())
            .collect();
        Ok(questions.into_iter().map(str::to_string).collect())
    }

    fn get_mastery(&self, key: &MasteryKey) -> Result<TopicMastery, StoreError> {
        self.tables
            .read()
            .masteries
            .get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("mastery {key}")))
    }

    fn put_mastery(&self, mastery: TopicMastery) -> Result<(), StoreError> {
        self.tables
            .write()
            .masteries
            .insert(mastery.key.clone(), mastery);
        Ok(())
    }

    fn masteries_for_user(&self, user_id: &str) -> Result<Vec<TopicMastery>, StoreError> {
        Ok(self
            .tables
            .read()
            .masteries
            .values()
            .filter(|m| m.key.user_id == user_id)
            .cloned()
            .collect())
    }

    fn get_review_schedule(&self, user_id: &str, question_id: &str) -> Result<ReviewSchedule, StoreError> {
        self.tables
            .read()
            .schedules
            .get(&(user_id.to_string(), question_id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("review schedule {user_id}/{question_id}")))
    }

    fn put_review_schedule(&self, schedule: ReviewSchedule) -> Result<(), StoreError> {
        let key = (schedule.user_id.clone(), schedule.question_id.clone());
        self.tables.write().schedules.insert(key, schedule);
        Ok(())
    }

    fn get_irt_parameters(&self, question_id: &str) -> Result<QuestionIrtParameters, StoreError> {
        self.tables
            .read()
            .irt
            .get(question_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("irt parameters {question_id}")))
    }

    fn put_irt_parameters(&self, params: QuestionIrtParameters) -> Result<(), StoreError> {
        self.tables
            .write()
            .irt
            .insert(params.question_id.clone(), params);
        Ok(())
    }

    fn commit_response(&self, commit: ResponseCommit) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        tables.check_new_response(&commit.response)?;
        tables.insert_response(commit.response);
        tables
            .masteries
            .insert(commit.mastery.key.clone(), commit.mastery);
        if let Some(schedule) = commit.schedule {
            let key = (schedule.user_id.clone(), schedule.question_id.clone());
            tables.schedules.insert(key, schedule);
        }
        Ok(())
    }
}
