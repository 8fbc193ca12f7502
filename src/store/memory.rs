// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    attempt::{AttemptScore, AttemptStatus, TestAttempt},
    execution::ExecutionLog,
    question::{Question, QuestionListParams},
    submission::{AnswerWrite, Submission},
    test::{BoundQuestion, Test, TestListParams, TestQuestion},
    user::{College, Session, User},
};

#[derive(Default)]
struct Tables {
    colleges: HashMap<Uuid, College>,
    users: HashMap<Uuid, User>,
    sessions: HashMap<Uuid, Session>,
    questions: HashMap<Uuid, Question>,
    tests: HashMap<Uuid, Test>,
    test_questions: Vec<TestQuestion>,
    attempts: HashMap<Uuid, TestAttempt>,
    submissions: HashMap<(Uuid, Uuid), Submission>,
    flags: HashMap<(Uuid, Uuid), DateTime<Utc>>,
    execution_logs: Vec<ExecutionLog>,
}

/// In-process store with the same uniqueness rules as the SQL schema.
///
/// A single mutex serialises every operation, so each call is atomic.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn bound(tables: &Tables, binding: &TestQuestion) -> Option<BoundQuestion> {
    tables
        .questions
        .get(&binding.question_id)
        .map(|question| BoundQuestion {
            binding: binding.clone(),
            question: question.clone(),
        })
}

#[async_trait]
impl Store for MemoryStore {
    async fn create_college(&self, college: &College) -> StoreResult<()> {
        let mut t = self.tables();
        if t.colleges.values().any(|c| c.slug == college.slug) {
            return Err(StoreError::UniqueViolation(format!(
                "College '{}' already exists",
                college.slug
            )));
        }
        t.colleges.insert(college.id, college.clone());
        Ok(())
    }

    async fn find_college_by_slug(&self, slug: &str) -> StoreResult<Option<College>> {
        Ok(self.tables().colleges.values().find(|c| c.slug == slug).cloned())
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        let mut t = self.tables();
        if t.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation(format!(
                "Username '{}' already exists",
                user.username
            )));
        }
        t.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        Ok(self
            .tables()
            .users
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        self.tables().sessions.insert(session.id, session.clone());
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        Ok(self.tables().sessions.get(&id).cloned())
    }

    async fn find_locked_session(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        Ok(self
            .tables()
            .sessions
            .values()
            .find(|s| s.user_id == user_id && s.holds_test_lock(now))
            .cloned())
    }

    async fn expire_other_sessions(
        &self,
        user_id: Uuid,
        keep: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let mut t = self.tables();
        let mut count = 0;
        for s in t
            .sessions
            .values_mut()
            .filter(|s| s.user_id == user_id && s.id != keep)
        {
            s.expires_at = now;
            count += 1;
        }
        Ok(count)
    }

    async fn expire_session(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        if let Some(s) = self.tables().sessions.get_mut(&id) {
            s.expires_at = now;
        }
        Ok(())
    }

    async fn set_session_lock(
        &self,
        session_id: Uuid,
        attempt_id: Option<Uuid>,
    ) -> StoreResult<()> {
        if let Some(s) = self.tables().sessions.get_mut(&session_id) {
            s.is_test_locked = attempt_id.is_some();
            s.active_test_attempt_id = attempt_id;
        }
        Ok(())
    }

    async fn clear_attempt_locks(&self, attempt_id: Uuid) -> StoreResult<u64> {
        let mut t = self.tables();
        let mut count = 0;
        for s in t
            .sessions
            .values_mut()
            .filter(|s| s.active_test_attempt_id == Some(attempt_id))
        {
            s.is_test_locked = false;
            s.active_test_attempt_id = None;
            count += 1;
        }
        Ok(count)
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        self.tables().questions.insert(question.id, question.clone());
        Ok(())
    }

    async fn find_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Question>> {
        Ok(self
            .tables()
            .questions
            .get(&id)
            .filter(|q| q.college_id == college_id)
            .cloned())
    }

    async fn list_questions(
        &self,
        college_id: Uuid,
        params: &QuestionListParams,
    ) -> StoreResult<Vec<Question>> {
        let t = self.tables();
        let mut list: Vec<Question> = t
            .questions
            .values()
            .filter(|q| q.college_id == college_id)
            .filter(|q| params.kind.is_none_or(|k| q.kind() == k))
            .filter(|q| params.difficulty.is_none_or(|d| q.difficulty == d))
            .filter(|q| {
                params
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&q.title, s))
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn delete_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let mut t = self.tables();
        let owned = t.questions.get(&id).is_some_and(|q| q.college_id == college_id);
        if owned {
            t.questions.remove(&id);
        }
        Ok(owned)
    }

    async fn question_usage_count(&self, question_id: Uuid) -> StoreResult<i64> {
        let count = self
            .tables()
            .test_questions
            .iter()
            .filter(|tq| tq.question_id == question_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_test(&self, test: &Test) -> StoreResult<()> {
        self.tables().tests.insert(test.id, test.clone());
        Ok(())
    }

    async fn find_test(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Test>> {
        Ok(self
            .tables()
            .tests
            .get(&id)
            .filter(|t| t.college_id == college_id)
            .cloned())
    }

    async fn find_test_by_id(&self, id: Uuid) -> StoreResult<Option<Test>> {
        Ok(self.tables().tests.get(&id).cloned())
    }

    async fn list_tests(
        &self,
        college_id: Uuid,
        params: &TestListParams,
    ) -> StoreResult<Vec<Test>> {
        let t = self.tables();
        let mut list: Vec<Test> = t
            .tests
            .values()
            .filter(|x| x.college_id == college_id)
            .filter(|x| params.status.is_none_or(|s| x.status == s))
            .filter(|x| {
                params
                    .search
                    .as_deref()
                    .is_none_or(|s| contains_ci(&x.title, s))
            })
            .cloned()
            .collect();
        list.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(list)
    }

    async fn publish_test(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Test>> {
        let mut t = self.tables();
        Ok(t.tests.get_mut(&id).map(|test| {
            test.status = crate::models::test::TestStatus::Published;
            test.published_at = Some(now);
            test.clone()
        }))
    }

    async fn bind_question(&self, binding: &TestQuestion) -> StoreResult<()> {
        let mut t = self.tables();
        if t
            .test_questions
            .iter()
            .any(|tq| tq.test_id == binding.test_id && tq.question_id == binding.question_id)
        {
            return Err(StoreError::UniqueViolation(
                "Question is already part of this test".to_string(),
            ));
        }
        t.test_questions.push(binding.clone());
        Ok(())
    }

    async fn test_questions(&self, test_id: Uuid) -> StoreResult<Vec<BoundQuestion>> {
        let t = self.tables();
        let mut bindings: Vec<&TestQuestion> = t
            .test_questions
            .iter()
            .filter(|tq| tq.test_id == test_id)
            .collect();
        bindings.sort_by_key(|tq| tq.order);
        Ok(bindings.into_iter().filter_map(|tq| bound(&t, tq)).collect())
    }

    async fn test_question(
        &self,
        test_id: Uuid,
        question_id: Uuid,
    ) -> StoreResult<Option<BoundQuestion>> {
        let t = self.tables();
        Ok(t.test_questions
            .iter()
            .find(|tq| tq.test_id == test_id && tq.question_id == question_id)
            .and_then(|tq| bound(&t, tq)))
    }

    async fn insert_attempt(&self, attempt: &TestAttempt) -> StoreResult<()> {
        let mut t = self.tables();
        if t
            .attempts
            .values()
            .any(|a| a.test_id == attempt.test_id && a.user_id == attempt.user_id)
        {
            return Err(StoreError::UniqueViolation(
                "You have already attempted this test".to_string(),
            ));
        }
        t.attempts.insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn find_attempt(&self, id: Uuid) -> StoreResult<Option<TestAttempt>> {
        Ok(self.tables().attempts.get(&id).cloned())
    }

    async fn find_attempt_for(
        &self,
        test_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TestAttempt>> {
        Ok(self
            .tables()
            .attempts
            .values()
            .find(|a| a.test_id == test_id && a.user_id == user_id)
            .cloned())
    }

    async fn in_progress_attempts(&self, user_id: Uuid) -> StoreResult<Vec<TestAttempt>> {
        let mut list: Vec<TestAttempt> = self
            .tables()
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.status == AttemptStatus::InProgress)
            .cloned()
            .collect();
        list.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(list)
    }

    async fn expired_attempts(
        &self,
        now: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<TestAttempt>> {
        let mut list: Vec<TestAttempt> = self
            .tables()
            .attempts
            .values()
            .filter(|a| a.status == AttemptStatus::InProgress && a.is_expired(now))
            .filter(|a| after.is_none_or(|cursor| (a.end_time, a.id) > cursor))
            .cloned()
            .collect();
        list.sort_by_key(|a| (a.end_time, a.id));
        list.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(list)
    }

    async fn close_attempt(
        &self,
        id: Uuid,
        status: AttemptStatus,
        score: &AttemptScore,
        submitted_at: DateTime<Utc>,
    ) -> StoreResult<Option<TestAttempt>> {
        let mut t = self.tables();
        Ok(t.attempts
            .get_mut(&id)
            .filter(|a| a.status == AttemptStatus::InProgress)
            .map(|a| {
                a.status = status;
                a.total_score = Some(score.total_score);
                a.percentage = Some(score.percentage);
                a.passed = Some(score.passed);
                a.submitted_at = Some(submitted_at);
                a.clone()
            }))
    }

    async fn mark_graded(
        &self,
        id: Uuid,
        score: &AttemptScore,
    ) -> StoreResult<Option<TestAttempt>> {
        let mut t = self.tables();
        Ok(t.attempts
            .get_mut(&id)
            .filter(|a| a.status.can_transition_to(AttemptStatus::Graded))
            .map(|a| {
                a.status = AttemptStatus::Graded;
                a.total_score = Some(score.total_score);
                a.percentage = Some(score.percentage);
                a.passed = Some(score.passed);
                a.clone()
            }))
    }

    async fn put_submission(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        write: &AnswerWrite,
        now: DateTime<Utc>,
    ) -> StoreResult<Submission> {
        let mut t = self.tables();
        let row = t
            .submissions
            .entry((attempt_id, question_id))
            .or_insert_with(|| Submission {
                id: Uuid::new_v4(),
                attempt_id,
                question_id,
                selected_option: None,
                code: None,
                language: None,
                execution_results: None,
                is_correct: None,
                score: None,
                graded_at: None,
                submitted_at: now,
                updated_at: now,
            });

        match write {
            AnswerWrite::Mcq {
                selected_option,
                is_correct,
                score,
            } => {
                row.selected_option = Some(selected_option.clone());
                row.is_correct = Some(*is_correct);
                row.score = Some(*score);
                row.graded_at = Some(now);
            }
            AnswerWrite::CodeDraft { code, language } => {
                row.code = Some(code.clone());
                row.language = Some(language.clone());
            }
            AnswerWrite::GradedCode {
                code,
                language,
                execution_results,
                is_correct,
                score,
            } => {
                row.code = Some(code.clone());
                row.language = Some(language.clone());
                row.execution_results = Some(execution_results.clone());
                row.is_correct = Some(*is_correct);
                row.score = Some(*score);
                row.graded_at = Some(now);
            }
        }
        row.updated_at = now;

        Ok(row.clone())
    }

    async fn submissions_for(&self, attempt_id: Uuid) -> StoreResult<Vec<Submission>> {
        let mut list: Vec<Submission> = self
            .tables()
            .submissions
            .values()
            .filter(|s| s.attempt_id == attempt_id)
            .cloned()
            .collect();
        list.sort_by(|a, b| a.submitted_at.cmp(&b.submitted_at));
        Ok(list)
    }

    async fn set_flag(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables();
        if flagged {
            tables.flags.entry((attempt_id, question_id)).or_insert(now);
        } else {
            tables.flags.remove(&(attempt_id, question_id));
        }
        Ok(())
    }

    async fn flagged_questions(&self, attempt_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut marks: Vec<(DateTime<Utc>, Uuid)> = self
            .tables()
            .flags
            .iter()
            .filter(|((a, _), _)| *a == attempt_id)
            .map(|((_, q), at)| (*at, *q))
            .collect();
        marks.sort();
        Ok(marks.into_iter().map(|(_, q)| q).collect())
    }

    async fn insert_execution_log(&self, log: &ExecutionLog) -> StoreResult<()> {
        self.tables().execution_logs.push(log.clone());
        Ok(())
    }

    async fn execution_logs_for(&self, user_id: Uuid) -> StoreResult<Vec<ExecutionLog>> {
        Ok(self
            .tables()
            .execution_logs
            .iter()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect())
    }
}
