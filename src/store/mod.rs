// src/store/mod.rs
//
// Repository interface over the relational store. Uniqueness of
// (test_id, user_id) on attempts and (attempt_id, question_id) on
// submissions is the store's job; callers rely on `UniqueViolation`.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    attempt::{AttemptScore, AttemptStatus, TestAttempt},
    execution::ExecutionLog,
    question::{Question, QuestionListParams},
    submission::{AnswerWrite, Submission},
    test::{BoundQuestion, Test, TestListParams, TestQuestion},
    user::{College, Session, User},
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0}")]
    UniqueViolation(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait Store: Send + Sync {
    // Tenancy and identity

    async fn create_college(&self, college: &College) -> StoreResult<()>;
    async fn find_college_by_slug(&self, slug: &str) -> StoreResult<Option<College>>;
    async fn create_user(&self, user: &User) -> StoreResult<()>;
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    // Sessions

    async fn create_session(&self, session: &Session) -> StoreResult<()>;
    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>>;
    /// Any unexpired session of the user holding a test lock.
    async fn find_locked_session(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>>;
    /// Sets `expires_at = now` on every session of the user except `keep`.
    async fn expire_other_sessions(
        &self,
        user_id: Uuid,
        keep: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64>;
    async fn expire_session(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()>;
    /// `Some(attempt)` locks the session to it, `None` clears the lock.
    async fn set_session_lock(&self, session_id: Uuid, attempt_id: Option<Uuid>)
    -> StoreResult<()>;
    /// Clears the lock on whichever sessions are bound to the attempt.
    async fn clear_attempt_locks(&self, attempt_id: Uuid) -> StoreResult<u64>;

    // Question bank

    async fn insert_question(&self, question: &Question) -> StoreResult<()>;
    async fn find_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Question>>;
    async fn list_questions(
        &self,
        college_id: Uuid,
        params: &QuestionListParams,
    ) -> StoreResult<Vec<Question>>;
    async fn delete_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<bool>;
    async fn question_usage_count(&self, question_id: Uuid) -> StoreResult<i64>;

    // Tests

    async fn insert_test(&self, test: &Test) -> StoreResult<()>;
    async fn find_test(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Test>>;
    /// Tenant-agnostic lookup for internal paths (finalisation, sweeper).
    async fn find_test_by_id(&self, id: Uuid) -> StoreResult<Option<Test>>;
    async fn list_tests(&self, college_id: Uuid, params: &TestListParams)
    -> StoreResult<Vec<Test>>;
    async fn publish_test(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Test>>;
    async fn bind_question(&self, binding: &TestQuestion) -> StoreResult<()>;
    /// Questions of a test in their defined order.
    async fn test_questions(&self, test_id: Uuid) -> StoreResult<Vec<BoundQuestion>>;
    async fn test_question(
        &self,
        test_id: Uuid,
        question_id: Uuid,
    ) -> StoreResult<Option<BoundQuestion>>;

    // Attempts

    /// Fails with `UniqueViolation` when the user already has an attempt.
    async fn insert_attempt(&self, attempt: &TestAttempt) -> StoreResult<()>;
    async fn find_attempt(&self, id: Uuid) -> StoreResult<Option<TestAttempt>>;
    async fn find_attempt_for(
        &self,
        test_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TestAttempt>>;
    async fn in_progress_attempts(&self, user_id: Uuid) -> StoreResult<Vec<TestAttempt>>;
    /// Expired open attempts ordered by `(end_time, id)`, strictly after
    /// `after` when given.
    async fn expired_attempts(
        &self,
        now: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<TestAttempt>>;
    /// Compare-and-set out of `IN_PROGRESS`. `None` when the attempt was
    /// no longer open.
    async fn close_attempt(
        &self,
        id: Uuid,
        status: AttemptStatus,
        score: &AttemptScore,
        submitted_at: DateTime<Utc>,
    ) -> StoreResult<Option<TestAttempt>>;
    /// Compare-and-set `SUBMITTED | AUTO_SUBMITTED -> GRADED`.
    async fn mark_graded(&self, id: Uuid, score: &AttemptScore)
    -> StoreResult<Option<TestAttempt>>;

    // Submissions

    /// Upsert on (attempt_id, question_id).
    async fn put_submission(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        write: &AnswerWrite,
        now: DateTime<Utc>,
    ) -> StoreResult<Submission>;
    async fn submissions_for(&self, attempt_id: Uuid) -> StoreResult<Vec<Submission>>;

    // Review flags

    /// Idempotent both ways: flagging twice keeps the first mark.
    async fn set_flag(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<()>;
    async fn flagged_questions(&self, attempt_id: Uuid) -> StoreResult<Vec<Uuid>>;

    // Audit

    async fn insert_execution_log(&self, log: &ExecutionLog) -> StoreResult<()>;
    async fn execution_logs_for(&self, user_id: Uuid) -> StoreResult<Vec<ExecutionLog>>;
}
