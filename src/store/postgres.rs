// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, types::Json};
use uuid::Uuid;

use super::{Store, StoreError, StoreResult};
use crate::models::{
    attempt::{AttemptScore, AttemptStatus, TestAttempt},
    execution::ExecutionLog,
    question::{Difficulty, Question, QuestionBody, QuestionKind, QuestionListParams},
    submission::{AnswerWrite, Submission},
    test::{BoundQuestion, Test, TestListParams, TestQuestion},
    user::{College, Session, User},
};

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps a unique constraint failure to `UniqueViolation` with `message`.
fn unique(err: sqlx::Error, message: impl FnOnce() -> String) -> StoreError {
    if err
        .as_database_error()
        .is_some_and(|db| db.is_unique_violation())
    {
        StoreError::UniqueViolation(message())
    } else {
        StoreError::Database(err)
    }
}

/// Row shape of `questions`. The variant payload sits in `body`.
#[derive(FromRow)]
struct QuestionRow {
    id: Uuid,
    college_id: Uuid,
    creator_id: Uuid,
    kind: QuestionKind,
    title: String,
    content: String,
    marks: i32,
    difficulty: Difficulty,
    tags: Vec<String>,
    body: Json<QuestionBody>,
    created_at: DateTime<Utc>,
}

impl TryFrom<QuestionRow> for Question {
    type Error = StoreError;

    fn try_from(row: QuestionRow) -> Result<Self, Self::Error> {
        let question = Question {
            id: row.id,
            college_id: row.college_id,
            creator_id: row.creator_id,
            title: row.title,
            content: row.content,
            marks: row.marks,
            difficulty: row.difficulty,
            tags: row.tags,
            body: row.body.0,
            created_at: row.created_at,
        };
        if question.kind() != row.kind {
            return Err(StoreError::Corrupt(format!(
                "question {} body does not match its type",
                row.id
            )));
        }
        Ok(question)
    }
}

const QUESTION_COLUMNS: &str =
    "id, college_id, creator_id, kind, title, content, marks, difficulty, tags, body, created_at";

const TEST_QUESTION_COLUMNS: &str = "test_id, question_id, position, override_marks";

impl PgStore {
    async fn questions_by_ids(&self, ids: &[Uuid]) -> StoreResult<HashMap<Uuid, Question>> {
        let rows = sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| Question::try_from(row).map(|q| (q.id, q)))
            .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn create_college(&self, college: &College) -> StoreResult<()> {
        sqlx::query("INSERT INTO colleges (id, name, slug, created_at) VALUES ($1, $2, $3, $4)")
            .bind(college.id)
            .bind(&college.name)
            .bind(&college.slug)
            .bind(college.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| unique(e, || format!("College '{}' already exists", college.slug)))?;
        Ok(())
    }

    async fn find_college_by_slug(&self, slug: &str) -> StoreResult<Option<College>> {
        let college = sqlx::query_as::<_, College>(
            "SELECT id, name, slug, created_at FROM colleges WHERE slug = $1",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(college)
    }

    async fn create_user(&self, user: &User) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, college_id, username, password, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(user.college_id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(user.role)
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| unique(e, || format!("Username '{}' already exists", user.username)))?;
        Ok(())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, college_id, username, password, role, created_at FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_session(&self, session: &Session) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO sessions
                (id, user_id, college_id, role, expires_at, is_test_locked, active_test_attempt_id, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(session.id)
        .bind(session.user_id)
        .bind(session.college_id)
        .bind(session.role)
        .bind(session.expires_at)
        .bind(session.is_test_locked)
        .bind(session.active_test_attempt_id)
        .bind(session.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_session(&self, id: Uuid) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(session)
    }

    async fn find_locked_session(
        &self,
        user_id: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Session>> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT * FROM sessions
            WHERE user_id = $1
              AND is_test_locked
              AND active_test_attempt_id IS NOT NULL
              AND expires_at > $2
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn expire_other_sessions(
        &self,
        user_id: Uuid,
        keep: Uuid,
        now: DateTime<Utc>,
    ) -> StoreResult<u64> {
        let result =
            sqlx::query("UPDATE sessions SET expires_at = $3 WHERE user_id = $1 AND id <> $2")
                .bind(user_id)
                .bind(keep)
                .bind(now)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn expire_session(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<()> {
        sqlx::query("UPDATE sessions SET expires_at = $2 WHERE id = $1")
            .bind(id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn set_session_lock(
        &self,
        session_id: Uuid,
        attempt_id: Option<Uuid>,
    ) -> StoreResult<()> {
        sqlx::query(
            "UPDATE sessions SET is_test_locked = $2, active_test_attempt_id = $3 WHERE id = $1",
        )
        .bind(session_id)
        .bind(attempt_id.is_some())
        .bind(attempt_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn clear_attempt_locks(&self, attempt_id: Uuid) -> StoreResult<u64> {
        let result = sqlx::query(
            r#"
            UPDATE sessions SET is_test_locked = FALSE, active_test_attempt_id = NULL
            WHERE active_test_attempt_id = $1
            "#,
        )
        .bind(attempt_id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn insert_question(&self, question: &Question) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO questions ({QUESTION_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(question.id)
        .bind(question.college_id)
        .bind(question.creator_id)
        .bind(question.kind())
        .bind(&question.title)
        .bind(&question.content)
        .bind(question.marks)
        .bind(question.difficulty)
        .bind(&question.tags)
        .bind(Json(&question.body))
        .bind(question.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Question>> {
        sqlx::query_as::<_, QuestionRow>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 AND college_id = $2"
        ))
        .bind(id)
        .bind(college_id)
        .fetch_optional(&self.pool)
        .await?
        .map(Question::try_from)
        .transpose()
    }

    async fn list_questions(
        &self,
        college_id: Uuid,
        params: &QuestionListParams,
    ) -> StoreResult<Vec<Question>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new(format!("SELECT {QUESTION_COLUMNS} FROM questions WHERE college_id = "));
        builder.push_bind(college_id);

        if let Some(kind) = params.kind {
            builder.push(" AND kind = ").push_bind(kind);
        }
        if let Some(difficulty) = params.difficulty {
            builder.push(" AND difficulty = ").push_bind(difficulty);
        }
        if let Some(search) = &params.search {
            builder
                .push(" AND title ILIKE ")
                .push_bind(format!("%{search}%"));
        }
        builder.push(" ORDER BY created_at DESC");

        builder
            .build_query_as::<QuestionRow>()
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Question::try_from)
            .collect()
    }

    async fn delete_question(&self, college_id: Uuid, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM questions WHERE id = $1 AND college_id = $2")
            .bind(id)
            .bind(college_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn question_usage_count(&self, question_id: Uuid) -> StoreResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM test_questions WHERE question_id = $1")
                .bind(question_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn insert_test(&self, test: &Test) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO tests (
                id, college_id, creator_id, title, description, instructions,
                duration_minutes, total_marks, passing_score,
                shuffle_questions, show_results, enable_proctoring, full_screen_required,
                tab_switch_limit, status, available_from, available_until, published_at, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19)
            "#,
        )
        .bind(test.id)
        .bind(test.college_id)
        .bind(test.creator_id)
        .bind(&test.title)
        .bind(&test.description)
        .bind(&test.instructions)
        .bind(test.duration_minutes)
        .bind(test.total_marks)
        .bind(test.passing_score)
        .bind(test.shuffle_questions)
        .bind(test.show_results)
        .bind(test.enable_proctoring)
        .bind(test.full_screen_required)
        .bind(test.tab_switch_limit)
        .bind(test.status)
        .bind(test.available_from)
        .bind(test.available_until)
        .bind(test.published_at)
        .bind(test.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_test(&self, college_id: Uuid, id: Uuid) -> StoreResult<Option<Test>> {
        let test =
            sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1 AND college_id = $2")
                .bind(id)
                .bind(college_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(test)
    }

    async fn find_test_by_id(&self, id: Uuid) -> StoreResult<Option<Test>> {
        let test = sqlx::query_as::<_, Test>("SELECT * FROM tests WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(test)
    }

    async fn list_tests(
        &self,
        college_id: Uuid,
        params: &TestListParams,
    ) -> StoreResult<Vec<Test>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM tests WHERE college_id = ");
        builder.push_bind(college_id);

        if let Some(status) = params.status {
            builder.push(" AND status = ").push_bind(status);
        }
        if let Some(search) = &params.search {
            builder
                .push(" AND title ILIKE ")
                .push_bind(format!("%{search}%"));
        }
        builder.push(" ORDER BY created_at DESC");

        let tests = builder
            .build_query_as::<Test>()
            .fetch_all(&self.pool)
            .await?;
        Ok(tests)
    }

    async fn publish_test(&self, id: Uuid, now: DateTime<Utc>) -> StoreResult<Option<Test>> {
        let test = sqlx::query_as::<_, Test>(
            "UPDATE tests SET status = 'PUBLISHED', published_at = $2 WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(now)
        .fetch_optional(&self.pool)
        .await?;
        Ok(test)
    }

    async fn bind_question(&self, binding: &TestQuestion) -> StoreResult<()> {
        sqlx::query(&format!(
            "INSERT INTO test_questions ({TEST_QUESTION_COLUMNS}) VALUES ($1, $2, $3, $4)"
        ))
        .bind(binding.test_id)
        .bind(binding.question_id)
        .bind(binding.order)
        .bind(binding.override_marks)
        .execute(&self.pool)
        .await
        .map_err(|e| unique(e, || "Question is already part of this test".to_string()))?;
        Ok(())
    }

    async fn test_questions(&self, test_id: Uuid) -> StoreResult<Vec<BoundQuestion>> {
        let bindings = sqlx::query_as::<_, TestQuestion>(&format!(
            "SELECT {TEST_QUESTION_COLUMNS} FROM test_questions WHERE test_id = $1 ORDER BY position"
        ))
        .bind(test_id)
        .fetch_all(&self.pool)
        .await?;

        let ids: Vec<Uuid> = bindings.iter().map(|b| b.question_id).collect();
        let mut questions = self.questions_by_ids(&ids).await?;

        Ok(bindings
            .into_iter()
            .filter_map(|binding| {
                questions
                    .remove(&binding.question_id)
                    .map(|question| BoundQuestion { binding, question })
            })
            .collect())
    }

    async fn test_question(
        &self,
        test_id: Uuid,
        question_id: Uuid,
    ) -> StoreResult<Option<BoundQuestion>> {
        let Some(binding) = sqlx::query_as::<_, TestQuestion>(&format!(
            "SELECT {TEST_QUESTION_COLUMNS} FROM test_questions WHERE test_id = $1 AND question_id = $2"
        ))
        .bind(test_id)
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?
        else {
            return Ok(None);
        };

        let mut questions = self.questions_by_ids(&[question_id]).await?;
        Ok(questions
            .remove(&question_id)
            .map(|question| BoundQuestion { binding, question }))
    }

    async fn insert_attempt(&self, attempt: &TestAttempt) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO test_attempts (id, test_id, user_id, started_at, end_time, status)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.test_id)
        .bind(attempt.user_id)
        .bind(attempt.started_at)
        .bind(attempt.end_time)
        .bind(attempt.status)
        .execute(&self.pool)
        .await
        .map_err(|e| unique(e, || "You have already attempted this test".to_string()))?;
        Ok(())
    }

    async fn find_attempt(&self, id: Uuid) -> StoreResult<Option<TestAttempt>> {
        let attempt = sqlx::query_as::<_, TestAttempt>("SELECT * FROM test_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn find_attempt_for(
        &self,
        test_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<TestAttempt>> {
        let attempt = sqlx::query_as::<_, TestAttempt>(
            "SELECT * FROM test_attempts WHERE test_id = $1 AND user_id = $2",
        )
        .bind(test_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn in_progress_attempts(&self, user_id: Uuid) -> StoreResult<Vec<TestAttempt>> {
        let attempts = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE user_id = $1 AND status = 'IN_PROGRESS'
            ORDER BY started_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn expired_attempts(
        &self,
        now: DateTime<Utc>,
        after: Option<(DateTime<Utc>, Uuid)>,
        limit: i64,
    ) -> StoreResult<Vec<TestAttempt>> {
        let (after_end, after_id) = after.unzip();
        let attempts = sqlx::query_as::<_, TestAttempt>(
            r#"
            SELECT * FROM test_attempts
            WHERE status = 'IN_PROGRESS' AND end_time <= $1
              AND ($2::timestamptz IS NULL OR (end_time, id) > ($2, $3))
            ORDER BY end_time, id
            LIMIT $4
            "#,
        )
        .bind(now)
        .bind(after_end)
        .bind(after_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn close_attempt(
        &self,
        id: Uuid,
        status: AttemptStatus,
        score: &AttemptScore,
        submitted_at: DateTime<Utc>,
    ) -> StoreResult<Option<TestAttempt>> {
        let attempt = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET status = $2, total_score = $3, percentage = $4, passed = $5, submitted_at = $6
            WHERE id = $1 AND status = 'IN_PROGRESS'
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(score.total_score)
        .bind(score.percentage)
        .bind(score.passed)
        .bind(submitted_at)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn mark_graded(
        &self,
        id: Uuid,
        score: &AttemptScore,
    ) -> StoreResult<Option<TestAttempt>> {
        let attempt = sqlx::query_as::<_, TestAttempt>(
            r#"
            UPDATE test_attempts
            SET status = 'GRADED', total_score = $2, percentage = $3, passed = $4
            WHERE id = $1 AND status IN ('SUBMITTED', 'AUTO_SUBMITTED')
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(score.total_score)
        .bind(score.percentage)
        .bind(score.passed)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn put_submission(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        write: &AnswerWrite,
        now: DateTime<Utc>,
    ) -> StoreResult<Submission> {
        let query = match write {
            AnswerWrite::Mcq {
                selected_option,
                is_correct,
                score,
            } => sqlx::query_as::<_, Submission>(
                r#"
                INSERT INTO submissions
                    (id, attempt_id, question_id, selected_option, is_correct, score,
                     graded_at, submitted_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $7)
                ON CONFLICT (attempt_id, question_id) DO UPDATE
                SET selected_option = EXCLUDED.selected_option,
                    is_correct = EXCLUDED.is_correct,
                    score = EXCLUDED.score,
                    graded_at = EXCLUDED.graded_at,
                    updated_at = EXCLUDED.updated_at
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(attempt_id)
            .bind(question_id)
            .bind(selected_option)
            .bind(is_correct)
            .bind(score)
            .bind(now),
            AnswerWrite::CodeDraft { code, language } => sqlx::query_as::<_, Submission>(
                r#"
                INSERT INTO submissions
                    (id, attempt_id, question_id, code, language, submitted_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $6)
                ON CONFLICT (attempt_id, question_id) DO UPDATE
                SET code = EXCLUDED.code,
                    language = EXCLUDED.language,
                    updated_at = EXCLUDED.updated_at
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(attempt_id)
            .bind(question_id)
            .bind(code)
            .bind(language)
            .bind(now),
            AnswerWrite::GradedCode {
                code,
                language,
                execution_results,
                is_correct,
                score,
            } => sqlx::query_as::<_, Submission>(
                r#"
                INSERT INTO submissions
                    (id, attempt_id, question_id, code, language, execution_results,
                     is_correct, score, graded_at, submitted_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9, $9)
                ON CONFLICT (attempt_id, question_id) DO UPDATE
                SET code = EXCLUDED.code,
                    language = EXCLUDED.language,
                    execution_results = EXCLUDED.execution_results,
                    is_correct = EXCLUDED.is_correct,
                    score = EXCLUDED.score,
                    graded_at = EXCLUDED.graded_at,
                    updated_at = EXCLUDED.updated_at
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(attempt_id)
            .bind(question_id)
            .bind(code)
            .bind(language)
            .bind(execution_results)
            .bind(is_correct)
            .bind(score)
            .bind(now),
        };

        Ok(query.fetch_one(&self.pool).await?)
    }

    async fn submissions_for(&self, attempt_id: Uuid) -> StoreResult<Vec<Submission>> {
        let submissions = sqlx::query_as::<_, Submission>(
            "SELECT * FROM submissions WHERE attempt_id = $1 ORDER BY submitted_at",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(submissions)
    }

    async fn set_flag(
        &self,
        attempt_id: Uuid,
        question_id: Uuid,
        flagged: bool,
        now: DateTime<Utc>,
    ) -> StoreResult<()> {
        if flagged {
            sqlx::query(
                r#"
                INSERT INTO attempt_flags (attempt_id, question_id, flagged_at)
                VALUES ($1, $2, $3)
                ON CONFLICT (attempt_id, question_id) DO NOTHING
                "#,
            )
            .bind(attempt_id)
            .bind(question_id)
            .bind(now)
            .execute(&self.pool)
            .await?;
        } else {
            sqlx::query("DELETE FROM attempt_flags WHERE attempt_id = $1 AND question_id = $2")
                .bind(attempt_id)
                .bind(question_id)
                .execute(&self.pool)
                .await?;
        }
        Ok(())
    }

    async fn flagged_questions(&self, attempt_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar(
            "SELECT question_id FROM attempt_flags WHERE attempt_id = $1 ORDER BY flagged_at, question_id",
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(ids)
    }

    async fn insert_execution_log(&self, log: &ExecutionLog) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO execution_logs
                (id, user_id, language, code, stdin, stdout, stderr, exit_code,
                 execution_time, status, error_message, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(log.id)
        .bind(log.user_id)
        .bind(&log.language)
        .bind(&log.code)
        .bind(&log.stdin)
        .bind(&log.stdout)
        .bind(&log.stderr)
        .bind(log.exit_code)
        .bind(log.execution_time)
        .bind(log.status)
        .bind(&log.error_message)
        .bind(log.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn execution_logs_for(&self, user_id: Uuid) -> StoreResult<Vec<ExecutionLog>> {
        let logs = sqlx::query_as::<_, ExecutionLog>(
            "SELECT * FROM execution_logs WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(logs)
    }
}
