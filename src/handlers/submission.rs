// src/handlers/submission.rs

use std::collections::HashMap;

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{execution::ensure_code_size, ok},
    models::{
        attempt::TestAttempt,
        submission::{
            AttemptResults, FlagQuestionRequest, QuestionResult, SubmitCodeRequest,
            SubmitMcqRequest,
        },
        user::Session,
    },
    services::{attempt, gateway::ExecutionGateway},
    state::AppState,
};

/// Records (or overwrites) the answer to an MCQ of the caller's open attempt.
pub async fn submit_mcq(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SubmitMcqRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let submission =
        attempt::record_mcq(state.store.as_ref(), session.user_id, &payload, Utc::now()).await?;
    Ok(ok(submission))
}

/// Marks or unmarks a question of the caller's open attempt for review.
pub async fn flag_question(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<FlagQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let flags =
        attempt::flag_question(state.store.as_ref(), session.user_id, &payload, Utc::now()).await?;
    Ok(ok(flags))
}

/// Saves code for a coding question without running it.
pub async fn save_code(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SubmitCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_code_size(&state.config.execution, &payload.code)?;

    let submission =
        attempt::save_code(state.store.as_ref(), session.user_id, &payload, Utc::now()).await?;
    Ok(ok(submission))
}

/// Grades code against every test case of the question and stores the score.
///
/// Hidden cases come back as `{ passed, points, isHidden }` only.
pub async fn submit_code(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Json(payload): Json<SubmitCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_code_size(&state.config.execution, &payload.code)?;

    let gateway = ExecutionGateway::from_state(&state);
    let (submission, grade) = attempt::submit_code(
        state.store.as_ref(),
        &gateway,
        session.user_id,
        &payload,
        Utc::now(),
    )
    .await?;

    Ok(ok(json!({
        "submission": submission,
        "results": grade.masked(),
    })))
}

/// Lists the caller's answers for one of their attempts.
pub async fn attempt_submissions(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = own_attempt(&state, &session, attempt_id).await?;
    let submissions = state.store.submissions_for(attempt.id).await?;
    Ok(ok(submissions))
}

/// Results page of a finished attempt, subject to the test's `showResults`.
pub async fn attempt_results(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(attempt_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = own_attempt(&state, &session, attempt_id).await?;
    if !attempt.status.has_results() {
        return Err(AppError::NotFound("Results not found".to_string()));
    }

    let test = state
        .store
        .find_test_by_id(attempt.test_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Results not found".to_string()))?;

    if !test.show_results {
        return Ok(ok(json!({
            "attemptId": attempt.id,
            "testId": test.id,
            "testTitle": test.title,
            "status": attempt.status,
            "message": "Results are not available for this test",
        })));
    }

    let bound: HashMap<Uuid, _> = state
        .store
        .test_questions(test.id)
        .await?
        .into_iter()
        .map(|b| (b.question.id, b))
        .collect();

    let question_results: Vec<QuestionResult> = state
        .store
        .submissions_for(attempt.id)
        .await?
        .into_iter()
        .filter_map(|s| {
            let b = bound.get(&s.question_id)?;
            Some(QuestionResult {
                question_id: s.question_id,
                question_title: b.question.title.clone(),
                kind: b.question.kind(),
                score: s.score.unwrap_or(0.0),
                max_score: b.marks(),
                is_correct: s.is_correct.unwrap_or(false),
                graded: s.is_graded(),
            })
        })
        .collect();

    let results = AttemptResults {
        attempt_id: attempt.id,
        test_id: test.id,
        test_title: test.title,
        total_score: attempt.total_score.unwrap_or(0.0),
        max_score: test.total_marks,
        percentage: attempt.percentage.unwrap_or(0.0),
        passed: attempt.passed.unwrap_or(false),
        started_at: attempt.started_at,
        submitted_at: attempt.submitted_at,
        question_results,
    };
    Ok(ok(serde_json::to_value(results)?))
}

async fn own_attempt(
    state: &AppState,
    session: &Session,
    attempt_id: Uuid,
) -> Result<TestAttempt, AppError> {
    state
        .store
        .find_attempt(attempt_id)
        .await?
        .filter(|a| a.user_id == session.user_id)
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))
}
