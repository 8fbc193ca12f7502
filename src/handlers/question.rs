// src/handlers/question.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{created, ok},
    models::question::{CreateQuestionRequest, Question, QuestionListParams, QuestionSummary},
    state::AppState,
    utils::{
        html::clean_html,
        jwt::Claims,
        rbac::{Action, Resource, has_permission, require_permission},
    },
};

/// Adds a question to the caller's college bank.
///
/// The statement is sanitized before storage; variant rules (option count,
/// at least one correct option, test case ids) are checked while building
/// the body.
pub async fn create_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Question, Action::Create)?;
    payload.validate()?;

    let marks = payload.default_marks();
    let title = payload.title.trim().to_string();
    let content = clean_html(&payload.content);
    let difficulty = payload.difficulty;
    let tags: Vec<String> = payload
        .tags
        .iter()
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect();
    let body = payload.into_body()?;

    let question = Question {
        id: Uuid::new_v4(),
        college_id: claims.college_id,
        creator_id: claims.user_id(),
        title,
        content,
        marks,
        difficulty,
        tags,
        body,
        created_at: Utc::now(),
    };
    state.store.insert_question(&question).await?;

    tracing::info!(question_id = %question.id, kind = ?question.kind(), "question created");
    Ok(created(question))
}

/// Lists the college's questions as compact summaries.
pub async fn list_questions(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<QuestionListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Question, Action::Read)?;

    let questions = state
        .store
        .list_questions(claims.college_id, &params)
        .await?;
    let summaries: Vec<QuestionSummary> = questions.iter().map(QuestionSummary::from).collect();

    Ok(ok(summaries))
}

/// Returns one question.
///
/// Staff get the full record. Everyone else gets the student view, which
/// never carries correct flags, the reference solution or hidden test cases.
pub async fn get_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let question = state
        .store
        .find_question(claims.college_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    if has_permission(claims.role, Resource::Question, Action::Read) {
        Ok(ok(serde_json::to_value(&question)?))
    } else {
        Ok(ok(serde_json::to_value(question.public())?))
    }
}

/// Deletes a question that no test uses.
pub async fn delete_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Question, Action::Delete)?;

    let usage = state.store.question_usage_count(id).await?;
    if usage > 0 {
        return Err(AppError::InUse(format!(
            "Question is used in {} test(s) and cannot be deleted",
            usage
        )));
    }

    if !state.store.delete_question(claims.college_id, id).await? {
        return Err(AppError::NotFound("Question not found".to_string()));
    }

    Ok(ok(json!({ "message": "Question deleted" })))
}
