// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    handlers::ok,
    models::attempt::GradeAttemptRequest,
    services::attempt,
    state::AppState,
    utils::{
        jwt::Claims,
        rbac::{Action, Resource, require_permission},
    },
};

/// Proctoring action: ends a student's open attempt as `TERMINATED`.
pub async fn terminate_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Update)?;

    let closed = attempt::terminate(state.store.as_ref(), claims.college_id, id, Utc::now()).await?;
    tracing::warn!(attempt_id = %closed.id, by = %claims.user_id(), "attempt terminated");
    Ok(ok(closed))
}

/// Manual review: moves a submitted attempt to `GRADED`, optionally with a
/// corrected total.
pub async fn grade_attempt(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GradeAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Results, Action::Export)?;

    let graded =
        attempt::grade(state.store.as_ref(), claims.college_id, id, payload.total_score).await?;
    Ok(ok(graded))
}
