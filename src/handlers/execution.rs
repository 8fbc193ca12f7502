// src/handlers/execution.rs

use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use serde_json::json;
use validator::Validate;

use crate::{
    config::ExecutionLimits,
    error::AppError,
    handlers::ok,
    models::execution::{RunCodeRequest, ValidateCodeRequest},
    sandbox::languages::{self, SUPPORTED_LANGUAGES},
    services::{
        gateway::{ExecutionGateway, RunRequest},
        grader,
    },
    state::AppState,
    utils::jwt::Claims,
};

pub(crate) fn ensure_code_size(limits: &ExecutionLimits, code: &str) -> Result<(), AppError> {
    if code.len() > limits.max_code_size {
        return Err(AppError::BadRequest(format!(
            "Code exceeds the maximum size of {} bytes",
            limits.max_code_size
        )));
    }
    Ok(())
}

/// Lists the languages the runner accepts, with editor metadata.
pub async fn list_languages() -> impl IntoResponse {
    ok(SUPPORTED_LANGUAGES)
}

/// Runs code once with custom input. Nothing is graded or stored except
/// the audit log.
pub async fn execute(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<RunCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_code_size(&state.config.execution, &payload.code)?;

    if !languages::is_supported(&payload.language) {
        return Err(AppError::UnsupportedLanguage(format!(
            "Language \"{}\" is not supported",
            payload.language
        )));
    }

    let gateway = ExecutionGateway::from_state(&state);
    let outcome = gateway
        .run(RunRequest {
            user_id: claims.user_id(),
            language: payload.language,
            code: payload.code,
            stdin: payload.stdin,
            run_timeout_ms: gateway.limits().default_timeout_ms,
            memory_limit: None,
        })
        .await?;

    Ok(ok(outcome))
}

/// Runs code against a question's test cases without saving anything.
/// Hidden cases are masked exactly as on a graded submission.
pub async fn validate_code(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<ValidateCodeRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    ensure_code_size(&state.config.execution, &payload.code)?;

    let question = state
        .store
        .find_question(claims.college_id, payload.question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Coding question not found".to_string()))?;
    let spec = question
        .coding()
        .ok_or_else(|| AppError::NotFound("Coding question not found".to_string()))?;

    let gateway = ExecutionGateway::from_state(&state);
    let grade = grader::grade_coding(
        &gateway,
        claims.user_id(),
        spec,
        &payload.code,
        &payload.language,
    )
    .await?;

    Ok(ok(grade.masked()))
}

/// Reports whether the sandbox answers, and how many runtimes it offers.
pub async fn health(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let runtimes = state
        .sandbox
        .runtimes()
        .await
        .map_err(|e| AppError::ServiceUnavailable(e.to_string()))?;

    Ok(ok(json!({
        "status": "healthy",
        "runtimeCount": runtimes.len(),
    })))
}
