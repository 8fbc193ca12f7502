// src/handlers/auth.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::{Duration, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{created, ok},
    models::user::{CreateUserRequest, LoginRequest, Session, User},
    services::session_lock,
    state::AppState,
    utils::{
        hash::{hash_password, verify_password},
        jwt::sign_jwt,
        rbac::Role,
    },
};

/// Registers a new student in an existing college.
///
/// Hashes the password using Argon2 before storing it.
/// Returns 201 Created and the user object (excluding password).
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let college = state
        .store
        .find_college_by_slug(&payload.college_slug)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("College '{}' not found", payload.college_slug)))?;

    let user = User {
        id: Uuid::new_v4(),
        college_id: college.id,
        username: payload.username,
        password: hash_password(&payload.password)?,
        role: Role::Member,
        created_at: Utc::now(),
    };
    state.store.create_user(&user).await?;

    tracing::info!(user_id = %user.id, college = %college.slug, "user registered");
    Ok(created(user))
}

/// Authenticates a user, opens a session row and returns a JWT bound to it.
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let user = state
        .store
        .find_user_by_username(&payload.username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(&payload.password, &user.password)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }

    let now = Utc::now();
    let lifetime = i64::try_from(state.config.jwt_expiration).unwrap_or(i64::MAX / 1000);
    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        college_id: user.college_id,
        role: user.role,
        expires_at: now + Duration::seconds(lifetime),
        is_test_locked: false,
        active_test_attempt_id: None,
        created_at: now,
    };
    state.store.create_session(&session).await?;

    let token = sign_jwt(&session, &state.config.jwt_secret)?;

    Ok(ok(json!({
        "token": token,
        "type": "Bearer",
        "expiresAt": session.expires_at,
        "user": user,
    })))
}

/// Ends the caller's session and drops any test lock it held. Its token
/// stops working immediately.
pub async fn logout(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    session_lock::release(state.store.as_ref(), session.id).await?;
    state.store.expire_session(session.id, Utc::now()).await?;
    Ok(ok(json!({ "message": "Logged out" })))
}

/// Reports whether the caller currently holds a test lock, and for which attempt.
pub async fn test_session(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
) -> Result<impl IntoResponse, AppError> {
    let now = Utc::now();
    let locked = state
        .store
        .find_locked_session(session.user_id, now)
        .await?
        .and_then(|s| s.active_test_attempt_id);

    let Some(attempt_id) = locked else {
        return Ok(ok(json!({ "hasActiveTest": false })));
    };

    let attempt = state.store.find_attempt(attempt_id).await?;
    let test = match &attempt {
        Some(a) => state.store.find_test_by_id(a.test_id).await?,
        None => None,
    };

    Ok(ok(json!({
        "hasActiveTest": attempt.is_some(),
        "attempt": attempt,
        "test": test.map(|t| json!({ "id": t.id, "title": t.title, "duration": t.duration_minutes })),
    })))
}
