// src/utils/jwt.rs

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{error::AppError, models::user::Session, state::AppState, utils::rbac::Role};

/// JWT Claims structure.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Claims {
    /// Subject - the user id.
    pub sub: Uuid,
    /// Session row backing this token.
    pub sid: Uuid,
    /// Active college (tenant).
    pub college_id: Uuid,
    pub role: Role,
    /// Expiration time as Unix timestamp.
    pub exp: usize,
}

impl Claims {
    pub fn user_id(&self) -> Uuid {
        self.sub
    }
}

/// Signs a token for an already persisted session.
pub fn sign_jwt(session: &Session, secret: &str) -> Result<String, AppError> {
    let claims = Claims {
        sub: session.user_id,
        sid: session.id,
        college_id: session.college_id,
        role: session.role,
        exp: usize::try_from(session.expires_at.timestamp())
            .map_err(|e| AppError::InternalServerError(e.to_string()))?,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(e.to_string()))
}

/// Verifies and decodes a JWT string.
///
/// Returns the `Claims` if valid, otherwise returns an `AppError`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::AuthError("Invalid token".to_string()))?;

    Ok(token_data.claims)
}

/// Axum Middleware: Authentication.
///
/// Validates the 'Authorization: Bearer <token>' header, then loads the
/// session row. A force-expired session is rejected even though its token
/// still verifies. Injects `Claims` and `Session` into the request.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::AuthError("Missing bearer token".to_string()))?;

    let claims = verify_jwt(token, &state.config.jwt_secret)?;

    let session = state
        .store
        .find_session(claims.sid)
        .await?
        .filter(|s| s.user_id == claims.sub && !s.is_expired(Utc::now()))
        .ok_or_else(|| AppError::AuthError("Session expired".to_string()))?;

    req.extensions_mut().insert(claims);
    req.extensions_mut().insert(session);
    Ok(next.run(req).await)
}
