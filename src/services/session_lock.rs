// src/services/session_lock.rs
//
// Single-device lock: while an attempt is in progress exactly one session of
// the student may drive it. Other sessions are force-expired at lock time and
// any fresh login is turned away with TEST_LOCKED_ANOTHER_DEVICE.

use axum::{
    body::Body,
    extract::{Extension, State},
    http::Request,
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{error::AppError, models::user::Session, state::AppState, store::Store};

/// Denies when another live session of the user holds a test lock.
pub async fn check_lock(
    store: &dyn Store,
    user_id: Uuid,
    session_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    match store.find_locked_session(user_id, now).await? {
        Some(locked) if locked.id != session_id => {
            tracing::info!(%user_id, locked_session = %locked.id, "test session locked to another device");
            Err(AppError::TestLocked)
        }
        _ => Ok(()),
    }
}

/// Expires every other session of the user, then binds `session_id` to the attempt.
pub async fn acquire(
    store: &dyn Store,
    user_id: Uuid,
    session_id: Uuid,
    attempt_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    let expired = store.expire_other_sessions(user_id, session_id, now).await?;
    store.set_session_lock(session_id, Some(attempt_id)).await?;

    tracing::info!(%user_id, %attempt_id, expired, "session locked for test");
    Ok(())
}

/// Idempotent.
pub async fn release(store: &dyn Store, session_id: Uuid) -> Result<(), AppError> {
    store.set_session_lock(session_id, None).await?;
    Ok(())
}

/// Releases whichever session holds the lock for `attempt_id`. Used when the
/// attempt is closed by someone other than its owner (sweeper, staff).
pub async fn release_attempt(store: &dyn Store, attempt_id: Uuid) -> Result<(), AppError> {
    let released = store.clear_attempt_locks(attempt_id).await?;
    if released > 0 {
        tracing::debug!(%attempt_id, released, "released test session locks");
    }
    Ok(())
}

/// Axum Middleware: gates every test-taking request on the device lock.
///
/// Must run AFTER `auth_middleware`, which provides the `Session`.
pub async fn test_session_lock_middleware(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    check_lock(state.store.as_ref(), session.user_id, session.id, Utc::now()).await?;
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::{store::MemoryStore, utils::rbac::Role};

    fn session(user_id: Uuid, now: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id,
            college_id: Uuid::new_v4(),
            role: Role::Member,
            expires_at: now + Duration::hours(1),
            is_test_locked: false,
            active_test_attempt_id: None,
            created_at: now,
        }
    }

    #[tokio::test]
    async fn acquire_expires_other_devices_and_denies_them() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let user_id = Uuid::new_v4();
        let laptop = session(user_id, now);
        let phone = session(user_id, now);
        store.create_session(&laptop).await.unwrap();
        store.create_session(&phone).await.unwrap();

        let attempt_id = Uuid::new_v4();
        acquire(&store, user_id, laptop.id, attempt_id, now).await.unwrap();

        let phone_after = store.find_session(phone.id).await.unwrap().unwrap();
        assert!(phone_after.is_expired(now));
        assert!(check_lock(&store, user_id, laptop.id, now).await.is_ok());

        // A fresh login after the lock was taken.
        let tablet = session(user_id, now);
        store.create_session(&tablet).await.unwrap();
        assert!(matches!(
            check_lock(&store, user_id, tablet.id, now).await,
            Err(AppError::TestLocked)
        ));

        release_attempt(&store, attempt_id).await.unwrap();
        assert!(check_lock(&store, user_id, tablet.id, now).await.is_ok());
    }

    #[tokio::test]
    async fn release_is_idempotent() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let s = session(Uuid::new_v4(), now);
        store.create_session(&s).await.unwrap();

        release(&store, s.id).await.unwrap();
        release(&store, s.id).await.unwrap();

        let after = store.find_session(s.id).await.unwrap().unwrap();
        assert!(!after.is_test_locked);
        assert!(after.active_test_attempt_id.is_none());
    }
}
