// src/routes.rs

use std::sync::Arc;

use axum::{
    Router,
    http::{Method, Request},
    middleware,
    routing::{delete, get, post},
};
use tower_governor::{
    GovernorError, GovernorLayer, governor::GovernorConfigBuilder, key_extractor::KeyExtractor,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::{
    handlers::{attempt, auth, execution, question, submission, test},
    services::session_lock::test_session_lock_middleware,
    state::AppState,
    utils::jwt::{Claims, auth_middleware},
};

/// Rate-limit key for sandbox calls: the authenticated user.
///
/// Reads the `Claims` placed by `auth_middleware`, so the governor layer must
/// sit inside the auth layer.
#[derive(Debug, Clone, Copy)]
pub struct UserKeyExtractor;

impl KeyExtractor for UserKeyExtractor {
    type Key = Uuid;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        req.extensions()
            .get::<Claims>()
            .map(Claims::user_id)
            .ok_or(GovernorError::UnableToExtractKey)
    }
}

/// Assembles the main application router.
///
/// * Public: register, login, language table, sandbox health.
/// * Authenticated: everything else, with the device lock on the
///   test-taking routes and per-user rate limiting on code execution.
/// * Global middleware: Trace, CORS.
pub fn create_router(state: AppState) -> Router {
    let origins = [
        "http://localhost:3000".parse().expect("valid origin"),
        "http://127.0.0.1:3000".parse().expect("valid origin"),
    ];

    let cors = CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
        ]);

    let rate = u64::from(state.config.execution.rate_per_minute.max(1));
    let governor_conf = GovernorConfigBuilder::default()
        .key_extractor(UserKeyExtractor)
        .per_millisecond((60_000 / rate).max(1))
        .burst_size(u32::try_from(rate).unwrap_or(u32::MAX))
        .finish()
        .expect("execution rate limit must be positive");
    let governor_conf = Arc::new(governor_conf);

    let auth_layer = middleware::from_fn_with_state(state.clone(), auth_middleware);
    let lock_layer = middleware::from_fn_with_state(state.clone(), test_session_lock_middleware);

    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .merge(
            Router::new()
                .route("/logout", post(auth::logout))
                .route("/test-session", get(auth::test_session))
                .route_layer(auth_layer.clone()),
        );

    let question_routes = Router::new()
        .route(
            "/",
            get(question::list_questions).post(question::create_question),
        )
        .route(
            "/{id}",
            get(question::get_question).delete(question::delete_question),
        )
        .route_layer(auth_layer.clone());

    // Test taking: auth first, then the device lock.
    let taking_routes = Router::new()
        .route("/{id}", get(test::get_test))
        .route("/{id}/start", post(test::start_test))
        .route("/{id}/submit", post(test::submit_test))
        .route_layer(lock_layer.clone())
        .route_layer(auth_layer.clone());

    let test_routes = Router::new()
        .route("/", get(test::list_tests).post(test::create_test))
        .route("/{id}/questions", post(test::add_question))
        .route("/{id}/publish", post(test::publish_test))
        .route_layer(auth_layer.clone())
        .merge(taking_routes);

    let submission_routes = Router::new()
        .merge(
            Router::new()
                .route("/mcq", post(submission::submit_mcq))
                .route("/flag", post(submission::flag_question))
                .route("/code", post(submission::save_code))
                .route("/code/submit", post(submission::submit_code))
                .route_layer(lock_layer),
        )
        .route("/attempt/{id}", get(submission::attempt_submissions))
        .route("/results/{id}", get(submission::attempt_results))
        .route_layer(auth_layer.clone());

    let attempt_routes = Router::new()
        .route("/{id}/terminate", post(attempt::terminate_attempt))
        .route("/{id}/grade", post(attempt::grade_attempt))
        .route_layer(auth_layer.clone());

    let execution_routes = Router::new()
        .route("/languages", get(execution::list_languages))
        .route("/health", get(execution::health))
        .merge(
            Router::new()
                .route("/", post(execution::execute))
                .route("/validate", post(execution::validate_code))
                .route_layer(GovernorLayer::new(governor_conf))
                .route_layer(auth_layer),
        );

    Router::new()
        .route("/health", get(|| async { "OK" }))
        .nest("/api/auth", auth_routes)
        .nest("/api/questions", question_routes)
        .nest("/api/tests", test_routes)
        .nest("/api/submissions", submission_routes)
        .nest("/api/attempts", attempt_routes)
        .nest("/api/execute", execution_routes)
        // Global Middleware (applied from outside in)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use std::time::Duration;

    use axum::{body::Body, http::StatusCode};
    use tower::ServiceExt;
    use url::Url;

    use super::*;
    use crate::{config::Config, sandbox::PistonClient, store::MemoryStore};

    fn state() -> AppState {
        let config = Config::from_lookup(|key| match key {
            "DATABASE_URL" => Some("postgres://unused".to_string()),
            "JWT_SECRET" => Some("secret".to_string()),
            _ => None,
        });
        let sandbox =
            PistonClient::new(Url::parse("http://127.0.0.1:9").unwrap(), Duration::from_secs(1))
                .unwrap();

        AppState {
            store: Arc::new(MemoryStore::new()),
            sandbox: Arc::new(sandbox),
            config,
        }
    }

    #[tokio::test]
    async fn liveness_check_is_public() {
        let response = create_router(state())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn protected_routes_require_a_bearer_token() {
        for uri in ["/api/tests", "/api/questions", "/api/submissions/attempt/00000000-0000-0000-0000-000000000000"] {
            let response = create_router(state())
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
        }
    }
}
