// src/handlers/test.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use rand::seq::SliceRandom;
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    handlers::{created, ok, ok_with_message},
    models::{
        attempt::SubmittedAttempt,
        test::{
            AddTestQuestionRequest, CreateTestRequest, Test, TestListParams, TestQuestion,
            TestQuestionView, TestStatus, TestView,
        },
        user::Session,
    },
    services::attempt,
    state::AppState,
    utils::{
        html::clean_optional,
        jwt::Claims,
        rbac::{Action, Resource, require_permission},
    },
};

/// Creates a draft test in the caller's college.
pub async fn create_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<CreateTestRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Create)?;
    payload.validate()?;

    if let (Some(from), Some(until)) = (payload.available_from, payload.available_until) {
        if from >= until {
            return Err(AppError::BadRequest(
                "availableFrom must be before availableUntil".to_string(),
            ));
        }
    }

    let test = Test {
        id: Uuid::new_v4(),
        college_id: claims.college_id,
        creator_id: claims.user_id(),
        title: payload.title.trim().to_string(),
        description: clean_optional(payload.description),
        instructions: clean_optional(payload.instructions),
        duration_minutes: payload.duration,
        total_marks: payload.total_marks.unwrap_or(100),
        passing_score: payload.passing_score.unwrap_or(50.0),
        shuffle_questions: payload.shuffle_questions.unwrap_or(false),
        show_results: payload.show_results.unwrap_or(true),
        enable_proctoring: payload.enable_proctoring.unwrap_or(false),
        full_screen_required: payload.full_screen_required.unwrap_or(true),
        tab_switch_limit: payload.tab_switch_limit.unwrap_or(3),
        status: TestStatus::Draft,
        available_from: payload.available_from,
        available_until: payload.available_until,
        published_at: None,
        created_at: Utc::now(),
    };
    state.store.insert_test(&test).await?;

    tracing::info!(test_id = %test.id, college_id = %test.college_id, "test created");
    Ok(created(test))
}

/// Lists tests of the caller's college. Students only see published ones.
pub async fn list_tests(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Query(mut params): Query<TestListParams>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Read)?;

    if claims.role.is_student() {
        params.status = Some(TestStatus::Published);
    }

    let tests = state.store.list_tests(claims.college_id, &params).await?;
    Ok(ok(tests))
}

/// Returns a test with its questions in student view.
///
/// Questions come in their defined order, or shuffled per request when the
/// test asks for it and the caller is a student.
pub async fn get_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Read)?;

    let test = state
        .store
        .find_test(claims.college_id, id)
        .await?
        .filter(|t| !claims.role.is_student() || t.status == TestStatus::Published)
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;

    let mut questions: Vec<TestQuestionView> = state
        .store
        .test_questions(test.id)
        .await?
        .iter()
        .map(|bound| TestQuestionView {
            order: bound.binding.order,
            marks: bound.marks(),
            question: bound.question.public(),
        })
        .collect();

    if test.shuffle_questions && claims.role.is_student() {
        questions.shuffle(&mut rand::rng());
    }

    Ok(ok(TestView { test, questions }))
}

/// Binds a bank question into a test. Both must belong to the caller's college.
pub async fn add_question(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(test_id): Path<Uuid>,
    Json(payload): Json<AddTestQuestionRequest>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Update)?;
    payload.validate()?;

    let test = state
        .store
        .find_test(claims.college_id, test_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;
    let question = state
        .store
        .find_question(claims.college_id, payload.question_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Question not found".to_string()))?;

    let order = match payload.order {
        Some(order) => order,
        None => i32::try_from(state.store.test_questions(test.id).await?.len()).unwrap_or(i32::MAX),
    };

    let binding = TestQuestion {
        test_id: test.id,
        question_id: question.id,
        order,
        override_marks: payload.override_marks,
    };
    state.store.bind_question(&binding).await?;

    Ok(created(binding))
}

/// Makes a draft test visible to students. A test without questions cannot
/// be published.
pub async fn publish_test(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    require_permission(&claims, Resource::Test, Action::Publish)?;

    let test = state
        .store
        .find_test(claims.college_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;

    if state.store.test_questions(test.id).await?.is_empty() {
        return Err(AppError::BadRequest(
            "Cannot publish test without questions".to_string(),
        ));
    }

    let published = state
        .store
        .publish_test(test.id, Utc::now())
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;

    tracing::info!(test_id = %published.id, "test published");
    Ok(ok(published))
}

/// Starts the caller's attempt, or resumes the open one.
///
/// 201 for a new attempt, 200 when resuming. Either way this session now
/// holds the device lock and every other session of the student is expired.
pub async fn start_test(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let started = attempt::start(state.store.as_ref(), id, &session, Utc::now()).await?;

    if started.resumed {
        Ok(ok_with_message(started.attempt, "Resuming existing attempt").into_response())
    } else {
        Ok((StatusCode::CREATED, ok(started.attempt)).into_response())
    }
}

/// Submits the caller's attempt for final scoring. Irreversible.
pub async fn submit_test(
    State(state): State<AppState>,
    Extension(session): Extension<Session>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let (attempt, test) =
        attempt::submit(state.store.as_ref(), id, session.user_id, Utc::now()).await?;

    Ok(ok(SubmittedAttempt {
        attempt,
        show_results: test.show_results,
    }))
}
