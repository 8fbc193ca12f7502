// src/services/attempt.rs
//
// Attempt lifecycle. Every transition out of IN_PROGRESS goes through
// `finalize`, which scores the attempt and closes it with a compare-and-set,
// so a submit racing the sweeper closes the attempt exactly once.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        attempt::{AttemptScore, AttemptStatus, TestAttempt},
        question::QuestionKind,
        submission::{
            AnswerWrite, FlagQuestionRequest, ReviewFlags, Submission, SubmitCodeRequest,
            SubmitMcqRequest,
        },
        test::{BoundQuestion, Test},
        user::Session,
    },
    services::{
        gateway::ExecutionGateway,
        grader::{self, GradeResult},
        scoring, session_lock,
    },
    store::Store,
};

/// Result of `start`: the attempt and whether an open one was resumed.
#[derive(Debug)]
pub struct Started {
    pub attempt: TestAttempt,
    pub resumed: bool,
}

/// Starts (or resumes) the caller's attempt and locks their session to it.
pub async fn start(
    store: &dyn Store,
    test_id: Uuid,
    session: &Session,
    now: DateTime<Utc>,
) -> Result<Started, AppError> {
    session_lock::check_lock(store, session.user_id, session.id, now).await?;

    let test = store
        .find_test(session.college_id, test_id)
        .await?
        .filter(|t| t.is_open_at(now))
        .ok_or_else(|| AppError::NotFound("Test not found or not available".to_string()))?;

    ensure_no_other_open_attempt(store, session.user_id, test.id, now).await?;

    if let Some(existing) = store.find_attempt_for(test.id, session.user_id).await? {
        if existing.status.is_terminal() {
            return Err(AppError::Conflict(
                "You have already attempted this test".to_string(),
            ));
        }
        if existing.is_expired(now) {
            finalize(store, &existing, AttemptStatus::AutoSubmitted, now).await?;
            return Err(AppError::Conflict(
                "You have already attempted this test".to_string(),
            ));
        }

        session_lock::acquire(store, session.user_id, session.id, existing.id, now).await?;
        tracing::info!(attempt_id = %existing.id, "resuming attempt");
        return Ok(Started {
            attempt: existing,
            resumed: true,
        });
    }

    let attempt = TestAttempt::begin(test.id, session.user_id, test.duration_minutes, now);
    store.insert_attempt(&attempt).await?;
    session_lock::acquire(store, session.user_id, session.id, attempt.id, now).await?;

    tracing::info!(attempt_id = %attempt.id, %test_id, user_id = %session.user_id, "attempt started");
    Ok(Started {
        attempt,
        resumed: false,
    })
}

/// A student drives one attempt at a time: the device lock binds a session
/// to a single attempt. Open attempts of other tests that are past their end
/// time are closed here; a live one refuses the start.
async fn ensure_no_other_open_attempt(
    store: &dyn Store,
    user_id: Uuid,
    test_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    for other in store.in_progress_attempts(user_id).await? {
        if other.test_id == test_id {
            continue;
        }
        if other.is_expired(now) {
            finalize(store, &other, AttemptStatus::AutoSubmitted, now).await?;
            continue;
        }
        tracing::info!(%user_id, attempt_id = %other.id, "start refused, another test in progress");
        return Err(AppError::Conflict(
            "Another test is already in progress".to_string(),
        ));
    }
    Ok(())
}

/// Scores and closes an open attempt, then releases its device lock.
///
/// When the attempt was already closed by a concurrent caller, the stored
/// row is returned unchanged.
pub async fn finalize(
    store: &dyn Store,
    attempt: &TestAttempt,
    status: AttemptStatus,
    now: DateTime<Utc>,
) -> Result<TestAttempt, AppError> {
    debug_assert!(AttemptStatus::InProgress.can_transition_to(status));

    let test = store
        .find_test_by_id(attempt.test_id)
        .await?
        .ok_or_else(|| AppError::InternalServerError(format!("attempt {} has no test", attempt.id)))?;
    let submissions = store.submissions_for(attempt.id).await?;
    let score = scoring::score_attempt(&submissions, &test);

    let closed = match store.close_attempt(attempt.id, status, &score, now).await? {
        Some(closed) => {
            tracing::info!(
                attempt_id = %closed.id,
                status = ?closed.status,
                total = score.total_score,
                percentage = score.percentage,
                "attempt closed"
            );
            closed
        }
        None => store
            .find_attempt(attempt.id)
            .await?
            .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?,
    };

    session_lock::release_attempt(store, attempt.id).await?;
    Ok(closed)
}

/// Guard for answer events: the attempt must be open and inside its window.
/// An attempt found past its end time is auto-submitted on the spot.
async fn ensure_open(
    store: &dyn Store,
    attempt: &TestAttempt,
    now: DateTime<Utc>,
) -> Result<(), AppError> {
    if attempt.accepts_answers(now) {
        return Ok(());
    }
    if attempt.status.is_terminal() {
        return Err(AppError::NotFound("No active test attempt found".to_string()));
    }
    finalize(store, attempt, AttemptStatus::AutoSubmitted, now).await?;
    Err(AppError::NotFound("Test time has expired".to_string()))
}

/// Finds the caller's open attempt whose test contains `question_id`.
pub async fn attempt_for_question(
    store: &dyn Store,
    user_id: Uuid,
    question_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(TestAttempt, BoundQuestion), AppError> {
    for attempt in store.in_progress_attempts(user_id).await? {
        if let Some(bound) = store.test_question(attempt.test_id, question_id).await? {
            ensure_open(store, &attempt, now).await?;
            return Ok((attempt, bound));
        }
    }
    Err(AppError::NotFound("No active test attempt found".to_string()))
}

/// Records an MCQ answer, graded immediately.
pub async fn record_mcq(
    store: &dyn Store,
    user_id: Uuid,
    req: &SubmitMcqRequest,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let (attempt, bound) = attempt_for_question(store, user_id, req.question_id, now).await?;
    let options = bound
        .question
        .options()
        .ok_or_else(|| AppError::NotFound("Question not found in this test".to_string()))?;

    let (is_correct, score) = scoring::grade_mcq(options, &req.selected_option, bound.marks());
    let write = AnswerWrite::Mcq {
        selected_option: req.selected_option.clone(),
        is_correct,
        score,
    };

    Ok(store
        .put_submission(attempt.id, req.question_id, &write, now)
        .await?)
}

/// Saves code without grading. A previously graded score is kept.
pub async fn save_code(
    store: &dyn Store,
    user_id: Uuid,
    req: &SubmitCodeRequest,
    now: DateTime<Utc>,
) -> Result<Submission, AppError> {
    let (attempt, bound) = attempt_for_question(store, user_id, req.question_id, now).await?;
    if bound.question.kind() != QuestionKind::Coding {
        return Err(AppError::NotFound(
            "Coding question not found in this test".to_string(),
        ));
    }

    let write = AnswerWrite::CodeDraft {
        code: req.code.clone(),
        language: req.language.clone(),
    };
    Ok(store
        .put_submission(attempt.id, req.question_id, &write, now)
        .await?)
}

/// Grades code against every test case and stores the result.
pub async fn submit_code(
    store: &dyn Store,
    gateway: &ExecutionGateway,
    user_id: Uuid,
    req: &SubmitCodeRequest,
    now: DateTime<Utc>,
) -> Result<(Submission, GradeResult), AppError> {
    let (attempt, bound) = attempt_for_question(store, user_id, req.question_id, now).await?;
    let spec = bound
        .question
        .coding()
        .ok_or_else(|| AppError::NotFound("Coding question not found".to_string()))?;

    let grade = grader::grade_coding(gateway, user_id, spec, &req.code, &req.language).await?;

    // Grading takes a while; the attempt may have been closed meanwhile.
    let still_open = store
        .find_attempt(attempt.id)
        .await?
        .is_some_and(|a| !a.status.is_terminal());
    if !still_open {
        return Err(AppError::NotFound("No active test attempt found".to_string()));
    }

    let write = AnswerWrite::GradedCode {
        code: req.code.clone(),
        language: req.language.clone(),
        execution_results: serde_json::to_value(&grade)?,
        is_correct: grade.all_passed,
        score: scoring::coding_score(&grade, bound.marks()),
    };
    let submission = store
        .put_submission(attempt.id, req.question_id, &write, now)
        .await?;

    Ok((submission, grade))
}

/// Marks (or unmarks) a question of the caller's open attempt for review.
/// Flags carry no score.
pub async fn flag_question(
    store: &dyn Store,
    user_id: Uuid,
    req: &FlagQuestionRequest,
    now: DateTime<Utc>,
) -> Result<ReviewFlags, AppError> {
    let (attempt, _) = attempt_for_question(store, user_id, req.question_id, now).await?;
    store
        .set_flag(attempt.id, req.question_id, req.flagged, now)
        .await?;

    Ok(ReviewFlags {
        attempt_id: attempt.id,
        flagged: store.flagged_questions(attempt.id).await?,
    })
}

/// Explicit submit. An attempt already past its end time is closed as
/// `AUTO_SUBMITTED` instead.
pub async fn submit(
    store: &dyn Store,
    test_id: Uuid,
    user_id: Uuid,
    now: DateTime<Utc>,
) -> Result<(TestAttempt, Test), AppError> {
    let attempt = store
        .find_attempt_for(test_id, user_id)
        .await?
        .filter(|a| a.status == AttemptStatus::InProgress)
        .ok_or_else(|| AppError::NotFound("No active test attempt found".to_string()))?;

    let status = if attempt.is_expired(now) {
        AttemptStatus::AutoSubmitted
    } else {
        AttemptStatus::Submitted
    };
    let closed = finalize(store, &attempt, status, now).await?;
    if closed.status != status {
        // Lost the race against another closer.
        return Err(AppError::NotFound("No active test attempt found".to_string()));
    }

    let test = store
        .find_test_by_id(test_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Test not found".to_string()))?;
    Ok((closed, test))
}

/// Loads an attempt of a test owned by `college_id`, for staff actions.
async fn staff_attempt(
    store: &dyn Store,
    college_id: Uuid,
    attempt_id: Uuid,
) -> Result<(TestAttempt, Test), AppError> {
    let attempt = store
        .find_attempt(attempt_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
    let test = store
        .find_test(college_id, attempt.test_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Attempt not found".to_string()))?;
    Ok((attempt, test))
}

/// Proctoring hook: closes an open attempt as `TERMINATED`, keeping the
/// score of what was answered.
pub async fn terminate(
    store: &dyn Store,
    college_id: Uuid,
    attempt_id: Uuid,
    now: DateTime<Utc>,
) -> Result<TestAttempt, AppError> {
    let (attempt, _) = staff_attempt(store, college_id, attempt_id).await?;
    if attempt.status != AttemptStatus::InProgress {
        return Err(AppError::InUse(format!(
            "Attempt is already {:?}",
            attempt.status
        )));
    }

    let closed = finalize(store, &attempt, AttemptStatus::Terminated, now).await?;
    if closed.status != AttemptStatus::Terminated {
        return Err(AppError::InUse(format!("Attempt is already {:?}", closed.status)));
    }
    Ok(closed)
}

/// Manual review: `SUBMITTED | AUTO_SUBMITTED -> GRADED`, optionally
/// replacing the computed total.
pub async fn grade(
    store: &dyn Store,
    college_id: Uuid,
    attempt_id: Uuid,
    total_override: Option<f64>,
) -> Result<TestAttempt, AppError> {
    let (attempt, test) = staff_attempt(store, college_id, attempt_id).await?;
    if !attempt.status.can_transition_to(AttemptStatus::Graded) {
        return Err(AppError::InUse(format!(
            "Attempt in status {:?} cannot be graded",
            attempt.status
        )));
    }

    let score = match total_override {
        Some(total) if !(0.0..=f64::from(test.total_marks)).contains(&total) => {
            return Err(AppError::BadRequest(format!(
                "totalScore must be between 0 and {}",
                test.total_marks
            )));
        }
        Some(total) => scoring::rescore(total, test.total_marks, test.passing_score),
        None => AttemptScore {
            total_score: attempt.total_score.unwrap_or(0.0),
            percentage: attempt.percentage.unwrap_or(0.0),
            passed: attempt.passed.unwrap_or(false),
        },
    };

    store
        .mark_graded(attempt.id, &score)
        .await?
        .ok_or_else(|| AppError::InUse("Attempt can no longer be graded".to_string()))
}

/// Closes every attempt whose end time has passed, reading `page_size`
/// rows at a time. Rows that fail to close are logged and skipped, so they
/// never hide later ones. Returns how many this call closed.
pub async fn sweep_expired(
    store: &dyn Store,
    now: DateTime<Utc>,
    page_size: i64,
) -> Result<usize, AppError> {
    let mut closed = 0;
    let mut cursor = None;
    loop {
        let page = store.expired_attempts(now, cursor, page_size).await?;
        for attempt in &page {
            match finalize(store, attempt, AttemptStatus::AutoSubmitted, now).await {
                Ok(a) if a.status == AttemptStatus::AutoSubmitted => closed += 1,
                Ok(_) => {}
                Err(e) => tracing::error!(attempt_id = %attempt.id, "failed to auto-submit attempt: {:?}", e),
            }
        }

        let full = usize::try_from(page_size).is_ok_and(|size| page.len() >= size);
        match page.last() {
            Some(last) if full => cursor = Some((last.end_time, last.id)),
            _ => break,
        }
    }
    Ok(closed)
}
