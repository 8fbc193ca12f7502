// src/models/attempt.rs

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Lifecycle of one attempt.
///
/// `InProgress` is the only open state. `Submitted` and `AutoSubmitted`
/// may still be refined into `Graded` by manual review; every other edge
/// is forbidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "attempt_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AttemptStatus {
    InProgress,
    Submitted,
    AutoSubmitted,
    Terminated,
    Graded,
}

impl AttemptStatus {
    pub fn is_terminal(self) -> bool {
        self != AttemptStatus::InProgress
    }

    /// Terminal states that carry final scores visible to the student.
    pub fn has_results(self) -> bool {
        matches!(
            self,
            AttemptStatus::Submitted | AttemptStatus::AutoSubmitted | AttemptStatus::Graded
        )
    }

    pub fn can_transition_to(self, next: AttemptStatus) -> bool {
        use AttemptStatus::*;
        matches!(
            (self, next),
            (InProgress, Submitted)
                | (InProgress, AutoSubmitted)
                | (InProgress, Terminated)
                | (Submitted, Graded)
                | (AutoSubmitted, Graded)
        )
    }
}

/// Represents the 'test_attempts' table. Unique on (test_id, user_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestAttempt {
    pub id: Uuid,
    pub test_id: Uuid,
    pub user_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: AttemptStatus,
    pub total_score: Option<f64>,
    pub percentage: Option<f64>,
    pub passed: Option<bool>,
    pub submitted_at: Option<DateTime<Utc>>,
}

impl TestAttempt {
    pub fn begin(test_id: Uuid, user_id: Uuid, duration_minutes: i32, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            test_id,
            user_id,
            started_at: now,
            end_time: now + Duration::minutes(i64::from(duration_minutes)),
            status: AttemptStatus::InProgress,
            total_score: None,
            percentage: None,
            passed: None,
            submitted_at: None,
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.end_time
    }

    /// In progress and still inside its time window.
    pub fn accepts_answers(&self, now: DateTime<Utc>) -> bool {
        self.status == AttemptStatus::InProgress && !self.is_expired(now)
    }
}

/// Final numbers written when an attempt leaves `InProgress`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptScore {
    pub total_score: f64,
    pub percentage: f64,
    pub passed: bool,
}

/// Response body of a finished attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmittedAttempt {
    #[serde(flatten)]
    pub attempt: TestAttempt,
    pub show_results: bool,
}

/// DTO for the manual review transition to `GRADED`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeAttemptRequest {
    /// Replaces the computed total when present.
    pub total_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_open_attempts_move_to_closed_states() {
        use AttemptStatus::*;
        assert!(InProgress.can_transition_to(Submitted));
        assert!(InProgress.can_transition_to(AutoSubmitted));
        assert!(InProgress.can_transition_to(Terminated));
        assert!(Submitted.can_transition_to(Graded));
        assert!(!Submitted.can_transition_to(InProgress));
        assert!(!Terminated.can_transition_to(Graded));
        assert!(!Graded.can_transition_to(Submitted));
        assert!(!InProgress.can_transition_to(Graded));
    }

    #[test]
    fn end_time_follows_duration() {
        let now = Utc::now();
        let attempt = TestAttempt::begin(Uuid::new_v4(), Uuid::new_v4(), 30, now);
        assert_eq!(attempt.end_time - attempt.started_at, Duration::minutes(30));
        assert!(attempt.accepts_answers(now));
        assert!(!attempt.accepts_answers(now + Duration::minutes(30)));
    }
}
