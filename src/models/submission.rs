// src/models/submission.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::question::QuestionKind;

/// Represents the 'submissions' table. Unique on (attempt_id, question_id).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub question_id: Uuid,
    pub selected_option: Option<String>,
    pub code: Option<String>,
    pub language: Option<String>,

    /// Raw grading payload. Contains hidden test case data, never serialized.
    #[serde(skip)]
    pub execution_results: Option<serde_json::Value>,

    pub is_correct: Option<bool>,
    pub score: Option<f64>,
    pub graded_at: Option<DateTime<Utc>>,
    pub submitted_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Submission {
    pub fn is_graded(&self) -> bool {
        self.score.is_some()
    }
}

/// What an answer event writes into the (attempt, question) row.
///
/// Columns not named by a variant are left untouched on update, so saving a
/// code draft keeps the last graded score.
#[derive(Debug, Clone)]
pub enum AnswerWrite {
    Mcq {
        selected_option: String,
        is_correct: bool,
        score: f64,
    },
    CodeDraft {
        code: String,
        language: String,
    },
    GradedCode {
        code: String,
        language: String,
        execution_results: serde_json::Value,
        is_correct: bool,
        score: f64,
    },
}

/// DTO for answering an MCQ.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitMcqRequest {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 100))]
    pub selected_option: String,
}

/// DTO for saving or grading code.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubmitCodeRequest {
    pub question_id: Uuid,
    #[validate(length(min = 1, max = 65536))]
    pub code: String,
    #[validate(length(min = 1, max = 20))]
    pub language: String,
}

/// DTO for marking a question for review, or clearing the mark.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagQuestionRequest {
    pub question_id: Uuid,
    pub flagged: bool,
}

/// Questions the student marked for review, oldest mark first.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewFlags {
    pub attempt_id: Uuid,
    pub flagged: Vec<Uuid>,
}

/// Per-question line of a results page.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionResult {
    pub question_id: Uuid,
    pub question_title: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub score: f64,
    pub max_score: i32,
    pub is_correct: bool,
    /// False for code that was saved but never submitted for grading.
    pub graded: bool,
}

/// Results page of a finished attempt.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttemptResults {
    pub attempt_id: Uuid,
    pub test_id: Uuid,
    pub test_title: String,
    pub total_score: f64,
    /// The test's total marks.
    pub max_score: i32,
    pub percentage: f64,
    pub passed: bool,
    pub started_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub question_results: Vec<QuestionResult>,
}
