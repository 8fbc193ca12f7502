// src/models/execution.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "execution_status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExecutionStatus {
    Success,
    CompileError,
    RuntimeError,
    Timeout,
    SystemError,
}

/// Represents the 'execution_logs' table: audit trail of every sandbox call.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub language: String,
    pub code: String,
    pub stdin: Option<String>,
    pub stdout: Option<String>,
    pub stderr: Option<String>,
    pub exit_code: Option<i32>,
    /// Seconds.
    pub execution_time: Option<f64>,
    pub status: ExecutionStatus,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// DTO for a free-form "Run" with custom input.
#[derive(Debug, Deserialize, Validate)]
pub struct RunCodeRequest {
    #[validate(length(min = 1, max = 20))]
    pub language: String,
    #[validate(length(min = 1))]
    pub code: String,
    pub stdin: Option<String>,
}

/// DTO for running code against a question's test cases without saving.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ValidateCodeRequest {
    #[validate(length(min = 1, max = 20))]
    pub language: String,
    #[validate(length(min = 1))]
    pub code: String,
    pub question_id: Uuid,
}
