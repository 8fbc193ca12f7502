// src/services/grader.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::question::{CodingSpec, TestCase},
    sandbox::languages,
    services::gateway::{ExecutionGateway, RunRequest},
};

/// Outcome of one test case. Carries hidden data; never returned to students
/// as is, see [`GradeResult::masked`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseResult {
    pub test_case_id: String,
    pub passed: bool,
    /// Points earned: the case's points when passed, otherwise 0.
    pub points: i32,
    pub max_points: i32,
    pub is_hidden: bool,
    pub input: String,
    pub expected_output: String,
    pub actual_output: Option<String>,
    pub error: Option<String>,
    pub execution_time: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeResult {
    /// Same order as the question's test cases.
    pub results: Vec<CaseResult>,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub all_passed: bool,
}

/// Student-facing view of one case.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum MaskedCaseResult {
    #[serde(rename_all = "camelCase")]
    Visible {
        passed: bool,
        points: i32,
        input: String,
        expected_output: String,
        actual_output: Option<String>,
        error: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Hidden {
        passed: bool,
        points: i32,
        is_hidden: bool,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskedGradeResult {
    pub test_cases: Vec<MaskedCaseResult>,
    pub total_score: i32,
    pub max_score: i32,
    pub percentage: f64,
    pub all_passed: bool,
}

impl CaseResult {
    pub fn masked(&self) -> MaskedCaseResult {
        if self.is_hidden {
            MaskedCaseResult::Hidden {
                passed: self.passed,
                points: self.points,
                is_hidden: true,
            }
        } else {
            MaskedCaseResult::Visible {
                passed: self.passed,
                points: self.points,
                input: self.input.clone(),
                expected_output: self.expected_output.clone(),
                actual_output: self.actual_output.clone(),
                error: self.error.clone(),
            }
        }
    }
}

impl GradeResult {
    pub fn from_cases(results: Vec<CaseResult>) -> Self {
        let total_score: i32 = results.iter().map(|r| r.points).sum();
        let max_score: i32 = results.iter().map(|r| r.max_points).sum();
        let percentage = if max_score > 0 {
            round2(f64::from(total_score) / f64::from(max_score) * 100.0)
        } else {
            0.0
        };

        Self {
            results,
            total_score,
            max_score,
            percentage,
            all_passed: total_score == max_score,
        }
    }

    /// Fraction of points earned, unrounded.
    pub fn ratio(&self) -> f64 {
        if self.max_score > 0 {
            f64::from(self.total_score) / f64::from(self.max_score)
        } else {
            0.0
        }
    }

    /// Strips input and outputs of hidden cases.
    pub fn masked(&self) -> MaskedGradeResult {
        MaskedGradeResult {
            test_cases: self.results.iter().map(CaseResult::masked).collect(),
            total_score: self.total_score,
            max_score: self.max_score,
            percentage: self.percentage,
            all_passed: self.all_passed,
        }
    }
}

pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Exact match after trimming leading and trailing whitespace only.
pub fn outputs_match(expected: &str, actual: &str) -> bool {
    expected.trim() == actual.trim()
}

/// Rejects languages the sandbox or the question does not support.
pub fn ensure_language(spec: &CodingSpec, language: &str) -> Result<(), AppError> {
    if !languages::is_supported(language) {
        return Err(AppError::UnsupportedLanguage(format!(
            "Language \"{language}\" is not supported"
        )));
    }
    if !spec.allows(language) {
        return Err(AppError::UnsupportedLanguage(format!(
            "Language \"{language}\" is not allowed for this question"
        )));
    }
    Ok(())
}

/// Runs `code` against every test case, one sandbox call at a time in the
/// question's order. A failing case never stops the remaining ones.
pub async fn grade_coding(
    gateway: &ExecutionGateway,
    user_id: Uuid,
    spec: &CodingSpec,
    code: &str,
    language: &str,
) -> Result<GradeResult, AppError> {
    ensure_language(spec, language)?;

    let mut results = Vec::with_capacity(spec.test_cases.len());
    for case in &spec.test_cases {
        let run = gateway
            .run(RunRequest {
                user_id,
                language: language.to_string(),
                code: code.to_string(),
                stdin: Some(case.input.clone()),
                run_timeout_ms: spec.run_timeout_ms(),
                memory_limit: Some(spec.memory_limit_bytes()),
            })
            .await;

        let result = match run {
            Ok(outcome) => {
                let passed =
                    outcome.exited_cleanly() && outputs_match(&case.expected_output, &outcome.stdout);
                let error = if !outcome.stderr.is_empty() {
                    Some(outcome.stderr.clone())
                } else if !outcome.exited_cleanly() {
                    Some(match outcome.exit_code {
                        Some(code) => format!("Process exited with code {code}"),
                        None => "Process was terminated".to_string(),
                    })
                } else {
                    None
                };
                case_result(case, passed, Some(outcome.stdout.trim().to_string()), error, Some(outcome.execution_time))
            }
            Err(e) => case_result(case, false, None, Some(e.to_string()), None),
        };
        results.push(result);
    }

    Ok(GradeResult::from_cases(results))
}

fn case_result(
    case: &TestCase,
    passed: bool,
    actual_output: Option<String>,
    error: Option<String>,
    execution_time: Option<f64>,
) -> CaseResult {
    CaseResult {
        test_case_id: case.id.clone(),
        passed,
        points: if passed { case.points } else { 0 },
        max_points: case.points,
        is_hidden: case.is_hidden,
        input: case.input.clone(),
        expected_output: case.expected_output.clone(),
        actual_output,
        error,
        execution_time,
    }
}
