// src/models/question.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{error::AppError, sandbox::languages};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "question_type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    Mcq,
    Coding,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(type_name = "difficulty", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

/// One choice of a multiple-choice question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McqOption {
    pub id: String,
    pub text: String,
    pub is_correct: bool,
}

/// One graded input/output pair of a coding question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    pub id: String,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
    pub points: i32,
}

/// Everything needed to run and grade a coding question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodingSpec {
    /// Graded in this order.
    pub test_cases: Vec<TestCase>,
    pub allowed_languages: Vec<String>,
    /// Per-run wall clock limit in seconds.
    pub time_limit: i32,
    /// Per-run memory limit in megabytes.
    pub memory_limit: i32,
    #[serde(default)]
    pub starter_code: HashMap<String, String>,
    pub solution: Option<String>,
    pub constraints: Option<String>,
}

impl CodingSpec {
    pub fn allows(&self, language: &str) -> bool {
        self.allowed_languages.iter().any(|l| l == language)
    }

    pub fn run_timeout_ms(&self) -> u64 {
        u64::try_from(self.time_limit.max(1)).unwrap_or(2) * 1000
    }

    pub fn memory_limit_bytes(&self) -> i64 {
        i64::from(self.memory_limit) * 1024 * 1024
    }
}

/// Variant-specific part of a question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionBody {
    Mcq { options: Vec<McqOption> },
    Coding(CodingSpec),
}

/// A question in a college's bank.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    pub id: Uuid,
    pub college_id: Uuid,
    pub creator_id: Uuid,
    pub title: String,
    pub content: String,
    pub marks: i32,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub body: QuestionBody,
    pub created_at: DateTime<Utc>,
}

impl Question {
    pub fn kind(&self) -> QuestionKind {
        match self.body {
            QuestionBody::Mcq { .. } => QuestionKind::Mcq,
            QuestionBody::Coding(_) => QuestionKind::Coding,
        }
    }

    pub fn coding(&self) -> Option<&CodingSpec> {
        match &self.body {
            QuestionBody::Coding(spec) => Some(spec),
            QuestionBody::Mcq { .. } => None,
        }
    }

    pub fn options(&self) -> Option<&[McqOption]> {
        match &self.body {
            QuestionBody::Mcq { options } => Some(options),
            QuestionBody::Coding(_) => None,
        }
    }

    /// Student-facing projection: no correct flags, no solution, no hidden cases.
    pub fn public(&self) -> PublicQuestion {
        let body = match &self.body {
            QuestionBody::Mcq { options } => PublicQuestionBody::Mcq {
                options: options
                    .iter()
                    .map(|o| PublicOption {
                        id: o.id.clone(),
                        text: o.text.clone(),
                    })
                    .collect(),
            },
            QuestionBody::Coding(spec) => PublicQuestionBody::Coding {
                sample_test_cases: spec
                    .test_cases
                    .iter()
                    .filter(|tc| !tc.is_hidden)
                    .cloned()
                    .collect(),
                allowed_languages: spec.allowed_languages.clone(),
                time_limit: spec.time_limit,
                memory_limit: spec.memory_limit,
                starter_code: spec.starter_code.clone(),
                constraints: spec.constraints.clone(),
            },
        };

        PublicQuestion {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            marks: self.marks,
            difficulty: self.difficulty,
            tags: self.tags.clone(),
            body,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PublicOption {
    pub id: String,
    pub text: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PublicQuestionBody {
    Mcq {
        options: Vec<PublicOption>,
    },
    #[serde(rename_all = "camelCase")]
    Coding {
        sample_test_cases: Vec<TestCase>,
        allowed_languages: Vec<String>,
        time_limit: i32,
        memory_limit: i32,
        starter_code: HashMap<String, String>,
        constraints: Option<String>,
    },
}

/// DTO for sending question to students.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicQuestion {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub marks: i32,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    #[serde(flatten)]
    pub body: PublicQuestionBody,
}

/// Compact row for question listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSummary {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub title: String,
    pub marks: i32,
    pub difficulty: Difficulty,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Question> for QuestionSummary {
    fn from(q: &Question) -> Self {
        Self {
            id: q.id,
            kind: q.kind(),
            title: q.title.clone(),
            marks: q.marks,
            difficulty: q.difficulty,
            tags: q.tags.clone(),
            created_at: q.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionInput {
    pub id: Option<String>,
    pub text: String,
    pub is_correct: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseInput {
    pub id: Option<String>,
    pub input: String,
    pub expected_output: String,
    #[serde(default)]
    pub is_hidden: bool,
    pub points: Option<i32>,
}

/// DTO for creating a new question. Variant rules are checked by `into_body`.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateQuestionRequest {
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    #[validate(length(min = 3, max = 200))]
    pub title: String,
    #[validate(length(min = 10, max = 20000))]
    pub content: String,
    #[validate(range(min = 1, max = 100))]
    pub marks: Option<i32>,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub tags: Vec<String>,

    // MCQ
    pub options: Option<Vec<OptionInput>>,

    // CODING
    pub test_cases: Option<Vec<TestCaseInput>>,
    pub allowed_languages: Option<Vec<String>>,
    #[validate(range(min = 1, max = 30))]
    pub time_limit: Option<i32>,
    #[validate(range(min = 32, max = 512))]
    pub memory_limit: Option<i32>,
    pub starter_code: Option<HashMap<String, String>>,
    pub solution: Option<String>,
    pub constraints: Option<String>,
}

impl CreateQuestionRequest {
    pub fn default_marks(&self) -> i32 {
        self.marks.unwrap_or(match self.kind {
            QuestionKind::Mcq => 1,
            QuestionKind::Coding => 10,
        })
    }

    /// Builds the variant body, enforcing the per-variant invariants.
    pub fn into_body(self) -> Result<QuestionBody, AppError> {
        match self.kind {
            QuestionKind::Mcq => {
                let options = self.options.unwrap_or_default();
                if options.len() < 2 || options.len() > 6 {
                    return Err(AppError::BadRequest(
                        "MCQ must have between 2 and 6 options".to_string(),
                    ));
                }
                if options.iter().any(|o| o.text.trim().is_empty()) {
                    return Err(AppError::BadRequest("Option text cannot be empty".to_string()));
                }
                if !options.iter().any(|o| o.is_correct) {
                    return Err(AppError::BadRequest(
                        "MCQ must have at least one correct option".to_string(),
                    ));
                }

                let options: Vec<McqOption> = options
                    .into_iter()
                    .enumerate()
                    .map(|(idx, o)| McqOption {
                        id: o.id.unwrap_or_else(|| format!("opt_{idx}")),
                        text: o.text,
                        is_correct: o.is_correct,
                    })
                    .collect();
                ensure_unique(options.iter().map(|o| o.id.as_str()), "option")?;

                Ok(QuestionBody::Mcq { options })
            }
            QuestionKind::Coding => {
                let cases = self.test_cases.unwrap_or_default();
                if cases.is_empty() || cases.len() > 20 {
                    return Err(AppError::BadRequest(
                        "Coding question must have between 1 and 20 test cases".to_string(),
                    ));
                }
                if cases.iter().any(|c| c.points.is_some_and(|p| p < 1)) {
                    return Err(AppError::BadRequest(
                        "Test case points must be at least 1".to_string(),
                    ));
                }

                let allowed_languages = self
                    .allowed_languages
                    .unwrap_or_else(|| languages::ids().map(str::to_string).collect());
                if allowed_languages.is_empty() {
                    return Err(AppError::BadRequest(
                        "At least one language must be allowed".to_string(),
                    ));
                }
                if let Some(bad) = allowed_languages
                    .iter()
                    .find(|l| !languages::is_supported(l))
                {
                    return Err(AppError::UnsupportedLanguage(format!(
                        "Language \"{bad}\" is not supported"
                    )));
                }

                let test_cases: Vec<TestCase> = cases
                    .into_iter()
                    .enumerate()
                    .map(|(idx, c)| TestCase {
                        id: c.id.unwrap_or_else(|| format!("tc_{idx}")),
                        input: c.input,
                        expected_output: c.expected_output,
                        is_hidden: c.is_hidden,
                        points: c.points.unwrap_or(1),
                    })
                    .collect();
                ensure_unique(test_cases.iter().map(|c| c.id.as_str()), "test case")?;

                Ok(QuestionBody::Coding(CodingSpec {
                    test_cases,
                    allowed_languages,
                    time_limit: self.time_limit.unwrap_or(2),
                    memory_limit: self.memory_limit.unwrap_or(256),
                    starter_code: self.starter_code.unwrap_or_default(),
                    solution: self.solution,
                    constraints: self.constraints,
                }))
            }
        }
    }
}

fn ensure_unique<'a>(ids: impl Iterator<Item = &'a str>, what: &str) -> Result<(), AppError> {
    let mut seen = std::collections::HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(AppError::BadRequest(format!("Duplicate {what} id '{id}'")));
        }
    }
    Ok(())
}

/// Query parameters for listing questions.
#[derive(Debug, Default, Deserialize)]
pub struct QuestionListParams {
    #[serde(rename = "type")]
    pub kind: Option<QuestionKind>,
    pub difficulty: Option<Difficulty>,
    /// Case-insensitive title match.
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mcq_request(options: Vec<(&str, bool)>) -> CreateQuestionRequest {
        CreateQuestionRequest {
            kind: QuestionKind::Mcq,
            title: "Capital of France".to_string(),
            content: "Which city is the capital of France?".to_string(),
            marks: Some(4),
            difficulty: Difficulty::Easy,
            tags: vec![],
            options: Some(
                options
                    .into_iter()
                    .map(|(text, is_correct)| OptionInput {
                        id: None,
                        text: text.to_string(),
                        is_correct,
                    })
                    .collect(),
            ),
            test_cases: None,
            allowed_languages: None,
            time_limit: None,
            memory_limit: None,
            starter_code: None,
            solution: None,
            constraints: None,
        }
    }

    #[test]
    fn mcq_without_correct_option_is_rejected() {
        let req = mcq_request(vec![("Paris", false), ("Rome", false)]);
        assert!(matches!(req.into_body(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn mcq_option_ids_default_to_position() {
        let req = mcq_request(vec![("Paris", true), ("Rome", false)]);
        let QuestionBody::Mcq { options } = req.into_body().unwrap() else {
            panic!("expected MCQ body");
        };
        assert_eq!(options[0].id, "opt_0");
        assert_eq!(options[1].id, "opt_1");
    }

    #[test]
    fn coding_defaults_and_unsupported_language() {
        let mut req = mcq_request(vec![]);
        req.kind = QuestionKind::Coding;
        req.test_cases = Some(vec![TestCaseInput {
            id: None,
            input: "1 2".to_string(),
            expected_output: "3".to_string(),
            is_hidden: true,
            points: None,
        }]);
        req.allowed_languages = Some(vec!["cobol".to_string()]);
        assert!(matches!(
            req.into_body(),
            Err(AppError::UnsupportedLanguage(_))
        ));
    }

    #[test]
    fn public_view_hides_answers() {
        let question = Question {
            id: Uuid::new_v4(),
            college_id: Uuid::new_v4(),
            creator_id: Uuid::new_v4(),
            title: "Sum".to_string(),
            content: "Add two numbers together".to_string(),
            marks: 6,
            difficulty: Difficulty::Medium,
            tags: vec![],
            body: QuestionBody::Coding(CodingSpec {
                test_cases: vec![
                    TestCase {
                        id: "tc_0".into(),
                        input: "1 2".into(),
                        expected_output: "3".into(),
                        is_hidden: false,
                        points: 3,
                    },
                    TestCase {
                        id: "tc_1".into(),
                        input: "40 2".into(),
                        expected_output: "42".into(),
                        is_hidden: true,
                        points: 3,
                    },
                ],
                allowed_languages: vec!["python".into()],
                time_limit: 2,
                memory_limit: 256,
                starter_code: HashMap::new(),
                solution: Some("print(sum(map(int, input().split())))".into()),
                constraints: None,
            }),
            created_at: Utc::now(),
        };

        let json = serde_json::to_value(question.public()).unwrap();
        assert_eq!(json["type"], "CODING");
        assert_eq!(json["sampleTestCases"].as_array().unwrap().len(), 1);
        assert!(json.get("solution").is_none());
        assert!(!json.to_string().contains("40 2"));
    }
}
