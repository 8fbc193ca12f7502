// src/services/gateway.rs

use std::{sync::Arc, time::Duration};

use chrono::Utc;
use serde::Serialize;
use tokio::time::{Instant, timeout};
use uuid::Uuid;

use crate::{
    config::ExecutionLimits,
    models::execution::{ExecutionLog, ExecutionStatus},
    sandbox::{ExecuteRequest, ExecuteResponse, Sandbox, SandboxError, SourceFile, languages},
    state::AppState,
    store::Store,
};

/// Slack on top of the sandbox's own timeouts before the call is abandoned.
const HARD_BOUND_GRACE_MS: u64 = 5000;

/// One program run.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub user_id: Uuid,
    pub language: String,
    pub code: String,
    pub stdin: Option<String>,
    pub run_timeout_ms: u64,
    /// Bytes. Falls back to the configured limit.
    pub memory_limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompileOutcome {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
}

/// Normalized result of a run. A failing student program is a normal
/// outcome (`success == false`), not an error.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    /// Wall clock seconds, including the sandbox round trip.
    pub execution_time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compile: Option<CompileOutcome>,
    #[serde(skip)]
    pub status: ExecutionStatus,
}

impl RunOutcome {
    fn from_response(response: ExecuteResponse, execution_time: f64) -> Self {
        let compile_failed = response
            .compile
            .as_ref()
            .is_some_and(|c| c.code.is_some_and(|code| code != 0));

        let run = response.run;
        let status = if compile_failed {
            ExecutionStatus::CompileError
        } else if run.signal.as_deref() == Some("SIGKILL") {
            ExecutionStatus::Timeout
        } else if run.code == Some(0) {
            ExecutionStatus::Success
        } else {
            ExecutionStatus::RuntimeError
        };

        let stderr = match (&response.compile, compile_failed) {
            (Some(compile), true) if run.stderr.is_empty() => compile.stderr.clone(),
            _ => run.stderr,
        };

        Self {
            success: status == ExecutionStatus::Success && stderr.is_empty(),
            stdout: run.stdout,
            stderr,
            exit_code: run.code,
            execution_time,
            compile: response.compile.map(|c| CompileOutcome {
                stdout: c.stdout,
                stderr: c.stderr,
                exit_code: c.code,
            }),
            status,
        }
    }

    /// The program ran to completion with exit code 0.
    pub fn exited_cleanly(&self) -> bool {
        self.status == ExecutionStatus::Success
    }
}

/// Front door to the sandbox. Enforces a hard upper bound per call and
/// writes an audit row for every invocation, successful or not.
#[derive(Clone)]
pub struct ExecutionGateway {
    sandbox: Arc<dyn Sandbox>,
    store: Arc<dyn Store>,
    limits: ExecutionLimits,
}

impl ExecutionGateway {
    pub fn new(sandbox: Arc<dyn Sandbox>, store: Arc<dyn Store>, limits: ExecutionLimits) -> Self {
        Self {
            sandbox,
            store,
            limits,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            state.sandbox.clone(),
            state.store.clone(),
            state.config.execution.clone(),
        )
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    pub async fn run(&self, request: RunRequest) -> Result<RunOutcome, SandboxError> {
        let memory_limit = request.memory_limit.unwrap_or(self.limits.memory_limit);
        let payload = ExecuteRequest {
            language: request.language.clone(),
            version: languages::version_of(&request.language).to_string(),
            files: vec![SourceFile {
                name: languages::file_name_of(&request.language).to_string(),
                content: request.code.clone(),
            }],
            stdin: request.stdin.clone().unwrap_or_default(),
            args: Vec::new(),
            compile_timeout: self.limits.compile_timeout_ms,
            run_timeout: request.run_timeout_ms,
            compile_memory_limit: self.limits.memory_limit,
            run_memory_limit: memory_limit,
        };

        let bound_ms = self.limits.compile_timeout_ms + request.run_timeout_ms + HARD_BOUND_GRACE_MS;
        let started = Instant::now();
        let result = match timeout(Duration::from_millis(bound_ms), self.sandbox.execute(&payload)).await {
            Ok(result) => result,
            Err(_) => Err(SandboxError::TimedOut(bound_ms)),
        };
        let elapsed = started.elapsed().as_secs_f64();

        let outcome = result.map(|response| RunOutcome::from_response(response, elapsed));
        self.audit(&request, &outcome).await;

        if let Err(e) = &outcome {
            tracing::error!(user_id = %request.user_id, language = %request.language, "sandbox call failed: {}", e);
        }
        outcome
    }

    /// Audit logging never fails the run.
    async fn audit(&self, request: &RunRequest, outcome: &Result<RunOutcome, SandboxError>) {
        let mut log = ExecutionLog {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            language: request.language.clone(),
            code: request.code.clone(),
            stdin: request.stdin.clone(),
            stdout: None,
            stderr: None,
            exit_code: None,
            execution_time: None,
            status: ExecutionStatus::SystemError,
            error_message: None,
            created_at: Utc::now(),
        };

        match outcome {
            Ok(run) => {
                log.stdout = Some(run.stdout.clone());
                log.stderr = Some(run.stderr.clone());
                log.exit_code = run.exit_code;
                log.execution_time = Some(run.execution_time);
                log.status = run.status;
            }
            Err(e) => {
                if matches!(e, SandboxError::TimedOut(_)) {
                    log.status = ExecutionStatus::Timeout;
                }
                log.error_message = Some(e.to_string());
            }
        }

        if let Err(e) = self.store.insert_execution_log(&log).await {
            tracing::error!(user_id = %request.user_id, "failed to write execution log: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::StageResult;

    fn response(run: StageResult, compile: Option<StageResult>) -> ExecuteResponse {
        ExecuteResponse {
            language: "python".into(),
            version: "3.10.0".into(),
            run,
            compile,
        }
    }

    #[test]
    fn success_requires_clean_exit_and_empty_stderr() {
        let ok = RunOutcome::from_response(
            response(
                StageResult {
                    stdout: "3\n".into(),
                    code: Some(0),
                    ..Default::default()
                },
                None,
            ),
            0.1,
        );
        assert!(ok.success);

        let noisy = RunOutcome::from_response(
            response(
                StageResult {
                    stdout: "3\n".into(),
                    stderr: "warning".into(),
                    code: Some(0),
                    ..Default::default()
                },
                None,
            ),
            0.1,
        );
        assert!(!noisy.success);
        assert!(noisy.exited_cleanly());
    }

    #[test]
    fn classifies_failures() {
        let crashed = RunOutcome::from_response(
            response(
                StageResult {
                    stderr: "Traceback".into(),
                    code: Some(1),
                    ..Default::default()
                },
                None,
            ),
            0.1,
        );
        assert_eq!(crashed.status, ExecutionStatus::RuntimeError);

        let killed = RunOutcome::from_response(
            response(
                StageResult {
                    code: None,
                    signal: Some("SIGKILL".into()),
                    ..Default::default()
                },
                None,
            ),
            2.0,
        );
        assert_eq!(killed.status, ExecutionStatus::Timeout);

        let broken = RunOutcome::from_response(
            response(
                StageResult::default(),
                Some(StageResult {
                    stderr: "main.cpp:1: error".into(),
                    code: Some(1),
                    ..Default::default()
                }),
            ),
            0.5,
        );
        assert_eq!(broken.status, ExecutionStatus::CompileError);
        assert_eq!(broken.stderr, "main.cpp:1: error");
        assert!(!broken.success);
    }
}
