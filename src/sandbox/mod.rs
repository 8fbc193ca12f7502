// src/sandbox/mod.rs
//
// Contract of the external process-isolation service that runs student code.

pub mod languages;
pub mod piston;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use piston::PistonClient;

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Connection refused, DNS failure, request timeout.
    #[error("sandbox unreachable: {0}")]
    Unreachable(String),
    /// Non-success HTTP status from the service.
    #[error("sandbox rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },
    /// Body could not be decoded into the expected shape.
    #[error("malformed sandbox response: {0}")]
    Malformed(String),
    /// The hard per-call bound elapsed before the service answered.
    #[error("sandbox call exceeded {0} ms")]
    TimedOut(u64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceFile {
    pub name: String,
    pub content: String,
}

/// Wire request of `POST /execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteRequest {
    pub language: String,
    pub version: String,
    pub files: Vec<SourceFile>,
    pub stdin: String,
    pub args: Vec<String>,
    pub compile_timeout: u64,
    pub run_timeout: u64,
    pub compile_memory_limit: i64,
    pub run_memory_limit: i64,
}

/// Output of one stage (compile or run).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StageResult {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub signal: Option<String>,
}

/// Wire response of `POST /execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecuteResponse {
    pub language: String,
    pub version: String,
    pub run: StageResult,
    pub compile: Option<StageResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runtime {
    pub language: String,
    pub version: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// The external runner. Implemented over HTTP by [`PistonClient`];
/// tests substitute scripted fakes.
#[async_trait]
pub trait Sandbox: Send + Sync {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, SandboxError>;

    async fn runtimes(&self) -> Result<Vec<Runtime>, SandboxError>;
}
