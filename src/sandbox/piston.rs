// src/sandbox/piston.rs

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use super::{ExecuteRequest, ExecuteResponse, Runtime, Sandbox, SandboxError};

/// HTTP client for a Piston-compatible execution service.
///
/// Constructed once at startup and shared through `AppState`.
#[derive(Debug, Clone)]
pub struct PistonClient {
    http: Client,
    base_url: Url,
}

impl PistonClient {
    /// `request_timeout` bounds every HTTP exchange, including slow runs.
    pub fn new(base_url: Url, request_timeout: Duration) -> Result<Self, SandboxError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| SandboxError::Unreachable(e.to_string()))?;

        Ok(Self { http, base_url })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.as_str().trim_end_matches('/'), path)
    }
}

fn transport_error(err: reqwest::Error) -> SandboxError {
    if err.is_decode() {
        SandboxError::Malformed(err.to_string())
    } else {
        SandboxError::Unreachable(err.to_string())
    }
}

async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, SandboxError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(SandboxError::Rejected {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl Sandbox for PistonClient {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, SandboxError> {
        let response = self
            .http
            .post(self.endpoint("execute"))
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response)
            .await?
            .json::<ExecuteResponse>()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))
    }

    async fn runtimes(&self) -> Result<Vec<Runtime>, SandboxError> {
        let response = self
            .http
            .get(self.endpoint("runtimes"))
            .send()
            .await
            .map_err(transport_error)?;

        ensure_success(response)
            .await?
            .json::<Vec<Runtime>>()
            .await
            .map_err(|e| SandboxError::Malformed(e.to_string()))
    }
}
