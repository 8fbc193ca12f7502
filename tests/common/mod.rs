// tests/common/mod.rs
//
// Shared harness: the real router on a random port, backed by the in-memory
// store and a scripted sandbox.

#![allow(dead_code)]

use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use placement_api::{
    config::{Config, ExecutionLimits},
    models::user::{College, User},
    routes,
    sandbox::{ExecuteRequest, ExecuteResponse, Runtime, Sandbox, SandboxError, StageResult},
    state::AppState,
    store::{MemoryStore, Store},
    utils::{hash::hash_password, rbac::Role},
};
use serde_json::{Value, json};
use url::Url;
use uuid::Uuid;

pub const PASSWORD: &str = "password123";

/// Sandbox stand-in. The submitted "program" is a table of `input => output`
/// lines: stdin matching an input prints its output and exits 0, anything
/// else exits 1 with a message on stderr.
#[derive(Default)]
pub struct FakeSandbox {
    pub calls: AtomicUsize,
    pub down: AtomicBool,
}

#[async_trait]
impl Sandbox for FakeSandbox {
    async fn execute(&self, request: &ExecuteRequest) -> Result<ExecuteResponse, SandboxError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down.load(Ordering::SeqCst) {
            return Err(SandboxError::Unreachable("connection refused".into()));
        }

        let program = request.files.first().map(|f| f.content.as_str()).unwrap_or("");
        let answer = program.lines().find_map(|line| {
            let (input, output) = line.split_once("=>")?;
            (input.trim() == request.stdin.trim()).then(|| output.trim().to_string())
        });

        let run = match answer {
            Some(output) => StageResult {
                stdout: format!("{output}\n"),
                code: Some(0),
                ..Default::default()
            },
            None => StageResult {
                stderr: "no answer for input".into(),
                code: Some(1),
                ..Default::default()
            },
        };

        Ok(ExecuteResponse {
            language: request.language.clone(),
            version: request.version.clone(),
            run,
            compile: None,
        })
    }

    async fn runtimes(&self) -> Result<Vec<Runtime>, SandboxError> {
        if self.down.load(Ordering::SeqCst) {
            return Err(SandboxError::Unreachable("connection refused".into()));
        }
        Ok(vec![
            Runtime {
                language: "python".into(),
                version: "3.10.0".into(),
                aliases: vec!["py".into()],
            },
            Runtime {
                language: "c".into(),
                version: "10.2.0".into(),
                aliases: vec![],
            },
        ])
    }
}

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub store: Arc<MemoryStore>,
    pub sandbox: Arc<FakeSandbox>,
    pub college: College,
}

pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600, // 10 minutes for tests
        rust_log: "error".to_string(),
        port: 0,
        piston_url: Url::parse("http://127.0.0.1:9").unwrap(),
        execution: ExecutionLimits::default(),
        attempt_sweep_interval_secs: 0,
        admin_username: None,
        admin_password: None,
        admin_college_slug: None,
    }
}

/// Helper function to spawn the app on a random port for testing.
pub async fn spawn_app() -> TestApp {
    let store = Arc::new(MemoryStore::new());
    let sandbox = Arc::new(FakeSandbox::default());

    let college = College {
        id: Uuid::new_v4(),
        name: "Test College".to_string(),
        slug: format!("college-{}", &Uuid::new_v4().to_string()[..8]),
        created_at: Utc::now(),
    };
    store.create_college(&college).await.unwrap();

    let state = AppState {
        store: store.clone(),
        sandbox: sandbox.clone(),
        config: test_config(),
    };
    let app = routes::create_router(state);

    // Bind to port 0 to get a random available port
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        store,
        sandbox,
        college,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Inserts a user of the given role straight into the store.
    pub async fn create_user(&self, role: Role) -> User {
        let user = User {
            id: Uuid::new_v4(),
            college_id: self.college.id,
            username: format!("u_{}", &Uuid::new_v4().to_string()[..8]),
            password: hash_password(PASSWORD).unwrap(),
            role,
            created_at: Utc::now(),
        };
        self.store.create_user(&user).await.unwrap();
        user
    }

    /// Logs in through the API; every call opens a new session (device).
    pub async fn login(&self, username: &str) -> String {
        let response = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&json!({ "username": username, "password": PASSWORD }))
            .send()
            .await
            .expect("Failed to execute request");
        assert_eq!(response.status().as_u16(), 200);

        let body: Value = response.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    pub async fn post(&self, token: &str, path: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn get(&self, token: &str, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn create_question(&self, token: &str, body: Value) -> String {
        let response = self.post(token, "/api/questions", body).await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// MCQ worth 4 marks; option "B" is correct.
    pub async fn create_mcq(&self, token: &str) -> String {
        self.create_question(
            token,
            json!({
                "type": "MCQ",
                "title": "Capital of France",
                "content": "<p>Which city is the capital of France?</p>",
                "marks": 4,
                "options": [
                    { "id": "A", "text": "Lyon", "isCorrect": false },
                    { "id": "B", "text": "Paris", "isCorrect": true },
                    { "id": "C", "text": "Nice", "isCorrect": false }
                ]
            }),
        )
        .await
    }

    /// Coding question worth 6 marks with one visible and one hidden case,
    /// one point each.
    pub async fn create_coding(&self, token: &str) -> String {
        self.create_question(
            token,
            json!({
                "type": "CODING",
                "title": "Add two numbers",
                "content": "Read two integers and print their sum.",
                "marks": 6,
                "allowedLanguages": ["python", "c"],
                "solution": "print(sum(map(int, input().split())))",
                "testCases": [
                    { "id": "visible", "input": "1 2", "expectedOutput": "3", "isHidden": false, "points": 1 },
                    { "id": "secret", "input": "40 2", "expectedOutput": "42", "isHidden": true, "points": 1 }
                ]
            }),
        )
        .await
    }

    /// Creates, fills and publishes a test. Returns its id.
    pub async fn publish_test(&self, token: &str, total_marks: i32, questions: &[&str]) -> String {
        let response = self
            .post(
                token,
                "/api/tests",
                json!({
                    "title": "Placement Round 1",
                    "duration": 30,
                    "totalMarks": total_marks,
                    "passingScore": 50.0
                }),
            )
            .await;
        assert_eq!(response.status().as_u16(), 201);
        let body: Value = response.json().await.unwrap();
        let test_id = body["data"]["id"].as_str().unwrap().to_string();

        for (idx, question_id) in questions.iter().enumerate() {
            let response = self
                .post(
                    token,
                    &format!("/api/tests/{}/questions", test_id),
                    json!({ "questionId": question_id, "order": idx }),
                )
                .await;
            assert_eq!(response.status().as_u16(), 201);
        }

        let response = self
            .post(token, &format!("/api/tests/{}/publish", test_id), json!({}))
            .await;
        assert_eq!(response.status().as_u16(), 200);

        test_id
    }
}

pub async fn error_code(response: reqwest::Response) -> String {
    let body: Value = response.json().await.unwrap();
    body["error"]["code"].as_str().unwrap_or_default().to_string()
}
